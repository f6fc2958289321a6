//! System call numbers addressed by the `syscall` opcode's immediate.
//!
//! Transcribed from the `syscalldef` X-macro in the original's `neo_bc.h`.

use std::fmt;

/// A high-level VM system call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
#[repr(u8)]
pub enum Syscall {
    /// Print an int stack record.
    PrintInt = 0,
    /// Print a float stack record.
    PrintFloat,
    /// Print a bool stack record.
    PrintBool,
    /// Print a char stack record.
    PrintChar,
    /// Print a pointer stack record.
    PrintPtr,
}

impl Syscall {
    pub const ALL: [Syscall; 5] = [
        Syscall::PrintInt,
        Syscall::PrintFloat,
        Syscall::PrintBool,
        Syscall::PrintChar,
        Syscall::PrintPtr,
    ];

    /// The syscall's mnemonic.
    pub fn mnemonic(self) -> &'static str {
        match self {
            Syscall::PrintInt => "print_int",
            Syscall::PrintFloat => "print_float",
            Syscall::PrintBool => "print_bool",
            Syscall::PrintChar => "print_char",
            Syscall::PrintPtr => "print_ptr",
        }
    }

    /// Number of stack records popped: every syscall here takes exactly
    /// one argument.
    pub fn stack_ops(self) -> u8 {
        1
    }

    /// Decodes a syscall from its numeric value.
    pub fn from_u32(value: u32) -> Option<Syscall> {
        Syscall::ALL.into_iter().find(|&s| s as u32 == value)
    }
}

impl fmt::Display for Syscall {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mnemonic())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_syscall_round_trips() {
        for s in Syscall::ALL {
            assert_eq!(Syscall::from_u32(s as u32), Some(s));
        }
    }

    #[test]
    fn unknown_syscall_number_is_none() {
        assert_eq!(Syscall::from_u32(999), None);
    }
}
