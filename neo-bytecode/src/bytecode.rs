//! A finished (or in-progress) unit of bytecode: its instruction stream
//! plus the constant pool it references.
//!
//! Grounded on `bytecode_t` and the `bc_*` functions in the original's
//! `neo_bc.h`. `bc_emit_ipush`/`bc_emit_fpush` pick a dedicated
//! zero-operand opcode for the handful of constant values that have one
//! (`ipush0`, `fpush05`, ...), fall back to `ipush #imm` when the value
//! fits a 24-bit immediate, and otherwise load it from the constant pool -
//! that three-way dispatch is the one piece of "cleverness" in bytecode
//! emission worth keeping as a named method rather than inlining at every
//! call site.

use neo_types::{Float, Int, Record, RecordTag};
use tracing::instrument;

use crate::instruction::{fits_i24, Instruction};
use crate::metaspace::{ConstKey, Metaspace};
use crate::opcode::Opcode;

/// Current bytecode format version emitted by this crate.
pub const BYTECODE_VERSION: u32 = 1;

/// Why a [`Bytecode`] unit failed [`Bytecode::validate`].
///
/// Grounded on the pre-run rejection checks spec §4.4/§7 describes: these
/// are lookup errors discovered once, before the VM ever starts stepping
/// through the program, not interrupts raised mid-execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    /// The instruction stream has no instructions at all.
    #[error("bytecode unit has no instructions")]
    Empty,
    /// The first instruction isn't `NOP`.
    #[error("first instruction must be NOP")]
    MissingLeadingNop,
    /// The last instruction isn't `HLT`.
    #[error("last instruction must be HLT")]
    MissingTrailingHlt,
    /// An `ldc` instruction's immediate doesn't index a live constant.
    #[error("instruction {index}: ldc index {key} out of range")]
    ConstPoolIndexOutOfRange { index: usize, key: u32 },
    /// A `syscall` instruction's immediate doesn't name a known syscall.
    #[error("instruction {index}: syscall index {key} out of range")]
    SyscallIndexOutOfRange { index: usize, key: u32 },
}

/// An instruction stream plus the constant pool it indexes into.
#[derive(Debug, Clone)]
pub struct Bytecode {
    /// Format version, for forward-compatible readers.
    pub version: u32,
    instructions: Vec<Instruction>,
    pool: Metaspace,
}

impl Bytecode {
    /// Builds an empty bytecode unit.
    pub fn new() -> Self {
        Bytecode {
            version: BYTECODE_VERSION,
            instructions: Vec::new(),
            pool: Metaspace::default(),
        }
    }

    /// The constant pool.
    pub fn pool(&self) -> &Metaspace {
        &self.pool
    }

    /// The constant pool, mutably.
    pub fn pool_mut(&mut self) -> &mut Metaspace {
        &mut self.pool
    }

    /// Appends a raw instruction.
    pub fn emit(&mut self, instr: Instruction) {
        self.instructions.push(instr);
    }

    /// Emits the best encoding for pushing an integer constant: a
    /// dedicated opcode for `-1, 0, 1, 2`, an `ipush #imm` for anything
    /// else that fits 24 bits, or an `ldc` against the constant pool.
    #[instrument(skip(self))]
    pub fn emit_ipush(&mut self, value: Int) {
        let dedicated = match value {
            0 => Some(Opcode::IPush0),
            1 => Some(Opcode::IPush1),
            2 => Some(Opcode::IPush2),
            -1 => Some(Opcode::IPushM1),
            _ => None,
        };
        if let Some(opc) = dedicated {
            self.emit(Instruction::pack_no_imm(opc));
            return;
        }
        if fits_i24(value) {
            self.emit(Instruction::pack_i24(Opcode::IPush, value as i32));
            return;
        }
        let key = self.pool.insert(RecordTag::Int, Record::from_int(value));
        self.emit_ldc(key);
    }

    /// Emits the best encoding for pushing a float constant: a dedicated
    /// opcode for `-1.0, 0.0, 0.5, 1.0, 2.0`, otherwise an `ldc` against
    /// the constant pool (floats never fit a 24-bit immediate, so there is
    /// no direct-push fallback the way there is for ints).
    #[instrument(skip(self))]
    pub fn emit_fpush(&mut self, value: Float) {
        let dedicated = if value == 0.0 {
            Some(Opcode::FPush0)
        } else if value == 1.0 {
            Some(Opcode::FPush1)
        } else if value == 2.0 {
            Some(Opcode::FPush2)
        } else if value == 0.5 {
            Some(Opcode::FPush05)
        } else if value == -1.0 {
            Some(Opcode::FPushM1)
        } else {
            None
        };
        if let Some(opc) = dedicated {
            self.emit(Instruction::pack_no_imm(opc));
            return;
        }
        let key = self.pool.insert(RecordTag::Float, Record::from_float(value));
        self.emit_ldc(key);
    }

    fn emit_ldc(&mut self, key: ConstKey) {
        self.emit(Instruction::pack_u24(Opcode::Ldc, key));
    }

    /// Finalizes and returns the instruction stream.
    pub fn finalize(&self) -> &[Instruction] {
        &self.instructions
    }

    /// The instruction stream, mutably - used by emitters (`neo-compiler`)
    /// that need to patch a jump target after emitting its body.
    pub fn instructions_mut(&mut self) -> &mut Vec<Instruction> {
        &mut self.instructions
    }

    /// Seals the instruction stream per `bc_finalize`: appends `HLT` if the
    /// stream is empty or doesn't already end with one, then shrinks the
    /// backing storage to fit. Does not insert a leading `NOP` - the
    /// compile driver emits that unconditionally as the first instruction
    /// of every unit, so by the time `seal` runs it is already there (or
    /// its absence is a compiler bug `validate` will catch).
    pub fn seal(&mut self) {
        let needs_hlt = match self.instructions.last() {
            Some(instr) => instr.opcode() != Opcode::Hlt,
            None => true,
        };
        if needs_hlt {
            self.emit(Instruction::pack_no_imm(Opcode::Hlt));
        }
        self.instructions.shrink_to_fit();
    }

    /// Validates the invariants `neo-vm` relies on before running this
    /// program: the stream is non-empty, starts with `NOP`, ends with
    /// `HLT`, and every `ldc`/`syscall` immediate addresses a real entry.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let first = self
            .instructions
            .first()
            .ok_or(ValidationError::Empty)?;
        if first.opcode() != Opcode::Nop {
            return Err(ValidationError::MissingLeadingNop);
        }
        let last = self.instructions.last().expect("checked non-empty above");
        if last.opcode() != Opcode::Hlt {
            return Err(ValidationError::MissingTrailingHlt);
        }
        for (index, instr) in self.instructions.iter().enumerate() {
            match instr.opcode() {
                Opcode::Ldc => {
                    let key = instr.imm_u24();
                    if !self.pool.contains(key) {
                        return Err(ValidationError::ConstPoolIndexOutOfRange { index, key });
                    }
                }
                Opcode::Syscall => {
                    let key = instr.imm_u24();
                    if crate::syscall::Syscall::from_u32(key).is_none() {
                        return Err(ValidationError::SyscallIndexOutOfRange { index, key });
                    }
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Number of instructions emitted.
    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Whether no instructions have been emitted.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Renders the instruction stream as human-readable disassembly, one
    /// line per instruction, matching `bc_disassemble`'s plain (uncolored)
    /// output.
    pub fn disassemble(&self) -> String {
        let mut out = String::new();
        for (i, instr) in self.instructions.iter().enumerate() {
            let opc = instr.opcode();
            use std::fmt::Write;
            match opc.imm_mode() {
                crate::opcode::ImmMode::None => {
                    let _ = writeln!(out, "{i:>6}: {}", opc.mnemonic());
                }
                crate::opcode::ImmMode::I24 => {
                    let _ = writeln!(out, "{i:>6}: {} #{}", opc.mnemonic(), instr.imm_i24());
                }
                crate::opcode::ImmMode::U24 => {
                    let imm = instr.imm_u24();
                    if opc == Opcode::Ldc {
                        if let Some(tagged) = self.pool.get(imm) {
                            let _ = writeln!(out, "{i:>6}: {} #{} ; {}", opc.mnemonic(), imm, tagged);
                            continue;
                        }
                    }
                    let _ = writeln!(out, "{i:>6}: {} #{}", opc.mnemonic(), imm);
                }
            }
        }
        out
    }
}

impl Default for Bytecode {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_ints_use_dedicated_opcodes() {
        let mut bc = Bytecode::new();
        bc.emit_ipush(-1);
        bc.emit_ipush(0);
        bc.emit_ipush(1);
        bc.emit_ipush(2);
        let ops: Vec<Opcode> = bc.finalize().iter().map(|i| i.opcode()).collect();
        assert_eq!(
            ops,
            vec![Opcode::IPushM1, Opcode::IPush0, Opcode::IPush1, Opcode::IPush2]
        );
        assert!(bc.pool().is_empty());
    }

    #[test]
    fn mid_range_int_uses_ipush_immediate() {
        let mut bc = Bytecode::new();
        bc.emit_ipush(12345);
        assert_eq!(bc.finalize()[0].opcode(), Opcode::IPush);
        assert_eq!(bc.finalize()[0].imm_i24(), 12345);
        assert!(bc.pool().is_empty());
    }

    #[test]
    fn huge_int_falls_back_to_constant_pool() {
        let mut bc = Bytecode::new();
        bc.emit_ipush(i64::MAX);
        assert_eq!(bc.finalize()[0].opcode(), Opcode::Ldc);
        assert_eq!(bc.pool().len(), 1);
    }

    #[test]
    fn dedicated_float_constants_skip_the_pool() {
        let mut bc = Bytecode::new();
        for v in [-1.0, 0.0, 0.5, 1.0, 2.0] {
            bc.emit_fpush(v);
        }
        assert!(bc.pool().is_empty());
        assert_eq!(bc.len(), 5);
    }

    #[test]
    fn other_floats_go_through_the_pool() {
        let mut bc = Bytecode::new();
        bc.emit_fpush(3.14);
        assert_eq!(bc.finalize()[0].opcode(), Opcode::Ldc);
        assert_eq!(bc.pool().len(), 1);
    }

    #[test]
    fn seal_appends_hlt_once() {
        let mut bc = Bytecode::new();
        bc.emit(Instruction::pack_no_imm(Opcode::Nop));
        bc.emit_ipush(1);
        bc.seal();
        assert_eq!(bc.finalize().last().unwrap().opcode(), Opcode::Hlt);
        let len_before = bc.len();
        bc.seal();
        assert_eq!(bc.len(), len_before, "sealing an already-sealed unit is a no-op");
    }

    #[test]
    fn validate_accepts_well_formed_unit() {
        let mut bc = Bytecode::new();
        bc.emit(Instruction::pack_no_imm(Opcode::Nop));
        bc.emit_ipush(1);
        bc.seal();
        assert!(bc.validate().is_ok());
    }

    #[test]
    fn validate_rejects_missing_leading_nop() {
        let mut bc = Bytecode::new();
        bc.emit_ipush(1);
        bc.seal();
        assert_eq!(bc.validate(), Err(ValidationError::MissingLeadingNop));
    }

    #[test]
    fn validate_rejects_out_of_range_ldc() {
        let mut bc = Bytecode::new();
        bc.emit(Instruction::pack_no_imm(Opcode::Nop));
        bc.emit(Instruction::pack_u24(Opcode::Ldc, 5));
        bc.seal();
        assert_eq!(
            bc.validate(),
            Err(ValidationError::ConstPoolIndexOutOfRange { index: 1, key: 5 })
        );
    }

    #[test]
    fn disassembly_mentions_loaded_constant() {
        let mut bc = Bytecode::new();
        bc.emit_fpush(3.14);
        let text = bc.disassemble();
        assert!(text.contains("ldc"));
        assert!(text.contains("3.14"));
    }
}
