//! The VM isolate: an operand stack, a GC context, PRNG state, I/O handles
//! and the fetch-decode-execute dispatch loop that ties them together.
//!
//! Grounded on `vmisolate_t`/`vm_init`/`vm_exec` in the original's
//! `neo_vm.h`/`neo_vm.c`. The original's dispatcher walks a native pointer
//! into a heap-allocated operand stack and pre-increments it before every
//! fetch (skipping the mandatory leading `NOP` outright, since `NOP` has no
//! effect either way); this port keeps the stack as a plain `Vec<Record>`
//! indexed by `sp` and executes every instruction in the stream, leading
//! `NOP` included — an observably identical dispatch per spec §9's "mandates
//! observable behavior, not dispatch style."
//!
//! There is no opcode in this instruction set that ever allocates a
//! GC-managed object, so [`Isolate::gc`] currently sees no traffic from the
//! dispatch loop; it is still owned here because `vmisolate_t` owns its
//! `gc_context_t` and a `Ref` record is a first-class scalar in the data
//! model even though nothing yet produces one.
//!
//! Internal step helpers return `Result<(), Interrupt>`: `Ok(())` means
//! keep dispatching, `Err(interrupt)` means stop, whether that interrupt is
//! a failure or (for `HLT`) a normal completion. This is what lets every
//! fallible step use `?` instead of hand-rolled early returns.

use std::io::Write;

use neo_bytecode::{Bytecode, Instruction, Metaspace, Opcode, Syscall};
use neo_gc::GcContext;
use neo_types::fmt::{format_float, format_int, format_ptr};
use neo_types::isolate::next_isolate_id;
use neo_types::Record;
use tracing::instrument;

use crate::interrupt::Interrupt;
use crate::intrinsics;
use crate::prng::PrngState;

/// Default stack size in bytes (`VMSTK_DEFAULT_SIZE`): 1 MiB.
pub const DEFAULT_STACK_BYTES: usize = 1024 * 1024;
/// Default stack capacity in records (`VMSTK_DEFAULT_ELEMTS`): bytes / 8.
pub const DEFAULT_STACK_ELEMS: usize = DEFAULT_STACK_BYTES / 8;

/// A pre-execution hook, called just before the stack is reset and
/// dispatch begins.
pub type PreExecHook = fn(&Isolate, &Bytecode);
/// A post-execution hook, called once dispatch has stopped, with the
/// interrupt it stopped on.
pub type PostExecHook = fn(&Isolate, &Bytecode, Interrupt);

/// Construction parameters for an [`Isolate`].
pub struct IsolateConfig {
    /// The isolate's name, for diagnostics only.
    pub name: String,
    /// Operand stack capacity in records. Must be at least 2 (the
    /// sentinel slot plus one usable slot).
    pub stack_capacity: usize,
    /// An explicit PRNG seed; `None` seeds from the isolate's own id, as
    /// `vm_init` does.
    pub prng_seed: Option<f64>,
}

impl Default for IsolateConfig {
    fn default() -> Self {
        IsolateConfig {
            name: String::new(),
            stack_capacity: DEFAULT_STACK_ELEMS,
            prng_seed: None,
        }
    }
}

/// A single-threaded bytecode execution context: operand stack, GC heap,
/// PRNG, I/O, and invocation bookkeeping.
pub struct Isolate {
    name: String,
    id: u64,
    stack: Vec<Record>,
    sp: usize,
    sps: usize,
    spe: usize,
    gc: GcContext,
    prng: PrngState,
    io_output: Box<dyn Write>,
    invocs: u32,
    invocs_ok: u32,
    invocs_err: u32,
    interrupt: Interrupt,
    pre_exec_hook: Option<PreExecHook>,
    post_exec_hook: Option<PostExecHook>,
}

impl Isolate {
    /// Builds an isolate with default configuration and the given name.
    pub fn new(name: impl Into<String>) -> Self {
        Isolate::with_config(IsolateConfig {
            name: name.into(),
            ..Default::default()
        })
    }

    /// Builds an isolate from an explicit configuration, matching
    /// `vm_init`: allocates the stack, seeds its id from the process-global
    /// counter mixed with the current thread, and seeds the PRNG from that
    /// id unless the caller supplied an explicit seed.
    pub fn with_config(config: IsolateConfig) -> Self {
        let cap = config.stack_capacity.max(2);
        let mut stack = vec![Record::from_bits(0); cap];
        stack[0] = Record::from_bits(u64::MAX);
        let id = next_isolate_id() as u64;
        let prng = match config.prng_seed {
            Some(seed) => PrngState::seed_from_f64(seed),
            None => PrngState::seed_from_f64((id >> 32) as f64),
        };
        Isolate {
            name: config.name,
            id,
            stack,
            sp: 0,
            sps: 1,
            spe: cap - 1,
            gc: GcContext::new(),
            prng,
            io_output: Box::new(std::io::stdout()),
            invocs: 0,
            invocs_ok: 0,
            invocs_err: 0,
            interrupt: Interrupt::Ok,
            pre_exec_hook: None,
            post_exec_hook: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn gc(&self) -> &GcContext {
        &self.gc
    }

    pub fn gc_mut(&mut self) -> &mut GcContext {
        &mut self.gc
    }

    pub fn prng_mut(&mut self) -> &mut PrngState {
        &mut self.prng
    }

    /// Redirects syscall output, e.g. to a `Vec<u8>` for test capture.
    pub fn set_io_output(&mut self, output: Box<dyn Write>) {
        self.io_output = output;
    }

    pub fn set_pre_exec_hook(&mut self, hook: PreExecHook) {
        self.pre_exec_hook = Some(hook);
    }

    pub fn set_post_exec_hook(&mut self, hook: PostExecHook) {
        self.post_exec_hook = Some(hook);
    }

    /// The interrupt the most recent [`Isolate::execute`] call stopped on.
    pub fn interrupt(&self) -> Interrupt {
        self.interrupt
    }

    pub fn invocation_count(&self) -> u32 {
        self.invocs
    }

    pub fn invocation_count_ok(&self) -> u32 {
        self.invocs_ok
    }

    pub fn invocation_count_err(&self) -> u32 {
        self.invocs_err
    }

    /// Number of records currently pushed past the sentinel slot.
    pub fn stack_depth(&self) -> usize {
        self.sp
    }

    /// The stack's live words, sentinel slot included, as a conservative GC
    /// root scan buffer — the operand-stack counterpart of the original's
    /// native-stack word scan.
    pub fn gc_roots(&self) -> Vec<u64> {
        self.stack[..=self.sp].iter().map(|r| r.to_bits()).collect()
    }

    /// Runs `bcode` to completion (`HLT`) or until an interrupt stops it,
    /// matching `vm_exec`. The stack is reset to empty (sentinel only)
    /// before dispatch begins, so each call starts from a clean slate.
    ///
    /// # Panics
    /// Panics (via `debug_assert`) if `bcode` doesn't start with `NOP` and
    /// end with `HLT` — callers are expected to have run
    /// [`neo_bytecode::Bytecode::validate`] first, exactly as `vm_exec`
    /// asserts those invariants rather than returning an interrupt for
    /// them.
    #[instrument(skip(self, bcode), fields(isolate = %self.name, id = self.id))]
    pub fn execute(&mut self, bcode: &Bytecode) -> Interrupt {
        let instrs = bcode.finalize();
        debug_assert!(!instrs.is_empty(), "bytecode unit has no instructions");
        debug_assert_eq!(
            instrs.first().map(|i| i.opcode()),
            Some(Opcode::Nop),
            "first instruction must be NOP"
        );
        debug_assert_eq!(
            instrs.last().map(|i| i.opcode()),
            Some(Opcode::Hlt),
            "last instruction must be HLT"
        );

        if let Some(hook) = self.pre_exec_hook {
            hook(self, bcode);
        }

        self.sp = 0;
        self.stack[0] = Record::from_bits(u64::MAX);

        let mut ip = 0usize;
        let interrupt = loop {
            let instr = instrs[ip];
            ip += 1;
            match self.step(instr, bcode.pool()) {
                Ok(()) => {}
                Err(interrupt) => break interrupt,
            }
        };

        self.interrupt = interrupt;
        self.invocs += 1;
        if interrupt.is_ok() {
            self.invocs_ok += 1;
        } else {
            self.invocs_err += 1;
        }
        if let Some(hook) = self.post_exec_hook {
            hook(self, bcode, interrupt);
        }
        interrupt
    }

    /// Executes one instruction. `Ok(())` keeps dispatch running;
    /// `Err(interrupt)` stops it, `HLT` included (it stops with
    /// `Interrupt::Ok`, a genuine non-error completion carried through the
    /// same channel as a real failure would be).
    #[instrument(level = "trace", skip(self, pool), fields(opcode = %instr.opcode()))]
    fn step(&mut self, instr: Instruction, pool: &Metaspace) -> Result<(), Interrupt> {
        use Opcode::*;
        match instr.opcode() {
            Hlt => return Err(Interrupt::Ok),
            Nop => {}
            Syscall => {
                let call_id = instr.imm_u24();
                let syscall = Syscall::from_u32(call_id).ok_or(Interrupt::SysSyscall)?;
                self.check_underflow(0)?;
                self.dispatch_syscall(syscall)?;
                self.sp -= 1;
            }
            IPush => self.push(Record::from_int(instr.imm_i24() as i64))?,
            IPush0 => self.push(Record::from_int(0))?,
            IPush1 => self.push(Record::from_int(1))?,
            IPush2 => self.push(Record::from_int(2))?,
            IPushM1 => self.push(Record::from_int(-1))?,
            FPush0 => self.push(Record::from_float(0.0))?,
            FPush1 => self.push(Record::from_float(1.0))?,
            FPush2 => self.push(Record::from_float(2.0))?,
            FPush05 => self.push(Record::from_float(0.5))?,
            FPushM1 => self.push(Record::from_float(-1.0))?,
            Pop => {
                self.check_underflow(0)?;
                self.sp -= 1;
            }
            Ldc => {
                let key = instr.imm_u24();
                let tagged = pool.get(key).ok_or(Interrupt::SysSyscall)?;
                self.push(tagged.record)?;
            }
            IAdd => self.checked_binop(i64::checked_add)?,
            ISub => self.checked_binop(i64::checked_sub)?,
            IMul => self.checked_binop(i64::checked_mul)?,
            IPow => self.checked_binop(intrinsics::ipow64_checked)?,
            IAddO => self.wrapping_binop(i64::wrapping_add)?,
            ISubO => self.wrapping_binop(i64::wrapping_sub)?,
            IMulO => self.wrapping_binop(i64::wrapping_mul)?,
            IPowO => self.wrapping_binop(|a, b| intrinsics::ipow64_wrapping(a, b))?,
            IDiv => self.div_or_mod(true)?,
            IMod => self.div_or_mod(false)?,
            IAnd => self.wrapping_binop(|a, b| a & b)?,
            IOr => self.wrapping_binop(|a, b| a | b)?,
            IXor => self.wrapping_binop(|a, b| a ^ b)?,
            ISal => self.shift_op(|a, n| a << n)?,
            ISar => self.shift_op(|a, n| a >> n)?,
            ISlr => self.shift_op(|a, n| ((a as u64) >> n) as i64)?,
            IRol => self.shift_op(|a, n| (a as u64).rotate_left(n) as i64)?,
            IRor => self.shift_op(|a, n| (a as u64).rotate_right(n) as i64)?,
        }
        Ok(())
    }

    fn push(&mut self, record: Record) -> Result<(), Interrupt> {
        if self.sp + 1 > self.spe {
            return Err(Interrupt::StackOverflow);
        }
        self.sp += 1;
        self.stack[self.sp] = record;
        Ok(())
    }

    /// Checks that the top-of-stack record (always read) plus `n` further
    /// records beneath it are all live, i.e. that `sp >= sps + n`. `n = 0`
    /// for an operation that only ever touches the top slot (`Pop`, the
    /// operand a `Syscall` consumes); `n = 1` for a binary operator, which
    /// reads both the top slot and the one directly beneath it. Unlike the
    /// original, which reads the would-be operands before this check ever
    /// runs (safe there only because a verified bytecode stream never
    /// actually underflows), this port checks first so an out-of-range
    /// `Vec` index is never possible even for a malformed stream.
    fn check_underflow(&self, n: usize) -> Result<(), Interrupt> {
        if self.sp < self.sps + n {
            Err(Interrupt::StackUnderflow)
        } else {
            Ok(())
        }
    }

    fn checked_binop(&mut self, f: impl Fn(i64, i64) -> Option<i64>) -> Result<(), Interrupt> {
        self.check_underflow(1)?;
        let a = self.stack[self.sp - 1].as_int();
        let b = self.stack[self.sp].as_int();
        let result = f(a, b).ok_or(Interrupt::ArithOverflow)?;
        self.stack[self.sp - 1] = Record::from_int(result);
        self.sp -= 1;
        Ok(())
    }

    fn wrapping_binop(&mut self, f: impl Fn(i64, i64) -> i64) -> Result<(), Interrupt> {
        self.check_underflow(1)?;
        let a = self.stack[self.sp - 1].as_int();
        let b = self.stack[self.sp].as_int();
        self.stack[self.sp - 1] = Record::from_int(f(a, b));
        self.sp -= 1;
        Ok(())
    }

    fn shift_op(&mut self, f: impl Fn(i64, u32) -> i64) -> Result<(), Interrupt> {
        self.check_underflow(1)?;
        let a = self.stack[self.sp - 1].as_int();
        let n = (self.stack[self.sp].as_int() as u64 & 63) as u32;
        self.stack[self.sp - 1] = Record::from_int(f(a, n));
        self.sp -= 1;
        Ok(())
    }

    /// `idiv`/`imod`, matching `z_op`: zero divisor traps `ArithZeroDiv`;
    /// `i64::MIN / -1` saturates to `i64::MIN` rather than panicking on the
    /// two's-complement corner case (`i64::MIN % -1` is always `0`, which
    /// never overflows, so modulo needs no such case).
    fn div_or_mod(&mut self, is_div: bool) -> Result<(), Interrupt> {
        self.check_underflow(1)?;
        let a = self.stack[self.sp - 1].as_int();
        let b = self.stack[self.sp].as_int();
        if b == 0 {
            return Err(Interrupt::ArithZeroDiv);
        }
        let result = if a == i64::MIN && b == -1 {
            if is_div {
                i64::MIN
            } else {
                0
            }
        } else if is_div {
            a / b
        } else {
            a % b
        };
        self.stack[self.sp - 1] = Record::from_int(result);
        self.sp -= 1;
        Ok(())
    }

    /// Renders the top of stack and writes it to [`Isolate::set_io_output`].
    /// `PrintInt`/`PrintFloat`/`PrintPtr` go through the same
    /// [`neo_types::fmt`] helpers the disassembler uses, so a dumped
    /// constant and a printed runtime value always read identically.
    fn dispatch_syscall(&mut self, syscall: Syscall) -> Result<(), Interrupt> {
        let top = self.stack[self.sp];
        let result = match syscall {
            Syscall::PrintInt => write!(self.io_output, "{}", format_int(top.as_int())),
            Syscall::PrintFloat => write!(self.io_output, "{}", format_float(top.as_float())),
            Syscall::PrintBool => write!(self.io_output, "{}", top.as_bool()),
            Syscall::PrintChar => write!(self.io_output, "{}", top.as_char()),
            Syscall::PrintPtr => write!(self.io_output, "{}", format_ptr(top.as_ref().0)),
        };
        result.map_err(|_| Interrupt::SysSyscall)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use neo_bytecode::Instruction;

    fn isolate() -> Isolate {
        let mut iso = Isolate::new("test");
        iso.set_io_output(Box::new(Vec::new()));
        iso
    }

    #[test]
    fn halts_cleanly_on_a_minimal_program() {
        let mut bc = Bytecode::new();
        bc.emit(Instruction::pack_no_imm(Opcode::Nop));
        bc.seal();
        let mut iso = isolate();
        assert_eq!(iso.execute(&bc), Interrupt::Ok);
        assert_eq!(iso.invocation_count(), 1);
        assert_eq!(iso.invocation_count_ok(), 1);
    }

    #[test]
    fn arithmetic_pushes_and_adds() {
        let mut bc = Bytecode::new();
        bc.emit(Instruction::pack_no_imm(Opcode::Nop));
        bc.emit_ipush(2);
        bc.emit_ipush(3);
        bc.emit(Instruction::pack_no_imm(Opcode::IAdd));
        bc.seal();
        let mut iso = isolate();
        assert_eq!(iso.execute(&bc), Interrupt::Ok);
        assert_eq!(iso.stack_depth(), 1);
    }

    #[test]
    fn checked_add_overflow_raises_arith_overflow() {
        let mut bc = Bytecode::new();
        bc.emit(Instruction::pack_no_imm(Opcode::Nop));
        bc.emit_ipush(i64::MAX);
        bc.emit_ipush(1);
        bc.emit(Instruction::pack_no_imm(Opcode::IAdd));
        bc.seal();
        let mut iso = isolate();
        assert_eq!(iso.execute(&bc), Interrupt::ArithOverflow);
    }

    #[test]
    fn wrapping_add_overflow_does_not_raise() {
        let mut bc = Bytecode::new();
        bc.emit(Instruction::pack_no_imm(Opcode::Nop));
        bc.emit_ipush(i64::MAX);
        bc.emit_ipush(1);
        bc.emit(Instruction::pack_no_imm(Opcode::IAddO));
        bc.seal();
        let mut iso = isolate();
        assert_eq!(iso.execute(&bc), Interrupt::Ok);
    }

    #[test]
    fn division_by_zero_traps() {
        let mut bc = Bytecode::new();
        bc.emit(Instruction::pack_no_imm(Opcode::Nop));
        bc.emit_ipush(1);
        bc.emit_ipush(0);
        bc.emit(Instruction::pack_no_imm(Opcode::IDiv));
        bc.seal();
        let mut iso = isolate();
        assert_eq!(iso.execute(&bc), Interrupt::ArithZeroDiv);
    }

    #[test]
    fn min_int_divided_by_minus_one_saturates() {
        let mut bc = Bytecode::new();
        bc.emit(Instruction::pack_no_imm(Opcode::Nop));
        bc.emit_ipush(i64::MIN);
        bc.emit_ipush(-1);
        bc.emit(Instruction::pack_no_imm(Opcode::IDiv));
        bc.seal();
        let mut iso = isolate();
        assert_eq!(iso.execute(&bc), Interrupt::Ok);
    }

    #[test]
    fn pop_on_empty_stack_underflows() {
        let mut bc = Bytecode::new();
        bc.emit(Instruction::pack_no_imm(Opcode::Nop));
        bc.emit(Instruction::pack_no_imm(Opcode::Pop));
        bc.seal();
        let mut iso = isolate();
        assert_eq!(iso.execute(&bc), Interrupt::StackUnderflow);
    }

    #[test]
    fn overflowing_the_stack_is_reported() {
        let mut bc = Bytecode::new();
        bc.emit(Instruction::pack_no_imm(Opcode::Nop));
        for _ in 0..20 {
            bc.emit_ipush(1);
        }
        bc.seal();
        let mut iso = Isolate::with_config(IsolateConfig {
            stack_capacity: 4,
            ..Default::default()
        });
        iso.set_io_output(Box::new(Vec::new()));
        assert_eq!(iso.execute(&bc), Interrupt::StackOverflow);
    }

    #[test]
    fn unknown_syscall_number_is_reported() {
        let mut bc = Bytecode::new();
        bc.emit(Instruction::pack_no_imm(Opcode::Nop));
        bc.emit_ipush(1);
        bc.emit(Instruction::pack_u24(Opcode::Syscall, 99));
        bc.seal();
        let mut iso = isolate();
        assert_eq!(iso.execute(&bc), Interrupt::SysSyscall);
    }

    #[test]
    fn print_int_syscall_writes_the_top_of_stack() {
        let out = std::sync::Arc::new(std::sync::Mutex::new(Vec::new()));
        struct Sink(std::sync::Arc<std::sync::Mutex<Vec<u8>>>);
        impl Write for Sink {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }
            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }
        let mut bc = Bytecode::new();
        bc.emit(Instruction::pack_no_imm(Opcode::Nop));
        bc.emit_ipush(42);
        bc.emit(Instruction::pack_u24(Opcode::Syscall, Syscall::PrintInt as u32));
        bc.seal();
        let mut iso = Isolate::new("test");
        iso.set_io_output(Box::new(Sink(out.clone())));
        assert_eq!(iso.execute(&bc), Interrupt::Ok);
        assert_eq!(&*out.lock().unwrap(), b"42");
    }

    #[test]
    fn shift_amounts_are_masked_to_six_bits() {
        let mut bc = Bytecode::new();
        bc.emit(Instruction::pack_no_imm(Opcode::Nop));
        bc.emit_ipush(1);
        bc.emit_ipush(64);
        bc.emit(Instruction::pack_no_imm(Opcode::ISal));
        bc.seal();
        let mut iso = isolate();
        assert_eq!(iso.execute(&bc), Interrupt::Ok);
    }

    #[test]
    fn stack_resets_between_runs() {
        let mut bc = Bytecode::new();
        bc.emit(Instruction::pack_no_imm(Opcode::Nop));
        bc.emit_ipush(1);
        bc.seal();
        let mut iso = isolate();
        iso.execute(&bc);
        assert_eq!(iso.stack_depth(), 1);
        iso.execute(&bc);
        assert_eq!(iso.stack_depth(), 1);
    }
}
