//! The stack-based bytecode VM: an isolate's operand stack, GC heap, PRNG
//! and dispatch loop.
//!
//! Grounded on `neo_vm.h`/`neo_vm.c` in the original implementation, split
//! the way that source's own sections suggest: [`isolate`] for the
//! `vmisolate_t` struct and `vm_exec` dispatch loop, [`intrinsics`] for the
//! arithmetic/math helper functions the dispatch loop calls into, [`prng`]
//! for the Tausworthe generator, and [`interrupt`] for `vminterrupt_t`.

pub mod interrupt;
pub mod intrinsics;
pub mod isolate;
pub mod prng;

pub use interrupt::Interrupt;
pub use isolate::{
    Isolate, IsolateConfig, PostExecHook, PreExecHook, DEFAULT_STACK_BYTES, DEFAULT_STACK_ELEMS,
};
pub use prng::{secure_seed, PrngState};
