//! The compile driver: wires source text through the lexer, the parser,
//! the bytecode emitter and the post-emission validator.
//!
//! Grounded on spec §2's component C8 ("glue: source -> lexer -> parser ->
//! (emitter) -> validate") and the data-flow line in the same section. This
//! is the one crate in the workspace that depends on every other piece -
//! `neo-lexer`, `neo-ast`, `neo-parser`, `neo-bytecode`, `neo-vm` - since
//! driving that whole pipeline end to end is its entire purpose. Nothing
//! downstream of `neo-compiler` exists; the command-line surface spec §6
//! describes is an external collaborator built on top of [`compile`] and
//! [`run`].

pub mod emitter;
pub mod error;
pub mod source;

use neo_bytecode::Bytecode;
use neo_lexer::{Lexer, SourceFile};
use neo_vm::{Interrupt, Isolate};

pub use error::{CompileError, CompileSummary};
pub use source::{LoadedSource, SourceError};

/// Lexes, parses and emits bytecode for one source file.
///
/// Returns the finished [`Bytecode`] unit on success. On failure, returns
/// every parse error the parser recovered past plus, if parsing succeeded
/// well enough to reach emission, the first emission error encountered -
/// matching spec §7's propagation policy: lex/parse errors accumulate,
/// emission errors are pre-run rejections, and a non-empty error set fails
/// the compile outright rather than handing back a partial program.
pub fn compile<'src>(source: SourceFile<'src>) -> Result<Bytecode, CompileSummary<'src>> {
    let tokens = Lexer::new(source).drain();
    let outcome = neo_parser::parse(tokens);
    if !outcome.errors.is_empty() {
        return Err(CompileSummary::new(outcome.errors, Vec::new()));
    }

    let bytecode = match emitter::emit_module(&outcome.pool, outcome.root) {
        Ok(bc) => bc,
        Err(e) => return Err(CompileSummary::new(Vec::new(), vec![e])),
    };

    if let Err(validation_err) = bytecode.validate() {
        return Err(CompileSummary::new(Vec::new(), vec![CompileError::Invalid(validation_err)]));
    }

    Ok(bytecode)
}

/// Compiles `source` and, on success, runs the result to completion on a
/// fresh [`Isolate`] named after the source file.
///
/// This is the programmatic entry point spec §6 asks the core to expose in
/// place of the out-of-scope `neo <source-file>` command-line driver: load
/// a buffer, compile it, run it, report success or the interrupt that
/// stopped it.
pub fn compile_and_run<'src>(source: SourceFile<'src>) -> Result<Interrupt, CompileSummary<'src>> {
    let bytecode = compile(source)?;
    let mut isolate = Isolate::new(source.name);
    Ok(isolate.execute(&bytecode))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn compiles_and_runs_a_straight_line_arithmetic_program() {
        let src = LoadedSource::borrowed("t.neo", "(10 + 2) * 3\n");
        let interrupt = compile_and_run(src.as_source_file()).expect("compile should succeed");
        assert_eq!(interrupt, Interrupt::Ok);
    }

    #[test]
    fn reports_parse_errors_without_attempting_emission() {
        let src = LoadedSource::borrowed("t.neo", "let\n");
        let summary = compile(src.as_source_file()).unwrap_err();
        assert!(!summary.parse_errors.is_empty());
        assert!(summary.compile_errors.is_empty());
    }

    #[test]
    fn reports_emission_errors_for_unrepresentable_nodes() {
        let src = LoadedSource::borrowed("t.neo", "let x:int = 1\n");
        let summary = compile(src.as_source_file()).unwrap_err();
        assert!(summary.parse_errors.is_empty());
        assert_eq!(summary.compile_errors.len(), 1);
    }

    #[test]
    fn division_by_zero_is_surfaced_as_a_runtime_interrupt() {
        let src = LoadedSource::borrowed("t.neo", "1 / 0\n");
        let interrupt = compile_and_run(src.as_source_file()).expect("compile should succeed");
        assert_eq!(interrupt, Interrupt::ArithZeroDiv);
    }
}
