//! Compile-time diagnostics: why emission or validation failed, and the
//! caller-facing summary that bundles them with any parse errors.
//!
//! Grounded on spec §6's "Diagnostics" shape (file/line/column/lexeme/
//! source-line per error) and §7's note that `neo-compiler` wraps
//! lower-level errors for the caller rather than just propagating them
//! raw, the one place in this repository that reaches for
//! `anyhow`-style outer-layer error aggregation rather than a single
//! `thiserror` enum.

use neo_bytecode::ValidationError;
use neo_parser::ParseError;

/// Why the AST-to-bytecode emitter or the post-emission validator
/// rejected a program.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CompileError {
    /// An AST node has no bytecode counterpart in this instruction set.
    ///
    /// The 33-opcode table `neo-bytecode` defines has no call, jump, or
    /// variable-storage instructions - it is a straight-line integer
    /// arithmetic machine with constant pushes and a handful of print
    /// syscalls. Function/class declarations, control flow, variables,
    /// assignment, comparisons, logical operators and calls (including
    /// `Dot`) all fall outside that, so the emitter rejects them here
    /// rather than inventing bytecode sequences no syntax in the
    /// language actually asked for.
    #[error("{kind} is not representable in this bytecode format")]
    UnsupportedNode {
        /// [`neo_ast::AstNode::kind_name`] of the offending node.
        kind: &'static str,
    },
    /// Emission produced a bytecode unit that failed
    /// [`neo_bytecode::Bytecode::validate`] - an emitter bug, surfaced as
    /// data rather than a panic so a caller can still report it cleanly.
    #[error("emitted bytecode failed validation: {0}")]
    Invalid(#[from] ValidationError),
}

/// Every diagnostic produced compiling one source file: parse errors (the
/// parser recovers from these, so there can be several) and the compile
/// errors the emitter raised walking the resulting AST.
///
/// Mirrors [`neo_parser::parser::ParseOutcome`]'s "always return what you
/// have" philosophy - a `CompileSummary` is only ever constructed when at
/// least one diagnostic exists, but it carries both error phases' worth at
/// once so a caller sees everything wrong in one report rather than
/// fixing one error to uncover the next.
#[derive(Debug, Clone, PartialEq)]
pub struct CompileSummary<'src> {
    pub parse_errors: Vec<ParseError<'src>>,
    pub compile_errors: Vec<CompileError>,
}

impl<'src> CompileSummary<'src> {
    pub(crate) fn new(parse_errors: Vec<ParseError<'src>>, compile_errors: Vec<CompileError>) -> Self {
        CompileSummary { parse_errors, compile_errors }
    }

    /// Total number of diagnostics across both phases.
    pub fn len(&self) -> usize {
        self.parse_errors.len() + self.compile_errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Display for CompileSummary<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} parse error(s), {} compile error(s)",
            self.parse_errors.len(),
            self.compile_errors.len()
        )?;
        for err in &self.parse_errors {
            writeln!(f, "  {err}")?;
        }
        for err in &self.compile_errors {
            writeln!(f, "  {err}")?;
        }
        Ok(())
    }
}

impl std::error::Error for CompileSummary<'_> {}
