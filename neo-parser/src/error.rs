//! Parse diagnostics.
//!
//! Grounded on spec §6/§7's diagnostic shape: every error carries enough
//! to render a caret-style message (file, 1-based line/column, the
//! offending lexeme, and the full source line it sits on) without the
//! parser having to format text eagerly - `neo-compiler`'s summary is the
//! only thing that actually renders these.

use neo_lexer::SourceSpan;

/// What kind of parse failure occurred, independent of *where*.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseErrorKind {
    /// Parser expected one of a small set of tokens and found something
    /// else.
    #[error("expected {expected}, found {found:?}")]
    UnexpectedToken {
        expected: &'static str,
        found: neo_lexer::TokenKind,
    },
    /// No prefix parse rule exists for the current token - it can't begin
    /// an expression.
    #[error("token {found:?} cannot start an expression")]
    InvalidExpressionHead { found: neo_lexer::TokenKind },
    /// The left-hand side of an assignment isn't an lvalue.
    #[error("left-hand side of assignment is not assignable")]
    AssignToNonLvalue,
    /// `break` outside a loop body.
    #[error("'break' outside a loop")]
    BreakOutsideLoop,
    /// `continue` outside a loop body.
    #[error("'continue' outside a loop")]
    ContinueOutsideLoop,
    /// `return` outside a function body (at module level).
    #[error("'return' outside a function")]
    ReturnOutsideFunction,
    /// A statement kind isn't permitted in the enclosing scope (e.g. a
    /// `while` loop written directly inside a class body).
    #[error("statement not permitted in this scope")]
    StatementNotPermittedHere,
    /// An integer or float literal's lexeme didn't scan cleanly.
    #[error("malformed numeric literal {lexeme:?}")]
    MalformedNumber { lexeme: String },
    /// A bare identifier used as a whole statement - Neo requires an
    /// expression statement to have some effect (assignment or call).
    #[error("a bare identifier is not a valid statement")]
    BareIdentifierStatement,
    /// Parse depth for a single block exceeded the 16384 recursion guard.
    /// Fatal: parsing of the enclosing unit aborts rather than recording
    /// this and continuing.
    #[error("parse depth limit (16384) exceeded")]
    DepthExceeded,
    /// Source ran out before a required closing token was found.
    #[error("unexpected end of file, expected {expected}")]
    UnexpectedEof { expected: &'static str },
}

/// One recorded parse error, with enough context to render a diagnostic.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{file}:{line}:{col}: {kind} (near {lexeme:?})")]
pub struct ParseError<'src> {
    pub kind: ParseErrorKind,
    pub file: &'src str,
    pub line: u32,
    pub col: u32,
    pub lexeme: SourceSpan<'src>,
    pub source_line: SourceSpan<'src>,
}
