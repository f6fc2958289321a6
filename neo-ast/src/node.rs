//! AST node payloads.
//!
//! Transcribed from the `nodedef` X-macro and its twenty `node_*_t` structs
//! in the original's `neo_ast.h`. Where the original put node data behind a
//! tagged union (`astnode_t.dat`), `AstNode` is a plain Rust enum - the
//! safe, idiomatic equivalent once every variant fits in the same pool
//! slot size.

use neo_types::{Bool, Char, Float, Int};

use crate::ops::{BinaryOpType, UnaryOpType};
use crate::refs::{AstRef, ListRef};
use crate::scope::{BlockScope, VariableScope};
use neo_lexer::{SourceSpan, Token};

/// A parse error recorded in place of the node that failed to parse.
///
/// Keeping the failing token around (rather than just a message) lets a
/// caller re-point a diagnostic at the exact source location without the
/// parser having to format one eagerly.
#[derive(Debug, Clone, PartialEq)]
pub struct ErrorNode<'src> {
    pub message: String,
    pub token: Token<'src>,
}

/// A parenthesized sub-expression, e.g. `(a + b)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GroupNode {
    pub child: AstRef,
}

/// `not x`, `-x`, `++x`, ...
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnaryOpNode {
    pub op: UnaryOpType,
    pub expr: AstRef,
}

/// `a + b`, `a = b`, `a.b`, `callee(args)`, ...
///
/// `right` is optional only for [`BinaryOpType::Call`] with an empty
/// argument list (`f()`), matching the invariant in spec §3: "a binary op
/// whose right child is an ArgList block or NULL." Every other operator
/// always supplies a right operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BinaryOpNode {
    pub op: BinaryOpType,
    pub left: AstRef,
    pub right: Option<AstRef>,
}

/// A method declaration: `func name(params) -> ret ... end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodNode {
    pub ident: AstRef,
    pub params: Option<AstRef>,
    pub ret_type: Option<AstRef>,
    pub body: Option<AstRef>,
    pub is_static: bool,
}

/// A block of statements, e.g. a method body, class body or argument list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockNode {
    pub scope: BlockScope,
    pub children: ListRef,
}

/// `let name: type = init`, a parameter, or a class field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct VariableNode {
    pub scope: VariableScope,
    pub ident: AstRef,
    pub ty: Option<AstRef>,
    pub init: Option<AstRef>,
}

/// `return expr` or a bare `return`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReturnNode {
    pub expr: Option<AstRef>,
}

/// `if cond then ... else ... end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BranchNode {
    pub cond: AstRef,
    pub then_block: AstRef,
    pub else_block: Option<AstRef>,
}

/// `while cond do ... end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LoopNode {
    pub cond: AstRef,
    pub body: AstRef,
}

/// `class name ... end`, or `static class name ... end` at module scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ClassNode {
    pub ident: AstRef,
    pub body: Option<AstRef>,
    pub is_static: bool,
}

/// `module name ... end`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ModuleNode {
    pub ident: AstRef,
    pub body: Option<AstRef>,
}

/// An identifier literal: a source span plus its precomputed FNV-1a hash.
///
/// Grounded on `node_ident_literal_t` in the original - identifiers need no
/// escape processing, so (unlike [`StringLiteral`]) this borrows the
/// source span directly rather than allocating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SpanLiteral<'src> {
    pub span: SourceSpan<'src>,
    pub hash: u32,
}

impl<'src> SpanLiteral<'src> {
    pub fn new(span: SourceSpan<'src>) -> Self {
        SpanLiteral {
            span,
            hash: span.fnv1a(),
        }
    }
}

/// A string literal: an owned, escape-processed byte buffer plus its
/// content hash.
///
/// Grounded on `node_string_literal_t` in the original, which the header
/// aliases to the same shape as the ident literal; per spec §3/§9 this
/// repository keeps the two physically distinct in Rust, since a string
/// literal allocates (it must unescape `\n \t \\ \v \r` out of the raw
/// lexeme) while an ident literal never does. Freeing this node means
/// dropping `bytes` - exactly the "destruction must free it" invariant the
/// original enforces by hand at pool-free time.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct StringLiteral {
    pub bytes: Box<[u8]>,
    pub hash: u32,
}

impl StringLiteral {
    /// Builds a string literal from its already-escape-processed bytes.
    pub fn new(bytes: Vec<u8>) -> Self {
        let hash = neo_lexer::fnv1a_hash(&bytes);
        StringLiteral {
            bytes: bytes.into_boxed_slice(),
            hash,
        }
    }

    /// The literal's content as text, lossily if it somehow isn't valid
    /// UTF-8 (escape processing never produces invalid UTF-8 from a
    /// UTF-8 source, so this always succeeds in practice).
    pub fn as_str(&self) -> &str {
        std::str::from_utf8(&self.bytes).unwrap_or("")
    }
}

/// One of the twenty AST node kinds, exactly the `nodedef` list: leaf nodes
/// first (per the original's ordering convention), then composite nodes.
#[derive(Debug, Clone, PartialEq)]
pub enum AstNode<'src> {
    Error(ErrorNode<'src>),
    Break,
    Continue,
    IntLit(Int),
    FloatLit(Float),
    CharLit(Char),
    BoolLit(Bool),
    StringLit(StringLiteral),
    IdentLit(SpanLiteral<'src>),
    Group(GroupNode),
    UnaryOp(UnaryOpNode),
    BinaryOp(BinaryOpNode),
    Method(MethodNode),
    Block(BlockNode),
    Variable(VariableNode),
    Return(ReturnNode),
    Branch(BranchNode),
    Loop(LoopNode),
    Class(ClassNode),
    Module(ModuleNode),
}

impl<'src> AstNode<'src> {
    /// Mnemonic name matching the original's `nodedef` second column,
    /// e.g. `"BINARY OP"`.
    pub fn kind_name(&self) -> &'static str {
        match self {
            AstNode::Error(_) => "ERROR",
            AstNode::Break => "BREAK",
            AstNode::Continue => "CONTINUE",
            AstNode::IntLit(_) => "INT",
            AstNode::FloatLit(_) => "FLOAT",
            AstNode::CharLit(_) => "CHAR",
            AstNode::BoolLit(_) => "BOOL",
            AstNode::StringLit(_) => "STRING",
            AstNode::IdentLit(_) => "IDENT",
            AstNode::Group(_) => "GROUP",
            AstNode::UnaryOp(_) => "UNARY OP",
            AstNode::BinaryOp(_) => "BINARY OP",
            AstNode::Method(_) => "METHOD",
            AstNode::Block(_) => "BLOCK",
            AstNode::Variable(_) => "VARIABLE",
            AstNode::Return(_) => "RETURN",
            AstNode::Branch(_) => "BRANCH",
            AstNode::Loop(_) => "LOOP",
            AstNode::Class(_) => "CLASS",
            AstNode::Module(_) => "MODULE",
        }
    }

    /// Hulls: nodes with no children or data, matching `ASTNODE_HULL_MASK`.
    pub fn is_hull(&self) -> bool {
        matches!(self, AstNode::Break | AstNode::Continue)
    }

    /// Literals, matching `ASTNODE_LITERAL_MASK`.
    pub fn is_literal(&self) -> bool {
        matches!(
            self,
            AstNode::IntLit(_)
                | AstNode::FloatLit(_)
                | AstNode::CharLit(_)
                | AstNode::BoolLit(_)
                | AstNode::StringLit(_)
                | AstNode::IdentLit(_)
        )
    }

    /// Leaves: hulls or literals, matching `ASTNODE_LEAF_MASK`. All hulls
    /// are also leaves.
    pub fn is_leaf(&self) -> bool {
        self.is_hull() || self.is_literal()
    }

    /// Expression-producing nodes, matching `ASTNODE_EXPR_MASK`.
    pub fn is_expr(&self) -> bool {
        self.is_literal() || matches!(self, AstNode::UnaryOp(_) | AstNode::BinaryOp(_) | AstNode::Group(_))
    }

    /// Control-flow nodes, matching `ASTNODE_CONTROL_FLOW`.
    pub fn is_control_flow(&self) -> bool {
        matches!(
            self,
            AstNode::Branch(_) | AstNode::Return(_) | AstNode::Loop(_) | AstNode::Break | AstNode::Continue
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_matches_masks() {
        assert!(AstNode::Break.is_hull());
        assert!(AstNode::Break.is_leaf());
        assert!(AstNode::IntLit(1).is_literal());
        assert!(AstNode::IntLit(1).is_leaf());
        assert!(!AstNode::IntLit(1).is_hull());
        assert!(AstNode::Break.is_control_flow());
        assert!(AstNode::Continue.is_control_flow());
    }

    #[test]
    fn kind_names_match_original_table() {
        assert_eq!(AstNode::IntLit(0).kind_name(), "INT");
        assert_eq!(AstNode::Break.kind_name(), "BREAK");
    }
}
