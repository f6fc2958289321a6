//! Block scope and variable scope kinds.
//!
//! `BlockScope` transcribes `block_scope_t` from the original's
//! `neo_ast.h`, with one addition: [`BlockScope::ArgList`]. The original
//! only distinguishes module/class/local/param-list bodies; it has no
//! dedicated scope for a call's argument list, because its grammar never
//! got that far. Neo's binary "call" operator needs somewhere to hang the
//! argument expressions it parses, so this adds a fifth block kind rather
//! than overloading `ParamList` (which carries declaration semantics, not
//! expression-evaluation semantics) for a purpose it wasn't designed for.

/// What kind of symbol table(s), if any, a [`Block`](crate::node::Block)
/// node owns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
pub enum BlockScope {
    /// Whole-module (per-file) scope.
    Module,
    /// A class body.
    Class,
    /// A method or statement body.
    Local,
    /// A method's parameter list.
    ParamList,
    /// A call expression's argument list.
    ArgList,
}

/// Where a declared variable lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::EnumIter)]
pub enum VariableScope {
    /// A local variable.
    Local,
    /// A method parameter.
    Param,
    /// A `static` class field.
    StaticField,
    /// A (non-static) class field.
    Field,
}

impl BlockScope {
    /// Whether `kind` is a legal child of a block of this scope, matching
    /// `astmask`/`ASTNODE_*_MASK` in the original: each scope kind accepts
    /// only a specific subset of node kinds, enforced whenever a child is
    /// inserted.
    pub fn permits(self, kind: &crate::node::AstNode<'_>) -> bool {
        use crate::node::AstNode;
        match self {
            BlockScope::Module => matches!(
                kind,
                AstNode::Class(_)
                    | AstNode::Method(_)
                    | AstNode::Variable(_)
                    | AstNode::Branch(_)
                    | AstNode::Loop(_)
                    | AstNode::Error(_)
            ) || kind.is_expr(),
            BlockScope::Class => {
                matches!(kind, AstNode::Method(_) | AstNode::Variable(_) | AstNode::Error(_))
            }
            BlockScope::Local => {
                matches!(
                    kind,
                    AstNode::Variable(_)
                        | AstNode::Branch(_)
                        | AstNode::Loop(_)
                        | AstNode::Return(_)
                        | AstNode::Break
                        | AstNode::Continue
                        | AstNode::Error(_)
                ) || kind.is_expr()
            }
            BlockScope::ParamList => matches!(kind, AstNode::Variable(_) | AstNode::Error(_)),
            BlockScope::ArgList => kind.is_expr() || matches!(kind, AstNode::Error(_)),
        }
    }
}
