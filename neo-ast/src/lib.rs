//! Abstract syntax tree: node shapes, operator kinds, scope kinds, and the
//! arena ([`AstPool`]) that owns them all for one parse.
//!
//! `neo-ast` has no parsing logic of its own - it only defines what a
//! parsed program looks like in memory. `neo-parser` builds these trees;
//! `neo-compiler` walks them to emit bytecode.

pub mod node;
pub mod ops;
pub mod pool;
pub mod refs;
pub mod scope;

pub use node::{
    AstNode, BinaryOpNode, BlockNode, BranchNode, ClassNode, ErrorNode, GroupNode, LoopNode,
    MethodNode, ModuleNode, ReturnNode, SpanLiteral, StringLiteral, UnaryOpNode, VariableNode,
};
pub use ops::{BinaryOpType, UnaryOpType};
pub use pool::AstPool;
pub use refs::{AstRef, ListRef};
pub use scope::{BlockScope, VariableScope};
