//! The arena that owns every [`AstNode`] and child-list produced while
//! parsing one source file.
//!
//! Grounded on `astpool_t` in the original's `neo_ast.h`: two append-only
//! pools, one for nodes and one for the `astref_t` lists hanging off block
//! nodes. Node storage here is a plain `Vec` (append-only, references never
//! invalidated by anything but reallocation, which `Vec` already handles);
//! list storage keeps the original's "grow by quadrupling, abandon the old
//! segment" strategy explicitly, since that's the one part of the arena
//! design that actually matters to get right - a node's [`ListRef`] must
//! stay valid across any number of pushes to the list it names.

use tracing::instrument;

use crate::node::AstNode;
use crate::ops::{BinaryOpType, UnaryOpType};
use crate::refs::{AstRef, ListRef};
use crate::scope::{BlockScope, VariableScope};
use neo_types::{Bool, Char, Float, Int};

/// Growth factor applied to a list segment's capacity each time it fills
/// up, matching the quadrupling growth chosen for `list_pool` reallocation.
const LIST_GROWTH_FACTOR: u32 = 4;
/// Capacity a list segment is given the first time it needs to hold
/// anything.
const LIST_INITIAL_CAP: u32 = 4;

#[derive(Debug, Clone, Copy)]
struct ListSeg {
    start: u32,
    len: u32,
    cap: u32,
}

/// Owns every AST node and child-reference list for one parse.
pub struct AstPool<'src> {
    nodes: Vec<AstNode<'src>>,
    lists: Vec<Option<AstRef>>,
    list_headers: Vec<ListSeg>,
}

impl<'src> AstPool<'src> {
    /// Builds an empty pool.
    pub fn new() -> Self {
        AstPool {
            nodes: Vec::new(),
            lists: Vec::new(),
            list_headers: Vec::new(),
        }
    }

    fn push_node(&mut self, node: AstNode<'src>) -> AstRef {
        let idx = self.nodes.len() as u32;
        self.nodes.push(node);
        AstRef::from_index(idx)
    }

    /// Resolves a reference to its node.
    ///
    /// The original's equivalent, `astpool_resolve`, warns that the
    /// returned pointer is invalidated by any further pool allocation;
    /// here that's enforced statically, since the returned reference
    /// borrows `self`.
    pub fn resolve(&self, r: AstRef) -> &AstNode<'src> {
        &self.nodes[r.index() as usize]
    }

    /// Mutably resolves a reference to its node.
    pub fn resolve_mut(&mut self, r: AstRef) -> &mut AstNode<'src> {
        &mut self.nodes[r.index() as usize]
    }

    /// Number of nodes allocated so far.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no nodes have been allocated.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Allocates a fresh, empty child list and returns a handle to it.
    pub fn new_list(&mut self) -> ListRef {
        let idx = self.list_headers.len() as u32;
        self.list_headers.push(ListSeg {
            start: 0,
            len: 0,
            cap: 0,
        });
        ListRef::from_index(idx)
    }

    /// Appends `child` to `list`, growing its backing segment by
    /// [`LIST_GROWTH_FACTOR`] if it's full. The old segment's slots are
    /// abandoned in place (never reclaimed), matching the original
    /// mempool's append-only discipline.
    pub fn push_child(&mut self, list: ListRef, child: AstRef) {
        let idx = list.index() as usize;
        let seg = self.list_headers[idx];
        if seg.len < seg.cap {
            self.lists[(seg.start + seg.len) as usize] = Some(child);
            self.list_headers[idx].len += 1;
            return;
        }
        let new_cap = if seg.cap == 0 {
            LIST_INITIAL_CAP
        } else {
            seg.cap * LIST_GROWTH_FACTOR
        };
        let old: Vec<Option<AstRef>> = self.lists[seg.start as usize..(seg.start + seg.len) as usize]
            .to_vec();
        let new_start = self.lists.len() as u32;
        self.lists.extend(old);
        self.lists
            .extend(std::iter::repeat(None).take((new_cap - seg.len) as usize));
        self.lists[(new_start + seg.len) as usize] = Some(child);
        self.list_headers[idx] = ListSeg {
            start: new_start,
            len: seg.len + 1,
            cap: new_cap,
        };
    }

    /// Appends `child` to a block's child list, enforcing the scope's
    /// permitted-child mask (spec invariant: "Block children references
    /// resolve to nodes whose kind lies in the scope's permitted mask").
    ///
    /// # Panics
    /// Panics if `child`'s node kind is not permitted under `scope` - this
    /// is a parser bug, not a recoverable condition, matching the
    /// original's `neo_assert(astmask(t) & scope_mask)`.
    pub fn push_block_child(&mut self, scope: BlockScope, list: ListRef, child: AstRef) {
        let kind = self.resolve(child);
        assert!(
            scope.permits(kind),
            "node kind {} not permitted in {scope:?} block",
            kind.kind_name()
        );
        self.push_child(list, child);
    }

    /// Iterates a list's children in insertion order.
    pub fn children(&self, list: ListRef) -> impl Iterator<Item = AstRef> + '_ {
        let seg = self.list_headers[list.index() as usize];
        self.lists[seg.start as usize..(seg.start + seg.len) as usize]
            .iter()
            .filter_map(|x| *x)
    }

    /// Number of children currently in `list`.
    pub fn list_len(&self, list: ListRef) -> u32 {
        self.list_headers[list.index() as usize].len
    }

    // ---- Node constructors, one per `astnode_new_*` in the original. ----

    pub fn alloc_error(&mut self, node: crate::node::ErrorNode<'src>) -> AstRef {
        self.push_node(AstNode::Error(node))
    }

    pub fn alloc_break(&mut self) -> AstRef {
        self.push_node(AstNode::Break)
    }

    pub fn alloc_continue(&mut self) -> AstRef {
        self.push_node(AstNode::Continue)
    }

    pub fn alloc_int(&mut self, value: Int) -> AstRef {
        self.push_node(AstNode::IntLit(value))
    }

    pub fn alloc_float(&mut self, value: Float) -> AstRef {
        self.push_node(AstNode::FloatLit(value))
    }

    pub fn alloc_char(&mut self, value: Char) -> AstRef {
        self.push_node(AstNode::CharLit(value))
    }

    pub fn alloc_bool(&mut self, value: Bool) -> AstRef {
        self.push_node(AstNode::BoolLit(value))
    }

    pub fn alloc_string(&mut self, escaped_bytes: Vec<u8>) -> AstRef {
        self.push_node(AstNode::StringLit(crate::node::StringLiteral::new(
            escaped_bytes,
        )))
    }

    pub fn alloc_ident(&mut self, span: neo_lexer::SourceSpan<'src>) -> AstRef {
        self.push_node(AstNode::IdentLit(crate::node::SpanLiteral::new(span)))
    }

    pub fn alloc_group(&mut self, child: AstRef) -> AstRef {
        self.push_node(AstNode::Group(crate::node::GroupNode { child }))
    }

    pub fn alloc_unary_op(&mut self, op: UnaryOpType, expr: AstRef) -> AstRef {
        self.push_node(AstNode::UnaryOp(crate::node::UnaryOpNode { op, expr }))
    }

    pub fn alloc_binary_op(&mut self, op: BinaryOpType, left: AstRef, right: Option<AstRef>) -> AstRef {
        self.push_node(AstNode::BinaryOp(crate::node::BinaryOpNode {
            op,
            left,
            right,
        }))
    }

    pub fn alloc_method(&mut self, node: crate::node::MethodNode) -> AstRef {
        self.push_node(AstNode::Method(node))
    }

    pub fn alloc_block(&mut self, scope: BlockScope, children: ListRef) -> AstRef {
        self.push_node(AstNode::Block(crate::node::BlockNode { scope, children }))
    }

    pub fn alloc_variable(&mut self, node: crate::node::VariableNode) -> AstRef {
        self.push_node(AstNode::Variable(node))
    }

    pub fn alloc_return(&mut self, expr: Option<AstRef>) -> AstRef {
        self.push_node(AstNode::Return(crate::node::ReturnNode { expr }))
    }

    pub fn alloc_branch(&mut self, node: crate::node::BranchNode) -> AstRef {
        self.push_node(AstNode::Branch(node))
    }

    pub fn alloc_loop(&mut self, node: crate::node::LoopNode) -> AstRef {
        self.push_node(AstNode::Loop(node))
    }

    pub fn alloc_class(&mut self, node: crate::node::ClassNode) -> AstRef {
        self.push_node(AstNode::Class(node))
    }

    pub fn alloc_module(&mut self, node: crate::node::ModuleNode) -> AstRef {
        self.push_node(AstNode::Module(node))
    }

    /// Visits `root` and every descendant in depth-first order, calling
    /// `visitor` once per node. Iterative rather than recursive (the
    /// original's `astnode_visit` recurses through C's call stack; doing
    /// the same in Rust would let a pathologically deep expression blow
    /// the stack), using an explicit work-list instead. Returns the
    /// number of nodes visited.
    #[instrument(skip(self, visitor))]
    pub fn visit(&self, root: AstRef, mut visitor: impl FnMut(&AstPool<'src>, AstRef)) -> usize {
        let mut stack = vec![root];
        let mut count = 0;
        while let Some(node_ref) = stack.pop() {
            visitor(self, node_ref);
            count += 1;
            self.push_children(node_ref, &mut stack);
        }
        count
    }

    fn push_children(&self, node_ref: AstRef, stack: &mut Vec<AstRef>) {
        match self.resolve(node_ref) {
            AstNode::Error(_)
            | AstNode::Break
            | AstNode::Continue
            | AstNode::IntLit(_)
            | AstNode::FloatLit(_)
            | AstNode::CharLit(_)
            | AstNode::BoolLit(_)
            | AstNode::StringLit(_)
            | AstNode::IdentLit(_) => {}
            AstNode::Group(n) => stack.push(n.child),
            AstNode::UnaryOp(n) => stack.push(n.expr),
            AstNode::BinaryOp(n) => {
                if let Some(right) = n.right {
                    stack.push(right);
                }
                stack.push(n.left);
            }
            AstNode::Method(n) => {
                if let Some(body) = n.body {
                    stack.push(body);
                }
                if let Some(ret) = n.ret_type {
                    stack.push(ret);
                }
                if let Some(params) = n.params {
                    stack.push(params);
                }
                stack.push(n.ident);
            }
            AstNode::Block(n) => {
                let children: Vec<AstRef> = self.children(n.children).collect();
                for child in children.into_iter().rev() {
                    stack.push(child);
                }
            }
            AstNode::Variable(n) => {
                if let Some(init) = n.init {
                    stack.push(init);
                }
                if let Some(ty) = n.ty {
                    stack.push(ty);
                }
                stack.push(n.ident);
            }
            AstNode::Return(n) => {
                if let Some(expr) = n.expr {
                    stack.push(expr);
                }
            }
            AstNode::Branch(n) => {
                if let Some(else_block) = n.else_block {
                    stack.push(else_block);
                }
                stack.push(n.then_block);
                stack.push(n.cond);
            }
            AstNode::Loop(n) => {
                stack.push(n.body);
                stack.push(n.cond);
            }
            AstNode::Class(n) => {
                if let Some(body) = n.body {
                    stack.push(body);
                }
                stack.push(n.ident);
            }
            AstNode::Module(n) => {
                if let Some(body) = n.body {
                    stack.push(body);
                }
                stack.push(n.ident);
            }
        }
    }
}

impl Default for AstPool<'_> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_survives_growth_past_initial_capacity() {
        let mut pool = AstPool::new();
        let list = pool.new_list();
        let mut expected = Vec::new();
        for i in 0..50 {
            let node = pool.alloc_int(i);
            pool.push_child(list, node);
            expected.push(node);
        }
        let got: Vec<AstRef> = pool.children(list).collect();
        assert_eq!(got, expected);
        assert_eq!(pool.list_len(list), 50);
    }

    #[test]
    fn visit_covers_every_descendant_depth_first() {
        let mut pool = AstPool::new();
        let one = pool.alloc_int(1);
        let two = pool.alloc_int(2);
        let add = pool.alloc_binary_op(BinaryOpType::Add, one, Some(two));
        let neg = pool.alloc_unary_op(UnaryOpType::Minus, add);

        let mut visited = Vec::new();
        let count = pool.visit(neg, |_, r| visited.push(r));
        assert_eq!(count, 4);
        assert_eq!(visited, vec![neg, add, one, two]);
    }

    #[test]
    fn block_child_insertion_enforces_scope_mask() {
        let mut pool = AstPool::new();
        let list = pool.new_list();
        let int_lit = pool.alloc_int(1);
        pool.push_block_child(BlockScope::Local, list, int_lit);
        assert_eq!(pool.list_len(list), 1);
    }

    #[test]
    #[should_panic(expected = "not permitted")]
    fn block_child_insertion_rejects_illegal_kind() {
        let mut pool = AstPool::new();
        let list = pool.new_list();
        let brk = pool.alloc_break();
        pool.push_block_child(BlockScope::ParamList, list, brk);
    }

    #[test]
    fn empty_block_has_no_children() {
        let mut pool = AstPool::new();
        let list = pool.new_list();
        let block = pool.alloc_block(BlockScope::Local, list);
        let mut visited = Vec::new();
        pool.visit(block, |_, r| visited.push(r));
        assert_eq!(visited, vec![block]);
    }
}
