//! Tree traversal and construction primitives for the capacity-doubling
//! rebuild.

use super::{Arena, NodeId, NIL};

/// Walks a bucket tree in key order. Once a node has been returned, its
/// left, right and parent links are no longer read, so the caller is free
/// to rewrite them mid-walk.
///
/// The stack is a singly linked list threaded through the `parent` field,
/// giving an O(log n) walk with no allocation. The walk is destructive:
/// parent links are cleared as nodes are popped, and a partial iteration
/// leaves the tree unusable.
pub(super) struct AvlIterator {
    stack_top: NodeId,
}

impl AvlIterator {
    pub(super) fn new() -> Self {
        Self { stack_top: NIL }
    }

    pub(super) fn reset<K, V>(&mut self, arena: &mut Arena<K, V>, root: NodeId) {
        let mut stack_top = NIL;
        let mut n = root;
        while !n.is_nil() {
            arena[n].parent = stack_top;
            stack_top = n; // stack push
            n = arena[n].left;
        }
        self.stack_top = stack_top;
    }

    pub(super) fn next<K, V>(&mut self, arena: &mut Arena<K, V>) -> Option<NodeId> {
        let result = self.stack_top;
        if result.is_nil() {
            return None;
        }
        let mut stack_top = arena[result].parent;
        arena[result].parent = NIL;
        let mut n = arena[result].right;
        while !n.is_nil() {
            arena[n].parent = stack_top;
            stack_top = n; // stack push
            n = arena[n].left;
        }
        self.stack_top = stack_top;
        Some(result)
    }
}

/// Builds AVL trees of a predetermined size from nodes supplied in
/// ascending key order. To use: call [`reset`](AvlBuilder::reset) with the
/// target size, [`add`](AvlBuilder::add) exactly that many times, then
/// [`root`](AvlBuilder::root).
///
/// Trees whose size is not a power of two minus one stay balanced because
/// deepest-level leaf positions are left unfilled as needed. Unlike
/// rebuilding a tree from scratch, this requires no key comparisons:
/// building a tree of size S is O(S).
pub(super) struct AvlBuilder {
    /// A singly linked stack threaded through the `parent` field.
    stack: NodeId,
    leaves_to_skip: usize,
    leaves_skipped: usize,
    size: usize,
}

impl AvlBuilder {
    pub(super) fn new() -> Self {
        Self {
            stack: NIL,
            leaves_to_skip: 0,
            leaves_skipped: 0,
            size: 0,
        }
    }

    pub(super) fn reset(&mut self, target_size: usize) {
        // The perfect tree size is a power of two minus one, like 15 or 31.
        let tree_capacity = if target_size == 0 {
            0
        } else {
            let highest_one_bit = 1usize << (usize::BITS - 1 - target_size.leading_zeros());
            highest_one_bit * 2 - 1
        };
        self.leaves_to_skip = tree_capacity - target_size;
        self.size = 0;
        self.leaves_skipped = 0;
        self.stack = NIL;
    }

    pub(super) fn add<K, V>(&mut self, arena: &mut Arena<K, V>, node: NodeId) {
        {
            let n = &mut arena[node];
            n.left = NIL;
            n.parent = NIL;
            n.right = NIL;
            n.height = 1;
        }

        // Skip a leaf if necessary.
        if self.leaves_to_skip > 0 && self.size & 1 == 0 {
            self.size += 1;
            self.leaves_to_skip -= 1;
            self.leaves_skipped += 1;
        }

        arena[node].parent = self.stack;
        self.stack = node; // stack push
        self.size += 1;

        // Skip a leaf if necessary.
        if self.leaves_to_skip > 0 && self.size & 1 == 0 {
            self.size += 1;
            self.leaves_to_skip -= 1;
            self.leaves_skipped += 1;
        }

        // Combine 3 nodes into a subtree whenever the size is one less than
        // a multiple of 4: nodes A, B, C become a tree rooted at B. Combine
        // two subtrees and a spare single node whenever the size is one less
        // than a multiple of 8: (A B C) D (E F G). In general, subtrees of
        // size N-1 combine whenever the total size reaches 2N-1 for N a
        // power of two. Skipped leaves stand in for the missing bottom-level
        // nodes of the previous combination.
        let mut scale = 4;
        while self.size & (scale - 1) == scale - 1 {
            if self.leaves_skipped == 0 {
                // Pop right, center and left; make center the top of the
                // stack and the root of a three-node tree.
                let right = self.stack;
                let center = arena[right].parent;
                let left = arena[center].parent;
                arena[center].parent = arena[left].parent;
                self.stack = center;
                arena[center].left = left;
                arena[center].right = right;
                arena[center].height = arena[right].height + 1;
                arena[left].parent = center;
                arena[right].parent = center;
            } else if self.leaves_skipped == 1 {
                // Pop right and center; the left position stays empty.
                let right = self.stack;
                let center = arena[right].parent;
                self.stack = center;
                arena[center].right = right;
                arena[center].height = arena[right].height + 1;
                arena[right].parent = center;
                self.leaves_skipped = 0;
            } else if self.leaves_skipped == 2 {
                self.leaves_skipped = 0;
            }
            scale *= 2;
        }
    }

    pub(super) fn root<K, V>(&self, arena: &Arena<K, V>) -> NodeId {
        let stack_top = self.stack;
        debug_assert!(arena[stack_top].parent.is_nil());
        stack_top
    }
}
