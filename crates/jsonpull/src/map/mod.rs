//! An insertion-ordered associative container.
//!
//! [`OrderedMap`] iterates in the order keys were first inserted, while
//! lookups, insertions and removals run against an AVL tree per hash
//! bucket. Comparison order is only an implementation detail of the
//! buckets; it never leaks into iteration.
//!
//! Nodes live in an arena and reference each other through 32-bit indices:
//! `parent`/`left`/`right` form the bucket trees and `next`/`prev` thread
//! the insertion-order list through every node. The capacity-doubling
//! rebuild in [`avl`] temporarily reuses `parent` links as its traversal
//! stack, which the arena representation supports just as well as pointers
//! did.

mod avl;

use core::cmp::Ordering;
use core::fmt;
use core::hash::{Hash, Hasher};
use core::iter::FusedIterator;
use core::ops::{Index, IndexMut};

use alloc::vec;
use alloc::vec::Vec;

use rustc_hash::FxHasher;
use thiserror::Error;

use avl::{AvlBuilder, AvlIterator};

/// Total order used to arrange keys inside each bucket tree.
pub trait Comparator<K> {
    fn compare(&self, a: &K, b: &K) -> Ordering;
}

/// Orders keys by their [`Ord`] implementation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NaturalOrder;

impl<K: Ord> Comparator<K> for NaturalOrder {
    #[inline]
    fn compare(&self, a: &K, b: &K) -> Ordering {
        a.cmp(b)
    }
}

/// Reported by [`Cursor::next`] when the map was structurally modified
/// after the cursor was created.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("map was structurally modified while a cursor was active")]
pub struct ConcurrentModification;

/// Arena slot address. `NIL` plays the role a null pointer would.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) struct NodeId(u32);

pub(crate) const NIL: NodeId = NodeId(u32::MAX);

impl NodeId {
    #[inline]
    fn index(self) -> usize {
        self.0 as usize
    }

    #[inline]
    pub(crate) fn is_nil(self) -> bool {
        self.0 == u32::MAX
    }
}

pub(crate) struct Node<K, V> {
    pub(crate) parent: NodeId,
    pub(crate) left: NodeId,
    pub(crate) right: NodeId,
    next: NodeId,
    prev: NodeId,
    pub(crate) hash: i32,
    pub(crate) height: i32,
    key: K,
    value: V,
}

/// Node storage. Slots of removed nodes are recycled through a free list,
/// so a `NodeId` stays valid exactly as long as its node is in the map.
pub(crate) struct Arena<K, V> {
    slots: Vec<Option<Node<K, V>>>,
    free: Vec<NodeId>,
}

impl<K, V> Arena<K, V> {
    fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
        }
    }

    fn alloc(&mut self, node: Node<K, V>) -> NodeId {
        match self.free.pop() {
            Some(id) => {
                self.slots[id.index()] = Some(node);
                id
            }
            None => {
                let id = NodeId(u32::try_from(self.slots.len()).unwrap_or(u32::MAX));
                self.slots.push(Some(node));
                id
            }
        }
    }

    fn dealloc(&mut self, id: NodeId) -> Node<K, V> {
        let node = self.slots[id.index()].take();
        self.free.push(id);
        match node {
            Some(node) => node,
            None => panic!("dangling node id"),
        }
    }

    fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
    }
}

impl<K, V> Index<NodeId> for Arena<K, V> {
    type Output = Node<K, V>;

    #[inline]
    fn index(&self, id: NodeId) -> &Node<K, V> {
        match &self.slots[id.index()] {
            Some(node) => node,
            None => panic!("dangling node id"),
        }
    }
}

impl<K, V> IndexMut<NodeId> for Arena<K, V> {
    #[inline]
    fn index_mut(&mut self, id: NodeId) -> &mut Node<K, V> {
        match &mut self.slots[id.index()] {
            Some(node) => node,
            None => panic!("dangling node id"),
        }
    }
}

/// Applies a supplemental mixing function to the key's hash. The bucket
/// mask only looks at low bits, so entropy from the high bits has to be
/// folded down before masking.
fn secondary_hash<K: Hash>(key: &K) -> i32 {
    let mut hasher = FxHasher::default();
    key.hash(&mut hasher);
    let folded = hasher.finish();
    #[allow(clippy::cast_possible_truncation)]
    let h = ((folded >> 32) as u32) ^ (folded as u32);
    let h = h ^ (h >> 20) ^ (h >> 12);
    #[allow(clippy::cast_possible_wrap)]
    let mixed = (h ^ (h >> 7) ^ (h >> 4)) as i32;
    mixed
}

#[inline]
fn bucket_index(hash: i32, table_len: usize) -> usize {
    #[allow(clippy::cast_sign_loss)]
    let h = hash as u32 as usize;
    h & (table_len - 1)
}

const INITIAL_CAPACITY: usize = 16;

/// A map of keys to values that iterates in insertion order.
///
/// Each bucket of a power-of-two hash table holds an AVL subtree ordered by
/// the [`Comparator`]; all nodes are additionally threaded onto a list in
/// the order they were first inserted. Replacing the value of an existing
/// key neither moves the entry nor counts as a structural modification.
///
/// The map is single-owner and not thread safe. Borrowed iterators are
/// always consistent; the detached [`Cursor`] detects structural
/// modification instead.
///
/// # Examples
///
/// ```rust
/// use jsonpull::OrderedMap;
///
/// let mut map = OrderedMap::new();
/// map.insert("b", 2);
/// map.insert("a", 1);
/// map.insert("c", 3);
/// let keys: Vec<_> = map.keys().copied().collect();
/// assert_eq!(keys, ["b", "a", "c"]);
/// ```
pub struct OrderedMap<K, V, C = NaturalOrder> {
    comparator: C,
    arena: Arena<K, V>,
    /// Bucket roots; the length is always a power of two.
    table: Vec<NodeId>,
    /// Ends of the insertion-order list.
    head: NodeId,
    tail: NodeId,
    size: usize,
    /// Load limit: three quarters of the table length.
    threshold: usize,
    /// Incremented by every structural mutation; cursors snapshot it.
    mod_count: u64,
}

impl<K: Hash + Ord, V> OrderedMap<K, V> {
    /// Creates an empty map ordered by the keys' natural order.
    #[must_use]
    pub fn new() -> Self {
        Self::with_comparator(NaturalOrder)
    }
}

impl<K: Hash + Ord, V> Default for OrderedMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, C> OrderedMap<K, V, C> {
    /// Creates an empty map whose bucket trees are ordered by `comparator`.
    #[must_use]
    pub fn with_comparator(comparator: C) -> Self {
        Self {
            comparator,
            arena: Arena::new(),
            table: vec![NIL; INITIAL_CAPACITY],
            head: NIL,
            tail: NIL,
            size: 0,
            threshold: INITIAL_CAPACITY / 2 + INITIAL_CAPACITY / 4,
            mod_count: 0,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.size
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Removes all entries. The bucket table keeps its current length.
    pub fn clear(&mut self) {
        for root in &mut self.table {
            *root = NIL;
        }
        self.arena.clear();
        self.head = NIL;
        self.tail = NIL;
        self.size = 0;
        self.mod_count += 1;
    }

    /// Iterates over `(&key, &value)` pairs in insertion order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            arena: &self.arena,
            next: self.head,
            remaining: self.size,
        }
    }

    /// Iterates over keys in insertion order.
    #[must_use]
    pub fn keys(&self) -> Keys<'_, K, V> {
        Keys(self.iter())
    }

    /// Iterates over values in insertion order.
    #[must_use]
    pub fn values(&self) -> Values<'_, K, V> {
        Values(self.iter())
    }

    /// Creates a detached cursor positioned before the first entry.
    ///
    /// Unlike [`iter`](Self::iter), a cursor does not borrow the map;
    /// instead every [`Cursor::next`] call revalidates that the map has not
    /// been structurally modified since the cursor was created.
    #[must_use]
    pub fn cursor(&self) -> Cursor {
        Cursor {
            next: self.head,
            expected_mod_count: self.mod_count,
        }
    }
}

impl<K: Hash, V, C: Comparator<K>> OrderedMap<K, V, C> {
    /// Returns a reference to the value stored for `key`.
    #[must_use]
    pub fn get(&self, key: &K) -> Option<&V> {
        let node = self.find_node(key);
        if node.is_nil() {
            None
        } else {
            Some(&self.arena[node].value)
        }
    }

    /// Returns a mutable reference to the value stored for `key`.
    pub fn get_mut(&mut self, key: &K) -> Option<&mut V> {
        let node = self.find_node(key);
        if node.is_nil() {
            None
        } else {
            Some(&mut self.arena[node].value)
        }
    }

    #[must_use]
    pub fn contains_key(&self, key: &K) -> bool {
        !self.find_node(key).is_nil()
    }

    /// Inserts `key` with `value`, returning the previously stored value if
    /// the key was already present. A replacement keeps the entry's
    /// position in iteration order and is not a structural modification.
    pub fn insert(&mut self, key: K, value: V) -> Option<V> {
        let hash = secondary_hash(&key);
        let index = bucket_index(hash, self.table.len());
        let mut nearest = self.table[index];
        let mut comparison = Ordering::Equal;

        if !nearest.is_nil() {
            loop {
                comparison = self.comparator.compare(&key, &self.arena[nearest].key);
                if comparison == Ordering::Equal {
                    return Some(core::mem::replace(&mut self.arena[nearest].value, value));
                }
                let child = match comparison {
                    Ordering::Less => self.arena[nearest].left,
                    _ => self.arena[nearest].right,
                };
                if child.is_nil() {
                    break;
                }
                nearest = child;
            }
        }

        // The key is not in the tree. Append the node at the tail of the
        // insertion list and hang it off the last visited tree position.
        let created = self.arena.alloc(Node {
            parent: nearest,
            left: NIL,
            right: NIL,
            next: NIL,
            prev: self.tail,
            hash,
            height: 1,
            key,
            value,
        });
        if self.tail.is_nil() {
            self.head = created;
        } else {
            self.arena[self.tail].next = created;
        }
        self.tail = created;

        if nearest.is_nil() {
            self.table[index] = created;
        } else {
            match comparison {
                Ordering::Less => self.arena[nearest].left = created,
                _ => self.arena[nearest].right = created,
            }
            self.rebalance(nearest, true);
        }

        self.size += 1;
        self.mod_count += 1;
        if self.size > self.threshold {
            self.double_capacity();
        }
        None
    }

    /// Removes `key`, returning its value if it was present.
    pub fn remove(&mut self, key: &K) -> Option<V> {
        let node = self.find_node(key);
        if node.is_nil() {
            return None;
        }
        self.remove_internal(node, true);
        let removed = self.arena.dealloc(node);
        Some(removed.value)
    }

    /// Walks the bucket tree for `key`, returning `NIL` on a miss.
    fn find_node(&self, key: &K) -> NodeId {
        let hash = secondary_hash(key);
        let mut nearest = self.table[bucket_index(hash, self.table.len())];
        while !nearest.is_nil() {
            let node = &self.arena[nearest];
            nearest = match self.comparator.compare(key, &node.key) {
                Ordering::Equal => return nearest,
                Ordering::Less => node.left,
                Ordering::Greater => node.right,
            };
        }
        NIL
    }

    /// Detaches `node` from the tree (and, when `unlink` is set, from the
    /// insertion list), rearranging the tree as necessary. The node's slot
    /// stays allocated: a two-child removal grafts the in-order neighbor
    /// back into the removed position.
    fn remove_internal(&mut self, node: NodeId, unlink: bool) {
        if unlink {
            let (prev, next) = {
                let n = &self.arena[node];
                (n.prev, n.next)
            };
            if prev.is_nil() {
                self.head = next;
            } else {
                self.arena[prev].next = next;
            }
            if next.is_nil() {
                self.tail = prev;
            } else {
                self.arena[next].prev = prev;
            }
        }

        let (left, right, original_parent) = {
            let n = &self.arena[node];
            (n.left, n.right, n.parent)
        };
        if !left.is_nil() && !right.is_nil() {
            // To remove a node with both subtrees, move an adjacent node
            // from the taller one into its place. Removing the adjacent
            // node first may change this node's subtrees, so they are
            // re-read below.
            let adjacent = if self.arena[left].height > self.arena[right].height {
                self.last_in_subtree(left)
            } else {
                self.first_in_subtree(right)
            };
            self.remove_internal(adjacent, false); // rebalances and decrements size

            let mut left_height = 0;
            let left = self.arena[node].left;
            if !left.is_nil() {
                left_height = self.arena[left].height;
                self.arena[adjacent].left = left;
                self.arena[left].parent = adjacent;
                self.arena[node].left = NIL;
            }
            let mut right_height = 0;
            let right = self.arena[node].right;
            if !right.is_nil() {
                right_height = self.arena[right].height;
                self.arena[adjacent].right = right;
                self.arena[right].parent = adjacent;
                self.arena[node].right = NIL;
            }
            self.arena[adjacent].height = left_height.max(right_height) + 1;
            self.replace_in_parent(node, adjacent);
            return;
        } else if !left.is_nil() {
            self.replace_in_parent(node, left);
            self.arena[node].left = NIL;
        } else if !right.is_nil() {
            self.replace_in_parent(node, right);
            self.arena[node].right = NIL;
        } else {
            self.replace_in_parent(node, NIL);
        }

        self.rebalance(original_parent, false);
        self.size -= 1;
        self.mod_count += 1;
    }

    fn first_in_subtree(&self, mut node: NodeId) -> NodeId {
        loop {
            let child = self.arena[node].left;
            if child.is_nil() {
                return node;
            }
            node = child;
        }
    }

    fn last_in_subtree(&self, mut node: NodeId) -> NodeId {
        loop {
            let child = self.arena[node].right;
            if child.is_nil() {
                return node;
            }
            node = child;
        }
    }

    /// Points `node`'s parent (or its bucket root slot) at `replacement`.
    fn replace_in_parent(&mut self, node: NodeId, replacement: NodeId) {
        let parent = self.arena[node].parent;
        self.arena[node].parent = NIL;
        if !replacement.is_nil() {
            self.arena[replacement].parent = parent;
        }

        if !parent.is_nil() {
            if self.arena[parent].left == node {
                self.arena[parent].left = replacement;
            } else {
                debug_assert!(self.arena[parent].right == node);
                self.arena[parent].right = replacement;
            }
        } else {
            let index = bucket_index(self.arena[node].hash, self.table.len());
            self.table[index] = replacement;
        }
    }

    fn height(&self, node: NodeId) -> i32 {
        if node.is_nil() {
            0
        } else {
            self.arena[node].height
        }
    }

    /// Restores the AVL property with rotations between the newly
    /// unbalanced node and the bucket root. Inserts stop at the first node
    /// whose rotation or height update restores balance; removals continue
    /// to the root.
    fn rebalance(&mut self, unbalanced: NodeId, insert: bool) {
        let mut node = unbalanced;
        while !node.is_nil() {
            let (left, right) = {
                let n = &self.arena[node];
                (n.left, n.right)
            };
            let left_height = self.height(left);
            let right_height = self.height(right);

            let delta = left_height - right_height;
            if delta == -2 {
                let right_left = self.arena[right].left;
                let right_right = self.arena[right].right;
                let right_delta = self.height(right_left) - self.height(right_right);
                if right_delta == -1 || (right_delta == 0 && !insert) {
                    self.rotate_left(node); // AVL right right
                } else {
                    debug_assert!(right_delta == 1);
                    self.rotate_right(right); // AVL right left
                    self.rotate_left(node);
                }
                if insert {
                    break; // no further rotations will be necessary
                }
            } else if delta == 2 {
                let left_left = self.arena[left].left;
                let left_right = self.arena[left].right;
                let left_delta = self.height(left_left) - self.height(left_right);
                if left_delta == 1 || (left_delta == 0 && !insert) {
                    self.rotate_right(node); // AVL left left
                } else {
                    debug_assert!(left_delta == -1);
                    self.rotate_left(left); // AVL left right
                    self.rotate_right(node);
                }
                if insert {
                    break;
                }
            } else if delta == 0 {
                self.arena[node].height = left_height + 1; // left_height == right_height
                if insert {
                    break; // the insert caused balance, so rebalancing is done
                }
            } else {
                debug_assert!(delta == -1 || delta == 1);
                self.arena[node].height = left_height.max(right_height) + 1;
                if !insert {
                    break; // the height hasn't changed, so rebalancing is done
                }
            }
            node = self.arena[node].parent;
        }
    }

    /// Rotates the subtree so that its root's right child is the new root.
    fn rotate_left(&mut self, root: NodeId) {
        let left = self.arena[root].left;
        let pivot = self.arena[root].right;
        let pivot_left = self.arena[pivot].left;
        let pivot_right = self.arena[pivot].right;

        // move the pivot's left child to the root's right
        self.arena[root].right = pivot_left;
        if !pivot_left.is_nil() {
            self.arena[pivot_left].parent = root;
        }

        self.replace_in_parent(root, pivot);

        // move the root to the pivot's left
        self.arena[pivot].left = root;
        self.arena[root].parent = pivot;

        // fix heights
        let root_height = self.height(left).max(self.height(pivot_left)) + 1;
        self.arena[root].height = root_height;
        self.arena[pivot].height = root_height.max(self.height(pivot_right)) + 1;
    }

    /// Rotates the subtree so that its root's left child is the new root.
    fn rotate_right(&mut self, root: NodeId) {
        let pivot = self.arena[root].left;
        let right = self.arena[root].right;
        let pivot_left = self.arena[pivot].left;
        let pivot_right = self.arena[pivot].right;

        // move the pivot's right child to the root's left
        self.arena[root].left = pivot_right;
        if !pivot_right.is_nil() {
            self.arena[pivot_right].parent = root;
        }

        self.replace_in_parent(root, pivot);

        // move the root to the pivot's right
        self.arena[pivot].right = root;
        self.arena[root].parent = pivot;

        // fix heights
        let root_height = self.height(right).max(self.height(pivot_right)) + 1;
        self.arena[root].height = root_height;
        self.arena[pivot].height = root_height.max(self.height(pivot_left)) + 1;
    }

    /// Doubles the bucket table. Every node moves to bucket `i` or
    /// `i + old_capacity` depending on the newly significant hash bit, so
    /// each old tree splits into two. The split walks each tree once to
    /// count, then once more feeding two [`AvlBuilder`]s that assemble the
    /// target trees directly, with no comparisons.
    fn double_capacity(&mut self) {
        let old_capacity = self.table.len();
        let mut new_table = vec![NIL; old_capacity * 2];
        let mut iterator = AvlIterator::new();
        let mut left_builder = AvlBuilder::new();
        let mut right_builder = AvlBuilder::new();

        for i in 0..old_capacity {
            let root = self.table[i];
            if root.is_nil() {
                continue;
            }

            // Compute the sizes of the two target trees.
            iterator.reset(&mut self.arena, root);
            let mut left_size = 0usize;
            let mut right_size = 0usize;
            while let Some(node) = iterator.next(&mut self.arena) {
                if bucket_index(self.arena[node].hash, old_capacity * 2) < old_capacity {
                    left_size += 1;
                } else {
                    right_size += 1;
                }
            }

            // Split the tree into two.
            left_builder.reset(left_size);
            right_builder.reset(right_size);
            iterator.reset(&mut self.arena, root);
            while let Some(node) = iterator.next(&mut self.arena) {
                if bucket_index(self.arena[node].hash, old_capacity * 2) < old_capacity {
                    left_builder.add(&mut self.arena, node);
                } else {
                    right_builder.add(&mut self.arena, node);
                }
            }

            new_table[i] = if left_size > 0 {
                left_builder.root(&self.arena)
            } else {
                NIL
            };
            new_table[i + old_capacity] = if right_size > 0 {
                right_builder.root(&self.arena)
            } else {
                NIL
            };
        }

        self.table = new_table;
        self.threshold = self.table.len() / 2 + self.table.len() / 4;
    }
}

impl<K: fmt::Debug, V: fmt::Debug, C> fmt::Debug for OrderedMap<K, V, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<K: Hash + Ord, V> FromIterator<(K, V)> for OrderedMap<K, V> {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = Self::new();
        map.extend(iter);
        map
    }
}

impl<K: Hash, V, C: Comparator<K>> Extend<(K, V)> for OrderedMap<K, V, C> {
    fn extend<I: IntoIterator<Item = (K, V)>>(&mut self, iter: I) {
        for (key, value) in iter {
            self.insert(key, value);
        }
    }
}

impl<'a, K, V, C> IntoIterator for &'a OrderedMap<K, V, C> {
    type Item = (&'a K, &'a V);
    type IntoIter = Iter<'a, K, V>;

    fn into_iter(self) -> Iter<'a, K, V> {
        self.iter()
    }
}

#[cfg(feature = "serde")]
impl<K: serde::Serialize, V: serde::Serialize, C> serde::Serialize for OrderedMap<K, V, C> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;

        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (key, value) in self {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

/// Iterator over a map's entries in insertion order.
pub struct Iter<'a, K, V> {
    arena: &'a Arena<K, V>,
    next: NodeId,
    remaining: usize,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (&'a K, &'a V);

    fn next(&mut self) -> Option<(&'a K, &'a V)> {
        if self.next.is_nil() {
            return None;
        }
        let node = &self.arena[self.next];
        self.next = node.next;
        self.remaining -= 1;
        Some((&node.key, &node.value))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<K, V> ExactSizeIterator for Iter<'_, K, V> {}
impl<K, V> FusedIterator for Iter<'_, K, V> {}

/// Iterator over a map's keys in insertion order.
pub struct Keys<'a, K, V>(Iter<'a, K, V>);

impl<'a, K, V> Iterator for Keys<'a, K, V> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        self.0.next().map(|(key, _)| key)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Keys<'_, K, V> {}
impl<K, V> FusedIterator for Keys<'_, K, V> {}

/// Iterator over a map's values in insertion order.
pub struct Values<'a, K, V>(Iter<'a, K, V>);

impl<'a, K, V> Iterator for Values<'a, K, V> {
    type Item = &'a V;

    fn next(&mut self) -> Option<&'a V> {
        self.0.next().map(|(_, value)| value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.0.size_hint()
    }
}

impl<K, V> ExactSizeIterator for Values<'_, K, V> {}
impl<K, V> FusedIterator for Values<'_, K, V> {}

/// A detached iteration handle created by
/// [`OrderedMap::cursor`](OrderedMap::cursor).
///
/// The cursor snapshots the map's modification counter; stepping it after
/// any structural change (insert of a new key, removal, clear) fails with
/// [`ConcurrentModification`]. Replacing an existing key's value is not
/// structural and leaves cursors valid.
#[derive(Debug, Clone)]
pub struct Cursor {
    next: NodeId,
    expected_mod_count: u64,
}

impl Cursor {
    /// Advances past the next entry of `map`, returning it.
    ///
    /// Must be called with the map the cursor was created from.
    pub fn next<'a, K, V, C>(
        &mut self,
        map: &'a OrderedMap<K, V, C>,
    ) -> Result<Option<(&'a K, &'a V)>, ConcurrentModification> {
        if map.mod_count != self.expected_mod_count {
            return Err(ConcurrentModification);
        }
        if self.next.is_nil() {
            return Ok(None);
        }
        let node = &map.arena[self.next];
        self.next = node.next;
        Ok(Some((&node.key, &node.value)))
    }
}
