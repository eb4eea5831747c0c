//! # avl-rs
//!
//! An ordered map keyed by `i64`, backed by an AVL tree that keeps a parent
//! link in every node and a cached pointer to its maximum node.
//!
//! On top of the usual logarithmic search / insert / delete it provides:
//!
//! - **Finger search and finger insert**: descents that start from the
//!   maximum node and climb toward the root first, so operations near the
//!   top of the key range cost O(log d) in the rank-distance d from the max
//!   rather than O(log n).
//! - **Tree algebra**: [`AvlTree::join`] combines two key-disjoint trees
//!   around a separator in time proportional to their height difference,
//!   and [`AvlTree::split`] partitions a tree at a node in O(log n)
//!   structural work.
//!
//! ## Example
//!
//! ```rust
//! use avl_rs::AvlTree;
//!
//! let mut tree: AvlTree<&str> = AvlTree::new();
//! tree.insert(2, "two");
//! tree.insert(1, "one");
//!
//! assert_eq!(tree.get(2), Some(&"two"));
//! assert_eq!(tree.to_ordered_vec(), vec![(1, &"one"), (2, &"two")]);
//! ```

#![deny(unsafe_op_in_unsafe_fn)]

use std::cmp;
use std::fmt;
use std::mem;
use std::ptr::NonNull;

// =============================================================================
// Node
// =============================================================================

type NodePtr<V> = NonNull<Node<V>>;
type Link<V> = Option<NodePtr<V>>;

/// A tree node. Children are owned through the `left`/`right` links; the
/// `parent` link is a non-owning back-reference and never outlives the
/// subtree's owner. A missing child is an absent link whose height counts
/// as −1, so a leaf has height 0.
struct Node<V> {
    key: i64,
    value: V,
    left: Link<V>,
    right: Link<V>,
    parent: Link<V>,
    height: i32,
}

impl<V> Node<V> {
    fn create(key: i64, value: V) -> NodePtr<V> {
        let boxed = Box::new(Node {
            key,
            value,
            left: None,
            right: None,
            parent: None,
            height: 0,
        });
        // SAFETY: Box::into_raw never returns null.
        unsafe { NonNull::new_unchecked(Box::into_raw(boxed)) }
    }

    /// Frees the node and hands back its key/value pair.
    ///
    /// # Safety
    ///
    /// `ptr` must be live, fully unlinked, and not referenced by any other
    /// node or tree.
    unsafe fn destroy(ptr: NodePtr<V>) -> (i64, V) {
        // SAFETY: per the contract above we hold the only reference.
        let node = unsafe { Box::from_raw(ptr.as_ptr()) };
        let Node { key, value, .. } = *node;
        (key, value)
    }
}

/// Height of the subtree behind a link, −1 for a missing child.
#[inline]
fn link_height<V>(link: Link<V>) -> i32 {
    link.map_or(-1, |ptr| unsafe { ptr.as_ref().height })
}

/// Height a node should have according to its children; read-only.
#[inline]
fn calc_height<V>(ptr: NodePtr<V>) -> i32 {
    let node = unsafe { &*ptr.as_ptr() };
    1 + cmp::max(link_height(node.left), link_height(node.right))
}

#[inline]
fn fix_height<V>(ptr: NodePtr<V>) {
    unsafe {
        (*ptr.as_ptr()).height = calc_height(ptr);
    }
}

/// Left subtree height minus right subtree height. Stays within `[-1, 1]`
/// for every node after a public operation completes.
#[inline]
fn balance_factor<V>(ptr: NodePtr<V>) -> i32 {
    let node = unsafe { &*ptr.as_ptr() };
    link_height(node.left) - link_height(node.right)
}

/// Attaches `child` as the left child and fixes its parent link in one
/// step. All child/parent rewiring goes through these two helpers so the
/// two directions of a link can never fall out of sync.
#[inline]
fn set_left_with_parent<V>(parent: NodePtr<V>, child: Link<V>) {
    unsafe {
        (*parent.as_ptr()).left = child;
        if let Some(c) = child {
            (*c.as_ptr()).parent = Some(parent);
        }
    }
}

#[inline]
fn set_right_with_parent<V>(parent: NodePtr<V>, child: Link<V>) {
    unsafe {
        (*parent.as_ptr()).right = child;
        if let Some(c) = child {
            (*c.as_ptr()).parent = Some(parent);
        }
    }
}

fn drop_subtree<V>(link: Link<V>) {
    if let Some(ptr) = link {
        // SAFETY: the tree exclusively owns every node reachable from its
        // root, and each node is visited exactly once.
        let node = unsafe { Box::from_raw(ptr.as_ptr()) };
        drop_subtree(node.left);
        drop_subtree(node.right);
    }
}

fn clone_subtree<V: Clone>(link: Link<V>, parent: Link<V>) -> Link<V> {
    let src_ptr = link?;
    let src = unsafe { &*src_ptr.as_ptr() };
    let new = Node::create(src.key, src.value.clone());
    unsafe {
        (*new.as_ptr()).parent = parent;
        (*new.as_ptr()).height = src.height;
        (*new.as_ptr()).left = clone_subtree(src.left, Some(new));
        (*new.as_ptr()).right = clone_subtree(src.right, Some(new));
    }
    Some(new)
}

// =============================================================================
// Node handle
// =============================================================================

/// Opaque handle to a node that currently lives in an [`AvlTree`].
///
/// Handles are cheap to copy and stay valid across rebalancing rotations,
/// but a handle whose node has been deleted, or whose tree has been
/// consumed by `join`/`split`, must not be used again. Passing a handle to
/// a tree it does not belong to is likewise a caller contract violation.
pub struct NodeRef<V>(NodePtr<V>);

impl<V> Clone for NodeRef<V> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<V> Copy for NodeRef<V> {}

impl<V> PartialEq for NodeRef<V> {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl<V> Eq for NodeRef<V> {}

impl<V> fmt::Debug for NodeRef<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("NodeRef").field(&self.0).finish()
    }
}

// =============================================================================
// Tree
// =============================================================================

/// An AVL tree mapping `i64` keys to values of type `V`.
///
/// Keys are unique; inserting a key that is already present panics.
/// `root`, `max`, and `size` are caches maintained by the mutating entry
/// points (`insert`, `finger_insert`, `delete`, `join`, `split`).
pub struct AvlTree<V> {
    root: Link<V>,
    max: Link<V>,
    size: usize,
}

impl<V> AvlTree<V> {
    /// Creates an empty tree. No memory is allocated until the first insert.
    pub fn new() -> Self {
        Self {
            root: None,
            max: None,
            size: 0,
        }
    }

    /// Number of entries in the tree.
    #[inline]
    pub fn len(&self) -> usize {
        self.size
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Height of the tree, −1 when empty and 0 for a single node.
    #[inline]
    pub fn height(&self) -> i32 {
        link_height(self.root)
    }

    #[inline]
    pub fn root(&self) -> Option<NodeRef<V>> {
        self.root.map(NodeRef)
    }

    /// The node holding the greatest key, kept as an O(1) cache.
    #[inline]
    pub fn max_node(&self) -> Option<NodeRef<V>> {
        self.max.map(NodeRef)
    }

    /// Key of a node in this tree.
    #[inline]
    pub fn key(&self, node: NodeRef<V>) -> i64 {
        unsafe { node.0.as_ref().key }
    }

    /// Value of a node in this tree.
    #[inline]
    pub fn value(&self, node: NodeRef<V>) -> &V {
        unsafe { &(*node.0.as_ptr()).value }
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Standard BST descent from the root.
    ///
    /// Returns the matching node (or `None`) together with the number of
    /// edges walked plus a base offset of one; an unsuccessful descent does
    /// not count the final step into an empty slot. The edge count is a
    /// diagnostic and is not used internally.
    pub fn search(&self, key: i64) -> (Option<NodeRef<V>>, usize) {
        if self.root.is_none() {
            // An empty tree reports the base offset alone.
            return (None, 1);
        }
        let mut node = self.root;
        let mut edges = 1;
        while let Some(ptr) = node {
            let k = unsafe { ptr.as_ref().key };
            if k == key {
                return (Some(NodeRef(ptr)), edges);
            }
            node = if k < key {
                unsafe { ptr.as_ref().right }
            } else {
                unsafe { ptr.as_ref().left }
            };
            edges += 1;
        }
        // The last step walked into an empty slot, not a real edge.
        (None, edges - 1)
    }

    /// Same result as [`AvlTree::search`], but starts at the maximum node
    /// and climbs toward the root until the key can lie in the current
    /// subtree, then descends normally. Cheaper than a root search when the
    /// key is close to the maximum.
    pub fn finger_search(&self, key: i64) -> (Option<NodeRef<V>>, usize) {
        let Some(max) = self.max else {
            return (None, 1);
        };
        let mut node = max;
        let mut edges = 1;
        unsafe {
            while key < node.as_ref().key {
                match node.as_ref().parent {
                    Some(p) => {
                        node = p;
                        edges += 1;
                    }
                    None => break,
                }
            }
        }
        let mut cur = Some(node);
        while let Some(ptr) = cur {
            let k = unsafe { ptr.as_ref().key };
            if k == key {
                return (Some(NodeRef(ptr)), edges);
            }
            cur = if k < key {
                unsafe { ptr.as_ref().right }
            } else {
                unsafe { ptr.as_ref().left }
            };
            edges += 1;
        }
        (None, edges - 1)
    }

    /// Plain value lookup.
    pub fn get(&self, key: i64) -> Option<&V> {
        let (node, _) = self.search(key);
        node.map(|n| self.value(n))
    }

    // =========================================================================
    // Insertion
    // =========================================================================

    /// Inserts a new entry, descending from the root.
    ///
    /// Returns the new node, the number of edges on the descent before
    /// rebalancing, and the number of height promotions performed while
    /// rebalancing.
    ///
    /// Panics if `key` is already present.
    pub fn insert(&mut self, key: i64, value: V) -> (NodeRef<V>, usize, usize) {
        let Some(root) = self.root else {
            let node = Node::create(key, value);
            self.root = Some(node);
            self.max = Some(node);
            self.size = 1;
            return (NodeRef(node), 0, 0);
        };
        let (new, edges) = self.attach_from(root, key, value);
        let promotes = self.finish_insert(new, key);
        (NodeRef(new), edges, promotes)
    }

    /// Like [`AvlTree::insert`], but the descent starts at the maximum node
    /// and first climbs while the key belongs below the parent as well.
    /// Falls back to a plain insert on an empty tree.
    pub fn finger_insert(&mut self, key: i64, value: V) -> (NodeRef<V>, usize, usize) {
        let Some(max) = self.max else {
            return self.insert(key, value);
        };
        let mut start = max;
        let mut edges = 0;
        unsafe {
            while key < start.as_ref().key {
                match start.as_ref().parent {
                    Some(p) if key < p.as_ref().key => {
                        start = p;
                        edges += 1;
                    }
                    _ => break,
                }
            }
        }
        let (new, walk) = self.attach_from(start, key, value);
        let promotes = self.finish_insert(new, key);
        (NodeRef(new), edges + walk, promotes)
    }

    /// Descends from `start` to the empty slot where `key` belongs and
    /// links a fresh node there. Returns the node and the edges walked,
    /// including the final step into the empty slot.
    fn attach_from(&mut self, start: NodePtr<V>, key: i64, value: V) -> (NodePtr<V>, usize) {
        let mut cur = start;
        let mut edges = 0;
        let went_left = loop {
            let k = unsafe { cur.as_ref().key };
            assert_ne!(k, key, "key {key} is already present");
            edges += 1;
            if k < key {
                match unsafe { cur.as_ref().right } {
                    Some(n) => cur = n,
                    None => break false,
                }
            } else {
                match unsafe { cur.as_ref().left } {
                    Some(n) => cur = n,
                    None => break true,
                }
            }
        };
        let new = Node::create(key, value);
        if went_left {
            set_left_with_parent(cur, Some(new));
        } else {
            set_right_with_parent(cur, Some(new));
        }
        (new, edges)
    }

    fn finish_insert(&mut self, new: NodePtr<V>, key: i64) -> usize {
        let promotes = self.rebalance_insert(unsafe { new.as_ref().parent });
        if let Some(max) = self.max {
            if key > unsafe { max.as_ref().key } {
                self.max = Some(new);
            }
        }
        self.size += 1;
        self.fix_root();
        promotes
    }

    /// Walks upward from the parent of a freshly linked node. Valid nodes
    /// get their height refreshed (counting a promotion when the cached
    /// height grew stale); a node with balance factor ±2 is rotated and
    /// then re-examined in place. The rotation restores its balance, so
    /// the next iteration falls into the refresh-and-ascend branch and the
    /// walk still reaches every ancestor above the rotation point.
    fn rebalance_insert(&mut self, mut node: Link<V>) -> usize {
        let mut promotes = 0;
        while let Some(ptr) = node {
            let bf = balance_factor(ptr);
            if (-1..=1).contains(&bf) {
                if unsafe { ptr.as_ref().height } < calc_height(ptr) {
                    promotes += 1;
                }
                fix_height(ptr);
                node = unsafe { ptr.as_ref().parent };
            } else {
                self.rotate(ptr);
            }
        }
        promotes
    }

    /// Rotations can hand the root role to another node; re-pin the cached
    /// root by climbing the parent links.
    fn fix_root(&mut self) {
        while let Some(parent) = self.root.and_then(|r| unsafe { r.as_ref().parent }) {
            self.root = Some(parent);
        }
    }

    // =========================================================================
    // Rotations
    // =========================================================================

    /// Dispatches the rotation(s) that fix a node with balance factor ±2.
    fn rotate(&mut self, node: NodePtr<V>) {
        if balance_factor(node) == 2 {
            let left = unsafe { node.as_ref().left }.expect("left-heavy node has a left child");
            if balance_factor(left) >= 0 {
                self.right_rotate(node);
            } else {
                // Left-right case.
                self.left_rotate(left);
                self.right_rotate(node);
            }
        } else {
            let right = unsafe { node.as_ref().right }.expect("right-heavy node has a right child");
            if balance_factor(right) <= 0 {
                self.left_rotate(node);
            } else {
                // Right-left case.
                self.right_rotate(right);
                self.left_rotate(node);
            }
        }
    }

    fn right_rotate(&mut self, node: NodePtr<V>) {
        let pivot = unsafe { node.as_ref().left }.expect("right rotation requires a left child");
        match unsafe { node.as_ref().parent } {
            None => {
                // The rotated node was the root; the pivot takes over.
                self.root = Some(pivot);
                unsafe {
                    (*pivot.as_ptr()).parent = None;
                }
            }
            Some(parent) => {
                if unsafe { parent.as_ref().left } == Some(node) {
                    set_left_with_parent(parent, Some(pivot));
                } else {
                    set_right_with_parent(parent, Some(pivot));
                }
            }
        }
        // The pivot's inner subtree moves under the rotated node.
        set_left_with_parent(node, unsafe { pivot.as_ref().right });
        set_right_with_parent(pivot, Some(node));
        // The rotated node first: the pivot's height depends on it.
        fix_height(node);
        fix_height(pivot);
    }

    fn left_rotate(&mut self, node: NodePtr<V>) {
        let pivot = unsafe { node.as_ref().right }.expect("left rotation requires a right child");
        match unsafe { node.as_ref().parent } {
            None => {
                self.root = Some(pivot);
                unsafe {
                    (*pivot.as_ptr()).parent = None;
                }
            }
            Some(parent) => {
                if unsafe { parent.as_ref().left } == Some(node) {
                    set_left_with_parent(parent, Some(pivot));
                } else {
                    set_right_with_parent(parent, Some(pivot));
                }
            }
        }
        set_right_with_parent(node, unsafe { pivot.as_ref().left });
        set_left_with_parent(pivot, Some(node));
        fix_height(node);
        fix_height(pivot);
    }

    // =========================================================================
    // Deletion
    // =========================================================================

    /// Removes a node from the tree and returns its value.
    ///
    /// `node` must be a live handle into this tree.
    pub fn delete(&mut self, node: NodeRef<V>) -> V {
        let ptr = node.0;
        let was_max = self.max == Some(ptr);
        let (left, right, parent) = {
            let n = unsafe { ptr.as_ref() };
            (n.left, n.right, n.parent)
        };

        match (left, right) {
            (None, None) => {
                self.replace_node(ptr, None);
                self.rebalance_delete(parent);
            }
            (Some(child), None) | (None, Some(child)) => {
                // Splice the lone child into the node's position.
                self.replace_node(ptr, Some(child));
                self.rebalance_delete(Some(child));
            }
            (Some(left), Some(right)) => {
                // In-order successor: leftmost node of the right subtree.
                let mut succ = right;
                while let Some(l) = unsafe { succ.as_ref().left } {
                    succ = l;
                }
                let succ_parent = unsafe { succ.as_ref().parent };
                if succ_parent != Some(ptr) {
                    // Detach the successor first, then adopt the right subtree.
                    self.replace_node(succ, unsafe { succ.as_ref().right });
                    set_right_with_parent(succ, Some(right));
                }
                self.replace_node(ptr, Some(succ));
                set_left_with_parent(succ, Some(left));
                if succ_parent != Some(ptr) {
                    self.rebalance_delete(succ_parent);
                } else {
                    self.rebalance_delete(Some(succ));
                }
            }
        }

        // SAFETY: the node is fully unlinked; nothing else references it.
        let (_, value) = unsafe { Node::destroy(ptr) };
        self.size -= 1;
        if self.size == 0 {
            self.max = None;
        } else if was_max {
            self.update_max();
        }
        value
    }

    /// Points the parent (or the root slot) of `old` at `new` instead.
    /// `old`'s own links are left untouched.
    fn replace_node(&mut self, old: NodePtr<V>, new: Link<V>) {
        match unsafe { old.as_ref().parent } {
            None => {
                self.root = new;
                if let Some(n) = new {
                    unsafe {
                        (*n.as_ptr()).parent = None;
                    }
                }
            }
            Some(parent) => {
                if unsafe { parent.as_ref().left } == Some(old) {
                    set_left_with_parent(parent, new);
                } else {
                    set_right_with_parent(parent, new);
                }
            }
        }
    }

    /// Walks from `node` all the way to the root, refreshing heights and
    /// rotating wherever the balance factor left `[-1, 1]`. Unlike the
    /// insertion walk this never stops early: a deletion can demand a
    /// rotation at every level.
    fn rebalance_delete(&mut self, mut node: Link<V>) {
        while let Some(ptr) = node {
            fix_height(ptr);
            if balance_factor(ptr).abs() > 1 {
                self.rotate(ptr);
            }
            node = unsafe { ptr.as_ref().parent };
        }
    }

    /// Recomputes the max cache by walking the right spine.
    fn update_max(&mut self) {
        let Some(mut cur) = self.root else {
            self.max = None;
            return;
        };
        while let Some(r) = unsafe { cur.as_ref().right } {
            cur = r;
        }
        self.max = Some(cur);
    }

    // =========================================================================
    // Join
    // =========================================================================

    /// Absorbs `other` into `self` around the separator entry `(key, value)`.
    ///
    /// Precondition: all keys on one side are strictly less than `key` and
    /// all keys on the other side strictly greater. The taller tree is
    /// walked down its facing spine until the heights meet, so the cost is
    /// O(|h1 − h2|) rather than O(log(n1 + n2)).
    pub fn join(&mut self, mut other: AvlTree<V>, key: i64, value: V) {
        let Some(self_root) = self.root else {
            other.insert(key, value);
            *self = other;
            return;
        };
        if other.root.is_none() {
            self.insert(key, value);
            return;
        }

        // Normalize so that self holds the keys below the separator.
        if unsafe { self_root.as_ref().key } > key {
            mem::swap(self, &mut other);
        }

        let size = self.size + other.size + 1;
        let h1 = link_height(self.root);
        let h2 = link_height(other.root);
        let sep = Node::create(key, value);

        if h1 <= h2 {
            // Walk the left spine of the taller tree down to height h1
            // (or just below it), tracking the attachment parent.
            let mut c: Link<V> = None;
            let mut b = other.root;
            while link_height(b) > h1 {
                c = b;
                b = unsafe { b.expect("spine walk stays above missing children").as_ref().left };
            }
            set_left_with_parent(sep, self.root);
            set_right_with_parent(sep, b);
            fix_height(sep);
            match c {
                Some(c) => {
                    set_left_with_parent(c, Some(sep));
                    self.root = other.root;
                }
                // Equal heights: the separator becomes the root.
                None => self.root = Some(sep),
            }
        } else {
            let mut c: Link<V> = None;
            let mut b = self.root;
            while link_height(b) > h2 {
                c = b;
                b = unsafe { b.expect("spine walk stays above missing children").as_ref().right };
            }
            set_right_with_parent(sep, other.root);
            set_left_with_parent(sep, b);
            fix_height(sep);
            let c = c.expect("the taller tree has a spine node above the join point");
            set_right_with_parent(c, Some(sep));
        }

        self.max = other.max;
        self.size = size;
        // Every node of the donor now lives in self.
        other.root = None;
        other.max = None;
        other.size = 0;

        self.rebalance_delete(Some(sep));
    }

    // =========================================================================
    // Split
    // =========================================================================

    /// Partitions the tree at `node` into the tree of strictly smaller keys
    /// and the tree of strictly greater keys. The boundary entry itself is
    /// dropped. Both results are valid, balanced, independently owned trees.
    ///
    /// `node` must be a live handle into this tree.
    pub fn split(self, node: NodeRef<V>) -> (AvlTree<V>, AvlTree<V>) {
        let (mut left, mut right) = self.rec_split(node.0);
        left.update_max();
        right.update_max();
        left.size = Self::subtree_len(left.root);
        right.size = Self::subtree_len(right.root);
        (left, right)
    }

    /// Recursive splitting step. Detaches the root, splits the side that
    /// contains `at`, and joins the off-side subtree back using the old
    /// root's entry as the separator. The joins performed while unwinding
    /// have telescoping heights, keeping the total work logarithmic.
    /// Intermediate trees carry placeholder max/size caches; the public
    /// wrapper refreshes both.
    fn rec_split(mut self, at: NodePtr<V>) -> (Self, Self) {
        let root = self.root.take().expect("split node belongs to the tree");
        self.max = None;
        self.size = 0;

        let (left_link, right_link) = {
            let n = unsafe { root.as_ref() };
            (n.left, n.right)
        };
        let left_tree = Self::from_subtree(left_link);
        let right_tree = Self::from_subtree(right_link);

        if root == at {
            // SAFETY: the root has been detached from both subtrees.
            unsafe {
                Node::destroy(root);
            }
            return (left_tree, right_tree);
        }

        let at_key = unsafe { at.as_ref().key };
        // SAFETY: detached as above; its entry becomes the join separator.
        let (root_key, root_value) = unsafe { Node::destroy(root) };

        if at_key < root_key {
            let (l_left, mut l_right) = left_tree.rec_split(at);
            l_right.join(right_tree, root_key, root_value);
            (l_left, l_right)
        } else {
            let (mut r_left, r_right) = right_tree.rec_split(at);
            r_left.join(left_tree, root_key, root_value);
            (r_left, r_right)
        }
    }

    /// Wraps a detached subtree as a standalone tree. The max/size caches
    /// are placeholders until the split wrapper refreshes them.
    fn from_subtree(link: Link<V>) -> Self {
        if let Some(p) = link {
            unsafe {
                (*p.as_ptr()).parent = None;
            }
        }
        AvlTree {
            root: link,
            max: link,
            size: 0,
        }
    }

    fn subtree_len(link: Link<V>) -> usize {
        match link {
            None => 0,
            Some(ptr) => {
                let node = unsafe { &*ptr.as_ptr() };
                1 + Self::subtree_len(node.left) + Self::subtree_len(node.right)
            }
        }
    }

    // =========================================================================
    // Traversal
    // =========================================================================

    /// In-order materialization of the tree as ascending `(key, value)`
    /// pairs.
    pub fn to_ordered_vec(&self) -> Vec<(i64, &V)> {
        let mut out = Vec::with_capacity(self.size);
        self.push_in_order(self.root, &mut out);
        out
    }

    fn push_in_order<'a>(&'a self, link: Link<V>, out: &mut Vec<(i64, &'a V)>) {
        if let Some(ptr) = link {
            // SAFETY: nodes reachable from the root live at least as long
            // as the borrow of self.
            let node = unsafe { &*ptr.as_ptr() };
            self.push_in_order(node.left, out);
            out.push((node.key, &node.value));
            self.push_in_order(node.right, out);
        }
    }

    // =========================================================================
    // Validation (test builds only)
    // =========================================================================

    #[cfg(test)]
    pub fn check_consistency(&self) {
        if let Some(root) = self.root {
            assert!(
                unsafe { root.as_ref().parent }.is_none(),
                "root must not have a parent"
            );
        }
        let mut count = 0usize;
        self.check_subtree(self.root, None, &mut count);
        assert_eq!(count, self.size, "cached size must match reachable nodes");
        match self.max {
            None => assert_eq!(self.size, 0, "max pointer missing on a non-empty tree"),
            Some(max) => {
                let mut cur = self.root.expect("a max pointer implies a root");
                while let Some(r) = unsafe { cur.as_ref().right } {
                    cur = r;
                }
                assert_eq!(cur, max, "max pointer must be the rightmost node");
            }
        }
    }

    #[cfg(test)]
    fn check_subtree(&self, link: Link<V>, parent: Link<V>, count: &mut usize) {
        let Some(ptr) = link else {
            return;
        };
        let node = unsafe { &*ptr.as_ptr() };
        assert_eq!(node.parent, parent, "parent link out of sync");
        if let Some(l) = node.left {
            assert!(unsafe { l.as_ref().key } < node.key, "left child key order");
        }
        if let Some(r) = node.right {
            assert!(unsafe { r.as_ref().key } > node.key, "right child key order");
        }
        assert_eq!(
            node.height,
            1 + cmp::max(link_height(node.left), link_height(node.right)),
            "stale cached height at key {}",
            node.key
        );
        let bf = link_height(node.left) - link_height(node.right);
        assert!(
            (-1..=1).contains(&bf),
            "balance factor {bf} out of range at key {}",
            node.key
        );
        *count += 1;
        self.check_subtree(node.left, link, count);
        self.check_subtree(node.right, link, count);
    }
}

impl<V> Default for AvlTree<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> Drop for AvlTree<V> {
    fn drop(&mut self) {
        drop_subtree(self.root.take());
    }
}

impl<V: Clone> Clone for AvlTree<V> {
    fn clone(&self) -> Self {
        let root = clone_subtree(self.root, None);
        let mut tree = AvlTree {
            root,
            max: None,
            size: self.size,
        };
        tree.update_max();
        tree
    }
}

impl<V: fmt::Debug> fmt::Debug for AvlTree<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.to_ordered_vec()).finish()
    }
}


#[cfg(test)]
mod proptests;
