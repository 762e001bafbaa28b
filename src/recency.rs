// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Per-tier recency tracking.
//!
//! A doubly-linked list stored in a slab, plus a key index, so touch and
//! remove are O(1) and traversal runs least- to most-recently used:
//!
//! ```text
//!   index: HashMap<K, slot>
//!            │
//!   head ──► [a] ⇄ [b] ⇄ [c] ◄── tail
//!   (LRU)                      (MRU)
//! ```
//!
//! Freed slots are recycled, so the slab never grows beyond the peak
//! number of tracked keys.
//!
//! # Example
//!
//! ```
//! use tiering_engine::RecencyTracker;
//!
//! let mut lru = RecencyTracker::new();
//! lru.touch("a");
//! lru.touch("b");
//! lru.touch("a");
//! assert_eq!(lru.iter_lru().copied().collect::<Vec<_>>(), vec!["b", "a"]);
//! ```

use std::borrow::Borrow;
use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Slot(u32);

#[derive(Debug)]
struct Node<K> {
    key: K,
    prev: Option<Slot>,
    next: Option<Slot>,
}

/// Recency order over a set of keys.
#[derive(Debug)]
pub struct RecencyTracker<K: Eq + Hash + Clone> {
    slots: Vec<Option<Node<K>>>,
    free: Vec<u32>,
    index: HashMap<K, Slot>,
    head: Option<Slot>,
    tail: Option<Slot>,
}

impl<K: Eq + Hash + Clone> RecencyTracker<K> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: None,
            tail: None,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    #[must_use]
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.index.contains_key(key)
    }

    /// Mark `key` as most recently used, inserting it if absent.
    ///
    /// Returns `true` when the key was newly inserted.
    pub fn touch(&mut self, key: K) -> bool {
        if let Some(&slot) = self.index.get(&key) {
            self.move_to_back(slot);
            return false;
        }
        let slot = self.alloc(key.clone());
        self.link_back(slot);
        self.index.insert(key, slot);
        true
    }

    /// Mark `key` as most recently used only if it is already tracked.
    pub fn touch_existing<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        match self.index.get(key) {
            Some(&slot) => {
                self.move_to_back(slot);
                true
            }
            None => false,
        }
    }

    /// Stop tracking `key`. Returns `false` if it was not tracked.
    pub fn remove<Q>(&mut self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let Some(slot) = self.index.remove(key) else {
            return false;
        };
        self.unlink(slot);
        self.release(slot);
        true
    }

    /// Remove and return the least recently used key.
    pub fn pop_lru(&mut self) -> Option<K> {
        let slot = self.head?;
        let key = self.node(slot)?.key.clone();
        self.index.remove(&key);
        self.unlink(slot);
        self.release(slot);
        Some(key)
    }

    #[must_use]
    pub fn lru(&self) -> Option<&K> {
        self.head.and_then(|s| self.node(s)).map(|n| &n.key)
    }

    #[must_use]
    pub fn mru(&self) -> Option<&K> {
        self.tail.and_then(|s| self.node(s)).map(|n| &n.key)
    }

    /// Least recently used first.
    pub fn iter_lru(&self) -> Iter<'_, K> {
        Iter {
            tracker: self,
            cursor: self.head,
            forward: true,
        }
    }

    /// Most recently used first.
    pub fn iter_mru(&self) -> Iter<'_, K> {
        Iter {
            tracker: self,
            cursor: self.tail,
            forward: false,
        }
    }

    /// Up to `n` keys, least recently used first.
    #[must_use]
    pub fn lru_items(&self, n: usize) -> Vec<K> {
        self.iter_lru().take(n).cloned().collect()
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.free.clear();
        self.index.clear();
        self.head = None;
        self.tail = None;
    }

    fn node(&self, slot: Slot) -> Option<&Node<K>> {
        self.slots.get(slot.0 as usize).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, slot: Slot) -> Option<&mut Node<K>> {
        self.slots.get_mut(slot.0 as usize).and_then(Option::as_mut)
    }

    fn alloc(&mut self, key: K) -> Slot {
        let node = Node {
            key,
            prev: None,
            next: None,
        };
        if let Some(free) = self.free.pop() {
            self.slots[free as usize] = Some(node);
            Slot(free)
        } else {
            self.slots.push(Some(node));
            Slot((self.slots.len() - 1) as u32)
        }
    }

    fn release(&mut self, slot: Slot) {
        if let Some(entry) = self.slots.get_mut(slot.0 as usize) {
            *entry = None;
            self.free.push(slot.0);
        }
    }

    /// Detach a node from its neighbours, leaving it allocated.
    fn unlink(&mut self, slot: Slot) {
        let Some((prev, next)) = self.node(slot).map(|n| (n.prev, n.next)) else {
            return;
        };
        match prev {
            Some(p) => {
                if let Some(node) = self.node_mut(p) {
                    node.next = next;
                }
            }
            None => self.head = next,
        }
        match next {
            Some(n) => {
                if let Some(node) = self.node_mut(n) {
                    node.prev = prev;
                }
            }
            None => self.tail = prev,
        }
        if let Some(node) = self.node_mut(slot) {
            node.prev = None;
            node.next = None;
        }
    }

    fn link_back(&mut self, slot: Slot) {
        let old_tail = self.tail;
        if let Some(node) = self.node_mut(slot) {
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(t) => {
                if let Some(node) = self.node_mut(t) {
                    node.next = Some(slot);
                }
            }
            None => self.head = Some(slot),
        }
        self.tail = Some(slot);
    }

    fn move_to_back(&mut self, slot: Slot) {
        if self.tail == Some(slot) {
            return;
        }
        self.unlink(slot);
        self.link_back(slot);
    }
}

impl<K: Eq + Hash + Clone> Default for RecencyTracker<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over tracked keys in recency order.
pub struct Iter<'a, K: Eq + Hash + Clone> {
    tracker: &'a RecencyTracker<K>,
    cursor: Option<Slot>,
    forward: bool,
}

impl<'a, K: Eq + Hash + Clone> Iterator for Iter<'a, K> {
    type Item = &'a K;

    fn next(&mut self) -> Option<&'a K> {
        let node = self.tracker.node(self.cursor?)?;
        self.cursor = if self.forward { node.next } else { node.prev };
        Some(&node.key)
    }
}
