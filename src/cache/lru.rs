//! LRU Store Module
//!
//! Byte-budgeted key/value store with least recently used eviction.

use std::collections::HashMap;
use std::fmt;

use crate::cache::ByteView;

/// Sentinel index for "no node".
const NIL: usize = usize::MAX;

/// Callback invoked with every entry the store evicts.
pub type OnEvicted = Box<dyn FnMut(&str, &ByteView) + Send>;

// == List Node ==
#[derive(Debug)]
struct Node {
    key: String,
    value: ByteView,
    prev: usize,
    next: usize,
}

// == LRU Store ==
/// Key/value store bounded by a byte budget.
///
/// Entries live in a slab of nodes linked into a recency list:
/// - `head` = Most recently used
/// - `tail` = Least recently used
///
/// `get` and `put` are O(1). The size charged for an entry is
/// `key.len() + value.len()`. A `max_bytes` of zero means unbounded.
///
/// Not synchronized; see [`crate::cache::ConcurrentCache`] for the shared
/// version.
pub struct LruStore {
    /// Byte budget, 0 = unbounded
    max_bytes: usize,
    /// Sum of key and value sizes of all entries
    used_bytes: usize,
    /// Node storage, `None` slots are on the free list
    slots: Vec<Option<Node>>,
    /// Reusable slot indices
    free: Vec<usize>,
    /// Key to slot index
    index: HashMap<String, usize>,
    head: usize,
    tail: usize,
    on_evicted: Option<OnEvicted>,
}

impl LruStore {
    // == Constructor ==
    /// Creates an empty store with the given byte budget.
    pub fn new(max_bytes: usize) -> Self {
        Self {
            max_bytes,
            used_bytes: 0,
            slots: Vec::new(),
            free: Vec::new(),
            index: HashMap::new(),
            head: NIL,
            tail: NIL,
            on_evicted: None,
        }
    }

    /// Creates an empty store that reports evictions to `on_evicted`.
    pub fn with_eviction_callback(max_bytes: usize, on_evicted: OnEvicted) -> Self {
        let mut store = Self::new(max_bytes);
        store.on_evicted = Some(on_evicted);
        store
    }

    // == Get ==
    /// Looks up a key and marks it as most recently used.
    pub fn get(&mut self, key: &str) -> Option<ByteView> {
        let idx = *self.index.get(key)?;
        self.move_to_front(idx);
        self.slots[idx].as_ref().map(|node| node.value.clone())
    }

    // == Put ==
    /// Inserts or updates an entry, then evicts until the budget holds.
    ///
    /// An entry larger than the whole budget is evicted right away.
    pub fn put(&mut self, key: String, value: ByteView) {
        if let Some(&idx) = self.index.get(&key) {
            if let Some(node) = self.slots[idx].as_mut() {
                self.used_bytes = self.used_bytes - node.value.len() + value.len();
                node.value = value;
            }
            self.move_to_front(idx);
        } else {
            self.used_bytes += key.len() + value.len();
            let node = Node {
                key: key.clone(),
                value,
                prev: NIL,
                next: NIL,
            };
            let idx = match self.free.pop() {
                Some(idx) => {
                    self.slots[idx] = Some(node);
                    idx
                }
                None => {
                    self.slots.push(Some(node));
                    self.slots.len() - 1
                }
            };
            self.index.insert(key, idx);
            self.push_front(idx);
        }

        while self.max_bytes != 0 && self.used_bytes > self.max_bytes {
            if self.remove_oldest().is_none() {
                break;
            }
        }
    }

    // == Remove ==
    /// Removes a key without invoking the eviction callback.
    pub fn remove(&mut self, key: &str) -> Option<ByteView> {
        let idx = self.index.get(key).copied()?;
        self.take(idx).map(|(_, value)| value)
    }

    // == Remove Oldest ==
    /// Evicts the least recently used entry and reports it to the callback.
    pub fn remove_oldest(&mut self) -> Option<(String, ByteView)> {
        if self.tail == NIL {
            return None;
        }
        let (key, value) = self.take(self.tail)?;
        if let Some(on_evicted) = self.on_evicted.as_mut() {
            on_evicted(&key, &value);
        }
        Some((key, value))
    }

    /// Checks for a key without touching its recency.
    pub fn contains(&self, key: &str) -> bool {
        self.index.contains_key(key)
    }

    /// Returns the keys from most to least recently used.
    pub fn keys(&self) -> Vec<String> {
        let mut keys = Vec::with_capacity(self.index.len());
        let mut cursor = self.head;
        while let Some(node) = self.slots.get(cursor).and_then(Option::as_ref) {
            keys.push(node.key.clone());
            cursor = node.next;
        }
        keys
    }

    // == Length ==
    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.index.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Returns the bytes currently charged against the budget.
    pub fn used_bytes(&self) -> usize {
        self.used_bytes
    }

    /// Returns the configured budget (0 = unbounded).
    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    // == List Maintenance ==
    fn take(&mut self, idx: usize) -> Option<(String, ByteView)> {
        self.unlink(idx);
        let node = self.slots[idx].take()?;
        self.free.push(idx);
        self.index.remove(&node.key);
        self.used_bytes -= node.key.len() + node.value.len();
        Some((node.key, node.value))
    }

    fn move_to_front(&mut self, idx: usize) {
        if self.head == idx {
            return;
        }
        self.unlink(idx);
        self.push_front(idx);
    }

    fn unlink(&mut self, idx: usize) {
        let (prev, next) = match self.slots[idx].as_ref() {
            Some(node) => (node.prev, node.next),
            None => return,
        };

        match self.slots.get_mut(prev).and_then(Option::as_mut) {
            Some(prev_node) => prev_node.next = next,
            None => self.head = next,
        }
        match self.slots.get_mut(next).and_then(Option::as_mut) {
            Some(next_node) => next_node.prev = prev,
            None => self.tail = prev,
        }

        if let Some(node) = self.slots[idx].as_mut() {
            node.prev = NIL;
            node.next = NIL;
        }
    }

    fn push_front(&mut self, idx: usize) {
        let old_head = self.head;
        if let Some(node) = self.slots[idx].as_mut() {
            node.prev = NIL;
            node.next = old_head;
        }
        match self.slots.get_mut(old_head).and_then(Option::as_mut) {
            Some(head_node) => head_node.prev = idx,
            None => self.tail = idx,
        }
        self.head = idx;
    }
}

impl fmt::Debug for LruStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruStore")
            .field("max_bytes", &self.max_bytes)
            .field("used_bytes", &self.used_bytes)
            .field("len", &self.len())
            .finish()
    }
}
