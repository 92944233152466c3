//! Robin-hood interning table
//!
//! [`HashRing`] assigns every distinct byte string a dense, insertion-ordered
//! [`InternId`] and keeps an owned copy of the key so the caller's buffer can
//! be reused right after [`HashRing::put`] returns. Collisions are resolved
//! with robin-hood open addressing over a cyclic slot array: a probing entry
//! that has travelled further from its home slot than the resident entry takes
//! the slot, and the resident continues probing.
//!
//! Entries are never updated or removed. Key bytes live in a single arena that
//! is released with the table.

use rustc_hash::FxHasher;
use std::hash::{BuildHasher, BuildHasherDefault, Hasher};
use std::mem;
use std::ops::Range;
use tracing::debug;

/// Default hasher state, the same Fx hash the profiling string tables use
pub type FxBuildHasher = BuildHasherDefault<FxHasher>;

/// Capacity multiplier applied on every grow
const GROW_FACTOR: usize = 2;

// Maximum load factor, 4/5 = 80%.
const LOAD_NUMERATOR: usize = 4;
const LOAD_DENOMINATOR: usize = 5;

/// Identifier of an interned string
///
/// Ids are 0-based and handed out in insertion order, so after `n` distinct
/// insertions the live ids are exactly `0..n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct InternId(usize);

impl InternId {
    /// Create an id from a 0-based offset
    pub fn from_offset(offset: usize) -> Self {
        InternId(offset)
    }

    /// The 0-based offset of this id
    pub fn offset(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy)]
struct Slot {
    hash: u64,
    /// Slots travelled past the home slot
    distance: usize,
    id: InternId,
}

/// Robin-hood open-addressing table that interns byte strings
///
/// # Examples
///
/// ```
/// use csvtape::HashRing;
///
/// let mut ring = HashRing::new();
/// let id = ring.put(b"name");
/// assert_eq!(ring.put(b"name"), id);
/// assert_eq!(ring.get(b"name"), Some(id));
/// assert_eq!(ring.reverse(id), Some(&b"name"[..]));
/// assert_eq!(ring.get(b"missing"), None);
/// ```
#[derive(Debug, Clone)]
pub struct HashRing<S = FxBuildHasher> {
    slots: Vec<Option<Slot>>,
    /// Owned key bytes of every interned string, in id order
    bytes: Vec<u8>,
    /// Reverse index: id offset -> span of `bytes`
    spans: Vec<Range<usize>>,
    hasher: S,
}

impl HashRing {
    /// Create a table with the default capacity
    pub fn new() -> Self {
        Self::with_capacity(crate::options::DEFAULT_RING_CAPACITY)
    }

    /// Create a table with room for `capacity` slots (at least one)
    pub fn with_capacity(capacity: usize) -> Self {
        Self::with_capacity_and_hasher(capacity, FxBuildHasher::default())
    }
}

impl Default for HashRing {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: BuildHasher> HashRing<S> {
    /// Create a table with the given slot capacity and hasher state
    pub fn with_capacity_and_hasher(capacity: usize, hasher: S) -> Self {
        HashRing {
            slots: vec![None; capacity.max(1)],
            bytes: Vec::new(),
            spans: Vec::new(),
            hasher,
        }
    }

    /// Number of distinct strings interned so far
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    /// Whether nothing has been interned yet
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// Current number of slots
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Intern `key`, returning its id
    ///
    /// Returns the existing id when an identical key is already present,
    /// otherwise copies the key and assigns the next sequential id.
    pub fn put(&mut self, key: &[u8]) -> InternId {
        let hash = self.hash(key);
        let capacity = self.slots.len();
        let mut index = home(hash, capacity);
        let mut distance = 0;

        loop {
            match self.slots[index] {
                None => break,
                // The resident is closer to home than we are, so the key
                // would already have displaced it if it were present.
                Some(stored) if stored.distance < distance => break,
                Some(stored) => {
                    if stored.hash == hash && self.key(stored.id) == key {
                        return stored.id;
                    }
                }
            }
            distance += 1;
            index = (index + 1) % capacity;
        }

        let id = self.push_key(key);
        let entry = Slot { hash, distance, id };
        if self.len() * LOAD_DENOMINATOR > capacity * LOAD_NUMERATOR {
            let mut target = capacity * GROW_FACTOR;
            while self.len() * LOAD_DENOMINATOR > target * LOAD_NUMERATOR {
                target *= GROW_FACTOR;
            }
            self.grow(target);
            self.insert(Slot { distance: 0, ..entry });
        } else {
            self.place(entry, index);
        }
        id
    }

    /// Look up the id of `key` without inserting it
    pub fn get(&self, key: &[u8]) -> Option<InternId> {
        let hash = self.hash(key);
        let capacity = self.slots.len();
        let mut index = home(hash, capacity);
        let mut distance = 0;

        loop {
            let stored = self.slots[index]?;
            if stored.distance < distance {
                return None;
            }
            if stored.hash == hash && self.key(stored.id) == key {
                return Some(stored.id);
            }
            distance += 1;
            index = (index + 1) % capacity;
        }
    }

    /// The key interned under `id`, if `id` has been assigned
    pub fn reverse(&self, id: InternId) -> Option<&[u8]> {
        self.spans.get(id.0).map(|span| &self.bytes[span.clone()])
    }

    /// Iterate over `(id, key)` pairs in id order
    pub fn iter(&self) -> impl Iterator<Item = (InternId, &[u8])> + '_ {
        self.spans
            .iter()
            .enumerate()
            .map(move |(offset, span)| (InternId(offset), &self.bytes[span.clone()]))
    }

    fn hash(&self, key: &[u8]) -> u64 {
        let mut hasher = self.hasher.build_hasher();
        hasher.write(key);
        hasher.finish()
    }

    fn key(&self, id: InternId) -> &[u8] {
        &self.bytes[self.spans[id.0].clone()]
    }

    fn push_key(&mut self, key: &[u8]) -> InternId {
        let id = InternId(self.spans.len());
        let start = self.bytes.len();
        self.bytes.extend_from_slice(key);
        self.spans.push(start..self.bytes.len());
        id
    }

    /// Rebuild the slot array at `capacity`, re-probing every entry from its
    /// new home slot.
    fn grow(&mut self, capacity: usize) {
        assert!(
            capacity > self.len(),
            "HashRing grow target {} must exceed size {}",
            capacity,
            self.len()
        );
        let old = mem::replace(&mut self.slots, vec![None; capacity]);
        for slot in old.into_iter().flatten() {
            self.insert(Slot { distance: 0, ..slot });
        }
        debug!(capacity, size = self.len(), "grew intern table");
    }

    fn insert(&mut self, entry: Slot) {
        let index = home(entry.hash, self.slots.len());
        self.place(entry, index);
    }

    /// Robin-hood placement starting at `index`, where `entry` has already
    /// travelled `entry.distance` slots.
    fn place(&mut self, mut entry: Slot, mut index: usize) {
        let capacity = self.slots.len();
        loop {
            match self.slots[index].as_mut() {
                None => {
                    self.slots[index] = Some(entry);
                    return;
                }
                Some(stored) => {
                    if stored.distance < entry.distance {
                        mem::swap(stored, &mut entry);
                    }
                }
            }
            entry.distance += 1;
            index = (index + 1) % capacity;
        }
    }
}

/// Home slot of `hash`; uses the high bits, which Fx mixes best.
fn home(hash: u64, capacity: usize) -> usize {
    ((u128::from(hash) * capacity as u128) >> 64) as usize
}
