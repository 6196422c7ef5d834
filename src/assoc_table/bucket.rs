use std::collections::TryReserveError;
use std::iter::Rev;
use std::mem::replace;
use std::slice;

/// State of an [`Entry`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Slot<V> {
    /// The entry holds a value that is visible to lookups.
    Live(V),
    /// The entry was deleted; it stays in the chain until the next resize.
    Tombstone,
}

/// [`Entry`] owns a copy of its key and the state of its value.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Entry<V> {
    key: String,
    slot: Slot<V>,
}

/// [`Bucket`] owns a chain of entries whose keys were mapped to the same index.
///
/// The chain is stored in a vector with its head at the end, therefore prepending an entry is a
/// push and a head-to-tail scan walks the vector backwards.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Bucket<V> {
    chain: Vec<Entry<V>>,
}

impl<V> Entry<V> {
    /// Creates a new live [`Entry`].
    #[inline]
    pub(crate) const fn new(key: String, val: V) -> Self {
        Self {
            key,
            slot: Slot::Live(val),
        }
    }

    /// Returns the key.
    #[inline]
    pub(crate) fn key(&self) -> &str {
        &self.key
    }

    /// Returns a reference to the value if the entry is live.
    #[inline]
    pub(crate) const fn value(&self) -> Option<&V> {
        match &self.slot {
            Slot::Live(val) => Some(val),
            Slot::Tombstone => None,
        }
    }

    /// Returns `true` if the entry was deleted.
    #[inline]
    pub(crate) const fn is_tombstone(&self) -> bool {
        matches!(self.slot, Slot::Tombstone)
    }

    /// Returns `true` if the entry is live and its key equals `key`.
    #[inline]
    fn matches(&self, key: &str) -> bool {
        !self.is_tombstone() && self.key == key
    }
}

impl<V> Bucket<V> {
    /// Creates an empty [`Bucket`].
    #[inline]
    pub(crate) const fn new() -> Self {
        Self { chain: Vec::new() }
    }

    /// Returns the number of entries in the chain including tombstones.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.chain.len()
    }

    /// Returns the number of tombstones in the chain.
    #[inline]
    pub(crate) fn num_tombstones(&self) -> usize {
        self.chain.iter().filter(|e| e.is_tombstone()).count()
    }

    /// Iterates over the chain from head to tail.
    #[inline]
    pub(crate) fn iter(&self) -> Rev<slice::Iter<'_, Entry<V>>> {
        self.chain.iter().rev()
    }

    /// Searches the chain for a live entry with the key.
    #[inline]
    pub(crate) fn search(&self, key: &str) -> Option<&V> {
        self.iter().find(|e| e.matches(key)).and_then(Entry::value)
    }

    /// Searches the chain for a live entry with the key, and returns a mutable reference to it.
    #[inline]
    pub(crate) fn search_mut(&mut self, key: &str) -> Option<&mut V> {
        self.chain
            .iter_mut()
            .rev()
            .find(|e| e.matches(key))
            .and_then(|e| match &mut e.slot {
                Slot::Live(val) => Some(val),
                Slot::Tombstone => None,
            })
    }

    /// Makes sure that the next [`prepend`](Self::prepend) does not allocate.
    #[inline]
    pub(crate) fn reserve(&mut self, additional: usize) -> Result<(), TryReserveError> {
        self.chain.try_reserve(additional)
    }

    /// Prepends the entry to the chain.
    ///
    /// Memory for the entry should have been reserved beforehand.
    #[inline]
    pub(crate) fn prepend(&mut self, entry: Entry<V>) {
        debug_assert!(self.chain.len() < self.chain.capacity());
        self.chain.push(entry);
    }

    /// Marks the first live entry with the key as a tombstone and returns its value.
    ///
    /// The memory of the entry is retained until the chain is rebuilt.
    pub(crate) fn mark_removed(&mut self, key: &str) -> Option<V> {
        let entry = self.chain.iter_mut().rev().find(|e| e.matches(key))?;
        match replace(&mut entry.slot, Slot::Tombstone) {
            Slot::Live(val) => Some(val),
            Slot::Tombstone => None,
        }
    }

    /// Takes every entry out of the chain from head to tail.
    #[inline]
    pub(crate) fn drain(&mut self) -> impl Iterator<Item = Entry<V>> + '_ {
        self.chain.drain(..).rev()
    }
}

impl<V> Default for Bucket<V> {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
