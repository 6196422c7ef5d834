//! [`AssocTable`] is a string-keyed hash table with separate chaining and lazy deletion.

pub(crate) mod bucket;
pub(crate) mod bucket_array;

use std::fmt::{self, Debug};
use std::hash::{BuildHasher, Hasher};
use std::iter::{FusedIterator, Rev};
use std::mem::replace;
use std::slice;

use log::{debug, trace, warn};

use crate::config::TableConfig;
use crate::error::{Result, TableError};
use crate::fnv::Fnv1a;
use bucket::{Bucket, Entry};
use bucket_array::BucketArray;

/// String-keyed hash table.
///
/// [`AssocTable`] has an array of buckets, and each bucket owns a chain of the entries whose keys
/// were mapped to it. The bucket of a key is `hash(key) % capacity` where `hash` is the injected
/// [`BuildHasher`], FNV-1a by default.
///
/// ## Growth
///
/// Before a new key is added, the table checks whether `(len + 1) / capacity` would exceed the
/// maximum load factor, and if so, the bucket array is multiplied by the growth factor and every
/// live entry is relocated. The capacity never shrinks.
///
/// ## Lazy deletion
///
/// [`AssocTable::delete`] only marks the entry as a tombstone; the key stays in its chain,
/// invisible to lookups, until the next resize drops it.
///
/// ## Allocation failure
///
/// Allocation failures are reported as [`TableError::MemoryError`], and the table is left
/// unchanged when an insertion or a resize fails.
pub struct AssocTable<V, H = Fnv1a>
where
    H: BuildHasher,
{
    array: BucketArray<V>,
    len: usize,
    config: TableConfig,
    build_hasher: H,
}

/// A snapshot of the size of an [`AssocTable`].
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Stats {
    /// Number of live entries.
    pub size: usize,
    /// Number of buckets.
    pub capacity: usize,
    /// `size / capacity`.
    pub load_factor: f64,
    /// Number of deleted entries awaiting reclamation.
    pub tombstones: usize,
}

/// An iterator over the live entries of an [`AssocTable`].
///
/// The iteration order is unspecified.
pub struct Iter<'t, V> {
    buckets: slice::Iter<'t, Bucket<V>>,
    chain: Option<Rev<slice::Iter<'t, Entry<V>>>>,
    remaining: usize,
}

impl<V> AssocTable<V, Fnv1a> {
    /// Creates an empty [`AssocTable`] with the default configuration.
    ///
    /// The process aborts if the buckets cannot be allocated; use [`AssocTable::with_config`] to
    /// receive [`TableError::MemoryError`] instead.
    ///
    /// # Examples
    ///
    /// ```
    /// use chaintable::AssocTable;
    ///
    /// let table: AssocTable<u32> = AssocTable::new();
    ///
    /// assert_eq!(table.capacity(), 16);
    /// assert!(table.is_empty());
    /// ```
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty [`AssocTable`] with the specified number of buckets.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::InvalidArgument`] if `capacity` is zero, or
    /// [`TableError::MemoryError`] if the buckets cannot be allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// use chaintable::{AssocTable, TableError};
    ///
    /// let table: AssocTable<u32> = AssocTable::with_capacity(100).unwrap();
    /// assert_eq!(table.capacity(), 100);
    ///
    /// assert_eq!(
    ///     AssocTable::<u32>::with_capacity(0).unwrap_err(),
    ///     TableError::InvalidArgument("capacity must be positive")
    /// );
    /// ```
    #[inline]
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        Self::with_config(TableConfig::new().with_initial_capacity(capacity))
    }

    /// Creates an empty [`AssocTable`] with the specified configuration.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::InvalidArgument`] if the configuration is invalid, or
    /// [`TableError::MemoryError`] if the buckets cannot be allocated.
    #[inline]
    pub fn with_config(config: TableConfig) -> Result<Self> {
        Self::with_config_and_hasher(config, Fnv1a)
    }
}

impl<V, H> AssocTable<V, H>
where
    H: BuildHasher,
{
    /// Creates an empty [`AssocTable`] with the default configuration and the given
    /// [`BuildHasher`].
    ///
    /// The process aborts if the buckets cannot be allocated; use
    /// [`AssocTable::with_config_and_hasher`] to receive [`TableError::MemoryError`] instead.
    ///
    /// # Examples
    ///
    /// ```
    /// use chaintable::AssocTable;
    /// use std::collections::hash_map::RandomState;
    ///
    /// let mut table: AssocTable<u32, RandomState> = AssocTable::with_hasher(RandomState::new());
    /// assert!(table.insert("a", 1).is_ok());
    /// assert_eq!(table.get("a"), Some(&1));
    /// ```
    #[inline]
    pub fn with_hasher(build_hasher: H) -> Self {
        Self {
            array: BucketArray::new(TableConfig::DEFAULT_INITIAL_CAPACITY),
            len: 0,
            config: TableConfig::new(),
            build_hasher,
        }
    }

    /// Creates an empty [`AssocTable`] with the specified configuration and [`BuildHasher`].
    ///
    /// # Errors
    ///
    /// Returns [`TableError::InvalidArgument`] if the configuration is invalid, or
    /// [`TableError::MemoryError`] if the buckets cannot be allocated.
    pub fn with_config_and_hasher(config: TableConfig, build_hasher: H) -> Result<Self> {
        config.validate()?;
        let array = BucketArray::try_new(config.initial_capacity())?;
        Ok(Self {
            array,
            len: 0,
            config,
            build_hasher,
        })
    }

    /// Inserts a key-value pair into the [`AssocTable`].
    ///
    /// If the key already has a live entry, its value is overwritten in place.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::MemoryError`] if memory for the entry, the key, or a resize cannot
    /// be allocated, in which case the [`AssocTable`] is left unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use chaintable::AssocTable;
    ///
    /// let mut table: AssocTable<u32> = AssocTable::new();
    ///
    /// assert!(table.insert("a", 1).is_ok());
    /// assert!(table.insert("a", 2).is_ok());
    /// assert_eq!(table.get("a"), Some(&2));
    /// assert_eq!(table.len(), 1);
    /// ```
    #[inline]
    pub fn insert(&mut self, key: &str, val: V) -> Result<()> {
        self.upsert(key, val).map(|_| ())
    }

    /// Inserts a key-value pair into the [`AssocTable`], and returns the replaced value.
    ///
    /// Returns `Ok(None)` if a new entry was created.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::MemoryError`] if memory for the entry, the key, or a resize cannot
    /// be allocated, in which case the [`AssocTable`] is left unchanged.
    ///
    /// # Examples
    ///
    /// ```
    /// use chaintable::AssocTable;
    ///
    /// let mut table: AssocTable<u32> = AssocTable::new();
    ///
    /// assert_eq!(table.upsert("a", 1), Ok(None));
    /// assert_eq!(table.upsert("a", 2), Ok(Some(1)));
    /// ```
    pub fn upsert(&mut self, key: &str, val: V) -> Result<Option<V>> {
        let hash = self.hash(key);
        let index = self.array.calculate_bucket_index(hash);
        if let Some(current) = self.array.bucket_mut(index).search_mut(key) {
            return Ok(Some(replace(current, val)));
        }

        let owned_key = copy_key(key).map_err(|e| {
            warn!("failed to copy a key of {} bytes", key.len());
            e
        })?;
        if let Some(new_capacity) = self.config.grown_capacity(self.len + 1, self.capacity())? {
            self.resize(new_capacity, hash)?;
        }

        let index = self.array.calculate_bucket_index(hash);
        let bucket = self.array.bucket_mut(index);
        if let Err(e) = bucket.reserve(1) {
            warn!("failed to extend bucket {index}: {e}");
            return Err(TableError::MemoryError);
        }
        bucket.prepend(Entry::new(owned_key, val));
        self.len += 1;
        Ok(None)
    }

    /// Returns a reference to the value associated with the key.
    ///
    /// Returns `None` if the key has no live entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use chaintable::AssocTable;
    ///
    /// let mut table: AssocTable<u32> = AssocTable::new();
    ///
    /// assert!(table.get("a").is_none());
    /// assert!(table.insert("a", 1).is_ok());
    /// assert_eq!(table.get("a"), Some(&1));
    /// ```
    #[inline]
    pub fn get(&self, key: &str) -> Option<&V> {
        let index = self.bucket_index(key);
        self.array.bucket(index).search(key)
    }

    /// Returns a mutable reference to the value associated with the key.
    ///
    /// # Examples
    ///
    /// ```
    /// use chaintable::AssocTable;
    ///
    /// let mut table: AssocTable<u32> = AssocTable::new();
    ///
    /// assert!(table.insert("a", 1).is_ok());
    /// if let Some(v) = table.get_mut("a") {
    ///     *v += 1;
    /// }
    /// assert_eq!(table.get("a"), Some(&2));
    /// ```
    #[inline]
    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        let index = self.bucket_index(key);
        self.array.bucket_mut(index).search_mut(key)
    }

    /// Returns `true` if the key has a live entry.
    #[inline]
    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Deletes the entry associated with the key, and returns its value.
    ///
    /// The entry becomes a tombstone that is reclaimed by the next resize.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::KeyNotFound`] if the key has no live entry.
    ///
    /// # Examples
    ///
    /// ```
    /// use chaintable::{AssocTable, TableError};
    ///
    /// let mut table: AssocTable<u32> = AssocTable::new();
    ///
    /// assert!(table.insert("x", 1).is_ok());
    /// assert_eq!(table.delete("x"), Ok(1));
    /// assert_eq!(table.delete("x"), Err(TableError::KeyNotFound));
    /// assert_eq!(table.num_tombstones(), 1);
    /// ```
    pub fn delete(&mut self, key: &str) -> Result<V> {
        let index = self.bucket_index(key);
        let val = self
            .array
            .bucket_mut(index)
            .mark_removed(key)
            .ok_or(TableError::KeyNotFound)?;
        self.len -= 1;
        trace!("tombstoned an entry in bucket {index}");
        Ok(val)
    }

    /// Destroys the [`AssocTable`], and returns the number of entries released.
    ///
    /// Tombstones are counted as entries.
    ///
    /// # Examples
    ///
    /// ```
    /// use chaintable::AssocTable;
    ///
    /// let mut table: AssocTable<u32> = AssocTable::new();
    ///
    /// assert!(table.insert("a", 1).is_ok());
    /// assert!(table.insert("b", 2).is_ok());
    /// assert!(table.delete("b").is_ok());
    /// assert_eq!(table.destroy(), 2);
    /// ```
    #[inline]
    pub fn destroy(self) -> usize {
        let capacity = self.capacity();
        let released = self.array.drop_entries();
        trace!("destroyed a table of {capacity} buckets: {released} entries released");
        released
    }

    /// Returns the number of live entries.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the [`AssocTable`] has no live entries.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns the number of buckets.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.array.len()
    }

    /// Returns the number of deleted entries that have not been reclaimed.
    #[inline]
    pub fn num_tombstones(&self) -> usize {
        self.array.num_tombstones()
    }

    /// Returns `len / capacity`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chaintable::AssocTable;
    ///
    /// let mut table: AssocTable<u32> = AssocTable::new();
    ///
    /// assert!(table.insert("a", 1).is_ok());
    /// assert_eq!(table.load_factor(), 1.0 / 16.0);
    /// ```
    #[allow(clippy::cast_precision_loss)]
    #[inline]
    pub fn load_factor(&self) -> f64 {
        self.len as f64 / self.capacity() as f64
    }

    /// Takes a snapshot of the size of the [`AssocTable`].
    ///
    /// # Examples
    ///
    /// ```
    /// use chaintable::AssocTable;
    ///
    /// let mut table: AssocTable<u32> = AssocTable::new();
    ///
    /// for i in 0..13 {
    ///     assert!(table.insert(&i.to_string(), i).is_ok());
    /// }
    /// let stats = table.stats();
    /// assert_eq!(stats.size, 13);
    /// assert_eq!(stats.capacity, 32);
    /// ```
    #[inline]
    pub fn stats(&self) -> Stats {
        Stats {
            size: self.len,
            capacity: self.capacity(),
            load_factor: self.load_factor(),
            tombstones: self.num_tombstones(),
        }
    }

    /// Returns the configuration of the [`AssocTable`].
    #[inline]
    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Returns a reference to its [`BuildHasher`].
    #[inline]
    pub fn hasher(&self) -> &H {
        &self.build_hasher
    }

    /// Returns the index of the bucket that may contain the key.
    ///
    /// # Examples
    ///
    /// ```
    /// use chaintable::{AssocTable, Fnv1a};
    ///
    /// let table: AssocTable<u32> = AssocTable::new();
    ///
    /// let index = table.bucket_index("a");
    /// assert_eq!(index as u64, Fnv1a.hash_bytes(b"a") % 16);
    /// ```
    #[inline]
    pub fn bucket_index(&self, key: &str) -> usize {
        self.array.calculate_bucket_index(self.hash(key))
    }

    /// Iterates over the live entries.
    ///
    /// # Examples
    ///
    /// ```
    /// use chaintable::AssocTable;
    ///
    /// let mut table: AssocTable<u32> = AssocTable::new();
    ///
    /// assert!(table.insert("a", 1).is_ok());
    /// assert!(table.insert("b", 2).is_ok());
    /// assert_eq!(table.iter().map(|(_, v)| *v).sum::<u32>(), 3);
    /// ```
    #[inline]
    pub fn iter(&self) -> Iter<'_, V> {
        Iter {
            buckets: self.array.iter(),
            chain: None,
            remaining: self.len,
        }
    }

    /// Returns the hash value of the key.
    #[inline]
    fn hash(&self, key: &str) -> u64 {
        hash_with(&self.build_hasher, key)
    }

    /// Relocates the entries into `new_capacity` buckets, reserving a slot for `pending`.
    fn resize(&mut self, new_capacity: usize, pending: u64) -> Result<()> {
        let old_capacity = self.capacity();
        debug!("resizing: {old_capacity} -> {new_capacity} buckets, {} entries", self.len);

        let build_hasher = &self.build_hasher;
        match self
            .array
            .rehash(new_capacity, |k| hash_with(build_hasher, k), Some(pending))
        {
            Ok(rehashed) => {
                debug_assert_eq!(rehashed.moved, self.len);
                debug!(
                    "resized: {old_capacity} -> {new_capacity} buckets, {} moved, {} tombstones reclaimed",
                    rehashed.moved, rehashed.reclaimed
                );
                Ok(())
            }
            Err(e) => {
                warn!("failed to resize to {new_capacity} buckets: {e}");
                Err(TableError::MemoryError)
            }
        }
    }
}

/// Hashes the raw bytes of the key.
#[inline]
fn hash_with<H: BuildHasher>(build_hasher: &H, key: &str) -> u64 {
    let mut hasher = build_hasher.build_hasher();
    hasher.write(key.as_bytes());
    hasher.finish()
}

/// Copies the key into a newly allocated [`String`].
#[inline]
fn copy_key(key: &str) -> Result<String> {
    let mut owned = String::new();
    owned.try_reserve_exact(key.len())?;
    owned.push_str(key);
    Ok(owned)
}

impl<V, H> Clone for AssocTable<V, H>
where
    V: Clone,
    H: BuildHasher + Clone,
{
    #[inline]
    fn clone(&self) -> Self {
        Self {
            array: self.array.clone(),
            len: self.len,
            config: self.config,
            build_hasher: self.build_hasher.clone(),
        }
    }
}

impl<V, H> Debug for AssocTable<V, H>
where
    V: Debug,
    H: BuildHasher,
{
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.iter()).finish()
    }
}

impl<V, H> Default for AssocTable<V, H>
where
    H: BuildHasher + Default,
{
    /// Creates an empty default [`AssocTable`].
    ///
    /// Like [`AssocTable::with_hasher`], this aborts if the buckets cannot be allocated.
    ///
    /// # Examples
    ///
    /// ```
    /// use chaintable::AssocTable;
    ///
    /// let table: AssocTable<u32> = AssocTable::default();
    ///
    /// assert_eq!(table.capacity(), 16);
    /// ```
    #[inline]
    fn default() -> Self {
        Self::with_hasher(H::default())
    }
}

impl<V, H> PartialEq for AssocTable<V, H>
where
    V: PartialEq,
    H: BuildHasher,
{
    /// Compares the live entries of two [`AssocTable`] instances.
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        self.len == other.len && self.iter().all(|(k, v)| other.get(k) == Some(v))
    }
}

impl<V, H> Eq for AssocTable<V, H>
where
    V: Eq,
    H: BuildHasher,
{
}

impl<'t, V, H> IntoIterator for &'t AssocTable<V, H>
where
    H: BuildHasher,
{
    type Item = (&'t str, &'t V);
    type IntoIter = Iter<'t, V>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<'t, V> Iterator for Iter<'t, V> {
    type Item = (&'t str, &'t V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(chain) = self.chain.as_mut() {
                for entry in chain.by_ref() {
                    if let Some(val) = entry.value() {
                        self.remaining -= 1;
                        return Some((entry.key(), val));
                    }
                }
            }
            let bucket = self.buckets.next()?;
            self.chain = Some(bucket.iter());
        }
    }

    #[inline]
    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<V> ExactSizeIterator for Iter<'_, V> {}

impl<V> FusedIterator for Iter<'_, V> {}

impl<V> Debug for Iter<'_, V> {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter")
            .field("remaining", &self.remaining)
            .finish()
    }
}
