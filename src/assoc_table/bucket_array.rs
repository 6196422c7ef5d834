use std::collections::TryReserveError;
use std::slice;

use super::bucket::Bucket;

/// [`BucketArray`] is a fixed-length array of [`Bucket`] instances.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct BucketArray<V> {
    buckets: Vec<Bucket<V>>,
}

/// Outcome of [`BucketArray::rehash`].
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Rehashed {
    /// Number of live entries relocated to the new array.
    pub moved: usize,
    /// Number of tombstones dropped.
    pub reclaimed: usize,
}

impl<V> BucketArray<V> {
    /// Creates a new [`BucketArray`] of the given length.
    ///
    /// The length must be positive.
    pub(crate) fn new(len: usize) -> Self {
        debug_assert_ne!(len, 0);
        let mut buckets = Vec::with_capacity(len);
        buckets.resize_with(len, Bucket::new);
        Self { buckets }
    }

    /// Tries to create a new [`BucketArray`] of the given length.
    ///
    /// Returns an error if the memory cannot be allocated.
    pub(crate) fn try_new(len: usize) -> Result<Self, TryReserveError> {
        debug_assert_ne!(len, 0);
        let mut buckets = Vec::new();
        buckets.try_reserve_exact(len)?;
        buckets.resize_with(len, Bucket::new);
        Ok(Self { buckets })
    }

    /// Returns the number of [`Bucket`] instances in the [`BucketArray`].
    #[inline]
    pub(crate) fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Calculates the [`Bucket`] index for the hash value.
    #[allow(clippy::cast_possible_truncation)] // The remainder is less than `len`.
    #[inline]
    pub(crate) fn calculate_bucket_index(&self, hash: u64) -> usize {
        (hash % self.buckets.len() as u64) as usize
    }

    /// Returns a reference to the [`Bucket`] at the index.
    #[inline]
    pub(crate) fn bucket(&self, index: usize) -> &Bucket<V> {
        &self.buckets[index]
    }

    /// Returns a mutable reference to the [`Bucket`] at the index.
    #[inline]
    pub(crate) fn bucket_mut(&mut self, index: usize) -> &mut Bucket<V> {
        &mut self.buckets[index]
    }

    /// Iterates over all the [`Bucket`] instances.
    #[inline]
    pub(crate) fn iter(&self) -> slice::Iter<'_, Bucket<V>> {
        self.buckets.iter()
    }

    /// Returns the number of tombstones in the [`BucketArray`].
    pub(crate) fn num_tombstones(&self) -> usize {
        self.buckets.iter().map(Bucket::num_tombstones).sum()
    }

    /// Returns the total number of entries including tombstones.
    pub(crate) fn num_entries(&self) -> usize {
        self.buckets.iter().map(Bucket::len).sum()
    }

    /// Relocates every live entry into a new array of `new_len` buckets, and drops tombstones.
    ///
    /// `hash` must be the hash function that placed the entries. If `pending` is given, a slot
    /// for an entry with that hash value is reserved in the new array so that it can be prepended
    /// without allocating.
    ///
    /// All the memory is reserved before any entry is moved, therefore `self` is left untouched
    /// if an allocation fails.
    pub(crate) fn rehash<F: Fn(&str) -> u64>(
        &mut self,
        new_len: usize,
        hash: F,
        pending: Option<u64>,
    ) -> Result<Rehashed, TryReserveError> {
        let mut new_array = Self::try_new(new_len)?;

        let mut chain_lens: Vec<usize> = Vec::new();
        chain_lens.try_reserve_exact(new_len)?;
        chain_lens.resize(new_len, 0);
        for bucket in &self.buckets {
            for entry in bucket.iter().filter(|e| !e.is_tombstone()) {
                chain_lens[new_array.calculate_bucket_index(hash(entry.key()))] += 1;
            }
        }
        if let Some(pending) = pending {
            chain_lens[new_array.calculate_bucket_index(pending)] += 1;
        }
        for (bucket, chain_len) in new_array.buckets.iter_mut().zip(chain_lens) {
            if chain_len != 0 {
                bucket.reserve(chain_len)?;
            }
        }

        let mut result = Rehashed::default();
        for bucket in &mut self.buckets {
            for entry in bucket.drain() {
                if entry.is_tombstone() {
                    result.reclaimed += 1;
                    continue;
                }
                let index = new_array.calculate_bucket_index(hash(entry.key()));
                new_array.buckets[index].prepend(entry);
                result.moved += 1;
            }
        }
        *self = new_array;
        Ok(result)
    }

    /// Consumes the [`BucketArray`] and returns the number of entries dropped.
    pub(crate) fn drop_entries(self) -> usize {
        let num_entries = self.num_entries();
        drop(self);
        num_entries
    }
}

#[cfg(test)]
mod test {
    use super::BucketArray;
    use crate::assoc_table::bucket::Entry;

    fn identity(key: &str) -> u64 {
        key.parse().unwrap()
    }

    fn insert(array: &mut BucketArray<usize>, key: usize) {
        let index = array.calculate_bucket_index(key as u64);
        let bucket = array.bucket_mut(index);
        bucket.reserve(1).unwrap();
        bucket.prepend(Entry::new(key.to_string(), key));
    }

    #[test]
    fn rehash_relocates() {
        let mut array = BucketArray::new(4);
        for key in 0..8 {
            insert(&mut array, key);
        }
        assert_eq!(array.bucket(1).len(), 2);
        assert_eq!(array.bucket_mut(5 % 4).mark_removed("5"), Some(5));

        let result = array.rehash(8, identity, Some(9)).unwrap();
        assert_eq!(result.moved, 7);
        assert_eq!(result.reclaimed, 1);
        assert_eq!(array.len(), 8);
        assert_eq!(array.num_tombstones(), 0);
        assert_eq!(array.num_entries(), 7);
        for key in (0..8).filter(|k| *k != 5) {
            let bucket = array.bucket(key);
            assert_eq!(bucket.search(&key.to_string()), Some(&key));
        }
        assert!(array.bucket(5).iter().next().is_none());
    }

    #[test]
    fn rehash_reverses_chain_order() {
        let mut array = BucketArray::new(2);
        for key in [0, 2, 4] {
            insert(&mut array, key);
        }
        // Bucket 0 reads 4, 2, 0 from head to tail; draining it head first reverses the order.
        let _result = array.rehash(4, identity, None).unwrap();
        let keys: Vec<&str> = array.bucket(0).iter().map(Entry::key).collect();
        assert_eq!(keys, ["0", "4"]);
    }

    #[test]
    fn drop_entries_counts_tombstones() {
        let mut array = BucketArray::new(3);
        for key in 0..6 {
            insert(&mut array, key);
        }
        assert_eq!(array.bucket_mut(0).mark_removed("3"), Some(3));
        assert_eq!(array.drop_entries(), 6);
    }
}
