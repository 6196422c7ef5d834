//! The default hash policy: 64-bit FNV-1a.

use std::hash::{BuildHasher, Hasher};

/// FNV-1a 64-bit offset basis.
pub const OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

/// FNV-1a 64-bit prime.
pub const PRIME: u64 = 0x0100_0000_01b3;

/// [`BuildHasher`] producing [`Fnv1aHasher`] instances.
///
/// This is the default hash policy of [`AssocTable`](crate::AssocTable). The table feeds the raw
/// bytes of a key into the hasher, therefore the bucket of a key is exactly
/// `fnv1a(key) % capacity`.
///
/// # Examples
///
/// ```
/// use chaintable::Fnv1a;
///
/// assert_eq!(Fnv1a.hash_bytes(b"a"), 0xaf63_dc4c_8601_ec8c);
/// ```
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct Fnv1a;

impl Fnv1a {
    /// Hashes a byte sequence.
    #[inline]
    #[must_use]
    pub fn hash_bytes(self, bytes: &[u8]) -> u64 {
        let mut hasher = Fnv1aHasher::default();
        hasher.write(bytes);
        hasher.finish()
    }
}

impl BuildHasher for Fnv1a {
    type Hasher = Fnv1aHasher;

    #[inline]
    fn build_hasher(&self) -> Self::Hasher {
        Fnv1aHasher::default()
    }
}

/// Streaming FNV-1a [`Hasher`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Fnv1aHasher {
    state: u64,
}

impl Default for Fnv1aHasher {
    #[inline]
    fn default() -> Self {
        Self {
            state: OFFSET_BASIS,
        }
    }
}

impl Hasher for Fnv1aHasher {
    #[inline]
    fn finish(&self) -> u64 {
        self.state
    }

    #[inline]
    fn write(&mut self, bytes: &[u8]) {
        for byte in bytes {
            self.state ^= u64::from(*byte);
            self.state = self.state.wrapping_mul(PRIME);
        }
    }
}
