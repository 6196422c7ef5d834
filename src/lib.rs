//! String-keyed hash table.
//!
//! # chaintable::AssocTable
//! A hash table that maps string keys to arbitrary values. Collisions are resolved by separate
//! chaining, keys are hashed with FNV-1a by default, deleted entries are tombstoned and reclaimed
//! when the bucket array grows, and a failed allocation never leaves the table half-modified.

pub mod assoc_table;
pub use assoc_table::{AssocTable, Iter, Stats};

mod config;
pub use config::TableConfig;

mod error;
pub use error::{Result, TableError};

pub mod fnv;
pub use fnv::Fnv1a;

#[cfg(feature = "serde")]
mod serde;
