//! [`TableConfig`] controls the initial size and the growth policy of an
//! [`AssocTable`](crate::AssocTable).

use crate::error::{Result, TableError};

/// Sizing and growth parameters of an [`AssocTable`](crate::AssocTable).
///
/// The configuration is validated when a table is created from it.
///
/// # Examples
///
/// ```
/// use chaintable::{AssocTable, TableConfig};
///
/// let config = TableConfig::new()
///     .with_initial_capacity(64)
///     .with_max_load_factor(0.5);
/// let table: AssocTable<u32> = AssocTable::with_config(config).unwrap();
///
/// assert_eq!(table.capacity(), 64);
/// ```
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct TableConfig {
    initial_capacity: usize,
    max_load_factor: f64,
    growth_factor: usize,
}

impl TableConfig {
    /// Number of buckets allocated by default.
    pub const DEFAULT_INITIAL_CAPACITY: usize = 16;

    /// Default load factor above which the table grows.
    pub const DEFAULT_MAX_LOAD_FACTOR: f64 = 0.75;

    /// Default multiplier applied to the capacity on each growth step.
    pub const DEFAULT_GROWTH_FACTOR: usize = 2;

    /// Creates the default configuration.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            initial_capacity: Self::DEFAULT_INITIAL_CAPACITY,
            max_load_factor: Self::DEFAULT_MAX_LOAD_FACTOR,
            growth_factor: Self::DEFAULT_GROWTH_FACTOR,
        }
    }

    /// Sets the number of buckets allocated on creation.
    #[inline]
    #[must_use]
    pub const fn with_initial_capacity(mut self, initial_capacity: usize) -> Self {
        self.initial_capacity = initial_capacity;
        self
    }

    /// Sets the load factor that an insertion must not exceed.
    #[inline]
    #[must_use]
    pub const fn with_max_load_factor(mut self, max_load_factor: f64) -> Self {
        self.max_load_factor = max_load_factor;
        self
    }

    /// Sets the capacity multiplier of a growth step.
    #[inline]
    #[must_use]
    pub const fn with_growth_factor(mut self, growth_factor: usize) -> Self {
        self.growth_factor = growth_factor;
        self
    }

    /// Returns the initial number of buckets.
    #[inline]
    pub const fn initial_capacity(&self) -> usize {
        self.initial_capacity
    }

    /// Returns the maximum load factor.
    #[inline]
    pub const fn max_load_factor(&self) -> f64 {
        self.max_load_factor
    }

    /// Returns the growth factor.
    #[inline]
    pub const fn growth_factor(&self) -> usize {
        self.growth_factor
    }

    /// Checks that the configuration describes a usable table.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::InvalidArgument`] if the initial capacity is zero, the load factor
    /// is not within `(0, 1]`, or the growth factor is less than `2`.
    ///
    /// # Examples
    ///
    /// ```
    /// use chaintable::{TableConfig, TableError};
    ///
    /// assert!(TableConfig::new().validate().is_ok());
    /// assert!(matches!(
    ///     TableConfig::new().with_initial_capacity(0).validate(),
    ///     Err(TableError::InvalidArgument(_))
    /// ));
    /// ```
    pub fn validate(&self) -> Result<()> {
        if self.initial_capacity == 0 {
            return Err(TableError::InvalidArgument("capacity must be positive"));
        }
        if !(self.max_load_factor > 0.0 && self.max_load_factor <= 1.0) {
            return Err(TableError::InvalidArgument(
                "maximum load factor must be within (0, 1]",
            ));
        }
        if self.growth_factor < 2 {
            return Err(TableError::InvalidArgument("growth factor must be at least 2"));
        }
        Ok(())
    }

    /// Returns `true` if holding `num_entries` in `capacity` buckets exceeds the load factor.
    #[allow(clippy::cast_precision_loss)]
    #[inline]
    pub(crate) fn exceeds_load_factor(&self, num_entries: usize, capacity: usize) -> bool {
        num_entries as f64 / capacity as f64 > self.max_load_factor
    }

    /// Calculates the capacity required to hold `num_entries` without exceeding the load factor.
    ///
    /// Returns `None` if `capacity` is already sufficient.
    pub(crate) fn grown_capacity(
        &self,
        num_entries: usize,
        capacity: usize,
    ) -> Result<Option<usize>> {
        if !self.exceeds_load_factor(num_entries, capacity) {
            return Ok(None);
        }
        let mut new_capacity = capacity;
        while self.exceeds_load_factor(num_entries, new_capacity) {
            new_capacity = new_capacity
                .checked_mul(self.growth_factor)
                .ok_or(TableError::MemoryError)?;
        }
        Ok(Some(new_capacity))
    }
}

impl Default for TableConfig {
    #[inline]
    fn default() -> Self {
        Self::new()
    }
}
