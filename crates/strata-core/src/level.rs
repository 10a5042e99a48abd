//! Level-limit vector mapping deadline slack to a staging level.

use crate::error::{StrataError, StrataResult};

/// Validated level-limit vector.
///
/// `limits` holds the upper slack bound (exclusive) of every level except the
/// last: a job whose sort key is below `limits[k]` belongs to level `k` or
/// better, and a job above every limit lands in the overflow level
/// `total_level - 1`. Level 0 is the most urgent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LevelLimits {
    total_level: usize,
    limits: Vec<i64>,
}

impl LevelLimits {
    /// Creates a level-limit vector.
    ///
    /// `limits` must contain exactly `total_level - 1` strictly increasing
    /// entries.
    pub fn new(total_level: usize, limits: Vec<i64>) -> StrataResult<Self> {
        if total_level == 0 {
            return Err(StrataError::configuration("TOTAL_LEVEL must be at least 1"));
        }
        if limits.len() != total_level - 1 {
            return Err(StrataError::configuration(format!(
                "LEVEL_LIMIT must have {} entries for TOTAL_LEVEL={}, got {}",
                total_level - 1,
                total_level,
                limits.len()
            )));
        }
        if limits.windows(2).any(|pair| pair[0] >= pair[1]) {
            return Err(StrataError::configuration(format!(
                "LEVEL_LIMIT must be strictly increasing, got {limits:?}"
            )));
        }

        Ok(Self {
            total_level,
            limits,
        })
    }

    /// Number of staging levels.
    #[must_use]
    pub const fn total_level(&self) -> usize {
        self.total_level
    }

    /// Returns the staging level for a sort key.
    ///
    /// The result is always in `[0, total_level)`.
    #[must_use]
    pub fn level_for(&self, sort_key: i64) -> usize {
        for (level, limit) in self.limits.iter().enumerate() {
            if sort_key < *limit {
                return level;
            }
        }

        self.total_level - 1
    }
}
