use serde::{Deserialize, Serialize};

/// Maximum number of ways per set a cache can be configured with.
pub const MAX_WAYS: usize = 16;

/// Number of candidate ways the random replacement policy draws from.
pub const DEFAULT_RANDOM_WINDOW: usize = 8;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("associativity of {associativity} exceeds the maximum of {max} ways", max = MAX_WAYS)]
    TooManyWays { associativity: usize },
    #[error("associativity must be at least one way")]
    ZeroWays,
    #[error("line size must be non-zero")]
    ZeroLineSize,
    #[error("cache of {size} bytes holds no set of {associativity} x {line_size} byte lines")]
    NoSets {
        size: u64,
        associativity: usize,
        line_size: u64,
    },
    #[error("unknown replacement policy {0} (expected 0, 1 or 2)")]
    UnknownPolicy(u64),
}

/// A cache replacement policy.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::EnumIter,
    strum::Display,
    clap::ValueEnum,
)]
pub enum ReplacementPolicy {
    /// Evict the least recently used way.
    LRU = 0,
    /// Evict a random way.
    RANDOM = 1,
    /// Least recently used within a per-core way quota.
    PARTITIONED = 2,
}

impl TryFrom<u64> for ReplacementPolicy {
    type Error = Error;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(Self::LRU),
            1 => Ok(Self::RANDOM),
            2 => Ok(Self::PARTITIONED),
            other => Err(Error::UnknownPolicy(other)),
        }
    }
}

/// Configures a single set-associative cache.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cache {
    /// Total capacity in bytes.
    pub size: u64,
    /// Number of ways per set.
    pub associativity: usize,
    /// Line size in bytes.
    pub line_size: u64,
    pub replacement_policy: ReplacementPolicy,
    /// Number of ways per set reserved for core 0.
    ///
    /// Only used by [`ReplacementPolicy::PARTITIONED`].
    #[serde(default)]
    pub core0_quota: usize,
    /// Number of ways (starting at way 0) the random policy picks from.
    #[serde(default = "default_random_window")]
    pub random_window: usize,
    /// Seed for the random policy.
    ///
    /// When unset, the generator is seeded from OS entropy.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_random_window() -> usize {
    DEFAULT_RANDOM_WINDOW
}

impl Default for Cache {
    fn default() -> Self {
        Self {
            size: 32 * 1024,
            associativity: 4,
            line_size: 64,
            replacement_policy: ReplacementPolicy::LRU,
            core0_quota: 0,
            random_window: DEFAULT_RANDOM_WINDOW,
            seed: None,
        }
    }
}

impl std::fmt::Display for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let size = human_bytes::human_bytes(self.size as f64);
        write!(
            f,
            "{size} ({} set, {}-way, {} byte line, {})",
            self.num_sets(),
            self.associativity,
            self.line_size,
            self.replacement_policy,
        )
    }
}

impl Cache {
    /// Number of sets.
    ///
    /// Truncates if the capacity is not a multiple of a set's size.
    #[inline]
    #[must_use]
    pub fn num_sets(&self) -> usize {
        let set_bytes = self.line_size.saturating_mul(self.associativity as u64);
        if set_bytes == 0 {
            return 0;
        }
        (self.size / set_bytes) as usize
    }

    /// Number of lines in total.
    #[inline]
    #[must_use]
    pub fn total_lines(&self) -> usize {
        self.num_sets() * self.associativity
    }

    /// Checks the configuration can be used to build a cache.
    pub fn validate(&self) -> Result<(), Error> {
        if self.associativity > MAX_WAYS {
            return Err(Error::TooManyWays {
                associativity: self.associativity,
            });
        }
        if self.associativity == 0 {
            return Err(Error::ZeroWays);
        }
        if self.line_size == 0 {
            return Err(Error::ZeroLineSize);
        }
        if self.num_sets() == 0 {
            return Err(Error::NoSets {
                size: self.size,
                associativity: self.associativity,
                line_size: self.line_size,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Cache, Error, ReplacementPolicy, MAX_WAYS};
    use color_eyre::eyre;
    use pretty_assertions_sorted as diff;

    #[test]
    fn test_num_sets() {
        let config = Cache {
            size: 32768,
            associativity: 4,
            line_size: 64,
            ..Cache::default()
        };
        diff::assert_eq!(config.num_sets(), 128);
        diff::assert_eq!(config.total_lines(), 512);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_num_sets_truncates() {
        let config = Cache {
            size: 1000,
            associativity: 2,
            line_size: 64,
            ..Cache::default()
        };
        diff::assert_eq!(config.num_sets(), 7);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate() {
        let config = Cache {
            associativity: MAX_WAYS + 1,
            ..Cache::default()
        };
        diff::assert_eq!(
            config.validate(),
            Err(Error::TooManyWays {
                associativity: MAX_WAYS + 1
            })
        );

        let config = Cache {
            associativity: MAX_WAYS,
            size: 64 * MAX_WAYS as u64,
            ..Cache::default()
        };
        diff::assert_eq!(config.validate(), Ok(()));

        let config = Cache {
            size: 64,
            ..Cache::default()
        };
        assert!(matches!(config.validate(), Err(Error::NoSets { .. })));

        let config = Cache {
            line_size: 0,
            ..Cache::default()
        };
        diff::assert_eq!(config.validate(), Err(Error::ZeroLineSize));

        let config = Cache {
            associativity: 0,
            ..Cache::default()
        };
        diff::assert_eq!(config.num_sets(), 0);
        diff::assert_eq!(config.validate(), Err(Error::ZeroWays));
    }

    #[test]
    fn test_policy_from_selector() -> eyre::Result<()> {
        diff::assert_eq!(ReplacementPolicy::try_from(0u64)?, ReplacementPolicy::LRU);
        diff::assert_eq!(ReplacementPolicy::try_from(1u64)?, ReplacementPolicy::RANDOM);
        diff::assert_eq!(
            ReplacementPolicy::try_from(2u64)?,
            ReplacementPolicy::PARTITIONED
        );
        diff::assert_eq!(
            ReplacementPolicy::try_from(3u64),
            Err(Error::UnknownPolicy(3))
        );
        Ok(())
    }

    #[test]
    fn test_deserialize_defaults() -> eyre::Result<()> {
        let config: Cache = serde_json::from_str(
            r#"{"size": 65536, "associativity": 8, "line_size": 64, "replacement_policy": "PARTITIONED", "core0_quota": 6}"#,
        )?;
        diff::assert_eq!(
            config,
            Cache {
                size: 65536,
                associativity: 8,
                line_size: 64,
                replacement_policy: ReplacementPolicy::PARTITIONED,
                core0_quota: 6,
                random_window: 8,
                seed: None,
            }
        );
        Ok(())
    }
}
