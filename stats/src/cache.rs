use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Write;
use strum::IntoEnumIterator;

#[derive(
    Debug,
    strum::EnumIter,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub enum AccessKind {
    READ = 0,
    WRITE,
}

impl AccessKind {
    #[must_use]
    pub fn from_is_write(is_write: bool) -> Self {
        if is_write {
            Self::WRITE
        } else {
            Self::READ
        }
    }
}

#[derive(
    Debug,
    strum::EnumIter,
    Clone,
    Copy,
    Hash,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
)]
pub enum RequestStatus {
    HIT = 0,
    MISS,
}

/// Access counters of a single cache.
#[derive(Clone, PartialEq, Eq)]
pub struct Cache {
    pub accesses: HashMap<(AccessKind, RequestStatus), u64>,
    pub dirty_evictions: u64,
}

impl Default for Cache {
    fn default() -> Self {
        let mut accesses = HashMap::new();
        for kind in AccessKind::iter() {
            for status in RequestStatus::iter() {
                accesses.insert((kind, status), 0);
            }
        }
        Self {
            accesses,
            dirty_evictions: 0,
        }
    }
}

impl std::ops::AddAssign for Cache {
    fn add_assign(&mut self, other: Self) {
        for (k, v) in other.accesses {
            *self.accesses.entry(k).or_insert(0) += v;
        }
        self.dirty_evictions += other.dirty_evictions;
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        let mut accesses: Vec<_> = self
            .accesses
            .iter()
            .filter(|(_, &count)| count > 0)
            .map(|((kind, status), count)| (format!("{kind:?}[{status:?}]"), count))
            .collect();
        accesses.sort_by_key(|(key, _)| key.clone());

        let mut out = f.debug_struct("CacheStats");
        for (key, count) in accesses {
            out.field(&key, count);
        }
        out.field("dirty_evictions", &self.dirty_evictions);
        out.finish()
    }
}

impl Cache {
    #[inline]
    pub fn inc(&mut self, kind: AccessKind, status: RequestStatus, count: u64) {
        *self.accesses.entry((kind, status)).or_insert(0) += count;
    }

    #[inline]
    pub fn inc_dirty_evictions(&mut self, count: u64) {
        self.dirty_evictions += count;
    }

    #[must_use]
    pub fn count(&self, kind: AccessKind, status: RequestStatus) -> u64 {
        self.accesses.get(&(kind, status)).copied().unwrap_or(0)
    }

    /// Number of accesses of the given kind, hits and misses.
    #[must_use]
    pub fn num_accesses(&self, kind: AccessKind) -> u64 {
        RequestStatus::iter()
            .map(|status| self.count(kind, status))
            .sum()
    }

    #[must_use]
    pub fn num_misses(&self, kind: AccessKind) -> u64 {
        self.count(kind, RequestStatus::MISS)
    }

    /// Miss rate in `[0, 1]`, zero if there were no accesses of this kind.
    #[must_use]
    pub fn miss_rate(&self, kind: AccessKind) -> f64 {
        let accesses = self.num_accesses(kind);
        if accesses == 0 {
            return 0.0;
        }
        self.num_misses(kind) as f64 / accesses as f64
    }

    #[must_use]
    pub fn read_miss_rate(&self) -> f64 {
        self.miss_rate(AccessKind::READ)
    }

    #[must_use]
    pub fn write_miss_rate(&self) -> f64 {
        self.miss_rate(AccessKind::WRITE)
    }

    #[must_use]
    pub fn total_accesses(&self) -> u64 {
        self.accesses.values().sum()
    }

    #[must_use]
    pub fn summary(&self) -> Summary {
        Summary {
            read_accesses: self.num_accesses(AccessKind::READ),
            write_accesses: self.num_accesses(AccessKind::WRITE),
            read_misses: self.num_misses(AccessKind::READ),
            write_misses: self.num_misses(AccessKind::WRITE),
            read_miss_percent: 100.0 * self.read_miss_rate(),
            write_miss_percent: 100.0 * self.write_miss_rate(),
            dirty_evictions: self.dirty_evictions,
        }
    }

    /// Formats the counters as a labelled, line-oriented report.
    ///
    /// Every line is prefixed with a newline and the report ends with one,
    /// matching the layout consumed by existing result scrapers.
    #[must_use]
    pub fn report(&self, label: &str) -> String {
        let mut out = String::new();
        // writing to a string never fails
        self.write_report(&mut out, label)
            .expect("write to string");
        out
    }

    pub fn write_report(&self, out: &mut impl Write, label: &str) -> std::fmt::Result {
        let s = self.summary();
        write!(out, "\n{label}_READ_ACCESS    \t\t : {:>10}", s.read_accesses)?;
        write!(out, "\n{label}_WRITE_ACCESS   \t\t : {:>10}", s.write_accesses)?;
        write!(out, "\n{label}_READ_MISS      \t\t : {:>10}", s.read_misses)?;
        write!(out, "\n{label}_WRITE_MISS     \t\t : {:>10}", s.write_misses)?;
        write!(
            out,
            "\n{label}_READ_MISSPERC  \t\t : {:>10.3}",
            s.read_miss_percent
        )?;
        write!(
            out,
            "\n{label}_WRITE_MISSPERC \t\t : {:>10.3}",
            s.write_miss_percent
        )?;
        write!(out, "\n{label}_DIRTY_EVICTS   \t\t : {:>10}", s.dirty_evictions)?;
        writeln!(out)
    }
}

/// Flat view of [`Cache`] counters, suitable for serialization.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Summary {
    pub read_accesses: u64,
    pub write_accesses: u64,
    pub read_misses: u64,
    pub write_misses: u64,
    pub read_miss_percent: f64,
    pub write_miss_percent: f64,
    pub dirty_evictions: u64,
}

/// Cache counters split by requesting core.
#[allow(clippy::module_name_repetitions)]
#[derive(Clone, Default, Debug, PartialEq, Eq)]
pub struct PerCore(pub HashMap<u32, Cache>);

impl PerCore {
    #[must_use]
    pub fn total_accesses(&self) -> u64 {
        self.reduce().total_accesses()
    }

    #[must_use]
    pub fn reduce(&self) -> Cache {
        let mut out = Cache::default();
        for stats in self.0.values() {
            out += stats.clone();
        }
        out
    }
}

impl std::ops::Deref for PerCore {
    type Target = HashMap<u32, Cache>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl std::ops::DerefMut for PerCore {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.0
    }
}
