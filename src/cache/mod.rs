pub mod block;
pub mod set;

pub use block::{EvictedLine, Line};
pub use set::Set;

use crate::{address, config, replacement};
use stats::cache::AccessKind;

#[derive(Debug, strum::EnumIter, Clone, Copy, Hash, PartialEq, Eq)]
pub enum RequestStatus {
    HIT = 0,
    MISS,
}

impl RequestStatus {
    #[inline]
    #[must_use]
    pub fn is_hit(self) -> bool {
        self == Self::HIT
    }

    #[inline]
    #[must_use]
    pub fn is_miss(self) -> bool {
        self == Self::MISS
    }
}

impl From<RequestStatus> for stats::cache::RequestStatus {
    fn from(status: RequestStatus) -> Self {
        match status {
            RequestStatus::HIT => Self::HIT,
            RequestStatus::MISS => Self::MISS,
        }
    }
}

/// A set-associative cache.
///
/// Tracks occupancy, tags, dirty state and recency of each way, but no data.
/// Addresses passed to the cache are line addresses: the set is selected by
/// `addr % num_sets` and the full line address is kept as the tag.
#[derive(Debug)]
pub struct Cache {
    config: config::Cache,
    num_sets: usize,
    sets: Vec<Set>,
    policy: Box<dyn replacement::Policy>,
    stats: stats::Cache,
    last_evicted: Option<EvictedLine>,
}

impl Cache {
    /// Creates a new cache with all lines invalid.
    ///
    /// # Errors
    /// If the configuration is invalid, e.g. has more than
    /// [`config::MAX_WAYS`] ways.
    pub fn new(config: config::Cache) -> Result<Self, config::Error> {
        config.validate()?;
        let num_sets = config.num_sets();
        let sets = (0..num_sets)
            .map(|_| Set::new(config.associativity))
            .collect();
        let policy = replacement::from_config(&config);
        log::debug!("cache::new({})", config);
        Ok(Self {
            num_sets,
            sets,
            policy,
            stats: stats::Cache::default(),
            last_evicted: None,
            config,
        })
    }

    #[inline]
    #[must_use]
    pub fn config(&self) -> &config::Cache {
        &self.config
    }

    #[inline]
    #[must_use]
    pub fn num_sets(&self) -> usize {
        self.num_sets
    }

    #[inline]
    #[must_use]
    pub fn set_index(&self, addr: address) -> usize {
        (addr % self.num_sets as u64) as usize
    }

    /// # Panics
    /// If `index` is not less than [`Cache::num_sets`].
    #[inline]
    #[must_use]
    pub fn set(&self, index: usize) -> &Set {
        &self.sets[index]
    }

    #[inline]
    #[must_use]
    pub fn stats(&self) -> &stats::Cache {
        &self.stats
    }

    /// The line evicted by the most recent install that evicted anything.
    ///
    /// Installs into a free way leave this unchanged.
    #[inline]
    #[must_use]
    pub fn last_evicted(&self) -> Option<&EvictedLine> {
        self.last_evicted.as_ref()
    }

    /// Number of valid lines owned by `core_id` in set `set_index`.
    ///
    /// # Panics
    /// If `set_index` is not less than [`Cache::num_sets`].
    #[must_use]
    pub fn occupancy(&self, set_index: usize, core_id: u32) -> usize {
        self.sets[set_index].occupancy(core_id)
    }

    /// Looks up `addr` for `core_id`.
    ///
    /// On a hit, the line's recency is set to `time` and a write marks it
    /// dirty. A miss only updates the miss counter; allocating is left to
    /// [`Cache::install`].
    pub fn access(
        &mut self,
        addr: address,
        is_write: bool,
        core_id: u32,
        time: u64,
    ) -> RequestStatus {
        let kind = AccessKind::from_is_write(is_write);
        let set_index = self.set_index(addr);
        let set = &mut self.sets[set_index];

        let status = match set.find(addr, core_id) {
            Some(way) => {
                let line = set.line_mut(way);
                line.set_last_access_time(time);
                if is_write {
                    line.dirty = true;
                }
                RequestStatus::HIT
            }
            None => RequestStatus::MISS,
        };

        log::trace!(
            "cache::access(addr={}, {:?}, core={}, time={}) set={} => {:?}",
            addr,
            kind,
            core_id,
            time,
            set_index,
            status
        );

        self.stats.inc(kind, status.into(), 1);
        status
    }

    /// Installs `addr` for `core_id`, evicting a line if the set is full.
    ///
    /// Free ways are used in way order before any eviction happens.
    /// Writes allocate dirty.
    ///
    /// # Returns
    /// The evicted line, if any.
    pub fn install(
        &mut self,
        addr: address,
        is_write: bool,
        core_id: u32,
        time: u64,
    ) -> Option<EvictedLine> {
        let set_index = self.set_index(addr);
        let set = &mut self.sets[set_index];

        let (way, evicted) = match set.free_way() {
            Some(way) => (way, None),
            None => {
                let way = self.policy.select_victim(set, core_id);
                debug_assert!(way < set.associativity());
                let evicted = EvictedLine::new(set_index, way, set.line(way));
                log::debug!(
                    "cache::install(addr={}, core={}) evicting {} from set {} way {}",
                    addr,
                    core_id,
                    set.line(way),
                    set_index,
                    way,
                );
                (way, Some(evicted))
            }
        };

        log::trace!(
            "cache::install(addr={}, write={}, core={}, time={}) set={} way={}",
            addr,
            is_write,
            core_id,
            time,
            set_index,
            way,
        );

        set.line_mut(way).allocate(addr, is_write, core_id, time);

        if let Some(evicted) = evicted {
            if evicted.dirty {
                self.stats.inc_dirty_evictions(1);
            }
            self.last_evicted = Some(evicted);
        }
        evicted
    }

    /// Marks all dirty lines clean.
    ///
    /// # Returns
    /// The number of dirty lines that would have been written back.
    pub fn flush(&mut self) -> usize {
        let mut flushed = 0;
        for line in self.sets.iter_mut().flat_map(Set::iter_mut) {
            if line.is_modified() {
                line.dirty = false;
                flushed += 1;
            }
        }
        flushed
    }

    /// Invalidates all lines.
    ///
    /// This effectively resets the tag state, counters are kept.
    pub fn invalidate(&mut self) {
        for line in self.sets.iter_mut().flat_map(Set::iter_mut) {
            line.invalidate();
        }
    }

    /// Formats the accumulated counters under `label`.
    #[must_use]
    pub fn report(&self, label: &str) -> String {
        self.stats.report(label)
    }
}
