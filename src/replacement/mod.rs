use crate::cache::set::Set;
use crate::config;

/// Chooses the way to evict from a full set.
pub trait Policy: std::fmt::Debug + Send + Sync + 'static {
    /// Select a victim way in `set` for an install requested by `core_id`.
    ///
    /// Only called when every way of `set` is valid.
    /// The returned index is always less than the set's associativity.
    #[must_use]
    fn select_victim(&mut self, set: &Set, core_id: u32) -> usize;
}

/// Builds the policy selected by the cache configuration.
#[must_use]
pub fn from_config(config: &config::Cache) -> Box<dyn Policy> {
    match config.replacement_policy {
        config::ReplacementPolicy::LRU => Box::<lru::Policy>::default(),
        config::ReplacementPolicy::RANDOM => Box::new(random::Policy::new(
            config.random_window,
            config.associativity,
            config.seed,
        )),
        config::ReplacementPolicy::PARTITIONED => {
            Box::new(partitioned::Policy::new(config.core0_quota))
        }
    }
}

/// Least recently used way among the ways accepted by `filter`.
///
/// Ties resolve to the lowest way index.
#[must_use]
pub fn lru_way<F>(set: &Set, filter: F) -> Option<usize>
where
    F: Fn(&crate::cache::block::Line) -> bool,
{
    set.iter()
        .enumerate()
        .filter(|(_, line)| filter(line))
        .min_by_key(|(way, line)| (line.last_access_time, *way))
        .map(|(way, _)| way)
}

pub mod lru {
    #[derive(Default, Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Policy {}

    impl super::Policy for Policy {
        #[inline]
        fn select_victim(&mut self, set: &super::Set, _core_id: u32) -> usize {
            super::lru_way(set, |_| true).unwrap_or(0)
        }
    }
}

pub mod random {
    use rand::{rngs::StdRng, Rng, SeedableRng};

    /// Picks uniformly among the first `window` ways.
    ///
    /// The window does not grow with the associativity: caches wider than
    /// the window only ever evict from their leading ways.
    #[derive(Clone, Debug)]
    pub struct Policy {
        window: usize,
        rng: StdRng,
    }

    impl Policy {
        #[must_use]
        pub fn new(window: usize, associativity: usize, seed: Option<u64>) -> Self {
            // a window wider than the set would pick ways that do not exist
            let window = window.min(associativity).max(1);
            let rng = match seed {
                Some(seed) => StdRng::seed_from_u64(seed),
                None => StdRng::from_os_rng(),
            };
            Self { window, rng }
        }

        #[must_use]
        pub fn window(&self) -> usize {
            self.window
        }
    }

    impl super::Policy for Policy {
        #[inline]
        fn select_victim(&mut self, _set: &super::Set, _core_id: u32) -> usize {
            self.rng.random_range(0..self.window)
        }
    }
}

pub mod partitioned {
    /// Quota-partitioned LRU between core 0 and every other core.
    ///
    /// Core 0 may hold up to `core0_quota` ways of each set. Installs by
    /// core 0 below its quota take a way from the other cores; installs by
    /// another core take one back from core 0 while core 0 is over quota.
    /// Otherwise the requester replaces its own least recently used way.
    #[derive(Clone, Debug, PartialEq, Eq, Hash)]
    pub struct Policy {
        core0_quota: usize,
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    enum Side {
        Core0,
        Others,
    }

    impl Policy {
        #[must_use]
        pub fn new(core0_quota: usize) -> Self {
            Self { core0_quota }
        }
    }

    fn side(core_id: u32) -> Side {
        if core_id == 0 {
            Side::Core0
        } else {
            Side::Others
        }
    }

    impl super::Policy for Policy {
        fn select_victim(&mut self, set: &super::Set, core_id: u32) -> usize {
            let core0_count = set.occupancy(0);
            let core0_victim = super::lru_way(set, |line| side(line.core_id) == Side::Core0);
            let others_victim = super::lru_way(set, |line| side(line.core_id) == Side::Others);

            let evict_from = match side(core_id) {
                Side::Core0 if core0_count < self.core0_quota => Side::Others,
                Side::Core0 => Side::Core0,
                Side::Others if core0_count > self.core0_quota => Side::Core0,
                Side::Others => Side::Others,
            };

            log::trace!(
                "partitioned::select_victim(core={}) core0 ways={}/{} => evict from {:?} (core0 lru={:?}, others lru={:?})",
                core_id,
                core0_count,
                self.core0_quota,
                evict_from,
                core0_victim,
                others_victim,
            );

            // when the chosen side owns no way in this set, fall back to the other side
            let victim = match evict_from {
                Side::Core0 => core0_victim.or(others_victim),
                Side::Others => others_victim.or(core0_victim),
            };
            victim.unwrap_or(0)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::Policy;
    use crate::cache::set::Set;
    use pretty_assertions_sorted as diff;

    /// Builds a full set from `(core_id, last_access_time)` pairs.
    fn full_set(lines: &[(u32, u64)]) -> Set {
        let mut set = Set::new(lines.len());
        for (way, &(core_id, time)) in lines.iter().enumerate() {
            set.line_mut(way).allocate(way as u64, false, core_id, time);
        }
        set
    }

    #[test]
    fn test_lru_picks_strict_minimum() {
        let set = full_set(&[(0, 5), (0, 3), (0, 9), (0, 4)]);
        let mut policy = super::lru::Policy::default();
        diff::assert_eq!(policy.select_victim(&set, 0), 1);
    }

    #[test]
    fn test_lru_ties_resolve_to_lowest_way() {
        let set = full_set(&[(0, 5), (0, 2), (1, 7), (1, 2)]);
        let mut policy = super::lru::Policy::default();
        diff::assert_eq!(policy.select_victim(&set, 1), 1);

        let set = full_set(&[(0, 1), (0, 1), (0, 1), (0, 1)]);
        diff::assert_eq!(policy.select_victim(&set, 0), 0);
    }

    #[test]
    fn test_random_stays_within_window() {
        let set = full_set(&[(0, 0); 16]);
        let mut policy = super::random::Policy::new(8, 16, Some(42));
        diff::assert_eq!(policy.window(), 8);
        for _ in 0..1000 {
            assert!(policy.select_victim(&set, 0) < 8);
        }
    }

    #[test]
    fn test_random_window_bounded_by_associativity() {
        let set = full_set(&[(0, 0); 4]);
        let mut policy = super::random::Policy::new(8, 4, Some(7));
        diff::assert_eq!(policy.window(), 4);
        for _ in 0..1000 {
            assert!(policy.select_victim(&set, 0) < 4);
        }
    }

    #[test]
    fn test_random_is_reproducible_with_seed() {
        let set = full_set(&[(0, 0); 8]);
        let mut a = super::random::Policy::new(8, 8, Some(1234));
        let mut b = super::random::Policy::new(8, 8, Some(1234));
        let have: Vec<_> = (0..32).map(|_| a.select_victim(&set, 0)).collect();
        let want: Vec<_> = (0..32).map(|_| b.select_victim(&set, 0)).collect();
        diff::assert_eq!(have, want);
    }

    #[test]
    fn test_partitioned_core0_under_quota_evicts_core1() {
        // core 0 owns 1 of 4 ways, quota is 2
        let set = full_set(&[(1, 4), (0, 1), (1, 3), (1, 8)]);
        let mut policy = super::partitioned::Policy::new(2);
        diff::assert_eq!(policy.select_victim(&set, 0), 2);
    }

    #[test]
    fn test_partitioned_core0_at_quota_evicts_own_lru() {
        let set = full_set(&[(0, 6), (1, 1), (0, 5), (1, 2)]);
        let mut policy = super::partitioned::Policy::new(2);
        diff::assert_eq!(policy.select_victim(&set, 0), 2);
    }

    #[test]
    fn test_partitioned_core1_with_core0_over_quota_evicts_core0() {
        let set = full_set(&[(0, 6), (0, 9), (0, 7), (1, 1)]);
        let mut policy = super::partitioned::Policy::new(2);
        diff::assert_eq!(policy.select_victim(&set, 1), 0);
    }

    #[test]
    fn test_partitioned_core1_with_core0_at_quota_evicts_own_lru() {
        let set = full_set(&[(0, 1), (1, 9), (0, 2), (1, 3)]);
        let mut policy = super::partitioned::Policy::new(2);
        diff::assert_eq!(policy.select_victim(&set, 1), 3);
    }

    #[test]
    fn test_partitioned_falls_back_when_side_owns_nothing() {
        // core 0 is under quota but core 1 holds no way
        let set = full_set(&[(0, 4), (0, 2), (0, 3), (0, 8)]);
        let mut policy = super::partitioned::Policy::new(8);
        diff::assert_eq!(policy.select_victim(&set, 0), 1);
    }
}
