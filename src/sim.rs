use crate::cache::{self, Cache, EvictedLine};
use crate::{config, trace};
use stats::cache::AccessKind;

/// Drives a single cache with a stream of memory references.
///
/// Each reference is looked up and installed on a miss. The reference's
/// position in the stream is its timestamp.
#[derive(Debug)]
pub struct Simulation {
    cache: Cache,
    time: u64,
    per_core: stats::PerCore,
    writebacks: Vec<EvictedLine>,
}

impl Simulation {
    pub fn new(config: config::Cache) -> Result<Self, config::Error> {
        Ok(Self {
            cache: Cache::new(config)?,
            time: 0,
            per_core: stats::PerCore::default(),
            writebacks: Vec::new(),
        })
    }

    #[must_use]
    pub fn cache(&self) -> &Cache {
        &self.cache
    }

    /// Current timestamp.
    #[must_use]
    pub fn time(&self) -> u64 {
        self.time
    }

    /// Counters split by requesting core.
    ///
    /// Dirty evictions are charged to the core that owned the evicted line.
    #[must_use]
    pub fn per_core(&self) -> &stats::PerCore {
        &self.per_core
    }

    /// Dirty lines evicted so far, in eviction order.
    #[must_use]
    pub fn writebacks(&self) -> &[EvictedLine] {
        &self.writebacks
    }

    pub fn step(&mut self, access: &trace::Access) -> cache::RequestStatus {
        let is_write = access.op.is_write();
        let time = self.time;
        self.time += 1;

        let status = self.cache.access(access.addr, is_write, access.core, time);
        self.per_core.entry(access.core).or_default().inc(
            AccessKind::from_is_write(is_write),
            status.into(),
            1,
        );

        if status.is_miss() {
            if let Some(evicted) = self.cache.install(access.addr, is_write, access.core, time) {
                if evicted.needs_writeback() {
                    log::debug!(
                        "t={}: writeback of line {} (core {})",
                        time,
                        evicted.tag,
                        evicted.core_id
                    );
                    self.per_core
                        .entry(evicted.core_id)
                        .or_default()
                        .inc_dirty_evictions(1);
                    self.writebacks.push(evicted);
                }
            }
        }
        status
    }

    pub fn run<'a, I>(&mut self, accesses: I)
    where
        I: IntoIterator<Item = &'a trace::Access>,
    {
        let start = std::time::Instant::now();
        let mut count = 0;
        for access in accesses {
            let _ = self.step(access);
            count += 1;
        }
        log::info!(
            "simulated {} accesses in {:?} ({})",
            count,
            start.elapsed(),
            self.cache.config()
        );
    }
}

#[cfg(test)]
mod tests {
    use super::Simulation;
    use crate::cache::RequestStatus;
    use crate::config::{self, ReplacementPolicy};
    use crate::trace;
    use color_eyre::eyre;
    use pretty_assertions_sorted as diff;
    use stats::cache::AccessKind;

    #[test]
    fn test_example_scenario() -> eyre::Result<()> {
        let mut sim = Simulation::new(config::Cache {
            size: 32768,
            associativity: 4,
            line_size: 64,
            ..config::Cache::default()
        })?;
        diff::assert_eq!(sim.cache().num_sets(), 128);

        let access = trace::Access {
            core: 0,
            op: trace::Op::Write,
            addr: 5,
        };
        diff::assert_eq!(sim.step(&access), RequestStatus::MISS);
        let stats = sim.cache().stats();
        diff::assert_eq!(stats.num_accesses(AccessKind::WRITE), 1);
        diff::assert_eq!(stats.num_misses(AccessKind::WRITE), 1);
        assert!(sim.cache().set(5).find(5, 0).is_some());

        diff::assert_eq!(sim.step(&access), RequestStatus::HIT);
        let stats = sim.cache().stats();
        diff::assert_eq!(stats.num_accesses(AccessKind::WRITE), 2);
        diff::assert_eq!(stats.num_misses(AccessKind::WRITE), 1);
        diff::assert_eq!(sim.time(), 2);
        Ok(())
    }

    #[test]
    fn test_run_trace_with_writebacks() -> eyre::Result<()> {
        // direct mapped, single set: every new line evicts the previous one
        let mut sim = Simulation::new(config::Cache {
            size: 64,
            associativity: 1,
            line_size: 64,
            replacement_policy: ReplacementPolicy::LRU,
            ..config::Cache::default()
        })?;
        let trace = "core,op,addr\n0,W,1\n0,R,1\n1,R,2\n1,W,2\n0,R,1\n";
        let accesses = trace::read(trace.as_bytes())?;
        sim.run(&accesses);

        let stats = sim.cache().stats();
        diff::assert_eq!(stats.num_accesses(AccessKind::READ), 3);
        diff::assert_eq!(stats.num_misses(AccessKind::READ), 2);
        diff::assert_eq!(stats.num_accesses(AccessKind::WRITE), 2);
        diff::assert_eq!(stats.num_misses(AccessKind::WRITE), 1);
        diff::assert_eq!(stats.dirty_evictions, 2);

        let written_back: Vec<_> = sim
            .writebacks()
            .iter()
            .map(|line| (line.core_id, line.tag))
            .collect();
        diff::assert_eq!(written_back, vec![(0, 1), (1, 2)]);

        diff::assert_eq!(sim.per_core()[&0].dirty_evictions, 1);
        diff::assert_eq!(sim.per_core()[&1].dirty_evictions, 1);
        diff::assert_eq!(sim.per_core().reduce().total_accesses(), 5);
        Ok(())
    }
}
