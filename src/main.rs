use clap::Parser;
use color_eyre::eyre;
use std::path::PathBuf;
use waysim::config::{self, ReplacementPolicy};

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
struct Options {
    /// CSV trace with `core,op,addr` columns
    #[arg(value_name = "TRACE")]
    trace: PathBuf,

    /// JSON cache configuration, overrides the cache flags below
    #[arg(short = 'c', long = "config", value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Capacity in bytes
    #[arg(long, default_value_t = 32 * 1024)]
    size: u64,

    /// Number of ways per set
    #[arg(long = "assoc", default_value_t = 4)]
    associativity: usize,

    /// Line size in bytes
    #[arg(long, default_value_t = 64)]
    line_size: u64,

    #[arg(long, value_enum, default_value_t = ReplacementPolicy::LRU)]
    policy: ReplacementPolicy,

    /// Ways per set reserved for core 0 (partitioned policy)
    #[arg(long = "core0-ways", default_value_t = 0)]
    core0_quota: usize,

    /// Seed for the random policy
    #[arg(long)]
    seed: Option<u64>,

    /// Label prefixed to every line of the report
    #[arg(long, default_value = "L2")]
    label: String,

    /// Also report per-core counters
    #[arg(long)]
    per_core: bool,

    /// Print the counters as JSON instead
    #[arg(long)]
    json: bool,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

impl Options {
    fn cache_config(&self) -> eyre::Result<config::Cache> {
        if let Some(ref path) = self.config {
            let reader = std::io::BufReader::new(std::fs::File::open(path)?);
            return Ok(serde_json::from_reader(reader)?);
        }
        Ok(config::Cache {
            size: self.size,
            associativity: self.associativity,
            line_size: self.line_size,
            replacement_policy: self.policy,
            core0_quota: self.core0_quota,
            random_window: config::DEFAULT_RANDOM_WINDOW,
            seed: self.seed,
        })
    }
}

fn main() -> eyre::Result<()> {
    color_eyre::install()?;
    let options = Options::parse();

    let log_level = match options.verbose {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,
        2 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    };
    env_logger::Builder::new()
        .filter_level(log_level)
        .parse_default_env()
        .init();

    let config = options.cache_config()?;
    let mut sim = waysim::Simulation::new(config)?;
    let accesses = waysim::trace::open(&options.trace)?;
    sim.run(&accesses);

    if options.json {
        let mut out = serde_json::Map::new();
        out.insert(
            options.label.clone(),
            serde_json::to_value(sim.cache().stats().summary())?,
        );
        if options.per_core {
            let mut cores: Vec<_> = sim.per_core().iter().collect();
            cores.sort_by_key(|(core_id, _)| **core_id);
            for (core_id, stats) in cores {
                out.insert(
                    format!("{}_CORE{core_id}", options.label),
                    serde_json::to_value(stats.summary())?,
                );
            }
        }
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    print!("{}", sim.cache().report(&options.label));
    if options.per_core {
        let mut cores: Vec<_> = sim.per_core().iter().collect();
        cores.sort_by_key(|(core_id, _)| **core_id);
        for (core_id, stats) in cores {
            print!("{}", stats.report(&format!("{}_CORE{core_id}", options.label)));
        }
    }
    Ok(())
}
