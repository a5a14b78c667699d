#![allow(
    clippy::upper_case_acronyms,
    non_camel_case_types,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc,
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation
)]

pub mod cache;
pub mod config;
pub mod replacement;
pub mod sim;
pub mod trace;

pub use cache::{Cache, EvictedLine, RequestStatus};
pub use sim::Simulation;

/// A line-granular memory address.
pub type address = u64;
