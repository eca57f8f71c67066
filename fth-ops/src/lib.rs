//! FTH Operations
//!
//! Wiring and runners for the reserves core:
//!
//! - [`OpsConfig`]: one TOML file plus environment overrides for every component
//! - [`OpsContext`]: explicitly constructed transports, signers, store and metrics
//! - [`jobs`]: PoR snapshot, reconciliation, DEX scan and anchor-retry runners
//! - [`JobScheduler`]: daily and hourly triggers under per-job store leases
//! - [`simulation`]: a full program day against simulated ledgers

#![forbid(unsafe_code)]
#![warn(
    missing_docs,
    rust_2018_idioms,
    missing_debug_implementations,
    clippy::all
)]

pub mod cli;
pub mod config;
pub mod context;
pub mod error;
pub mod jobs;
pub mod logging;
pub mod metrics;
pub mod scheduler;
pub mod simulation;

// Re-exports
pub use config::{MetricsConfig, OpsConfig};
pub use context::OpsContext;
pub use error::{Error, Result};
pub use jobs::{Job, JobReport};
pub use metrics::OpsMetrics;
pub use scheduler::{JobScheduler, ScheduleConfig};
pub use simulation::{simulate_day, DayReport, SimulatedEnvironment, SimulationPlan};
