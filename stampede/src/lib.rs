//! Stampede — a staged-ramp load-test harness for bearer-authenticated HTTP APIs.
//!
//! Stampede drives many simulated users against a deployed API: each user
//! logs in once per iteration, walks a configured sequence of endpoint
//! groups with think-time pauses, and feeds latency and success samples into
//! a run-wide metrics sink. Concurrency ramps through declared stages, and
//! the run passes or fails on aggregate thresholds evaluated once, at the
//! end — never on an individual request.
//!
//! # Architecture
//!
//! The main building blocks are:
//!
//! - [`RunConfig`] / [`LoadTest`]: the run controller — target URL,
//!   credentials, the stage schedule, the threshold set, and the endpoint
//!   groups, validated before anything ramps.
//! - [`Scenario`]: glue between the per-iteration action and the executor;
//!   owns the run's start/end bookkeeping.
//! - [`Executor`] / [`StageExecutor`]: schedules the simulated users. The
//!   stage executor interpolates the allowed concurrency level through
//!   `{duration, target}` stages and retires users on ramp-down.
//! - [`Metric`] / [`Aggregate`]: one [`metric::IterationMetric`] per
//!   iteration, consumed into worker-local [`HarnessAggregate`]s that merge
//!   into the final sink. Every probe contributes exactly one latency sample
//!   and one success boolean, transport failures included.
//! - [`Report`] / [`Reporter`]: [`SummaryReport`] derives rates and
//!   percentiles from the merged sink; thresholds evaluate against it and
//!   [`StdoutReporter`] prints it.
//!
//! # Failure model
//!
//! Rejected logins, failed probes and failed structural checks are data, not
//! errors: they land in their own counters and the iteration keeps going.
//! The only hard errors are configuration mistakes (bad threshold syntax,
//! unknown metric names, an empty schedule) and executor task failures —
//! everything the network does to you is part of the measurement.
//!
//! # Example
//!
//! ```rust,no_run
//! use stampede::{LoadTest, RunConfig, Reporter, StdoutReporter};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), stampede::HarnessError> {
//!     let mut config = RunConfig::default();
//!     config.base_url = "http://10.0.0.2:8081/api".into();
//!
//!     let outcome = LoadTest::new(config)?.run().await?;
//!     StdoutReporter.report(outcome.report).await?;
//!     std::process::exit(if outcome.passed { 0 } else { 1 });
//! }
//! ```

/// Metric aggregators — the run-wide sink
pub mod aggregate;
/// Login call and bearer-credential handling
pub mod auth;
/// Structural checks on successful responses
pub mod checks;
/// Run configuration and its reference defaults
pub mod config;
/// Run-level error taxonomy
pub mod error;
/// Orchestrators that define how simulated users are scheduled
pub mod executor;
/// Single metric samples
pub mod metric;
/// Instrumented endpoint probes
pub mod probe;
/// Reports and Reporters
pub mod report;
/// The run controller and per-iteration scenario body
pub mod runner;
/// Glue module tying action and executor together
pub mod scenario;
/// Threshold predicates and end-of-run evaluation
pub mod threshold;

pub use aggregate::{Aggregate, HarnessAggregate};
pub use config::RunConfig;
pub use error::HarnessError;
pub use executor::{Executor, Stage, StageExecutor};
pub use metric::Metric;
pub use report::{Report, Reporter, StdoutReporter, SummaryReport};
pub use runner::{LoadTest, RunOutcome};
pub use scenario::Scenario;
pub use threshold::Threshold;

/// Attribute macros to reduce metric/aggregate boilerplate
pub mod macros {
    pub use stampede_macros::*;
}
