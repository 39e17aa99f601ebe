use std::fmt::Debug;

use serde::{Serialize, de::DeserializeOwned};

use crate::Metric;

/// The `Aggregate` trait defines how raw [`Metric`] values are collected and
/// combined into a compact, mergeable representation.
///
/// Aggregates should **not** compute final statistics such as rates or
/// percentiles — those belong in a report, which is converted from an
/// aggregate once the run ends. Aggregates store the raw counters and
/// distributions so the report stage can derive accurate summaries without
/// losing information.
///
/// Every simulated user accumulates into its own aggregate; the executor
/// merges them all once the run is over. That is why `merge` must be
/// **associative** and **commutative** — worker-local aggregates arrive in
/// arbitrary order, and the totals must not depend on the interleaving.
pub trait Aggregate
where
    Self: Serialize + DeserializeOwned + PartialOrd + PartialEq + Send + Sync + Debug + Clone,
{
    /// The metric type this aggregate summarizes.
    type Metric: Metric;

    /// Create a new, empty instance of the aggregate.
    fn new() -> Self;

    /// Aggregate multiple metrics into the current instance.
    ///
    /// This default implementation calls [`Aggregate::consume`] for each metric.
    fn aggregate(&mut self, metrics: &[Self::Metric]) {
        metrics.iter().for_each(|m| self.consume(m));
    }

    /// Incorporate a single metric into the aggregate.
    fn consume(&mut self, metric: &Self::Metric);

    /// Combine two different aggregates into one.
    fn merge(&mut self, other: Self);
}

pub use builtins::*;

mod builtins {
    use std::time::Duration;

    use super::*;
    use crate::macros::aggregate;
    use crate::metric::IterationMetric;

    /// The run-wide metrics sink.
    ///
    /// Monotone counters plus the appendable latency distribution, one entry
    /// per probe. `http_requests` counts every HTTP call the harness makes
    /// (logins included); `probe_requests` and the latency/success tallies
    /// cover only the endpoints under test — the login call is a setup step,
    /// tallied under `login_attempts`/`login_failures` instead.
    #[aggregate]
    #[derive(Default)]
    pub struct HarnessAggregate {
        pub http_requests: u64,
        pub probe_requests: u64,
        pub probe_successes: u64,
        pub probe_errors: u64,
        pub latencies: Vec<Duration>,
        pub login_attempts: u64,
        pub login_failures: u64,
        pub checks_passed: u64,
        pub checks_failed: u64,
        pub groups_skipped: u64,
    }

    impl Aggregate for HarnessAggregate {
        type Metric = IterationMetric;

        fn new() -> Self {
            HarnessAggregate::default()
        }

        fn consume(&mut self, metric: &Self::Metric) {
            let probes = metric.probes.len() as u64;
            self.http_requests += metric.login_attempts + probes;
            self.probe_requests += probes;
            for probe in &metric.probes {
                self.latencies.push(probe.elapsed);
                if probe.success {
                    self.probe_successes += 1;
                } else {
                    self.probe_errors += 1;
                }
            }
            self.login_attempts += metric.login_attempts;
            self.login_failures += metric.login_failures;
            self.checks_passed += metric.checks_passed;
            self.checks_failed += metric.checks_failed;
            self.groups_skipped += metric.groups_skipped;
        }

        fn merge(&mut self, other: Self) {
            self.http_requests += other.http_requests;
            self.probe_requests += other.probe_requests;
            self.probe_successes += other.probe_successes;
            self.probe_errors += other.probe_errors;
            self.latencies.extend(other.latencies);
            self.login_attempts += other.login_attempts;
            self.login_failures += other.login_failures;
            self.checks_passed += other.checks_passed;
            self.checks_failed += other.checks_failed;
            self.groups_skipped += other.groups_skipped;
        }
    }
}
