use std::fmt::Debug;

use serde::{Serialize, de::DeserializeOwned};

use crate::auth::LoginOutcome;
use crate::probe::ProbeResult;

/// Samples that should be collected and processed by the harness.
/// Metrics can be composed of other metrics as well.
pub trait Metric
where
    Self: Serialize + DeserializeOwned + PartialOrd + PartialEq + Send + Sync + Debug + Clone,
{
}

pub use builtins::*;

mod builtins {
    use std::time::Duration;

    use super::*;
    use crate::macros::metric;

    /// One endpoint probe's contribution to the run: how long the exchange
    /// took and whether it succeeded (response obtained and status < 400).
    #[metric]
    #[derive(Copy)]
    pub struct ProbeSample {
        pub elapsed: Duration,
        pub success: bool,
    }

    /// Everything one simulated-user iteration produced: the login outcome,
    /// the ordered probe samples, and the check/skip tallies.
    ///
    /// Each probe recorded here contributes exactly one sample — one latency
    /// point, one success boolean — even when the transport failed. The
    /// `record_*` methods are the only write path, which keeps that invariant
    /// in one place.
    #[metric]
    #[derive(Default)]
    pub struct IterationMetric {
        pub login_attempts: u64,
        pub login_failures: u64,
        pub probes: Vec<ProbeSample>,
        pub checks_passed: u64,
        pub checks_failed: u64,
        pub groups_skipped: u64,
    }

    impl IterationMetric {
        /// A login rejection is a normal outcome, tallied separately from the
        /// endpoints under test.
        pub fn record_login(&mut self, outcome: &LoginOutcome) {
            self.login_attempts += 1;
            if outcome.token.is_none() {
                self.login_failures += 1;
            }
        }

        pub fn record_probe(&mut self, result: &ProbeResult) {
            self.probes.push(ProbeSample {
                elapsed: result.elapsed,
                success: result.success,
            });
        }

        pub fn record_check(&mut self, passed: bool) {
            if passed {
                self.checks_passed += 1;
            } else {
                self.checks_failed += 1;
            }
        }

        /// A disabled endpoint group degrades to a skipped group, never to a
        /// failed probe.
        pub fn record_skip(&mut self) {
            self.groups_skipped += 1;
        }
    }
}
