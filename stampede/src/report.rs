use std::fmt::Debug;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize, de::DeserializeOwned};

use crate::Aggregate;
use crate::error::HarnessError;
use crate::threshold::Stat;

/// A report derives final, human-meaningful statistics from an aggregate.
/// Rates, percentiles and averages are computed here, once, from the raw
/// counters and distributions the sink collected.
pub trait Report<A>
where
    Self: Send + Sync + Debug + From<A> + Serialize + DeserializeOwned,
    A: Aggregate,
{
}

/// Consumes reports and sends them somewhere: stdout, a file, a dashboard.
#[async_trait]
pub trait Reporter<A: Aggregate, R: Report<A>> {
    async fn report(&self, report: R) -> Result<(), HarnessError>;
}

pub use builtins::*;

mod builtins {
    use super::*;
    use crate::aggregate::HarnessAggregate;

    /// End-of-run summary derived from the merged [`HarnessAggregate`].
    ///
    /// The sorted latency samples are retained (in milliseconds) so that
    /// percentile thresholds can be evaluated at any quantile, not only the
    /// precomputed ones.
    #[derive(Clone, Debug, Serialize, Deserialize)]
    pub struct SummaryReport {
        pub http_requests: u64,
        pub probe_requests: u64,
        pub probe_errors: u64,
        /// probe_errors / probe_requests, 0.0 for an empty run
        pub error_rate: f64,
        /// probe_successes / probe_requests, 0.0 for an empty run
        pub success_rate: f64,
        pub login_attempts: u64,
        pub login_failures: u64,
        pub checks_passed: u64,
        pub checks_failed: u64,
        pub groups_skipped: u64,
        pub min_ms: f64,
        pub avg_ms: f64,
        pub max_ms: f64,
        pub p50_ms: f64,
        pub p90_ms: f64,
        pub p95_ms: f64,
        pub p99_ms: f64,
        latencies_ms: Vec<f64>,
    }

    impl From<HarnessAggregate> for SummaryReport {
        fn from(agg: HarnessAggregate) -> Self {
            let mut latencies_ms: Vec<f64> =
                agg.latencies.iter().map(duration_ms).collect();
            latencies_ms.sort_by(|a, b| a.total_cmp(b));

            let count = latencies_ms.len() as f64;
            let (error_rate, success_rate) = if agg.probe_requests == 0 {
                (0.0, 0.0)
            } else {
                (
                    agg.probe_errors as f64 / agg.probe_requests as f64,
                    agg.probe_successes as f64 / agg.probe_requests as f64,
                )
            };

            Self {
                http_requests: agg.http_requests,
                probe_requests: agg.probe_requests,
                probe_errors: agg.probe_errors,
                error_rate,
                success_rate,
                login_attempts: agg.login_attempts,
                login_failures: agg.login_failures,
                checks_passed: agg.checks_passed,
                checks_failed: agg.checks_failed,
                groups_skipped: agg.groups_skipped,
                min_ms: latencies_ms.first().copied().unwrap_or(0.0),
                avg_ms: if latencies_ms.is_empty() {
                    0.0
                } else {
                    latencies_ms.iter().sum::<f64>() / count
                },
                max_ms: latencies_ms.last().copied().unwrap_or(0.0),
                p50_ms: percentile(&latencies_ms, 50.0),
                p90_ms: percentile(&latencies_ms, 90.0),
                p95_ms: percentile(&latencies_ms, 95.0),
                p99_ms: percentile(&latencies_ms, 99.0),
                latencies_ms,
            }
        }
    }

    impl Report<HarnessAggregate> for SummaryReport {}

    impl SummaryReport {
        /// Resolves a threshold metric name to its statistic views.
        ///
        /// Known names: `http_reqs`, `http_req_failed`, `http_req_duration`,
        /// `success_rate`, `endpoint_requests`, `endpoint_errors`, `checks`.
        pub fn metric(&self, name: &str) -> Option<MetricView<'_>> {
            match name {
                "http_reqs" => Some(MetricView::count(self.http_requests)),
                "http_req_failed" => Some(MetricView {
                    rate: Some(self.error_rate),
                    count: Some(self.probe_errors as f64),
                    samples_ms: None,
                }),
                "http_req_duration" => Some(MetricView {
                    rate: None,
                    count: Some(self.probe_requests as f64),
                    samples_ms: Some(&self.latencies_ms),
                }),
                "success_rate" => Some(MetricView::rate(self.success_rate)),
                "endpoint_requests" => Some(MetricView::count(self.probe_requests)),
                "endpoint_errors" => Some(MetricView {
                    rate: Some(self.error_rate),
                    count: Some(self.probe_errors as f64),
                    samples_ms: None,
                }),
                "checks" => {
                    let total = self.checks_passed + self.checks_failed;
                    let rate = if total == 0 {
                        1.0
                    } else {
                        self.checks_passed as f64 / total as f64
                    };
                    Some(MetricView {
                        rate: Some(rate),
                        count: Some(self.checks_failed as f64),
                        samples_ms: None,
                    })
                }
                _ => None,
            }
        }
    }

    /// The statistics one named metric exposes to threshold evaluation.
    #[derive(Clone, Copy, Debug)]
    pub struct MetricView<'a> {
        pub rate: Option<f64>,
        pub count: Option<f64>,
        /// sorted, milliseconds
        pub samples_ms: Option<&'a [f64]>,
    }

    impl<'a> MetricView<'a> {
        fn rate(value: f64) -> Self {
            Self {
                rate: Some(value),
                count: None,
                samples_ms: None,
            }
        }

        fn count(value: u64) -> Self {
            Self {
                rate: None,
                count: Some(value as f64),
                samples_ms: None,
            }
        }

        pub fn stat(&self, stat: Stat) -> Option<f64> {
            match stat {
                Stat::Rate => self.rate,
                Stat::Count => self.count,
                Stat::Avg => self.samples_ms.map(|samples| {
                    if samples.is_empty() {
                        0.0
                    } else {
                        samples.iter().sum::<f64>() / samples.len() as f64
                    }
                }),
                Stat::Percentile(q) => self.samples_ms.map(|samples| percentile(samples, q)),
            }
        }
    }

    /// Prints the summary to stdout, one stat per line.
    pub struct StdoutReporter;

    #[async_trait]
    impl Reporter<HarnessAggregate, SummaryReport> for StdoutReporter {
        async fn report(&self, report: SummaryReport) -> Result<(), HarnessError> {
            println!("http requests ......... {}", report.http_requests);
            println!(
                "probes ................ {} ({} failed)",
                report.probe_requests, report.probe_errors
            );
            println!(
                "success rate .......... {:.2}%",
                report.success_rate * 100.0
            );
            println!(
                "logins ................ {} ({} failed)",
                report.login_attempts, report.login_failures
            );
            println!(
                "checks ................ {} passed / {} failed",
                report.checks_passed, report.checks_failed
            );
            if report.groups_skipped > 0 {
                println!("skipped groups ........ {}", report.groups_skipped);
            }
            println!(
                "latency ms ............ min={:.1} avg={:.1} max={:.1}",
                report.min_ms, report.avg_ms, report.max_ms
            );
            println!(
                "percentiles ms ........ p50={:.1} p90={:.1} p95={:.1} p99={:.1}",
                report.p50_ms, report.p90_ms, report.p95_ms, report.p99_ms
            );
            Ok(())
        }
    }
}

fn duration_ms(elapsed: &Duration) -> f64 {
    elapsed.as_secs_f64() * 1000.0
}

/// Nearest-rank percentile over an ascending-sorted slice. Empty input maps
/// to 0.0 so threshold evaluation on an idle run stays well-defined.
pub(crate) fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let rank = ((q / 100.0) * sorted.len() as f64).ceil() as usize;
    sorted[rank.clamp(1, sorted.len()) - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Aggregate, HarnessAggregate};
    use crate::metric::{IterationMetric, ProbeSample};

    #[test]
    fn percentile_nearest_rank() {
        let samples: Vec<f64> = (1..=100).map(f64::from).collect();
        assert_eq!(percentile(&samples, 50.0), 50.0);
        assert_eq!(percentile(&samples, 95.0), 95.0);
        assert_eq!(percentile(&samples, 100.0), 100.0);
        assert_eq!(percentile(&samples, 0.0), 1.0);
        assert_eq!(percentile(&[], 95.0), 0.0);
        assert_eq!(percentile(&[42.0], 99.0), 42.0);
    }

    #[test]
    fn report_derives_rates_from_raw_counters() {
        let mut agg = HarnessAggregate::new();
        let mut metric = IterationMetric {
            login_attempts: 1,
            ..Default::default()
        };
        for i in 0..10u64 {
            metric.probes.push(ProbeSample {
                elapsed: Duration::from_millis(100 * (i + 1)),
                success: i != 0,
            });
        }
        agg.consume(&metric);

        let report = SummaryReport::from(agg);
        assert_eq!(report.http_requests, 11);
        assert_eq!(report.probe_requests, 10);
        assert!((report.error_rate - 0.1).abs() < 1e-9);
        assert!((report.success_rate - 0.9).abs() < 1e-9);
        assert_eq!(report.min_ms, 100.0);
        assert_eq!(report.max_ms, 1000.0);
        assert_eq!(report.p50_ms, 500.0);
    }

    #[test]
    fn empty_run_report_is_well_defined() {
        let report = SummaryReport::from(HarnessAggregate::new());
        assert_eq!(report.error_rate, 0.0);
        assert_eq!(report.p95_ms, 0.0);
        let view = report.metric("http_req_duration").unwrap();
        assert_eq!(view.stat(crate::threshold::Stat::Avg), Some(0.0));
    }

    #[test]
    fn metric_names_resolve() {
        let report = SummaryReport::from(HarnessAggregate::new());
        for name in [
            "http_reqs",
            "http_req_failed",
            "http_req_duration",
            "success_rate",
            "endpoint_requests",
            "endpoint_errors",
            "checks",
        ] {
            assert!(report.metric(name).is_some(), "metric {name} should resolve");
        }
        assert!(report.metric("nope").is_none());
    }
}
