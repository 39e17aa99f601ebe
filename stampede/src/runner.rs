//! Run controller: wires configuration, authenticator, probe and executor
//! into one load-test run and evaluates the thresholds when it ends.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;

use crate::aggregate::HarnessAggregate;
use crate::auth::Authenticator;
use crate::checks::Check;
use crate::config::{EndpointConfig, RunConfig};
use crate::error::HarnessError;
use crate::executor::StageExecutor;
use crate::metric::IterationMetric;
use crate::probe::{ApiProbe, ProbeRequest};
use crate::report::SummaryReport;
use crate::scenario::Scenario;
use crate::threshold::{self, Threshold, Violation};

/// One endpoint group of the scenario: the request to issue, the structural
/// check to run on a 200, and the think time that follows.
#[derive(Clone, Debug)]
pub struct EndpointGroup {
    pub name: String,
    pub request: ProbeRequest,
    pub check: Option<Check>,
    pub pause: Duration,
    pub enabled: bool,
}

impl From<&EndpointConfig> for EndpointGroup {
    fn from(config: &EndpointConfig) -> Self {
        Self {
            name: config.name.clone(),
            request: ProbeRequest::new(&config.method, config.path.as_str(), config.body.clone()),
            check: config.check.clone(),
            pause: Duration::from_secs_f64(config.pause_secs),
            enabled: config.enabled,
        }
    }
}

/// What one run produced: the derived summary, the violated thresholds, and
/// the overall verdict. `passed` is false exactly when `violations` is
/// non-empty — no individual request can fail the run on its own.
#[derive(Debug)]
pub struct RunOutcome {
    pub passed: bool,
    pub report: SummaryReport,
    pub violations: Vec<Violation>,
}

/// A fully validated load test, ready to run.
///
/// Validation happens up front: the stage schedule must be non-empty and
/// every threshold must parse and resolve against a known metric, so a typo
/// surfaces before seventeen minutes of ramping, not after.
pub struct LoadTest {
    config: RunConfig,
    thresholds: Vec<Threshold>,
}

impl LoadTest {
    pub fn new(config: RunConfig) -> Result<Self, HarnessError> {
        if config.stages.is_empty() {
            return Err(HarnessError::Config(
                "the stage schedule must contain at least one stage".into(),
            ));
        }
        let (pause_min, pause_max) = config.iteration_pause_secs;
        if !valid_pause(pause_min) || !valid_pause(pause_max) {
            return Err(HarnessError::Config(
                "iteration pause bounds must be finite and non-negative".into(),
            ));
        }
        if pause_min > pause_max {
            return Err(HarnessError::Config(
                "iteration pause bounds are inverted".into(),
            ));
        }
        for endpoint in &config.endpoints {
            if !valid_pause(endpoint.pause_secs) {
                return Err(HarnessError::Config(format!(
                    "endpoint group `{}` has an invalid pause: {} seconds",
                    endpoint.name, endpoint.pause_secs
                )));
            }
        }

        let mut thresholds = Vec::with_capacity(config.thresholds.len());
        let probe_dry_run = SummaryReport::from(HarnessAggregate::default());
        for declared in &config.thresholds {
            let threshold = Threshold::parse(&declared.metric, &declared.expr)?;
            let view = probe_dry_run
                .metric(&threshold.metric)
                .ok_or_else(|| HarnessError::UnknownMetric(threshold.metric.clone()))?;
            if view.stat(threshold.predicate.stat).is_none() {
                return Err(HarnessError::Threshold {
                    metric: threshold.metric.clone(),
                    expr: threshold.expr.clone(),
                    reason: "metric does not expose that statistic".into(),
                });
            }
            thresholds.push(threshold);
        }

        Ok(Self { config, thresholds })
    }

    /// Runs the full schedule and returns the verdict.
    ///
    /// The HTTP client is built once and handed to every consumer — probes
    /// and authenticator share its connection pool and the configured
    /// per-request timeout.
    pub async fn run(&self) -> Result<RunOutcome, HarnessError> {
        let client = reqwest::Client::builder()
            .timeout(self.config.request_timeout())
            .build()?;

        let auth = Arc::new(Authenticator::new(
            client.clone(),
            &self.config.base_url,
            &self.config.login_path,
            self.config.credentials.login.clone(),
            self.config.credentials.password.clone(),
        ));
        let probe = Arc::new(ApiProbe::new(client, self.config.base_url.clone()));
        let groups: Arc<Vec<EndpointGroup>> =
            Arc::new(self.config.endpoints.iter().map(EndpointGroup::from).collect());
        let pause_bounds = self.config.iteration_pause_secs;

        let action = move || {
            let auth = Arc::clone(&auth);
            let probe = Arc::clone(&probe);
            let groups = Arc::clone(&groups);
            async move { run_iteration(&auth, &probe, &groups, pause_bounds).await }
        };

        let executor = StageExecutor::builder()
            .stages(self.config.stages())
            .tick(self.config.governor_tick())
            .build();

        let aggregate = Scenario::<HarnessAggregate, _, _, _>::builder()
            .name(self.config.name.clone())
            .action(action)
            .executor(executor)
            .build()
            .run()
            .await?;

        let report = SummaryReport::from(aggregate);
        let violations = threshold::evaluate(&self.thresholds, &report)?;
        for violation in &violations {
            tracing::error!(
                metric = %violation.metric,
                expr = %violation.expr,
                observed = violation.observed,
                "threshold violated"
            );
        }
        let passed = violations.is_empty();
        tracing::info!(passed, "run verdict");

        Ok(RunOutcome {
            passed,
            report,
            violations,
        })
    }
}

/// Pauses feed `Duration::from_secs_f64`, which panics on negative or
/// non-finite input — keep those out at validation time.
fn valid_pause(secs: f64) -> bool {
    secs.is_finite() && secs >= 0.0
}

/// One simulated-user iteration: authenticate once, then walk the endpoint
/// groups in declared order.
///
/// Nothing in here escalates: a rejected login leaves the iteration running
/// unauthenticated, a failed probe feeds the error counter, a failed check
/// feeds the check tally. Think times always run — a slow failure iteration
/// paces the same as a healthy one.
pub async fn run_iteration(
    auth: &Authenticator,
    probe: &ApiProbe,
    groups: &[EndpointGroup],
    pause_bounds: (f64, f64),
) -> IterationMetric {
    let mut metric = IterationMetric::default();

    let session = auth.session().await;
    metric.record_login(&session);
    let token = session.token.as_deref();

    for group in groups {
        if group.enabled {
            let result = probe.call(token, &group.request).await;
            metric.record_probe(&result);
            if let Some(check) = &group.check {
                if result.is_ok() {
                    let passed = check.passes(result.json().as_ref());
                    if !passed {
                        tracing::debug!(group = %group.name, "structural check failed");
                    }
                    metric.record_check(passed);
                }
            }
        } else {
            metric.record_skip();
        }
        tokio::time::sleep(group.pause).await;
    }

    let pause = rand::thread_rng().gen_range(pause_bounds.0..=pause_bounds.1);
    tokio::time::sleep(Duration::from_secs_f64(pause)).await;

    metric
}
