//! Pass/fail thresholds over aggregate metrics.
//!
//! Predicates use the compact string form the run configuration carries:
//! `rate<0.05`, `p(95)<3000`, `count<100`, `avg<500`. Durations are in
//! milliseconds. Thresholds are parsed eagerly when the run is configured
//! and evaluated exactly once, after the last simulated user finishes — a
//! violation fails the run but never aborts in-flight work.

use serde::{Deserialize, Serialize};

use crate::error::HarnessError;
use crate::report::SummaryReport;

/// Which statistic of a metric the predicate constrains.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum Stat {
    /// Fraction of true outcomes, in `0.0..=1.0`.
    Rate,
    /// Absolute number of occurrences.
    Count,
    /// Mean over the metric's samples, in milliseconds.
    Avg,
    /// The q-th percentile over the metric's samples, in milliseconds.
    Percentile(f64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Op {
    Lt,
    Le,
    Gt,
    Ge,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Predicate {
    pub stat: Stat,
    pub op: Op,
    pub bound: f64,
}

impl Predicate {
    pub fn parse(expr: &str) -> Result<Self, String> {
        let expr = expr.trim();
        let (lhs, op, rhs) = split_operator(expr)?;
        let stat = parse_stat(lhs)?;
        let bound: f64 = rhs
            .trim()
            .parse()
            .map_err(|_| format!("`{rhs}` is not a numeric bound"))?;
        Ok(Predicate { stat, op, bound })
    }

    pub fn holds(&self, observed: f64) -> bool {
        match self.op {
            Op::Lt => observed < self.bound,
            Op::Le => observed <= self.bound,
            Op::Gt => observed > self.bound,
            Op::Ge => observed >= self.bound,
        }
    }
}

fn split_operator(expr: &str) -> Result<(&str, Op, &str), String> {
    // two-character operators first so `<=` is not read as `<` + `=...`
    for (symbol, op) in [("<=", Op::Le), (">=", Op::Ge), ("<", Op::Lt), (">", Op::Gt)] {
        if let Some(at) = expr.find(symbol) {
            return Ok((&expr[..at], op, &expr[at + symbol.len()..]));
        }
    }
    Err(format!("`{expr}` has no comparison operator"))
}

fn parse_stat(lhs: &str) -> Result<Stat, String> {
    let lhs = lhs.trim();
    match lhs {
        "rate" => Ok(Stat::Rate),
        "count" => Ok(Stat::Count),
        "avg" => Ok(Stat::Avg),
        _ => {
            let quantile = lhs
                .strip_prefix("p(")
                .and_then(|rest| rest.strip_suffix(')'))
                .ok_or_else(|| format!("`{lhs}` is not a known statistic"))?;
            let q: f64 = quantile
                .parse()
                .map_err(|_| format!("`{quantile}` is not a numeric quantile"))?;
            if !(0.0..=100.0).contains(&q) {
                return Err(format!("quantile {q} out of range 0..=100"));
            }
            Ok(Stat::Percentile(q))
        }
    }
}

/// A named metric bound: `metric` resolves against the [`SummaryReport`],
/// `predicate` is the parsed form of `expr`.
#[derive(Clone, Debug, PartialEq)]
pub struct Threshold {
    pub metric: String,
    pub expr: String,
    pub predicate: Predicate,
}

impl Threshold {
    pub fn parse(metric: &str, expr: &str) -> Result<Self, HarnessError> {
        let predicate = Predicate::parse(expr).map_err(|reason| HarnessError::Threshold {
            metric: metric.to_owned(),
            expr: expr.to_owned(),
            reason,
        })?;
        Ok(Self {
            metric: metric.to_owned(),
            expr: expr.to_owned(),
            predicate,
        })
    }
}

/// One violated threshold, with the value that crossed the bound.
#[derive(Clone, Debug, Serialize)]
pub struct Violation {
    pub metric: String,
    pub expr: String,
    pub observed: f64,
}

/// Evaluates every threshold against the end-of-run report. Unknown metrics
/// and unsupported statistics are configuration errors, not violations.
pub fn evaluate(
    thresholds: &[Threshold],
    report: &SummaryReport,
) -> Result<Vec<Violation>, HarnessError> {
    let mut violations = Vec::new();
    for threshold in thresholds {
        let view = report
            .metric(&threshold.metric)
            .ok_or_else(|| HarnessError::UnknownMetric(threshold.metric.clone()))?;
        let observed =
            view.stat(threshold.predicate.stat)
                .ok_or_else(|| HarnessError::Threshold {
                    metric: threshold.metric.clone(),
                    expr: threshold.expr.clone(),
                    reason: "metric does not expose that statistic".to_owned(),
                })?;
        if !threshold.predicate.holds(observed) {
            violations.push(Violation {
                metric: threshold.metric.clone(),
                expr: threshold.expr.clone(),
                observed,
            });
        }
    }
    Ok(violations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aggregate::{Aggregate, HarnessAggregate};
    use crate::metric::{IterationMetric, ProbeSample};
    use std::time::Duration;

    #[test]
    fn parses_observed_forms() {
        assert_eq!(
            Predicate::parse("rate<0.05").unwrap(),
            Predicate {
                stat: Stat::Rate,
                op: Op::Lt,
                bound: 0.05
            }
        );
        assert_eq!(
            Predicate::parse("p(95)<3000").unwrap(),
            Predicate {
                stat: Stat::Percentile(95.0),
                op: Op::Lt,
                bound: 3000.0
            }
        );
        assert_eq!(
            Predicate::parse("rate>0.95").unwrap().op,
            Op::Gt
        );
        assert_eq!(
            Predicate::parse("count<100").unwrap().stat,
            Stat::Count
        );
        assert_eq!(Predicate::parse(" avg <= 500 ").unwrap().op, Op::Le);
    }

    #[test]
    fn rejects_garbage() {
        assert!(Predicate::parse("rate=0.05").is_err());
        assert!(Predicate::parse("median<10").is_err());
        assert!(Predicate::parse("p(101)<10").is_err());
        assert!(Predicate::parse("rate<fast").is_err());
        assert!(Threshold::parse("success_rate", "").is_err());
    }

    fn report_with(errors: u64, requests: u64) -> SummaryReport {
        let mut agg = HarnessAggregate::new();
        let mut metric = IterationMetric {
            login_attempts: 1,
            ..Default::default()
        };
        for i in 0..requests {
            metric.probes.push(ProbeSample {
                elapsed: Duration::from_millis(10 + i),
                success: i >= errors,
            });
        }
        agg.consume(&metric);
        SummaryReport::from(agg)
    }

    #[test]
    fn error_rate_bound_passes_and_fails() {
        let threshold = Threshold::parse("http_req_failed", "rate<0.05").unwrap();

        let passing = evaluate(std::slice::from_ref(&threshold), &report_with(3, 100)).unwrap();
        assert!(passing.is_empty());

        let failing = evaluate(&[threshold], &report_with(6, 100)).unwrap();
        assert_eq!(failing.len(), 1);
        assert_eq!(failing[0].metric, "http_req_failed");
        assert!((failing[0].observed - 0.06).abs() < 1e-9);
    }

    #[test]
    fn unknown_metric_is_an_error_not_a_violation() {
        let threshold = Threshold::parse("warp_core_temp", "rate<0.5").unwrap();
        let err = evaluate(&[threshold], &report_with(0, 10)).unwrap_err();
        assert!(matches!(err, HarnessError::UnknownMetric(_)));
    }

    #[test]
    fn percentile_threshold_evaluates_against_latencies() {
        let threshold = Threshold::parse("http_req_duration", "p(95)<3000").unwrap();
        let ok = evaluate(&[threshold.clone()], &report_with(0, 100)).unwrap();
        assert!(ok.is_empty());

        let tight = Threshold::parse("http_req_duration", "p(95)<5").unwrap();
        let violated = evaluate(&[tight], &report_with(0, 100)).unwrap();
        assert_eq!(violated.len(), 1);
    }
}
