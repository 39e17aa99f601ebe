use thiserror::Error;

/// Failures that can abort a run before or after it executes.
///
/// Note what is *not* here: login rejections, probe failures and check
/// failures are ordinary values flowing into the metrics, never errors.
/// The only run-level failure signal is threshold evaluation at the end.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("invalid run configuration: {0}")]
    Config(String),

    #[error("invalid threshold `{expr}` on metric `{metric}`: {reason}")]
    Threshold {
        metric: String,
        expr: String,
        reason: String,
    },

    #[error("unknown threshold metric `{0}`")]
    UnknownMetric(String),

    #[error("failed to build http client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("executor task failed: {0}")]
    Executor(String),

    #[error("report sink failure: {0}")]
    Report(String),
}
