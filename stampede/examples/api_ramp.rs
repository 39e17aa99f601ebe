use stampede::{LoadTest, Reporter, RunConfig, StdoutReporter};

#[tokio::main]
async fn main() -> Result<(), stampede::HarnessError> {
    tracing_subscriber::fmt::init();

    // The default profile is the full 17-minute dashboard-API ramp; point it
    // at your deployment and let it run.
    let mut config = RunConfig::default();
    if let Ok(base_url) = std::env::var("STAMPEDE_BASE_URL") {
        config.base_url = base_url;
    }

    let outcome = LoadTest::new(config)?.run().await?;
    StdoutReporter.report(outcome.report).await?;

    for violation in &outcome.violations {
        eprintln!(
            "threshold violated: {} {} (observed {:.4})",
            violation.metric, violation.expr, violation.observed
        );
    }
    std::process::exit(if outcome.passed { 0 } else { 1 });
}
