use std::marker::PhantomData;
use std::future::Future;
use std::time::Instant;

use typed_builder::TypedBuilder;

use crate::{aggregate::Aggregate, error::HarnessError, executor::Executor};

/// Glue that ties a run together: a name, the per-iteration action each
/// simulated user executes, and the executor that schedules those users.
///
/// The action is invoked once per iteration and returns one metric; the
/// executor's workers feed those metrics into worker-local aggregates.
#[derive(Debug, Clone, TypedBuilder)]
pub struct Scenario<A, E, F, Fut>
where
    A: Aggregate,
    E: Executor<A, F, Fut> + Send + Sync,
    F: Fn() -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = A::Metric> + Send,
{
    #[builder(setter(into))]
    pub name: String,
    pub action: F,
    pub executor: E,
    #[builder(default, setter(skip))]
    aggregator: PhantomData<A>,
}

impl<A, E, F, Fut> Scenario<A, E, F, Fut>
where
    A: Aggregate,
    E: Executor<A, F, Fut> + Send + Sync,
    F: Fn() -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = A::Metric> + Send,
{
    /// Runs the scenario to completion and returns the merged aggregate.
    ///
    /// Owns the run's lifecycle bookkeeping: one log line when the run
    /// starts and one with total wall-clock seconds when it ends.
    pub async fn run(&mut self) -> Result<A, HarnessError> {
        tracing::info!(scenario = %self.name, "run starting");
        let started = Instant::now();
        let aggregate = self.executor.exec(self).await?;
        tracing::info!(
            scenario = %self.name,
            duration_secs = started.elapsed().as_secs_f64(),
            "run finished"
        );
        Ok(aggregate)
    }
}
