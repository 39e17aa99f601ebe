//! Executor — orchestration of simulated users over the run's lifetime.
//!
//! The `Executor` trait is the runtime hook that executes a `Scenario`. The
//! built-in [`StageExecutor`] drives a pool of simulated users through a
//! staged concurrency ramp: a governor task linearly interpolates the
//! allowed number of active users between stage targets, and each user task
//! runs scenario iterations while its slot is within the current level.
//!
//! Other strategies (fixed concurrency, distributed workers) can be plugged
//! in by implementing the trait.

pub mod stage;
pub use stage::{Stage, StageExecutor};

use std::future::Future;

use crate::{aggregate::Aggregate, error::HarnessError, scenario::Scenario};

pub trait Executor<A, F, Fut>
where
    Self: Send + Sync + Sized,
    A: Aggregate,
    F: Fn() -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = A::Metric> + Send,
{
    /// Execute the scenario and return the final merged aggregate.
    fn exec(
        &self,
        scenario: &Scenario<A, Self, F, Fut>,
    ) -> impl Future<Output = Result<A, HarnessError>> + Send;
}
