use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use futures::future::join_all;
use tokio::sync::watch::{self, Receiver, Sender};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use typed_builder::TypedBuilder;

use super::Executor;
use crate::{aggregate::Aggregate, error::HarnessError, scenario::Scenario};
use internals::*;

/// A stage holds a target number of concurrent simulated users and how long
/// to ramp to that target from wherever the previous stage left off.
///
/// `Stage::new(Duration::from_secs(60), 20)` ramps to 20 users over one
/// minute. A zero-duration stage jumps the level immediately, which makes
/// spike profiles expressible in the same schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Stage {
    pub duration: Duration,
    /// Target concurrent simulated users at the end of the stage.
    pub target: u64,
}

impl Stage {
    pub fn new(duration: Duration, target: u64) -> Self {
        Self { duration, target }
    }
}

/// Executor that ramps a pool of simulated-user tasks through [`Stage`]s.
///
/// - One task per user slot is spawned up front (as many as the largest
///   stage target); a slot only runs iterations while its index is below the
///   governor's current level, so ramp-down retires users naturally.
/// - The governor re-interpolates the level every `tick`.
/// - Shutdown is observed **between** iterations: an in-flight iteration
///   always finishes its current step, there is no mid-probe cancellation.
#[derive(TypedBuilder)]
pub struct StageExecutor {
    pub stages: Vec<Stage>,
    #[builder(default = Duration::from_millis(250))]
    pub tick: Duration,
}

impl<A, F, Fut> Executor<A, F, Fut> for StageExecutor
where
    Self: Send + Sync + Sized,
    A: Aggregate + 'static,
    F: Fn() -> Fut + Send + Sync + Clone + 'static,
    Fut: Future<Output = A::Metric> + Send,
{
    async fn exec(&self, scenario: &Scenario<A, Self, F, Fut>) -> Result<A, HarnessError> {
        let pool_size = self.stages.iter().map(|s| s.target).max().unwrap_or(0);
        let (ctx, start_tx, shutdown_tx) = RunContext::new();

        tracing::info!(users = pool_size, stages = self.stages.len(), "spawning level governor");
        let governor = tokio::spawn(level_governor_task(
            ctx.clone(),
            self.stages.clone(),
            self.tick,
        ));

        tracing::info!("spawning simulated users");
        let handles = spawn_users(ctx, pool_size, self.tick, scenario.action.clone());

        start_tx
            .send(true)
            .map_err(|e| HarnessError::Executor(e.to_string()))?;
        // the governor finishing its last stage means the schedule is spent
        governor
            .await
            .map_err(|e| HarnessError::Executor(e.to_string()))?;
        let _ = shutdown_tx.send(true);

        tracing::info!("draining simulated users");
        let mut merged = A::new();
        for joined in join_all(handles).await {
            let agg = joined.map_err(|e| HarnessError::Executor(e.to_string()))?;
            merged.merge(agg);
        }

        tracing::info!(scenario = %scenario.name, "schedule complete");
        Ok(merged)
    }
}

mod internals {
    use super::*;

    /// Shared coordination state for one run: a start gate, a shutdown flag,
    /// and the governor's current concurrency level.
    #[derive(Clone)]
    pub struct RunContext {
        pub start: Receiver<bool>,
        pub shutdown: Receiver<bool>,
        pub level: Arc<AtomicU64>,
    }

    impl RunContext {
        pub fn new() -> (Self, Sender<bool>, Sender<bool>) {
            let (start_tx, start_rx) = watch::channel(false);
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            (
                Self {
                    start: start_rx,
                    shutdown: shutdown_rx,
                    level: Arc::new(AtomicU64::new(0)),
                },
                start_tx,
                shutdown_tx,
            )
        }
    }

    /// Governor task: walks the stage schedule, re-publishing the allowed
    /// concurrency level every tick.
    pub async fn level_governor_task(mut ctx: RunContext, stages: Vec<Stage>, tick: Duration) {
        let mut shutdown = ctx.shutdown.clone();
        let schedule = async {
            if ctx.start.wait_for(|started| *started).await.is_err() {
                return;
            }
            let mut level = 0u64;
            for stage in stages {
                // zero-duration stages jump straight to the target
                if stage.duration.is_zero() {
                    level = stage.target;
                    ctx.level.store(level, Ordering::Relaxed);
                    continue;
                }

                let stage_start = Instant::now();
                let mut next_tick = Instant::now();
                let from = level;
                loop {
                    let elapsed = Instant::now().duration_since(stage_start);
                    next_tick += tick;
                    if elapsed >= stage.duration {
                        break;
                    }
                    let current = current_level(elapsed, stage.duration, from, stage.target);
                    ctx.level.store(current, Ordering::Relaxed);
                    tokio::time::sleep_until(next_tick).await;
                }
                // land exactly on the target so the next stage interpolates
                // from the right starting point
                level = stage.target;
                ctx.level.store(level, Ordering::Relaxed);
            }
        };

        tokio::select! {
            _ = schedule => {}
            _ = shutdown.wait_for(|stop| *stop) => {}
        };
    }

    /// Linear interpolation between the previous stage's level and the
    /// current target, clamped to the stage's end.
    pub fn current_level(
        elapsed: Duration,
        stage_duration: Duration,
        from: u64,
        to: u64,
    ) -> u64 {
        let t = (elapsed.as_secs_f64() / stage_duration.as_secs_f64()).min(1.0);
        (from as f64 + (to as f64 - from as f64) * t).round() as u64
    }

    /// Spawn one Tokio task per user slot. A slot runs iterations while its
    /// index is below the current level, otherwise it parks for a tick.
    pub fn spawn_users<A, F, Fut>(
        ctx: RunContext,
        pool_size: u64,
        tick: Duration,
        action: F,
    ) -> Vec<JoinHandle<A>>
    where
        A: Aggregate + 'static,
        F: Fn() -> Fut + Send + Sync + Clone + 'static,
        Fut: Future<Output = A::Metric> + Send,
    {
        (0..pool_size)
            .map(|slot| {
                let mut ctx = ctx.clone();
                let action = action.clone();
                tokio::spawn(async move {
                    let mut agg = A::new();
                    if ctx.start.wait_for(|started| *started).await.is_err() {
                        return agg;
                    }
                    loop {
                        if *ctx.shutdown.borrow() {
                            break;
                        }
                        if slot < ctx.level.load(Ordering::Relaxed) {
                            let metric = action().await;
                            agg.consume(&metric);
                            // keep the scheduler fair even when the action
                            // completes without reaching an await point
                            tokio::task::yield_now().await;
                        } else {
                            tokio::time::sleep(tick).await;
                        }
                    }
                    agg
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Metric;
    use crate::macros::{aggregate, metric};

    #[metric]
    struct UnitMetric;

    #[aggregate]
    #[derive(Default)]
    struct CountingAggregate {
        iterations: u64,
    }

    impl Aggregate for CountingAggregate {
        type Metric = UnitMetric;

        fn new() -> Self {
            Self::default()
        }

        fn consume(&mut self, _: &Self::Metric) {
            self.iterations += 1;
        }

        fn merge(&mut self, other: Self) {
            self.iterations += other.iterations;
        }
    }

    #[test]
    fn level_interpolates_linearly() {
        let stage = Duration::from_secs(60);
        assert_eq!(current_level(Duration::ZERO, stage, 0, 20), 0);
        assert_eq!(current_level(Duration::from_secs(30), stage, 0, 20), 10);
        assert_eq!(current_level(Duration::from_secs(60), stage, 0, 20), 20);
        // ramp down interpolates the same way
        assert_eq!(current_level(Duration::from_secs(30), stage, 100, 0), 50);
        // past the stage end the level is clamped at the target
        assert_eq!(current_level(Duration::from_secs(90), stage, 0, 20), 20);
    }

    #[test]
    fn plateau_stage_holds_level() {
        let stage = Duration::from_secs(300);
        for secs in [0, 100, 299] {
            assert_eq!(current_level(Duration::from_secs(secs), stage, 50, 50), 50);
        }
    }

    #[tokio::test]
    async fn spawns_one_task_per_user_slot() {
        let (ctx, _start, _stop) = RunContext::new();
        let action = || async { UnitMetric {} };
        let users: Vec<JoinHandle<CountingAggregate>> =
            spawn_users(ctx, 10, Duration::from_millis(10), action);
        assert_eq!(users.len(), 10);
    }

    #[tokio::test]
    async fn executor_runs_iterations_and_merges() {
        let action = || async { UnitMetric {} };
        let executor = StageExecutor::builder()
            .stages(vec![
                Stage::new(Duration::ZERO, 4),
                Stage::new(Duration::from_millis(200), 4),
            ])
            .tick(Duration::from_millis(20))
            .build();
        let mut scenario = Scenario::<CountingAggregate, _, _, _>::builder()
            .name("counting")
            .action(action)
            .executor(executor)
            .build();

        let agg = scenario.run().await.unwrap();
        assert!(agg.iterations > 0);
    }
}
