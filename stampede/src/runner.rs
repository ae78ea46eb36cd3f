//! The run lifecycle driver: `Pending → Ramping → Steady → RampingDown →
//! Evaluating → {Passed, Failed}`, with transitions following stage
//! progression and, at the end, the threshold verdict.

use crate::dispatcher::{WeightTable, WorkerContext};
use crate::evaluator::{evaluate, OutcomeRecorder, RunStats};
use crate::ramp::RampSchedule;
use crate::scheduler::WorkerPool;
use crate::transport::Transport;
use stampede_core::{ConfigError, RunConfig, RunPhase, RunReport, Verdict, TICK_INTERVAL};
use std::sync::Arc;
use tokio::sync::watch;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{info, instrument, trace, warn};

/// Drives one full scenario run. Setup problems (invalid config, unknown
/// operations) surface here, before any worker starts; everything that
/// happens after [`Runner::run`] begins is data in the report, never an
/// error.
pub struct Runner<T: Transport> {
    config: RunConfig,
    transport: Arc<T>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl<T: Transport> Runner<T> {
    pub fn new(config: RunConfig, transport: T) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            transport: Arc::new(transport),
            shutdown: None,
        })
    }

    /// Attach an operator-abort signal: sending `true` moves the run to
    /// graceful rampdown immediately. Dropping the sender counts as an
    /// abort.
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    #[instrument(name = "run", skip_all, fields(scenario = %self.config.name))]
    pub async fn run(self) -> RunReport {
        info!(
            endpoint = %self.config.endpoint,
            "running scenario {}", self.config.name
        );

        let schedule = RampSchedule::new(&self.config.stages);
        let seed = self.config.seed.unwrap_or_else(rand::random);
        let weights: Vec<f64> = self.config.operations.iter().map(|op| op.weight).collect();
        let op_names: Vec<String> = self
            .config
            .operations
            .iter()
            .map(|op| op.name.clone())
            .collect();

        let recorder = OutcomeRecorder::new(self.config.operations.len());
        let mut stats = RunStats::new(op_names);
        let ctx = WorkerContext {
            transport: self.transport.clone(),
            table: Arc::new(WeightTable::new(&weights)),
            recorder: recorder.clone(),
            pacing: self.config.pacing,
            seed,
        };
        let mut pool = WorkerPool::new(ctx, self.config.graceful_rampdown);

        let started = Instant::now();
        let mut phase = RunPhase::Pending;
        let mut shutdown = self.shutdown;
        let mut cancelled = false;

        let mut ticker = interval(TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        // NOTE: This loop is time-sensitive; nothing in it may block or
        // await beyond the tick itself.
        loop {
            match &mut shutdown {
                Some(rx) => {
                    tokio::select! {
                        _ = ticker.tick() => {}
                        res = rx.changed() => {
                            if res.is_err() || *rx.borrow_and_update() {
                                info!("run cancelled by operator");
                                cancelled = true;
                            }
                        }
                    }
                }
                None => {
                    ticker.tick().await;
                }
            }

            let elapsed = started.elapsed();
            if let Some(deadline) = self.config.deadline {
                if elapsed >= deadline {
                    warn!("run deadline reached before the schedule completed");
                    cancelled = true;
                }
            }
            if cancelled || elapsed >= schedule.total() {
                break;
            }

            let target = schedule.target_at(elapsed);
            pool.set_target(target as usize);
            pool.reap();
            stats.drain(&recorder);

            let next = schedule.phase_at(elapsed);
            if next != phase {
                info!(phase = %next, "run phase changed");
                phase = next;
            }
            trace!(
                goal = target,
                live = pool.live(),
                requests = stats.requests(),
                "tick"
            );
        }

        if phase != RunPhase::RampingDown {
            phase = RunPhase::RampingDown;
            info!(phase = %phase, "run phase changed");
        }
        let peak_concurrency = pool.peak();
        pool.shutdown().await;
        stats.drain(&recorder);

        phase = RunPhase::Evaluating;
        info!(phase = %phase, "run phase changed");
        let (verdict, thresholds) = evaluate(&stats, &self.config.thresholds);
        for report in thresholds.iter().filter(|r| !r.passed) {
            warn!(
                metric = %report.metric,
                check = %report.check,
                observed = %report.observed,
                "threshold failed"
            );
        }

        phase = match verdict {
            Verdict::Passed => RunPhase::Passed,
            Verdict::Failed => RunPhase::Failed,
        };
        info!(phase = %phase, requests = stats.requests(), "run complete");

        RunReport {
            verdict,
            elapsed: started.elapsed(),
            requests: stats.requests(),
            success: stats.success(),
            error: stats.error(),
            connect_failures: stats.connect_failures(),
            peak_concurrency,
            operations: stats.op_stats(),
            latency_p50: stats.latency_quantile(0.50),
            latency_p90: stats.latency_quantile(0.90),
            latency_p95: stats.latency_quantile(0.95),
            latency_p99: stats.latency_quantile(0.99),
            thresholds,
        }
    }
}
