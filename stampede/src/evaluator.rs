//! Outcome aggregation and threshold evaluation.
//!
//! Workers record outcomes through [`OutcomeRecorder`], which is nothing
//! but atomic counter increments and a lock-free bucket push — no lock is
//! ever held across a network call. The run loop periodically drains the
//! recorder into [`RunStats`], whose latency t-digest backs the quantile
//! thresholds at evaluation time.

use metrics_util::AtomicBucket;
use pdatastructs::tdigest::{TDigest, K1};
use stampede_core::{
    Observed, OpRef, OpStats, RequestOutcome, Threshold, ThresholdExpr, ThresholdReport, Verdict,
};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

const TDIGEST_BACKLOG_SIZE: usize = 100;

/// Lock-free outcome sink shared by all worker tasks.
#[derive(Clone)]
pub struct OutcomeRecorder {
    ops: Arc<Vec<OpAtomics>>,
    connect_failures: Arc<AtomicU64>,
    latency: Arc<AtomicBucket<Duration>>,
}

#[derive(Default)]
struct OpAtomics {
    success: AtomicU64,
    error: AtomicU64,
}

impl OutcomeRecorder {
    pub fn new(num_ops: usize) -> Self {
        Self {
            ops: Arc::new((0..num_ops).map(|_| OpAtomics::default()).collect()),
            connect_failures: Arc::new(AtomicU64::new(0)),
            latency: Arc::new(AtomicBucket::new()),
        }
    }

    pub fn record(&self, outcome: &RequestOutcome) {
        match outcome.operation {
            OpRef::Op(idx) => {
                let op = &self.ops[idx];
                if outcome.success {
                    op.success.fetch_add(1, Ordering::Relaxed);
                } else {
                    op.error.fetch_add(1, Ordering::Relaxed);
                }
                self.latency.push(outcome.latency);
            }
            OpRef::Connect => {
                self.connect_failures.fetch_add(1, Ordering::Relaxed);
            }
        }

        #[cfg(feature = "metrics")]
        {
            metrics::histogram!("stampede.request_duration")
                .record(outcome.latency.as_nanos() as f64);
            if outcome.success {
                metrics::counter!("stampede.success").increment(1);
            } else {
                metrics::counter!("stampede.error").increment(1);
            }
        }
    }
}

/// Streaming statistics for one run. Draining is destructive on the
/// recorder side, so each outcome is counted exactly once.
pub struct RunStats {
    op_names: Vec<String>,
    ops: Vec<OpCounts>,
    connect_failures: u64,
    latency: TDigest<K1>,
    latency_samples: u64,
}

#[derive(Clone, Copy, Default)]
struct OpCounts {
    success: u64,
    error: u64,
}

impl RunStats {
    pub fn new(op_names: Vec<String>) -> Self {
        let ops = vec![OpCounts::default(); op_names.len()];
        Self {
            op_names,
            ops,
            connect_failures: 0,
            latency: default_tdigest(),
            latency_samples: 0,
        }
    }

    /// Fold everything recorded since the last drain into the stats.
    pub fn drain(&mut self, recorder: &OutcomeRecorder) {
        for (counts, atomics) in self.ops.iter_mut().zip(recorder.ops.iter()) {
            counts.success += atomics.success.swap(0, Ordering::Relaxed);
            counts.error += atomics.error.swap(0, Ordering::Relaxed);
        }
        self.connect_failures += recorder.connect_failures.swap(0, Ordering::Relaxed);
        recorder.latency.clear_with(|latencies| {
            for latency in latencies {
                self.latency.insert(latency.as_secs_f64());
            }
            self.latency_samples += latencies.len() as u64;
        });
    }

    pub fn requests(&self) -> u64 {
        self.ops.iter().map(|c| c.success + c.error).sum()
    }

    pub fn success(&self) -> u64 {
        self.ops.iter().map(|c| c.success).sum()
    }

    pub fn error(&self) -> u64 {
        self.ops.iter().map(|c| c.error).sum()
    }

    pub fn connect_failures(&self) -> u64 {
        self.connect_failures
    }

    /// Fraction of checks that passed. Connection failures are recorded
    /// outcomes and count against the rate. `None` when nothing was
    /// recorded at all.
    pub fn success_rate(&self) -> Option<f64> {
        let total = self.requests() + self.connect_failures;
        if total == 0 {
            None
        } else {
            Some(self.success() as f64 / total as f64)
        }
    }

    pub fn latency_quantile(&self, quantile: f64) -> Duration {
        if self.latency_samples == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.latency.quantile(quantile))
    }

    pub fn op_stats(&self) -> Vec<OpStats> {
        self.op_names
            .iter()
            .zip(self.ops.iter())
            .map(|(name, counts)| OpStats {
                name: name.clone(),
                success: counts.success,
                error: counts.error,
            })
            .collect()
    }
}

fn default_tdigest() -> TDigest<K1> {
    TDigest::new(K1::new(10.), TDIGEST_BACKLOG_SIZE)
}

/// Judge every declared threshold against an immutable stats snapshot.
/// The run verdict is the conjunction of the individual evaluations; a
/// metric with no recorded data passes by vacuity rather than dividing by
/// zero.
pub fn evaluate(stats: &RunStats, thresholds: &[Threshold]) -> (Verdict, Vec<ThresholdReport>) {
    let reports: Vec<_> = thresholds
        .iter()
        .map(|threshold| {
            let (observed, passed) = match &threshold.check {
                ThresholdExpr::Quantile {
                    quantile,
                    cmp,
                    bound,
                } => {
                    if stats.latency_samples == 0 {
                        (Observed::Vacuous, true)
                    } else {
                        let observed = stats.latency_quantile(*quantile);
                        (
                            Observed::Latency(observed),
                            cmp.holds(observed.as_secs_f64(), bound.as_secs_f64()),
                        )
                    }
                }
                ThresholdExpr::Rate { cmp, bound } => match stats.success_rate() {
                    None => (Observed::Vacuous, true),
                    Some(rate) => (Observed::Rate(rate), cmp.holds(rate, *bound)),
                },
            };
            ThresholdReport {
                metric: threshold.metric.clone(),
                check: threshold.check.to_string(),
                observed,
                passed,
            }
        })
        .collect();

    let verdict = if reports.iter().all(|r| r.passed) {
        Verdict::Passed
    } else {
        Verdict::Failed
    };
    (verdict, reports)
}
