//! Per-worker dispatch loop: weighted operation choice, request issue,
//! outcome recording, fixed pacing.

use crate::evaluator::OutcomeRecorder;
use crate::transport::{PayloadSeed, Transport, TransportError};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use stampede_core::{OpRef, RequestOutcome, CONNECT_BACKOFF, CONNECT_RETRY_LIMIT};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, trace, warn};

/// Cumulative-boundary weighted choice over the scenario's operations.
/// Weights are normalized at construction; `pick` is a pure function of
/// the draw, so dispatch is reproducible under a fixed rng seed.
#[derive(Debug, Clone)]
pub struct WeightTable {
    boundaries: Vec<f64>,
}

impl WeightTable {
    /// Weights must be positive and finite; config validation enforces
    /// this before a table is built.
    pub fn new(weights: &[f64]) -> Self {
        let total: f64 = weights.iter().sum();
        let mut acc = 0.;
        let boundaries = weights
            .iter()
            .map(|w| {
                acc += w / total;
                acc
            })
            .collect();
        Self { boundaries }
    }

    /// The first boundary at or above the draw wins, which breaks exact
    /// ties towards the earlier-declared operation.
    pub fn pick(&self, draw: f64) -> usize {
        self.boundaries
            .iter()
            .position(|b| *b >= draw)
            .unwrap_or(self.boundaries.len() - 1)
    }
}

/// Everything a worker task needs, cheap to clone per spawn.
pub(crate) struct WorkerContext<T: Transport> {
    pub transport: Arc<T>,
    pub table: Arc<WeightTable>,
    pub recorder: OutcomeRecorder,
    pub pacing: Duration,
    pub seed: u64,
}

impl<T: Transport> Clone for WorkerContext<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            table: self.table.clone(),
            recorder: self.recorder.clone(),
            pacing: self.pacing,
            seed: self.seed,
        }
    }
}

/// Body of one virtual user. Runs until the retire flag flips; a retiring
/// worker finishes its in-flight request but takes no new ones.
pub(crate) async fn run_worker<T: Transport>(
    ctx: WorkerContext<T>,
    id: u64,
    mut retire: watch::Receiver<bool>,
) {
    let Some(mut conn) = connect_with_retry(&ctx, id, &mut retire).await else {
        return;
    };

    let mut rng = SmallRng::seed_from_u64(ctx.seed.wrapping_add(id));
    let mut seq = 0u64;
    loop {
        if *retire.borrow() {
            break;
        }

        let op = ctx.table.pick(rng.gen::<f64>());
        let seed = PayloadSeed { worker: id, seq };
        seq += 1;

        let start = Instant::now();
        let res = ctx.transport.invoke(&mut conn, op, seed).await;
        if let Err(err) = &res {
            debug!(worker = id, op, "request failed: {err}");
        }
        ctx.recorder.record(&RequestOutcome {
            operation: OpRef::Op(op),
            latency: start.elapsed(),
            success: res.is_ok(),
        });

        tokio::select! {
            _ = tokio::time::sleep(ctx.pacing) => {}
            _ = retire.changed() => break,
        }
    }
    trace!(worker = id, "retired");
}

/// Bounded-retry connection establishment. Every failed attempt is a
/// recorded outcome; exhausting the retries removes this worker from the
/// run without affecting anyone else.
async fn connect_with_retry<T: Transport>(
    ctx: &WorkerContext<T>,
    id: u64,
    retire: &mut watch::Receiver<bool>,
) -> Option<T::Conn> {
    let mut backoff = CONNECT_BACKOFF;
    for attempt in 0..CONNECT_RETRY_LIMIT {
        if *retire.borrow() {
            return None;
        }

        let start = Instant::now();
        let err: TransportError = match ctx.transport.connect().await {
            Ok(conn) => return Some(conn),
            Err(err) => err,
        };
        warn!(worker = id, attempt, "connection failed: {err}");
        ctx.recorder.record(&RequestOutcome {
            operation: OpRef::Connect,
            latency: start.elapsed(),
            success: false,
        });

        tokio::select! {
            _ = tokio::time::sleep(backoff) => {}
            _ = retire.changed() => return None,
        }
        backoff *= 2;
    }
    warn!(
        worker = id,
        "connection retries exhausted; continuing without this worker"
    );
    None
}
