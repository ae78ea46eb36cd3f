//! Worker pool management for the ramp scheduler: spawning towards the
//! interpolated target, graceful retirement past it, hard aborts past the
//! rampdown deadline.

use crate::dispatcher::{run_worker, WorkerContext};
use crate::transport::Transport;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{trace, warn};

pub(crate) struct WorkerPool<T: Transport> {
    ctx: WorkerContext<T>,
    graceful: Duration,
    workers: Vec<WorkerHandle>,
    retiring: Vec<Retiring>,
    next_id: u64,
    peak: usize,
}

struct WorkerHandle {
    id: u64,
    retire: watch::Sender<bool>,
    handle: JoinHandle<()>,
}

struct Retiring {
    id: u64,
    deadline: Instant,
    handle: JoinHandle<()>,
}

impl<T: Transport> WorkerPool<T> {
    pub fn new(ctx: WorkerContext<T>, graceful: Duration) -> Self {
        Self {
            ctx,
            graceful,
            workers: Vec::new(),
            retiring: Vec::new(),
            next_id: 0,
            peak: 0,
        }
    }

    /// Worker slots currently counted against the target. A worker whose
    /// connection retries were exhausted keeps its slot so the scheduler
    /// does not respawn it.
    pub fn live(&self) -> usize {
        self.workers.len()
    }

    pub fn peak(&self) -> usize {
        self.peak
    }

    /// Reconcile the pool against the interpolated target: spawn with
    /// fresh increasing ids when below, mark the excess for graceful
    /// retirement when above.
    pub fn set_target(&mut self, target: usize) {
        while self.workers.len() < target {
            self.spawn();
        }
        if self.workers.len() > target {
            let deadline = Instant::now() + self.graceful;
            for worker in self.workers.drain(target..) {
                let _ = worker.retire.send(true);
                trace!(worker = worker.id, "marked for retirement");
                self.retiring.push(Retiring {
                    id: worker.id,
                    deadline,
                    handle: worker.handle,
                });
            }
        }
        self.peak = self.peak.max(self.workers.len());
    }

    fn spawn(&mut self) {
        let id = self.next_id;
        self.next_id += 1;
        let (retire, retire_rx) = watch::channel(false);
        let handle = tokio::spawn(run_worker(self.ctx.clone(), id, retire_rx));
        trace!(worker = id, "spawned");
        self.workers.push(WorkerHandle { id, retire, handle });
    }

    /// Drop finished retirees and hard-stop any that outlived the
    /// graceful-rampdown deadline.
    pub fn reap(&mut self) {
        let now = Instant::now();
        self.retiring.retain(|r| {
            if r.handle.is_finished() {
                return false;
            }
            if now >= r.deadline {
                warn!(worker = r.id, "graceful retirement deadline exceeded; aborting");
                r.handle.abort();
                return false;
            }
            true
        });
    }

    /// Retire everything and wait out the graceful window; stragglers are
    /// aborted at the deadline.
    pub async fn shutdown(mut self) {
        self.set_target(0);
        for mut retiree in self.retiring.drain(..) {
            if tokio::time::timeout_at(retiree.deadline, &mut retiree.handle)
                .await
                .is_err()
            {
                warn!(
                    worker = retiree.id,
                    "graceful retirement deadline exceeded; aborting"
                );
                retiree.handle.abort();
            }
        }
    }
}
