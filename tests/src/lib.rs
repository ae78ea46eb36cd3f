//! Shared fixtures for the workspace integration tests: mock transports
//! and scenario builders. The actual engine lives in the `stampede`
//! workspace members.

use async_trait::async_trait;
use rand_distr::{Distribution, SkewNormal};
use stampede::{PayloadSeed, Transport, TransportError};
use stampede_core::{OperationWeight, RunConfig, SecurityMode, Stage, Threshold};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Duration;

pub fn init() {
    static ONCE: OnceLock<()> = OnceLock::new();
    ONCE.get_or_init(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("stampede=debug")
            .try_init();
    });
}

/// In-process service double: fixed latency, optional deterministic
/// failures.
pub struct MockService {
    latency: Duration,
    /// Every `fail_every`-th request is rejected; 0 disables failures.
    fail_every: u64,
    invocations: AtomicU64,
}

impl MockService {
    pub fn with_latency(latency: Duration) -> Self {
        Self {
            latency,
            fail_every: 0,
            invocations: AtomicU64::new(0),
        }
    }

    pub fn failing_every(latency: Duration, fail_every: u64) -> Self {
        Self {
            latency,
            fail_every,
            invocations: AtomicU64::new(0),
        }
    }
}

#[async_trait]
impl Transport for MockService {
    type Conn = ();

    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn invoke(
        &self,
        _conn: &mut (),
        _op: usize,
        _seed: PayloadSeed,
    ) -> Result<(), TransportError> {
        tokio::time::sleep(self.latency).await;
        let n = self.invocations.fetch_add(1, Ordering::Relaxed) + 1;
        if self.fail_every > 0 && n % self.fail_every == 0 {
            Err(TransportError::Status("internal".to_string()))
        } else {
            Ok(())
        }
    }
}

/// Transport whose first `failures` connection attempts are refused.
pub struct FlakyConnect {
    latency: Duration,
    remaining_failures: AtomicU64,
}

impl FlakyConnect {
    pub fn new(latency: Duration, failures: u64) -> Self {
        Self {
            latency,
            remaining_failures: AtomicU64::new(failures),
        }
    }
}

#[async_trait]
impl Transport for FlakyConnect {
    type Conn = ();

    async fn connect(&self) -> Result<(), TransportError> {
        let remaining = self
            .remaining_failures
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| {
                n.checked_sub(1)
            });
        match remaining {
            Ok(_) => Err(TransportError::Connect("refused".to_string())),
            Err(_) => Ok(()),
        }
    }

    async fn invoke(
        &self,
        _conn: &mut (),
        _op: usize,
        _seed: PayloadSeed,
    ) -> Result<(), TransportError> {
        tokio::time::sleep(self.latency).await;
        Ok(())
    }
}

/// Latency drawn from a skew-normal distribution, closer to a real
/// service under load than a fixed sleep.
pub struct NoisyService {
    mean: Duration,
    std: Duration,
}

impl NoisyService {
    pub fn new(mean: Duration, std: Duration) -> Self {
        Self { mean, std }
    }
}

#[async_trait]
impl Transport for NoisyService {
    type Conn = ();

    async fn connect(&self) -> Result<(), TransportError> {
        Ok(())
    }

    async fn invoke(
        &self,
        _conn: &mut (),
        _op: usize,
        _seed: PayloadSeed,
    ) -> Result<(), TransportError> {
        let normal = SkewNormal::new(self.mean.as_secs_f64(), self.std.as_secs_f64(), 20.)
            .expect("valid skew-normal parameters");
        let v: f64 = normal.sample(&mut rand::thread_rng()).max(0.);
        tokio::time::sleep(Duration::from_secs_f64(v)).await;
        Ok(())
    }
}

/// Transport that never manages to connect.
pub struct Unreachable;

#[async_trait]
impl Transport for Unreachable {
    type Conn = ();

    async fn connect(&self) -> Result<(), TransportError> {
        Err(TransportError::Connect("no route to host".to_string()))
    }

    async fn invoke(
        &self,
        _conn: &mut (),
        _op: usize,
        _seed: PayloadSeed,
    ) -> Result<(), TransportError> {
        unreachable!("connect never succeeds")
    }
}

pub fn stage(duration: Duration, target: u32) -> Stage {
    Stage { duration, target }
}

pub fn threshold(metric: &str, check: &str) -> Threshold {
    Threshold {
        metric: metric.to_string(),
        check: check.parse().unwrap(),
    }
}

/// A 70/30 CreateProduct/ListProducts scenario with tight pacing, suitable
/// for paused-clock runs.
pub fn scenario(stages: Vec<Stage>, thresholds: Vec<Threshold>) -> RunConfig {
    RunConfig {
        name: "integration".to_string(),
        endpoint: "127.0.0.1:50051".to_string(),
        security: SecurityMode::Plaintext,
        stages,
        graceful_rampdown: Duration::from_secs(1),
        pacing: Duration::from_millis(50),
        request_timeout: Duration::from_secs(1),
        deadline: None,
        seed: Some(11),
        operations: vec![
            OperationWeight {
                name: "CreateProduct".to_string(),
                weight: 0.7,
            },
            OperationWeight {
                name: "ListProducts".to_string(),
                weight: 0.3,
            },
        ],
        thresholds,
    }
}
