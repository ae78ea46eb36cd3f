//! The seam between the engine and whatever carries requests. The engine
//! only ever connects and invokes; each worker exclusively owns one
//! connection for its whole lifetime.

use async_trait::async_trait;
use thiserror::Error;

/// Inputs for deterministic payload construction. Payloads are a pure
/// function of the worker id and a per-worker sequence number, which keeps
/// generated identifiers distinct without any cross-worker coordination.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PayloadSeed {
    pub worker: u64,
    pub seq: u64,
}

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),
    #[error("service not ready: {0}")]
    NotReady(String),
    #[error("request rejected: {0}")]
    Status(String),
    #[error("request timed out")]
    Timeout,
}

#[async_trait]
pub trait Transport: Send + Sync + 'static {
    type Conn: Send + 'static;

    async fn connect(&self) -> Result<Self::Conn, TransportError>;

    /// Issue the operation at index `op` of the scenario's operation
    /// table. `Ok` means a response with the expected status was received;
    /// everything else, transport errors and timeouts included, is a
    /// failed outcome.
    async fn invoke(
        &self,
        conn: &mut Self::Conn,
        op: usize,
        seed: PayloadSeed,
    ) -> Result<(), TransportError>;
}
