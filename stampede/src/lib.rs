//! Scenario-execution core for staged gRPC load tests.
//!
//! A run is three cooperating pieces: the [`ramp`] schedule turns a list of
//! `(duration, target)` stages into a time-varying virtual-user count, the
//! [`dispatcher`] issues weighted-random operations from each live worker,
//! and the [`evaluator`] folds every request outcome into streaming
//! statistics that the declared thresholds are judged against at run end.
//!
//! ```no_run
//! use stampede::grpc::GrpcTransport;
//! use stampede::runner::Runner;
//! use stampede_core::RunConfig;
//!
//! # async fn example(config: RunConfig) -> Result<(), Box<dyn std::error::Error>> {
//! let transport = GrpcTransport::new(&config)?;
//! let report = Runner::new(config, transport)?.run().await;
//! println!("{report}");
//! # Ok(())
//! # }
//! ```

pub mod dispatcher;
pub mod evaluator;
pub mod grpc;
pub mod ramp;
pub mod runner;
pub mod transport;

pub(crate) mod scheduler;

pub use runner::Runner;
pub use transport::{PayloadSeed, Transport, TransportError};

pub mod prelude {
    pub use crate::grpc::GrpcTransport;
    pub use crate::runner::Runner;
    pub use crate::transport::{PayloadSeed, Transport, TransportError};
    pub use stampede_core::{RunConfig, RunReport, Verdict};
}
