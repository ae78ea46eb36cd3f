//! gRPC transport over tonic for `products.v1.ProductService`.
//!
//! The client is a thin hand-rolled unary wrapper over
//! [`tonic::client::Grpc`]; the operation registry resolves the scenario's
//! operation names against the compiled-in schema at setup time, so an
//! unknown name is a fatal setup error rather than a run failure.

use crate::transport::{PayloadSeed, Transport, TransportError};
use async_trait::async_trait;
use http::uri::PathAndQuery;
use stampede_core::{ConfigError, OperationWeight, RunConfig, SecurityMode};
use stampede_proto as proto;
use tonic::client::Grpc;
use tonic::codec::ProstCodec;
use tonic::transport::{Channel, ClientTlsConfig, Endpoint};
use tonic::{Code, Request, Status};

/// Operations the dispatcher can issue against the product service.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProductOp {
    CreateProduct,
    ListProducts,
}

impl ProductOp {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "CreateProduct" => Some(ProductOp::CreateProduct),
            "ListProducts" => Some(ProductOp::ListProducts),
            _ => None,
        }
    }
}

/// Resolve the scenario's weight-table names against the service schema.
/// The returned registry shares the weight table's declaration order, so a
/// dispatch index is valid in both.
pub fn resolve_operations(operations: &[OperationWeight]) -> Result<Vec<ProductOp>, ConfigError> {
    operations
        .iter()
        .map(|op| {
            ProductOp::from_name(&op.name)
                .ok_or_else(|| ConfigError::UnknownOperation(op.name.clone()))
        })
        .collect()
}

pub struct GrpcTransport {
    endpoint: Endpoint,
    ops: Vec<ProductOp>,
}

impl GrpcTransport {
    pub fn new(config: &RunConfig) -> Result<Self, ConfigError> {
        let ops = resolve_operations(&config.operations)?;

        let scheme = match config.security {
            SecurityMode::Plaintext => "http",
            SecurityMode::Tls => "https",
        };
        let uri = format!("{scheme}://{}", config.endpoint);
        let mut endpoint = Endpoint::from_shared(uri)
            .map_err(|e| ConfigError::InvalidEndpoint(e.to_string()))?
            .timeout(config.request_timeout)
            .connect_timeout(config.request_timeout);
        if config.security == SecurityMode::Tls {
            endpoint = endpoint
                .tls_config(ClientTlsConfig::new())
                .map_err(|e| ConfigError::InvalidEndpoint(e.to_string()))?;
        }

        Ok(Self { endpoint, ops })
    }
}

#[async_trait]
impl Transport for GrpcTransport {
    type Conn = Grpc<Channel>;

    async fn connect(&self) -> Result<Self::Conn, TransportError> {
        let channel = self
            .endpoint
            .connect()
            .await
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Ok(Grpc::new(channel))
    }

    async fn invoke(
        &self,
        conn: &mut Self::Conn,
        op: usize,
        seed: PayloadSeed,
    ) -> Result<(), TransportError> {
        conn.ready()
            .await
            .map_err(|e| TransportError::NotReady(e.to_string()))?;

        // Index validity is established at setup by `resolve_operations`.
        match self.ops[op] {
            ProductOp::CreateProduct => {
                let path = PathAndQuery::from_static(proto::CREATE_PRODUCT_PATH);
                conn.unary::<_, proto::CreateProductResponse, _>(
                    Request::new(create_product_payload(seed)),
                    path,
                    ProstCodec::default(),
                )
                .await
                .map_err(status_error)?;
            }
            ProductOp::ListProducts => {
                let path = PathAndQuery::from_static(proto::LIST_PRODUCTS_PATH);
                conn.unary::<_, proto::ListProductsResponse, _>(
                    Request::new(proto::ListProductsRequest::default()),
                    path,
                    ProstCodec::default(),
                )
                .await
                .map_err(status_error)?;
            }
        }
        Ok(())
    }
}

fn status_error(status: Status) -> TransportError {
    match status.code() {
        Code::DeadlineExceeded => TransportError::Timeout,
        _ => TransportError::Status(status.to_string()),
    }
}

fn create_product_payload(seed: PayloadSeed) -> proto::CreateProductRequest {
    proto::CreateProductRequest {
        name: format!("Product-{}-{}", seed.worker, seed.seq),
        description: "Load test product".to_string(),
        price: 9.99,
        stock: 1,
        category_id: 1,
    }
}
