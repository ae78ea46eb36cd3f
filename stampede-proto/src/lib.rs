//! Hand-rolled message types for `products.v1.ProductService`, the service
//! the canonical scenario drives. Field numbers match the service's
//! `products.proto`; keeping the types in-tree avoids a protoc build-time
//! dependency for what is a fixed, two-method surface.

/// gRPC method path for the write operation.
pub const CREATE_PRODUCT_PATH: &str = "/products.v1.ProductService/CreateProduct";
/// gRPC method path for the read operation.
pub const LIST_PRODUCTS_PATH: &str = "/products.v1.ProductService/ListProducts";

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Product {
    #[prost(int64, tag = "1")]
    pub id: i64,
    #[prost(string, tag = "2")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "3")]
    pub description: ::prost::alloc::string::String,
    #[prost(double, tag = "4")]
    pub price: f64,
    #[prost(int32, tag = "5")]
    pub stock: i32,
    #[prost(int64, tag = "6")]
    pub category_id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateProductRequest {
    #[prost(string, tag = "1")]
    pub name: ::prost::alloc::string::String,
    #[prost(string, tag = "2")]
    pub description: ::prost::alloc::string::String,
    #[prost(double, tag = "3")]
    pub price: f64,
    #[prost(int32, tag = "4")]
    pub stock: i32,
    #[prost(int64, tag = "5")]
    pub category_id: i64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct CreateProductResponse {
    #[prost(message, optional, tag = "1")]
    pub product: ::core::option::Option<Product>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListProductsRequest {
    #[prost(int32, tag = "1")]
    pub page_size: i32,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListProductsResponse {
    #[prost(message, repeated, tag = "1")]
    pub products: ::prost::alloc::vec::Vec<Product>,
}
