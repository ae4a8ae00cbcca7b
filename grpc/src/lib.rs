//! Modelyard gRPC Module
//!
//! The RPC mirror of the REST surface. The wire types are generated from
//! `proto/modelyard.proto` at build time.

/// Generated protobuf and service types
pub mod proto {
    tonic::include_proto!("modelyard");
}

pub mod server;

pub use server::ModelyardService;
