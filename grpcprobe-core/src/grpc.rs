//! # Generic gRPC transport
//!
//! A unary client over any tonic service, exchanging `DynamicMessage` values through a
//! descriptor-driven codec.
pub mod client;
pub mod codec;
