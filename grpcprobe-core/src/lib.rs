//! # grpcprobe Core
//!
//! `grpcprobe-core` is the library behind the `grpcprobe` CLI. It talks to any gRPC server
//! that exposes the Server Reflection Protocol without compile-time knowledge of its
//! Protobuf schema, and lets callers fill requests from plain `path=value` strings.
//!
//! ## Key Components
//!
//! * **[`codec`]:** The scalar codec (text <-> typed protobuf value) and the [`CodecRegistry`]
//!   of pluggable converters for message-typed "wrapper" values.
//! * **[`message`]:** Field access on `prost_reflect::DynamicMessage` with typed errors
//!   (the dynamic message model).
//! * **[`path`]:** The field path engine, turning `address.city=Paris` into nested assignments.
//! * **[`format`]:** Indented renderers for descriptors and populated messages, plus the
//!   [`OutputSink`](format::OutputSink) seam used by the client.
//! * **[`client`]:** The [`ProbeClient`] orchestrating resolve -> build -> invoke -> format.
//!
//! ## Internal clients
//!
//! * **[`GrpcClient`](grpc::client::GrpcClient):** A generic unary gRPC client exchanging
//!   `DynamicMessage` values through a descriptor-driven codec.
//! * **[`ReflectionClient`](reflection::client::ReflectionClient):** A `grpc.reflection.v1`
//!   client resolving symbols to complete file descriptor sets.
//!
//! ## Re-exports
//!
//! This crate re-exports `prost`, `prost-reflect`, and `tonic` so that consumers
//! use compatible versions of these underlying dependencies.
pub mod client;
pub mod codec;
pub mod format;
pub mod grpc;
pub mod message;
pub mod path;
pub mod reflection;

pub use client::ProbeClient;
pub use codec::CodecRegistry;

// Re-exports
pub use prost;
pub use prost_reflect;
pub use tonic;

/// Type alias for the standard boxed error used in generic bounds.
type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;
