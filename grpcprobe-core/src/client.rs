//! # Probe Client
//!
//! The [`ProbeClient`] ties the pieces together for its three operations:
//!
//! * **list**: [`ProbeClient::list_services`] and [`ProbeClient::list_service`].
//! * **describe**: [`ProbeClient::describe`] resolves any symbol to a [`Descriptor`].
//! * **invoke**: [`ProbeClient::invoke`] resolves a method, builds its request from
//!   `path=value` parameters, performs the unary call and hands the response to an
//!   [`OutputSink`].
//!
//! Each operation has an `_until` variant that honours [`CallOptions::timeout`] and stops
//! with [`ProbeError::Cancelled`] once a caller supplied future completes.
//!
//! Schema comes from a [`SchemaSource`]: server reflection by default, or a local
//! `FileDescriptorSet` after [`ProbeClient::with_file_descriptor`].
//!
//! ## Example
//!
//! ```rust,no_run
//! use grpcprobe_core::client::{CallOptions, ConnectOptions, EndpointSupplier, ProbeClient};
//! use grpcprobe_core::format::TextOutput;
//! use grpcprobe_core::path::InvokeParam;
//! use grpcprobe_core::CodecRegistry;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let options = ConnectOptions::default();
//! let timeout = options.connect_timeout;
//! let supplier = EndpointSupplier::new("localhost:50051", options);
//! let mut client = ProbeClient::connect(&supplier, timeout).await?;
//!
//! let params: Vec<InvokeParam> = vec!["address.city=Paris".parse()?, "tags.0=gift".parse()?];
//! let mut sink = TextOutput::new(std::io::stdout(), CodecRegistry::with_defaults());
//! client
//!     .invoke("shop.v1.OrderService.PlaceOrder", &params, &CallOptions::default(), &mut sink)
//!     .await?;
//! # Ok(())
//! # }
//! ```
mod connect;
mod invoke;
mod types;

pub use connect::*;
pub use invoke::*;
pub use types::*;

use crate::{
    BoxError,
    codec::CodecRegistry,
    format::{OutputError, OutputSink},
    grpc::client::{GrpcClient, GrpcRequestError},
    path::{FieldPathEngine, InvokeParam, ParamError, PathError},
    reflection::{LocalSchema, SchemaError, SchemaSource, client::ReflectionClient},
};
use http_body::Body as HttpBody;
use prost_reflect::{DynamicMessage, MethodDescriptor, ServiceDescriptor};
use std::future::pending;
use std::time::Duration;
use tonic::{client::GrpcService, transport::Channel};

/// Errors that can occur while listing, describing or invoking.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("Symbol '{0}' not found")]
    SymbolNotFound(String),
    #[error("Symbol '{symbol}' is a {kind}, not a method")]
    NotAMethod { symbol: String, kind: &'static str },
    #[error("Deadline of {0:?} exceeded")]
    DeadlineExceeded(Duration),
    #[error("Call cancelled")]
    Cancelled,
    #[error("gRPC call failed: code={:?} message={:?}", .0.code(), .0.message())]
    Rpc(tonic::Status),
    #[error(transparent)]
    Param(#[from] ParamError),
    #[error(transparent)]
    Path(#[from] PathError),
    #[error("Schema resolution failed: '{0}'")]
    Schema(#[source] SchemaError),
    #[error("Failed to send request: '{0}'")]
    Transport(#[from] GrpcRequestError),
    #[error(transparent)]
    Connection(#[from] ConnectionError),
    #[error(transparent)]
    Output(#[from] OutputError),
}

impl From<SchemaError> for ProbeError {
    fn from(err: SchemaError) -> Self {
        match err {
            SchemaError::NotFound(symbol) => ProbeError::SymbolNotFound(symbol),
            other => ProbeError::Schema(other),
        }
    }
}

/// Per-call settings.
#[derive(Debug, Clone, Default)]
pub struct CallOptions {
    /// Budget for symbol resolution and the RPC together. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// Metadata attached to the request. Keys ending in `-bin` are sent as binary.
    pub headers: Vec<(String, String)>,
}

/// A dynamic gRPC client that needs no compiled message types.
#[derive(Debug)]
pub struct ProbeClient<R, S = Channel> {
    schema: R,
    grpc: GrpcClient<S>,
    engine: FieldPathEngine,
    last_invocation: Option<Invocation>,
}

impl ProbeClient<ReflectionClient<Channel>, Channel> {
    /// Obtains a connection from `supplier` within `connect_timeout` and uses server
    /// reflection for schema.
    pub async fn connect<C>(supplier: &C, connect_timeout: Duration) -> Result<Self, ConnectionError>
    where
        C: ConnectionSupplier<Connection = Channel>,
    {
        let channel = supplier.connection(connect_timeout).await?;
        Ok(Self::from_service(channel))
    }
}

impl<S> ProbeClient<ReflectionClient<S>, S>
where
    S: GrpcService<tonic::body::Body> + Clone,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    /// Creates a client from an existing Tonic service/channel.
    pub fn from_service(service: S) -> Self {
        let reflection = ReflectionClient::new(service.clone());
        ProbeClient::with_schema(service, reflection)
    }
}

impl<R, S> ProbeClient<R, S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    /// Creates a client calling through `service` and resolving symbols with `schema`.
    pub fn with_schema(service: S, schema: R) -> Self {
        Self {
            schema,
            grpc: GrpcClient::new(service),
            engine: FieldPathEngine::new(CodecRegistry::with_defaults()),
            last_invocation: None,
        }
    }
}

impl<R, S> ProbeClient<R, S> {
    /// Replaces the schema source with an encoded `FileDescriptorSet`, keeping the connection.
    pub fn with_file_descriptor(
        self,
        file_descriptor: &[u8],
    ) -> Result<ProbeClient<LocalSchema, S>, SchemaError> {
        let schema = LocalSchema::from_bytes(file_descriptor)?;
        Ok(ProbeClient {
            schema,
            grpc: self.grpc,
            engine: self.engine,
            last_invocation: None,
        })
    }

    /// Replaces the codecs used to parse parameter values.
    pub fn with_registry(mut self, registry: CodecRegistry) -> Self {
        self.engine = FieldPathEngine::new(registry);
        self
    }

    pub fn registry(&self) -> &CodecRegistry {
        self.engine.registry()
    }

    /// The states the most recent [`invoke`](Self::invoke) went through.
    pub fn last_invocation(&self) -> Option<&Invocation> {
        self.last_invocation.as_ref()
    }

    /// Builds the request for `method` by applying `params` in order.
    ///
    /// The first failing parameter aborts; the partially built message is dropped.
    pub fn build_request(
        &self,
        method: &MethodDescriptor,
        params: &[InvokeParam],
    ) -> Result<DynamicMessage, PathError> {
        let mut request = DynamicMessage::new(method.input());
        for param in params {
            tracing::debug!(method = method.full_name(), %param, "applying parameter");
            self.engine.apply(&mut request, param)?;
        }
        Ok(request)
    }
}

impl<R, S> ProbeClient<R, S>
where
    R: SchemaSource,
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    /// Lists the services known to the schema source.
    pub async fn list_services(&mut self) -> Result<Vec<String>, ProbeError> {
        Ok(self.schema.list_services().await?)
    }

    /// Like [`list_services`](Self::list_services), bounded by `options.timeout` and
    /// aborted as soon as `cancel` completes.
    pub async fn list_services_until(
        &mut self,
        options: &CallOptions,
        cancel: impl Future<Output = ()>,
    ) -> Result<Vec<String>, ProbeError> {
        guarded(options.timeout, cancel, self.list_services()).await
    }

    /// Resolves a service by its fully qualified name.
    pub async fn list_service(&mut self, name: &str) -> Result<ServiceDescriptor, ProbeError> {
        Ok(self.schema.resolve_service(name).await?)
    }

    pub async fn list_service_until(
        &mut self,
        name: &str,
        options: &CallOptions,
        cancel: impl Future<Output = ()>,
    ) -> Result<ServiceDescriptor, ProbeError> {
        guarded(options.timeout, cancel, self.list_service(name)).await
    }

    /// Resolves any symbol: service, method, message, field or enum.
    pub async fn describe(&mut self, symbol: &str) -> Result<Descriptor, ProbeError> {
        let descriptor = self.schema.find_symbol(symbol).await?;
        tracing::debug!(
            symbol,
            kind = descriptor.kind(),
            full_name = descriptor.full_name(),
            "resolved symbol"
        );
        Ok(descriptor)
    }

    pub async fn describe_until(
        &mut self,
        symbol: &str,
        options: &CallOptions,
        cancel: impl Future<Output = ()>,
    ) -> Result<Descriptor, ProbeError> {
        guarded(options.timeout, cancel, self.describe(symbol)).await
    }

    /// Invokes `method` with a request built from `params` and writes the response to `sink`.
    pub async fn invoke(
        &mut self,
        method: &str,
        params: &[InvokeParam],
        options: &CallOptions,
        sink: &mut impl OutputSink,
    ) -> Result<InvokeResponse, ProbeError> {
        self.invoke_until(method, params, options, sink, pending())
            .await
    }

    /// Like [`invoke`](Self::invoke), aborting with [`ProbeError::Cancelled`] as soon as
    /// `cancel` completes.
    pub async fn invoke_until(
        &mut self,
        method: &str,
        params: &[InvokeParam],
        options: &CallOptions,
        sink: &mut impl OutputSink,
        cancel: impl Future<Output = ()>,
    ) -> Result<InvokeResponse, ProbeError> {
        let mut invocation = Invocation::new();
        let result = self
            .run(&mut invocation, method, params, options, sink, cancel)
            .await;

        match &result {
            Ok(_) => invocation.advance(InvokeState::Done),
            Err(err) => {
                tracing::debug!(method, state = ?invocation.state(), %err, "invocation failed");
                invocation.fail();
            }
        }
        self.last_invocation = Some(invocation);

        result
    }

    async fn run(
        &mut self,
        invocation: &mut Invocation,
        method: &str,
        params: &[InvokeParam],
        options: &CallOptions,
        sink: &mut impl OutputSink,
        cancel: impl Future<Output = ()>,
    ) -> Result<InvokeResponse, ProbeError> {
        let call = self.call(invocation, method, params, &options.headers);

        let response = guarded(options.timeout, cancel, call).await?;

        invocation.advance(InvokeState::Formatting);
        sink.invoke(&response)?;

        Ok(response)
    }

    /// Resolve, build and send. Runs under the caller's deadline.
    async fn call(
        &mut self,
        invocation: &mut Invocation,
        symbol: &str,
        params: &[InvokeParam],
        headers: &[(String, String)],
    ) -> Result<InvokeResponse, ProbeError> {
        invocation.advance(InvokeState::ResolvingSymbol);
        let method = self.resolve_method(symbol).await?;

        invocation.advance(InvokeState::BuildingRequest);
        let request = self.build_request(&method, params)?;

        invocation.advance(InvokeState::Invoking);
        let response = self
            .grpc
            .unary(&method, request, headers)
            .await?
            .map_err(|status| {
                tracing::info!(method = method.full_name(), code = ?status.code(), "call failed");
                ProbeError::Rpc(status)
            })?;
        tracing::info!(method = method.full_name(), code = ?tonic::Code::Ok, "call completed");

        Ok(InvokeResponse {
            method,
            metadata: response.metadata,
            message: response.message,
        })
    }

    async fn resolve_method(&mut self, symbol: &str) -> Result<MethodDescriptor, ProbeError> {
        match self.describe(symbol).await? {
            Descriptor::Method(method) => Ok(method),
            other => Err(ProbeError::NotAMethod {
                symbol: symbol.to_string(),
                kind: other.kind(),
            }),
        }
    }
}

/// Runs `fut` under an optional deadline, giving up early when `cancel` completes.
async fn guarded<T>(
    timeout: Option<Duration>,
    cancel: impl Future<Output = ()>,
    fut: impl Future<Output = Result<T, ProbeError>>,
) -> Result<T, ProbeError> {
    tokio::select! {
        biased;
        _ = cancel => Err(ProbeError::Cancelled),
        result = with_deadline(timeout, fut) => result,
    }
}

async fn with_deadline<T>(
    timeout: Option<Duration>,
    fut: impl Future<Output = Result<T, ProbeError>>,
) -> Result<T, ProbeError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| ProbeError::DeadlineExceeded(limit))?,
        None => fut.await,
    }
}
