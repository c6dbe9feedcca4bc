//! # Reflection Client
//!
//! A client implementation for `grpc.reflection.v1`.
//!
//! This client builds a complete `FileDescriptorSet` for a symbol by querying a server
//! that supports reflection. The file defining the symbol usually imports others, so the
//! client keeps the stream open and requests every missing import by file name until the
//! dependency tree is closed.
//!
//! ## References
//!
//! * [gRPC Server Reflection Protocol](https://github.com/grpc/grpc/blob/master/doc/server-reflection.md)
use crate::BoxError;
use futures_util::stream::once;
use http_body::Body as HttpBody;
use prost::Message;
use prost_types::{FileDescriptorProto, FileDescriptorSet};
use std::collections::{HashMap, HashSet};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tonic::transport::Channel;
use tonic::{Code, Streaming, client::GrpcService};
use tonic_reflection::pb::v1::{
    ServerReflectionRequest, ServerReflectionResponse,
    server_reflection_client::ServerReflectionClient, server_reflection_request::MessageRequest,
    server_reflection_response::MessageResponse,
};

#[derive(Debug, thiserror::Error)]
pub enum ReflectionResolveError {
    #[error(
        "Failed to start a stream request with the reflection server, reflection might not be supported: '{0}'"
    )]
    ServerStreamInitFailed(#[source] tonic::Status),

    #[error("The server stream returned an error status: '{0}'")]
    ServerStreamFailure(#[source] tonic::Status),

    #[error("Reflection stream closed unexpectedly")]
    StreamClosed,

    #[error("Internal error: Failed to send request to stream")]
    SendFailed,

    #[error("Server returned reflection error code {code}: {message}")]
    ServerError { code: i32, message: String },

    #[error("Protocol error: Received unexpected response type: {0}")]
    UnexpectedResponseType(String),

    #[error("Failed to decode FileDescriptorProto: {0}")]
    DecodeError(#[from] prost::DecodeError),
}

impl ReflectionResolveError {
    /// Whether the server reported that it does not know the requested symbol or file.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::ServerError { code, .. } => *code == Code::NotFound as i32,
            Self::ServerStreamFailure(status) => status.code() == Code::NotFound,
            _ => false,
        }
    }
}

// The host field of reflection requests is optional and servers ignore it.
const EMPTY_HOST: &str = "";

/// A generic client for the gRPC Server Reflection Protocol.
#[derive(Debug, Clone)]
pub struct ReflectionClient<S = Channel> {
    client: ServerReflectionClient<S>,
}

impl<S> ReflectionClient<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(channel: S) -> Self {
        let client = ServerReflectionClient::new(channel);
        Self { client }
    }

    /// Asks the reflection service for the file containing `symbol` (e.g. `shop.v1.OrderService`)
    /// together with all of its transitive imports.
    pub async fn file_descriptor_set_by_symbol(
        &mut self,
        symbol: &str,
    ) -> Result<FileDescriptorSet, ReflectionResolveError> {
        tracing::debug!(symbol, "requesting file containing symbol");

        let (tx, rx) = mpsc::channel(100);

        let mut response_stream = self
            .client
            .server_reflection_info(ReceiverStream::new(rx))
            .await
            .map_err(ReflectionResolveError::ServerStreamInitFailed)?
            .into_inner();

        tx.send(request(MessageRequest::FileContainingSymbol(symbol.to_string())))
            .await
            .map_err(|_| ReflectionResolveError::SendFailed)?;

        let files = collect_descriptors(&mut response_stream, tx).await?;
        tracing::debug!(symbol, files = files.len(), "resolved file descriptor set");

        Ok(FileDescriptorSet {
            file: files.into_values().collect(),
        })
    }

    /// Lists all services exposed by the server.
    pub async fn list_services(&mut self) -> Result<Vec<String>, ReflectionResolveError> {
        let req = request(MessageRequest::ListServices(String::new()));

        let mut response_stream = self
            .client
            .server_reflection_info(once(async { req }))
            .await
            .map_err(ReflectionResolveError::ServerStreamInitFailed)?
            .into_inner();

        match next_response(&mut response_stream).await? {
            MessageResponse::ListServicesResponse(resp) => {
                Ok(resp.service.into_iter().map(|s| s.name).collect())
            }
            other => Err(unexpected(other)),
        }
    }
}

fn request(message_request: MessageRequest) -> ServerReflectionRequest {
    ServerReflectionRequest {
        host: EMPTY_HOST.to_string(),
        message_request: Some(message_request),
    }
}

/// Reads the next response, turning reflection-level error responses into errors.
async fn next_response(
    response_stream: &mut Streaming<ServerReflectionResponse>,
) -> Result<MessageResponse, ReflectionResolveError> {
    let response = response_stream
        .message()
        .await
        .map_err(ReflectionResolveError::ServerStreamFailure)?
        .ok_or(ReflectionResolveError::StreamClosed)?;

    match response.message_response {
        Some(MessageResponse::ErrorResponse(e)) => Err(ReflectionResolveError::ServerError {
            code: e.error_code,
            message: e.error_message,
        }),
        Some(message) => Ok(message),
        None => Err(ReflectionResolveError::UnexpectedResponseType(
            "Empty Message".into(),
        )),
    }
}

fn unexpected(message: MessageResponse) -> ReflectionResolveError {
    ReflectionResolveError::UnexpectedResponseType(format!("{message:?}"))
}

/// Drains responses until every requested file has arrived. Each response may queue
/// further requests for imports not seen yet.
async fn collect_descriptors(
    response_stream: &mut Streaming<ServerReflectionResponse>,
    tx: mpsc::Sender<ServerReflectionRequest>,
) -> Result<HashMap<String, FileDescriptorProto>, ReflectionResolveError> {
    let mut pending = 1;
    let mut files = HashMap::new();
    let mut requested = HashSet::new();

    while pending > 0 {
        let response = next_response(response_stream).await?;
        pending -= 1;

        let MessageResponse::FileDescriptorResponse(batch) = response else {
            return Err(unexpected(response));
        };

        for raw in batch.file_descriptor_proto {
            let file = FileDescriptorProto::decode(raw.as_ref())?;
            let Some(name) = file.name.clone() else {
                continue;
            };
            if files.contains_key(&name) {
                continue;
            }

            requested.insert(name.clone());
            for dep in &file.dependency {
                if !files.contains_key(dep) && requested.insert(dep.clone()) {
                    tracing::trace!(file = %dep, "requesting dependency");
                    tx.send(request(MessageRequest::FileByFilename(dep.clone())))
                        .await
                        .map_err(|_| ReflectionResolveError::SendFailed)?;
                    pending += 1;
                }
            }

            files.insert(name, file);
        }
    }

    Ok(files)
}
