//! # Unary Transport
//!
//! [`GrpcClient`] sends one `DynamicMessage` to one method over any tonic `GrpcService`
//! and decodes the reply into the method's output type with [`DynamicCodec`].
//!
//! The HTTP/2 path (`/package.Service/Method`) is built from the method descriptor.
//! Caller headers become request metadata; keys ending in `-bin` are sent as binary
//! metadata. Response metadata is returned untouched.
use super::codec::DynamicCodec;
use crate::BoxError;
use http_body::Body as HttpBody;
use prost_reflect::{DynamicMessage, MethodDescriptor};
use std::str::FromStr;
use tonic::{
    client::GrpcService,
    metadata::{
        AsciiMetadataValue, BinaryMetadataKey, BinaryMetadataValue, MetadataKey, MetadataMap,
        errors::{InvalidMetadataKey, InvalidMetadataValue},
    },
    transport::Channel,
};

#[derive(thiserror::Error, Debug)]
pub enum GrpcRequestError {
    #[error("Internal error, the client was not ready: '{0}'")]
    ClientNotReady(#[source] BoxError),
    #[error("Invalid metadata (header) key '{key}': '{source}'")]
    InvalidMetadataKey {
        key: String,
        source: InvalidMetadataKey,
    },
    #[error("Invalid metadata (header) value for key '{key}': '{source}'")]
    InvalidMetadataValue {
        key: String,
        source: InvalidMetadataValue,
    },
    #[error("Method '{0}' does not map to a valid HTTP/2 path")]
    InvalidPath(String),
}

/// A successful unary call: the decoded response and the metadata that came with it.
#[derive(Debug, Clone)]
pub struct UnaryResponse {
    pub metadata: MetadataMap,
    pub message: DynamicMessage,
}

/// A generic client for unary calls carrying dynamic messages.
#[derive(Debug, Clone)]
pub struct GrpcClient<S = Channel> {
    client: tonic::client::Grpc<S>,
}

impl<S> GrpcClient<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    pub fn new(service: S) -> Self {
        let client = tonic::client::Grpc::new(service);
        Self { client }
    }

    /// Performs a Unary gRPC call (Single Request -> Single Response).
    ///
    /// # Returns
    /// * `Ok(Ok(UnaryResponse))` - Successful RPC execution.
    /// * `Ok(Err(Status))` - RPC executed, but server returned an error.
    /// * `Err(GrpcRequestError)` - Failed to send request or connect.
    pub async fn unary(
        &mut self,
        method: &MethodDescriptor,
        payload: DynamicMessage,
        headers: &[(String, String)],
    ) -> Result<Result<UnaryResponse, tonic::Status>, GrpcRequestError> {
        let path = http_path(method)?;
        let request = build_request(payload, headers)?;

        self.client
            .ready()
            .await
            .map_err(|e| GrpcRequestError::ClientNotReady(e.into()))?;

        tracing::debug!(path = %path, "sending unary request");

        let codec = DynamicCodec::new(method.output());
        match self.client.unary(request, path, codec).await {
            Ok(response) => {
                let (metadata, message, _) = response.into_parts();
                Ok(Ok(UnaryResponse { metadata, message }))
            }
            Err(status) => Ok(Err(status)),
        }
    }
}

fn http_path(method: &MethodDescriptor) -> Result<http::uri::PathAndQuery, GrpcRequestError> {
    let path = format!("/{}/{}", method.parent_service().full_name(), method.name());
    http::uri::PathAndQuery::from_str(&path).map_err(|_| GrpcRequestError::InvalidPath(path))
}

fn build_request<T>(
    payload: T,
    headers: &[(String, String)],
) -> Result<tonic::Request<T>, GrpcRequestError> {
    let mut request = tonic::Request::new(payload);
    for (k, v) in headers {
        let invalid_key = |source| GrpcRequestError::InvalidMetadataKey {
            key: k.clone(),
            source,
        };

        if k.ends_with("-bin") {
            let key = BinaryMetadataKey::from_bytes(k.as_bytes()).map_err(invalid_key)?;
            let val = BinaryMetadataValue::from_bytes(v.as_bytes());
            request.metadata_mut().insert_bin(key, val);
        } else {
            let key = MetadataKey::from_str(k).map_err(invalid_key)?;
            let val = AsciiMetadataValue::from_str(v).map_err(|source| {
                GrpcRequestError::InvalidMetadataValue {
                    key: k.clone(),
                    source,
                }
            })?;
            request.metadata_mut().insert(key, val);
        }
    }
    Ok(request)
}
