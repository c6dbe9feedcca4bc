//! # Schema Sources
//!
//! Where descriptors come from. The client resolves symbols through a [`SchemaSource`]:
//!
//! * [`ReflectionClient`](client::ReflectionClient): asks the server itself over the
//!   gRPC Server Reflection Protocol.
//! * [`LocalSchema`]: an encoded `FileDescriptorSet` read from disk, for servers that do
//!   not expose reflection.
//!
//! Descriptor pools are built per lookup and are not cached between calls.
pub mod client;

use crate::BoxError;
use crate::client::Descriptor;
use client::{ReflectionClient, ReflectionResolveError};
use http_body::Body as HttpBody;
use prost::Message;
use prost_reflect::{DescriptorError, DescriptorPool, ServiceDescriptor};
use prost_types::FileDescriptorSet;
use tonic::client::GrpcService;

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("Symbol '{0}' not found")]
    NotFound(String),
    #[error("Reflection request failed: {0}")]
    Reflection(#[from] ReflectionResolveError),
    #[error("Failed to build descriptor pool: '{0}'")]
    Descriptor(#[from] DescriptorError),
    #[error("Failed to decode file descriptor set: '{0}'")]
    Decode(#[from] prost::DecodeError),
}

/// Resolves symbol names to schema.
pub trait SchemaSource {
    /// Fully qualified names of every service the source knows about.
    fn list_services(&mut self) -> impl Future<Output = Result<Vec<String>, SchemaError>>;

    /// A pool containing the file that defines `symbol` and everything it imports.
    fn file_containing_symbol(
        &mut self,
        symbol: &str,
    ) -> impl Future<Output = Result<DescriptorPool, SchemaError>>;

    fn resolve_service(
        &mut self,
        name: &str,
    ) -> impl Future<Output = Result<ServiceDescriptor, SchemaError>> {
        async move {
            let pool = self.file_containing_symbol(name).await?;
            pool.get_service_by_name(name)
                .ok_or_else(|| SchemaError::NotFound(name.to_string()))
        }
    }

    /// Resolves any symbol to its descriptor.
    ///
    /// Method (`pkg.Svc.Method`, `pkg.Svc/Method`) and field symbols are not indexed by
    /// every reflection server; when the symbol itself is unknown its parent is fetched
    /// and the member is looked up inside it.
    fn find_symbol(
        &mut self,
        symbol: &str,
    ) -> impl Future<Output = Result<Descriptor, SchemaError>> {
        async move {
            let normalized = symbol.trim_start_matches('.').replace('/', ".");

            let pool = match self.file_containing_symbol(&normalized).await {
                Ok(pool) => pool,
                Err(SchemaError::NotFound(_)) => {
                    let Some((parent, _)) = normalized.rsplit_once('.') else {
                        return Err(SchemaError::NotFound(symbol.to_string()));
                    };
                    tracing::warn!(symbol, parent, "symbol not indexed, resolving its parent");
                    self.file_containing_symbol(parent)
                        .await
                        .map_err(|err| match err {
                            SchemaError::NotFound(_) => SchemaError::NotFound(symbol.to_string()),
                            other => other,
                        })?
                }
                Err(err) => return Err(err),
            };

            Descriptor::find(&pool, &normalized)
                .ok_or_else(|| SchemaError::NotFound(symbol.to_string()))
        }
    }
}

impl<S> SchemaSource for ReflectionClient<S>
where
    S: GrpcService<tonic::body::Body>,
    S::Error: Into<BoxError>,
    S::ResponseBody: HttpBody<Data = tonic::codegen::Bytes> + Send + 'static,
    <S::ResponseBody as HttpBody>::Error: Into<BoxError> + Send,
{
    async fn list_services(&mut self) -> Result<Vec<String>, SchemaError> {
        Ok(ReflectionClient::list_services(self).await?)
    }

    async fn file_containing_symbol(&mut self, symbol: &str) -> Result<DescriptorPool, SchemaError> {
        let fd_set = self
            .file_descriptor_set_by_symbol(symbol)
            .await
            .map_err(|err| {
                if err.is_not_found() {
                    SchemaError::NotFound(symbol.to_string())
                } else {
                    SchemaError::Reflection(err)
                }
            })?;

        Ok(DescriptorPool::from_file_descriptor_set(fd_set)?)
    }
}

/// A schema loaded from an encoded `FileDescriptorSet`, e.g. the output of
/// `protoc --include_imports --descriptor_set_out`.
#[derive(Debug, Clone)]
pub struct LocalSchema {
    pool: DescriptorPool,
}

impl LocalSchema {
    pub fn new(pool: DescriptorPool) -> Self {
        Self { pool }
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SchemaError> {
        let fd_set = FileDescriptorSet::decode(bytes)?;
        Ok(Self::new(DescriptorPool::from_file_descriptor_set(fd_set)?))
    }

    pub fn pool(&self) -> &DescriptorPool {
        &self.pool
    }
}

impl SchemaSource for LocalSchema {
    async fn list_services(&mut self) -> Result<Vec<String>, SchemaError> {
        Ok(self
            .pool
            .services()
            .map(|s| s.full_name().to_string())
            .collect())
    }

    async fn file_containing_symbol(&mut self, symbol: &str) -> Result<DescriptorPool, SchemaError> {
        match Descriptor::find(&self.pool, symbol) {
            Some(_) => Ok(self.pool.clone()),
            None => Err(SchemaError::NotFound(symbol.to_string())),
        }
    }
}
