//! # Connection Suppliers
//!
//! The client does not build channels itself; it asks a [`ConnectionSupplier`] for one,
//! passing the connect deadline derived from the caller's budget.
//!
//! * [`EndpointSupplier`] dials a target with [`ConnectOptions`].
//! * A `tonic::transport::Channel` supplies clones of itself, for callers that keep one
//!   connection across several calls.
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};

/// Default upper bound on connection establishment.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Errors that can occur when connecting to a gRPC server.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    #[error("Invalid URL '{0}': {1}")]
    InvalidUrl(String, #[source] tonic::transport::Error),
    #[error("Failed to connect to '{0}': {1}")]
    ConnectionFailed(String, #[source] tonic::transport::Error),
    #[error("Timed out after {1:?} connecting to '{0}'")]
    Timeout(String, Duration),
}

/// Transport settings applied when dialing.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub connect_timeout: Duration,
    /// HTTP/2 keepalive ping interval, also used as the ping ack timeout.
    pub keepalive: Option<Duration>,
    pub user_agent: Option<String>,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            keepalive: None,
            user_agent: None,
        }
    }
}

impl ConnectOptions {
    /// The connect deadline for a call with an overall budget of `max_time`.
    pub fn effective_connect_timeout(&self, max_time: Option<Duration>) -> Duration {
        match max_time {
            Some(max_time) => self.connect_timeout.min(max_time),
            None => self.connect_timeout,
        }
    }
}

/// Something that can hand out a connection within a deadline.
pub trait ConnectionSupplier {
    type Connection;

    fn connection(
        &self,
        timeout: Duration,
    ) -> impl Future<Output = Result<Self::Connection, ConnectionError>>;
}

/// Dials `target` on every request for a connection.
#[derive(Debug, Clone)]
pub struct EndpointSupplier {
    target: String,
    options: ConnectOptions,
}

impl EndpointSupplier {
    /// A target without a scheme (`localhost:50051`) is dialed over plaintext HTTP/2.
    pub fn new(target: impl Into<String>, options: ConnectOptions) -> Self {
        Self {
            target: normalize_target(&target.into()),
            options,
        }
    }

    pub fn target(&self) -> &str {
        &self.target
    }

    pub fn options(&self) -> &ConnectOptions {
        &self.options
    }

    fn endpoint(&self, timeout: Duration) -> Result<Endpoint, ConnectionError> {
        let invalid = |e| ConnectionError::InvalidUrl(self.target.clone(), e);

        let mut endpoint = Endpoint::from_shared(self.target.clone())
            .map_err(invalid)?
            .connect_timeout(timeout);

        if let Some(interval) = self.options.keepalive {
            endpoint = endpoint
                .http2_keep_alive_interval(interval)
                .keep_alive_timeout(interval)
                .keep_alive_while_idle(true);
        }
        if let Some(user_agent) = &self.options.user_agent {
            endpoint = endpoint.user_agent(user_agent.clone()).map_err(invalid)?;
        }

        Ok(endpoint)
    }
}

impl ConnectionSupplier for EndpointSupplier {
    type Connection = Channel;

    async fn connection(&self, timeout: Duration) -> Result<Channel, ConnectionError> {
        let endpoint = self.endpoint(timeout)?;
        tracing::debug!(endpoint = %self.target, ?timeout, "connecting");

        tokio::time::timeout(timeout, endpoint.connect())
            .await
            .map_err(|_| ConnectionError::Timeout(self.target.clone(), timeout))?
            .map_err(|e| ConnectionError::ConnectionFailed(self.target.clone(), e))
    }
}

/// A borrowed, already established connection.
impl ConnectionSupplier for Channel {
    type Connection = Channel;

    async fn connection(&self, _timeout: Duration) -> Result<Channel, ConnectionError> {
        Ok(self.clone())
    }
}

/// Prefixes `http://` to targets given without a scheme.
pub fn normalize_target(target: &str) -> String {
    if target.contains("://") {
        target.to_string()
    } else {
        format!("http://{target}")
    }
}
