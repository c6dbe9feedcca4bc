use grpcprobe_core::client::{
    ConnectOptions, ConnectionError, ConnectionSupplier, DEFAULT_CONNECT_TIMEOUT,
    EndpointSupplier, normalize_target,
};
use std::time::Duration;
use tonic::transport::Endpoint;

#[test]
fn test_targets_without_scheme_use_plaintext() {
    assert_eq!(normalize_target("localhost:50051"), "http://localhost:50051");
    assert_eq!(normalize_target("https://api.example.com"), "https://api.example.com");

    let supplier = EndpointSupplier::new("127.0.0.1:9000", ConnectOptions::default());
    assert_eq!(supplier.target(), "http://127.0.0.1:9000");
}

#[test]
fn test_connect_deadline_is_bounded_by_the_call_budget() {
    let options = ConnectOptions::default();

    assert_eq!(options.connect_timeout, DEFAULT_CONNECT_TIMEOUT);
    assert_eq!(options.effective_connect_timeout(None), DEFAULT_CONNECT_TIMEOUT);
    assert_eq!(
        options.effective_connect_timeout(Some(Duration::from_secs(2))),
        Duration::from_secs(2)
    );
    assert_eq!(
        options.effective_connect_timeout(Some(Duration::from_secs(60))),
        DEFAULT_CONNECT_TIMEOUT
    );
}

#[tokio::test]
async fn test_invalid_target_is_rejected_before_dialing() {
    let supplier = EndpointSupplier::new("exa mple:1", ConnectOptions::default());

    let err = supplier
        .connection(Duration::from_secs(1))
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectionError::InvalidUrl(ref target, _) if target == "http://exa mple:1"));
}

#[tokio::test]
async fn test_channel_supplies_itself() {
    let channel = Endpoint::from_static("http://127.0.0.1:1").connect_lazy();

    assert!(channel.connection(Duration::from_secs(1)).await.is_ok());
}
