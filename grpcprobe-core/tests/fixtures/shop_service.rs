//! An in-process implementation of the fixture services, written against the
//! descriptors alone and served through the same dynamic codec the client uses.
//!
//! * `PlaceOrder` replies `id = "order-{customer}"` and echoes the request.
//! * `CancelOrder` always fails with `FAILED_PRECONDITION`.
//! * `SlowOrder` answers after a minute.
//! * `Submit` reports whether the required `token` was present.
//!
//! `x-request-id` and `trace-bin` request metadata are echoed back.
use grpcprobe_core::ProbeClient;
use grpcprobe_core::grpc::codec::DynamicCodec;
use grpcprobe_core::reflection::client::ReflectionClient;
use prost_reflect::{DynamicMessage, MethodDescriptor, ServiceDescriptor, Value};
use std::convert::Infallible;
use std::task::{Context, Poll};
use std::time::Duration;
use tonic::body::Body;
use tonic::codegen::{BoxFuture, Service};
use tonic::server::{Grpc, NamedService, UnaryService};
use tonic::service::Routes;
use tonic::{Request, Response, Status};

use super::{LEGACY_SERVICE, ORDER_SERVICE, file_descriptor_set, pool};

pub const SLOW_ORDER_DELAY: Duration = Duration::from_secs(60);

#[derive(Clone)]
pub struct OrderServiceServer {
    service: ServiceDescriptor,
}

impl Default for OrderServiceServer {
    fn default() -> Self {
        Self {
            service: service_descriptor(ORDER_SERVICE),
        }
    }
}

impl NamedService for OrderServiceServer {
    const NAME: &'static str = ORDER_SERVICE;
}

impl Service<http::Request<Body>> for OrderServiceServer {
    type Response = http::Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<Body>) -> Self::Future {
        serve(&self.service, req)
    }
}

#[derive(Clone)]
pub struct LegacyServiceServer {
    service: ServiceDescriptor,
}

impl Default for LegacyServiceServer {
    fn default() -> Self {
        Self {
            service: service_descriptor(LEGACY_SERVICE),
        }
    }
}

impl NamedService for LegacyServiceServer {
    const NAME: &'static str = LEGACY_SERVICE;
}

impl Service<http::Request<Body>> for LegacyServiceServer {
    type Response = http::Response<Body>;
    type Error = Infallible;
    type Future = BoxFuture<Self::Response, Self::Error>;

    fn poll_ready(&mut self, _cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        Poll::Ready(Ok(()))
    }

    fn call(&mut self, req: http::Request<Body>) -> Self::Future {
        serve(&self.service, req)
    }
}

/// Both fixture services plus a `grpc.reflection.v1` server describing them.
pub fn routes() -> Routes {
    let reflection = tonic_reflection::server::Builder::configure()
        .register_file_descriptor_set(file_descriptor_set())
        .build_v1()
        .expect("Failed to setup Reflection Service");

    Routes::new(reflection)
        .add_service(OrderServiceServer::default())
        .add_service(LegacyServiceServer::default())
}

pub fn setup_client() -> ProbeClient<ReflectionClient<Routes>, Routes> {
    ProbeClient::from_service(routes())
}

fn service_descriptor(name: &str) -> ServiceDescriptor {
    pool()
        .get_service_by_name(name)
        .unwrap_or_else(|| panic!("fixture service {name} missing"))
}

fn serve(
    service: &ServiceDescriptor,
    req: http::Request<Body>,
) -> BoxFuture<http::Response<Body>, Infallible> {
    let path = req.uri().path().to_string();
    let method = path
        .rsplit_once('/')
        .and_then(|(_, name)| service.methods().find(|m| m.name() == name));

    let Some(method) = method else {
        return Box::pin(async move {
            Ok(Status::unimplemented(format!("Unknown method '{path}'")).into_http())
        });
    };

    Box::pin(async move {
        let mut grpc = Grpc::new(DynamicCodec::new(method.input()));
        Ok(grpc.unary(Handler { method }, req).await)
    })
}

struct Handler {
    method: MethodDescriptor,
}

impl UnaryService<DynamicMessage> for Handler {
    type Response = DynamicMessage;
    type Future = BoxFuture<Response<DynamicMessage>, Status>;

    fn call(&mut self, request: Request<DynamicMessage>) -> Self::Future {
        let method = self.method.clone();
        Box::pin(async move { respond(&method, request).await })
    }
}

async fn respond(
    method: &MethodDescriptor,
    request: Request<DynamicMessage>,
) -> Result<Response<DynamicMessage>, Status> {
    let (metadata, _, message) = request.into_parts();
    let mut reply = DynamicMessage::new(method.output());

    match method.name() {
        "PlaceOrder" => {
            let customer = message
                .get_field_by_name("customer")
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default();
            reply.set_field_by_name("id", Value::String(format!("order-{customer}")));
            reply.set_field_by_name("echo", Value::Message(message));
        }
        "CancelOrder" => return Err(Status::failed_precondition("order already shipped")),
        "SlowOrder" => {
            tokio::time::sleep(SLOW_ORDER_DELAY).await;
            reply.set_field_by_name("id", Value::String("late".to_string()));
        }
        "Submit" => {
            let accepted = message.has_field_by_name("token");
            reply.set_field_by_name("accepted", Value::Bool(accepted));
        }
        other => return Err(Status::unimplemented(format!("'{other}' is not served"))),
    }

    let mut response = Response::new(reply);
    if let Some(request_id) = metadata.get("x-request-id") {
        response
            .metadata_mut()
            .insert("x-request-id", request_id.clone());
    }
    if let Some(trace) = metadata.get_bin("trace-bin") {
        response.metadata_mut().insert_bin("trace-bin", trace.clone());
    }

    Ok(response)
}
