use prost_reflect::{
    DescriptorPool, DynamicMessage, EnumDescriptor, FieldDescriptor, MessageDescriptor,
    MethodDescriptor, ServiceDescriptor,
};
use std::fmt::Debug;
use tonic::metadata::MetadataMap;

/// A generic wrapper for the schema nodes a symbol can resolve to.
#[derive(Debug, Clone)]
pub enum Descriptor {
    Service(ServiceDescriptor),
    Method(MethodDescriptor),
    Message(MessageDescriptor),
    Field(FieldDescriptor),
    Enum(EnumDescriptor),
}

impl Descriptor {
    /// Resolves `symbol` inside `pool`.
    ///
    /// Services, messages and enums are looked up directly. Methods are accepted as
    /// `pkg.Service.Method` or `pkg.Service/Method`, fields as `pkg.Message.field`.
    pub fn find(pool: &DescriptorPool, symbol: &str) -> Option<Self> {
        let symbol = symbol.trim_start_matches('.').replace('/', ".");

        if let Some(service) = pool.get_service_by_name(&symbol) {
            return Some(Self::Service(service));
        }
        if let Some(message) = pool.get_message_by_name(&symbol) {
            return Some(Self::Message(message));
        }
        if let Some(enum_desc) = pool.get_enum_by_name(&symbol) {
            return Some(Self::Enum(enum_desc));
        }

        let (parent, member) = symbol.rsplit_once('.')?;
        if let Some(service) = pool.get_service_by_name(parent) {
            return service
                .methods()
                .find(|method| method.name() == member)
                .map(Self::Method);
        }
        pool.get_message_by_name(parent)
            .and_then(|message| message.get_field_by_name(member))
            .map(Self::Field)
    }

    /// Returns the full name (e.g. `shop.v1.OrderService.PlaceOrder`) of the inner descriptor.
    pub fn full_name(&self) -> &str {
        match self {
            Descriptor::Service(v) => v.full_name(),
            Descriptor::Method(v) => v.full_name(),
            Descriptor::Message(v) => v.full_name(),
            Descriptor::Field(v) => v.full_name(),
            Descriptor::Enum(v) => v.full_name(),
        }
    }

    /// A short label for the variant, used in messages (`service`, `method`, ...).
    pub fn kind(&self) -> &'static str {
        match self {
            Descriptor::Service(_) => "service",
            Descriptor::Method(_) => "method",
            Descriptor::Message(_) => "message",
            Descriptor::Field(_) => "field",
            Descriptor::Enum(_) => "enum",
        }
    }
}

/// The outcome of a successful unary invocation.
#[derive(Debug, Clone)]
pub struct InvokeResponse {
    pub method: MethodDescriptor,
    /// Response headers and trailers, passed through untouched.
    pub metadata: MetadataMap,
    pub message: DynamicMessage,
}
