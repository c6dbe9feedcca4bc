//! # Descriptor Formatter
//!
//! Renders schema nodes as an indented tree, one tab per level:
//!
//! ```text
//! Message: shop.v1.OrderRequest
//! customer: string
//! address: message [shop.v1.Address]
//! 	city: string
//! tags[]: string
//! scores: map[string]int32
//! status: enum [shop.v1.Status]
//! 	STATUS_UNKNOWN = 0
//! (oneof contact).email: string
//! ```
//!
//! Output is deterministic (declaration order throughout). A message type that is already
//! being expanded higher up the tree is printed as a field line only, so recursive schemas
//! terminate.
use crate::client::Descriptor;
use crate::codec::scalar::kind_name;
use crate::message::map_entry_fields;
use prost_reflect::{
    Cardinality, EnumDescriptor, FieldDescriptor, Kind, MessageDescriptor, MethodDescriptor,
    ServiceDescriptor,
};

#[derive(Debug, Clone, Copy, Default)]
pub struct DescriptorFormatter {
    verbose: bool,
}

impl DescriptorFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// In verbose mode methods are followed by the full shape of their request and
    /// response messages.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.verbose = verbose;
        self
    }

    /// Renders a resolved symbol with a header naming its kind.
    pub fn format(&self, descriptor: &Descriptor) -> String {
        let mut out = String::new();
        match descriptor {
            Descriptor::Service(service) => self.write_service(&mut out, service),
            Descriptor::Method(method) => {
                line(&mut out, 0, &format!("Service RPC: {}", method.full_name()));
                self.write_method(&mut out, method, 0);
            }
            Descriptor::Message(message) => {
                line(&mut out, 0, &format!("Message: {}", message.full_name()));
                write_fields(&mut out, message, 0, &mut vec![message.full_name().to_string()]);
            }
            Descriptor::Field(field) => {
                line(&mut out, 0, &format!("Field: {}", field.full_name()));
                let parent = field.parent_message().full_name().to_string();
                write_field(&mut out, field, 0, &mut vec![parent]);
            }
            Descriptor::Enum(enum_desc) => {
                line(&mut out, 0, &format!("Enum: {}", enum_desc.full_name()));
                write_enum_values(&mut out, enum_desc, 0);
            }
        }
        out
    }

    /// A service and one line per method.
    pub fn format_service(&self, service: &ServiceDescriptor) -> String {
        let mut out = String::new();
        self.write_service(&mut out, service);
        out
    }

    fn write_service(&self, out: &mut String, service: &ServiceDescriptor) {
        line(out, 0, &format!("Service: {}", service.full_name()));
        for method in service.methods() {
            self.write_method(out, &method, 1);
        }
    }

    fn write_method(&self, out: &mut String, method: &MethodDescriptor, level: usize) {
        line(out, level, &method_signature(method));
        if !self.verbose {
            return;
        }

        for (label, message) in [("Request", method.input()), ("Response", method.output())] {
            line(out, level + 1, &format!("{label}: {}", message.full_name()));
            write_fields(out, &message, level + 2, &mut vec![message.full_name().to_string()]);
        }
    }
}

/// `name(pkg.Input) returns (pkg.Output)`, with `stream` markers for streaming sides.
pub fn method_signature(method: &MethodDescriptor) -> String {
    let stream = |streaming: bool| if streaming { "stream " } else { "" };
    format!(
        "{}({}{}) returns ({}{})",
        method.name(),
        stream(method.is_client_streaming()),
        method.input().full_name(),
        stream(method.is_server_streaming()),
        method.output().full_name(),
    )
}

/// The field line without indentation, e.g. `(oneof contact).email: string` or
/// `items[]: message [shop.v1.Item]`.
pub fn field_signature(field: &FieldDescriptor) -> String {
    let mut text = String::new();

    // proto3 `optional` fields live in a synthetic oneof of their own.
    if let Some(oneof) = field.containing_oneof()
        && !field.field_descriptor_proto().proto3_optional()
    {
        text.push_str(&format!("(oneof {}).", oneof.name()));
    }
    text.push_str(field.name());
    if field.is_list() {
        text.push_str("[]");
    }
    if field.cardinality() == Cardinality::Required {
        text.push('*');
    }
    text.push_str(": ");

    match map_entry_fields(field) {
        Some((key, value)) => {
            let value_kind = value.kind();
            text.push_str(&format!(
                "map[{}]{}{}",
                kind_name(&key.kind()),
                kind_name(&value_kind),
                type_suffix(&value_kind)
            ));
        }
        None => {
            text.push_str(kind_name(&field.kind()));
            text.push_str(&type_suffix(&field.kind()));
        }
    }
    text
}

fn type_suffix(kind: &Kind) -> String {
    match kind {
        Kind::Message(message) => format!(" [{}]", message.full_name()),
        Kind::Enum(enum_desc) => format!(" [{}]", enum_desc.full_name()),
        _ => String::new(),
    }
}

fn write_fields(
    out: &mut String,
    message: &MessageDescriptor,
    level: usize,
    path: &mut Vec<String>,
) {
    for field in message.fields() {
        write_field(out, &field, level, path);
    }
}

/// `path` holds the message types currently being expanded.
fn write_field(out: &mut String, field: &FieldDescriptor, level: usize, path: &mut Vec<String>) {
    line(out, level, &field_signature(field));

    let nested = match map_entry_fields(field) {
        Some((_, value)) => value.kind(),
        None => field.kind(),
    };

    match nested {
        Kind::Message(message) => {
            let name = message.full_name().to_string();
            if path.contains(&name) {
                return;
            }
            path.push(name);
            write_fields(out, &message, level + 1, path);
            path.pop();
        }
        Kind::Enum(enum_desc) => write_enum_values(out, &enum_desc, level + 1),
        _ => {}
    }
}

fn write_enum_values(out: &mut String, enum_desc: &EnumDescriptor, level: usize) {
    for value in enum_desc.values() {
        line(out, level, &format!("{} = {}", value.name(), value.number()));
    }
}

fn line(out: &mut String, level: usize, text: &str) {
    out.extend(std::iter::repeat_n('\t', level));
    out.push_str(text);
    out.push('\n');
}
