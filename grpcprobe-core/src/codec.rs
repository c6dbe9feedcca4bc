//! # Value Codecs
//!
//! Conversion between protobuf field values and the plain text a user types on the
//! command line or reads in the output.
//!
//! Two layers are involved:
//!
//! 1. **[`scalar`]**: A closed switch over the protobuf scalar kinds. Every scalar field
//!    (and every enum, through its number) is handled here.
//! 2. **[`CodecRegistry`]**: An ordered chain of [`FieldCodec`] plugins consulted for
//!    message-typed fields that represent one logical scalar, such as
//!    `google.protobuf.Int32Value` or a UUID wrapper.
pub mod registry;
pub mod scalar;
pub mod uuid;
pub mod well_known;
pub mod wrappers;

pub use registry::{CodecError, CodecRegistry, FieldCodec};
pub use scalar::{ScalarKind, ValueFormatError};

use prost_reflect::{DynamicMessage, FieldDescriptor, Kind, MessageDescriptor, Value};

/// Returns the message descriptor of a message-typed field, `None` for any other kind.
pub(crate) fn message_type(field: &FieldDescriptor) -> Option<MessageDescriptor> {
    match field.kind() {
        Kind::Message(message) => Some(message),
        _ => None,
    }
}

/// Builds a message of type `message` with the given fields assigned.
pub(crate) fn build_message(
    message: &MessageDescriptor,
    fields: Vec<(&str, Value)>,
) -> Result<Value, CodecError> {
    let mut built = DynamicMessage::new(message.clone());
    for (name, value) in fields {
        let unexpected = || CodecError::UnexpectedValue {
            field: name.to_string(),
            type_name: message.full_name().to_string(),
        };
        let field = message.get_field_by_name(name).ok_or_else(unexpected)?;
        built.try_set_field(&field, value).map_err(|_| unexpected())?;
    }
    Ok(Value::Message(built))
}

/// Reads field `name` out of a message value held by `field`.
pub(crate) fn read_field(
    field: &FieldDescriptor,
    value: &Value,
    name: &str,
) -> Result<Value, CodecError> {
    let unexpected = || CodecError::UnexpectedValue {
        field: field.full_name().to_string(),
        type_name: message_type(field)
            .map(|m| m.full_name().to_string())
            .unwrap_or_default(),
    };
    let message = value.as_message().ok_or_else(unexpected)?;
    let inner = message.get_field_by_name(name).ok_or_else(unexpected)?;
    Ok(inner.into_owned())
}
