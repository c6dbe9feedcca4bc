//! Codecs for UUID-as-message types.
//!
//! Some schemas carry UUIDs as a message with a string `value` field, optionally paired
//! with a `valid` flag for nullable UUIDs. These codecs are opt-in:
//!
//! ```rust
//! use grpcprobe_core::codec::{CodecRegistry, uuid::{NullUuidCodec, UuidCodec}};
//!
//! let registry = CodecRegistry::with_defaults()
//!     .with_codec(UuidCodec::default())
//!     .with_codec(NullUuidCodec::default());
//! ```
use super::{CodecError, FieldCodec, build_message, message_type, read_field};
use prost_reflect::{FieldDescriptor, MessageDescriptor, Value};

const NULL_MARKER: &str = "<null>";

/// A UUID carried as `message UUID { string value = 1; }`.
#[derive(Debug, Clone)]
pub struct UuidCodec {
    type_name: String,
}

impl UuidCodec {
    /// Applies to fields whose message type has the fully-qualified name `type_name`.
    pub fn for_type(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }
}

impl Default for UuidCodec {
    fn default() -> Self {
        Self::for_type("fproto_wrap.UUID")
    }
}

impl FieldCodec for UuidCodec {
    fn name(&self) -> &str {
        &self.type_name
    }

    fn try_parse(&self, field: &FieldDescriptor, text: &str) -> Option<Result<Value, CodecError>> {
        let message = matching_type(field, &self.type_name)?;
        Some(build_message(
            &message,
            vec![("value", Value::String(text.to_string()))],
        ))
    }

    fn try_format(
        &self,
        field: &FieldDescriptor,
        value: &Value,
    ) -> Option<Result<String, CodecError>> {
        matching_type(field, &self.type_name)?;
        Some(read_string(field, value, "value"))
    }
}

/// A nullable UUID carried as `message NullUUID { string value = 1; bool valid = 2; }`.
///
/// Empty text parses as an invalid (null) UUID, which renders as `<null>`.
#[derive(Debug, Clone)]
pub struct NullUuidCodec {
    type_name: String,
}

impl NullUuidCodec {
    pub fn for_type(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }
}

impl Default for NullUuidCodec {
    fn default() -> Self {
        Self::for_type("fproto_wrap.NullUUID")
    }
}

impl FieldCodec for NullUuidCodec {
    fn name(&self) -> &str {
        &self.type_name
    }

    fn try_parse(&self, field: &FieldDescriptor, text: &str) -> Option<Result<Value, CodecError>> {
        let message = matching_type(field, &self.type_name)?;

        let fields = if text.is_empty() {
            vec![("valid", Value::Bool(false))]
        } else {
            vec![
                ("value", Value::String(text.to_string())),
                ("valid", Value::Bool(true)),
            ]
        };

        Some(build_message(&message, fields))
    }

    fn try_format(
        &self,
        field: &FieldDescriptor,
        value: &Value,
    ) -> Option<Result<String, CodecError>> {
        matching_type(field, &self.type_name)?;

        let result = read_field(field, value, "valid").and_then(|valid| {
            if valid.as_bool().unwrap_or(false) {
                read_string(field, value, "value")
            } else {
                Ok(NULL_MARKER.to_string())
            }
        });

        Some(result)
    }
}

fn matching_type(field: &FieldDescriptor, type_name: &str) -> Option<MessageDescriptor> {
    message_type(field).filter(|message| message.full_name() == type_name)
}

fn read_string(field: &FieldDescriptor, value: &Value, name: &str) -> Result<String, CodecError> {
    let inner = read_field(field, value, name)?;
    inner
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| CodecError::UnexpectedValue {
            field: field.full_name().to_string(),
            type_name: name.to_string(),
        })
}
