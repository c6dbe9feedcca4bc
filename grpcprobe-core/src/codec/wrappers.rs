//! Codec for the `google/protobuf/wrappers.proto` types.
//!
//! Each wrapper is a message with a single `value` field; it is read and written as that
//! inner scalar, so `limit=10` works for a `google.protobuf.Int32Value limit` field.
use super::{CodecError, FieldCodec, ScalarKind, build_message, message_type, read_field};
use prost_reflect::{FieldDescriptor, MessageDescriptor, Value};

const WRAPPERS_FILE: &str = "google/protobuf/wrappers.proto";

#[derive(Debug, Clone, Copy, Default)]
pub struct WrappersCodec;

impl WrappersCodec {
    fn wrapper(field: &FieldDescriptor) -> Option<(MessageDescriptor, ScalarKind)> {
        let message = message_type(field)?;
        if message.parent_file().name() != WRAPPERS_FILE {
            return None;
        }

        let inner = match message.full_name() {
            "google.protobuf.DoubleValue" => ScalarKind::Double,
            "google.protobuf.FloatValue" => ScalarKind::Float,
            "google.protobuf.Int64Value" => ScalarKind::Int64,
            "google.protobuf.UInt64Value" => ScalarKind::Uint64,
            "google.protobuf.Int32Value" => ScalarKind::Int32,
            "google.protobuf.UInt32Value" => ScalarKind::Uint32,
            "google.protobuf.BoolValue" => ScalarKind::Bool,
            "google.protobuf.StringValue" => ScalarKind::String,
            "google.protobuf.BytesValue" => ScalarKind::Bytes,
            _ => return None,
        };

        Some((message, inner))
    }
}

impl FieldCodec for WrappersCodec {
    fn name(&self) -> &str {
        "google.protobuf.wrappers"
    }

    fn try_parse(&self, field: &FieldDescriptor, text: &str) -> Option<Result<Value, CodecError>> {
        let (message, inner) = Self::wrapper(field)?;

        Some(
            inner
                .parse(text)
                .map_err(CodecError::from)
                .and_then(|value| build_message(&message, vec![("value", value)])),
        )
    }

    fn try_format(
        &self,
        field: &FieldDescriptor,
        value: &Value,
    ) -> Option<Result<String, CodecError>> {
        let (message, inner) = Self::wrapper(field)?;

        Some(read_field(field, value, "value").and_then(|inner_value| {
            inner
                .format(&inner_value)
                .ok_or_else(|| CodecError::UnexpectedValue {
                    field: field.full_name().to_string(),
                    type_name: message.full_name().to_string(),
                })
        }))
    }
}
