//! Codec for the well-known types that have a natural text form:
//! `google.protobuf.Timestamp` (RFC 3339), `google.protobuf.Duration` (`1.5s`) and
//! `google.protobuf.Empty` (rendered as `<empty>`, parsed from empty text).
//!
//! A type only qualifies when it is declared in its canonical `google/protobuf/*.proto` file.
use super::{CodecError, FieldCodec, build_message, message_type, read_field};
use prost_reflect::{FieldDescriptor, MessageDescriptor, Value};

const EMPTY_MARKER: &str = "<empty>";

#[derive(Debug, Clone, Copy, Default)]
pub struct WellKnownCodec;

enum WellKnown {
    Timestamp,
    Duration,
    Empty,
}

impl WellKnownCodec {
    fn classify(field: &FieldDescriptor) -> Option<(MessageDescriptor, WellKnown)> {
        let message = message_type(field)?;
        let kind = match (message.full_name(), message.parent_file().name()) {
            ("google.protobuf.Timestamp", "google/protobuf/timestamp.proto") => {
                WellKnown::Timestamp
            }
            ("google.protobuf.Duration", "google/protobuf/duration.proto") => WellKnown::Duration,
            ("google.protobuf.Empty", "google/protobuf/empty.proto") => WellKnown::Empty,
            _ => return None,
        };
        Some((message, kind))
    }
}

impl FieldCodec for WellKnownCodec {
    fn name(&self) -> &str {
        "google.protobuf.well_known"
    }

    fn try_parse(&self, field: &FieldDescriptor, text: &str) -> Option<Result<Value, CodecError>> {
        let (message, kind) = Self::classify(field)?;

        let invalid = |reason: String| CodecError::InvalidText {
            text: text.to_string(),
            type_name: message.full_name().to_string(),
            reason,
        };

        let result = match kind {
            WellKnown::Timestamp => text
                .parse::<prost_types::Timestamp>()
                .map_err(|err| invalid(err.to_string()))
                .and_then(|ts| {
                    build_message(
                        &message,
                        vec![("seconds", Value::I64(ts.seconds)), ("nanos", Value::I32(ts.nanos))],
                    )
                }),
            WellKnown::Duration => text
                .parse::<prost_types::Duration>()
                .map_err(|err| invalid(err.to_string()))
                .and_then(|d| {
                    build_message(
                        &message,
                        vec![("seconds", Value::I64(d.seconds)), ("nanos", Value::I32(d.nanos))],
                    )
                }),
            WellKnown::Empty if text.is_empty() => build_message(&message, vec![]),
            WellKnown::Empty => Err(invalid("expected empty text".to_string())),
        };

        Some(result)
    }

    fn try_format(
        &self,
        field: &FieldDescriptor,
        value: &Value,
    ) -> Option<Result<String, CodecError>> {
        let (message, kind) = Self::classify(field)?;

        let seconds_and_nanos = || -> Result<(i64, i32), CodecError> {
            let unexpected = || CodecError::UnexpectedValue {
                field: field.full_name().to_string(),
                type_name: message.full_name().to_string(),
            };
            let seconds = read_field(field, value, "seconds")?
                .as_i64()
                .ok_or_else(unexpected)?;
            let nanos = read_field(field, value, "nanos")?
                .as_i32()
                .ok_or_else(unexpected)?;
            Ok((seconds, nanos))
        };

        let result = match kind {
            WellKnown::Timestamp => seconds_and_nanos()
                .map(|(seconds, nanos)| prost_types::Timestamp { seconds, nanos }.to_string()),
            WellKnown::Duration => seconds_and_nanos()
                .map(|(seconds, nanos)| prost_types::Duration { seconds, nanos }.to_string()),
            WellKnown::Empty => Ok(EMPTY_MARKER.to_string()),
        };

        Some(result)
    }
}
