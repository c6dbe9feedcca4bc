//! # Field Path Engine
//!
//! Applies `path=value` parameters to a [`DynamicMessage`].
//!
//! A path is a dot separated list of segments. Each segment names a field of the current
//! message, except right after a map field (where it is the map key) and right after a
//! repeated field (where it is the element index):
//!
//! ```text
//! address.city=Paris        nested message, created on first use
//! tags.0=a                  repeated scalar
//! items.0.sku=A1            repeated message, `items.0.quantity=2` then fills the same element
//! scores.alice=42           map<string, int32>
//! locations.home.city=Rome  map<string, Address>
//! limit=10                  message field handled by a codec (google.protobuf.Int32Value)
//! ```
//!
//! Repeated indices must be given in order: the current length appends a new element and
//! the last index reuses the most recently appended one. Anything else is rejected.
use crate::codec::{CodecError, CodecRegistry, ValueFormatError, scalar};
use crate::message::{FieldError, MessageFields, map_entry_fields};
use prost_reflect::{DynamicMessage, FieldDescriptor, Kind, MapKey, ReflectMessage, Value};
use std::fmt::{self, Display};
use std::str::FromStr;

/// A parameter could not be split into a path and a value.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid parameter '{0}': expected the form path=value")]
pub struct ParamError(pub String);

/// One `path=value` assignment, split on the first `=`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeParam {
    pub path: String,
    pub value: String,
}

impl InvokeParam {
    pub fn new(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            value: value.into(),
        }
    }
}

impl FromStr for InvokeParam {
    type Err = ParamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.split_once('=') {
            Some((path, value)) if !path.is_empty() => Ok(Self::new(path, value)),
            _ => Err(ParamError(s.to_string())),
        }
    }
}

impl Display for InvokeParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={}", self.path, self.value)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("Unknown field '{segment}' in message '{message}' (path '{path}')")]
    UnknownField {
        path: String,
        segment: String,
        message: String,
    },
    #[error("Cannot assign path '{path}': {source}")]
    Field {
        path: String,
        #[source]
        source: FieldError,
    },
    #[error("Invalid value for path '{path}': {source}")]
    ValueFormat {
        path: String,
        #[source]
        source: ValueFormatError,
    },
    #[error("Invalid value for path '{path}': {source}")]
    Codec {
        path: String,
        #[source]
        source: CodecError,
    },
    #[error("Field '{field}' of type '{type_name}' cannot be set from text (path '{path}')")]
    UnsupportedType {
        path: String,
        field: String,
        type_name: String,
    },
    #[error("'{segment}' is not a valid index for repeated field '{field}' (path '{path}')")]
    InvalidIndex {
        path: String,
        field: String,
        segment: String,
    },
    #[error("Path '{path}' ends at '{field}', which needs a {expected} segment")]
    MissingSegment {
        path: String,
        field: String,
        expected: &'static str,
    },
    #[error("Field '{field}' is not a message, cannot descend into '{rest}' (path '{path}')")]
    CannotDescend {
        path: String,
        field: String,
        rest: String,
    },
}

/// Where a value goes in the current message.
#[derive(Debug, Clone)]
enum Slot {
    Field,
    MapEntry(MapKey),
    Append,
    RepeatedAt(usize),
}

/// Resolves field paths against a message and assigns typed values parsed from text.
#[derive(Debug, Clone, Default)]
pub struct FieldPathEngine {
    registry: CodecRegistry,
}

impl FieldPathEngine {
    pub fn new(registry: CodecRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &CodecRegistry {
        &self.registry
    }

    /// Applies one parameter to `message`.
    ///
    /// On error the message may have been partially modified and should be discarded.
    pub fn apply(&self, message: &mut DynamicMessage, param: &InvokeParam) -> Result<(), PathError> {
        self.assign(message, &param.path, &param.value)
    }

    /// Assigns `text` to the field addressed by `path`, creating intermediate messages,
    /// map entries and list elements as needed.
    pub fn assign(
        &self,
        message: &mut DynamicMessage,
        path: &str,
        text: &str,
    ) -> Result<(), PathError> {
        tracing::trace!(message = message.descriptor().full_name(), path, "assigning path");
        Walk {
            registry: &self.registry,
            path,
            text,
        }
        .field(message, path)
    }
}

struct Walk<'a> {
    registry: &'a CodecRegistry,
    path: &'a str,
    text: &'a str,
}

impl Walk<'_> {
    /// `rest` starts with a field name of `message`.
    fn field(&self, message: &mut DynamicMessage, rest: &str) -> Result<(), PathError> {
        let (head, tail) = split_segment(rest);
        let field = message
            .find_field_by_name(head)
            .map_err(|_| PathError::UnknownField {
                path: self.path.to_string(),
                segment: head.to_string(),
                message: message.descriptor().full_name().to_string(),
            })?;

        self.slot(message, &field, Slot::Field, tail)
    }

    fn slot(
        &self,
        message: &mut DynamicMessage,
        field: &FieldDescriptor,
        slot: Slot,
        rest: Option<&str>,
    ) -> Result<(), PathError> {
        let Some(rest) = rest else {
            return self.store(message, field, slot);
        };

        if matches!(slot, Slot::Field) {
            if let Some((key_field, _)) = map_entry_fields(field) {
                let (segment, tail) = split_segment(rest);
                let key = scalar::parse_map_key(&key_field.kind(), segment)
                    .map_err(|source| self.value_format(source))?;
                return self.slot(message, field, Slot::MapEntry(key), tail);
            }

            if field.is_list() {
                let (segment, tail) = split_segment(rest);
                let slot = self.repeated_slot(message, field, segment)?;
                return self.slot(message, field, slot, tail);
            }
        }

        self.descend(message, field, slot, rest)
    }

    /// Terminal segment: parse the text and write it into `slot`.
    fn store(
        &self,
        message: &mut DynamicMessage,
        field: &FieldDescriptor,
        slot: Slot,
    ) -> Result<(), PathError> {
        if matches!(slot, Slot::Field) && (field.is_map() || field.is_list()) {
            return Err(PathError::MissingSegment {
                path: self.path.to_string(),
                field: field.full_name().to_string(),
                expected: if field.is_map() { "map key" } else { "index" },
            });
        }

        let target = element_field(field, &slot);
        let value = self.parse_leaf(&target)?;

        let stored = match slot {
            Slot::Field => message.assign_field(field, value),
            Slot::MapEntry(key) => message.put_map_entry(field, key, value),
            Slot::Append => message.append_repeated(field, value),
            Slot::RepeatedAt(index) => message.set_repeated_at(field, index, value),
        };
        stored.map_err(|source| self.field_error(source))
    }

    /// Non-terminal segment on a message-typed slot: find or create the submessage and
    /// continue with the remaining path inside it.
    fn descend(
        &self,
        message: &mut DynamicMessage,
        field: &FieldDescriptor,
        slot: Slot,
        rest: &str,
    ) -> Result<(), PathError> {
        let target = element_field(field, &slot);
        let Kind::Message(child_type) = target.kind() else {
            return Err(PathError::CannotDescend {
                path: self.path.to_string(),
                field: field.full_name().to_string(),
                rest: rest.to_string(),
            });
        };

        let child = match slot {
            Slot::Field => message.message_mut(field),
            Slot::MapEntry(key) => message.map_message_mut(field, key),
            Slot::Append => {
                message
                    .append_repeated(field, Value::Message(DynamicMessage::new(child_type)))
                    .map_err(|source| self.field_error(source))?;
                let len = message
                    .repeated_len(field)
                    .map_err(|source| self.field_error(source))?;
                message.repeated_message_mut(field, len - 1)
            }
            Slot::RepeatedAt(index) => message.repeated_message_mut(field, index),
        }
        .map_err(|source| self.field_error(source))?;

        self.field(child, rest)
    }

    fn repeated_slot(
        &self,
        message: &DynamicMessage,
        field: &FieldDescriptor,
        segment: &str,
    ) -> Result<Slot, PathError> {
        let invalid = || PathError::InvalidIndex {
            path: self.path.to_string(),
            field: field.full_name().to_string(),
            segment: segment.to_string(),
        };
        // Digits only: `usize::from_str` would also take a leading `+`.
        if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
            return Err(invalid());
        }
        let index: usize = segment.parse().map_err(|_| invalid())?;
        let len = message
            .repeated_len(field)
            .map_err(|source| self.field_error(source))?;

        if index == len {
            Ok(Slot::Append)
        } else if len > 0 && index == len - 1 {
            Ok(Slot::RepeatedAt(index))
        } else {
            Err(self.field_error(FieldError::IndexOrder {
                field: field.full_name().to_string(),
                index,
                len,
            }))
        }
    }

    fn parse_leaf(&self, target: &FieldDescriptor) -> Result<Value, PathError> {
        if let Some(parsed) = scalar::parse(&target.kind(), self.text) {
            return parsed.map_err(|source| self.value_format(source));
        }

        match self.registry.parse(target, self.text) {
            Some(parsed) => parsed.map_err(|source| PathError::Codec {
                path: self.path.to_string(),
                source,
            }),
            None => Err(self.unsupported(target)),
        }
    }

    fn unsupported(&self, field: &FieldDescriptor) -> PathError {
        let type_name = match field.kind() {
            Kind::Message(message) => message.full_name().to_string(),
            other => scalar::kind_name(&other).to_string(),
        };

        PathError::UnsupportedType {
            path: self.path.to_string(),
            field: field.full_name().to_string(),
            type_name,
        }
    }

    fn value_format(&self, source: ValueFormatError) -> PathError {
        PathError::ValueFormat {
            path: self.path.to_string(),
            source,
        }
    }

    fn field_error(&self, source: FieldError) -> PathError {
        PathError::Field {
            path: self.path.to_string(),
            source,
        }
    }
}

/// The field whose kind governs values stored in `slot`: the map value field for map
/// entries, the field itself otherwise (a repeated field's kind is its element kind).
fn element_field(field: &FieldDescriptor, slot: &Slot) -> FieldDescriptor {
    match slot {
        Slot::MapEntry(_) => map_entry_fields(field)
            .map(|(_, value)| value)
            .unwrap_or_else(|| field.clone()),
        _ => field.clone(),
    }
}

fn split_segment(path: &str) -> (&str, Option<&str>) {
    match path.split_once('.') {
        Some((head, tail)) => (head, Some(tail)),
        None => (path, None),
    }
}
