//! # Scalar Codec
//!
//! Parses user text into a typed [`Value`] and renders typed values back as text, driven
//! only by the declared kind of a field.
//!
//! The fixed-width and zig-zag integer encodings are normalized onto the four integer
//! widths (`sint32` and `sfixed32` parse exactly like `int32`, and so on). Enums are
//! carried as their number. Message kinds are *not* scalar: [`ScalarKind::of`] returns
//! `None` for them and the caller must go through the [`CodecRegistry`](super::CodecRegistry)
//! or recurse structurally.
use prost::bytes::Bytes;
use prost_reflect::{EnumDescriptor, Kind, MapKey, Value};
use std::fmt::{self, Display};
use std::str::FromStr;

/// A piece of text could not be read as the declared scalar kind.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Cannot parse '{text}' as {kind}: {reason}")]
pub struct ValueFormatError {
    /// The offending text, exactly as supplied.
    pub text: String,
    /// The kind the text was expected to hold (e.g. `int32`).
    pub kind: String,
    pub reason: String,
}

impl ValueFormatError {
    fn new(text: &str, kind: impl Display, reason: impl Display) -> Self {
        Self {
            text: text.to_string(),
            kind: kind.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// The scalar kinds a field can be declared with, after width normalization.
#[derive(Debug, Clone)]
pub enum ScalarKind {
    String,
    Bytes,
    Int32,
    Int64,
    Uint32,
    Uint64,
    Float,
    Double,
    Bool,
    Enum(EnumDescriptor),
}

impl ScalarKind {
    /// Classifies a protobuf kind. Returns `None` for message kinds.
    pub fn of(kind: &Kind) -> Option<Self> {
        let scalar = match kind {
            Kind::String => Self::String,
            Kind::Bytes => Self::Bytes,
            Kind::Int32 | Kind::Sint32 | Kind::Sfixed32 => Self::Int32,
            Kind::Int64 | Kind::Sint64 | Kind::Sfixed64 => Self::Int64,
            Kind::Uint32 | Kind::Fixed32 => Self::Uint32,
            Kind::Uint64 | Kind::Fixed64 => Self::Uint64,
            Kind::Float => Self::Float,
            Kind::Double => Self::Double,
            Kind::Bool => Self::Bool,
            Kind::Enum(descriptor) => Self::Enum(descriptor.clone()),
            Kind::Message(_) => return None,
        };
        Some(scalar)
    }

    /// Parses `text` into a value of this kind.
    ///
    /// Enums accept their number or, failing that, one of their declared value names.
    pub fn parse(&self, text: &str) -> Result<Value, ValueFormatError> {
        let value = match self {
            Self::String => Value::String(text.to_string()),
            Self::Bytes => Value::Bytes(Bytes::copy_from_slice(text.as_bytes())),
            Self::Int32 => Value::I32(self.parse_number(text)?),
            Self::Int64 => Value::I64(self.parse_number(text)?),
            Self::Uint32 => Value::U32(self.parse_number(text)?),
            Self::Uint64 => Value::U64(self.parse_number(text)?),
            Self::Float => Value::F32(self.parse_number(text)?),
            Self::Double => Value::F64(self.parse_number(text)?),
            Self::Bool => Value::Bool(
                parse_bool(text)
                    .ok_or_else(|| ValueFormatError::new(text, self, "expected true or false"))?,
            ),
            Self::Enum(descriptor) => match text.parse::<i32>() {
                Ok(number) => Value::EnumNumber(number),
                Err(err) => descriptor
                    .get_value_by_name(text)
                    .map(|v| Value::EnumNumber(v.number()))
                    .ok_or_else(|| ValueFormatError::new(text, self, err))?,
            },
        };
        Ok(value)
    }

    /// Renders a value of this kind. Returns `None` if `value` does not hold this kind.
    pub fn format(&self, value: &Value) -> Option<String> {
        let text = match (self, value) {
            (Self::String, Value::String(v)) => v.clone(),
            (Self::Bytes, Value::Bytes(v)) => String::from_utf8_lossy(v).into_owned(),
            (Self::Int32, Value::I32(v)) => v.to_string(),
            (Self::Int64, Value::I64(v)) => v.to_string(),
            (Self::Uint32, Value::U32(v)) => v.to_string(),
            (Self::Uint64, Value::U64(v)) => v.to_string(),
            (Self::Float, Value::F32(v)) => v.to_string(),
            (Self::Double, Value::F64(v)) => v.to_string(),
            (Self::Bool, Value::Bool(v)) => v.to_string(),
            (Self::Enum(_), Value::EnumNumber(v)) => v.to_string(),
            _ => return None,
        };
        Some(text)
    }

    fn parse_number<T>(&self, text: &str) -> Result<T, ValueFormatError>
    where
        T: FromStr,
        T::Err: Display,
    {
        text.parse::<T>()
            .map_err(|err| ValueFormatError::new(text, self, err))
    }
}

impl Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::String => f.write_str("string"),
            Self::Bytes => f.write_str("bytes"),
            Self::Int32 => f.write_str("int32"),
            Self::Int64 => f.write_str("int64"),
            Self::Uint32 => f.write_str("uint32"),
            Self::Uint64 => f.write_str("uint64"),
            Self::Float => f.write_str("float"),
            Self::Double => f.write_str("double"),
            Self::Bool => f.write_str("bool"),
            Self::Enum(descriptor) => write!(f, "enum {}", descriptor.full_name()),
        }
    }
}

/// Parses `text` against a field kind. `None` means the kind is not scalar.
pub fn parse(kind: &Kind, text: &str) -> Option<Result<Value, ValueFormatError>> {
    ScalarKind::of(kind).map(|scalar| scalar.parse(text))
}

/// Renders `value` against a field kind. `None` means the kind is not scalar or the
/// value does not hold it.
pub fn format(kind: &Kind, value: &Value) -> Option<String> {
    ScalarKind::of(kind).and_then(|scalar| scalar.format(value))
}

/// Parses a map key. Only integral, bool and string kinds may key a protobuf map.
pub fn parse_map_key(kind: &Kind, text: &str) -> Result<MapKey, ValueFormatError> {
    let scalar = ScalarKind::of(kind).ok_or_else(|| {
        ValueFormatError::new(text, kind_name(kind), "map keys must be scalar")
    })?;

    match scalar.parse(text)? {
        Value::String(v) => Ok(MapKey::String(v)),
        Value::I32(v) => Ok(MapKey::I32(v)),
        Value::I64(v) => Ok(MapKey::I64(v)),
        Value::U32(v) => Ok(MapKey::U32(v)),
        Value::U64(v) => Ok(MapKey::U64(v)),
        Value::Bool(v) => Ok(MapKey::Bool(v)),
        _ => Err(ValueFormatError::new(
            text,
            scalar,
            "map keys must be integral, bool or string",
        )),
    }
}

pub fn format_map_key(key: &MapKey) -> String {
    match key {
        MapKey::String(v) => v.clone(),
        MapKey::I32(v) => v.to_string(),
        MapKey::I64(v) => v.to_string(),
        MapKey::U32(v) => v.to_string(),
        MapKey::U64(v) => v.to_string(),
        MapKey::Bool(v) => v.to_string(),
    }
}

/// Lowercase protobuf spelling of a kind (`int32`, `message`, ...).
pub fn kind_name(kind: &Kind) -> &'static str {
    match kind {
        Kind::Double => "double",
        Kind::Float => "float",
        Kind::Int32 => "int32",
        Kind::Int64 => "int64",
        Kind::Uint32 => "uint32",
        Kind::Uint64 => "uint64",
        Kind::Sint32 => "sint32",
        Kind::Sint64 => "sint64",
        Kind::Fixed32 => "fixed32",
        Kind::Fixed64 => "fixed64",
        Kind::Sfixed32 => "sfixed32",
        Kind::Sfixed64 => "sfixed64",
        Kind::Bool => "bool",
        Kind::String => "string",
        Kind::Bytes => "bytes",
        Kind::Message(_) => "message",
        Kind::Enum(_) => "enum",
    }
}

// 1/t/true and 0/f/false, in the usual casings.
fn parse_bool(text: &str) -> Option<bool> {
    match text {
        "1" | "t" | "T" | "true" | "TRUE" | "True" => Some(true),
        "0" | "f" | "F" | "false" | "FALSE" | "False" => Some(false),
        _ => None,
    }
}
