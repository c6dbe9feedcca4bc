//! # Dynamic Message Model
//!
//! Typed, fallible field access on top of `prost_reflect::DynamicMessage`.
//!
//! `DynamicMessage` already stores field values generically against a `MessageDescriptor`
//! and knows how to encode itself. What it does not do is report misuse as data: its
//! setters panic on a value of the wrong kind. [`MessageFields`] wraps each access in a
//! check against the bound descriptor and returns a [`FieldError`] naming the field
//! instead, which is what the field path engine needs to build requests from user input.
//!
//! Nested messages are owned by the slot of their parent (a singular field, a map entry or
//! a list element), so a request is always a finite tree reachable only from its root.
use prost_reflect::{
    DynamicMessage, FieldDescriptor, Kind, MapKey, MessageDescriptor, ReflectMessage, Value,
};
use std::borrow::Cow;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FieldError {
    #[error("Field '{field}' does not exist in message '{message}'")]
    UnknownField { field: String, message: String },
    #[error("Field '{field}' expects {expected} but was given {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },
    #[error("Field '{field}' is not a map")]
    NotAMap { field: String },
    #[error("Field '{field}' is not a repeated field")]
    NotRepeated { field: String },
    #[error("Index {index} is out of range for repeated field '{field}' of length {len}")]
    IndexOutOfRange {
        field: String,
        index: usize,
        len: usize,
    },
    /// Repeated elements are addressed in order: `len` appends, `len - 1` reuses the last.
    #[error(
        "Index {index} of repeated field '{field}' is out of order: length is {len}, expected {len} or the last index"
    )]
    IndexOrder {
        field: String,
        index: usize,
        len: usize,
    },
}

/// Field-level operations of the dynamic message model.
///
/// Every method checks that `field` belongs to the message's descriptor; map and repeated
/// operations additionally require the field to be declared as such.
pub trait MessageFields {
    /// Looks up a field of this message by its declared name.
    fn find_field_by_name(&self, name: &str) -> Result<FieldDescriptor, FieldError>;

    /// Whether `field` holds a value. Message-typed fields are set once assigned, even
    /// when the assigned message is empty.
    fn is_field_set(&self, field: &FieldDescriptor) -> bool;

    /// The value of `field`, or its default when unset.
    fn field_value(&self, field: &FieldDescriptor) -> Result<Cow<'_, Value>, FieldError>;

    /// Assigns `value` to `field`, replacing any previous value.
    fn assign_field(&mut self, field: &FieldDescriptor, value: Value) -> Result<(), FieldError>;

    fn has_map_entry(&self, field: &FieldDescriptor, key: &MapKey) -> Result<bool, FieldError>;

    fn map_entry(&self, field: &FieldDescriptor, key: &MapKey)
    -> Result<Option<Value>, FieldError>;

    /// Inserts or replaces one map entry, creating the map on first use.
    fn put_map_entry(
        &mut self,
        field: &FieldDescriptor,
        key: MapKey,
        value: Value,
    ) -> Result<(), FieldError>;

    fn repeated_len(&self, field: &FieldDescriptor) -> Result<usize, FieldError>;

    fn repeated_at(&self, field: &FieldDescriptor, index: usize)
    -> Result<Option<Value>, FieldError>;

    fn append_repeated(&mut self, field: &FieldDescriptor, value: Value) -> Result<(), FieldError>;

    /// Replaces an existing element. Fails with [`FieldError::IndexOutOfRange`] past the end.
    fn set_repeated_at(
        &mut self,
        field: &FieldDescriptor,
        index: usize,
        value: Value,
    ) -> Result<(), FieldError>;

    /// The submessage held by a singular message field, created empty (and thereby set)
    /// if the field was unset.
    fn message_mut(&mut self, field: &FieldDescriptor) -> Result<&mut DynamicMessage, FieldError>;

    /// The submessage held by a map entry, inserting an empty one if the key is absent.
    fn map_message_mut(
        &mut self,
        field: &FieldDescriptor,
        key: MapKey,
    ) -> Result<&mut DynamicMessage, FieldError>;

    /// The submessage held by an existing list element.
    fn repeated_message_mut(
        &mut self,
        field: &FieldDescriptor,
        index: usize,
    ) -> Result<&mut DynamicMessage, FieldError>;
}

impl MessageFields for DynamicMessage {
    fn find_field_by_name(&self, name: &str) -> Result<FieldDescriptor, FieldError> {
        let descriptor = self.descriptor();
        descriptor
            .get_field_by_name(name)
            .ok_or_else(|| FieldError::UnknownField {
                field: name.to_string(),
                message: descriptor.full_name().to_string(),
            })
    }

    fn is_field_set(&self, field: &FieldDescriptor) -> bool {
        owns(self, field) && self.has_field(field)
    }

    fn field_value(&self, field: &FieldDescriptor) -> Result<Cow<'_, Value>, FieldError> {
        ensure_owned(self, field)?;
        Ok(self.get_field(field))
    }

    fn assign_field(&mut self, field: &FieldDescriptor, value: Value) -> Result<(), FieldError> {
        ensure_owned(self, field)?;
        if !value_matches_field(field, &value) {
            return Err(mismatch(field, field_type_name(field), &value));
        }
        self.try_set_field(field, value)
            .map_err(|err| FieldError::TypeMismatch {
                field: field.full_name().to_string(),
                expected: field_type_name(field),
                found: err.to_string(),
            })
    }

    fn has_map_entry(&self, field: &FieldDescriptor, key: &MapKey) -> Result<bool, FieldError> {
        ensure_map(self, field)?;
        Ok(self
            .get_field(field)
            .as_map()
            .is_some_and(|map| map.contains_key(key)))
    }

    fn map_entry(
        &self,
        field: &FieldDescriptor,
        key: &MapKey,
    ) -> Result<Option<Value>, FieldError> {
        ensure_map(self, field)?;
        Ok(self
            .get_field(field)
            .as_map()
            .and_then(|map| map.get(key).cloned()))
    }

    fn put_map_entry(
        &mut self,
        field: &FieldDescriptor,
        key: MapKey,
        value: Value,
    ) -> Result<(), FieldError> {
        let (key_field, value_field) = ensure_map(self, field)?;
        if !key_matches_kind(&key, &key_field.kind()) {
            return Err(FieldError::TypeMismatch {
                field: field.full_name().to_string(),
                expected: format!("{} key", field_type_name(&key_field)),
                found: format!("{key:?}"),
            });
        }
        if !value_matches_kind(&value, &value_field.kind()) {
            return Err(mismatch(field, field_type_name(&value_field), &value));
        }

        map_slot(self, field)?.insert(key, value);
        Ok(())
    }

    fn repeated_len(&self, field: &FieldDescriptor) -> Result<usize, FieldError> {
        ensure_list(self, field)?;
        Ok(self.get_field(field).as_list().map_or(0, <[Value]>::len))
    }

    fn repeated_at(
        &self,
        field: &FieldDescriptor,
        index: usize,
    ) -> Result<Option<Value>, FieldError> {
        ensure_list(self, field)?;
        Ok(self
            .get_field(field)
            .as_list()
            .and_then(|list| list.get(index).cloned()))
    }

    fn append_repeated(&mut self, field: &FieldDescriptor, value: Value) -> Result<(), FieldError> {
        ensure_list(self, field)?;
        if !value_matches_kind(&value, &field.kind()) {
            return Err(mismatch(field, field_type_name(field), &value));
        }

        list_slot(self, field)?.push(value);
        Ok(())
    }

    fn set_repeated_at(
        &mut self,
        field: &FieldDescriptor,
        index: usize,
        value: Value,
    ) -> Result<(), FieldError> {
        ensure_list(self, field)?;
        if !value_matches_kind(&value, &field.kind()) {
            return Err(mismatch(field, field_type_name(field), &value));
        }

        let list = list_slot(self, field)?;
        let len = list.len();
        let slot = list
            .get_mut(index)
            .ok_or_else(|| FieldError::IndexOutOfRange {
                field: field.full_name().to_string(),
                index,
                len,
            })?;
        *slot = value;
        Ok(())
    }

    fn message_mut(&mut self, field: &FieldDescriptor) -> Result<&mut DynamicMessage, FieldError> {
        ensure_owned(self, field)?;
        if field.is_list() || field.is_map() {
            return Err(FieldError::TypeMismatch {
                field: field.full_name().to_string(),
                expected: field_type_name(field),
                found: "a single message".to_string(),
            });
        }
        let expected = message_kind(field)?;

        // An unset message field is inserted with its default, an empty message.
        self.get_field_mut(field)
            .as_message_mut()
            .ok_or_else(|| FieldError::TypeMismatch {
                field: field.full_name().to_string(),
                expected: format!("message {}", expected.full_name()),
                found: "a non-message value".to_string(),
            })
    }

    fn map_message_mut(
        &mut self,
        field: &FieldDescriptor,
        key: MapKey,
    ) -> Result<&mut DynamicMessage, FieldError> {
        let (_, value_field) = ensure_map(self, field)?;
        let expected = message_kind(&value_field)?;

        map_slot(self, field)?
            .entry(key)
            .or_insert_with(|| Value::Message(DynamicMessage::new(expected.clone())))
            .as_message_mut()
            .ok_or_else(|| FieldError::TypeMismatch {
                field: field.full_name().to_string(),
                expected: format!("message {}", expected.full_name()),
                found: "a non-message value".to_string(),
            })
    }

    fn repeated_message_mut(
        &mut self,
        field: &FieldDescriptor,
        index: usize,
    ) -> Result<&mut DynamicMessage, FieldError> {
        ensure_list(self, field)?;
        message_kind(field)?;

        let list = list_slot(self, field)?;
        let len = list.len();
        list.get_mut(index)
            .ok_or_else(|| FieldError::IndexOutOfRange {
                field: field.full_name().to_string(),
                index,
                len,
            })?
            .as_message_mut()
            .ok_or_else(|| FieldError::TypeMismatch {
                field: field.full_name().to_string(),
                expected: field_type_name(field),
                found: "a non-message value".to_string(),
            })
    }
}

/// Whether `value` can be stored as a single value of `kind`.
pub fn value_matches_kind(value: &Value, kind: &Kind) -> bool {
    match (value, kind) {
        (Value::Bool(_), Kind::Bool)
        | (Value::I32(_), Kind::Int32 | Kind::Sint32 | Kind::Sfixed32)
        | (Value::I64(_), Kind::Int64 | Kind::Sint64 | Kind::Sfixed64)
        | (Value::U32(_), Kind::Uint32 | Kind::Fixed32)
        | (Value::U64(_), Kind::Uint64 | Kind::Fixed64)
        | (Value::F32(_), Kind::Float)
        | (Value::F64(_), Kind::Double)
        | (Value::String(_), Kind::String)
        | (Value::Bytes(_), Kind::Bytes)
        | (Value::EnumNumber(_), Kind::Enum(_)) => true,
        (Value::Message(message), Kind::Message(expected)) => {
            message.descriptor().full_name() == expected.full_name()
        }
        _ => false,
    }
}

/// Whether `value` can be assigned to `field` as a whole (a list for repeated fields,
/// a map for map fields).
pub fn value_matches_field(field: &FieldDescriptor, value: &Value) -> bool {
    if field.is_map() {
        let Some((key_field, value_field)) = map_entry_fields(field) else {
            return false;
        };
        return value.as_map().is_some_and(|map| {
            map.iter().all(|(k, v)| {
                key_matches_kind(k, &key_field.kind()) && value_matches_kind(v, &value_field.kind())
            })
        });
    }

    if field.is_list() {
        let kind = field.kind();
        return value
            .as_list()
            .is_some_and(|items| items.iter().all(|item| value_matches_kind(item, &kind)));
    }

    value_matches_kind(value, &field.kind())
}

/// The key and value fields of a map field's synthetic entry message.
pub fn map_entry_fields(field: &FieldDescriptor) -> Option<(FieldDescriptor, FieldDescriptor)> {
    match field.kind() {
        Kind::Message(entry) if field.is_map() => {
            Some((entry.map_entry_key_field(), entry.map_entry_value_field()))
        }
        _ => None,
    }
}

fn key_matches_kind(key: &MapKey, kind: &Kind) -> bool {
    matches!(
        (key, kind),
        (MapKey::Bool(_), Kind::Bool)
            | (MapKey::I32(_), Kind::Int32 | Kind::Sint32 | Kind::Sfixed32)
            | (MapKey::I64(_), Kind::Int64 | Kind::Sint64 | Kind::Sfixed64)
            | (MapKey::U32(_), Kind::Uint32 | Kind::Fixed32)
            | (MapKey::U64(_), Kind::Uint64 | Kind::Fixed64)
            | (MapKey::String(_), Kind::String)
    )
}

fn owns(message: &DynamicMessage, field: &FieldDescriptor) -> bool {
    message
        .descriptor()
        .get_field(field.number())
        .is_some_and(|own| own.full_name() == field.full_name())
}

fn ensure_owned(message: &DynamicMessage, field: &FieldDescriptor) -> Result<(), FieldError> {
    if owns(message, field) {
        Ok(())
    } else {
        Err(FieldError::UnknownField {
            field: field.full_name().to_string(),
            message: message.descriptor().full_name().to_string(),
        })
    }
}

fn ensure_map(
    message: &DynamicMessage,
    field: &FieldDescriptor,
) -> Result<(FieldDescriptor, FieldDescriptor), FieldError> {
    ensure_owned(message, field)?;
    map_entry_fields(field).ok_or_else(|| FieldError::NotAMap {
        field: field.full_name().to_string(),
    })
}

fn ensure_list(message: &DynamicMessage, field: &FieldDescriptor) -> Result<(), FieldError> {
    ensure_owned(message, field)?;
    if field.is_list() {
        Ok(())
    } else {
        Err(FieldError::NotRepeated {
            field: field.full_name().to_string(),
        })
    }
}

fn message_kind(field: &FieldDescriptor) -> Result<MessageDescriptor, FieldError> {
    match field.kind() {
        Kind::Message(message) => Ok(message),
        other => Err(FieldError::TypeMismatch {
            field: field.full_name().to_string(),
            expected: crate::codec::scalar::kind_name(&other).to_string(),
            found: "a message".to_string(),
        }),
    }
}

fn map_slot<'a>(
    message: &'a mut DynamicMessage,
    field: &FieldDescriptor,
) -> Result<&'a mut std::collections::HashMap<MapKey, Value>, FieldError> {
    message
        .get_field_mut(field)
        .as_map_mut()
        .ok_or_else(|| FieldError::NotAMap {
            field: field.full_name().to_string(),
        })
}

fn list_slot<'a>(
    message: &'a mut DynamicMessage,
    field: &FieldDescriptor,
) -> Result<&'a mut Vec<Value>, FieldError> {
    message
        .get_field_mut(field)
        .as_list_mut()
        .ok_or_else(|| FieldError::NotRepeated {
            field: field.full_name().to_string(),
        })
}

/// Human readable declared type of a field, e.g. `repeated string` or `map<string, int32>`.
fn field_type_name(field: &FieldDescriptor) -> String {
    let single = |f: &FieldDescriptor| match f.kind() {
        Kind::Message(m) => m.full_name().to_string(),
        Kind::Enum(e) => e.full_name().to_string(),
        other => crate::codec::scalar::kind_name(&other).to_string(),
    };

    if let Some((key, value)) = map_entry_fields(field) {
        format!("map<{}, {}>", single(&key), single(&value))
    } else if field.is_list() {
        format!("repeated {}", single(field))
    } else {
        single(field)
    }
}

fn value_type_name(value: &Value) -> String {
    match value {
        Value::Bool(_) => "bool".into(),
        Value::I32(_) => "int32".into(),
        Value::I64(_) => "int64".into(),
        Value::U32(_) => "uint32".into(),
        Value::U64(_) => "uint64".into(),
        Value::F32(_) => "float".into(),
        Value::F64(_) => "double".into(),
        Value::String(_) => "string".into(),
        Value::Bytes(_) => "bytes".into(),
        Value::EnumNumber(_) => "enum number".into(),
        Value::Message(m) => format!("message {}", m.descriptor().full_name()),
        Value::List(_) => "list".into(),
        Value::Map(_) => "map".into(),
    }
}

fn mismatch(field: &FieldDescriptor, expected: String, value: &Value) -> FieldError {
    FieldError::TypeMismatch {
        field: field.full_name().to_string(),
        expected,
        found: value_type_name(value),
    }
}
