//! # Value Formatter
//!
//! Renders a populated message as indented `name: value` lines.
//!
//! ```text
//! customer: alice
//! address:
//! 	city: Paris
//! tags[]:
//! 	- a
//! 	- b
//! scores[map]:
//! 	- alice: 42
//! items[]:
//! 	-
//! 		sku: A1
//! limit: 10
//! ```
//!
//! Unset fields are skipped. Message-typed values go through the getter chain of the
//! [`CodecRegistry`] first and are only expanded field by field when no getter applies.
use crate::codec::{CodecError, CodecRegistry, scalar};
use crate::message::map_entry_fields;
use prost_reflect::{DynamicMessage, FieldDescriptor, Kind, MapKey, ReflectMessage, Value};
use std::cmp::Ordering;

#[derive(Debug, Clone, Default)]
pub struct ValueFormatter {
    registry: CodecRegistry,
}

impl ValueFormatter {
    pub fn new(registry: CodecRegistry) -> Self {
        Self { registry }
    }

    pub fn format(&self, message: &DynamicMessage) -> Result<String, CodecError> {
        let mut out = String::new();
        self.write_message(&mut out, message, 0)?;
        Ok(out)
    }

    fn write_message(
        &self,
        out: &mut String,
        message: &DynamicMessage,
        level: usize,
    ) -> Result<(), CodecError> {
        for field in message.descriptor().fields() {
            if !message.has_field(&field) {
                continue;
            }
            let value = message.get_field(&field);
            self.write_field(out, &field, &value, level)?;
        }
        Ok(())
    }

    fn write_field(
        &self,
        out: &mut String,
        field: &FieldDescriptor,
        value: &Value,
        level: usize,
    ) -> Result<(), CodecError> {
        if let Some((_, value_field)) = map_entry_fields(field) {
            line(out, level, &format!("{}[map]:", field.name()));

            let Some(map) = value.as_map() else {
                return Err(unexpected(field));
            };
            let mut entries: Vec<_> = map.iter().collect();
            entries.sort_by(|(a, _), (b, _)| key_order(a, b));

            for (key, entry) in entries {
                let key = scalar::format_map_key(key);
                self.write_element(out, &value_field, Some(&key), entry, level + 1)?;
            }
            return Ok(());
        }

        if field.is_list() {
            line(out, level, &format!("{}[]:", field.name()));

            let Some(items) = value.as_list() else {
                return Err(unexpected(field));
            };
            for item in items {
                self.write_element(out, field, None, item, level + 1)?;
            }
            return Ok(());
        }

        match self.inline(field, value)? {
            Some(text) => line(out, level, &format!("{}: {text}", field.name())),
            None => {
                line(out, level, &format!("{}:", field.name()));
                self.write_nested(out, field, value, level + 1)?;
            }
        }
        Ok(())
    }

    /// One map entry (`key` is set) or list element.
    fn write_element(
        &self,
        out: &mut String,
        field: &FieldDescriptor,
        key: Option<&str>,
        value: &Value,
        level: usize,
    ) -> Result<(), CodecError> {
        match self.inline(field, value)? {
            Some(text) => match key {
                Some(key) => line(out, level, &format!("- {key}: {text}")),
                None => line(out, level, &format!("- {text}")),
            },
            None => {
                match key {
                    Some(key) => line(out, level, &format!("- {key}")),
                    None => line(out, level, "-"),
                }
                self.write_nested(out, field, value, level + 1)?;
            }
        }
        Ok(())
    }

    /// Text for values that fit on one line: codec getters first, then scalars.
    /// `None` means the value is a message to expand.
    fn inline(&self, field: &FieldDescriptor, value: &Value) -> Result<Option<String>, CodecError> {
        if let Some(text) = self.registry.format(field, value) {
            return text.map(Some);
        }

        match field.kind() {
            Kind::Message(_) => Ok(None),
            kind => scalar::format(&kind, value)
                .map(Some)
                .ok_or_else(|| unexpected(field)),
        }
    }

    fn write_nested(
        &self,
        out: &mut String,
        field: &FieldDescriptor,
        value: &Value,
        level: usize,
    ) -> Result<(), CodecError> {
        let message = value.as_message().ok_or_else(|| unexpected(field))?;
        self.write_message(out, message, level)
    }
}

fn unexpected(field: &FieldDescriptor) -> CodecError {
    CodecError::UnexpectedValue {
        field: field.full_name().to_string(),
        type_name: scalar::kind_name(&field.kind()).to_string(),
    }
}

/// Numeric keys sort numerically, string keys lexicographically.
fn key_order(a: &MapKey, b: &MapKey) -> Ordering {
    match (a, b) {
        (MapKey::Bool(a), MapKey::Bool(b)) => a.cmp(b),
        (MapKey::I32(a), MapKey::I32(b)) => a.cmp(b),
        (MapKey::I64(a), MapKey::I64(b)) => a.cmp(b),
        (MapKey::U32(a), MapKey::U32(b)) => a.cmp(b),
        (MapKey::U64(a), MapKey::U64(b)) => a.cmp(b),
        (MapKey::String(a), MapKey::String(b)) => a.cmp(b),
        _ => scalar::format_map_key(a).cmp(&scalar::format_map_key(b)),
    }
}

fn line(out: &mut String, level: usize, text: &str) {
    out.extend(std::iter::repeat_n('\t', level));
    out.push_str(text);
    out.push('\n');
}
