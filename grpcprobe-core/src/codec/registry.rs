//! # Codec Registry
//!
//! An explicit, per-engine list of [`FieldCodec`] plugins. Nothing is registered globally:
//! the registry is built once at setup time and handed to the field path engine and the
//! value formatter, so independent engines never observe each other's codecs.
//!
//! Every plugin answers with a tri-state result, encoded as `Option<Result<_, _>>`:
//!
//! * `None` - not applicable to this field, the next plugin is tried.
//! * `Some(Ok(_))` - applicable and converted.
//! * `Some(Err(_))` - applicable but the conversion failed; the chain stops here.
use super::{ValueFormatError, well_known::WellKnownCodec, wrappers::WrappersCodec};
use prost_reflect::{FieldDescriptor, Value};
use std::fmt::Debug;
use std::sync::Arc;

#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    #[error(transparent)]
    ValueFormat(#[from] ValueFormatError),
    #[error("Cannot read '{text}' as {type_name}: {reason}")]
    InvalidText {
        text: String,
        type_name: String,
        reason: String,
    },
    #[error("Value of field '{field}' is not a valid {type_name}")]
    UnexpectedValue { field: String, type_name: String },
}

/// A converter between the text form and the typed value of message-typed fields.
///
/// Implementations decide applicability from the field descriptor, normally by looking at
/// the fully-qualified name of the field's message type.
pub trait FieldCodec: Send + Sync {
    /// Short name used in logs and `Debug` output.
    fn name(&self) -> &str;

    /// Converts `text` into a value assignable to `field`.
    fn try_parse(&self, field: &FieldDescriptor, text: &str) -> Option<Result<Value, CodecError>>;

    /// Converts a value held by `field` into text.
    fn try_format(
        &self,
        field: &FieldDescriptor,
        value: &Value,
    ) -> Option<Result<String, CodecError>>;
}

/// Two ordered chains of codecs: parsers (text -> value) and getters (value -> text).
///
/// The first applicable entry wins.
#[derive(Clone, Default)]
pub struct CodecRegistry {
    parsers: Vec<Arc<dyn FieldCodec>>,
    getters: Vec<Arc<dyn FieldCodec>>,
}

impl CodecRegistry {
    /// An empty registry: only scalar fields can be read from or rendered as text.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry preloaded with the `google.protobuf` wrapper and well-known type codecs.
    pub fn with_defaults() -> Self {
        Self::new()
            .with_codec(WrappersCodec)
            .with_codec(WellKnownCodec)
    }

    /// Appends `codec` to both chains.
    pub fn with_codec(mut self, codec: impl FieldCodec + 'static) -> Self {
        let codec: Arc<dyn FieldCodec> = Arc::new(codec);
        self.parsers.push(codec.clone());
        self.getters.push(codec);
        self
    }

    /// Appends `codec` to the parser chain only.
    pub fn with_parser(mut self, codec: impl FieldCodec + 'static) -> Self {
        self.parsers.push(Arc::new(codec));
        self
    }

    /// Appends `codec` to the getter chain only.
    pub fn with_getter(mut self, codec: impl FieldCodec + 'static) -> Self {
        self.getters.push(Arc::new(codec));
        self
    }

    /// Runs the parser chain. `None` means no codec applies to `field`.
    pub fn parse(&self, field: &FieldDescriptor, text: &str) -> Option<Result<Value, CodecError>> {
        self.parsers.iter().find_map(|codec| {
            let outcome = codec.try_parse(field, text);
            if outcome.is_some() {
                tracing::trace!(codec = codec.name(), field = field.full_name(), "parser applied");
            }
            outcome
        })
    }

    /// Runs the getter chain. `None` means no codec applies to `field`.
    pub fn format(
        &self,
        field: &FieldDescriptor,
        value: &Value,
    ) -> Option<Result<String, CodecError>> {
        self.getters
            .iter()
            .find_map(|codec| codec.try_format(field, value))
    }
}

impl Debug for CodecRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CodecRegistry")
            .field("parsers", &self.parsers.iter().map(|c| c.name()).collect::<Vec<_>>())
            .field("getters", &self.getters.iter().map(|c| c.name()).collect::<Vec<_>>())
            .finish()
    }
}
