//! # Output Sinks
//!
//! Where the client's results go. [`TextOutput`] renders through the descriptor and value
//! formatters, [`JsonOutput`] emits machine readable JSON for invocation results and
//! service lists. Both write to any `io::Write`, so tests can collect into a `Vec<u8>`.
use super::{DescriptorFormatter, ValueFormatter};
use crate::client::{Descriptor, InvokeResponse};
use crate::codec::{CodecError, CodecRegistry};
use prost_reflect::ServiceDescriptor;
use std::io;

#[derive(Debug, thiserror::Error)]
pub enum OutputError {
    #[error("Failed to write output: '{0}'")]
    Io(#[from] io::Error),
    #[error("Failed to render value: '{0}'")]
    Codec(#[from] CodecError),
    #[error("Failed to serialize output as JSON: '{0}'")]
    Json(#[from] serde_json::Error),
}

/// Receives the results of the client's operations.
pub trait OutputSink {
    fn service_list(&mut self, services: &[String]) -> Result<(), OutputError>;

    fn service(&mut self, service: &ServiceDescriptor) -> Result<(), OutputError>;

    fn describe(&mut self, descriptor: &Descriptor) -> Result<(), OutputError>;

    fn invoke(&mut self, response: &InvokeResponse) -> Result<(), OutputError>;
}

impl<S: OutputSink + ?Sized> OutputSink for Box<S> {
    fn service_list(&mut self, services: &[String]) -> Result<(), OutputError> {
        (**self).service_list(services)
    }

    fn service(&mut self, service: &ServiceDescriptor) -> Result<(), OutputError> {
        (**self).service(service)
    }

    fn describe(&mut self, descriptor: &Descriptor) -> Result<(), OutputError> {
        (**self).describe(descriptor)
    }

    fn invoke(&mut self, response: &InvokeResponse) -> Result<(), OutputError> {
        (**self).invoke(response)
    }
}

/// Indented text, one node or field per line.
#[derive(Debug)]
pub struct TextOutput<W> {
    writer: W,
    descriptors: DescriptorFormatter,
    values: ValueFormatter,
}

impl<W: io::Write> TextOutput<W> {
    pub fn new(writer: W, registry: CodecRegistry) -> Self {
        Self {
            writer,
            descriptors: DescriptorFormatter::new(),
            values: ValueFormatter::new(registry),
        }
    }

    /// Expands request and response shapes when describing methods.
    pub fn verbose(mut self, verbose: bool) -> Self {
        self.descriptors = self.descriptors.verbose(verbose);
        self
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: io::Write> OutputSink for TextOutput<W> {
    fn service_list(&mut self, services: &[String]) -> Result<(), OutputError> {
        for service in services {
            writeln!(self.writer, "{service}")?;
        }
        Ok(())
    }

    fn service(&mut self, service: &ServiceDescriptor) -> Result<(), OutputError> {
        let text = self.descriptors.format_service(service);
        self.writer.write_all(text.as_bytes())?;
        Ok(())
    }

    fn describe(&mut self, descriptor: &Descriptor) -> Result<(), OutputError> {
        let text = self.descriptors.format(descriptor);
        self.writer.write_all(text.as_bytes())?;
        Ok(())
    }

    fn invoke(&mut self, response: &InvokeResponse) -> Result<(), OutputError> {
        let text = self.values.format(&response.message)?;
        self.writer.write_all(text.as_bytes())?;
        Ok(())
    }
}

/// Pretty-printed JSON. Descriptors have no JSON form and are rendered as text.
#[derive(Debug)]
pub struct JsonOutput<W> {
    writer: W,
    descriptors: DescriptorFormatter,
}

impl<W: io::Write> JsonOutput<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            descriptors: DescriptorFormatter::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }

    fn write_json(&mut self, value: &serde_json::Value) -> Result<(), OutputError> {
        serde_json::to_writer_pretty(&mut self.writer, value)?;
        writeln!(self.writer)?;
        Ok(())
    }
}

impl<W: io::Write> OutputSink for JsonOutput<W> {
    fn service_list(&mut self, services: &[String]) -> Result<(), OutputError> {
        self.write_json(&serde_json::json!(services))
    }

    fn service(&mut self, service: &ServiceDescriptor) -> Result<(), OutputError> {
        let text = self.descriptors.format_service(service);
        self.writer.write_all(text.as_bytes())?;
        Ok(())
    }

    fn describe(&mut self, descriptor: &Descriptor) -> Result<(), OutputError> {
        let text = self.descriptors.format(descriptor);
        self.writer.write_all(text.as_bytes())?;
        Ok(())
    }

    fn invoke(&mut self, response: &InvokeResponse) -> Result<(), OutputError> {
        let value = serde_json::to_value(&response.message)?;
        self.write_json(&value)
    }
}
