//! # Formatters
//!
//! Text renderings of schema nodes ([`descriptor`]) and populated messages ([`value`]),
//! and the [`OutputSink`] seam through which the client hands results to its caller.
pub mod descriptor;
pub mod sink;
pub mod value;

pub use descriptor::DescriptorFormatter;
pub use sink::{JsonOutput, OutputError, OutputSink, TextOutput};
pub use value::ValueFormatter;
