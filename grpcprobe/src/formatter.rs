use colored::*;
use grpcprobe_core::client::ProbeError;
use grpcprobe_core::tonic::Status;

/// A colored message for the terminal.
///
/// Implements `Display` so it can be printed directly.
pub struct FormattedString(pub String);

impl std::fmt::Display for FormattedString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f)?;
        writeln!(f, "{}", self.0)?;
        Ok(())
    }
}

impl FormattedString {
    pub fn notice(message: &str) -> Self {
        FormattedString(message.yellow().to_string())
    }
}

impl From<&Status> for FormattedString {
    fn from(status: &Status) -> Self {
        FormattedString(format!(
            "{} code={:?} message={:?}",
            "gRPC Failed:".red().bold(),
            status.code(),
            status.message()
        ))
    }
}

impl From<anyhow::Error> for FormattedString {
    fn from(err: anyhow::Error) -> Self {
        let probe_error = err.downcast_ref::<ProbeError>();

        if let Some(ProbeError::Rpc(status)) = probe_error {
            return FormattedString::from(status);
        }

        let headline = match probe_error {
            Some(ProbeError::SymbolNotFound(_) | ProbeError::NotAMethod { .. }) => {
                "Symbol Lookup Failed:"
            }
            Some(ProbeError::Connection(_)) => "Connection Error:",
            Some(ProbeError::Param(_) | ProbeError::Path(_)) => "Invalid Parameter:",
            Some(ProbeError::DeadlineExceeded(_) | ProbeError::Cancelled) => "Call Aborted:",
            Some(_) => "Call Failed:",
            None => "Error:",
        };

        let mut out = format!("{}\n\n'{}'", headline.red().bold(), err);
        for cause in err.chain().skip(1) {
            out.push_str(&format!("\n  {} {}", "caused by:".yellow(), cause));
        }
        FormattedString(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn render(err: anyhow::Error) -> String {
        colored::control::set_override(false);
        FormattedString::from(err).0
    }

    #[test]
    fn test_rpc_errors_show_the_status() {
        let err = anyhow::Error::from(ProbeError::Rpc(Status::not_found("no such order")));

        let text = render(err);
        assert_eq!(text, "gRPC Failed: code=NotFound message=\"no such order\"");
    }

    #[test]
    fn test_headline_follows_the_error() {
        let err = anyhow::Error::from(ProbeError::SymbolNotFound("pkg.Ghost".to_string()));
        assert!(render(err).starts_with("Symbol Lookup Failed:"));

        let err = anyhow::Error::from(ProbeError::DeadlineExceeded(Duration::from_secs(1)));
        assert!(render(err).starts_with("Call Aborted:"));

        let err = anyhow::anyhow!("boom");
        assert_eq!(render(err), "Error:\n\n'boom'");
    }

    #[test]
    fn test_context_keeps_the_cause_chain() {
        let err = anyhow::Error::from(ProbeError::Cancelled).context("Failed to invoke 'pkg.S/M'");

        let text = render(err);
        assert!(text.starts_with("Call Aborted:\n\n'Failed to invoke 'pkg.S/M''"));
        assert!(text.ends_with("caused by: Call cancelled"));
    }
}
