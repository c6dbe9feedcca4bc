//! # CLI
//!
//! The command-line surface of `grpcprobe`, defined with `clap`.
//!
//! Flag values are validated here (headers must be `key:value`, durations are seconds,
//! parameters must be `path=value`) and mapped onto the core's [`ConnectOptions`] and
//! [`CallOptions`].
use clap::{Parser, Subcommand, ValueEnum};
use grpcprobe_core::client::{CallOptions, ConnectOptions, DEFAULT_CONNECT_TIMEOUT};
use grpcprobe_core::path::InvokeParam;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "grpcprobe", version, about = "Schema-less gRPC client")]
pub struct Cli {
    /// The server to connect to (e.g. localhost:50051 or http://localhost:50051)
    pub target: String,

    #[command(subcommand)]
    pub command: Commands,

    /// Seconds allowed for establishing the connection
    #[arg(long, value_parser = parse_seconds, global = true)]
    pub connect_timeout: Option<Duration>,

    /// Seconds allowed for the whole operation, connection included
    #[arg(long, value_parser = parse_seconds, global = true)]
    pub max_time: Option<Duration>,

    /// Seconds between HTTP/2 keepalive pings
    #[arg(long, value_parser = parse_seconds, global = true)]
    pub keepalive_time: Option<Duration>,

    /// User agent sent with every request
    #[arg(long, global = true)]
    pub user_agent: Option<String>,

    /// Request metadata, may be repeated. Keys ending in `-bin` are sent as binary.
    /// Must come before the subcommand
    #[arg(short = 'H', long = "header", value_parser = parse_header)]
    pub headers: Vec<(String, String)>,

    /// Resolve symbols from this encoded FileDescriptorSet instead of server reflection
    #[arg(long, global = true)]
    pub file_descriptor_set: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub output: OutputFormat,

    /// Log debug information to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List the services of the server, or the methods of one service
    List {
        /// Fully qualified service name (e.g. shop.v1.OrderService)
        service: Option<String>,
        /// Expand the request and response messages of each method
        #[arg(short, long)]
        long: bool,
    },

    /// Describe a service, method, message, field or enum
    Describe {
        /// Fully qualified symbol (e.g. shop.v1.OrderService/PlaceOrder)
        symbol: String,
        /// Expand the request and response messages of methods
        #[arg(short, long)]
        long: bool,
    },

    /// Invoke a unary method with a request built from path=value parameters
    ///
    /// ## Examples:
    ///
    /// ```bash
    /// grpcprobe localhost:50051 invoke shop.v1.OrderService/PlaceOrder customer=alice address.city=Paris tags.0=gift
    /// ```
    Invoke {
        /// Fully qualified method (package.Service/Method or package.Service.Method)
        method: String,
        /// Request fields as path=value
        params: Vec<InvokeParam>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl Cli {
    pub fn connect_options(&self) -> ConnectOptions {
        ConnectOptions {
            connect_timeout: self.connect_timeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT),
            keepalive: self.keepalive_time,
            user_agent: self.user_agent.clone(),
        }
    }

    pub fn call_options(&self) -> CallOptions {
        CallOptions {
            timeout: self.max_time,
            headers: self.headers.clone(),
        }
    }

    /// Whether descriptors should be printed with their messages expanded.
    pub fn long(&self) -> bool {
        match self.command {
            Commands::List { long, .. } | Commands::Describe { long, .. } => long,
            Commands::Invoke { .. } => false,
        }
    }
}

fn parse_header(s: &str) -> Result<(String, String), String> {
    s.split_once(':')
        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
        .ok_or_else(|| "Format must be 'key:value'".to_string())
}

fn parse_seconds(s: &str) -> Result<Duration, String> {
    let seconds: f64 = s
        .parse()
        .map_err(|_| format!("'{s}' is not a number of seconds"))?;

    Duration::try_from_secs_f64(seconds).map_err(|e| format!("Invalid duration '{s}': {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn test_command_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_invoke_params() {
        let cli = parse(&[
            "grpcprobe",
            "localhost:50051",
            "invoke",
            "shop.v1.OrderService/PlaceOrder",
            "address.city=Paris",
            "note=a=b",
        ]);

        let Commands::Invoke { method, params } = cli.command else {
            panic!("expected invoke");
        };
        assert_eq!(method, "shop.v1.OrderService/PlaceOrder");
        assert_eq!(
            params,
            vec![
                InvokeParam::new("address.city", "Paris"),
                InvokeParam::new("note", "a=b"),
            ]
        );
    }

    #[test]
    fn test_invoke_param_without_value_is_rejected() {
        let result = Cli::try_parse_from(["grpcprobe", "host", "invoke", "pkg.S/M", "novalue"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_headers() {
        let cli = parse(&[
            "grpcprobe",
            "host",
            "-H",
            "x-request-id: 42",
            "--header",
            "trace-bin:abc",
            "describe",
            "pkg.S",
        ]);

        assert_eq!(
            cli.call_options().headers,
            vec![
                ("x-request-id".to_string(), "42".to_string()),
                ("trace-bin".to_string(), "abc".to_string()),
            ]
        );
        assert!(parse_header("no-colon").is_err());
    }

    #[test]
    fn test_header_after_subcommand_is_rejected() {
        let result = Cli::try_parse_from([
            "grpcprobe",
            "host",
            "-H",
            "x-request-id:42",
            "describe",
            "pkg.S",
            "-H",
            "trace-bin:abc",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_durations() {
        assert_eq!(parse_seconds("1.5"), Ok(Duration::from_millis(1500)));
        assert_eq!(parse_seconds("0"), Ok(Duration::ZERO));
        assert!(parse_seconds("-1").is_err());
        assert!(parse_seconds("soon").is_err());
    }

    #[test]
    fn test_options_mapping() {
        let cli = parse(&[
            "grpcprobe",
            "host",
            "list",
            "--connect-timeout",
            "3",
            "--max-time",
            "2",
            "--keepalive-time",
            "30",
            "--user-agent",
            "probe/1",
        ]);

        let connect = cli.connect_options();
        assert_eq!(connect.connect_timeout, Duration::from_secs(3));
        assert_eq!(connect.keepalive, Some(Duration::from_secs(30)));
        assert_eq!(connect.user_agent.as_deref(), Some("probe/1"));
        assert_eq!(cli.call_options().timeout, Some(Duration::from_secs(2)));
        assert_eq!(
            connect.effective_connect_timeout(cli.max_time),
            Duration::from_secs(2)
        );
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&["grpcprobe", "host", "describe", "pkg.Message"]);

        assert_eq!(cli.output, OutputFormat::Text);
        assert!(!cli.verbose);
        assert!(!cli.long());
        assert_eq!(cli.connect_options().connect_timeout, DEFAULT_CONNECT_TIMEOUT);
        assert_eq!(cli.call_options().timeout, None);
    }

    #[test]
    fn test_output_and_long() {
        let cli = parse(&["grpcprobe", "host", "list", "pkg.S", "-l", "-o", "json", "-v"]);

        assert_eq!(cli.output, OutputFormat::Json);
        assert!(cli.verbose);
        assert!(cli.long());
    }
}
