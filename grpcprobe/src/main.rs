//! # grpcprobe CLI Entry Point
//!
//! 1. **Initialization**: Parses command-line arguments using [`cli::Cli`] and installs
//!    a log subscriber writing to stderr.
//! 2. **Connection**: Dials the target through an `EndpointSupplier`.
//! 3. **Execution**: Delegates listing, describing and invoking to the `ProbeClient`.
//! 4. **Presentation**: Results go to stdout through an output sink, errors to stderr.
mod cli;
mod formatter;

use anyhow::Context;
use clap::Parser;
use cli::{Cli, Commands, OutputFormat};
use formatter::FormattedString;
use grpcprobe_core::CodecRegistry;
use grpcprobe_core::client::{CallOptions, EndpointSupplier, ProbeClient, ProbeError};
use grpcprobe_core::format::{JsonOutput, OutputSink, TextOutput};
use grpcprobe_core::reflection::SchemaSource;
use std::io;
use std::process;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let args = Cli::parse();
    init_tracing(args.verbose);

    if let Err(err) = run(args).await {
        eprintln!("{}", FormattedString::from(err));
        process::exit(1);
    }
}

fn init_tracing(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

async fn run(args: Cli) -> anyhow::Result<()> {
    let connect = args.connect_options();
    let call = args.call_options();
    let connect_timeout = connect.effective_connect_timeout(args.max_time);

    let file_descriptor_set = args
        .file_descriptor_set
        .as_ref()
        .map(|path| {
            std::fs::read(path)
                .with_context(|| format!("Failed to read file '{}'", path.display()))
        })
        .transpose()?;

    let mut sink: Box<dyn OutputSink> = match args.output {
        OutputFormat::Text => Box::new(
            TextOutput::new(io::stdout(), CodecRegistry::with_defaults()).verbose(args.long()),
        ),
        OutputFormat::Json => Box::new(JsonOutput::new(io::stdout())),
    };

    let supplier = EndpointSupplier::new(&args.target, connect);
    let client = ProbeClient::connect(&supplier, connect_timeout)
        .await
        .map_err(ProbeError::from)?;
    tracing::debug!(endpoint = supplier.target(), "connected");

    match file_descriptor_set {
        Some(bytes) => {
            let client = client
                .with_file_descriptor(&bytes)
                .map_err(ProbeError::from)
                .context("Failed to load the file descriptor set")?;
            execute(client, args.command, &call, &mut sink).await
        }
        None => execute(client, args.command, &call, &mut sink).await,
    }
}

async fn execute<R: SchemaSource>(
    mut client: ProbeClient<R>,
    command: Commands,
    call: &CallOptions,
    sink: &mut impl OutputSink,
) -> anyhow::Result<()> {
    match command {
        Commands::List { service: None, .. } => {
            let services = client.list_services_until(call, interrupted()).await?;
            if services.is_empty() {
                eprintln!("{}", FormattedString::notice("No services found."));
            }
            sink.service_list(&services)?;
        }
        Commands::List {
            service: Some(service),
            ..
        } => {
            let service = client
                .list_service_until(&service, call, interrupted())
                .await?;
            sink.service(&service)?;
        }
        Commands::Describe { symbol, .. } => {
            let descriptor = client.describe_until(&symbol, call, interrupted()).await?;
            sink.describe(&descriptor)?;
        }
        Commands::Invoke { method, params } => {
            client
                .invoke_until(&method, &params, call, sink, interrupted())
                .await
                .with_context(|| format!("Failed to invoke '{method}'"))?;
        }
    }

    Ok(())
}

/// Completes on Ctrl-C. Never completes if the handler cannot be installed.
async fn interrupted() {
    if tokio::signal::ctrl_c().await.is_err() {
        std::future::pending::<()>().await;
    }
}
