mod cli;
mod config;
mod error;
mod output;
mod scanner;
mod shutdown;
mod target;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::config::ScanRequest;
use crate::output::OutputWriter;
use crate::scanner::{ScanReport, Scanner};
use crate::shutdown::ShutdownFlag;

#[tokio::main]
async fn main() {
    // The original contract is exit 1 on malformed arguments, so clap's
    // default exit code is overridden; help and version still exit 0.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let _ = err.print();
            std::process::exit(if err.use_stderr() { 1 } else { 0 });
        }
    };

    init_tracing(cli.verbose);

    if let Err(err) = run(cli).await {
        eprintln!("sondeo: {err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let (port_min, port_max) = cli.port_bounds()?;
    let request = ScanRequest::new(port_min, port_max, cli.concurrency, cli.timeout)?;
    let addresses = target::expand_target(&cli.target)?;

    let shutdown = ShutdownFlag::new();
    shutdown.listen_for_ctrl_c();

    let mut writer = OutputWriter::new(cli.output_format, cli.output_file.clone());
    let scanner = Scanner::new(request.clone(), shutdown.clone());

    info!(
        target = %cli.target,
        hosts = addresses.len(),
        ports = request.port_count(),
        concurrency = request.concurrency,
        "starting scan"
    );

    // One batch per resolved address, strictly sequential.
    let mut hosts = Vec::with_capacity(addresses.len());
    for address in addresses {
        if shutdown.is_triggered() {
            break;
        }
        writer.begin_host(address, request.port_min, request.port_max)?;
        let report = scanner
            .scan_host(address, |result| writer.record(result))
            .await;
        writer.finish_host();
        hosts.push(report);
    }

    let report = ScanReport {
        target_spec: cli.target,
        port_min: request.port_min,
        port_max: request.port_max,
        concurrency: request.concurrency,
        hosts,
    };
    writer.finish(&report)?;

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_filter = if verbose { "sondeo=debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
