use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::net::Ipv4Addr;
use std::path::PathBuf;

use anyhow::Result;
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};

use crate::cli::OutputFormat;
use crate::scanner::{PortState, ProbeResult, ScanReport};

/// Sink for probe results.
///
/// Human mode streams one line per completed probe (the vocabulary of the
/// original tool: `ABIERTO`/`cerrado`) through a per-host progress bar; JSON
/// mode stays quiet until `finish` serializes the whole report.
pub struct OutputWriter {
    format: OutputFormat,
    file: Option<PathBuf>,
    progress: Option<ProgressBar>,
}

impl OutputWriter {
    pub fn new(format: OutputFormat, file: Option<PathBuf>) -> Self {
        Self {
            format,
            file,
            progress: None,
        }
    }

    /// Prints the per-target header and arms the progress bar.
    pub fn begin_host(&mut self, address: Ipv4Addr, port_min: u16, port_max: u16) -> Result<()> {
        if self.format != OutputFormat::Human {
            return Ok(());
        }

        println!(
            "Escaneando puertos {} a {} en {}...",
            port_min,
            port_max,
            address.to_string().bold()
        );

        let total = u64::from(port_max - port_min) + 1;
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("[{elapsed_precise}] {bar:40.green/black} {pos}/{len} puertos")?
                .progress_chars("█▉▊▋▌▍▎▏ "),
        );
        self.progress = Some(pb);
        Ok(())
    }

    /// Emits one result as soon as it is known. Arrival order is completion
    /// order, not port order.
    pub fn record(&self, result: &ProbeResult) {
        if self.format != OutputFormat::Human {
            return;
        }

        let line = format_line(result);
        match &self.progress {
            Some(pb) => {
                pb.println(line);
                pb.inc(1);
            }
            None => println!("{}", line),
        }
    }

    pub fn finish_host(&mut self) {
        if let Some(pb) = self.progress.take() {
            pb.finish_and_clear();
        }
    }

    /// Final output: a summary in human mode, the full report in JSON mode.
    pub fn finish(&self, report: &ScanReport) -> Result<()> {
        match self.format {
            OutputFormat::Human => {
                let open: usize = report.hosts.iter().map(|h| h.open_count()).sum();
                let probed: usize = report.hosts.iter().map(|h| h.results.len()).sum();
                println!(
                    "{} puertos abiertos de {} sondeados en {} host(s)",
                    open.to_string().green().bold(),
                    probed,
                    report.hosts.len()
                );
                Ok(())
            }
            OutputFormat::Json => {
                let json = serde_json::to_string_pretty(report)?;
                match &self.file {
                    Some(path) => {
                        let file = File::create(path)?;
                        let mut writer = BufWriter::new(file);
                        writer.write_all(json.as_bytes())?;
                        writer.write_all(b"\n")?;
                        writer.flush()?;
                    }
                    None => {
                        println!("{}", json);
                        io::stdout().flush()?;
                    }
                }
                Ok(())
            }
        }
    }
}

fn format_line(result: &ProbeResult) -> String {
    let ms = result.elapsed_ms();
    match &result.state {
        PortState::Open => format!(
            "Puerto {:5} [{}]  ({:.2} ms)",
            result.task.port,
            "ABIERTO".green().bold(),
            ms
        ),
        PortState::Closed => format!(
            "Puerto {:5} [{}]  ({:.2} ms)",
            result.task.port,
            "cerrado".dimmed(),
            ms
        ),
        PortState::Error(reason) => format!(
            "Puerto {:5} [{}]    ({:.2} ms) {}",
            result.task.port,
            "error".red().bold(),
            ms,
            reason
        ),
    }
}
