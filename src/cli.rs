use clap::{Parser, ValueEnum};
use std::path::PathBuf;

use crate::config::{DEFAULT_CONCURRENCY, DEFAULT_TIMEOUT_MS};
use crate::error::ScanError;

#[derive(Parser, Debug)]
#[command(name = "sondeo")]
#[command(version)]
#[command(about = "Concurrent TCP reachability scanner", long_about = None)]
pub struct Cli {
    #[arg(help = "Target: IPv4 address, hostname, or last-octet range (e.g. 192.168.1.10-20)")]
    pub target: String,

    #[arg(help = "Single port to probe; use -r for a range instead")]
    pub port: Option<u16>,

    #[arg(
        short = 'r',
        long = "range",
        num_args = 1..=2,
        value_names = ["MIN", "MAX"],
        help = "Port range: '-r MAX' scans 1..MAX, '-r MIN MAX' scans MIN..MAX"
    )]
    pub range: Option<Vec<u16>>,

    #[arg(
        short = 'c',
        long = "concurrency",
        default_value_t = DEFAULT_CONCURRENCY,
        allow_negative_numbers = true,
        help = "Maximum simultaneous probes (clamped to 1-256)"
    )]
    pub concurrency: i64,

    #[arg(
        long,
        default_value_t = DEFAULT_TIMEOUT_MS,
        help = "Connect timeout per probe in milliseconds"
    )]
    pub timeout: u64,

    #[arg(short = 'o', long, value_enum, default_value = "human", help = "Output format")]
    pub output_format: OutputFormat,

    #[arg(short = 'f', long, help = "Write the JSON report to this file instead of stdout")]
    pub output_file: Option<PathBuf>,

    #[arg(short, long, help = "Enable verbose output")]
    pub verbose: bool,
}

impl Cli {
    /// Port bounds from either the positional port or the `-r` forms.
    pub fn port_bounds(&self) -> Result<(u16, u16), ScanError> {
        match (&self.range, self.port) {
            (Some(range), _) => match range.as_slice() {
                [max] => Ok((1, *max)),
                [min, max] => Ok((*min, *max)),
                _ => Err(ScanError::InvalidArguments(
                    "-r takes one or two port values".into(),
                )),
            },
            (None, Some(port)) => Ok((port, port)),
            (None, None) => Err(ScanError::InvalidArguments(
                "a port or a port range (-r) is required".into(),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum, PartialEq)]
pub enum OutputFormat {
    #[value(name = "human", help = "Human-readable output, one line per probe")]
    Human,
    #[value(name = "json", help = "JSON report")]
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(args).unwrap()
    }

    #[test]
    fn single_port_form() {
        let cli = parse(&["sondeo", "127.0.0.1", "22"]);
        assert_eq!(cli.port_bounds().unwrap(), (22, 22));
    }

    #[test]
    fn range_with_max_only_starts_at_one() {
        let cli = parse(&["sondeo", "127.0.0.1", "-r", "1024"]);
        assert_eq!(cli.port_bounds().unwrap(), (1, 1024));
    }

    #[test]
    fn explicit_range_form() {
        let cli = parse(&["sondeo", "127.0.0.1", "-r", "20", "25"]);
        assert_eq!(cli.port_bounds().unwrap(), (20, 25));
    }

    #[test]
    fn concurrency_flag_is_passed_through_unclamped() {
        let cli = parse(&["sondeo", "127.0.0.1", "-r", "25", "-c", "9999"]);
        assert_eq!(cli.concurrency, 9999);

        let cli = parse(&["sondeo", "127.0.0.1", "-r", "25", "-c", "-3"]);
        assert_eq!(cli.concurrency, -3);
    }

    #[test]
    fn missing_port_is_rejected() {
        let cli = parse(&["sondeo", "127.0.0.1"]);
        assert!(matches!(
            cli.port_bounds(),
            Err(ScanError::InvalidArguments(_))
        ));
    }

    #[test]
    fn missing_target_fails_to_parse() {
        assert!(Cli::try_parse_from(["sondeo"]).is_err());
    }

    #[test]
    fn non_numeric_port_fails_to_parse() {
        assert!(Cli::try_parse_from(["sondeo", "127.0.0.1", "ssh"]).is_err());
    }
}
