use std::net::Ipv4Addr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};

/// One (address, port) pair to probe. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ProbeTask {
    pub address: Ipv4Addr,
    pub port: u16,
}

/// Outcome of a single connect attempt.
///
/// Refusal and connect timeout both map to `Closed`; `Error` is reserved for
/// local failures (no socket, bad address), never for remote behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PortState {
    Open,
    Closed,
    Error(String),
}

impl std::fmt::Display for PortState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PortState::Open => write!(f, "open"),
            PortState::Closed => write!(f, "closed"),
            PortState::Error(reason) => write!(f, "error: {}", reason),
        }
    }
}

/// Created exactly once per task by the probe the dispatcher ran for it.
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    #[serde(flatten)]
    pub task: ProbeTask,
    pub state: PortState,
    #[serde(rename = "elapsed_ms", serialize_with = "duration_as_millis")]
    pub elapsed: Duration,
}

impl ProbeResult {
    pub fn elapsed_ms(&self) -> f64 {
        self.elapsed.as_secs_f64() * 1000.0
    }
}

fn duration_as_millis<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64() * 1000.0)
}

/// All results for one resolved address, in ascending port order.
#[derive(Debug, Clone, Serialize)]
pub struct HostReport {
    pub address: Ipv4Addr,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub results: Vec<ProbeResult>,
}

impl HostReport {
    pub fn open_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.state == PortState::Open)
            .count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub target_spec: String,
    pub port_min: u16,
    pub port_max: u16,
    pub concurrency: usize,
    pub hosts: Vec<HostReport>,
}
