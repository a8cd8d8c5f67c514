use std::time::Duration;

use crate::error::ScanError;

pub const MIN_CONCURRENCY: i64 = 1;
pub const MAX_CONCURRENCY: i64 = 256;
pub const DEFAULT_CONCURRENCY: i64 = 50;
pub const DEFAULT_TIMEOUT_MS: u64 = 1000;

/// Validated parameters for one invocation.
///
/// Port bounds are rejected when invalid; concurrency is clamped, not
/// rejected, so `-c 0` and `-c 9999` both produce a usable request.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub port_min: u16,
    pub port_max: u16,
    pub concurrency: usize,
    pub timeout: Duration,
}

impl ScanRequest {
    pub fn new(
        port_min: u16,
        port_max: u16,
        concurrency: i64,
        timeout_ms: u64,
    ) -> Result<Self, ScanError> {
        if port_min < 1 || port_min > port_max {
            return Err(ScanError::InvalidRange(format!(
                "port range {}-{} (expected 1 <= min <= max <= 65535)",
                port_min, port_max
            )));
        }

        Ok(Self {
            port_min,
            port_max,
            concurrency: concurrency.clamp(MIN_CONCURRENCY, MAX_CONCURRENCY) as usize,
            timeout: Duration::from_millis(timeout_ms),
        })
    }

    pub fn port_count(&self) -> usize {
        usize::from(self.port_max - self.port_min) + 1
    }
}
