use std::io;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

use super::results::{PortState, ProbeResult, ProbeTask};

/// One TCP connect attempt with a bounded wait.
///
/// Elapsed wall time is measured for every outcome. A probe that times out
/// is reported the same as a refusal; without the bound a single silent host
/// would pin a concurrency slot for the OS connect timeout.
pub async fn connect_probe(task: ProbeTask, connect_timeout: Duration) -> ProbeResult {
    let addr = SocketAddr::from((task.address, task.port));
    let started = Instant::now();

    let state = match timeout(connect_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(_stream)) => PortState::Open,
        Ok(Err(e)) => classify_connect_error(e),
        Err(_elapsed) => PortState::Closed,
    };

    let elapsed = started.elapsed();
    trace!(port = task.port, %state, "probe finished");
    ProbeResult {
        task,
        state,
        elapsed,
    }
}

/// Remote behavior is `Closed`; only local failures become `Error`.
fn classify_connect_error(e: io::Error) -> PortState {
    match e.kind() {
        io::ErrorKind::PermissionDenied
        | io::ErrorKind::AddrInUse
        | io::ErrorKind::AddrNotAvailable
        | io::ErrorKind::InvalidInput
        | io::ErrorKind::OutOfMemory => PortState::Error(e.to_string()),
        _ => PortState::Closed,
    }
}
