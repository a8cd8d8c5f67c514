mod probe;
mod results;

pub use probe::connect_probe;
pub use results::{HostReport, PortState, ProbeResult, ProbeTask, ScanReport};

use std::collections::VecDeque;
use std::future::Future;
use std::net::Ipv4Addr;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::mpsc;
use tracing::debug;

use crate::config::ScanRequest;
use crate::shutdown::ShutdownFlag;

/// Ordered probe list for one resolved address: every port in the requested
/// range, ascending. One batch per address, never retained across addresses.
pub fn build_batch(address: Ipv4Addr, request: &ScanRequest) -> Vec<ProbeTask> {
    (request.port_min..=request.port_max)
        .map(|port| ProbeTask { address, port })
        .collect()
}

pub struct Scanner {
    request: ScanRequest,
    shutdown: ShutdownFlag,
}

impl Scanner {
    pub fn new(request: ScanRequest, shutdown: ShutdownFlag) -> Self {
        Self { request, shutdown }
    }

    /// Scans one resolved address across the full port range.
    ///
    /// `on_result` sees every result in completion order, as soon as it is
    /// known; the returned report is sorted by port.
    pub async fn scan_host<F>(&self, address: Ipv4Addr, on_result: F) -> HostReport
    where
        F: FnMut(&ProbeResult),
    {
        let batch = build_batch(address, &self.request);
        let start_time = Utc::now();
        let timeout = self.request.timeout;

        let mut results = dispatch(
            batch,
            self.request.concurrency,
            self.shutdown.clone(),
            move |task| connect_probe(task, timeout),
            on_result,
        )
        .await;
        results.sort_by_key(|r| r.task.port);

        HostReport {
            address,
            start_time,
            end_time: Utc::now(),
            results,
        }
    }
}

/// Runs one batch with at most `concurrency` probes in flight.
///
/// A fixed set of workers pops tasks from a shared queue, so launches follow
/// batch order exactly (pops are serialized) while a freed slot is refilled
/// the moment its probe finishes. Each completed probe is pushed onto the
/// result channel immediately; `on_result` therefore observes completion
/// order, not launch order. The run ends when the queue is empty and every
/// worker has drained, which closes the channel.
///
/// The probe is injected so the cap and completeness invariants can be
/// exercised without sockets.
pub async fn dispatch<P, Fut, F>(
    batch: Vec<ProbeTask>,
    concurrency: usize,
    shutdown: ShutdownFlag,
    probe: P,
    mut on_result: F,
) -> Vec<ProbeResult>
where
    P: Fn(ProbeTask) -> Fut + Clone + Send + 'static,
    Fut: Future<Output = ProbeResult> + Send + 'static,
    F: FnMut(&ProbeResult),
{
    let expected = batch.len();
    let queue = Arc::new(Mutex::new(VecDeque::from(batch)));
    let workers = concurrency.max(1).min(expected.max(1));
    let (tx, mut rx) = mpsc::channel::<ProbeResult>(workers);

    let mut handles = Vec::with_capacity(workers);
    for _ in 0..workers {
        let queue = Arc::clone(&queue);
        let tx = tx.clone();
        let shutdown = shutdown.clone();
        let probe = probe.clone();

        handles.push(tokio::spawn(async move {
            loop {
                if shutdown.is_triggered() {
                    break;
                }
                let next = queue.lock().unwrap().pop_front();
                let Some(task) = next else {
                    break;
                };
                let result = probe(task).await;
                if tx.send(result).await.is_err() {
                    break;
                }
            }
        }));
    }
    drop(tx);

    let mut results = Vec::with_capacity(expected);
    while let Some(result) = rx.recv().await {
        on_result(&result);
        results.push(result);
    }

    // channel closure means the workers are done; reap them
    let _ = join_all(handles).await;

    if results.len() < expected {
        debug!(
            expected,
            delivered = results.len(),
            "batch cut short by shutdown"
        );
    }
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;
    use tokio::time::sleep;

    const ADDRESS: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

    fn request(port_min: u16, port_max: u16, concurrency: i64) -> ScanRequest {
        ScanRequest::new(port_min, port_max, concurrency, 1000).unwrap()
    }

    fn closed(task: ProbeTask) -> ProbeResult {
        ProbeResult {
            task,
            state: PortState::Closed,
            elapsed: Duration::from_millis(1),
        }
    }

    #[test]
    fn batch_covers_the_range_in_order() {
        let batch = build_batch(ADDRESS, &request(20, 25, 4));

        assert_eq!(batch.len(), 6);
        let ports: Vec<u16> = batch.iter().map(|t| t.port).collect();
        assert_eq!(ports, vec![20, 21, 22, 23, 24, 25]);
        assert!(batch.iter().all(|t| t.address == ADDRESS));
    }

    #[tokio::test]
    async fn every_task_yields_exactly_one_result() {
        let batch = build_batch(ADDRESS, &request(1, 100, 8));

        let results = dispatch(
            batch,
            8,
            ShutdownFlag::new(),
            |task| async move { closed(task) },
            |_| {},
        )
        .await;

        assert_eq!(results.len(), 100);
        let mut ports: Vec<u16> = results.iter().map(|r| r.task.port).collect();
        ports.sort_unstable();
        ports.dedup();
        assert_eq!(ports.len(), 100);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn in_flight_never_exceeds_the_cap() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));
        let batch = build_batch(ADDRESS, &request(1, 64, 4));

        let probe = {
            let in_flight = Arc::clone(&in_flight);
            let peak = Arc::clone(&peak);
            move |task: ProbeTask| {
                let in_flight = Arc::clone(&in_flight);
                let peak = Arc::clone(&peak);
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    sleep(Duration::from_millis(5)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    closed(task)
                }
            }
        };

        let results = dispatch(batch, 4, ShutdownFlag::new(), probe, |_| {}).await;

        assert_eq!(results.len(), 64);
        assert!(peak.load(Ordering::SeqCst) <= 4);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn single_slot_launches_in_batch_order() {
        let launched = Arc::new(Mutex::new(Vec::new()));
        let batch = build_batch(ADDRESS, &request(30, 49, 1));

        let probe = {
            let launched = Arc::clone(&launched);
            move |task: ProbeTask| {
                let launched = Arc::clone(&launched);
                async move {
                    launched.lock().unwrap().push(task.port);
                    closed(task)
                }
            }
        };

        dispatch(batch, 1, ShutdownFlag::new(), probe, |_| {}).await;

        let order = launched.lock().unwrap().clone();
        assert_eq!(order, (30..=49).collect::<Vec<u16>>());
    }

    #[tokio::test]
    async fn open_port_is_reported_among_closed() {
        // six-port scenario: only port 22 answers
        let batch = build_batch(ADDRESS, &request(20, 25, 4));
        let mut streamed = Vec::new();

        let results = dispatch(
            batch,
            4,
            ShutdownFlag::new(),
            |task| async move {
                let state = if task.port == 22 {
                    PortState::Open
                } else {
                    PortState::Closed
                };
                ProbeResult {
                    task,
                    state,
                    elapsed: Duration::from_millis(2),
                }
            },
            |result| streamed.push(result.task.port),
        )
        .await;

        assert_eq!(results.len(), 6);
        assert_eq!(streamed.len(), 6);
        let open: Vec<u16> = results
            .iter()
            .filter(|r| r.state == PortState::Open)
            .map(|r| r.task.port)
            .collect();
        assert_eq!(open, vec![22]);
        assert_eq!(
            results.iter().filter(|r| r.state == PortState::Closed).count(),
            5
        );
    }

    #[tokio::test]
    async fn error_outcome_does_not_abort_the_batch() {
        let batch = build_batch(ADDRESS, &request(1, 10, 3));

        let results = dispatch(
            batch,
            3,
            ShutdownFlag::new(),
            |task| async move {
                if task.port == 5 {
                    ProbeResult {
                        task,
                        state: PortState::Error("socket limit".into()),
                        elapsed: Duration::ZERO,
                    }
                } else {
                    closed(task)
                }
            },
            |_| {},
        )
        .await;

        assert_eq!(results.len(), 10);
        assert!(results
            .iter()
            .any(|r| matches!(r.state, PortState::Error(_))));
    }

    #[tokio::test]
    async fn triggered_shutdown_launches_nothing() {
        let flag = ShutdownFlag::new();
        flag.trigger();
        let batch = build_batch(ADDRESS, &request(1, 50, 4));

        let results = dispatch(batch, 4, flag, |task| async move { closed(task) }, |_| {}).await;

        assert!(results.is_empty());
    }
}
