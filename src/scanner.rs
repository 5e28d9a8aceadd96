pub mod tcp;
mod results;

use std::future::Future;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};

pub use results::{PortResult, PortStatus, ScanReport};

/// Probe every candidate port on `target` with at most `worker_limit` connects
/// in flight, each bounded by `per_probe_timeout`.
///
/// Never fails: every transport problem becomes a non-open result, and the
/// report holds exactly one entry per candidate (duplicates included), in
/// completion order.
pub async fn probe(
    target: IpAddr,
    candidates: &[u16],
    worker_limit: usize,
    per_probe_timeout: Duration,
) -> ScanReport {
    info!(%target, candidates = candidates.len(), workers = worker_limit, "Port scan started");

    let outcomes = fan_out(candidates.to_vec(), worker_limit, move |port| {
        tcp::connect_scan(target, port, per_probe_timeout)
    })
    .await;

    let ports: Vec<PortResult> = outcomes
        .into_iter()
        .map(|(port, status)| PortResult::new(port, status))
        .collect();
    let report = ScanReport::new(target, ports);

    let summary: Vec<String> = report
        .ports()
        .iter()
        .map(|p| format!("{}:{}", p.port(), p.status()))
        .collect();
    info!(
        %target,
        open = report.open_ports().count(),
        results = ?summary,
        "Port scan completed"
    );

    report
}

/// Run `probe_fn` once per port on a pool of `min(worker_limit, ports.len())`
/// slots and collect `(port, status)` pairs as they finish.
pub async fn fan_out<F, Fut>(ports: Vec<u16>, worker_limit: usize, probe_fn: F) -> Vec<(u16, PortStatus)>
where
    F: Fn(u16) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = PortStatus> + Send + 'static,
{
    if ports.is_empty() {
        return Vec::new();
    }

    let slots = worker_limit.max(1).min(ports.len());
    let semaphore = Arc::new(Semaphore::new(slots));
    let probe_fn = Arc::new(probe_fn);
    let mut in_flight = FuturesUnordered::new();

    debug!(ports = ports.len(), slots, "Dispatching probes");

    for port in ports {
        let sem = semaphore.clone();
        let probe_fn = probe_fn.clone();

        let task = tokio::spawn(async move {
            let _permit = match sem.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return PortStatus::Error,
            };
            (*probe_fn)(port).await
        });

        in_flight.push(async move { (port, task.await) });
    }

    let mut outcomes = Vec::with_capacity(in_flight.len());
    while let Some((port, joined)) = in_flight.next().await {
        let status = joined.unwrap_or_else(|e| {
            warn!(port, error = %e, "Probe task failed");
            PortStatus::Error
        });
        debug!(port, %status, "Probe finished");
        outcomes.push((port, status));
    }

    outcomes
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::net::TcpListener;
    use tokio::time::{sleep, timeout, Instant};

    fn loopback() -> IpAddr {
        "127.0.0.1".parse().unwrap()
    }

    async fn closed_port() -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        port
    }

    #[tokio::test]
    async fn test_empty_candidates_return_immediately() {
        let report = timeout(
            Duration::from_millis(100),
            probe(loopback(), &[], 10, Duration::from_secs(1)),
        )
        .await
        .expect("empty probe must not block");

        assert!(report.ports().is_empty());
        assert_eq!(report.target(), loopback());
    }

    #[tokio::test]
    async fn test_open_and_closed_ports_on_loopback() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = listener.local_addr().unwrap().port();
        let closed = closed_port().await;

        let report = probe(loopback(), &[closed, open], 10, Duration::from_secs(1)).await;
        let by_port: HashMap<u16, bool> =
            report.ports().iter().map(|p| (p.port(), p.is_open())).collect();

        assert_eq!(report.ports().len(), 2);
        assert_eq!(by_port[&open], true);
        assert_eq!(by_port[&closed], false);
    }

    #[tokio::test]
    async fn test_one_result_per_candidate_including_duplicates() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = listener.local_addr().unwrap().port();
        let closed = closed_port().await;
        let candidates = [open, closed, open, closed, open];

        let report = probe(loopback(), &candidates, 2, Duration::from_secs(1)).await;

        assert_eq!(report.ports().len(), candidates.len());
        assert_eq!(report.ports().iter().filter(|p| p.port() == open && p.is_open()).count(), 3);
        assert_eq!(report.ports().iter().filter(|p| p.port() == closed && !p.is_open()).count(), 2);
    }

    #[tokio::test]
    async fn test_repeated_probe_is_stable() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let open = listener.local_addr().unwrap().port();
        let closed = closed_port().await;

        let classify = |report: ScanReport| {
            let mut v: Vec<(u16, bool)> =
                report.ports().iter().map(|p| (p.port(), p.is_open())).collect();
            v.sort();
            v
        };

        let first = classify(probe(loopback(), &[open, closed], 10, Duration::from_secs(1)).await);
        let second = classify(probe(loopback(), &[open, closed], 10, Duration::from_secs(1)).await);
        assert_eq!(first, second);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_worker_limit_bounds_in_flight_probes() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (counter, high) = (in_flight.clone(), peak.clone());
        let outcomes = fan_out((1..=40).collect(), 3, move |_port| {
            let counter = counter.clone();
            let high = high.clone();
            async move {
                let now = counter.fetch_add(1, Ordering::SeqCst) + 1;
                high.fetch_max(now, Ordering::SeqCst);
                sleep(Duration::from_millis(10)).await;
                counter.fetch_sub(1, Ordering::SeqCst);
                PortStatus::Closed
            }
        })
        .await;

        assert_eq!(outcomes.len(), 40);
        assert!(peak.load(Ordering::SeqCst) <= 3);
        assert!(peak.load(Ordering::SeqCst) >= 2);
        assert_eq!(in_flight.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_zero_worker_limit_still_makes_progress() {
        let outcomes = fan_out(vec![1, 2, 3], 0, |_| async { PortStatus::Closed }).await;
        assert_eq!(outcomes.len(), 3);
    }

    #[tokio::test]
    async fn test_results_arrive_in_completion_order() {
        let outcomes = fan_out(vec![1, 2], 2, |port| async move {
            if port == 1 {
                sleep(Duration::from_millis(200)).await;
            }
            PortStatus::Open
        })
        .await;

        assert_eq!(outcomes.iter().map(|(p, _)| *p).collect::<Vec<_>>(), vec![2, 1]);
    }

    #[tokio::test]
    async fn test_panicking_probe_downgrades_to_error() {
        let outcomes = fan_out(vec![7, 13, 21], 3, |port| async move {
            if port == 13 {
                panic!("probe blew up");
            }
            PortStatus::Closed
        })
        .await;

        let by_port: HashMap<u16, PortStatus> = outcomes.into_iter().collect();
        assert_eq!(by_port.len(), 3);
        assert_eq!(by_port[&13], PortStatus::Error);
        assert_eq!(by_port[&7], PortStatus::Closed);
    }

    #[tokio::test]
    async fn test_timeouts_are_bounded_by_concurrency() {
        // Ten unroutable probes at 100ms each over ten workers should finish
        // in roughly one timeout, not ten.
        let candidates: Vec<u16> = (1..=10).collect();
        let start = Instant::now();
        let report = probe("192.0.2.1".parse().unwrap(), &candidates, 10, Duration::from_millis(100)).await;

        assert_eq!(report.ports().len(), 10);
        assert!(report.ports().iter().all(|p| !p.is_open()));
        assert!(start.elapsed() < Duration::from_millis(900));
    }
}
