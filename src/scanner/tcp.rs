use std::io::ErrorKind;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::time::timeout;
use tracing::trace;

use super::PortStatus;

/// TCP connect probe. The socket is closed before the status is returned,
/// on every path; a timed-out connect is dropped with its future.
pub async fn connect_scan(target: IpAddr, port: u16, per_probe_timeout: Duration) -> PortStatus {
    let addr = SocketAddr::new(target, port);

    match timeout(per_probe_timeout, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => {
            drop(stream);
            PortStatus::Open
        }
        Ok(Err(e)) if e.kind() == ErrorKind::ConnectionRefused => PortStatus::Closed,
        Ok(Err(e)) => {
            trace!(%addr, error = %e, "Connect failed");
            PortStatus::Error
        }
        Err(_) => PortStatus::Timeout,
    }
}
