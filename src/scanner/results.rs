use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::IpAddr;

/// Outcome of one connect probe. Everything other than `Open` reports
/// `open = false` on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortStatus {
    Open,
    Closed,
    Timeout,
    Error,
}

impl PortStatus {
    pub fn is_open(self) -> bool {
        self == PortStatus::Open
    }
}

impl fmt::Display for PortStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PortStatus::Open => write!(f, "open"),
            PortStatus::Closed => write!(f, "closed"),
            PortStatus::Timeout => write!(f, "timeout"),
            PortStatus::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortResult {
    port: u16,
    status: PortStatus,
}

impl PortResult {
    pub fn new(port: u16, status: PortStatus) -> Self {
        Self { port, status }
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn status(&self) -> PortStatus {
        self.status
    }

    pub fn is_open(&self) -> bool {
        self.status.is_open()
    }
}

/// Result of one `probe` call. Ports are in completion order, not input order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanReport {
    target: IpAddr,
    ports: Vec<PortResult>,
}

impl ScanReport {
    pub fn new(target: IpAddr, ports: Vec<PortResult>) -> Self {
        Self { target, ports }
    }

    pub fn target(&self) -> IpAddr {
        self.target
    }

    pub fn ports(&self) -> &[PortResult] {
        &self.ports
    }

    pub fn open_ports(&self) -> impl Iterator<Item = u16> + '_ {
        self.ports.iter().filter(|p| p.is_open()).map(|p| p.port)
    }

    /// Structured form handed back to the dispatch layer. `detailed` adds the
    /// per-port status next to the boolean.
    pub fn to_record(&self, detailed: bool) -> ScanRecord {
        ScanRecord {
            target: self.target.to_string(),
            ports: self
                .ports
                .iter()
                .map(|p| PortRecord {
                    port: p.port,
                    open: p.is_open(),
                    status: detailed.then_some(p.status),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanRecord {
    pub target: String,
    pub ports: Vec<PortRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortRecord {
    pub port: u16,
    pub open: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<PortStatus>,
}
