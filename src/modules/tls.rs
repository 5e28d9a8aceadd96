use std::net::{IpAddr, SocketAddr, TcpStream};
use std::time::Duration;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use native_tls::TlsConnector;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::task::spawn_blocking;
use tracing::{debug, error, info};
use x509_parser::prelude::*;

use super::{ModuleContext, ModuleError, ModuleOptions, ModuleResult, SecurityModule};
use crate::utils::validate_port;

/// Summary of the peer certificate presented during the handshake.
#[derive(Debug, Clone, Serialize)]
pub struct CertificateSummary {
    pub subject: String,
    pub issuer: String,
    pub serial: String,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
    pub days_until_expiry: i64,
    pub expired: bool,
}

/// TLS handshake and single peer-certificate fetch
pub struct SslMonitorModule {
    connect_timeout: Duration,
    default_port: u16,
}

impl SslMonitorModule {
    pub fn new(ctx: &ModuleContext) -> Self {
        Self {
            connect_timeout: Duration::from_secs(ctx.config.tls.connect_timeout_secs),
            default_port: ctx.config.tls.default_port,
        }
    }

    /// First token of the port list when it is a valid port, otherwise the default.
    pub fn port_from(&self, ports: Option<&str>) -> u16 {
        ports
            .and_then(|p| p.split(',').next())
            .map(str::trim)
            .filter(|token| validate_port(token))
            .and_then(|token| token.parse().ok())
            .unwrap_or(self.default_port)
    }
}

#[async_trait]
impl SecurityModule for SslMonitorModule {
    fn name(&self) -> &str {
        "ssl-monitor"
    }

    fn description(&self) -> &str {
        "Check SSL/TLS certificates"
    }

    async fn run(&self, target: IpAddr, options: &ModuleOptions) -> ModuleResult<Value> {
        let port = self.port_from(options.ports.as_deref());
        let server_name = options.hostname.clone().unwrap_or_else(|| target.to_string());
        let connect_timeout = self.connect_timeout;

        info!(%target, port, server_name = %server_name, "SSL monitor started");

        let fetched = spawn_blocking(move || fetch_certificate(target, port, &server_name, connect_timeout))
            .await
            .map_err(|e| ModuleError::Task(e.to_string()))?;

        let (status, certificate) = match fetched {
            Ok(Some(cert)) => {
                info!(subject = %cert.subject, days_left = cert.days_until_expiry, "Certificate retrieved");
                ("valid", serde_json::to_value(cert)?)
            }
            Ok(None) => ("invalid", Value::Null),
            Err(e) => {
                error!(error = %e, "SSL check error");
                ("error", Value::Null)
            }
        };

        Ok(json!({
            "target": target.to_string(),
            "port": port,
            "ssl_status": status,
            "certificate": certificate,
        }))
    }
}

fn fetch_certificate(
    target: IpAddr,
    port: u16,
    server_name: &str,
    connect_timeout: Duration,
) -> Result<Option<CertificateSummary>> {
    let connector = TlsConnector::new().map_err(|e| anyhow!("TlsConnector error: {}", e))?;

    let addr = SocketAddr::new(target, port);
    debug!(%addr, "Connecting TCP stream");
    let stream = TcpStream::connect_timeout(&addr, connect_timeout)?;
    stream.set_read_timeout(Some(connect_timeout))?;
    stream.set_write_timeout(Some(connect_timeout))?;

    debug!(server_name, "Performing TLS handshake");
    let mut tls = connector
        .connect(server_name, stream)
        .map_err(|e| anyhow!("TLS handshake error: {}", e))?;

    let peer = tls
        .peer_certificate()
        .map_err(|e| anyhow!("Could not get peer certificate: {}", e));
    let _ = tls.shutdown();

    let cert = match peer? {
        Some(cert) => cert,
        None => {
            debug!("Handshake completed without a peer certificate");
            return Ok(None);
        }
    };

    let der = cert
        .to_der()
        .map_err(|e| anyhow!("Could not convert certificate to DER: {}", e))?;
    summarize(&der, Utc::now()).map(Some)
}

/// Parse a DER certificate into the fields reported to the user.
pub fn summarize(der: &[u8], now: DateTime<Utc>) -> Result<CertificateSummary> {
    let (_, x509) = parse_x509_certificate(der).map_err(|e| anyhow!("X.509 parse error: {}", e))?;

    let validity = x509.validity();
    let not_before = asn1_time_to_chrono_utc(&validity.not_before);
    let not_after = asn1_time_to_chrono_utc(&validity.not_after);

    Ok(CertificateSummary {
        subject: x509.subject().to_string(),
        issuer: x509.issuer().to_string(),
        serial: x509.raw_serial_as_string(),
        not_before,
        not_after,
        days_until_expiry: not_after.signed_duration_since(now).num_days(),
        expired: now < not_before || now > not_after,
    })
}

fn asn1_time_to_chrono_utc(time: &ASN1Time) -> DateTime<Utc> {
    DateTime::from_timestamp(time.timestamp(), 0).unwrap_or_default()
}
