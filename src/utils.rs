use std::collections::HashSet;
use std::net::IpAddr;

use anyhow::Result;
use tracing::debug;

/// Returns true if `input` is an IPv4 or IPv6 literal.
pub fn validate_ip(input: &str) -> bool {
    input.trim().parse::<IpAddr>().is_ok()
}

/// Returns true if `token` is a decimal port number in 1..=65535.
pub fn validate_port(token: &str) -> bool {
    parse_port(token).is_some()
}

fn parse_port(token: &str) -> Option<u16> {
    let token = token.trim();
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    match token.parse::<u16>() {
        Ok(0) | Err(_) => None,
        Ok(port) => Some(port),
    }
}

/// Parse a comma-separated port list.
///
/// Tokens that are not a bounded positive integer are dropped. An absent
/// list, or one where nothing survives, yields `defaults`. Duplicates and
/// order of appearance are kept.
pub fn parse_ports(spec: Option<&str>, defaults: &[u16]) -> Vec<u16> {
    let parsed: Vec<u16> = spec
        .map(|s| s.split(',').filter_map(parse_port).collect())
        .unwrap_or_default();

    if parsed.is_empty() {
        debug!(spec = ?spec, "No usable ports supplied, using defaults");
        defaults.to_vec()
    } else {
        parsed
    }
}

/// Drop repeated ports, keeping the first occurrence.
pub fn dedupe_ports(ports: Vec<u16>) -> Vec<u16> {
    let mut seen = HashSet::with_capacity(ports.len());
    ports.into_iter().filter(|p| seen.insert(*p)).collect()
}

/// Resolve a user-supplied target to an address. IP literals are returned
/// as-is; anything else goes through the system resolver.
pub async fn resolve_target(target: &str) -> Result<IpAddr> {
    let target = target.trim();

    if let Ok(ip) = target.parse::<IpAddr>() {
        return Ok(ip);
    }

    if target.is_empty() {
        return Err(anyhow::anyhow!("empty target"));
    }

    let mut addrs = tokio::net::lookup_host((target, 0)).await?;
    let addr = addrs
        .next()
        .ok_or_else(|| anyhow::anyhow!("Failed to resolve hostname {}", target))?;

    debug!(target, ip = %addr.ip(), "Resolved hostname");
    Ok(addr.ip())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULTS: [u16; 4] = [22, 80, 443, 8080];

    #[test]
    fn test_validate_ip() {
        assert!(validate_ip("127.0.0.1"));
        assert!(validate_ip("::1"));
        assert!(validate_ip("2001:db8::1"));
        assert!(!validate_ip("256.1.1.1"));
        assert!(!validate_ip("example.com"));
        assert!(!validate_ip(""));
    }

    #[test]
    fn test_validate_port() {
        assert!(validate_port("1"));
        assert!(validate_port(" 443 "));
        assert!(validate_port("65535"));
        assert!(!validate_port("0"));
        assert!(!validate_port("65536"));
        assert!(!validate_port("+80"));
        assert!(!validate_port("-1"));
        assert!(!validate_port("http"));
    }

    #[test]
    fn test_malformed_tokens_are_dropped() {
        assert_eq!(parse_ports(Some("80, abc, 99999"), &DEFAULTS), vec![80]);
    }

    #[test]
    fn test_missing_list_uses_defaults() {
        assert_eq!(parse_ports(None, &DEFAULTS), vec![22, 80, 443, 8080]);
        assert_eq!(parse_ports(Some(""), &DEFAULTS), vec![22, 80, 443, 8080]);
        assert_eq!(parse_ports(Some("abc, 0, 70000"), &DEFAULTS), vec![22, 80, 443, 8080]);
    }

    #[test]
    fn test_order_and_duplicates_preserved() {
        assert_eq!(parse_ports(Some("443,22,443, 8080,,"), &DEFAULTS), vec![443, 22, 443, 8080]);
    }

    #[test]
    fn test_dedupe_keeps_first_occurrence() {
        assert_eq!(dedupe_ports(vec![443, 22, 443, 22, 80]), vec![443, 22, 80]);
    }

    #[tokio::test]
    async fn test_resolve_ip_literal_without_lookup() {
        let ip = resolve_target(" 10.0.0.7 ").await.unwrap();
        assert_eq!(ip, "10.0.0.7".parse::<IpAddr>().unwrap());
    }

    #[tokio::test]
    async fn test_resolve_localhost() {
        let ip = resolve_target("localhost").await.unwrap();
        assert!(ip.is_loopback());
    }

    #[tokio::test]
    async fn test_resolve_empty_target_fails() {
        assert!(resolve_target("   ").await.is_err());
    }
}
