use std::net::IpAddr;

use async_trait::async_trait;
use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::{ModuleContext, ModuleOptions, ModuleResult, SecurityModule};

/// REST passthrough: GET an endpoint for the target and wrap the JSON body
/// under a single field. Breach, GeoIP and threat-intel lookups differ only
/// in endpoint, field name and whether a key is mandatory.
pub struct ApiLookupModule {
    name: &'static str,
    description: &'static str,
    field: &'static str,
    endpoint: String,
    api_key: Option<String>,
    key_required: bool,
    client: reqwest::Client,
}

impl ApiLookupModule {
    pub fn breach_check(ctx: &ModuleContext) -> Self {
        Self {
            name: "breach-check",
            description: "Check for known breaches",
            field: "breach",
            endpoint: ctx.config.api.breach_endpoint.clone(),
            api_key: ctx.config.api.keys.breach.clone(),
            key_required: true,
            client: ctx.http.clone(),
        }
    }

    pub fn geoip(ctx: &ModuleContext) -> Self {
        Self {
            name: "geoip",
            description: "Get geographic & ISP information",
            field: "geoip",
            endpoint: ctx.config.api.geoip_endpoint.clone(),
            api_key: ctx.config.api.keys.geoip.clone(),
            key_required: false,
            client: ctx.http.clone(),
        }
    }

    pub fn threat_intel(ctx: &ModuleContext) -> Self {
        Self {
            name: "threat-intel",
            description: "Fetch threat intelligence data",
            field: "threat_intel",
            endpoint: ctx.config.api.threat_intel_endpoint.clone(),
            api_key: ctx.config.api.keys.threat_intel.clone(),
            key_required: true,
            client: ctx.http.clone(),
        }
    }

    fn url_for(&self, target: IpAddr) -> String {
        self.endpoint.replace("{ip}", &target.to_string())
    }

    async fn fetch(&self, url: &str) -> Result<Value, reqwest::Error> {
        let mut request = self.client.get(url);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?.error_for_status()?;
        debug!(status = %response.status(), "Lookup response received");
        response.json::<Value>().await
    }

    fn record(&self, target: IpAddr, payload: Value) -> Value {
        let mut record = serde_json::Map::new();
        record.insert("target".to_string(), json!(target.to_string()));
        record.insert(self.field.to_string(), payload);
        Value::Object(record)
    }
}

#[async_trait]
impl SecurityModule for ApiLookupModule {
    fn name(&self) -> &str {
        self.name
    }

    fn description(&self) -> &str {
        self.description
    }

    async fn run(&self, target: IpAddr, _options: &ModuleOptions) -> ModuleResult<Value> {
        info!(module = self.name, %target, "Lookup started");

        if self.key_required && self.api_key.is_none() {
            warn!(module = self.name, "No API key provided");
            return Ok(self.record(target, json!("API key missing")));
        }

        match self.fetch(&self.url_for(target)).await {
            Ok(data) => Ok(self.record(target, data)),
            Err(e) => {
                error!(module = self.name, error = %e, "Lookup API error");
                Ok(self.record(target, json!("API error")))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;
    use tokio::sync::oneshot;

    /// One-shot HTTP server on loopback. Returns the base URL and a receiver
    /// for the raw request it saw.
    async fn canned_server(status_line: &'static str, body: &'static str) -> (String, oneshot::Receiver<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (tx, rx) = oneshot::channel();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 1024];
            while !request.windows(4).any(|w| w == b"\r\n\r\n") {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
            }
            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            let _ = tx.send(String::from_utf8_lossy(&request).to_string());
        });

        (format!("http://{}", addr), rx)
    }

    fn context(configure: impl FnOnce(&mut Config)) -> ModuleContext {
        let mut config = Config::test_config();
        configure(&mut config);
        ModuleContext::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_missing_key_short_circuits() {
        let ctx = context(|c| c.api.keys.threat_intel = None);
        let out = ApiLookupModule::threat_intel(&ctx)
            .run("203.0.113.5".parse().unwrap(), &ModuleOptions::default())
            .await
            .unwrap();
        assert_eq!(out, json!({"target": "203.0.113.5", "threat_intel": "API key missing"}));
    }

    #[tokio::test]
    async fn test_successful_lookup_sends_bearer_and_wraps_body() {
        let (base, seen) = canned_server("200 OK", r#"{"score": 87, "tags": ["botnet"]}"#).await;
        let ctx = context(|c| {
            c.api.threat_intel_endpoint = format!("{}/v1/ip/{{ip}}", base);
            c.api.keys.threat_intel = Some("ti-secret".to_string());
        });

        let out = ApiLookupModule::threat_intel(&ctx)
            .run("203.0.113.5".parse().unwrap(), &ModuleOptions::default())
            .await
            .unwrap();

        assert_eq!(out["target"], "203.0.113.5");
        assert_eq!(out["threat_intel"], json!({"score": 87, "tags": ["botnet"]}));

        let request = seen.await.unwrap();
        assert!(request.starts_with("GET /v1/ip/203.0.113.5 "));
        assert!(request.to_lowercase().contains("authorization: bearer ti-secret"));
    }

    #[tokio::test]
    async fn test_error_status_becomes_api_error() {
        let (base, _seen) = canned_server("500 Internal Server Error", r#"{"error": "boom"}"#).await;
        let ctx = context(|c| {
            c.api.breach_endpoint = format!("{}/v1/check?ip={{ip}}", base);
            c.api.keys.breach = Some("breach-key".to_string());
        });

        let out = ApiLookupModule::breach_check(&ctx)
            .run("198.51.100.7".parse().unwrap(), &ModuleOptions::default())
            .await
            .unwrap();
        assert_eq!(out, json!({"target": "198.51.100.7", "breach": "API error"}));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_becomes_api_error() {
        let port = {
            let l = TcpListener::bind("127.0.0.1:0").await.unwrap();
            l.local_addr().unwrap().port()
        };
        let ctx = context(|c| c.api.geoip_endpoint = format!("http://127.0.0.1:{}/geo?ip={{ip}}", port));

        let out = ApiLookupModule::geoip(&ctx)
            .run("198.51.100.7".parse().unwrap(), &ModuleOptions::default())
            .await
            .unwrap();
        assert_eq!(out["geoip"], "API error");
    }

    #[tokio::test]
    async fn test_geoip_works_without_key() {
        let (base, seen) = canned_server("200 OK", r#"{"country": "NL"}"#).await;
        let ctx = context(|c| {
            c.api.geoip_endpoint = format!("{}/api/geoip.php?ip={{ip}}", base);
            c.api.keys.geoip = None;
        });

        let out = ApiLookupModule::geoip(&ctx)
            .run("192.0.2.44".parse().unwrap(), &ModuleOptions::default())
            .await
            .unwrap();
        assert_eq!(out["geoip"]["country"], "NL");

        let request = seen.await.unwrap();
        assert!(request.starts_with("GET /api/geoip.php?ip=192.0.2.44 "));
        assert!(!request.to_lowercase().contains("authorization:"));
    }

    #[test]
    fn test_url_substitution() {
        let ctx = context(|_| {});
        let module = ApiLookupModule::breach_check(&ctx);
        assert_eq!(
            module.url_for("10.0.0.1".parse().unwrap()),
            "https://api.breachchecker.com/v1/check?ip=10.0.0.1"
        );
    }
}
