use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Central configuration for argus
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub scan: ScanConfig,
    pub http: HttpConfig,
    pub tls: TlsConfig,
    pub logging: LoggingConfig,
    pub api: ApiConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanConfig {
    pub workers: usize,
    pub timeout_ms: u64,
    pub default_ports: Vec<u16>,
    pub dedupe_ports: bool,
    pub detailed_status: bool,
    pub ping_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub timeout_secs: u64,
    pub user_agent: String,
    pub use_system_proxy: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TlsConfig {
    pub connect_timeout_secs: u64,
    pub default_port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<PathBuf>,
}

/// Endpoint templates use `{ip}` as the target placeholder.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub geoip_endpoint: String,
    pub breach_endpoint: String,
    pub threat_intel_endpoint: String,
    #[serde(skip)]
    pub keys: ApiKeys,
}

/// Credentials only ever come from the environment.
#[derive(Debug, Clone, Default)]
pub struct ApiKeys {
    pub geoip: Option<String>,
    pub breach: Option<String>,
    pub threat_intel: Option<String>,
}

pub const DEFAULT_PORTS: [u16; 4] = [22, 80, 443, 8080];

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            timeout_ms: 1000,
            default_ports: DEFAULT_PORTS.to_vec(),
            dedupe_ports: false,
            detailed_status: false,
            ping_timeout_secs: 2,
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 5,
            user_agent: format!("argus/{}", env!("CARGO_PKG_VERSION")),
            use_system_proxy: true,
        }
    }
}

impl Default for TlsConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 3,
            default_port: 443,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some(PathBuf::from("argus.log")),
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            geoip_endpoint: "https://suicixde.com/api/geoip.php?ip={ip}".to_string(),
            breach_endpoint: "https://api.breachchecker.com/v1/check?ip={ip}".to_string(),
            threat_intel_endpoint: "https://api.threatintel.com/v1/ip/{ip}".to_string(),
            keys: ApiKeys::default(),
        }
    }
}

impl Config {
    /// Load configuration from an explicit path, or from the standard config
    /// directory when present. Missing files fall back to defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::get_config_path(),
        };

        if config_path.exists() {
            let content = fs::read_to_string(&config_path)
                .with_context(|| format!("failed to read config {}", config_path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("invalid config {}", config_path.display()))?;
            Ok(config)
        } else if path.is_some() {
            Err(anyhow::anyhow!("config file {} not found", config_path.display()))
        } else {
            Ok(Self::default())
        }
    }

    /// Get the path to the config file
    pub fn get_config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("argus");
        path.push("config.json");
        path
    }

    /// Overlay values from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(file) = non_empty("ARGUS_LOG_FILE") {
            self.logging.file = Some(PathBuf::from(file));
        }
        if let Some(level) = non_empty("ARGUS_LOG_LEVEL") {
            self.logging.level = level.to_lowercase();
        }

        self.api.keys.geoip = non_empty("ARGUS_GEOIP_API_KEY").or(self.api.keys.geoip.take());
        self.api.keys.breach = non_empty("ARGUS_BREACH_API_KEY").or(self.api.keys.breach.take());
        self.api.keys.threat_intel =
            non_empty("ARGUS_THREAT_INTEL_API_KEY").or(self.api.keys.threat_intel.take());
    }

    /// Validate configuration settings
    pub fn validate(&self) -> Result<()> {
        if self.scan.workers == 0 {
            return Err(anyhow::anyhow!("scan.workers must be greater than 0"));
        }

        if self.scan.timeout_ms == 0 {
            return Err(anyhow::anyhow!("scan.timeout_ms must be greater than 0"));
        }

        if self.http.timeout_secs == 0 || self.tls.connect_timeout_secs == 0 {
            return Err(anyhow::anyhow!("network timeouts must be greater than 0"));
        }

        if self.scan.default_ports.contains(&0) {
            return Err(anyhow::anyhow!("scan.default_ports must not contain port 0"));
        }

        if !matches!(
            self.logging.level.as_str(),
            "trace" | "debug" | "info" | "warn" | "error"
        ) {
            return Err(anyhow::anyhow!(
                "logging.level must be one of: trace, debug, info, warn, error"
            ));
        }

        Ok(())
    }

    /// Create a minimal config for testing
    #[cfg(test)]
    pub fn test_config() -> Self {
        let mut config = Self::default();
        config.scan.timeout_ms = 200;
        config.http.timeout_secs = 2;
        config.http.use_system_proxy = false;
        config.tls.connect_timeout_secs = 1;
        config.logging.file = None;
        config
    }
}
