use std::net::IpAddr;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use crate::config::Config;

pub mod builtin;
pub mod intel;
pub mod registry;
pub mod tls;

pub use registry::ModuleRegistry;

/// A single security check that can be dispatched against a target.
#[async_trait]
pub trait SecurityModule: Send + Sync {
    /// Name used on the command line, e.g. `port-scan`
    fn name(&self) -> &str;

    /// One-line description for menus and help
    fn description(&self) -> &str;

    /// Run the check and return its JSON record
    async fn run(&self, target: IpAddr, options: &ModuleOptions) -> ModuleResult<Value>;
}

/// Per-invocation options handed to a module.
#[derive(Debug, Clone, Default)]
pub struct ModuleOptions {
    /// Raw comma-separated port list from the user
    pub ports: Option<String>,
    /// Hostname the user typed, when the target was resolved from one
    pub hostname: Option<String>,
}

/// Everything a module may depend on, built once at startup.
#[derive(Debug, Clone)]
pub struct ModuleContext {
    pub config: Config,
    pub http: reqwest::Client,
}

impl ModuleContext {
    pub fn new(config: Config) -> ModuleResult<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.http.timeout_secs))
            .user_agent(config.http.user_agent.clone());
        if !config.http.use_system_proxy {
            builder = builder.no_proxy();
        }
        let http = builder.build()?;
        Ok(Self { config, http })
    }
}

/// Module execution error
#[derive(Debug, thiserror::Error)]
pub enum ModuleError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Background task failed: {0}")]
    Task(String),
}

/// Result type for module operations
pub type ModuleResult<T> = Result<T, ModuleError>;
