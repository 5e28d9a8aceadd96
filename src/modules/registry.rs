use std::collections::HashMap;
use std::sync::Arc;

use super::builtin::{AuditReportModule, NetworkScanModule, PortScanModule};
use super::intel::ApiLookupModule;
use super::tls::SslMonitorModule;
use super::{ModuleContext, SecurityModule};

/// Registry of the modules available to the dispatcher. Populated at startup
/// from statically known implementations.
pub struct ModuleRegistry {
    modules: HashMap<String, Arc<dyn SecurityModule>>,
    order: Vec<String>,
}

impl ModuleRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Registry holding the seven built-in modules, in menu order
    pub fn with_builtin(ctx: &ModuleContext) -> Self {
        let mut registry = Self::new();
        registry.register(Arc::new(NetworkScanModule::new(ctx)));
        registry.register(Arc::new(PortScanModule::new(ctx)));
        registry.register(Arc::new(SslMonitorModule::new(ctx)));
        registry.register(Arc::new(ApiLookupModule::geoip(ctx)));
        registry.register(Arc::new(ApiLookupModule::breach_check(ctx)));
        registry.register(Arc::new(ApiLookupModule::threat_intel(ctx)));
        registry.register(Arc::new(AuditReportModule::new()));
        registry
    }

    /// Register a module. A module with the same name replaces the old one.
    pub fn register(&mut self, module: Arc<dyn SecurityModule>) {
        let name = module.name().to_string();
        if self.modules.insert(name.clone(), module).is_none() {
            self.order.push(name);
        }
    }

    /// Get a module by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn SecurityModule>> {
        self.modules.get(name).cloned()
    }

    /// All registered names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.keys().cloned().collect();
        names.sort();
        names
    }

    /// Modules in registration order
    pub fn entries(&self) -> Vec<Arc<dyn SecurityModule>> {
        self.order
            .iter()
            .filter_map(|name| self.modules.get(name).cloned())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

impl Default for ModuleRegistry {
    fn default() -> Self {
        Self::new()
    }
}
