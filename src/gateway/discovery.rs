// ============================================================================
// Service Discovery
// ============================================================================
//
// Resolves a backend service to its base URL. Two modes:
// - Static: fixed URLs from config
// - DNS: "http://{service-host}" names resolved by the platform's DNS
//   (container orchestrators, service meshes)
//
// Unknown modes fall back to static.
//
// ============================================================================

use anyhow::Result;
use std::sync::Arc;

use super::Service;
use crate::config::UpstreamConfig;

/// Service discovery abstraction
pub trait ServiceDiscovery: Send + Sync {
    /// Get the base URL for a given service
    fn resolve(&self, service: Service) -> Result<String>;
}

/// Static service discovery (from config)
pub struct StaticServiceDiscovery {
    config: Arc<UpstreamConfig>,
}

impl StaticServiceDiscovery {
    pub fn new(config: Arc<UpstreamConfig>) -> Self {
        Self { config }
    }
}

impl ServiceDiscovery for StaticServiceDiscovery {
    fn resolve(&self, service: Service) -> Result<String> {
        let url = match service {
            Service::User => self.config.user_service_url.clone(),
            Service::Core => self.config.core_service_url.clone(),
            Service::Streaming => self.config.streaming_service_url.clone(),
            Service::Messaging => self.config.messaging_service_url.clone(),
        };
        Ok(url)
    }
}

/// DNS-based service discovery: service names double as hostnames
pub struct DnsServiceDiscovery;

impl ServiceDiscovery for DnsServiceDiscovery {
    fn resolve(&self, service: Service) -> Result<String> {
        Ok(format!("http://{}", service.host()))
    }
}

/// Create service discovery based on config
pub fn create_service_discovery(config: Arc<UpstreamConfig>) -> Box<dyn ServiceDiscovery> {
    match config.discovery_mode.as_str() {
        "static" => Box::new(StaticServiceDiscovery::new(config)),
        "dns" => Box::new(DnsServiceDiscovery),
        other => {
            tracing::warn!(mode = %other, "Unknown discovery mode, falling back to static");
            Box::new(StaticServiceDiscovery::new(config))
        }
    }
}
