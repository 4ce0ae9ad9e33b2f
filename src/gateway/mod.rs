// ============================================================================
// Gateway Core
// ============================================================================
//
// The request pipeline's forwarding half:
// - discovery: resolve(service) -> base URL (static config or DNS names)
// - service_client: outbound HTTP, header propagation, error translation
// - router: prefix route table and the forwarding handler
// - subscription: cached subscription lookups against the user service
// - rate_limit: fixed-window counter with subscriber bypass
//
// ============================================================================

pub mod discovery;
pub mod rate_limit;
pub mod router;
pub mod service_client;
pub mod subscription;

pub use router::GatewayState;

/// Backend services the gateway fronts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Service {
    User,
    Core,
    Streaming,
    Messaging,
}

impl Service {
    /// Short identifier used in logs and the health probe path
    pub fn name(&self) -> &'static str {
        match self {
            Service::User => "user",
            Service::Core => "core",
            Service::Streaming => "streaming",
            Service::Messaging => "messaging",
        }
    }

    /// Hostname used in "dns" discovery mode
    pub fn host(&self) -> &'static str {
        match self {
            Service::User => "user-service",
            Service::Core => "core-service",
            Service::Streaming => "streaming-service",
            Service::Messaging => "messaging-service",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "user" => Some(Service::User),
            "core" => Some(Service::Core),
            "streaming" => Some(Service::Streaming),
            "messaging" => Some(Service::Messaging),
            _ => None,
        }
    }
}
