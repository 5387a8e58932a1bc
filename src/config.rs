//! Connection-level configuration: server discovery mode, polling cadence, and
//! HTTP timeouts. Loading this from a file on disk is out of scope here; a
//! caller that wants that builds an `EurekaConfig` itself and hands it to
//! `EurekaConnection::new`.

/// How `EurekaConnection` finds and talks to Eureka servers, and how often it
/// polls the registry.
#[derive(Debug, Clone)]
pub struct EurekaConfig {
    /// Whether the owning process is itself deployed in the cloud the DNS
    /// discovery zones describe. Affects which zone is tried first.
    pub in_the_cloud: bool,
    pub connect_timeout_seconds: u64,
    /// If true, `service_urls` is ignored and server addresses are resolved
    /// from DNS TXT records rooted at `server_dns_name`.
    pub use_dns_for_service_urls: bool,
    pub server_dns_name: String,
    /// Static list of base URLs, used when `use_dns_for_service_urls` is false.
    pub service_urls: Vec<String>,
    pub server_port: u16,
    /// Recommended period between `RegistryClient` refresh/heartbeat cycles.
    /// Not enforced here; `HeartbeatSupervisor` reads it from the config it's
    /// given.
    pub poll_interval_seconds: u64,
    pub enable_delta: bool,
    /// When choosing among multiple eligible servers, prefer one in the same
    /// availability zone as `in_the_cloud` would imply before falling back to
    /// the order servers were discovered in.
    pub prefer_same_zone: bool,
    pub register_with_eureka: bool,
}

impl Default for EurekaConfig {
    fn default() -> Self {
        EurekaConfig {
            in_the_cloud: false,
            connect_timeout_seconds: 10,
            use_dns_for_service_urls: false,
            server_dns_name: String::new(),
            service_urls: Vec::new(),
            server_port: 7001,
            poll_interval_seconds: 30,
            enable_delta: false,
            prefer_same_zone: false,
            register_with_eureka: false,
        }
    }
}

/// Wraps an `EurekaConfig` the same way upstream config files nest `eureka:`
/// under a top-level key; kept separate so a future file-based loader has
/// somewhere to land without reshaping `EurekaConfig` itself.
#[derive(Debug, Clone, Default)]
pub struct BaseConfig {
    pub eureka: EurekaConfig,
}

impl BaseConfig {
    /// Builds a connection from the nested `eureka` config. The entry point
    /// for a caller that loads its whole application config (with a
    /// `BaseConfig` record nested inside) rather than constructing an
    /// `EurekaConfig` directly.
    pub fn connect(self, codec: crate::codec::Codec, region: &str) -> Result<crate::EurekaConnection, crate::error::EurekaError> {
        crate::EurekaConnection::new(self.eureka, codec, region)
    }
}
