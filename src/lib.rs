//! Client library for Netflix Eureka service discovery: DNS-based server
//! discovery, the register/heartbeat/deregister lifecycle, and a query
//! pipeline over fetched instance data.

#[macro_use]
extern crate log;
#[macro_use]
extern crate quick_error;

pub mod application;
pub mod aws;
pub mod codec;
pub mod config;
pub mod dns;
pub mod error;
pub mod heartbeat;
pub mod http;
pub mod instance;
pub mod metadata;
pub mod query;
pub mod registry;
pub mod resolver;

use std::sync::Arc;

pub use crate::application::{Application, Applications};
pub use crate::codec::Codec;
pub use crate::config::{BaseConfig, EurekaConfig};
pub use crate::error::{http_response_status_code, EurekaError};
pub use crate::heartbeat::{HeartbeatHandle, HeartbeatSupervisor};
pub use crate::instance::{
    AmazonMetadataType, DataCenterInfo, DcNameType, Instance, LeaseInfo, PortData, StatusType,
};
pub use crate::metadata::InstanceMetadata;
pub use crate::query::{filter_instances_in_apps, shuffled, shuffled_with, that_are_up, with_status};

use crate::aws::AwsMetadata;
use crate::http::HttpInvoker;
use crate::registry::RegistryClient;
use crate::resolver::resolver_for;

/// A bound connection to a Eureka cluster: a resolved server list, an HTTP
/// transport, and the wire codec they talk. This is the crate's main entry
/// point; construct one per Eureka deployment your process talks to.
pub struct EurekaConnection {
    config: EurekaConfig,
    registry: Arc<RegistryClient>,
}

impl EurekaConnection {
    /// Resolves the server list (DNS or static, per
    /// `config.use_dns_for_service_urls`) and builds the registry client atop
    /// it. `region` is consulted for DNS discovery's zone tie-break; if
    /// `config.in_the_cloud` is set and `region` is empty, the region is
    /// instead discovered from the EC2 instance metadata service.
    pub fn new(config: EurekaConfig, codec: Codec, region: &str) -> Result<Self, EurekaError> {
        let region = if config.in_the_cloud && region.is_empty() {
            Self::region_from_aws_metadata()
        } else {
            region.to_string()
        };
        let resolver = resolver_for(&config, &region)?;
        let base_urls = resolver.resolve()?;
        let http = HttpInvoker::with_connect_timeout(config.connect_timeout_seconds)?;
        let registry = Arc::new(RegistryClient::new(base_urls, http, codec));
        Ok(EurekaConnection { config, registry })
    }

    /// Best-effort: a metadata-service miss (e.g. not actually running on
    /// EC2) just means no zone tie-break, not a failed connection.
    fn region_from_aws_metadata() -> String {
        match AwsMetadata::default().fetch_metadata() {
            Ok(meta) if !meta.availability_zone.is_empty() => meta.availability_zone,
            Ok(_) => String::new(),
            Err(e) => {
                warn!("in_the_cloud is set but AWS metadata lookup failed: {}", e);
                String::new()
            }
        }
    }

    /// Builds atop an already-resolved list of base URLs, skipping DNS/static
    /// resolution entirely. Useful for tests and for callers who resolve
    /// server lists themselves.
    pub fn with_base_urls(
        config: EurekaConfig,
        base_urls: Vec<String>,
        codec: Codec,
    ) -> Result<Self, EurekaError> {
        let http = HttpInvoker::with_connect_timeout(config.connect_timeout_seconds)?;
        let registry = Arc::new(RegistryClient::new(base_urls, http, codec));
        Ok(EurekaConnection { config, registry })
    }

    pub fn registry(&self) -> &RegistryClient {
        &self.registry
    }

    /// A clone of the `Arc<RegistryClient>` backing this connection, for a
    /// caller that wants to hand it to a `HeartbeatSupervisor` or otherwise
    /// outlive the `EurekaConnection` itself.
    pub fn registry_handle(&self) -> Arc<RegistryClient> {
        Arc::clone(&self.registry)
    }

    pub fn config(&self) -> &EurekaConfig {
        &self.config
    }

    /// Registers `instance`. A single RPC — the library does not spawn a
    /// heartbeat thread as a side effect; construct and spawn a
    /// `HeartbeatSupervisor` (via `registry_handle`) if the registration
    /// needs to be kept alive.
    pub fn register(&self, instance: &Instance) -> Result<(), EurekaError> {
        self.registry.register(instance)
    }
}
