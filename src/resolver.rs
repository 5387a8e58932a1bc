//! Resolves the ordered list of candidate Eureka server base URLs that
//! `RegistryClient` retries against, either from static configuration or from
//! DNS discovery.

use std::fmt::Debug;
use std::sync::{Arc, RwLock};

use crate::config::EurekaConfig;
use crate::dns::DnsResolver;
use crate::error::EurekaError;

pub trait ServerListResolver: Debug + Send + Sync {
    fn resolve(&self) -> Result<Vec<String>, EurekaError>;
}

/// Backed by `EurekaConfig::service_urls`, unchanged for the resolver's
/// lifetime: no background refresh, since a static list has nothing to
/// refresh.
#[derive(Debug)]
pub struct ConfigServerListResolver {
    urls: Vec<String>,
}

impl ConfigServerListResolver {
    pub fn new(config: &EurekaConfig) -> Self {
        ConfigServerListResolver {
            urls: config.service_urls.clone(),
        }
    }
}

impl ServerListResolver for ConfigServerListResolver {
    fn resolve(&self) -> Result<Vec<String>, EurekaError> {
        if self.urls.is_empty() {
            return Err(EurekaError::Validation(
                "service_urls is empty and use_dns_for_service_urls is false".to_string(),
            ));
        }
        Ok(self.urls.clone())
    }
}

/// Backed by `dns::discover_dns`, re-resolved on every call to `resolve` (the
/// TTL returned by discovery is exposed via `last_ttl` for a caller that wants
/// to schedule its own refresh cadence rather than re-resolve unconditionally).
#[derive(Debug)]
pub struct DnsServerListResolver {
    dns: DnsResolver,
    apex: String,
    port: u16,
    region: String,
    prefer_same_zone: bool,
    last_ttl_secs: RwLock<u64>,
}

impl DnsServerListResolver {
    pub fn new(config: &EurekaConfig, region: impl Into<String>) -> Result<Self, EurekaError> {
        Ok(DnsServerListResolver {
            dns: DnsResolver::new()?,
            apex: config.server_dns_name.clone(),
            port: config.server_port,
            region: region.into(),
            prefer_same_zone: config.prefer_same_zone,
            last_ttl_secs: RwLock::new(0),
        })
    }

    pub fn last_ttl_secs(&self) -> u64 {
        *self.last_ttl_secs.read().unwrap()
    }
}

impl ServerListResolver for DnsServerListResolver {
    fn resolve(&self) -> Result<Vec<String>, EurekaError> {
        let (urls, ttl) = self
            .dns
            .discover_dns(&self.apex, self.port, &self.region, self.prefer_same_zone)?;
        *self.last_ttl_secs.write().unwrap() = ttl.as_secs();
        Ok(urls)
    }
}

pub fn resolver_for(config: &EurekaConfig, region: &str) -> Result<Arc<dyn ServerListResolver>, EurekaError> {
    if config.use_dns_for_service_urls {
        Ok(Arc::new(DnsServerListResolver::new(config, region)?))
    } else {
        Ok(Arc::new(ConfigServerListResolver::new(config)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dns::mock_dns::{resolver_config_for, resolver_opts, MockDnsServer};
    use std::collections::HashMap;

    #[test]
    fn dns_resolver_honors_prefer_same_zone_flag() {
        let mut records = HashMap::new();
        records.insert(
            "txt.example.com.".to_string(),
            (
                vec!["us-east-1a.example.com".to_string(), "us-east-1b.example.com".to_string()],
                60,
            ),
        );
        records.insert(
            "txt.us-east-1a.example.com.".to_string(),
            (vec!["host-a.example.com".to_string()], 60),
        );
        records.insert(
            "txt.us-east-1b.example.com.".to_string(),
            (vec!["host-b.example.com".to_string()], 60),
        );
        let server = MockDnsServer::start(records);

        let resolver = DnsServerListResolver {
            dns: DnsResolver::with_config(resolver_config_for(server.addr), resolver_opts()).unwrap(),
            apex: "example.com".to_string(),
            port: 7001,
            region: "1b".to_string(),
            prefer_same_zone: true,
            last_ttl_secs: RwLock::new(0),
        };
        let urls = resolver.resolve().unwrap();
        assert_eq!(urls[0], "http://host-b.example.com:7001/eureka/v2");
        assert_eq!(resolver.last_ttl_secs(), 60);

        let resolver = DnsServerListResolver {
            dns: DnsResolver::with_config(resolver_config_for(server.addr), resolver_opts()).unwrap(),
            apex: "example.com".to_string(),
            port: 7001,
            region: "1b".to_string(),
            prefer_same_zone: false,
            last_ttl_secs: RwLock::new(0),
        };
        let urls = resolver.resolve().unwrap();
        assert_eq!(urls[0], "http://host-a.example.com:7001/eureka/v2");
    }

    #[test]
    fn config_resolver_returns_configured_urls() {
        let config = EurekaConfig {
            service_urls: vec!["http://a:7001/eureka/v2".to_string()],
            ..EurekaConfig::default()
        };
        let resolver = ConfigServerListResolver::new(&config);
        assert_eq!(resolver.resolve().unwrap(), vec!["http://a:7001/eureka/v2"]);
    }

    #[test]
    fn config_resolver_with_no_urls_is_a_validation_error() {
        let config = EurekaConfig::default();
        let resolver = ConfigServerListResolver::new(&config);
        assert!(matches!(resolver.resolve(), Err(EurekaError::Validation(_))));
    }
}
