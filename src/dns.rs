//! DNS-based Eureka server discovery, AWS-style: a TXT record rooted at an
//! apex enumerates availability zones, and a TXT record per zone enumerates
//! that zone's server hostnames.

use std::time::Duration;

use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::Resolver;

use crate::error::EurekaError;

pub struct DnsResolver {
    resolver: Resolver,
}

impl std::fmt::Debug for DnsResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DnsResolver").finish_non_exhaustive()
    }
}

impl DnsResolver {
    pub fn new() -> Result<Self, EurekaError> {
        Self::with_config(ResolverConfig::default(), ResolverOpts::default())
    }

    /// Builds atop an explicit resolver configuration, e.g. to point at a
    /// specific nameserver instead of the system's default. Used by tests to
    /// drive discovery against a local mock nameserver.
    pub fn with_config(config: ResolverConfig, opts: ResolverOpts) -> Result<Self, EurekaError> {
        let resolver = Resolver::new(config, opts).map_err(|e| EurekaError::Dns(e.to_string()))?;
        Ok(DnsResolver { resolver })
    }

    /// Looks up every TXT record on `name` (which must be fully qualified,
    /// ending in `.`). Returns the concatenated string payloads and the
    /// minimum TTL observed across the record set.
    pub fn find_txt(&self, name: &str) -> Result<(Vec<String>, Duration), EurekaError> {
        let lookup = self
            .resolver
            .txt_lookup(name)
            .map_err(|e| EurekaError::Dns(format!("{}: {}", name, e)))?;

        let ttl = lookup.as_lookup().valid_until();
        let min_ttl = Duration::from_secs(
            lookup
                .as_lookup()
                .record_iter()
                .map(|r| r.ttl() as u64)
                .min()
                .unwrap_or(0),
        );
        let _ = ttl;

        let mut payloads = Vec::new();
        for txt in lookup.iter() {
            let joined: String = txt
                .txt_data()
                .iter()
                .map(|chunk| String::from_utf8_lossy(chunk).into_owned())
                .collect();
            payloads.push(joined);
        }
        if payloads.is_empty() {
            return Err(EurekaError::Dns(format!("no TXT records for {}", name)));
        }
        Ok((payloads, min_ttl))
    }

    /// Resolves the full zone hierarchy under `apex` into Eureka server base
    /// URLs. When `prefer_same_zone` is true and `region` is non-empty, a
    /// zone matching `region` is moved to the front before expansion.
    pub fn discover_dns(
        &self,
        apex: &str,
        port: u16,
        region: &str,
        prefer_same_zone: bool,
    ) -> Result<(Vec<String>, Duration), EurekaError> {
        let zones_record = format!("txt.{}.", apex);
        let (mut zones, mut min_ttl) = self.find_txt(&zones_record)?;

        if prefer_same_zone && !region.is_empty() {
            if let Some(pos) = zones.iter().position(|z| z.contains(region)) {
                let matched = zones.remove(pos);
                zones.insert(0, matched);
            }
        }

        let mut urls = Vec::new();
        let mut seen = std::collections::HashSet::new();
        for zone in &zones {
            let zone_record = format!("txt.{}.", zone);
            let (hosts, ttl) = self.find_txt(&zone_record)?;
            if ttl < min_ttl {
                min_ttl = ttl;
            }
            for host in hosts {
                let url = format!("http://{}:{}/eureka/v2", host, port);
                if seen.insert(url.clone()) {
                    urls.push(url);
                }
            }
        }

        Ok((urls, min_ttl))
    }
}


#[cfg(test)]
mod tests {
    use super::mock_dns::{resolver_config_for, resolver_opts, MockDnsServer};
    use super::*;
    use std::collections::HashMap;

    fn dns_resolver(server: &MockDnsServer) -> DnsResolver {
        DnsResolver::with_config(resolver_config_for(server.addr), resolver_opts()).unwrap()
    }

    #[test]
    fn find_txt_returns_payloads_and_min_ttl() {
        let mut records = HashMap::new();
        records.insert(
            "txt.example.com.".to_string(),
            (vec!["payload-a".to_string(), "payload-b".to_string()], 60),
        );
        let server = MockDnsServer::start(records);
        let resolver = dns_resolver(&server);

        let (payloads, ttl) = resolver.find_txt("txt.example.com.").unwrap();
        assert_eq!(payloads.len(), 2);
        assert!(payloads.contains(&"payload-a".to_string()));
        assert!(payloads.contains(&"payload-b".to_string()));
        assert_eq!(ttl, Duration::from_secs(60));
    }

    #[test]
    fn find_txt_on_unknown_name_is_a_dns_error() {
        let server = MockDnsServer::start(HashMap::new());
        let resolver = dns_resolver(&server);

        assert!(matches!(resolver.find_txt("txt.nope.example."), Err(EurekaError::Dns(_))));
    }

    #[test]
    fn discover_dns_expands_every_zone_into_server_urls() {
        let mut records = HashMap::new();
        records.insert(
            "txt.example.com.".to_string(),
            (
                vec![
                    "us-east-1a.example.com".to_string(),
                    "us-east-1b.example.com".to_string(),
                    "us-east-1c.example.com".to_string(),
                ],
                60,
            ),
        );
        records.insert(
            "txt.us-east-1a.example.com.".to_string(),
            (vec!["host1.example.com".to_string(), "host2.example.com".to_string()], 60),
        );
        records.insert(
            "txt.us-east-1b.example.com.".to_string(),
            (vec!["host3.example.com".to_string(), "host4.example.com".to_string()], 60),
        );
        records.insert(
            "txt.us-east-1c.example.com.".to_string(),
            (vec!["host5.example.com".to_string(), "host6.example.com".to_string()], 60),
        );
        let server = MockDnsServer::start(records);
        let resolver = dns_resolver(&server);

        let (urls, ttl) = resolver.discover_dns("example.com", 7001, "", false).unwrap();
        assert_eq!(urls.len(), 6);
        assert!(urls.contains(&"http://host1.example.com:7001/eureka/v2".to_string()));
        assert!(urls.contains(&"http://host6.example.com:7001/eureka/v2".to_string()));
        assert_eq!(ttl, Duration::from_secs(60));
    }

    #[test]
    fn discover_dns_prefers_the_region_matched_zone_only_when_enabled() {
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
        let resolver = dns_resolver(&server);

        let (preferred, _) = resolver.discover_dns("example.com", 7001, "1b", true).unwrap();
        assert_eq!(preferred[0], "http://host-b.example.com:7001/eureka/v2");

        let (unpreferred, _) = resolver.discover_dns("example.com", 7001, "1b", false).unwrap();
        assert_eq!(unpreferred[0], "http://host-a.example.com:7001/eureka/v2");
    }
}
