//! EC2 instance metadata lookup, used to populate `DataCenterInfo::metadata`
//! when `in_the_cloud` is set.

use std::time::Duration;

use reqwest::blocking::Client;

use crate::error::EurekaError;
use crate::instance::AmazonMetadataType;

const METADATA_PATHS: &[(&str, &str)] = &[
    ("ami-launch-index", "ami-launch-index"),
    ("local-hostname", "local-hostname"),
    ("placement/availability-zone", "availability-zone"),
    ("instance-id", "instance-id"),
    ("public-ipv4", "public-ipv4"),
    ("public-hostname", "public-hostname"),
    ("ami-manifest-path", "ami-manifest-path"),
    ("local-ipv4", "local-ipv4"),
    ("hostname", "hostname"),
    ("ami-id", "ami-id"),
    ("instance-type", "instance-type"),
];

#[derive(Debug, Clone)]
pub struct AwsMetadata {
    host: String,
    client: Client,
}

impl Default for AwsMetadata {
    fn default() -> Self {
        AwsMetadata {
            host: String::from("169.254.169.254"),
            client: Client::builder()
                .connect_timeout(Duration::from_millis(500))
                .build()
                .expect("reqwest client with a fixed timeout always builds"),
        }
    }
}

impl AwsMetadata {
    /// Fetches the full Amazon metadata document by issuing one request per
    /// key under `http://169.254.169.254/latest/meta-data/`. A key that 404s
    /// (not every instance type publishes every field) is left blank rather
    /// than failing the whole fetch.
    pub fn fetch_metadata(&self) -> Result<AmazonMetadataType, EurekaError> {
        let mut meta = AmazonMetadataType::default();
        for (path, field) in METADATA_PATHS {
            let value = self.lookup_metadata_key(path).unwrap_or_default();
            match *field {
                "ami-launch-index" => meta.ami_launch_index = value,
                "local-hostname" => meta.local_hostname = value,
                "availability-zone" => meta.availability_zone = value,
                "instance-id" => meta.instance_id = value,
                "public-ipv4" => meta.public_ipv4 = value,
                "public-hostname" => meta.public_hostname = value,
                "ami-manifest-path" => meta.ami_manifest_path = value,
                "local-ipv4" => meta.local_ipv4 = value,
                "hostname" => meta.hostname = value,
                "ami-id" => meta.ami_id = value,
                "instance-type" => meta.instance_type = value,
                _ => unreachable!(),
            }
        }
        Ok(meta)
    }

    fn lookup_metadata_key(&self, key: &str) -> Result<String, EurekaError> {
        let url = format!("http://{}/latest/meta-data/{}", self.host, key);
        let resp = self.client.get(&url).send().map_err(EurekaError::Network)?;
        if !resp.status().is_success() {
            return Err(EurekaError::http_status(resp.status().as_u16()));
        }
        resp.text().map_err(EurekaError::Network)
    }

    /// The raw, unparsed instance identity document
    /// (`latest/dynamic/instance-identity/document`), used by callers that
    /// need fields `fetch_metadata` doesn't expose (account id, region).
    pub fn lookup_instance_identity(&self) -> Result<String, EurekaError> {
        let url = format!("http://{}/latest/dynamic/instance-identity/document", self.host);
        let resp = self.client.get(&url).send().map_err(EurekaError::Network)?;
        if !resp.status().is_success() {
            return Err(EurekaError::http_status(resp.status().as_u16()));
        }
        resp.text().map_err(EurekaError::Network)
    }
}
