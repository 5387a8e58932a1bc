//! The Instance data model: a single registerable unit of an application.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use crate::metadata::InstanceMetadata;

/// One runnable unit of an application, identified by `(app, id())`.
#[derive(Clone)]
pub struct Instance {
    pub host_name: String,
    /// Caller-supplied instance id override. When absent, `id()` falls back to
    /// the Amazon-metadata instance id or the host name (see `Instance::id`).
    pub instance_id: Option<String>,
    pub app: String,
    pub ip_addr: String,
    pub vip_address: String,
    pub secure_vip_address: String,
    pub status: StatusType,
    pub port: PortData,
    pub secure_port: PortData,
    pub data_center_info: DataCenterInfo,
    pub lease_info: LeaseInfo,
    pub metadata: InstanceMetadata,
    /// Overrides `id()` entirely when set. Not serialized to the wire; this is a
    /// purely local, caller-supplied identity rule.
    pub unique_id: Option<Arc<dyn Fn(&Instance) -> String + Send + Sync>>,
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("host_name", &self.host_name)
            .field("instance_id", &self.instance_id)
            .field("app", &self.app)
            .field("ip_addr", &self.ip_addr)
            .field("vip_address", &self.vip_address)
            .field("secure_vip_address", &self.secure_vip_address)
            .field("status", &self.status)
            .field("port", &self.port)
            .field("secure_port", &self.secure_port)
            .field("data_center_info", &self.data_center_info)
            .field("lease_info", &self.lease_info)
            .field("metadata", &self.metadata)
            .field("unique_id", &self.unique_id.as_ref().map(|_| "<fn>"))
            .finish()
    }
}

impl Default for Instance {
    fn default() -> Self {
        Instance {
            host_name: "localhost".to_string(),
            instance_id: None,
            app: String::new(),
            ip_addr: "127.0.0.1".to_string(),
            vip_address: String::new(),
            secure_vip_address: String::new(),
            status: StatusType::Starting,
            port: PortData::new(80, false),
            secure_port: PortData::new(443, false),
            data_center_info: DataCenterInfo::default(),
            lease_info: LeaseInfo::default(),
            metadata: InstanceMetadata::default(),
            unique_id: None,
        }
    }
}

impl Instance {
    /// The canonical instance identity.
    ///
    /// - `unique_id`, if set, always wins.
    /// - Otherwise, an Amazon data center yields the Amazon instance id (which
    ///   may legitimately be empty if the metadata is incomplete).
    /// - Otherwise, the host name.
    pub fn id(&self) -> String {
        if let Some(ref unique_id) = self.unique_id {
            return unique_id(self);
        }
        if self.data_center_info.name == DcNameType::Amazon {
            return self
                .data_center_info
                .metadata
                .as_ref()
                .map(|m| m.instance_id.clone())
                .unwrap_or_default();
        }
        self.host_name.clone()
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PortData {
    pub value: u16,
    pub enabled: bool,
}

impl PortData {
    pub fn new(value: u16, enabled: bool) -> Self {
        PortData { value, enabled }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DataCenterInfo {
    pub name: DcNameType,
    /// Required (and only meaningful) when `name == Amazon`.
    pub metadata: Option<AmazonMetadataType>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DcNameType {
    #[default]
    MyOwn,
    Amazon,
}

impl Display for DcNameType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            DcNameType::MyOwn => write!(f, "MyOwn"),
            DcNameType::Amazon => write!(f, "Amazon"),
        }
    }
}

impl FromStr for DcNameType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MyOwn" => Ok(DcNameType::MyOwn),
            "Amazon" => Ok(DcNameType::Amazon),
            other => Err(format!("invalid dataCenterInfo name {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct LeaseInfo {
    pub duration_in_secs: Option<usize>,
    pub renewal_interval_in_secs: Option<usize>,
    pub registration_timestamp: Option<u64>,
    pub last_renewal_timestamp: Option<u64>,
    pub eviction_timestamp: Option<u64>,
    pub service_up_timestamp: Option<u64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StatusType {
    Up,
    Down,
    #[default]
    Starting,
    OutOfService,
    Unknown,
}

impl Display for StatusType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_wire_str())
    }
}

impl StatusType {
    pub fn as_wire_str(&self) -> &'static str {
        match self {
            StatusType::Up => "UP",
            StatusType::Down => "DOWN",
            StatusType::Starting => "STARTING",
            StatusType::OutOfService => "OUT_OF_SERVICE",
            StatusType::Unknown => "UNKNOWN",
        }
    }
}

impl FromStr for StatusType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UP" => Ok(StatusType::Up),
            "DOWN" => Ok(StatusType::Down),
            "STARTING" => Ok(StatusType::Starting),
            "OUT_OF_SERVICE" => Ok(StatusType::OutOfService),
            "UNKNOWN" => Ok(StatusType::Unknown),
            other => Err(format!("invalid status {:?}", other)),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct AmazonMetadataType {
    pub ami_launch_index: String,
    pub local_hostname: String,
    pub availability_zone: String,
    pub instance_id: String,
    pub public_ipv4: String,
    pub public_hostname: String,
    pub ami_manifest_path: String,
    pub local_ipv4: String,
    pub hostname: String,
    pub ami_id: String,
    pub instance_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_instance() -> Instance {
        Instance {
            host_name: "i-6543".into(),
            app: "TESTAPP".into(),
            ip_addr: "127.0.0.10".into(),
            vip_address: "127.0.0.10".into(),
            secure_vip_address: "127.0.0.10".into(),
            status: StatusType::Up,
            ..Instance::default()
        }
    }

    #[test]
    fn amazon_instance_uses_amazon_metadata_instance_id() {
        let mut i = base_instance();
        i.data_center_info = DataCenterInfo {
            name: DcNameType::Amazon,
            metadata: Some(AmazonMetadataType {
                instance_id: "EXPECTED-ID".into(),
                ..Default::default()
            }),
        };
        assert_eq!(i.id(), "EXPECTED-ID");
    }

    #[test]
    fn amazon_instance_without_metadata_instance_id_is_empty() {
        let mut i = base_instance();
        i.data_center_info = DataCenterInfo {
            name: DcNameType::Amazon,
            metadata: Some(AmazonMetadataType::default()),
        };
        assert_eq!(i.id(), "");
    }

    #[test]
    fn my_own_instance_uses_host_name() {
        let mut i = base_instance();
        i.data_center_info = DataCenterInfo {
            name: DcNameType::MyOwn,
            metadata: None,
        };
        assert_eq!(i.id(), "i-6543");
    }

    #[test]
    fn unique_id_overrides_everything() {
        let mut i = base_instance();
        i.data_center_info = DataCenterInfo {
            name: DcNameType::Amazon,
            metadata: Some(AmazonMetadataType {
                instance_id: "UNEXPECTED".into(),
                ..Default::default()
            }),
        };
        i.unique_id = Some(Arc::new(|i: &Instance| format!("{}:{}", i.app, 123)));
        assert_eq!(i.id(), "TESTAPP:123");
    }

    #[test]
    fn status_round_trips_through_wire_string() {
        for status in [
            StatusType::Up,
            StatusType::Down,
            StatusType::Starting,
            StatusType::OutOfService,
            StatusType::Unknown,
        ] {
            let s = status.as_wire_str();
            assert_eq!(StatusType::from_str(s).unwrap(), status);
        }
    }
}
