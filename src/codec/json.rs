//! JSON wire encoding/decoding, matching the `camelCase` field names and the
//! `{"$": value, "@enabled": "true"}` port shape Eureka servers use.

use serde_json::{json, Map, Value};

use crate::application::{Application, Applications};
use crate::error::EurekaError;
use crate::instance::{
    AmazonMetadataType, DataCenterInfo, DcNameType, Instance, LeaseInfo, PortData, StatusType,
};
use crate::metadata::InstanceMetadata;

pub fn encode_instance(instance: &Instance) -> Result<Vec<u8>, EurekaError> {
    let wrapped = json!({ "instance": instance_to_value(instance) });
    serde_json::to_vec(&wrapped).map_err(|e| EurekaError::ParseError(e.to_string()))
}

fn instance_to_value(instance: &Instance) -> Value {
    let mut obj = Map::new();
    obj.insert("hostName".into(), Value::String(instance.host_name.clone()));
    if let Some(id) = &instance.instance_id {
        obj.insert("instanceId".into(), Value::String(id.clone()));
    }
    obj.insert("app".into(), Value::String(instance.app.clone()));
    obj.insert("ipAddr".into(), Value::String(instance.ip_addr.clone()));
    obj.insert("vipAddress".into(), Value::String(instance.vip_address.clone()));
    obj.insert(
        "secureVipAddress".into(),
        Value::String(instance.secure_vip_address.clone()),
    );
    obj.insert(
        "status".into(),
        Value::String(instance.status.as_wire_str().to_string()),
    );
    obj.insert("port".into(), port_to_value(instance.port));
    obj.insert("securePort".into(), port_to_value(instance.secure_port));
    obj.insert(
        "dataCenterInfo".into(),
        data_center_info_to_value(&instance.data_center_info),
    );
    obj.insert("leaseInfo".into(), lease_info_to_value(&instance.lease_info));
    obj.insert("metadata".into(), instance.metadata.to_json());
    Value::Object(obj)
}

fn port_to_value(port: PortData) -> Value {
    json!({ "$": port.value, "@enabled": port.enabled.to_string() })
}

fn data_center_info_to_value(dc: &DataCenterInfo) -> Value {
    let mut obj = Map::new();
    obj.insert(
        "@class".into(),
        Value::String("com.netflix.appinfo.InstanceInfo$DefaultDataCenterInfo".to_string()),
    );
    obj.insert("name".into(), Value::String(dc.name.to_string()));
    if dc.name == DcNameType::Amazon {
        if let Some(meta) = &dc.metadata {
            obj.insert("metadata".into(), amazon_metadata_to_value(meta));
        }
    }
    Value::Object(obj)
}

fn amazon_metadata_to_value(meta: &AmazonMetadataType) -> Value {
    json!({
        "ami-launch-index": meta.ami_launch_index,
        "local-hostname": meta.local_hostname,
        "availability-zone": meta.availability_zone,
        "instance-id": meta.instance_id,
        "public-ipv4": meta.public_ipv4,
        "public-hostname": meta.public_hostname,
        "ami-manifest-path": meta.ami_manifest_path,
        "local-ipv4": meta.local_ipv4,
        "hostname": meta.hostname,
        "ami-id": meta.ami_id,
        "instance-type": meta.instance_type,
    })
}

fn lease_info_to_value(lease: &LeaseInfo) -> Value {
    json!({
        "durationInSecs": lease.duration_in_secs,
        "renewalIntervalInSecs": lease.renewal_interval_in_secs,
        "registrationTimestamp": lease.registration_timestamp,
        "lastRenewalTimestamp": lease.last_renewal_timestamp,
        "evictionTimestamp": lease.eviction_timestamp,
        "serviceUpTimestamp": lease.service_up_timestamp,
    })
}

pub fn decode_instance(body: &[u8]) -> Result<Instance, EurekaError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| EurekaError::ParseError(e.to_string()))?;
    let instance_value = value.get("instance").unwrap_or(&value);
    instance_from_value(instance_value)
}

fn instance_from_value(v: &Value) -> Result<Instance, EurekaError> {
    let get_str = |key: &str| -> String {
        v.get(key).and_then(Value::as_str).unwrap_or("").to_string()
    };
    let status = get_str("status");
    let status = status
        .parse::<StatusType>()
        .map_err(EurekaError::ParseError)?;

    Ok(Instance {
        host_name: get_str("hostName"),
        instance_id: v.get("instanceId").and_then(Value::as_str).map(str::to_string),
        app: get_str("app"),
        ip_addr: get_str("ipAddr"),
        vip_address: get_str("vipAddress"),
        secure_vip_address: get_str("secureVipAddress"),
        status,
        port: v.get("port").map(port_from_value).unwrap_or(PortData::new(80, false)),
        secure_port: v
            .get("securePort")
            .map(port_from_value)
            .unwrap_or(PortData::new(443, false)),
        data_center_info: v
            .get("dataCenterInfo")
            .map(data_center_info_from_value)
            .transpose()?
            .unwrap_or_default(),
        lease_info: v.get("leaseInfo").map(lease_info_from_value).unwrap_or_default(),
        metadata: v
            .get("metadata")
            .map(InstanceMetadata::from_json)
            .transpose()?
            .unwrap_or_default(),
        unique_id: None,
    })
}

fn port_from_value(v: &Value) -> PortData {
    let value = v.get("$").and_then(Value::as_u64).unwrap_or(0) as u16;
    let enabled = v
        .get("@enabled")
        .and_then(Value::as_str)
        .map(|s| s == "true")
        .unwrap_or(false);
    PortData::new(value, enabled)
}

fn data_center_info_from_value(v: &Value) -> Result<DataCenterInfo, EurekaError> {
    let name = v
        .get("name")
        .and_then(Value::as_str)
        .unwrap_or("MyOwn")
        .parse::<DcNameType>()
        .map_err(EurekaError::ParseError)?;
    let metadata = if name == DcNameType::Amazon {
        v.get("metadata").map(amazon_metadata_from_value)
    } else {
        None
    };
    Ok(DataCenterInfo { name, metadata })
}

fn amazon_metadata_from_value(v: &Value) -> AmazonMetadataType {
    let get = |key: &str| v.get(key).and_then(Value::as_str).unwrap_or("").to_string();
    AmazonMetadataType {
        ami_launch_index: get("ami-launch-index"),
        local_hostname: get("local-hostname"),
        availability_zone: get("availability-zone"),
        instance_id: get("instance-id"),
        public_ipv4: get("public-ipv4"),
        public_hostname: get("public-hostname"),
        ami_manifest_path: get("ami-manifest-path"),
        local_ipv4: get("local-ipv4"),
        hostname: get("hostname"),
        ami_id: get("ami-id"),
        instance_type: get("instance-type"),
    }
}

fn lease_info_from_value(v: &Value) -> LeaseInfo {
    let get = |key: &str| v.get(key).and_then(Value::as_u64).map(|n| n as usize);
    let get64 = |key: &str| v.get(key).and_then(Value::as_u64);
    LeaseInfo {
        duration_in_secs: get("durationInSecs"),
        renewal_interval_in_secs: get("renewalIntervalInSecs"),
        registration_timestamp: get64("registrationTimestamp"),
        last_renewal_timestamp: get64("lastRenewalTimestamp"),
        eviction_timestamp: get64("evictionTimestamp"),
        service_up_timestamp: get64("serviceUpTimestamp"),
    }
}

pub fn decode_application(body: &[u8]) -> Result<Application, EurekaError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| EurekaError::ParseError(e.to_string()))?;
    let app_value = value.get("application").unwrap_or(&value);
    application_from_value(app_value)
}

fn application_from_value(v: &Value) -> Result<Application, EurekaError> {
    let name = v.get("name").and_then(Value::as_str).unwrap_or("").to_string();
    let instances = v
        .get("instance")
        .and_then(Value::as_array)
        .map(|arr| arr.iter().map(instance_from_value).collect::<Result<Vec<_>, _>>())
        .transpose()?
        .unwrap_or_default();
    Ok(Application { name, instances })
}

pub fn decode_applications(body: &[u8]) -> Result<Applications, EurekaError> {
    let value: Value = serde_json::from_slice(body).map_err(|e| EurekaError::ParseError(e.to_string()))?;
    let apps_value = value.get("applications").unwrap_or(&value);
    let application = apps_value
        .get("application")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    let applications = application
        .iter()
        .map(application_from_value)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Applications { applications })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_round_trips_through_json() {
        let mut instance = Instance {
            host_name: "i-123".into(),
            app: "TESTAPP".into(),
            ip_addr: "10.0.0.1".into(),
            status: StatusType::Up,
            ..Instance::default()
        };
        instance.metadata.set_string("zone", "us-east-1a");
        let bytes = encode_instance(&instance).unwrap();
        let decoded = decode_instance(&bytes).unwrap();
        assert_eq!(decoded.host_name, "i-123");
        assert_eq!(decoded.app, "TESTAPP");
        assert_eq!(decoded.status, StatusType::Up);
        assert_eq!(decoded.metadata.get_string("zone").as_deref(), Some("us-east-1a"));
    }

    #[test]
    fn decode_applications_groups_instances_under_app_names() {
        let body = br#"{"applications":{"application":[
            {"name":"APPA","instance":[{"hostName":"h1","app":"APPA","ipAddr":"1.1.1.1","vipAddress":"a","secureVipAddress":"a","status":"UP","port":{"$":80,"@enabled":"true"},"securePort":{"$":443,"@enabled":"false"},"dataCenterInfo":{"@class":"x","name":"MyOwn"},"leaseInfo":{},"metadata":{}}]}
        ]}}"#;
        let apps = decode_applications(body).unwrap();
        assert_eq!(apps.applications.len(), 1);
        assert_eq!(apps.applications[0].instances.len(), 1);
    }

    #[test]
    fn decode_applications_tolerates_an_absent_application_array() {
        let apps = decode_applications(br#"{"applications":{}}"#).unwrap();
        assert!(apps.applications.is_empty());
    }
}
