//! XML wire encoding/decoding, matching the element layout the Eureka REST
//! API uses (`<instance><hostName>...</hostName>...</instance>`).

use crate::application::{Application, Applications};
use crate::error::EurekaError;
use crate::instance::{
    AmazonMetadataType, DataCenterInfo, DcNameType, Instance, LeaseInfo, PortData, StatusType,
};
use crate::metadata::InstanceMetadata;

pub fn encode_instance(instance: &Instance) -> String {
    let mut out = String::from("<instance>");
    push_text(&mut out, "hostName", &instance.host_name);
    if let Some(id) = &instance.instance_id {
        push_text(&mut out, "instanceId", id);
    }
    push_text(&mut out, "app", &instance.app);
    push_text(&mut out, "ipAddr", &instance.ip_addr);
    push_text(&mut out, "vipAddress", &instance.vip_address);
    push_text(&mut out, "secureVipAddress", &instance.secure_vip_address);
    push_text(&mut out, "status", instance.status.as_wire_str());
    push_port(&mut out, "port", instance.port);
    push_port(&mut out, "securePort", instance.secure_port);
    push_data_center_info(&mut out, &instance.data_center_info);
    push_lease_info(&mut out, &instance.lease_info);
    out.push_str(&instance.metadata.to_xml());
    out.push_str("</instance>");
    out
}

fn push_text(out: &mut String, tag: &str, value: &str) {
    out.push('<');
    out.push_str(tag);
    out.push('>');
    out.push_str(&xml_escape(value));
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn push_port(out: &mut String, tag: &str, port: PortData) {
    out.push('<');
    out.push_str(tag);
    out.push_str(" enabled=\"");
    out.push_str(if port.enabled { "true" } else { "false" });
    out.push_str("\">");
    out.push_str(&port.value.to_string());
    out.push_str("</");
    out.push_str(tag);
    out.push('>');
}

fn push_data_center_info(out: &mut String, dc: &DataCenterInfo) {
    out.push_str("<dataCenterInfo class=\"com.netflix.appinfo.InstanceInfo$DefaultDataCenterInfo\">");
    push_text(out, "name", &dc.name.to_string());
    if dc.name == DcNameType::Amazon {
        if let Some(meta) = &dc.metadata {
            out.push_str("<metadata>");
            push_text(out, "ami-launch-index", &meta.ami_launch_index);
            push_text(out, "local-hostname", &meta.local_hostname);
            push_text(out, "availability-zone", &meta.availability_zone);
            push_text(out, "instance-id", &meta.instance_id);
            push_text(out, "public-ipv4", &meta.public_ipv4);
            push_text(out, "public-hostname", &meta.public_hostname);
            push_text(out, "ami-manifest-path", &meta.ami_manifest_path);
            push_text(out, "local-ipv4", &meta.local_ipv4);
            push_text(out, "hostname", &meta.hostname);
            push_text(out, "ami-id", &meta.ami_id);
            push_text(out, "instance-type", &meta.instance_type);
            out.push_str("</metadata>");
        }
    }
    out.push_str("</dataCenterInfo>");
}

fn push_lease_info(out: &mut String, lease: &LeaseInfo) {
    out.push_str("<leaseInfo>");
    if let Some(v) = lease.duration_in_secs {
        push_text(out, "durationInSecs", &v.to_string());
    }
    if let Some(v) = lease.renewal_interval_in_secs {
        push_text(out, "renewalIntervalInSecs", &v.to_string());
    }
    if let Some(v) = lease.registration_timestamp {
        push_text(out, "registrationTimestamp", &v.to_string());
    }
    if let Some(v) = lease.last_renewal_timestamp {
        push_text(out, "lastRenewalTimestamp", &v.to_string());
    }
    if let Some(v) = lease.eviction_timestamp {
        push_text(out, "evictionTimestamp", &v.to_string());
    }
    if let Some(v) = lease.service_up_timestamp {
        push_text(out, "serviceUpTimestamp", &v.to_string());
    }
    out.push_str("</leaseInfo>");
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

/// A minimal in-memory tree, just enough to walk the shallow, fixed-depth
/// Eureka instance/application schema without pulling in a full DOM crate.
#[derive(Debug, Default)]
struct Element {
    name: String,
    attrs: Vec<(String, String)>,
    text: String,
    children: Vec<Element>,
}

impl Element {
    fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }
}

fn parse_tree(raw: &[u8]) -> Result<Element, EurekaError> {
    let text = std::str::from_utf8(raw).map_err(|e| EurekaError::ParseError(e.to_string()))?;
    let mut tokenizer = xmlparser::Tokenizer::from(text);
    let mut stack: Vec<Element> = vec![Element::default()];

    while let Some(token) = tokenizer.next() {
        let token = token.map_err(|e| EurekaError::ParseError(e.to_string()))?;
        match token {
            xmlparser::Token::ElementStart { local, .. } => {
                stack.push(Element {
                    name: local.as_str().to_string(),
                    ..Element::default()
                });
            }
            xmlparser::Token::Attribute { local, value, .. } => {
                if let Some(top) = stack.last_mut() {
                    top.attrs.push((local.as_str().to_string(), value.as_str().to_string()));
                }
            }
            xmlparser::Token::Text { text } => {
                if let Some(top) = stack.last_mut() {
                    top.text.push_str(text.as_str());
                }
            }
            xmlparser::Token::ElementEnd { end, .. } => match end {
                xmlparser::ElementEnd::Open => {}
                xmlparser::ElementEnd::Close(_, _) | xmlparser::ElementEnd::Empty => {
                    if stack.len() > 1 {
                        let finished = stack.pop().unwrap();
                        stack.last_mut().unwrap().children.push(finished);
                    }
                }
            },
            _ => {}
        }
    }

    stack
        .pop()
        .and_then(|root| root.children.into_iter().next())
        .ok_or_else(|| EurekaError::ParseError("empty XML document".to_string()))
}

pub fn decode_instance(body: &[u8]) -> Result<Instance, EurekaError> {
    let root = parse_tree(body)?;
    instance_from_element(&root)
}

fn text_of(el: &Element, tag: &str) -> String {
    el.child(tag).map(|c| c.text.clone()).unwrap_or_default()
}

fn instance_from_element(el: &Element) -> Result<Instance, EurekaError> {
    let status = text_of(el, "status")
        .parse::<StatusType>()
        .map_err(EurekaError::ParseError)?;

    let port = el
        .child("port")
        .map(port_from_element)
        .unwrap_or(PortData::new(80, false));
    let secure_port = el
        .child("securePort")
        .map(port_from_element)
        .unwrap_or(PortData::new(443, false));

    let data_center_info = el
        .child("dataCenterInfo")
        .map(data_center_info_from_element)
        .transpose()?
        .unwrap_or_default();

    let lease_info = el.child("leaseInfo").map(lease_info_from_element).unwrap_or_default();

    let metadata = el
        .child("instanceMetadata")
        .or_else(|| el.child("metadata"))
        .map(|m| InstanceMetadata::from_entries(
            m.children.iter().map(|c| (c.name.clone(), c.text.clone())).collect(),
        ))
        .unwrap_or_default();

    let instance_id_raw = text_of(el, "instanceId");
    Ok(Instance {
        host_name: text_of(el, "hostName"),
        instance_id: if instance_id_raw.is_empty() { None } else { Some(instance_id_raw) },
        app: text_of(el, "app"),
        ip_addr: text_of(el, "ipAddr"),
        vip_address: text_of(el, "vipAddress"),
        secure_vip_address: text_of(el, "secureVipAddress"),
        status,
        port,
        secure_port,
        data_center_info,
        lease_info,
        metadata,
        unique_id: None,
    })
}

fn port_from_element(el: &Element) -> PortData {
    let value = el.text.trim().parse::<u16>().unwrap_or(0);
    let enabled = el.attr("enabled").map(|v| v == "true").unwrap_or(false);
    PortData::new(value, enabled)
}

fn data_center_info_from_element(el: &Element) -> Result<DataCenterInfo, EurekaError> {
    let name = text_of(el, "name").parse::<DcNameType>().map_err(EurekaError::ParseError)?;
    let metadata = if name == DcNameType::Amazon {
        el.child("metadata").map(amazon_metadata_from_element)
    } else {
        None
    };
    Ok(DataCenterInfo { name, metadata })
}

fn amazon_metadata_from_element(el: &Element) -> AmazonMetadataType {
    AmazonMetadataType {
        ami_launch_index: text_of(el, "ami-launch-index"),
        local_hostname: text_of(el, "local-hostname"),
        availability_zone: text_of(el, "availability-zone"),
        instance_id: text_of(el, "instance-id"),
        public_ipv4: text_of(el, "public-ipv4"),
        public_hostname: text_of(el, "public-hostname"),
        ami_manifest_path: text_of(el, "ami-manifest-path"),
        local_ipv4: text_of(el, "local-ipv4"),
        hostname: text_of(el, "hostname"),
        ami_id: text_of(el, "ami-id"),
        instance_type: text_of(el, "instance-type"),
    }
}

fn lease_info_from_element(el: &Element) -> LeaseInfo {
    let get = |tag: &str| el.child(tag).and_then(|c| c.text.trim().parse::<usize>().ok());
    let get64 = |tag: &str| el.child(tag).and_then(|c| c.text.trim().parse::<u64>().ok());
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
    let root = parse_tree(body)?;
    application_from_element(&root)
}

fn application_from_element(el: &Element) -> Result<Application, EurekaError> {
    let name = text_of(el, "name");
    let instances = el
        .children_named("instance")
        .map(instance_from_element)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Application { name, instances })
}

pub fn decode_applications(body: &[u8]) -> Result<Applications, EurekaError> {
    let root = parse_tree(body)?;
    let applications = root
        .children_named("application")
        .map(application_from_element)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Applications { applications })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn instance_round_trips_through_xml() {
        let mut instance = Instance {
            host_name: "i-123".into(),
            app: "TESTAPP".into(),
            ip_addr: "10.0.0.1".into(),
            status: StatusType::Up,
            ..Instance::default()
        };
        instance.metadata.set_string("zone", "us-east-1a");
        let xml = encode_instance(&instance);
        let decoded = decode_instance(xml.as_bytes()).unwrap();
        assert_eq!(decoded.host_name, "i-123");
        assert_eq!(decoded.app, "TESTAPP");
        assert_eq!(decoded.status, StatusType::Up);
        assert_eq!(decoded.metadata.get_string("zone").as_deref(), Some("us-east-1a"));
    }

    #[test]
    fn empty_metadata_round_trips_through_empty_tag() {
        let instance = Instance {
            host_name: "i-1".into(),
            app: "APP".into(),
            ..Instance::default()
        };
        let xml = encode_instance(&instance);
        assert!(xml.contains("<instanceMetadata></instanceMetadata>"));
        let decoded = decode_instance(xml.as_bytes()).unwrap();
        assert!(decoded.metadata.is_empty());
    }

    #[test]
    fn decode_applications_collects_each_application() {
        let xml = "<applications><application><name>APPA</name><instance><hostName>h1</hostName><app>APPA</app><ipAddr>1.1.1.1</ipAddr><vipAddress>a</vipAddress><secureVipAddress>a</secureVipAddress><status>UP</status><port enabled=\"true\">80</port><securePort enabled=\"false\">443</securePort><dataCenterInfo class=\"x\"><name>MyOwn</name></dataCenterInfo><leaseInfo></leaseInfo><instanceMetadata></instanceMetadata></instance></application></applications>";
        let apps = decode_applications(xml.as_bytes()).unwrap();
        assert_eq!(apps.applications.len(), 1);
        assert_eq!(apps.applications[0].instances.len(), 1);
    }
}
