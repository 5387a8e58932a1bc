//! `InstanceMetadata`: the arbitrary string-keyed bag attached to an instance.
//!
//! Eureka metadata is an open key bag with no fixed schema. The upstream Go
//! client backs it with a raw XML byte buffer (`InstanceMetadata.Raw`) that
//! writes append onto rather than a keyed map that writes overwrite — calling
//! `SetMetadataString` twice with the same key leaves both entries in the
//! buffer, and callers reading it back see the most recently appended one.
//! This type mirrors that: `raw` holds the inner `<key>value</key>...`
//! fragment verbatim, `set_string` only ever appends to it, and every reader
//! (`get_string`, `to_json`, `iter`) parses it on demand rather than
//! consulting a pre-built index.

use crate::error::EurekaError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InstanceMetadata {
    raw: String,
}

impl InstanceMetadata {
    pub fn new() -> Self {
        InstanceMetadata::default()
    }

    /// Builds a bag from already-materialized pairs, in order, without
    /// deduplicating — a key repeated in `entries` is appended twice, same as
    /// two `set_string` calls would.
    pub fn from_entries(entries: Vec<(String, String)>) -> Self {
        let mut metadata = InstanceMetadata::default();
        for (key, value) in entries {
            metadata.set_string(key, value);
        }
        metadata
    }

    /// Appends `<key>value</key>` to the raw buffer. Does not check for or
    /// replace an existing entry under `key` — the buffer can end up holding
    /// more than one entry per key, same as the upstream Go client's raw
    /// buffer does.
    pub fn set_string(&mut self, key: impl AsRef<str>, value: impl AsRef<str>) {
        let key = key.as_ref();
        self.raw.push('<');
        self.raw.push_str(key);
        self.raw.push('>');
        self.raw.push_str(&xml_escape(value.as_ref()));
        self.raw.push_str("</");
        self.raw.push_str(key);
        self.raw.push('>');
    }

    /// The value most recently appended under `key`, if any.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.entries().into_iter().rev().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn get_int(&self, key: &str) -> Result<Option<i64>, EurekaError> {
        self.parse(key, |raw| {
            raw.parse::<i64>()
                .map_err(|_| EurekaError::ParseError(format!("metadata key {:?} is not an int: {:?}", key, raw)))
        })
    }

    pub fn get_float32(&self, key: &str) -> Result<Option<f32>, EurekaError> {
        self.parse(key, |raw| {
            raw.parse::<f32>()
                .map_err(|_| EurekaError::ParseError(format!("metadata key {:?} is not a float32: {:?}", key, raw)))
        })
    }

    pub fn get_float64(&self, key: &str) -> Result<Option<f64>, EurekaError> {
        self.parse(key, |raw| {
            raw.parse::<f64>()
                .map_err(|_| EurekaError::ParseError(format!("metadata key {:?} is not a float64: {:?}", key, raw)))
        })
    }

    fn parse<T>(&self, key: &str, f: impl FnOnce(&str) -> Result<T, EurekaError>) -> Result<Option<T>, EurekaError> {
        match self.get_string(key) {
            Some(raw) => f(&raw).map(Some),
            None => Ok(None),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.raw.is_empty()
    }

    /// The appended entries in order, duplicates and all.
    pub fn iter(&self) -> impl Iterator<Item = (String, String)> {
        self.entries().into_iter()
    }

    /// A flat JSON object keyed by the last value appended under each key —
    /// a JSON object can't carry duplicate keys, so ordering ties resolve the
    /// same way `get_string` does.
    pub fn to_json(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        for (k, v) in self.entries() {
            map.insert(k, serde_json::Value::String(v));
        }
        serde_json::Value::Object(map)
    }

    pub fn from_json(value: &serde_json::Value) -> Result<Self, EurekaError> {
        let object = value
            .as_object()
            .ok_or_else(|| EurekaError::ParseError("instance metadata is not a JSON object".to_string()))?;
        let mut metadata = InstanceMetadata::default();
        for (k, v) in object {
            let s = match v {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => continue,
                other => other.to_string(),
            };
            metadata.set_string(k, s);
        }
        Ok(metadata)
    }

    /// `<instanceMetadata><key>value</key>...</instanceMetadata>`, collapsing
    /// to the empty form when the raw buffer has no entries.
    pub fn to_xml(&self) -> String {
        format!("<instanceMetadata>{}</instanceMetadata>", self.raw)
    }

    pub fn from_xml(xml: &str) -> Result<Self, EurekaError> {
        Ok(InstanceMetadata::from_entries(parse_metadata_xml(xml)?))
    }

    /// Parses `self.raw` into ordered `(key, value)` pairs, preserving
    /// duplicate keys in append order.
    fn entries(&self) -> Vec<(String, String)> {
        if self.raw.is_empty() {
            return Vec::new();
        }
        let wrapped = format!("<r>{}</r>", self.raw);
        parse_metadata_xml(&wrapped).unwrap_or_default()
    }
}

/// Parses the direct children of a document's root element into ordered
/// `(tag, text)` pairs. Used both for `from_xml` (root is `<instanceMetadata>`)
/// and `entries` (root is the synthetic `<r>` wrapper around the raw buffer).
fn parse_metadata_xml(raw: &str) -> Result<Vec<(String, String)>, EurekaError> {
    let mut entries = Vec::new();
    let mut reader = xmlparser::Tokenizer::from(raw);
    let mut depth = 0u32;
    let mut current_key: Option<String> = None;
    let mut current_text = String::new();
    while let Some(token) = reader.next() {
        let token = token.map_err(|e| EurekaError::ParseError(e.to_string()))?;
        match token {
            xmlparser::Token::ElementStart { local, .. } => {
                depth += 1;
                if depth == 2 {
                    current_key = Some(local.as_str().to_string());
                    current_text.clear();
                }
            }
            xmlparser::Token::Text { text } => {
                if depth == 2 {
                    current_text.push_str(text.as_str());
                }
            }
            xmlparser::Token::ElementEnd { end, .. } => {
                if let xmlparser::ElementEnd::Close(_, _) = end {
                    if depth == 2 {
                        if let Some(key) = current_key.take() {
                            entries.push((key, current_text.clone()));
                        }
                    }
                    depth = depth.saturating_sub(1);
                } else if let xmlparser::ElementEnd::Empty = end {
                    if depth == 2 {
                        if let Some(key) = current_key.take() {
                            entries.push((key, String::new()));
                        }
                    }
                    depth = depth.saturating_sub(1);
                }
            }
            _ => {}
        }
    }
    Ok(entries)
}

fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_metadata_serializes_to_empty_xml_tag() {
        let m = InstanceMetadata::new();
        assert_eq!(m.to_xml(), "<instanceMetadata></instanceMetadata>");
    }

    #[test]
    fn xml_round_trips_through_empty_tag() {
        let m = InstanceMetadata::from_xml("<instanceMetadata></instanceMetadata>").unwrap();
        assert!(m.is_empty());
    }

    #[test]
    fn xml_round_trips_entries() {
        let mut m = InstanceMetadata::new();
        m.set_string("zone", "us-east-1a");
        m.set_string("weight", "42");
        let xml = m.to_xml();
        let parsed = InstanceMetadata::from_xml(&xml).unwrap();
        assert_eq!(parsed.get_string("zone").as_deref(), Some("us-east-1a"));
        assert_eq!(parsed.get_string("weight").as_deref(), Some("42"));
    }

    #[test]
    fn set_string_appends_rather_than_overwrites() {
        let mut m = InstanceMetadata::new();
        m.set_string("zone", "us-east-1a");
        m.set_string("zone", "us-east-1b");
        assert_eq!(
            m.to_xml(),
            "<instanceMetadata><zone>us-east-1a</zone><zone>us-east-1b</zone></instanceMetadata>"
        );
        assert_eq!(m.get_string("zone").as_deref(), Some("us-east-1b"));
    }

    #[test]
    fn get_int_parses_numeric_value() {
        let mut m = InstanceMetadata::new();
        m.set_string("count", "7");
        assert_eq!(m.get_int("count").unwrap(), Some(7));
    }

    #[test]
    fn get_int_on_missing_key_is_none() {
        let m = InstanceMetadata::new();
        assert_eq!(m.get_int("missing").unwrap(), None);
    }

    #[test]
    fn get_int_on_malformed_value_is_parse_error() {
        let mut m = InstanceMetadata::new();
        m.set_string("count", "not-a-number");
        assert!(matches!(m.get_int("count"), Err(EurekaError::ParseError(_))));
    }

    #[test]
    fn get_float64_parses_numeric_value() {
        let mut m = InstanceMetadata::new();
        m.set_string("ratio", "3.14");
        assert_eq!(m.get_float64("ratio").unwrap(), Some(3.14));
    }

    #[test]
    fn json_round_trips_entries() {
        let mut m = InstanceMetadata::new();
        m.set_string("region", "us-east-1");
        let json = m.to_json();
        let parsed = InstanceMetadata::from_json(&json).unwrap();
        assert_eq!(parsed.get_string("region").as_deref(), Some("us-east-1"));
    }
}
