//! Wire codecs. Eureka servers accept either JSON or XML for the same
//! resources; `Codec` picks one and `registry` asks for `content_type`/
//! `accept` headers to match.

pub mod json;
pub mod xml;

use crate::application::Applications;
use crate::error::EurekaError;
use crate::instance::Instance;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Codec {
    Json,
    Xml,
}

impl Codec {
    pub fn content_type(&self) -> &'static str {
        match self {
            Codec::Json => "application/json",
            Codec::Xml => "application/xml",
        }
    }

    pub fn accept(&self) -> &'static str {
        self.content_type()
    }

    pub fn encode_instance(&self, instance: &Instance) -> Result<Vec<u8>, EurekaError> {
        match self {
            Codec::Json => json::encode_instance(instance),
            Codec::Xml => Ok(xml::encode_instance(instance).into_bytes()),
        }
    }

    pub fn decode_instance(&self, body: &[u8]) -> Result<Instance, EurekaError> {
        match self {
            Codec::Json => json::decode_instance(body),
            Codec::Xml => xml::decode_instance(body),
        }
    }

    pub fn decode_applications(&self, body: &[u8]) -> Result<Applications, EurekaError> {
        match self {
            Codec::Json => json::decode_applications(body),
            Codec::Xml => xml::decode_applications(body),
        }
    }

    pub fn decode_application(&self, body: &[u8]) -> Result<crate::application::Application, EurekaError> {
        match self {
            Codec::Json => json::decode_application(body),
            Codec::Xml => xml::decode_application(body),
        }
    }
}
