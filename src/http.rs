//! Thin transport wrapper around an injected, shared `reqwest::blocking::Client`.
//!
//! The client is handed in by the caller rather than constructed here: TLS
//! configuration, proxy selection and connection pooling policy belong to
//! whoever owns the process, not to this crate.

use std::sync::Arc;
use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::Method;

use crate::error::EurekaError;

/// A prepared request, independent of wire codec: `registry` fills in `body`
/// and `content_type` after encoding with the selected `Codec`.
pub struct EurekaRequest {
    pub method: Method,
    pub url: String,
    pub body: Option<Vec<u8>>,
    pub content_type: Option<&'static str>,
    pub accept: Option<&'static str>,
}

impl EurekaRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        EurekaRequest {
            method,
            url: url.into(),
            body: None,
            content_type: None,
            accept: None,
        }
    }

    pub fn with_body(mut self, body: Vec<u8>, content_type: &'static str) -> Self {
        self.body = Some(body);
        self.content_type = Some(content_type);
        self
    }

    pub fn accepting(mut self, accept: &'static str) -> Self {
        self.accept = Some(accept);
        self
    }
}

#[derive(Clone)]
pub struct HttpInvoker {
    client: Arc<Client>,
}

impl HttpInvoker {
    pub fn new(client: Arc<Client>) -> Self {
        HttpInvoker { client }
    }

    pub fn with_connect_timeout(connect_timeout_seconds: u64) -> Result<Self, EurekaError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(connect_timeout_seconds))
            .build()
            .map_err(EurekaError::Network)?;
        Ok(HttpInvoker::new(Arc::new(client)))
    }

    /// Sends `req` and returns the raw response body and status code. Never
    /// interprets the status itself; that's `registry`'s job, since what
    /// counts as success varies per operation (heartbeat treats 404
    /// specially, register wants 204, most others want 200).
    pub fn net_req(&self, req: EurekaRequest) -> Result<(Vec<u8>, u16), EurekaError> {
        debug!("{} {}", req.method, req.url);
        let mut builder = self.client.request(req.method, &req.url);
        if let Some(accept) = req.accept {
            builder = builder.header(reqwest::header::ACCEPT, accept);
        }
        if let (Some(body), Some(content_type)) = (req.body, req.content_type) {
            builder = builder
                .header(reqwest::header::CONTENT_TYPE, content_type)
                .body(body);
        }
        let resp = builder.send().map_err(EurekaError::Network)?;
        let status = resp.status().as_u16();
        let body = resp.bytes().map_err(EurekaError::Network)?.to_vec();
        Ok((body, status))
    }
}
