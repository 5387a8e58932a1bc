//! `RegistryClient`: the REST surface against a Eureka server, retried across
//! an ordered list of candidate base URLs.

use percent_encoding::{percent_encode, AsciiSet, CONTROLS};
use reqwest::Method;

use crate::application::{Application, Applications};
use crate::codec::Codec;
use crate::error::EurekaError;
use crate::http::{EurekaRequest, HttpInvoker};
use crate::instance::{Instance, StatusType};

/// `percent_encoding` 2.x dropped the old `PATH_SEGMENT_ENCODE_SET`/
/// `QUERY_ENCODE_SET` constants; these reproduce their character sets.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}')
    .add(b'/')
    .add(b'%');

const QUERY: &AsciiSet = &CONTROLS.add(b' ').add(b'"').add(b'#').add(b'<').add(b'>').add(b'&').add(b'=');

fn path_segment_encode(value: &str) -> String {
    percent_encode(value.as_bytes(), PATH_SEGMENT).to_string()
}

fn query_encode(value: &str) -> String {
    percent_encode(value.as_bytes(), QUERY).to_string()
}

/// A Eureka registry client bound to an ordered list of candidate base URLs
/// (e.g. from `dns::discover_dns` or a static `service_urls` list) and a wire
/// codec. On a retryable failure (`EurekaError::is_retryable_across_servers`)
/// the next candidate is tried; a non-retryable failure (4xx) is returned
/// immediately.
pub struct RegistryClient {
    base_urls: Vec<String>,
    http: HttpInvoker,
    codec: Codec,
}

impl RegistryClient {
    pub fn new(base_urls: Vec<String>, http: HttpInvoker, codec: Codec) -> Self {
        RegistryClient { base_urls, http, codec }
    }

    fn for_each_server<T>(
        &self,
        mut attempt: impl FnMut(&str) -> Result<T, EurekaError>,
    ) -> Result<T, EurekaError> {
        let mut last_err = EurekaError::UnexpectedState("no candidate servers configured".to_string());
        for base_url in &self.base_urls {
            match attempt(base_url) {
                Ok(v) => return Ok(v),
                Err(e) => {
                    let retry = e.is_retryable_across_servers();
                    last_err = e;
                    if !retry {
                        return Err(last_err);
                    }
                    warn!("request against {} failed, trying next server", base_url);
                }
            }
        }
        Err(last_err)
    }

    pub fn register(&self, instance: &Instance) -> Result<(), EurekaError> {
        let body = self.codec.encode_instance(instance)?;
        self.for_each_server(|base_url| {
            let url = format!("{}/apps/{}", base_url, path_segment_encode(&instance.app));
            debug!("register {}", url);
            let req = EurekaRequest::new(Method::POST, url)
                .with_body(body.clone(), self.codec.content_type());
            let (_, status) = self.http.net_req(req)?;
            match status {
                204 => Ok(()),
                s => Err(EurekaError::http_status_with_prefix(s, "register")),
            }
        })
    }

    /// Reregistration is just `register` again; kept as a distinct method
    /// because callers reach for it explicitly after a 404 on heartbeat
    /// rather than reusing the initial-registration call site.
    pub fn reregister(&self, instance: &Instance) -> Result<(), EurekaError> {
        self.register(instance)
    }

    pub fn deregister(&self, app: &str, instance_id: &str) -> Result<(), EurekaError> {
        self.for_each_server(|base_url| {
            let url = format!(
                "{}/apps/{}/{}",
                base_url,
                path_segment_encode(app),
                path_segment_encode(instance_id)
            );
            debug!("deregister {}", url);
            let (_, status) = self.http.net_req(EurekaRequest::new(Method::DELETE, url))?;
            match status {
                200 => Ok(()),
                s => Err(EurekaError::http_status_with_prefix(s, "deregister")),
            }
        })
    }

    /// 404 is surfaced as `EurekaError::HttpStatus(404, _)`, not swallowed:
    /// callers (`heartbeat`) decide whether that means "reregister."
    pub fn heartbeat(&self, app: &str, instance_id: &str) -> Result<(), EurekaError> {
        self.for_each_server(|base_url| {
            let url = format!(
                "{}/apps/{}/{}",
                base_url,
                path_segment_encode(app),
                path_segment_encode(instance_id)
            );
            debug!("heartbeat {}", url);
            let (_, status) = self.http.net_req(EurekaRequest::new(Method::PUT, url))?;
            match status {
                200 => Ok(()),
                s => Err(EurekaError::http_status_with_prefix(s, "heartbeat")),
            }
        })
    }

    /// Updates `instance`'s status on the server, and, on success, sets
    /// `instance.status` to match — a caller reading `instance` back
    /// afterward sees the new status without a round trip.
    pub fn update_status(&self, instance: &mut Instance, status: StatusType) -> Result<(), EurekaError> {
        let app = instance.app.clone();
        let instance_id = instance.id();
        self.for_each_server(|base_url| {
            let url = format!(
                "{}/apps/{}/{}/status?value={}",
                base_url,
                path_segment_encode(&app),
                path_segment_encode(&instance_id),
                status.as_wire_str()
            );
            debug!("update_status {}", url);
            let (_, status_code) = self.http.net_req(EurekaRequest::new(Method::PUT, url))?;
            match status_code {
                200 => Ok(()),
                s => Err(EurekaError::http_status_with_prefix(s, "update_status")),
            }
        })?;
        instance.status = status;
        Ok(())
    }

    /// Adds a metadata key/value pair to `instance` on the server, and, on
    /// success, appends the same pair to `instance.metadata` in place.
    pub fn add_metadata_string(&self, instance: &mut Instance, key: &str, value: &str) -> Result<(), EurekaError> {
        let app = instance.app.clone();
        let instance_id = instance.id();
        self.for_each_server(|base_url| {
            let url = format!(
                "{}/apps/{}/{}/metadata?{}={}",
                base_url,
                path_segment_encode(&app),
                path_segment_encode(&instance_id),
                query_encode(key),
                query_encode(value)
            );
            debug!("add_metadata_string {}", url);
            let (_, status) = self.http.net_req(EurekaRequest::new(Method::PUT, url))?;
            match status {
                200 => Ok(()),
                s => Err(EurekaError::http_status_with_prefix(s, "add_metadata_string")),
            }
        })?;
        instance.metadata.set_string(key, value);
        Ok(())
    }

    pub fn get_apps(&self) -> Result<Applications, EurekaError> {
        self.for_each_server(|base_url| {
            let url = format!("{}/apps", base_url);
            debug!("get_apps {}", url);
            let req = EurekaRequest::new(Method::GET, url).accepting(self.codec.accept());
            let (body, status) = self.http.net_req(req)?;
            match status {
                200 => self.codec.decode_applications(&body),
                s => Err(EurekaError::http_status_with_prefix(s, "get_apps")),
            }
        })
    }

    pub fn get_app(&self, app: &str) -> Result<Application, EurekaError> {
        self.for_each_server(|base_url| {
            let url = format!("{}/apps/{}", base_url, path_segment_encode(app));
            debug!("get_app {}", url);
            let req = EurekaRequest::new(Method::GET, url).accepting(self.codec.accept());
            let (body, status) = self.http.net_req(req)?;
            match status {
                200 => self.codec.decode_application(&body),
                s => Err(EurekaError::http_status_with_prefix(s, "get_app")),
            }
        })
    }

    pub fn get_instance(&self, app: &str, instance_id: &str) -> Result<Instance, EurekaError> {
        self.for_each_server(|base_url| {
            let url = format!(
                "{}/apps/{}/{}",
                base_url,
                path_segment_encode(app),
                path_segment_encode(instance_id)
            );
            debug!("get_instance {}", url);
            let req = EurekaRequest::new(Method::GET, url).accepting(self.codec.accept());
            let (body, status) = self.http.net_req(req)?;
            match status {
                200 => self.codec.decode_instance(&body),
                s => Err(EurekaError::http_status_with_prefix(s, "get_instance")),
            }
        })
    }

    pub fn get_instances_by_vip_address(&self, vip_address: &str) -> Result<Vec<Instance>, EurekaError> {
        self.for_each_server(|base_url| {
            let url = format!("{}/vips/{}", base_url, path_segment_encode(vip_address));
            debug!("get_instances_by_vip_address {}", url);
            let req = EurekaRequest::new(Method::GET, url).accepting(self.codec.accept());
            let (body, status) = self.http.net_req(req)?;
            match status {
                200 => Ok(self
                    .codec
                    .decode_applications(&body)?
                    .applications
                    .into_iter()
                    .flat_map(|a| a.instances)
                    .collect()),
                s => Err(EurekaError::http_status_with_prefix(s, "get_instances_by_vip_address")),
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn invoker() -> HttpInvoker {
        HttpInvoker::new(Arc::new(reqwest::blocking::Client::new()))
    }

    fn registry(server: &mockito::ServerGuard, codec: Codec) -> RegistryClient {
        RegistryClient::new(vec![server.url()], invoker(), codec)
    }

    fn instance() -> Instance {
        Instance {
            host_name: "host1".into(),
            instance_id: Some("host1".into()),
            app: "TESTAPP".into(),
            ip_addr: "127.0.0.1".into(),
            status: StatusType::Up,
            ..Instance::default()
        }
    }

    #[test]
    fn register_succeeds_on_204() {
        let mut server = mockito::Server::new();
        let _m = server.mock("POST", "/apps/TESTAPP").with_status(204).create();
        let client = registry(&server, Codec::Json);
        assert!(client.register(&instance()).is_ok());
    }

    #[test]
    fn heartbeat_against_unknown_instance_yields_404_status() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("PUT", "/apps/TESTAPP/host1")
            .with_status(404)
            .create();
        let client = registry(&server, Codec::Json);
        let err = client.heartbeat("TESTAPP", "host1").unwrap_err();
        assert_eq!(crate::error::http_response_status_code(Some(&err)), Some(404));
    }

    #[test]
    fn register_then_heartbeat_then_deregister_then_heartbeat_404() {
        let mut server = mockito::Server::new();
        let _reg = server.mock("POST", "/apps/TESTAPP").with_status(204).create();
        let _hb = server
            .mock("PUT", "/apps/TESTAPP/host1")
            .with_status(200)
            .create();
        let _dereg = server
            .mock("DELETE", "/apps/TESTAPP/host1")
            .with_status(200)
            .create();
        let client = registry(&server, Codec::Json);
        let inst = instance();
        client.register(&inst).unwrap();
        client.heartbeat("TESTAPP", "host1").unwrap();
        client.deregister("TESTAPP", "host1").unwrap();

        drop(_hb);
        let _hb_gone = server
            .mock("PUT", "/apps/TESTAPP/host1")
            .with_status(404)
            .create();
        let err = client.heartbeat("TESTAPP", "host1").unwrap_err();
        assert_eq!(crate::error::http_response_status_code(Some(&err)), Some(404));
    }

    #[test]
    fn update_status_mutates_the_passed_instance_on_success() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("PUT", "/apps/TESTAPP/host1/status")
            .match_query(mockito::Matcher::UrlEncoded("value".into(), "DOWN".into()))
            .with_status(200)
            .create();
        let client = registry(&server, Codec::Json);
        let mut inst = instance();
        client.update_status(&mut inst, StatusType::Down).unwrap();
        assert_eq!(inst.status, StatusType::Down);
    }

    #[test]
    fn add_metadata_string_mutates_the_passed_instance_on_success() {
        let mut server = mockito::Server::new();
        let _m = server
            .mock("PUT", "/apps/TESTAPP/host1/metadata")
            .match_query(mockito::Matcher::UrlEncoded("region".into(), "us-east-1".into()))
            .with_status(200)
            .create();
        let client = registry(&server, Codec::Json);
        let mut inst = instance();
        client.add_metadata_string(&mut inst, "region", "us-east-1").unwrap();
        assert_eq!(inst.metadata.get_string("region").as_deref(), Some("us-east-1"));
    }

    #[test]
    fn a_4xx_response_is_not_retried_across_servers() {
        let mut server = mockito::Server::new();
        let _m = server.mock("GET", "/apps/MISSING").with_status(404).create();
        let client = RegistryClient::new(
            vec![server.url(), "http://127.0.0.1:1".to_string()],
            invoker(),
            Codec::Json,
        );
        let err = client.get_app("MISSING").unwrap_err();
        assert_eq!(crate::error::http_response_status_code(Some(&err)), Some(404));
    }
}
