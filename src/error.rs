//! Error taxonomy for the Eureka client.
//!
//! Mirrors the upstream Go client's `unsuccessfulHTTPResponse` design: a single
//! `HttpStatus` variant carries the status code so callers can build recovery
//! policy (e.g. "404 on heartbeat means reregister") without string matching.

quick_error! {
    #[derive(Debug)]
    pub enum EurekaError {
        /// Transport-level failure: connect refused, timeout, TLS, body read.
        Network(err: reqwest::Error) {
            display("{}", err)
            from()
        }
        /// The request reached the server but it responded with a non-2xx status.
        HttpStatus(status_code: u16, message_prefix: Option<String>) {
            display("{}", format_http_status(*status_code, message_prefix))
        }
        /// DNS lookup failure, NXDOMAIN, or a malformed TXT hierarchy.
        Dns(description: String) {
            display("DNS error: {}", description)
        }
        /// Response body present but not parseable under the selected codec.
        ParseError(description: String) {
            display("failed to parse response: {}", description)
        }
        /// Caller-supplied argument invalid (e.g. an empty status in `with_status`).
        Validation(description: String) {
            display("invalid argument: {}", description)
        }
        /// A semantic precondition failed, e.g. an instance disappeared from a
        /// cache that a caller expected to be populated.
        UnexpectedState(description: String) {
            display("{}", description)
        }
    }
}

fn format_http_status(status_code: u16, message_prefix: &Option<String>) -> String {
    match message_prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}: got status {}", prefix, status_code),
        _ => format!("got status {}", status_code),
    }
}

impl EurekaError {
    pub fn http_status(status_code: u16) -> Self {
        EurekaError::HttpStatus(status_code, None)
    }

    pub fn http_status_with_prefix(status_code: u16, prefix: impl Into<String>) -> Self {
        EurekaError::HttpStatus(status_code, Some(prefix.into()))
    }

    /// True for errors worth retrying against the next candidate server: transport
    /// failures and 5xx responses. 4xx is never retried.
    pub fn is_retryable_across_servers(&self) -> bool {
        match self {
            EurekaError::Network(_) => true,
            EurekaError::HttpStatus(code, _) => (500..600).contains(code),
            _ => false,
        }
    }
}

/// Returns the HTTP status code carried by `err`, if any.
///
/// `None` for `None` and for error kinds unrelated to an HTTP response;
/// `Some(code)` only for [`EurekaError::HttpStatus`].
pub fn http_response_status_code(err: Option<&EurekaError>) -> Option<u16> {
    match err {
        Some(EurekaError::HttpStatus(code, _)) => Some(*code),
        _ => None,
    }
}

// quick_error's generated Display already covers this, but the crate's callers
// frequently match on `fmt::Display` directly via `.to_string()`; keep the impl
// trivially reachable without importing `std::error::Error`.
impl From<xmlparser::Error> for EurekaError {
    fn from(err: xmlparser::Error) -> Self {
        EurekaError::ParseError(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nil_error_has_no_status_code() {
        assert_eq!(http_response_status_code(None), None);
    }

    #[test]
    fn status_error_reports_its_code() {
        let err = EurekaError::http_status(404);
        assert_eq!(http_response_status_code(Some(&err)), Some(404));
    }

    #[test]
    fn unrelated_error_has_no_status_code() {
        let err = EurekaError::Validation("bad status".into());
        assert_eq!(http_response_status_code(Some(&err)), None);
    }

    #[test]
    fn message_without_prefix_has_no_leading_separator() {
        let err = EurekaError::http_status(500);
        let msg = err.to_string();
        assert!(!msg.starts_with(','));
        assert!(msg.contains("500"));
    }

    #[test]
    fn message_with_prefix_starts_with_it() {
        let err = EurekaError::http_status_with_prefix(500, "operation failed");
        let msg = err.to_string();
        assert!(msg.starts_with("operation failed"));
        assert!(msg.contains("500"));
    }

    #[test]
    fn retryability_matches_policy() {
        assert!(EurekaError::http_status(503).is_retryable_across_servers());
        assert!(!EurekaError::http_status(404).is_retryable_across_servers());
        assert!(!EurekaError::Validation("x".into()).is_retryable_across_servers());
    }
}
