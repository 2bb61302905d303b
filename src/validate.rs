//! Shape checks on the raw request and response before a filter cycle.
//!
//! `http`'s types already guarantee a parseable method, URI and status. What
//! they don't guarantee is that the pair makes sense as a message a gateway
//! can forward: request-target form vs. method, `Host` on HTTP/1.1, framing
//! headers that agree with the buffered body, and a final (non-1xx) response.

use http::header::{CONTENT_LENGTH, HOST, HeaderMap, HeaderName, TRANSFER_ENCODING};
use http::{Method, StatusCode, Version};
use tracing::warn;

use crate::mutable::{HttpRequest, HttpResponse};

/// Why a raw request or response was refused.
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("asterisk-form target is only valid for OPTIONS, got {0}")]
    AsteriskTarget(Method),

    #[error("authority-form target is only valid for CONNECT, got {0}")]
    AuthorityTarget(Method),

    #[error("CONNECT requires an authority-form target")]
    ConnectWithoutAuthority,

    #[error("HTTP/1.1 request without a host header")]
    MissingHost,

    #[error("header `{0}` appears more than once")]
    DuplicateHeader(HeaderName),

    #[error("content-length is not a decimal length")]
    InvalidContentLength,

    #[error("content-length declares {declared} bytes but the body holds {actual}")]
    ContentLengthMismatch { declared: u64, actual: usize },

    #[error("content-length and transfer-encoding are both present")]
    ConflictingFraming,

    #[error("{0} is informational and cannot be a final response")]
    InformationalStatus(StatusCode),
}

/// Request-target forms from RFC 9112 §3.2.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum TargetForm {
    Origin,
    Absolute,
    Authority,
    Asterisk,
}

fn target_form(req: &HttpRequest) -> TargetForm {
    let uri = req.uri();
    match (uri.scheme(), uri.authority()) {
        (Some(_), _) => TargetForm::Absolute,
        (None, Some(_)) => TargetForm::Authority,
        (None, None) if uri.path() == "*" => TargetForm::Asterisk,
        (None, None) => TargetForm::Origin,
    }
}

/// The shape policy applied before every filter cycle.
///
/// ```rust
/// use interpose::Validator;
///
/// // HTTP/1.1 clients must send Host; relax it for synthetic traffic.
/// let validator = Validator::new().require_host(false);
/// ```
#[derive(Clone, Debug)]
pub struct Validator {
    require_host: bool,
}

impl Validator {
    pub fn new() -> Self {
        Self { require_host: true }
    }

    /// Whether an HTTP/1.1 request in origin-form must carry `Host`.
    /// Defaults to `true`.
    pub fn require_host(mut self, require: bool) -> Self {
        self.require_host = require;
        self
    }

    /// Checks both halves of the exchange. Nothing is modified.
    pub fn verify(&self, req: &HttpRequest, resp: &HttpResponse) -> Result<(), ValidationError> {
        self.verify_request(req)
            .and_then(|()| verify_response(resp))
            .inspect_err(|e| warn!(method = %req.method(), uri = %req.uri(), "rejected: {e}"))
    }

    fn verify_request(&self, req: &HttpRequest) -> Result<(), ValidationError> {
        let form = target_form(req);
        let method = req.method();

        match form {
            TargetForm::Asterisk if method != Method::OPTIONS => {
                return Err(ValidationError::AsteriskTarget(method.clone()));
            }
            TargetForm::Authority if method != Method::CONNECT => {
                return Err(ValidationError::AuthorityTarget(method.clone()));
            }
            TargetForm::Origin | TargetForm::Absolute | TargetForm::Asterisk
                if method == Method::CONNECT =>
            {
                return Err(ValidationError::ConnectWithoutAuthority);
            }
            _ => {}
        }

        let hosts = req.headers().get_all(HOST).iter().count();
        if hosts > 1 {
            return Err(ValidationError::DuplicateHeader(HOST));
        }
        if self.require_host
            && hosts == 0
            && req.version() == Version::HTTP_11
            && form != TargetForm::Absolute
        {
            return Err(ValidationError::MissingHost);
        }

        verify_framing(req.headers(), req.body().len())
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new()
    }
}

fn verify_response(resp: &HttpResponse) -> Result<(), ValidationError> {
    if resp.status().is_informational() {
        return Err(ValidationError::InformationalStatus(resp.status()));
    }
    verify_framing(resp.headers(), resp.body().len())
}

/// A declared length must be single, numeric, alone, and true.
fn verify_framing(headers: &HeaderMap, body_len: usize) -> Result<(), ValidationError> {
    let mut lengths = headers.get_all(CONTENT_LENGTH).iter();
    let Some(value) = lengths.next() else {
        return Ok(());
    };
    if lengths.next().is_some() {
        return Err(ValidationError::DuplicateHeader(CONTENT_LENGTH));
    }
    if headers.contains_key(TRANSFER_ENCODING) {
        return Err(ValidationError::ConflictingFraming);
    }

    let declared: u64 = value
        .to_str()
        .ok()
        .filter(|s| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|s| s.parse().ok())
        .ok_or(ValidationError::InvalidContentLength)?;

    if declared != body_len as u64 {
        return Err(ValidationError::ContentLengthMismatch { declared, actual: body_len });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;

    fn request(method: Method, uri: &str) -> http::request::Builder {
        http::Request::builder().method(method).uri(uri)
    }

    fn ok_response() -> HttpResponse {
        http::Response::new(Bytes::new())
    }

    fn check(req: http::request::Builder) -> Result<(), ValidationError> {
        Validator::new().verify(&req.body(Bytes::new()).unwrap(), &ok_response())
    }

    #[test]
    fn accepts_ordinary_origin_form() {
        assert!(check(request(Method::GET, "/users").header(HOST, "api")).is_ok());
    }

    #[test]
    fn absolute_form_needs_no_host() {
        assert!(check(request(Method::GET, "http://api/users")).is_ok());
    }

    #[test]
    fn http10_needs_no_host() {
        assert!(check(request(Method::GET, "/").version(Version::HTTP_10)).is_ok());
    }

    #[test]
    fn missing_host_is_rejected_unless_relaxed() {
        let req = request(Method::GET, "/").body(Bytes::new()).unwrap();
        assert!(matches!(
            Validator::new().verify(&req, &ok_response()),
            Err(ValidationError::MissingHost)
        ));
        assert!(Validator::new().require_host(false).verify(&req, &ok_response()).is_ok());
    }

    #[test]
    fn duplicate_host_is_rejected() {
        let req = request(Method::GET, "/").header(HOST, "a").header(HOST, "b");
        assert!(matches!(check(req), Err(ValidationError::DuplicateHeader(h)) if h == HOST));
    }

    #[test]
    fn target_form_must_match_method() {
        assert!(check(request(Method::OPTIONS, "*").header(HOST, "api")).is_ok());
        assert!(matches!(
            check(request(Method::GET, "*").header(HOST, "api")),
            Err(ValidationError::AsteriskTarget(m)) if m == Method::GET
        ));
        assert!(check(request(Method::CONNECT, "api:443").header(HOST, "api:443")).is_ok());
        assert!(matches!(
            check(request(Method::GET, "api:443").header(HOST, "api")),
            Err(ValidationError::AuthorityTarget(_))
        ));
        assert!(matches!(
            check(request(Method::CONNECT, "/tunnel").header(HOST, "api")),
            Err(ValidationError::ConnectWithoutAuthority)
        ));
    }

    #[test]
    fn content_length_must_match_body() {
        let req = request(Method::POST, "/")
            .header(HOST, "api")
            .header(CONTENT_LENGTH, "10")
            .body(Bytes::from_static(b"{}"))
            .unwrap();
        assert!(matches!(
            Validator::new().verify(&req, &ok_response()),
            Err(ValidationError::ContentLengthMismatch { declared: 10, actual: 2 })
        ));
    }

    #[test]
    fn content_length_must_be_digits() {
        let req = request(Method::POST, "/").header(HOST, "api").header(CONTENT_LENGTH, "+2");
        assert!(matches!(check(req), Err(ValidationError::InvalidContentLength)));
    }

    #[test]
    fn length_with_chunking_is_rejected() {
        let req = request(Method::POST, "/")
            .header(HOST, "api")
            .header(CONTENT_LENGTH, "0")
            .header(TRANSFER_ENCODING, "chunked");
        assert!(matches!(check(req), Err(ValidationError::ConflictingFraming)));
    }

    #[test]
    fn informational_response_is_rejected() {
        let req = request(Method::GET, "/").header(HOST, "api").body(Bytes::new()).unwrap();
        let resp = http::Response::builder()
            .status(StatusCode::CONTINUE)
            .body(Bytes::new())
            .unwrap();
        assert!(matches!(
            Validator::new().verify(&req, &resp),
            Err(ValidationError::InformationalStatus(StatusCode::CONTINUE))
        ));
    }
}
