//! Minimal interpose gateway: auth gate, request stamping, response audit.
//!
//! Run with:
//!   RUST_LOG=debug cargo run --example gateway
//!
//! Try:
//!   curl -i http://localhost:3000/orders
//!   curl -i -H 'authorization: Bearer t' http://localhost:3000/orders
//!   curl -i -H 'authorization: Bearer t' http://localhost:3000/admin

use bytes::Bytes;
use http::StatusCode;
use http::header::{AUTHORIZATION, HeaderName, HeaderValue, VIA};
use interpose::{
    BoxError, Directive, FilterChain, FilterLogic, MutableRequest, MutableResponse, Server,
    filter_fn,
};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    let chain = FilterChain::new(origin)
        .filter(filter_fn(require_auth))
        .filter(ServedBy)
        .filter(filter_fn(block_admin));

    Server::bind("0.0.0.0:3000")
        .serve(chain)
        .await
        .expect("server error");
}

// Stand-in for the backend the gateway fronts.
fn origin(req: &mut interpose::HttpRequest, resp: &mut interpose::HttpResponse) -> Result<(), BoxError> {
    let via = req.headers().get(VIA).and_then(|v| v.to_str().ok()).unwrap_or("-");
    *resp.body_mut() = Bytes::from(format!("origin saw {} via {via}\n", req.uri().path()));
    Ok(())
}

// No credentials: 401 without ever reaching the origin.
fn require_auth(
    req: &mut MutableRequest<'_>,
    _resp: &mut MutableResponse<'_>,
) -> Result<Directive, BoxError> {
    if req.headers().contains_key(AUTHORIZATION) {
        return Ok(Directive::builder()
            .append_header(VIA, HeaderValue::from_static("1.1 interpose"))
            .pass());
    }
    Ok(Directive::builder()
        .status(StatusCode::UNAUTHORIZED)
        .set_header(HeaderName::from_static("www-authenticate"), HeaderValue::from_static("Bearer"))
        .body("missing credentials\n")
        .return_response())
}

// Declines everything except /admin.
fn block_admin(
    req: &mut MutableRequest<'_>,
    _resp: &mut MutableResponse<'_>,
) -> Result<Directive, BoxError> {
    if req.uri().path().starts_with("/admin") {
        return Ok(Directive::builder().status(StatusCode::FORBIDDEN).return_response());
    }
    Ok(Directive::not_set())
}

// Tags every response that made it back from the origin.
struct ServedBy;

impl FilterLogic for ServedBy {
    fn handle_request(
        &self,
        _req: &mut MutableRequest<'_>,
        _resp: &mut MutableResponse<'_>,
    ) -> Result<Directive, BoxError> {
        Ok(Directive::process_response())
    }

    fn handle_response(
        &self,
        _req: &mut MutableRequest<'_>,
        resp: &mut MutableResponse<'_>,
    ) -> Result<Directive, BoxError> {
        let tag = if resp.status().is_success() { "origin" } else { "origin-error" };
        Ok(Directive::builder()
            .set_header(HeaderName::from_static("x-served-by"), HeaderValue::from_static(tag))
            .pass())
    }
}
