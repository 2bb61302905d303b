//! The filter-logic capability and closure adapter.
//!
//! A filter is anything that can look at a request (and later, optionally,
//! the response) and say what should happen next. The delegate calls it at
//! most twice per cycle:
//!
//! ```text
//! handle_request(req, resp)   → Directive   always
//!        ↓ action == PROCESS_RESPONSE, after the chain returns
//! handle_response(req, resp)  → Directive   applied to the response only
//! ```
//!
//! Both methods take `&self`. A filter shared between concurrent cycles must
//! be `Send + Sync` on its own terms; the delegate adds no locking.

use crate::directive::Directive;
use crate::error::BoxError;
use crate::mutable::{MutableRequest, MutableResponse};

/// Pluggable filter logic.
///
/// ```rust
/// use http::header::{HeaderName, HeaderValue};
/// use interpose::{BoxError, Directive, FilterLogic, MutableRequest, MutableResponse};
///
/// struct StampVia;
///
/// impl FilterLogic for StampVia {
///     fn handle_request(
///         &self,
///         _req: &mut MutableRequest<'_>,
///         _resp: &mut MutableResponse<'_>,
///     ) -> Result<Directive, BoxError> {
///         Ok(Directive::builder()
///             .append_header(HeaderName::from_static("via"), HeaderValue::from_static("1.1 gw"))
///             .pass())
///     }
/// }
/// ```
pub trait FilterLogic {
    /// Request phase. Runs once per cycle, before the chain.
    fn handle_request(
        &self,
        req: &mut MutableRequest<'_>,
        resp: &mut MutableResponse<'_>,
    ) -> Result<Directive, BoxError>;

    /// Response phase. Runs only when the request phase returned
    /// `PROCESS_RESPONSE`, after the chain has filled in the response.
    ///
    /// The default changes nothing.
    fn handle_response(
        &self,
        _req: &mut MutableRequest<'_>,
        _resp: &mut MutableResponse<'_>,
    ) -> Result<Directive, BoxError> {
        Ok(Directive::not_set())
    }

    /// Name used in log spans.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Turns a request-phase closure into a [`FilterLogic`].
///
/// The response phase is the trait default. Takes the closure through a
/// plain `Fn` bound so its argument lifetimes are inferred as higher-ranked.
///
/// ```rust
/// use http::StatusCode;
/// use http::header::AUTHORIZATION;
/// use interpose::{Directive, filter_fn};
///
/// let require_auth = filter_fn(|req, _resp| {
///     Ok(if req.headers().contains_key(AUTHORIZATION) {
///         Directive::pass()
///     } else {
///         Directive::builder().status(StatusCode::UNAUTHORIZED).return_response()
///     })
/// });
/// ```
pub fn filter_fn<F>(f: F) -> FnFilter<F>
where
    F: Fn(&mut MutableRequest<'_>, &mut MutableResponse<'_>) -> Result<Directive, BoxError>,
{
    FnFilter(f)
}

/// Filter built by [`filter_fn`].
#[derive(Clone, Copy)]
pub struct FnFilter<F>(F);

impl<F> FilterLogic for FnFilter<F>
where
    F: Fn(&mut MutableRequest<'_>, &mut MutableResponse<'_>) -> Result<Directive, BoxError>,
{
    fn handle_request(
        &self,
        req: &mut MutableRequest<'_>,
        resp: &mut MutableResponse<'_>,
    ) -> Result<Directive, BoxError> {
        (self.0)(req, resp)
    }

    fn name(&self) -> &str {
        "filter_fn"
    }
}
