//! One filter cycle: validate, wrap, ask the filter, enforce its answer.
//!
//! # Dispatch
//!
//! ```text
//! verify(req, resp)                       ValidationError → stop, nothing ran
//!        ↓
//! wrap → MutableRequest / MutableResponse
//!        ↓
//! handle_request → Directive
//!        ↓ match action
//! NOT_SET           drop wrappers, chain(original req, original resp)
//! PASS              apply → request, chain(req, resp)
//! PROCESS_RESPONSE  apply → request, chain(req, resp),
//!                   handle_response → apply → response
//! RETURN            apply → response, chain never runs
//! ```
//!
//! The chain is an `FnOnce`, so it runs at most once by construction.
//! Errors from the filter or the chain go straight back to the caller;
//! whatever was applied before the failure stays applied.

use tracing::debug;

use crate::action::Action;
use crate::error::{BoxError, Error};
use crate::handler::FilterLogic;
use crate::mutable::{HttpRequest, HttpResponse, MutableMessage, MutableRequest, MutableResponse};
use crate::validate::Validator;

/// Runs filter cycles under a shape-validation policy.
///
/// Holds no per-cycle state. One delegate can serve any number of concurrent
/// cycles.
#[derive(Clone, Debug, Default)]
pub struct Delegate {
    validator: Validator,
}

impl Delegate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_validator(validator: Validator) -> Self {
        Self { validator }
    }

    /// Runs one cycle of `handler` over `request`/`response`, with `chain`
    /// standing for the rest of the pipeline.
    ///
    /// Returns the action the request phase chose.
    ///
    /// ```rust
    /// use bytes::Bytes;
    /// use http::header::HOST;
    /// use http::StatusCode;
    /// use interpose::{Action, Delegate, Directive, filter_fn};
    ///
    /// let deny = filter_fn(|_req, _resp| {
    ///     Ok(Directive::builder().status(StatusCode::FORBIDDEN).return_response())
    /// });
    ///
    /// let mut req = http::Request::builder().uri("/admin").header(HOST, "gw").body(Bytes::new()).unwrap();
    /// let mut resp = http::Response::new(Bytes::new());
    ///
    /// let action = Delegate::new()
    ///     .execute(&mut req, &mut resp, |_, _| unreachable!("short-circuited"), &deny)
    ///     .unwrap();
    ///
    /// assert_eq!(action, Action::Return);
    /// assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    /// ```
    pub fn execute<H, C>(
        &self,
        request: &mut HttpRequest,
        response: &mut HttpResponse,
        chain: C,
        handler: &H,
    ) -> Result<Action, Error>
    where
        H: FilterLogic + ?Sized,
        C: FnOnce(&mut HttpRequest, &mut HttpResponse) -> Result<(), BoxError>,
    {
        self.validator.verify(request, response)?;

        let mut req = MutableRequest::wrap(request);
        let mut resp = MutableResponse::wrap(response);

        let directive = handler.handle_request(&mut req, &mut resp).map_err(Error::Handler)?;
        let action = directive.action();
        debug!(
            %action,
            continues = action.continues(),
            mutations = directive.len(),
            "request phase"
        );

        match action {
            Action::NotSet => {
                if !directive.is_empty() {
                    debug!(discarded = directive.len(), "NOT_SET directive carried mutations");
                }
                drop(directive);
                drop(req);
                drop(resp);
                chain(request, response).map_err(Error::from_chain)?;
            }
            Action::Pass => {
                directive.apply_to(&mut req);
                resp.apply();
                chain(req.inner_mut(), resp.inner_mut()).map_err(Error::from_chain)?;
            }
            Action::ProcessResponse => {
                directive.apply_to(&mut req);
                resp.apply();
                chain(req.inner_mut(), resp.inner_mut()).map_err(Error::from_chain)?;

                let directive = handler
                    .handle_response(&mut req, &mut resp)
                    .map_err(Error::Handler)?;
                debug!(action = %directive.action(), mutations = directive.len(), "response phase");
                directive.apply_to(&mut resp);
            }
            Action::Return => {
                directive.apply_to(&mut resp);
            }
        }

        Ok(action)
    }
}
