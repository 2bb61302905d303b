//! Filter chain runner.
//!
//! Runs an ordered list of filters in front of an origin. Filter `n`'s
//! continuation is "run filters `n+1..` then the origin", so each filter sees
//! the request after everything upstream of it, and the response after
//! everything downstream of it.
//!
//! Ordering is whatever order [`FilterChain::filter`] was called in.
//!
//! Every stage validates the exchange it is handed. Only the first stage sees
//! what the client sent; a validation failure further in is caused by an
//! upstream filter's mutations and surfaces as [`Error::Chain`] wrapping the
//! [`ValidationError`](crate::ValidationError).

use std::sync::Arc;

use tracing::debug_span;

use crate::delegate::Delegate;
use crate::error::{BoxError, Error};
use crate::handler::FilterLogic;
use crate::mutable::{HttpRequest, HttpResponse};

type BoxedFilter = Arc<dyn FilterLogic + Send + Sync + 'static>;

type BoxedOrigin =
    Box<dyn Fn(&mut HttpRequest, &mut HttpResponse) -> Result<(), BoxError> + Send + Sync + 'static>;

/// An ordered filter list in front of an origin.
///
/// Build it once at startup; share it behind an `Arc`. Each
/// [`FilterChain::filter`] call returns `self` so registrations chain
/// naturally.
///
/// ```rust
/// use bytes::Bytes;
/// use http::header::HOST;
/// use interpose::{Directive, FilterChain, filter_fn};
///
/// let chain = FilterChain::new(|_req, resp| {
///     *resp.body_mut() = Bytes::from_static(b"hello");
///     Ok(())
/// })
/// .filter(filter_fn(|_req, _resp| Ok(Directive::pass())));
///
/// let mut req = http::Request::builder().uri("/").header(HOST, "gw").body(Bytes::new()).unwrap();
/// let mut resp = http::Response::new(Bytes::new());
/// chain.run(&mut req, &mut resp).unwrap();
/// assert_eq!(resp.body(), "hello");
/// ```
pub struct FilterChain {
    delegate: Delegate,
    filters: Vec<BoxedFilter>,
    origin: BoxedOrigin,
}

impl FilterChain {
    /// A chain with no filters yet, ending at `origin`.
    pub fn new<F>(origin: F) -> Self
    where
        F: Fn(&mut HttpRequest, &mut HttpResponse) -> Result<(), BoxError> + Send + Sync + 'static,
    {
        Self { delegate: Delegate::new(), filters: Vec::new(), origin: Box::new(origin) }
    }

    /// Append a filter. It runs after every filter registered before it.
    pub fn filter(mut self, filter: impl FilterLogic + Send + Sync + 'static) -> Self {
        self.filters.push(Arc::new(filter));
        self
    }

    /// Replace the delegate, e.g. to relax validation.
    pub fn delegate(mut self, delegate: Delegate) -> Self {
        self.delegate = delegate;
        self
    }

    pub fn len(&self) -> usize {
        self.filters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }

    /// Runs the whole chain over one exchange.
    pub fn run(&self, request: &mut HttpRequest, response: &mut HttpResponse) -> Result<(), Error> {
        self.run_from(0, request, response)
    }

    fn run_from(
        &self,
        index: usize,
        request: &mut HttpRequest,
        response: &mut HttpResponse,
    ) -> Result<(), Error> {
        let Some(filter) = self.filters.get(index) else {
            return (self.origin)(request, response).map_err(Error::Chain);
        };

        let _span = debug_span!("filter", index, name = filter.name()).entered();
        let outcome = self.delegate.execute(
            request,
            response,
            |req, resp| self.run_from(index + 1, req, resp).map_err(BoxError::from),
            filter.as_ref(),
        );
        match outcome {
            // Past the first stage the exchange has already been rewritten by
            // upstream filters, so a shape failure is theirs, not the client's.
            Err(Error::Validation(e)) if index > 0 => Err(Error::Chain(Box::new(e))),
            other => other.map(drop),
        }
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain")
            .field("delegate", &self.delegate)
            .field("filters", &self.filters.iter().map(|x| x.name()).collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
