//! Buffering wrappers over the raw request and response.
//!
//! A wrapper borrows the raw message for one filter cycle and holds an
//! ordered list of pending [`Mutation`]s. Nothing touches the raw message
//! until [`MutableMessage::apply`] replays the list; dropping a wrapper
//! without applying discards whatever was queued.
//!
//! Reads go straight through to the raw message via `Deref`, so a filter sees
//! the request exactly as the previous stage left it.

use std::ops::Deref;

use bytes::Bytes;
use http::header::{AsHeaderName, CONTENT_LENGTH, HeaderMap, HeaderValue};
use tracing::{trace, warn};

use crate::directive::Mutation;

/// The raw request type the host hands to the delegate.
pub type HttpRequest = http::Request<Bytes>;

/// The raw response type the host hands to the delegate.
pub type HttpResponse = http::Response<Bytes>;

/// Deferred, order-preserving mutation of a message.
pub trait MutableMessage {
    /// Buffer a mutation. Nothing is visible on the raw message yet.
    fn queue(&mut self, mutation: Mutation);

    /// Mutations queued and not yet applied, in queue order.
    fn pending(&self) -> &[Mutation];

    /// Replay every pending mutation onto the raw message, in queue order,
    /// and clear the queue. Returns how many were replayed.
    fn apply(&mut self) -> usize;
}

// ── MutableRequest ────────────────────────────────────────────────────────────

/// Request wrapper handed to filter logic.
#[derive(Debug)]
pub struct MutableRequest<'a> {
    inner: &'a mut HttpRequest,
    pending: Vec<Mutation>,
}

impl<'a> MutableRequest<'a> {
    pub fn wrap(inner: &'a mut HttpRequest) -> Self {
        Self { inner, pending: Vec::new() }
    }

    /// All values of `name`, comma-joined in field order (`"A,B"`).
    pub fn header_joined(&self, name: impl AsHeaderName) -> Option<String> {
        joined(self.inner.headers(), name)
    }

    /// The raw request, for handing on to the chain.
    pub(crate) fn inner_mut(&mut self) -> &mut HttpRequest {
        self.inner
    }
}

impl Deref for MutableRequest<'_> {
    type Target = HttpRequest;

    fn deref(&self) -> &HttpRequest {
        self.inner
    }
}

impl MutableMessage for MutableRequest<'_> {
    fn queue(&mut self, mutation: Mutation) {
        self.pending.push(mutation);
    }

    fn pending(&self) -> &[Mutation] {
        &self.pending
    }

    fn apply(&mut self) -> usize {
        let count = self.pending.len();
        for mutation in self.pending.drain(..) {
            trace!(?mutation, "request mutation");
            match mutation {
                Mutation::SetHeader(name, value) => {
                    self.inner.headers_mut().insert(name, value);
                }
                Mutation::AppendHeader(name, value) => {
                    self.inner.headers_mut().append(name, value);
                }
                Mutation::RemoveHeader(name) => {
                    self.inner.headers_mut().remove(name);
                }
                Mutation::ReplaceBody(body) => {
                    sync_content_length(self.inner.headers_mut(), body.len());
                    *self.inner.body_mut() = body;
                }
                Mutation::RewriteUri(uri) => *self.inner.uri_mut() = uri,
                Mutation::SetStatus(status) => {
                    warn!(%status, "status override has no meaning on a request, skipped");
                }
            }
        }
        count
    }
}

// ── MutableResponse ───────────────────────────────────────────────────────────

/// Response wrapper handed to filter logic.
#[derive(Debug)]
pub struct MutableResponse<'a> {
    inner: &'a mut HttpResponse,
    pending: Vec<Mutation>,
}

impl<'a> MutableResponse<'a> {
    pub fn wrap(inner: &'a mut HttpResponse) -> Self {
        Self { inner, pending: Vec::new() }
    }

    /// All values of `name`, comma-joined in field order (`"A,B"`).
    pub fn header_joined(&self, name: impl AsHeaderName) -> Option<String> {
        joined(self.inner.headers(), name)
    }

    /// The raw response, for handing on to the chain.
    pub(crate) fn inner_mut(&mut self) -> &mut HttpResponse {
        self.inner
    }
}

impl Deref for MutableResponse<'_> {
    type Target = HttpResponse;

    fn deref(&self) -> &HttpResponse {
        self.inner
    }
}

impl MutableMessage for MutableResponse<'_> {
    fn queue(&mut self, mutation: Mutation) {
        self.pending.push(mutation);
    }

    fn pending(&self) -> &[Mutation] {
        &self.pending
    }

    fn apply(&mut self) -> usize {
        let count = self.pending.len();
        for mutation in self.pending.drain(..) {
            trace!(?mutation, "response mutation");
            match mutation {
                Mutation::SetHeader(name, value) => {
                    self.inner.headers_mut().insert(name, value);
                }
                Mutation::AppendHeader(name, value) => {
                    self.inner.headers_mut().append(name, value);
                }
                Mutation::RemoveHeader(name) => {
                    self.inner.headers_mut().remove(name);
                }
                Mutation::ReplaceBody(body) => {
                    sync_content_length(self.inner.headers_mut(), body.len());
                    *self.inner.body_mut() = body;
                }
                Mutation::SetStatus(status) => *self.inner.status_mut() = status,
                Mutation::RewriteUri(uri) => {
                    warn!(%uri, "URI rewrite has no meaning on a response, skipped");
                }
            }
        }
        count
    }
}

// ── Shared helpers ────────────────────────────────────────────────────────────

/// Keeps a declared `content-length` honest after a body swap. A message that
/// never declared one is left alone.
fn sync_content_length(headers: &mut HeaderMap, len: usize) {
    if headers.contains_key(CONTENT_LENGTH) {
        headers.insert(CONTENT_LENGTH, HeaderValue::from(len));
    }
}

fn joined(headers: &HeaderMap, name: impl AsHeaderName) -> Option<String> {
    let values: Vec<_> = headers
        .get_all(name)
        .iter()
        .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
        .collect();
    (!values.is_empty()).then(|| values.join(","))
}
