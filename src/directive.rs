//! Directives: what a filter returns, and the mutations it carries.
//!
//! A [`Directive`] pairs an [`Action`] with an ordered list of [`Mutation`]s.
//! Filters build one per phase and hand it back; the delegate decides which
//! target it is applied to and applies it exactly once.
//!
//! Application consumes the directive, so a second application does not
//! compile:
//!
//! ```rust,compile_fail
//! use bytes::Bytes;
//! use http::header::{HeaderName, HeaderValue};
//! use interpose::{Directive, MutableRequest};
//!
//! let mut raw = http::Request::new(Bytes::new());
//! let mut req = MutableRequest::wrap(&mut raw);
//! let directive = Directive::builder()
//!     .append_header(HeaderName::from_static("via"), HeaderValue::from_static("gw"))
//!     .pass();
//!
//! directive.apply_to(&mut req);
//! directive.apply_to(&mut req); // use of moved value
//! ```

use bytes::Bytes;
use http::header::{HeaderName, HeaderValue};
use http::{StatusCode, Uri};

use crate::action::Action;
use crate::mutable::MutableMessage;

// ── Mutation ──────────────────────────────────────────────────────────────────

/// One pending change to a request or response.
///
/// Header and body mutations apply to either side. `SetStatus` only means
/// something on a response and `RewriteUri` only on a request; the other side
/// skips them with a warning.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Mutation {
    /// Replace every value of the header with this one.
    SetHeader(HeaderName, HeaderValue),
    /// Add a value after any existing ones.
    AppendHeader(HeaderName, HeaderValue),
    /// Drop every value of the header.
    RemoveHeader(HeaderName),
    /// Replace the body. An existing `content-length` is rewritten to match.
    ReplaceBody(Bytes),
    /// Override the response status.
    SetStatus(StatusCode),
    /// Point the request at a different target.
    RewriteUri(Uri),
}

// ── Directive ─────────────────────────────────────────────────────────────────

/// A filter's decision for one phase.
///
/// Immutable once built: the action and the mutation list are fixed at
/// construction and only readable afterwards.
///
/// ```rust
/// use http::header::{HeaderName, HeaderValue};
/// use http::StatusCode;
/// use interpose::{Action, Directive};
///
/// // Continue, stamping the request on the way through.
/// let d = Directive::builder()
///     .append_header(HeaderName::from_static("via"), HeaderValue::from_static("1.1 gw"))
///     .pass();
/// assert_eq!(d.action(), Action::Pass);
///
/// // Reject outright.
/// let d = Directive::builder()
///     .status(StatusCode::UNAUTHORIZED)
///     .return_response();
/// assert_eq!(d.mutations().len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct Directive {
    action: Action,
    mutations: Vec<Mutation>,
}

impl Directive {
    /// `NOT_SET` with no mutations: the filter stays out of the way.
    pub fn not_set() -> Self {
        Self::default()
    }

    /// `PASS` with no mutations.
    pub fn pass() -> Self {
        Self::builder().pass()
    }

    /// `PROCESS_RESPONSE` with no mutations.
    pub fn process_response() -> Self {
        Self::builder().process_response()
    }

    /// `RETURN` with no mutations. The response goes back as-is.
    pub fn return_response() -> Self {
        Self::builder().return_response()
    }

    pub fn builder() -> DirectiveBuilder {
        DirectiveBuilder { mutations: Vec::new() }
    }

    pub fn action(&self) -> Action {
        self.action
    }

    pub fn mutations(&self) -> &[Mutation] {
        &self.mutations
    }

    pub fn len(&self) -> usize {
        self.mutations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mutations.is_empty()
    }

    /// Replays the mutations onto `target` in recorded order and applies them
    /// to the underlying message.
    ///
    /// Consumes the directive. Additive mutations such as header appends
    /// would double up if replayed, so there is no way to apply twice.
    pub fn apply_to<T: MutableMessage + ?Sized>(self, target: &mut T) {
        for mutation in self.mutations {
            target.queue(mutation);
        }
        target.apply();
    }
}

// ── DirectiveBuilder ──────────────────────────────────────────────────────────

/// Fluent builder for [`Directive`].
///
/// Obtain via [`Directive::builder()`]. Mutations are recorded in call order.
/// Terminated by the action, so a directive never exists without one.
#[derive(Debug, Default)]
pub struct DirectiveBuilder {
    mutations: Vec<Mutation>,
}

impl DirectiveBuilder {
    pub fn set_header(self, name: HeaderName, value: HeaderValue) -> Self {
        self.mutation(Mutation::SetHeader(name, value))
    }

    pub fn append_header(self, name: HeaderName, value: HeaderValue) -> Self {
        self.mutation(Mutation::AppendHeader(name, value))
    }

    pub fn remove_header(self, name: HeaderName) -> Self {
        self.mutation(Mutation::RemoveHeader(name))
    }

    pub fn body(self, body: impl Into<Bytes>) -> Self {
        self.mutation(Mutation::ReplaceBody(body.into()))
    }

    /// Response only.
    pub fn status(self, status: StatusCode) -> Self {
        self.mutation(Mutation::SetStatus(status))
    }

    /// Request only.
    pub fn uri(self, uri: Uri) -> Self {
        self.mutation(Mutation::RewriteUri(uri))
    }

    /// Record an arbitrary mutation.
    pub fn mutation(mut self, mutation: Mutation) -> Self {
        self.mutations.push(mutation);
        self
    }

    pub fn not_set(self) -> Directive {
        self.action(Action::NotSet)
    }

    pub fn pass(self) -> Directive {
        self.action(Action::Pass)
    }

    pub fn process_response(self) -> Directive {
        self.action(Action::ProcessResponse)
    }

    pub fn return_response(self) -> Directive {
        self.action(Action::Return)
    }

    /// Terminate with an explicit action.
    pub fn action(self, action: Action) -> Directive {
        Directive { action, mutations: self.mutations }
    }
}
