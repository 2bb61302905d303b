//! Unified error type.

use crate::validate::ValidationError;

/// Type-erased error returned by filter logic and chain continuations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// The error type returned by interpose's fallible operations.
///
/// Nothing is caught or retried on the way out. Handler and chain failures
/// keep the original error as their [`source`](std::error::Error::source), so
/// callers can downcast to whatever the filter or backend raised.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The raw request or response failed the shape check. No filter logic
    /// ran and nothing was mutated.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Filter logic failed in either phase.
    #[error("filter logic failed: {0}")]
    Handler(#[source] BoxError),

    /// The rest of the pipeline failed. Request mutations applied before the
    /// call stay applied.
    ///
    /// Inside a [`FilterChain`](crate::FilterChain), a later stage rejecting an
    /// exchange that upstream filters rewrote lands here too, with the
    /// [`ValidationError`] as the source.
    #[error("filter chain failed: {0}")]
    Chain(#[source] BoxError),

    /// Binding or accepting on the listening socket failed.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Wraps a continuation failure, unless it already is an [`Error`] raised
    /// by a delegate further down the chain. That one passes through as-is.
    pub(crate) fn from_chain(e: BoxError) -> Self {
        match e.downcast::<Error>() {
            Ok(inner) => *inner,
            Err(e) => Self::Chain(e),
        }
    }
}
