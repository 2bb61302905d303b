//! # interpose
//!
//! The dispatch kernel of a filter-chain HTTP gateway.
//!
//! Each filter in a gateway gets three things: the request, a response slot,
//! and "the rest of the pipeline". It may inspect, rewrite, short-circuit, or
//! step aside. interpose runs that decision loop: it wraps the exchange,
//! asks the filter for a [`Directive`], and enforces it.
//!
//! ## The contract
//!
//! A filter never mutates the exchange directly. It returns an [`Action`]
//! and an ordered list of [`Mutation`]s, and the [`Delegate`] decides where
//! they land:
//!
//! - **`NOT_SET`**: the filter declined. Anything it queued is discarded and
//!   the chain sees the untouched originals.
//! - **`PASS`**: mutations go to the request, then the chain runs.
//! - **`PROCESS_RESPONSE`**: as `PASS`, then the filter runs again on the
//!   filled-in response, and that second directive goes to the response.
//! - **`RETURN`**: mutations build the response. The chain never runs.
//!
//! What interpose leaves to its host:
//!
//! - **Filter logic**: auth, routing, rate limiting are all [`FilterLogic`] impls
//! - **Ordering**: [`FilterChain`] runs filters in registration order, nothing smarter
//! - **Retries, caching, timeouts**: the surrounding server's job
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use bytes::Bytes;
//! use http::StatusCode;
//! use http::header::{AUTHORIZATION, HeaderName, HeaderValue};
//! use interpose::{Directive, FilterChain, Server, filter_fn};
//!
//! #[tokio::main]
//! async fn main() {
//!     let chain = FilterChain::new(|_req, resp| {
//!         *resp.body_mut() = Bytes::from_static(b"hello from origin");
//!         Ok(())
//!     })
//!     .filter(filter_fn(|req, _resp| {
//!         if !req.headers().contains_key(AUTHORIZATION) {
//!             return Ok(Directive::builder()
//!                 .status(StatusCode::UNAUTHORIZED)
//!                 .return_response());
//!         }
//!         Ok(Directive::builder()
//!             .append_header(HeaderName::from_static("via"), HeaderValue::from_static("1.1 gw"))
//!             .pass())
//!     }));
//!
//!     Server::bind("0.0.0.0:3000").serve(chain).await.unwrap();
//! }
//! ```

mod action;
mod chain;
mod delegate;
mod directive;
mod error;
mod handler;
mod mutable;
mod server;
mod validate;

pub use action::Action;
pub use chain::FilterChain;
pub use delegate::Delegate;
pub use directive::{Directive, DirectiveBuilder, Mutation};
pub use error::{BoxError, Error};
pub use handler::{FilterLogic, FnFilter, filter_fn};
pub use mutable::{HttpRequest, HttpResponse, MutableMessage, MutableRequest, MutableResponse};
pub use server::Server;
pub use validate::{ValidationError, Validator};
