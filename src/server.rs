//! Hyper host for a [`FilterChain`], with graceful shutdown.
//!
//! Each request body is buffered, then the chain runs on tokio's blocking
//! pool: the filter core is synchronous and may block on its origin, so each
//! in-flight request gets its own thread for the length of the cycle.
//!
//! Error mapping at the edge:
//!
//! | Outcome | Status |
//! |---|---|
//! | body could not be read | `400 Bad Request` |
//! | [`Error::Validation`] | `400 Bad Request` |
//! | any other [`Error`] | `500 Internal Server Error` |
//! | chain panicked | `500 Internal Server Error` |
//!
//! # Graceful shutdown
//!
//! On **SIGTERM** or **SIGINT** (or when the future passed to
//! [`Server::serve_with_shutdown`] resolves) the server:
//! 1. Immediately stops `listener.accept()`; no new connections are made.
//! 2. Lets every in-flight connection task run to completion.
//! 3. Returns from `serve`, which lets `main` exit cleanly.

use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use bytes::Bytes;
use http::StatusCode;
use http_body_util::{BodyExt, Full};
use hyper::body::Incoming;
use hyper::service::service_fn;
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::server::conn::auto::Builder as ConnBuilder;
use tokio::net::TcpListener;
use tracing::{error, info, warn};

use crate::chain::FilterChain;
use crate::error::Error;
use crate::mutable::HttpResponse;

enum Bind {
    Addr(SocketAddr),
    Listener(TcpListener),
}

/// The gateway server.
pub struct Server {
    bind: Bind,
}

impl Server {
    /// Configures the server to bind to `addr` when [`serve`](Server::serve)
    /// is called.
    ///
    /// # Panics
    ///
    /// Panics if `addr` is not a valid `host:port` string.
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use interpose::Server;
    /// let server = Server::bind("0.0.0.0:3000");
    /// ```
    pub fn bind(addr: &str) -> Self {
        let addr: SocketAddr = addr.parse().expect("invalid socket address");
        Self { bind: Bind::Addr(addr) }
    }

    /// Serves on a listener the caller already bound.
    pub fn from_listener(listener: TcpListener) -> Self {
        Self { bind: Bind::Listener(listener) }
    }

    /// Starts accepting connections and running each request through `chain`.
    ///
    /// Returns only after a full graceful shutdown (SIGTERM or Ctrl-C,
    /// followed by all in-flight requests completing).
    pub async fn serve(self, chain: FilterChain) -> Result<(), Error> {
        self.serve_with_shutdown(chain, shutdown_signal()).await
    }

    /// Like [`serve`](Server::serve), but stops accepting when `signal`
    /// resolves instead of on process signals.
    pub async fn serve_with_shutdown(
        self,
        chain: FilterChain,
        signal: impl Future<Output = ()>,
    ) -> Result<(), Error> {
        let listener = match self.bind {
            Bind::Addr(addr) => TcpListener::bind(addr).await?,
            Bind::Listener(listener) => listener,
        };
        let chain = Arc::new(chain);

        info!(addr = %listener.local_addr()?, filters = chain.len(), "interpose listening");

        let mut tasks = tokio::task::JoinSet::new();

        tokio::pin!(signal);

        loop {
            tokio::select! {
                biased;

                () = &mut signal => {
                    info!(in_flight = tasks.len(), "shutdown signal received, draining connections");
                    break;
                }

                res = listener.accept() => {
                    let (stream, remote_addr) = match res {
                        Ok(v) => v,
                        Err(e) => {
                            error!("accept error: {e}");
                            continue;
                        }
                    };

                    let chain = Arc::clone(&chain);
                    let io = TokioIo::new(stream);

                    tasks.spawn(async move {
                        let svc = service_fn(move |req| {
                            let chain = Arc::clone(&chain);
                            async move { dispatch(chain, req, remote_addr).await }
                        });

                        if let Err(e) = ConnBuilder::new(TokioExecutor::new())
                            .serve_connection(io, svc)
                            .await
                        {
                            error!(peer = %remote_addr, "connection error: {e}");
                        }
                    });
                }

                // Reap finished connection tasks so the JoinSet stays bounded.
                Some(_) = tasks.join_next(), if !tasks.is_empty() => {}
            }
        }

        while tasks.join_next().await.is_some() {}

        info!("interpose stopped");
        Ok(())
    }
}

// ── Request dispatch ──────────────────────────────────────────────────────────

/// Buffers one request, runs the chain, and turns the outcome into a response.
///
/// Every failure becomes a status code here, so hyper never sees an error.
async fn dispatch(
    chain: Arc<FilterChain>,
    req: hyper::Request<Incoming>,
    remote_addr: SocketAddr,
) -> Result<http::Response<Full<Bytes>>, Infallible> {
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(peer = %remote_addr, "failed to read request body: {e}");
            return Ok(into_hyper(status_only(StatusCode::BAD_REQUEST)));
        }
    };
    let mut request = http::Request::from_parts(parts, body);

    let outcome = tokio::task::spawn_blocking(move || {
        let mut response = http::Response::new(Bytes::new());
        chain.run(&mut request, &mut response).map(|()| response)
    })
    .await;

    let response = match outcome {
        Ok(Ok(response)) => response,
        Ok(Err(Error::Validation(e))) => {
            warn!(peer = %remote_addr, "bad request: {e}");
            status_only(StatusCode::BAD_REQUEST)
        }
        Ok(Err(e)) => {
            error!(peer = %remote_addr, "{e}");
            status_only(StatusCode::INTERNAL_SERVER_ERROR)
        }
        Err(e) => {
            error!(peer = %remote_addr, "filter chain panicked: {e}");
            status_only(StatusCode::INTERNAL_SERVER_ERROR)
        }
    };

    Ok(into_hyper(response))
}

fn status_only(status: StatusCode) -> HttpResponse {
    let mut response = http::Response::new(Bytes::new());
    *response.status_mut() = status;
    response
}

fn into_hyper(response: HttpResponse) -> http::Response<Full<Bytes>> {
    response.map(Full::new)
}

// ── Shutdown signal ───────────────────────────────────────────────────────────

/// Resolves on the first shutdown signal the process receives.
///
/// On Unix this listens for both **SIGTERM** and **SIGINT** (Ctrl-C).
/// On Windows only Ctrl-C is available.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to install Ctrl-C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let sigterm = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    // `pending()` never resolves, so on non-Unix platforms the SIGTERM arm
    // is disabled.
    #[cfg(not(unix))]
    let sigterm = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c   => {}
        () = sigterm  => {}
    }
}
