//! End-to-end tests: a real socket, a hand-written HTTP/1.1 request, and the
//! filter chain in between.

use std::net::SocketAddr;

use bytes::Bytes;
use http::StatusCode;
use http::header::{AUTHORIZATION, HeaderName, HeaderValue};
use interpose::{Directive, FilterChain, Server, filter_fn};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

fn gateway() -> FilterChain {
    FilterChain::new(|req, resp| {
        let greeting = format!("hello {}", req.uri().path());
        *resp.body_mut() = Bytes::from(greeting);
        Ok(())
    })
    .filter(filter_fn(|req, _resp| {
        if !req.headers().contains_key(AUTHORIZATION) {
            return Ok(Directive::builder()
                .status(StatusCode::UNAUTHORIZED)
                .body("missing credentials")
                .return_response());
        }
        Ok(Directive::process_response())
    }))
    .filter(filter_fn(|_req, _resp| {
        Ok(Directive::builder()
            .append_header(HeaderName::from_static("via"), HeaderValue::from_static("1.1 gw"))
            .pass())
    }))
    .filter(filter_fn(|req, _resp| {
        if req.uri().path() == "/boom" {
            return Err("origin unreachable".into());
        }
        Ok(Directive::not_set())
    }))
}

async fn start() -> (SocketAddr, oneshot::Sender<()>, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (stop, stopped) = oneshot::channel::<()>();

    let server = tokio::spawn(async move {
        Server::from_listener(listener)
            .serve_with_shutdown(gateway(), async {
                let _ = stopped.await;
            })
            .await
            .unwrap();
    });

    (addr, stop, server)
}

async fn roundtrip(addr: SocketAddr, raw: &str) -> String {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    stream.write_all(raw.as_bytes()).await.unwrap();
    let mut out = Vec::new();
    stream.read_to_end(&mut out).await.unwrap();
    String::from_utf8(out).unwrap()
}

#[tokio::test]
async fn authorised_request_reaches_origin() {
    let (addr, stop, server) = start().await;

    let reply = roundtrip(
        addr,
        "GET /orders HTTP/1.1\r\nhost: gw\r\nauthorization: Bearer t\r\nconnection: close\r\n\r\n",
    )
    .await;

    assert!(reply.starts_with("HTTP/1.1 200 OK"), "{reply}");
    assert!(reply.ends_with("hello /orders"), "{reply}");

    stop.send(()).unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn unauthorised_request_is_short_circuited() {
    let (addr, stop, server) = start().await;

    let reply = roundtrip(addr, "GET /orders HTTP/1.1\r\nhost: gw\r\nconnection: close\r\n\r\n").await;

    assert!(reply.starts_with("HTTP/1.1 401 Unauthorized"), "{reply}");
    assert!(reply.ends_with("missing credentials"), "{reply}");

    stop.send(()).unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn filter_failure_maps_to_500() {
    let (addr, stop, server) = start().await;

    let reply = roundtrip(
        addr,
        "GET /boom HTTP/1.1\r\nhost: gw\r\nauthorization: Bearer t\r\nconnection: close\r\n\r\n",
    )
    .await;

    assert!(reply.starts_with("HTTP/1.1 500 Internal Server Error"), "{reply}");

    stop.send(()).unwrap();
    server.await.unwrap();
}

#[tokio::test]
async fn malformed_exchange_maps_to_400() {
    let (addr, stop, server) = start().await;

    // HTTP/1.1 with no host header.
    let reply = roundtrip(addr, "GET /orders HTTP/1.1\r\nconnection: close\r\n\r\n").await;

    assert!(reply.starts_with("HTTP/1.1 400 Bad Request"), "{reply}");

    stop.send(()).unwrap();
    server.await.unwrap();
}
