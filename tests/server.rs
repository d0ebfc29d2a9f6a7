mod common;

use std::convert::Infallible;
use std::net::SocketAddr;

use hyper::body::Incoming;
use hyper::service::service_fn;
use reqlog::{Logger, Options, RequestLog, Server};
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use common::{Capture, Chunks};

/// `/chunked` streams without a length; everything else declares one.
async fn pong(req: http::Request<Incoming>) -> Result<http::Response<Chunks>, Infallible> {
    let res = match req.uri().path() {
        "/chunked" => http::Response::new(Chunks::new(["po", "ng"])),
        "/sized" => http::Response::builder()
            .header("content-length", "4")
            .body(Chunks::new(["po", "ng"]))
            .unwrap(),
        _ => http::Response::builder()
            .header("content-length", "4")
            .body(Chunks::new(["pong"]))
            .unwrap(),
    };
    Ok(res)
}

/// Spawns a logged server on an ephemeral port.
async fn start(options: Options, capture: &Capture) -> (SocketAddr, tokio::task::JoinHandle<()>) {
    let log = RequestLog::with_options(options, Logger::new(capture.clone())).unwrap();
    let app = log.layer(service_fn(pong));

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        Server::from_listener(listener).serve(app).await.unwrap();
    });
    (addr, handle)
}

/// Sends one HTTP/1.1 request and reads until the server closes.
async fn roundtrip(addr: SocketAddr, target: &str, extra_headers: &str) -> (String, SocketAddr) {
    let mut stream = TcpStream::connect(addr).await.unwrap();
    let local = stream.local_addr().unwrap();
    let request = format!(
        "GET {target} HTTP/1.1\r\nhost: localhost\r\n{extra_headers}connection: close\r\n\r\n"
    );
    stream.write_all(request.as_bytes()).await.unwrap();

    let mut raw = String::new();
    stream.read_to_string(&mut raw).await.unwrap();
    (raw, local)
}

#[tokio::test]
async fn inbound_id_is_echoed_and_peer_is_logged() {
    let capture = Capture::default();
    let (addr, server) = start(Options::default(), &capture).await;

    let (raw, local) = roundtrip(addr, "/ping?check=1", "x-request-id: abc-123\r\n").await;
    server.abort();

    assert!(raw.starts_with("HTTP/1.1 200 OK"), "{raw}");
    assert!(raw.contains("x-request-id: abc-123"), "{raw}");
    assert!(raw.ends_with("pong"), "{raw}");

    let record = capture.record("request finish");
    assert_eq!(record["req_id"], json!("abc-123"));
    assert_eq!(record["req"]["url"], json!("/ping?check=1"));
    assert_eq!(record["req"]["remoteAddress"], json!("127.0.0.1"));
    assert_eq!(record["req"]["remotePort"], json!(local.port()));
    assert_eq!(capture.count("request socket closed"), 0);
}

#[tokio::test]
async fn generated_id_reaches_the_client() {
    let capture = Capture::default();
    let (addr, server) = start(Options::default().request_start(true), &capture).await;

    let (raw, _) = roundtrip(addr, "/ping", "").await;
    server.abort();

    let id = raw.lines()
        .find_map(|line| line.strip_prefix("x-request-id: "))
        .unwrap()
        .trim()
        .to_owned();
    assert!(uuid::Uuid::parse_str(&id).is_ok());
    assert_eq!(capture.messages(), ["request start", "request finish"]);
    assert_eq!(capture.record("request start")["req_id"], json!(id));
    assert_eq!(capture.record("request finish")["req_id"], json!(id));
}

#[tokio::test]
async fn streamed_body_with_content_length_finishes() {
    let capture = Capture::default();
    let (addr, server) = start(Options::default(), &capture).await;

    let (raw, _) = roundtrip(addr, "/sized", "").await;
    server.abort();

    assert!(raw.contains("content-length: 4"), "{raw}");
    assert!(raw.ends_with("pong"), "{raw}");
    assert_eq!(capture.messages(), ["request finish"]);
    assert_eq!(capture.record("request finish")["res"]["statusCode"], json!(200));
}

#[tokio::test]
async fn chunked_body_finishes() {
    let capture = Capture::default();
    let (addr, server) = start(Options::default(), &capture).await;

    let (raw, _) = roundtrip(addr, "/chunked", "").await;
    server.abort();

    assert!(raw.contains("transfer-encoding: chunked"), "{raw}");
    assert!(raw.ends_with("0\r\n\r\n"), "{raw}");
    assert_eq!(capture.count("request finish"), 1);
    assert_eq!(capture.count("request socket closed"), 0);
}
