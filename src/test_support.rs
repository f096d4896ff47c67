//! One-shot HTTP server for exercising the reqwest clients in tests.
//!
//! The server accepts a single connection, reads one request (headers plus
//! `content-length` body), answers with the canned response and hands the
//! recorded request back through a oneshot channel.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::oneshot;

/// What the client actually sent.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    /// e.g. `POST /v1/messages HTTP/1.1`
    pub request_line: String,
    /// Header names lower-cased.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n == &name.to_ascii_lowercase())
            .map(|(_, v)| v.as_str())
    }
}

pub struct CannedServer {
    /// `http://127.0.0.1:<port>`
    pub base_url: String,
    request: oneshot::Receiver<RecordedRequest>,
}

impl CannedServer {
    /// Wait for the request the server received.
    pub async fn request(self) -> RecordedRequest {
        self.request.await.expect("server task dropped the request")
    }
}

/// Serve exactly one response with `status` and a JSON `body`.
pub async fn serve_once(status: u16, body: &str) -> CannedServer {
    serve_once_with(status, "application/json", body.as_bytes().to_vec()).await
}

/// Serve exactly one response with raw body bytes.
pub async fn serve_once_with(status: u16, content_type: &str, body: Vec<u8>) -> CannedServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    let (tx, rx) = oneshot::channel();

    let mut response = format!(
        "HTTP/1.1 {status} {}\r\ncontent-type: {content_type}\r\ncontent-length: {}\r\nconnection: close\r\n\r\n",
        reason(status),
        body.len()
    )
    .into_bytes();
    response.extend_from_slice(&body);

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.expect("accept");
        let recorded = read_request(&mut socket).await;
        socket.write_all(&response).await.expect("write response");
        let _ = socket.shutdown().await;
        let _ = tx.send(recorded);
    });

    CannedServer {
        base_url: format!("http://{addr}"),
        request: rx,
    }
}

/// A base URL nothing is listening on.
pub async fn unreachable_base_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);
    format!("http://{addr}")
}

async fn read_request(socket: &mut tokio::net::TcpStream) -> RecordedRequest {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];

    let header_end = loop {
        let n = socket.read(&mut chunk).await.expect("read");
        if n == 0 {
            break buf.len();
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };

    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let mut lines = head.split("\r\n").filter(|l| !l.is_empty());
    let request_line = lines.next().unwrap_or_default().to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|l| l.split_once(':'))
        .map(|(n, v)| (n.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(n, _)| n == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    while buf.len() < header_end + content_length {
        let n = socket.read(&mut chunk).await.expect("read body");
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }

    let body_end = (header_end + content_length).min(buf.len());
    let body = String::from_utf8_lossy(&buf[header_end..body_end]).to_string();

    RecordedRequest {
        request_line,
        headers,
        body,
    }
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Status",
    }
}
