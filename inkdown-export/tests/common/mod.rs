//! Shared test helpers: PNG fixtures and a scripted HTTP stub server.

use once_cell::sync::Lazy;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

/// An 800x400 image, valid as far as the package writer inspects PNGs.
pub static SAMPLE_PNG: Lazy<Vec<u8>> = Lazy::new(|| png_with_dimensions(800, 400));

/// PNG signature plus an IHDR chunk carrying the given dimensions.
/// The CRC is left zeroed; nothing in the crate checks it.
pub fn png_with_dimensions(width: u32, height: u32) -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0d, 0x0a, 0x1a, 0x0a];
    bytes.extend_from_slice(&13u32.to_be_bytes());
    bytes.extend_from_slice(b"IHDR");
    bytes.extend_from_slice(&width.to_be_bytes());
    bytes.extend_from_slice(&height.to_be_bytes());
    bytes.extend_from_slice(&[8, 6, 0, 0, 0]);
    bytes.extend_from_slice(&[0, 0, 0, 0]);
    bytes
}

/// One canned response for [`scripted_server`].
pub struct ScriptedResponse {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
}

impl ScriptedResponse {
    pub fn json(body: &str) -> Self {
        Self {
            status: 200,
            content_type: "application/json",
            body: body.as_bytes().to_vec(),
        }
    }

    pub fn bytes(body: Vec<u8>) -> Self {
        Self {
            status: 200,
            content_type: "application/octet-stream",
            body,
        }
    }

    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_type: "text/plain",
            body: Vec::new(),
        }
    }
}

/// A request exactly as the stub server received it.
#[derive(Debug)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: Vec<u8>,
}

impl RecordedRequest {
    pub fn body_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is not JSON")
    }
}

/// Serves the given responses in order, one connection per request, and
/// records every request. Returns the base URL and the request log.
///
/// Every response carries `Connection: close`, so clients reconnect for
/// each request and the accept loop stays strictly sequential.
pub fn scripted_server(
    responses: Vec<ScriptedResponse>,
) -> (String, mpsc::Receiver<RecordedRequest>) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind stub server");
    let base = format!("http://{}", listener.local_addr().unwrap());
    let (tx, rx) = mpsc::channel();

    thread::spawn(move || {
        for response in responses {
            let Ok((mut stream, _)) = listener.accept() else {
                return;
            };
            let Some(request) = read_request(&mut stream) else {
                return;
            };
            if tx.send(request).is_err() {
                return;
            }
            let head = format!(
                "HTTP/1.1 {} Stub\r\nContent-Length: {}\r\nContent-Type: {}\r\nConnection: close\r\n\r\n",
                response.status,
                response.body.len(),
                response.content_type
            );
            let _ = stream.write_all(head.as_bytes());
            let _ = stream.write_all(&response.body);
            let _ = stream.flush();
        }
    });

    (base, rx)
}

/// Collects every request the server has recorded so far.
pub fn drain(requests: &mpsc::Receiver<RecordedRequest>) -> Vec<RecordedRequest> {
    let mut all = Vec::new();
    while let Ok(request) = requests.recv_timeout(Duration::from_millis(250)) {
        all.push(request);
    }
    all
}

fn read_request(stream: &mut TcpStream) -> Option<RecordedRequest> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buffer.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
    };

    let header = String::from_utf8_lossy(&buffer[..header_end]).into_owned();
    let mut request_line = header.lines().next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let path = request_line.next()?.to_string();

    let content_length = header
        .lines()
        .skip(1)
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buffer[header_end + 4..].to_vec();
    while body.len() < content_length {
        let n = stream.read(&mut chunk).ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..n]);
    }
    body.truncate(content_length);

    Some(RecordedRequest { method, path, body })
}
