//! Shared helpers for the integration tests: tiny raw-TCP HTTP servers that
//! stand in for the probe target and for the Slack webhook.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Mutex;

/// Serve a fixed HTTP status on an ephemeral port and return its address.
pub async fn start_http_backend(status: u16, body: &'static str) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((mut socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let mut buf = [0u8; 4096];
                let _ = socket.read(&mut buf).await;
                let reason = match status {
                    200 => "OK",
                    404 => "Not Found",
                    500 => "Internal Server Error",
                    503 => "Service Unavailable",
                    _ => "OK",
                };
                let response = format!(
                    "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len(),
                );
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            });
        }
    });

    addr
}

/// Accept connections but never answer, so every probe runs into its
/// deadline.
pub async fn start_stalled_backend() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        loop {
            let Ok((socket, _)) = listener.accept().await else {
                break;
            };
            tokio::spawn(async move {
                let _held_open = socket;
                tokio::time::sleep(Duration::from_secs(60)).await;
            });
        }
    });

    addr
}

/// Webhook stand-in that counts deliveries and keeps the last request body.
pub struct WebhookRecorder {
    pub addr: SocketAddr,
    hits: Arc<AtomicU32>,
    last_body: Arc<Mutex<Option<String>>>,
}

impl WebhookRecorder {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let hits = Arc::new(AtomicU32::new(0));
        let last_body = Arc::new(Mutex::new(None));

        let hits_in = hits.clone();
        let body_in = last_body.clone();
        tokio::spawn(async move {
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    break;
                };
                let hits = hits_in.clone();
                let body_slot = body_in.clone();
                tokio::spawn(async move {
                    let request = read_request(&mut socket).await;
                    if let Some((_, body)) = request.split_once("\r\n\r\n") {
                        *body_slot.lock().await = Some(body.to_string());
                    }
                    hits.fetch_add(1, Ordering::SeqCst);
                    let _ = socket
                        .write_all(
                            b"HTTP/1.1 200 OK\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok",
                        )
                        .await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        Self {
            addr,
            hits,
            last_body,
        }
    }

    pub fn url(&self) -> String {
        format!("http://{}/", self.addr)
    }

    pub fn hits(&self) -> u32 {
        self.hits.load(Ordering::SeqCst)
    }

    pub async fn last_body(&self) -> Option<String> {
        self.last_body.lock().await.clone()
    }
}

/// Read one HTTP request, stopping once the announced body length has
/// arrived (the client keeps the connection open while awaiting our reply).
async fn read_request(socket: &mut TcpStream) -> String {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 4096];
    loop {
        let Ok(n) = socket.read(&mut chunk).await else {
            break;
        };
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(request) = complete_request(&buf) {
            return request;
        }
    }
    String::from_utf8_lossy(&buf).into_owned()
}

fn complete_request(buf: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(buf).into_owned();
    let header_end = text.find("\r\n\r\n")? + 4;
    let content_length = text[..header_end]
        .lines()
        .find_map(|line| {
            let (name, value) = line.split_once(':')?;
            if name.eq_ignore_ascii_case("content-length") {
                value.trim().parse::<usize>().ok()
            } else {
                None
            }
        })
        .unwrap_or(0);
    (text.len() - header_end >= content_length).then_some(text)
}
