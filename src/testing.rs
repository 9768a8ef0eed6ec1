//! Loopback servers for tests: answering, delayed, stalled, silent and
//! closed ports.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[derive(Debug, Clone)]
pub struct Reply {
    pub status: u16,
    pub content_type: String,
    pub body: String,
    pub delay: Duration,
    /// Send the head, then hold the connection without sending the body.
    pub stall_body: bool,
}

/// Request heads received by a recording server, in arrival order.
pub type RequestLog = Arc<Mutex<Vec<String>>>;

impl Reply {
    pub fn json(status: u16, body: &str) -> Self {
        Self::text(status, "application/json", body)
    }

    pub fn text(status: u16, content_type: &str, body: &str) -> Self {
        Self {
            status,
            content_type: content_type.to_string(),
            body: body.to_string(),
            delay: Duration::ZERO,
            stall_body: false,
        }
    }

    pub fn after(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn stalled(mut self) -> Self {
        self.stall_body = true;
        self
    }
}

/// Serve `reply` to every connection until the test runtime shuts down.
pub async fn serve(reply: Reply) -> SocketAddr {
    serve_recorded(reply).await.0
}

/// Like [`serve`], also keeping the head of every request received.
pub async fn serve_recorded(reply: Reply) -> (SocketAddr, RequestLog) {
    let log = RequestLog::default();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let received = log.clone();

    tokio::spawn(async move {
        loop {
            let Ok((mut stream, _)) = listener.accept().await else {
                return;
            };
            let reply = reply.clone();
            let received = received.clone();
            tokio::spawn(async move {
                let mut buf = vec![0u8; 4096];
                let mut read = 0;
                while !buf[..read].windows(4).any(|w| w == b"\r\n\r\n") {
                    match stream.read(&mut buf[read..]).await {
                        Ok(0) | Err(_) => return,
                        Ok(n) => read += n,
                    }
                    if read == buf.len() {
                        break;
                    }
                }
                let head = String::from_utf8_lossy(&buf[..read]).into_owned();
                received.lock().unwrap().push(head);

                tokio::time::sleep(reply.delay).await;
                let head = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\n\
                     Connection: close\r\n\r\n",
                    reply.status,
                    reason(reply.status),
                    reply.content_type,
                    reply.body.len(),
                );
                if stream.write_all(head.as_bytes()).await.is_err() {
                    return;
                }
                if reply.stall_body {
                    // Hold the connection open until the client gives up.
                    let mut rest = [0u8; 64];
                    while let Ok(n) = stream.read(&mut rest).await {
                        if n == 0 {
                            break;
                        }
                    }
                    return;
                }
                let _ = stream.write_all(reply.body.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
        }
    });

    (addr, log)
}

/// Accept connections and never answer them.
pub async fn serve_silently() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            held.push(stream);
        }
    });

    addr
}

/// An address with no listener behind it.
pub async fn closed_port() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        204 => "No Content",
        404 => "Not Found",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}
