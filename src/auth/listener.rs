use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::error::{Error, Result};

pub const DEFAULT_CALLBACK_PORT: u16 = 42111;
pub const CALLBACK_PATH: &str = "/callback";

const CONFIRMATION_BODY: &str =
    "The application is now authenticated. You may close this page.";

/// A one-shot local endpoint that captures the provider's browser redirect.
///
/// Bound on demand for a single authorization attempt and never reused. The
/// first request hitting the callback path has its raw request target pushed
/// onto the returned channel; at most one value is ever delivered. Timeouts
/// are the dispatcher's job: dropping the listener (or aborting its task)
/// releases the port so a later attempt can bind it again.
pub struct CallbackListener {
    listener: TcpListener,
    port: u16,
}

impl CallbackListener {
    /// Binds the local callback port. Port 0 lets the OS pick one.
    pub async fn bind(port: u16) -> Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", port))
            .await
            .map_err(Error::Listener)?;
        let port = listener.local_addr().map_err(Error::Listener)?.port();
        debug!(port, "callback listener bound");

        Ok(Self { listener, port })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// The redirect URI the provider should send the user agent back to.
    pub fn redirect_uri(&self) -> String {
        format!("http://localhost:{}{}", self.port, CALLBACK_PATH)
    }

    /// Starts accepting connections on a dedicated task.
    ///
    /// Non-callback requests (favicon probes and the like) get a 404 and the
    /// task keeps waiting. Once a callback is forwarded the task exits and
    /// the port is released.
    pub fn spawn(self) -> (oneshot::Receiver<String>, JoinHandle<()>) {
        let (tx, rx) = oneshot::channel();

        let handle = tokio::spawn(async move {
            loop {
                let (stream, _) = match self.listener.accept().await {
                    Ok(conn) => conn,
                    Err(err) => {
                        warn!(%err, "callback listener accept failed");
                        return;
                    }
                };

                match serve_connection(stream).await {
                    Ok(Some(target)) => {
                        // receiver may already have given up; nothing to do then
                        let _ = tx.send(target);
                        return;
                    }
                    Ok(None) => continue,
                    Err(err) => {
                        debug!(%err, "callback connection error");
                        continue;
                    }
                }
            }
        });

        (rx, handle)
    }
}

/// Reads one request; returns its target if it hit the callback path.
async fn serve_connection(mut stream: TcpStream) -> std::io::Result<Option<String>> {
    let mut reader = BufReader::new(&mut stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line).await?;

    // request line: "GET /callback?... HTTP/1.1"
    let target = request_line
        .split_whitespace()
        .nth(1)
        .unwrap_or_default()
        .to_string();

    if !target.starts_with(CALLBACK_PATH) {
        respond(&mut stream, "404 Not Found", "").await?;
        return Ok(None);
    }

    respond(&mut stream, "200 OK", CONFIRMATION_BODY).await?;
    Ok(Some(target))
}

async fn respond(stream: &mut TcpStream, status: &str, body: &str) -> std::io::Result<()> {
    let response = format!(
        "HTTP/1.1 {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        body.len(),
        body
    );
    stream.write_all(response.as_bytes()).await?;
    stream.flush().await
}

#[cfg(test)]
mod tests {
    use tokio::io::AsyncReadExt;

    use super::*;

    async fn send_request(port: u16, target: &str) -> String {
        let mut stream = TcpStream::connect(("127.0.0.1", port)).await.unwrap();
        let request = format!("GET {} HTTP/1.1\r\nHost: localhost\r\n\r\n", target);
        stream.write_all(request.as_bytes()).await.unwrap();

        let mut response = String::new();
        stream.read_to_string(&mut response).await.unwrap();
        response
    }

    #[tokio::test]
    async fn forwards_first_callback_target_and_confirms() {
        let listener = CallbackListener::bind(0).await.unwrap();
        let port = listener.port();
        let (rx, handle) = listener.spawn();

        let response = send_request(port, "/callback#access_token=abc&id=123").await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains(CONFIRMATION_BODY));

        let target = rx.await.unwrap();
        assert_eq!(target, "/callback#access_token=abc&id=123");

        handle.await.unwrap();
    }

    #[tokio::test]
    async fn ignores_requests_outside_the_callback_path() {
        let listener = CallbackListener::bind(0).await.unwrap();
        let port = listener.port();
        let (rx, handle) = listener.spawn();

        let response = send_request(port, "/favicon.ico").await;
        assert!(response.starts_with("HTTP/1.1 404"));

        // still waiting for the real callback
        let response = send_request(port, "/callback?access_token=tok").await;
        assert!(response.starts_with("HTTP/1.1 200"));
        assert_eq!(rx.await.unwrap(), "/callback?access_token=tok");

        handle.await.unwrap();
    }

    #[tokio::test]
    async fn aborting_the_task_releases_the_port() {
        let listener = CallbackListener::bind(0).await.unwrap();
        let port = listener.port();
        let (_rx, handle) = listener.spawn();

        handle.abort();
        let _ = handle.await;

        // the same port must be bindable for the next attempt
        CallbackListener::bind(port).await.unwrap();
    }
}
