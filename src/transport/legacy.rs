//! Legacy request-object delivery.
//!
//! Requests are described with an open / set header / register callback /
//! send sequence. A dispatcher thread owns the blocking HTTP client and runs
//! every submitted request on its own thread, so a slow response never holds
//! back the next one. The completion callback fires once, when the request
//! reaches [`ReadyState::Done`].

use super::{acknowledge, Acknowledgement, TransportError, REQUEST_TIMEOUT};
use crossbeam_channel::{unbounded, Receiver, Sender};
use reqwest::Method;
use std::thread;

/// Lifecycle of a legacy request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    Unsent,
    Opened,
    Loading,
    Done,
}

/// Final outcome of a legacy request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    /// HTTP status, 0 when no response arrived
    pub status: u16,
    pub response_text: String,
    pub error: Option<String>,
}

impl Completion {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            status: 0,
            response_text: String::new(),
            error: Some(error.into()),
        }
    }

    /// Apply the delivery success rule to this completion.
    pub fn into_result(self) -> Result<Acknowledgement, TransportError> {
        match self.error {
            Some(error) => Err(TransportError::Network(error)),
            None => acknowledge(self.status, self.response_text.as_bytes()),
        }
    }
}

type CompletionCallback = Box<dyn FnOnce(Completion) + Send + 'static>;

/// A single request built in request-object style.
pub struct LegacyRequest {
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    state: ReadyState,
    callback: Option<CompletionCallback>,
}

impl LegacyRequest {
    /// Open a request for `method` and `url`.
    pub fn open(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            state: ReadyState::Opened,
            callback: None,
        }
    }

    pub fn set_request_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.push((name.into(), value.into()));
    }

    /// Register the callback invoked once the request is done.
    pub fn on_ready_state_change<F>(&mut self, callback: F)
    where
        F: FnOnce(Completion) + Send + 'static,
    {
        self.callback = Some(Box::new(callback));
    }

    pub fn ready_state(&self) -> ReadyState {
        self.state
    }

    fn execute(mut self, client: &reqwest::blocking::Client, body: String) {
        self.state = ReadyState::Loading;

        let mut builder = client.request(self.method.clone(), &self.url);
        for (name, value) in &self.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }

        let completion = match builder.body(body).send() {
            Ok(response) => {
                let status = response.status().as_u16();
                match response.text() {
                    Ok(text) => Completion {
                        status,
                        response_text: text,
                        error: None,
                    },
                    Err(e) => Completion::failed(e.to_string()),
                }
            }
            Err(e) => Completion::failed(e.to_string()),
        };

        self.finish(completion);
    }

    fn finish(mut self, completion: Completion) {
        self.state = ReadyState::Done;
        if let Some(callback) = self.callback.take() {
            callback(completion);
        }
    }
}

struct Job {
    request: LegacyRequest,
    body: String,
}

/// Delivery through the request-object worker.
pub struct LegacyTransport {
    jobs: Sender<Job>,
}

impl Default for LegacyTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl LegacyTransport {
    /// Spawn the dispatcher thread.
    ///
    /// The dispatcher exits once the transport is dropped; requests already
    /// running finish on their own threads.
    pub fn new() -> Self {
        let (jobs, receiver) = unbounded();
        thread::spawn(move || run_worker(receiver));
        Self { jobs }
    }

    /// Hand an opened request and its body to the dispatcher.
    pub fn submit(&self, request: LegacyRequest, body: String) -> Result<(), TransportError> {
        self.jobs
            .send(Job { request, body })
            .map_err(|_| TransportError::WorkerGone)
    }

    /// POST the payload as JSON and wait for the completion callback.
    pub async fn send(
        &self,
        url: &str,
        payload: &serde_json::Value,
    ) -> Result<Acknowledgement, TransportError> {
        let body = serde_json::to_string(payload)
            .map_err(|e| TransportError::Serialization(e.to_string()))?;

        let (done_tx, done_rx) = tokio::sync::oneshot::channel();
        let mut request = LegacyRequest::open(Method::POST, url);
        request.set_request_header("Content-Type", "application/json");
        request.on_ready_state_change(move |completion| {
            let _ = done_tx.send(completion);
        });

        self.submit(request, body)?;

        let completion = done_rx.await.map_err(|_| TransportError::WorkerGone)?;
        completion.into_result()
    }
}

fn run_worker(jobs: Receiver<Job>) {
    // Built and dropped off the async runtime; clones share one pool.
    let client = reqwest::blocking::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build();

    for job in jobs.iter() {
        match &client {
            Ok(client) => {
                let client = client.clone();
                let spawned = thread::Builder::new()
                    .name("legacy-request".to_string())
                    .spawn(move || job.request.execute(&client, job.body));
                if let Err(e) = spawned {
                    tracing::warn!(error = %e, "Failed to spawn legacy request thread");
                }
            }
            Err(e) => job
                .request
                .finish(Completion::failed(format!("client setup failed: {e}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn closed_port_url() -> String {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);
        format!("http://127.0.0.1:{port}/collect")
    }

    #[test]
    fn test_request_object_lifecycle() {
        let mut request = LegacyRequest::open(Method::POST, "http://x/collect");
        assert_eq!(request.ready_state(), ReadyState::Opened);
        request.set_request_header("Content-Type", "application/json");
        assert_eq!(request.headers.len(), 1);
    }

    #[test]
    fn test_callback_fires_on_network_failure() {
        let transport = LegacyTransport::new();
        let (tx, rx) = crossbeam_channel::bounded(1);

        let mut request = LegacyRequest::open(Method::POST, closed_port_url());
        request.on_ready_state_change(move |completion| {
            let _ = tx.send(completion);
        });
        transport.submit(request, "{}".to_string()).unwrap();

        let completion = rx.recv_timeout(Duration::from_secs(15)).unwrap();
        assert_eq!(completion.status, 0);
        assert!(completion.error.is_some());
        assert!(matches!(
            completion.into_result(),
            Err(TransportError::Network(_))
        ));
    }

    #[test]
    fn test_completion_status_rules() {
        let ok = Completion {
            status: 200,
            response_text: r#"{"status":"success"}"#.into(),
            error: None,
        };
        assert!(ok.into_result().is_ok());

        let rejected = Completion {
            status: 404,
            response_text: String::new(),
            error: None,
        };
        assert!(matches!(
            rejected.into_result(),
            Err(TransportError::Status(404))
        ));
    }

    #[test]
    fn test_slow_request_does_not_hold_back_next() {
        use std::io::{Read, Write};
        use std::time::Instant;

        // Accepts two connections: the first answers after a delay, the
        // second immediately.
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/collect", listener.local_addr().unwrap());
        let (arrival_tx, arrival_rx) = crossbeam_channel::unbounded();
        thread::spawn(move || {
            for (index, stream) in listener.incoming().take(2).enumerate() {
                let mut stream = stream.unwrap();
                arrival_tx.send(Instant::now()).unwrap();
                thread::spawn(move || {
                    let mut buf = [0u8; 4096];
                    let mut request = Vec::new();
                    while !request.ends_with(b"{}") {
                        match stream.read(&mut buf) {
                            Ok(0) | Err(_) => break,
                            Ok(n) => request.extend_from_slice(&buf[..n]),
                        }
                    }
                    if index == 0 {
                        thread::sleep(Duration::from_secs(2));
                    }
                    let body = r#"{"status":"success"}"#;
                    let _ = write!(
                        stream,
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                });
            }
        });

        let transport = LegacyTransport::new();
        let (done_tx, done_rx) = crossbeam_channel::unbounded();
        for _ in 0..2 {
            let done_tx = done_tx.clone();
            let mut request = LegacyRequest::open(Method::POST, url.clone());
            request.on_ready_state_change(move |completion| {
                let _ = done_tx.send(completion);
            });
            transport.submit(request, "{}".to_string()).unwrap();
            thread::sleep(Duration::from_millis(100));
        }

        let first = arrival_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        let second = arrival_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert!(second.duration_since(first) < Duration::from_secs(1));

        // the fast response completes while the slow one is still pending
        let completion = done_rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(completion.status, 200);
        let completion = done_rx.recv_timeout(Duration::from_secs(5)).unwrap();
        assert_eq!(completion.status, 200);
    }

    #[tokio::test]
    async fn test_async_send_reports_network_error() {
        let transport = LegacyTransport::new();
        let result = transport
            .send(&closed_port_url(), &serde_json::json!({"a": 1}))
            .await;
        assert!(matches!(result, Err(TransportError::Network(_))));
    }
}
