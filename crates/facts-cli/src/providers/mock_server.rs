use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

#[derive(Debug)]
pub(crate) struct MockResponse {
    status: u16,
    reason: &'static str,
    body: String,
}

impl MockResponse {
    pub(crate) fn json(status: u16, reason: &'static str, body: &str) -> Self {
        Self {
            status,
            reason,
            body: body.to_string(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub(crate) struct CapturedRequest {
    pub(crate) target: String,
    pub(crate) headers: Vec<(String, String)>,
    pub(crate) body: String,
}

impl CapturedRequest {
    pub(crate) fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Serves `responses` in order, one connection each, and records what the
/// client sent.
pub(crate) struct MockServer {
    pub(crate) base_url: String,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    handle: thread::JoinHandle<()>,
}

impl MockServer {
    pub(crate) fn spawn(responses: Vec<MockResponse>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        listener.set_nonblocking(true).expect("nonblocking");
        let base_url = format!("http://{}", listener.local_addr().expect("addr"));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let captured_requests = Arc::clone(&requests);

        let handle = thread::spawn(move || {
            for response in responses {
                let start = Instant::now();
                let mut stream = loop {
                    match listener.accept() {
                        Ok((stream, _)) => break stream,
                        Err(error) if error.kind() == std::io::ErrorKind::WouldBlock => {
                            if start.elapsed() > Duration::from_secs(3) {
                                panic!("mock server timed out waiting for request");
                            }
                            thread::sleep(Duration::from_millis(10));
                        }
                        Err(error) => panic!("mock server accept failed: {error}"),
                    }
                };
                stream.set_nonblocking(false).expect("blocking stream");

                let cloned = stream.try_clone().expect("clone stream");
                let mut reader = BufReader::new(cloned);
                let mut request = CapturedRequest::default();

                loop {
                    let mut line = String::new();
                    let bytes = reader.read_line(&mut line).expect("read line");
                    if bytes == 0 || line == "\r\n" {
                        break;
                    }
                    let line = line.trim_end_matches(['\r', '\n']);
                    if request.target.is_empty() {
                        request.target = line.split(' ').nth(1).unwrap_or_default().to_string();
                    } else if let Some((key, value)) = line.split_once(':') {
                        request
                            .headers
                            .push((key.trim().to_string(), value.trim().to_string()));
                    }
                }
                let content_length = request
                    .header("content-length")
                    .and_then(|value| value.parse::<usize>().ok())
                    .unwrap_or_default();
                let mut body = vec![0; content_length];
                reader.read_exact(&mut body).expect("read body");
                request.body = String::from_utf8_lossy(&body).into_owned();
                captured_requests.lock().expect("requests lock").push(request);

                let response_head = format!(
                    "HTTP/1.1 {} {}\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n",
                    response.status,
                    response.reason,
                    response.body.len()
                );

                stream
                    .write_all(response_head.as_bytes())
                    .and_then(|_| stream.write_all(response.body.as_bytes()))
                    .expect("write response");
            }
        });

        Self {
            base_url,
            requests,
            handle,
        }
    }

    pub(crate) fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().expect("requests lock").clone()
    }

    pub(crate) fn join(self) {
        self.handle.join().expect("mock server thread");
    }
}

/// Accepts TCP connections at the kernel level but never answers them.
pub(crate) struct SilentServer {
    pub(crate) base_url: String,
    _listener: TcpListener,
}

impl SilentServer {
    pub(crate) fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let base_url = format!("http://{}", listener.local_addr().expect("addr"));
        Self {
            base_url,
            _listener: listener,
        }
    }
}
