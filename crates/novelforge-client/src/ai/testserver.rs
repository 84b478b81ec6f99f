//! Scripted HTTP server for stream tests
//!
//! Plays one canned response per connection over a raw socket, with explicit
//! flushes and stalls, so tests control byte boundaries and timing exactly.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use parking_lot::Mutex;

use crate::config::ApiConfig;

enum Step {
    Send(&'static [u8]),
    Wait(Duration),
}

/// A canned response for a single connection.
pub struct Script {
    status: u16,
    content_type: &'static str,
    steps: Vec<Step>,
}

impl Script {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            content_type: "text/event-stream",
            steps: Vec::new(),
        }
    }

    /// Write these bytes and flush before the next step.
    pub fn send(mut self, bytes: &'static [u8]) -> Self {
        self.steps.push(Step::Send(bytes));
        self
    }

    /// Hold the connection open for `pause` before the next step.
    pub fn wait(mut self, pause: Duration) -> Self {
        self.steps.push(Step::Wait(pause));
        self
    }

    /// 200 event-stream response with the whole body in one write.
    pub fn stream(body: &'static [u8]) -> Self {
        Self::new(200).send(body)
    }

    /// Bare status response with no body.
    pub fn status(status: u16) -> Self {
        Self::new(status)
    }

    /// JSON response.
    pub fn json(status: u16, body: &'static str) -> Self {
        let mut script = Self::new(status).send(body.as_bytes());
        script.content_type = "application/json";
        script
    }
}

/// Server playing scripts in connection order, one thread per connection.
pub struct TestServer {
    base_url: String,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    pub fn spawn(scripts: Vec<Script>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind test listener");
        let addr = listener.local_addr().expect("listener address");
        let requests: Arc<Mutex<Vec<String>>> = Arc::default();

        let recorded = Arc::clone(&requests);
        thread::spawn(move || {
            for script in scripts {
                let Ok((stream, _)) = listener.accept() else {
                    return;
                };
                let recorded = Arc::clone(&recorded);
                thread::spawn(move || serve(stream, script, &recorded));
            }
        });

        Self {
            base_url: format!("http://{addr}/api/v1"),
            requests,
        }
    }

    /// Config pointing at this server.
    pub fn config(&self) -> ApiConfig {
        ApiConfig::new(&self.base_url).expect("test base URL")
    }

    /// Absolute URL for an endpoint path.
    pub fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Request heads received so far, in arrival order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

fn serve(mut stream: TcpStream, script: Script, requests: &Mutex<Vec<String>>) {
    if let Some(request) = read_request(&mut stream) {
        requests.lock().push(request);
    }

    let reason = match script.status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    };
    let head = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nConnection: close\r\n\r\n",
        script.status, reason, script.content_type
    );
    if stream.write_all(head.as_bytes()).is_err() {
        return;
    }
    let _ = stream.flush();

    for step in script.steps {
        match step {
            Step::Send(bytes) => {
                // The peer may have hung up (cancellation tests)
                if stream.write_all(bytes).is_err() {
                    return;
                }
                let _ = stream.flush();
            }
            Step::Wait(pause) => thread::sleep(pause),
        }
    }
    // Dropping the stream closes the connection: natural end of stream
}

/// Read one request (head plus declared body) off the socket, returning the
/// head for assertions.
fn read_request(stream: &mut TcpStream) -> Option<String> {
    let mut buffer = Vec::new();
    let mut chunk = [0u8; 1024];
    loop {
        let read = stream.read(&mut chunk).ok()?;
        if read == 0 {
            return None;
        }
        buffer.extend_from_slice(&chunk[..read]);

        let Some(head_end) = find(&buffer, b"\r\n\r\n") else {
            continue;
        };
        let head = String::from_utf8_lossy(&buffer[..head_end]).to_string();
        let content_length = head
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())?
            })
            .unwrap_or(0);
        if buffer.len() >= head_end + 4 + content_length {
            return Some(head);
        }
    }
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
