//! Loopback HTTP stub for stage tests.

use std::collections::HashMap;
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

pub struct StubServer {
    pub base_url: String,
    shutdown: mpsc::Sender<()>,
    handle: Option<thread::JoinHandle<()>>,
}

impl StubServer {
    /// Serve fixed `(status, body)` responses keyed by request path; anything else is a 404.
    pub fn start(routes: Vec<(&str, u16, String)>) -> Self {
        let server = tiny_http::Server::http("127.0.0.1:0").expect("start tiny_http server");
        let base_url = format!("http://{}", server.server_addr());
        let routes: HashMap<String, (u16, String)> = routes
            .into_iter()
            .map(|(path, status, body)| (path.to_string(), (status, body)))
            .collect();

        let (shutdown, shutdown_rx) = mpsc::channel::<()>();
        let handle = thread::spawn(move || loop {
            if shutdown_rx.try_recv().is_ok() {
                break;
            }
            let request = match server.recv_timeout(Duration::from_millis(50)) {
                Ok(Some(req)) => req,
                Ok(None) => continue,
                Err(_) => break,
            };
            let (status, body) = routes
                .get(request.url())
                .cloned()
                .unwrap_or_else(|| (404, r#"{"status":404,"message":"Not Found"}"#.to_string()));
            let response = tiny_http::Response::from_string(body).with_status_code(status);
            let _ = request.respond(response);
        });

        StubServer {
            base_url,
            shutdown,
            handle: Some(handle),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }
}

impl Drop for StubServer {
    fn drop(&mut self) {
        let _ = self.shutdown.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

/// Bypasses any proxy from the environment so loopback requests stay local.
pub fn test_client() -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder().no_proxy().build().unwrap()
}

pub fn fixture(name: &str) -> String {
    std::fs::read_to_string(format!("tests/fixtures/{}", name)).unwrap()
}
