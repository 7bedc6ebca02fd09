//! Shared helpers for adapter and pipeline integration tests.
//!
//! External APIs are replaced by an in-process axum server bound to an
//! ephemeral port. Handlers record what they receive so tests can assert on
//! the exact requests an adapter sends.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::http::HeaderMap;

/// A request captured by a stub handler.
#[derive(Debug, Clone)]
pub struct Recorded {
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

impl Recorded {
    pub fn new(path: &str, query: HashMap<String, String>, headers: &HeaderMap, body: &[u8]) -> Self {
        let headers = headers
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        Self {
            path: path.to_string(),
            query,
            headers,
            body: body.to_vec(),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(|s| s.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).expect("request body is JSON")
    }
}

/// Shared request log.
#[derive(Debug, Clone, Default)]
pub struct Recorder {
    inner: Arc<Mutex<Vec<Recorded>>>,
}

impl Recorder {
    pub fn push(&self, recorded: Recorded) {
        self.inner.lock().unwrap().push(recorded);
    }

    pub fn all(&self) -> Vec<Recorded> {
        self.inner.lock().unwrap().clone()
    }

    pub fn with_path_prefix(&self, prefix: &str) -> Vec<Recorded> {
        self.all().into_iter().filter(|r| r.path.starts_with(prefix)).collect()
    }
}

/// Serve `app` on 127.0.0.1 and return its base URL.
pub async fn serve(app: axum::Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

/// A base URL nothing is listening on.
pub async fn unreachable_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

/// Bytes that look like the start of a PNG file.
pub fn png_bytes() -> Vec<u8> {
    let mut bytes = vec![0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
    bytes.extend((0u8..=255).cycle().take(4096));
    bytes
}

pub fn client() -> reqwest::Client {
    scripted_core::tools::http_client(std::time::Duration::from_secs(10), false).unwrap()
}
