//! Shared test utilities for the iiif-static test suite.
//!
//! Provides in-memory stand-ins for the two network collaborators
//! ([`MockCatalog`], [`MockImageService`]) plus record and directory fixtures.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let images = MockImageService::with_dimensions(&[("a.jpg", 800, 600)]);
//! let manifest = build_manifest(&record(json!({"id": 1, "image": "a.jpg"})), &config(), &images);
//! assert_eq!(images.requested(), vec!["a.jpg"]);
//! ```

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::path::Path;
use std::sync::Mutex;
use std::thread::{self, JoinHandle};

use serde_json::Value;

use crate::catalog::{CatalogError, CatalogRecord, CatalogSource};
use crate::config::PipelineConfig;
use crate::image_service::{DimensionSource, Dimensions, ImageServiceError};

// =========================================================================
// Mock collaborators
// =========================================================================

/// Catalog that returns a fixed list of records, or fails like an
/// unreachable CMS.
pub struct MockCatalog {
    records: Vec<CatalogRecord>,
    fail: bool,
}

impl MockCatalog {
    pub fn with_records(records: Vec<CatalogRecord>) -> Self {
        Self {
            records,
            fail: false,
        }
    }

    pub fn failing() -> Self {
        Self {
            records: Vec::new(),
            fail: true,
        }
    }
}

impl CatalogSource for MockCatalog {
    fn fetch_records(&self) -> Result<Vec<CatalogRecord>, CatalogError> {
        if self.fail {
            return Err(CatalogError::Status {
                status: 500,
                url: "https://cms.example.org/items/iiif_images".to_string(),
                body: "boom".to_string(),
            });
        }
        Ok(self.records.clone())
    }
}

/// Image service answering from a map; unknown identifiers fail the way a
/// 404 from the image server would. Records every identifier requested.
#[derive(Default)]
pub struct MockImageService {
    known: HashMap<String, Dimensions>,
    requests: Mutex<Vec<String>>,
}

impl MockImageService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dimensions(entries: &[(&str, u32, u32)]) -> Self {
        Self {
            known: entries
                .iter()
                .map(|(id, width, height)| {
                    (
                        id.to_string(),
                        Dimensions {
                            width: *width,
                            height: *height,
                        },
                    )
                })
                .collect(),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn requested(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }
}

impl DimensionSource for MockImageService {
    fn dimensions(&self, identifier: &str) -> Result<Dimensions, ImageServiceError> {
        self.requests.lock().unwrap().push(identifier.to_string());
        self.known
            .get(identifier)
            .copied()
            .ok_or_else(|| ImageServiceError::Status {
                status: 404,
                url: format!("https://images.example.org/iiif/3/{identifier}/info.json"),
            })
    }
}

// =========================================================================
// Local HTTP server
// =========================================================================

/// Serve `responses` as `(status line, JSON body)` to consecutive
/// connections on a loopback port, one response per connection.
///
/// Returns the base URL and a handle that yields the raw requests received.
pub fn serve_json(responses: Vec<(&'static str, String)>) -> (String, JoinHandle<Vec<String>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());
    let handle = thread::spawn(move || {
        let mut requests = Vec::new();
        for (status, body) in responses {
            let (mut stream, _) = listener.accept().unwrap();
            requests.push(read_request_head(&mut stream));
            let response = format!(
                "HTTP/1.1 {status}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                body.len()
            );
            stream.write_all(response.as_bytes()).unwrap();
        }
        requests
    });
    (base_url, handle)
}

fn read_request_head(stream: &mut impl Read) -> String {
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.ends_with(b"\r\n\r\n") {
        let n = stream.read(&mut buf).unwrap();
        if n == 0 {
            break;
        }
        head.extend_from_slice(&buf[..n]);
    }
    String::from_utf8_lossy(&head).into_owned()
}

/// Client for talking to [`serve_json`]; ignores proxy settings from the
/// environment.
pub fn loopback_client() -> reqwest::blocking::Client {
    reqwest::blocking::Client::builder()
        .no_proxy()
        .build()
        .unwrap()
}

// =========================================================================
// Fixtures
// =========================================================================

/// Parse a catalog record from inline JSON. Panics on malformed fixtures.
pub fn record(value: Value) -> CatalogRecord {
    serde_json::from_value(value).unwrap_or_else(|e| panic!("bad record fixture: {e}"))
}

/// Stock config with fixed, recognizable URLs.
pub fn config() -> PipelineConfig {
    let mut config = PipelineConfig::default();
    config.image_service.base_url = "https://iiif.example.org/iiif/3".to_string();
    config.manifest.public_base_url = "https://manifests.example.org".to_string();
    config
}

/// Write `(name, contents)` pairs into `dir`.
pub fn write_files(dir: &Path, files: &[(&str, &str)]) {
    for (name, contents) in files {
        std::fs::write(dir.join(name), contents)
            .unwrap_or_else(|e| panic!("failed to write fixture {name}: {e}"));
    }
}
