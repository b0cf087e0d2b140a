//! In-memory content store shared by the integration tests.

use std::collections::HashMap;
use std::io::{Cursor, Read};

use metaharvest::{ContentSource, ContentStore, Result};

/// Install a test-friendly tracing subscriber. Safe to call from every test;
/// only the first call in a process wins.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub struct MemSource {
    url: String,
    bytes: Vec<u8>,
    encoding: Option<String>,
}

impl MemSource {
    pub fn new(url: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            bytes: bytes.into(),
            encoding: None,
        }
    }

    #[allow(dead_code)]
    pub fn with_encoding(mut self, label: &str) -> Self {
        self.encoding = Some(label.to_string());
        self
    }
}

impl ContentSource for MemSource {
    fn url(&self) -> &str {
        &self.url
    }

    fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    fn has_content(&self) -> bool {
        !self.bytes.is_empty()
    }

    fn open(&self) -> Result<Box<dyn Read + '_>> {
        Ok(Box::new(Cursor::new(&self.bytes)))
    }
}

#[derive(Default)]
pub struct MemStore {
    files: HashMap<String, Vec<u8>>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(mut self, url: &str, bytes: &[u8]) -> Self {
        self.files.insert(url.to_string(), bytes.to_vec());
        self
    }
}

impl ContentStore for MemStore {
    fn resolve(&self, url: &str) -> Option<Box<dyn ContentSource + '_>> {
        self.files
            .get(url)
            .map(|bytes| Box::new(MemSource::new(url, bytes.clone())) as Box<dyn ContentSource>)
    }
}
