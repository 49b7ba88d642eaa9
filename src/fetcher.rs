//! The "bytes-by-URL loader" boundary: this crate never performs network
//! I/O itself. Vocabulary loaders accept a `&dyn VocabFetcher` and the
//! caller decides how — or whether — a URL actually gets fetched.

use crate::Error;
use std::collections::HashMap;

/// Resolves a vocabulary source URL to raw bytes. A real implementation is
/// the embedding application's responsibility (HTTP client, local cache,
/// bundled asset, ...); this crate only defines the contract.
pub trait VocabFetcher: Send + Sync {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, Error>;
}

/// An in-memory [`VocabFetcher`] mapping fixed URLs to fixed byte payloads.
/// Intended for tests and for embedding applications that bundle
/// vocabularies as assets rather than fetching them live.
#[derive(Default)]
pub struct StaticFetcher {
    sources: HashMap<String, Vec<u8>>,
}

impl StaticFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_source(mut self, url: impl Into<String>, bytes: Vec<u8>) -> Self {
        self.sources.insert(url.into(), bytes);
        self
    }
}

impl VocabFetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>, Error> {
        self.sources.get(url).cloned().ok_or_else(|| Error::FetchFailed {
            url: url.to_string(),
            reason: "no source registered with this StaticFetcher".to_string(),
        })
    }
}
