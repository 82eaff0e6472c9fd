//! The releases HTTP endpoint (`spec.md` §6), abstracted behind a trait for
//! the same reason `Store`/`Bus` are: so `report::handle` can be tested
//! without reaching the network.

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::{IngestError, IngestResult};

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseFileEntry {
    pub os: String,
    pub arch: String,
    #[serde(rename = "fileURL")]
    pub file_url: String,
    pub checksum: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseDescriptor {
    pub channel: String,
    pub files: Vec<ReleaseFileEntry>,
}

#[async_trait]
pub trait ReleaseDirectory: Send + Sync {
    async fn fetch(&self, version: &str) -> IngestResult<ReleaseDescriptor>;
}

/// Queries `https://releases.scnorion.eu/api?action=agentReleaseInfo` for a
/// version's file manifest.
pub struct HttpReleaseDirectory {
    client: reqwest::Client,
    base_url: String,
}

impl HttpReleaseDirectory {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: "https://releases.scnorion.eu/api".into(),
        }
    }
}

impl Default for HttpReleaseDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReleaseDirectory for HttpReleaseDirectory {
    async fn fetch(&self, version: &str) -> IngestResult<ReleaseDescriptor> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[("action", "agentReleaseInfo"), ("version", version)])
            .send()
            .await
            .map_err(|e| IngestError::Compile(format!("releases endpoint unreachable: {e}")))?;

        response
            .json::<ReleaseDescriptor>()
            .await
            .map_err(|e| IngestError::Compile(format!("malformed release descriptor: {e}")))
    }
}
