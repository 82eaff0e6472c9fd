use serde::{Deserialize, Serialize};

/// A software release's composite identity. Two releases with the same
/// five fields are the same release for deployment-targeting purposes,
/// even if issued independently.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReleaseKey {
    pub kind: String,
    pub version: String,
    pub channel: String,
    pub os: String,
    pub arch: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    pub id: i64,
    pub key: ReleaseKey,
    pub checksum: String,
    pub url: String,
}
