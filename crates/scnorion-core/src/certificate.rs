//! Certificate issuance bookkeeping. The cryptographic operations
//! themselves live in the CA worker crate; this module carries only the
//! persisted records and the reasoning needed to order issuance/revocation
//! correctly.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CertType {
    User,
    Agent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RevocationReason {
    Unspecified,
    Superseded,
    CessationOfOperation,
    KeyCompromise,
}

/// `description` is the revocation key: at most one *live* certificate may
/// share a given description (e.g. `"a1.example agent certificate"`), so
/// issuing a new one with the same description supersedes the old one.
/// Certificates are never updated in place (`spec.md` §3): a live row is
/// either present or, once revoked, gone — superseded by deleting the row
/// and recording a `RevocationRecord` in its place, not by an in-place
/// `revoked` flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: i64,
    pub serial: i64,
    pub cert_type: CertType,
    pub description: String,
    pub user_id: Option<i64>,
    pub not_before: DateTime<Utc>,
    pub not_after: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevocationRecord {
    pub certificate_id: i64,
    pub reason: RevocationReason,
    pub revoked_at: DateTime<Utc>,
}

impl Certificate {
    pub fn is_expired(&self, at: DateTime<Utc>) -> bool {
        at >= self.not_after
    }
}
