//! Wire payloads for `certificates.user` / `certificates.agent.*`
//! (`spec.md` §4.5, §6).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct SubjectFieldsWire {
    #[serde(default)]
    pub organization: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub province: String,
    #[serde(default)]
    pub locality: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub postal_code: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserCertificateRequestWire {
    pub username: String,
    #[serde(default)]
    pub full_name: String,
    pub email: String,
    #[serde(flatten)]
    pub subject: SubjectFieldsWire,
    #[serde(default)]
    pub years_valid: u32,
    #[serde(default)]
    pub months_valid: u32,
    #[serde(default)]
    pub days_valid: u32,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub console_url: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AgentCertificateRequestWire {
    pub agent_id: String,
    pub dns_name: String,
    #[serde(flatten)]
    pub subject: SubjectFieldsWire,
    #[serde(default)]
    pub years_valid: u32,
    #[serde(default)]
    pub months_valid: u32,
    #[serde(default)]
    pub days_valid: u32,
}

/// `original_source/internal/common/cert-manager.go`'s `AgentCertificateData`:
/// a Go `[]byte` field marshals to a base64 JSON string, so the DER cert and
/// PKCS#1 key travel as base64 here rather than as JSON number arrays.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentCertificateDataWire {
    pub cert_bytes: String,
    pub private_key_bytes: String,
}
