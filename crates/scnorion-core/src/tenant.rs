//! Tenant / Site partitioning.

use serde::{Deserialize, Serialize};

/// A multi-tenancy boundary. Exactly one tenant in the database is flagged
/// `is_default`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tenant {
    pub id: i32,
    pub name: String,
    pub is_default: bool,
}

/// An administrative grouping of agents under a tenant. Exactly one site per
/// tenant is flagged `is_default`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub id: i32,
    pub tenant_id: i32,
    pub name: String,
    pub is_default: bool,
}
