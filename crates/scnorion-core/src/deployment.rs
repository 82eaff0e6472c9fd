use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The action an incoming `deployresult`/`wingetcfg.*` message carries.
/// Distinct from `Deployment` itself: this is the verb, the row below is
/// the resulting state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeployAction {
    Install,
    Update,
    Uninstall,
}

/// One (agent, package) record of an installed package. Uniqueness of
/// `(agent_id, package_id)` is a store-level invariant: at most one row
/// per pair, upserted in place rather than accumulated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deployment {
    pub agent_id: String,
    pub package_id: String,
    pub installed_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub failed: bool,
    pub by_profile: bool,
}

/// A WinGet package excluded, per (agent, package), from the automatic
/// profile-driven deployment sweep — created when a profile-installed
/// package is manually removed, so the next compile doesn't reinstall it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinGetConfigExclusion {
    pub agent_id: String,
    pub package_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Deployment {
        let now = DateTime::<Utc>::MIN_UTC;
        Deployment {
            agent_id: "A1".into(),
            package_id: "7zip.7zip".into(),
            installed_at: now,
            updated_at: now,
            failed: false,
            by_profile: true,
        }
    }

    #[test]
    fn failed_uninstall_is_distinguishable_from_a_clean_one() {
        let mut d = sample();
        d.failed = true;
        assert!(d.failed);
        assert!(d.by_profile);
    }
}
