use serde::{Deserialize, Serialize};

use crate::task::Task;

/// A named, ordered bundle of `Task`s scoped to a site. `apply_to_all`
/// short-circuits the tag match: when set, every agent at the site gets
/// this profile regardless of `tags`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: i64,
    pub name: String,
    pub site_id: i32,
    pub apply_to_all: bool,
    pub tags: Vec<i32>,
    pub tasks: Vec<Task>,
}

impl Profile {
    /// True iff this profile applies to an agent carrying `agent_tags`:
    /// unconditionally when `apply_to_all`, otherwise when at least one
    /// tag is shared.
    pub fn applies_to(&self, agent_tags: &[i32]) -> bool {
        self.apply_to_all || self.tags.iter().any(|t| agent_tags.contains(t))
    }
}

/// Recorded once per (profile, agent) pair with an error applying one of
/// its tasks. At most one issue per pair — `SaveProfileApplicationIssues`
/// replaces it wholesale rather than accumulating.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileIssue {
    pub profile_id: i64,
    pub agent_id: String,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile(apply_to_all: bool, tags: Vec<i32>) -> Profile {
        Profile {
            id: 1,
            name: "base".into(),
            site_id: 1,
            apply_to_all,
            tags,
            tasks: Vec::new(),
        }
    }

    #[test]
    fn apply_to_all_ignores_tags() {
        assert!(profile(true, vec![]).applies_to(&[]));
    }

    #[test]
    fn tag_match_requires_overlap() {
        assert!(profile(false, vec![3, 4]).applies_to(&[4, 5]));
        assert!(!profile(false, vec![3, 4]).applies_to(&[5, 6]));
    }
}
