//! The closed task catalogue.
//!
//! A `Task` is the domain-level, tagged-variant representation of "one
//! action a profile can apply to an agent". The persistence layer widens
//! this into a single table (see the store crate); everywhere else — wire
//! messages, profile compilation, deployment targeting — the tagged form
//! is what gets passed around, matched on, and tested.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    WinGetInstall,
    WinGetDelete,
    RegistryAdd,
    RegistryRemove,
    RegistryUpdateValue,
    LocalUserAdd,
    LocalUserRemove,
    LocalGroupAdd,
    LocalGroupRemove,
    LocalGroupModify,
    LocalGroupMembers,
    MsiInstall,
    MsiUninstall,
    PowerShellScript,
    UnixLocalUserAdd,
    UnixLocalUserRemove,
    UnixGroupAdd,
    UnixGroupRemove,
    ShellScript,
    FlatpakInstall,
    FlatpakUninstall,
    BrewFormulaInstall,
    BrewFormulaUpgrade,
    BrewFormulaUninstall,
    BrewCaskInstall,
    BrewCaskUpgrade,
    BrewCaskUninstall,
}

impl TaskKind {
    /// Windows-dialect tasks compile into the `wingetcfg.profiles` envelope;
    /// everything else compiles into `ansiblecfg.profiles`.
    pub fn is_windows(self) -> bool {
        matches!(
            self,
            TaskKind::WinGetInstall
                | TaskKind::WinGetDelete
                | TaskKind::RegistryAdd
                | TaskKind::RegistryRemove
                | TaskKind::RegistryUpdateValue
                | TaskKind::LocalUserAdd
                | TaskKind::LocalUserRemove
                | TaskKind::LocalGroupAdd
                | TaskKind::LocalGroupRemove
                | TaskKind::LocalGroupModify
                | TaskKind::LocalGroupMembers
                | TaskKind::MsiInstall
                | TaskKind::MsiUninstall
                | TaskKind::PowerShellScript
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinGetTarget {
    pub package_id: String,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryTarget {
    pub hive: String,
    pub path: String,
    pub value_name: String,
    pub value_type: String,
    pub value_data: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalUserTarget {
    pub username: String,
    pub full_name: String,
    pub description: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalGroupTarget {
    pub group_name: String,
    pub description: String,
    pub members: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MsiTarget {
    pub product_code: String,
    pub source_path: String,
    pub arguments: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptTarget {
    pub inline: String,
    pub arguments: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlatpakTarget {
    pub app_id: String,
    pub remote: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrewTarget {
    pub name: String,
    pub tap: String,
}

/// The task body, one variant per `TaskKind`. Keeping the payload as a
/// separate enum from `TaskKind` lets the store layer persist `kind` and
/// `body` (serialized) as two wide-row columns without needing to
/// round-trip through JSON twice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TaskBody {
    WinGetInstall(WinGetTarget),
    WinGetDelete(WinGetTarget),
    RegistryAdd(RegistryTarget),
    RegistryRemove(RegistryTarget),
    RegistryUpdateValue(RegistryTarget),
    LocalUserAdd(LocalUserTarget),
    LocalUserRemove { username: String },
    LocalGroupAdd(LocalGroupTarget),
    LocalGroupRemove { group_name: String },
    LocalGroupModify(LocalGroupTarget),
    LocalGroupMembers(LocalGroupTarget),
    MsiInstall(MsiTarget),
    MsiUninstall(MsiTarget),
    PowerShellScript(ScriptTarget),
    UnixLocalUserAdd(LocalUserTarget),
    UnixLocalUserRemove { username: String },
    UnixGroupAdd(LocalGroupTarget),
    UnixGroupRemove { group_name: String },
    ShellScript(ScriptTarget),
    FlatpakInstall(FlatpakTarget),
    FlatpakUninstall(FlatpakTarget),
    BrewFormulaInstall(BrewTarget),
    BrewFormulaUpgrade(BrewTarget),
    BrewFormulaUninstall(BrewTarget),
    BrewCaskInstall(BrewTarget),
    BrewCaskUpgrade(BrewTarget),
    BrewCaskUninstall(BrewTarget),
}

impl TaskBody {
    pub fn kind(&self) -> TaskKind {
        match self {
            TaskBody::WinGetInstall(_) => TaskKind::WinGetInstall,
            TaskBody::WinGetDelete(_) => TaskKind::WinGetDelete,
            TaskBody::RegistryAdd(_) => TaskKind::RegistryAdd,
            TaskBody::RegistryRemove(_) => TaskKind::RegistryRemove,
            TaskBody::RegistryUpdateValue(_) => TaskKind::RegistryUpdateValue,
            TaskBody::LocalUserAdd(_) => TaskKind::LocalUserAdd,
            TaskBody::LocalUserRemove { .. } => TaskKind::LocalUserRemove,
            TaskBody::LocalGroupAdd(_) => TaskKind::LocalGroupAdd,
            TaskBody::LocalGroupRemove { .. } => TaskKind::LocalGroupRemove,
            TaskBody::LocalGroupModify(_) => TaskKind::LocalGroupModify,
            TaskBody::LocalGroupMembers(_) => TaskKind::LocalGroupMembers,
            TaskBody::MsiInstall(_) => TaskKind::MsiInstall,
            TaskBody::MsiUninstall(_) => TaskKind::MsiUninstall,
            TaskBody::PowerShellScript(_) => TaskKind::PowerShellScript,
            TaskBody::UnixLocalUserAdd(_) => TaskKind::UnixLocalUserAdd,
            TaskBody::UnixLocalUserRemove { .. } => TaskKind::UnixLocalUserRemove,
            TaskBody::UnixGroupAdd(_) => TaskKind::UnixGroupAdd,
            TaskBody::UnixGroupRemove { .. } => TaskKind::UnixGroupRemove,
            TaskBody::ShellScript(_) => TaskKind::ShellScript,
            TaskBody::FlatpakInstall(_) => TaskKind::FlatpakInstall,
            TaskBody::FlatpakUninstall(_) => TaskKind::FlatpakUninstall,
            TaskBody::BrewFormulaInstall(_) => TaskKind::BrewFormulaInstall,
            TaskBody::BrewFormulaUpgrade(_) => TaskKind::BrewFormulaUpgrade,
            TaskBody::BrewFormulaUninstall(_) => TaskKind::BrewFormulaUninstall,
            TaskBody::BrewCaskInstall(_) => TaskKind::BrewCaskInstall,
            TaskBody::BrewCaskUpgrade(_) => TaskKind::BrewCaskUpgrade,
            TaskBody::BrewCaskUninstall(_) => TaskKind::BrewCaskUninstall,
        }
    }
}

/// A task as it appears in a profile: stable identity plus its body.
/// `id`/`version` together are what a compiled profile's resource key is
/// derived from (`task_<id>_<version>`); tasks without a durable catalogue
/// entry (ad hoc, profile-local) fall back to a positional key
/// (`task_<index>`) instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: Option<i64>,
    pub version: Option<i32>,
    pub name: String,
    pub body: TaskBody,
}

impl Task {
    pub fn resource_key(&self, index: usize) -> String {
        match (self.id, self.version) {
            (Some(id), Some(version)) => format!("task_{id}_{version}"),
            _ => format!("task_{index}"),
        }
    }

    pub fn kind(&self) -> TaskKind {
        self.body.kind()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(id: Option<i64>, version: Option<i32>) -> Task {
        Task {
            id,
            version,
            name: "install-7zip".into(),
            body: TaskBody::WinGetInstall(WinGetTarget {
                package_id: "7zip.7zip".into(),
                source: "winget".into(),
            }),
        }
    }

    #[test]
    fn resource_key_prefers_stable_identity() {
        let t = sample(Some(42), Some(3));
        assert_eq!(t.resource_key(9), "task_42_3");
    }

    #[test]
    fn resource_key_falls_back_to_position_without_identity() {
        let t = sample(None, None);
        assert_eq!(t.resource_key(5), "task_5");
    }

    #[test]
    fn windows_tasks_and_unix_tasks_do_not_overlap() {
        assert!(TaskKind::WinGetInstall.is_windows());
        assert!(!TaskKind::ShellScript.is_windows());
        assert!(!TaskKind::BrewCaskInstall.is_windows());
    }
}
