//! Profile compiler (`spec.md` §4.4.3): turns a site's profiles applying
//! to one agent into one YAML envelope per profile, in either the
//! Windows (`wingetcfg.profiles`) or Unix (`ansiblecfg.profiles`) dialect.
//!
//! A task's `TaskKind` selects its resource constructor. A task that
//! belongs to the other dialect (e.g. a `ShellScript` task inside a
//! profile compiled for Windows) aborts compilation of that one profile;
//! the rest of the agent's profiles still compile.

use std::sync::Arc;

use scnorion_core::task::{LocalGroupTarget, LocalUserTarget, RegistryTarget, ScriptTarget, TaskBody};
use scnorion_core::{Profile, Task};
use scnorion_store::Store;
use serde::Serialize;
use serde_yaml::{Mapping, Value};
use tracing::warn;

use crate::error::IngestResult;
use crate::wire::CfgProfilesRequestWire;

pub const WINGETCFG_SUBJECT: &str = "wingetcfg.profiles";
pub const ANSIBLECFG_SUBJECT: &str = "ansiblecfg.profiles";
pub const QUEUE: &str = "scnorion-agents";

#[derive(Debug, Clone, Serialize)]
struct WindowsProfileEnvelope {
    #[serde(rename = "profileID")]
    profile_id: i64,
    exclusions: Vec<String>,
    deployments: Vec<String>,
    config: Value,
}

#[derive(Debug, Clone, Serialize)]
struct UnixProfileEnvelope {
    #[serde(rename = "profileID")]
    profile_id: i64,
    ansible: Vec<Value>,
}

pub async fn handle_windows(store: &Arc<dyn Store>, payload: &[u8]) -> IngestResult<String> {
    let request: CfgProfilesRequestWire = serde_json::from_slice(payload)?;
    let profiles = load_profiles(store, &request.agent_id).await?;

    let exclusions: Vec<String> = store
        .get_excluded_winget_packages(&request.agent_id)
        .await?
        .into_iter()
        .map(|e| e.package_id)
        .collect();
    let deployments: Vec<String> = store
        .get_deployed_packages(&request.agent_id)
        .await?
        .into_iter()
        .map(|d| d.package_id)
        .collect();

    let mut envelopes = Vec::new();
    for profile in profiles {
        match compile_windows_profile(&profile) {
            Ok(config) => envelopes.push(WindowsProfileEnvelope {
                profile_id: profile.id,
                exclusions: exclusions.clone(),
                deployments: deployments.clone(),
                config,
            }),
            Err(e) => warn!(profile_id = profile.id, error = %e, "skipping profile, could not compile for windows"),
        }
    }

    Ok(serde_yaml::to_string(&envelopes)?)
}

pub async fn handle_unix(store: &Arc<dyn Store>, payload: &[u8]) -> IngestResult<String> {
    let request: CfgProfilesRequestWire = serde_json::from_slice(payload)?;
    let profiles = load_profiles(store, &request.agent_id).await?;

    let mut envelopes = Vec::new();
    for profile in &profiles {
        match compile_unix_profile(profile) {
            Ok(ansible) => envelopes.push(UnixProfileEnvelope {
                profile_id: profile.id,
                ansible,
            }),
            Err(e) => warn!(profile_id = profile.id, error = %e, "skipping profile, could not compile for unix"),
        }
    }

    Ok(serde_yaml::to_string(&envelopes)?)
}

async fn load_profiles(store: &Arc<dyn Store>, agent_id: &str) -> IngestResult<Vec<Profile>> {
    let mut profiles = store.get_profiles_for_agent(agent_id).await?;
    for profile in &mut profiles {
        profile.tasks.sort_by_key(|t| t.id);
    }
    Ok(profiles)
}

fn compile_windows_profile(profile: &Profile) -> Result<Value, String> {
    let mut resources = Vec::with_capacity(profile.tasks.len());
    for (index, task) in profile.tasks.iter().enumerate() {
        if !task.kind().is_windows() {
            return Err(format!("task {:?} is not a windows task", task.kind()));
        }
        resources.push(windows_resource(task, &task.resource_key(index))?);
    }

    let mut properties = Mapping::new();
    properties.insert("resources".into(), Value::Sequence(resources));
    properties.insert("configurationVersion".into(), Value::String("0.2.0".into()));

    let mut root = Mapping::new();
    root.insert("properties".into(), Value::Mapping(properties));
    Ok(Value::Mapping(root))
}

fn windows_resource(task: &Task, resource_key: &str) -> Result<Value, String> {
    let (resource_type, settings) = match &task.body {
        TaskBody::WinGetInstall(t) => (
            "Microsoft.WinGet.DSC/WinGetPackage",
            mapping([("id", t.package_id.clone()), ("source", t.source.clone())]),
        ),
        TaskBody::WinGetDelete(t) => (
            "Microsoft.WinGet.DSC/WinGetPackage",
            mapping([
                ("id", t.package_id.clone()),
                ("source", t.source.clone()),
                ("ensure", "absent".into()),
            ]),
        ),
        TaskBody::RegistryAdd(t) | TaskBody::RegistryUpdateValue(t) => registry_settings(t, "present"),
        TaskBody::RegistryRemove(t) => registry_settings(t, "absent"),
        TaskBody::LocalUserAdd(t) => (
            "Microsoft.Windows.Setting/LocalUser",
            local_user_settings(t, "present"),
        ),
        TaskBody::LocalUserRemove { username } => (
            "Microsoft.Windows.Setting/LocalUser",
            mapping([("username", username.clone()), ("ensure", "absent".into())]),
        ),
        TaskBody::LocalGroupAdd(t) | TaskBody::LocalGroupModify(t) | TaskBody::LocalGroupMembers(t) => {
            local_group_settings(t, "present")
        }
        TaskBody::LocalGroupRemove { group_name } => (
            "Microsoft.Windows.Setting/LocalGroup",
            mapping([("groupName", group_name.clone()), ("ensure", "absent".into())]),
        ),
        TaskBody::MsiInstall(t) => (
            "Microsoft.Windows.Setting/MsiPackage",
            mapping([
                ("productCode", t.product_code.clone()),
                ("sourcePath", t.source_path.clone()),
                ("arguments", t.arguments.clone()),
                ("ensure", "present".into()),
            ]),
        ),
        TaskBody::MsiUninstall(t) => (
            "Microsoft.Windows.Setting/MsiPackage",
            mapping([("productCode", t.product_code.clone()), ("ensure", "absent".into())]),
        ),
        TaskBody::PowerShellScript(t) => (
            "PSDscResources/Script",
            script_settings(t),
        ),
        _ => return Err(format!("{:?} has no windows resource constructor", task.kind())),
    };

    let mut node = Mapping::new();
    node.insert("resource".into(), Value::String(resource_type.into()));
    node.insert("id".into(), Value::String(resource_key.into()));
    let mut directives = Mapping::new();
    directives.insert("description".into(), Value::String(task.name.clone()));
    node.insert("directives".into(), Value::Mapping(directives));
    node.insert("settings".into(), Value::Mapping(settings));
    Ok(Value::Mapping(node))
}

fn registry_settings(t: &RegistryTarget, ensure: &str) -> (&'static str, Mapping) {
    (
        "Microsoft.Windows.Setting/Registry",
        mapping([
            ("keyPath", format!("{}\\{}", t.hive, t.path)),
            ("valueName", t.value_name.clone()),
            ("valueType", t.value_type.clone()),
            ("valueData", t.value_data.clone()),
            ("ensure", ensure.into()),
        ]),
    )
}

fn local_user_settings(t: &LocalUserTarget, ensure: &str) -> Mapping {
    mapping([
        ("username", t.username.clone()),
        ("fullName", t.full_name.clone()),
        ("description", t.description.clone()),
        ("ensure", ensure.into()),
    ])
}

fn local_group_settings(t: &LocalGroupTarget, ensure: &str) -> (&'static str, Mapping) {
    let mut m = mapping([
        ("groupName", t.group_name.clone()),
        ("description", t.description.clone()),
        ("ensure", ensure.into()),
    ]);
    m.insert(
        "members".into(),
        Value::Sequence(t.members.iter().cloned().map(Value::String).collect()),
    );
    ("Microsoft.Windows.Setting/LocalGroup", m)
}

fn script_settings(t: &ScriptTarget) -> Mapping {
    let mut m = mapping([("setScript", t.inline.clone())]);
    m.insert(
        "arguments".into(),
        Value::Sequence(t.arguments.iter().cloned().map(Value::String).collect()),
    );
    m
}

fn mapping<const N: usize>(pairs: [(&str, String); N]) -> Mapping {
    let mut m = Mapping::new();
    for (k, v) in pairs {
        m.insert(Value::String(k.into()), Value::String(v));
    }
    m
}

fn compile_unix_profile(profile: &Profile) -> Result<Vec<Value>, String> {
    let mut plays = Vec::with_capacity(profile.tasks.len());
    for task in &profile.tasks {
        if task.kind().is_windows() {
            return Err(format!("task {:?} is not a unix task", task.kind()));
        }
        plays.push(unix_play(task)?);
    }
    Ok(plays)
}

fn unix_play(task: &Task) -> Result<Value, String> {
    let (module, args) = match &task.body {
        TaskBody::UnixLocalUserAdd(t) => (
            "ansible.builtin.user",
            mapping([("name", t.username.clone()), ("comment", t.full_name.clone()), ("state", "present".into())]),
        ),
        TaskBody::UnixLocalUserRemove { username } => (
            "ansible.builtin.user",
            mapping([("name", username.clone()), ("state", "absent".into())]),
        ),
        TaskBody::UnixGroupAdd(t) => (
            "ansible.builtin.group",
            mapping([("name", t.group_name.clone()), ("state", "present".into())]),
        ),
        TaskBody::UnixGroupRemove { group_name } => (
            "ansible.builtin.group",
            mapping([("name", group_name.clone()), ("state", "absent".into())]),
        ),
        TaskBody::ShellScript(t) => {
            let mut m = Mapping::new();
            m.insert("cmd".into(), Value::String(t.inline.clone()));
            ("ansible.builtin.shell", m)
        }
        TaskBody::FlatpakInstall(t) => (
            "community.general.flatpak",
            mapping([("name", t.app_id.clone()), ("remote", t.remote.clone()), ("state", "present".into())]),
        ),
        TaskBody::FlatpakUninstall(t) => (
            "community.general.flatpak",
            mapping([("name", t.app_id.clone()), ("state", "absent".into())]),
        ),
        TaskBody::BrewFormulaInstall(t) => (
            "community.general.homebrew",
            mapping([("name", t.name.clone()), ("state", "present".into())]),
        ),
        TaskBody::BrewFormulaUpgrade(t) => (
            "community.general.homebrew",
            mapping([("name", t.name.clone()), ("state", "latest".into())]),
        ),
        TaskBody::BrewFormulaUninstall(t) => (
            "community.general.homebrew",
            mapping([("name", t.name.clone()), ("state", "absent".into())]),
        ),
        TaskBody::BrewCaskInstall(t) => (
            "community.general.homebrew_cask",
            mapping([("name", t.name.clone()), ("state", "present".into())]),
        ),
        TaskBody::BrewCaskUpgrade(t) => (
            "community.general.homebrew_cask",
            mapping([("name", t.name.clone()), ("state", "latest".into())]),
        ),
        TaskBody::BrewCaskUninstall(t) => (
            "community.general.homebrew_cask",
            mapping([("name", t.name.clone()), ("state", "absent".into())]),
        ),
        _ => return Err(format!("{:?} has no unix resource constructor", task.kind())),
    };

    let mut play = Mapping::new();
    play.insert("name".into(), Value::String(task.name.clone()));
    play.insert(Value::String(module.into()), Value::Mapping(args));
    Ok(Value::Mapping(play))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scnorion_core::task::{Task, TaskBody, WinGetTarget};
    use scnorion_core::{Profile, Site, Agent};
    use scnorion_store::FakeStore;

    fn agent() -> Agent {
        Agent {
            agent_id: "A1".into(),
            hostname: "a1".into(),
            ip: "10.0.0.1".into(),
            mac: String::new(),
            os: "windows".into(),
            sftp_service: false,
            remote_assistance: false,
            is_wayland: false,
            has_rustdesk: false,
            debug_mode: false,
            is_remote: false,
            nickname: "a1".into(),
            endpoint_type: "workstation".into(),
            description: String::new(),
            admission_status: scnorion_core::AdmissionStatus::Enabled,
            first_contact: chrono::Utc::now(),
            last_contact: chrono::Utc::now(),
            update_task: Default::default(),
            site_id: Some(1),
            release_id: None,
            tags: vec![],
        }
    }

    #[tokio::test]
    async fn windows_profile_compiles_two_tasks_in_order() {
        let real = FakeStore::new();
        real.seed_site(Site {
            id: 1,
            tenant_id: 1,
            name: "hq".into(),
            is_default: true,
        });
        real.seed_agent(agent());
        real.seed_profile(Profile {
            id: 7,
            name: "base".into(),
            site_id: 1,
            apply_to_all: true,
            tags: vec![],
            tasks: vec![
                Task {
                    id: Some(2),
                    version: Some(1),
                    name: "install-7zip".into(),
                    body: TaskBody::WinGetInstall(WinGetTarget {
                        package_id: "7zip.7zip".into(),
                        source: "winget".into(),
                    }),
                },
                Task {
                    id: Some(1),
                    version: Some(1),
                    name: "install-vlc".into(),
                    body: TaskBody::WinGetInstall(WinGetTarget {
                        package_id: "VideoLAN.VLC".into(),
                        source: "winget".into(),
                    }),
                },
            ],
        });

        let store: Arc<dyn Store> = Arc::new(real);
        let payload = serde_json::to_vec(&CfgProfilesRequestWire { agent_id: "A1".into() }).unwrap();
        let yaml = handle_windows(&store, &payload).await.unwrap();
        assert!(yaml.contains("profileID: 7"));
        let first_index = yaml.find("task_1_1").unwrap();
        let second_index = yaml.find("task_2_1").unwrap();
        assert!(first_index < second_index, "tasks must be ordered by ascending task id");
    }
}
