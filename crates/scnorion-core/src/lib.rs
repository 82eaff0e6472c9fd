pub mod agent;
pub mod certificate;
pub mod deployment;
pub mod error;
pub mod notification;
pub mod profile;
pub mod release;
pub mod settings;
pub mod task;
pub mod tenant;
pub mod user;

pub use agent::{Agent, AdmissionStatus, Computer, OperatingSystem, UpdateTaskState, UpdateTaskStatus};
pub use certificate::{Certificate, CertType, RevocationReason, RevocationRecord};
pub use deployment::{DeployAction, Deployment, WinGetConfigExclusion};
pub use error::{CoreError, CoreResult};
pub use notification::Notification;
pub use profile::{Profile, ProfileIssue};
pub use release::{Release, ReleaseKey};
pub use settings::{Settings, SmtpAuthMode, SmtpSettings};
pub use task::{Task, TaskBody, TaskKind};
pub use tenant::{Site, Tenant};
pub use user::User;
