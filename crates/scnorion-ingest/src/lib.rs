//! Agent-facing ingestion handlers (`spec.md` §4.4 / C4): the agents
//! worker's subjects, minus certificate issuance (`scnorion-ca`) and
//! outbound mail (`scnorion-notify`).

pub mod agentconfig;
pub mod application_report;
pub mod deployresult;
pub mod error;
pub mod profiles;
pub mod release_directory;
pub mod report;
pub mod wire;

pub use error::{IngestError, IngestResult};
pub use release_directory::{HttpReleaseDirectory, ReleaseDescriptor, ReleaseDirectory, ReleaseFileEntry};

pub const PING_SUBJECT: &str = "ping.agentworker";
