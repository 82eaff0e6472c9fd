//! Certificate authority (`spec.md` §4.5 / C5): issues user and agent
//! X.509 certificates from a root CA, packages them for delivery, and
//! revokes superseded ones. Each issuance handler is a pure function over
//! its request and the CA material — no shared mutable scratch on a
//! worker struct, per `spec.md` §9's "Duplicate subscription bodies" note.

pub mod agent_certificate;
pub mod error;
pub mod material;
pub mod revoke;
pub mod user_certificate;
pub mod wire;

pub use error::{CaError, CaResult};
pub use material::{CaMaterial, SubjectFields, Validity};

pub const PING_SUBJECT: &str = "ping.certmanagerworker";
