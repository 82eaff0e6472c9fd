pub mod error;
pub mod fake;
pub mod pg;
pub mod traits;

pub use error::{StoreError, StoreResult};
pub use fake::FakeStore;
pub use pg::PgStore;
pub use traits::{AgentReportBundle, Store};
