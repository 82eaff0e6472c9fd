pub mod config;
pub mod config_ini;
pub mod lifecycle;
pub mod pidfile;
pub mod ping;
pub mod retry;
pub mod signals;

pub use config::{init_tracing, CertManagerConfig, WorkerConfig, PIDFILE_NAME};
pub use config_ini::{run_config_regeneration_job, CaConfigSnapshot, ConfigIniError};
pub use lifecycle::{LifecycleStage, Supervisor, WorkerHandles};
pub use retry::connect_with_retry;
