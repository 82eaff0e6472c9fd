use std::path::PathBuf;

use clap::Parser;

/// PID file name every role writes to the working directory, before
/// subscribing (harmonised across all three — see `spec.md` §9).
pub const PIDFILE_NAME: &str = "PIDFILE";

/// Flags shared by every `start` subcommand and `healthcheck`, mirroring
/// `spec.md` §6's CLI table. Each flag falls back to the environment
/// variable of the same name so the same binary runs unmodified under
/// systemd units or plain shells with a `.env` file.
#[derive(Parser, Debug, Clone)]
pub struct WorkerConfig {
    /// CA certificate PEM used both as the mTLS trust root for the bus
    /// connection and as the bundle shipped to agents.
    #[arg(long, env = "CA_CRT_FILENAME", default_value = "certificates/ca.cer")]
    pub cacert: PathBuf,

    #[arg(long, env = "CERT_FILENAME")]
    pub cert: PathBuf,

    #[arg(long, env = "KEY_FILENAME")]
    pub key: PathBuf,

    /// Comma-separated `tls://host:port` bus endpoints.
    #[arg(long, env = "NATS_SERVERS", value_delimiter = ',')]
    pub nats_servers: Vec<String>,

    #[arg(long, env = "DATABASE_URL")]
    pub dburl: String,

    #[arg(long, env = "SCNORION_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

/// Flags required only by `cert-manager start`, layered on top of
/// `WorkerConfig`.
#[derive(Parser, Debug, Clone)]
pub struct CertManagerConfig {
    #[command(flatten)]
    pub worker: WorkerConfig,

    /// CA private key PEM, used to sign issued certificates.
    #[arg(long, env = "CA_KEY_FILENAME")]
    pub cakey: PathBuf,

    /// One or more OCSP responder URLs, comma-separated, embedded in every
    /// issued certificate's `OCSPServer` extension.
    #[arg(long, env = "OCSP", value_delimiter = ',')]
    pub ocsp: Vec<String>,

    /// Directory the periodic config-regeneration job writes `config.ini`
    /// into, for external tooling that reads the CA's settings without
    /// linking against this binary.
    #[arg(long, env = "SCNORION_CONFIG_DIR")]
    pub config_dir: Option<PathBuf>,
}

impl WorkerConfig {
    /// Load a local `.env` file (if present) before the real env is read,
    /// matching local dev workflow; production deployments set real
    /// environment variables and this is a silent no-op.
    pub fn load_dotenv() {
        let _ = dotenvy::dotenv();
    }

    pub fn nats_url(&self) -> String {
        self.nats_servers.join(",")
    }
}

pub fn init_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
