use clap::{Parser, Subcommand};

use scnorion_supervisor::{CertManagerConfig, WorkerConfig};

/// scnorion worker CLI
#[derive(Parser, Debug)]
#[command(name = "scnorion-worker")]
#[command(version, about = "Manage an scnorion worker", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Manage scnorion's Agents worker
    Agents {
        #[command(subcommand)]
        action: AgentsAction,
    },

    /// Manage scnorion's Cert-Manager worker
    CertManager {
        #[command(subcommand)]
        action: CertManagerAction,
    },

    /// Manage scnorion's Notifications worker
    Notifications {
        #[command(subcommand)]
        action: NotificationsAction,
    },

    /// Check the health of a worker's NATS and database connections
    Healthcheck(WorkerConfig),
}

#[derive(Subcommand, Debug)]
pub enum AgentsAction {
    /// Start an scnorion's Agents worker
    Start(WorkerConfig),
    /// Stop an scnorion's Agents worker
    Stop,
}

#[derive(Subcommand, Debug)]
pub enum CertManagerAction {
    /// Start an scnorion's Cert-Manager worker
    Start(CertManagerConfig),
    /// Stop an scnorion's Cert-Manager worker
    Stop,
}

#[derive(Subcommand, Debug)]
pub enum NotificationsAction {
    /// Start an scnorion's Notifications worker
    Start(WorkerConfig),
    /// Stop an scnorion's Notifications worker
    Stop,
}
