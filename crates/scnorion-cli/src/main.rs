mod cli;
mod commands;
mod subscribe;

use clap::Parser;

use cli::{AgentsAction, CertManagerAction, Cli, Commands, NotificationsAction};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    match cli.command {
        Commands::Agents { action } => match action {
            AgentsAction::Start(config) => commands::agents::start(config).await,
            AgentsAction::Stop => commands::stop::run(),
        },
        Commands::CertManager { action } => match action {
            CertManagerAction::Start(config) => commands::cert_manager::start(config).await,
            CertManagerAction::Stop => commands::stop::run(),
        },
        Commands::Notifications { action } => match action {
            NotificationsAction::Start(config) => commands::notifications::start(config).await,
            NotificationsAction::Stop => commands::stop::run(),
        },
        Commands::Healthcheck(config) => commands::healthcheck::run(config).await,
    }
}
