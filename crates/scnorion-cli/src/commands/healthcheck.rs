//! `healthcheck` (`spec.md` §6): a one-shot dial of the bus and the
//! database, exiting non-zero on the first failure. Grounded on
//! `original_source/internal/commands/healthcheck.go`'s `healtCheck`,
//! which never subscribes to a `ping.*` subject itself — it only proves
//! the two connections this binary would otherwise retry forever are
//! reachable right now.

use scnorion_bus::NatsBus;
use scnorion_store::PgStore;
use scnorion_supervisor::WorkerConfig;

pub async fn run(config: WorkerConfig) {
    WorkerConfig::load_dotenv();
    scnorion_supervisor::init_tracing(&config.log_level);

    if let Err(e) = NatsBus::connect_with_mtls(&config.nats_url(), &config.cert, &config.key, &config.cacert).await {
        tracing::error!(error = %e, "could not connect to NATS server");
        std::process::exit(1);
    }

    if let Err(e) = PgStore::connect(&config.dburl).await {
        tracing::error!(error = %e, "could not connect to database");
        std::process::exit(1);
    }

    tracing::info!("scnorion worker is healthy");
}
