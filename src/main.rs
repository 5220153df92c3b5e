use ledgerdesk::config::Config;
use ledgerdesk::db::{create_pool, migrations};
use ledgerdesk::scheduler::Scheduler;
use ledgerdesk::VERSION;
use tokio::sync::watch;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ledgerdesk=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    tracing::info!(
        version = VERSION,
        database = %config.database_path.display(),
        "Starting ledgerdesk"
    );

    let db = create_pool(&config.database_path).expect("Failed to create database pool");

    {
        let mut conn = db.get().expect("Failed to get database connection");
        migrations::run_migrations(&mut conn, &config.migrations_path)
            .expect("Failed to run migrations");
    }

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let scheduler = tokio::spawn(Scheduler::new(db, &config).run(shutdown_rx));

    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
    tracing::info!("Shutdown requested");
    shutdown_tx.send(true).ok();

    if let Err(e) = scheduler.await {
        tracing::error!(error = %e, "Scheduler task failed");
    }
}
