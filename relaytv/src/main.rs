mod server;

use anyhow::Result;
use tracing::{error, info};

use relaytv_core::{
    bootstrap::{bootstrap_admin_profile, init_database, init_services, load_config},
    logging,
};

use server::RelayTvServer;

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Load and validate configuration
    let config = load_config()?;

    // 2. Initialize logging
    logging::init_logging(&config.logging)?;
    info!("RelayTV server starting...");

    // 3. Initialize database
    let pool = init_database(&config).await?;

    // 4. Run migrations
    info!("Running database migrations...");
    sqlx::migrate!("../migrations")
        .run(&pool)
        .await
        .map_err(|e| {
            error!("Failed to run migrations: {}", e);
            anyhow::anyhow!("Migration failed: {e}")
        })?;
    info!("Migrations completed");

    // 5. Bootstrap admin profile (if enabled and none exists)
    if let Err(e) = bootstrap_admin_profile(&pool, &config.bootstrap).await {
        error!("Failed to bootstrap admin profile: {}", e);
        // Non-fatal: continue startup even if bootstrap fails
    }

    // 6. Initialize services
    let services = init_services(pool.clone(), &config)?;

    // 7. Start the HTTP server and wait for shutdown
    let server = RelayTvServer::new(config, services, pool);
    server.start().await?;

    Ok(())
}
