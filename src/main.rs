use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use coach_connect::api::{create_routes, AppState};
use coach_connect::config::{run_migrations, AppConfig, DatabaseConfig, DatabaseSeeder, StorageBackend};
use coach_connect::store::{MemoryRepository, PgRepository, Repository};

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .init();

    let repo: Arc<dyn Repository> = match config.storage_backend {
        StorageBackend::Postgres => {
            let db_config = DatabaseConfig::from_env()?;
            let pool = db_config
                .create_pool()
                .await
                .context("Failed to connect to database")?;
            run_migrations(&pool)
                .await
                .context("Failed to run database migrations")?;
            info!("Connected to Postgres, migrations applied");
            Arc::new(PgRepository::new(pool))
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; data is lost on restart");
            Arc::new(MemoryRepository::new())
        }
    };

    if config.seed_demo_data {
        DatabaseSeeder::new(repo.clone())
            .seed_all()
            .await
            .context("Failed to seed demo data")?;
        info!("Demo data seeded");
    }

    if config.is_development() && !config.seed_demo_data {
        info!("Set SEED_DEMO_DATA=true to load a demo athlete and conversation");
    }

    if config.is_production() && config.webhook_secret.is_none() {
        warn!("WEBHOOK_SECRET is not set; the webhook accepts unauthenticated calls");
    }

    let address = config.server_address();
    let state = AppState::new(config, repo)?;
    info!(
        ai_processor = %state.forwarder.url(),
        llm_model = %state.config.llm_model,
        "AI forwarding configured"
    );

    let app = create_routes(state);

    let listener = TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!("Coach Connect server starting on http://{}", address);
    info!("Health check available at http://{}/health", address);

    axum::serve(listener, app).await?;

    Ok(())
}
