use std::sync::Arc;

use anyhow::Result;
use diesel_migrations::{EmbeddedMigrations, embed_migrations};
use lemonade_storefront::{
    api::{self, HttpMetadataStorage, HttpMinter, SolanaRpc},
    app_state::AppState,
    bootstrap,
    config::AppConfig,
    db,
    store::PgStore,
};

/// Migrations embedded into the binary which helps with streamlining image building process
const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

#[tokio::main]
async fn main() -> Result<()> {
    bootstrap::init_env();
    bootstrap::init_tracing();

    let config = AppConfig::from_env()?;

    tracing::info!("Running migrations...");
    let migrations_count = db::run_migrations_blocking(MIGRATIONS, &config.database.url).await?;
    tracing::info!("Run {} new migrations successfully", migrations_count);

    tracing::info!("Bootstrapping...");
    let pool = db::create_pool(&config.database).await?;
    let http = api::http_client(config.chain.http_timeout)?;

    let state = AppState::new(
        Arc::new(PgStore::new(pool)),
        Arc::new(SolanaRpc::new(http.clone(), config.chain.rpc_url.clone())),
        Arc::new(HttpMetadataStorage::new(
            http.clone(),
            config.rewards.storage_url.clone(),
        )),
        Arc::new(HttpMinter::new(
            http,
            config.rewards.minter_url.clone(),
            config.rewards.minter_api_key.clone(),
        )),
        &config,
    );

    bootstrap::serve(
        "Joey's Lemonades API",
        lemonade_storefront::app(state),
        config.server.socket_addr(),
    )
    .await
}
