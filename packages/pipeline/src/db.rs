use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::PipelineConfig;
use crate::error::Result;

pub async fn create_pool(config: &PipelineConfig) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await?;

    Ok(pool)
}

pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// Open a pool and bring the corpus schema up to date.
pub async fn connect(config: &PipelineConfig) -> Result<PgPool> {
    let pool = create_pool(config).await?;
    run_migrations(&pool).await?;
    tracing::info!(max_connections = config.max_connections, "database ready");
    Ok(pool)
}
