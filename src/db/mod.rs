pub mod attendance;
pub mod comment;
pub mod event;
pub mod notification;
pub mod user;

use crate::PGPool;
use log::{info, warn};
use sqlx::postgres::PgPoolOptions;

pub async fn init_db_pool(db_url: &str, max_connections: u32) -> Result<PGPool, sqlx::Error> {
    let pool: PGPool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(db_url)
        .await?;
    info!("connected to postgresql (max {} connections)", max_connections);
    Ok(pool)
}

pub async fn run_migrations(pool: &PGPool) -> Result<(), sqlx::migrate::MigrateError> {
    warn!("applying pending database migrations");
    sqlx::migrate!("./migrations").run(pool).await
}
