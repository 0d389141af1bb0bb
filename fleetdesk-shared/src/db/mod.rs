/// Database layer for FleetDesk
///
/// # Modules
///
/// - `pool`: PostgreSQL connection pool with a startup health check
/// - `migrations`: Embedded sqlx migrations (`fleetdesk-shared/migrations`)
///
/// Models live in the crate-level `models` module.
///
/// # Example
///
/// ```no_run
/// use fleetdesk_shared::db::migrations::run_migrations;
/// use fleetdesk_shared::db::pool::{create_pool, DatabaseConfig};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pool = create_pool(DatabaseConfig {
///         url: std::env::var("DATABASE_URL")?,
///         ..Default::default()
///     })
///     .await?;
///
///     run_migrations(&pool).await?;
///     Ok(())
/// }
/// ```

pub mod migrations;
pub mod pool;
