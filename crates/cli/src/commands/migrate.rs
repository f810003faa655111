//! Database migration commands.
//!
//! # Usage
//!
//! ```bash
//! hc-cli migrate
//! ```
//!
//! # Environment Variables
//!
//! - `INTAKE_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`)
//!
//! Migrations live in `crates/intake/migrations/`.

use heatcheck_intake::db;

use super::{CommandError, database_url};

/// Run intake database migrations.
pub async fn intake() -> Result<(), CommandError> {
    let database_url = database_url()?;

    tracing::info!("Connecting to intake database...");
    let pool = db::create_pool(&database_url).await?;

    tracing::info!("Running intake migrations...");
    db::run_migrations(&pool).await?;

    tracing::info!("Intake migrations complete!");
    Ok(())
}
