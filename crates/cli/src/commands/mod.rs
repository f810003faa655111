pub mod migrate;
pub mod scan;

use secrecy::SecretString;
use thiserror::Error;

/// Errors shared by CLI commands.
#[derive(Debug, Error)]
pub enum CommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// Database connection error.
    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    /// Migration failed.
    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Service configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] heatcheck_intake::config::ConfigError),

    /// The pipeline rejected the request.
    #[error("{0}")]
    Intake(#[from] heatcheck_intake::error::AppError),

    /// Scan cache lookup failed.
    #[error("{0}")]
    Store(#[from] heatcheck_intake::StoreError),

    /// Output could not be rendered.
    #[error("Output error: {0}")]
    Output(#[from] serde_json::Error),
}

/// Intake database URL, falling back to `DATABASE_URL`.
fn database_url() -> Result<SecretString, CommandError> {
    dotenvy::dotenv().ok();

    std::env::var("INTAKE_DATABASE_URL")
        .or_else(|_| std::env::var("DATABASE_URL"))
        .map(SecretString::from)
        .map_err(|_| CommandError::MissingEnvVar("INTAKE_DATABASE_URL"))
}
