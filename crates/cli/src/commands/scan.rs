//! Scan pipeline commands.
//!
//! `resolve` needs the full service configuration (provider keys included);
//! `cache show` only needs the database.

use heatcheck_intake::CacheStore;
use heatcheck_intake::config::IntakeConfig;
use heatcheck_intake::db::{self, PgScanCache};
use heatcheck_intake::routes::scan::{ResolveRequest, resolve_code};
use heatcheck_intake::state::AppState;

use super::{CommandError, database_url};

/// Resolve a code and print the JSON response.
///
/// Unresolved codes are reported, not linked; linking is an operator action.
pub async fn resolve(code: &str) -> Result<(), CommandError> {
    dotenvy::dotenv().ok();
    let config = IntakeConfig::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    let state = AppState::new(config, pool)?;

    let request = ResolveRequest {
        code: code.to_owned(),
    };
    let response = resolve_code(state.pipeline(), &request).await?;

    #[allow(clippy::print_stdout)]
    {
        println!("{}", serde_json::to_string_pretty(&response)?);
    }
    Ok(())
}

/// Print the scan cache entry for a code without counting a hit.
pub async fn show_cache_entry(code: &str) -> Result<(), CommandError> {
    let database_url = database_url()?;
    let pool = db::create_pool(&database_url).await?;
    let cache = PgScanCache::new(pool);

    match cache.peek(code.trim()).await? {
        Some(entry) => {
            #[allow(clippy::print_stdout)]
            {
                println!("{}", serde_json::to_string_pretty(&entry)?);
            }
        }
        None => tracing::info!("No scan cache entry for {}", code.trim()),
    }
    Ok(())
}
