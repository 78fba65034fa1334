//! Connectivity check against the configured Supabase project.
//!
//! Loads settings from the environment, pings the auth health endpoint,
//! fetches the key directory with the same fallbacks the verifier uses and
//! reads one row from `profiles`. Exits non-zero on the first failure.

use std::process::ExitCode;

use supabase_bff::prelude::*;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

fn mask(value: &str) -> String {
    match value.chars().count() {
        0 => "<empty>".to_string(),
        n if n <= 8 => "*".repeat(n),
        n => {
            let head: String = value.chars().take(4).collect();
            let tail: String = value.chars().skip(n - 4).collect();
            format!("{head}***{tail}")
        }
    }
}

// Keys the connectivity check cannot run without.
fn missing_keys(settings: &Settings) -> Vec<&'static str> {
    let mut missing = Vec::new();
    if settings.anon_key.is_empty() {
        missing.push("SUPABASE_ANON_KEY");
    }
    if settings.service_role_key.is_empty() {
        missing.push("SUPABASE_SERVICE_ROLE_KEY");
    }
    missing
}

async fn check_auth_health(settings: &Settings) -> Result<serde_json::Value, BffError> {
    let client = reqwest::Client::builder()
        .timeout(settings.fetch_timeout)
        .build()?;
    let url = format!("{}/auth/v1/health", settings.base_url);
    let response = client
        .get(&url)
        .header("apikey", &settings.anon_key)
        .send()
        .await?
        .error_for_status()?;
    Ok(response.json().await?)
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let settings = match Settings::from_env() {
        Ok(settings) => settings,
        Err(e) => {
            error!("[env] {}", e);
            return ExitCode::FAILURE;
        }
    };
    let missing = missing_keys(&settings);
    if !missing.is_empty() {
        error!("[env] missing environment variables: {}", missing.join(", "));
        return ExitCode::FAILURE;
    }
    info!("[env] loaded settings for {}", settings.base_url);
    info!("  - anon key: {}", mask(&settings.anon_key));
    info!("  - service role key: {}", mask(&settings.service_role_key));

    match check_auth_health(&settings).await {
        Ok(health) => info!("[health] {}/auth/v1/health -> {}", settings.base_url, health),
        Err(e) => {
            error!("[health] {}", e);
            return ExitCode::FAILURE;
        }
    }

    let probe = match KeyDirectoryClient::new(&settings) {
        Ok(directory) => directory.probe().await,
        Err(e) => Err(e),
    };
    match probe {
        Ok((url, keys)) => info!("[jwks] fetched from {}, keys={}", url, keys.len()),
        Err(e) => {
            error!("[jwks] {}", e);
            return ExitCode::FAILURE;
        }
    }

    let rows = match RestProfileStore::new(&settings) {
        Ok(store) => store.list(0, 1).await,
        Err(e) => Err(e),
    };
    match rows {
        Ok(rows) => info!("[database] profiles table reachable (rows previewed: {})", rows.len()),
        Err(e) => {
            error!("[database] {}", e);
            return ExitCode::FAILURE;
        }
    }

    info!("All Supabase connectivity checks passed.");
    ExitCode::SUCCESS
}
