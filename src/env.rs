use std::path::Path;

use anyhow::Context;
use tracing::{info, warn};

/// Env files for a Rocket profile, in load order. Later files override earlier ones.
pub fn env_files_for_profile(profile: &str) -> Vec<&'static str> {
    match profile {
        "release" | "production" => vec!["config/common.env", "config/prod.env", ".secrets.env"],
        _ => vec!["config/common.env", "config/dev.env", ".secrets.env"],
    }
}

pub fn load_environment() -> anyhow::Result<()> {
    let profile = dotenvy::var("ROCKET_PROFILE").unwrap_or_else(|_| "debug".to_string());

    for env_file in env_files_for_profile(&profile) {
        load_env_file(env_file)?;
    }

    Ok(())
}

pub fn load_env_file(path: &str) -> anyhow::Result<()> {
    if !Path::new(path).exists() {
        warn!("Environment file {} not found, skipping", path);
        return Ok(());
    }

    dotenvy::from_filename_override(path)
        .with_context(|| format!("Failed to load environment file {}", path))?;
    info!("Loaded environment from: {}", path);
    Ok(())
}
