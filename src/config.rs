use rocket::figment::{Figment, providers::Env};
use serde::{Deserialize, Serialize};

use crate::auth::AccessPolicy;

/// Application settings layered over Rocket's own figment.
///
/// `DATABASE_URL` is honoured as-is; every other key is read from
/// `PORTFOLIO_`-prefixed variables, e.g. `PORTFOLIO_EDITOR_TOKEN_HASH`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub database_url: String,
    pub editor_token_hash: Option<String>,
    pub honeycomb_api_key: Option<String>,
    pub allow_destructive_migrations: bool,
    pub deployment_environment: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database_url: "sqlite://portfolio.db".to_string(),
            editor_token_hash: None,
            honeycomb_api_key: None,
            allow_destructive_migrations: false,
            deployment_environment: "development".to_string(),
        }
    }
}

impl AppConfig {
    pub fn figment() -> Figment {
        rocket::Config::figment()
            .merge(Env::raw().only(&["database_url"]))
            .merge(Env::prefixed("PORTFOLIO_"))
    }

    pub fn load() -> Result<Self, crate::Error> {
        Ok(Self::figment().extract()?)
    }

    pub fn access_policy(&self) -> AccessPolicy {
        match self.editor_token_hash.as_deref().map(str::trim) {
            Some(hash) if !hash.is_empty() => AccessPolicy::EditorToken {
                token_hash: hash.to_string(),
            },
            _ => AccessPolicy::Open,
        }
    }

    pub fn honeycomb_api_key(&self) -> Option<&str> {
        self.honeycomb_api_key
            .as_deref()
            .filter(|key| !key.trim().is_empty())
    }
}
