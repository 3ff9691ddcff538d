//! Runtime configuration
//!
//! [`Settings`] is read from environment variables, with defaults that place
//! state under the Sift config directory. [`GmailCredentials`] holds the
//! OAuth client used by the login flow and supports, in order of priority:
//! 1. JSON file (Google Cloud Console format)
//! 2. Runtime environment variables (fallback)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::classifier::VerdictMatching;
use crate::gmail::GmailAuth;

/// Credentials filename in the Sift config directory
const CREDENTIALS_FILE: &str = "google-credentials.json";

/// Activity database filename in the Sift config directory
const DATABASE_FILE: &str = "activity.sqlite";

/// Settings for one triage deployment
#[derive(Debug, Clone)]
pub struct Settings {
    /// Key for the text classification API
    pub openai_api_key: Option<String>,
    /// Chat model used for classification
    pub openai_model: String,
    /// Base URL of the chat-completions API
    pub openai_base_url: String,
    /// Authorized-user token file for Gmail
    pub token_path: PathBuf,
    /// SQLite file backing the activity log
    pub db_path: PathBuf,
    pub verdict_matching: VerdictMatching,
    /// Number of recent messages fetched per run
    pub fetch_limit: usize,
}

impl Settings {
    pub const DEFAULT_MODEL: &'static str = "gpt-4o-mini";
    pub const DEFAULT_BASE_URL: &'static str = "https://api.openai.com/v1";
    pub const DEFAULT_FETCH_LIMIT: usize = 5;

    /// Load settings from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load settings through an arbitrary variable lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let token_path = match var("GOOGLE_API_TOKEN_PATH") {
            Some(path) => PathBuf::from(path),
            None => GmailAuth::default_token_path()
                .context("GOOGLE_API_TOKEN_PATH not set and no config directory available")?,
        };

        let db_path = match var("SIFT_DB_PATH") {
            Some(path) => PathBuf::from(path),
            None => config::config_path(DATABASE_FILE)
                .context("SIFT_DB_PATH not set and no config directory available")?,
        };

        let verdict_matching = match var("SIFT_VERDICT_MATCHING") {
            Some(mode) => mode.parse()?,
            None => VerdictMatching::default(),
        };

        let fetch_limit = match var("SIFT_FETCH_LIMIT") {
            Some(limit) => limit
                .trim()
                .parse()
                .with_context(|| format!("Invalid SIFT_FETCH_LIMIT: {}", limit))?,
            None => Self::DEFAULT_FETCH_LIMIT,
        };

        Ok(Self {
            openai_api_key: var("OPENAI_API_KEY"),
            openai_model: var("OPENAI_MODEL").unwrap_or_else(|| Self::DEFAULT_MODEL.to_string()),
            openai_base_url: var("OPENAI_BASE_URL")
                .unwrap_or_else(|| Self::DEFAULT_BASE_URL.to_string()),
            token_path,
            db_path,
            verdict_matching,
            fetch_limit,
        })
    }
}

/// OAuth client used by `sift login` to obtain a Gmail token
#[derive(Debug, Clone)]
pub struct GmailCredentials {
    pub client_id: String,
    pub client_secret: String,
}

/// Client secrets JSON as downloaded from Google Cloud Console
#[derive(Deserialize)]
struct ClientSecretsFile {
    installed: Option<ClientSecrets>,
    web: Option<ClientSecrets>,
}

#[derive(Deserialize)]
struct ClientSecrets {
    client_id: String,
    client_secret: String,
}

impl From<ClientSecrets> for GmailCredentials {
    fn from(secrets: ClientSecrets) -> Self {
        Self {
            client_id: secrets.client_id,
            client_secret: secrets.client_secret,
        }
    }
}

impl GmailCredentials {
    /// `~/.config/sift/google-credentials.json` if present, else
    /// `GMAIL_CLIENT_ID` / `GMAIL_CLIENT_SECRET`
    pub fn load() -> Result<Self> {
        if config::config_exists(CREDENTIALS_FILE) {
            return config::load_json(CREDENTIALS_FILE).and_then(Self::from_secrets_file);
        }

        Self::from_env()
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        config::load_json_file(path).and_then(Self::from_secrets_file)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .context("Failed to parse client secrets JSON")
            .and_then(Self::from_secrets_file)
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read `GMAIL_CLIENT_ID` and `GMAIL_CLIENT_SECRET` through `lookup`
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let required = |key: &str| {
            lookup(key)
                .filter(|value| !value.trim().is_empty())
                .with_context(|| format!("{} is not set", key))
        };

        Ok(Self {
            client_id: required("GMAIL_CLIENT_ID")?,
            client_secret: required("GMAIL_CLIENT_SECRET")?,
        })
    }

    /// Where [`GmailCredentials::load`] looks for a client secrets file
    pub fn default_credentials_path() -> Option<PathBuf> {
        config::config_path(CREDENTIALS_FILE)
    }

    fn from_secrets_file(file: ClientSecretsFile) -> Result<Self> {
        file.installed
            .or(file.web)
            .map(Self::from)
            .context("Client secrets file has neither an 'installed' nor a 'web' section")
    }
}
