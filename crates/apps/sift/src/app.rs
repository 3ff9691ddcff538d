//! Wiring of the triage pipeline from settings

use std::sync::Arc;

use anyhow::{Context, Result};
use log::{info, warn};
use triage::{
    ActivityLog, Classifier, FilterRules, GmailAuth, GmailClient, GmailCredentials,
    InMemoryActivityLog, OpenAiClient, RuleFilter, Settings, SqliteActivityLog, Triage,
    TriageOptions,
};

/// Open the activity log, in memory when the database is disabled
pub fn open_activity_log(settings: &Settings, no_db: bool) -> Result<Arc<dyn ActivityLog>> {
    if no_db {
        return Ok(Arc::new(InMemoryActivityLog::new()));
    }

    let log = SqliteActivityLog::new(&settings.db_path)?;
    info!("Activity log at {}", settings.db_path.display());
    Ok(Arc::new(log))
}

/// Build the fetch-and-classify pipeline
///
/// Fails when the OpenAI key is missing or no usable Gmail token exists.
pub fn build_triage(settings: &Settings, no_db: bool) -> Result<Triage> {
    let rules = FilterRules::load()?;
    let service = OpenAiClient::from_settings(settings)?;
    info!("Classifying with model {}", service.model());

    let log = open_activity_log(settings, no_db)?;
    let classifier = Classifier::new(RuleFilter::new(rules), Box::new(service), log)
        .with_matching(settings.verdict_matching);

    let auth = GmailAuth::from_authorized_user_file(settings.token_path.clone())
        .inspect_err(|_| login_hint())
        .with_context(|| format!("No usable Gmail token at {}", settings.token_path.display()))?;

    let triage = Triage::new(Box::new(GmailClient::new(auth)), classifier).with_options(
        TriageOptions {
            limit: settings.fetch_limit,
        },
    );
    Ok(triage)
}

fn login_hint() {
    warn!("Run `sift login` to authorize Gmail access");
    if let Some(path) = GmailCredentials::default_credentials_path() {
        warn!(
            "Login needs OAuth client credentials, either:\n\
             1. Place your Google OAuth credentials at: {}\n\
             2. Or set environment variables: GMAIL_CLIENT_ID and GMAIL_CLIENT_SECRET",
            path.display()
        );
    }
}
