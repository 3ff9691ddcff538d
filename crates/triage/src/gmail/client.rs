//! Gmail API HTTP client
//!
//! Provides methods for listing and fetching messages from the Gmail API.
//! Uses synchronous HTTP (ureq) to be executor-agnostic.

use anyhow::{Context, Result};

use super::api::{GmailMessage, ListMessagesResponse};
use super::{GmailAuth, MailSource};
use crate::models::MessageId;

/// Gmail API client for fetching messages
pub struct GmailClient {
    auth: GmailAuth,
}

impl GmailClient {
    /// Gmail API base URL
    const BASE_URL: &'static str = "https://gmail.googleapis.com/gmail/v1";

    /// Upper bound the API accepts for `maxResults`
    const MAX_PAGE_SIZE: usize = 500;

    /// Create a new Gmail client
    pub fn new(auth: GmailAuth) -> Self {
        Self { auth }
    }

    /// List message IDs from the user's mailbox, newest first
    ///
    /// # Arguments
    /// * `max_results` - Maximum number of messages to return (1-500)
    pub fn list_messages(&self, max_results: usize) -> Result<ListMessagesResponse> {
        let access_token = self.auth.access_token()?;

        let url = format!(
            "{}/users/me/messages?maxResults={}",
            Self::BASE_URL,
            max_results.clamp(1, Self::MAX_PAGE_SIZE)
        );

        let mut response = ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .context("Failed to send list messages request")?;

        let list: ListMessagesResponse = response
            .body_mut()
            .read_json()
            .context("Failed to parse list messages response")?;

        Ok(list)
    }

    /// Get full message details by ID
    ///
    /// # Arguments
    /// * `id` - The message ID to fetch
    pub fn fetch_message(&self, id: &MessageId) -> Result<GmailMessage> {
        let access_token = self.auth.access_token()?;

        let url = format!(
            "{}/users/me/messages/{}?format=full",
            Self::BASE_URL,
            urlencoding::encode(id.as_str())
        );

        let mut response = ureq::get(&url)
            .header("Authorization", &format!("Bearer {}", access_token))
            .call()
            .with_context(|| format!("Failed to send get message request for {}", id))?;

        let message: GmailMessage = response
            .body_mut()
            .read_json()
            .with_context(|| format!("Failed to parse message response for {}", id))?;

        Ok(message)
    }
}

impl MailSource for GmailClient {
    fn list_recent(&self, limit: usize) -> Result<Vec<MessageId>> {
        let list = self.list_messages(limit)?;

        Ok(list
            .messages
            .unwrap_or_default()
            .into_iter()
            .take(limit)
            .map(|m| MessageId::new(m.id))
            .collect())
    }

    fn get_message(&self, id: &MessageId) -> Result<GmailMessage> {
        self.fetch_message(id)
    }
}
