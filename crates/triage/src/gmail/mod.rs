//! Gmail API integration
//!
//! This module provides:
//! - OAuth2 token loading, refresh and the interactive login flow
//! - Gmail API client for listing and fetching messages
//! - Body extraction from Gmail's part tree

mod auth;
mod body;
mod client;

pub use auth::{AuthError, GmailAuth};
pub use body::{BODY_SEARCH_DEPTH, extract_body, extract_header, find_inline_data, strip_markup};
pub use client::GmailClient;

use anyhow::Result;

use crate::models::MessageId;
use api::GmailMessage;

/// Source of recent messages for the triage pipeline
///
/// Implemented by [`GmailClient`]; tests substitute scripted mailboxes.
pub trait MailSource: Send + Sync {
    /// List the IDs of the most recent messages, in provider order
    fn list_recent(&self, limit: usize) -> Result<Vec<MessageId>>;

    /// Fetch a message in full format
    fn get_message(&self, id: &MessageId) -> Result<GmailMessage>;
}

/// Gmail API response types
pub mod api {
    use serde::{Deserialize, Serialize};

    /// Response from listing messages
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct ListMessagesResponse {
        pub messages: Option<Vec<MessageRef>>,
        pub next_page_token: Option<String>,
        pub result_size_estimate: Option<u32>,
    }

    /// Reference to a message (just ID and thread ID)
    #[derive(Debug, Deserialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessageRef {
        pub id: String,
        pub thread_id: Option<String>,
    }

    /// Full message from Gmail API
    #[derive(Debug, Clone, Default, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct GmailMessage {
        pub id: String,
        #[serde(default)]
        pub thread_id: Option<String>,
        #[serde(default)]
        pub snippet: Option<String>,
        #[serde(default)]
        pub payload: Option<MessagePart>,
    }

    impl GmailMessage {
        /// Headers of the top-level payload, empty when absent
        pub fn headers(&self) -> &[Header] {
            self.payload
                .as_ref()
                .and_then(|p| p.headers.as_deref())
                .unwrap_or_default()
        }
    }

    /// Email header (name-value pair)
    #[derive(Debug, Clone, Deserialize, Serialize)]
    pub struct Header {
        pub name: String,
        pub value: String,
    }

    impl Header {
        pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
            Self {
                name: name.into(),
                value: value.into(),
            }
        }
    }

    /// Part body; `data` is base64url-encoded when present
    #[derive(Debug, Clone, Default, Deserialize, Serialize)]
    pub struct MessageBody {
        pub size: Option<u32>,
        pub data: Option<String>,
    }

    /// A node of the message part tree
    ///
    /// The top-level payload has the same shape as its sub-parts.
    #[derive(Debug, Clone, Default, Deserialize, Serialize)]
    #[serde(rename_all = "camelCase")]
    pub struct MessagePart {
        pub part_id: Option<String>,
        pub mime_type: Option<String>,
        pub filename: Option<String>,
        pub headers: Option<Vec<Header>>,
        pub body: Option<MessageBody>,
        pub parts: Option<Vec<MessagePart>>,
    }

    impl MessagePart {
        /// Inline body data carried directly by this part
        pub fn inline_data(&self) -> Option<&str> {
            self.body.as_ref()?.data.as_deref()
        }

        /// Direct sub-parts, empty for leaves
        pub fn children(&self) -> &[MessagePart] {
            self.parts.as_deref().unwrap_or_default()
        }
    }
}
