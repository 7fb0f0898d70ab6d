use serde::{Deserialize, Serialize};

use crate::models::{AccountType, ConversationDetail, ConversationSummary, MessageView};

/// Discriminated response envelope used by every endpoint and by the
/// gateway's pushed frames: `{success: true, data}` or
/// `{success: false, error}`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Envelope<T> {
    Success { success: bool, data: T },
    Failure { success: bool, error: String },
}

impl<T> Envelope<T> {
    pub fn ok(data: T) -> Self {
        Envelope::Success {
            success: true,
            data,
        }
    }

    pub fn err(error: impl Into<String>) -> Self {
        Envelope::Failure {
            success: false,
            error: error.into(),
        }
    }
}

/// Resolved session, as returned by the session lookup.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub session_id: String,
    pub user_id: i64,
    pub user_slug: String,
    pub account_type: AccountType,
}

// -- Conversations --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateConversationRequest {
    /// The other party of the new two-party conversation.
    pub user_id: i64,
    /// First message content.
    pub content: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationListPage {
    pub conversations: Vec<ConversationSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationData {
    pub conversation: ConversationDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<u32>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct SendMessageRequest {
    pub content: String,
    #[serde(default)]
    pub reply_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessagesPage {
    pub messages: Vec<MessageView>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next: Option<u32>,
}
