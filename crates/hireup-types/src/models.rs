use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a user within a conversation. The creator gets `Owner`,
/// the other side gets `Participant`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Permission {
    Owner,
    Participant,
}

impl Permission {
    pub fn as_str(self) -> &'static str {
        match self {
            Permission::Owner => "owner",
            Permission::Participant => "participant",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "owner" => Some(Permission::Owner),
            "participant" => Some(Permission::Participant),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AccountType {
    User,
    Recruiter,
    Admin,
}

impl AccountType {
    pub fn as_str(self) -> &'static str {
        match self {
            AccountType::User => "user",
            AccountType::Recruiter => "recruiter",
            AccountType::Admin => "admin",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "user" => Some(AccountType::User),
            "recruiter" => Some(AccountType::Recruiter),
            "admin" => Some(AccountType::Admin),
            _ => None,
        }
    }
}

/// Public profile fields exposed alongside conversations and messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i64,
    pub slug: String,
    pub first_name: String,
    pub last_name: String,
}

/// A user's membership in a conversation, with their public profile.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantInfo {
    pub user_id: i64,
    pub permission: Permission,
    pub user: UserProfile,
}

/// Compact view of the message a reply points at.
/// Content is blanked when the target was soft-deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyPreview {
    pub id: i64,
    pub content: String,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
}

/// A message as rendered to clients. `content` is blanked for
/// soft-deleted messages; clients render a placeholder off `deleted`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageView {
    pub id: i64,
    pub content: String,
    pub read: bool,
    pub deleted: bool,
    pub created_at: DateTime<Utc>,
    pub sender: UserProfile,
    pub reply: Option<ReplyPreview>,
}

/// Conversation shape for list views: the other side's profile, the
/// caller's permission, the latest non-deleted message, and the unread
/// state collapsed to a single boolean.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationSummary {
    pub id: i64,
    pub slug: String,
    pub last_active: DateTime<Utc>,
    pub permission: Permission,
    pub participant: ParticipantInfo,
    pub read: bool,
    pub last_message: Option<MessageView>,
}

/// Conversation shape for the detail view: full participant list plus
/// one page of messages in chronological order.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationDetail {
    pub id: i64,
    pub slug: String,
    pub last_active: DateTime<Utc>,
    pub permission: Permission,
    pub participant: ParticipantInfo,
    pub participants: Vec<ParticipantInfo>,
    pub messages: Vec<MessageView>,
}
