use serde::{Deserialize, Serialize};

use crate::models::MessageView;

/// Events published on the channel bus and pushed to connected clients.
///
/// Channels are keyed by user slug, not by conversation: one gateway
/// subscription carries events for all of a user's conversations.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum GatewayEvent {
    /// Acknowledges a successful gateway subscription.
    Subscribed,

    /// A new message was committed to one of the recipient's conversations.
    SentMessage(SentMessage),
}

/// Payload of a `sent_message` event: the stored message plus the public
/// slug of the conversation it belongs to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SentMessage {
    #[serde(flatten)]
    pub message: MessageView,
    pub conversation_id: String,
}
