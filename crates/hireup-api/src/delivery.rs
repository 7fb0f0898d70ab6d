use tracing::debug;

use hireup_gateway::Broker;
use hireup_types::events::{GatewayEvent, SentMessage};
use hireup_types::models::MessageView;

/// Publish a committed message on the recipient's channel.
///
/// Invoked strictly after the store transaction commits, so a subscriber
/// receiving the pushed frame can always re-fetch a state that already
/// contains the message. Best-effort: if the recipient has no live
/// subscription the event is dropped, and their next list/detail fetch
/// is the durable source of truth. Nothing here can fail the caller's
/// already-successful write.
pub async fn deliver_sent_message(
    broker: &Broker,
    recipient_slug: &str,
    conversation_slug: String,
    message: MessageView,
) {
    let event = GatewayEvent::SentMessage(SentMessage {
        message,
        conversation_id: conversation_slug,
    });

    broker.publish(recipient_slug, event).await;
    debug!("Published sent_message to channel {}", recipient_slug);
}
