use rusqlite::{params, Connection, OptionalExtension, Row};

use hireup_types::models::{MessageView, ReplyPreview, UserProfile};

use crate::util::{now_string, parse_timestamp};
use crate::{Database, Result, StoreError, MESSAGE_PAGE_SIZE};

/// Shared projection for message queries: the message row, the sender's
/// profile, and the replied-to message, in a fixed column order consumed
/// by [`map_message`].
pub(crate) const MESSAGE_SELECT: &str = "
    SELECT m.id, m.content, m.read, m.deleted, m.created_at,
           u.id, u.slug, u.first_name, u.last_name,
           r.id, r.content, r.deleted, r.created_at
    FROM messages m
    JOIN users u ON u.id = m.sender_id
    LEFT JOIN messages r ON r.id = m.reply_id";

/// Content of soft-deleted messages is retained server-side but never
/// serialized to clients; the wire shape carries an empty string and the
/// `deleted` flag instead.
pub(crate) fn map_message(row: &Row<'_>) -> rusqlite::Result<MessageView> {
    let deleted: bool = row.get(3)?;
    let content = if deleted { String::new() } else { row.get(1)? };

    let reply = match row.get::<_, Option<i64>>(9)? {
        Some(id) => {
            let reply_deleted: bool = row.get(11)?;
            Some(ReplyPreview {
                id,
                content: if reply_deleted {
                    String::new()
                } else {
                    row.get(10)?
                },
                deleted: reply_deleted,
                created_at: parse_timestamp(&row.get::<_, String>(12)?),
            })
        }
        None => None,
    };

    Ok(MessageView {
        id: row.get(0)?,
        content,
        read: row.get(2)?,
        deleted,
        created_at: parse_timestamp(&row.get::<_, String>(4)?),
        sender: UserProfile {
            id: row.get(5)?,
            slug: row.get(6)?,
            first_name: row.get(7)?,
            last_name: row.get(8)?,
        },
        reply,
    })
}

pub(crate) fn get_message(conn: &Connection, message_id: i64) -> Result<Option<MessageView>> {
    let sql = format!("{MESSAGE_SELECT} WHERE m.id = ?1");
    let message = conn
        .query_row(&sql, [message_id], map_message)
        .optional()?;
    Ok(message)
}

pub(crate) fn message_count(conn: &Connection, conversation_id: i64) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*) FROM messages WHERE conversation_id = ?1",
        [conversation_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// One offset/limit page of messages. Storage order is newest-first
/// (`created_at DESC`, id as the same-instant tie-break); the page is
/// reversed to chronological order before it is handed back, since that
/// is the direction a chat view renders in.
///
/// The page number is client-supplied, so the offset is computed in
/// `i64` where the whole `u32` range stays in bounds.
pub(crate) fn message_page(
    conn: &Connection,
    conversation_id: i64,
    page: u32,
) -> Result<Vec<MessageView>> {
    let sql = format!(
        "{MESSAGE_SELECT}
         WHERE m.conversation_id = ?1
         ORDER BY m.created_at DESC, m.id DESC
         LIMIT ?2 OFFSET ?3"
    );
    let offset = i64::from(page) * i64::from(MESSAGE_PAGE_SIZE);
    let mut stmt = conn.prepare(&sql)?;
    let mut messages = stmt
        .query_map(params![conversation_id, MESSAGE_PAGE_SIZE, offset], map_message)?
        .collect::<std::result::Result<Vec<_>, _>>()?;

    messages.reverse();
    Ok(messages)
}

pub(crate) fn next_page(total: i64, page: u32) -> Option<u32> {
    if total > (i64::from(page) + 1) * i64::from(MESSAGE_PAGE_SIZE) {
        page.checked_add(1)
    } else {
        None
    }
}

/// A committed message plus the addressing the delivery coordinator needs.
#[derive(Debug)]
pub struct SentMessageRecord {
    pub message: MessageView,
    pub conversation_slug: String,
    pub recipient_slug: String,
}

impl Database {
    /// Insert a message and bump the conversation's `last_active` in one
    /// transaction, so no reader can observe the new message without the
    /// updated ordering key.
    pub fn send_message(
        &self,
        sender_id: i64,
        conversation_id: i64,
        content: &str,
        reply_id: Option<i64>,
    ) -> Result<SentMessageRecord> {
        if content.trim().is_empty() {
            return Err(StoreError::EmptyContent);
        }

        self.with_tx(|tx| {
            let slug: String = tx
                .query_row(
                    "SELECT slug FROM conversations WHERE id = ?1",
                    [conversation_id],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or(StoreError::ConversationNotFound)?;

            let is_participant: Option<i64> = tx
                .query_row(
                    "SELECT 1 FROM conversation_participants
                     WHERE conversation_id = ?1 AND user_id = ?2",
                    params![conversation_id, sender_id],
                    |row| row.get(0),
                )
                .optional()?;
            if is_participant.is_none() {
                return Err(StoreError::PermissionNotFound);
            }

            // A reply must point at a message that already exists in this
            // conversation. Existence-before-insert rules out cycles.
            if let Some(reply_id) = reply_id {
                let reply_conversation: Option<i64> = tx
                    .query_row(
                        "SELECT conversation_id FROM messages WHERE id = ?1",
                        [reply_id],
                        |row| row.get(0),
                    )
                    .optional()?;
                if reply_conversation != Some(conversation_id) {
                    return Err(StoreError::InvalidReply);
                }
            }

            let now = now_string();
            tx.execute(
                "INSERT INTO messages (conversation_id, sender_id, reply_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                params![conversation_id, sender_id, reply_id, content, now],
            )?;
            let message_id = tx.last_insert_rowid();

            tx.execute(
                "UPDATE conversations SET last_active = ?1 WHERE id = ?2",
                params![now, conversation_id],
            )?;

            let message =
                get_message(tx, message_id)?.ok_or(StoreError::MessageNotFound)?;

            let recipient_slug: String = tx
                .query_row(
                    "SELECT u.slug
                     FROM conversation_participants p
                     JOIN users u ON u.id = p.user_id
                     WHERE p.conversation_id = ?1 AND p.user_id != ?2",
                    params![conversation_id, sender_id],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or(StoreError::ConversationNotFound)?;

            Ok(SentMessageRecord {
                message,
                conversation_slug: slug,
                recipient_slug,
            })
        })
    }

    /// Soft delete. Only the original sender may delete; content stays in
    /// storage but is hidden from every client-facing shape.
    pub fn delete_message(&self, user_id: i64, message_id: i64) -> Result<()> {
        self.with_tx(|tx| {
            let sender_id: i64 = tx
                .query_row(
                    "SELECT sender_id FROM messages WHERE id = ?1",
                    [message_id],
                    |row| row.get(0),
                )
                .optional()?
                .ok_or(StoreError::MessageNotFound)?;

            if sender_id != user_id {
                return Err(StoreError::PermissionNotFound);
            }

            tx.execute(
                "UPDATE messages SET deleted = 1 WHERE id = ?1",
                [message_id],
            )?;
            Ok(())
        })
    }
}
