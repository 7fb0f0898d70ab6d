use std::collections::HashMap;

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::warn;

use hireup_types::api::{ConversationData, ConversationListPage, MessagesPage};
use hireup_types::models::{
    ConversationDetail, ConversationSummary, MessageView, ParticipantInfo, Permission, UserProfile,
};

use crate::messages::{get_message, message_count, message_page, next_page, MESSAGE_SELECT};
use crate::unread::unread_counts;
use crate::util::{generate_slug, now_string, parse_timestamp};
use crate::{Database, Result, StoreError, CONVERSATION_PAGE_SIZE};

/// The slim conversation row every list/detail shape is assembled from:
/// the conversation itself joined against the viewing user's own
/// participant row.
struct ConversationCore {
    id: i64,
    slug: String,
    last_active: String,
    permission: Permission,
}

/// An unrecognized permission value is corrupt data, not a default.
fn parse_permission(column: usize, raw: String) -> rusqlite::Result<Permission> {
    Permission::from_str(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            column,
            rusqlite::types::Type::Text,
            format!("unknown permission '{raw}'").into(),
        )
    })
}

fn map_core(row: &Row<'_>) -> rusqlite::Result<ConversationCore> {
    let permission = parse_permission(3, row.get(3)?)?;

    Ok(ConversationCore {
        id: row.get(0)?,
        slug: row.get(1)?,
        last_active: row.get(2)?,
        permission,
    })
}

enum ArchiveFilter {
    /// Neither the conversation nor the viewer's participant row archived.
    Active,
    /// The conversation or the viewer's participant row archived.
    Archived,
}

fn conversation_cores(
    conn: &Connection,
    user_id: i64,
    filter: ArchiveFilter,
    limit: u32,
    offset: i64,
) -> Result<Vec<ConversationCore>> {
    let condition = match filter {
        ArchiveFilter::Active => "c.archived = 0 AND p.archived = 0",
        ArchiveFilter::Archived => "(c.archived = 1 OR p.archived = 1)",
    };
    let sql = format!(
        "SELECT c.id, c.slug, c.last_active, p.permission
         FROM conversations c
         JOIN conversation_participants p
           ON p.conversation_id = c.id AND p.user_id = ?1
         WHERE {condition}
         ORDER BY c.last_active DESC, c.id DESC
         LIMIT ?2 OFFSET ?3"
    );

    let mut stmt = conn.prepare(&sql)?;
    let cores = stmt
        .query_map(params![user_id, limit, offset], map_core)?
        .collect::<std::result::Result<Vec<_>, _>>()?;
    Ok(cores)
}

fn count_active_conversations(conn: &Connection, user_id: i64) -> Result<i64> {
    let count = conn.query_row(
        "SELECT COUNT(*)
         FROM conversations c
         JOIN conversation_participants p
           ON p.conversation_id = c.id AND p.user_id = ?1
         WHERE c.archived = 0 AND p.archived = 0",
        [user_id],
        |row| row.get(0),
    )?;
    Ok(count)
}

/// All participant rows (with profiles) for a batch of conversations,
/// grouped by conversation id.
fn participants_for(
    conn: &Connection,
    conversation_ids: &[i64],
) -> Result<HashMap<i64, Vec<ParticipantInfo>>> {
    if conversation_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders: Vec<String> = (0..conversation_ids.len())
        .map(|i| format!("?{}", i + 1))
        .collect();
    let sql = format!(
        "SELECT p.conversation_id, p.user_id, p.permission,
                u.slug, u.first_name, u.last_name
         FROM conversation_participants p
         JOIN users u ON u.id = p.user_id
         WHERE p.conversation_id IN ({})",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let sql_params: Vec<&dyn rusqlite::types::ToSql> = conversation_ids
        .iter()
        .map(|id| id as &dyn rusqlite::types::ToSql)
        .collect();

    let rows = stmt.query_map(sql_params.as_slice(), |row| {
        let permission = parse_permission(2, row.get(2)?)?;
        let user_id: i64 = row.get(1)?;
        Ok((
            row.get::<_, i64>(0)?,
            ParticipantInfo {
                user_id,
                permission,
                user: UserProfile {
                    id: user_id,
                    slug: row.get(3)?,
                    first_name: row.get(4)?,
                    last_name: row.get(5)?,
                },
            },
        ))
    })?;

    let mut grouped: HashMap<i64, Vec<ParticipantInfo>> = HashMap::new();
    for row in rows {
        let (conversation_id, participant) = row?;
        grouped.entry(conversation_id).or_default().push(participant);
    }
    Ok(grouped)
}

/// The single most recent non-deleted message, used as the list preview.
fn latest_message(conn: &Connection, conversation_id: i64) -> Result<Option<MessageView>> {
    let sql = format!(
        "{MESSAGE_SELECT}
         WHERE m.conversation_id = ?1 AND m.deleted = 0
         ORDER BY m.created_at DESC, m.id DESC
         LIMIT 1"
    );
    let message = conn
        .query_row(&sql, [conversation_id], crate::messages::map_message)
        .optional()?;
    Ok(message)
}

/// Assemble list-view summaries for a batch of cores: other participant,
/// latest message preview, and the unread aggregate collapsed to a
/// boolean, computed in one grouped query for the whole batch.
fn summaries(
    conn: &Connection,
    user_id: i64,
    cores: Vec<ConversationCore>,
) -> Result<Vec<ConversationSummary>> {
    let ids: Vec<i64> = cores.iter().map(|c| c.id).collect();
    let mut participants = participants_for(conn, &ids)?;
    let unread = unread_counts(conn, user_id, &ids)?;

    let mut out = Vec::with_capacity(cores.len());
    for core in cores {
        let participant = participants
            .remove(&core.id)
            .unwrap_or_default()
            .into_iter()
            .find(|p| p.user_id != user_id);
        let Some(participant) = participant else {
            warn!("Conversation {} has no counterpart participant", core.id);
            continue;
        };

        out.push(ConversationSummary {
            id: core.id,
            slug: core.slug,
            last_active: parse_timestamp(&core.last_active),
            permission: core.permission,
            participant,
            read: unread.get(&core.id).copied().unwrap_or(0) == 0,
            last_message: latest_message(conn, core.id)?,
        });
    }
    Ok(out)
}

fn require_participant(conn: &Connection, conversation_id: i64, user_id: i64) -> Result<()> {
    let row: Option<i64> = conn
        .query_row(
            "SELECT 1 FROM conversation_participants
             WHERE conversation_id = ?1 AND user_id = ?2",
            params![conversation_id, user_id],
            |row| row.get(0),
        )
        .optional()?;
    if row.is_none() {
        return Err(StoreError::PermissionNotFound);
    }
    Ok(())
}

fn conversation_id_by_slug(conn: &Connection, slug: &str) -> Result<i64> {
    conn.query_row(
        "SELECT id FROM conversations WHERE slug = ?1",
        [slug],
        |row| row.get(0),
    )
    .optional()?
    .ok_or(StoreError::ConversationNotFound)
}

/// A freshly created conversation plus the delivery addressing for its
/// first message.
#[derive(Debug)]
pub struct CreatedConversation {
    pub conversation: ConversationSummary,
    pub message: MessageView,
    pub conversation_slug: String,
    pub recipient_slug: String,
}

impl Database {
    /// Unarchived conversations for the user, newest activity first.
    pub fn list_conversations(&self, user_id: i64) -> Result<Vec<ConversationSummary>> {
        self.with_tx(|tx| {
            let cores =
                conversation_cores(tx, user_id, ArchiveFilter::Active, CONVERSATION_PAGE_SIZE, 0)?;
            summaries(tx, user_id, cores)
        })
    }

    /// Offset/limit window over the unarchived list, with the next-page
    /// cursor derived from the total count. Offset math is done in `i64`
    /// since the page number comes straight from the client.
    pub fn list_conversations_page(&self, user_id: i64, page: u32) -> Result<ConversationListPage> {
        self.with_tx(|tx| {
            let total = count_active_conversations(tx, user_id)?;
            let cores = conversation_cores(
                tx,
                user_id,
                ArchiveFilter::Active,
                CONVERSATION_PAGE_SIZE,
                i64::from(page) * i64::from(CONVERSATION_PAGE_SIZE),
            )?;
            let conversations = summaries(tx, user_id, cores)?;

            let next = if total > (i64::from(page) + 1) * i64::from(CONVERSATION_PAGE_SIZE) {
                page.checked_add(1)
            } else {
                None
            };
            Ok(ConversationListPage {
                conversations,
                next,
            })
        })
    }

    /// Conversations the user archived (or that were archived outright).
    pub fn list_archived_conversations(&self, user_id: i64) -> Result<Vec<ConversationSummary>> {
        self.with_tx(|tx| {
            let cores = conversation_cores(
                tx,
                user_id,
                ArchiveFilter::Archived,
                CONVERSATION_PAGE_SIZE,
                0,
            )?;
            summaries(tx, user_id, cores)
        })
    }

    /// Detail view by public slug. A caller who is not a participant gets
    /// `ConversationNotFound`; absent and not-visible are deliberately
    /// indistinguishable.
    pub fn get_conversation(&self, user_id: i64, slug: &str) -> Result<ConversationData> {
        self.with_tx(|tx| {
            let core = tx
                .query_row(
                    "SELECT c.id, c.slug, c.last_active, p.permission
                     FROM conversations c
                     JOIN conversation_participants p
                       ON p.conversation_id = c.id AND p.user_id = ?1
                     WHERE c.slug = ?2",
                    params![user_id, slug],
                    map_core,
                )
                .optional()?
                .ok_or(StoreError::ConversationNotFound)?;

            let participants = participants_for(tx, &[core.id])?
                .remove(&core.id)
                .unwrap_or_default();
            let participant = participants
                .iter()
                .find(|p| p.user_id != user_id)
                .cloned()
                .ok_or(StoreError::ConversationNotFound)?;

            let total = message_count(tx, core.id)?;
            let messages = message_page(tx, core.id, 0)?;

            Ok(ConversationData {
                conversation: ConversationDetail {
                    id: core.id,
                    slug: core.slug,
                    last_active: parse_timestamp(&core.last_active),
                    permission: core.permission,
                    participant,
                    participants,
                    messages,
                },
                next: next_page(total, 0),
            })
        })
    }

    /// Older message pages for the detail view.
    pub fn list_messages(&self, user_id: i64, slug: &str, page: u32) -> Result<MessagesPage> {
        self.with_tx(|tx| {
            let conversation_id = conversation_id_by_slug(tx, slug)?;
            require_participant(tx, conversation_id, user_id)?;

            let total = message_count(tx, conversation_id)?;
            let messages = message_page(tx, conversation_id, page)?;

            Ok(MessagesPage {
                messages,
                next: next_page(total, page),
            })
        })
    }

    /// Bulk-mark every message from the other side as read. Idempotent;
    /// the viewer's own messages are never touched.
    pub fn mark_read(&self, user_id: i64, slug: &str) -> Result<()> {
        self.with_tx(|tx| {
            let conversation_id = conversation_id_by_slug(tx, slug)?;
            require_participant(tx, conversation_id, user_id)?;

            tx.execute(
                "UPDATE messages SET read = 1
                 WHERE conversation_id = ?1 AND sender_id != ?2 AND read = 0",
                params![conversation_id, user_id],
            )?;
            Ok(())
        })
    }

    /// Archive the caller's own view of the conversation. The other
    /// participant's row is untouched.
    pub fn archive_conversation(&self, user_id: i64, conversation_id: i64) -> Result<()> {
        self.set_participant_archived(user_id, conversation_id, true)
    }

    /// Undo the caller's archive and return the refreshed summary.
    pub fn unarchive_conversation(
        &self,
        user_id: i64,
        conversation_id: i64,
    ) -> Result<ConversationSummary> {
        self.set_participant_archived(user_id, conversation_id, false)?;

        self.with_tx(|tx| {
            let core = tx
                .query_row(
                    "SELECT c.id, c.slug, c.last_active, p.permission
                     FROM conversations c
                     JOIN conversation_participants p
                       ON p.conversation_id = c.id AND p.user_id = ?1
                     WHERE c.id = ?2",
                    params![user_id, conversation_id],
                    map_core,
                )
                .optional()?
                .ok_or(StoreError::ConversationNotFound)?;

            summaries(tx, user_id, vec![core])?
                .pop()
                .ok_or(StoreError::ConversationNotFound)
        })
    }

    fn set_participant_archived(
        &self,
        user_id: i64,
        conversation_id: i64,
        archived: bool,
    ) -> Result<()> {
        self.with_tx(|tx| {
            require_participant(tx, conversation_id, user_id)?;
            tx.execute(
                "UPDATE conversation_participants SET archived = ?1
                 WHERE conversation_id = ?2 AND user_id = ?3",
                params![archived, conversation_id, user_id],
            )?;
            Ok(())
        })
    }

    /// Create a two-party conversation: the conversation row, an owner
    /// row for the creator, a participant row for the other user, and
    /// the opening message, all in one transaction.
    pub fn create_conversation(
        &self,
        creator_id: i64,
        other_user_id: i64,
        content: &str,
    ) -> Result<CreatedConversation> {
        if content.trim().is_empty() {
            return Err(StoreError::EmptyContent);
        }
        if creator_id == other_user_id {
            return Err(StoreError::InvalidRecipient);
        }

        self.with_tx(|tx| {
            let other: UserProfile = tx
                .query_row(
                    "SELECT id, slug, first_name, last_name FROM users WHERE id = ?1",
                    [other_user_id],
                    |row| {
                        Ok(UserProfile {
                            id: row.get(0)?,
                            slug: row.get(1)?,
                            first_name: row.get(2)?,
                            last_name: row.get(3)?,
                        })
                    },
                )
                .optional()?
                .ok_or(StoreError::UserNotFound)?;

            let slug = generate_slug();
            let now = now_string();
            tx.execute(
                "INSERT INTO conversations (slug, creator_id, created_at, last_active)
                 VALUES (?1, ?2, ?3, ?3)",
                params![slug, creator_id, now],
            )?;
            let conversation_id = tx.last_insert_rowid();

            tx.execute(
                "INSERT INTO conversation_participants (conversation_id, user_id, permission)
                 VALUES (?1, ?2, 'owner'), (?1, ?3, 'participant')",
                params![conversation_id, creator_id, other_user_id],
            )?;

            tx.execute(
                "INSERT INTO messages (conversation_id, sender_id, content, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![conversation_id, creator_id, content, now],
            )?;
            let message =
                get_message(tx, tx.last_insert_rowid())?.ok_or(StoreError::MessageNotFound)?;

            let conversation = ConversationSummary {
                id: conversation_id,
                slug: slug.clone(),
                last_active: parse_timestamp(&now),
                permission: Permission::Owner,
                participant: ParticipantInfo {
                    user_id: other.id,
                    permission: Permission::Participant,
                    user: other.clone(),
                },
                // The creator has nothing unread in a conversation that
                // only holds their own message.
                read: true,
                last_message: Some(message.clone()),
            };

            Ok(CreatedConversation {
                conversation,
                message,
                conversation_slug: slug,
                recipient_slug: other.slug,
            })
        })
    }
}
