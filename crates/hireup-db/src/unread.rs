use std::collections::HashMap;

use rusqlite::Connection;

use crate::{Database, Result};

/// Unread counts for a batch of conversations as seen by one user, in a
/// single grouped query. A conversation with no unread messages has no
/// entry in the returned map.
///
/// Always recomputed from message rows; there is no denormalized counter
/// to drift under concurrent writes.
pub fn unread_counts(
    conn: &Connection,
    user_id: i64,
    conversation_ids: &[i64],
) -> Result<HashMap<i64, i64>> {
    if conversation_ids.is_empty() {
        return Ok(HashMap::new());
    }

    let placeholders: Vec<String> = (0..conversation_ids.len())
        .map(|i| format!("?{}", i + 2))
        .collect();
    let sql = format!(
        "SELECT conversation_id, COUNT(*)
         FROM messages
         WHERE read = 0 AND sender_id != ?1 AND conversation_id IN ({})
         GROUP BY conversation_id",
        placeholders.join(", ")
    );

    let mut stmt = conn.prepare(&sql)?;
    let mut params: Vec<&dyn rusqlite::types::ToSql> = vec![&user_id];
    for id in conversation_ids {
        params.push(id);
    }

    let counts = stmt
        .query_map(params.as_slice(), |row| {
            Ok((row.get::<_, i64>(0)?, row.get::<_, i64>(1)?))
        })?
        .collect::<std::result::Result<HashMap<_, _>, _>>()?;

    Ok(counts)
}

impl Database {
    /// Unread count for a single (conversation, user) pair.
    pub fn unread_count(&self, user_id: i64, conversation_id: i64) -> Result<i64> {
        self.with_conn(|conn| {
            let counts = unread_counts(conn, user_id, &[conversation_id])?;
            Ok(counts.get(&conversation_id).copied().unwrap_or(0))
        })
    }
}
