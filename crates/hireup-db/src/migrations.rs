use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS users (
            id            INTEGER PRIMARY KEY AUTOINCREMENT,
            slug          TEXT NOT NULL UNIQUE,
            first_name    TEXT NOT NULL,
            last_name     TEXT NOT NULL,
            account_type  TEXT NOT NULL DEFAULT 'user'
                          CHECK (account_type IN ('user', 'recruiter', 'admin')),
            created_at    TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id          TEXT PRIMARY KEY,
            user_id     INTEGER NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            is_valid    INTEGER NOT NULL DEFAULT 1,
            expires_at  TEXT NOT NULL,
            created_at  TEXT NOT NULL DEFAULT (datetime('now'))
        );

        CREATE INDEX IF NOT EXISTS idx_sessions_user
            ON sessions(user_id);

        CREATE TABLE IF NOT EXISTS conversations (
            id           INTEGER PRIMARY KEY AUTOINCREMENT,
            slug         TEXT NOT NULL UNIQUE,
            creator_id   INTEGER NOT NULL REFERENCES users(id),
            created_at   TEXT NOT NULL,
            last_active  TEXT NOT NULL,
            archived     INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_conversations_creator
            ON conversations(creator_id);
        CREATE INDEX IF NOT EXISTS idx_conversations_archived
            ON conversations(archived);

        CREATE TABLE IF NOT EXISTS conversation_participants (
            conversation_id  INTEGER NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
            user_id          INTEGER NOT NULL REFERENCES users(id),
            permission       TEXT NOT NULL DEFAULT 'participant'
                             CHECK (permission IN ('owner', 'participant')),
            archived         INTEGER NOT NULL DEFAULT 0,
            PRIMARY KEY (conversation_id, user_id)
        );

        CREATE INDEX IF NOT EXISTS idx_participants_user
            ON conversation_participants(user_id);
        CREATE INDEX IF NOT EXISTS idx_participants_archived
            ON conversation_participants(archived);

        CREATE TABLE IF NOT EXISTS messages (
            id               INTEGER PRIMARY KEY AUTOINCREMENT,
            conversation_id  INTEGER NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
            sender_id        INTEGER NOT NULL REFERENCES users(id),
            reply_id         INTEGER REFERENCES messages(id),
            content          TEXT NOT NULL,
            read             INTEGER NOT NULL DEFAULT 0,
            deleted          INTEGER NOT NULL DEFAULT 0,
            created_at       TEXT NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_messages_conversation
            ON messages(conversation_id);
        CREATE INDEX IF NOT EXISTS idx_messages_conversation_created
            ON messages(conversation_id, created_at);
        ",
    )?;

    info!("Database migrations complete");
    Ok(())
}
