use chrono::Duration;
use rusqlite::{params, OptionalExtension};

use hireup_types::api::Session;
use hireup_types::models::AccountType;

use crate::util::{generate_slug, now_string};
use crate::{Database, Result, StoreError};

impl Database {
    pub fn create_user(
        &self,
        slug: &str,
        first_name: &str,
        last_name: &str,
        account_type: AccountType,
    ) -> Result<i64> {
        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO users (slug, first_name, last_name, account_type)
                 VALUES (?1, ?2, ?3, ?4)",
                params![slug, first_name, last_name, account_type.as_str()],
            )?;
            Ok(conn.last_insert_rowid())
        })
    }

    /// Issue a session token for a user. Expiry can be negative in tests.
    pub fn create_session(&self, user_id: i64, ttl: Duration) -> Result<String> {
        let token = generate_slug();
        let expires_at = (chrono::Utc::now() + ttl)
            .to_rfc3339_opts(chrono::SecondsFormat::Micros, true);

        self.with_conn(|conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, expires_at) VALUES (?1, ?2, ?3)",
                params![token, user_id, expires_at],
            )?;
            Ok(())
        })?;

        Ok(token)
    }

    /// Resolve a session token. Invalid, expired, or unknown tokens all
    /// resolve to `None`.
    pub fn get_session(&self, token: &str) -> Result<Option<Session>> {
        self.with_conn(|conn| {
            let row = conn
                .query_row(
                    "SELECT s.id, u.id, u.slug, u.account_type
                     FROM sessions s
                     JOIN users u ON u.id = s.user_id
                     WHERE s.id = ?1 AND s.is_valid = 1 AND s.expires_at > ?2",
                    params![token, now_string()],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, i64>(1)?,
                            row.get::<_, String>(2)?,
                            row.get::<_, String>(3)?,
                        ))
                    },
                )
                .optional()?;

            let Some((session_id, user_id, user_slug, account_type)) = row else {
                return Ok(None);
            };

            let account_type =
                AccountType::from_str(&account_type).ok_or(StoreError::UserNotFound)?;

            Ok(Some(Session {
                session_id,
                user_id,
                user_slug,
                account_type,
            }))
        })
    }
}
