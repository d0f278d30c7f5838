use rusqlite::OptionalExtension;

use roster_types::{Role, User};

use crate::error::is_unique_violation;
use crate::models::{USER_COLUMNS, UserRow, user_row};
use crate::{Database, DbError, Result};

impl Database {
    /// Insert a new account. `password_hash` must already be a salted hash.
    pub fn create_user(&self, username: &str, password_hash: &str, role: Role) -> Result<User> {
        self.with_conn(|conn| {
            let sql = format!(
                "INSERT INTO users (username, password, role) VALUES (?1, ?2, ?3) RETURNING {}",
                USER_COLUMNS
            );
            conn.query_row(&sql, (username, password_hash, role.as_str()), user_row)
                .map(UserRow::into_user)
                .map_err(|e| {
                    if is_unique_violation(&e) {
                        DbError::DuplicateUsername(username.to_string())
                    } else {
                        e.into()
                    }
                })
        })
    }

    pub fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS);
            Ok(conn.query_row(&sql, [username], user_row).optional()?)
        })
    }

    pub fn get_user_by_id(&self, id: i64) -> Result<Option<User>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS);
            let row = conn.query_row(&sql, [id], user_row).optional()?;
            Ok(row.map(UserRow::into_user))
        })
    }
}
