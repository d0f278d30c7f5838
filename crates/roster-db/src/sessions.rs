use tracing::debug;

use crate::{Database, Result};

impl Database {
    /// Mark a token id as logged out until `expires_at` (unix seconds).
    /// Revocations whose tokens have already expired are pruned on the way.
    pub fn revoke_token(&self, jti: &str, expires_at: i64, now: i64) -> Result<()> {
        self.with_conn(|conn| {
            let pruned = conn.execute("DELETE FROM revoked_tokens WHERE expires_at <= ?1", [now])?;
            if pruned > 0 {
                debug!(pruned, "pruned expired token revocations");
            }
            conn.execute(
                "INSERT OR IGNORE INTO revoked_tokens (jti, expires_at) VALUES (?1, ?2)",
                (jti, expires_at),
            )?;
            Ok(())
        })
    }

    pub fn is_token_revoked(&self, jti: &str) -> Result<bool> {
        self.with_conn(|conn| {
            Ok(conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE jti = ?1)",
                [jti],
                |r| r.get(0),
            )?)
        })
    }
}
