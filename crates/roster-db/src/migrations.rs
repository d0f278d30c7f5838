use rusqlite::Connection;
use tracing::info;

use crate::Result;

pub fn run(conn: &Connection) -> Result<()> {
    conn.execute_batch("CREATE TABLE IF NOT EXISTS schema_version (version INTEGER NOT NULL);")?;

    let version: i64 = conn.query_row(
        "SELECT COALESCE(MAX(version), 0) FROM schema_version",
        [],
        |r| r.get(0),
    )?;

    if version < 1 {
        info!("Running migration v1 (initial schema)");
        conn.execute_batch(
            "
            CREATE TABLE users (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                username    TEXT NOT NULL UNIQUE,
                password    TEXT NOT NULL,
                role        TEXT NOT NULL CHECK (role IN ('teacher', 'student')),
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE TABLE classrooms (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                name        TEXT NOT NULL,
                join_code   TEXT NOT NULL UNIQUE CHECK (length(join_code) = 8),
                teacher_id  INTEGER NOT NULL REFERENCES users(id),
                created_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_classrooms_teacher ON classrooms(teacher_id);

            CREATE TABLE enrollments (
                id          INTEGER PRIMARY KEY AUTOINCREMENT,
                student_id  INTEGER NOT NULL REFERENCES users(id),
                class_id    INTEGER NOT NULL REFERENCES classrooms(id),
                created_at  TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (student_id, class_id)
            );

            CREATE INDEX idx_enrollments_class ON enrollments(class_id);

            CREATE TABLE assignments (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                filename      TEXT NOT NULL,
                classroom_id  INTEGER NOT NULL REFERENCES classrooms(id),
                artifact_key  TEXT NOT NULL UNIQUE,
                size          INTEGER NOT NULL,
                sha256        TEXT NOT NULL,
                created_at    TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_assignments_classroom ON assignments(classroom_id);

            -- One row per (classroom, student, day); re-recording overwrites.
            CREATE TABLE attendance (
                id            INTEGER PRIMARY KEY AUTOINCREMENT,
                classroom_id  INTEGER NOT NULL REFERENCES classrooms(id),
                student_id    INTEGER NOT NULL REFERENCES users(id),
                date          TEXT NOT NULL,
                status        TEXT NOT NULL CHECK (status IN ('Present', 'Absent', 'Leave')),
                UNIQUE (classroom_id, student_id, date)
            );

            INSERT INTO schema_version (version) VALUES (1);
            ",
        )?;
    }

    if version < 2 {
        info!("Running migration v2 (revoked tokens)");
        conn.execute_batch(
            "
            CREATE TABLE revoked_tokens (
                jti         TEXT PRIMARY KEY,
                expires_at  INTEGER NOT NULL,
                revoked_at  TEXT NOT NULL DEFAULT (datetime('now'))
            );

            CREATE INDEX idx_revoked_tokens_expiry ON revoked_tokens(expires_at);

            INSERT INTO schema_version (version) VALUES (2);
            ",
        )?;
    }

    info!("Database migrations complete");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn migrations_are_idempotent() {
        let conn = Connection::open_in_memory().unwrap();
        run(&conn).unwrap();
        run(&conn).unwrap();

        let version: i64 = conn
            .query_row("SELECT MAX(version) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(version, 2);

        let rows: i64 = conn
            .query_row("SELECT COUNT(*) FROM schema_version", [], |r| r.get(0))
            .unwrap();
        assert_eq!(rows, 2);
    }
}
