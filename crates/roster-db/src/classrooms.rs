use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, warn};
use uuid::Uuid;

use roster_types::{Classroom, Enrollment, User};

use crate::error::{is_foreign_key_violation, is_unique_violation};
use crate::models::{CLASSROOM_COLUMNS, JoinOutcome, UserRow, classroom, enrollment, user_row};
use crate::{Database, DbError, Result};

/// Join codes are regenerated on a UNIQUE collision at most this many times.
pub const MAX_JOIN_CODE_ATTEMPTS: u32 = 5;

pub const JOIN_CODE_LEN: usize = 8;

/// Eight uppercase hex characters taken from a fresh v4 UUID.
pub fn generate_join_code() -> String {
    let mut code = Uuid::new_v4().simple().to_string();
    code.truncate(JOIN_CODE_LEN);
    code.make_ascii_uppercase();
    code
}

/// Codes are compared trimmed and uppercased.
pub fn normalize_join_code(code: &str) -> String {
    code.trim().to_ascii_uppercase()
}

impl Database {
    pub fn create_classroom(&self, teacher_id: i64, name: &str) -> Result<Classroom> {
        self.create_classroom_with(teacher_id, name, generate_join_code)
    }

    /// Insert a classroom, drawing join codes from `next_code` until one is
    /// accepted by the UNIQUE constraint.
    pub fn create_classroom_with<F>(
        &self,
        teacher_id: i64,
        name: &str,
        mut next_code: F,
    ) -> Result<Classroom>
    where
        F: FnMut() -> String,
    {
        self.with_conn(|conn| {
            let sql = format!(
                "INSERT INTO classrooms (name, join_code, teacher_id) VALUES (?1, ?2, ?3) RETURNING {}",
                CLASSROOM_COLUMNS
            );

            for attempt in 1..=MAX_JOIN_CODE_ATTEMPTS {
                let code = normalize_join_code(&next_code());
                match conn.query_row(&sql, (name, &code, teacher_id), classroom) {
                    Ok(created) => return Ok(created),
                    Err(e) if is_unique_violation(&e) => {
                        debug!(attempt, "join code {} already in use, regenerating", code);
                    }
                    Err(e) if is_foreign_key_violation(&e) => return Err(DbError::NotFound("teacher")),
                    Err(e) => return Err(e.into()),
                }
            }

            warn!(teacher_id, "join code generation exhausted");
            Err(DbError::ConflictRetryExhausted(MAX_JOIN_CODE_ATTEMPTS))
        })
    }

    pub fn get_classroom(&self, id: i64) -> Result<Option<Classroom>> {
        self.with_conn(|conn| {
            let sql = format!("SELECT {} FROM classrooms WHERE id = ?1", CLASSROOM_COLUMNS);
            Ok(conn.query_row(&sql, [id], classroom).optional()?)
        })
    }

    pub fn list_classrooms_for_teacher(&self, teacher_id: i64) -> Result<Vec<Classroom>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM classrooms WHERE teacher_id = ?1 ORDER BY id",
                CLASSROOM_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map([teacher_id], classroom)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Classrooms the student is enrolled in, in the order they joined.
    pub fn list_classrooms_for_student(&self, student_id: i64) -> Result<Vec<Classroom>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT c.id, c.name, c.join_code, c.teacher_id, c.created_at
                 FROM enrollments e
                 JOIN classrooms c ON c.id = e.class_id
                 WHERE e.student_id = ?1
                 ORDER BY e.id",
            )?;
            let rows = stmt
                .query_map([student_id], classroom)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    /// Redeem a join code. Unknown codes are a silent no-op and a repeated
    /// join returns the existing enrollment instead of adding a row.
    pub fn join_classroom(&self, student_id: i64, code: &str) -> Result<JoinOutcome> {
        self.with_conn(|conn| {
            let Some(class) = query_classroom_by_code(conn, code)? else {
                return Ok(JoinOutcome::UnknownCode);
            };

            let inserted = conn
                .execute(
                    "INSERT OR IGNORE INTO enrollments (student_id, class_id) VALUES (?1, ?2)",
                    (student_id, class.id),
                )
                .map_err(|e| {
                    if is_foreign_key_violation(&e) {
                        DbError::NotFound("student")
                    } else {
                        e.into()
                    }
                })?;

            let row = query_enrollment(conn, student_id, class.id)?.ok_or(DbError::NotFound("enrollment"))?;

            Ok(if inserted == 1 {
                JoinOutcome::Joined(row)
            } else {
                JoinOutcome::AlreadyEnrolled(row)
            })
        })
    }

    pub fn get_enrollment(&self, student_id: i64, class_id: i64) -> Result<Option<Enrollment>> {
        self.with_conn(|conn| query_enrollment(conn, student_id, class_id))
    }

    pub fn is_enrolled(&self, student_id: i64, class_id: i64) -> Result<bool> {
        Ok(self.get_enrollment(student_id, class_id)?.is_some())
    }

    /// Students enrolled in a classroom, in enrollment order.
    pub fn list_students(&self, class_id: i64) -> Result<Vec<User>> {
        self.with_conn(|conn| {
            let mut stmt = conn.prepare(
                "SELECT u.id, u.username, u.password, u.role, u.created_at
                 FROM enrollments e
                 JOIN users u ON u.id = e.student_id
                 WHERE e.class_id = ?1
                 ORDER BY e.id",
            )?;
            let rows = stmt
                .query_map([class_id], user_row)?
                .map(|r| r.map(UserRow::into_user))
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }
}

fn query_classroom_by_code(conn: &Connection, code: &str) -> Result<Option<Classroom>> {
    let sql = format!("SELECT {} FROM classrooms WHERE join_code = ?1", CLASSROOM_COLUMNS);
    Ok(conn
        .query_row(&sql, [normalize_join_code(code)], classroom)
        .optional()?)
}

fn query_enrollment(conn: &Connection, student_id: i64, class_id: i64) -> Result<Option<Enrollment>> {
    Ok(conn
        .query_row(
            "SELECT id, student_id, class_id FROM enrollments WHERE student_id = ?1 AND class_id = ?2",
            (student_id, class_id),
            enrollment,
        )
        .optional()?)
}
