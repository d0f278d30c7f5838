//! Database row types and row mappers.
//! `UserRow` is distinct from the public `User` so the password hash stays
//! inside the store and credential layer.
use std::fmt;
use std::str::FromStr;

use chrono::NaiveDateTime;
use rusqlite::Row;
use rusqlite::types::Type;

use roster_types::{Assignment, Attendance, Classroom, Enrollment, Role, User};

pub struct UserRow {
    pub id: i64,
    pub username: String,
    pub password_hash: String,
    pub role: Role,
    pub created_at: NaiveDateTime,
}

impl UserRow {
    pub fn into_user(self) -> User {
        User {
            id: self.id,
            username: self.username,
            role: self.role,
            created_at: self.created_at,
        }
    }
}

/// Result of redeeming a join code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JoinOutcome {
    Joined(Enrollment),
    AlreadyEnrolled(Enrollment),
    UnknownCode,
}

impl JoinOutcome {
    pub fn enrollment(&self) -> Option<&Enrollment> {
        match self {
            JoinOutcome::Joined(e) | JoinOutcome::AlreadyEnrolled(e) => Some(e),
            JoinOutcome::UnknownCode => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewAssignment {
    pub classroom_id: i64,
    pub filename: String,
    pub artifact_key: String,
    pub size: i64,
    pub sha256: String,
}

pub(crate) const USER_COLUMNS: &str = "id, username, password, role, created_at";
pub(crate) const CLASSROOM_COLUMNS: &str = "id, name, join_code, teacher_id, created_at";
pub(crate) const ASSIGNMENT_COLUMNS: &str =
    "id, filename, classroom_id, artifact_key, size, sha256, created_at";
pub(crate) const ATTENDANCE_COLUMNS: &str = "id, classroom_id, student_id, date, status";

fn parse_text<T>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T>
where
    T: FromStr,
    T::Err: fmt::Display,
{
    let raw: String = row.get(idx)?;
    raw.parse::<T>()
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, e.to_string().into()))
}

pub(crate) fn user_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        password_hash: row.get(2)?,
        role: parse_text(row, 3)?,
        created_at: row.get(4)?,
    })
}

pub(crate) fn classroom(row: &Row<'_>) -> rusqlite::Result<Classroom> {
    Ok(Classroom {
        id: row.get(0)?,
        name: row.get(1)?,
        join_code: row.get(2)?,
        teacher_id: row.get(3)?,
        created_at: row.get(4)?,
    })
}

pub(crate) fn enrollment(row: &Row<'_>) -> rusqlite::Result<Enrollment> {
    Ok(Enrollment {
        id: row.get(0)?,
        student_id: row.get(1)?,
        class_id: row.get(2)?,
    })
}

pub(crate) fn assignment(row: &Row<'_>) -> rusqlite::Result<Assignment> {
    Ok(Assignment {
        id: row.get(0)?,
        filename: row.get(1)?,
        classroom_id: row.get(2)?,
        artifact_key: row.get(3)?,
        size: row.get(4)?,
        sha256: row.get(5)?,
        created_at: row.get(6)?,
    })
}

pub(crate) fn attendance(row: &Row<'_>) -> rusqlite::Result<Attendance> {
    Ok(Attendance {
        id: row.get(0)?,
        classroom_id: row.get(1)?,
        student_id: row.get(2)?,
        date: row.get(3)?,
        status: parse_text(row, 4)?,
    })
}
