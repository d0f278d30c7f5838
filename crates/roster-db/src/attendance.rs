use chrono::NaiveDate;

use roster_types::{Attendance, AttendanceStatus};

use crate::error::is_foreign_key_violation;
use crate::models::{ATTENDANCE_COLUMNS, attendance};
use crate::{Database, DbError, Result};

impl Database {
    /// Upsert the status for one student on one day. A second record for
    /// the same (classroom, student, date) replaces the status in place.
    pub fn record_attendance(
        &self,
        classroom_id: i64,
        student_id: i64,
        date: NaiveDate,
        status: AttendanceStatus,
    ) -> Result<Attendance> {
        self.with_conn(|conn| {
            let sql = format!(
                "INSERT INTO attendance (classroom_id, student_id, date, status)
                 VALUES (?1, ?2, ?3, ?4)
                 ON CONFLICT (classroom_id, student_id, date) DO UPDATE SET status = excluded.status
                 RETURNING {}",
                ATTENDANCE_COLUMNS
            );
            conn.query_row(
                &sql,
                rusqlite::params![classroom_id, student_id, date, status.as_str()],
                attendance,
            )
            .map_err(|e| {
                if is_foreign_key_violation(&e) {
                    DbError::NotFound("classroom or student")
                } else {
                    e.into()
                }
            })
        })
    }

    /// All records for a classroom, optionally limited to one day.
    pub fn list_attendance(&self, classroom_id: i64, date: Option<NaiveDate>) -> Result<Vec<Attendance>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM attendance
                 WHERE classroom_id = ?1 AND (?2 IS NULL OR date = ?2)
                 ORDER BY date, student_id",
                ATTENDANCE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(rusqlite::params![classroom_id, date], attendance)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }

    pub fn list_attendance_for_student(&self, classroom_id: i64, student_id: i64) -> Result<Vec<Attendance>> {
        self.with_conn(|conn| {
            let sql = format!(
                "SELECT {} FROM attendance
                 WHERE classroom_id = ?1 AND student_id = ?2
                 ORDER BY date",
                ATTENDANCE_COLUMNS
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map((classroom_id, student_id), attendance)?
                .collect::<rusqlite::Result<Vec<_>>>()?;
            Ok(rows)
        })
    }
}
