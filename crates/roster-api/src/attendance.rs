use axum::{
    Extension, Json,
    extract::State,
};
use chrono::NaiveDate;
use tracing::info;

use roster_db::Database;
use roster_types::api::{AttendanceList, AttendanceQuery, RecordAttendanceRequest};
use roster_types::{Attendance, AttendanceStatus, Principal};

use crate::access::{enrolled_classroom, owned_classroom};
use crate::error::AppError;
use crate::extractors::{AppJson, AppPath, AppQuery};
use crate::middleware::Caller;
use crate::state::{AppState, blocking};

/// Mark one enrolled student for one day. Re-marking the same day replaces
/// the earlier status.
pub fn record_attendance(
    db: &Database,
    caller: &impl Principal,
    classroom_id: i64,
    student_id: i64,
    date: NaiveDate,
    status: AttendanceStatus,
) -> Result<Attendance, AppError> {
    let class = owned_classroom(db, caller, classroom_id)?;
    if !db.is_enrolled(student_id, class.id)? {
        return Err(AppError::NotFound("enrolled student".into()));
    }

    let record = db.record_attendance(class.id, student_id, date, status)?;
    info!(classroom_id, student_id, %date, %status, "attendance recorded");
    Ok(record)
}

pub fn list_attendance(
    db: &Database,
    caller: &impl Principal,
    classroom_id: i64,
    date: Option<NaiveDate>,
) -> Result<Vec<Attendance>, AppError> {
    let class = owned_classroom(db, caller, classroom_id)?;
    Ok(db.list_attendance(class.id, date)?)
}

pub fn my_attendance(db: &Database, caller: &impl Principal, classroom_id: i64) -> Result<Vec<Attendance>, AppError> {
    let class = enrolled_classroom(db, caller, classroom_id)?;
    Ok(db.list_attendance_for_student(class.id, caller.id())?)
}

// -- Handlers --

pub async fn record(
    State(state): State<AppState>,
    AppPath(classroom_id): AppPath<i64>,
    Extension(caller): Extension<Caller>,
    AppJson(req): AppJson<RecordAttendanceRequest>,
) -> Result<Json<Attendance>, AppError> {
    let row = blocking(&state, move |s| {
        record_attendance(&s.db, &caller, classroom_id, req.student_id, req.date, req.status)
    })
    .await?;
    Ok(Json(row))
}

pub async fn list(
    State(state): State<AppState>,
    AppPath(classroom_id): AppPath<i64>,
    AppQuery(query): AppQuery<AttendanceQuery>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<AttendanceList>, AppError> {
    let records = blocking(&state, move |s| list_attendance(&s.db, &caller, classroom_id, query.date)).await?;
    Ok(Json(AttendanceList {
        classroom_id,
        records,
    }))
}

pub async fn mine(
    State(state): State<AppState>,
    AppPath(classroom_id): AppPath<i64>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<AttendanceList>, AppError> {
    let records = blocking(&state, move |s| my_attendance(&s.db, &caller, classroom_id)).await?;
    Ok(Json(AttendanceList {
        classroom_id,
        records,
    }))
}

#[cfg(test)]
mod tests {
    use roster_types::{Role, User};

    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 10, d).unwrap()
    }

    fn setup() -> (Database, User, User, User, i64) {
        let db = Database::open_in_memory().unwrap();
        let teacher = db.create_user("teacher", "h", Role::Teacher).unwrap();
        let student = db.create_user("student", "h", Role::Student).unwrap();
        let stranger = db.create_user("stranger", "h", Role::Student).unwrap();
        let class = db.create_classroom(teacher.id, "Algebra").unwrap();
        db.join_classroom(student.id, &class.join_code).unwrap();
        (db, teacher, student, stranger, class.id)
    }

    #[test]
    fn owner_records_for_enrolled_students_only() {
        let (db, teacher, student, stranger, class) = setup();

        let row = record_attendance(&db, &teacher, class, student.id, day(1), AttendanceStatus::Present).unwrap();
        assert_eq!(row.status, AttendanceStatus::Present);

        assert!(matches!(
            record_attendance(&db, &teacher, class, stranger.id, day(1), AttendanceStatus::Present),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            record_attendance(&db, &student, class, student.id, day(1), AttendanceStatus::Present),
            Err(AppError::Unauthorized)
        ));
    }

    #[test]
    fn correction_keeps_a_single_record() {
        let (db, teacher, student, _, class) = setup();
        record_attendance(&db, &teacher, class, student.id, day(2), AttendanceStatus::Absent).unwrap();
        record_attendance(&db, &teacher, class, student.id, day(2), AttendanceStatus::Leave).unwrap();

        let rows = list_attendance(&db, &teacher, class, Some(day(2))).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, AttendanceStatus::Leave);
    }

    #[test]
    fn students_see_only_their_own_rows() {
        let (db, teacher, student, stranger, class) = setup();
        record_attendance(&db, &teacher, class, student.id, day(3), AttendanceStatus::Present).unwrap();

        let mine = my_attendance(&db, &student, class).unwrap();
        assert_eq!(mine.len(), 1);
        assert_eq!(mine[0].student_id, student.id);

        assert!(matches!(
            my_attendance(&db, &stranger, class),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            list_attendance(&db, &student, class, None),
            Err(AppError::Unauthorized)
        ));
    }
}
