use axum::{
    Extension, Json,
    extract::State,
    http::StatusCode,
    response::IntoResponse,
};
use tracing::info;

use roster_db::{Database, JoinOutcome};
use roster_types::api::{
    CreateClassroomRequest, JoinClassroomRequest, JoinClassroomResponse, JoinStatus,
};
use roster_types::{Classroom, Principal, Role, User};

use crate::access::{owned_classroom, require_role};
use crate::error::AppError;
use crate::extractors::{AppJson, AppPath};
use crate::middleware::Caller;
use crate::state::{AppState, blocking};

const MAX_NAME_LEN: usize = 150;

pub fn create_classroom(db: &Database, caller: &impl Principal, name: &str) -> Result<Classroom, AppError> {
    require_role(caller, Role::Teacher)?;

    let name = name.trim();
    if name.is_empty() || name.chars().count() > MAX_NAME_LEN {
        return Err(AppError::Validation(format!(
            "classroom name must be 1-{} characters",
            MAX_NAME_LEN
        )));
    }

    let class = db.create_classroom(caller.id(), name)?;
    info!(classroom_id = class.id, teacher_id = caller.id(), "created classroom {}", class.name);
    Ok(class)
}

/// Teachers see the classrooms they own, students the ones they joined.
pub fn list_classrooms(db: &Database, caller: &impl Principal) -> Result<Vec<Classroom>, AppError> {
    Ok(match caller.role() {
        Role::Teacher => db.list_classrooms_for_teacher(caller.id())?,
        Role::Student => db.list_classrooms_for_student(caller.id())?,
    })
}

pub fn join_classroom(db: &Database, caller: &impl Principal, code: &str) -> Result<JoinOutcome, AppError> {
    require_role(caller, Role::Student)?;

    let outcome = db.join_classroom(caller.id(), code)?;
    match &outcome {
        JoinOutcome::Joined(e) => info!(student_id = e.student_id, classroom_id = e.class_id, "joined classroom"),
        JoinOutcome::AlreadyEnrolled(_) => {}
        JoinOutcome::UnknownCode => info!(student_id = caller.id(), "join code matched no classroom"),
    }
    Ok(outcome)
}

pub fn list_students(db: &Database, caller: &impl Principal, classroom_id: i64) -> Result<Vec<User>, AppError> {
    let class = owned_classroom(db, caller, classroom_id)?;
    Ok(db.list_students(class.id)?)
}

// -- Handlers --

pub async fn create(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppJson(req): AppJson<CreateClassroomRequest>,
) -> Result<impl IntoResponse, AppError> {
    let class = blocking(&state, move |s| create_classroom(&s.db, &caller, &req.name)).await?;
    Ok((StatusCode::CREATED, Json(class)))
}

pub async fn list(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<Classroom>>, AppError> {
    let classes = blocking(&state, move |s| list_classrooms(&s.db, &caller)).await?;
    Ok(Json(classes))
}

pub async fn join(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    AppJson(req): AppJson<JoinClassroomRequest>,
) -> Result<Json<JoinClassroomResponse>, AppError> {
    let outcome = blocking(&state, move |s| join_classroom(&s.db, &caller, &req.code)).await?;

    let status = match outcome {
        JoinOutcome::Joined(_) => JoinStatus::Joined,
        JoinOutcome::AlreadyEnrolled(_) => JoinStatus::AlreadyEnrolled,
        JoinOutcome::UnknownCode => JoinStatus::UnknownCode,
    };
    Ok(Json(JoinClassroomResponse {
        status,
        classroom_id: outcome.enrollment().map(|e| e.class_id),
    }))
}

pub async fn students(
    State(state): State<AppState>,
    AppPath(classroom_id): AppPath<i64>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Vec<User>>, AppError> {
    let users = blocking(&state, move |s| list_students(&s.db, &caller, classroom_id)).await?;
    Ok(Json(users))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (Database, User, User) {
        let db = Database::open_in_memory().unwrap();
        let teacher = db.create_user("teacher", "h", Role::Teacher).unwrap();
        let student = db.create_user("student", "h", Role::Student).unwrap();
        (db, teacher, student)
    }

    #[test]
    fn only_teachers_create_classrooms() {
        let (db, teacher, student) = setup();
        assert!(create_classroom(&db, &teacher, "Algebra").is_ok());
        assert!(matches!(
            create_classroom(&db, &student, "Algebra"),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            create_classroom(&db, &teacher, "   "),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn only_students_join() {
        let (db, teacher, student) = setup();
        let class = create_classroom(&db, &teacher, "Algebra").unwrap();

        assert!(matches!(
            join_classroom(&db, &teacher, &class.join_code),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            join_classroom(&db, &student, &class.join_code).unwrap(),
            JoinOutcome::Joined(_)
        ));
        assert!(matches!(
            join_classroom(&db, &student, &class.join_code).unwrap(),
            JoinOutcome::AlreadyEnrolled(_)
        ));
        assert_eq!(
            join_classroom(&db, &student, "BADCODE1").unwrap(),
            JoinOutcome::UnknownCode
        );
    }

    #[test]
    fn listing_is_scoped_by_role() {
        let (db, teacher, student) = setup();
        let other = db.create_user("other", "h", Role::Teacher).unwrap();
        let mine = create_classroom(&db, &teacher, "Algebra").unwrap();
        create_classroom(&db, &other, "History").unwrap();

        assert_eq!(list_classrooms(&db, &teacher).unwrap(), vec![mine.clone()]);
        assert!(list_classrooms(&db, &student).unwrap().is_empty());

        join_classroom(&db, &student, &mine.join_code).unwrap();
        assert_eq!(list_classrooms(&db, &student).unwrap(), vec![mine.clone()]);

        let roster = list_students(&db, &teacher, mine.id).unwrap();
        assert_eq!(roster.iter().map(|u| u.id).collect::<Vec<_>>(), vec![student.id]);
        assert!(matches!(
            list_students(&db, &other, mine.id),
            Err(AppError::Unauthorized)
        ));
    }
}
