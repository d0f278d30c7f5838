use axum::{Extension, Json, extract::State};

use roster_db::Database;
use roster_types::api::Dashboard;
use roster_types::{Assignment, Principal, Role};

use crate::error::AppError;
use crate::middleware::Caller;
use crate::state::{AppState, blocking};

/// Assignments across every classroom the student is enrolled in, in
/// enrollment order. Empty for anyone without enrollments.
pub fn assignments_for_student(db: &Database, caller: &impl Principal) -> Result<Vec<Assignment>, AppError> {
    let class_ids: Vec<i64> = db
        .list_classrooms_for_student(caller.id())?
        .iter()
        .map(|c| c.id)
        .collect();
    Ok(db.list_assignments_for_classrooms(&class_ids)?)
}

/// Teachers get their classrooms; students get enrolled classrooms plus
/// every assignment posted to them.
pub fn build_dashboard(db: &Database, caller: &impl Principal) -> Result<Dashboard, AppError> {
    // A valid token for a deleted account is treated as no session.
    let user = db.get_user_by_id(caller.id())?.ok_or(AppError::Unauthenticated)?;

    Ok(match user.role {
        Role::Teacher => Dashboard::Teacher {
            classrooms: db.list_classrooms_for_teacher(user.id)?,
            user,
        },
        Role::Student => Dashboard::Student {
            classrooms: db.list_classrooms_for_student(user.id)?,
            assignments: assignments_for_student(db, &user)?,
            user,
        },
    })
}

pub async fn dashboard(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<Dashboard>, AppError> {
    let view = blocking(&state, move |s| build_dashboard(&s.db, &caller)).await?;
    Ok(Json(view))
}

#[cfg(test)]
mod tests {
    use roster_db::NewAssignment;

    use super::*;

    fn post(db: &Database, classroom_id: i64, filename: &str) -> Assignment {
        db.create_assignment(&NewAssignment {
            classroom_id,
            filename: filename.into(),
            artifact_key: uuid::Uuid::new_v4().to_string(),
            size: 1,
            sha256: "ab".into(),
        })
        .unwrap()
    }

    #[test]
    fn student_dashboard_unions_enrolled_classrooms() {
        let db = Database::open_in_memory().unwrap();
        let teacher = db.create_user("teacher", "h", Role::Teacher).unwrap();
        let student = db.create_user("student", "h", Role::Student).unwrap();
        let algebra = db.create_classroom(teacher.id, "Algebra").unwrap();
        let biology = db.create_classroom(teacher.id, "Biology").unwrap();
        let history = db.create_classroom(teacher.id, "History").unwrap();
        db.join_classroom(student.id, &biology.join_code).unwrap();
        db.join_classroom(student.id, &algebra.join_code).unwrap();

        let hw = post(&db, algebra.id, "hw1.pdf");
        let lab = post(&db, biology.id, "lab.pdf");
        post(&db, history.id, "essay.pdf");

        match build_dashboard(&db, &student).unwrap() {
            Dashboard::Student { classrooms, assignments, .. } => {
                assert_eq!(classrooms, vec![biology, algebra]);
                assert_eq!(assignments, vec![lab, hw]);
                assert_eq!(assignments, assignments_for_student(&db, &student).unwrap());
            }
            other => panic!("expected a student dashboard, got {other:?}"),
        }
    }

    #[test]
    fn teacher_dashboard_has_no_assignments() {
        let db = Database::open_in_memory().unwrap();
        let teacher = db.create_user("teacher", "h", Role::Teacher).unwrap();
        let class = db.create_classroom(teacher.id, "Algebra").unwrap();
        post(&db, class.id, "hw1.pdf");

        match build_dashboard(&db, &teacher).unwrap() {
            Dashboard::Teacher { classrooms, user } => {
                assert_eq!(classrooms, vec![class]);
                assert_eq!(user, teacher);
            }
            other => panic!("expected a teacher dashboard, got {other:?}"),
        }
    }

    #[test]
    fn deleted_account_has_no_dashboard() {
        let db = Database::open_in_memory().unwrap();
        let ghost = roster_types::User {
            id: 42,
            username: "ghost".into(),
            role: Role::Student,
            created_at: chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
                .unwrap()
                .and_hms_opt(0, 0, 0)
                .unwrap(),
        };
        assert!(matches!(build_dashboard(&db, &ghost), Err(AppError::Unauthenticated)));
    }
}
