//! Access control: who may see or mutate which classroom-scoped records.
//!
//! | Operation                      | Allowed when                                 |
//! |--------------------------------|----------------------------------------------|
//! | view dashboard                 | any authenticated caller                     |
//! | create / list own classrooms   | teacher                                      |
//! | join classroom                 | student                                      |
//! | view assignments, download     | owning teacher, or student enrolled in class |
//! | upload assignment              | owning teacher                               |
//! | roster, attendance record/list | owning teacher                               |
//! | own attendance                 | student enrolled in class                    |
//!
//! Every check runs before any write. An absent classroom or assignment is
//! `NotFound`; one that exists but is out of reach is `Unauthorized`.

use tracing::warn;

use roster_db::Database;
use roster_types::{Assignment, Classroom, Principal, Role};

use crate::error::AppError;

/// How a caller relates to a particular classroom.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Relation {
    Owner,
    Enrolled,
    Outsider,
}

pub fn require_role(caller: &impl Principal, role: Role) -> Result<(), AppError> {
    if caller.role() == role {
        Ok(())
    } else {
        warn!(caller = caller.id(), required = %role, "role check failed");
        Err(AppError::Unauthorized)
    }
}

pub fn relation(db: &Database, caller: &impl Principal, class: &Classroom) -> Result<Relation, AppError> {
    Ok(match caller.role() {
        Role::Teacher if class.teacher_id == caller.id() => Relation::Owner,
        Role::Student if db.is_enrolled(caller.id(), class.id)? => Relation::Enrolled,
        _ => Relation::Outsider,
    })
}

fn load_classroom(db: &Database, classroom_id: i64) -> Result<Classroom, AppError> {
    db.get_classroom(classroom_id)?
        .ok_or_else(|| AppError::NotFound("classroom".into()))
}

fn deny(caller: &impl Principal, classroom_id: i64) -> AppError {
    warn!(caller = caller.id(), classroom_id, "classroom access denied");
    AppError::Unauthorized
}

/// The classroom, provided the caller is the teacher who owns it.
pub fn owned_classroom(db: &Database, caller: &impl Principal, classroom_id: i64) -> Result<Classroom, AppError> {
    require_role(caller, Role::Teacher)?;
    let class = load_classroom(db, classroom_id)?;
    if class.teacher_id != caller.id() {
        return Err(deny(caller, classroom_id));
    }
    Ok(class)
}

/// The classroom, provided the caller is a student enrolled in it.
pub fn enrolled_classroom(db: &Database, caller: &impl Principal, classroom_id: i64) -> Result<Classroom, AppError> {
    require_role(caller, Role::Student)?;
    let class = load_classroom(db, classroom_id)?;
    match relation(db, caller, &class)? {
        Relation::Enrolled => Ok(class),
        _ => Err(deny(caller, classroom_id)),
    }
}

/// The classroom, provided the caller owns it or is enrolled in it.
pub fn visible_classroom(db: &Database, caller: &impl Principal, classroom_id: i64) -> Result<Classroom, AppError> {
    let class = load_classroom(db, classroom_id)?;
    match relation(db, caller, &class)? {
        Relation::Owner | Relation::Enrolled => Ok(class),
        Relation::Outsider => Err(deny(caller, classroom_id)),
    }
}

/// The assignment, provided its classroom is visible to the caller.
pub fn visible_assignment(db: &Database, caller: &impl Principal, assignment_id: i64) -> Result<Assignment, AppError> {
    let assignment = db
        .get_assignment(assignment_id)?
        .ok_or_else(|| AppError::NotFound("assignment".into()))?;
    visible_classroom(db, caller, assignment.classroom_id)?;
    Ok(assignment)
}
