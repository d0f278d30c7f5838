use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Assignment, Attendance, AttendanceStatus, Classroom, Role, User};

// -- JWT Claims --

/// Token claims. Canonical definition shared by token issuing and the auth
/// middleware so the two never drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Username.
    pub sub: String,
    pub uid: i64,
    pub role: Role,
    pub exp: usize,
    /// Token id, recorded on logout so the token stops working.
    pub jti: String,
}

// -- Auth --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    /// Kept as a string so an unknown role is a validation error, not a
    /// deserialization failure.
    pub role: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub user_id: i64,
    pub username: String,
    pub role: Role,
    pub token: String,
}

// -- Classrooms --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CreateClassroomRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct JoinClassroomRequest {
    pub code: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStatus {
    Joined,
    AlreadyEnrolled,
    UnknownCode,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JoinClassroomResponse {
    pub status: JoinStatus,
    pub classroom_id: Option<i64>,
}

// -- Dashboard --

#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum Dashboard {
    Teacher {
        user: User,
        classrooms: Vec<Classroom>,
    },
    Student {
        user: User,
        classrooms: Vec<Classroom>,
        assignments: Vec<Assignment>,
    },
}

// -- Assignments --

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub filename: String,
}

// -- Attendance --

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RecordAttendanceRequest {
    pub student_id: i64,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
}

#[derive(Debug, Deserialize)]
pub struct AttendanceQuery {
    pub date: Option<NaiveDate>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AttendanceList {
    pub classroom_id: i64,
    pub records: Vec<Attendance>,
}
