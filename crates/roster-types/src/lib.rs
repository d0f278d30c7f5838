pub mod api;
pub mod models;

pub use models::{
    Assignment, Attendance, AttendanceStatus, Classroom, Enrollment, Principal, Role, User,
};
