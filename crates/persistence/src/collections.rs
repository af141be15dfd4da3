//! Collection names shared by every store adapter.

pub const USERS: &str = "users";
pub const STUDENTS: &str = "students";
pub const DEPARTMENTS: &str = "departments";
pub const CLUBS: &str = "clubs";
pub const EVENTS: &str = "events";
pub const ATTENDANCE: &str = "attendance";
pub const CLEARANCE_REQUESTS: &str = "clearance_requests";
pub const MESSAGES: &str = "messages";
pub const CREDENTIALS: &str = "credentials";
pub const SESSIONS: &str = "sessions";

pub const ALL: [&str; 10] = [
    USERS,
    STUDENTS,
    DEPARTMENTS,
    CLUBS,
    EVENTS,
    ATTENDANCE,
    CLEARANCE_REQUESTS,
    MESSAGES,
    CREDENTIALS,
    SESSIONS,
];
