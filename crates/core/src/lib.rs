//! # SSG Core
//!
//! Domain types for the student-governance clearance system.
//!
//! - `Role` / `Principal`: who is acting and what they may touch
//! - `ClearanceRequest`: three-party approval record with a derived status
//! - `User`, `Student`, `Department`, `Club`: directory entities
//! - `CampusEvent`, `AttendanceRecord`: events and QR check-in/out
//! - `Message`: internal messaging
//! - `AuditEvent`: append-only trail of mutating operations
//!
//! Nothing in this crate performs I/O.

pub mod attendance;
pub mod audit;
pub mod campus_event;
pub mod clearance;
pub mod error;
pub mod message;
pub mod person;
pub mod role;

pub use attendance::{AttendanceKind, AttendanceRecord};
pub use audit::{AuditEvent, AuditEventType};
pub use campus_event::CampusEvent;
pub use clearance::{
    ApprovalState, ClearanceRequest, ClearanceStatus, Decision, Party, StageApproval,
};
pub use error::{CoreError, CoreResult};
pub use message::Message;
pub use person::{Club, Department, Student, User};
pub use role::{Principal, Role};
