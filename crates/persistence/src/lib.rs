//! # SSG Persistence
//!
//! Persistence layer for the SSG clearance system.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                       DataStore (trait)                      │
//! │  ┌─────────────┐    ┌─────────────┐    ┌──────────────────┐  │
//! │  │ MemoryStore │    │ SqliteStore │    │      Repos       │  │
//! │  │  (RwLock)   │    │   (sqlx)    │    │ (typed queries)  │  │
//! │  └─────────────┘    └─────────────┘    └──────────────────┘  │
//! │                      AuditLog (JSONL)                        │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use ssg_persistence::{ClearanceRepo, SqliteStore};
//!
//! let store = SqliteStore::connect("sqlite:data/ssg.db?mode=rwc").await?;
//! let requests = ClearanceRepo::list_for_student(&store, &student_id).await?;
//! ```

pub mod audit;
pub mod collections;
pub mod error;
pub mod repos;
pub mod schema;
pub mod store;

pub use audit::{AuditFilter, AuditLog, AuditReader};
pub use error::{PersistenceError, PersistenceResult};
pub use repos::{
    AttendanceRepo, ClearanceRepo, ClubRepo, CredentialRepo, DepartmentRepo, EventRepo,
    MessageRepo, SessionRepo, StudentRepo, UserRepo,
};
pub use schema::{from_row, to_row, ClearanceRow, ClearanceView, CredentialRow, SessionRow};
pub use store::{
    DataStore, Expand, Filter, FilterOp, MemoryStore, OrderBy, Query, Row, SqliteStore,
};
