//! JSONL audit trail: writer and reader.

pub mod reader;
pub mod store;

pub use reader::{AuditFilter, AuditReader};
pub use store::AuditLog;
