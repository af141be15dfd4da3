//! # Audit Module
//!
//! Append-only audit events. Every mutating operation emits one; they are
//! written to daily JSONL files by the persistence layer.

use crate::error::{CoreError, CoreResult};
use crate::role::Role;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of operation that happened.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    // === Identity ===
    UserRegistered,
    SignedIn,
    ProfileUpdated,

    // === Clearance ===
    ClearanceSubmitted,
    ClearanceDecided,
    CertificateIssued,

    // === Events & attendance ===
    EventCreated,
    EventDeleted,
    AttendanceRecorded,

    // === Messaging ===
    MessageSent,
}

impl AuditEventType {
    pub const ALL: [AuditEventType; 10] = [
        AuditEventType::UserRegistered,
        AuditEventType::SignedIn,
        AuditEventType::ProfileUpdated,
        AuditEventType::ClearanceSubmitted,
        AuditEventType::ClearanceDecided,
        AuditEventType::CertificateIssued,
        AuditEventType::EventCreated,
        AuditEventType::EventDeleted,
        AuditEventType::AttendanceRecorded,
        AuditEventType::MessageSent,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AuditEventType::UserRegistered => "user_registered",
            AuditEventType::SignedIn => "signed_in",
            AuditEventType::ProfileUpdated => "profile_updated",
            AuditEventType::ClearanceSubmitted => "clearance_submitted",
            AuditEventType::ClearanceDecided => "clearance_decided",
            AuditEventType::CertificateIssued => "certificate_issued",
            AuditEventType::EventCreated => "event_created",
            AuditEventType::EventDeleted => "event_deleted",
            AuditEventType::AttendanceRecorded => "attendance_recorded",
            AuditEventType::MessageSent => "message_sent",
        }
    }
}

impl FromStr for AuditEventType {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        AuditEventType::ALL
            .into_iter()
            .find(|t| t.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| CoreError::invalid_enum("audit event type", s))
    }
}

impl fmt::Display for AuditEventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single audit trail entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEvent {
    /// AUD_000001, AUD_000002, ...
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub event_type: AuditEventType,

    // === Actor ===
    pub actor_id: String,
    pub actor_role: Role,

    // === Target ===
    /// Id of the record acted on
    pub target_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl AuditEvent {
    pub fn new(
        event_id: String,
        event_type: AuditEventType,
        actor_id: &str,
        actor_role: Role,
        target_id: &str,
    ) -> Self {
        Self {
            event_id,
            timestamp: Utc::now(),
            event_type,
            actor_id: actor_id.to_string(),
            actor_role,
            target_id: target_id.to_string(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn generate_id(counter: u64) -> String {
        format!("AUD_{:06}", counter)
    }

    /// Serialize as one JSONL line
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

impl fmt::Display for AuditEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} by {} on {}",
            self.timestamp.format("%Y-%m-%d %H:%M:%S"),
            self.event_type,
            self.actor_id,
            self.target_id
        )
    }
}
