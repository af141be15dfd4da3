//! Row shapes stored in the collections.
//!
//! Most entities are stored as their serde form. Clearance requests are
//! flattened into `<party>_status` / `<party>_approved_by` /
//! `<party>_approved_at` columns so a stage can be filtered and guarded on.

use crate::error::{PersistenceError, PersistenceResult};
use crate::store::{Filter, Row};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ssg_core::{ApprovalState, ClearanceRequest, Decision, Party, StageApproval, Student};

/// Serialize an entity into a row of `collection`.
pub fn to_row<T: Serialize>(collection: &str, value: &T) -> PersistenceResult<Row> {
    match serde_json::to_value(value)? {
        Value::Object(row) => Ok(row),
        other => Err(PersistenceError::invalid_row(
            collection,
            format!("expected an object, got {}", other),
        )),
    }
}

/// Deserialize a row of `collection` into an entity.
pub fn from_row<T: DeserializeOwned>(collection: &str, row: Row) -> PersistenceResult<T> {
    serde_json::from_value(Value::Object(row))
        .map_err(|e| PersistenceError::invalid_row(collection, e))
}

/// Row type for `clearance_requests`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearanceRow {
    pub id: String,
    pub student_id: String,

    pub department_status: ApprovalState,
    #[serde(default)]
    pub department_approved_by: Option<String>,
    #[serde(default)]
    pub department_approved_at: Option<DateTime<Utc>>,

    pub club_status: ApprovalState,
    #[serde(default)]
    pub club_approved_by: Option<String>,
    #[serde(default)]
    pub club_approved_at: Option<DateTime<Utc>>,

    pub ssg_status: ApprovalState,
    #[serde(default)]
    pub ssg_approved_by: Option<String>,
    #[serde(default)]
    pub ssg_approved_at: Option<DateTime<Utc>>,

    #[serde(default)]
    pub pdf_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Present only when the query expanded `student`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub student: Option<Student>,
}

impl ClearanceRow {
    /// Patch recording `decision` on `party`'s stage
    pub fn decision_patch(party: Party, decision: Decision, approver_id: &str, at: DateTime<Utc>) -> Row {
        let at = Value::String(at.to_rfc3339_opts(SecondsFormat::AutoSi, true));
        let mut patch = Row::new();
        patch.insert(
            party.status_field().to_string(),
            Value::String(decision.as_str().to_string()),
        );
        patch.insert(
            party.approved_by_field().to_string(),
            Value::String(approver_id.to_string()),
        );
        patch.insert(party.approved_at_field().to_string(), at.clone());
        patch.insert("updated_at".to_string(), at);
        patch
    }

    /// Guard: `party`'s stage is still pending in the store
    pub fn pending_guard(party: Party) -> Filter {
        Filter::eq(party.status_field(), ApprovalState::Pending.as_str())
    }

    /// Split into the domain request and the expanded student, if any
    pub fn into_parts(self) -> (ClearanceRequest, Option<Student>) {
        let request = ClearanceRequest {
            id: self.id,
            student_id: self.student_id,
            department: StageApproval {
                state: self.department_status,
                decided_by: self.department_approved_by,
                decided_at: self.department_approved_at,
            },
            club: StageApproval {
                state: self.club_status,
                decided_by: self.club_approved_by,
                decided_at: self.club_approved_at,
            },
            ssg: StageApproval {
                state: self.ssg_status,
                decided_by: self.ssg_approved_by,
                decided_at: self.ssg_approved_at,
            },
            pdf_url: self.pdf_url,
            created_at: self.created_at,
            updated_at: self.updated_at,
        };
        (request, self.student)
    }
}

impl From<&ClearanceRequest> for ClearanceRow {
    fn from(req: &ClearanceRequest) -> Self {
        Self {
            id: req.id.clone(),
            student_id: req.student_id.clone(),
            department_status: req.department.state,
            department_approved_by: req.department.decided_by.clone(),
            department_approved_at: req.department.decided_at,
            club_status: req.club.state,
            club_approved_by: req.club.decided_by.clone(),
            club_approved_at: req.club.decided_at,
            ssg_status: req.ssg.state,
            ssg_approved_by: req.ssg.decided_by.clone(),
            ssg_approved_at: req.ssg.decided_at,
            pdf_url: req.pdf_url.clone(),
            created_at: req.created_at,
            updated_at: req.updated_at,
            student: None,
        }
    }
}

impl From<ClearanceRow> for ClearanceRequest {
    fn from(row: ClearanceRow) -> Self {
        row.into_parts().0
    }
}

/// A clearance request with its owning student expanded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClearanceView {
    pub request: ClearanceRequest,
    pub student: Option<Student>,
}

impl From<ClearanceRow> for ClearanceView {
    fn from(row: ClearanceRow) -> Self {
        let (request, student) = row.into_parts();
        Self { request, student }
    }
}

/// Row type for `credentials`; `id` is the user id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRow {
    pub id: String,
    /// Lower-cased
    pub email: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Row type for `sessions`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionRow {
    pub id: String,
    pub user_id: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl SessionRow {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clearance_row_uses_party_columns() {
        let req = ClearanceRequest::new("stu-1");
        let row = to_row("clearance_requests", &ClearanceRow::from(&req)).unwrap();

        for party in Party::ALL {
            assert_eq!(row[party.status_field()], "pending");
            assert!(row.contains_key(party.approved_by_field()));
            assert!(row.contains_key(party.approved_at_field()));
        }
        assert!(!row.contains_key("student"));
    }

    #[test]
    fn test_clearance_row_round_trip_keeps_decisions() {
        let mut req = ClearanceRequest::new("stu-1");
        req.apply_decision(Party::Department, Decision::Approved, "dept-1", Utc::now())
            .unwrap();

        let row = to_row("clearance_requests", &ClearanceRow::from(&req)).unwrap();
        let back: ClearanceRow = from_row("clearance_requests", row).unwrap();
        assert_eq!(ClearanceRequest::from(back), req);
    }

    #[test]
    fn test_decision_patch() {
        let patch = ClearanceRow::decision_patch(Party::Club, Decision::Rejected, "club-1", Utc::now());

        assert_eq!(patch["club_status"], "rejected");
        assert_eq!(patch["club_approved_by"], "club-1");
        assert_eq!(patch["club_approved_at"], patch["updated_at"]);
        assert_eq!(patch.len(), 4);
    }

    #[test]
    fn test_from_row_reports_collection() {
        let mut row = Row::new();
        row.insert("id".to_string(), Value::String("x".to_string()));
        let err = from_row::<SessionRow>("sessions", row).unwrap_err();
        assert!(err.to_string().starts_with("Invalid row in sessions"));
    }
}
