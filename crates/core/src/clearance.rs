//! # Clearance Module
//!
//! Three-party clearance request and its derived status.
//!
//! Each approving party owns exactly one stage. A stage moves from
//! `Pending` to `Approved` or `Rejected` once and never again. The overall
//! status is never stored; it is recomputed from the three stages.

use crate::error::{CoreError, CoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;
use std::str::FromStr;

/// Approving party, one per stage of a clearance request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Party {
    Department,
    Club,
    Ssg,
}

impl Party {
    pub const ALL: [Party; 3] = [Party::Department, Party::Club, Party::Ssg];

    pub fn as_str(&self) -> &'static str {
        match self {
            Party::Department => "department",
            Party::Club => "club",
            Party::Ssg => "ssg",
        }
    }

    /// Human label used on certificates and listings
    pub fn label(&self) -> &'static str {
        match self {
            Party::Department => "Department",
            Party::Club => "Club",
            Party::Ssg => "SSG",
        }
    }

    /// Stored column holding the stage state
    pub fn status_field(&self) -> &'static str {
        match self {
            Party::Department => "department_status",
            Party::Club => "club_status",
            Party::Ssg => "ssg_status",
        }
    }

    /// Stored column holding the approver id
    pub fn approved_by_field(&self) -> &'static str {
        match self {
            Party::Department => "department_approved_by",
            Party::Club => "club_approved_by",
            Party::Ssg => "ssg_approved_by",
        }
    }

    /// Stored column holding the decision time
    pub fn approved_at_field(&self) -> &'static str {
        match self {
            Party::Department => "department_approved_at",
            Party::Club => "club_approved_at",
            Party::Ssg => "ssg_approved_at",
        }
    }
}

impl FromStr for Party {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        Party::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::invalid_enum("party", s))
    }
}

impl fmt::Display for Party {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// State of a single approval stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApprovalState {
    #[default]
    Pending,
    Approved,
    Rejected,
}

impl ApprovalState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ApprovalState::Pending => "pending",
            ApprovalState::Approved => "approved",
            ApprovalState::Rejected => "rejected",
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, ApprovalState::Pending)
    }
}

impl FromStr for ApprovalState {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Ok(ApprovalState::Pending),
            "approved" => Ok(ApprovalState::Approved),
            "rejected" => Ok(ApprovalState::Rejected),
            _ => Err(CoreError::invalid_enum("approval state", s)),
        }
    }
}

impl fmt::Display for ApprovalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Decision an approving party can take on its stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Approved,
    Rejected,
}

impl Decision {
    pub fn as_str(&self) -> &'static str {
        self.state().as_str()
    }

    pub fn state(&self) -> ApprovalState {
        match self {
            Decision::Approved => ApprovalState::Approved,
            Decision::Rejected => ApprovalState::Rejected,
        }
    }
}

impl From<Decision> for ApprovalState {
    fn from(decision: Decision) -> Self {
        decision.state()
    }
}

impl fmt::Display for Decision {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Overall clearance outcome, derived from the three stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClearanceStatus {
    Pending,
    FullyApproved,
    Rejected,
}

impl ClearanceStatus {
    /// Derive the overall status. Rejection wins over approval.
    pub fn derive(department: ApprovalState, club: ApprovalState, ssg: ApprovalState) -> Self {
        let stages = [department, club, ssg];
        if stages.contains(&ApprovalState::Rejected) {
            ClearanceStatus::Rejected
        } else if stages.iter().all(|s| *s == ApprovalState::Approved) {
            ClearanceStatus::FullyApproved
        } else {
            ClearanceStatus::Pending
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ClearanceStatus::Pending => "PENDING",
            ClearanceStatus::FullyApproved => "FULLY_APPROVED",
            ClearanceStatus::Rejected => "REJECTED",
        }
    }

    /// Display label ("FULLY APPROVED")
    pub fn label(&self) -> &'static str {
        match self {
            ClearanceStatus::Pending => "PENDING",
            ClearanceStatus::FullyApproved => "FULLY APPROVED",
            ClearanceStatus::Rejected => "REJECTED",
        }
    }
}

impl fmt::Display for ClearanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One approval stage with its decision metadata.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageApproval {
    pub state: ApprovalState,
    pub decided_by: Option<String>,
    pub decided_at: Option<DateTime<Utc>>,
}

impl StageApproval {
    pub fn pending() -> Self {
        Self::default()
    }

    pub fn decided(decision: Decision, by: &str, at: DateTime<Utc>) -> Self {
        Self {
            state: decision.state(),
            decided_by: Some(by.to_string()),
            decided_at: Some(at),
        }
    }
}

/// A student's request for clearance from the three approving parties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearanceRequest {
    pub id: String,
    /// Owning student (students.id), immutable
    pub student_id: String,
    pub department: StageApproval,
    pub club: StageApproval,
    pub ssg: StageApproval,
    /// Certificate location, only once fully approved
    pub pdf_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ClearanceRequest {
    /// New request with every stage pending
    pub fn new(student_id: &str) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            student_id: student_id.to_string(),
            department: StageApproval::pending(),
            club: StageApproval::pending(),
            ssg: StageApproval::pending(),
            pdf_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn stage(&self, party: Party) -> &StageApproval {
        match party {
            Party::Department => &self.department,
            Party::Club => &self.club,
            Party::Ssg => &self.ssg,
        }
    }

    fn stage_mut(&mut self, party: Party) -> &mut StageApproval {
        match party {
            Party::Department => &mut self.department,
            Party::Club => &mut self.club,
            Party::Ssg => &mut self.ssg,
        }
    }

    pub fn state(&self, party: Party) -> ApprovalState {
        self.stage(party).state
    }

    pub fn status(&self) -> ClearanceStatus {
        ClearanceStatus::derive(self.department.state, self.club.state, self.ssg.state)
    }

    pub fn is_fully_approved(&self) -> bool {
        self.status() == ClearanceStatus::FullyApproved
    }

    /// Record a party's decision on its own stage.
    ///
    /// Fails with `AlreadyDecided` when the stage has left `Pending`; the
    /// request is left untouched in that case.
    pub fn apply_decision(
        &mut self,
        party: Party,
        decision: Decision,
        approver_id: &str,
        at: DateTime<Utc>,
    ) -> CoreResult<()> {
        let current = self.state(party);
        if !current.is_pending() {
            return Err(CoreError::AlreadyDecided {
                party,
                state: current,
            });
        }

        *self.stage_mut(party) = StageApproval::decided(decision, approver_id, at);
        self.updated_at = at;
        Ok(())
    }

    /// Attach the rendered certificate location.
    pub fn attach_certificate(&mut self, url: &str, at: DateTime<Utc>) -> CoreResult<()> {
        self.ensure_fully_approved()?;
        self.pdf_url = Some(url.to_string());
        self.updated_at = at;
        Ok(())
    }

    pub fn ensure_fully_approved(&self) -> CoreResult<()> {
        match self.status() {
            ClearanceStatus::FullyApproved => Ok(()),
            status => Err(CoreError::NotFullyApproved {
                request_id: self.id.clone(),
                status,
            }),
        }
    }

    /// Verification code printed on the certificate, unique per request.
    pub fn verification_code(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.id.as_bytes());
        hasher.update(b":");
        hasher.update(self.student_id.as_bytes());
        let digest = hex::encode(hasher.finalize());
        format!("SSG-CLR-{}", digest[..12].to_uppercase())
    }
}

impl fmt::Display for ClearanceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [{}] department={} club={} ssg={}",
            self.id,
            self.status(),
            self.department.state,
            self.club.state,
            self.ssg.state
        )
    }
}
