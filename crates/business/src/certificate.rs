//! Certificate rendering contract.

use crate::error::BusinessResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ssg_core::{ApprovalState, Party};

/// Everything printed on a clearance certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateData {
    pub request_id: String,
    pub student_name: String,
    /// School-issued number (STU-...)
    pub student_number: String,
    pub department: String,
    pub year_level: u8,
    pub issued_at: DateTime<Utc>,
    pub verification_code: String,
    /// One line per approving party, in `Party::ALL` order
    pub approvals: Vec<(Party, ApprovalState)>,
}

impl CertificateData {
    pub fn approval_line(party: Party, state: ApprovalState) -> String {
        format!("✅ {}: {}", party.label(), state.as_str().to_uppercase())
    }

    pub fn approval_lines(&self) -> Vec<String> {
        self.approvals
            .iter()
            .map(|(party, state)| Self::approval_line(*party, *state))
            .collect()
    }
}

/// Shareable location of a rendered certificate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CertificateHandle {
    pub url: String,
}

impl CertificateHandle {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

/// Turns certificate data into a document and returns where it lives.
#[async_trait]
pub trait CertificateRenderer: Send + Sync {
    async fn render(&self, data: &CertificateData) -> BusinessResult<CertificateHandle>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_approval_lines() {
        let data = CertificateData {
            request_id: "req-1".to_string(),
            student_name: "Ana Reyes".to_string(),
            student_number: "STU-1".to_string(),
            department: "Computer Studies".to_string(),
            year_level: 3,
            issued_at: Utc::now(),
            verification_code: "SSG-CLR-ABC".to_string(),
            approvals: Party::ALL
                .into_iter()
                .map(|p| (p, ApprovalState::Approved))
                .collect(),
        };

        assert_eq!(
            data.approval_lines(),
            vec![
                "✅ Department: APPROVED",
                "✅ Club: APPROVED",
                "✅ SSG: APPROVED"
            ]
        );
    }
}
