//! # Role Module
//!
//! User roles and the acting principal passed explicitly to every operation.

use crate::clearance::Party;
use crate::error::{CoreError, CoreResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a user in the governance system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Student Supreme Government administrator
    SsgSuperAdmin,
    /// Club administrator
    ClubAdmin,
    /// Department administrator
    DepartmentAdmin,
    /// Officer in charge of event attendance
    OfficerInCharge,
    /// Enrolled student
    Student,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::SsgSuperAdmin,
        Role::ClubAdmin,
        Role::DepartmentAdmin,
        Role::OfficerInCharge,
        Role::Student,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::SsgSuperAdmin => "ssg_super_admin",
            Role::ClubAdmin => "club_admin",
            Role::DepartmentAdmin => "department_admin",
            Role::OfficerInCharge => "officer_in_charge",
            Role::Student => "student",
        }
    }

    /// The clearance stage this role may decide, if any.
    ///
    /// | Role | Stage |
    /// |---|---|
    /// | department_admin | department |
    /// | club_admin | club |
    /// | ssg_super_admin | ssg |
    pub fn approving_party(&self) -> Option<Party> {
        match self {
            Role::DepartmentAdmin => Some(Party::Department),
            Role::ClubAdmin => Some(Party::Club),
            Role::SsgSuperAdmin => Some(Party::Ssg),
            Role::OfficerInCharge | Role::Student => None,
        }
    }

    pub fn is_admin(&self) -> bool {
        self.approving_party().is_some()
    }

    pub fn can_manage_events(&self) -> bool {
        self.is_admin()
    }

    pub fn can_record_attendance(&self) -> bool {
        matches!(self, Role::OfficerInCharge | Role::SsgSuperAdmin)
    }
}

impl FromStr for Role {
    type Err = CoreError;

    fn from_str(s: &str) -> CoreResult<Self> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| CoreError::invalid_enum("role", s))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// The authenticated actor performing an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
}

impl Principal {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
        }
    }

    pub fn is(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.user_id, self.role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_str() {
        assert_eq!(Role::SsgSuperAdmin.as_str(), "ssg_super_admin");
        assert_eq!("CLUB_ADMIN".parse::<Role>(), Ok(Role::ClubAdmin));
        assert!("janitor".parse::<Role>().is_err());
    }

    #[test]
    fn test_approving_party_mapping() {
        assert_eq!(Role::DepartmentAdmin.approving_party(), Some(Party::Department));
        assert_eq!(Role::ClubAdmin.approving_party(), Some(Party::Club));
        assert_eq!(Role::SsgSuperAdmin.approving_party(), Some(Party::Ssg));
        assert_eq!(Role::OfficerInCharge.approving_party(), None);
        assert_eq!(Role::Student.approving_party(), None);
    }

    #[test]
    fn test_role_permissions() {
        assert!(Role::ClubAdmin.can_manage_events());
        assert!(!Role::Student.can_manage_events());
        assert!(Role::OfficerInCharge.can_record_attendance());
        assert!(!Role::DepartmentAdmin.can_record_attendance());
    }

    #[test]
    fn test_role_serde() {
        let json = serde_json::to_string(&Role::OfficerInCharge).unwrap();
        assert_eq!(json, "\"officer_in_charge\"");
    }

    #[test]
    fn test_principal_display() {
        let p = Principal::new("u-1", Role::Student);
        assert!(p.is("u-1"));
        assert_eq!(p.to_string(), "u-1 (student)");
    }
}
