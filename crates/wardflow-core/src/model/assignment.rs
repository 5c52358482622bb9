use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::id::{PatientId, StaffId};
use crate::time::now_utc;

/// Staff role an assignment covers. A patient has at most one active
/// assignment per role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Doctor,
    Nurse,
}

impl StaffRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            StaffRole::Doctor => "doctor",
            StaffRole::Nurse => "nurse",
        }
    }
}

impl std::fmt::Display for StaffRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A staff member covering a role for a patient.
///
/// Reassignment supersedes: the old record gets `ended_at` set and a fresh
/// one becomes active. Ended records are retained, never overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Assignment {
    pub patient: PatientId,
    pub role: StaffRole,
    pub staff: StaffId,
    #[serde(with = "time::serde::rfc3339")]
    pub assigned_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub ended_at: Option<OffsetDateTime>,
}

impl Assignment {
    pub fn new(patient: PatientId, role: StaffRole, staff: StaffId) -> Self {
        Self {
            patient,
            role,
            staff,
            assigned_at: now_utc(),
            ended_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.ended_at.is_none()
    }

    pub fn end(&mut self) {
        self.ended_at = Some(now_utc());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_assignment_is_active() {
        let a = Assignment::new(
            PatientId::new("p1"),
            StaffRole::Doctor,
            StaffId::new("d1"),
        );
        assert!(a.is_active());
    }

    #[test]
    fn test_ended_assignment_is_inactive() {
        let mut a = Assignment::new(PatientId::new("p1"), StaffRole::Nurse, StaffId::new("n1"));
        a.end();
        assert!(!a.is_active());
        assert!(a.ended_at.is_some());
    }

    #[test]
    fn test_role_display() {
        assert_eq!(StaffRole::Doctor.to_string(), "doctor");
        assert_eq!(StaffRole::Nurse.to_string(), "nurse");
    }
}
