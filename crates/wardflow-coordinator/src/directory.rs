//! Collaborator seams for identity lookups.
//!
//! The core never reads or writes demographic fields; patient and staff
//! records live with external collaborators. All the coordinator needs is
//! an existence check, expressed as object-safe async traits so deployments
//! can plug in their record systems.

use async_trait::async_trait;
use dashmap::DashSet;

use wardflow_core::{PatientId, Result, StaffId};

/// Existence check against the patient-records collaborator.
#[async_trait]
pub trait PatientDirectory: Send + Sync {
    async fn patient_exists(&self, patient: &PatientId) -> Result<bool>;
}

/// Existence check against the staff-records collaborator.
#[async_trait]
pub trait StaffDirectory: Send + Sync {
    async fn staff_exists(&self, staff: &StaffId) -> Result<bool>;
}

/// Directory that accepts every id.
///
/// The default when `strict_identity` is off: the core trusts its
/// pre-authorized caller to hand it real references.
#[derive(Debug, Default, Clone, Copy)]
pub struct TrustingDirectory;

#[async_trait]
impl PatientDirectory for TrustingDirectory {
    async fn patient_exists(&self, _patient: &PatientId) -> Result<bool> {
        Ok(true)
    }
}

#[async_trait]
impl StaffDirectory for TrustingDirectory {
    async fn staff_exists(&self, _staff: &StaffId) -> Result<bool> {
        Ok(true)
    }
}

/// In-memory directory of known ids, for tests and strict deployments that
/// sync their roster into the process.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    patients: DashSet<PatientId>,
    staff: DashSet<StaffId>,
}

impl InMemoryDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_patient(&self, patient: PatientId) {
        self.patients.insert(patient);
    }

    pub fn add_staff(&self, staff: StaffId) {
        self.staff.insert(staff);
    }
}

#[async_trait]
impl PatientDirectory for InMemoryDirectory {
    async fn patient_exists(&self, patient: &PatientId) -> Result<bool> {
        Ok(self.patients.contains(patient))
    }
}

#[async_trait]
impl StaffDirectory for InMemoryDirectory {
    async fn staff_exists(&self, staff: &StaffId) -> Result<bool> {
        Ok(self.staff.contains(staff))
    }
}
