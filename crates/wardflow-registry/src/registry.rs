use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use wardflow_core::{Assignment, CoreError, PatientId, Result, StaffId, StaffRole};

/// Tracks the active staff assignment per (patient, role) pair.
///
/// At most one active assignment exists per pair, enforced on the map entry
/// rather than by convention. Superseded and ended assignments move to an
/// append-only history.
#[derive(Debug, Default)]
pub struct AssignmentRegistry {
    active: DashMap<(PatientId, StaffRole), Assignment>,
    history: DashMap<PatientId, Vec<Assignment>>,
}

impl AssignmentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh assignment for a role that currently has none.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if an active assignment of this role already
    /// exists for the patient; callers must use [`reassign`] to supersede,
    /// never silently overwrite.
    ///
    /// [`reassign`]: AssignmentRegistry::reassign
    pub fn assign(&self, patient: &PatientId, role: StaffRole, staff: &StaffId) -> Result<Assignment> {
        match self.active.entry((patient.clone(), role)) {
            Entry::Occupied(entry) => Err(CoreError::conflict(format!(
                "patient {patient} already has an active {role} assignment ({}); reassign instead",
                entry.get().staff
            ))),
            Entry::Vacant(entry) => {
                let assignment = Assignment::new(patient.clone(), role, staff.clone());
                entry.insert(assignment.clone());
                debug!(patient = %patient, role = %role, staff = %staff, "Staff assigned");
                Ok(assignment)
            }
        }
    }

    /// Supersede the active assignment for a role: the prior one is ended
    /// and retained in history, the new one becomes active.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if no active assignment of this role exists.
    pub fn reassign(
        &self,
        patient: &PatientId,
        role: StaffRole,
        staff: &StaffId,
    ) -> Result<Assignment> {
        let mut entry = self
            .active
            .get_mut(&(patient.clone(), role))
            .ok_or_else(|| CoreError::not_found("Assignment", format!("{patient}/{role}")))?;

        let replacement = Assignment::new(patient.clone(), role, staff.clone());
        let mut superseded = std::mem::replace(&mut *entry, replacement.clone());
        drop(entry);

        superseded.end();
        debug!(
            patient = %patient,
            role = %role,
            previous = %superseded.staff,
            staff = %staff,
            "Staff reassigned"
        );
        self.history
            .entry(patient.clone())
            .or_default()
            .push(superseded);
        Ok(replacement)
    }

    /// End the active assignment for a role.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if none is active.
    pub fn unassign(&self, patient: &PatientId, role: StaffRole) -> Result<()> {
        let (_, mut assignment) = self
            .active
            .remove(&(patient.clone(), role))
            .ok_or_else(|| CoreError::not_found("Assignment", format!("{patient}/{role}")))?;

        assignment.end();
        debug!(patient = %patient, role = %role, staff = %assignment.staff, "Staff unassigned");
        self.history
            .entry(patient.clone())
            .or_default()
            .push(assignment);
        Ok(())
    }

    /// The active assignment for a (patient, role) pair, if any.
    pub fn current(&self, patient: &PatientId, role: StaffRole) -> Option<Assignment> {
        self.active
            .get(&(patient.clone(), role))
            .map(|entry| entry.clone())
    }

    /// Superseded and ended assignments for a patient, oldest first.
    pub fn history(&self, patient: &PatientId) -> Vec<Assignment> {
        self.history
            .get(patient)
            .map(|entry| entry.clone())
            .unwrap_or_default()
    }
}
