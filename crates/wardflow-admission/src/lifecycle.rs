use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::{debug, info, warn};

use wardflow_billing::BillingAccumulator;
use wardflow_catalog::ResourceCatalog;
use wardflow_core::{
    AdmissionEpisode, BedId, CoreError, EpisodeId, Invoice, PatientId, Result, StaffId, StaffRole,
};
use wardflow_registry::AssignmentRegistry;

/// Owns the episode store and drives the admit/reallocate/discharge
/// transitions across the catalog, registry and billing accumulator.
///
/// Episodes are never deleted; discharged ones remain as the historical
/// record of the stay. The one-Active-episode-per-patient invariant is
/// claimed atomically on `active_by_patient` before any other side effect
/// and released on every failure path, so a failed transition leaves
/// nothing behind.
#[derive(Debug)]
pub struct AdmissionLifecycle {
    episodes: DashMap<EpisodeId, AdmissionEpisode>,
    active_by_patient: DashMap<PatientId, EpisodeId>,
    catalog: Arc<ResourceCatalog>,
    registry: Arc<AssignmentRegistry>,
    billing: Arc<BillingAccumulator>,
}

impl AdmissionLifecycle {
    pub fn new(
        catalog: Arc<ResourceCatalog>,
        registry: Arc<AssignmentRegistry>,
        billing: Arc<BillingAccumulator>,
    ) -> Self {
        Self {
            episodes: DashMap::new(),
            active_by_patient: DashMap::new(),
            catalog,
            registry,
            billing,
        }
    }

    // ==================== Transitions ====================

    /// Open a new Active episode: reserve the bed, assign the admitting
    /// doctor, open the billing ledger.
    ///
    /// The admission is atomic from the caller's perspective: if any step
    /// fails, every prior step is unwound and no episode, assignment or
    /// ledger exists afterwards.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the patient already has an Active episode or
    /// the bed is not Available, `NotFound` for an unknown bed.
    pub async fn admit(
        &self,
        patient: &PatientId,
        bed: &BedId,
        doctor: &StaffId,
    ) -> Result<AdmissionEpisode> {
        let episode = AdmissionEpisode::new(patient.clone(), bed.clone(), doctor.clone());

        // Claim the one-active-episode slot before any side effect.
        match self.active_by_patient.entry(patient.clone()) {
            Entry::Occupied(entry) => {
                return Err(CoreError::conflict(format!(
                    "patient {patient} already has an active episode ({})",
                    entry.get()
                )));
            }
            Entry::Vacant(entry) => {
                entry.insert(episode.id.clone());
            }
        }

        if let Err(err) = self.catalog.reserve_bed(bed) {
            self.abandon_claim(patient, &episode.id);
            return Err(err);
        }

        if let Err(err) = self.registry.assign(patient, StaffRole::Doctor, doctor) {
            self.rollback_admit(patient, &episode.id, bed, false);
            return Err(err);
        }

        if let Err(err) = self.billing.open(&episode.id) {
            self.rollback_admit(patient, &episode.id, bed, true);
            return Err(err);
        }

        self.episodes.insert(episode.id.clone(), episode.clone());
        info!(
            episode = %episode.id,
            patient = %patient,
            bed = %bed,
            doctor = %doctor,
            "Patient admitted"
        );
        Ok(episode)
    }

    /// Move an Active episode to a different bed.
    ///
    /// The new bed is reserved before the old one is released; if the
    /// reservation fails the patient's bed of record is untouched. There is
    /// never a moment where the episode has no bed.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown episode or bed, `InvalidState` for
    /// a discharged episode, `InvalidInput` when the target is the current
    /// bed, `Conflict` when the target bed is not Available.
    pub fn reallocate(
        &self,
        episode: &EpisodeId,
        new_bed: &BedId,
        reason: impl Into<String>,
    ) -> Result<AdmissionEpisode> {
        let mut entry = self
            .episodes
            .get_mut(episode)
            .ok_or_else(|| CoreError::not_found("Episode", episode.as_str()))?;
        if !entry.is_active() {
            return Err(CoreError::invalid_state(format!(
                "episode {episode} is discharged"
            )));
        }
        if &entry.bed == new_bed {
            return Err(CoreError::invalid_input(format!(
                "episode {episode} is already in bed {new_bed}"
            )));
        }

        let old_bed = entry.bed.clone();
        self.catalog.reserve_bed(new_bed)?;
        if let Err(err) = self.catalog.release_bed(&old_bed) {
            // The old bed has to be Occupied while the episode is Active;
            // failing here means the occupancy invariant is already broken.
            warn!(episode = %episode, bed = %old_bed, "Releasing previous bed failed");
            if let Err(rollback_err) = self.catalog.release_bed(new_bed) {
                warn!(
                    bed = %new_bed,
                    error = %rollback_err,
                    "Bed release failed during reallocation rollback"
                );
            }
            return Err(err);
        }

        let reason = reason.into();
        entry.record_reallocation(new_bed.clone(), reason.clone());
        info!(
            episode = %episode,
            from_bed = %old_bed,
            to_bed = %new_bed,
            reason = %reason,
            "Patient reallocated"
        );
        Ok(entry.clone())
    }

    /// Discharge an Active episode: finalize billing into the invoice,
    /// release the bed, end staff assignments, mark the episode Discharged.
    ///
    /// The transition and the invoice are one logical unit: the invoice is
    /// finalized before any state changes, so the system can never report a
    /// discharged patient without a corresponding invoice, and a failed
    /// finalize leaves the episode Active with its bed Occupied.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown episode, `InvalidState` if it is
    /// already Discharged.
    pub async fn discharge(
        &self,
        episode: &EpisodeId,
        notes: Option<String>,
    ) -> Result<(AdmissionEpisode, Invoice)> {
        let (patient, bed) = {
            let entry = self
                .episodes
                .get(episode)
                .ok_or_else(|| CoreError::not_found("Episode", episode.as_str()))?;
            if !entry.is_active() {
                return Err(CoreError::invalid_state(format!(
                    "episode {episode} is already discharged"
                )));
            }
            (entry.patient.clone(), entry.bed.clone())
        };

        let invoice = self.billing.finalize(episode).await?;

        if let Err(err) = self.catalog.release_bed(&bed) {
            warn!(episode = %episode, bed = %bed, "Discharge rolled back: bed release failed");
            if let Err(reopen_err) = self.billing.reopen(episode).await {
                warn!(episode = %episode, error = %reopen_err, "Billing reopen failed during rollback");
            }
            return Err(err);
        }

        let discharged = {
            let mut entry = self
                .episodes
                .get_mut(episode)
                .ok_or_else(|| CoreError::not_found("Episode", episode.as_str()))?;
            entry.mark_discharged(notes);
            entry.clone()
        };

        for role in [StaffRole::Doctor, StaffRole::Nurse] {
            match self.registry.unassign(&patient, role) {
                Ok(()) => {}
                Err(CoreError::NotFound { .. }) => {}
                Err(err) => {
                    debug!(patient = %patient, role = %role, error = %err, "Unassign at discharge failed");
                }
            }
        }
        self.active_by_patient
            .remove_if(&patient, |_, active| active == episode);

        info!(
            episode = %episode,
            patient = %patient,
            invoice = %invoice.id,
            total = invoice.total,
            "Patient discharged"
        );
        Ok((discharged, invoice))
    }

    // ==================== Queries ====================

    pub fn episode(&self, id: &EpisodeId) -> Result<AdmissionEpisode> {
        self.episodes
            .get(id)
            .map(|entry| entry.clone())
            .ok_or_else(|| CoreError::not_found("Episode", id.as_str()))
    }

    /// The patient's Active episode, if any.
    pub fn active_episode_for(&self, patient: &PatientId) -> Option<AdmissionEpisode> {
        let id = self.active_by_patient.get(patient)?.clone();
        self.episodes.get(&id).map(|entry| entry.clone())
    }

    /// Every episode ever opened for the patient, oldest first.
    pub fn episodes_for(&self, patient: &PatientId) -> Vec<AdmissionEpisode> {
        let mut episodes: Vec<_> = self
            .episodes
            .iter()
            .filter(|entry| &entry.patient == patient)
            .map(|entry| entry.clone())
            .collect();
        episodes.sort_by_key(|episode| episode.admitted_at);
        episodes
    }

    // ==================== Rollback helpers ====================

    fn abandon_claim(&self, patient: &PatientId, episode: &EpisodeId) {
        self.active_by_patient
            .remove_if(patient, |_, active| active == episode);
    }

    fn rollback_admit(
        &self,
        patient: &PatientId,
        episode: &EpisodeId,
        bed: &BedId,
        unassign_doctor: bool,
    ) {
        warn!(patient = %patient, bed = %bed, "Admission rolled back");
        if unassign_doctor {
            let _ = self.registry.unassign(patient, StaffRole::Doctor);
        }
        if let Err(err) = self.catalog.release_bed(bed) {
            warn!(bed = %bed, error = %err, "Bed release failed during admission rollback");
        }
        self.abandon_claim(patient, episode);
    }
}
