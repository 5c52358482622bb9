use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::debug;

use wardflow_admission::AdmissionLifecycle;
use wardflow_billing::BillingAccumulator;
use wardflow_catalog::ResourceCatalog;
use wardflow_core::events::{DomainEvent, EventBroadcaster};
use wardflow_core::{
    AdmissionEpisode, Assignment, Bed, BedId, BillingCategory, BillingLineItem, CoreError,
    EpisodeId, Invoice, LineItemId, PatientId, Result, RoomId, StaffId, StaffRole, WardId,
};
use wardflow_registry::AssignmentRegistry;

use crate::config::CoordinatorConfig;
use crate::directory::{PatientDirectory, StaffDirectory, TrustingDirectory};
use crate::summary::AdmissionSummary;

/// The facade every caller goes through.
///
/// Sequences each externally visible operation across the catalog, registry,
/// lifecycle and billing accumulator so that it is atomic from the caller's
/// perspective, serializes state-changing operations per patient, and emits
/// one coarse domain event per completed operation. Lower-layer errors
/// surface unchanged; nothing is swallowed into a generic failure and
/// nothing is retried internally.
pub struct Coordinator {
    catalog: Arc<ResourceCatalog>,
    registry: Arc<AssignmentRegistry>,
    billing: Arc<BillingAccumulator>,
    lifecycle: Arc<AdmissionLifecycle>,
    patients: Arc<dyn PatientDirectory>,
    staff: Arc<dyn StaffDirectory>,
    broadcaster: Arc<EventBroadcaster>,
    /// Per-patient operation locks. Two concurrent calls touching the same
    /// patient resolve deterministically: the second observes the post-state
    /// of the first or fails its own validation, never an interleaving.
    patient_locks: DashMap<PatientId, Arc<Mutex<()>>>,
    config: CoordinatorConfig,
}

impl Coordinator {
    /// Coordinator with default configuration and trusting directories.
    pub fn new() -> Self {
        Self::builder().build()
    }

    pub fn builder() -> CoordinatorBuilder {
        CoordinatorBuilder::new()
    }

    /// The resource catalog, for inventory registration and availability
    /// queries.
    pub fn catalog(&self) -> &ResourceCatalog {
        &self.catalog
    }

    /// Subscribe to domain events (both the coarse per-operation events and
    /// the catalog's `BedStatusChanged` audit feed).
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<DomainEvent> {
        self.broadcaster.subscribe()
    }

    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        &self.broadcaster
    }

    // ==================== Admission lifecycle ====================

    /// Admit a patient into a specific bed under the named ward and room.
    ///
    /// # Errors
    ///
    /// `NotFound` for unknown references, `InvalidInput` when the bed is
    /// not under the named room/ward, `Conflict` when the patient already
    /// has an active episode or the bed is taken.
    pub async fn admit(
        &self,
        patient: &PatientId,
        ward: &WardId,
        room: &RoomId,
        bed: &BedId,
        doctor: &StaffId,
    ) -> Result<AdmissionEpisode> {
        self.check_patient(patient).await?;
        self.check_staff(doctor).await?;

        let lock = self.patient_lock(patient);
        let _guard = lock.lock().await;

        self.catalog.verify_bed_location(ward, room, bed)?;
        let episode = self.lifecycle.admit(patient, bed, doctor).await?;

        self.emit(DomainEvent::patient_admitted(
            episode.id.clone(),
            patient.clone(),
            bed.clone(),
            doctor.clone(),
        ));
        Ok(episode)
    }

    /// Move an active episode to a different bed.
    pub async fn reallocate(
        &self,
        episode: &EpisodeId,
        ward: &WardId,
        room: &RoomId,
        new_bed: &BedId,
        reason: impl Into<String>,
    ) -> Result<AdmissionEpisode> {
        let patient = self.lifecycle.episode(episode)?.patient;
        let lock = self.patient_lock(&patient);
        let _guard = lock.lock().await;

        self.catalog.verify_bed_location(ward, room, new_bed)?;
        let updated = self.lifecycle.reallocate(episode, new_bed, reason)?;

        // The lifecycle appended the audit record we are announcing.
        if let Some(record) = updated.reallocations.last() {
            self.emit(DomainEvent::patient_reallocated(
                episode.clone(),
                record.from_bed.clone(),
                record.to_bed.clone(),
                record.reason.clone(),
            ));
        }
        Ok(updated)
    }

    /// Discharge an active episode, producing its invoice.
    pub async fn discharge(
        &self,
        episode: &EpisodeId,
        notes: Option<String>,
    ) -> Result<(AdmissionEpisode, Invoice)> {
        let patient = self.lifecycle.episode(episode)?.patient;
        let lock = self.patient_lock(&patient);
        let _guard = lock.lock().await;

        let (discharged, invoice) = self.lifecycle.discharge(episode, notes).await?;

        self.emit(DomainEvent::patient_discharged(
            episode.clone(),
            invoice.id.clone(),
        ));
        Ok((discharged, invoice))
    }

    // ==================== Staffing ====================

    /// Assign a staff member to a role that currently has no active holder.
    pub async fn assign_staff(
        &self,
        patient: &PatientId,
        role: StaffRole,
        staff: &StaffId,
    ) -> Result<Assignment> {
        self.check_patient(patient).await?;
        self.check_staff(staff).await?;

        let lock = self.patient_lock(patient);
        let _guard = lock.lock().await;

        let assignment = self.registry.assign(patient, role, staff)?;
        self.emit(DomainEvent::staff_assigned(
            patient.clone(),
            role,
            staff.clone(),
        ));
        Ok(assignment)
    }

    /// Supersede the active holder of a role.
    pub async fn reassign_staff(
        &self,
        patient: &PatientId,
        role: StaffRole,
        staff: &StaffId,
    ) -> Result<Assignment> {
        self.check_patient(patient).await?;
        self.check_staff(staff).await?;

        let lock = self.patient_lock(patient);
        let _guard = lock.lock().await;

        let assignment = self.registry.reassign(patient, role, staff)?;
        self.emit(DomainEvent::staff_assigned(
            patient.clone(),
            role,
            staff.clone(),
        ));
        Ok(assignment)
    }

    /// End the active assignment for a role.
    pub async fn unassign_staff(&self, patient: &PatientId, role: StaffRole) -> Result<()> {
        let lock = self.patient_lock(patient);
        let _guard = lock.lock().await;
        self.registry.unassign(patient, role)
    }

    /// The active assignment for a (patient, role) pair, if any.
    pub fn current_staff(&self, patient: &PatientId, role: StaffRole) -> Option<Assignment> {
        self.registry.current(patient, role)
    }

    // ==================== Billing ====================

    /// Record a chargeable line item against an active episode.
    pub async fn add_billing_line(
        &self,
        episode: &EpisodeId,
        category: BillingCategory,
        description: impl Into<String>,
        amount: u64,
        quantity: u32,
    ) -> Result<BillingLineItem> {
        // Resolve through the lifecycle first so an unknown episode reports
        // as Episode-not-found rather than a missing ledger.
        self.lifecycle.episode(episode)?;
        self.billing
            .add_line_item(episode, category, description, amount, quantity)
            .await
    }

    /// Exclude a line item from totals without deleting it.
    pub async fn void_billing_line(&self, episode: &EpisodeId, line: &LineItemId) -> Result<()> {
        self.lifecycle.episode(episode)?;
        self.billing.void_line_item(episode, line).await
    }

    // ==================== Queries ====================

    /// Available beds under a room. Pure query, no hidden state.
    pub fn available_beds(&self, ward: &WardId, room: &RoomId) -> Result<Vec<Bed>> {
        self.catalog.list_available_beds(ward, room)
    }

    /// Point-in-time read model of an episode for UI consumption.
    pub async fn admission_summary(&self, episode: &EpisodeId) -> Result<AdmissionSummary> {
        let episode = self.lifecycle.episode(episode)?;
        let bed = self.catalog.bed(&episode.bed)?;
        let room = self.catalog.room(&bed.room)?;
        let ward = self.catalog.ward(&room.ward)?;
        let doctor = self.registry.current(&episode.patient, StaffRole::Doctor);
        let nurse = self.registry.current(&episode.patient, StaffRole::Nurse);
        let invoice = self.billing.invoice(&episode.id).await?;
        let billed_total = match &invoice {
            Some(invoice) => invoice.total,
            None => self.billing.running_total(&episode.id).await?,
        };

        Ok(AdmissionSummary {
            episode,
            ward,
            room,
            bed,
            doctor,
            nurse,
            billed_total,
            invoice,
        })
    }

    /// The patient's Active episode, if any.
    pub fn active_episode(&self, patient: &PatientId) -> Option<AdmissionEpisode> {
        self.lifecycle.active_episode_for(patient)
    }

    /// Every episode ever opened for the patient, oldest first.
    pub fn episodes(&self, patient: &PatientId) -> Vec<AdmissionEpisode> {
        self.lifecycle.episodes_for(patient)
    }

    // ==================== Internals ====================

    fn patient_lock(&self, patient: &PatientId) -> Arc<Mutex<()>> {
        self.patient_locks
            .entry(patient.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    async fn check_patient(&self, patient: &PatientId) -> Result<()> {
        if !self.config.strict_identity {
            return Ok(());
        }
        if self.patients.patient_exists(patient).await? {
            Ok(())
        } else {
            Err(CoreError::not_found("Patient", patient.as_str()))
        }
    }

    async fn check_staff(&self, staff: &StaffId) -> Result<()> {
        if !self.config.strict_identity {
            return Ok(());
        }
        if self.staff.staff_exists(staff).await? {
            Ok(())
        } else {
            Err(CoreError::not_found("Staff", staff.as_str()))
        }
    }

    fn emit(&self, event: DomainEvent) {
        let kind = event.kind();
        let subscribers = self.broadcaster.send(event);
        debug!(event = %kind, subscribers, "Emitted domain event");
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Coordinator")
            .field("config", &self.config)
            .field("subscribers", &self.broadcaster.subscriber_count())
            .finish()
    }
}

/// Builder wiring the components around one shared event broadcaster.
pub struct CoordinatorBuilder {
    config: CoordinatorConfig,
    patients: Option<Arc<dyn PatientDirectory>>,
    staff: Option<Arc<dyn StaffDirectory>>,
}

impl CoordinatorBuilder {
    pub fn new() -> Self {
        Self {
            config: CoordinatorConfig::default(),
            patients: None,
            staff: None,
        }
    }

    pub fn config(mut self, config: CoordinatorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn patient_directory(mut self, directory: Arc<dyn PatientDirectory>) -> Self {
        self.patients = Some(directory);
        self
    }

    pub fn staff_directory(mut self, directory: Arc<dyn StaffDirectory>) -> Self {
        self.staff = Some(directory);
        self
    }

    pub fn build(self) -> Coordinator {
        let broadcaster = Arc::new(EventBroadcaster::with_capacity(self.config.event_capacity));
        let catalog = Arc::new(ResourceCatalog::new(Arc::clone(&broadcaster)));
        let registry = Arc::new(AssignmentRegistry::new());
        let billing = Arc::new(BillingAccumulator::new());
        let lifecycle = Arc::new(AdmissionLifecycle::new(
            Arc::clone(&catalog),
            Arc::clone(&registry),
            Arc::clone(&billing),
        ));

        Coordinator {
            catalog,
            registry,
            billing,
            lifecycle,
            patients: self
                .patients
                .unwrap_or_else(|| Arc::new(TrustingDirectory)),
            staff: self.staff.unwrap_or_else(|| Arc::new(TrustingDirectory)),
            broadcaster,
            patient_locks: DashMap::new(),
            config: self.config,
        }
    }
}

impl Default for CoordinatorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
