//! Event types emitted by the coordinator and its components.
//!
//! Two granularities flow through the same bus: `BedStatusChanged` is the
//! fine-grained audit feed from the resource catalog, the rest are the
//! coarse one-per-operation events external consumers subscribe to.

use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::id::{BedId, EpisodeId, InvoiceId, PatientId, StaffId};
use crate::model::{OccupancyStatus, StaffRole};
use crate::time::now_utc;

/// Discriminant of a domain event, for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DomainEventKind {
    BedStatusChanged,
    PatientAdmitted,
    PatientReallocated,
    PatientDischarged,
    StaffAssigned,
}

impl DomainEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            DomainEventKind::BedStatusChanged => "bed_status_changed",
            DomainEventKind::PatientAdmitted => "patient_admitted",
            DomainEventKind::PatientReallocated => "patient_reallocated",
            DomainEventKind::PatientDischarged => "patient_discharged",
            DomainEventKind::StaffAssigned => "staff_assigned",
        }
    }
}

impl std::fmt::Display for DomainEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An event describing a completed state change.
///
/// Events are emitted only after the change has been applied; a consumer
/// never observes an event for an operation that failed or rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DomainEvent {
    /// A bed moved between occupancy states (catalog audit feed).
    BedStatusChanged {
        bed: BedId,
        previous: OccupancyStatus,
        current: OccupancyStatus,
        #[serde(with = "time::serde::rfc3339")]
        at: OffsetDateTime,
    },
    /// A new admission episode was opened.
    PatientAdmitted {
        episode: EpisodeId,
        patient: PatientId,
        bed: BedId,
        doctor: StaffId,
        #[serde(with = "time::serde::rfc3339")]
        at: OffsetDateTime,
    },
    /// An active episode moved to a different bed.
    PatientReallocated {
        episode: EpisodeId,
        from_bed: BedId,
        to_bed: BedId,
        reason: String,
        #[serde(with = "time::serde::rfc3339")]
        at: OffsetDateTime,
    },
    /// An episode was discharged and its invoice finalized.
    PatientDischarged {
        episode: EpisodeId,
        invoice: InvoiceId,
        #[serde(with = "time::serde::rfc3339")]
        at: OffsetDateTime,
    },
    /// A staff member became the active holder of a role for a patient.
    StaffAssigned {
        patient: PatientId,
        role: StaffRole,
        staff: StaffId,
        #[serde(with = "time::serde::rfc3339")]
        at: OffsetDateTime,
    },
}

impl DomainEvent {
    pub fn bed_status_changed(
        bed: BedId,
        previous: OccupancyStatus,
        current: OccupancyStatus,
    ) -> Self {
        DomainEvent::BedStatusChanged {
            bed,
            previous,
            current,
            at: now_utc(),
        }
    }

    pub fn patient_admitted(
        episode: EpisodeId,
        patient: PatientId,
        bed: BedId,
        doctor: StaffId,
    ) -> Self {
        DomainEvent::PatientAdmitted {
            episode,
            patient,
            bed,
            doctor,
            at: now_utc(),
        }
    }

    pub fn patient_reallocated(
        episode: EpisodeId,
        from_bed: BedId,
        to_bed: BedId,
        reason: impl Into<String>,
    ) -> Self {
        DomainEvent::PatientReallocated {
            episode,
            from_bed,
            to_bed,
            reason: reason.into(),
            at: now_utc(),
        }
    }

    pub fn patient_discharged(episode: EpisodeId, invoice: InvoiceId) -> Self {
        DomainEvent::PatientDischarged {
            episode,
            invoice,
            at: now_utc(),
        }
    }

    pub fn staff_assigned(patient: PatientId, role: StaffRole, staff: StaffId) -> Self {
        DomainEvent::StaffAssigned {
            patient,
            role,
            staff,
            at: now_utc(),
        }
    }

    /// Discriminant of this event.
    pub fn kind(&self) -> DomainEventKind {
        match self {
            DomainEvent::BedStatusChanged { .. } => DomainEventKind::BedStatusChanged,
            DomainEvent::PatientAdmitted { .. } => DomainEventKind::PatientAdmitted,
            DomainEvent::PatientReallocated { .. } => DomainEventKind::PatientReallocated,
            DomainEvent::PatientDischarged { .. } => DomainEventKind::PatientDischarged,
            DomainEvent::StaffAssigned { .. } => DomainEventKind::StaffAssigned,
        }
    }

    /// Timestamp of the event.
    pub fn at(&self) -> OffsetDateTime {
        match self {
            DomainEvent::BedStatusChanged { at, .. }
            | DomainEvent::PatientAdmitted { at, .. }
            | DomainEvent::PatientReallocated { at, .. }
            | DomainEvent::PatientDischarged { at, .. }
            | DomainEvent::StaffAssigned { at, .. } => *at,
        }
    }

    /// Check if this event matches a kind filter. `None` matches all.
    pub fn matches_kind(&self, filter: Option<DomainEventKind>) -> bool {
        match filter {
            Some(kind) => self.kind() == kind,
            None => true,
        }
    }
}
