use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::id::{BedId, EpisodeId, PatientId, StaffId};
use crate::time::now_utc;

/// Lifecycle state of an admission episode. There are no other states:
/// "pre-admission" is simply the absence of an episode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EpisodeStatus {
    Active,
    /// Terminal.
    Discharged,
}

impl EpisodeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EpisodeStatus::Active => "active",
            EpisodeStatus::Discharged => "discharged",
        }
    }
}

impl std::fmt::Display for EpisodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One bed move within an episode. Append-only audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReallocationRecord {
    pub from_bed: BedId,
    pub to_bed: BedId,
    pub reason: String,
    #[serde(with = "time::serde::rfc3339")]
    pub at: OffsetDateTime,
}

/// One continuous admission, from admit to discharge.
///
/// Episodes are never deleted; a discharged episode stays queryable as the
/// historical record of the stay. The bed reference is non-owning: beds
/// outlive episodes and are reused, never concurrently.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmissionEpisode {
    pub id: EpisodeId,
    pub patient: PatientId,
    /// Current bed of record while Active; last bed of the stay after
    /// discharge.
    pub bed: BedId,
    pub admitting_doctor: StaffId,
    pub status: EpisodeStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub admitted_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339::option", default)]
    pub discharged_at: Option<OffsetDateTime>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub reallocations: Vec<ReallocationRecord>,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub discharge_notes: Option<String>,
}

impl AdmissionEpisode {
    /// Open a new Active episode for a patient in the given bed.
    pub fn new(patient: PatientId, bed: BedId, admitting_doctor: StaffId) -> Self {
        Self {
            id: EpisodeId::generate(),
            patient,
            bed,
            admitting_doctor,
            status: EpisodeStatus::Active,
            admitted_at: now_utc(),
            discharged_at: None,
            reallocations: Vec::new(),
            discharge_notes: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == EpisodeStatus::Active
    }

    /// Move the episode to a new bed of record, appending the audit entry.
    /// The caller has already secured the new bed and released the old one.
    pub fn record_reallocation(&mut self, to_bed: BedId, reason: impl Into<String>) {
        let record = ReallocationRecord {
            from_bed: std::mem::replace(&mut self.bed, to_bed.clone()),
            to_bed,
            reason: reason.into(),
            at: now_utc(),
        };
        self.reallocations.push(record);
    }

    /// Transition to the terminal Discharged state.
    pub fn mark_discharged(&mut self, notes: Option<String>) {
        self.status = EpisodeStatus::Discharged;
        self.discharged_at = Some(now_utc());
        self.discharge_notes = notes;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn episode() -> AdmissionEpisode {
        AdmissionEpisode::new(
            PatientId::new("p1"),
            BedId::new("b1"),
            StaffId::new("dr-house"),
        )
    }

    #[test]
    fn test_new_episode_is_active() {
        let e = episode();
        assert!(e.is_active());
        assert!(e.discharged_at.is_none());
        assert!(e.reallocations.is_empty());
    }

    #[test]
    fn test_record_reallocation_appends_history() {
        let mut e = episode();
        e.record_reallocation(BedId::new("b3"), "isolation required");

        assert_eq!(e.bed, BedId::new("b3"));
        assert_eq!(e.reallocations.len(), 1);
        assert_eq!(e.reallocations[0].from_bed, BedId::new("b1"));
        assert_eq!(e.reallocations[0].to_bed, BedId::new("b3"));
        assert_eq!(e.reallocations[0].reason, "isolation required");
    }

    #[test]
    fn test_mark_discharged_is_terminal_state() {
        let mut e = episode();
        e.mark_discharged(Some("recovered".to_string()));

        assert_eq!(e.status, EpisodeStatus::Discharged);
        assert!(e.discharged_at.is_some());
        assert_eq!(e.discharge_notes.as_deref(), Some("recovered"));
    }

    #[test]
    fn test_episode_serde_roundtrip() {
        let mut e = episode();
        e.record_reallocation(BedId::new("b2"), "ward transfer");
        let json = serde_json::to_string(&e).unwrap();
        let parsed: AdmissionEpisode = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, e);
    }
}
