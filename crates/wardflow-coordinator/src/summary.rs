use serde::{Deserialize, Serialize};

use wardflow_core::{AdmissionEpisode, Assignment, Bed, Invoice, Room, Ward};

/// Read model of an admission episode for UI consumption.
///
/// Returned by `Coordinator::admission_summary`; a point-in-time view, not
/// a live handle. While the episode is Active `billed_total` is the running
/// non-voided total; after discharge it equals the invoice total.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionSummary {
    pub episode: AdmissionEpisode,
    pub ward: Ward,
    pub room: Room,
    pub bed: Bed,
    pub doctor: Option<Assignment>,
    pub nurse: Option<Assignment>,
    pub billed_total: u64,
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub invoice: Option<Invoice>,
}
