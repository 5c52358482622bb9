pub mod error;
pub mod events;
pub mod id;
pub mod model;
pub mod time;

pub use error::{CoreError, ErrorCategory, Result};
pub use id::{
    BedId, EpisodeId, InvoiceId, LineItemId, PatientId, RoomId, StaffId, WardId, generate_id,
};
pub use model::{
    AdmissionEpisode, Assignment, Bed, BillingCategory, BillingLineItem, EpisodeStatus, Invoice,
    OccupancyStatus, ReallocationRecord, Room, StaffRole, Ward,
};
pub use time::now_utc;
