//! Domain entities for the admission coordinator.
//!
//! These are plain serde-able values; all mutation goes through the
//! component services that own them. Persisted-state layout is the caller's
//! concern, so everything here serializes cleanly.

mod assignment;
mod billing;
mod episode;
mod ward;

pub use assignment::{Assignment, StaffRole};
pub use billing::{BillingCategory, BillingLineItem, Invoice};
pub use episode::{AdmissionEpisode, EpisodeStatus, ReallocationRecord};
pub use ward::{Bed, OccupancyStatus, Room, Ward};
