//! Resource catalog: the authoritative Ward -> Room -> Bed inventory.
//!
//! All occupancy decisions in the system go through this one service. There
//! is no other source of truth for whether a bed is free; callers treat any
//! local view as a cache invalidated by the state this service returns.

mod catalog;

pub use catalog::ResourceCatalog;
