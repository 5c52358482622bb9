//! Coordinator facade for the Wardflow admission core.
//!
//! Every externally visible operation (admit, reallocate, discharge,
//! staffing, billing) enters through [`Coordinator`], which validates
//! against the resource catalog and lifecycle state, serializes operations
//! per patient, and emits one coarse domain event per completed operation.
//! Authorization is the caller's concern: the core trusts that requests are
//! pre-authorized by the external auth collaborator.

mod config;
mod coordinator;
mod directory;
mod summary;

pub use config::{ConfigError, CoordinatorConfig};
pub use coordinator::{Coordinator, CoordinatorBuilder};
pub use directory::{InMemoryDirectory, PatientDirectory, StaffDirectory, TrustingDirectory};
pub use summary::AdmissionSummary;
