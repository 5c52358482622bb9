//! Admission lifecycle: the state machine that moves a patient through
//! admit -> in-care -> reallocation -> discharge.
//!
//! Pre-admission is implicit (no episode exists); `Active` and `Discharged`
//! are the only episode states and `Discharged` is terminal. Every failed
//! transition returns a typed error and leaves no partial mutation visible
//! to a concurrent reader.

mod lifecycle;

pub use lifecycle::AdmissionLifecycle;
