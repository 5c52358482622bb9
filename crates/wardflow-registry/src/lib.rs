//! Assignment registry: who is the current doctor/nurse for each patient.
//!
//! Assignments are independent of bed location; a reallocation never touches
//! them. The registry distinguishes fresh assignment from reassignment so a
//! UI race cannot create two active holders of the same role: `assign` over
//! an existing active assignment is a `Conflict`, supersession is only ever
//! explicit via `reassign`.

mod registry;

pub use registry::AssignmentRegistry;
