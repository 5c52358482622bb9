//! Billing accumulator: chargeable line items per admission episode,
//! finalized exactly once into an immutable invoice at discharge.

mod accumulator;

pub use accumulator::BillingAccumulator;
