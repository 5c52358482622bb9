//! Domain event system.
//!
//! Components publish events after a successful state change; external
//! collaborators (notifications, reporting, printing) subscribe through the
//! broadcaster. The core emits events but does not implement any transport.

mod broadcaster;
mod types;

pub use broadcaster::EventBroadcaster;
pub use types::{DomainEvent, DomainEventKind};
