//! Typed identifiers for every entity the coordinator handles.
//!
//! All cross-component references travel as ids, so each entity gets its own
//! newtype: handing a `RoomId` where a `BedId` is expected is a compile
//! error, not a runtime lookup miss. Ids are opaque strings; freshly minted
//! ones are UUIDv4.

use serde::{Deserialize, Serialize};

/// Generate a fresh opaque identifier.
pub fn generate_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

macro_rules! entity_id {
    ($(#[$doc:meta])* $name:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Mint a new random id.
            pub fn generate() -> Self {
                Self(generate_id())
            }

            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }
    };
}

entity_id!(
    /// Identifier of a ward.
    WardId
);
entity_id!(
    /// Identifier of a room within a ward.
    RoomId
);
entity_id!(
    /// Identifier of a bed within a room.
    BedId
);
entity_id!(
    /// Opaque patient identifier owned by the patient-records collaborator.
    /// The core never holds demographic data, only this reference.
    PatientId
);
entity_id!(
    /// Opaque staff identifier owned by the staff-records collaborator.
    StaffId
);
entity_id!(
    /// Identifier of one admission episode (admit through discharge).
    EpisodeId
);
entity_id!(
    /// Identifier of a single billing line item.
    LineItemId
);
entity_id!(
    /// Identifier of a finalized invoice.
    InvoiceId
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_id_is_unique() {
        let a = generate_id();
        let b = generate_id();
        assert_ne!(a, b);
        assert!(uuid::Uuid::parse_str(&a).is_ok());
    }

    #[test]
    fn test_id_roundtrip() {
        let id = BedId::new("bed-1");
        assert_eq!(id.as_str(), "bed-1");
        assert_eq!(id.to_string(), "bed-1");
        assert_eq!(id, BedId::from("bed-1"));
    }

    #[test]
    fn test_id_serde_is_transparent() {
        let id = PatientId::new("p-42");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"p-42\"");
        let parsed: PatientId = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(EpisodeId::generate(), EpisodeId::generate());
    }
}
