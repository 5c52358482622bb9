use serde::{Deserialize, Serialize};

use crate::id::{BedId, RoomId, WardId};

/// Occupancy state of a single bed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OccupancyStatus {
    /// Free for reservation.
    Available,
    /// Referenced by exactly one active admission episode.
    Occupied,
    /// Withdrawn from the bookable pool (maintenance, cleaning, closure).
    OutOfService,
}

impl OccupancyStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OccupancyStatus::Available => "available",
            OccupancyStatus::Occupied => "occupied",
            OccupancyStatus::OutOfService => "out_of_service",
        }
    }
}

impl std::fmt::Display for OccupancyStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A physical bed. Belongs to exactly one room for its whole lifetime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bed {
    pub id: BedId,
    pub room: RoomId,
    pub status: OccupancyStatus,
}

impl Bed {
    /// New beds enter the inventory as Available.
    pub fn new(id: BedId, room: RoomId) -> Self {
        Self {
            id,
            room,
            status: OccupancyStatus::Available,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == OccupancyStatus::Available
    }

    pub fn is_occupied(&self) -> bool {
        self.status == OccupancyStatus::Occupied
    }
}

/// A room. Belongs to exactly one ward; owns an ordered set of beds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub ward: WardId,
    pub beds: Vec<BedId>,
}

impl Room {
    pub fn new(id: RoomId, ward: WardId) -> Self {
        Self {
            id,
            ward,
            beds: Vec::new(),
        }
    }
}

/// A ward: name plus its ordered set of rooms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ward {
    pub id: WardId,
    pub name: String,
    pub rooms: Vec<RoomId>,
}

impl Ward {
    pub fn new(id: WardId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            rooms: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_bed_is_available() {
        let bed = Bed::new(BedId::new("b1"), RoomId::new("r1"));
        assert!(bed.is_available());
        assert!(!bed.is_occupied());
    }

    #[test]
    fn test_occupancy_status_display() {
        assert_eq!(OccupancyStatus::Available.to_string(), "available");
        assert_eq!(OccupancyStatus::Occupied.to_string(), "occupied");
        assert_eq!(OccupancyStatus::OutOfService.to_string(), "out_of_service");
    }

    #[test]
    fn test_bed_serde_roundtrip() {
        let bed = Bed::new(BedId::new("b1"), RoomId::new("r1"));
        let json = serde_json::to_string(&bed).unwrap();
        assert!(json.contains("\"available\""));
        let parsed: Bed = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, bed);
    }
}
