use std::sync::Arc;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::debug;

use wardflow_core::events::{DomainEvent, EventBroadcaster};
use wardflow_core::{Bed, BedId, CoreError, OccupancyStatus, Result, Room, RoomId, Ward, WardId};

/// In-memory hierarchical inventory of wards, rooms and beds.
///
/// The ward/room hierarchy is read-mostly; the bed map is the hot mutable
/// structure. `reserve_bed` and `release_bed` perform their status check and
/// write inside a single per-entry critical section, which is the guard
/// against double booking: two concurrent reservations of the same bed can
/// never both succeed.
///
/// Every successful occupancy transition emits a `BedStatusChanged` event.
#[derive(Debug)]
pub struct ResourceCatalog {
    wards: DashMap<WardId, Ward>,
    rooms: DashMap<RoomId, Room>,
    beds: DashMap<BedId, Bed>,
    broadcaster: Arc<EventBroadcaster>,
}

impl ResourceCatalog {
    pub fn new(broadcaster: Arc<EventBroadcaster>) -> Self {
        Self {
            wards: DashMap::new(),
            rooms: DashMap::new(),
            beds: DashMap::new(),
            broadcaster,
        }
    }

    // ==================== Inventory registration ====================

    /// Register a new ward.
    ///
    /// # Errors
    ///
    /// Returns `Conflict` if the ward id is already registered.
    pub fn register_ward(&self, id: WardId, name: impl Into<String>) -> Result<Ward> {
        match self.wards.entry(id.clone()) {
            Entry::Occupied(_) => Err(CoreError::conflict(format!(
                "ward {id} is already registered"
            ))),
            Entry::Vacant(entry) => {
                let ward = Ward::new(id, name);
                entry.insert(ward.clone());
                debug!(ward = %ward.id, "Registered ward");
                Ok(ward)
            }
        }
    }

    /// Register a new room under an existing ward.
    ///
    /// A room belongs to exactly one ward for its whole lifetime.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown ward, `Conflict` for a duplicate
    /// room id.
    pub fn register_room(&self, id: RoomId, ward: WardId) -> Result<Room> {
        let mut ward_entry = self
            .wards
            .get_mut(&ward)
            .ok_or_else(|| CoreError::not_found("Ward", ward.as_str()))?;
        match self.rooms.entry(id.clone()) {
            Entry::Occupied(_) => Err(CoreError::conflict(format!(
                "room {id} is already registered"
            ))),
            Entry::Vacant(entry) => {
                let room = Room::new(id.clone(), ward);
                entry.insert(room.clone());
                ward_entry.rooms.push(id);
                debug!(room = %room.id, ward = %room.ward, "Registered room");
                Ok(room)
            }
        }
    }

    /// Register a new bed under an existing room. The bed starts Available.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown room, `Conflict` for a duplicate
    /// bed id.
    pub fn register_bed(&self, id: BedId, room: RoomId) -> Result<Bed> {
        let mut room_entry = self
            .rooms
            .get_mut(&room)
            .ok_or_else(|| CoreError::not_found("Room", room.as_str()))?;
        match self.beds.entry(id.clone()) {
            Entry::Occupied(_) => {
                Err(CoreError::conflict(format!("bed {id} is already registered")))
            }
            Entry::Vacant(entry) => {
                let bed = Bed::new(id.clone(), room);
                entry.insert(bed.clone());
                room_entry.beds.push(id);
                debug!(bed = %bed.id, room = %bed.room, "Registered bed");
                Ok(bed)
            }
        }
    }

    // ==================== Queries ====================

    pub fn ward(&self, id: &WardId) -> Result<Ward> {
        self.wards
            .get(id)
            .map(|entry| entry.clone())
            .ok_or_else(|| CoreError::not_found("Ward", id.as_str()))
    }

    pub fn room(&self, id: &RoomId) -> Result<Room> {
        self.rooms
            .get(id)
            .map(|entry| entry.clone())
            .ok_or_else(|| CoreError::not_found("Room", id.as_str()))
    }

    pub fn bed(&self, id: &BedId) -> Result<Bed> {
        self.beds
            .get(id)
            .map(|entry| entry.clone())
            .ok_or_else(|| CoreError::not_found("Bed", id.as_str()))
    }

    /// Available beds under the given room, in registration order.
    ///
    /// A pure query with no hidden state: the UI's ward -> room -> bed
    /// cascade is a consumer of this, not part of the core.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown ward or room, `InvalidInput` when
    /// the room exists but under a different ward.
    pub fn list_available_beds(&self, ward: &WardId, room: &RoomId) -> Result<Vec<Bed>> {
        if !self.wards.contains_key(ward) {
            return Err(CoreError::not_found("Ward", ward.as_str()));
        }
        let room_entry = self
            .rooms
            .get(room)
            .ok_or_else(|| CoreError::not_found("Room", room.as_str()))?;
        if &room_entry.ward != ward {
            return Err(CoreError::invalid_input(format!(
                "room {room} does not belong to ward {ward}"
            )));
        }

        Ok(room_entry
            .beds
            .iter()
            .filter_map(|bed_id| self.beds.get(bed_id))
            .filter(|bed| bed.is_available())
            .map(|bed| bed.clone())
            .collect())
    }

    /// Check that a bed sits under the given room and the room under the
    /// given ward. Used by the coordinator to validate inbound references.
    pub fn verify_bed_location(&self, ward: &WardId, room: &RoomId, bed: &BedId) -> Result<()> {
        let bed_entry = self.bed(bed)?;
        if &bed_entry.room != room {
            return Err(CoreError::invalid_input(format!(
                "bed {bed} does not belong to room {room}"
            )));
        }
        let room_entry = self.room(room)?;
        if &room_entry.ward != ward {
            return Err(CoreError::invalid_input(format!(
                "room {room} does not belong to ward {ward}"
            )));
        }
        Ok(())
    }

    // ==================== Occupancy transitions ====================

    /// Atomically transition a bed from Available to Occupied.
    ///
    /// This is the core correctness guard against double booking: the status
    /// read and write happen under the bed's entry lock.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown bed, `Conflict` if the bed is not
    /// Available (occupied or out of service).
    pub fn reserve_bed(&self, id: &BedId) -> Result<Bed> {
        self.transition(id, OccupancyStatus::Occupied, |bed| {
            if bed.is_available() {
                Ok(())
            } else {
                Err(CoreError::conflict(format!(
                    "bed {id} is not available ({})",
                    bed.status
                )))
            }
        })
    }

    /// Transition a bed from Occupied back to Available.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown bed, `InvalidState` if the bed was
    /// not Occupied.
    pub fn release_bed(&self, id: &BedId) -> Result<Bed> {
        self.transition(id, OccupancyStatus::Available, |bed| {
            if bed.is_occupied() {
                Ok(())
            } else {
                Err(CoreError::invalid_state(format!(
                    "bed {id} is not occupied ({})",
                    bed.status
                )))
            }
        })
    }

    /// Withdraw an Available bed from the bookable pool.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the bed is currently Available; an
    /// occupied bed must be freed by discharge or reallocation first.
    pub fn set_out_of_service(&self, id: &BedId) -> Result<Bed> {
        self.transition(id, OccupancyStatus::OutOfService, |bed| {
            if bed.is_available() {
                Ok(())
            } else {
                Err(CoreError::invalid_state(format!(
                    "bed {id} cannot be taken out of service ({})",
                    bed.status
                )))
            }
        })
    }

    /// Return an OutOfService bed to the bookable pool.
    ///
    /// # Errors
    ///
    /// Returns `InvalidState` unless the bed is currently OutOfService.
    pub fn return_to_service(&self, id: &BedId) -> Result<Bed> {
        self.transition(id, OccupancyStatus::Available, |bed| {
            if bed.status == OccupancyStatus::OutOfService {
                Ok(())
            } else {
                Err(CoreError::invalid_state(format!(
                    "bed {id} is not out of service ({})",
                    bed.status
                )))
            }
        })
    }

    /// Guarded compare-and-set on a bed's occupancy status.
    ///
    /// The guard runs and the write lands inside one entry critical
    /// section. The event is emitted only after the transition applied.
    fn transition<F>(&self, id: &BedId, to: OccupancyStatus, guard: F) -> Result<Bed>
    where
        F: FnOnce(&Bed) -> Result<()>,
    {
        let previous;
        let updated = {
            let mut entry = self
                .beds
                .get_mut(id)
                .ok_or_else(|| CoreError::not_found("Bed", id.as_str()))?;
            guard(entry.value())?;
            previous = entry.status;
            entry.status = to;
            entry.clone()
        };

        debug!(bed = %id, previous = %previous, current = %to, "Bed status changed");
        self.broadcaster
            .send(DomainEvent::bed_status_changed(id.clone(), previous, to));
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use wardflow_core::events::DomainEventKind;

    fn catalog() -> ResourceCatalog {
        ResourceCatalog::new(EventBroadcaster::new_shared())
    }

    fn seeded() -> ResourceCatalog {
        let catalog = catalog();
        catalog
            .register_ward(WardId::new("w1"), "General Medicine")
            .unwrap();
        catalog
            .register_room(RoomId::new("r1"), WardId::new("w1"))
            .unwrap();
        catalog
            .register_bed(BedId::new("b1"), RoomId::new("r1"))
            .unwrap();
        catalog
            .register_bed(BedId::new("b2"), RoomId::new("r1"))
            .unwrap();
        catalog
    }

    #[test]
    fn test_register_hierarchy() {
        let catalog = seeded();
        let ward = catalog.ward(&WardId::new("w1")).unwrap();
        assert_eq!(ward.name, "General Medicine");
        assert_eq!(ward.rooms, vec![RoomId::new("r1")]);

        let room = catalog.room(&RoomId::new("r1")).unwrap();
        assert_eq!(room.ward, WardId::new("w1"));
        assert_eq!(room.beds.len(), 2);
    }

    #[test]
    fn test_register_duplicate_ward_conflicts() {
        let catalog = seeded();
        let err = catalog
            .register_ward(WardId::new("w1"), "Again")
            .unwrap_err();
        assert_eq!(err.code(), "conflict");
    }

    #[test]
    fn test_register_room_unknown_ward() {
        let catalog = catalog();
        let err = catalog
            .register_room(RoomId::new("r9"), WardId::new("nope"))
            .unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn test_list_available_beds() {
        let catalog = seeded();
        catalog.reserve_bed(&BedId::new("b2")).unwrap();

        let available = catalog
            .list_available_beds(&WardId::new("w1"), &RoomId::new("r1"))
            .unwrap();
        assert_eq!(available.len(), 1);
        assert_eq!(available[0].id, BedId::new("b1"));
    }

    #[test]
    fn test_list_available_beds_unknown_room() {
        let catalog = seeded();
        let err = catalog
            .list_available_beds(&WardId::new("w1"), &RoomId::new("r9"))
            .unwrap_err();
        assert_eq!(err.code(), "not_found");
    }

    #[test]
    fn test_list_available_beds_room_in_other_ward() {
        let catalog = seeded();
        catalog.register_ward(WardId::new("w2"), "Surgery").unwrap();
        catalog
            .register_room(RoomId::new("r2"), WardId::new("w2"))
            .unwrap();

        let err = catalog
            .list_available_beds(&WardId::new("w1"), &RoomId::new("r2"))
            .unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn test_reserve_then_release() {
        let catalog = seeded();
        let bed = catalog.reserve_bed(&BedId::new("b1")).unwrap();
        assert_eq!(bed.status, OccupancyStatus::Occupied);

        let bed = catalog.release_bed(&BedId::new("b1")).unwrap();
        assert_eq!(bed.status, OccupancyStatus::Available);
    }

    #[test]
    fn test_reserve_occupied_bed_conflicts() {
        let catalog = seeded();
        catalog.reserve_bed(&BedId::new("b1")).unwrap();

        let err = catalog.reserve_bed(&BedId::new("b1")).unwrap_err();
        assert_eq!(err.code(), "conflict");
        // State unchanged.
        assert!(catalog.bed(&BedId::new("b1")).unwrap().is_occupied());
    }

    #[test]
    fn test_reserve_out_of_service_bed_conflicts() {
        let catalog = seeded();
        catalog.set_out_of_service(&BedId::new("b1")).unwrap();

        let err = catalog.reserve_bed(&BedId::new("b1")).unwrap_err();
        assert_eq!(err.code(), "conflict");
    }

    #[test]
    fn test_release_available_bed_is_invalid_state() {
        let catalog = seeded();
        let err = catalog.release_bed(&BedId::new("b1")).unwrap_err();
        assert_eq!(err.code(), "invalid_state");
    }

    #[test]
    fn test_out_of_service_roundtrip() {
        let catalog = seeded();
        catalog.set_out_of_service(&BedId::new("b1")).unwrap();
        assert_eq!(
            catalog.bed(&BedId::new("b1")).unwrap().status,
            OccupancyStatus::OutOfService
        );

        catalog.return_to_service(&BedId::new("b1")).unwrap();
        assert!(catalog.bed(&BedId::new("b1")).unwrap().is_available());
    }

    #[test]
    fn test_out_of_service_occupied_bed_rejected() {
        let catalog = seeded();
        catalog.reserve_bed(&BedId::new("b1")).unwrap();
        let err = catalog.set_out_of_service(&BedId::new("b1")).unwrap_err();
        assert_eq!(err.code(), "invalid_state");
    }

    #[test]
    fn test_verify_bed_location() {
        let catalog = seeded();
        catalog
            .verify_bed_location(&WardId::new("w1"), &RoomId::new("r1"), &BedId::new("b1"))
            .unwrap();

        catalog.register_ward(WardId::new("w2"), "Surgery").unwrap();
        let err = catalog
            .verify_bed_location(&WardId::new("w2"), &RoomId::new("r1"), &BedId::new("b1"))
            .unwrap_err();
        assert_eq!(err.code(), "invalid_input");
    }

    #[test]
    fn test_concurrent_reserve_single_winner() {
        let catalog = Arc::new(seeded());
        let bed = BedId::new("b1");

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let catalog = Arc::clone(&catalog);
                let bed = bed.clone();
                thread::spawn(move || catalog.reserve_bed(&bed).is_ok())
            })
            .collect();

        let successes = handles
            .into_iter()
            .map(|handle| handle.join().unwrap())
            .filter(|&ok| ok)
            .count();
        assert_eq!(successes, 1);
        assert!(catalog.bed(&bed).unwrap().is_occupied());
    }

    #[tokio::test]
    async fn test_transitions_emit_bed_status_events() {
        let broadcaster = EventBroadcaster::new_shared();
        let catalog = ResourceCatalog::new(Arc::clone(&broadcaster));
        catalog.register_ward(WardId::new("w1"), "Gen").unwrap();
        catalog
            .register_room(RoomId::new("r1"), WardId::new("w1"))
            .unwrap();
        catalog
            .register_bed(BedId::new("b1"), RoomId::new("r1"))
            .unwrap();

        let mut receiver = broadcaster.subscribe();
        catalog.reserve_bed(&BedId::new("b1")).unwrap();

        let event = receiver.recv().await.unwrap();
        assert_eq!(event.kind(), DomainEventKind::BedStatusChanged);
        if let DomainEvent::BedStatusChanged {
            previous, current, ..
        } = event
        {
            assert_eq!(previous, OccupancyStatus::Available);
            assert_eq!(current, OccupancyStatus::Occupied);
        } else {
            panic!("Expected BedStatusChanged");
        }
    }

    #[test]
    fn test_failed_reserve_emits_no_event() {
        let broadcaster = EventBroadcaster::new_shared();
        let catalog = ResourceCatalog::new(Arc::clone(&broadcaster));
        catalog.register_ward(WardId::new("w1"), "Gen").unwrap();
        catalog
            .register_room(RoomId::new("r1"), WardId::new("w1"))
            .unwrap();
        catalog
            .register_bed(BedId::new("b1"), RoomId::new("r1"))
            .unwrap();
        catalog.reserve_bed(&BedId::new("b1")).unwrap();

        let mut receiver = broadcaster.subscribe();
        assert!(catalog.reserve_bed(&BedId::new("b1")).is_err());
        assert!(matches!(
            receiver.try_recv(),
            Err(tokio::sync::broadcast::error::TryRecvError::Empty)
        ));
    }
}
