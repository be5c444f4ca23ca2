//! In-process element store.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{ElementRecord, ElementStore, RoomRecord, StoreError};

/// Element store held entirely in memory. Contents are lost on restart.
#[derive(Default)]
pub struct MemoryElementStore {
    rooms: RwLock<HashMap<String, RoomRecord>>,
}

impl MemoryElementStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn new_room() -> RoomRecord {
    let now = frames::now_ms();
    RoomRecord { editors: None, created_at: now, updated_at: now, elements: Vec::new() }
}

#[async_trait]
impl ElementStore for MemoryElementStore {
    async fn load_room(&self, room_id: &str) -> Result<RoomRecord, StoreError> {
        let mut rooms = self.rooms.write().await;
        Ok(rooms.entry(room_id.to_owned()).or_insert_with(new_room).clone())
    }

    async fn upsert_elements(&self, room_id: &str, records: &[ElementRecord]) -> Result<(), StoreError> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(room_id.to_owned()).or_insert_with(new_room);
        for record in records {
            match room.elements.iter_mut().find(|r| r.id == record.id) {
                Some(existing) => existing.body = record.body.clone(),
                None => {
                    let at = room.elements.partition_point(|r| r.seq <= record.seq);
                    room.elements.insert(at, record.clone());
                }
            }
        }
        room.updated_at = frames::now_ms();
        Ok(())
    }

    async fn delete_element(&self, room_id: &str, element_id: &str) -> Result<bool, StoreError> {
        let mut rooms = self.rooms.write().await;
        let Some(room) = rooms.get_mut(room_id) else {
            return Ok(false);
        };
        let before = room.elements.len();
        room.elements.retain(|r| r.id != element_id);
        room.updated_at = frames::now_ms();
        Ok(room.elements.len() != before)
    }

    async fn clear_room(&self, room_id: &str) -> Result<(), StoreError> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(room_id.to_owned()).or_insert_with(new_room);
        room.elements.clear();
        room.updated_at = frames::now_ms();
        Ok(())
    }

    async fn set_editors(&self, room_id: &str, editors: Option<&[String]>) -> Result<(), StoreError> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.entry(room_id.to_owned()).or_insert_with(new_room);
        room.editors = editors.map(<[String]>::to_vec);
        room.updated_at = frames::now_ms();
        Ok(())
    }
}

#[cfg(test)]
#[path = "memory_test.rs"]
mod tests;
