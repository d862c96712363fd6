use crate::game::GameStateUpdate;
use crate::lobby::messages::{ConnectionId, JoinFailure, PlayerSlot, Responses, RoomInfo, Seat};
use crate::lobby::room::Room;
use crate::lobby::token::RoomCode;
use async_std::channel::Sender;
use async_std::sync::Mutex;
use log::info;
use rand::thread_rng;
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::Arc;

/// Room code to room actor. The map lock is never held across a
/// room event, rooms remove themselves when they close.
#[derive(Clone)]
pub struct RoomManager {
    rooms: Arc<Mutex<HashMap<RoomCode, Room>>>,
}

impl RoomManager {
    pub fn new() -> Self {
        RoomManager {
            rooms: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Open a room with a fresh code and seat its creator first.
    pub async fn create_room(
        &self,
        connection_id: ConnectionId,
        player_name: String,
        sender: Sender<Responses>,
    ) -> Result<(RoomCode, PlayerSlot), JoinFailure> {
        let mut rooms = self.rooms.lock().await;
        loop {
            let code = RoomCode::random(&mut thread_rng());
            if let Entry::Vacant(e) = rooms.entry(code) {
                let (room, player) =
                    Room::open(code, connection_id, player_name, sender, self.clone())?;
                e.insert(room);
                info!("connection {connection_id} created room {code}");
                return Ok((code, player));
            }
        }
    }

    /// Seat a player in an existing room. Failures are also reported to
    /// `sender` as `Responses::Error`.
    pub async fn join_room(
        &self,
        connection_id: ConnectionId,
        room_id: &str,
        player_name: String,
        sender: Sender<Responses>,
    ) -> Result<(RoomCode, PlayerSlot), JoinFailure> {
        let result = match RoomCode::from_code(room_id) {
            Ok(code) => match self.room(&code).await {
                Some(room) => room
                    .join(connection_id, player_name, sender.clone())
                    .await
                    .map(|player| (code, player)),
                None => Err(JoinFailure::NotFound),
            },
            Err(_) => Err(JoinFailure::NotFound),
        };
        if let Err(failure) = &result {
            info!("connection {connection_id} failed to join {room_id}: {}", failure.message());
            let _ = sender.send(Responses::from(*failure)).await;
        }
        result
    }

    pub async fn relay_state_update(
        &self,
        room_id: &RoomCode,
        connection_id: ConnectionId,
        game_state: GameStateUpdate,
        player_id: Seat,
    ) {
        if let Some(room) = self.room(room_id).await {
            room.relay(connection_id, game_state, player_id).await;
        }
    }

    pub async fn leave_room(&self, room_id: &RoomCode, connection_id: ConnectionId) {
        if let Some(room) = self.room(room_id).await {
            room.leave(connection_id).await;
        }
    }

    /// The connection's room is unknown here, so every room is told.
    pub async fn handle_disconnect(&self, connection_id: ConnectionId) {
        let rooms: Vec<Room> = self.rooms.lock().await.values().cloned().collect();
        for room in rooms {
            room.disconnect(connection_id).await;
        }
    }

    pub async fn room_info(&self, room_id: &RoomCode) -> Option<RoomInfo> {
        self.room(room_id).await?.info().await
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.lock().await.len()
    }

    pub(crate) async fn remove_room(&self, room_id: &RoomCode) {
        self.rooms.lock().await.remove(room_id);
    }

    async fn room(&self, room_id: &RoomCode) -> Option<Room> {
        self.rooms.lock().await.get(room_id).cloned()
    }
}

impl Default for RoomManager {
    fn default() -> Self {
        RoomManager::new()
    }
}
