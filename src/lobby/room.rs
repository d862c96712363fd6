use crate::game::GameStateUpdate;
use crate::lobby::messages::{ConnectionId, JoinFailure, PlayerSlot, Responses, RoomInfo, Seat};
use crate::lobby::room_manager::RoomManager;
use crate::lobby::token::RoomCode;
use crate::CHANNEL_SIZE;
use async_std::channel::{bounded, Receiver, Sender};
use async_std::task;
use futures::StreamExt;
#[cfg(debug_assertions)]
use log::trace;
use log::{info, warn};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum RoomPhase {
    Empty,
    WaitingForSecondPlayer,
    Active,
    Closed,
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum Departure {
    Left,
    Disconnected,
}

/// responses to deliver, addressed by connection
pub(crate) type Outgoing = Vec<(ConnectionId, Responses)>;

/// The state of one room. Mutations return the responses to send
/// instead of sending them.
pub(crate) struct RoomRecord {
    id: RoomCode,
    players: Vec<PlayerSlot>,
    snapshot: GameStateUpdate,
    created_at: u64,
    closed: bool,
}

impl RoomRecord {
    pub(crate) fn new(id: RoomCode) -> Self {
        let created_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or_default();
        RoomRecord {
            id,
            players: Vec::with_capacity(2),
            snapshot: GameStateUpdate::default(),
            created_at,
            closed: false,
        }
    }

    pub(crate) fn phase(&self) -> RoomPhase {
        if self.closed {
            return RoomPhase::Closed;
        }
        match self.players.len() {
            0 => RoomPhase::Empty,
            1 => RoomPhase::WaitingForSecondPlayer,
            _ => RoomPhase::Active,
        }
    }

    pub(crate) fn info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id,
            players: self.players.clone(),
            snapshot: self.snapshot.clone(),
            created_at: self.created_at,
        }
    }

    fn slot(&self, connection_id: ConnectionId) -> Option<&PlayerSlot> {
        self.players
            .iter()
            .find(|p| p.connection_id == connection_id)
    }

    /// Seat a player. The first player gets `RoomCreated`; the second gets
    /// `RoomJoined` and the first is told with `PlayerJoined`.
    pub(crate) fn seat(
        &mut self,
        connection_id: ConnectionId,
        name: String,
    ) -> Result<(PlayerSlot, Outgoing), JoinFailure> {
        match self.phase() {
            RoomPhase::Closed => return Err(JoinFailure::NotFound),
            RoomPhase::Active => return Err(JoinFailure::Full),
            _ => {}
        }
        if self.slot(connection_id).is_some() {
            return Err(JoinFailure::Full);
        }
        let seat = match self.players.first() {
            None => Seat::First,
            Some(first) => first.seat.opponent(),
        };
        let player = PlayerSlot {
            connection_id,
            name,
            seat,
        };
        self.players.push(player.clone());
        if seat == Seat::Second {
            // a new pairing starts from a fresh game
            self.snapshot = GameStateUpdate::default();
        }
        let room_info = self.info();
        let mut outgoing = Vec::with_capacity(2);
        match seat {
            Seat::First => outgoing.push((
                connection_id,
                Responses::RoomCreated {
                    room_id: self.id,
                    player: player.clone(),
                    room_info,
                },
            )),
            Seat::Second => {
                for other in self.players.iter().filter(|p| p.connection_id != connection_id) {
                    outgoing.push((
                        other.connection_id,
                        Responses::PlayerJoined {
                            player: player.clone(),
                            room_info: room_info.clone(),
                        },
                    ));
                }
                outgoing.insert(
                    0,
                    (
                        connection_id,
                        Responses::RoomJoined {
                            room_id: self.id,
                            player: player.clone(),
                            room_info,
                        },
                    ),
                );
            }
        }
        Ok((player, outgoing))
    }

    /// Store the update and forward it to everyone but the sender.
    /// Updates from connections not seated here are dropped.
    pub(crate) fn relay(
        &mut self,
        connection_id: ConnectionId,
        game_state: GameStateUpdate,
        player_id: Seat,
    ) -> Outgoing {
        if self.slot(connection_id).is_none() {
            warn!(
                "room {}: dropped update from unseated connection {connection_id}",
                self.id
            );
            return Vec::new();
        }
        self.snapshot.merge(&game_state);
        self.players
            .iter()
            .filter(|p| p.connection_id != connection_id)
            .map(|p| {
                (
                    p.connection_id,
                    Responses::GameStateUpdated {
                        game_state: game_state.clone(),
                        player_id,
                    },
                )
            })
            .collect()
    }

    /// Remove a player. The one left behind is renumbered to the first seat;
    /// the room closes once nobody is left.
    pub(crate) fn remove(&mut self, connection_id: ConnectionId, departure: Departure) -> Outgoing {
        let index = match self
            .players
            .iter()
            .position(|p| p.connection_id == connection_id)
        {
            Some(index) => index,
            None => return Vec::new(),
        };
        let departed = self.players.remove(index);
        for p in self.players.iter_mut() {
            p.seat = Seat::First;
        }
        if self.players.is_empty() {
            self.closed = true;
            return Vec::new();
        }
        let room_info = self.info();
        self.players
            .iter()
            .map(|p| {
                let rsp = match departure {
                    Departure::Left => Responses::PlayerLeft {
                        player_id: departed.seat,
                        room_info: room_info.clone(),
                    },
                    Departure::Disconnected => Responses::PlayerDisconnected {
                        player_id: departed.seat,
                        room_info: room_info.clone(),
                    },
                };
                (p.connection_id, rsp)
            })
            .collect()
    }
}

pub(crate) enum RoomEvent {
    Join {
        connection_id: ConnectionId,
        name: String,
        sender: Sender<Responses>,
        reply: Sender<Result<PlayerSlot, JoinFailure>>,
    },
    Relay {
        connection_id: ConnectionId,
        game_state: GameStateUpdate,
        player_id: Seat,
    },
    Leave {
        connection_id: ConnectionId,
    },
    Disconnect {
        connection_id: ConnectionId,
    },
    Inspect {
        reply: Sender<RoomInfo>,
    },
}

/// Handle of a room actor. All access to the room goes through its
/// event channel.
#[derive(Clone)]
pub(crate) struct Room {
    events: Sender<RoomEvent>,
}

impl Room {
    /// Create the room with its creator already seated first.
    pub(crate) fn open(
        id: RoomCode,
        connection_id: ConnectionId,
        name: String,
        sender: Sender<Responses>,
        manager: RoomManager,
    ) -> Result<(Room, PlayerSlot), JoinFailure> {
        let mut record = RoomRecord::new(id);
        let (player, outgoing) = record.seat(connection_id, name)?;
        let mut senders = HashMap::new();
        senders.insert(connection_id, sender);
        let (events, receiver) = bounded(CHANNEL_SIZE);
        run_room(record, senders, outgoing, receiver, manager);
        Ok((Room { events }, player))
    }

    /// A room whose actor has stopped is reported as not found.
    pub(crate) async fn join(
        &self,
        connection_id: ConnectionId,
        name: String,
        sender: Sender<Responses>,
    ) -> Result<PlayerSlot, JoinFailure> {
        let (reply, result) = bounded(1);
        let event = RoomEvent::Join {
            connection_id,
            name,
            sender,
            reply,
        };
        if self.events.send(event).await.is_err() {
            return Err(JoinFailure::NotFound);
        }
        result.recv().await.unwrap_or(Err(JoinFailure::NotFound))
    }

    pub(crate) async fn relay(
        &self,
        connection_id: ConnectionId,
        game_state: GameStateUpdate,
        player_id: Seat,
    ) {
        let _ = self
            .events
            .send(RoomEvent::Relay {
                connection_id,
                game_state,
                player_id,
            })
            .await;
    }

    pub(crate) async fn leave(&self, connection_id: ConnectionId) {
        let _ = self.events.send(RoomEvent::Leave { connection_id }).await;
    }

    pub(crate) async fn disconnect(&self, connection_id: ConnectionId) {
        let _ = self
            .events
            .send(RoomEvent::Disconnect { connection_id })
            .await;
    }

    pub(crate) async fn info(&self) -> Option<RoomInfo> {
        let (reply, result) = bounded(1);
        self.events.send(RoomEvent::Inspect { reply }).await.ok()?;
        result.recv().await.ok()
    }
}

// the background task owning a room, stops once the room closes
fn run_room(
    mut record: RoomRecord,
    mut senders: HashMap<ConnectionId, Sender<Responses>>,
    initial: Outgoing,
    mut events: Receiver<RoomEvent>,
    manager: RoomManager,
) {
    task::spawn(async move {
        let id = record.id;
        info!("room {id} opened");
        dispatch(&senders, initial).await;
        while let Some(event) = events.next().await {
            match event {
                RoomEvent::Join {
                    connection_id,
                    name,
                    sender,
                    reply,
                } => match record.seat(connection_id, name) {
                    Ok((player, outgoing)) => {
                        info!("connection {connection_id} joined room {id} as {:?}", player.seat);
                        senders.insert(connection_id, sender);
                        let _ = reply.send(Ok(player)).await;
                        dispatch(&senders, outgoing).await;
                    }
                    Err(e) => {
                        let _ = reply.send(Err(e)).await;
                    }
                },
                RoomEvent::Relay {
                    connection_id,
                    game_state,
                    player_id,
                } => {
                    #[cfg(debug_assertions)]
                    trace!("room {id}: relay from connection {connection_id}");
                    let outgoing = record.relay(connection_id, game_state, player_id);
                    dispatch(&senders, outgoing).await;
                }
                RoomEvent::Leave { connection_id } => {
                    let outgoing = record.remove(connection_id, Departure::Left);
                    senders.remove(&connection_id);
                    dispatch(&senders, outgoing).await;
                }
                RoomEvent::Disconnect { connection_id } => {
                    let outgoing = record.remove(connection_id, Departure::Disconnected);
                    senders.remove(&connection_id);
                    dispatch(&senders, outgoing).await;
                }
                RoomEvent::Inspect { reply } => {
                    let _ = reply.send(record.info()).await;
                }
            }
            if record.phase() == RoomPhase::Closed {
                break;
            }
        }
        // refuse further events, then answer what is already queued
        events.close();
        while let Ok(event) = events.try_recv() {
            match event {
                RoomEvent::Join { reply, .. } => {
                    let _ = reply.send(Err(JoinFailure::NotFound)).await;
                }
                RoomEvent::Inspect { reply } => drop(reply),
                _ => {}
            }
        }
        manager.remove_room(&id).await;
        info!("room {id} closed");
    });
}

async fn dispatch(senders: &HashMap<ConnectionId, Sender<Responses>>, outgoing: Outgoing) {
    for (connection_id, rsp) in outgoing {
        if let Some(sender) = senders.get(&connection_id) {
            let _ = sender.send(rsp).await;
        }
    }
}
