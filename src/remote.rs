//! Client half of the room protocol.
//!
//! `RemoteSession` owns the local [`GameState`] and keeps it in sync with
//! the peer through the relay. Outgoing messages go to a channel, normally
//! the sender of a [`Conn`](crate::network::Conn).
use crate::game::{ClickOutcome, GameError, GameState, Move, Position, RuleSet};
use crate::lobby::{JoinFailure, Messages, PlayerSlot, Responses, RoomCode};
use async_std::channel::Sender;
use log::{info, warn};
use std::fmt::{Display, Formatter};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionError {
    NotConnected,
    RoomNotFound,
    RoomFull,
    OpponentDisconnected,
    InvalidMove(GameError),
    Server(String),
}

impl Display for SessionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::NotConnected => f.write_str("not connected to a server"),
            SessionError::RoomNotFound => f.write_str(JoinFailure::NotFound.message()),
            SessionError::RoomFull => f.write_str(JoinFailure::Full.message()),
            SessionError::OpponentDisconnected => f.write_str("opponent disconnected"),
            SessionError::InvalidMove(e) => write!(f, "invalid move: {e}"),
            SessionError::Server(message) => write!(f, "server error: {message}"),
        }
    }
}

impl std::error::Error for SessionError {}

impl From<GameError> for SessionError {
    fn from(e: GameError) -> Self {
        SessionError::InvalidMove(e)
    }
}

/// What a server response meant for this client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Notice {
    RoomCreated(RoomCode),
    RoomJoined(RoomCode),
    OpponentJoined(PlayerSlot),
    StateUpdated,
    OpponentDisconnected,
    Failed(SessionError),
}

pub struct RemoteSession {
    outbound: Option<Sender<Messages>>,
    room: Option<RoomCode>,
    me: Option<PlayerSlot>,
    roster: Vec<PlayerSlot>,
    game: GameState,
}

impl RemoteSession {
    /// `outbound` is `None` for a client without a server.
    pub fn new(outbound: Option<Sender<Messages>>, rules: RuleSet) -> Self {
        RemoteSession {
            outbound,
            room: None,
            me: None,
            roster: Vec::new(),
            game: GameState::new(rules),
        }
    }

    pub fn game(&self) -> &GameState {
        &self.game
    }

    pub fn room(&self) -> Option<RoomCode> {
        self.room
    }

    pub fn me(&self) -> Option<&PlayerSlot> {
        self.me.as_ref()
    }

    pub fn roster(&self) -> &[PlayerSlot] {
        &self.roster
    }

    pub fn has_opponent(&self) -> bool {
        self.roster.len() == 2
    }

    /// A computer opponent may only play while no human one is seated.
    pub fn single_player_eligible(&self) -> bool {
        !self.has_opponent()
    }

    /// Always true without an opponent: both sides are played locally.
    pub fn is_my_turn(&self) -> bool {
        match &self.me {
            Some(me) if self.has_opponent() => self.game.current_player() == me.seat.player(),
            _ => true,
        }
    }

    pub async fn create_room(&mut self, player_name: &str) -> Result<(), SessionError> {
        self.send(Messages::CreateRoom {
            player_name: player_name.to_string(),
        })
        .await
    }

    pub async fn join_room(&mut self, room_id: &str, player_name: &str) -> Result<(), SessionError> {
        self.send(Messages::JoinRoom {
            room_id: room_id.trim().to_string(),
            player_name: player_name.to_string(),
        })
        .await
    }

    /// Leave the current room, if any, and keep playing locally.
    pub async fn leave_room(&mut self) -> Result<(), SessionError> {
        if let Some(room_id) = self.room.take() {
            self.me = None;
            self.roster.clear();
            self.send(Messages::LeaveRoom { room_id }).await?;
        }
        Ok(())
    }

    /// Click on the local board. Moves are published to the peer.
    pub async fn click(&mut self, pos: Position) -> Result<ClickOutcome, SessionError> {
        if !self.is_my_turn() {
            return Ok(ClickOutcome::Ignored);
        }
        let outcome = self.game.click(pos);
        match &outcome {
            ClickOutcome::Selected(next) | ClickOutcome::Rejected(next, _) => {
                self.game = next.clone();
            }
            ClickOutcome::Moved(next) => {
                self.game = next.clone();
                self.publish().await?;
            }
            ClickOutcome::Ignored => {}
        }
        Ok(outcome)
    }

    /// Play a whole move, e.g. one chosen by the computer.
    pub async fn apply_move(&mut self, mv: &Move) -> Result<(), SessionError> {
        self.game = self.game.apply(mv)?;
        self.publish().await
    }

    /// Send the local state to the peer. A no-op outside of a room.
    pub async fn publish(&self) -> Result<(), SessionError> {
        match (self.room, &self.me) {
            (Some(room_id), Some(me)) => {
                self.send(Messages::UpdateGameState {
                    room_id,
                    game_state: self.game.to_update(),
                    player_id: me.seat,
                })
                .await
            }
            _ => Ok(()),
        }
    }

    /// Handle a response and answer it where the protocol needs it: when
    /// an opponent joins, the seated player publishes the fresh game so
    /// both sides start from the same state.
    pub async fn receive(&mut self, response: Responses) -> Result<Option<Notice>, SessionError> {
        let notice = self.handle_response(response);
        if let Some(Notice::OpponentJoined(_)) = &notice {
            self.publish().await?;
        }
        Ok(notice)
    }

    pub fn handle_response(&mut self, response: Responses) -> Option<Notice> {
        match response {
            Responses::RoomCreated {
                room_id,
                player,
                room_info,
            } => {
                info!("created room {room_id}");
                self.enter(room_id, player, room_info.players);
                self.game = GameState::new(self.game.rules);
                Some(Notice::RoomCreated(room_id))
            }
            Responses::RoomJoined {
                room_id,
                player,
                room_info,
            } => {
                info!("joined room {room_id} as {:?}", player.seat);
                self.enter(room_id, player, room_info.players);
                self.game = GameState::new(self.game.rules).apply_update(&room_info.snapshot);
                Some(Notice::RoomJoined(room_id))
            }
            Responses::PlayerJoined { player, room_info } => {
                self.refresh_roster(room_info.players);
                if self.is_me(&player) {
                    return None;
                }
                // a new opponent starts from a fresh board
                self.game = GameState::new(self.game.rules);
                Some(Notice::OpponentJoined(player))
            }
            Responses::GameStateUpdated {
                game_state,
                player_id,
            } => {
                let own = matches!(&self.me, Some(me) if me.seat == player_id);
                if own || self.room.is_none() {
                    return None;
                }
                self.game = self.game.apply_update(&game_state);
                Some(Notice::StateUpdated)
            }
            Responses::PlayerLeft {
                player_id,
                room_info,
            }
            | Responses::PlayerDisconnected {
                player_id,
                room_info,
            } => {
                info!("player in seat {player_id:?} left the room");
                self.refresh_roster(room_info.players);
                Some(Notice::OpponentDisconnected)
            }
            Responses::Error { message } => {
                warn!("server error: {message}");
                let error = if message == JoinFailure::NotFound.message() {
                    SessionError::RoomNotFound
                } else if message == JoinFailure::Full.message() {
                    SessionError::RoomFull
                } else {
                    SessionError::Server(message)
                };
                Some(Notice::Failed(error))
            }
        }
    }

    fn enter(&mut self, room_id: RoomCode, player: PlayerSlot, players: Vec<PlayerSlot>) {
        self.room = Some(room_id);
        self.me = Some(player);
        self.roster = players;
    }

    /// Seats are renumbered when a player leaves, so re-read our own.
    fn refresh_roster(&mut self, players: Vec<PlayerSlot>) {
        if let Some(me) = &mut self.me {
            if let Some(slot) = players.iter().find(|p| p.connection_id == me.connection_id) {
                me.seat = slot.seat;
            }
        }
        self.roster = players;
    }

    fn is_me(&self, player: &PlayerSlot) -> bool {
        matches!(&self.me, Some(me) if me.connection_id == player.connection_id)
    }

    async fn send(&self, msg: Messages) -> Result<(), SessionError> {
        match &self.outbound {
            Some(outbound) => outbound
                .send(msg)
                .await
                .map_err(|_| SessionError::NotConnected),
            None => Err(SessionError::NotConnected),
        }
    }
}

#[cfg(test)]
mod test_remote_session {
    use super::*;
    use crate::game::{GameStateUpdate, Player};
    use crate::lobby::{RoomInfo, Seat};
    use async_std::channel::{bounded, Receiver};
    use futures::executor::block_on;

    fn slot(connection_id: u64, seat: Seat) -> PlayerSlot {
        PlayerSlot {
            connection_id,
            name: format!("player{connection_id}"),
            seat,
        }
    }

    fn info(players: Vec<PlayerSlot>) -> RoomInfo {
        RoomInfo {
            id: code(),
            players,
            snapshot: GameStateUpdate::default(),
            created_at: 0,
        }
    }

    fn code() -> RoomCode {
        RoomCode::from_code("ABC123").unwrap()
    }

    fn session() -> (RemoteSession, Receiver<Messages>) {
        let (sender, receiver) = bounded(16);
        (RemoteSession::new(Some(sender), RuleSet::default()), receiver)
    }

    /// a session seated first with an opponent in the room
    fn seated_first() -> (RemoteSession, Receiver<Messages>) {
        let (mut s, r) = session();
        s.handle_response(Responses::RoomCreated {
            room_id: code(),
            player: slot(1, Seat::First),
            room_info: info(vec![slot(1, Seat::First)]),
        });
        let notice = s.handle_response(Responses::PlayerJoined {
            player: slot(2, Seat::Second),
            room_info: info(vec![slot(1, Seat::First), slot(2, Seat::Second)]),
        });
        assert_eq!(notice, Some(Notice::OpponentJoined(slot(2, Seat::Second))));
        (s, r)
    }

    #[test]
    fn test_offline() {
        block_on(async {
            let mut s = RemoteSession::new(None, RuleSet::default());
            assert_eq!(s.create_room("alice").await, Err(SessionError::NotConnected));
            assert!(s.is_my_turn());
            assert!(s.single_player_eligible());
            // both sides are local, publishing is a no-op
            let outcome = s.click(Position::new(3, 2)).await.unwrap();
            assert!(matches!(outcome, ClickOutcome::Selected(_)));
            let outcome = s.click(Position::new(2, 2)).await.unwrap();
            assert!(matches!(outcome, ClickOutcome::Moved(_)));
            assert_eq!(s.game().current_player(), Player::Two);
        });
    }

    #[test]
    fn test_move_is_published() {
        block_on(async {
            let (mut s, r) = seated_first();
            assert!(s.is_my_turn());
            assert!(!s.single_player_eligible());
            s.click(Position::new(3, 2)).await.unwrap();
            s.click(Position::new(2, 2)).await.unwrap();
            match r.try_recv().unwrap() {
                Messages::UpdateGameState {
                    room_id,
                    game_state,
                    player_id,
                } => {
                    assert_eq!(room_id, code());
                    assert_eq!(player_id, Seat::First);
                    assert_eq!(game_state, s.game().to_update());
                    assert_eq!(game_state.current_player, Some(Player::Two));
                }
                other => panic!("unexpected {other:?}"),
            }
            // the opponent's turn now
            assert!(!s.is_my_turn());
            let outcome = s.click(Position::new(1, 2)).await.unwrap();
            assert_eq!(outcome, ClickOutcome::Ignored);
        });
    }

    #[test]
    fn test_opponent_join_publishes_fresh_game() {
        block_on(async {
            let (mut s, r) = session();
            s.handle_response(Responses::RoomCreated {
                room_id: code(),
                player: slot(1, Seat::First),
                room_info: info(vec![slot(1, Seat::First)]),
            });
            // a move played alone
            s.click(Position::new(3, 2)).await.unwrap();
            s.click(Position::new(2, 2)).await.unwrap();
            assert!(r.try_recv().is_ok());
            assert_ne!(s.game(), &GameState::default());

            let notice = s
                .receive(Responses::PlayerJoined {
                    player: slot(2, Seat::Second),
                    room_info: info(vec![slot(1, Seat::First), slot(2, Seat::Second)]),
                })
                .await
                .unwrap();
            assert_eq!(notice, Some(Notice::OpponentJoined(slot(2, Seat::Second))));
            assert_eq!(s.game(), &GameState::default());
            match r.try_recv().unwrap() {
                Messages::UpdateGameState {
                    game_state,
                    player_id,
                    ..
                } => {
                    assert_eq!(player_id, Seat::First);
                    assert_eq!(game_state, GameState::default().to_update());
                }
                other => panic!("unexpected {other:?}"),
            }
            // other responses send nothing
            let notice = s
                .receive(Responses::GameStateUpdated {
                    game_state: GameState::default().to_update(),
                    player_id: Seat::Second,
                })
                .await
                .unwrap();
            assert_eq!(notice, Some(Notice::StateUpdated));
            assert!(r.try_recv().is_err());
        });
    }

    #[test]
    fn test_relayed_state_replaces_local() {
        let (mut s, _r) = seated_first();
        let remote = GameState::default()
            .apply(&Move::simple(Position::new(3, 2), Position::new(2, 2)))
            .unwrap();
        // own echo is ignored
        let own = s.handle_response(Responses::GameStateUpdated {
            game_state: remote.to_update(),
            player_id: Seat::First,
        });
        assert_eq!(own, None);
        let notice = s.handle_response(Responses::GameStateUpdated {
            game_state: remote.to_update(),
            player_id: Seat::Second,
        });
        assert_eq!(notice, Some(Notice::StateUpdated));
        assert_eq!(s.game(), &remote);
    }

    #[test]
    fn test_opponent_departure() {
        let (mut s, _r) = session();
        s.handle_response(Responses::RoomJoined {
            room_id: code(),
            player: slot(2, Seat::Second),
            room_info: info(vec![slot(1, Seat::First), slot(2, Seat::Second)]),
        });
        assert_eq!(s.me().unwrap().seat, Seat::Second);
        assert!(!s.is_my_turn());
        let notice = s.handle_response(Responses::PlayerDisconnected {
            player_id: Seat::First,
            room_info: info(vec![slot(2, Seat::First)]),
        });
        assert_eq!(notice, Some(Notice::OpponentDisconnected));
        // renumbered to the first seat, alone again
        assert_eq!(s.me().unwrap().seat, Seat::First);
        assert!(s.single_player_eligible());
        assert!(s.is_my_turn());
    }

    #[test]
    fn test_join_errors() {
        let (mut s, _r) = session();
        let full = s.handle_response(Responses::from(JoinFailure::Full));
        assert_eq!(full, Some(Notice::Failed(SessionError::RoomFull)));
        let missing = s.handle_response(Responses::from(JoinFailure::NotFound));
        assert_eq!(missing, Some(Notice::Failed(SessionError::RoomNotFound)));
        let other = s.handle_response(Responses::Error {
            message: "Player name is empty".to_string(),
        });
        assert_eq!(
            other,
            Some(Notice::Failed(SessionError::Server(
                "Player name is empty".to_string()
            )))
        );
    }

    #[test]
    fn test_leave_room() {
        block_on(async {
            let (mut s, r) = seated_first();
            s.leave_room().await.unwrap();
            assert_eq!(r.try_recv().unwrap(), Messages::LeaveRoom { room_id: code() });
            assert_eq!(s.room(), None);
            assert!(s.roster().is_empty());
            // nothing to leave
            s.leave_room().await.unwrap();
            assert!(r.try_recv().is_err());
        });
    }
}
