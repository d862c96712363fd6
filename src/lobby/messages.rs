//! Implementation principles.
//! - disconnection without clear exit signal is considered as disconnection.
//! - the server relays game state as is, it never replays moves.
use crate::game::{GameStateUpdate, Player};
use crate::lobby::token::RoomCode;
use anyhow::Error;
use bincode::config::Configuration;
use bincode::{config, Decode, Encode};
use bincode::{decode_from_slice, encode_to_vec};

const BIN_CONFIG: Configuration = config::standard().with_variable_int_encoding();

/// server assigned id of a client connection
pub type ConnectionId = u64;

/// Seat in a room. The earliest joined player still present sits `First`
/// and plays [`Player::One`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Encode, Decode)]
pub enum Seat {
    First,
    Second,
}

impl Seat {
    pub fn player(&self) -> Player {
        match self {
            Seat::First => Player::One,
            Seat::Second => Player::Two,
        }
    }

    pub fn opponent(&self) -> Seat {
        match self {
            Seat::First => Seat::Second,
            Seat::Second => Seat::First,
        }
    }
}

#[derive(Clone, PartialEq, Eq, Debug, Encode, Decode)]
pub struct PlayerSlot {
    pub connection_id: ConnectionId,
    pub name: String,
    pub seat: Seat,
}

#[derive(Clone, PartialEq, Eq, Debug, Encode, Decode)]
pub struct RoomInfo {
    pub id: RoomCode,
    pub players: Vec<PlayerSlot>,
    /// last known game state, empty until the first relay
    pub snapshot: GameStateUpdate,
    /// seconds since unix epoch
    pub created_at: u64,
}

#[derive(Clone, PartialEq, Eq, Debug, Encode, Decode)]
pub enum Messages {
    /// create a room and take its first seat
    CreateRoom { player_name: String },
    /// join a room by its code, case-insensitive
    JoinRoom {
        room_id: String,
        player_name: String,
    },
    /// relay a game state to the other seat
    UpdateGameState {
        room_id: RoomCode,
        game_state: GameStateUpdate,
        player_id: Seat,
    },
    /// leave a room
    LeaveRoom { room_id: RoomCode },
}

#[derive(Clone, PartialEq, Eq, Debug, Encode, Decode)]
pub enum Responses {
    /// response to `CreateRoom`
    RoomCreated {
        room_id: RoomCode,
        player: PlayerSlot,
        room_info: RoomInfo,
    },
    /// response to `JoinRoom`
    RoomJoined {
        room_id: RoomCode,
        player: PlayerSlot,
        room_info: RoomInfo,
    },
    /// to the player already seated when the second player joins
    PlayerJoined { player: PlayerSlot, room_info: RoomInfo },
    /// relayed `UpdateGameState`, never echoed back to its sender
    GameStateUpdated {
        game_state: GameStateUpdate,
        player_id: Seat,
    },
    /// the other player left with `LeaveRoom`
    PlayerLeft { player_id: Seat, room_info: RoomInfo },
    /// the other player's connection dropped
    PlayerDisconnected { player_id: Seat, room_info: RoomInfo },
    /// rejected request
    Error { message: String },
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum JoinFailure {
    NotFound,
    Full,
}

impl JoinFailure {
    pub fn message(&self) -> &'static str {
        match self {
            JoinFailure::NotFound => "Room not found",
            JoinFailure::Full => "Room is full",
        }
    }
}

impl From<JoinFailure> for Responses {
    fn from(failure: JoinFailure) -> Self {
        Responses::Error {
            message: failure.message().to_string(),
        }
    }
}

impl TryFrom<Messages> for Vec<u8> {
    type Error = Error;

    fn try_from(value: Messages) -> std::result::Result<Self, Error> {
        encode_to_vec(value, BIN_CONFIG).map_err(|_| Error::msg("client message encode error"))
    }
}

impl TryFrom<Responses> for Vec<u8> {
    type Error = Error;

    fn try_from(value: Responses) -> std::result::Result<Self, Error> {
        encode_to_vec(value, BIN_CONFIG).map_err(|_| Error::msg("server response encode error"))
    }
}

impl TryFrom<Vec<u8>> for Messages {
    type Error = Error;

    fn try_from(value: Vec<u8>) -> std::result::Result<Self, Error> {
        match decode_from_slice(&value, BIN_CONFIG) {
            Ok((msg, _)) => Ok(msg),
            Err(_) => Err(Error::msg("client message decode error")),
        }
    }
}

impl TryFrom<Vec<u8>> for Responses {
    type Error = Error;

    fn try_from(value: Vec<u8>) -> std::result::Result<Self, Error> {
        match decode_from_slice(&value, BIN_CONFIG) {
            Ok((msg, _)) => Ok(msg),
            Err(_) => Err(Error::msg("server response decode error")),
        }
    }
}

#[cfg(test)]
mod test_messages {
    use super::*;
    use crate::game::{GameState, Position};

    fn room_info() -> RoomInfo {
        RoomInfo {
            id: RoomCode::from_code("ABC123").unwrap(),
            players: vec![PlayerSlot {
                connection_id: 7,
                name: "小明".to_string(),
                seat: Seat::First,
            }],
            snapshot: GameStateUpdate::default(),
            created_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_message_codec() {
        let state = GameState::default();
        let msg = Messages::UpdateGameState {
            room_id: RoomCode::from_code("ABC123").unwrap(),
            game_state: state.to_update(),
            player_id: Seat::First,
        };
        let bytes: Vec<u8> = msg.clone().try_into().unwrap();
        assert_eq!(Messages::try_from(bytes).unwrap(), msg);
    }

    #[test]
    fn test_response_codec() {
        let rsp = Responses::PlayerDisconnected {
            player_id: Seat::Second,
            room_info: room_info(),
        };
        let bytes: Vec<u8> = rsp.clone().try_into().unwrap();
        assert_eq!(Responses::try_from(bytes).unwrap(), rsp);

        let partial = Responses::GameStateUpdated {
            game_state: GameStateUpdate {
                selected_piece: Some(None),
                sequential_capture: Some(false),
                ..Default::default()
            },
            player_id: Seat::Second,
        };
        let bytes: Vec<u8> = partial.clone().try_into().unwrap();
        // "cleared" and "absent" selections stay distinct on the wire
        match Responses::try_from(bytes).unwrap() {
            Responses::GameStateUpdated { game_state, .. } => {
                assert_eq!(game_state.selected_piece, Some(None));
                assert_eq!(game_state.board, None);
            }
            other => panic!("unexpected {other:?}"),
        }
        let selected = GameStateUpdate {
            selected_piece: Some(Some(Position::new(4, 0))),
            ..Default::default()
        };
        let bytes: Vec<u8> = Messages::UpdateGameState {
            room_id: RoomCode::from_code("ABC123").unwrap(),
            game_state: selected.clone(),
            player_id: Seat::First,
        }
        .try_into()
        .unwrap();
        assert!(matches!(
            Messages::try_from(bytes).unwrap(),
            Messages::UpdateGameState { game_state, .. } if game_state == selected
        ));
    }

    #[test]
    fn test_decode_garbage() {
        assert!(Messages::try_from(vec![255, 255, 255]).is_err());
        assert!(Responses::try_from(Vec::new()).is_err());
    }

    #[test]
    fn test_join_failure_messages() {
        assert_eq!(
            Responses::from(JoinFailure::NotFound),
            Responses::Error {
                message: "Room not found".to_string()
            }
        );
        assert_eq!(JoinFailure::Full.message(), "Room is full");
        assert_eq!(Seat::First.player(), Player::One);
        assert_eq!(Seat::Second.opponent(), Seat::First);
    }
}
