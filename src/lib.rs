pub mod game;
pub mod lobby;
pub(crate) mod network;
pub mod remote;

pub use game::*;
pub use lobby::{
    serve, start_server, validate_player_name, ConnectionId, InvalidPlayerName, JoinFailure,
    Messages, PlayerSlot, Responses, RoomCode, RoomInfo, RoomManager, RoomPhase, Seat,
    ServerConfig,
};
pub use network::{Conn, ConnectionError, Received};
pub use remote::{Notice, RemoteSession, SessionError};

pub(crate) const CHANNEL_SIZE: usize = 5;
