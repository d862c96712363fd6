mod client_connection;
pub(crate) mod messages;
mod name;
mod room;
mod room_manager;
pub(crate) mod token;

use crate::lobby::client_connection::{MAX_DATA_SIZE, PING_INTERVAL};
use anyhow::Result;
use async_std::net::TcpListener;
use async_std::task;
pub use client_connection::ClientConnection;
use futures::StreamExt;
use log::{info, warn};
pub use messages::{
    ConnectionId, JoinFailure, Messages, PlayerSlot, Responses, RoomInfo, Seat,
};
pub use name::{validate_player_name, InvalidPlayerName, MAX_PLAYER_NAME_GRAPHEMES};
pub use room::RoomPhase;
pub use room_manager::RoomManager;
use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;
pub use token::RoomCode;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub address: SocketAddrV4,
    pub ping_interval: Option<Duration>,
    pub max_data_size: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            address: SocketAddrV4::new(Ipv4Addr::UNSPECIFIED, 8080),
            ping_interval: Some(PING_INTERVAL),
            max_data_size: MAX_DATA_SIZE,
        }
    }
}

pub async fn start_server(config: ServerConfig) -> Result<()> {
    let listener = TcpListener::bind(config.address).await?;
    serve(listener, &config).await
}

/// Accept loop on an already bound listener, one task per client.
pub async fn serve(listener: TcpListener, config: &ServerConfig) -> Result<()> {
    let room_manager = RoomManager::new();
    let mut connection_counter: ConnectionId = 0;
    info!("relay listening on {}", listener.local_addr()?);
    while let Ok((stream, socket)) = listener.accept().await {
        connection_counter = connection_counter.wrapping_add(1);
        let conn = ClientConnection::init(
            stream,
            connection_counter,
            socket,
            config.ping_interval,
            config.max_data_size,
        );
        task::spawn(serve_client(conn, room_manager.clone()));
    }
    Ok(())
}

async fn serve_client(mut conn: ClientConnection, room_manager: RoomManager) {
    let connection_id = conn.connection_id();
    let sender = conn.sender().clone();
    let mut current_room: Option<RoomCode> = None;
    while let Some(msg) = conn.next().await {
        match msg {
            Messages::CreateRoom { player_name } => {
                let name = match validate_player_name(&player_name) {
                    Ok(name) => name,
                    Err(e) => {
                        let _ = sender.send(error_response(e)).await;
                        continue;
                    }
                };
                if let Some(room_id) = current_room.take() {
                    room_manager.leave_room(&room_id, connection_id).await;
                }
                match room_manager
                    .create_room(connection_id, name, sender.clone())
                    .await
                {
                    Ok((room_id, _)) => current_room = Some(room_id),
                    Err(e) => {
                        warn!("connection {connection_id} failed to create room: {}", e.message());
                        let _ = sender.send(e.into()).await;
                    }
                }
            }
            Messages::JoinRoom {
                room_id,
                player_name,
            } => {
                let name = match validate_player_name(&player_name) {
                    Ok(name) => name,
                    Err(e) => {
                        let _ = sender.send(error_response(e)).await;
                        continue;
                    }
                };
                // failures are reported by the manager, the client keeps its seat
                if let Ok((room_id, _)) = room_manager
                    .join_room(connection_id, &room_id, name, sender.clone())
                    .await
                {
                    if let Some(previous) = current_room.replace(room_id) {
                        room_manager.leave_room(&previous, connection_id).await;
                    }
                }
            }
            Messages::UpdateGameState {
                room_id,
                game_state,
                player_id,
            } => {
                room_manager
                    .relay_state_update(&room_id, connection_id, game_state, player_id)
                    .await;
            }
            Messages::LeaveRoom { room_id } => {
                room_manager.leave_room(&room_id, connection_id).await;
                if current_room == Some(room_id) {
                    current_room = None;
                }
            }
        }
    }
    room_manager.handle_disconnect(connection_id).await;
}

fn error_response(e: InvalidPlayerName) -> Responses {
    Responses::Error {
        message: e.to_string(),
    }
}
