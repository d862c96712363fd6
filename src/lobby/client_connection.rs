use crate::lobby::messages::{ConnectionId, Messages, Responses};
use crate::network::connection::{Conn, Received};
use async_std::channel::Sender;
use async_std::net::TcpStream;
use async_std::prelude::Stream;
use futures::StreamExt;
use log::{error, info};
use std::net::SocketAddr;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

pub const PING_INTERVAL: Duration = Duration::from_secs(5);
pub const MAX_DATA_SIZE: u32 = 1024 * 64;

/// A relay client. Yields its messages, skipping pings; ends on
/// disconnection or on any transport error.
pub struct ClientConnection {
    inner: Conn<Responses, Messages>,
    connection_id: ConnectionId,
    socket_address: SocketAddr,
}

impl ClientConnection {
    pub fn init(
        tcp: TcpStream,
        connection_id: ConnectionId,
        socket_address: SocketAddr,
        ping_interval: Option<Duration>,
        max_data_size: u32,
    ) -> Self {
        info!("connection {connection_id} from {socket_address}");
        ClientConnection {
            inner: Conn::init(tcp, ping_interval, max_data_size),
            connection_id,
            socket_address,
        }
    }

    pub(crate) fn sender(&self) -> &Sender<Responses> {
        self.inner.sender()
    }

    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }
}

impl Stream for ClientConnection {
    type Item = Messages;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        loop {
            // this loop skips `Ping`
            match self.inner.poll_next_unpin(cx) {
                Poll::Ready(None) => break Poll::Ready(None),
                Poll::Ready(Some(msg)) => match msg {
                    Received::Response(msg) => break Poll::Ready(Some(msg)),
                    Received::Ping => {}
                    Received::Error(e) => {
                        let address = self.socket_address;
                        error!("connection error ({e}) of {address}");
                        break Poll::Ready(None);
                    }
                    Received::RemoteError(e) => {
                        let address = self.socket_address;
                        error!("remote connection error ({e}) of {address}");
                        break Poll::Ready(None);
                    }
                },
                Poll::Pending => break Poll::Pending,
            }
        }
    }
}

impl Drop for ClientConnection {
    fn drop(&mut self) {
        info!(
            "connection {} ({}) disconnected from server",
            self.connection_id, self.socket_address
        );
    }
}
