//! Framed transport over a `TcpStream`, exposed as a channel pair.
//!
//! Frames on the wire:
//!
//! - `[DATA, size: u32 BE, payload, crc32: u32 BE]`
//! - `[PING]`
//! - `[ERROR, code]`
//!
//! One task reads frames. A second task owns the write side, so pings and
//! error reports never interleave with a data frame.
//!
//! Dropping the `Conn`, or every clone of its sender, closes the connection.
//! When the remote stops writing, the stream of received items ends.
//!
//! A malformed incoming frame closes the connection. It is reported locally
//! as `Received::Error` and to the remote as an `ERROR` frame:
//!
//! - DecodeError: the payload is not a valid response
//! - MaxDataLengthExceeded: the announced payload is too long
//! - DataCorrupted: the checksum does not match
//! - UnknownMessageType: the frame type byte is unknown
use async_std::channel::{bounded, Receiver, Sender};
use async_std::io::BufReader;
use async_std::net::TcpStream;
use async_std::prelude::Stream;
use async_std::task;
use crc32fast::hash as checksum;
use futures::stream::{self, BoxStream};
use futures::{stream_select, AsyncRead, AsyncReadExt, AsyncWriteExt, StreamExt};
use log::warn;
use std::fmt::{Debug, Display, Formatter};
use std::net::Shutdown;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

const NET_CHANNEL_SIZE: usize = 20;

// frame types
const DATA: u8 = 0;
const PING: u8 = 100;
const ERROR: u8 = 200;

/// Both ends of a connection.
///
/// `Msg` is sent, `Rsp` is received. The server uses
/// `Conn<Responses, Messages>`, a client the reverse.
pub struct Conn<Msg, Rsp> {
    sender: Sender<Msg>,
    receiver: Receiver<Received<Rsp>>,
}

impl<Msg, Rsp> Conn<Msg, Rsp>
where
    Msg: Send + 'static + TryInto<Vec<u8>>,
    Rsp: Send + 'static + TryFrom<Vec<u8>>,
{
    /// Spawn the reader and writer tasks of `tcp`. With a `ping_interval`
    /// the writer pings the remote, so a dead peer ends in a write error.
    pub fn init(tcp: TcpStream, ping_interval: Option<Duration>, max_data_size: u32) -> Self {
        let (sender, messages) = bounded(NET_CHANNEL_SIZE);
        let (responses, receiver) = bounded(NET_CHANNEL_SIZE);
        let (failures, failed) = bounded(1);
        task::spawn(write_frames(
            tcp.clone(),
            messages,
            failed,
            ping_interval,
            max_data_size,
        ));
        task::spawn(read_frames(tcp, responses, failures, max_data_size));
        Conn { sender, receiver }
    }
}

impl<Msg, Rsp> Conn<Msg, Rsp> {
    pub fn sender(&self) -> &Sender<Msg> {
        &self.sender
    }
}

impl<Msg, Rsp> Stream for Conn<Msg, Rsp> {
    type Item = Received<Rsp>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.receiver.poll_next_unpin(cx)
    }
}

/// An item read from the connection.
pub enum Received<T> {
    Response(T),
    Ping,
    /// a malformed frame arrived, the connection is closing
    Error(ConnectionError),
    /// the remote rejected one of our frames and closed the connection
    RemoteError(ConnectionError),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionError {
    MaxDataLengthExceeded,
    UnknownMessageType,
    DataCorrupted,
    DecodeError,
    /// an error code this side does not know
    UnknownError,
}

impl ConnectionError {
    fn code(&self) -> u8 {
        match self {
            ConnectionError::UnknownError => 100,
            ConnectionError::MaxDataLengthExceeded => 200,
            ConnectionError::UnknownMessageType => 201,
            ConnectionError::DecodeError => 202,
            ConnectionError::DataCorrupted => 203,
        }
    }

    fn from_code(code: u8) -> Self {
        match code {
            200 => ConnectionError::MaxDataLengthExceeded,
            201 => ConnectionError::UnknownMessageType,
            202 => ConnectionError::DecodeError,
            203 => ConnectionError::DataCorrupted,
            _ => ConnectionError::UnknownError,
        }
    }
}

impl Display for ConnectionError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            ConnectionError::MaxDataLengthExceeded => "max data length exceeded",
            ConnectionError::UnknownMessageType => "unknown message type",
            ConnectionError::DataCorrupted => "data corrupted",
            ConnectionError::DecodeError => "decode error",
            ConnectionError::UnknownError => "unknown error",
        };
        f.write_str(text)
    }
}

impl std::error::Error for ConnectionError {}

impl<T> Debug for Received<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Received::Response(_) => f.write_str("Received::Response"),
            Received::Ping => f.write_str("Received::Ping"),
            Received::Error(e) => write!(f, "Received::Error({e})"),
            Received::RemoteError(e) => write!(f, "Received::RemoteError({e})"),
        }
    }
}

/// A frame as read off the wire, payload not yet decoded.
#[derive(Debug, PartialEq, Eq)]
enum Frame {
    Data(Vec<u8>),
    Ping,
    Error(ConnectionError),
}

impl Frame {
    fn decode<Rsp: TryFrom<Vec<u8>>>(self) -> Result<Received<Rsp>, ConnectionError> {
        match self {
            Frame::Data(payload) => Rsp::try_from(payload)
                .map(Received::Response)
                .map_err(|_| ConnectionError::DecodeError),
            Frame::Ping => Ok(Received::Ping),
            Frame::Error(e) => Ok(Received::RemoteError(e)),
        }
    }
}

/// `None` for payloads above `max_data_size`.
fn data_frame(payload: &[u8], max_data_size: u32) -> Option<Vec<u8>> {
    let size = u32::try_from(payload.len())
        .ok()
        .filter(|size| *size <= max_data_size)?;
    let mut frame = Vec::with_capacity(payload.len() + 9);
    frame.push(DATA);
    frame.extend(size.to_be_bytes());
    frame.extend(payload);
    frame.extend(checksum(payload).to_be_bytes());
    Some(frame)
}

struct FrameReader<R> {
    reader: BufReader<R>,
    max_data_size: u32,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    fn new(inner: R, max_data_size: u32) -> Self {
        FrameReader {
            reader: BufReader::new(inner),
            max_data_size,
        }
    }

    /// `Ok(None)` once the remote stops writing, also in the middle of a
    /// frame. The size limit is checked before the payload is read.
    async fn next_frame(&mut self) -> Result<Option<Frame>, ConnectionError> {
        let mut kind = [0u8; 1];
        if !self.fill(&mut kind).await {
            return Ok(None);
        }
        match kind[0] {
            PING => Ok(Some(Frame::Ping)),
            ERROR => {
                let mut code = [0u8; 1];
                if !self.fill(&mut code).await {
                    return Ok(None);
                }
                Ok(Some(Frame::Error(ConnectionError::from_code(code[0]))))
            }
            DATA => {
                let mut size = [0u8; 4];
                if !self.fill(&mut size).await {
                    return Ok(None);
                }
                let size = u32::from_be_bytes(size);
                if size > self.max_data_size {
                    return Err(ConnectionError::MaxDataLengthExceeded);
                }
                // payload followed by its checksum
                let mut body = vec![0u8; size as usize + 4];
                if !self.fill(&mut body).await {
                    return Ok(None);
                }
                let crc = body.split_off(size as usize);
                if crc[..] != checksum(&body).to_be_bytes() {
                    return Err(ConnectionError::DataCorrupted);
                }
                Ok(Some(Frame::Data(body)))
            }
            _ => Err(ConnectionError::UnknownMessageType),
        }
    }

    async fn fill(&mut self, buf: &mut [u8]) -> bool {
        self.reader.read_exact(buf).await.is_ok()
    }
}

/// Owns the only `Sender` of received items: the stream ends with this task.
///
/// Dropping the receiving side closes both directions. A malformed frame
/// is handed to the writer, which reports it and closes the connection.
async fn read_frames<Rsp>(
    tcp: TcpStream,
    responses: Sender<Received<Rsp>>,
    failures: Sender<ConnectionError>,
    max_data_size: u32,
) where
    Rsp: TryFrom<Vec<u8>>,
{
    let mut frames = FrameReader::new(tcp.clone(), max_data_size);
    loop {
        let next = frames
            .next_frame()
            .await
            .and_then(|frame| frame.map(Frame::decode::<Rsp>).transpose());
        match next {
            Ok(Some(received)) => {
                if responses.send(received).await.is_err() {
                    let _ = tcp.shutdown(Shutdown::Both);
                    return;
                }
            }
            Ok(None) => {
                let _ = tcp.shutdown(Shutdown::Read);
                return;
            }
            Err(e) => {
                let _ = responses.send(Received::Error(e.clone())).await;
                if failures.send(e).await.is_err() {
                    let _ = tcp.shutdown(Shutdown::Both);
                }
                return;
            }
        }
    }
}

enum Outbound<Msg> {
    Message(Msg),
    Ping,
    Fail(ConnectionError),
    /// every sender of messages is gone
    Closed,
}

/// The single writer of `tcp`. Stops, closing both directions, on a write
/// error, after reporting a failure, or once the messages run out.
/// Messages that cannot be encoded or are too large are skipped.
async fn write_frames<Msg>(
    mut tcp: TcpStream,
    messages: Receiver<Msg>,
    failures: Receiver<ConnectionError>,
    ping_interval: Option<Duration>,
    max_data_size: u32,
) where
    Msg: Send + 'static + TryInto<Vec<u8>>,
{
    let messages: BoxStream<'static, Outbound<Msg>> = messages
        .map(Outbound::Message)
        .chain(stream::once(async { Outbound::Closed }))
        .boxed();
    let failures: BoxStream<'static, Outbound<Msg>> = failures.map(Outbound::Fail).boxed();
    let pings: BoxStream<'static, Outbound<Msg>> = match ping_interval {
        Some(every) => stream::unfold((), move |_| async move {
            task::sleep(every).await;
            Some((Outbound::Ping, ()))
        })
        .boxed(),
        None => stream::pending().boxed(),
    };
    let mut outbound = stream_select!(messages, failures, pings);
    while let Some(next) = outbound.next().await {
        let frame = match next {
            Outbound::Message(msg) => {
                let frame = msg
                    .try_into()
                    .ok()
                    .and_then(|payload: Vec<u8>| data_frame(&payload, max_data_size));
                match frame {
                    Some(frame) => frame,
                    None => {
                        warn!("dropped outgoing message: not encodable in {max_data_size} bytes");
                        continue;
                    }
                }
            }
            Outbound::Ping => vec![PING],
            Outbound::Fail(e) => {
                let _ = tcp.write_all(&[ERROR, e.code()]).await;
                break;
            }
            Outbound::Closed => break,
        };
        if tcp.write_all(&frame).await.is_err() {
            break;
        }
    }
    let _ = tcp.shutdown(Shutdown::Both);
}
