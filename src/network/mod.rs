//! Network Infrastructure
//!
//! This module contains basic utility for establishing
//! stable network connection.
pub(crate) mod connection;
pub use connection::{Conn, ConnectionError, Received};
