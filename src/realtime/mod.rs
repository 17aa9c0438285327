//! Advisory seat holds shared between connected clients over WebSocket.

pub mod holds;
pub mod hub;
pub mod socket;

pub use holds::{HoldError, HoldRegistry};
pub use hub::{ClientMessage, SeatEvent, SeatEventHub};
pub use socket::ws_handler;
