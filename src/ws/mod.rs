//! WebSocket relay from browser trackers to the UDP wire format

pub mod handler;
pub mod protocol;
