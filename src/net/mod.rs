//! Datagram transport for eye-tracking samples

pub mod forwarder;
pub mod packet;
pub mod receiver;

pub use forwarder::{ForwardError, UdpForwarder};
pub use packet::EyeSample;
pub use receiver::EyeDataReceiver;
