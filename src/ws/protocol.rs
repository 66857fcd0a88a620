//! Relay WebSocket message definitions
//!
//! Browser clients send eye data either as a bare object
//! (`{"gazeX": .., "isLeftClosed": .., "isRightClosed": ..}`) or wrapped in
//! an event envelope (`{"event": "eyeData", "data": {...}}`).

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::net::SocketAddr;
use uuid::Uuid;

use crate::net::EyeSample;

/// Event name carrying eye data
pub const EYE_DATA_EVENT: &str = "eyeData";

/// A parsed client message
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMsg {
    EyeData(EyeSample),
    /// Any other event; accepted and ignored
    Other { event: String },
}

#[derive(Deserialize)]
struct Envelope {
    event: String,
    /// Missing or null means every field takes its default
    #[serde(default)]
    data: Value,
}

impl ClientMsg {
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(text)?;

        if value.get("event").is_some() {
            let envelope: Envelope = serde_json::from_value(value)?;
            if envelope.event == EYE_DATA_EVENT {
                if envelope.data.is_null() {
                    return Ok(Self::EyeData(EyeSample::default()));
                }
                return Ok(Self::EyeData(serde_json::from_value(envelope.data)?));
            }
            return Ok(Self::Other {
                event: envelope.event,
            });
        }

        Ok(Self::EyeData(serde_json::from_value(value)?))
    }
}

/// Messages sent from relay to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Sent once after the upgrade
    Welcome {
        connection_id: Uuid,
        /// Where eye data is forwarded
        udp_target: SocketAddr,
        server_time: u64,
    },

    /// A message was rejected
    Error { code: String, message: String },
}
