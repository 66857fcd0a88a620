//! Input latch
//!
//! The receive thread publishes samples at network speed while the frame loop
//! consumes once per tick. Gaze is overwritten (newest wins), eyelid closures
//! are sticky-ORed until the next consume so a wink that opens and closes
//! between two ticks is still seen by the controller.
//!
//! [`input_latch`] hands out exactly one [`LatchWriter`] and one
//! [`LatchReader`]. Neither is `Clone`, so the single-writer/single-reader
//! contract holds by construction.

use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::net::EyeSample;

/// When the consumer clears `has_new_data`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatchResetPolicy {
    /// Every successful consume clears the flag; a second consume with no
    /// publish in between yields nothing.
    #[default]
    ResetEveryConsume,
    /// The flag is only ever set (by a decoded sample). Once data has arrived
    /// every consume returns the latest gaze; latches still clear per consume.
    ResetOnlyOnDecode,
}

impl FromStr for LatchResetPolicy {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "every_consume" => Ok(Self::ResetEveryConsume),
            "on_decode" => Ok(Self::ResetOnlyOnDecode),
            _ => Err(UnknownVariant(s.to_string())),
        }
    }
}

/// A setting name that matches no known variant
#[derive(Debug, thiserror::Error)]
#[error("unknown variant: {0}")]
pub struct UnknownVariant(pub String);

/// The record shared between the two contexts
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatchedInputState {
    pub latest_gaze_x: f32,
    pub latest_gaze_y: f32,
    pub left_closed_latched: bool,
    pub right_closed_latched: bool,
    pub has_new_data: bool,
    /// At least one sample was published since the last consume
    pub sample_since_consume: bool,
}

/// What the frame context receives from a consume
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct LatchSnapshot {
    pub gaze_x: f32,
    pub gaze_y: f32,
    pub left_closed: bool,
    pub right_closed: bool,
    /// Built from at least one sample published since the previous consume.
    /// A stale snapshot repeats gaze only; its closures carry no information.
    pub fresh: bool,
}

struct Shared {
    state: Mutex<LatchedInputState>,
    policy: LatchResetPolicy,
}

/// Create a connected writer/reader pair
pub fn input_latch(policy: LatchResetPolicy) -> (LatchWriter, LatchReader) {
    let shared = Arc::new(Shared {
        state: Mutex::new(LatchedInputState::default()),
        policy,
    });

    (
        LatchWriter {
            shared: shared.clone(),
        },
        LatchReader { shared },
    )
}

/// Producer half, owned by the receive loop
pub struct LatchWriter {
    shared: Arc<Shared>,
}

impl LatchWriter {
    /// Publish a decoded sample. Never blocks on the reader beyond a field copy.
    pub fn publish(&self, sample: EyeSample) {
        let mut state = self.shared.state.lock();
        state.latest_gaze_x = sample.gaze_x;
        state.latest_gaze_y = sample.gaze_y;
        state.left_closed_latched |= sample.is_left_closed;
        state.right_closed_latched |= sample.is_right_closed;
        state.has_new_data = true;
        state.sample_since_consume = true;
    }
}

/// Consumer half, owned by the frame driver
pub struct LatchReader {
    shared: Arc<Shared>,
}

impl LatchReader {
    /// Take the latest input, clearing the wink latches
    pub fn consume(&self) -> Option<LatchSnapshot> {
        let mut state = self.shared.state.lock();
        if !state.has_new_data {
            return None;
        }

        let snapshot = LatchSnapshot {
            gaze_x: state.latest_gaze_x,
            gaze_y: state.latest_gaze_y,
            left_closed: state.left_closed_latched,
            right_closed: state.right_closed_latched,
            fresh: state.sample_since_consume,
        };

        state.sample_since_consume = false;
        state.left_closed_latched = false;
        state.right_closed_latched = false;
        if self.shared.policy == LatchResetPolicy::ResetEveryConsume {
            state.has_new_data = false;
        }

        Some(snapshot)
    }

    /// Read the shared record without resetting anything
    pub fn peek(&self) -> LatchedInputState {
        *self.shared.state.lock()
    }
}
