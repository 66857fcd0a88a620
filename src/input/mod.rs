//! Input hand-off between the network context and the frame context

pub mod latch;

pub use latch::{input_latch, LatchReader, LatchResetPolicy, LatchSnapshot, LatchWriter, UnknownVariant};
