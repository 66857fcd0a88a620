//! Character simulation: engine boundary, motion controller and frame loop

pub mod driver;
pub mod engine;
pub mod host;
pub mod motion;
pub mod steering;

pub use driver::PlayerStatus;
pub use host::{GameHost, SharedStatus};
