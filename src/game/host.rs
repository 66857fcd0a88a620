//! Headless game host: owns the receiver and runs the frame loop

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::watch;
use tokio::time::interval;
use tracing::{debug, error, info};

use crate::config::Config;
use crate::input::input_latch;
use crate::net::EyeDataReceiver;
use crate::util::time::{FrameClock, FRAME_DURATION_MICROS, STATUS_LOG_INTERVAL_FRAMES};

use super::driver::{FrameDriver, PlayerStatus};
use super::engine::FlatGroundEngine;
use super::motion::MotionController;

/// Latest player status, written by the frame loop and read by HTTP handlers
pub type SharedStatus = Arc<RwLock<Option<PlayerStatus>>>;

/// Largest delta fed to the controller after a stall
const MAX_FRAME_DELTA: f32 = 0.1;

/// The frame context: a fixed-rate loop around a [`FrameDriver`]
pub struct GameHost {
    driver: FrameDriver<FlatGroundEngine>,
    receiver: Option<EyeDataReceiver>,
    status: SharedStatus,
}

impl GameHost {
    /// Start the receiver and build the driver. A receiver that fails to
    /// start is logged and the host runs without input.
    pub fn start(config: &Config, status: SharedStatus) -> Self {
        let (writer, reader) = input_latch(config.latch_reset);

        let receiver = match EyeDataReceiver::start(
            config.receiver_addr,
            config.receiver_read_timeout,
            writer,
        ) {
            Ok(receiver) => Some(receiver),
            Err(e) => {
                error!(error = %e, "Eye data receiver failed to start, running without input");
                None
            }
        };

        let controller = MotionController::new(config.motion.clone());
        let driver = FrameDriver::new(reader, controller, FlatGroundEngine::default());

        info!(
            receiver = ?receiver.as_ref().map(|r| r.local_addr()),
            steering = ?config.motion.steering,
            auto_forward = ?config.motion.auto_forward,
            latch_reset = ?config.latch_reset,
            "Game host ready"
        );

        Self {
            driver,
            receiver,
            status,
        }
    }

    /// Run frames until `shutdown` flips to true
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        let mut frame_interval = interval(Duration::from_micros(FRAME_DURATION_MICROS));
        frame_interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut clock = FrameClock::new(MAX_FRAME_DELTA);

        info!("Frame loop started");

        loop {
            tokio::select! {
                _ = frame_interval.tick() => {
                    self.step(clock.delta());
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        info!(frames = self.driver.frame(), "Frame loop stopped");

        // Joining the receive thread blocks briefly
        if let Some(receiver) = self.receiver.take() {
            if let Err(e) = tokio::task::spawn_blocking(move || drop(receiver)).await {
                error!(error = %e, "Receiver shutdown task failed");
            }
        }
        *self.status.write() = None;
    }

    fn step(&mut self, dt: f32) {
        self.driver.tick(dt);

        let mut status = self.driver.status();
        status.receiver_running = self.receiver.as_ref().is_some_and(|r| r.is_running());

        if status.frame % STATUS_LOG_INTERVAL_FRAMES == 0 {
            let latch = self.driver.latch().peek();
            debug!(
                frame = status.frame,
                gaze_x = latch.latest_gaze_x,
                gaze_y = latch.latest_gaze_y,
                left = latch.left_closed_latched,
                right = latch.right_closed_latched,
                height = status.height,
                collider = ?self.driver.engine().collider(),
                frames_since_input = ?status.frames_since_input,
                packets = ?self.receiver.as_ref().map(|r| r.stats()),
                "Player status"
            );
        }

        *self.status.write() = Some(status);
    }
}
