//! Configuration module - environment variable parsing

use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;

use crate::game::motion::MotionConfig;
use crate::game::steering::HorizontalSmoothing;
use crate::input::LatchResetPolicy;

/// Default port for eye-tracking datagrams
pub const DEFAULT_UDP_PORT: u16 = 12345;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Address the eye-data receiver binds
    pub receiver_addr: SocketAddr,
    /// Socket read timeout, bounds receiver shutdown
    pub receiver_read_timeout: Duration,
    /// Where the relay sends datagrams
    pub udp_target: SocketAddr,

    /// Relay HTTP/WebSocket binding address
    pub relay_addr: SocketAddr,
    /// Allowed browser origin for CORS ("*" for any)
    pub client_origin: String,

    /// Run the WebSocket relay
    pub relay_enabled: bool,
    /// Run the headless game host
    pub game_enabled: bool,

    pub latch_reset: LatchResetPolicy,
    pub motion: MotionConfig,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let udp_port: u16 = env_or("UDP_PORT", DEFAULT_UDP_PORT)?;
        let udp_host: IpAddr = env_or("UDP_HOST", IpAddr::from([127, 0, 0, 1]))?;
        let receiver_ip: IpAddr = env_or("RECEIVER_BIND", IpAddr::from([0, 0, 0, 0]))?;

        let relay_addr = env::var("RELAY_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        Ok(Self {
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),

            receiver_addr: SocketAddr::new(receiver_ip, udp_port),
            receiver_read_timeout: Duration::from_millis(env_or("RECEIVER_READ_TIMEOUT_MS", 250)?),
            udp_target: SocketAddr::new(udp_host, udp_port),

            relay_addr: relay_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,
            client_origin: env::var("CLIENT_ORIGIN").unwrap_or_else(|_| "*".to_string()),

            relay_enabled: env_or("RELAY_ENABLED", true)?,
            game_enabled: env_or("GAME_ENABLED", true)?,

            latch_reset: env_or("LATCH_RESET", LatchResetPolicy::default())?,
            motion: motion_from_env()?,
        })
    }
}

/// Motion tuning; anything unset keeps the controller defaults
fn motion_from_env() -> Result<MotionConfig, ConfigError> {
    let defaults = MotionConfig::default();

    let mut motion = MotionConfig {
        move_speed: env_or("MOVE_SPEED", defaults.move_speed)?,
        jump_impulse: env_or("JUMP_IMPULSE", defaults.jump_impulse)?,
        gravity: env_or("GRAVITY", defaults.gravity)?,
        ..defaults.clone()
    }
    .with_steering(env_or("STEERING_MODE", defaults.steering)?)
    .with_auto_forward(env_or("AUTO_FORWARD", defaults.auto_forward)?)
    .with_forward_speed(env_or("FORWARD_SPEED", defaults.forward_speed)?);

    if env_or("SMOOTHING", false)? {
        motion = motion.with_smoothing(HorizontalSmoothing::default());
    }

    Ok(motion)
}

/// Read and parse a variable, falling back to `default` when unset
fn env_or<T: FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    parse_or(key, env::var(key).ok().as_deref(), default)
}

fn parse_or<T: FromStr>(key: &'static str, value: Option<&str>, default: T) -> Result<T, ConfigError> {
    match value {
        Some(v) => v.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid relay address format")]
    InvalidAddress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::steering::{AutoForward, SteeringMode};

    #[test]
    fn test_parse_or_default_when_unset() {
        assert_eq!(parse_or("UDP_PORT", None, 12345u16).unwrap(), 12345);
    }

    #[test]
    fn test_parse_or_parses_and_trims() {
        assert_eq!(parse_or("UDP_PORT", Some(" 4000 "), 12345u16).unwrap(), 4000);
        assert_eq!(parse_or("GRAVITY", Some("-20.5"), -9.81f32).unwrap(), -20.5);
        assert!(!parse_or("RELAY_ENABLED", Some("false"), true).unwrap());
    }

    #[test]
    fn test_parse_or_rejects_garbage() {
        let err = parse_or("UDP_PORT", Some("70000"), 12345u16).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("UDP_PORT")));
        assert!(parse_or("SMOOTHING", Some("yes"), false).is_err());
    }

    #[test]
    fn test_parse_or_named_settings() {
        assert_eq!(
            parse_or("STEERING_MODE", Some("raycast"), SteeringMode::default()).unwrap(),
            SteeringMode::RaycastToWorldPoint
        );
        assert_eq!(
            parse_or("AUTO_FORWARD", Some("on_first_input"), AutoForward::Off).unwrap(),
            AutoForward::OnFirstInput
        );
        assert_eq!(
            parse_or("LATCH_RESET", None, LatchResetPolicy::default()).unwrap(),
            LatchResetPolicy::ResetEveryConsume
        );

        let err = parse_or("AUTO_FORWARD", Some("sometimes"), AutoForward::Off).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid("AUTO_FORWARD")));
    }
}
