//! Eye sample wire format
//! One UTF-8 JSON object per datagram:
//! `{"gazeX": n, "gazeY": n, "isLeftClosed": b, "isRightClosed": b}`

use serde::{Deserialize, Serialize};

/// Largest payload we expect in a single datagram
pub const MAX_DATAGRAM_SIZE: usize = 2048;

/// One decoded eye-tracking sample
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EyeSample {
    /// Horizontal steering offset, roughly -2.0..2.0
    pub gaze_x: f32,
    /// Vertical gaze coordinate (only used by raycast steering)
    pub gaze_y: f32,
    pub is_left_closed: bool,
    pub is_right_closed: bool,
}

#[cfg(test)]
impl EyeSample {
    pub fn new(gaze_x: f32, is_left_closed: bool, is_right_closed: bool) -> Self {
        Self {
            gaze_x,
            gaze_y: 0.0,
            is_left_closed,
            is_right_closed,
        }
    }

    pub fn with_gaze_y(mut self, gaze_y: f32) -> Self {
        self.gaze_y = gaze_y;
        self
    }
}

/// Payload decode errors
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("payload is not valid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("payload is not an eye sample: {0}")]
    Json(#[from] serde_json::Error),
}

/// Decode one datagram payload
pub fn decode(bytes: &[u8]) -> Result<EyeSample, DecodeError> {
    let text = std::str::from_utf8(bytes)?;
    Ok(serde_json::from_str(text.trim())?)
}

/// Encode a sample into the wire format
pub fn encode(sample: &EyeSample) -> Result<Vec<u8>, serde_json::Error> {
    serde_json::to_vec(sample)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_full_payload() {
        let sample =
            decode(br#"{"gazeX": 0.8, "gazeY": -0.25, "isLeftClosed": true, "isRightClosed": false}"#)
                .unwrap();
        assert_eq!(sample.gaze_x, 0.8);
        assert_eq!(sample.gaze_y, -0.25);
        assert!(sample.is_left_closed);
        assert!(!sample.is_right_closed);
    }

    #[test]
    fn test_decode_missing_fields_default() {
        let sample = decode(br#"{"isRightClosed": true}"#).unwrap();
        assert_eq!(sample, EyeSample::new(0.0, false, true));

        let empty = decode(b"{}").unwrap();
        assert_eq!(empty, EyeSample::default());
    }

    #[test]
    fn test_decode_ignores_unknown_fields() {
        let sample = decode(br#"{"gazeX": -1.5, "timestamp": 1234, "source": "web"}"#).unwrap();
        assert_eq!(sample.gaze_x, -1.5);
    }

    #[test]
    fn test_decode_rejects_malformed() {
        assert!(matches!(decode(b"not json"), Err(DecodeError::Json(_))));
        assert!(matches!(decode(b"[1, 2, 3]"), Err(DecodeError::Json(_))));
        assert!(matches!(
            decode(br#"{"gazeX": "left"}"#),
            Err(DecodeError::Json(_))
        ));
        assert!(matches!(decode(&[0xff, 0xfe, 0x7b]), Err(DecodeError::Utf8(_))));
    }

    #[test]
    fn test_encode_uses_wire_field_names() {
        let bytes = encode(&EyeSample::new(0.5, true, false)).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["gazeX"], 0.5);
        assert_eq!(value["gazeY"], 0.0);
        assert_eq!(value["isLeftClosed"], true);
        assert_eq!(value["isRightClosed"], false);
    }
}
