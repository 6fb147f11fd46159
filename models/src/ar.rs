//! Positional tracking data.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArAvailability {
    Available,
    NotSupported,
}

/// Quality of camera tracking. Frames are only trustworthy in `Normal`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArTrackingState {
    Unavailable,
    Limited,
    Normal,
}

/// Number of floats in a column-major 4x4 camera transform.
pub const CAMERA_TRANSFORM_LEN: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArFrame {
    pub camera_transform: [f32; CAMERA_TRANSFORM_LEN],
}

impl ArFrame {
    /// Raw little-endian bytes of the transform, as sent on the wire.
    pub fn transform_bytes(&self) -> Vec<u8> {
        self.camera_transform
            .iter()
            .flat_map(|value| value.to_le_bytes())
            .collect()
    }
}
