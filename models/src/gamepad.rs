//! Abstract gamepad input, independent of any platform controller API.

use crate::handle::Handle;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamepadInput {
    ThumbstickLeftX,
    ThumbstickLeftY,
    ThumbstickRightX,
    ThumbstickRightY,
    ThumbstickLeftButton,
    ThumbstickRightButton,
    TriggerAxisLeft,
    TriggerAxisRight,
    TriggerButtonLeft,
    TriggerButtonRight,
    DpadUp,
    DpadDown,
    DpadLeft,
    DpadRight,
    FaceButtonBottom,
    FaceButtonRight,
    FaceButtonLeft,
    FaceButtonTop,
    ShoulderButtonLeft,
    ShoulderButtonRight,
    SpecialButtonLeft,
    SpecialButtonRight,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GamepadInputType {
    Button,
    Axis,
}

/// A single input change. Buttons report 0.0 or 1.0; axes report their raw value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GamepadInputEvent {
    pub gamepad: Handle,
    pub input: GamepadInput,
    pub input_type: GamepadInputType,
    pub value: f64,
}
