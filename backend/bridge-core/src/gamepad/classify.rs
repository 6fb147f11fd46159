use crate::native::{ControlValue, NativeControl};

use models::Handle;
use models::gamepad::{GamepadInput, GamepadInput as In, GamepadInputEvent, GamepadInputType};

use log::debug;

/// How a native control reports, and which abstract inputs it feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlClass {
    Button(GamepadInput),
    Axis(GamepadInput),
    /// Analog trigger: a pressed flag and a travel value.
    Trigger {
        button: GamepadInput,
        axis: GamepadInput,
    },
    /// Directional pad reported as a whole.
    Dpad,
    Thumbstick {
        x: GamepadInput,
        y: GamepadInput,
    },
}

/// Resolve a native control. `None` for controls the bridge does not expose.
pub fn classify(control: NativeControl) -> Option<ControlClass> {
    use ControlClass::{Axis, Button, Dpad, Thumbstick, Trigger};

    let class = match control {
        NativeControl::ButtonA => Button(In::FaceButtonBottom),
        NativeControl::ButtonB => Button(In::FaceButtonRight),
        NativeControl::ButtonX => Button(In::FaceButtonLeft),
        NativeControl::ButtonY => Button(In::FaceButtonTop),
        NativeControl::LeftShoulder => Button(In::ShoulderButtonLeft),
        NativeControl::RightShoulder => Button(In::ShoulderButtonRight),
        NativeControl::LeftThumbstickButton => Button(In::ThumbstickLeftButton),
        NativeControl::RightThumbstickButton => Button(In::ThumbstickRightButton),
        NativeControl::ButtonOptions => Button(In::SpecialButtonLeft),
        NativeControl::ButtonMenu => Button(In::SpecialButtonRight),
        NativeControl::DpadUp => Button(In::DpadUp),
        NativeControl::DpadDown => Button(In::DpadDown),
        NativeControl::DpadLeft => Button(In::DpadLeft),
        NativeControl::DpadRight => Button(In::DpadRight),
        NativeControl::LeftTrigger => Trigger {
            button: In::TriggerButtonLeft,
            axis: In::TriggerAxisLeft,
        },
        NativeControl::RightTrigger => Trigger {
            button: In::TriggerButtonRight,
            axis: In::TriggerAxisRight,
        },
        NativeControl::LeftThumbstickXAxis => Axis(In::ThumbstickLeftX),
        NativeControl::LeftThumbstickYAxis => Axis(In::ThumbstickLeftY),
        NativeControl::RightThumbstickXAxis => Axis(In::ThumbstickRightX),
        NativeControl::RightThumbstickYAxis => Axis(In::ThumbstickRightY),
        NativeControl::Dpad => Dpad,
        NativeControl::LeftThumbstick => Thumbstick {
            x: In::ThumbstickLeftX,
            y: In::ThumbstickLeftY,
        },
        NativeControl::RightThumbstick => Thumbstick {
            x: In::ThumbstickRightX,
            y: In::ThumbstickRightY,
        },
        NativeControl::ButtonHome => return None,
    };
    Some(class)
}

fn button(gamepad: Handle, input: GamepadInput, pressed: bool) -> GamepadInputEvent {
    GamepadInputEvent {
        gamepad,
        input,
        input_type: GamepadInputType::Button,
        value: if pressed { 1.0 } else { 0.0 },
    }
}

fn axis(gamepad: Handle, input: GamepadInput, value: f32) -> GamepadInputEvent {
    GamepadInputEvent {
        gamepad,
        input,
        input_type: GamepadInputType::Axis,
        value: f64::from(value),
    }
}

/// Turn one native control change into the input events it stands for.
pub fn translate(
    gamepad: Handle,
    control: NativeControl,
    value: ControlValue,
) -> Vec<GamepadInputEvent> {
    let Some(class) = classify(control) else {
        return Vec::new();
    };

    match (class, value) {
        (ControlClass::Button(input), ControlValue::Button { pressed, .. }) => {
            vec![button(gamepad, input, pressed)]
        }
        (ControlClass::Axis(input), ControlValue::Axis(value)) => {
            vec![axis(gamepad, input, value)]
        }
        (ControlClass::Trigger { button: b, axis: a }, ControlValue::Button { pressed, value }) => {
            vec![button(gamepad, b, pressed), axis(gamepad, a, value)]
        }
        (
            ControlClass::Dpad,
            ControlValue::Directional {
                up,
                down,
                left,
                right,
                ..
            },
        ) => vec![
            button(gamepad, In::DpadUp, up),
            button(gamepad, In::DpadDown, down),
            button(gamepad, In::DpadLeft, left),
            button(gamepad, In::DpadRight, right),
        ],
        (ControlClass::Thumbstick { x, y }, ControlValue::Directional { x: vx, y: vy, .. }) => {
            vec![axis(gamepad, x, vx), axis(gamepad, y, vy)]
        }
        (class, value) => {
            debug!("Ignoring {:?} value for {:?} control", value, class);
            Vec::new()
        }
    }
}
