//! Game controllers: connection tracking and input translation.

mod api;
mod classify;

pub use api::{Gamepad, GamepadApi};
pub use classify::{ControlClass, classify, translate};
