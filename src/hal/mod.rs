//! Drivers behind the [`crate::traits`] collaborators.
//!
//! Portable drivers only need `embedded-hal`; the board drivers sit behind
//! the `esp32` feature.
//!
//! - `mock`: Test implementations for desktop development
//! - `sen0590`: SEN0590 range sensor over any `embedded-hal` I2C bus
//! - `gated`: Range sensor with an XSHUT power gate
//! - `esp32`: XIAO ESP32-C6 train board and XIAO ESP32-S3 depth board (requires `esp32` feature)

pub mod gated;
pub mod mock;
pub mod sen0590;

#[cfg(feature = "esp32")]
pub mod esp32;

pub use gated::GatedSensor;
pub use mock::*;
pub use sen0590::{Sen0590, SEN0590_ADDRESS};

#[cfg(feature = "esp32")]
pub use esp32::*;
