//! Trait definitions for the collaborators the controllers drive.
//!
//! This module defines the core abstractions that allow rs-conductor to:
//! - Run on different hardware (ESP32, desktop mock)
//! - Swap sensor chips and radio modules without touching control logic
//! - Test every control path without hardware
//!
//! # Submodules
//!
//! - `hardware`: Motor actuators, magnet and distance sensors, battery ADC, indicator, clock
//! - `network`: LoRaWAN radio link
//! - `storage`: Non-volatile key/value store
//! - `power`: Deep sleep and wake sources
//! - `display`: Status display trait
//!
//! # Hardware Abstraction
//!
//! The key hardware traits are:
//!
//! - [`MotorActuator`]: Signed-power H-bridge channel
//! - [`MagnetSensor`]: Raw hall sensor samples
//! - [`DistanceSensor`]: Time-of-flight range or [`INVALID_RANGE`]
//! - [`RadioLink`]: Join and send over the radio network
//! - [`NonVolatileStore`]: Persisted counters across deep sleep

pub mod display;
pub mod hardware;
pub mod network;
pub mod power;
pub mod storage;

pub use display::*;
pub use hardware::*;
pub use network::*;
pub use power::*;
pub use storage::*;
