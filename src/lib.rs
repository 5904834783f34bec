//! # rs-conductor
//!
//! Firmware logic for two small ESP32 devices: a toy-train conductor that
//! shuttles between station magnets, and a battery-powered depth sensor
//! that reports over LoRaWAN and deep-sleeps between readings.
//!
//! ## Features
//!
//! - **Train conductor**: state machine over a debounced hall sensor, with
//!   braking, back-up and a terminal error state
//! - **Control surface**: HTTP paths mapped to bounded speed and light steps
//! - **Depth uplink**: change detection, bounded retries, persisted baseline
//!   and a compact big-endian payload
//! - **Hardware abstraction**: every collaborator behind a trait, with mocks
//!   for desktop testing
//!
//! ## Architecture
//!
//! The crate is structured to allow testing on desktop without hardware:
//!
//! - `traits` - Collaborator contracts (motor, sensors, radio, store, power, display)
//! - `train` - Conductor state machine
//! - `control` - Control surface commands and status
//! - `uplink` - Depth sensor wake cycle
//! - `payload`, `at`, `retry`, `battery` - Building blocks for the uplink
//! - `hal` - Concrete implementations (mock for testing, esp32 for hardware)
//!
//! ## Example
//!
//! ```rust
//! use rs_conductor::{
//!     TrainConfig, TrainController, TrainState,
//!     hal::{MockDelay, MockIndicator, MockMagnet, MockMotor},
//! };
//!
//! let mut train = TrainController::new(
//!     MockMotor::new(),
//!     MockMotor::new(),
//!     MockIndicator::new(),
//!     TrainConfig::default(),
//! );
//! train.start(0).unwrap();
//!
//! // No magnet under the sensor: leave the station.
//! let mut sensor = MockMagnet::absent();
//! let mut delay = MockDelay::new();
//! train.tick(&mut sensor, &mut delay, 20).unwrap();
//! assert_eq!(train.state(), TrainState::Starting);
//! assert_eq!(train.motor().power, 255);
//! ```

#![cfg_attr(not(feature = "std"), no_std)]
#![warn(missing_docs)]

extern crate alloc;

/// AT command encoding and the modem driver.
pub mod at;
/// Battery voltage measurement.
pub mod battery;
/// Shared configuration system for both boards.
pub mod config;
/// Control surface commands for the train.
pub mod control;
/// Hardware abstraction layer with mock implementations for testing.
pub mod hal;
/// Uplink payload wire format.
pub mod payload;
/// Fixed-delay retry policy.
pub mod retry;
/// Core traits for hardware abstraction.
pub mod traits;
/// Train conductor state machine.
pub mod train;
/// Depth sensor uplink cycle.
pub mod uplink;

// Re-exports for convenience
pub use at::{AtError, AtModem, AtResponse, AtTransport};
pub use control::{ControlCommand, ControlStatus};
pub use payload::{PayloadError, UplinkPayload};
pub use retry::{RetryError, RetryPolicy};
pub use train::{MagnetBand, TrainController, TrainError, TrainState};
pub use uplink::{
    CycleFailure, CycleOutcome, CycleReport, DepthUplinkController, SendReason, UplinkDevices,
    UplinkRecord,
};
pub use traits::{
    // Hardware
    BatteryAdc,
    Clock,
    DistanceSensor,
    Indicator,
    MagnetSensor,
    MotorActuator,
    INVALID_RANGE,
    // Radio, storage, power
    JoinCredentials,
    NonVolatileStore,
    PowerManager,
    RadioLink,
    WakeCause,
    WakeSources,
    // Display
    AppInfo,
    NoDisplay,
    StatusDisplay,
};

// Config re-exports
pub use config::{
    Config, DeviceConfig, RadioConfig, TrainConfig, UplinkConfig, WebConfig, WifiConfig,
};
