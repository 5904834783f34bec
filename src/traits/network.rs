//! Radio link abstraction for the depth uplink.
//!
//! The LoRaWAN MAC runs inside the radio module; this crate only asks it to
//! join and to send bytes on an application port.
//!
//! # Example
//!
//! ```rust
//! use rs_conductor::traits::{JoinCredentials, RadioLink};
//! use rs_conductor::hal::MockRadio;
//!
//! let mut radio = MockRadio::new();
//! radio.join(&JoinCredentials::default()).unwrap();
//! radio.send(&[3, 0x03, 0xE8], 2).unwrap();
//! assert_eq!(radio.sent.len(), 1);
//! ```

/// Maximum downlink payload kept by [`Downlink`].
pub const MAX_DOWNLINK: usize = 64;

/// OTAA join material.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JoinCredentials {
    /// JoinEUI (formerly AppEUI).
    pub join_eui: u64,
    /// DevEUI.
    pub dev_eui: u64,
    /// AppKey.
    pub app_key: [u8; 16],
    /// NwkKey (LoRaWAN 1.1; equal to AppKey on 1.0.x networks).
    pub nwk_key: [u8; 16],
}

/// Data received in the receive windows after an uplink.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Downlink {
    /// Application port the downlink arrived on.
    pub port: u8,
    /// Payload bytes.
    pub data: heapless::Vec<u8, MAX_DOWNLINK>,
}

/// Network radio trait.
///
/// Both operations may fail transiently (no gateway in range, duty-cycle
/// limits); callers wrap them in a [`RetryPolicy`](crate::retry::RetryPolicy).
pub trait RadioLink {
    /// Error type for radio operations.
    type Error: core::fmt::Debug;

    /// Join the network over the air.
    fn join(&mut self, credentials: &JoinCredentials) -> Result<(), Self::Error>;

    /// Send an uplink on `port`.
    fn send(&mut self, payload: &[u8], port: u8) -> Result<(), Self::Error>;

    /// Take the downlink received after the last successful send, if any.
    fn take_downlink(&mut self) -> Option<Downlink> {
        None
    }

    /// Put the radio into its lowest-power state before deep sleep.
    fn sleep(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
