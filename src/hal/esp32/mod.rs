//! ESP32 hardware abstraction layer for the train and depth boards.
//!
//! This module provides esp-idf implementations of the collaborator traits
//! for two Seeed XIAO boards:
//!
//! - **Train board**: XIAO ESP32-C6 driving a TB6612FNG dual H-bridge
//!   (channel A traction motor, channel B carriage lights) with an analog
//!   hall sensor under the track.
//! - **Depth board**: XIAO ESP32-S3 with a SEN0590 time-of-flight sensor,
//!   a LoRa-E5 AT modem on UART1, a battery divider and an optional
//!   SSD1306 128x32 OLED.
//!
//! # Pin Assignments
//!
//! See [`pins::train`] and [`pins::depth`] for GPIO assignments.

mod battery;
mod clock;
mod indicator;
mod magnet;
mod motor;
mod nvs;
mod radio;
mod sleep;

pub use battery::Esp32BatteryAdc;
pub use clock::Esp32Clock;
pub use indicator::Esp32Led;
pub use magnet::Esp32Magnet;
pub use motor::{shared_standby, Esp32Motor, SharedStandby};
pub use nvs::Esp32Store;
pub use radio::{Esp32Radio, UartTransport};
pub use sleep::Esp32Power;

#[cfg(feature = "display")]
mod display;
#[cfg(feature = "display")]
pub use display::{DisplayError, Esp32Display};

#[cfg(feature = "wifi")]
mod wifi;
#[cfg(feature = "wifi")]
pub use wifi::Esp32Wifi;

#[cfg(feature = "esp32-http")]
mod http;
#[cfg(feature = "esp32-http")]
pub use http::{Esp32HttpServer, Esp32SharedState, PENDING_CAPACITY};

/// Pin assignments for both boards.
pub mod pins {
    /// XIAO ESP32-C6 train board.
    pub mod train {
        // =====================================================================
        // TB6612FNG channel A (traction motor, wired inverted)
        // =====================================================================

        /// AIN1 (D3)
        pub const AIN1: i32 = 21;

        /// AIN2 (D7)
        pub const AIN2: i32 = 17;

        /// PWMA (A1)
        pub const PWMA: i32 = 1;

        // =====================================================================
        // TB6612FNG channel B (carriage lights)
        // =====================================================================

        /// BIN1 (D5)
        pub const BIN1: i32 = 23;

        /// BIN2 (D6)
        pub const BIN2: i32 = 16;

        /// PWMB (A2)
        pub const PWMB: i32 = 2;

        /// STBY (D4), shared by both channels
        pub const STBY: i32 = 22;

        // =====================================================================
        // Sensing and status
        // =====================================================================

        /// Hall sensor output (A0, ADC1 channel 0)
        pub const MAGNET: i32 = 0;

        /// Onboard user LED (active low)
        pub const LED: i32 = 15;
    }

    /// XIAO ESP32-S3 depth board.
    pub mod depth {
        // =====================================================================
        // I2C buses
        // =====================================================================

        /// OLED data (D4, I2C0)
        pub const OLED_SDA: i32 = 5;

        /// OLED clock (D5, I2C0)
        pub const OLED_SCL: i32 = 6;

        /// Range sensor data (D1, I2C1)
        pub const SENSOR_SDA: i32 = 2;

        /// Range sensor clock (D2, I2C1)
        pub const SENSOR_SCL: i32 = 3;

        /// Default I2C address for SSD1306 OLED
        pub const OLED_I2C_ADDR: u8 = 0x3C;

        // =====================================================================
        // Radio (LoRa-E5 on UART1)
        // =====================================================================

        /// Modem RX, board TX (D6)
        pub const MODEM_TX: i32 = 43;

        /// Modem TX, board RX (D7)
        pub const MODEM_RX: i32 = 44;

        /// Modem baud rate
        pub const MODEM_BAUD: u32 = 9600;

        // =====================================================================
        // Power, battery and status
        // =====================================================================

        /// Battery divider midpoint (A0, ADC1 channel 0)
        pub const BATTERY: i32 = 1;

        /// Wake button (active low) and user LED
        ///
        /// The button and the LED share this line; the pin is reset to a
        /// pulled-up input before it is armed for ext1 wake.
        pub const WAKE: i32 = 21;
    }
}
