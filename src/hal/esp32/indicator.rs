//! Onboard user LED.

use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};
use esp_idf_hal::sys::EspError;

use crate::traits::Indicator;

/// Status LED on a GPIO.
///
/// Both XIAO boards wire the user LED active low, which is the default.
pub struct Esp32Led<'d> {
    pin: PinDriver<'d, AnyOutputPin, Output>,
    active_low: bool,
}

impl<'d> Esp32Led<'d> {
    /// Configure `pin` as an active-low LED, initially off.
    pub fn new(pin: AnyOutputPin) -> Result<Self, EspError> {
        let mut led = Self {
            pin: PinDriver::output(pin)?,
            active_low: true,
        };
        led.set(false)?;
        Ok(led)
    }

    /// Configure `pin` as an active-high LED, initially off.
    pub fn active_high(pin: AnyOutputPin) -> Result<Self, EspError> {
        let mut led = Self {
            pin: PinDriver::output(pin)?,
            active_low: false,
        };
        led.set(false)?;
        Ok(led)
    }
}

impl Indicator for Esp32Led<'_> {
    type Error = EspError;

    fn set(&mut self, on: bool) -> Result<(), EspError> {
        if on != self.active_low {
            self.pin.set_high()
        } else {
            self.pin.set_low()
        }
    }
}
