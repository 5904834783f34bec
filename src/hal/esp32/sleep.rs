//! Deep sleep through the esp-idf sleep API.
//!
//! Deep sleep powers down everything but the RTC domain. Waking restarts
//! the firmware from `main`, so [`PowerManager::enter_deep_sleep`] only
//! returns if arming a wake source failed.

use esp_idf_hal::reset::{ResetReason, WakeupReason};
use esp_idf_hal::sys::{self, esp, EspError};

use crate::traits::{PowerManager, WakeCause, WakeLevel, WakeSources};

/// Sleep controller for the depth board.
#[derive(Debug)]
pub struct Esp32Power {
    cause: WakeCause,
}

impl Esp32Power {
    /// Read and log why this boot happened.
    pub fn new() -> Self {
        let reset = ResetReason::get();
        let wakeup = WakeupReason::get();
        log::info!("power: reset reason {:?}, wakeup cause {:?}", reset, wakeup);

        let woken_by = match wakeup {
            WakeupReason::Unknown => None,
            WakeupReason::Timer => Some(WakeCause::Timer),
            WakeupReason::Ext0 | WakeupReason::Ext1 | WakeupReason::GPIO => Some(WakeCause::External),
            _ => Some(WakeCause::Other),
        };
        let cause = WakeCause::from_boot(matches!(reset, ResetReason::PowerOn), woken_by);
        Self { cause }
    }

    fn arm_pin(pin: i32, level: WakeLevel) -> Result<(), EspError> {
        // The pin may have been an LED output while awake.
        esp!(unsafe { sys::gpio_reset_pin(pin) })?;
        if level == WakeLevel::AnyLow {
            esp!(unsafe { sys::rtc_gpio_pullup_en(pin) })?;
            esp!(unsafe { sys::rtc_gpio_pulldown_dis(pin) })?;
        }
        let mode = match level {
            WakeLevel::AnyLow => sys::esp_sleep_ext1_wakeup_mode_t_ESP_EXT1_WAKEUP_ANY_LOW,
            WakeLevel::AnyHigh => sys::esp_sleep_ext1_wakeup_mode_t_ESP_EXT1_WAKEUP_ANY_HIGH,
        };
        esp!(unsafe { sys::esp_sleep_enable_ext1_wakeup(1u64 << pin, mode) })
    }
}

impl Default for Esp32Power {
    fn default() -> Self {
        Self::new()
    }
}

impl PowerManager for Esp32Power {
    type Error = EspError;

    fn enter_deep_sleep(&mut self, wake: &WakeSources) -> Result<(), EspError> {
        let micros = wake.timer_ms.saturating_mul(1000);
        esp!(unsafe { sys::esp_sleep_enable_timer_wakeup(micros) })?;
        if let Some(pin) = wake.wake_pin {
            Self::arm_pin(pin, wake.wake_level)?;
        }

        log::info!(
            "power: sleeping for {}s, wake pin {:?}",
            wake.timer_ms / 1000,
            wake.wake_pin
        );
        unsafe { sys::esp_deep_sleep_start() }
    }

    fn wake_cause(&self) -> WakeCause {
        self.cause
    }
}
