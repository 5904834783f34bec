//! Deep-sleep entry and wake source configuration.

/// Level of the wake pin that ends deep sleep.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WakeLevel {
    /// Wake when the pin is pulled low (button to ground).
    #[default]
    AnyLow,
    /// Wake when the pin goes high.
    AnyHigh,
}

/// Wake sources armed before entering deep sleep.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WakeSources {
    /// Timer wake after this many milliseconds.
    pub timer_ms: u64,
    /// RTC-capable GPIO used as an external wake signal.
    pub wake_pin: Option<i32>,
    /// Level on `wake_pin` that triggers the wake.
    pub wake_level: WakeLevel,
}

impl WakeSources {
    /// Timer-only wake.
    pub const fn timer(timer_ms: u64) -> Self {
        Self {
            timer_ms,
            wake_pin: None,
            wake_level: WakeLevel::AnyLow,
        }
    }

    /// Add an external wake pin.
    pub const fn with_pin(mut self, pin: i32, level: WakeLevel) -> Self {
        self.wake_pin = Some(pin);
        self.wake_level = level;
        self
    }
}

/// Why the chip woke up, as reported by the platform.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum WakeCause {
    /// Power-on reset.
    #[default]
    PowerOn,
    /// The sleep timer expired.
    Timer,
    /// The external wake pin fired (user button).
    External,
    /// Any other cause, including panic, watchdog and brownout resets.
    Other,
}

impl WakeCause {
    /// Classify a boot from whether it was a power-on reset and which
    /// deep-sleep wake source fired, if any.
    pub const fn from_boot(power_on_reset: bool, woken_by: Option<WakeCause>) -> Self {
        match woken_by {
            Some(cause) => cause,
            None if power_on_reset => WakeCause::PowerOn,
            None => WakeCause::Other,
        }
    }

    /// Returns true when a person is likely looking at the device
    /// (first power-up or button press), which is when the display is worth
    /// powering.
    pub const fn is_interactive(&self) -> bool {
        matches!(self, WakeCause::PowerOn | WakeCause::External)
    }
}

/// Platform power manager.
pub trait PowerManager {
    /// Error type for configuring sleep.
    type Error: core::fmt::Debug;

    /// Arm `wake` and enter deep sleep.
    ///
    /// On hardware this does not return on success: execution restarts from
    /// the top after the wake. An `Err` means the wake sources could not be
    /// armed.
    fn enter_deep_sleep(&mut self, wake: &WakeSources) -> Result<(), Self::Error>;

    /// Report the cause of the current wake.
    fn wake_cause(&self) -> WakeCause {
        WakeCause::PowerOn
    }
}
