//! Hardware abstraction traits for motors, sensors and indicators.
//!
//! This module defines the narrow contracts the controllers need from the
//! board. Vendor chip protocols live behind these traits.
//!
//! # Key Traits
//!
//! | Trait | Purpose |
//! |-------|---------|
//! | [`MotorActuator`] | Signed-power H-bridge channel (traction motor or lights) |
//! | [`MagnetSensor`] | Raw analog hall sensor sample |
//! | [`DistanceSensor`] | Time-of-flight range in millimetres |
//! | [`BatteryAdc`] | Calibrated millivolt reading on the battery divider |
//! | [`Indicator`] | Status LED |
//! | [`Clock`] | Time source for `no_std` environments |
//!
//! # Implementation
//!
//! For testing and desktop development, use the mock implementations
//! from [`crate::hal::mock`]. For ESP32 hardware, use the
//! implementations from `hal::esp32` (requires `esp32` feature).
//!
//! # Example
//!
//! ```rust
//! use rs_conductor::traits::MotorActuator;
//! use rs_conductor::hal::MockMotor;
//!
//! let mut motor = MockMotor::new();
//! motor.drive(255).unwrap();
//! assert_eq!(motor.adjust(-40).unwrap(), 215);
//!
//! motor.brake().unwrap();
//! assert_eq!(motor.power(), 0);
//! ```

/// Largest magnitude accepted by [`MotorActuator::drive`].
pub const MAX_POWER: i16 = 255;

/// Range value reported by a [`DistanceSensor`] for a failed or out-of-range read.
pub const INVALID_RANGE: u16 = 0xFFFF;

/// Clamps a signed power level into `-MAX_POWER..=MAX_POWER`.
#[inline]
pub const fn clamp_power(power: i32) -> i16 {
    if power > MAX_POWER as i32 {
        MAX_POWER
    } else if power < -(MAX_POWER as i32) {
        -MAX_POWER
    } else {
        power as i16
    }
}

/// One channel of a DC H-bridge driver (e.g. half of a TB6612FNG).
///
/// Power is signed: positive drives forward, negative reverses, and the
/// magnitude is the PWM duty out of [`MAX_POWER`]. The same contract is used
/// for the traction motor and for the carriage lights, which hang off the
/// second bridge channel.
///
/// # Implementation Notes
///
/// - `drive` must clamp to `-MAX_POWER..=MAX_POWER`
/// - `brake` shorts the motor terminals and reports power 0 afterwards
/// - `standby` releases the bridge; the next `drive` wakes it
///
/// # Example Implementation
///
/// ```rust,ignore
/// use rs_conductor::traits::MotorActuator;
///
/// struct MyBridge { power: i16 }
///
/// impl MotorActuator for MyBridge {
///     type Error = ();
///
///     fn drive(&mut self, power: i16) -> Result<(), ()> {
///         // Set IN1/IN2 from the sign, PWM from the magnitude...
///         self.power = power;
///         Ok(())
///     }
///
///     fn brake(&mut self) -> Result<(), ()> {
///         self.power = 0;
///         Ok(())
///     }
///
///     fn standby(&mut self) -> Result<(), ()> { Ok(()) }
///
///     fn power(&self) -> i16 { self.power }
/// }
/// ```
pub trait MotorActuator {
    /// Error type for driver operations.
    type Error;

    /// Drive at a signed power level.
    ///
    /// Values outside `-MAX_POWER..=MAX_POWER` should be clamped.
    fn drive(&mut self, power: i16) -> Result<(), Self::Error>;

    /// Short-brake the channel.
    fn brake(&mut self) -> Result<(), Self::Error>;

    /// Put the driver in standby (outputs released).
    fn standby(&mut self) -> Result<(), Self::Error>;

    /// Last commanded power level (0 after a brake).
    fn power(&self) -> i16;

    /// Shift the power level by `delta`, clamped, and return the new level.
    fn adjust(&mut self, delta: i16) -> Result<i16, Self::Error> {
        let power = clamp_power(self.power() as i32 + delta as i32);
        self.drive(power)?;
        Ok(power)
    }
}

/// Analog hall/magnet sensor.
///
/// Only the raw ADC sample is exposed here; thresholding and debouncing are
/// done by [`crate::train::MagnetBand`] and the train controller.
pub trait MagnetSensor {
    /// Error type for sampling.
    type Error;

    /// Take one raw analog sample.
    fn read_raw(&mut self) -> Result<u16, Self::Error>;
}

/// Time-of-flight distance sensor.
///
/// Mirrors the semantics of the sketches' distance sensor interface:
/// failures are reported in-band as [`INVALID_RANGE`] rather than as errors,
/// so a bus glitch and an out-of-range target are treated alike (both are
/// retried by the uplink controller).
pub trait DistanceSensor {
    /// Probe and configure the sensor. `false` means the hardware was not
    /// detected.
    fn init(&mut self) -> bool {
        true
    }

    /// Measure once. Returns the range in millimetres or [`INVALID_RANGE`].
    fn read(&mut self) -> u16;

    /// Leave low-power mode.
    fn enable(&mut self) {}

    /// Enter low-power mode.
    fn disable(&mut self) {}
}

/// Battery voltage monitor.
///
/// Returns a calibrated reading of the ADC pin in millivolts, before the
/// external voltage divider is compensated.
pub trait BatteryAdc {
    /// Error type for sampling.
    type Error;

    /// Take one millivolt sample at the ADC pin.
    fn read_mv(&mut self) -> Result<u16, Self::Error>;
}

/// Single status LED used for blink codes.
pub trait Indicator {
    /// Error type for driving the LED.
    type Error;

    /// Switch the LED on or off.
    fn set(&mut self, on: bool) -> Result<(), Self::Error>;
}

/// Time source trait for `no_std` compatibility.
///
/// Provides monotonic time in milliseconds for state timing.
/// On embedded, use a hardware timer.
///
/// # Example
///
/// ```rust
/// use rs_conductor::traits::Clock;
/// use rs_conductor::hal::MockClock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.advance(100);
/// assert_eq!(clock.now_ms(), 100);
/// ```
pub trait Clock {
    /// Returns current time in milliseconds since an arbitrary epoch.
    ///
    /// Must be monotonically increasing.
    fn now_ms(&self) -> u64;
}

/// Blink `indicator` `count` times with `half_period_ms` on and off.
///
/// LED errors are ignored; a broken LED must never stop a cycle.
pub fn blink<I: Indicator, D: embedded_hal::delay::DelayNs>(
    indicator: &mut I,
    delay: &mut D,
    count: u32,
    half_period_ms: u32,
) {
    for _ in 0..count {
        let _ = indicator.set(true);
        delay.delay_ms(half_period_ms);
        let _ = indicator.set(false);
        delay.delay_ms(half_period_ms);
    }
}
