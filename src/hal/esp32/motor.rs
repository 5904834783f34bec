//! TB6612FNG H-bridge channel using ESP32 LEDC PWM.
//!
//! Each channel is driven by two direction inputs and one PWM input:
//!
//! | IN1 | IN2 | PWM | Result |
//! |-----|-----|-----|--------|
//! | H | L | duty | forward |
//! | L | H | duty | reverse |
//! | H | H | 0 | short brake |
//!
//! The chip's STBY line is common to both channels, so it is held in a
//! [`SharedStandby`] that both [`Esp32Motor`] values point at. Driving
//! either channel takes the chip out of standby; putting either channel in
//! standby stops both.

use std::cell::RefCell;
use std::rc::Rc;

use esp_idf_hal::gpio::{AnyOutputPin, Output, PinDriver};
use esp_idf_hal::ledc::{
    config::TimerConfig, LedcChannel, LedcDriver, LedcTimer, LedcTimerDriver, Resolution,
};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::prelude::*;
use esp_idf_hal::sys::EspError;

use crate::traits::{clamp_power, MotorActuator, MAX_POWER};

/// STBY output shared by both channels of one chip.
pub type SharedStandby<'d> = Rc<RefCell<PinDriver<'d, AnyOutputPin, Output>>>;

/// Configure `pin` as the STBY output, starting in standby.
pub fn shared_standby<'d>(pin: AnyOutputPin) -> Result<SharedStandby<'d>, EspError> {
    let mut driver = PinDriver::output(pin)?;
    driver.set_low()?;
    Ok(Rc::new(RefCell::new(driver)))
}

/// One TB6612FNG channel.
///
/// # Example
///
/// ```ignore
/// use rs_conductor::hal::esp32::{shared_standby, Esp32Motor};
///
/// let p = Peripherals::take()?;
/// let timer = Esp32Motor::pwm_timer(p.ledc.timer0)?;
/// let stby = shared_standby(p.pins.gpio22.downgrade_output())?;
///
/// let motor = Esp32Motor::new(
///     p.ledc.channel0,
///     &timer,
///     p.pins.gpio1.downgrade_output(),
///     p.pins.gpio21.downgrade_output(),
///     p.pins.gpio17.downgrade_output(),
///     stby.clone(),
/// )?
/// .inverted(true);
/// ```
pub struct Esp32Motor<'d> {
    pwm: LedcDriver<'d>,
    in1: PinDriver<'d, AnyOutputPin, Output>,
    in2: PinDriver<'d, AnyOutputPin, Output>,
    standby: SharedStandby<'d>,
    inverted: bool,
    power: i16,
}

impl<'d> Esp32Motor<'d> {
    /// 20kHz keeps the motor whine out of the audible range.
    const PWM_FREQ_HZ: u32 = 20_000;

    /// 10-bit resolution, 1024 duty steps.
    const PWM_RESOLUTION: Resolution = Resolution::Bits10;

    /// Configure an LEDC timer suitable for both channels of the chip.
    pub fn pwm_timer<T: LedcTimer + 'd>(
        timer: impl Peripheral<P = T> + 'd,
    ) -> Result<LedcTimerDriver<'d, T>, EspError> {
        let config = TimerConfig::default()
            .frequency(Self::PWM_FREQ_HZ.Hz())
            .resolution(Self::PWM_RESOLUTION);
        LedcTimerDriver::new(timer, &config)
    }

    /// Create a channel in short brake.
    ///
    /// # Errors
    ///
    /// Returns an error if the PWM channel or a GPIO cannot be configured.
    pub fn new<C, T>(
        channel: impl Peripheral<P = C> + 'd,
        timer: &LedcTimerDriver<'d, T>,
        pwm_pin: AnyOutputPin,
        in1_pin: AnyOutputPin,
        in2_pin: AnyOutputPin,
        standby: SharedStandby<'d>,
    ) -> Result<Self, EspError>
    where
        C: LedcChannel<SpeedMode = T::SpeedMode>,
        T: LedcTimer + 'd,
    {
        let pwm = LedcDriver::new(channel, timer, pwm_pin)?;
        let mut motor = Self {
            pwm,
            in1: PinDriver::output(in1_pin)?,
            in2: PinDriver::output(in2_pin)?,
            standby,
            inverted: false,
            power: 0,
        };
        motor.brake()?;
        Ok(motor)
    }

    /// Swap the direction inputs for a motor wired the other way round.
    pub fn inverted(mut self, inverted: bool) -> Self {
        self.inverted = inverted;
        self
    }

    fn duty_for(&self, magnitude: u16) -> u32 {
        let max = self.pwm.get_max_duty();
        (magnitude as u32 * max) / MAX_POWER as u32
    }

    fn wake(&mut self) -> Result<(), EspError> {
        self.standby.borrow_mut().set_high()
    }
}

impl MotorActuator for Esp32Motor<'_> {
    type Error = EspError;

    fn drive(&mut self, power: i16) -> Result<(), EspError> {
        let power = clamp_power(power as i32);
        let wire = if self.inverted { -power } else { power };

        self.wake()?;
        if wire >= 0 {
            self.in1.set_high()?;
            self.in2.set_low()?;
        } else {
            self.in1.set_low()?;
            self.in2.set_high()?;
        }
        let duty = self.duty_for(wire.unsigned_abs());
        self.pwm.set_duty(duty)?;
        self.power = power;
        Ok(())
    }

    fn brake(&mut self) -> Result<(), EspError> {
        self.in1.set_high()?;
        self.in2.set_high()?;
        self.pwm.set_duty(0)?;
        self.power = 0;
        Ok(())
    }

    fn standby(&mut self) -> Result<(), EspError> {
        self.pwm.set_duty(0)?;
        self.standby.borrow_mut().set_low()?;
        self.power = 0;
        Ok(())
    }

    #[inline]
    fn power(&self) -> i16 {
        self.power
    }
}
