//! Distance sensor behind a shutdown (XSHUT) pin.
//!
//! Sensors such as the VL53L1X draw almost nothing while their XSHUT line
//! is held low. [`GatedSensor`] drives that line from [`DistanceSensor::enable`]
//! and [`DistanceSensor::disable`] and powers the chip up before `init`.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::OutputPin;

use crate::traits::DistanceSensor;

/// Boot time after XSHUT goes high.
const BOOT_MS: u32 = 50;

/// Wraps `sensor` with power gating on `xshut`.
pub struct GatedSensor<S, P, D> {
    sensor: S,
    xshut: P,
    delay: D,
}

impl<S, P, D> GatedSensor<S, P, D>
where
    S: DistanceSensor,
    P: OutputPin,
    D: DelayNs,
{
    /// Wrap a sensor. The pin is left as-is until `init` or `enable`.
    pub fn new(sensor: S, xshut: P, delay: D) -> Self {
        Self {
            sensor,
            xshut,
            delay,
        }
    }

    /// Inner sensor.
    pub fn inner(&self) -> &S {
        &self.sensor
    }

    /// Shutdown pin.
    pub fn pin(&self) -> &P {
        &self.xshut
    }
}

impl<S, P, D> DistanceSensor for GatedSensor<S, P, D>
where
    S: DistanceSensor,
    P: OutputPin,
    D: DelayNs,
{
    fn init(&mut self) -> bool {
        self.enable();
        self.delay.delay_ms(BOOT_MS);
        self.sensor.init()
    }

    fn read(&mut self) -> u16 {
        self.sensor.read()
    }

    fn enable(&mut self) {
        if let Err(e) = self.xshut.set_high() {
            log::warn!("xshut high failed: {:?}", e);
        }
        self.sensor.enable();
    }

    fn disable(&mut self) {
        self.sensor.disable();
        if let Err(e) = self.xshut.set_low() {
            log::warn!("xshut low failed: {:?}", e);
        }
    }
}
