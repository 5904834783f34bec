//! Analog hall sensor on an ADC1 oneshot channel.
//!
//! The sensor idles at mid-rail (around 1665 counts at 11 dB attenuation)
//! and swings either way when a magnet passes, depending on the pole.
//! Readings are raw 12-bit counts; the conductor's [`MagnetBand`] decides
//! what counts as present.
//!
//! [`MagnetBand`]: crate::train::MagnetBand

use esp_idf_hal::adc::attenuation::DB_11;
use esp_idf_hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_hal::gpio::ADCPin;
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::sys::EspError;

use crate::traits::MagnetSensor;

/// Hall sensor sampled through a shared ADC driver.
///
/// # Example
///
/// ```ignore
/// use esp_idf_hal::adc::oneshot::AdcDriver;
/// use rs_conductor::hal::esp32::Esp32Magnet;
///
/// let adc = AdcDriver::new(peripherals.adc1)?;
/// let mut magnet = Esp32Magnet::new(&adc, peripherals.pins.gpio0)?;
/// let raw = magnet.read_raw()?;
/// ```
pub struct Esp32Magnet<'d, P: ADCPin> {
    channel: AdcChannelDriver<'d, P, &'d AdcDriver<'d, P::Adc>>,
    last_raw: u16,
}

impl<'d, P: ADCPin> Esp32Magnet<'d, P> {
    /// Configure the sensor pin at 11 dB attenuation.
    pub fn new(
        adc: &'d AdcDriver<'d, P::Adc>,
        pin: impl Peripheral<P = P> + 'd,
    ) -> Result<Self, EspError> {
        let config = AdcChannelConfig {
            attenuation: DB_11,
            ..Default::default()
        };
        Ok(Self {
            channel: AdcChannelDriver::new(adc, pin, &config)?,
            last_raw: 0,
        })
    }

    /// Most recent sample.
    #[inline]
    pub fn last_raw(&self) -> u16 {
        self.last_raw
    }
}

impl<P: ADCPin> MagnetSensor for Esp32Magnet<'_, P> {
    type Error = EspError;

    fn read_raw(&mut self) -> Result<u16, EspError> {
        let raw = self.channel.read()?;
        self.last_raw = raw;
        Ok(raw)
    }
}
