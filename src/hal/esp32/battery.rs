//! Battery divider sampled on an ADC1 oneshot channel.
//!
//! Raw counts are scaled linearly to millivolts at the pin. Averaging and
//! the divider ratio are applied by [`measure_battery_mv`].
//!
//! [`measure_battery_mv`]: crate::battery::measure_battery_mv

use esp_idf_hal::adc::attenuation::DB_11;
use esp_idf_hal::adc::oneshot::config::AdcChannelConfig;
use esp_idf_hal::adc::oneshot::{AdcChannelDriver, AdcDriver};
use esp_idf_hal::gpio::ADCPin;
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::sys::EspError;

use crate::traits::BatteryAdc;

/// Battery monitor pin.
pub struct Esp32BatteryAdc<'d, P: ADCPin> {
    channel: AdcChannelDriver<'d, P, &'d AdcDriver<'d, P::Adc>>,
}

impl<'d, P: ADCPin> Esp32BatteryAdc<'d, P> {
    /// Usable input span at 11 dB attenuation, in mV.
    const FULL_SCALE_MV: u32 = 3100;

    /// 12-bit converter.
    const MAX_RAW: u32 = 4095;

    /// Configure the monitor pin at 11 dB attenuation.
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
        })
    }

    fn raw_to_mv(raw: u16) -> u16 {
        let mv = (raw as u32).min(Self::MAX_RAW) * Self::FULL_SCALE_MV / Self::MAX_RAW;
        mv as u16
    }
}

impl<P: ADCPin> BatteryAdc for Esp32BatteryAdc<'_, P> {
    type Error = EspError;

    fn read_mv(&mut self) -> Result<u16, EspError> {
        let raw = self.channel.read()?;
        Ok(Self::raw_to_mv(raw))
    }
}
