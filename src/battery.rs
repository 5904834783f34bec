//! Battery voltage measurement through a resistor divider.
//!
//! The ADC sees a fraction of the battery voltage; the reading is the mean
//! of several calibrated samples multiplied back up by the divider ratio.

use crate::traits::BatteryAdc;

/// Oversampling and divider settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BatteryConfig {
    /// Samples averaged per measurement.
    pub samples: u16,
    /// Battery voltage divided by ADC voltage.
    pub divider_ratio: u16,
}

impl Default for BatteryConfig {
    fn default() -> Self {
        Self {
            samples: 16,
            divider_ratio: 2,
        }
    }
}

/// Mean of `config.samples` readings scaled by the divider ratio, in mV.
///
/// Failed samples are skipped. Returns `None` when every sample failed.
pub fn measure_battery_mv<A: BatteryAdc>(adc: &mut A, config: &BatteryConfig) -> Option<u16> {
    let mut sum: u32 = 0;
    let mut good: u32 = 0;
    for _ in 0..config.samples.max(1) {
        match adc.read_mv() {
            Ok(mv) => {
                sum += mv as u32;
                good += 1;
            }
            Err(_) => log::debug!("battery sample failed"),
        }
    }
    if good == 0 {
        return None;
    }
    let mv = sum / good * config.divider_ratio as u32;
    Some(mv.min(u16::MAX as u32) as u16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockAdc;

    #[test]
    fn averages_and_scales() {
        let mut adc = MockAdc::constant(1850);
        let mv = measure_battery_mv(&mut adc, &BatteryConfig::default());
        assert_eq!(mv, Some(3700));
        assert_eq!(adc.reads, 16);
    }

    #[test]
    fn mean_smooths_noise() {
        let mut adc = MockAdc::sequence(&[1840, 1860]);
        let mv = measure_battery_mv(&mut adc, &BatteryConfig::default());
        assert_eq!(mv, Some(3700));
    }

    #[test]
    fn all_failed_is_none() {
        let mut adc = MockAdc::failing();
        assert_eq!(measure_battery_mv(&mut adc, &BatteryConfig::default()), None);
    }
}
