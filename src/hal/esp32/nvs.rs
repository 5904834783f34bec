//! Counters in the default NVS partition.

use esp_idf_svc::nvs::{EspDefaultNvsPartition, EspNvs, NvsDefault};
use esp_idf_hal::sys::EspError;

use crate::traits::NonVolatileStore;

/// One NVS namespace opened read-write.
///
/// esp-idf commits each write as it is made, so [`NonVolatileStore::commit`]
/// has nothing left to flush.
///
/// # Example
///
/// ```ignore
/// use esp_idf_svc::nvs::EspDefaultNvsPartition;
/// use rs_conductor::hal::esp32::Esp32Store;
///
/// let partition = EspDefaultNvsPartition::take()?;
/// let mut store = Esp32Store::new(partition, "depthsensor")?;
/// let boots = store.get_u32("bootcount", 0)?;
/// ```
pub struct Esp32Store {
    nvs: EspNvs<NvsDefault>,
}

impl Esp32Store {
    /// Open `namespace`, creating it on first use.
    pub fn new(partition: EspDefaultNvsPartition, namespace: &str) -> Result<Self, EspError> {
        let nvs = EspNvs::new(partition, namespace, true)?;
        log::info!("nvs: opened namespace '{}'", namespace);
        Ok(Self { nvs })
    }
}

impl NonVolatileStore for Esp32Store {
    type Error = EspError;

    fn get_u32(&mut self, key: &str, default: u32) -> Result<u32, EspError> {
        Ok(self.nvs.get_u32(key)?.unwrap_or(default))
    }

    fn put_u32(&mut self, key: &str, value: u32) -> Result<(), EspError> {
        self.nvs.set_u32(key, value)
    }
}
