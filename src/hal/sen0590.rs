//! DFRobot SEN0590 laser ranging sensor over I2C.
//!
//! A measurement is triggered by writing `0xB0` to register `0x10`; after
//! 50 ms the result is read big-endian from register `0x02`. The module
//! reports 10 mm short of the true distance, so the driver adds it back.
//! Readings at or below that offset are treated as invalid.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::traits::{DistanceSensor, INVALID_RANGE};

/// Default 7-bit bus address.
pub const SEN0590_ADDRESS: u8 = 0x74;

const REG_COMMAND: u8 = 0x10;
const REG_DISTANCE: u8 = 0x02;
const CMD_MEASURE: u8 = 0xB0;
const MEASURE_MS: u32 = 50;
const REGISTER_SETTLE_MS: u32 = 20;
const RANGE_OFFSET_MM: u16 = 10;

/// SEN0590 driver, generic over the bus and a delay source.
pub struct Sen0590<I2C, D> {
    i2c: I2C,
    delay: D,
    address: u8,
}

impl<I2C: I2c, D: DelayNs> Sen0590<I2C, D> {
    /// Driver at the default address.
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self {
            i2c,
            delay,
            address: SEN0590_ADDRESS,
        }
    }

    /// Use a non-default bus address.
    pub fn with_address(mut self, address: u8) -> Self {
        self.address = address;
        self
    }

    /// Trigger one measurement and return the raw corrected distance in mm.
    pub fn measure(&mut self) -> Result<u16, I2C::Error> {
        self.i2c.write(self.address, &[REG_COMMAND, CMD_MEASURE])?;
        self.delay.delay_ms(MEASURE_MS);
        let raw = self.read_register(REG_DISTANCE)?;
        Ok(raw.saturating_add(RANGE_OFFSET_MM))
    }

    fn read_register(&mut self, reg: u8) -> Result<u16, I2C::Error> {
        let mut buf = [0u8; 2];
        self.i2c.write(self.address, &[reg])?;
        self.delay.delay_ms(REGISTER_SETTLE_MS);
        self.i2c.read(self.address, &mut buf)?;
        Ok(u16::from_be_bytes(buf))
    }

    /// Release the bus and delay.
    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }
}

impl<I2C: I2c, D: DelayNs> DistanceSensor for Sen0590<I2C, D> {
    /// Probe the address; a NACK means the module is not fitted.
    fn init(&mut self) -> bool {
        match self.i2c.write(self.address, &[REG_DISTANCE]) {
            Ok(()) => true,
            Err(e) => {
                log::error!("sen0590: no answer at 0x{:02X}: {:?}", self.address, e);
                false
            }
        }
    }

    fn read(&mut self) -> u16 {
        match self.measure() {
            Ok(mm) if mm > RANGE_OFFSET_MM && mm != INVALID_RANGE => mm,
            Ok(mm) => {
                log::debug!("sen0590: reading {} out of range", mm);
                INVALID_RANGE
            }
            Err(e) => {
                log::warn!("sen0590: read failed: {:?}", e);
                INVALID_RANGE
            }
        }
    }
}
