//! LoRa-E5 AT modem on a UART.
//!
//! [`UartTransport`] moves lines over the wire; [`AtModem`] does the rest.

use esp_idf_hal::delay::TickType;
use esp_idf_hal::gpio::{AnyIOPin, InputPin, OutputPin};
use esp_idf_hal::peripheral::Peripheral;
use esp_idf_hal::prelude::*;
use esp_idf_hal::sys::EspError;
use esp_idf_hal::uart::{config::Config as UartConfig, Uart, UartDriver};

use crate::at::{AtModem, AtTransport};

/// AT modem over an esp-idf UART.
pub type Esp32Radio<'d> = AtModem<UartTransport<'d>>;

/// Line-oriented UART link to the modem.
pub struct UartTransport<'d> {
    uart: UartDriver<'d>,
}

impl<'d> UartTransport<'d> {
    /// Open `uart` at `baud` on the given pins, without flow control.
    pub fn new<U: Uart>(
        uart: impl Peripheral<P = U> + 'd,
        tx: impl Peripheral<P = impl OutputPin> + 'd,
        rx: impl Peripheral<P = impl InputPin> + 'd,
        baud: u32,
    ) -> Result<Self, EspError> {
        let config = UartConfig::default().baudrate(Hertz(baud));
        let uart = UartDriver::new(
            uart,
            tx,
            rx,
            Option::<AnyIOPin>::None,
            Option::<AnyIOPin>::None,
            &config,
        )?;
        Ok(Self { uart })
    }

    fn write_all(&mut self, mut bytes: &[u8]) -> Result<(), EspError> {
        while !bytes.is_empty() {
            let n = self.uart.write(bytes)?;
            bytes = &bytes[n..];
        }
        Ok(())
    }
}

impl AtTransport for UartTransport<'_> {
    type Error = EspError;

    fn write_line(&mut self, line: &str) -> Result<(), EspError> {
        self.write_all(line.as_bytes())?;
        self.write_all(b"\r\n")
    }

    fn read_byte(&mut self, timeout_ms: u32) -> Result<Option<u8>, EspError> {
        let mut buf = [0u8; 1];
        let ticks = TickType::new_millis(timeout_ms as u64).ticks();
        match self.uart.read(&mut buf, ticks)? {
            0 => Ok(None),
            _ => Ok(Some(buf[0])),
        }
    }

    fn clear_input(&mut self) -> Result<(), EspError> {
        self.uart.clear_rx()
    }
}
