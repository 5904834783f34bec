//! SSD1306 128x32 OLED status display for the depth board.
//!
//! # Screens
//!
//! ```text
//! ┌────────────────────────────┐
//! │Depth Sensor v0.5           │  show_info: four 8px lines
//! │Last depth: 1000            │
//! │Boot count: 42              │
//! │Battery(mV):3700            │
//! └────────────────────────────┘
//! ┌────────────────────────────┐
//! │100cm                       │  show_range: 20px digits
//! │                            │
//! │sending...                  │  show_subtext: bottom 8px
//! └────────────────────────────┘
//! ```

use core::fmt::Write;

use embedded_graphics::{
    mono_font::{
        ascii::{FONT_10X20, FONT_5X8},
        MonoTextStyle,
    },
    pixelcolor::BinaryColor,
    prelude::*,
    primitives::{PrimitiveStyle, Rectangle},
    text::{Baseline, Text},
};
use esp_idf_hal::i2c::I2cDriver;
use ssd1306::{mode::BufferedGraphicsMode, prelude::*, I2CDisplayInterface, Ssd1306};

use crate::traits::{AppInfo, StatusDisplay};

type DisplayDriver<'d> = Ssd1306<
    I2CInterface<I2cDriver<'d>>,
    DisplaySize128x32,
    BufferedGraphicsMode<DisplaySize128x32>,
>;

const WIDTH: u32 = 128;
const HEIGHT: i32 = 32;
const LINE_HEIGHT: i32 = 8;

type Line = heapless::String<32>;

/// OLED at the default 0x3C address.
pub struct Esp32Display<'d> {
    display: DisplayDriver<'d>,
}

impl<'d> Esp32Display<'d> {
    /// Wrap the bus. Nothing is sent until [`StatusDisplay::init`].
    pub fn new(i2c: I2cDriver<'d>) -> Self {
        let interface = I2CDisplayInterface::new(i2c);
        let display = Ssd1306::new(interface, DisplaySize128x32, DisplayRotation::Rotate0)
            .into_buffered_graphics_mode();
        Self { display }
    }

    fn small_line(&mut self, text: &str, row: i32) -> Result<(), DisplayError> {
        let style = MonoTextStyle::new(&FONT_5X8, BinaryColor::On);
        Text::with_baseline(text, Point::new(0, row * LINE_HEIGHT), style, Baseline::Top)
            .draw(&mut self.display)?;
        Ok(())
    }
}

impl StatusDisplay for Esp32Display<'_> {
    type Error = DisplayError;

    fn init(&mut self) -> Result<(), DisplayError> {
        self.display.init()?;
        self.clear()
    }

    fn clear(&mut self) -> Result<(), DisplayError> {
        self.display.clear(BinaryColor::Off)?;
        self.display.flush()?;
        Ok(())
    }

    fn show_info(&mut self, info: &AppInfo<'_>) -> Result<(), DisplayError> {
        self.display.clear(BinaryColor::Off)?;

        let mut line = Line::new();
        self.small_line(info.name, 0)?;

        match info.last_range {
            Some(mm) => write!(line, "Last depth: {}", mm)?,
            None => write!(line, "Last depth: none")?,
        }
        self.small_line(&line, 1)?;

        line.clear();
        write!(line, "Boot count: {}", info.boot_count)?;
        self.small_line(&line, 2)?;

        line.clear();
        write!(line, "Battery(mV):{}", info.battery_mv)?;
        self.small_line(&line, 3)?;

        self.display.flush()?;
        Ok(())
    }

    fn show_range(&mut self, range: Option<u16>) -> Result<(), DisplayError> {
        self.display.clear(BinaryColor::Off)?;

        let mut line = Line::new();
        match range {
            // Whole centimetres, rounded.
            Some(mm) => write!(line, "{}cm", (mm as u32 + 5) / 10)?,
            None => write!(line, "no data")?,
        }
        let style = MonoTextStyle::new(&FONT_10X20, BinaryColor::On);
        Text::with_baseline(&line, Point::zero(), style, Baseline::Top)
            .draw(&mut self.display)?;

        self.display.flush()?;
        Ok(())
    }

    fn show_subtext(&mut self, text: &str) -> Result<(), DisplayError> {
        let strip = HEIGHT - LINE_HEIGHT;
        Rectangle::new(Point::new(0, strip), Size::new(WIDTH, LINE_HEIGHT as u32))
            .into_styled(PrimitiveStyle::with_fill(BinaryColor::Off))
            .draw(&mut self.display)?;
        self.small_line(text, strip / LINE_HEIGHT)?;
        self.display.flush()?;
        Ok(())
    }

    fn set_enabled(&mut self, on: bool) -> Result<(), DisplayError> {
        self.display.set_display_on(on)?;
        Ok(())
    }
}

/// Display error type.
#[derive(Debug)]
pub enum DisplayError {
    /// The bus or controller rejected a command.
    Interface,
    /// A line did not fit its buffer.
    Format,
}

impl From<display_interface::DisplayError> for DisplayError {
    fn from(_: display_interface::DisplayError) -> Self {
        DisplayError::Interface
    }
}

impl From<core::fmt::Error> for DisplayError {
    fn from(_: core::fmt::Error) -> Self {
        DisplayError::Format
    }
}
