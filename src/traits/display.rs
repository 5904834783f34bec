//! Display abstraction for depth sensor status screens.
//!
//! This module defines the [`StatusDisplay`] trait for rendering the uplink
//! cycle's progress to a small OLED.

/// Summary shown when the device wakes interactively.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AppInfo<'a> {
    /// Firmware name and version.
    pub name: &'a str,
    /// Last range that was successfully sent, in millimetres.
    pub last_range: Option<u16>,
    /// Current wake counter.
    pub boot_count: u32,
    /// Battery voltage in millivolts.
    pub battery_mv: u16,
}

/// Display trait for the uplink status screens.
///
/// Implementors provide hardware-specific rendering for displays like
/// SSD1306 OLED, or simulated displays for testing.
///
/// # Example
///
/// ```ignore
/// use rs_conductor::traits::{AppInfo, StatusDisplay};
///
/// struct MyDisplay { /* ... */ }
///
/// impl StatusDisplay for MyDisplay {
///     type Error = ();
///
///     fn init(&mut self) -> Result<(), ()> { Ok(()) }
///     fn clear(&mut self) -> Result<(), ()> { Ok(()) }
///     fn show_info(&mut self, info: &AppInfo<'_>) -> Result<(), ()> { Ok(()) }
///     fn show_range(&mut self, range: Option<u16>) -> Result<(), ()> { Ok(()) }
///     fn show_subtext(&mut self, text: &str) -> Result<(), ()> { Ok(()) }
///     fn set_enabled(&mut self, on: bool) -> Result<(), ()> { Ok(()) }
/// }
/// ```
pub trait StatusDisplay {
    /// Error type for display operations.
    type Error: core::fmt::Debug;

    /// Initializes the display hardware. Called once per interactive wake.
    fn init(&mut self) -> Result<(), Self::Error>;

    /// Clears the display.
    fn clear(&mut self) -> Result<(), Self::Error>;

    /// Shows the wake summary.
    fn show_info(&mut self, info: &AppInfo<'_>) -> Result<(), Self::Error>;

    /// Shows the measured range in large text, or "no data".
    fn show_range(&mut self, range: Option<u16>) -> Result<(), Self::Error>;

    /// Replaces the bottom status line.
    fn show_subtext(&mut self, text: &str) -> Result<(), Self::Error>;

    /// Switches the panel on or off (off before deep sleep).
    fn set_enabled(&mut self, on: bool) -> Result<(), Self::Error>;
}

/// Placeholder for boards without a display.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoDisplay;

impl StatusDisplay for NoDisplay {
    type Error = core::convert::Infallible;

    fn init(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn clear(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }

    fn show_info(&mut self, _info: &AppInfo<'_>) -> Result<(), Self::Error> {
        Ok(())
    }

    fn show_range(&mut self, _range: Option<u16>) -> Result<(), Self::Error> {
        Ok(())
    }

    fn show_subtext(&mut self, _text: &str) -> Result<(), Self::Error> {
        Ok(())
    }

    fn set_enabled(&mut self, _on: bool) -> Result<(), Self::Error> {
        Ok(())
    }
}
