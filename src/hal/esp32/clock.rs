//! Monotonic millisecond clock backed by the esp-idf high resolution timer.

use crate::traits::Clock;

/// Milliseconds since boot, read from `esp_timer_get_time()`.
///
/// The conductor loop stamps every tick with this clock; the depth board
/// only uses it for log timing since each wake starts from zero.
#[derive(Clone, Copy, Debug, Default)]
pub struct Esp32Clock;

impl Esp32Clock {
    /// Create a clock handle.
    #[inline]
    pub fn new() -> Self {
        Self
    }

    /// Milliseconds elapsed since `start_ms`.
    #[inline]
    pub fn since(&self, start_ms: u64) -> u64 {
        self.now_ms().saturating_sub(start_ms)
    }
}

impl Clock for Esp32Clock {
    #[inline]
    fn now_ms(&self) -> u64 {
        // Plain read of the boot-relative timer; never negative.
        let micros = unsafe { esp_idf_hal::sys::esp_timer_get_time() };
        (micros / 1000) as u64
    }
}
