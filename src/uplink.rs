//! Depth sensor uplink cycle.
//!
//! The depth board wakes from deep sleep, runs [`DepthUplinkController::run_cycle`]
//! once and goes back to sleep. All RAM state is lost in between; what the
//! next wake needs lives in the [`UplinkRecord`] persisted in the
//! non-volatile store.
//!
//! # Cycle
//!
//! ```text
//! load record ─▶ boot_count += 1, persist ─▶ battery ─▶ [display info]
//!     ─▶ sensor init ─▶ read (retry) ─▶ should_send?
//!           │ no: Skipped                 │ yes
//!           ▼                             ▼
//!         sleep ◀── Failed ◀── join (retry) ─▶ send (retry) ─▶ persist ─▶ Sent
//! ```
//!
//! Nothing in the cycle returns an error: every failure becomes a
//! [`CycleOutcome`] and the caller still puts the device to sleep.
//!
//! # Example
//!
//! ```rust
//! use rs_conductor::uplink::{CycleOutcome, DepthUplinkController, UplinkDevices};
//! use rs_conductor::hal::{MockAdc, MockDelay, MockIndicator, MockRadio, MockSensor, MockStore};
//! use rs_conductor::traits::{JoinCredentials, WakeCause};
//! use rs_conductor::UplinkConfig;
//!
//! let devices = UplinkDevices {
//!     sensor: MockSensor::steady(1000),
//!     radio: MockRadio::new(),
//!     store: MockStore::new(),
//!     adc: MockAdc::constant(1850),
//!     indicator: MockIndicator::new(),
//!     delay: MockDelay::new(),
//! };
//! let mut uplink = DepthUplinkController::new(
//!     devices,
//!     JoinCredentials::default(),
//!     UplinkConfig::default(),
//! );
//!
//! let report = uplink.run_cycle(WakeCause::Timer);
//! assert_eq!(report.outcome, CycleOutcome::Sent);
//! assert_eq!(report.record.last_range, Some(1000));
//! assert_eq!(uplink.devices().radio.sent[0].0, vec![3, 0x03, 0xE8, 0x0E, 0x74, 0, 1]);
//! ```

use core::fmt;

use embedded_hal::delay::DelayNs;

use crate::battery::measure_battery_mv;
use crate::config::{short_string, ShortString, UplinkConfig};
use crate::payload::UplinkPayload;
use crate::traits::{
    blink, AppInfo, BatteryAdc, DistanceSensor, Downlink, Indicator, JoinCredentials,
    NonVolatileStore, NoDisplay, PowerManager, RadioLink, StatusDisplay, WakeCause,
    INVALID_RANGE,
};

/// Store keys used by [`UplinkRecord`].
pub mod keys {
    /// Wake counter.
    pub const BOOT_COUNT: &str = "bootcount";
    /// Range in the last successful uplink.
    pub const LAST_RANGE: &str = "lastrange";
    /// Battery voltage in the last successful uplink.
    pub const LAST_VOLTAGE: &str = "lastvoltage";
    /// Wake counter at the last successful uplink.
    pub const LAST_BOOT_COUNT: &str = "lastbootcount";
}

/// Stored in place of an absent range or voltage.
const NONE_SENTINEL: u32 = INVALID_RANGE as u32;

/// How long sub-status lines and the "no data" screen stay up.
const SHORT_HOLD_MS: u32 = 500;

// ============================================================================
// Persisted record
// ============================================================================

/// State carried between wake cycles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct UplinkRecord {
    /// Range in the last successful uplink.
    pub last_range: Option<u16>,
    /// Battery voltage in the last successful uplink.
    pub last_voltage: Option<u16>,
    /// Wake counter at the last successful uplink.
    pub last_boot_count: u32,
    /// Wake counter, advanced once per cycle.
    pub boot_count: u32,
}

fn decode_optional(raw: u32) -> Option<u16> {
    if raw >= NONE_SENTINEL {
        None
    } else {
        Some(raw as u16)
    }
}

fn encode_optional(value: Option<u16>) -> u32 {
    value.map(u32::from).unwrap_or(NONE_SENTINEL)
}

impl UplinkRecord {
    /// Read the record key by key.
    ///
    /// A key that cannot be read loads as never written. The flag is false
    /// when the wake counter was one of them, in which case the stored counter
    /// must not be overwritten.
    pub fn load<N: NonVolatileStore>(store: &mut N) -> (Self, bool) {
        let mut read = |key: &str, default: u32| match store.get_u32(key, default) {
            Ok(value) => Some(value),
            Err(e) => {
                log::error!("uplink: failed to read {}: {:?}", key, e);
                None
            }
        };
        let boot_count = read(keys::BOOT_COUNT, 0);
        let record = Self {
            last_range: read(keys::LAST_RANGE, NONE_SENTINEL).and_then(decode_optional),
            last_voltage: read(keys::LAST_VOLTAGE, NONE_SENTINEL).and_then(decode_optional),
            last_boot_count: read(keys::LAST_BOOT_COUNT, 0).unwrap_or(0),
            boot_count: boot_count.unwrap_or(0),
        };
        (record, boot_count.is_some())
    }

    /// Advance the wake counter and write it straight away.
    pub fn advance_boot_count<N: NonVolatileStore>(&mut self, store: &mut N) -> Result<(), N::Error> {
        self.boot_count = self.boot_count.wrapping_add(1);
        store.put_u32(keys::BOOT_COUNT, self.boot_count)
    }

    /// Adopt the values just sent as the new baseline. An unmeasured voltage
    /// keeps the previous one.
    pub fn mark_sent(&mut self, range: u16, voltage_mv: Option<u16>) {
        self.last_range = Some(range);
        if voltage_mv.is_some() {
            self.last_voltage = voltage_mv;
        }
        self.last_boot_count = self.boot_count;
    }

    /// Write the baseline as three independent keys.
    pub fn persist_sent<N: NonVolatileStore>(&self, store: &mut N) -> Result<(), N::Error> {
        self.persist_readings(store)?;
        store.put_u32(keys::LAST_BOOT_COUNT, self.last_boot_count)
    }

    /// Write the sent range and voltage only.
    pub fn persist_readings<N: NonVolatileStore>(&self, store: &mut N) -> Result<(), N::Error> {
        store.put_u32(keys::LAST_RANGE, encode_optional(self.last_range))?;
        store.put_u32(keys::LAST_VOLTAGE, encode_optional(self.last_voltage))
    }

    /// Wake cycles since the last successful uplink.
    #[inline]
    pub fn cycles_since_send(&self) -> u32 {
        self.boot_count.wrapping_sub(self.last_boot_count)
    }
}

// ============================================================================
// Change detection
// ============================================================================

/// Why a reading is worth sending.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendReason {
    /// No range has ever been sent.
    FirstRange,
    /// Range moved by at least the threshold.
    RangeChanged(u16),
    /// No voltage has ever been sent.
    FirstVoltage,
    /// Voltage moved by at least the threshold.
    VoltageChanged(u16),
    /// Too many cycles since the last uplink.
    Heartbeat(u32),
}

impl fmt::Display for SendReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SendReason::FirstRange => write!(f, "no previous range"),
            SendReason::RangeChanged(d) => write!(f, "range changed by {}mm", d),
            SendReason::FirstVoltage => write!(f, "no previous voltage"),
            SendReason::VoltageChanged(d) => write!(f, "voltage changed by {}mV", d),
            SendReason::Heartbeat(n) => write!(f, "{} cycles since last send", n),
        }
    }
}

/// First reason to send `range`/`voltage_mv` against `record`, if any.
///
/// `record.boot_count` is the current cycle's counter. The voltage check is
/// skipped when `voltage_mv` is `None`.
pub fn send_reason(
    record: &UplinkRecord,
    range: u16,
    voltage_mv: Option<u16>,
    config: &UplinkConfig,
) -> Option<SendReason> {
    match record.last_range {
        None => return Some(SendReason::FirstRange),
        Some(last) => {
            let delta = last.abs_diff(range);
            if delta >= config.range_significant_delta {
                return Some(SendReason::RangeChanged(delta));
            }
        }
    }
    if let Some(voltage_mv) = voltage_mv {
        match record.last_voltage {
            None => return Some(SendReason::FirstVoltage),
            Some(last) => {
                let delta = last.abs_diff(voltage_mv);
                if delta >= config.voltage_significant_delta {
                    return Some(SendReason::VoltageChanged(delta));
                }
            }
        }
    }
    let cycles = record.cycles_since_send();
    if cycles >= config.max_cycles_between_sends {
        return Some(SendReason::Heartbeat(cycles));
    }
    None
}

/// Returns true if the reading should be transmitted.
pub fn should_send(
    record: &UplinkRecord,
    range: u16,
    voltage_mv: Option<u16>,
    config: &UplinkConfig,
) -> bool {
    send_reason(record, range, voltage_mv, config).is_some()
}

// ============================================================================
// Indicator codes
// ============================================================================

/// LED blink patterns signalling cycle progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlinkCode {
    /// Woke up.
    Boot,
    /// Joining the network.
    JoinStart,
    /// Join retries exhausted.
    JoinFailed,
    /// Uplink accepted.
    SendOk,
    /// Uplink failed, retrying.
    SendRetry,
    /// Uplink retries exhausted.
    SendExhausted,
    /// Reading too similar, not sending.
    NoChange,
    /// No valid reading.
    NoReading,
    /// Distance sensor not detected.
    SensorMissing,
    /// Display not detected.
    DisplayMissing,
}

impl BlinkCode {
    /// `(count, half_period_ms)`.
    pub const fn pattern(&self) -> (u32, u32) {
        match self {
            BlinkCode::Boot => (2, 300),
            BlinkCode::JoinStart => (5, 50),
            BlinkCode::JoinFailed => (6, 150),
            BlinkCode::SendOk => (3, 300),
            BlinkCode::SendRetry => (2, 150),
            BlinkCode::SendExhausted => (4, 150),
            BlinkCode::NoChange => (2, 300),
            BlinkCode::NoReading => (3, 150),
            BlinkCode::SensorMissing => (8, 150),
            BlinkCode::DisplayMissing => (7, 150),
        }
    }
}

// ============================================================================
// Cycle result
// ============================================================================

/// Why a cycle did not send.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleFailure {
    /// Sensor not detected at init.
    SensorUnavailable,
    /// Display not detected on an interactive wake.
    DisplayUnavailable,
    /// Every read returned the invalid sentinel.
    NoReading,
    /// Join retries exhausted.
    JoinFailed,
    /// Send retries exhausted.
    SendFailed,
}

/// Result of one wake cycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Reading transmitted and persisted.
    Sent,
    /// Reading too similar to the last one.
    Skipped,
    /// Cycle ended early.
    Failed(CycleFailure),
}

impl fmt::Display for CycleOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CycleOutcome::Sent => write!(f, "sent"),
            CycleOutcome::Skipped => write!(f, "skipped"),
            CycleOutcome::Failed(why) => write!(f, "failed: {:?}", why),
        }
    }
}

/// Everything one cycle did.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CycleReport {
    /// Outcome.
    pub outcome: CycleOutcome,
    /// Record after the cycle.
    pub record: UplinkRecord,
    /// Measured battery voltage (0 if the ADC failed).
    pub battery_mv: u16,
    /// Valid range reading, if any.
    pub range: Option<u16>,
    /// Distance reads made.
    pub read_attempts: u32,
    /// Join attempts made.
    pub join_attempts: u32,
    /// Send attempts made.
    pub send_attempts: u32,
    /// Downlink received after the uplink.
    pub downlink: Option<Downlink>,
}

impl CycleReport {
    fn new(record: UplinkRecord) -> Self {
        Self {
            outcome: CycleOutcome::Skipped,
            record,
            battery_mv: 0,
            range: None,
            read_attempts: 0,
            join_attempts: 0,
            send_attempts: 0,
            downlink: None,
        }
    }
}

// ============================================================================
// Controller
// ============================================================================

/// Peripherals the uplink cycle drives.
pub struct UplinkDevices<S, R, N, A, I, D> {
    /// Distance sensor.
    pub sensor: S,
    /// LoRaWAN radio.
    pub radio: R,
    /// Non-volatile store.
    pub store: N,
    /// Battery ADC.
    pub adc: A,
    /// Status LED.
    pub indicator: I,
    /// Blocking delay.
    pub delay: D,
}

/// One-shot uplink sequencer.
///
/// # Type Parameters
///
/// - `S`: [`DistanceSensor`], `R`: [`RadioLink`], `N`: [`NonVolatileStore`]
/// - `A`: [`BatteryAdc`], `I`: [`Indicator`], `D`: delay
/// - `P`: optional [`StatusDisplay`] (defaults to [`NoDisplay`])
pub struct DepthUplinkController<S, R, N, A, I, D, P = NoDisplay> {
    devices: UplinkDevices<S, R, N, A, I, D>,
    display: P,
    display_on: bool,
    credentials: JoinCredentials,
    config: UplinkConfig,
    name: ShortString,
    record: UplinkRecord,
    counter_readable: bool,
}

impl<S, R, N, A, I, D> DepthUplinkController<S, R, N, A, I, D, NoDisplay> {
    /// Create a controller without a display.
    pub fn new(
        devices: UplinkDevices<S, R, N, A, I, D>,
        credentials: JoinCredentials,
        config: UplinkConfig,
    ) -> Self {
        Self {
            devices,
            display: NoDisplay,
            display_on: false,
            credentials,
            config,
            name: short_string("Depth Sensor"),
            record: UplinkRecord::default(),
            counter_readable: true,
        }
    }
}

impl<S, R, N, A, I, D, P> DepthUplinkController<S, R, N, A, I, D, P>
where
    S: DistanceSensor,
    R: RadioLink,
    N: NonVolatileStore,
    A: BatteryAdc,
    I: Indicator,
    D: DelayNs,
    P: StatusDisplay,
{
    /// Attach a status display, used on interactive wakes.
    pub fn with_display<Q: StatusDisplay>(self, display: Q) -> DepthUplinkController<S, R, N, A, I, D, Q> {
        DepthUplinkController {
            devices: self.devices,
            display,
            display_on: false,
            credentials: self.credentials,
            config: self.config,
            name: self.name,
            record: self.record,
            counter_readable: self.counter_readable,
        }
    }

    /// Firmware name shown on the info screen.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = short_string(name);
        self
    }

    /// Run one wake cycle. Never fails; see [`CycleReport::outcome`].
    pub fn run_cycle(&mut self, wake: WakeCause) -> CycleReport {
        let (record, counter_readable) = UplinkRecord::load(&mut self.devices.store);
        self.record = record;
        self.counter_readable = counter_readable;
        if counter_readable {
            if let Err(e) = self.record.advance_boot_count(&mut self.devices.store) {
                log::error!("uplink: failed to persist boot count: {:?}", e);
            }
        } else {
            log::warn!("uplink: boot count unreadable, stored counters left untouched");
            self.record.boot_count = self.record.boot_count.wrapping_add(1);
        }
        log::info!(
            "uplink: cycle {} (woken by {:?}), last range {:?}, last send at cycle {}",
            self.record.boot_count,
            wake,
            self.record.last_range,
            self.record.last_boot_count
        );
        self.signal(BlinkCode::Boot);

        let mut report = CycleReport::new(self.record);
        report.outcome = match self.measure_and_send(wake, &mut report) {
            Ok(outcome) => outcome,
            Err(failure) => CycleOutcome::Failed(failure),
        };
        report.record = self.record;
        log::info!("uplink: cycle {} {}", self.record.boot_count, report.outcome);
        report
    }

    fn measure_and_send(
        &mut self,
        wake: WakeCause,
        report: &mut CycleReport,
    ) -> Result<CycleOutcome, CycleFailure> {
        let voltage = measure_battery_mv(&mut self.devices.adc, &self.config.battery);
        match voltage {
            Some(mv) => log::info!("uplink: battery {}mV", mv),
            None => log::warn!("uplink: battery ADC unreadable"),
        }
        report.battery_mv = voltage.unwrap_or(0);

        if wake.is_interactive() {
            self.open_display()?;
            let info = AppInfo {
                name: &self.name,
                last_range: self.record.last_range,
                boot_count: self.record.boot_count,
                battery_mv: report.battery_mv,
            };
            if self.display_on {
                if let Err(e) = self.display.show_info(&info) {
                    log::warn!("uplink: display error: {:?}", e);
                }
                self.devices.delay.delay_ms(self.config.display_hold_ms);
            }
        }

        if !self.devices.sensor.init() {
            log::error!("uplink: distance sensor not detected");
            self.subtext("No Sensor!");
            self.signal(BlinkCode::SensorMissing);
            return Err(CycleFailure::SensorUnavailable);
        }

        let range = self.read_range(report);
        self.show_range(range);
        let range = match range {
            Some(range) => range,
            None => {
                self.signal(BlinkCode::NoReading);
                return Err(CycleFailure::NoReading);
            }
        };

        match send_reason(&self.record, range, voltage, &self.config) {
            Some(reason) => log::info!("uplink: sending, {}", reason),
            None => {
                log::info!("uplink: reading too similar, not sending");
                self.subtext("no change");
                self.signal(BlinkCode::NoChange);
                return Ok(CycleOutcome::Skipped);
            }
        }

        self.subtext("joining...");
        self.join(report)?;
        self.subtext("sending...");
        self.send(range, report)?;

        self.record.mark_sent(range, voltage);
        let persisted = if self.counter_readable {
            self.record.persist_sent(&mut self.devices.store)
        } else {
            self.record.persist_readings(&mut self.devices.store)
        };
        if let Err(e) = persisted {
            log::error!("uplink: failed to persist sent values: {:?}", e);
        }
        self.subtext("send ok");
        Ok(CycleOutcome::Sent)
    }

    fn read_range(&mut self, report: &mut CycleReport) -> Option<u16> {
        let sensor = &mut self.devices.sensor;
        let result = self.config.read_retry.run_with_hook(
            &mut self.devices.delay,
            |_, attempt, _| log::warn!("uplink: no reading on attempt {}, retrying", attempt),
            |_| match sensor.read() {
                INVALID_RANGE => Err(()),
                range => Ok(range),
            },
        );
        match result {
            Ok((range, attempts)) => {
                report.read_attempts = attempts;
                report.range = Some(range);
                log::info!("uplink: range {}mm after {} read(s)", range, attempts);
                Some(range)
            }
            Err(e) => {
                report.read_attempts = e.attempts;
                log::error!("uplink: no valid reading after {} attempts", e.attempts);
                None
            }
        }
    }

    fn join(&mut self, report: &mut CycleReport) -> Result<(), CycleFailure> {
        self.signal(BlinkCode::JoinStart);
        let radio = &mut self.devices.radio;
        let credentials = &self.credentials;
        let result = self.config.join_retry.run_with_hook(
            &mut self.devices.delay,
            |_, attempt, e| log::warn!("uplink: join attempt {} failed: {:?}", attempt, e),
            |_| radio.join(credentials),
        );
        match result {
            Ok((_, attempts)) => {
                report.join_attempts = attempts;
                log::info!("uplink: joined after {} attempt(s)", attempts);
                Ok(())
            }
            Err(e) => {
                report.join_attempts = e.attempts;
                log::error!("uplink: join failed after {} attempts: {:?}", e.attempts, e.last);
                self.subtext("join fail");
                self.signal(BlinkCode::JoinFailed);
                Err(CycleFailure::JoinFailed)
            }
        }
    }

    fn send(&mut self, range: u16, report: &mut CycleReport) -> Result<(), CycleFailure> {
        let payload = UplinkPayload::new(range, report.battery_mv, self.record.boot_count)
            .with_version(self.config.payload_version)
            .encode();
        let port = self.config.uplink_port;
        let radio = &mut self.devices.radio;
        let indicator = &mut self.devices.indicator;
        let (count, half) = BlinkCode::SendRetry.pattern();
        let result = self.config.send_retry.run_with_hook(
            &mut self.devices.delay,
            |delay, attempt, e| {
                log::warn!("uplink: send attempt {} failed: {:?}, retrying", attempt, e);
                blink(&mut *indicator, delay, count, half);
            },
            |_| radio.send(&payload, port),
        );
        match result {
            Ok((_, attempts)) => {
                report.send_attempts = attempts;
                log::info!("uplink: {} byte payload sent on port {}", payload.len(), port);
                self.signal(BlinkCode::SendOk);
                if let Some(downlink) = self.devices.radio.take_downlink() {
                    log::info!(
                        "uplink: downlink on port {}: {:02X?}",
                        downlink.port,
                        downlink.data.as_slice()
                    );
                    report.downlink = Some(downlink);
                }
                Ok(())
            }
            Err(e) => {
                report.send_attempts = e.attempts;
                log::error!("uplink: all {} send attempts failed: {:?}", e.attempts, e.last);
                self.subtext("send fail");
                self.signal(BlinkCode::SendExhausted);
                Err(CycleFailure::SendFailed)
            }
        }
    }

    /// Power down peripherals, flush the store and enter deep sleep.
    ///
    /// Only returns on platforms where sleep is simulated or failed to
    /// configure.
    pub fn sleep<W: PowerManager>(&mut self, power: &mut W) -> Result<(), W::Error> {
        if self.display_on {
            if let Err(e) = self.display.set_enabled(false) {
                log::warn!("uplink: display off failed: {:?}", e);
            }
            self.display_on = false;
        }
        self.devices.sensor.disable();
        if let Err(e) = self.devices.radio.sleep() {
            log::warn!("uplink: radio sleep failed: {:?}", e);
        }
        if let Err(e) = self.devices.store.commit() {
            log::error!("uplink: store commit failed: {:?}", e);
        }
        let wake = self.config.wake_sources();
        log::info!(
            "uplink: sleeping {}ms (wake pin {:?})",
            wake.timer_ms,
            wake.wake_pin
        );
        power.enter_deep_sleep(&wake)
    }

    fn open_display(&mut self) -> Result<(), CycleFailure> {
        match self.display.init() {
            Ok(()) => {
                self.display_on = true;
                Ok(())
            }
            Err(e) => {
                log::error!("uplink: display not detected: {:?}", e);
                self.signal(BlinkCode::DisplayMissing);
                Err(CycleFailure::DisplayUnavailable)
            }
        }
    }

    fn show_range(&mut self, range: Option<u16>) {
        if !self.display_on {
            return;
        }
        if let Err(e) = self.display.show_range(range) {
            log::warn!("uplink: display error: {:?}", e);
        }
        let hold = if range.is_some() {
            self.config.display_hold_ms
        } else {
            SHORT_HOLD_MS
        };
        self.devices.delay.delay_ms(hold);
    }

    fn subtext(&mut self, text: &str) {
        if !self.display_on {
            return;
        }
        if let Err(e) = self.display.show_subtext(text) {
            log::warn!("uplink: display error: {:?}", e);
        }
        self.devices.delay.delay_ms(SHORT_HOLD_MS);
    }

    fn signal(&mut self, code: BlinkCode) {
        let (count, half) = code.pattern();
        blink(&mut self.devices.indicator, &mut self.devices.delay, count, half);
    }

    /// Record as of the last cycle.
    pub fn record(&self) -> &UplinkRecord {
        &self.record
    }

    /// Peripherals.
    pub fn devices(&self) -> &UplinkDevices<S, R, N, A, I, D> {
        &self.devices
    }

    /// Mutable peripherals.
    pub fn devices_mut(&mut self) -> &mut UplinkDevices<S, R, N, A, I, D> {
        &mut self.devices
    }

    /// Status display.
    pub fn display(&self) -> &P {
        &self.display
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::MockStore;

    fn record(range: Option<u16>, voltage: Option<u16>, last_boot: u32, boot: u32) -> UplinkRecord {
        UplinkRecord {
            last_range: range,
            last_voltage: voltage,
            last_boot_count: last_boot,
            boot_count: boot,
        }
    }

    #[test]
    fn similar_reading_is_not_sent() {
        let cfg = UplinkConfig::default();
        let last = record(Some(300), Some(3700), 10, 15);
        assert!(!should_send(&last, 340, Some(3700), &cfg));
    }

    #[test]
    fn range_change_is_sent() {
        let cfg = UplinkConfig::default();
        let last = record(Some(300), Some(3700), 10, 11);
        assert_eq!(send_reason(&last, 360, Some(3700), &cfg), Some(SendReason::RangeChanged(60)));
        assert_eq!(send_reason(&last, 250, Some(3700), &cfg), Some(SendReason::RangeChanged(50)));
        assert!(!should_send(&last, 251, Some(3700), &cfg));
    }

    #[test]
    fn missing_baseline_is_sent() {
        let cfg = UplinkConfig::default();
        assert_eq!(
            send_reason(&record(None, Some(3700), 0, 1), 300, Some(3700), &cfg),
            Some(SendReason::FirstRange)
        );
        assert_eq!(
            send_reason(&record(Some(300), None, 0, 1), 300, Some(3700), &cfg),
            Some(SendReason::FirstVoltage)
        );
    }

    #[test]
    fn voltage_and_heartbeat_thresholds() {
        let cfg = UplinkConfig::default();
        let last = record(Some(300), Some(3700), 10, 39);
        assert!(!should_send(&last, 300, Some(3601), &cfg));
        assert_eq!(send_reason(&last, 300, Some(3600), &cfg), Some(SendReason::VoltageChanged(100)));

        let stale = record(Some(300), Some(3700), 10, 40);
        assert_eq!(send_reason(&stale, 300, Some(3700), &cfg), Some(SendReason::Heartbeat(30)));
    }

    #[test]
    fn fresh_store_loads_empty_record() {
        let mut store = MockStore::new();
        assert_eq!(UplinkRecord::load(&mut store), (UplinkRecord::default(), true));
    }

    #[test]
    fn unreadable_key_falls_back_alone() {
        let mut store = MockStore::new()
            .with(keys::BOOT_COUNT, 41)
            .with(keys::LAST_RANGE, 1020)
            .with(keys::LAST_VOLTAGE, 3700)
            .with_failing_read(keys::LAST_RANGE);
        let (rec, counter_readable) = UplinkRecord::load(&mut store);
        assert!(counter_readable);
        assert_eq!(rec.boot_count, 41);
        assert_eq!(rec.last_range, None);
        assert_eq!(rec.last_voltage, Some(3700));

        let mut store = MockStore::new()
            .with(keys::BOOT_COUNT, 41)
            .with_failing_read(keys::BOOT_COUNT);
        assert!(!UplinkRecord::load(&mut store).1);
    }

    #[test]
    fn unmeasured_voltage_is_not_compared() {
        let cfg = UplinkConfig::default();
        let last = record(Some(300), Some(3700), 10, 11);
        assert_eq!(send_reason(&last, 300, None, &cfg), None);
        assert_eq!(send_reason(&record(Some(300), None, 10, 11), 300, None, &cfg), None);

        let mut rec = last;
        rec.mark_sent(400, None);
        assert_eq!(rec.last_voltage, Some(3700));
        assert_eq!(rec.last_range, Some(400));
    }

    #[test]
    fn record_round_trips_through_store() {
        let mut store = MockStore::new();
        let mut rec = UplinkRecord::load(&mut store).0;
        rec.advance_boot_count(&mut store).unwrap();
        rec.mark_sent(1234, Some(3650));
        rec.persist_sent(&mut store).unwrap();

        assert_eq!(store.value(keys::LAST_RANGE), Some(1234));
        let loaded = UplinkRecord::load(&mut store).0;
        assert_eq!(loaded, rec);
        assert_eq!(loaded.cycles_since_send(), 0);
    }

    #[test]
    fn sentinel_reads_back_as_none() {
        let mut store = MockStore::new()
            .with(keys::LAST_RANGE, 0xFFFF)
            .with(keys::LAST_VOLTAGE, 3700);
        let rec = UplinkRecord::load(&mut store).0;
        assert_eq!(rec.last_range, None);
        assert_eq!(rec.last_voltage, Some(3700));
    }

    #[test]
    fn blink_patterns() {
        assert_eq!(BlinkCode::JoinStart.pattern(), (5, 50));
        assert_eq!(BlinkCode::SendOk.pattern(), (3, 300));
        assert_eq!(BlinkCode::SensorMissing.pattern(), (8, 150));
    }
}
