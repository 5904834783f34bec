//! Mock implementations for testing without hardware.
//!
//! This module provides test doubles for all hardware, network and storage
//! traits, so both firmware loops run on desktop.
//!
//! # Available Mocks
//!
//! | Mock | Trait | Purpose |
//! |------|-------|---------|
//! | [`MockMotor`] | [`MotorActuator`] | Tracks drive/brake calls |
//! | [`MockMagnet`] | [`MagnetSensor`] | Queued samples with a fallback level |
//! | [`MockIndicator`] | [`Indicator`] | Tracks LED state changes |
//! | [`MockDelay`] | [`DelayNs`] | Records requested delays without sleeping |
//! | [`MockClock`] | [`Clock`] | Controllable time source |
//! | [`MockAdc`] | [`BatteryAdc`] | Constant, cycling or failing samples |
//! | [`MockSensor`] | [`DistanceSensor`] | Queued ranges, presence flag |
//! | [`MockRadio`] | [`RadioLink`] | Scripted join/send failures |
//! | [`MockStore`] | [`NonVolatileStore`] | In-memory keys with a write log |
//! | [`MockPower`] | [`PowerManager`] | Records sleep requests |
//! | [`MockDisplay`] | [`StatusDisplay`] | Records screens shown |
//! | [`MockI2c`] | [`I2c`] | Records writes, scripted reads |
//! | [`MockPin`] | [`OutputPin`] | Tracks pin level |
//! | [`MockAtTransport`] | [`AtTransport`] | Scripted modem replies |
//!
//! # Example
//!
//! ```rust
//! use rs_conductor::{TrainController, TrainConfig, TrainState};
//! use rs_conductor::hal::{MockDelay, MockIndicator, MockMagnet, MockMotor};
//!
//! let mut train = TrainController::new(
//!     MockMotor::new(),
//!     MockMotor::new(),
//!     MockIndicator::new(),
//!     TrainConfig::default(),
//! );
//! let mut sensor = MockMagnet::present();
//! let mut delay = MockDelay::new();
//!
//! train.start(0).unwrap();
//! train.tick(&mut sensor, &mut delay, 10).unwrap();
//!
//! // Parked on a magnet: stays put, lights on
//! assert_eq!(train.state(), TrainState::Stopped);
//! assert_eq!(train.lights().power, 25);
//! ```
//!
//! [`MotorActuator`]: crate::traits::MotorActuator
//! [`MagnetSensor`]: crate::traits::MagnetSensor
//! [`Indicator`]: crate::traits::Indicator
//! [`DelayNs`]: embedded_hal::delay::DelayNs
//! [`Clock`]: crate::traits::Clock
//! [`BatteryAdc`]: crate::traits::BatteryAdc
//! [`DistanceSensor`]: crate::traits::DistanceSensor
//! [`RadioLink`]: crate::traits::RadioLink
//! [`NonVolatileStore`]: crate::traits::NonVolatileStore
//! [`PowerManager`]: crate::traits::PowerManager
//! [`StatusDisplay`]: crate::traits::StatusDisplay
//! [`I2c`]: embedded_hal::i2c::I2c
//! [`OutputPin`]: embedded_hal::digital::OutputPin
//! [`AtTransport`]: crate::at::AtTransport

extern crate alloc;
use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;

use embedded_hal::delay::DelayNs;

use crate::at::AtTransport;
use crate::traits::{
    AppInfo, BatteryAdc, Clock, DistanceSensor, Downlink, Indicator, JoinCredentials,
    MagnetSensor, MotorActuator, NonVolatileStore, PowerManager, RadioLink, StatusDisplay,
    WakeCause, WakeSources, INVALID_RANGE,
};

// ============================================================================
// Hardware Mocks
// ============================================================================

/// Mock motor (or lights channel) for testing.
///
/// Records every power level driven. Use the public fields to inspect
/// state after test operations.
///
/// # Example
///
/// ```rust
/// use rs_conductor::hal::MockMotor;
/// use rs_conductor::traits::MotorActuator;
///
/// let mut motor = MockMotor::new();
/// motor.drive(200).unwrap();
/// motor.adjust(100).unwrap();
///
/// assert_eq!(motor.power, 255);
/// assert_eq!(motor.driven, vec![200, 255]);
/// ```
#[derive(Debug, Default)]
pub struct MockMotor {
    /// Current power level.
    pub power: i16,
    /// Every level passed to `drive`, in order.
    pub driven: Vec<i16>,
    /// Number of `brake` calls.
    pub brakes: usize,
    /// Number of `standby` calls.
    pub standbys: usize,
    /// Make every call fail.
    pub fail: bool,
}

impl MockMotor {
    /// Creates a new mock motor at rest.
    pub fn new() -> Self {
        Self::default()
    }
}

impl MotorActuator for MockMotor {
    type Error = ();

    fn drive(&mut self, power: i16) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        self.power = power;
        self.driven.push(power);
        Ok(())
    }

    fn brake(&mut self) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        self.power = 0;
        self.brakes += 1;
        Ok(())
    }

    fn standby(&mut self) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        self.power = 0;
        self.standbys += 1;
        Ok(())
    }

    fn power(&self) -> i16 {
        self.power
    }
}

/// Mock analog hall sensor.
///
/// Queued samples come out first, in order; after that every read
/// returns `level`.
///
/// # Example
///
/// ```rust
/// use rs_conductor::hal::MockMagnet;
/// use rs_conductor::traits::MagnetSensor;
///
/// let mut sensor = MockMagnet::with_samples(&[1700], 1665);
/// assert_eq!(sensor.read_raw().unwrap(), 1700);
/// assert_eq!(sensor.read_raw().unwrap(), 1665);
/// assert_eq!(sensor.reads, 2);
/// ```
#[derive(Debug, Default)]
pub struct MockMagnet {
    samples: VecDeque<u16>,
    /// Reading once the queue is empty.
    pub level: u16,
    /// Number of reads.
    pub reads: usize,
    /// Make every read fail.
    pub fail: bool,
}

impl MockMagnet {
    /// Idle reading: no magnet nearby.
    pub const IDLE: u16 = 1665;
    /// Reading with a magnet under the sensor.
    pub const MAGNET: u16 = 1700;

    /// Sensor that never sees a magnet.
    pub fn absent() -> Self {
        Self {
            level: Self::IDLE,
            ..Default::default()
        }
    }

    /// Sensor parked over a magnet.
    pub fn present() -> Self {
        Self {
            level: Self::MAGNET,
            ..Default::default()
        }
    }

    /// Queue `samples`, then fall back to `level`.
    pub fn with_samples(samples: &[u16], level: u16) -> Self {
        Self {
            samples: samples.iter().copied().collect(),
            level,
            ..Default::default()
        }
    }

    /// Change the fallback reading.
    pub fn set_level(&mut self, level: u16) {
        self.level = level;
    }

    /// Queue more samples.
    pub fn queue(&mut self, samples: &[u16]) {
        self.samples.extend(samples.iter().copied());
    }
}

impl MagnetSensor for MockMagnet {
    type Error = ();

    fn read_raw(&mut self) -> Result<u16, ()> {
        if self.fail {
            return Err(());
        }
        self.reads += 1;
        Ok(self.samples.pop_front().unwrap_or(self.level))
    }
}

/// Mock status LED.
#[derive(Debug, Default)]
pub struct MockIndicator {
    /// Current LED state.
    pub on: bool,
    /// Number of calls that changed the state.
    pub changes: usize,
    /// Every value passed to `set`.
    pub history: Vec<bool>,
}

impl MockIndicator {
    /// Creates a new mock LED, off.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of on-pulses seen (rising edges).
    pub fn pulses(&self) -> usize {
        let mut last = false;
        let mut pulses = 0;
        for &on in &self.history {
            if on && !last {
                pulses += 1;
            }
            last = on;
        }
        pulses
    }
}

impl Indicator for MockIndicator {
    type Error = ();

    fn set(&mut self, on: bool) -> Result<(), ()> {
        if on != self.on {
            self.changes += 1;
        }
        self.on = on;
        self.history.push(on);
        Ok(())
    }
}

/// Mock delay that records instead of sleeping.
///
/// # Example
///
/// ```rust
/// use embedded_hal::delay::DelayNs;
/// use rs_conductor::hal::MockDelay;
///
/// let mut delay = MockDelay::new();
/// delay.delay_ms(500);
/// delay.delay_ms(250);
/// assert_eq!(delay.delays(), &[500, 250]);
/// assert_eq!(delay.total_ms(), 750);
/// ```
#[derive(Debug, Default)]
pub struct MockDelay {
    delays: Vec<u32>,
    nanos: u64,
}

impl MockDelay {
    /// Creates a new mock delay.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `delay_ms` request, in order.
    pub fn delays(&self) -> &[u32] {
        &self.delays
    }

    /// Total requested delay in milliseconds.
    pub fn total_ms(&self) -> u64 {
        self.delays.iter().map(|&ms| ms as u64).sum::<u64>() + self.nanos / 1_000_000
    }

    /// Forget recorded delays.
    pub fn clear(&mut self) {
        self.delays.clear();
        self.nanos = 0;
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.nanos += ns as u64;
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delays.push(ms);
    }
}

/// Mock clock for testing.
///
/// Provides a controllable time source for testing time-dependent behavior.
///
/// # Example
///
/// ```rust
/// use rs_conductor::hal::MockClock;
/// use rs_conductor::traits::Clock;
///
/// let mut clock = MockClock::new();
/// assert_eq!(clock.now_ms(), 0);
///
/// clock.set(1000);
/// clock.advance(500);
/// assert_eq!(clock.now_ms(), 1500);
/// ```
#[derive(Debug, Default)]
pub struct MockClock {
    current_ms: u64,
}

impl MockClock {
    /// Creates a new mock clock starting at 0ms.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the current time in milliseconds.
    pub fn set(&mut self, ms: u64) {
        self.current_ms = ms;
    }

    /// Advances the clock by the given duration.
    pub fn advance(&mut self, ms: u64) {
        self.current_ms += ms;
    }
}

impl Clock for MockClock {
    fn now_ms(&self) -> u64 {
        self.current_ms
    }
}

/// Mock battery ADC returning calibrated millivolts.
#[derive(Debug, Default)]
pub struct MockAdc {
    samples: Vec<u16>,
    next: usize,
    /// Number of reads attempted.
    pub reads: usize,
}

impl MockAdc {
    /// Every read returns `mv`.
    pub fn constant(mv: u16) -> Self {
        Self::sequence(&[mv])
    }

    /// Reads cycle through `samples`.
    pub fn sequence(samples: &[u16]) -> Self {
        Self {
            samples: samples.to_vec(),
            ..Default::default()
        }
    }

    /// Every read fails.
    pub fn failing() -> Self {
        Self::default()
    }
}

impl BatteryAdc for MockAdc {
    type Error = ();

    fn read_mv(&mut self) -> Result<u16, ()> {
        self.reads += 1;
        if self.samples.is_empty() {
            return Err(());
        }
        let mv = self.samples[self.next % self.samples.len()];
        self.next += 1;
        Ok(mv)
    }
}

/// Mock distance sensor.
///
/// Queued ranges come out first; after that reads return
/// [`INVALID_RANGE`].
#[derive(Debug)]
pub struct MockSensor {
    /// Whether `init` finds the hardware.
    pub present: bool,
    readings: VecDeque<u16>,
    /// Number of reads.
    pub reads: usize,
    /// Number of `init` calls.
    pub inits: usize,
    /// Whether the sensor is currently enabled.
    pub enabled: bool,
    /// Number of `disable` calls.
    pub disables: usize,
}

impl MockSensor {
    /// Sensor whose reads return `readings` in order.
    pub fn with_readings(readings: &[u16]) -> Self {
        Self {
            present: true,
            readings: readings.iter().copied().collect(),
            reads: 0,
            inits: 0,
            enabled: false,
            disables: 0,
        }
    }

    /// Sensor that always reads `range`.
    pub fn steady(range: u16) -> Self {
        Self::with_readings(&[range; 16])
    }

    /// Sensor that is not wired up.
    pub fn missing() -> Self {
        Self {
            present: false,
            ..Self::with_readings(&[])
        }
    }
}

impl DistanceSensor for MockSensor {
    fn init(&mut self) -> bool {
        self.inits += 1;
        self.enabled = self.present;
        self.present
    }

    fn read(&mut self) -> u16 {
        self.reads += 1;
        self.readings.pop_front().unwrap_or(INVALID_RANGE)
    }

    fn enable(&mut self) {
        self.enabled = true;
    }

    fn disable(&mut self) {
        self.enabled = false;
        self.disables += 1;
    }
}

// ============================================================================
// Network Mocks
// ============================================================================

/// Mock LoRaWAN radio.
///
/// The first `join_failures` joins and `send_failures` sends fail; use
/// `u32::MAX` for a radio that never succeeds.
///
/// # Example
///
/// ```rust
/// use rs_conductor::hal::MockRadio;
/// use rs_conductor::traits::{JoinCredentials, RadioLink};
///
/// let mut radio = MockRadio::new().with_send_failures(1);
/// radio.join(&JoinCredentials::default()).unwrap();
/// assert!(radio.send(&[1], 2).is_err());
/// assert!(radio.send(&[1], 2).is_ok());
/// assert_eq!(radio.send_attempts, 2);
/// assert_eq!(radio.sent.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct MockRadio {
    /// Joins to fail before succeeding.
    pub join_failures: u32,
    /// Sends to fail before succeeding.
    pub send_failures: u32,
    /// Number of `join` calls.
    pub join_attempts: u32,
    /// Number of `send` calls.
    pub send_attempts: u32,
    /// Whether a join has succeeded.
    pub joined: bool,
    /// Successful uplinks (payload, port).
    pub sent: Vec<(Vec<u8>, u8)>,
    /// Downlink delivered after the next successful send.
    pub pending_downlink: Option<Downlink>,
    downlink: Option<Downlink>,
    /// Number of `sleep` calls.
    pub sleeps: usize,
}

impl MockRadio {
    /// Creates a radio that always succeeds.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the first `n` joins.
    pub fn with_join_failures(mut self, n: u32) -> Self {
        self.join_failures = n;
        self
    }

    /// Fail the first `n` sends.
    pub fn with_send_failures(mut self, n: u32) -> Self {
        self.send_failures = n;
        self
    }

    /// Deliver `downlink` after the next successful send.
    pub fn with_downlink(mut self, downlink: Downlink) -> Self {
        self.pending_downlink = Some(downlink);
        self
    }
}

impl RadioLink for MockRadio {
    type Error = ();

    fn join(&mut self, _credentials: &JoinCredentials) -> Result<(), ()> {
        self.join_attempts += 1;
        if self.join_attempts <= self.join_failures {
            return Err(());
        }
        self.joined = true;
        Ok(())
    }

    fn send(&mut self, payload: &[u8], port: u8) -> Result<(), ()> {
        self.send_attempts += 1;
        if !self.joined || self.send_attempts <= self.send_failures {
            return Err(());
        }
        self.sent.push((payload.to_vec(), port));
        self.downlink = self.pending_downlink.take();
        Ok(())
    }

    fn take_downlink(&mut self) -> Option<Downlink> {
        self.downlink.take()
    }

    fn sleep(&mut self) -> Result<(), ()> {
        self.sleeps += 1;
        Ok(())
    }
}

/// Scripted AT modem transport.
///
/// Each `write_line` releases the next queued reply block (CRLF appended)
/// into the receive buffer. Reads time out once the buffer is empty.
#[derive(Debug, Default)]
pub struct MockAtTransport {
    /// Lines written, in order.
    pub written: Vec<String>,
    /// Reads that found nothing pending.
    pub idle_polls: usize,
    replies: VecDeque<String>,
    rx: VecDeque<u8>,
}

impl MockAtTransport {
    /// Creates a transport with no replies queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the reply to the next command (lines separated by CRLF).
    pub fn reply(&mut self, text: &str) {
        self.replies.push_back(text.into());
    }
}

impl AtTransport for MockAtTransport {
    type Error = ();

    fn write_line(&mut self, line: &str) -> Result<(), ()> {
        self.written.push(line.into());
        if let Some(reply) = self.replies.pop_front() {
            self.rx.extend(reply.bytes());
            self.rx.extend(b"\r\n");
        }
        Ok(())
    }

    fn read_byte(&mut self, _timeout_ms: u32) -> Result<Option<u8>, ()> {
        let byte = self.rx.pop_front();
        if byte.is_none() {
            self.idle_polls += 1;
        }
        Ok(byte)
    }

    fn clear_input(&mut self) -> Result<(), ()> {
        self.rx.clear();
        Ok(())
    }
}

// ============================================================================
// Storage and Power Mocks
// ============================================================================

/// In-memory non-volatile store.
///
/// Every write is also appended to `writes` so tests can check ordering.
#[derive(Debug, Default)]
pub struct MockStore {
    values: Vec<(String, u32)>,
    /// Every `put_u32`, in order.
    pub writes: Vec<(String, u32)>,
    /// Number of `commit` calls.
    pub commits: usize,
    /// Make writes fail.
    pub fail_writes: bool,
    failing_reads: Vec<String>,
}

impl MockStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate `key`.
    pub fn with(mut self, key: &str, value: u32) -> Self {
        self.set(key, value);
        self
    }

    /// Make every read of `key` fail.
    pub fn with_failing_read(mut self, key: &str) -> Self {
        self.failing_reads.push(key.into());
        self
    }

    /// Current value of `key`, if written.
    pub fn value(&self, key: &str) -> Option<u32> {
        self.values
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| *v)
    }

    fn set(&mut self, key: &str, value: u32) {
        match self.values.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.values.push((key.into(), value)),
        }
    }
}

impl NonVolatileStore for MockStore {
    type Error = ();

    fn get_u32(&mut self, key: &str, default: u32) -> Result<u32, ()> {
        if self.failing_reads.iter().any(|k| k == key) {
            return Err(());
        }
        Ok(self.value(key).unwrap_or(default))
    }

    fn put_u32(&mut self, key: &str, value: u32) -> Result<(), ()> {
        if self.fail_writes {
            return Err(());
        }
        self.set(key, value);
        self.writes.push((key.into(), value));
        Ok(())
    }

    fn commit(&mut self) -> Result<(), ()> {
        self.commits += 1;
        Ok(())
    }
}

/// Mock deep-sleep controller.
#[derive(Debug, Default)]
pub struct MockPower {
    /// Reported wake cause.
    pub cause: WakeCause,
    /// Every sleep request, in order.
    pub sleeps: Vec<WakeSources>,
    /// Make sleep configuration fail.
    pub fail: bool,
}

impl MockPower {
    /// Creates a mock reporting `cause`.
    pub fn woken_by(cause: WakeCause) -> Self {
        Self {
            cause,
            ..Default::default()
        }
    }
}

impl PowerManager for MockPower {
    type Error = ();

    fn enter_deep_sleep(&mut self, wake: &WakeSources) -> Result<(), ()> {
        if self.fail {
            return Err(());
        }
        self.sleeps.push(*wake);
        Ok(())
    }

    fn wake_cause(&self) -> WakeCause {
        self.cause
    }
}

// ============================================================================
// Display Mocks
// ============================================================================

/// Mock status display.
#[derive(Debug, Default)]
pub struct MockDisplay {
    /// Whether `init` should fail (no panel on the bus).
    pub missing: bool,
    /// Whether `init` was called.
    pub initialized: bool,
    /// Whether the panel is powered.
    pub enabled: bool,
    /// Number of info screens shown.
    pub info_count: usize,
    /// Last range screen shown.
    pub last_range: Option<Option<u16>>,
    /// Every sub-status line, in order.
    pub subtexts: Vec<String>,
}

impl MockDisplay {
    /// Creates a new mock display.
    pub fn new() -> Self {
        Self::default()
    }
}

impl StatusDisplay for MockDisplay {
    type Error = ();

    fn init(&mut self) -> Result<(), ()> {
        if self.missing {
            return Err(());
        }
        self.initialized = true;
        self.enabled = true;
        Ok(())
    }

    fn clear(&mut self) -> Result<(), ()> {
        Ok(())
    }

    fn show_info(&mut self, _info: &AppInfo<'_>) -> Result<(), ()> {
        self.info_count += 1;
        Ok(())
    }

    fn show_range(&mut self, range: Option<u16>) -> Result<(), ()> {
        self.last_range = Some(range);
        Ok(())
    }

    fn show_subtext(&mut self, text: &str) -> Result<(), ()> {
        self.subtexts.push(text.into());
        Ok(())
    }

    fn set_enabled(&mut self, on: bool) -> Result<(), ()> {
        self.enabled = on;
        Ok(())
    }
}

// ============================================================================
// Bus Mocks
// ============================================================================

/// Mock I2C bus.
///
/// Records every write (address, bytes) and answers reads from a queue;
/// reads with nothing queued return zeros.
#[derive(Debug, Default)]
pub struct MockI2c {
    /// Every write, in order.
    pub writes: Vec<(u8, Vec<u8>)>,
    reads: VecDeque<Vec<u8>>,
    /// Make every transaction fail.
    pub fail: bool,
}

impl MockI2c {
    /// Creates an idle bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the bytes returned by the next read.
    pub fn queue_read(&mut self, bytes: &[u8]) {
        self.reads.push_back(bytes.to_vec());
    }
}

impl embedded_hal::i2c::ErrorType for MockI2c {
    type Error = embedded_hal::i2c::ErrorKind;
}

impl embedded_hal::i2c::I2c for MockI2c {
    fn transaction(
        &mut self,
        address: u8,
        operations: &mut [embedded_hal::i2c::Operation<'_>],
    ) -> Result<(), Self::Error> {
        use embedded_hal::i2c::{ErrorKind, NoAcknowledgeSource, Operation};

        if self.fail {
            return Err(ErrorKind::NoAcknowledge(NoAcknowledgeSource::Address));
        }
        for op in operations {
            match op {
                Operation::Write(bytes) => self.writes.push((address, bytes.to_vec())),
                Operation::Read(buf) => {
                    let data = self.reads.pop_front().unwrap_or_default();
                    for (i, b) in buf.iter_mut().enumerate() {
                        *b = data.get(i).copied().unwrap_or(0);
                    }
                }
            }
        }
        Ok(())
    }
}

/// Mock output pin.
#[derive(Debug, Default)]
pub struct MockPin {
    /// Current level.
    pub high: bool,
    /// Every level set, in order.
    pub levels: Vec<bool>,
}

impl MockPin {
    /// Creates a pin driven low.
    pub fn new() -> Self {
        Self::default()
    }
}

impl embedded_hal::digital::ErrorType for MockPin {
    type Error = core::convert::Infallible;
}

impl embedded_hal::digital::OutputPin for MockPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.high = false;
        self.levels.push(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.high = true;
        self.levels.push(true);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    // =========================================================================
    // MockMotor Tests
    // =========================================================================

    #[test]
    fn mock_motor_default() {
        let motor = MockMotor::new();
        assert_eq!(motor.power, 0);
        assert!(motor.driven.is_empty());
        assert_eq!(motor.brakes, 0);
    }

    #[test]
    fn mock_motor_brake_zeroes_power() {
        let mut motor = MockMotor::new();
        motor.drive(-128).unwrap();
        motor.brake().unwrap();
        assert_eq!(motor.power(), 0);
        assert_eq!(motor.brakes, 1);
    }

    #[test]
    fn mock_motor_fail() {
        let mut motor = MockMotor::new();
        motor.fail = true;
        assert!(motor.drive(10).is_err());
        assert!(motor.brake().is_err());
    }

    // =========================================================================
    // MockMagnet / MockDelay Tests
    // =========================================================================

    #[test]
    fn mock_magnet_queue_then_level() {
        let mut sensor = MockMagnet::absent();
        sensor.queue(&[1, 2]);
        assert_eq!(sensor.read_raw().unwrap(), 1);
        assert_eq!(sensor.read_raw().unwrap(), 2);
        assert_eq!(sensor.read_raw().unwrap(), MockMagnet::IDLE);
    }

    #[test]
    fn mock_delay_ns_counts_toward_total() {
        let mut delay = MockDelay::new();
        delay.delay_ns(2_000_000);
        delay.delay_ms(3);
        assert_eq!(delay.total_ms(), 5);
        assert_eq!(delay.delays(), &[3]);
    }

    // =========================================================================
    // MockIndicator Tests
    // =========================================================================

    #[test]
    fn mock_indicator_counts_pulses() {
        let mut led = MockIndicator::new();
        for on in [true, false, true, false, false] {
            led.set(on).unwrap();
        }
        assert_eq!(led.pulses(), 2);
        assert_eq!(led.changes, 4);
    }

    // =========================================================================
    // MockClock Tests
    // =========================================================================

    #[test]
    fn mock_clock_advance() {
        let mut clock = MockClock::new();
        clock.advance(500);
        assert_eq!(clock.now_ms(), 500);
        clock.advance(250);
        assert_eq!(clock.now_ms(), 750);
    }

    // =========================================================================
    // MockAdc / MockSensor Tests
    // =========================================================================

    #[test]
    fn mock_adc_sequence_cycles() {
        let mut adc = MockAdc::sequence(&[1, 2]);
        assert_eq!(adc.read_mv().unwrap(), 1);
        assert_eq!(adc.read_mv().unwrap(), 2);
        assert_eq!(adc.read_mv().unwrap(), 1);
        assert!(MockAdc::failing().read_mv().is_err());
    }

    #[test]
    fn mock_sensor_runs_out_to_invalid() {
        let mut sensor = MockSensor::with_readings(&[300]);
        assert!(sensor.init());
        assert_eq!(sensor.read(), 300);
        assert_eq!(sensor.read(), INVALID_RANGE);
        assert!(!MockSensor::missing().init());
    }

    // =========================================================================
    // MockRadio / MockStore Tests
    // =========================================================================

    #[test]
    fn mock_radio_send_requires_join() {
        let mut radio = MockRadio::new();
        assert!(radio.send(&[1], 2).is_err());
        radio.join(&JoinCredentials::default()).unwrap();
        assert!(radio.send(&[1], 2).is_ok());
        assert_eq!(radio.sent, vec![(vec![1], 2)]);
    }

    #[test]
    fn mock_radio_downlink_after_send() {
        let mut radio = MockRadio::new().with_downlink(Downlink::default());
        assert!(radio.take_downlink().is_none());
        radio.join(&JoinCredentials::default()).unwrap();
        radio.send(&[1], 2).unwrap();
        assert!(radio.take_downlink().is_some());
        assert!(radio.take_downlink().is_none());
    }

    #[test]
    fn mock_store_overwrites_and_logs() {
        let mut store = MockStore::new().with("bootcount", 4);
        assert_eq!(store.get_u32("bootcount", 0).unwrap(), 4);
        store.put_u32("bootcount", 5).unwrap();
        store.put_u32("bootcount", 6).unwrap();
        assert_eq!(store.value("bootcount"), Some(6));
        assert_eq!(store.writes.len(), 2);
    }

    // =========================================================================
    // Bus Mock Tests
    // =========================================================================

    #[test]
    fn mock_i2c_write_read() {
        use embedded_hal::i2c::I2c;

        let mut bus = MockI2c::new();
        bus.queue_read(&[0x01, 0x2C]);
        let mut buf = [0u8; 2];
        bus.write_read(0x74, &[0x02], &mut buf).unwrap();
        assert_eq!(buf, [0x01, 0x2C]);
        assert_eq!(bus.writes, vec![(0x74, vec![0x02])]);
    }
}
