//! Integration tests for the depth sensor wake cycle

use std::cell::RefCell;
use std::rc::Rc;

use rs_conductor::{
    hal::{
        MockAdc, MockAtTransport, MockDelay, MockDisplay, MockIndicator, MockPower, MockRadio,
        MockSensor, MockStore,
    },
    traits::{Downlink, WakeLevel},
    uplink::keys,
    AtModem, CycleFailure, CycleOutcome, DepthUplinkController, DistanceSensor, JoinCredentials,
    NonVolatileStore, UplinkConfig, UplinkDevices, WakeCause, WakeSources, INVALID_RANGE,
};

type Uplink = DepthUplinkController<MockSensor, MockRadio, MockStore, MockAdc, MockIndicator, MockDelay>;

fn devices<S, R, N>(sensor: S, radio: R, store: N) -> UplinkDevices<S, R, N, MockAdc, MockIndicator, MockDelay> {
    UplinkDevices {
        sensor,
        radio,
        store,
        adc: MockAdc::constant(1850),
        indicator: MockIndicator::new(),
        delay: MockDelay::new(),
    }
}

fn uplink(sensor: MockSensor, radio: MockRadio, store: MockStore) -> Uplink {
    DepthUplinkController::new(
        devices(sensor, radio, store),
        JoinCredentials::default(),
        UplinkConfig::default(),
    )
}

/// Store as left by a cycle that sent 1020mm / 3700mV at boot 5.
fn sent_at_boot_5(boot_count: u32) -> MockStore {
    MockStore::new()
        .with(keys::LAST_RANGE, 1020)
        .with(keys::LAST_VOLTAGE, 3700)
        .with(keys::LAST_BOOT_COUNT, 5)
        .with(keys::BOOT_COUNT, boot_count)
}

fn count_delays(delay: &MockDelay, ms: u32) -> usize {
    delay.delays().iter().filter(|d| **d == ms).count()
}

// ============================================================================
// Change detection across cycles
// ============================================================================

#[test]
fn first_boot_sends_and_persists_baseline() {
    let mut uplink = uplink(MockSensor::steady(1000), MockRadio::new(), MockStore::new());
    let report = uplink.run_cycle(WakeCause::Timer);

    assert_eq!(report.outcome, CycleOutcome::Sent);
    assert_eq!(report.battery_mv, 3700);
    assert_eq!(report.range, Some(1000));
    assert_eq!((report.read_attempts, report.join_attempts, report.send_attempts), (1, 1, 1));

    let devices = uplink.devices();
    assert_eq!(devices.radio.sent, vec![(vec![3, 0x03, 0xE8, 0x0E, 0x74, 0, 1], 2)]);
    assert_eq!(devices.store.value(keys::BOOT_COUNT), Some(1));
    assert_eq!(devices.store.value(keys::LAST_RANGE), Some(1000));
    assert_eq!(devices.store.value(keys::LAST_VOLTAGE), Some(3700));
    assert_eq!(devices.store.value(keys::LAST_BOOT_COUNT), Some(1));
    assert_eq!(devices.store.writes[0], (keys::BOOT_COUNT.into(), 1));
}

#[test]
fn unchanged_reading_is_skipped() {
    let mut uplink = uplink(MockSensor::steady(1000), MockRadio::new(), sent_at_boot_5(10));
    let report = uplink.run_cycle(WakeCause::Timer);

    assert_eq!(report.outcome, CycleOutcome::Skipped);
    assert_eq!(report.record.boot_count, 11);
    let devices = uplink.devices();
    assert_eq!(devices.radio.join_attempts, 0);
    assert_eq!(devices.store.value(keys::BOOT_COUNT), Some(11));
    assert_eq!(devices.store.value(keys::LAST_RANGE), Some(1020));
    assert_eq!(devices.store.value(keys::LAST_BOOT_COUNT), Some(5));
}

#[test]
fn heartbeat_after_max_cycles() {
    let mut uplink = uplink(MockSensor::steady(1000), MockRadio::new(), sent_at_boot_5(34));
    let report = uplink.run_cycle(WakeCause::Timer);

    assert_eq!(report.outcome, CycleOutcome::Sent);
    assert_eq!(uplink.devices().radio.sent[0].0, vec![3, 0x03, 0xE8, 0x0E, 0x74, 0, 35]);
    assert_eq!(uplink.devices().store.value(keys::LAST_BOOT_COUNT), Some(35));
}

#[test]
fn range_change_is_sent() {
    let mut uplink = uplink(MockSensor::steady(1070), MockRadio::new(), sent_at_boot_5(10));
    assert_eq!(uplink.run_cycle(WakeCause::Timer).outcome, CycleOutcome::Sent);
    assert_eq!(uplink.devices().store.value(keys::LAST_RANGE), Some(1070));
}

#[test]
fn consecutive_cycles_share_the_store() {
    let mut uplink = uplink(MockSensor::steady(1000), MockRadio::new(), MockStore::new());
    assert_eq!(uplink.run_cycle(WakeCause::Timer).outcome, CycleOutcome::Sent);

    let report = uplink.run_cycle(WakeCause::Timer);
    assert_eq!(report.outcome, CycleOutcome::Skipped);
    assert_eq!(report.record.boot_count, 2);
    assert_eq!(report.record.cycles_since_send(), 1);
    assert_eq!(uplink.devices().radio.sent.len(), 1);
}

// ============================================================================
// Sensor failures
// ============================================================================

#[test]
fn missing_sensor_still_counts_the_boot() {
    let mut uplink = uplink(MockSensor::missing(), MockRadio::new(), MockStore::new());
    let report = uplink.run_cycle(WakeCause::Timer);

    assert_eq!(report.outcome, CycleOutcome::Failed(CycleFailure::SensorUnavailable));
    let devices = uplink.devices();
    assert_eq!(devices.store.value(keys::BOOT_COUNT), Some(1));
    assert_eq!(devices.sensor.reads, 0);
    assert_eq!(devices.radio.join_attempts, 0);
    // Boot (2) then sensor missing (8).
    assert_eq!(devices.indicator.pulses(), 10);
}

#[test]
fn no_reading_after_all_attempts() {
    let mut uplink = uplink(MockSensor::with_readings(&[]), MockRadio::new(), MockStore::new());
    let report = uplink.run_cycle(WakeCause::Timer);

    assert_eq!(report.outcome, CycleOutcome::Failed(CycleFailure::NoReading));
    assert_eq!(report.read_attempts, 5);
    assert_eq!(report.range, None);

    let devices = uplink.devices();
    assert_eq!(devices.sensor.reads, 5);
    assert_eq!(devices.radio.join_attempts, 0);
    let mut expected = vec![300; 4];
    expected.extend([500; 4]);
    expected.extend([150; 6]);
    assert_eq!(devices.delay.delays(), expected.as_slice());
}

#[test]
fn read_recovers_on_retry() {
    let sensor = MockSensor::with_readings(&[INVALID_RANGE, INVALID_RANGE, 800]);
    let mut uplink = uplink(sensor, MockRadio::new(), MockStore::new());
    let report = uplink.run_cycle(WakeCause::Timer);

    assert_eq!(report.outcome, CycleOutcome::Sent);
    assert_eq!(report.read_attempts, 3);
    assert_eq!(report.range, Some(800));
    assert_eq!(count_delays(&uplink.devices().delay, 500), 2);
}

#[test]
fn unreadable_battery_reports_zero() {
    let mut parts = devices(MockSensor::steady(1000), MockRadio::new(), MockStore::new());
    parts.adc = MockAdc::failing();
    let mut uplink =
        DepthUplinkController::new(parts, JoinCredentials::default(), UplinkConfig::default());
    let report = uplink.run_cycle(WakeCause::Timer);

    assert_eq!(report.battery_mv, 0);
    assert_eq!(report.outcome, CycleOutcome::Sent);
    assert_eq!(uplink.devices().radio.sent[0].0, vec![3, 0x03, 0xE8, 0, 0, 0, 1]);
}

#[test]
fn unreadable_battery_keeps_voltage_baseline() {
    let mut parts = devices(MockSensor::steady(1000), MockRadio::new(), sent_at_boot_5(10));
    parts.adc = MockAdc::failing();
    let mut uplink =
        DepthUplinkController::new(parts, JoinCredentials::default(), UplinkConfig::default());

    assert_eq!(uplink.run_cycle(WakeCause::Timer).outcome, CycleOutcome::Skipped);
    assert_eq!(uplink.devices().radio.join_attempts, 0);

    // A range change still goes out, without losing the last good voltage.
    uplink.devices_mut().sensor = MockSensor::steady(1100);
    assert_eq!(uplink.run_cycle(WakeCause::Timer).outcome, CycleOutcome::Sent);
    assert_eq!(uplink.devices().store.value(keys::LAST_VOLTAGE), Some(3700));
    assert_eq!(uplink.devices().store.value(keys::LAST_RANGE), Some(1100));
}

// ============================================================================
// Radio failures
// ============================================================================

#[test]
fn join_exhausted_keeps_no_baseline() {
    let radio = MockRadio::new().with_join_failures(u32::MAX);
    let mut uplink = uplink(MockSensor::steady(1000), radio, MockStore::new());
    let report = uplink.run_cycle(WakeCause::Timer);

    assert_eq!(report.outcome, CycleOutcome::Failed(CycleFailure::JoinFailed));
    assert_eq!(report.join_attempts, 3);
    let devices = uplink.devices();
    assert_eq!(devices.radio.send_attempts, 0);
    assert_eq!(count_delays(&devices.delay, 15_000), 2);
    assert_eq!(devices.store.value(keys::LAST_RANGE), None);
    assert_eq!(devices.store.value(keys::BOOT_COUNT), Some(1));
}

#[test]
fn send_retries_then_succeeds() {
    let radio = MockRadio::new().with_send_failures(2);
    let mut uplink = uplink(MockSensor::steady(1000), radio, MockStore::new());
    let report = uplink.run_cycle(WakeCause::Timer);

    assert_eq!(report.outcome, CycleOutcome::Sent);
    assert_eq!(report.send_attempts, 3);
    let devices = uplink.devices();
    assert_eq!(devices.radio.sent.len(), 1);
    assert_eq!(count_delays(&devices.delay, 5_000), 2);
    // Boot (2), join start (5), two retry blinks (2 each), send ok (3).
    assert_eq!(devices.indicator.pulses(), 14);
}

#[test]
fn send_exhausted_resends_next_cycle() {
    let radio = MockRadio::new().with_send_failures(u32::MAX);
    let mut uplink = uplink(MockSensor::steady(1000), radio, MockStore::new());

    let report = uplink.run_cycle(WakeCause::Timer);
    assert_eq!(report.outcome, CycleOutcome::Failed(CycleFailure::SendFailed));
    assert_eq!(report.send_attempts, 3);
    assert_eq!(uplink.devices().store.value(keys::LAST_RANGE), None);

    uplink.devices_mut().radio.send_failures = 0;
    let report = uplink.run_cycle(WakeCause::Timer);
    assert_eq!(report.outcome, CycleOutcome::Sent);
    assert_eq!(uplink.devices().radio.sent[0].0, vec![3, 0x03, 0xE8, 0x0E, 0x74, 0, 2]);
}

#[test]
fn downlink_is_reported() {
    let mut data = heapless::Vec::new();
    data.extend_from_slice(&[0x01, 0x02]).unwrap();
    let downlink = Downlink { port: 10, data };
    let radio = MockRadio::new().with_downlink(downlink.clone());
    let mut uplink = uplink(MockSensor::steady(1000), radio, MockStore::new());

    let report = uplink.run_cycle(WakeCause::Timer);
    assert_eq!(report.downlink, Some(downlink));
}

#[test]
fn store_write_failure_does_not_stop_the_cycle() {
    let mut store = MockStore::new();
    store.fail_writes = true;
    let mut uplink = uplink(MockSensor::steady(1000), MockRadio::new(), store);
    let report = uplink.run_cycle(WakeCause::Timer);

    assert_eq!(report.outcome, CycleOutcome::Sent);
    assert_eq!(report.record.boot_count, 1);
    assert!(uplink.devices().store.writes.is_empty());
}

#[test]
fn unreadable_key_does_not_reset_the_boot_count() {
    let store = MockStore::new()
        .with(keys::BOOT_COUNT, 41)
        .with(keys::LAST_RANGE, 1020)
        .with_failing_read(keys::LAST_RANGE);
    let mut uplink = uplink(MockSensor::steady(1000), MockRadio::new(), store);
    let report = uplink.run_cycle(WakeCause::Timer);

    assert_eq!(report.outcome, CycleOutcome::Sent);
    let devices = uplink.devices();
    assert_eq!(devices.store.value(keys::BOOT_COUNT), Some(42));
    assert_eq!(devices.store.value(keys::LAST_BOOT_COUNT), Some(42));
    assert_eq!(devices.radio.sent[0].0[5..], [0, 42]);
}

#[test]
fn unreadable_boot_count_is_never_overwritten() {
    let store = sent_at_boot_5(41).with_failing_read(keys::BOOT_COUNT);
    let mut uplink = uplink(MockSensor::steady(1100), MockRadio::new(), store);
    let report = uplink.run_cycle(WakeCause::Timer);

    assert_eq!(report.outcome, CycleOutcome::Sent);
    let devices = uplink.devices();
    assert_eq!(devices.store.value(keys::BOOT_COUNT), Some(41));
    assert_eq!(devices.store.value(keys::LAST_BOOT_COUNT), Some(5));
    assert_eq!(devices.store.value(keys::LAST_RANGE), Some(1100));
    assert!(devices.store.writes.iter().all(|(key, _)| key != keys::BOOT_COUNT
        && key != keys::LAST_BOOT_COUNT));
}

// ============================================================================
// Display
// ============================================================================

#[test]
fn button_wake_shows_progress() {
    let mut uplink = uplink(MockSensor::steady(1000), MockRadio::new(), MockStore::new())
        .with_display(MockDisplay::new());
    let report = uplink.run_cycle(WakeCause::External);

    assert_eq!(report.outcome, CycleOutcome::Sent);
    let display = uplink.display();
    assert!(display.initialized);
    assert!(display.enabled);
    assert_eq!(display.info_count, 1);
    assert_eq!(display.last_range, Some(Some(1000)));
    assert_eq!(display.subtexts, vec!["joining...", "sending...", "send ok"]);
    assert_eq!(count_delays(&uplink.devices().delay, 3000), 2);
}

#[test]
fn button_wake_without_panel_fails_before_sensor() {
    let display = MockDisplay {
        missing: true,
        ..Default::default()
    };
    let mut uplink = uplink(MockSensor::steady(1000), MockRadio::new(), MockStore::new())
        .with_display(display);
    let report = uplink.run_cycle(WakeCause::PowerOn);

    assert_eq!(report.outcome, CycleOutcome::Failed(CycleFailure::DisplayUnavailable));
    assert_eq!(uplink.devices().sensor.inits, 0);
    assert_eq!(uplink.devices().store.value(keys::BOOT_COUNT), Some(1));
    // Boot (2) then display missing (7).
    assert_eq!(uplink.devices().indicator.pulses(), 9);
}

#[test]
fn timer_wake_leaves_display_dark() {
    let mut uplink = uplink(MockSensor::steady(1000), MockRadio::new(), MockStore::new())
        .with_display(MockDisplay::new());
    let report = uplink.run_cycle(WakeCause::Timer);

    assert_eq!(report.outcome, CycleOutcome::Sent);
    assert!(!uplink.display().initialized);
    assert!(uplink.display().subtexts.is_empty());
    assert_eq!(uplink.display().last_range, None);
}

#[test]
fn no_data_screen_is_short() {
    let mut uplink = uplink(MockSensor::with_readings(&[]), MockRadio::new(), MockStore::new())
        .with_display(MockDisplay::new());
    let report = uplink.run_cycle(WakeCause::External);

    assert_eq!(report.outcome, CycleOutcome::Failed(CycleFailure::NoReading));
    assert_eq!(uplink.display().last_range, Some(None));
    // Info screen only; the no-data screen holds briefly.
    assert_eq!(count_delays(&uplink.devices().delay, 3000), 1);
    assert_eq!(count_delays(&uplink.devices().delay, 500), 5);
}

#[test]
fn skipped_cycle_says_no_change() {
    let mut uplink = uplink(MockSensor::steady(1000), MockRadio::new(), sent_at_boot_5(10))
        .with_display(MockDisplay::new());
    uplink.run_cycle(WakeCause::External);
    assert_eq!(uplink.display().subtexts, vec!["no change"]);
}

#[test]
fn join_failure_is_shown() {
    let radio = MockRadio::new().with_join_failures(u32::MAX);
    let mut uplink =
        uplink(MockSensor::steady(1000), radio, MockStore::new()).with_display(MockDisplay::new());
    uplink.run_cycle(WakeCause::External);
    assert_eq!(uplink.display().subtexts, vec!["joining...", "join fail"]);
}

// ============================================================================
// Sleep
// ============================================================================

#[test]
fn sleep_powers_down_and_arms_wake_sources() {
    let mut uplink = uplink(MockSensor::steady(1000), MockRadio::new(), MockStore::new())
        .with_display(MockDisplay::new());
    uplink.run_cycle(WakeCause::External);

    let mut power = MockPower::default();
    uplink.sleep(&mut power).unwrap();

    assert_eq!(
        power.sleeps,
        vec![WakeSources::timer(86_400_000).with_pin(21, WakeLevel::AnyLow)]
    );
    let devices = uplink.devices();
    assert!(!devices.sensor.enabled);
    assert_eq!(devices.sensor.disables, 1);
    assert_eq!(devices.radio.sleeps, 1);
    assert_eq!(devices.store.commits, 1);
    assert!(!uplink.display().enabled);
}

#[test]
fn sleep_without_wake_pin_is_timer_only() {
    let config = UplinkConfig::default().with_wake_pin(None).with_sleep_ms(60_000);
    let mut uplink = DepthUplinkController::new(
        devices(MockSensor::steady(1000), MockRadio::new(), MockStore::new()),
        JoinCredentials::default(),
        config,
    );
    uplink.run_cycle(WakeCause::Timer);

    let mut power = MockPower::default();
    uplink.sleep(&mut power).unwrap();
    assert_eq!(power.sleeps, vec![WakeSources::timer(60_000)]);
}

#[test]
fn sleep_failure_is_returned() {
    let mut uplink = uplink(MockSensor::steady(1000), MockRadio::new(), MockStore::new());
    uplink.run_cycle(WakeCause::Timer);

    let mut power = MockPower {
        fail: true,
        ..Default::default()
    };
    assert!(uplink.sleep(&mut power).is_err());
    // Everything else was still powered down and flushed.
    assert_eq!(uplink.devices().store.commits, 1);
    assert_eq!(uplink.devices().radio.sleeps, 1);
}

// ============================================================================
// Ordering
// ============================================================================

type Events = Rc<RefCell<Vec<String>>>;

struct LoggingStore {
    inner: MockStore,
    events: Events,
}

impl NonVolatileStore for LoggingStore {
    type Error = ();

    fn get_u32(&mut self, key: &str, default: u32) -> Result<u32, ()> {
        self.inner.get_u32(key, default)
    }

    fn put_u32(&mut self, key: &str, value: u32) -> Result<(), ()> {
        self.events.borrow_mut().push(format!("put {}={}", key, value));
        self.inner.put_u32(key, value)
    }

    fn commit(&mut self) -> Result<(), ()> {
        self.events.borrow_mut().push("commit".into());
        self.inner.commit()
    }
}

struct LoggingSensor {
    present: bool,
    events: Events,
}

impl DistanceSensor for LoggingSensor {
    fn init(&mut self) -> bool {
        self.events.borrow_mut().push("sensor init".into());
        self.present
    }

    fn read(&mut self) -> u16 {
        self.events.borrow_mut().push("sensor read".into());
        1000
    }

    fn disable(&mut self) {
        self.events.borrow_mut().push("sensor off".into());
    }
}

fn logging_uplink(
    present: bool,
) -> (
    DepthUplinkController<LoggingSensor, MockRadio, LoggingStore, MockAdc, MockIndicator, MockDelay>,
    Events,
) {
    let events = Events::default();
    let sensor = LoggingSensor {
        present,
        events: events.clone(),
    };
    let store = LoggingStore {
        inner: MockStore::new(),
        events: events.clone(),
    };
    let uplink = DepthUplinkController::new(
        devices(sensor, MockRadio::new(), store),
        JoinCredentials::default(),
        UplinkConfig::default(),
    );
    (uplink, events)
}

#[test]
fn boot_count_is_persisted_before_the_sensor_is_touched() {
    let (mut uplink, events) = logging_uplink(false);
    uplink.run_cycle(WakeCause::Timer);
    assert_eq!(*events.borrow(), vec!["put bootcount=1", "sensor init"]);
}

#[test]
fn baseline_written_after_send_and_committed_at_sleep() {
    let (mut uplink, events) = logging_uplink(true);
    uplink.run_cycle(WakeCause::Timer);
    uplink.sleep(&mut MockPower::default()).unwrap();
    assert_eq!(
        *events.borrow(),
        vec![
            "put bootcount=1",
            "sensor init",
            "sensor read",
            "put lastrange=1000",
            "put lastvoltage=3700",
            "put lastbootcount=1",
            "sensor off",
            "commit",
        ]
    );
}

// ============================================================================
// End to end over the AT modem
// ============================================================================

fn scripted_modem() -> AtModem<MockAtTransport> {
    let mut transport = MockAtTransport::new();
    transport.reply("+MODE: LWOTAA");
    transport.reply("+ID: DevEui, 00:04:A3:0B:00:1C:05:30");
    transport.reply("+ID: AppEui, 00:00:00:00:00:00:00:01");
    transport.reply("+KEY: APPKEY 11111111111111111111111111111111");
    transport.reply("+DR: EU868");
    transport.reply("+JOIN: Start\r\n+JOIN: NORMAL\r\n+JOIN: Network joined\r\n+JOIN: Done");
    transport.reply("+PORT: 2");
    transport.reply(
        "+MSGHEX: Start\r\n+MSGHEX: PORT: 1; RX: \"0A0B\"\r\n\
         +MSGHEX: RXWIN1, RSSI -45, SNR 9.0\r\n+MSGHEX: Done",
    );
    transport.reply("+LOWPOWER: SLEEP");
    AtModem::new(transport, "EU868")
}

#[test]
fn full_cycle_over_at_modem() {
    let credentials = JoinCredentials {
        dev_eui: 0x0004_A30B_001C_0530,
        join_eui: 1,
        app_key: [0x11; 16],
        nwk_key: [0x11; 16],
    };
    let mut uplink = DepthUplinkController::new(
        devices(MockSensor::steady(1000), scripted_modem(), MockStore::new()),
        credentials,
        UplinkConfig::default(),
    );

    let report = uplink.run_cycle(WakeCause::Timer);
    assert_eq!(report.outcome, CycleOutcome::Sent);
    let downlink = report.downlink.unwrap();
    assert_eq!(downlink.port, 1);
    assert_eq!(downlink.data.as_slice(), &[0x0A, 0x0B]);

    uplink.sleep(&mut MockPower::default()).unwrap();
    let written = &uplink.devices().radio.transport().written;
    assert_eq!(
        written,
        &vec![
            "AT+MODE=LWOTAA",
            "AT+ID=DevEui,\"0004A30B001C0530\"",
            "AT+ID=AppEui,\"0000000000000001\"",
            "AT+KEY=APPKEY,\"11111111111111111111111111111111\"",
            "AT+DR=EU868",
            "AT+JOIN",
            "AT+PORT=2",
            "AT+MSGHEX=\"0303E80E740001\"",
            "AT+LOWPOWER",
        ]
    );
}
