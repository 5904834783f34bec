//! XIAO ESP32-S3 depth sensor.
//!
//! Each boot is one wake cycle:
//! - Counts the boot in NVS
//! - Measures the battery and the range to the water surface
//! - Sends a reading over LoRaWAN when it changed enough, or as a heartbeat
//! - Shows progress on the OLED after a button press (if enabled)
//! - Deep-sleeps until the timer or the button
//!
//! # Build
//!
//! ```bash
//! LORAWAN_DEV_EUI=... LORAWAN_JOIN_EUI=... LORAWAN_APP_KEY=... LORAWAN_REGION=EU868 \
//!     cargo build --release --bin depth_main --features depth-board,display
//! ```

use embedded_hal::delay::DelayNs;
use esp_idf_hal::adc::oneshot::AdcDriver;
use esp_idf_hal::delay::{Delay, FreeRtos};
use esp_idf_hal::gpio::OutputPin;
use esp_idf_hal::i2c::{I2cConfig, I2cDriver};
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_hal::prelude::*;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use rs_conductor::hal::esp32::{
    pins, Esp32BatteryAdc, Esp32Led, Esp32Power, Esp32Store, UartTransport,
};
use rs_conductor::hal::Sen0590;
use rs_conductor::traits::{
    BatteryAdc, DistanceSensor, Indicator, NonVolatileStore, PowerManager, RadioLink,
    StatusDisplay, WakeCause,
};
use rs_conductor::{AtModem, Config, DepthUplinkController, RadioConfig, UplinkDevices};

/// Retry period when deep sleep could not be armed.
const SLEEP_FAILED_RETRY_MS: u32 = 60_000;

fn radio_config() -> anyhow::Result<RadioConfig> {
    let radio = RadioConfig::default().with_region(option_env!("LORAWAN_REGION").unwrap_or(""));
    match (
        option_env!("LORAWAN_DEV_EUI"),
        option_env!("LORAWAN_JOIN_EUI"),
        option_env!("LORAWAN_APP_KEY"),
    ) {
        (Some(dev_eui), Some(join_eui), Some(app_key)) => radio
            .with_hex_credentials(dev_eui, join_eui, app_key)
            .map_err(|e| anyhow::anyhow!("bad LoRaWAN credentials: {}", e)),
        _ => {
            log::warn!("radio: credentials not configured (set LORAWAN_DEV_EUI/JOIN_EUI/APP_KEY)");
            Ok(radio)
        }
    }
}

/// Run the cycle, then sleep. Only returns if deep sleep never starts.
fn run_and_sleep<S, R, N, A, I, D, P>(
    mut uplink: DepthUplinkController<S, R, N, A, I, D, P>,
    mut power: Esp32Power,
    wake: WakeCause,
) -> !
where
    S: DistanceSensor,
    R: RadioLink,
    N: NonVolatileStore,
    A: BatteryAdc,
    I: Indicator,
    D: DelayNs,
    P: StatusDisplay,
{
    let report = uplink.run_cycle(wake);
    log::info!(
        "depth: {} (range {:?}, battery {}mV, boot {}, reads {}, joins {}, sends {})",
        report.outcome,
        report.range,
        report.battery_mv,
        report.record.boot_count,
        report.read_attempts,
        report.join_attempts,
        report.send_attempts
    );

    loop {
        if let Err(e) = uplink.sleep(&mut power) {
            log::error!("power: deep sleep failed: {:?}", e);
        }
        FreeRtos::delay_ms(SLEEP_FAILED_RETRY_MS);
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize ESP-IDF
    esp_idf_hal::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    // =========================================================================
    // Configuration
    // =========================================================================
    let config = Config::default().with_radio(radio_config()?);
    log::info!("{}", config.device.name);

    let power = Esp32Power::new();
    let wake = power.wake_cause();
    let peripherals = Peripherals::take()?;

    // =========================================================================
    // NVS counters
    // =========================================================================
    let partition = EspDefaultNvsPartition::take()?;
    let store = Esp32Store::new(partition, &config.device.nvs_namespace)?;

    // =========================================================================
    // SEN0590 range sensor (I2C1 on GPIO2/3)
    // =========================================================================
    let sensor_bus = I2cDriver::new(
        peripherals.i2c1,
        peripherals.pins.gpio2, // SDA
        peripherals.pins.gpio3, // SCL
        &I2cConfig::new().baudrate(100.kHz().into()),
    )?;
    let sensor = Sen0590::new(sensor_bus, Delay::new_default());

    // =========================================================================
    // LoRa-E5 modem (UART1 on GPIO43/44)
    // =========================================================================
    let transport = UartTransport::new(
        peripherals.uart1,
        peripherals.pins.gpio43,
        peripherals.pins.gpio44,
        pins::depth::MODEM_BAUD,
    )?;
    let radio = AtModem::new(transport, &config.radio.region);

    // =========================================================================
    // Battery divider (ADC1, GPIO1) and LED (GPIO21)
    // =========================================================================
    let adc1 = AdcDriver::new(peripherals.adc1)?;
    let adc = Esp32BatteryAdc::new(&adc1, peripherals.pins.gpio1)?;
    let indicator = Esp32Led::new(peripherals.pins.gpio21.downgrade_output())?;

    let devices = UplinkDevices {
        sensor,
        radio,
        store,
        adc,
        indicator,
        delay: Delay::new_default(),
    };
    let uplink = DepthUplinkController::new(
        devices,
        config.radio.credentials.clone(),
        config.uplink.clone(),
    )
    .with_name(&config.device.name);

    // =========================================================================
    // SSD1306 OLED (I2C0 on GPIO5/6) - Optional
    // =========================================================================
    #[cfg(feature = "display")]
    let uplink = {
        use rs_conductor::hal::esp32::Esp32Display;

        let display_bus = I2cDriver::new(
            peripherals.i2c0,
            peripherals.pins.gpio5, // SDA
            peripherals.pins.gpio6, // SCL
            &I2cConfig::new().baudrate(400.kHz().into()),
        )?;
        uplink.with_display(Esp32Display::new(display_bus))
    };

    run_and_sleep(uplink, power, wake)
}
