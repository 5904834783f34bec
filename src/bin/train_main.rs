//! XIAO ESP32-C6 toy train conductor.
//!
//! Runs the conductor state machine at the configured tick:
//! - Samples the hall sensor between the rails
//! - Drives the traction motor on TB6612FNG channel A
//! - Holds the carriage lights on channel B
//! - Serves the HTTP control surface (if enabled)
//!
//! # Build
//!
//! ```bash
//! # Conductor only
//! cargo build --release --bin train_main --features train-board
//!
//! # With WiFi + HTTP control surface
//! WIFI_SSID=Layout WIFI_PASSWORD=secret \
//!     cargo build --release --bin train_main --features train-board,esp32-http
//! ```

use esp_idf_hal::adc::oneshot::AdcDriver;
use esp_idf_hal::delay::{Delay, FreeRtos};
use esp_idf_hal::gpio::OutputPin;
use esp_idf_hal::peripherals::Peripherals;
use rs_conductor::hal::esp32::{shared_standby, Esp32Clock, Esp32Led, Esp32Magnet, Esp32Motor};
use rs_conductor::traits::{blink, Clock, Indicator};
use rs_conductor::{Config, TrainConfig, TrainController};

/// Boot blink half-period in milliseconds.
const BOOT_BLINK_MS: u32 = 300;

fn main() -> anyhow::Result<()> {
    // Initialize ESP-IDF
    esp_idf_hal::sys::link_patches();
    esp_idf_svc::log::EspLogger::initialize_default();

    log::info!("================================");
    log::info!("  rs-conductor train board");
    log::info!("================================");

    // =========================================================================
    // Configuration
    // =========================================================================
    let config = Config::default()
        .with_wifi(
            rs_conductor::WifiConfig::default()
                .with_ssid(option_env!("WIFI_SSID").unwrap_or(""))
                .with_password(option_env!("WIFI_PASSWORD").unwrap_or("")),
        )
        .with_web(rs_conductor::WebConfig::default().with_port(80))
        .with_train(TrainConfig::default());

    let peripherals = Peripherals::take()?;
    let mut delay = Delay::new_default();

    // =========================================================================
    // Status LED (active low, GPIO15)
    // =========================================================================
    let mut led = Esp32Led::new(peripherals.pins.gpio15.downgrade_output())?;
    blink(&mut led, &mut delay, 1, BOOT_BLINK_MS);
    led.set(true)?;

    // =========================================================================
    // TB6612FNG: A = traction (inverted), B = lights, STBY shared
    // =========================================================================
    let timer = Esp32Motor::pwm_timer(peripherals.ledc.timer0)?;
    let standby = shared_standby(peripherals.pins.gpio22.downgrade_output())?;

    let motor = Esp32Motor::new(
        peripherals.ledc.channel0,
        &timer,
        peripherals.pins.gpio1.downgrade_output(),  // PWMA
        peripherals.pins.gpio21.downgrade_output(), // AIN1
        peripherals.pins.gpio17.downgrade_output(), // AIN2
        standby.clone(),
    )?
    .inverted(true);

    let lights = Esp32Motor::new(
        peripherals.ledc.channel1,
        &timer,
        peripherals.pins.gpio2.downgrade_output(),  // PWMB
        peripherals.pins.gpio23.downgrade_output(), // BIN1
        peripherals.pins.gpio16.downgrade_output(), // BIN2
        standby,
    )?;
    log::info!("motor: TB6612FNG ready");

    // =========================================================================
    // Hall sensor (ADC1, GPIO0)
    // =========================================================================
    let adc1 = AdcDriver::new(peripherals.adc1)?;
    let mut magnet = Esp32Magnet::new(&adc1, peripherals.pins.gpio0)?;
    log::info!("magnet: sensor on GPIO0");

    // =========================================================================
    // WiFi (required for HTTP)
    // =========================================================================
    #[cfg(feature = "wifi")]
    let _wifi = {
        use esp_idf_svc::eventloop::EspSystemEventLoop;
        use esp_idf_svc::nvs::EspDefaultNvsPartition;
        use rs_conductor::hal::esp32::Esp32Wifi;

        if config.wifi.is_configured() {
            let sysloop = EspSystemEventLoop::take()?;
            let nvs = EspDefaultNvsPartition::take()?;
            Some(Esp32Wifi::new(peripherals.modem, sysloop, Some(nvs), &config.wifi)?)
        } else {
            log::warn!("wifi: not configured (set WIFI_SSID/WIFI_PASSWORD)");
            None
        }
    };

    // =========================================================================
    // HTTP control surface
    // =========================================================================
    #[cfg(feature = "esp32-http")]
    let (http_state, _server) = {
        use rs_conductor::hal::esp32::{Esp32HttpServer, Esp32SharedState};
        use std::sync::{Arc, Mutex};

        if _wifi.is_some() && config.web.enabled {
            let shared = Arc::new(Mutex::new(Esp32SharedState::default()));
            let server = Esp32HttpServer::new(&config.web, shared.clone())?;
            (Some(shared), Some(server))
        } else {
            (None, None)
        }
    };

    // =========================================================================
    // Conductor
    // =========================================================================
    let clock = Esp32Clock::new();
    let mut train = TrainController::new(motor, lights, led, config.train.clone());
    train.start(clock.now_ms())?;

    loop {
        #[cfg(feature = "esp32-http")]
        if let Some(ref shared) = http_state {
            let pending = match shared.lock() {
                Ok(mut state) => state.take_pending(),
                Err(_) => Default::default(),
            };
            for cmd in pending {
                if let Err(e) = train.apply_control(cmd) {
                    log::error!("control: {:?} failed: {:?}", cmd, e);
                }
            }
        }

        if let Err(e) = train.tick(&mut magnet, &mut delay, clock.now_ms()) {
            log::error!("train: tick failed: {}", e);
        }

        #[cfg(feature = "esp32-http")]
        if let Some(ref shared) = http_state {
            if let Ok(mut state) = shared.lock() {
                state.publish(train.status());
            }
        }

        FreeRtos::delay_ms(train.tick_ms());
    }
}
