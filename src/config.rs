//! Shared configuration for the train conductor and the depth uplink.
//!
//! Uses `heapless::String` for `no_std` compatibility while remaining
//! ergonomic to use on desktop with `std`.
//!
//! # Example
//!
//! ```rust
//! use rs_conductor::config::{Config, UplinkConfig, WebConfig};
//!
//! // Use defaults
//! let config = Config::default();
//! assert_eq!(config.uplink.range_significant_delta, 50);
//!
//! // Or customize
//! let config = Config::default()
//!     .with_uplink(UplinkConfig::default().with_sleep_ms(60 * 60 * 1000))
//!     .with_web(WebConfig::default().with_port(8080));
//! ```

use core::fmt;

use heapless::String as HString;

use crate::battery::BatteryConfig;
use crate::retry::RetryPolicy;
use crate::traits::{JoinCredentials, WakeLevel, WakeSources};
use crate::train::MagnetBand;

/// Maximum length for short config strings (SSIDs, names, region codes)
pub const MAX_SHORT_STRING: usize = 64;

/// Type alias for short config strings
pub type ShortString = HString<MAX_SHORT_STRING>;

/// Create a ShortString from a &str, truncating if too long
pub fn short_string(s: &str) -> ShortString {
    let mut hs = ShortString::new();
    let take = s.len().min(MAX_SHORT_STRING);
    // Find valid UTF-8 boundary
    let valid_end = s
        .char_indices()
        .take_while(|(i, c)| i + c.len_utf8() <= take)
        .last()
        .map(|(i, c)| i + c.len_utf8())
        .unwrap_or(0);
    let _ = hs.push_str(&s[..valid_end]);
    hs
}

// ============================================================================
// Hex credential parsing
// ============================================================================

/// Credential string could not be parsed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigError {
    /// Wrong number of hex digits.
    Length {
        /// Digits required.
        expected: usize,
        /// Digits found.
        actual: usize,
    },
    /// Non-hex character.
    InvalidDigit(char),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Length { expected, actual } => {
                write!(f, "expected {} hex digits, got {}", expected, actual)
            }
            ConfigError::InvalidDigit(c) => write!(f, "invalid hex digit {:?}", c),
        }
    }
}

fn hex_digits(s: &str) -> impl Iterator<Item = char> + '_ {
    s.chars().filter(|c| !matches!(c, ':' | '-' | ' ' | ','))
}

fn strip_hex_prefix(s: &str) -> &str {
    let s = s.trim();
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

/// Parse a 64-bit EUI such as `"70B3D57ED0000000"` or `"70:B3:D5:7E:D0:00:00:00"`.
pub fn parse_eui(s: &str) -> Result<u64, ConfigError> {
    let mut bytes = [0u8; 8];
    parse_hex_into(strip_hex_prefix(s), &mut bytes)?;
    Ok(u64::from_be_bytes(bytes))
}

/// Parse a 128-bit key written as 32 hex digits.
pub fn parse_key(s: &str) -> Result<[u8; 16], ConfigError> {
    let mut bytes = [0u8; 16];
    parse_hex_into(strip_hex_prefix(s), &mut bytes)?;
    Ok(bytes)
}

fn parse_hex_into(s: &str, out: &mut [u8]) -> Result<(), ConfigError> {
    let expected = out.len() * 2;
    let actual = hex_digits(s).count();
    if actual != expected {
        return Err(ConfigError::Length { expected, actual });
    }
    for (i, c) in hex_digits(s).enumerate() {
        let nibble = c.to_digit(16).ok_or(ConfigError::InvalidDigit(c))? as u8;
        out[i / 2] = (out[i / 2] << 4) | nibble;
    }
    Ok(())
}

// ============================================================================
// Main Config
// ============================================================================

/// Complete application configuration
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// WiFi connection configuration
    pub wifi: WifiConfig,
    /// Control surface web server configuration
    pub web: WebConfig,
    /// Train conductor configuration
    pub train: TrainConfig,
    /// Depth uplink cycle configuration
    pub uplink: UplinkConfig,
    /// LoRaWAN radio configuration
    pub radio: RadioConfig,
    /// Device identification
    pub device: DeviceConfig,
}

impl Config {
    /// Set WiFi configuration
    pub fn with_wifi(mut self, wifi: WifiConfig) -> Self {
        self.wifi = wifi;
        self
    }

    /// Set web configuration
    pub fn with_web(mut self, web: WebConfig) -> Self {
        self.web = web;
        self
    }

    /// Set train configuration
    pub fn with_train(mut self, train: TrainConfig) -> Self {
        self.train = train;
        self
    }

    /// Set uplink configuration
    pub fn with_uplink(mut self, uplink: UplinkConfig) -> Self {
        self.uplink = uplink;
        self
    }

    /// Set radio configuration
    pub fn with_radio(mut self, radio: RadioConfig) -> Self {
        self.radio = radio;
        self
    }

    /// Set device configuration
    pub fn with_device(mut self, device: DeviceConfig) -> Self {
        self.device = device;
        self
    }
}

// ============================================================================
// Train Config
// ============================================================================

/// Train conductor timing, thresholds and power levels
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TrainConfig {
    /// Control loop period in milliseconds
    pub tick_ms: u32,
    /// Consecutive agreeing samples needed to accept a magnet reading
    pub sensor_reps: u8,
    /// Delay between debounce samples in milliseconds
    pub sample_delay_ms: u32,
    /// Idle band of the hall sensor
    pub magnet: MagnetBand,
    /// Time in Starting before magnets are watched again
    pub start_grace_ms: u64,
    /// Time in Braking before a still-sensed magnet means Stopped
    pub brake_settle_ms: u64,
    /// Time allowed in BackingUp before giving up
    pub backup_timeout_ms: u64,
    /// Motor power when setting off
    pub full_power: i16,
    /// Motor power while backing up (negative = reverse)
    pub backup_power: i16,
    /// Light power at start-up
    pub default_lights: i16,
    /// Error indicator half period in milliseconds
    pub error_blink_ms: u64,
    /// Power change per control surface step
    pub control_step: i16,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            tick_ms: 10,
            sensor_reps: 4,
            sample_delay_ms: 5,
            magnet: MagnetBand::default(),
            start_grace_ms: 500,
            brake_settle_ms: 500,
            backup_timeout_ms: 3000,
            full_power: 255,
            backup_power: -128,
            default_lights: 25,
            error_blink_ms: 300,
            control_step: 40,
        }
    }
}

impl TrainConfig {
    /// Set the hall sensor idle band
    pub fn with_magnet_band(mut self, center: u16, tolerance: u16) -> Self {
        self.magnet = MagnetBand { center, tolerance };
        self
    }

    /// Set the debounce repetitions
    pub fn with_sensor_reps(mut self, reps: u8) -> Self {
        self.sensor_reps = reps.max(1);
        self
    }

    /// Set the backup timeout
    pub fn with_backup_timeout_ms(mut self, ms: u64) -> Self {
        self.backup_timeout_ms = ms;
        self
    }

    /// Set the forward and backup motor power
    pub fn with_power(mut self, full: i16, backup: i16) -> Self {
        self.full_power = crate::traits::clamp_power(full as i32);
        self.backup_power = crate::traits::clamp_power(backup as i32);
        self
    }

    /// Set the start-up light power
    pub fn with_default_lights(mut self, power: i16) -> Self {
        self.default_lights = crate::traits::clamp_power(power as i32);
        self
    }

    /// Set the control surface step
    pub fn with_control_step(mut self, step: i16) -> Self {
        self.control_step = step;
        self
    }
}

// ============================================================================
// Uplink Config
// ============================================================================

/// Depth uplink cycle configuration
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UplinkConfig {
    /// Range change (mm) worth reporting
    pub range_significant_delta: u16,
    /// Battery change (mV) worth reporting
    pub voltage_significant_delta: u16,
    /// Wake cycles after which a report is sent regardless
    pub max_cycles_between_sends: u32,
    /// Distance read retries
    pub read_retry: RetryPolicy,
    /// Network join retries
    pub join_retry: RetryPolicy,
    /// Uplink send retries
    pub send_retry: RetryPolicy,
    /// Battery measurement settings
    pub battery: BatteryConfig,
    /// Uplink payload version
    pub payload_version: u8,
    /// Application port for uplinks
    pub uplink_port: u8,
    /// Deep sleep duration in milliseconds
    pub sleep_ms: u64,
    /// RTC GPIO of the wake button
    pub wake_pin: Option<i32>,
    /// How long status screens stay up before moving on
    pub display_hold_ms: u32,
}

impl Default for UplinkConfig {
    fn default() -> Self {
        Self {
            range_significant_delta: 50,
            voltage_significant_delta: 100,
            max_cycles_between_sends: 30,
            read_retry: RetryPolicy::new(5, 500),
            join_retry: RetryPolicy::new(3, 15_000),
            send_retry: RetryPolicy::new(3, 5_000),
            battery: BatteryConfig::default(),
            payload_version: crate::payload::CURRENT_VERSION,
            uplink_port: 2,
            sleep_ms: 24 * 60 * 60 * 1000,
            wake_pin: Some(21),
            display_hold_ms: 3000,
        }
    }
}

impl UplinkConfig {
    /// Set the change thresholds
    pub fn with_thresholds(mut self, range_mm: u16, voltage_mv: u16, cycles: u32) -> Self {
        self.range_significant_delta = range_mm;
        self.voltage_significant_delta = voltage_mv;
        self.max_cycles_between_sends = cycles;
        self
    }

    /// Set the read retry policy
    pub fn with_read_retry(mut self, policy: RetryPolicy) -> Self {
        self.read_retry = policy;
        self
    }

    /// Set the join retry policy
    pub fn with_join_retry(mut self, policy: RetryPolicy) -> Self {
        self.join_retry = policy;
        self
    }

    /// Set the send retry policy
    pub fn with_send_retry(mut self, policy: RetryPolicy) -> Self {
        self.send_retry = policy;
        self
    }

    /// Set the payload version
    pub fn with_payload_version(mut self, version: u8) -> Self {
        self.payload_version = version;
        self
    }

    /// Set the deep sleep duration
    pub fn with_sleep_ms(mut self, ms: u64) -> Self {
        self.sleep_ms = ms;
        self
    }

    /// Set or clear the wake button pin
    pub fn with_wake_pin(mut self, pin: Option<i32>) -> Self {
        self.wake_pin = pin;
        self
    }

    /// Set the status screen hold time
    pub fn with_display_hold_ms(mut self, ms: u32) -> Self {
        self.display_hold_ms = ms;
        self
    }

    /// Wake sources armed before deep sleep (button is active low)
    pub fn wake_sources(&self) -> WakeSources {
        let wake = WakeSources::timer(self.sleep_ms);
        match self.wake_pin {
            Some(pin) => wake.with_pin(pin, WakeLevel::AnyLow),
            None => wake,
        }
    }
}

// ============================================================================
// Radio Config
// ============================================================================

/// LoRaWAN radio configuration
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RadioConfig {
    /// OTAA credentials
    pub credentials: JoinCredentials,
    /// Regional band plan, e.g. `EU868`, `US915`
    pub region: ShortString,
}

impl RadioConfig {
    /// Set credentials from hex strings (DevEUI, JoinEUI, AppKey)
    pub fn with_hex_credentials(
        mut self,
        dev_eui: &str,
        join_eui: &str,
        app_key: &str,
    ) -> Result<Self, ConfigError> {
        let app_key = parse_key(app_key)?;
        self.credentials = JoinCredentials {
            dev_eui: parse_eui(dev_eui)?,
            join_eui: parse_eui(join_eui)?,
            app_key,
            nwk_key: app_key,
        };
        Ok(self)
    }

    /// Set the region
    pub fn with_region(mut self, region: &str) -> Self {
        self.region = short_string(region);
        self
    }

    /// Check if a DevEUI has been configured
    pub fn is_configured(&self) -> bool {
        self.credentials.dev_eui != 0
    }
}

// ============================================================================
// WiFi Config
// ============================================================================

/// WiFi connection configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WifiConfig {
    /// WiFi network SSID
    pub ssid: ShortString,
    /// WiFi password
    pub password: ShortString,
    /// Whether WiFi is enabled
    pub enabled: bool,
}

impl Default for WifiConfig {
    fn default() -> Self {
        Self {
            ssid: ShortString::new(),
            password: ShortString::new(),
            enabled: true,
        }
    }
}

impl WifiConfig {
    /// Set the SSID
    pub fn with_ssid(mut self, ssid: &str) -> Self {
        self.ssid = short_string(ssid);
        self
    }

    /// Set the password
    pub fn with_password(mut self, password: &str) -> Self {
        self.password = short_string(password);
        self
    }

    /// Enable or disable WiFi
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Check if WiFi credentials are configured
    pub fn is_configured(&self) -> bool {
        self.enabled && !self.ssid.is_empty()
    }
}

// ============================================================================
// Web Config
// ============================================================================

/// Control surface web server configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct WebConfig {
    /// Port to listen on
    pub port: u16,
    /// Whether web server is enabled
    pub enabled: bool,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            port: 80,
            enabled: true,
        }
    }
}

impl WebConfig {
    /// Set the port
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Enable or disable web server
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

// ============================================================================
// Device Config
// ============================================================================

/// Device identification configuration
#[derive(Clone, Debug)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeviceConfig {
    /// Human-readable firmware name shown on the display
    pub name: ShortString,
    /// NVS namespace for persisted counters
    pub nvs_namespace: ShortString,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: short_string("Depth Sensor v0.5"),
            nvs_namespace: short_string("depthsensor"),
        }
    }
}

impl DeviceConfig {
    /// Set the device name
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = short_string(name);
        self
    }

    /// Set the NVS namespace
    pub fn with_nvs_namespace(mut self, namespace: &str) -> Self {
        self.nvs_namespace = short_string(namespace);
        self
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config() {
        let config = Config::default();
        assert_eq!(config.train.sensor_reps, 4);
        assert_eq!(config.train.backup_timeout_ms, 3000);
        assert_eq!(config.uplink.max_cycles_between_sends, 30);
        assert_eq!(config.uplink.join_retry, RetryPolicy::new(3, 15_000));
        assert_eq!(config.uplink.send_retry, RetryPolicy::new(3, 5_000));
        assert_eq!(config.uplink.read_retry, RetryPolicy::new(5, 500));
        assert_eq!(config.web.port, 80);
    }

    #[test]
    fn wake_sources_follow_pin() {
        let uplink = UplinkConfig::default();
        let wake = uplink.wake_sources();
        assert_eq!(wake.timer_ms, 86_400_000);
        assert_eq!(wake.wake_pin, Some(21));

        let wake = uplink.with_wake_pin(None).wake_sources();
        assert_eq!(wake.wake_pin, None);
    }

    #[test]
    fn parse_eui_formats() {
        assert_eq!(parse_eui("70B3D57ED0000001"), Ok(0x70B3_D57E_D000_0001));
        assert_eq!(parse_eui("70:b3:d5:7e:d0:00:00:01"), Ok(0x70B3_D57E_D000_0001));
        assert_eq!(parse_eui("0x0000000000000002"), Ok(2));
    }

    #[test]
    fn parse_eui_errors() {
        assert_eq!(
            parse_eui("1234"),
            Err(ConfigError::Length {
                expected: 16,
                actual: 4
            })
        );
        assert_eq!(
            parse_eui("70B3D57ED000000G"),
            Err(ConfigError::InvalidDigit('G'))
        );
    }

    #[test]
    fn parse_key_bytes() {
        let key = parse_key("000102030405060708090A0B0C0D0E0F").unwrap();
        assert_eq!(key[0], 0x00);
        assert_eq!(key[10], 0x0A);
        assert_eq!(key[15], 0x0F);
    }

    #[test]
    fn radio_hex_credentials() {
        let radio = RadioConfig::default()
            .with_hex_credentials(
                "0004A30B001C0530",
                "0000000000000000",
                "2B7E151628AED2A6ABF7158809CF4F3C",
            )
            .unwrap()
            .with_region("EU868");
        assert!(radio.is_configured());
        assert_eq!(radio.credentials.dev_eui, 0x0004_A30B_001C_0530);
        assert_eq!(radio.credentials.app_key, radio.credentials.nwk_key);
        assert_eq!(radio.region.as_str(), "EU868");
        assert!(!RadioConfig::default().is_configured());
    }

    #[test]
    fn train_builder_clamps_power() {
        let train = TrainConfig::default()
            .with_power(400, -400)
            .with_default_lights(300)
            .with_sensor_reps(0);
        assert_eq!(train.full_power, 255);
        assert_eq!(train.backup_power, -255);
        assert_eq!(train.default_lights, 255);
        assert_eq!(train.sensor_reps, 1);
    }

    #[test]
    fn wifi_config_is_configured() {
        assert!(!WifiConfig::default().is_configured());
        assert!(WifiConfig::default().with_ssid("Layout").is_configured());
        assert!(!WifiConfig::default()
            .with_ssid("Layout")
            .with_enabled(false)
            .is_configured());
    }

    #[test]
    fn short_string_truncation() {
        let long_input = "a".repeat(100);
        let s = short_string(&long_input);
        assert_eq!(s.len(), MAX_SHORT_STRING);
    }

    #[test]
    fn string_helpers_utf8_boundary() {
        let input = "🚂".repeat(20);
        let s = short_string(&input);
        assert!(s.len() <= MAX_SHORT_STRING);
        assert_eq!(s.len() % 4, 0);
    }
}
