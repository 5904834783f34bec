//! WiFi station for the train board's control surface.
//!
//! # Example
//!
//! ```ignore
//! use rs_conductor::hal::esp32::Esp32Wifi;
//! use rs_conductor::config::WifiConfig;
//!
//! let config = WifiConfig::default()
//!     .with_ssid("Layout")
//!     .with_password("secret123");
//!
//! let wifi = Esp32Wifi::new(modem, sysloop, Some(nvs), &config)?;
//! log::info!("control surface at http://{:?}/", wifi.ip_addr());
//! ```

use std::net::Ipv4Addr;

use esp_idf_hal::modem::Modem;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

use crate::config::WifiConfig;

/// Connected station-mode WiFi.
///
/// The connection is made during construction and kept for the lifetime
/// of the value.
pub struct Esp32Wifi<'a> {
    wifi: BlockingWifi<EspWifi<'a>>,
}

impl<'a> Esp32Wifi<'a> {
    /// Start the driver, join the configured network and wait for DHCP.
    ///
    /// # Errors
    ///
    /// Returns an error if the driver cannot start, the access point refuses
    /// the connection or no address is assigned.
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: Option<EspDefaultNvsPartition>,
        config: &WifiConfig,
    ) -> anyhow::Result<Self> {
        let esp_wifi = EspWifi::new(modem, sysloop.clone(), nvs)?;
        let mut wifi = BlockingWifi::wrap(esp_wifi, sysloop)?;

        let mut ssid: heapless::String<32> = heapless::String::new();
        let _ = ssid.push_str(config.ssid.as_str());
        let mut password: heapless::String<64> = heapless::String::new();
        let _ = password.push_str(config.password.as_str());

        let auth_method = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };

        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid,
            password,
            auth_method,
            ..Default::default()
        }))?;

        log::info!("wifi: starting");
        wifi.start()?;

        log::info!("wifi: connecting to '{}'", config.ssid);
        wifi.connect()?;

        log::info!("wifi: waiting for DHCP");
        wifi.wait_netif_up()?;

        let this = Self { wifi };
        if let Some(ip) = this.ip_addr() {
            log::info!("wifi: connected, ip {}", ip);
        }
        Ok(this)
    }

    /// Current station address, if connected.
    pub fn ip_addr(&self) -> Option<Ipv4Addr> {
        self.wifi
            .wifi()
            .sta_netif()
            .get_ip_info()
            .ok()
            .map(|info| info.ip)
    }

    /// Returns true while associated with the access point.
    pub fn is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }
}
