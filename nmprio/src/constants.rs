//! Constants for NetworkManager D-Bus interface values and engine tuning.
//!
//! The NetworkManager values correspond to the numeric codes and setting
//! names used by its D-Bus API. The remaining modules hold the defaults of
//! the selection engine.

/// NetworkManager device type constants.
pub mod device_type {
    pub const WIFI: u32 = 2;
}

/// NetworkManager device state constants
pub mod device_state {
    pub const ACTIVATED: u32 = 100;
}

/// Object path NetworkManager uses for "no object".
pub const NO_OBJECT: &str = "/";

/// Values of the `connection.type` setting.
pub mod connection_type {
    pub const WIRELESS: &str = "802-11-wireless";
    pub const ETHERNET: &str = "802-3-ethernet";
}

/// Setting group and key names.
pub mod settings_key {
    pub const CONNECTION: &str = "connection";
    pub const ID: &str = "id";
    pub const TYPE: &str = "type";
    pub const TIMESTAMP: &str = "timestamp";
    pub const AUTOCONNECT_PRIORITY: &str = "autoconnect-priority";

    pub const WIRELESS: &str = "802-11-wireless";
    pub const SSID: &str = "ssid";

    pub const IPV4: &str = "ipv4";
    pub const IPV6: &str = "ipv6";
}

/// Band scores derived from SSID names.
pub mod band_score {
    pub const BAND_6: u8 = 60;
    pub const BAND_5: u8 = 50;
    pub const BAND_2_4: u8 = 24;
    pub const UNKNOWN: u8 = 0;
}

/// Autoconnect priority assignment.
pub mod priority {
    /// Added to `len - index`, so the last ranked entry gets `OFFSET + 1`.
    pub const OFFSET: i32 = 10;
}

/// Timeout and delay constants
pub mod timeouts {
    use std::time::Duration;

    pub const POLL_INTERVAL_SECS: u64 = 30;
    pub const BACKOFF_INITIAL_MS: u64 = 500;
    pub const BACKOFF_MAX_SECS: u64 = 100;
    pub const BACKOFF_FACTOR: f64 = 1.2;

    pub fn poll_interval() -> Duration {
        Duration::from_secs(POLL_INTERVAL_SECS)
    }

    pub fn backoff_initial() -> Duration {
        Duration::from_millis(BACKOFF_INITIAL_MS)
    }

    pub fn backoff_max() -> Duration {
        Duration::from_secs(BACKOFF_MAX_SECS)
    }
}

/// Default external scan trigger.
pub mod scan_command {
    pub const DEFAULT: [&str; 4] = ["nmcli", "device", "wifi", "rescan"];
}

/// IPv6/IPv4 values written by the profile patcher.
pub mod ip_settings {
    pub const METHOD_AUTO: &str = "auto";
    /// `NM_SETTING_IP6_CONFIG_ADDR_GEN_MODE_EUI64`
    pub const ADDR_GEN_MODE_EUI64: i32 = 0;
    /// `NM_SETTING_IP6_CONFIG_PRIVACY_PREFER_TEMP_ADDR`
    pub const IP6_PRIVACY_PREFER_TEMP: i32 = 2;
    pub const IPV6_DNS_PRIORITY: i32 = 1;
    pub const IPV4_DNS_PRIORITY: i32 = 2;
}
