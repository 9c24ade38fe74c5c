//! Current connection status.

use zbus::Connection;

use crate::constants::{NO_OBJECT, device_state, device_type};
use crate::models::Ssid;
use crate::proxies::{NMAccessPointProxy, NMDeviceProxy, NMProxy, NMWirelessProxy};
use crate::try_log;

/// Returns the SSID of the currently connected Wi-Fi network.
///
/// Only a wireless device in the *activated* state counts; a device that
/// is still associating is reported as not connected. Returns `None` if no
/// such device exists.
///
/// Uses the `try_log!` macro to gracefully handle errors without
/// propagating them, since the poll loop treats "unknown" as "not connected".
pub(crate) async fn current_ssid(conn: &Connection) -> Option<Ssid> {
    let nm = try_log!(NMProxy::new(conn).await, "Failed to create NM proxy");
    let devices = try_log!(nm.get_devices().await, "Failed to get devices");

    for dp in devices {
        let dev_builder = try_log!(
            NMDeviceProxy::builder(conn).path(dp.clone()),
            "Failed to create device proxy builder"
        );
        let dev = try_log!(dev_builder.build().await, "Failed to build device proxy");

        let dev_type = try_log!(dev.device_type().await, "Failed to get device type");
        if dev_type != device_type::WIFI {
            continue;
        }
        match dev.state().await {
            Ok(device_state::ACTIVATED) => {}
            _ => continue,
        }

        let wifi_builder = try_log!(
            NMWirelessProxy::builder(conn).path(dp.clone()),
            "Failed to create wireless proxy builder"
        );
        let wifi = try_log!(wifi_builder.build().await, "Failed to build wireless proxy");

        if let Ok(active_ap) = wifi.active_access_point().await
            && active_ap.as_str() != NO_OBJECT
        {
            let ap_builder = try_log!(
                NMAccessPointProxy::builder(conn).path(active_ap),
                "Failed to create access point proxy builder"
            );
            let ap = try_log!(
                ap_builder.build().await,
                "Failed to build access point proxy"
            );
            let ssid_bytes = try_log!(ap.ssid().await, "Failed to get SSID bytes");
            if !ssid_bytes.is_empty() {
                return Some(Ssid::new(ssid_bytes));
            }
        }
    }
    None
}
