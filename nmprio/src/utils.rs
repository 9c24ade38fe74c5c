//! Utility helpers shared by the D-Bus adapter modules.

use log::warn;
use zbus::Connection;
use zvariant::OwnedObjectPath;

use crate::Result;
use crate::constants::device_type;
use crate::models::DirectoryError;
use crate::proxies::{NMDeviceProxy, NMProxy, NMWirelessProxy};

/// Returns the paths and wireless proxies of every Wi-Fi device.
///
/// Failing to reach NetworkManager at all is reported as
/// `DirectoryUnavailable`; a device whose type cannot be read is skipped.
pub(crate) async fn wireless_devices(
    conn: &Connection,
) -> Result<Vec<(OwnedObjectPath, NMWirelessProxy<'_>)>> {
    let nm = NMProxy::new(conn)
        .await
        .map_err(DirectoryError::DirectoryUnavailable)?;
    let devices = nm
        .get_devices()
        .await
        .map_err(DirectoryError::DirectoryUnavailable)?;

    let mut wireless = Vec::new();
    for dp in devices {
        let dev = NMDeviceProxy::builder(conn)
            .path(dp.clone())?
            .build()
            .await?;

        match dev.device_type().await {
            Ok(device_type::WIFI) => {}
            Ok(_) => continue,
            Err(e) => {
                warn!("Skipping device {}: cannot read type: {e}", dp.as_str());
                continue;
            }
        }

        let wifi = NMWirelessProxy::builder(conn)
            .path(dp.clone())?
            .build()
            .await?;
        wireless.push((dp, wifi));
    }

    Ok(wireless)
}

/// Macro to convert Result to Option with error logging.
/// Usage: `try_log!(result, "context message")`
#[macro_export]
macro_rules! try_log {
    ($result:expr, $context:expr) => {
        match $result {
            Ok(value) => value,
            Err(e) => {
                log::warn!("{}: {:?}", $context, e);
                return None;
            }
        }
    };
}
