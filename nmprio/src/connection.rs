//! Activation of saved profiles.

use log::debug;
use zbus::Connection;

use crate::Result;
use crate::models::{ActivationTarget, DirectoryError, SavedProfileRef, Ssid};
use crate::proxies::{NMAccessPointProxy, NMProxy};
use crate::utils::wireless_devices;

/// Finds a wireless device that currently sees an access point for `ssid`.
///
/// Devices are searched in NetworkManager's order and the first access
/// point whose SSID bytes match wins. Returns `None` when no device sees it.
pub(crate) async fn find_activation_target(
    conn: &Connection,
    ssid: &Ssid,
) -> Result<Option<ActivationTarget>> {
    for (device, wifi) in wireless_devices(conn).await? {
        let Ok(access_points) = wifi.get_all_access_points().await else {
            continue;
        };

        for ap_path in access_points {
            let ap = NMAccessPointProxy::builder(conn)
                .path(ap_path.clone())?
                .build()
                .await?;

            let Ok(ssid_bytes) = ap.ssid().await else {
                continue;
            };
            if ssid_bytes == ssid.as_bytes() {
                debug!(
                    "Matched '{ssid}' to access point {} on {}",
                    ap_path.as_str(),
                    device.as_str()
                );
                return Ok(Some(ActivationTarget {
                    device,
                    access_point: ap_path,
                }));
            }
        }
    }

    Ok(None)
}

/// Asks NetworkManager to bring `profile` up on the target device and
/// access point.
///
/// Returns once NetworkManager has accepted the request; the activation
/// itself completes asynchronously.
pub(crate) async fn activate(
    conn: &Connection,
    profile: &SavedProfileRef,
    target: &ActivationTarget,
) -> Result<()> {
    let activation_failure = |e: zbus::Error| DirectoryError::Activation {
        profile: profile.to_string(),
        reason: e.to_string(),
    };

    let nm = NMProxy::new(conn).await.map_err(activation_failure)?;
    let active = nm
        .activate_connection(
            profile.path().clone(),
            target.device.clone(),
            target.access_point.clone(),
        )
        .await
        .map_err(activation_failure)?;

    debug!("Active connection created: {}", active.as_str());
    Ok(())
}
