//! Wi-Fi scan triggering and enumeration of visible access points.

use log::{debug, warn};
use std::collections::HashMap;
use tokio::process::Command;
use zbus::Connection;

use crate::Result;
use crate::constants::scan_command;
use crate::models::{AccessPointObservation, DirectoryError};
use crate::proxies::NMAccessPointProxy;
use crate::utils::wireless_devices;

/// How a fresh scan is requested.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScanTrigger {
    /// Run an external command; only its exit status is inspected.
    Command(Vec<String>),
    /// Call `RequestScan` on every wireless device over D-Bus.
    Dbus,
}

impl Default for ScanTrigger {
    fn default() -> Self {
        Self::Command(scan_command::DEFAULT.iter().map(|s| s.to_string()).collect())
    }
}

impl ScanTrigger {
    /// Builds a trigger from a command line; an empty one selects D-Bus.
    pub fn from_command(argv: Vec<String>) -> Self {
        if argv.is_empty() {
            Self::Dbus
        } else {
            Self::Command(argv)
        }
    }
}

/// Runs the external scan command; only its exit status is inspected.
///
/// The result is informational: a scan may already be in flight, in which
/// case the request is refused and the caller carries on with whatever is
/// already visible.
pub(crate) async fn run_scan_command(argv: &[String]) -> Result<()> {
    let Some((program, args)) = argv.split_first() else {
        return Err(DirectoryError::ScanRequest("empty scan command".into()));
    };

    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| DirectoryError::ScanRequest(format!("cannot run {program}: {e}")))?;

    if output.status.success() {
        debug!("Scan command '{}' succeeded", argv.join(" "));
        Ok(())
    } else {
        Err(DirectoryError::ScanRequest(format!(
            "{program} exited with {}: {}",
            output.status,
            String::from_utf8_lossy(&output.stderr).trim()
        )))
    }
}

/// Calls `RequestScan` on every wireless device.
pub(crate) async fn request_scan_dbus(conn: &Connection) -> Result<()> {
    let mut failures = Vec::new();

    for (path, wifi) in wireless_devices(conn).await? {
        match wifi.request_scan(HashMap::new()).await {
            Ok(()) => debug!("Scan requested on {}", path.as_str()),
            Err(e) => failures.push(format!("{}: {e}", path.as_str())),
        }
    }

    if failures.is_empty() {
        Ok(())
    } else {
        Err(DirectoryError::ScanRequest(failures.join("; ")))
    }
}

/// Lists every access point visible on every wireless device.
///
/// Entries are not deduplicated: an SSID served by several access points,
/// or seen from several devices, appears once per access point. SSIDs are
/// kept as raw bytes and hidden networks appear with an empty SSID. Access
/// points whose properties cannot be read are skipped.
pub(crate) async fn scan_visible(conn: &Connection) -> Result<Vec<AccessPointObservation>> {
    let mut observations = Vec::new();

    for (path, wifi) in wireless_devices(conn).await? {
        let access_points = match wifi.get_all_access_points().await {
            Ok(aps) => aps,
            Err(e) => {
                warn!("Cannot list access points of {}: {e}", path.as_str());
                continue;
            }
        };

        for ap_path in access_points {
            let ap = NMAccessPointProxy::builder(conn)
                .path(ap_path.clone())?
                .build()
                .await?;

            let read = async {
                let ssid = ap.ssid().await?;
                let frequency = ap.frequency().await?;
                let strength = ap.strength().await?;
                Ok::<_, zbus::Error>((ssid, frequency, strength))
            };

            match read.await {
                Ok((ssid, frequency, strength)) => {
                    observations.push(AccessPointObservation::new(ssid, frequency, strength))
                }
                Err(e) => debug!("Skipping access point {}: {e}", ap_path.as_str()),
            }
        }
    }

    Ok(observations)
}
