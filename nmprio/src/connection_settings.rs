//! Saved connection profile queries and updates.
//!
//! Provides the read and write paths over NetworkManager's saved profiles:
//! the set of known SSIDs, the profiles matching an SSID, and the
//! read-modify-write of a profile's autoconnect priority.

use log::{debug, warn};
use zbus::Connection;
use zvariant::OwnedObjectPath;

use crate::Result;
use crate::models::{DirectoryError, KnownNetworkSet, SavedProfileRef, Ssid};
use crate::profile_settings::{ProfileSettings, with_autoconnect_priority};
use crate::proxies::{NMSettingsConnectionProxy, NMSettingsProxy, SettingsMap};

/// Lists the paths of all saved profiles.
///
/// Returns `DirectoryUnavailable` if the settings service cannot be reached.
pub(crate) async fn list_profiles(conn: &Connection) -> Result<Vec<OwnedObjectPath>> {
    let settings = NMSettingsProxy::new(conn)
        .await
        .map_err(DirectoryError::DirectoryUnavailable)?;
    settings
        .list_connections()
        .await
        .map_err(DirectoryError::DirectoryUnavailable)
}

/// Reads the raw settings map of a single profile.
pub(crate) async fn read_profile(conn: &Connection, path: &OwnedObjectPath) -> Result<SettingsMap> {
    let read_failure = |e: zbus::Error| DirectoryError::ProfileRead {
        profile: path.as_str().to_string(),
        reason: e.to_string(),
    };

    let proxy = NMSettingsConnectionProxy::builder(conn)
        .path(path.clone())
        .map_err(read_failure)?
        .build()
        .await
        .map_err(read_failure)?;
    proxy.get_settings().await.map_err(read_failure)
}

/// Reads and decodes every saved profile.
///
/// Profiles that cannot be read or decoded are logged and skipped.
pub(crate) async fn decoded_profiles(
    conn: &Connection,
) -> Result<Vec<(OwnedObjectPath, ProfileSettings)>> {
    let mut decoded = Vec::new();

    for path in list_profiles(conn).await? {
        let raw = match read_profile(conn, &path).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Skipping profile: {e}");
                continue;
            }
        };
        match ProfileSettings::decode(&raw) {
            Ok(profile) => decoded.push((path, profile)),
            Err(e) => warn!("Skipping profile {}: {e}", path.as_str()),
        }
    }

    Ok(decoded)
}

/// Returns the SSIDs of wireless profiles that have been connected before.
///
/// SSIDs are kept as raw bytes, so names that are not valid UTF-8 are
/// still known.
pub(crate) async fn known_ssids(conn: &Connection) -> Result<KnownNetworkSet> {
    let known = decoded_profiles(conn)
        .await?
        .into_iter()
        .filter(|(_, profile)| profile.is_known_wireless())
        .filter_map(|(_, profile)| profile.ssid.map(Ssid::new))
        .filter(|ssid| !ssid.is_empty())
        .collect();

    debug!("Known networks: {known:?}");
    Ok(known)
}

/// Returns every wireless profile whose SSID bytes equal `ssid`.
pub(crate) async fn profiles_for_ssid(
    conn: &Connection,
    ssid: &Ssid,
) -> Result<Vec<SavedProfileRef>> {
    Ok(decoded_profiles(conn)
        .await?
        .into_iter()
        .filter(|(_, profile)| profile.is_wireless() && profile.matches_ssid(ssid.as_bytes()))
        .map(|(path, _)| SavedProfileRef::new(path))
        .collect())
}

/// Sets `connection.autoconnect-priority` on a saved profile.
///
/// Reads the full settings, changes that single property and writes the
/// map back, so every other property is preserved.
pub(crate) async fn set_priority(
    conn: &Connection,
    profile: &SavedProfileRef,
    priority: i32,
) -> Result<()> {
    let write_failure = |reason: String| DirectoryError::ProfileWrite {
        profile: profile.to_string(),
        reason,
    };

    let proxy = NMSettingsConnectionProxy::builder(conn)
        .path(profile.path().clone())
        .map_err(|e| write_failure(e.to_string()))?
        .build()
        .await
        .map_err(|e| write_failure(e.to_string()))?;

    let current = proxy
        .get_settings()
        .await
        .map_err(|e| write_failure(format!("cannot read settings: {e}")))?;
    let updated =
        with_autoconnect_priority(current, priority).map_err(|e| write_failure(e.to_string()))?;

    proxy
        .update(updated)
        .await
        .map_err(|e| write_failure(e.to_string()))?;

    debug!("Set autoconnect-priority of {profile} to {priority}");
    Ok(())
}

/// Replaces the settings of a saved profile.
pub(crate) async fn write_profile(
    conn: &Connection,
    path: &OwnedObjectPath,
    settings: SettingsMap,
) -> Result<()> {
    let write_failure = |e: zbus::Error| DirectoryError::ProfileWrite {
        profile: path.as_str().to_string(),
        reason: e.to_string(),
    };

    let proxy = NMSettingsConnectionProxy::builder(conn)
        .path(path.clone())
        .map_err(write_failure)?
        .build()
        .await
        .map_err(write_failure)?;
    proxy.update(settings).await.map_err(write_failure)
}
