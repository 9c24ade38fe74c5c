//! Typed view over the settings dictionary of a saved profile.
//!
//! NetworkManager hands settings out as nested string-keyed maps of
//! variants. Only the handful of fields the engine reads or writes are
//! decoded here; everything else is carried through untouched so that a
//! read-modify-write never loses a property.

use std::collections::HashMap;
use zvariant::{OwnedValue, Value};

use crate::Result;
use crate::constants::{connection_type, settings_key};
use crate::models::DirectoryError;
use crate::proxies::SettingsMap;

/// The fields of a saved profile this crate cares about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSettings {
    pub id: String,
    pub kind: String,
    /// Raw SSID bytes; `None` unless the profile is wireless.
    pub ssid: Option<Vec<u8>>,
    /// Last successful activation, seconds since the epoch.
    pub timestamp: Option<u64>,
    pub autoconnect_priority: Option<i32>,
}

impl ProfileSettings {
    /// Decodes and validates the typed view of a settings map.
    pub fn decode(settings: &SettingsMap) -> Result<Self> {
        let connection = settings
            .get(settings_key::CONNECTION)
            .ok_or(DirectoryError::SettingsDecode {
                key: settings_key::CONNECTION,
                expected: "a settings group",
            })?;

        let kind = get_str(connection, settings_key::TYPE)?
            .ok_or(DirectoryError::SettingsDecode {
                key: settings_key::TYPE,
                expected: "present",
            })?
            .to_string();
        let id = get_str(connection, settings_key::ID)?
            .unwrap_or_default()
            .to_string();
        let timestamp = get_u64(connection, settings_key::TIMESTAMP)?;
        let autoconnect_priority = get_i32(connection, settings_key::AUTOCONNECT_PRIORITY)?;

        let ssid = if kind == connection_type::WIRELESS {
            let wireless =
                settings
                    .get(settings_key::WIRELESS)
                    .ok_or(DirectoryError::SettingsDecode {
                        key: settings_key::WIRELESS,
                        expected: "a settings group",
                    })?;
            Some(
                get_bytes(wireless, settings_key::SSID)?.ok_or(DirectoryError::SettingsDecode {
                    key: settings_key::SSID,
                    expected: "present",
                })?,
            )
        } else {
            None
        };

        Ok(Self {
            id,
            kind,
            ssid,
            timestamp,
            autoconnect_priority,
        })
    }

    pub fn is_wireless(&self) -> bool {
        self.kind == connection_type::WIRELESS
    }

    /// Whether this profile marks its SSID as a known network: wireless and
    /// connected at least once.
    pub fn is_known_wireless(&self) -> bool {
        self.is_wireless() && self.timestamp.is_some_and(|t| t != 0)
    }

    /// Whether the profile's SSID bytes equal `ssid`.
    pub fn matches_ssid(&self, ssid: &[u8]) -> bool {
        self.ssid.as_deref() == Some(ssid)
    }
}

/// Returns `settings` with `connection.autoconnect-priority` set to `priority`.
///
/// Every other group and property is left exactly as read. A missing
/// `connection` group is created.
pub fn with_autoconnect_priority(mut settings: SettingsMap, priority: i32) -> Result<SettingsMap> {
    settings
        .entry(settings_key::CONNECTION.to_string())
        .or_default()
        .insert(
            settings_key::AUTOCONNECT_PRIORITY.to_string(),
            Value::from(priority).try_to_owned()?,
        );
    Ok(settings)
}

fn get_str<'a>(
    group: &'a HashMap<String, OwnedValue>,
    key: &'static str,
) -> Result<Option<&'a str>> {
    match group.get(key).map(|v| &**v) {
        None => Ok(None),
        Some(Value::Str(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(DirectoryError::SettingsDecode {
            key,
            expected: "a string",
        }),
    }
}

fn get_u64(group: &HashMap<String, OwnedValue>, key: &'static str) -> Result<Option<u64>> {
    match group.get(key).map(|v| &**v) {
        None => Ok(None),
        Some(Value::U64(n)) => Ok(Some(*n)),
        Some(_) => Err(DirectoryError::SettingsDecode {
            key,
            expected: "an unsigned 64-bit integer",
        }),
    }
}

fn get_i32(group: &HashMap<String, OwnedValue>, key: &'static str) -> Result<Option<i32>> {
    match group.get(key).map(|v| &**v) {
        None => Ok(None),
        Some(Value::I32(n)) => Ok(Some(*n)),
        Some(_) => Err(DirectoryError::SettingsDecode {
            key,
            expected: "a signed 32-bit integer",
        }),
    }
}

fn get_bytes(group: &HashMap<String, OwnedValue>, key: &'static str) -> Result<Option<Vec<u8>>> {
    let invalid = DirectoryError::SettingsDecode {
        key,
        expected: "a byte array",
    };
    match group.get(key).map(|v| &**v) {
        None => Ok(None),
        Some(Value::Array(arr)) => {
            let mut raw = Vec::with_capacity(arr.len());
            for v in arr.iter() {
                match v {
                    Value::U8(b) => raw.push(*b),
                    _ => return Err(invalid),
                }
            }
            Ok(Some(raw))
        }
        Some(_) => Err(invalid),
    }
}
