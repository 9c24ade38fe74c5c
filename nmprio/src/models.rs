use std::borrow::Cow;
use std::collections::HashSet;
use std::fmt::{Debug, Display, Formatter};
use std::time::Duration;
use thiserror::Error;
use zvariant::OwnedObjectPath;

use crate::constants::{priority, timeouts};

/// A network name as broadcast by an access point.
///
/// SSIDs are up to 32 arbitrary bytes and need not be UTF-8, so they are
/// compared and looked up by their raw bytes. Text conversion is lossy and
/// only meant for logs and the band heuristic. An empty SSID is a hidden
/// network.
#[derive(Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ssid(Vec<u8>);

impl Ssid {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The name as text, with invalid UTF-8 replaced by `U+FFFD`.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl From<&str> for Ssid {
    fn from(name: &str) -> Self {
        Self(name.as_bytes().to_vec())
    }
}

impl From<String> for Ssid {
    fn from(name: String) -> Self {
        Self(name.into_bytes())
    }
}

impl From<Vec<u8>> for Ssid {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Ssid {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl PartialEq<str> for Ssid {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl PartialEq<&str> for Ssid {
    fn eq(&self, other: &&str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl Display for Ssid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

impl Debug for Ssid {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match std::str::from_utf8(&self.0) {
            Ok(name) => write!(f, "{name:?}"),
            Err(_) => write!(f, "{:x?}", self.0),
        }
    }
}

/// A visible access point observed during one poll cycle.
///
/// Observations are recreated on every cycle and never persisted. The same
/// SSID may appear several times when it is served by several access points
/// or seen from several wireless devices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessPointObservation {
    pub ssid: Ssid,
    pub frequency_mhz: u32,
    /// Signal strength as a percentage (0-100).
    pub strength: u8,
    pub is_known: bool,
}

impl AccessPointObservation {
    pub fn new(ssid: impl Into<Ssid>, frequency_mhz: u32, strength: u8) -> Self {
        Self {
            ssid: ssid.into(),
            frequency_mhz,
            strength,
            is_known: false,
        }
    }

    pub fn known(mut self) -> Self {
        self.is_known = true;
        self
    }
}

impl Display for AccessPointObservation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: frequency={} MHz strength={} known={}",
            self.ssid, self.frequency_mhz, self.strength, self.is_known
        )
    }
}

/// SSIDs of saved wireless profiles that have been connected at least once.
pub type KnownNetworkSet = HashSet<Ssid>;

/// Observations ordered best-first.
pub type RankedList = Vec<AccessPointObservation>;

/// Handle to a saved NetworkManager connection profile.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SavedProfileRef(OwnedObjectPath);

impl SavedProfileRef {
    pub fn new(path: OwnedObjectPath) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &OwnedObjectPath {
        &self.0
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl TryFrom<&str> for SavedProfileRef {
    type Error = zvariant::Error;

    fn try_from(path: &str) -> std::result::Result<Self, Self::Error> {
        OwnedObjectPath::try_from(path).map(Self)
    }
}

impl Display for SavedProfileRef {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.as_str())
    }
}

/// The wireless device and visible access point a profile is activated on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationTarget {
    pub device: OwnedObjectPath,
    pub access_point: OwnedObjectPath,
}

/// Growth policy of the no-network backoff.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    /// First non-zero delay.
    pub initial: Duration,
    /// Multiplier applied on every further empty cycle.
    pub factor: f64,
    /// Upper bound of the delay.
    pub max: Duration,
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self {
            initial: timeouts::backoff_initial(),
            factor: timeouts::BACKOFF_FACTOR,
            max: timeouts::backoff_max(),
        }
    }
}

/// Tuning of the poll loop.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Regular sleep between cycles.
    pub poll_interval: Duration,
    pub backoff: BackoffPolicy,
    /// Added to `len - index` when assigning autoconnect priorities.
    pub priority_offset: i32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            poll_interval: timeouts::poll_interval(),
            backoff: BackoffPolicy::default(),
            priority_offset: priority::OFFSET,
        }
    }
}

/// Errors raised by the network directory.
///
/// None of these are fatal to the poll loop: every cycle re-derives its
/// state from NetworkManager, so a failed step is simply tried again on
/// the next cycle.
#[derive(Debug, Error)]
pub enum DirectoryError {
    /// NetworkManager could not be reached at all.
    #[error("NetworkManager unavailable: {0}")]
    DirectoryUnavailable(#[source] zbus::Error),

    /// The settings of a single profile could not be read.
    #[error("failed to read profile {profile}: {reason}")]
    ProfileRead { profile: String, reason: String },

    /// The autoconnect priority of a single profile could not be written.
    #[error("failed to update profile {profile}: {reason}")]
    ProfileWrite { profile: String, reason: String },

    /// NetworkManager rejected an activation request.
    #[error("failed to activate {profile}: {reason}")]
    Activation { profile: String, reason: String },

    /// A scan could not be triggered (one may already be in flight).
    #[error("scan request failed: {0}")]
    ScanRequest(String),

    /// A settings value did not have the expected D-Bus type.
    #[error("setting '{key}' is not {expected}")]
    SettingsDecode {
        key: &'static str,
        expected: &'static str,
    },

    /// A D-Bus communication error occurred.
    #[error("D-Bus error: {0}")]
    Dbus(#[from] zbus::Error),

    /// A D-Bus value could not be converted.
    #[error("D-Bus value error: {0}")]
    Variant(#[from] zvariant::Error),
}
