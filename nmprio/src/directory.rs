//! The boundary between the selection engine and the host network service.

use async_trait::async_trait;

use crate::Result;
use crate::models::{
    AccessPointObservation, ActivationTarget, KnownNetworkSet, SavedProfileRef, Ssid,
};

/// Read and write access to the host's network directory.
///
/// The engine only ever talks to the host through this trait. Every call
/// is independent: a failure in one never poisons the next, and the
/// engine decides per call whether a failure degrades to an empty result
/// or is logged and skipped.
#[async_trait]
pub trait Directory: Send + Sync {
    /// SSIDs of saved wireless profiles that have been connected before.
    ///
    /// Fails with `DirectoryUnavailable` if the host cannot be reached.
    /// A profile that cannot be read is skipped.
    async fn known_ssids(&self) -> Result<KnownNetworkSet>;

    /// SSID of the wireless device currently in the activated state.
    ///
    /// `None` also when the host cannot be reached.
    async fn current_ssid(&self) -> Option<Ssid>;

    /// Every visible access point on every wireless device, duplicates kept.
    async fn scan_visible(&self) -> Result<Vec<AccessPointObservation>>;

    /// Saved profiles whose SSID bytes equal `ssid`.
    async fn profiles_for_ssid(&self, ssid: &Ssid) -> Result<Vec<SavedProfileRef>>;

    /// Writes `connection.autoconnect-priority`, preserving every other property.
    async fn set_priority(&self, profile: &SavedProfileRef, priority: i32) -> Result<()>;

    /// A wireless device and visible access point that `ssid` can be
    /// activated on, if any.
    async fn activation_target(&self, ssid: &Ssid) -> Result<Option<ActivationTarget>>;

    /// Activates `profile` on `target`.
    async fn activate(&self, profile: &SavedProfileRef, target: &ActivationTarget) -> Result<()>;

    /// Best-effort request for a fresh scan.
    async fn request_scan(&self) -> Result<()>;
}
