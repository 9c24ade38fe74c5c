use async_trait::async_trait;
use log::{debug, info};
use std::sync::Arc;
use tokio::sync::Mutex;
use zbus::Connection;

use crate::Result;
use crate::connection::{activate, find_activation_target};
use crate::connection_settings::{known_ssids, profiles_for_ssid, set_priority};
use crate::directory::Directory;
use crate::models::{
    AccessPointObservation, ActivationTarget, DirectoryError, KnownNetworkSet, SavedProfileRef,
    Ssid,
};
use crate::network_info::current_ssid;
use crate::profile_patch::{DnsPolicy, PatchSummary, patch_profiles};
use crate::scan::{ScanTrigger, request_scan_dbus, run_scan_command, scan_visible};

/// NetworkManager over the system D-Bus.
///
/// Implements [`Directory`] for the poll loop and exposes the one-shot
/// profile patcher.
///
/// The bus connection is opened on first use, not at construction. A call
/// that cannot reach the bus fails with [`DirectoryError::DirectoryUnavailable`]
/// and the next call tries again, so a bus or NetworkManager that starts
/// late, or restarts, is picked up without restarting the process.
#[derive(Clone)]
pub struct NmDirectory {
    conn: Arc<Mutex<Option<Connection>>>,
    bus_address: Option<String>,
    scan_trigger: ScanTrigger,
}

impl Default for NmDirectory {
    fn default() -> Self {
        Self::new()
    }
}

impl NmDirectory {
    /// A directory on the system D-Bus. Does not connect yet.
    pub fn new() -> Self {
        Self {
            conn: Arc::new(Mutex::new(None)),
            bus_address: None,
            scan_trigger: ScanTrigger::default(),
        }
    }

    /// Uses the bus at `address` (e.g. `unix:path=/run/dbus/system_bus_socket`)
    /// instead of the system bus.
    pub fn with_bus_address(mut self, address: impl Into<String>) -> Self {
        self.bus_address = Some(address.into());
        self
    }

    /// Replaces the way scans are requested.
    pub fn with_scan_trigger(mut self, trigger: ScanTrigger) -> Self {
        self.scan_trigger = trigger;
        self
    }

    /// Applies the DNS and IPv6 token rules of `policy` to every saved
    /// wireless and ethernet profile.
    pub async fn patch_profiles(&self, policy: &DnsPolicy) -> Result<PatchSummary> {
        let conn = self.connection().await?;
        self.observe(patch_profiles(&conn, policy).await).await
    }

    /// Returns the cached connection, opening one if there is none.
    async fn connection(&self) -> Result<Connection> {
        let mut slot = self.conn.lock().await;
        if let Some(conn) = slot.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self
            .connect()
            .await
            .map_err(DirectoryError::DirectoryUnavailable)?;
        info!("Connected to D-Bus");
        *slot = Some(conn.clone());
        Ok(conn)
    }

    async fn connect(&self) -> zbus::Result<Connection> {
        match &self.bus_address {
            Some(address) => {
                zbus::connection::Builder::address(address.as_str())?
                    .build()
                    .await
            }
            None => Connection::system().await,
        }
    }

    /// Drops the cached connection when `result` says the host is gone, so
    /// the next call reconnects.
    async fn observe<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(DirectoryError::DirectoryUnavailable(e)) = &result {
            debug!("Dropping D-Bus connection: {e}");
            self.conn.lock().await.take();
        }
        result
    }
}

#[async_trait]
impl Directory for NmDirectory {
    async fn known_ssids(&self) -> Result<KnownNetworkSet> {
        let conn = self.connection().await?;
        self.observe(known_ssids(&conn).await).await
    }

    async fn current_ssid(&self) -> Option<Ssid> {
        match self.connection().await {
            Ok(conn) => current_ssid(&conn).await,
            Err(e) => {
                debug!("Current network unknown: {e}");
                None
            }
        }
    }

    async fn scan_visible(&self) -> Result<Vec<AccessPointObservation>> {
        let conn = self.connection().await?;
        self.observe(scan_visible(&conn).await).await
    }

    async fn profiles_for_ssid(&self, ssid: &Ssid) -> Result<Vec<SavedProfileRef>> {
        let conn = self.connection().await?;
        self.observe(profiles_for_ssid(&conn, ssid).await).await
    }

    async fn set_priority(&self, profile: &SavedProfileRef, priority: i32) -> Result<()> {
        let conn = self.connection().await?;
        set_priority(&conn, profile, priority).await
    }

    async fn activation_target(&self, ssid: &Ssid) -> Result<Option<ActivationTarget>> {
        let conn = self.connection().await?;
        self.observe(find_activation_target(&conn, ssid).await).await
    }

    async fn activate(&self, profile: &SavedProfileRef, target: &ActivationTarget) -> Result<()> {
        let conn = self.connection().await?;
        activate(&conn, profile, target).await
    }

    async fn request_scan(&self) -> Result<()> {
        match &self.scan_trigger {
            ScanTrigger::Command(argv) => run_scan_command(argv).await,
            ScanTrigger::Dbus => {
                let conn = self.connection().await?;
                self.observe(request_scan_dbus(&conn).await).await
            }
        }
    }
}
