//! Keeps a laptop on the best available Wi-Fi network by steering
//! NetworkManager over D-Bus.
//!
//! Every poll cycle the engine:
//!
//! - Requests a scan and reads the known, visible and current networks
//! - Ranks the visible networks (known first, then signal, then the band
//!   advertised in the SSID)
//! - Writes a descending `autoconnect-priority` to every saved profile of
//!   the ranked networks
//! - Activates the best network if it is not already connected
//!
//! When nothing is visible the loop backs off geometrically on top of its
//! regular interval.
//!
//! # Example
//!
//! ```no_run
//! use nmprio::{EngineConfig, NmDirectory};
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() {
//! // Connects lazily; an unreachable bus only makes cycles come up empty.
//! let directory = NmDirectory::new();
//! let shutdown = CancellationToken::new();
//!
//! nmprio::engine::run(&directory, &EngineConfig::default(), shutdown).await;
//! # }
//! ```
//!
//! # Testing without D-Bus
//!
//! The engine only talks to the host through the [`Directory`] trait, so the
//! whole cycle can be driven by an in-memory implementation.
//!
//! # Logging
//!
//! This crate uses the [`log`](https://docs.rs/log) facade for logging. To see
//! log output, add a logging implementation like `env_logger`.

// Internal implementation modules
mod connection;
mod connection_settings;
mod constants;
mod network_info;
mod proxies;
mod scan;
mod utils;

// Public API modules
pub mod activation;
pub mod backoff;
pub mod directory;
pub mod engine;
pub mod models;
pub mod network_directory;
pub mod profile_patch;
pub mod profile_settings;
pub mod rank;
pub mod reconcile;

// Re-exported public API
pub use activation::ActivationOutcome;
pub use backoff::Backoff;
pub use directory::Directory;
pub use engine::{CycleReport, run, run_cycle};
pub use models::{
    AccessPointObservation, ActivationTarget, BackoffPolicy, DirectoryError, EngineConfig,
    KnownNetworkSet, RankedList, SavedProfileRef, Ssid,
};
pub use network_directory::NmDirectory;
pub use profile_patch::{DnsPolicy, PatchPlan, PatchScope, PatchSummary};
pub use proxies::SettingsMap;
pub use rank::{band_score, rank};
pub use reconcile::{ReconcileReport, reconcile};
pub use scan::ScanTrigger;

/// A specialized `Result` type for directory operations.
pub type Result<T> = std::result::Result<T, DirectoryError>;
