//! The poll loop driving scan, rank, reconcile and activate.
//!
//! Each cycle runs to completion before the loop sleeps; cycles never
//! overlap. A cycle that finds candidates reconciles priorities, tries to
//! activate the best one, resets the backoff and sleeps the regular poll
//! interval. A cycle that finds nothing performs no writes, sleeps the
//! current backoff delay on top of the poll interval and grows the backoff.
//!
//! Shutdown is only observed while sleeping, so a cycle in progress always
//! finishes its writes.

use futures_timer::Delay;
use log::{debug, info, warn};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::activation::{ActivationOutcome, activate_best};
use crate::backoff::Backoff;
use crate::directory::Directory;
use crate::models::{EngineConfig, RankedList, Ssid};
use crate::rank::rank;
use crate::reconcile::{ReconcileReport, reconcile};

/// What a single cycle observed and did.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    pub ranked: RankedList,
    pub current_ssid: Option<Ssid>,
    pub reconcile: ReconcileReport,
    /// `None` when the cycle found no candidates.
    pub activation: Option<ActivationOutcome>,
    /// Backoff delay to sleep before the regular poll interval.
    pub backoff_delay: Duration,
}

impl CycleReport {
    pub fn found_candidates(&self) -> bool {
        !self.ranked.is_empty()
    }

    /// Total time to sleep before the next cycle.
    pub fn sleep(&self, config: &EngineConfig) -> Duration {
        self.backoff_delay + config.poll_interval
    }
}

/// Runs one full cycle and returns its report and the backoff for the next.
pub async fn run_cycle<D>(
    directory: &D,
    config: &EngineConfig,
    backoff: Backoff,
) -> (CycleReport, Backoff)
where
    D: Directory + ?Sized,
{
    info!("Starting scan cycle");

    if let Err(e) = directory.request_scan().await {
        warn!("Scan request failed, ranking what is already visible: {e}");
    }

    let known = directory.known_ssids().await.unwrap_or_else(|e| {
        warn!("Cannot list known networks: {e}");
        Default::default()
    });
    let visible = directory.scan_visible().await.unwrap_or_else(|e| {
        warn!("Cannot list visible networks: {e}");
        Vec::new()
    });
    let current_ssid = directory.current_ssid().await;
    debug!("Currently connected to: {current_ssid:?}");

    let ranked = rank(visible, &known, current_ssid.as_ref());

    if ranked.is_empty() {
        let delay = backoff.current();
        info!("No networks found, backing off for {delay:?}");
        let report = CycleReport {
            ranked,
            current_ssid,
            reconcile: ReconcileReport::default(),
            activation: None,
            backoff_delay: delay,
        };
        return (report, backoff.grow());
    }

    info!("Available networks:");
    for obs in &ranked {
        info!("  {obs}");
    }

    let reconcile = reconcile(directory, &ranked, config.priority_offset).await;
    info!(
        "Priorities: {} written, {} failed",
        reconcile.written, reconcile.failed
    );

    let activation = activate_best(directory, &ranked, current_ssid.as_ref()).await;

    let report = CycleReport {
        ranked,
        current_ssid,
        reconcile,
        activation: Some(activation),
        backoff_delay: Duration::ZERO,
    };
    (report, backoff.reset())
}

/// Runs cycles until `shutdown` is cancelled.
pub async fn run<D>(directory: &D, config: &EngineConfig, shutdown: CancellationToken)
where
    D: Directory + ?Sized,
{
    let mut backoff = Backoff::new(config.backoff);

    loop {
        let (report, next) = run_cycle(directory, config, backoff).await;
        backoff = next;

        let sleep = report.sleep(config);
        debug!("Sleeping {sleep:?} until next cycle");
        if !sleep_or_shutdown(sleep, &shutdown).await {
            info!("Shutdown requested, stopping poll loop");
            return;
        }
    }
}

/// Sleeps for `duration`; returns `false` if `shutdown` fired first.
async fn sleep_or_shutdown(duration: Duration, shutdown: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = shutdown.cancelled() => false,
        _ = Delay::new(duration) => true,
    }
}
