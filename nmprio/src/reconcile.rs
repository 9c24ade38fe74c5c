//! Reconciliation of ranked candidates into autoconnect priorities.

use log::{info, warn};

use crate::directory::Directory;
use crate::models::{AccessPointObservation, Ssid};

/// Priority of the entry at `index` in a ranked list of `len` entries.
///
/// The best entry gets `len + offset`, the last one `1 + offset`.
pub fn priority_for(index: usize, len: usize, offset: i32) -> i32 {
    let rank_from_bottom = i32::try_from(len.saturating_sub(index)).unwrap_or(i32::MAX);
    rank_from_bottom.saturating_add(offset)
}

/// Pairs every ranked SSID with the priority its profiles should carry.
pub fn assign_priorities(ranked: &[AccessPointObservation], offset: i32) -> Vec<(&Ssid, i32)> {
    let len = ranked.len();
    ranked
        .iter()
        .enumerate()
        .map(|(i, obs)| (&obs.ssid, priority_for(i, len, offset)))
        .collect()
}

/// Counters of one reconciliation pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileReport {
    /// Priority writes issued.
    pub attempted: usize,
    pub written: usize,
    pub failed: usize,
    /// Ranked entries whose profiles could not be looked up.
    pub lookups_failed: usize,
}

/// Writes the priority of every ranked entry to all of its saved profiles.
///
/// Profiles sharing an SSID get the same value. A failing lookup or write
/// is logged and the pass continues; nothing is rolled back, since the
/// next cycle re-applies the full ordering. An SSID that appears several
/// times is written once per appearance, so its lowest value lands last.
pub async fn reconcile<D>(
    directory: &D,
    ranked: &[AccessPointObservation],
    offset: i32,
) -> ReconcileReport
where
    D: Directory + ?Sized,
{
    let mut report = ReconcileReport::default();

    for (ssid, priority) in assign_priorities(ranked, offset) {
        let profiles = match directory.profiles_for_ssid(ssid).await {
            Ok(profiles) => profiles,
            Err(e) => {
                warn!("Cannot look up profiles for '{ssid}': {e}");
                report.lookups_failed += 1;
                continue;
            }
        };

        for profile in profiles {
            report.attempted += 1;
            info!("Setting priority of {profile} ('{ssid}') to {priority}");
            match directory.set_priority(&profile, priority).await {
                Ok(()) => {
                    report.written += 1;
                    info!("Priority of {profile} set to {priority}");
                }
                Err(e) => {
                    report.failed += 1;
                    warn!("Priority update skipped: {e}");
                }
            }
        }
    }

    report
}
