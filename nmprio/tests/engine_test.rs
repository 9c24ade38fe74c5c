//! Poll-cycle tests driven by an in-memory directory.
//!
//! These tests exercise ranking, priority reconciliation, activation and
//! the backoff state machine end to end without a D-Bus connection.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use zvariant::OwnedObjectPath;

use nmprio::{
    AccessPointObservation, ActivationOutcome, ActivationTarget, Backoff, Directory,
    BackoffPolicy, DirectoryError, EngineConfig, KnownNetworkSet, SavedProfileRef, Ssid,
    reconcile, run, run_cycle,
};

#[derive(Default)]
struct FakeState {
    known: KnownNetworkSet,
    visible: Vec<AccessPointObservation>,
    current: Option<Ssid>,
    profiles: HashMap<Ssid, Vec<SavedProfileRef>>,
    targets: HashMap<Ssid, ActivationTarget>,
    host_down: bool,
    /// Number of upcoming cycles during which the host cannot be reached.
    outage_cycles: usize,
    in_outage: bool,
    scan_fails: bool,
    reject_activation: bool,
    failing_writes: HashSet<String>,

    scans: usize,
    writes: Vec<(String, i32)>,
    priorities: HashMap<String, i32>,
    activations: Vec<(String, ActivationTarget)>,
}

#[derive(Default)]
struct FakeDirectory {
    state: Mutex<FakeState>,
}

impl FakeDirectory {
    fn with(f: impl FnOnce(&mut FakeState)) -> Self {
        let dir = Self::default();
        f(&mut dir.state.lock().unwrap());
        dir
    }

    fn update(&self, f: impl FnOnce(&mut FakeState)) {
        f(&mut self.state.lock().unwrap());
    }

    fn writes(&self) -> Vec<(String, i32)> {
        self.state.lock().unwrap().writes.clone()
    }

    fn priorities(&self) -> HashMap<String, i32> {
        self.state.lock().unwrap().priorities.clone()
    }

    fn activations(&self) -> usize {
        self.state.lock().unwrap().activations.len()
    }

    fn scans(&self) -> usize {
        self.state.lock().unwrap().scans
    }
}

fn unavailable() -> DirectoryError {
    DirectoryError::DirectoryUnavailable(zbus::Error::Failure("no system bus".into()))
}

#[async_trait]
impl Directory for FakeDirectory {
    async fn known_ssids(&self) -> nmprio::Result<KnownNetworkSet> {
        let s = self.state.lock().unwrap();
        if s.host_down || s.in_outage {
            return Err(unavailable());
        }
        Ok(s.known.clone())
    }

    async fn current_ssid(&self) -> Option<Ssid> {
        let s = self.state.lock().unwrap();
        if s.host_down || s.in_outage {
            return None;
        }
        s.current.clone()
    }

    async fn scan_visible(&self) -> nmprio::Result<Vec<AccessPointObservation>> {
        let s = self.state.lock().unwrap();
        if s.host_down || s.in_outage {
            return Err(unavailable());
        }
        Ok(s.visible.clone())
    }

    async fn profiles_for_ssid(&self, ssid: &Ssid) -> nmprio::Result<Vec<SavedProfileRef>> {
        let s = self.state.lock().unwrap();
        Ok(s.profiles.get(ssid).cloned().unwrap_or_default())
    }

    async fn set_priority(&self, profile: &SavedProfileRef, priority: i32) -> nmprio::Result<()> {
        let mut s = self.state.lock().unwrap();
        if s.failing_writes.contains(profile.as_str()) {
            return Err(DirectoryError::ProfileWrite {
                profile: profile.to_string(),
                reason: "permission denied".into(),
            });
        }
        s.writes.push((profile.to_string(), priority));
        s.priorities.insert(profile.to_string(), priority);
        Ok(())
    }

    async fn activation_target(&self, ssid: &Ssid) -> nmprio::Result<Option<ActivationTarget>> {
        Ok(self.state.lock().unwrap().targets.get(ssid).cloned())
    }

    async fn activate(
        &self,
        profile: &SavedProfileRef,
        target: &ActivationTarget,
    ) -> nmprio::Result<()> {
        let mut s = self.state.lock().unwrap();
        if s.reject_activation {
            return Err(DirectoryError::Activation {
                profile: profile.to_string(),
                reason: "device busy".into(),
            });
        }
        s.activations.push((profile.to_string(), target.clone()));
        Ok(())
    }

    async fn request_scan(&self) -> nmprio::Result<()> {
        let mut s = self.state.lock().unwrap();
        s.scans += 1;
        // Every cycle starts with a scan request, so the outage is counted here.
        s.in_outage = s.outage_cycles > 0;
        s.outage_cycles = s.outage_cycles.saturating_sub(1);
        if s.in_outage {
            return Err(unavailable());
        }
        if s.scan_fails {
            return Err(DirectoryError::ScanRequest("scan already in progress".into()));
        }
        Ok(())
    }
}

fn profile(path: &str) -> SavedProfileRef {
    SavedProfileRef::try_from(path).unwrap()
}

fn target(n: u32) -> ActivationTarget {
    ActivationTarget {
        device: OwnedObjectPath::try_from("/org/freedesktop/NetworkManager/Devices/3").unwrap(),
        access_point: OwnedObjectPath::try_from(format!(
            "/org/freedesktop/NetworkManager/AccessPoint/{n}"
        ))
        .unwrap(),
    }
}

const P_HOME_1: &str = "/org/freedesktop/NetworkManager/Settings/1";
const P_HOME_2: &str = "/org/freedesktop/NetworkManager/Settings/2";
const P_WORK: &str = "/org/freedesktop/NetworkManager/Settings/3";
const P_OFFICE: &str = "/org/freedesktop/NetworkManager/Settings/4";

/// Home (two profiles) and Work are known; Cafe is an unknown open network.
fn roaming_laptop() -> FakeDirectory {
    FakeDirectory::with(|s| {
        s.known = known(&["Home", "Work"]);
        s.visible = vec![
            AccessPointObservation::new("Cafe", 2412, 95),
            AccessPointObservation::new("Home", 5180, 50),
            AccessPointObservation::new("Work", 2437, 80),
        ];
        s.profiles
            .insert("Home".into(), vec![profile(P_HOME_1), profile(P_HOME_2)]);
        s.profiles.insert("Work".into(), vec![profile(P_WORK)]);
        s.targets.insert("Work".into(), target(7));
        s.targets.insert("Home".into(), target(8));
        s.current = Some("Home".into());
    })
}

fn known(names: &[&str]) -> KnownNetworkSet {
    names.iter().map(|name| Ssid::from(*name)).collect()
}

fn ranked_ssids(report: &nmprio::CycleReport) -> Vec<String> {
    report.ranked.iter().map(|o| o.ssid.to_string()).collect()
}

#[tokio::test]
async fn empty_cycle_performs_no_writes_or_activation() {
    let dir = FakeDirectory::with(|s| {
        s.known = known(&["Home"]);
        s.profiles.insert("Home".into(), vec![profile(P_HOME_1)]);
    });
    let config = EngineConfig::default();

    let (report, next) = run_cycle(&dir, &config, Backoff::default()).await;

    assert!(!report.found_candidates());
    assert_eq!(report.activation, None);
    assert_eq!(report.reconcile.attempted, 0);
    assert!(dir.writes().is_empty());
    assert_eq!(dir.activations(), 0);
    assert_eq!(report.backoff_delay, Duration::ZERO);
    assert_eq!(next.current(), Duration::from_millis(500));
}

#[tokio::test]
async fn backoff_grows_while_empty_and_resets_on_candidates() {
    let dir = FakeDirectory::default();
    let config = EngineConfig::default();
    let mut backoff = Backoff::new(config.backoff);

    let mut delays = Vec::new();
    for _ in 0..4 {
        let (report, next) = run_cycle(&dir, &config, backoff).await;
        delays.push(report.backoff_delay.as_millis());
        assert_eq!(report.sleep(&config), report.backoff_delay + config.poll_interval);
        backoff = next;
    }
    assert_eq!(delays, [0, 500, 600, 720]);

    dir.update(|s| s.visible = vec![AccessPointObservation::new("Cafe", 2412, 40)]);
    let (report, next) = run_cycle(&dir, &config, backoff).await;
    assert_eq!(report.backoff_delay, Duration::ZERO);
    assert_eq!(report.sleep(&config), Duration::from_secs(30));
    assert_eq!(next.current(), Duration::ZERO);
}

#[tokio::test]
async fn priorities_follow_rank_order() {
    let dir = roaming_laptop();
    let config = EngineConfig::default();

    let (report, _) = run_cycle(&dir, &config, Backoff::default()).await;

    assert_eq!(ranked_ssids(&report), ["Work", "Home", "Cafe"]);
    assert_eq!(
        dir.writes(),
        [
            (P_WORK.to_string(), 13),
            (P_HOME_1.to_string(), 12),
            (P_HOME_2.to_string(), 12),
        ]
    );
    assert_eq!(report.reconcile.attempted, 3);
    assert_eq!(report.reconcile.written, 3);
    assert_eq!(report.reconcile.failed, 0);
}

#[tokio::test]
async fn reconcile_twice_is_idempotent() {
    let dir = roaming_laptop();
    let (report, _) = run_cycle(&dir, &EngineConfig::default(), Backoff::default()).await;
    let after_first = dir.priorities();

    let again = reconcile(&dir, &report.ranked, 10).await;
    assert_eq!(again, report.reconcile);
    assert_eq!(dir.priorities(), after_first);

    let writes = dir.writes();
    let (first, second) = writes.split_at(writes.len() / 2);
    assert_eq!(first, second);
}

#[tokio::test]
async fn write_failure_does_not_abort_reconciliation() {
    let dir = roaming_laptop();
    dir.update(|s| {
        s.failing_writes.insert(P_WORK.to_string());
    });

    let (report, _) = run_cycle(&dir, &EngineConfig::default(), Backoff::default()).await;

    assert_eq!(report.reconcile.failed, 1);
    assert_eq!(report.reconcile.written, 2);
    assert_eq!(
        dir.priorities(),
        HashMap::from([(P_HOME_1.to_string(), 12), (P_HOME_2.to_string(), 12)])
    );
    assert!(report.activation.unwrap().activated());
}

#[tokio::test]
async fn activates_best_candidate_when_not_connected_to_it() {
    let dir = roaming_laptop();

    let (report, _) = run_cycle(&dir, &EngineConfig::default(), Backoff::default()).await;

    assert_eq!(
        report.activation,
        Some(ActivationOutcome::Activated {
            ssid: "Work".into(),
            profile: profile(P_WORK),
        })
    );
    let s = dir.state.lock().unwrap();
    assert_eq!(s.activations, [(P_WORK.to_string(), target(7))]);
}

#[tokio::test]
async fn first_profile_is_used_for_activation() {
    let dir = roaming_laptop();
    dir.update(|s| {
        s.current = Some("Work".into());
        s.visible.retain(|o| o.ssid != "Work");
    });

    let (report, _) = run_cycle(&dir, &EngineConfig::default(), Backoff::default()).await;

    assert_eq!(
        report.activation,
        Some(ActivationOutcome::Activated {
            ssid: "Home".into(),
            profile: profile(P_HOME_1),
        })
    );
}

#[tokio::test]
async fn no_activation_when_already_on_best() {
    let dir = roaming_laptop();
    dir.update(|s| s.current = Some("Work".into()));

    let (report, _) = run_cycle(&dir, &EngineConfig::default(), Backoff::default()).await;

    assert_eq!(
        report.activation,
        Some(ActivationOutcome::AlreadyConnected("Work".into()))
    );
    assert_eq!(dir.activations(), 0);
    assert_eq!(dir.writes().len(), 3);
}

#[tokio::test]
async fn unknown_best_without_profile_is_not_activated() {
    let dir = FakeDirectory::with(|s| {
        s.visible = vec![
            AccessPointObservation::new("Airport", 2412, 70),
            AccessPointObservation::new("Hotel", 2412, 60),
        ];
    });

    let (report, next) = run_cycle(&dir, &EngineConfig::default(), Backoff::default().grow()).await;

    assert_eq!(
        report.activation,
        Some(ActivationOutcome::NoSavedProfile("Airport".into()))
    );
    assert!(dir.writes().is_empty());
    assert_eq!(dir.activations(), 0);
    assert_eq!(next.current(), Duration::ZERO);
}

#[tokio::test]
async fn missing_access_point_is_reported() {
    let dir = roaming_laptop();
    dir.update(|s| {
        s.targets.remove(&Ssid::from("Work"));
    });

    let (report, _) = run_cycle(&dir, &EngineConfig::default(), Backoff::default()).await;

    assert_eq!(
        report.activation,
        Some(ActivationOutcome::NoAccessPoint("Work".into()))
    );
    assert_eq!(dir.activations(), 0);
}

#[tokio::test]
async fn rejected_activation_is_reported_and_cycle_completes() {
    let dir = roaming_laptop();
    dir.update(|s| s.reject_activation = true);

    let (report, next) = run_cycle(&dir, &EngineConfig::default(), Backoff::default()).await;

    assert!(matches!(
        report.activation,
        Some(ActivationOutcome::Failed { ref ssid, .. }) if ssid == "Work"
    ));
    assert_eq!(report.reconcile.written, 3);
    assert_eq!(next.current(), Duration::ZERO);
}

#[tokio::test]
async fn unreachable_host_behaves_like_no_networks() {
    let dir = roaming_laptop();
    dir.update(|s| s.host_down = true);

    let (report, next) = run_cycle(&dir, &EngineConfig::default(), Backoff::default()).await;

    assert!(!report.found_candidates());
    assert!(dir.writes().is_empty());
    assert_eq!(dir.activations(), 0);
    assert_eq!(next.current(), Duration::from_millis(500));
}

#[tokio::test]
async fn failed_scan_request_still_ranks_visible_networks() {
    let dir = roaming_laptop();
    dir.update(|s| s.scan_fails = true);

    let (report, _) = run_cycle(&dir, &EngineConfig::default(), Backoff::default()).await;

    assert_eq!(dir.scans(), 1);
    assert_eq!(report.ranked.len(), 3);
    assert_eq!(report.reconcile.written, 3);
}

#[tokio::test]
async fn duplicate_ssids_are_written_once_per_appearance() {
    let dir = FakeDirectory::with(|s| {
        s.known = known(&["Office", "Home"]);
        s.visible = vec![
            AccessPointObservation::new("Office", 2412, 30),
            AccessPointObservation::new("Home", 2412, 60),
            AccessPointObservation::new("Office", 5180, 80),
        ];
        s.profiles.insert("Office".into(), vec![profile(P_OFFICE)]);
        s.profiles.insert("Home".into(), vec![profile(P_HOME_1)]);
        s.current = Some("Office".into());
    });

    let (report, _) = run_cycle(&dir, &EngineConfig::default(), Backoff::default()).await;

    assert_eq!(ranked_ssids(&report), ["Office", "Home", "Office"]);
    assert_eq!(
        dir.writes(),
        [
            (P_OFFICE.to_string(), 13),
            (P_HOME_1.to_string(), 12),
            (P_OFFICE.to_string(), 11),
        ]
    );
    assert_eq!(dir.priorities()[P_OFFICE], 11);
}

#[tokio::test]
async fn custom_priority_offset_is_applied() {
    let dir = roaming_laptop();
    let config = EngineConfig {
        priority_offset: 100,
        ..EngineConfig::default()
    };

    run_cycle(&dir, &config, Backoff::default()).await;

    assert_eq!(dir.priorities()[P_WORK], 103);
    assert_eq!(dir.priorities()[P_HOME_1], 102);
}

#[tokio::test]
async fn loop_stops_at_sleep_boundary_after_shutdown() {
    let dir = roaming_laptop();
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    run(&dir, &EngineConfig::default(), shutdown).await;

    assert_eq!(dir.scans(), 1);
    assert_eq!(dir.writes().len(), 3);
}

#[tokio::test]
async fn loop_runs_again_after_sleeping() {
    let dir = FakeDirectory::default();
    let config = EngineConfig {
        poll_interval: Duration::from_millis(5),
        ..EngineConfig::default()
    };
    let shutdown = CancellationToken::new();

    let stopper = shutdown.clone();
    let handle = async {
        while dir.scans() < 2 {
            tokio::task::yield_now().await;
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        stopper.cancel();
    };

    tokio::join!(run(&dir, &config, shutdown), handle);
    assert!(dir.scans() >= 2);
}

#[tokio::test]
async fn host_outage_backs_off_and_recovers() {
    let dir = roaming_laptop();
    dir.update(|s| s.outage_cycles = 3);
    let config = EngineConfig::default();
    let mut backoff = Backoff::new(config.backoff);

    let mut delays = Vec::new();
    for _ in 0..3 {
        let (report, next) = run_cycle(&dir, &config, backoff).await;
        assert!(!report.found_candidates());
        assert_eq!(report.current_ssid, None);
        delays.push(report.backoff_delay.as_millis());
        backoff = next;
    }
    assert_eq!(delays, [0, 500, 600]);
    assert!(dir.writes().is_empty());

    let (report, next) = run_cycle(&dir, &config, backoff).await;
    assert_eq!(ranked_ssids(&report), ["Work", "Home", "Cafe"]);
    assert_eq!(report.current_ssid, Some(Ssid::from("Home")));
    assert_eq!(report.reconcile.written, 3);
    assert!(report.activation.unwrap().activated());
    assert_eq!(report.backoff_delay, Duration::ZERO);
    assert_eq!(next.current(), Duration::ZERO);
    assert_eq!(dir.scans(), 4);
}

#[tokio::test]
async fn loop_keeps_running_through_host_outage() {
    let dir = roaming_laptop();
    dir.update(|s| s.outage_cycles = 2);
    let config = EngineConfig {
        poll_interval: Duration::from_millis(5),
        backoff: BackoffPolicy {
            initial: Duration::from_millis(1),
            factor: 2.0,
            max: Duration::from_millis(5),
        },
        ..EngineConfig::default()
    };
    let shutdown = CancellationToken::new();

    let stopper = shutdown.clone();
    let handle = async {
        while dir.writes().is_empty() {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
        stopper.cancel();
    };

    tokio::join!(run(&dir, &config, shutdown), handle);
    assert!(dir.scans() >= 3);
    assert_eq!(dir.priorities()[P_WORK], 13);
}

#[tokio::test]
async fn non_utf8_ssid_is_matched_by_bytes() {
    let raw = Ssid::new(b"Caf\xe9".to_vec());
    let dir = FakeDirectory::with(|s| {
        s.known = [raw.clone()].into_iter().collect();
        s.visible = vec![
            AccessPointObservation::new("Café", 2412, 60),
            AccessPointObservation::new(raw.clone(), 2412, 40),
        ];
        s.profiles.insert(raw.clone(), vec![profile(P_OFFICE)]);
        s.targets.insert(raw.clone(), target(9));
    });

    let (report, _) = run_cycle(&dir, &EngineConfig::default(), Backoff::default()).await;

    assert_eq!(report.ranked[0].ssid, raw);
    assert!(report.ranked[0].is_known);
    assert!(!report.ranked[1].is_known);
    assert_eq!(dir.writes(), [(P_OFFICE.to_string(), 12)]);
    assert_eq!(
        report.activation,
        Some(ActivationOutcome::Activated {
            ssid: raw,
            profile: profile(P_OFFICE),
        })
    );
}

#[tokio::test]
async fn hidden_network_is_ranked_but_never_written() {
    let dir = FakeDirectory::with(|s| {
        s.known = known(&["Home"]);
        s.visible = vec![
            AccessPointObservation::new("", 2412, 90),
            AccessPointObservation::new("Cafe", 2412, 70),
        ];
    });

    let (report, next) = run_cycle(&dir, &EngineConfig::default(), Backoff::default()).await;

    assert_eq!(ranked_ssids(&report), ["", "Cafe"]);
    assert_eq!(report.reconcile.attempted, 0);
    assert!(dir.writes().is_empty());
    assert_eq!(
        report.activation,
        Some(ActivationOutcome::NoSavedProfile(Ssid::default()))
    );
    assert_eq!(next.current(), Duration::ZERO);
}
