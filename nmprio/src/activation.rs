//! Activation of the top-ranked candidate.

use log::{info, warn};
use std::fmt::{Display, Formatter};

use crate::directory::Directory;
use crate::models::{AccessPointObservation, SavedProfileRef, Ssid};

/// What the activation step did in one cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActivationOutcome {
    /// The ranked list was empty.
    NoCandidates,
    /// The best candidate is already the current connection.
    AlreadyConnected(Ssid),
    /// NetworkManager accepted the activation request.
    Activated {
        ssid: Ssid,
        profile: SavedProfileRef,
    },
    /// The best candidate has no saved profile.
    NoSavedProfile(Ssid),
    /// No wireless device currently sees the best candidate.
    NoAccessPoint(Ssid),
    /// A lookup or the activation itself failed.
    Failed { ssid: Ssid, reason: String },
}

impl ActivationOutcome {
    /// Whether an activation request was sent to the host.
    pub fn activated(&self) -> bool {
        matches!(self, Self::Activated { .. })
    }
}

impl Display for ActivationOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoCandidates => write!(f, "no candidates"),
            Self::AlreadyConnected(ssid) => write!(f, "already connected to '{ssid}'"),
            Self::Activated { ssid, profile } => write!(f, "activating '{ssid}' via {profile}"),
            Self::NoSavedProfile(ssid) => write!(f, "no saved profile for '{ssid}'"),
            Self::NoAccessPoint(ssid) => write!(f, "no visible access point for '{ssid}'"),
            Self::Failed { ssid, reason } => write!(f, "activating '{ssid}' failed: {reason}"),
        }
    }
}

/// Moves the connection to the best candidate if it is not already there.
///
/// Picks the first saved profile for the best SSID, finds a wireless
/// device that sees it and asks the host to activate. Failures are logged
/// and returned; they are not retried until the next cycle.
pub async fn activate_best<D>(
    directory: &D,
    ranked: &[AccessPointObservation],
    current_ssid: Option<&Ssid>,
) -> ActivationOutcome
where
    D: Directory + ?Sized,
{
    let outcome = try_activate_best(directory, ranked, current_ssid).await;
    match &outcome {
        ActivationOutcome::Activated { .. } | ActivationOutcome::AlreadyConnected(_) => {
            info!("Activation: {outcome}")
        }
        ActivationOutcome::NoCandidates => {}
        _ => warn!("Activation: {outcome}"),
    }
    outcome
}

async fn try_activate_best<D>(
    directory: &D,
    ranked: &[AccessPointObservation],
    current_ssid: Option<&Ssid>,
) -> ActivationOutcome
where
    D: Directory + ?Sized,
{
    let Some(best) = ranked.first() else {
        return ActivationOutcome::NoCandidates;
    };
    let ssid = best.ssid.clone();

    if current_ssid == Some(&ssid) {
        return ActivationOutcome::AlreadyConnected(ssid);
    }

    let profile = match directory.profiles_for_ssid(&ssid).await {
        Ok(profiles) => match profiles.into_iter().next() {
            Some(profile) => profile,
            None => return ActivationOutcome::NoSavedProfile(ssid),
        },
        Err(e) => {
            return ActivationOutcome::Failed {
                ssid,
                reason: e.to_string(),
            };
        }
    };

    let target = match directory.activation_target(&ssid).await {
        Ok(Some(target)) => target,
        Ok(None) => return ActivationOutcome::NoAccessPoint(ssid),
        Err(e) => {
            return ActivationOutcome::Failed {
                ssid,
                reason: e.to_string(),
            };
        }
    };

    info!("Connecting to '{ssid}'");
    match directory.activate(&profile, &target).await {
        Ok(()) => ActivationOutcome::Activated { ssid, profile },
        Err(e) => ActivationOutcome::Failed {
            ssid,
            reason: e.to_string(),
        },
    }
}
