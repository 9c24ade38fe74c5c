//! Candidate ranking.
//!
//! Orders visible access points best-first. Keys, in precedence order:
//!
//! 1. Known networks before unknown ones.
//! 2. Higher signal strength.
//! 3. Higher band score, guessed from the SSID text (see [`band_score`]).
//!
//! The sort is stable, so entries equal on all three keys keep their scan
//! order. The measured frequency is not a key: two access points on
//! different bands but with the same name and strength stay in scan order.

use std::cmp::Reverse;

use crate::constants::band_score;
use crate::models::{AccessPointObservation, KnownNetworkSet, RankedList, Ssid};

/// Scores the band an SSID advertises in its name.
///
/// Non-UTF-8 names are scored on their lossy text form. Matching is
/// case-insensitive and checks the faster band first, so
/// `"Lab-5G-6GHz"` scores as 6 GHz.
///
/// | name contains              | score |
/// |----------------------------|-------|
/// | `6ghz`, `6g`               | 60    |
/// | `5ghz`, `5g`               | 50    |
/// | `2.4ghz`, `2ghz`, `2g`     | 24    |
/// | none of the above          | 0     |
pub fn band_score(ssid: &str) -> u8 {
    let name = ssid.to_lowercase();
    // "6ghz" and "5ghz" contain "6g" and "5g"; the short forms cover both.
    if name.contains("6g") {
        band_score::BAND_6
    } else if name.contains("5g") {
        band_score::BAND_5
    } else if name.contains("2.4ghz") || name.contains("2g") {
        band_score::BAND_2_4
    } else {
        band_score::UNKNOWN
    }
}

/// Ranks `observations` best-first.
///
/// An observation counts as known if it already carries `is_known` or its
/// SSID is in `known`; the returned entries have `is_known` set accordingly.
/// The currently connected SSID does not influence the order.
pub fn rank(
    observations: Vec<AccessPointObservation>,
    known: &KnownNetworkSet,
    _current_ssid: Option<&Ssid>,
) -> RankedList {
    let mut ranked: RankedList = observations
        .into_iter()
        .map(|mut obs| {
            obs.is_known = obs.is_known || known.contains(&obs.ssid);
            obs
        })
        .collect();

    ranked.sort_by_cached_key(|obs| {
        (
            Reverse(obs.is_known),
            Reverse(obs.strength),
            Reverse(band_score(&obs.ssid.to_string_lossy())),
        )
    });
    ranked
}
