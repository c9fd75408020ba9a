//! Per-race signals for the window scan

use serde::{Deserialize, Serialize};

use crate::config::MultiRaceSettings;
use crate::models::{RaceAnalysis, Verdict};

/// How open a race looks to the model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RaceOpenness {
    /// One horse can carry the leg
    Singleable,
    Competitive,
    /// No horse above the wide-open probability
    WideOpen,
}

impl RaceOpenness {
    /// Rough number of horses the leg will need, used only for scan estimates
    pub fn weight(self) -> f64 {
        match self {
            RaceOpenness::Singleable => 1.0,
            RaceOpenness::Competitive => 2.5,
            RaceOpenness::WideOpen => 3.5,
        }
    }
}

/// What the scanner needs to know about one race
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceSignal {
    pub race_number: u8,
    pub starters: usize,
    pub has_value_play: bool,
    pub singleable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value_play: Option<u8>,
    pub value_edge_percent: f64,
    pub openness: RaceOpenness,
}

/// Extract the scan signal for a race
///
/// A value play needs the analysis to flag one, an edge of at least
/// `min_value_edge` and a verdict other than PASS. Singleable is stricter: the
/// edge must reach `singleable_edge` and the verdict must be BET.
pub fn extract_signal(race: &RaceAnalysis, settings: &MultiRaceSettings) -> RaceSignal {
    let analysis = race.value_analysis(settings.min_value_edge);

    let primary = analysis
        .primary
        .as_ref()
        .filter(|p| race.horse(p.program_number).is_some_and(|h| !h.scratched));
    let edge = primary.map_or(0.0, |p| p.edge_percent);

    let has_value_play = analysis.has_value_play
        && primary.is_some()
        && edge >= settings.min_value_edge
        && analysis.verdict != Verdict::Pass;
    let singleable =
        has_value_play && edge >= settings.singleable_edge && analysis.verdict == Verdict::Bet;

    let top_probability = race
        .starters()
        .map(|h| h.win_probability)
        .fold(0.0, f64::max);

    let openness = if singleable {
        RaceOpenness::Singleable
    } else if top_probability < settings.wide_open_probability {
        RaceOpenness::WideOpen
    } else {
        RaceOpenness::Competitive
    };

    RaceSignal {
        race_number: race.race_number,
        starters: race.starter_count(),
        has_value_play,
        singleable,
        value_play: if has_value_play {
            primary.map(|p| p.program_number)
        } else {
            None
        },
        value_edge_percent: if has_value_play { edge } else { 0.0 },
        openness,
    }
}
