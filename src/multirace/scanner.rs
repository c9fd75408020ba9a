//! Multi-race window scanner
//!
//! Every run of consecutive races long enough for a sequence bet is scored on
//! how many value plays it holds and how many combinations it would roughly
//! need:
//!
//! ```text
//! estimate = Π weight(race)      Singleable 1.0, Competitive 2.5, WideOpen 3.5
//!
//! PRIME:    value plays >= 2, singleable >= 1, estimate <= prime ceiling
//! GOOD:     value plays >= 1, estimate <= good ceiling
//! MARGINAL: everything else (hidden unless expert mode)
//! ```
//!
//! The estimate is only a classification proxy. The ticket builder counts the
//! real combinations of the legs it actually picks.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::signals::{extract_signal, RaceSignal};
use crate::config::MultiRaceSettings;
use crate::error::EngineError;
use crate::models::RaceCard;

/// Sequence (multi-race) bet types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SequenceType {
    DailyDouble,
    Pick3,
    Pick4,
    Pick5,
    Pick6,
}

impl SequenceType {
    pub fn all() -> [SequenceType; 5] {
        [
            SequenceType::DailyDouble,
            SequenceType::Pick3,
            SequenceType::Pick4,
            SequenceType::Pick5,
            SequenceType::Pick6,
        ]
    }

    pub fn legs(self) -> usize {
        match self {
            SequenceType::DailyDouble => 2,
            SequenceType::Pick3 => 3,
            SequenceType::Pick4 => 4,
            SequenceType::Pick5 => 5,
            SequenceType::Pick6 => 6,
        }
    }

    /// Base denomination per combination
    pub fn cost_per_combination(self) -> f64 {
        match self {
            SequenceType::DailyDouble => 1.0,
            SequenceType::Pick3 | SequenceType::Pick4 | SequenceType::Pick5 => 0.5,
            SequenceType::Pick6 => 0.2,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            SequenceType::DailyDouble => "DAILY DOUBLE",
            SequenceType::Pick3 => "PICK 3",
            SequenceType::Pick4 => "PICK 4",
            SequenceType::Pick5 => "PICK 5",
            SequenceType::Pick6 => "PICK 6",
        }
    }

    /// Largest scan estimate a PRIME window may carry
    pub fn prime_ceiling(self) -> f64 {
        match self {
            SequenceType::DailyDouble => 9.0,
            SequenceType::Pick3 => 30.0,
            SequenceType::Pick4 => 60.0,
            SequenceType::Pick5 => 120.0,
            SequenceType::Pick6 => 250.0,
        }
    }

    /// Largest scan estimate a GOOD window may carry
    pub fn good_ceiling(self) -> f64 {
        match self {
            SequenceType::DailyDouble => 16.0,
            SequenceType::Pick3 => 60.0,
            SequenceType::Pick4 => 150.0,
            SequenceType::Pick5 => 300.0,
            SequenceType::Pick6 => 600.0,
        }
    }
}

/// Window quality, best first
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Quality {
    Prime,
    Good,
    Marginal,
}

impl Quality {
    pub fn label(self) -> &'static str {
        match self {
            Quality::Prime => "PRIME",
            Quality::Good => "GOOD",
            Quality::Marginal => "MARGINAL",
        }
    }
}

/// A value play inside a window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValuePlayRef {
    pub race_number: u8,
    pub program_number: u8,
    pub edge_percent: f64,
}

/// A candidate sequence window
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiRaceOpportunity {
    pub bet_type: SequenceType,
    pub races: Vec<u8>,
    /// Index of the first leg in the card's race list
    pub start_index: usize,
    pub quality: Quality,
    pub value_play_count: usize,
    pub value_plays: Vec<ValuePlayRef>,
    pub singleable_count: usize,
    /// Scan proxy, not the ticket's combination count
    pub estimated_combinations: f64,
    pub reasoning: String,
}

impl MultiRaceOpportunity {
    pub fn overlaps(&self, races: &HashSet<u8>) -> bool {
        self.races.iter().any(|r| races.contains(r))
    }

    pub fn race_span(&self) -> String {
        match (self.races.first(), self.races.last()) {
            (Some(first), Some(last)) => format!("{}-{}", first, last),
            _ => String::new(),
        }
    }
}

/// Product of openness weights across a window
pub fn estimate_combinations(signals: &[RaceSignal]) -> f64 {
    signals.iter().map(|s| s.openness.weight()).product()
}

pub fn classify_quality(
    bet_type: SequenceType,
    value_plays: usize,
    singleable: usize,
    estimate: f64,
) -> Quality {
    if value_plays >= 2 && singleable >= 1 && estimate <= bet_type.prime_ceiling() {
        Quality::Prime
    } else if value_plays >= 1 && estimate <= bet_type.good_ceiling() {
        Quality::Good
    } else {
        Quality::Marginal
    }
}

/// A window needs consecutive race numbers and at least two starters per race
fn is_valid_window(signals: &[RaceSignal]) -> bool {
    signals.iter().all(|s| s.starters >= 2)
        && signals
            .windows(2)
            .all(|w| w[0].race_number.checked_add(1) == Some(w[1].race_number))
}

fn reasoning(
    value_plays: &[ValuePlayRef],
    singleable: usize,
    estimate: f64,
    quality: Quality,
) -> String {
    let plays = if value_plays.is_empty() {
        "no value plays".to_string()
    } else {
        let list = value_plays
            .iter()
            .map(|v| format!("R{} #{} +{:.0}%", v.race_number, v.program_number, v.edge_percent))
            .collect::<Vec<_>>()
            .join(", ");
        let noun = if value_plays.len() == 1 { "play" } else { "plays" };
        format!("{} value {} ({})", value_plays.len(), noun, list)
    };
    format!(
        "{}: {}, {} singleable, ~{:.0} combinations",
        quality.label(),
        plays,
        singleable,
        estimate
    )
}

/// Enumerate every valid window of every sequence type, unfiltered and unranked
pub fn scan_windows(card: &RaceCard, settings: &MultiRaceSettings) -> Vec<MultiRaceOpportunity> {
    let signals: Vec<RaceSignal> = card
        .races
        .iter()
        .map(|r| extract_signal(r, settings))
        .collect();

    let mut opportunities = Vec::new();
    for bet_type in SequenceType::all() {
        let legs = bet_type.legs();
        if signals.len() < legs {
            continue;
        }

        for start in 0..=signals.len() - legs {
            let window = &signals[start..start + legs];
            if !is_valid_window(window) {
                continue;
            }

            let value_plays: Vec<ValuePlayRef> = window
                .iter()
                .filter_map(|s| {
                    s.value_play.map(|program_number| ValuePlayRef {
                        race_number: s.race_number,
                        program_number,
                        edge_percent: s.value_edge_percent,
                    })
                })
                .collect();
            let singleable = window.iter().filter(|s| s.singleable).count();
            let estimate = estimate_combinations(window);
            let quality = classify_quality(bet_type, value_plays.len(), singleable, estimate);

            debug!(
                bet = bet_type.name(),
                start,
                value_plays = value_plays.len(),
                singleable,
                estimate,
                quality = quality.label(),
                "window scanned"
            );

            opportunities.push(MultiRaceOpportunity {
                bet_type,
                races: window.iter().map(|s| s.race_number).collect(),
                start_index: start,
                quality,
                value_play_count: value_plays.len(),
                reasoning: reasoning(&value_plays, singleable, estimate, quality),
                value_plays,
                singleable_count: singleable,
                estimated_combinations: estimate,
            });
        }
    }

    opportunities
}

/// Sort best first: quality, value plays desc, start index asc, legs asc
pub fn rank_opportunities(opportunities: &mut [MultiRaceOpportunity]) {
    opportunities.sort_by(|a, b| {
        a.quality
            .cmp(&b.quality)
            .then(b.value_play_count.cmp(&a.value_play_count))
            .then(a.start_index.cmp(&b.start_index))
            .then(a.bet_type.legs().cmp(&b.bet_type.legs()))
    });
}

/// Keep the best window of each type and drop later same-type windows that
/// reuse any of its races
///
/// Expects ranked input. Different types may overlap freely.
pub fn deduplicate(opportunities: Vec<MultiRaceOpportunity>) -> Vec<MultiRaceOpportunity> {
    let mut claimed: HashMap<SequenceType, HashSet<u8>> = HashMap::new();
    let mut kept = Vec::new();

    for opp in opportunities {
        let races = claimed.entry(opp.bet_type).or_default();
        if opp.overlaps(races) {
            debug!(
                bet = opp.bet_type.name(),
                races = %opp.race_span(),
                "overlapping window dropped"
            );
            continue;
        }
        races.extend(opp.races.iter().copied());
        kept.push(opp);
    }

    kept
}

/// Scan, filter, rank and de-duplicate a card's sequence windows
pub fn find_opportunities(
    card: &RaceCard,
    settings: &MultiRaceSettings,
) -> Result<Vec<MultiRaceOpportunity>, EngineError> {
    if card.races.is_empty() {
        return Err(EngineError::EmptyCard);
    }

    let mut opportunities: Vec<MultiRaceOpportunity> = scan_windows(card, settings)
        .into_iter()
        .filter(|o| settings.expert_mode || o.quality != Quality::Marginal)
        .collect();
    rank_opportunities(&mut opportunities);
    let kept = deduplicate(opportunities);

    info!(
        races = card.races.len(),
        opportunities = kept.len(),
        "multi-race scan complete"
    );
    Ok(kept)
}
