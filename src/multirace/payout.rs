//! Sequence payout estimates
//!
//! Heuristic only. Sequence pools pay whatever the pool holds after takeout;
//! these bands just give a plausible order of magnitude for display.
//!
//! ```text
//! payout = base[type] * denomination * longshot_multiplier[count] * (1.5 if avg odds high)
//! ```

use super::scanner::SequenceType;
use crate::config::MultiRaceSettings;
use crate::models::ReturnRange;

/// Base payout band per $1 of a winning combination, per sequence type. Estimates.
pub const BASE_PAYOUT_PER_DOLLAR: [(SequenceType, f64, f64); 5] = [
    (SequenceType::DailyDouble, 10.0, 40.0),
    (SequenceType::Pick3, 40.0, 250.0),
    (SequenceType::Pick4, 150.0, 1200.0),
    (SequenceType::Pick5, 500.0, 5000.0),
    (SequenceType::Pick6, 1500.0, 30000.0),
];

/// Multiplier by number of longshot selections (0, 1, 2, 3+). Estimates.
pub const LONGSHOT_MULTIPLIERS: [f64; 4] = [1.0, 1.8, 3.0, 5.0];

/// Extra scaling when the average selected odds are high
pub const HIGH_AVERAGE_ODDS_MULTIPLIER: f64 = 1.5;

pub fn base_payout(bet_type: SequenceType) -> ReturnRange {
    BASE_PAYOUT_PER_DOLLAR
        .iter()
        .find(|(t, _, _)| *t == bet_type)
        .map(|(_, low, high)| ReturnRange::new(*low, *high))
        .unwrap_or_default()
}

pub fn longshot_multiplier(longshots: usize) -> f64 {
    LONGSHOT_MULTIPLIERS[longshots.min(LONGSHOT_MULTIPLIERS.len() - 1)]
}

/// Estimate a ticket's payout band from the decimal odds of every selected horse
pub fn estimate_payout(
    bet_type: SequenceType,
    denomination: f64,
    selected_odds: &[f64],
    settings: &MultiRaceSettings,
) -> ReturnRange {
    let longshots = selected_odds
        .iter()
        .filter(|o| **o >= settings.longshot_odds)
        .count();

    let mut factor = denomination * longshot_multiplier(longshots);

    if !selected_odds.is_empty() {
        let average = selected_odds.iter().sum::<f64>() / selected_odds.len() as f64;
        if average >= settings.high_average_odds {
            factor *= HIGH_AVERAGE_ODDS_MULTIPLIER;
        }
    }

    base_payout(bet_type).scale(factor)
}
