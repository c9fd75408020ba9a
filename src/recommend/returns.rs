//! Potential-return estimates
//!
//! These tables are heuristics. They give a plausible payout band for display and
//! ranking; they are not derived from pool sizes and must never be presented as
//! guaranteed payouts.

use serde::{Deserialize, Serialize};

use crate::core::combinatorics::{BetType, WagerKind};
use crate::models::{ReturnRange, Tier};

/// Multipliers applied to a bet's cost and to the odds of its horses
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReturnMultiplier {
    pub low: f64,
    pub high: f64,
}

const fn m(low: f64, high: f64) -> ReturnMultiplier {
    ReturnMultiplier { low, high }
}

/// Exotic return multipliers per tier (1, 2, 3). Estimates only.
pub const EXACTA_RETURNS: [ReturnMultiplier; 3] = [m(0.4, 1.2), m(0.5, 1.6), m(0.6, 2.2)];
pub const QUINELLA_RETURNS: [ReturnMultiplier; 3] = [m(0.3, 0.8), m(0.35, 1.1), m(0.4, 1.5)];
pub const TRIFECTA_RETURNS: [ReturnMultiplier; 3] = [m(0.6, 2.5), m(0.8, 3.5), m(1.0, 5.0)];
pub const SUPERFECTA_RETURNS: [ReturnMultiplier; 3] = [m(1.5, 6.0), m(2.0, 9.0), m(2.5, 14.0)];

/// Share of the win profit a place ticket typically returns (low, high)
pub const PLACE_PROFIT_SHARE: ReturnMultiplier = m(0.25, 0.5);

/// Share of the win profit a show ticket typically returns (low, high)
pub const SHOW_PROFIT_SHARE: ReturnMultiplier = m(0.12, 0.3);

/// Look up the exotic multiplier for a tier and pool
pub fn exotic_multiplier(tier: Tier, kind: WagerKind) -> Option<ReturnMultiplier> {
    let table = match kind {
        WagerKind::Exacta => EXACTA_RETURNS,
        WagerKind::Quinella => QUINELLA_RETURNS,
        WagerKind::Trifecta => TRIFECTA_RETURNS,
        WagerKind::Superfecta => SUPERFECTA_RETURNS,
        WagerKind::Win | WagerKind::Place | WagerKind::Show => return None,
    };
    Some(tier.pick(table))
}

/// Estimate the return band for a bet
///
/// * win: `stake * odds` (the tote pays exactly this at post-time odds)
/// * place/show: stake back plus a share of the win profit
/// * exotics: `cost * low * min_odds` to `cost * high * max_odds`
pub fn estimate_return(
    tier: Tier,
    bet_type: BetType,
    total_cost: f64,
    min_odds: f64,
    max_odds: f64,
) -> ReturnRange {
    match bet_type.kind {
        WagerKind::Win => ReturnRange::new(total_cost * min_odds, total_cost * max_odds),
        WagerKind::Place => straight_share(total_cost, min_odds, max_odds, PLACE_PROFIT_SHARE),
        WagerKind::Show => straight_share(total_cost, min_odds, max_odds, SHOW_PROFIT_SHARE),
        kind => match exotic_multiplier(tier, kind) {
            Some(mult) => ReturnRange::new(
                total_cost * mult.low * min_odds,
                total_cost * mult.high * max_odds,
            ),
            None => ReturnRange::default(),
        },
    }
}

fn straight_share(stake: f64, min_odds: f64, max_odds: f64, share: ReturnMultiplier) -> ReturnRange {
    ReturnRange::new(
        stake * (1.0 + (min_odds - 1.0) * share.low),
        stake * (1.0 + (max_odds - 1.0) * share.high),
    )
}
