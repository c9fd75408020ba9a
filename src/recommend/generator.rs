//! Tiered single-race bet generation
//!
//! Each tier has a fixed menu of bet shapes. A shape is built from the tier's
//! selection (tier horses first, then the rest of the field), sized with Kelly
//! for straight win bets and priced with the combinatorics calculator for
//! exotics. Shapes the field cannot support are dropped.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::returns::estimate_return;
use super::tiers::TieredField;
use crate::config::EngineConfig;
use crate::core::combinatorics::{guarded_combinations, BetType, Structure, WagerKind};
use crate::core::instruction::{render_instruction, render_race_instruction};
use crate::core::kelly::{KellyResult, KellySizer};
use crate::error::EngineError;
use crate::models::{
    round_cents, BankrollState, HorseCandidate, RaceAnalysis, ReturnRange, Tier,
};

/// A bet shape on a tier's menu
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "shape", rename_all = "snake_case")]
pub enum MenuShape {
    Win,
    Place,
    Show,
    /// Box the first `depth` horses of the selection
    Box { kind: WagerKind, depth: usize },
    /// Key the first horse over the next `depth - 1`
    Key { kind: WagerKind, depth: usize },
    /// Key the first horse with ALL
    Wheel { kind: WagerKind },
}

pub const TIER_ONE_MENU: [MenuShape; 5] = [
    MenuShape::Win,
    MenuShape::Place,
    MenuShape::Key {
        kind: WagerKind::Exacta,
        depth: 3,
    },
    MenuShape::Box {
        kind: WagerKind::Exacta,
        depth: 3,
    },
    MenuShape::Key {
        kind: WagerKind::Trifecta,
        depth: 4,
    },
];

pub const TIER_TWO_MENU: [MenuShape; 5] = [
    MenuShape::Win,
    MenuShape::Place,
    MenuShape::Box {
        kind: WagerKind::Exacta,
        depth: 4,
    },
    MenuShape::Box {
        kind: WagerKind::Trifecta,
        depth: 4,
    },
    MenuShape::Box {
        kind: WagerKind::Quinella,
        depth: 3,
    },
];

pub const TIER_THREE_MENU: [MenuShape; 5] = [
    MenuShape::Win,
    MenuShape::Show,
    MenuShape::Wheel {
        kind: WagerKind::Exacta,
    },
    MenuShape::Box {
        kind: WagerKind::Trifecta,
        depth: 5,
    },
    MenuShape::Box {
        kind: WagerKind::Superfecta,
        depth: 5,
    },
];

/// Exotic unit multiplier per tier, applied to the pool's customary unit
pub const EXOTIC_UNIT_MULTIPLIERS: [f64; 3] = [2.0, 1.0, 1.0];

pub fn menu_for(tier: Tier) -> &'static [MenuShape] {
    match tier {
        Tier::One => &TIER_ONE_MENU,
        Tier::Two => &TIER_TWO_MENU,
        Tier::Three => &TIER_THREE_MENU,
    }
}

/// Bets pulled out of the tier buckets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SpecialCategory {
    /// Overlay far above the market's price
    HighOverlay,
    /// Extreme longshot with a positive edge
    Nuclear,
}

/// A proposed wager
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BetCandidate {
    pub id: String,
    pub bet_type: BetType,
    pub tier: Tier,
    /// Key horse(s) first for keys and wheels
    pub horses: Vec<u8>,
    pub unit_stake: f64,
    pub combinations: u64,
    pub total_cost: f64,
    /// Heuristic estimate, not a guaranteed payout
    pub potential_return: ReturnRange,
    /// 0-100
    pub confidence: f64,
    pub edge_percent: f64,
    pub overlay_percent: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub special: Option<SpecialCategory>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kelly: Option<KellyResult>,
    pub instruction: String,
}

/// One tier's bets with aggregates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierGroup {
    pub tier: Tier,
    pub label: String,
    pub bets: Vec<BetCandidate>,
    pub total_investment: f64,
    /// Sum of the bets' estimated bands
    pub potential_return: ReturnRange,
}

impl TierGroup {
    fn from_bets(tier: Tier, mut bets: Vec<BetCandidate>) -> Self {
        sort_bets(&mut bets);
        let total_investment = round_cents(bets.iter().map(|b| b.total_cost).sum());
        let potential_return = bets
            .iter()
            .fold(ReturnRange::default(), |acc, b| acc.add(b.potential_return));
        Self {
            tier,
            label: tier.label().to_string(),
            bets,
            total_investment,
            potential_return,
        }
    }
}

/// Full single-race output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TierRecommendations {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub race_number: Option<u8>,
    pub tiers: Vec<TierGroup>,
    pub special: Vec<BetCandidate>,
    pub total_investment: f64,
    pub warnings: Vec<String>,
}

impl TierRecommendations {
    pub fn all_bets(&self) -> impl Iterator<Item = &BetCandidate> {
        self.tiers
            .iter()
            .flat_map(|g| g.bets.iter())
            .chain(self.special.iter())
    }

    pub fn is_empty(&self) -> bool {
        self.all_bets().next().is_none()
    }
}

/// Confidence desc, then edge desc, then id for a total order
fn sort_bets(bets: &mut [BetCandidate]) {
    bets.sort_by(|a, b| {
        b.confidence
            .total_cmp(&a.confidence)
            .then(b.edge_percent.total_cmp(&a.edge_percent))
            .then(a.id.cmp(&b.id))
    });
}

/// Generates tiered recommendations for a bankroll and configuration
#[derive(Debug, Clone)]
pub struct RecommendationGenerator {
    config: EngineConfig,
    bankroll: f64,
    sizer: KellySizer,
}

impl RecommendationGenerator {
    pub fn new(config: EngineConfig, bankroll: f64) -> Self {
        let sizer = KellySizer::new(config.kelly.clone());
        Self {
            config,
            bankroll,
            sizer,
        }
    }

    /// Generator for a session: Kelly settings and bankroll come from the state
    pub fn for_bankroll(config: EngineConfig, state: &BankrollState) -> Self {
        let config = EngineConfig {
            kelly: state.kelly.clone(),
            ..config
        };
        Self::new(config, state.current_bankroll)
    }

    pub fn bankroll(&self) -> f64 {
        self.bankroll
    }

    /// Recommendations for one race on a card
    pub fn generate_race(&self, race: &RaceAnalysis) -> TierRecommendations {
        self.generate(Some(race.race_number), &race.horses)
    }

    /// Recommendations for a scored field
    pub fn generate(&self, race_number: Option<u8>, horses: &[HorseCandidate]) -> TierRecommendations {
        let field = TieredField::classify(horses, &self.config.tiers);
        let mut warnings = Vec::new();

        if field.is_empty() {
            warnings.push(
                EngineError::FieldTooSmall {
                    required: 1,
                    available: 0,
                }
                .to_string(),
            );
            return TierRecommendations {
                race_number,
                tiers: Vec::new(),
                special: Vec::new(),
                total_investment: 0.0,
                warnings,
            };
        }

        let mut seen: HashSet<(BetType, Vec<u8>)> = HashSet::new();
        let mut tiers = Vec::new();
        let mut special = Vec::new();

        for tier in Tier::all() {
            if field.tier_horses(tier).is_empty() {
                continue;
            }

            let mut bets = Vec::new();
            for shape in menu_for(tier) {
                let Some(bet) = self.build_in(&field, race_number, tier, *shape) else {
                    continue;
                };
                if !seen.insert((bet.bet_type, canonical_horses(&bet))) {
                    continue;
                }
                if bet.special.is_some() {
                    special.push(bet);
                } else {
                    bets.push(bet);
                }
            }

            if !bets.is_empty() {
                tiers.push(TierGroup::from_bets(tier, bets));
            }
        }

        sort_bets(&mut special);

        let total_investment = round_cents(
            tiers.iter().map(|g| g.total_investment).sum::<f64>()
                + special.iter().map(|b| b.total_cost).sum::<f64>(),
        );

        TierRecommendations {
            race_number,
            tiers,
            special,
            total_investment,
            warnings,
        }
    }

    /// Build a single menu shape for a tier
    ///
    /// Returns `None` when the shape cannot be offered: too few starters for its
    /// depth, an empty tier, or a Kelly refusal on a win bet.
    pub fn build(
        &self,
        horses: &[HorseCandidate],
        race_number: Option<u8>,
        tier: Tier,
        shape: MenuShape,
    ) -> Option<BetCandidate> {
        let field = TieredField::classify(horses, &self.config.tiers);
        self.build_in(&field, race_number, tier, shape)
    }

    fn build_in(
        &self,
        field: &TieredField<'_>,
        race_number: Option<u8>,
        tier: Tier,
        shape: MenuShape,
    ) -> Option<BetCandidate> {
        let selection = field.selection_for(tier);
        let primary = *selection.first()?;
        let starters = field.starter_count();

        match shape {
            MenuShape::Win => self.straight(race_number, tier, WagerKind::Win, primary),
            MenuShape::Place => self.straight(race_number, tier, WagerKind::Place, primary),
            MenuShape::Show => self.straight(race_number, tier, WagerKind::Show, primary),
            MenuShape::Box { kind, depth } => {
                self.exotic(race_number, tier, BetType::boxed(kind), &selection, depth, starters, field)
            }
            MenuShape::Key { kind, depth } => {
                self.exotic(race_number, tier, BetType::key(kind), &selection, depth, starters, field)
            }
            MenuShape::Wheel { kind } => {
                self.exotic(race_number, tier, BetType::wheel(kind), &selection, 1, starters, field)
            }
        }
    }

    fn straight(
        &self,
        race_number: Option<u8>,
        tier: Tier,
        kind: WagerKind,
        horse: &HorseCandidate,
    ) -> Option<BetCandidate> {
        let base_stake = tier.pick(self.config.tiers.base_stakes);

        let (stake, kelly) = if kind == WagerKind::Win && self.config.kelly.enabled {
            let sizing = self
                .sizer
                .size(horse.win_probability, horse.decimal_odds, self.bankroll);
            if !sizing.should_bet {
                debug!(
                    horse = horse.program_number,
                    reason = sizing.reason.as_deref().unwrap_or(""),
                    "win bet suppressed by kelly"
                );
                return None;
            }
            (sizing.optimal_bet_size, Some(sizing))
        } else {
            (base_stake, None)
        };

        let bet_type = BetType::straight(kind);
        let horses = vec![horse.program_number];
        Some(self.candidate(
            race_number,
            tier,
            bet_type,
            horses,
            stake,
            1,
            &[horse],
            horse,
            kelly,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn exotic(
        &self,
        race_number: Option<u8>,
        tier: Tier,
        bet_type: BetType,
        selection: &[&HorseCandidate],
        depth: usize,
        starters: usize,
        field: &TieredField<'_>,
    ) -> Option<BetCandidate> {
        let combinations = match guarded_combinations(bet_type, depth, starters) {
            Ok(c) => c,
            Err(e) => {
                debug!(bet = %bet_type.label(), depth, starters, reason = %e, "shape dropped");
                return None;
            }
        };
        if selection.len() < depth {
            return None;
        }

        let chosen = &selection[..depth];
        let primary = chosen[0];
        let horses: Vec<u8> = chosen.iter().map(|h| h.program_number).collect();
        let unit = round_cents(
            bet_type.kind.default_unit_stake() * tier.pick(EXOTIC_UNIT_MULTIPLIERS),
        );

        // ALL covers the whole field, so its odds spread does too
        let involved: Vec<&HorseCandidate> = if bet_type.prices_over_field() {
            field.starters().collect()
        } else {
            chosen.to_vec()
        };

        Some(self.candidate(
            race_number,
            tier,
            bet_type,
            horses,
            unit,
            combinations,
            &involved,
            primary,
            None,
        ))
    }

    #[allow(clippy::too_many_arguments)]
    fn candidate(
        &self,
        race_number: Option<u8>,
        tier: Tier,
        bet_type: BetType,
        horses: Vec<u8>,
        unit_stake: f64,
        combinations: u64,
        involved: &[&HorseCandidate],
        primary: &HorseCandidate,
        kelly: Option<KellyResult>,
    ) -> BetCandidate {
        let total_cost = round_cents(combinations as f64 * unit_stake);

        let min_odds = involved
            .iter()
            .map(|h| h.decimal_odds)
            .fold(f64::INFINITY, f64::min);
        let max_odds = involved
            .iter()
            .map(|h| h.decimal_odds)
            .fold(f64::NEG_INFINITY, f64::max);
        let potential_return = estimate_return(tier, bet_type, total_cost, min_odds, max_odds);

        // Keys and wheels lean on the key horse; boxes on the whole group
        let confidence_horses: Vec<&HorseCandidate> = match bet_type.structure {
            Structure::Box => involved.to_vec(),
            _ => vec![primary],
        };
        let confidence = (confidence_horses.iter().map(|h| h.score).sum::<f64>()
            / confidence_horses.len() as f64)
            .clamp(0.0, 100.0);
        let confidence = (confidence * 10.0).round() / 10.0;

        let edge_percent = primary.edge_percent();
        let overlay_percent = primary.overlay_percent();
        let special = self.special_category(primary);

        let instruction = match race_number {
            Some(race) => render_race_instruction(race, bet_type, &horses, unit_stake),
            None => render_instruction(bet_type, &horses, unit_stake),
        };

        let id = format!(
            "t{}-{}-{}",
            tier.number(),
            bet_type.label().to_lowercase().replace(' ', "-"),
            horses
                .iter()
                .map(|h| h.to_string())
                .collect::<Vec<_>>()
                .join("-")
        );

        BetCandidate {
            id,
            bet_type,
            tier,
            horses,
            unit_stake,
            combinations,
            total_cost,
            potential_return,
            confidence,
            edge_percent,
            overlay_percent,
            special,
            kelly,
            instruction,
        }
    }

    fn special_category(&self, horse: &HorseCandidate) -> Option<SpecialCategory> {
        if horse.edge() <= 0.0 {
            return None;
        }
        if horse.is_longshot(self.config.tiers.nuclear_odds) {
            Some(SpecialCategory::Nuclear)
        } else if horse.overlay_percent() >= self.config.tiers.high_overlay_percent {
            Some(SpecialCategory::HighOverlay)
        } else {
            None
        }
    }
}

/// Order-insensitive bets compare on their sorted horses
fn canonical_horses(bet: &BetCandidate) -> Vec<u8> {
    let mut horses = bet.horses.clone();
    if bet.bet_type.structure == Structure::Box {
        horses.sort_unstable();
    }
    horses
}
