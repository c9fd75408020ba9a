//! Sequence ticket construction and budget fitting

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::payout::estimate_payout;
use super::scanner::{find_opportunities, MultiRaceOpportunity, Quality, SequenceType};
use super::signals::{extract_signal, RaceSignal};
use crate::config::{MultiRaceSettings, RiskStyle};
use crate::core::instruction::format_money;
use crate::error::EngineError;
use crate::models::{
    round_cents, BankrollState, HorseCandidate, RaceAnalysis, RaceCard, ReturnRange,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum LegStrategy {
    Single,
    Spread,
}

/// A horse on a leg
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LegSelection {
    pub program_number: u8,
    pub decimal_odds: f64,
    pub is_value_play: bool,
}

impl LegSelection {
    fn from_horse(horse: &HorseCandidate, value_play: Option<u8>) -> Self {
        Self {
            program_number: horse.program_number,
            decimal_odds: horse.decimal_odds,
            is_value_play: value_play == Some(horse.program_number),
        }
    }
}

/// One race of a sequence ticket
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiRaceLeg {
    pub race_number: u8,
    /// Best first; a value play is always first
    pub horses: Vec<LegSelection>,
    pub strategy: LegStrategy,
    pub has_value_play: bool,
}

impl MultiRaceLeg {
    pub fn size(&self) -> usize {
        self.horses.len()
    }

    pub fn program_numbers(&self) -> Vec<u8> {
        self.horses.iter().map(|h| h.program_number).collect()
    }

    pub fn is_trimmable(&self) -> bool {
        self.strategy == LegStrategy::Spread && self.horses.len() > 1
    }

    /// Copy of the leg without its lowest-ranked horse
    fn trimmed(&self) -> Self {
        let mut horses = self.horses.clone();
        horses.pop();
        Self {
            horses,
            ..self.clone()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TicketConfidence {
    High,
    Medium,
    Low,
}

impl TicketConfidence {
    pub fn from_quality(quality: Quality) -> Self {
        match quality {
            Quality::Prime => TicketConfidence::High,
            Quality::Good => TicketConfidence::Medium,
            Quality::Marginal => TicketConfidence::Low,
        }
    }

    pub fn downgrade(self) -> Self {
        match self {
            TicketConfidence::High => TicketConfidence::Medium,
            TicketConfidence::Medium | TicketConfidence::Low => TicketConfidence::Low,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TicketConfidence::High => "HIGH",
            TicketConfidence::Medium => "MEDIUM",
            TicketConfidence::Low => "LOW",
        }
    }
}

/// A costed sequence ticket
///
/// Totals are always derived from the legs:
/// `total_combinations = Π leg sizes`, `total_cost = total_combinations * cost_per_combination`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MultiRaceTicket {
    pub bet_type: SequenceType,
    pub quality: Quality,
    pub legs: Vec<MultiRaceLeg>,
    pub total_combinations: u64,
    pub cost_per_combination: f64,
    pub total_cost: f64,
    /// Heuristic estimate, not a guaranteed payout
    pub estimated_payout: ReturnRange,
    pub confidence: TicketConfidence,
    pub is_valid: bool,
    pub warnings: Vec<String>,
    /// Horses removed to fit the budget
    pub trim_steps: usize,
    pub script: String,
}

impl MultiRaceTicket {
    fn price(
        bet_type: SequenceType,
        quality: Quality,
        legs: Vec<MultiRaceLeg>,
        settings: &MultiRaceSettings,
    ) -> Self {
        let total_combinations = legs.iter().map(|l| l.size() as u64).product::<u64>();
        let cost_per_combination = bet_type.cost_per_combination();
        let total_cost = round_cents(total_combinations as f64 * cost_per_combination);

        let selected_odds: Vec<f64> = legs
            .iter()
            .flat_map(|l| l.horses.iter().map(|h| h.decimal_odds))
            .collect();
        let estimated_payout =
            estimate_payout(bet_type, cost_per_combination, &selected_odds, settings);

        let script = render_script(bet_type, &legs, total_cost, total_combinations);

        Self {
            bet_type,
            quality,
            legs,
            total_combinations,
            cost_per_combination,
            total_cost,
            estimated_payout,
            confidence: TicketConfidence::from_quality(quality),
            is_valid: true,
            warnings: Vec::new(),
            trim_steps: 0,
            script,
        }
    }

    pub fn races(&self) -> Vec<u8> {
        self.legs.iter().map(|l| l.race_number).collect()
    }

    pub fn single_count(&self) -> usize {
        self.legs
            .iter()
            .filter(|l| l.strategy == LegStrategy::Single)
            .count()
    }
}

/// Window script for a ticket
///
/// ```text
/// $0.50 PICK 4, RACES 3-6
/// RACE 3: 5
/// RACE 4: 1, 4, 7
/// RACE 5: 2, 6
/// RACE 6: 8, 3
/// TOTAL $6 (12 COMBINATIONS)
/// ```
pub fn render_script(
    bet_type: SequenceType,
    legs: &[MultiRaceLeg],
    total_cost: f64,
    total_combinations: u64,
) -> String {
    let span = match (legs.first(), legs.last()) {
        (Some(first), Some(last)) => format!("{}-{}", first.race_number, last.race_number),
        _ => String::new(),
    };

    let mut lines = vec![format!(
        "{} {}, RACES {}",
        format_money(bet_type.cost_per_combination()),
        bet_type.name(),
        span
    )];
    for leg in legs {
        let horses = leg
            .program_numbers()
            .iter()
            .map(|h| h.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        lines.push(format!("RACE {}: {}", leg.race_number, horses));
    }
    let noun = if total_combinations == 1 {
        "COMBINATION"
    } else {
        "COMBINATIONS"
    };
    lines.push(format!(
        "TOTAL {} ({} {})",
        format_money(total_cost),
        total_combinations,
        noun
    ));
    lines.join("\n")
}

/// Inclusive spread size bounds for a risk style
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpreadBounds {
    pub min: usize,
    pub max: usize,
}

pub fn spread_bounds(style: RiskStyle) -> SpreadBounds {
    match style {
        RiskStyle::Safe => SpreadBounds { min: 3, max: 5 },
        RiskStyle::Balanced => SpreadBounds { min: 2, max: 4 },
        RiskStyle::Aggressive => SpreadBounds { min: 2, max: 3 },
    }
}

/// Whether a leg may be singled under a risk style
pub fn allows_single(style: RiskStyle, signal: &RaceSignal) -> bool {
    match style {
        RiskStyle::Safe => false,
        RiskStyle::Balanced => signal.singleable,
        RiskStyle::Aggressive => signal.has_value_play,
    }
}

fn build_leg(
    race: &RaceAnalysis,
    style: RiskStyle,
    settings: &MultiRaceSettings,
) -> Result<MultiRaceLeg, EngineError> {
    let signal = extract_signal(race, settings);
    let ranked = race.ranked_starters();
    if ranked.is_empty() {
        return Err(EngineError::FieldTooSmall {
            required: 1,
            available: 0,
        });
    }

    let value_horse = signal
        .value_play
        .and_then(|no| ranked.iter().find(|h| h.program_number == no).copied());

    if allows_single(style, &signal) {
        if let Some(horse) = value_horse {
            debug!(race = race.race_number, horse = horse.program_number, "leg singled");
            return Ok(MultiRaceLeg {
                race_number: race.race_number,
                horses: vec![LegSelection::from_horse(horse, signal.value_play)],
                strategy: LegStrategy::Single,
                has_value_play: true,
            });
        }
    }

    let bounds = spread_bounds(style);
    let contenders = ranked
        .iter()
        .filter(|h| h.win_probability >= settings.contender_probability)
        .count();
    let size = contenders
        .clamp(bounds.min, bounds.max)
        .min(ranked.len())
        .max(1);

    let mut chosen: Vec<&HorseCandidate> = Vec::with_capacity(size);
    if let Some(horse) = value_horse {
        chosen.push(horse);
    }
    for &horse in &ranked {
        if chosen.len() >= size {
            break;
        }
        if Some(horse.program_number) != signal.value_play {
            chosen.push(horse);
        }
    }

    debug!(
        race = race.race_number,
        contenders,
        size = chosen.len(),
        "leg spread"
    );

    Ok(MultiRaceLeg {
        race_number: race.race_number,
        horses: chosen
            .into_iter()
            .map(|h| LegSelection::from_horse(h, signal.value_play))
            .collect(),
        strategy: LegStrategy::Spread,
        has_value_play: value_horse.is_some(),
    })
}

/// Build the untrimmed ticket for an opportunity
pub fn construct_ticket(
    opportunity: &MultiRaceOpportunity,
    card: &RaceCard,
    style: RiskStyle,
    settings: &MultiRaceSettings,
) -> Result<MultiRaceTicket, EngineError> {
    let legs = opportunity
        .races
        .iter()
        .map(|no| {
            let race = card.race(*no).ok_or(EngineError::RaceNotFound(*no))?;
            build_leg(race, style, settings)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(MultiRaceTicket::price(
        opportunity.bet_type,
        opportunity.quality,
        legs,
        settings,
    ))
}

/// Trim a ticket until it fits the budget
///
/// Each step drops the last horse of the largest SPREAD leg that still has more
/// than one horse, taking the earliest leg on ties. SINGLE legs are never
/// touched. The loop is capped at the ticket's total horse count. A ticket that
/// still does not fit comes back marked invalid with a warning, with every
/// SPREAD leg down to one horse. A non-finite budget is rejected untrimmed.
pub fn fit_to_budget(
    ticket: &MultiRaceTicket,
    budget: f64,
    settings: &MultiRaceSettings,
) -> MultiRaceTicket {
    if !budget.is_finite() {
        let mut rejected = ticket.clone();
        rejected.is_valid = false;
        rejected.warnings.push(
            EngineError::BudgetTooSmall {
                cost: ticket.total_cost,
                budget,
            }
            .to_string(),
        );
        warn!(bet = ticket.bet_type.name(), budget, "no budget for ticket");
        return rejected;
    }

    let step_cap: usize = ticket.legs.iter().map(|l| l.size()).sum();
    let mut current = ticket.clone();
    let mut steps = 0;

    while current.total_cost > budget && steps < step_cap {
        // max_by keeps the last maximum, so compare on reversed index
        let target = current
            .legs
            .iter()
            .enumerate()
            .filter(|(_, leg)| leg.is_trimmable())
            .max_by(|(ia, a), (ib, b)| a.size().cmp(&b.size()).then(ib.cmp(ia)))
            .map(|(i, _)| i);

        let Some(index) = target else {
            break;
        };

        let mut legs = current.legs.clone();
        legs[index] = legs[index].trimmed();
        steps += 1;

        let next = MultiRaceTicket::price(current.bet_type, current.quality, legs, settings);
        debug!(
            bet = next.bet_type.name(),
            race = next.legs[index].race_number,
            step = steps,
            cost = next.total_cost,
            budget,
            "trimmed leg"
        );
        current = next;
    }

    current.trim_steps = ticket.trim_steps + steps;
    current.warnings = ticket.warnings.clone();
    if current.trim_steps > 0 {
        current.confidence = TicketConfidence::from_quality(current.quality).downgrade();
        current.warnings.push(format!(
            "trimmed {} horse(s) to fit ${:.2} budget",
            steps, budget
        ));
    }

    if current.total_cost > budget {
        current.is_valid = false;
        current.warnings.push(
            EngineError::BudgetTooSmall {
                cost: current.total_cost,
                budget,
            }
            .to_string(),
        );
        warn!(
            bet = current.bet_type.name(),
            cost = current.total_cost,
            budget,
            "ticket does not fit budget"
        );
    }

    current
}

/// Construct and fit a ticket for one opportunity
pub fn build_ticket(
    opportunity: &MultiRaceOpportunity,
    card: &RaceCard,
    budget: f64,
    style: RiskStyle,
    settings: &MultiRaceSettings,
) -> Result<MultiRaceTicket, EngineError> {
    let ticket = construct_ticket(opportunity, card, style, settings)?;
    Ok(fit_to_budget(&ticket, budget, settings))
}

/// Scan the card and build a ticket for every surviving opportunity, best first
///
/// Each ticket is an alternative sized against the whole budget.
pub fn build_best_tickets(
    card: &RaceCard,
    budget: f64,
    style: RiskStyle,
    settings: &MultiRaceSettings,
) -> Result<Vec<MultiRaceTicket>, EngineError> {
    find_opportunities(card, settings)?
        .iter()
        .map(|opp| build_ticket(opp, card, budget, style, settings))
        .collect()
}

/// Tickets for a session: today's remaining budget at the state's risk tolerance
pub fn build_tickets_for_bankroll(
    card: &RaceCard,
    state: &BankrollState,
    settings: &MultiRaceSettings,
) -> Result<Vec<MultiRaceTicket>, EngineError> {
    build_best_tickets(card, state.available_budget(), state.risk_tolerance, settings)
}
