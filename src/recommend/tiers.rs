//! Tier classification of a scored field

use crate::config::TierSettings;
use crate::models::{HorseCandidate, Tier};

/// Classify a confidence score into a tier
pub fn classify_tier(score: f64, settings: &TierSettings) -> Tier {
    if score >= settings.high_threshold {
        Tier::One
    } else if score >= settings.mid_threshold {
        Tier::Two
    } else {
        Tier::Three
    }
}

/// Non-scratched starters with their tiers, best score first
#[derive(Debug, Clone)]
pub struct TieredField<'a> {
    starters: Vec<(&'a HorseCandidate, Tier)>,
}

impl<'a> TieredField<'a> {
    /// Classify every starter from its score
    ///
    /// A tier supplied by the scorer is ignored; the engine's own thresholds
    /// decide, so the same scores always land in the same tiers.
    pub fn classify(horses: &'a [HorseCandidate], settings: &TierSettings) -> Self {
        let mut starters: Vec<(&HorseCandidate, Tier)> = horses
            .iter()
            .filter(|h| !h.scratched)
            .map(|h| (h, classify_tier(h.score, settings)))
            .collect();

        starters.sort_by(|a, b| {
            b.0.score
                .total_cmp(&a.0.score)
                .then(a.0.program_number.cmp(&b.0.program_number))
        });

        Self { starters }
    }

    pub fn starter_count(&self) -> usize {
        self.starters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.starters.is_empty()
    }

    /// Horses in a tier, best score first
    pub fn tier_horses(&self, tier: Tier) -> Vec<&'a HorseCandidate> {
        self.starters
            .iter()
            .filter(|(_, t)| *t == tier)
            .map(|(h, _)| *h)
            .collect()
    }

    pub fn tier_of(&self, program_number: u8) -> Option<Tier> {
        self.starters
            .iter()
            .find(|(h, _)| h.program_number == program_number)
            .map(|(_, t)| *t)
    }

    /// Horses to build a tier's bets from: the tier's own horses first, then the
    /// rest of the field by score
    ///
    /// Empty when the tier has no horses.
    pub fn selection_for(&self, tier: Tier) -> Vec<&'a HorseCandidate> {
        let mut selection = self.tier_horses(tier);
        if selection.is_empty() {
            return selection;
        }
        selection.extend(
            self.starters
                .iter()
                .filter(|(_, t)| *t != tier)
                .map(|(h, _)| *h),
        );
        selection
    }

    pub fn starters(&self) -> impl Iterator<Item = &'a HorseCandidate> + '_ {
        self.starters.iter().map(|(h, _)| *h)
    }
}
