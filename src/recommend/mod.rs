//! Single-race recommendations
//!
//! Horses are split into three tiers by confidence score. Each tier gets a menu
//! of straight and exotic bets:
//!
//! ```text
//! Tier 1 (score >= 80): win, place, exacta key/box, trifecta key
//! Tier 2 (score >= 60): win, place, exacta box, trifecta box, quinella box
//! Tier 3 (below 60):    win, show, exacta wheel, trifecta box, superfecta box
//! ```

pub mod generator;
pub mod returns;
pub mod tiers;

pub use generator::{
    BetCandidate, MenuShape, RecommendationGenerator, SpecialCategory, TierGroup,
    TierRecommendations,
};
pub use returns::estimate_return;
pub use tiers::{classify_tier, TieredField};
