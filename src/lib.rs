//! Parimutuel - wagering decision engine
//!
//! This library provides:
//! - Kelly criterion bet sizing (full and fractional)
//! - Exotic combination counts, costs and window instructions
//! - Tiered single-race bet recommendations
//! - Multi-race (double, pick 3-6) opportunity scanning and ticket building
//!
//! Everything is pure computation: the same inputs always give the same
//! outputs, and bad numbers come back as refusals carrying a reason instead of
//! errors.
//!
//! # Example
//!
//! ```no_run
//! use parimutuel::config::KellySettings;
//! use parimutuel::core::kelly::KellySizer;
//! use parimutuel::core::combinatorics::{combinations, BetType, WagerKind};
//!
//! // Quarter Kelly on a 25% shot at 5-1
//! let sizer = KellySizer::new(KellySettings::default());
//! let sizing = sizer.size(0.25, 6.0, 1000.0);
//! println!("Recommended stake: {}", sizing.optimal_bet_size);
//!
//! // Trifecta box of five
//! let combos = combinations(BetType::boxed(WagerKind::Trifecta), 5);
//! assert_eq!(combos, Some(60));
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod multirace;
pub mod recommend;

// Re-export commonly used types
pub use config::{
    EngineConfig, KellyFraction, KellySettings, MultiRaceSettings, RiskStyle, TierSettings,
};
pub use error::EngineError;
pub use models::{
    BankrollState, HorseCandidate, RaceAnalysis, RaceCard, ReturnRange, Tier, ValueAnalysis,
    Verdict,
};
pub use multirace::{MultiRaceOpportunity, MultiRaceTicket};
pub use recommend::{BetCandidate, RecommendationGenerator, TierRecommendations};
