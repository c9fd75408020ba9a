//! Multi-race (sequence) opportunities and tickets
//!
//! Pipeline: per-race signals -> window scan -> rank and de-duplicate ->
//! ticket construction by risk style -> budget fitting.

pub mod payout;
pub mod scanner;
pub mod signals;
pub mod ticket;

pub use payout::estimate_payout;
pub use scanner::{
    find_opportunities, rank_opportunities, scan_windows, MultiRaceOpportunity, Quality,
    SequenceType, ValuePlayRef,
};
pub use signals::{extract_signal, RaceOpenness, RaceSignal};
pub use ticket::{
    build_best_tickets, build_ticket, build_tickets_for_bankroll, construct_ticket,
    fit_to_budget, LegSelection, LegStrategy, MultiRaceLeg, MultiRaceTicket, TicketConfidence,
};
