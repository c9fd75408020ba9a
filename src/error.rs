use thiserror::Error;

/// Engine error types
///
/// None of these are ever returned to the host as a failure of the call itself.
/// Their display strings become the `reason` carried by refusal results.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Probability outside the open interval (0, 1)
    #[error("invalid probability {0}: must be strictly between 0 and 1")]
    InvalidProbability(f64),

    /// Decimal odds that pay nothing beyond the stake
    #[error("invalid decimal odds {0}: must be greater than 1.0")]
    InvalidOdds(f64),

    /// Non-finite or non-positive bankroll
    #[error("invalid bankroll {0}: must be a positive amount")]
    InvalidBankroll(f64),

    /// Max-bet cap outside (0, 1]
    #[error("invalid max bet percent {0}: must be above 0 and at most 1")]
    InvalidMaxBetPercent(f64),

    /// Minimum required edge that is negative or not a number
    #[error("invalid minimum edge {0}: must be a non-negative number")]
    InvalidMinEdge(f64),

    #[error("bankroll too small")]
    BankrollTooSmall,

    #[error("negative edge / underlay")]
    NegativeEdge,

    #[error("edge too small")]
    EdgeTooSmall,

    /// Fewer non-scratched starters than the bet depth needs
    #[error("field too small: need {required} starters, have {available}")]
    FieldTooSmall { required: usize, available: usize },

    /// Even a fully trimmed ticket does not fit
    #[error("budget too small: ticket costs ${cost:.2}, budget is ${budget:.2}")]
    BudgetTooSmall { cost: f64, budget: f64 },

    #[error("race card has no usable races")]
    EmptyCard,

    #[error("race {0} is not on the card")]
    RaceNotFound(u8),
}

/// Validation functions
pub fn validate_probability(prob: f64) -> Result<(), EngineError> {
    if !prob.is_finite() || prob <= 0.0 || prob >= 1.0 {
        return Err(EngineError::InvalidProbability(prob));
    }
    Ok(())
}

pub fn validate_odds(odds: f64) -> Result<(), EngineError> {
    if !odds.is_finite() || odds <= 1.0 {
        return Err(EngineError::InvalidOdds(odds));
    }
    Ok(())
}

pub fn validate_bankroll(bankroll: f64) -> Result<(), EngineError> {
    if !bankroll.is_finite() || bankroll <= 0.0 {
        return Err(EngineError::InvalidBankroll(bankroll));
    }
    Ok(())
}

pub fn validate_max_bet_percent(percent: f64) -> Result<(), EngineError> {
    if !percent.is_finite() || percent <= 0.0 || percent > 1.0 {
        return Err(EngineError::InvalidMaxBetPercent(percent));
    }
    Ok(())
}

pub fn validate_min_edge(edge: f64) -> Result<(), EngineError> {
    if !edge.is_finite() || edge < 0.0 {
        return Err(EngineError::InvalidMinEdge(edge));
    }
    Ok(())
}

pub fn validate_field_size(required: usize, available: usize) -> Result<(), EngineError> {
    if available < required {
        return Err(EngineError::FieldTooSmall {
            required,
            available,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_probability_valid() {
        assert!(validate_probability(0.01).is_ok());
        assert!(validate_probability(0.5).is_ok());
        assert!(validate_probability(0.99).is_ok());
    }

    #[test]
    fn test_validate_probability_boundaries_rejected() {
        assert!(validate_probability(0.0).is_err());
        assert!(validate_probability(1.0).is_err());
        assert!(validate_probability(-0.1).is_err());
        assert!(validate_probability(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_odds() {
        assert!(validate_odds(1.5).is_ok());
        assert!(validate_odds(1.0).is_err());
        assert!(validate_odds(0.5).is_err());
        assert!(validate_odds(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_bankroll() {
        assert!(validate_bankroll(100.0).is_ok());
        assert!(validate_bankroll(0.0).is_err());
        assert!(validate_bankroll(-5.0).is_err());
    }

    #[test]
    fn test_validate_max_bet_percent() {
        assert!(validate_max_bet_percent(0.1).is_ok());
        assert!(validate_max_bet_percent(1.0).is_ok());
        assert!(validate_max_bet_percent(0.0).is_err());
        assert!(validate_max_bet_percent(-0.1).is_err());
        assert!(validate_max_bet_percent(1.5).is_err());
        assert!(validate_max_bet_percent(f64::NAN).is_err());
    }

    #[test]
    fn test_validate_min_edge() {
        assert!(validate_min_edge(0.0).is_ok());
        assert!(validate_min_edge(0.05).is_ok());
        assert!(validate_min_edge(-0.01).is_err());
        assert!(validate_min_edge(f64::NAN).is_err());
        assert!(validate_min_edge(f64::INFINITY).is_err());
    }

    #[test]
    fn test_validate_field_size() {
        assert!(validate_field_size(3, 5).is_ok());
        assert_eq!(
            validate_field_size(6, 5),
            Err(EngineError::FieldTooSmall {
                required: 6,
                available: 5
            })
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(EngineError::NegativeEdge.to_string(), "negative edge / underlay");
        assert_eq!(EngineError::EdgeTooSmall.to_string(), "edge too small");
        assert_eq!(EngineError::BankrollTooSmall.to_string(), "bankroll too small");

        let err = EngineError::BudgetTooSmall {
            cost: 12.5,
            budget: 10.0,
        };
        assert!(err.to_string().contains("$12.50"));
    }
}
