//! Learning stake payouts.
//!
//! A learner stakes an amount against finishing a plan faster than the AI
//! estimate. The payout scales with the time reduction and the watch quality.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::errors::AppError;
use crate::video_plan::completion::quality_bonus;

pub const PLATFORM_FEE_RATE: f64 = 0.05;
pub const FORCED_PENALTY: f64 = 0.5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PayoutRequest {
    pub stake: f64,
    pub ai_estimate_minutes: f64,
    pub challenge_minutes: f64,
    pub quality_score: f64,
    pub forced: bool,
    /// Development-only: return exactly the stake.
    pub break_even: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payout {
    /// Percentage by which the challenge undercuts the AI estimate.
    pub time_reduction: f64,
    pub multiplier: f64,
    pub quality_bonus: f64,
    pub gross: f64,
    pub platform_fee: f64,
    pub final_payout: f64,
    pub profit: f64,
    pub test_mode: bool,
}

#[derive(Debug, Error, PartialEq)]
pub enum PayoutError {
    #[error("Stake must be greater than zero")]
    InvalidStake,

    #[error("AI time estimate must be greater than zero")]
    InvalidEstimate,

    #[error("Break-even payouts are only available in development mode")]
    BreakEvenDisabled,

    #[error("Requirements not met: quality score {quality:.0} is below 60")]
    Ineligible { quality: f64 },
}

impl From<PayoutError> for AppError {
    fn from(e: PayoutError) -> Self {
        match e {
            PayoutError::BreakEvenDisabled => AppError::Forbidden,
            other => AppError::Validation(other.to_string()),
        }
    }
}

/// Time reduction as a percentage of the AI estimate.
pub fn time_reduction(ai_estimate: f64, challenge: f64) -> f64 {
    (ai_estimate - challenge) * 100.0 / ai_estimate
}

pub fn time_multiplier(ai_estimate: f64, challenge: f64) -> f64 {
    let r = time_reduction(ai_estimate, challenge);
    if r <= 0.0 {
        1.0
    } else if r >= 50.0 {
        3.0
    } else if r >= 30.0 {
        2.0 + (r - 30.0) * 0.05
    } else if r >= 15.0 {
        1.5 + (r - 15.0) * 0.033
    } else {
        1.05 + r * 0.03
    }
}

pub fn calculate_payout(req: &PayoutRequest, dev_mode: bool) -> Result<Payout, PayoutError> {
    if !(req.stake > 0.0) {
        return Err(PayoutError::InvalidStake);
    }

    if req.break_even {
        if !dev_mode {
            return Err(PayoutError::BreakEvenDisabled);
        }
        return Ok(Payout {
            time_reduction: 0.0,
            multiplier: 1.0,
            quality_bonus: 0.0,
            gross: req.stake,
            platform_fee: 0.0,
            final_payout: req.stake,
            profit: 0.0,
            test_mode: true,
        });
    }

    if !(req.ai_estimate_minutes > 0.0) {
        return Err(PayoutError::InvalidEstimate);
    }

    let bonus = if req.forced {
        0.0
    } else {
        quality_bonus(req.quality_score).ok_or(PayoutError::Ineligible {
            quality: req.quality_score,
        })?
    };
    let reduction = time_reduction(req.ai_estimate_minutes, req.challenge_minutes);
    let multiplier = time_multiplier(req.ai_estimate_minutes, req.challenge_minutes);

    let mut gross = req.stake * multiplier * (1.0 + bonus);
    if req.forced {
        gross *= FORCED_PENALTY;
    }
    let platform_fee = gross * PLATFORM_FEE_RATE;
    let final_payout = gross - platform_fee;

    Ok(Payout {
        time_reduction: reduction,
        multiplier,
        quality_bonus: bonus,
        gross,
        platform_fee,
        final_payout,
        profit: final_payout - req.stake,
        test_mode: false,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_multiplier_tiers() {
        assert_eq!(time_multiplier(100.0, 40.0), 3.0);
        assert!(approx(time_multiplier(100.0, 60.0), 2.5));
        assert!(approx(time_multiplier(100.0, 80.0), 1.5 + 5.0 * 0.033));
        assert!(approx(time_multiplier(100.0, 90.0), 1.35));
        assert_eq!(time_multiplier(100.0, 120.0), 1.0);
    }

    #[test]
    fn test_payout_applies_bonus_then_fee() {
        let payout = calculate_payout(
            &PayoutRequest {
                stake: 10.0,
                ai_estimate_minutes: 100.0,
                challenge_minutes: 50.0,
                quality_score: 95.0,
                ..Default::default()
            },
            false,
        )
        .unwrap();
        assert!(approx(payout.gross, 45.0));
        assert!(approx(payout.platform_fee, 2.25));
        assert!(approx(payout.final_payout, 42.75));
        assert!(approx(payout.profit, 32.75));
    }

    #[test]
    fn test_forced_completion_halves_and_drops_bonus() {
        let payout = calculate_payout(
            &PayoutRequest {
                stake: 10.0,
                ai_estimate_minutes: 100.0,
                challenge_minutes: 50.0,
                quality_score: 95.0,
                forced: true,
                ..Default::default()
            },
            false,
        )
        .unwrap();
        assert_eq!(payout.quality_bonus, 0.0);
        assert!(approx(payout.gross, 15.0));
    }

    #[test]
    fn test_low_quality_is_ineligible_unless_forced() {
        let mut req = PayoutRequest {
            stake: 10.0,
            ai_estimate_minutes: 100.0,
            challenge_minutes: 50.0,
            quality_score: 50.0,
            ..Default::default()
        };
        let err = calculate_payout(&req, false).unwrap_err();
        assert_eq!(err, PayoutError::Ineligible { quality: 50.0 });
        assert!(matches!(AppError::from(err), AppError::Validation(_)));

        req.forced = true;
        let payout = calculate_payout(&req, false).unwrap();
        assert!(approx(payout.gross, 15.0));
    }

    #[test]
    fn test_break_even_requires_dev_mode() {
        let req = PayoutRequest {
            stake: 25.0,
            break_even: true,
            ..Default::default()
        };
        assert_eq!(
            calculate_payout(&req, false).unwrap_err(),
            PayoutError::BreakEvenDisabled
        );

        let payout = calculate_payout(&req, true).unwrap();
        assert!(payout.test_mode);
        assert_eq!(payout.final_payout, 25.0);
        assert_eq!(payout.platform_fee, 0.0);
    }

    #[test]
    fn test_rejects_non_positive_inputs() {
        let req = PayoutRequest {
            stake: 0.0,
            ai_estimate_minutes: 10.0,
            ..Default::default()
        };
        assert_eq!(calculate_payout(&req, false).unwrap_err(), PayoutError::InvalidStake);
    }
}
