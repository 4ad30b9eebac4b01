use serde::Serialize;
use thiserror::Error;

use crate::express::ExpressCombination;

/// Odds at or below evens are priced at this value before inversion.
pub const ODDS_FLOOR: f64 = 1.01;

#[derive(Debug, Error, PartialEq)]
pub enum StakeError {
    #[error("budget must be positive, got {0}")]
    NonPositiveBudget(f64),
    #[error("stake must be positive, got {0}")]
    NonPositiveStake(f64),
    #[error("no combinations to stake")]
    NoCombinations,
}

/// Equal-payout split of a budget across mutually exclusive combinations.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DutchingPlan {
    pub budget: f64,
    /// Odds after the floor was applied, aligned with `stakes`.
    pub odds: Vec<f64>,
    pub stakes: Vec<f64>,
    pub guaranteed_payout: f64,
    pub net_profit: f64,
    /// `net_profit / budget`, as a fraction.
    pub roi: f64,
}

pub fn effective_odds(odds: f64) -> f64 {
    if odds > 1.0 { odds } else { ODDS_FLOOR }
}

/// Dutching: `stake_i = payout / o_i` with `payout = budget / Σ 1/o_i`.
///
/// Stakes come back in input order, so they zip with the combination list.
pub fn allocate(budget: f64, odds: &[f64]) -> Result<DutchingPlan, StakeError> {
    if budget <= 0.0 || !budget.is_finite() {
        return Err(StakeError::NonPositiveBudget(budget));
    }
    if odds.is_empty() {
        return Err(StakeError::NoCombinations);
    }

    let odds: Vec<f64> = odds.iter().copied().map(effective_odds).collect();
    let implied: f64 = odds.iter().map(|o| 1.0 / o).sum();
    let guaranteed_payout = budget / implied;
    let stakes = odds.iter().map(|o| guaranteed_payout / o).collect();
    let net_profit = guaranteed_payout - budget;

    Ok(DutchingPlan {
        budget,
        odds,
        stakes,
        guaranteed_payout,
        net_profit,
        roi: net_profit / budget,
    })
}

pub fn allocate_combinations(
    budget: f64,
    combos: &[ExpressCombination],
) -> Result<DutchingPlan, StakeError> {
    let odds: Vec<f64> = combos.iter().map(|c| c.combined_odds).collect();
    allocate(budget, &odds)
}

/// Same stake on every combination; the payout depends on which one lands.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixedStakeReport {
    pub stake: f64,
    pub total_cost: f64,
    pub payouts: Vec<f64>,
    pub min_payout: f64,
    pub max_payout: f64,
    pub min_profit: f64,
    pub max_profit: f64,
}

pub fn fixed_stake(stake: f64, odds: &[f64]) -> Result<FixedStakeReport, StakeError> {
    if stake <= 0.0 || !stake.is_finite() {
        return Err(StakeError::NonPositiveStake(stake));
    }
    if odds.is_empty() {
        return Err(StakeError::NoCombinations);
    }

    let payouts: Vec<f64> = odds.iter().map(|o| o * stake).collect();
    let total_cost = stake * odds.len() as f64;
    let min_payout = payouts.iter().copied().fold(f64::INFINITY, f64::min);
    let max_payout = payouts.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    Ok(FixedStakeReport {
        stake,
        total_cost,
        payouts,
        min_payout,
        max_payout,
        min_profit: min_payout - total_cost,
        max_profit: max_payout - total_cost,
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct KellyAdvice {
    pub fraction: f64,
    pub amount: f64,
}

impl KellyAdvice {
    pub fn should_bet(&self) -> bool {
        self.fraction > 0.0
    }
}

/// Kelly criterion `f* = (b·p − q) / b` with `b = odds − 1`.
///
/// No edge (or odds at or below evens) means a zero stake.
pub fn kelly(bankroll: f64, odds: f64, win_prob: f64) -> KellyAdvice {
    let none = KellyAdvice {
        fraction: 0.0,
        amount: 0.0,
    };
    let b = odds - 1.0;
    if b <= 0.0 || !(0.0..=1.0).contains(&win_prob) {
        return none;
    }
    let q = 1.0 - win_prob;
    let fraction = (b * win_prob - q) / b;
    if fraction <= 0.0 {
        return none;
    }
    KellyAdvice {
        fraction,
        amount: bankroll.max(0.0) * fraction,
    }
}

#[cfg(test)]
mod tests {
    use super::{StakeError, allocate, fixed_stake, kelly};

    #[test]
    fn stakes_sum_to_budget_with_constant_payout() {
        let odds = [2.5, 4.0, 7.25, 1.3, 12.0];
        let plan = allocate(1000.0, &odds).expect("plan");
        let total: f64 = plan.stakes.iter().sum();
        assert!((total - 1000.0).abs() < 1e-9);
        for (stake, o) in plan.stakes.iter().zip(&plan.odds) {
            assert!((stake * o - plan.guaranteed_payout).abs() < 1e-9);
        }
        assert!((plan.net_profit - (plan.guaranteed_payout - 1000.0)).abs() < 1e-12);
    }

    #[test]
    fn odds_at_or_below_evens_are_floored() {
        let plan = allocate(100.0, &[1.0, 0.5, 3.0]).expect("plan");
        assert_eq!(plan.odds, vec![1.01, 1.01, 3.0]);
        assert!(plan.guaranteed_payout.is_finite());
    }

    #[test]
    fn bad_inputs_are_typed_errors() {
        assert_eq!(allocate(0.0, &[2.0]), Err(StakeError::NonPositiveBudget(0.0)));
        assert_eq!(allocate(10.0, &[]), Err(StakeError::NoCombinations));
        assert_eq!(fixed_stake(-1.0, &[2.0]), Err(StakeError::NonPositiveStake(-1.0)));
    }

    #[test]
    fn fixed_stake_reports_range() {
        let report = fixed_stake(100.0, &[2.0, 5.0, 3.0]).expect("report");
        assert_eq!(report.total_cost, 300.0);
        assert_eq!(report.min_payout, 200.0);
        assert_eq!(report.max_payout, 500.0);
        assert_eq!(report.min_profit, -100.0);
        assert_eq!(report.max_profit, 200.0);
    }

    #[test]
    fn kelly_matches_closed_form() {
        let advice = kelly(1000.0, 1.85, 0.65);
        let want = (0.85 * 0.65 - 0.35) / 0.85;
        assert!((advice.fraction - want).abs() < 1e-12);
        assert!((advice.amount - 1000.0 * want).abs() < 1e-9);
        assert!(advice.should_bet());
    }

    #[test]
    fn kelly_without_edge_is_zero() {
        assert!(!kelly(1000.0, 1.5, 0.5).should_bet());
        assert_eq!(kelly(1000.0, 1.0, 0.9).amount, 0.0);
    }
}
