//! Derived portfolio metrics.
//!
//! Every function here is pure: same inputs, same output, no I/O. Zero
//! denominators yield 0 instead of NaN or infinity, so callers can render the
//! result without checking.

use serde::Serialize;

use crate::model::{Assumptions, RiskLevel, WalletBalances};

pub const DEFAULT_ETH_PRICE: f64 = 3500.0;

const MEDIUM_RISK_PENALTY: i32 = 15;
const HIGH_RISK_PENALTY: i32 = 30;
const CONCENTRATION_PENALTY: i32 = 15;
const USD_SIDE_MAX: f64 = 0.8;
const USD_SIDE_MIN: f64 = 0.2;

const BADGE_GOOD_MIN: u32 = 70;
const BADGE_CAUTION_MIN: u32 = 40;

// =============================================================================
// Health
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum HealthBadge {
    Good,
    Caution,
    Risky,
}

impl HealthBadge {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthBadge::Good => "Good",
            HealthBadge::Caution => "Caution",
            HealthBadge::Risky => "Risky",
        }
    }
}

/// Fraction of the weETH + LiquidUSD pair held on the USD side.
fn usd_side(weeth: f64, liquid_usd: f64, eth_price: f64) -> f64 {
    let denom = eth_price * weeth + liquid_usd;
    if denom > 0.0 && denom.is_finite() {
        liquid_usd / denom
    } else {
        0.0
    }
}

/// Portfolio health in [0, 100].
///
/// Starts at 100, loses 15 for Medium risk or 30 for High risk, and another 15
/// when more than 80% or less than 20% of the weETH/LiquidUSD pair sits on the
/// USD side.
pub fn health_score(risk: RiskLevel, weeth: f64, liquid_usd: f64, eth_price: f64) -> u32 {
    let mut score: i32 = 100;
    score -= match risk {
        RiskLevel::Low => 0,
        RiskLevel::Medium => MEDIUM_RISK_PENALTY,
        RiskLevel::High => HIGH_RISK_PENALTY,
    };

    let side = usd_side(weeth, liquid_usd, eth_price);
    if side > USD_SIDE_MAX || side < USD_SIDE_MIN {
        score -= CONCENTRATION_PENALTY;
    }

    score.clamp(0, 100) as u32
}

pub fn health_badge(score: u32) -> HealthBadge {
    if score >= BADGE_GOOD_MIN {
        HealthBadge::Good
    } else if score >= BADGE_CAUTION_MIN {
        HealthBadge::Caution
    } else {
        HealthBadge::Risky
    }
}

/// Concentration classification of weETH against the stable side.
pub fn classify_risk(weeth: f64, liquid_usd: f64, eth_price: f64) -> RiskLevel {
    let stable_eth = if eth_price > 0.0 { liquid_usd / eth_price } else { 0.0 };
    let total = weeth + stable_eth;
    let conc = if total > 0.0 { weeth / total } else { 0.0 };
    if conc > 0.8 {
        RiskLevel::High
    } else if conc > 0.5 {
        RiskLevel::Medium
    } else {
        RiskLevel::Low
    }
}

// =============================================================================
// Diversification
// =============================================================================

/// Inverse-normalised Herfindahl score in [0, 100].
///
/// Only positive allocations count. One active asset scores 0, an even split
/// across n assets scores 100.
pub fn diversification_score<I>(allocation_pcts: I) -> u32
where
    I: IntoIterator<Item = f64>,
{
    let active: Vec<f64> = allocation_pcts.into_iter().filter(|p| *p > 0.0).collect();
    let n = active.len();
    if n <= 1 {
        return 0;
    }

    let h: f64 = active.iter().map(|p| (p / 100.0).powi(2)).sum();
    let raw = 100.0 * (1.0 - h) / (1.0 - 1.0 / n as f64);
    if !raw.is_finite() {
        return 0;
    }
    raw.round().clamp(0.0, 100.0) as u32
}

/// Per-asset share of portfolio USD value, in percent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allocation {
    pub entries: Vec<(&'static str, f64)>,
}

impl Allocation {
    pub fn percentages(&self) -> impl Iterator<Item = f64> + '_ {
        self.entries.iter().map(|(_, pct)| *pct)
    }

    pub fn get(&self, asset: &str) -> Option<f64> {
        self.entries.iter().find(|(a, _)| *a == asset).map(|(_, pct)| *pct)
    }
}

pub fn allocation(balances: &WalletBalances, eth_price: f64) -> Allocation {
    let values = [
        ("ETH", balances.eth * eth_price),
        ("eETH", balances.eeth * eth_price),
        ("weETH", balances.weeth * eth_price),
        ("LiquidUSD", balances.liquid_usd),
    ];
    let total: f64 = values.iter().map(|(_, v)| v).sum();
    let entries = values
        .iter()
        .map(|(asset, v)| {
            let pct = if total > 0.0 { v / total * 100.0 } else { 0.0 };
            (*asset, pct)
        })
        .collect();
    Allocation { entries }
}

// =============================================================================
// Value and yield
// =============================================================================

pub fn total_value_usd(balances: &WalletBalances, eth_price: f64) -> f64 {
    (balances.eth + balances.derivative_eth()) * eth_price + balances.liquid_usd
}

/// Whole portfolio expressed in ETH.
pub fn total_eth_value(balances: &WalletBalances, eth_price: f64) -> f64 {
    let stable_eth = if eth_price > 0.0 { balances.liquid_usd / eth_price } else { 0.0 };
    balances.eth + balances.derivative_eth() + stable_eth
}

/// Value-weighted APY over the yield-bearing holdings (staked derivatives and
/// the stable vault). Plain ETH does not participate.
pub fn blended_apy(balances: &WalletBalances, assumptions: &Assumptions, eth_price: f64) -> f64 {
    let staked = balances.derivative_eth();
    let stable = if eth_price > 0.0 { balances.liquid_usd / eth_price } else { 0.0 };
    let total = staked + stable;
    if total <= 0.0 {
        return 0.0;
    }
    (staked * assumptions.apy_stake + stable * assumptions.apy_liquid_usd) / total
}

/// APY over the whole portfolio, counting idle ETH as earning nothing.
pub fn effective_apy(balances: &WalletBalances, assumptions: &Assumptions, eth_price: f64) -> f64 {
    let total = total_eth_value(balances, eth_price);
    if total <= 0.0 {
        return 0.0;
    }
    let stable = if eth_price > 0.0 { balances.liquid_usd / eth_price } else { 0.0 };
    let earning = balances.derivative_eth() * assumptions.apy_stake + stable * assumptions.apy_liquid_usd;
    earning / total
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OpportunityCost {
    pub missed_eth_per_year: f64,
    pub missed_usd_per_year: f64,
    /// Percentage points, e.g. 1.5 for 1.5%.
    pub missed_apy_points: f64,
}

impl OpportunityCost {
    /// The current strategy matches or beats the reference.
    pub fn is_optimized(&self) -> bool {
        self.missed_apy_points <= 0.0
    }
}

/// Yield given up by holding `current_apy` instead of `best_apy`.
///
/// Negative results are kept: they mean the current strategy already beats the
/// reference.
pub fn opportunity_cost(current_apy: f64, best_apy: f64, total_eth_value: f64, eth_price: f64) -> OpportunityCost {
    let gap = best_apy - current_apy;
    let missed_eth_per_year = total_eth_value * gap;
    OpportunityCost {
        missed_eth_per_year,
        missed_usd_per_year: missed_eth_per_year * eth_price,
        missed_apy_points: gap * 100.0,
    }
}

// =============================================================================
// Strategy comparison
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StrategyEstimate {
    pub name: &'static str,
    pub apy: f64,
    pub yearly_eth: f64,
}

/// Conservative (hold staked ETH) against Active (borrow stables against weETH
/// up to the LTV ceiling and deposit them in the stable vault).
pub fn strategy_estimates(eth_notional: f64, assumptions: &Assumptions) -> [StrategyEstimate; 2] {
    let notional = eth_notional.max(0.0);
    let spread = (assumptions.apy_liquid_usd - assumptions.borrow_rate).max(0.0);
    let active_apy = assumptions.apy_stake + assumptions.ltv_weeth * spread;
    [
        StrategyEstimate {
            name: "Conservative",
            apy: assumptions.apy_stake,
            yearly_eth: notional * assumptions.apy_stake,
        },
        StrategyEstimate {
            name: "Active",
            apy: active_apy,
            yearly_eth: notional * active_apy,
        },
    ]
}

pub fn best_strategy_apy(assumptions: &Assumptions) -> f64 {
    strategy_estimates(0.0, assumptions)
        .iter()
        .map(|s| s.apy)
        .fold(0.0, f64::max)
}

// =============================================================================
// Snapshot
// =============================================================================

/// Everything the dashboard header shows for one state.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricsSnapshot {
    pub total_value_usd: f64,
    pub total_eth_value: f64,
    pub blended_apy: f64,
    pub effective_apy: f64,
    pub risk: RiskLevel,
    pub health_score: u32,
    pub health_badge: HealthBadge,
    pub diversification_score: u32,
    pub opportunity_cost: OpportunityCost,
}

impl MetricsSnapshot {
    /// `risk` comes from the simulation API when available; otherwise the
    /// local classification is used.
    pub fn compute(
        balances: &WalletBalances,
        assumptions: &Assumptions,
        eth_price: f64,
        risk: Option<RiskLevel>,
    ) -> Self {
        let risk = risk.unwrap_or_else(|| classify_risk(balances.weeth, balances.liquid_usd, eth_price));
        let score = health_score(risk, balances.weeth, balances.liquid_usd, eth_price);
        let total_eth = total_eth_value(balances, eth_price);
        let effective = effective_apy(balances, assumptions, eth_price);
        Self {
            total_value_usd: total_value_usd(balances, eth_price),
            total_eth_value: total_eth,
            blended_apy: blended_apy(balances, assumptions, eth_price),
            effective_apy: effective,
            risk,
            health_score: score,
            health_badge: health_badge(score),
            diversification_score: diversification_score(allocation(balances, eth_price).percentages()),
            opportunity_cost: opportunity_cost(effective, best_strategy_apy(assumptions), total_eth, eth_price),
        }
    }

    /// Recompute opportunity cost against a reference APY from elsewhere,
    /// typically the simulator's best strategy.
    pub fn with_reference_apy(mut self, best_apy: f64, eth_price: f64) -> Self {
        self.opportunity_cost = opportunity_cost(self.effective_apy, best_apy, self.total_eth_value, eth_price);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_health_score_low_risk_all_eth() {
        // usd side is 0, below the 20% floor
        assert_eq!(health_score(RiskLevel::Low, 1.0, 0.0, DEFAULT_ETH_PRICE), 85);
    }

    #[test]
    fn test_health_score_high_risk_balanced() {
        assert_eq!(health_score(RiskLevel::High, 1.0, 3500.0, DEFAULT_ETH_PRICE), 70);
    }

    #[test]
    fn test_health_score_medium_and_usd_heavy() {
        // 100 / (350 + 100000) > 0.8
        assert_eq!(health_score(RiskLevel::Medium, 0.1, 100_000.0, DEFAULT_ETH_PRICE), 70);
        assert_eq!(health_score(RiskLevel::Medium, 1.0, 3500.0, DEFAULT_ETH_PRICE), 85);
    }

    #[test]
    fn test_health_score_empty_wallet() {
        assert_eq!(health_score(RiskLevel::Low, 0.0, 0.0, DEFAULT_ETH_PRICE), 85);
        assert_eq!(health_score(RiskLevel::Low, 1.0, 0.0, 0.0), 85);
    }

    #[test]
    fn test_health_score_bounded() {
        let risks = [RiskLevel::Low, RiskLevel::Medium, RiskLevel::High];
        let amounts = [0.0, 0.001, 0.5, 1.0, 10.0, 1e6, 1e12];
        for risk in risks {
            for &w in &amounts {
                for &u in &amounts {
                    let s = health_score(risk, w, u * 1000.0, DEFAULT_ETH_PRICE);
                    assert!(s <= 100, "score {} out of range for {:?} {} {}", s, risk, w, u);
                }
            }
        }
        assert!(health_score(RiskLevel::High, 1.0, 0.0, DEFAULT_ETH_PRICE) >= 55);
    }

    #[test]
    fn test_health_badge_thresholds() {
        assert_eq!(health_badge(100), HealthBadge::Good);
        assert_eq!(health_badge(70), HealthBadge::Good);
        assert_eq!(health_badge(69), HealthBadge::Caution);
        assert_eq!(health_badge(40), HealthBadge::Caution);
        assert_eq!(health_badge(39), HealthBadge::Risky);
        assert_eq!(health_badge(0), HealthBadge::Risky);
    }

    #[test]
    fn test_diversification_single_asset() {
        assert_eq!(diversification_score([100.0]), 0);
        assert_eq!(diversification_score([100.0, 0.0, 0.0]), 0);
    }

    #[test]
    fn test_diversification_even_split() {
        assert_eq!(diversification_score([25.0, 25.0, 25.0, 25.0]), 100);
        assert_eq!(diversification_score([50.0, 50.0]), 100);
    }

    #[test]
    fn test_diversification_empty_and_skewed() {
        assert_eq!(diversification_score(Vec::<f64>::new()), 0);
        assert_eq!(diversification_score([0.0, 0.0]), 0);
        // H = 0.81 + 0.01 = 0.82, (1 - 0.82) / 0.5 = 0.36
        assert_eq!(diversification_score([90.0, 10.0]), 36);
    }

    #[test]
    fn test_classify_risk() {
        assert_eq!(classify_risk(5.0, 0.0, DEFAULT_ETH_PRICE), RiskLevel::High);
        // 1 weETH vs 0.5 ETH of stables -> 0.667
        assert_eq!(classify_risk(1.0, 1750.0, DEFAULT_ETH_PRICE), RiskLevel::Medium);
        assert_eq!(classify_risk(1.0, 3500.0, DEFAULT_ETH_PRICE), RiskLevel::Low);
        assert_eq!(classify_risk(0.0, 0.0, DEFAULT_ETH_PRICE), RiskLevel::Low);
    }

    #[test]
    fn test_blended_apy() {
        let a = Assumptions::new(0.04, 0.10, 0.05, 0.5);
        let b = WalletBalances::new(0.0, 0.0, 1.0, 3500.0);
        assert!(approx(blended_apy(&b, &a, DEFAULT_ETH_PRICE), 0.07));

        let staked_only = WalletBalances::new(10.0, 1.0, 1.0, 0.0);
        assert!(approx(blended_apy(&staked_only, &a, DEFAULT_ETH_PRICE), 0.04));
    }

    #[test]
    fn test_blended_apy_zero_total() {
        let a = Assumptions::new(0.04, 0.10, 0.05, 0.5);
        let empty = WalletBalances::new(0.0, 0.0, 0.0, 0.0);
        assert_eq!(blended_apy(&empty, &a, DEFAULT_ETH_PRICE), 0.0);
        let idle = WalletBalances::new(3.0, 0.0, 0.0, 0.0);
        assert_eq!(blended_apy(&idle, &a, DEFAULT_ETH_PRICE), 0.0);
        assert_eq!(effective_apy(&empty, &a, DEFAULT_ETH_PRICE), 0.0);
    }

    #[test]
    fn test_effective_apy_counts_idle_eth() {
        let a = Assumptions::new(0.04, 0.10, 0.05, 0.5);
        let b = WalletBalances::new(1.0, 1.0, 0.0, 0.0);
        assert!(approx(effective_apy(&b, &a, DEFAULT_ETH_PRICE), 0.02));
    }

    #[test]
    fn test_opportunity_cost_positive() {
        let oc = opportunity_cost(0.04, 0.065, 10.0, DEFAULT_ETH_PRICE);
        assert!(approx(oc.missed_eth_per_year, 0.25));
        assert!(approx(oc.missed_usd_per_year, 875.0));
        assert!(approx(oc.missed_apy_points, 2.5));
        assert!(!oc.is_optimized());
    }

    #[test]
    fn test_opportunity_cost_negative_is_not_clamped() {
        let oc = opportunity_cost(0.08, 0.05, 2.0, DEFAULT_ETH_PRICE);
        assert!(oc.missed_eth_per_year < 0.0);
        assert!(approx(oc.missed_apy_points, -3.0));
        assert!(oc.is_optimized());
    }

    #[test]
    fn test_allocation_percentages() {
        let b = WalletBalances::new(1.0, 1.0, 1.0, 3500.0);
        let alloc = allocation(&b, DEFAULT_ETH_PRICE);
        for pct in alloc.percentages() {
            assert!(approx(pct, 25.0));
        }
        assert_eq!(diversification_score(alloc.percentages()), 100);

        let empty = allocation(&WalletBalances::new(0.0, 0.0, 0.0, 0.0), DEFAULT_ETH_PRICE);
        assert_eq!(empty.get("ETH"), Some(0.0));
        assert_eq!(diversification_score(empty.percentages()), 0);
    }

    #[test]
    fn test_totals() {
        let b = WalletBalances::new(1.0, 0.5, 0.5, 7000.0);
        assert!(approx(total_value_usd(&b, DEFAULT_ETH_PRICE), 14_000.0));
        assert!(approx(total_eth_value(&b, DEFAULT_ETH_PRICE), 4.0));
    }

    #[test]
    fn test_strategy_estimates() {
        let a = Assumptions::new(0.04, 0.10, 0.05, 0.5);
        let [conservative, active] = strategy_estimates(10.0, &a);
        assert!(approx(conservative.apy, 0.04));
        assert!(approx(conservative.yearly_eth, 0.4));
        assert!(approx(active.apy, 0.065));
        assert!(approx(active.yearly_eth, 0.65));
        assert!(approx(best_strategy_apy(&a), 0.065));
    }

    #[test]
    fn test_active_never_below_conservative() {
        // borrowing costs more than the vault pays
        let a = Assumptions::new(0.04, 0.03, 0.08, 0.5);
        let [conservative, active] = strategy_estimates(5.0, &a);
        assert!(approx(active.apy, conservative.apy));
    }

    #[test]
    fn test_snapshot_is_deterministic() {
        let a = Assumptions::new(0.04, 0.10, 0.05, 0.5);
        let b = WalletBalances::new(3.0, 0.5, 0.0, 250.0);
        let s1 = MetricsSnapshot::compute(&b, &a, DEFAULT_ETH_PRICE, None);
        let s2 = MetricsSnapshot::compute(&b, &a, DEFAULT_ETH_PRICE, None);
        assert_eq!(s1, s2);
        assert!(s1.opportunity_cost.missed_eth_per_year > 0.0);
        assert_eq!(s1.health_badge, health_badge(s1.health_score));
    }

    #[test]
    fn test_snapshot_uses_supplied_risk() {
        let a = Assumptions::new(0.04, 0.10, 0.05, 0.5);
        let b = WalletBalances::new(0.0, 0.0, 1.0, 3500.0);
        let local = MetricsSnapshot::compute(&b, &a, DEFAULT_ETH_PRICE, None);
        let remote = MetricsSnapshot::compute(&b, &a, DEFAULT_ETH_PRICE, Some(RiskLevel::High));
        assert_eq!(local.risk, RiskLevel::Low);
        assert_eq!(local.health_score, 100);
        assert_eq!(remote.health_score, 70);
    }

    #[test]
    fn test_reference_apy_override() {
        let a = Assumptions::new(0.04, 0.10, 0.05, 0.5);
        let b = WalletBalances::new(0.0, 0.0, 2.0, 0.0);
        let s = MetricsSnapshot::compute(&b, &a, DEFAULT_ETH_PRICE, None).with_reference_apy(0.03, DEFAULT_ETH_PRICE);
        assert!(s.opportunity_cost.is_optimized());
        assert!(approx(s.opportunity_cost.missed_eth_per_year, -0.02));
    }
}
