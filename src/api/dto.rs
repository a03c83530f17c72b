//! Request and response bodies of the simulator API.

use std::collections::BTreeMap;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use super::context::ChatContext;
use super::price::{de_opt_price, de_price};
use crate::metrics::diversification_score;
use crate::model::{Assumptions, RiskLevel, WalletBalances};
use crate::store::DemoState;

// =============================================================================
// Requests
// =============================================================================

/// Body of `/api/simulate` and `/api/multi-asset-forecast`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimRequest {
    pub balances: WalletBalances,
    pub assumptions: Assumptions,
}

impl SimRequest {
    pub fn from_state(state: &DemoState) -> Self {
        Self {
            balances: state.balances,
            assumptions: state.assumptions,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AskRequest {
    pub q: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<ChatContext>,
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Strategy {
    pub name: String,
    pub apy: f64,
    pub yearly_eth: f64,
    #[serde(default)]
    pub steps: Vec<String>,
    #[serde(default)]
    pub risks: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimResponse {
    pub blended_apy: f64,
    pub risk: RiskLevel,
    pub strategies: Vec<Strategy>,
}

impl SimResponse {
    /// Highest strategy APY, the reference for opportunity cost.
    pub fn best_apy(&self) -> Option<f64> {
        self.strategies
            .iter()
            .map(|s| s.apy)
            .filter(|a| a.is_finite())
            .fold(None, |best, a| Some(best.map_or(a, |b: f64| b.max(a))))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Negative for history, positive for projection.
    pub month: i32,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ForecastResponse {
    pub historical: Vec<ForecastPoint>,
    pub projection: Vec<ForecastPoint>,
}

impl ForecastResponse {
    pub fn final_value(&self) -> Option<f64> {
        self.projection.last().map(|p| p.value)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPerformance {
    pub asset: String,
    pub historical: Vec<ForecastPoint>,
    pub projection: Vec<ForecastPoint>,
    pub apy: f64,
    pub current_value: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MultiAssetForecastResponse {
    pub assets: Vec<AssetPerformance>,
    pub total_value: Vec<ForecastPoint>,
    /// Asset name to percent of portfolio value.
    pub allocation: BTreeMap<String, f64>,
}

impl MultiAssetForecastResponse {
    pub fn diversification_score(&self) -> u32 {
        diversification_score(self.allocation.values().copied())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CorrelationMatrix {
    pub assets: Vec<String>,
    pub matrix: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.assets.iter().position(|x| x == a)?;
        let j = self.assets.iter().position(|x| x == b)?;
        self.matrix.get(i).and_then(|row| row.get(j)).copied()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AskResponse {
    pub answer: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RatesSource {
    Live,
    DemoStatic,
    DemoFallback,
    #[serde(other)]
    Unknown,
}

/// `/api/rates` and `/api/live-metrics`. Demo responses carry only the four
/// assumptions; live ones add prices and TVL.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveRates {
    pub apy_stake: f64,
    pub apy_liquid_usd: f64,
    pub borrow_rate: f64,
    pub ltv_weeth: f64,
    pub source: RatesSource,
    #[serde(default, deserialize_with = "de_opt_price")]
    pub eth_price: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_price")]
    pub weeth_exchange_rate: Option<f64>,
    #[serde(default, rename = "totalTVL")]
    pub total_tvl: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl LiveRates {
    pub fn assumptions(&self) -> Assumptions {
        Assumptions::new(self.apy_stake, self.apy_liquid_usd, self.borrow_rate, self.ltv_weeth)
    }

    pub fn is_live(&self) -> bool {
        self.source == RatesSource::Live
    }
}

/// `/api/live-metrics` answers 200 with an error object when upstream fails.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum LiveMetricsPayload {
    Failed { error: String, message: Option<String> },
    Rates(LiveRates),
}

impl LiveMetricsPayload {
    pub fn into_result(self) -> Result<LiveRates> {
        match self {
            LiveMetricsPayload::Rates(r) => Ok(r),
            LiveMetricsPayload::Failed { error, message } => Err(anyhow!(
                "live metrics unavailable: {}{}",
                error,
                message.map(|m| format!(" ({})", m)).unwrap_or_default()
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PricePoint {
    pub date: String,
    #[serde(deserialize_with = "de_price")]
    pub price: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct HistoricalPrices {
    #[serde(default)]
    pub asset: Option<String>,
    #[serde(default)]
    pub days: Option<u32>,
    #[serde(default)]
    pub data: Vec<PricePoint>,
    #[serde(default)]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApyPoint {
    pub date: String,
    pub apy: f64,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ApyHistory {
    #[serde(default)]
    pub days: Option<u32>,
    #[serde(default)]
    pub data: Vec<ApyPoint>,
    #[serde(default)]
    pub error: Option<String>,
}

/// Upstream endpoints report failure in-band with an `error` field.
pub(crate) fn reject_inband_error(error: Option<&String>, what: &str) -> Result<()> {
    match error {
        Some(e) => Err(anyhow!("{} failed upstream: {}", what, e)),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct LivePrice {
    pub product: String,
    #[serde(deserialize_with = "de_price")]
    pub price: f64,
    pub symbol: String,
    pub timestamp: i64,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub source: Option<String>,
}
