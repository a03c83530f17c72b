use serde::{Deserialize, Serialize};

use crate::metrics::{blended_apy, total_value_usd};
use crate::model::UserLevel;
use crate::store::DemoState;

/// Portfolio snapshot attached to chat and explain requests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioContext {
    #[serde(rename = "ETH")]
    pub eth: f64,
    #[serde(rename = "eETH")]
    pub eeth: f64,
    #[serde(rename = "weETH")]
    pub weeth: f64,
    #[serde(rename = "LiquidUSD")]
    pub liquid_usd: f64,
    #[serde(rename = "totalValueUSD")]
    pub total_value_usd: f64,
    #[serde(rename = "blendedAPY")]
    pub blended_apy: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatContext {
    pub portfolio: PortfolioContext,
    pub user_profile: Option<String>,
    pub user_level: Option<UserLevel>,
}

impl ChatContext {
    pub fn from_state(state: &DemoState, eth_price: f64) -> Self {
        let b = &state.balances;
        let profile = state.current_profile();
        Self {
            portfolio: PortfolioContext {
                eth: b.eth,
                eeth: b.eeth,
                weeth: b.weeth,
                liquid_usd: b.liquid_usd,
                total_value_usd: total_value_usd(b, eth_price),
                blended_apy: blended_apy(b, &state.assumptions, eth_price),
            },
            user_profile: profile.map(|p| p.id.to_string()),
            user_level: profile.map(|p| p.level),
        }
    }
}
