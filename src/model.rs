//! Portfolio value types shared by the registry, the store and the API client.
//!
//! Field names on the wire match the remote API exactly (`ETH`, `eETH`,
//! `apyStake`, ...), so these types double as request bodies.

use std::fmt;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

/// Wallet holdings. ETH, eETH and weETH are in ETH units, LiquidUSD in USD.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WalletBalances {
    #[serde(rename = "ETH")]
    pub eth: f64,
    #[serde(rename = "eETH")]
    pub eeth: f64,
    #[serde(rename = "weETH")]
    pub weeth: f64,
    #[serde(rename = "LiquidUSD")]
    pub liquid_usd: f64,
}

impl WalletBalances {
    pub const fn new(eth: f64, eeth: f64, weeth: f64, liquid_usd: f64) -> Self {
        Self { eth, eeth, weeth, liquid_usd }
    }

    /// Staked ETH derivatives (eETH + weETH), in ETH.
    pub fn derivative_eth(&self) -> f64 {
        self.eeth + self.weeth
    }

    /// Field-level merge: every `Some` in the patch overwrites, `None` keeps.
    pub fn merged(&self, patch: &BalancesPatch) -> Self {
        Self {
            eth: patch.eth.unwrap_or(self.eth),
            eeth: patch.eeth.unwrap_or(self.eeth),
            weeth: patch.weeth.unwrap_or(self.weeth),
            liquid_usd: patch.liquid_usd.unwrap_or(self.liquid_usd),
        }
    }
}

/// Partial balance update. Absent fields retain their prior value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct BalancesPatch {
    #[serde(rename = "ETH", default, skip_serializing_if = "Option::is_none")]
    pub eth: Option<f64>,
    #[serde(rename = "eETH", default, skip_serializing_if = "Option::is_none")]
    pub eeth: Option<f64>,
    #[serde(rename = "weETH", default, skip_serializing_if = "Option::is_none")]
    pub weeth: Option<f64>,
    #[serde(rename = "LiquidUSD", default, skip_serializing_if = "Option::is_none")]
    pub liquid_usd: Option<f64>,
}

impl BalancesPatch {
    pub fn eth(mut self, v: f64) -> Self {
        self.eth = Some(v);
        self
    }

    pub fn eeth(mut self, v: f64) -> Self {
        self.eeth = Some(v);
        self
    }

    pub fn weeth(mut self, v: f64) -> Self {
        self.weeth = Some(v);
        self
    }

    pub fn liquid_usd(mut self, v: f64) -> Self {
        self.liquid_usd = Some(v);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.fields().iter().all(|(_, v)| v.is_none())
    }

    pub fn fields(&self) -> [(&'static str, Option<f64>); 4] {
        [
            ("ETH", self.eth),
            ("eETH", self.eeth),
            ("weETH", self.weeth),
            ("LiquidUSD", self.liquid_usd),
        ]
    }

    /// Rejects negative and non-finite amounts.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in self.fields() {
            if let Some(v) = value {
                if !v.is_finite() {
                    return Err(anyhow!("{} must be a finite number, got {}", name, v));
                }
                if v < 0.0 {
                    return Err(anyhow!("{} must not be negative, got {}", name, v));
                }
            }
        }
        Ok(())
    }
}

/// Yield and borrowing parameters, all fractional (0.04 = 4%).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assumptions {
    pub apy_stake: f64,
    pub apy_liquid_usd: f64,
    pub borrow_rate: f64,
    /// Maximum loan-to-value against weETH collateral, in [0, 1].
    pub ltv_weeth: f64,
}

impl Assumptions {
    pub const fn new(apy_stake: f64, apy_liquid_usd: f64, borrow_rate: f64, ltv_weeth: f64) -> Self {
        Self {
            apy_stake,
            apy_liquid_usd,
            borrow_rate,
            ltv_weeth,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "Low",
            RiskLevel::Medium => "Medium",
            RiskLevel::High => "High",
        }
    }
}

impl FromStr for RiskLevel {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            other => Err(anyhow!("unknown risk level: {}", other)),
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserLevel {
    Beginner,
    Expert,
}

impl UserLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserLevel::Beginner => "beginner",
            UserLevel::Expert => "expert",
        }
    }
}
