//! Client side of the simulator / forecast / chat API.
//!
//! The API itself lives outside this crate. [`NavigatorApi`] is the seam the
//! rest of the crate talks to; [`HttpNavigatorApi`] is the reqwest-backed
//! implementation.

use anyhow::Result;
use async_trait::async_trait;

mod client;
pub mod context;
pub mod dto;
pub mod price;
pub mod retry;
pub mod sequence;

pub use client::HttpNavigatorApi;
pub use context::ChatContext;
pub use dto::*;

#[async_trait]
pub trait NavigatorApi: Send + Sync {
    async fn health(&self) -> Result<HealthResponse>;
    async fn simulate(&self, req: &SimRequest) -> Result<SimResponse>;
    async fn forecast(&self, principal: f64, apy: f64, months: u32) -> Result<ForecastResponse>;
    async fn multi_asset_forecast(&self, req: &SimRequest, months: u32, eth_price: f64) -> Result<MultiAssetForecastResponse>;
    async fn ask(&self, req: &AskRequest) -> Result<AskResponse>;
    async fn rates(&self, live: bool) -> Result<LiveRates>;
    async fn live_metrics(&self) -> Result<LiveRates>;
    async fn correlation_matrix(&self) -> Result<CorrelationMatrix>;
    async fn historical_prices(&self, asset: &str, days: u32) -> Result<Vec<PricePoint>>;
    async fn apy_history(&self, days: u32) -> Result<Vec<ApyPoint>>;
    async fn live_price(&self, product: &str) -> Result<LivePrice>;
}
