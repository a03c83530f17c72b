use crate::metrics::DEFAULT_ETH_PRICE;

#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the simulator API, e.g. `http://localhost:8000`
    pub api_base: String,
    /// ETH/USD used for valuation until a live price arrives
    pub eth_price: f64,
    pub http_timeout_secs: u64,
    pub max_retries: u32,
    pub retry_base_ms: u64,
    pub retry_max_ms: u64,
    pub forecast_months: u32,
    /// Ask the API for live rates instead of its static demo values
    pub live_rates: bool,
    /// SQLite file for the chat transcript cache; `None` disables it
    pub transcript_path: Option<String>,
    pub transcript_history: usize,
    pub initial_profile: String,
}

impl Config {
    pub fn from_env() -> Self {
        Self {
            api_base: std::env::var("NAVIGATOR_API_BASE").unwrap_or_else(|_| "http://localhost:8000".to_string()),
            eth_price: std::env::var("ETH_PRICE").ok().and_then(|v| v.parse().ok()).filter(|p: &f64| *p > 0.0).unwrap_or(DEFAULT_ETH_PRICE),
            http_timeout_secs: std::env::var("HTTP_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok()).unwrap_or(10),
            max_retries: std::env::var("MAX_RETRIES").ok().and_then(|v| v.parse().ok()).unwrap_or(2),
            retry_base_ms: std::env::var("RETRY_BASE_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(200),
            retry_max_ms: std::env::var("RETRY_MAX_MS").ok().and_then(|v| v.parse().ok()).unwrap_or(3000),
            forecast_months: std::env::var("FORECAST_MONTHS").ok().and_then(|v| v.parse().ok()).unwrap_or(12),
            live_rates: std::env::var("LIVE_RATES").map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes")).unwrap_or(false),
            transcript_path: std::env::var("TRANSCRIPT_PATH").ok().filter(|p| !p.is_empty()),
            transcript_history: std::env::var("TRANSCRIPT_HISTORY").ok().and_then(|v| v.parse().ok()).unwrap_or(20),
            initial_profile: std::env::var("DEMO_PROFILE").unwrap_or_else(|_| crate::profiles::BEGINNER_ID.to_string()),
        }
    }
}
