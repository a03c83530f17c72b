use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use url::Url;

use super::dto::*;
use super::retry::{retry_async, HttpStatusError, RetryConfig};
use super::NavigatorApi;
use crate::config::Config;
use crate::logging::log_api_call;

/// Error bodies longer than this are cut before they reach logs and errors.
const MAX_ERROR_BODY: usize = 512;

pub struct HttpNavigatorApi {
    client: Client,
    base: Url,
    retry: RetryConfig,
    calls: AtomicU64,
    failures: AtomicU64,
}

impl HttpNavigatorApi {
    pub fn new(cfg: &Config) -> Result<Self> {
        let retry = RetryConfig {
            max_retries: cfg.max_retries,
            base_delay_ms: cfg.retry_base_ms,
            max_delay_ms: cfg.retry_max_ms,
            ..Default::default()
        };
        Self::with_retry(&cfg.api_base, Duration::from_secs(cfg.http_timeout_secs), retry)
    }

    pub fn with_retry(api_base: &str, timeout: Duration, retry: RetryConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("building HTTP client")?;
        Ok(Self {
            client,
            base: Self::normalize_base(api_base)?,
            retry,
            calls: AtomicU64::new(0),
            failures: AtomicU64::new(0),
        })
    }

    /// Trailing slash so relative joins keep any path prefix.
    fn normalize_base(api_base: &str) -> Result<Url> {
        let mut base = api_base.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        Url::parse(&base).with_context(|| format!("invalid API base url: {}", api_base))
    }

    pub fn endpoint(&self, path: &str) -> Result<Url> {
        self.base
            .join(path.trim_start_matches('/'))
            .with_context(|| format!("invalid endpoint path: {}", path))
    }

    pub fn calls(&self) -> u64 {
        self.calls.load(Ordering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<&Value>,
    ) -> Result<T> {
        let url = self.endpoint(path)?;
        let started = Instant::now();
        self.calls.fetch_add(1, Ordering::Relaxed);

        let mut req = self.client.request(method.clone(), url).query(query);
        if let Some(body) = body {
            req = req.json(body);
        }

        let resp = match req.send().await {
            Ok(r) => r,
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                return Err(e.into());
            }
        };
        let status = resp.status();
        let body = resp.text().await;
        log_api_call(method.as_str(), path, status.as_u16(), started.elapsed().as_secs_f64() * 1000.0);
        let text = match body {
            Ok(t) => t,
            Err(e) => {
                self.failures.fetch_add(1, Ordering::Relaxed);
                return Err(e.into());
            }
        };

        if !status.is_success() {
            self.failures.fetch_add(1, Ordering::Relaxed);
            let mut body = text;
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(HttpStatusError {
                status: status.as_u16(),
                endpoint: path.to_string(),
                body,
            }
            .into());
        }

        serde_json::from_str(&text).with_context(|| format!("decoding {} response", path))
    }

    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<Value>,
    ) -> Result<T> {
        retry_async(&self.retry, path, || {
            self.send_once(method.clone(), path, query, body.as_ref())
        })
        .await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)]) -> Result<T> {
        self.request(Method::GET, path, query, None).await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, query: &[(&str, String)], body: Value) -> Result<T> {
        self.request(Method::POST, path, query, Some(body)).await
    }
}

#[async_trait]
impl NavigatorApi for HttpNavigatorApi {
    async fn health(&self) -> Result<HealthResponse> {
        self.get("/health", &[]).await
    }

    async fn simulate(&self, req: &SimRequest) -> Result<SimResponse> {
        self.post("/api/simulate", &[], serde_json::to_value(req)?).await
    }

    async fn forecast(&self, principal: f64, apy: f64, months: u32) -> Result<ForecastResponse> {
        let query = [
            ("principal", principal.to_string()),
            ("apy", apy.to_string()),
            ("months", months.to_string()),
        ];
        self.get("/api/forecast", &query).await
    }

    async fn multi_asset_forecast(&self, req: &SimRequest, months: u32, eth_price: f64) -> Result<MultiAssetForecastResponse> {
        let query = [("months", months.to_string()), ("eth_price", eth_price.to_string())];
        self.post("/api/multi-asset-forecast", &query, serde_json::to_value(req)?).await
    }

    async fn ask(&self, req: &AskRequest) -> Result<AskResponse> {
        self.post("/api/ask", &[], serde_json::to_value(req)?).await
    }

    async fn rates(&self, live: bool) -> Result<LiveRates> {
        self.get("/api/rates", &[("live", live.to_string())]).await
    }

    async fn live_metrics(&self) -> Result<LiveRates> {
        let payload: LiveMetricsPayload = self.get("/api/live-metrics", &[]).await?;
        payload.into_result()
    }

    async fn correlation_matrix(&self) -> Result<CorrelationMatrix> {
        self.get("/api/correlation-matrix", &[]).await
    }

    async fn historical_prices(&self, asset: &str, days: u32) -> Result<Vec<PricePoint>> {
        let query = [("asset", asset.to_string()), ("days", days.to_string())];
        let resp: HistoricalPrices = self.get("/api/historical-prices", &query).await?;
        reject_inband_error(resp.error.as_ref(), "historical prices")?;
        Ok(resp.data)
    }

    async fn apy_history(&self, days: u32) -> Result<Vec<ApyPoint>> {
        let resp: ApyHistory = self.get("/api/apy-history", &[("days", days.to_string())]).await?;
        reject_inband_error(resp.error.as_ref(), "apy history")?;
        Ok(resp.data)
    }

    async fn live_price(&self, product: &str) -> Result<LivePrice> {
        let path = format!("/api/v2/prices/live/{}", product.to_uppercase());
        self.get(&path, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn api(base: &str) -> HttpNavigatorApi {
        HttpNavigatorApi::with_retry(base, Duration::from_millis(200), RetryConfig::default()).unwrap()
    }

    #[test]
    fn test_endpoint_join() {
        let a = api("http://localhost:8000");
        assert_eq!(a.endpoint("/api/simulate").unwrap().as_str(), "http://localhost:8000/api/simulate");

        let prefixed = api("https://demo.example.org/navigator");
        assert_eq!(
            prefixed.endpoint("/api/ask").unwrap().as_str(),
            "https://demo.example.org/navigator/api/ask"
        );
    }

    #[test]
    fn test_invalid_base_rejected() {
        assert!(HttpNavigatorApi::with_retry("not a url", Duration::from_secs(1), RetryConfig::default()).is_err());
    }

    #[tokio::test]
    async fn test_unreachable_api_errors_without_panicking() {
        let retry = RetryConfig {
            max_retries: 1,
            base_delay_ms: 1,
            max_delay_ms: 1,
            jitter_factor: 0.0,
        };
        // port 9 (discard) is closed on test hosts
        let a = HttpNavigatorApi::with_retry("http://127.0.0.1:9", Duration::from_millis(200), retry).unwrap();
        let req = SimRequest::from_state(&crate::store::DemoState::default());
        assert!(a.simulate(&req).await.is_err());
        assert_eq!(a.calls(), 2);
        assert_eq!(a.failures(), 2);
    }

    #[tokio::test]
    async fn test_truncated_body_counts_as_failure() {
        use std::io::{Read, Write};
        use std::net::TcpListener;

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let server = std::thread::spawn(move || {
            let (mut sock, _) = listener.accept().unwrap();
            let mut buf = [0u8; 4096];
            let _ = sock.read(&mut buf);
            // promises 100 bytes, sends a few, then hangs up
            let _ = sock.write_all(
                b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 100\r\n\r\n{\"sta",
            );
        });

        let retry = RetryConfig {
            max_retries: 0,
            ..RetryConfig::default()
        };
        let a = HttpNavigatorApi::with_retry(&format!("http://{}", addr), Duration::from_secs(2), retry).unwrap();
        assert!(a.health().await.is_err());
        assert_eq!(a.calls(), 1);
        assert_eq!(a.failures(), 1);
        server.join().unwrap();
    }
}
