use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use chrono::{DateTime, Utc};
use ed25519_dalek::{Signer, SigningKey};
use governor::{Quota, RateLimiter};
use reqwest::{Client, Method};
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::config::ApiConfig;
use crate::execution::{Brokerage, ExecutionError, MarketData, MarketDataError};
use crate::models::{Fill, OrderAction, OrderIntent, PriceTick};

const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 500;
const ORDER_POLL_INTERVAL_MS: u64 = 1000;
const ORDER_POLL_ATTEMPTS: u32 = 10;

const ACCOUNTS_PATH: &str = "/api/v1/crypto/trading/accounts/";
const ORDERS_PATH: &str = "/api/v1/crypto/trading/orders/";
const HOLDINGS_PATH: &str = "/api/v1/crypto/trading/holdings/";
const TRADING_PAIRS_PATH: &str = "/api/v1/crypto/trading/trading_pairs/";
const BEST_BID_ASK_PATH: &str = "/api/v1/crypto/marketdata/best_bid_ask/";

type ApiRateLimiter = RateLimiter<
    governor::state::direct::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// API key and base64 ed25519 seed, read from `API_KEY` / `BASE64_PRIVATE_KEY`
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub private_key_base64: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var("API_KEY").context("API_KEY not set")?;
        let private_key_base64 =
            std::env::var("BASE64_PRIVATE_KEY").context("BASE64_PRIVATE_KEY not set")?;
        Ok(Self {
            api_key,
            private_key_base64,
        })
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"***")
            .field("private_key_base64", &"***")
            .finish()
    }
}

// ============================================================================
// Response types
// ============================================================================

#[derive(Debug, Deserialize)]
struct Paginated<T> {
    results: Vec<T>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Account {
    pub account_number: String,
    #[serde(default)]
    pub status: String,
    #[serde(deserialize_with = "de_f64")]
    pub buying_power: f64,
    #[serde(default)]
    pub buying_power_currency: String,
}

/// Best bid/ask for one symbol. Prices include the venue spread.
#[derive(Debug, Clone, Deserialize)]
pub struct Quote {
    pub symbol: String,
    #[serde(default, alias = "bid_price", deserialize_with = "de_opt_f64")]
    pub bid_inclusive_of_sell_spread: Option<f64>,
    #[serde(default, alias = "ask_price", deserialize_with = "de_opt_f64")]
    pub ask_inclusive_of_buy_spread: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub price: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<String>,
}

impl Quote {
    /// Bid/ask midpoint, falling back to the single `price` field
    pub fn mid_price(&self) -> Option<f64> {
        match (self.bid_inclusive_of_sell_spread, self.ask_inclusive_of_buy_spread) {
            (Some(bid), Some(ask)) => Some((bid + ask) / 2.0),
            _ => self.price,
        }
    }

    pub fn quoted_at(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .as_deref()
            .and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
            .map(|ts| ts.with_timezone(&Utc))
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Holding {
    pub asset_code: String,
    #[serde(default, deserialize_with = "de_f64")]
    pub total_quantity: f64,
    #[serde(default, deserialize_with = "de_f64")]
    pub quantity_available_for_trading: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TradingPair {
    pub symbol: String,
    #[serde(default)]
    pub status: String,
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub min_order_size: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub asset_increment: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderState {
    Open,
    PartiallyFilled,
    Filled,
    Canceled,
    Failed,
    #[serde(other)]
    Unknown,
}

impl OrderState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            OrderState::Filled | OrderState::Canceled | OrderState::Failed
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    pub id: String,
    #[serde(default)]
    pub client_order_id: Option<String>,
    #[serde(default)]
    pub side: String,
    pub state: OrderState,
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub average_price: Option<f64>,
    #[serde(default, deserialize_with = "de_opt_f64")]
    pub filled_asset_quantity: Option<f64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(f64),
    Text(String),
}

impl NumberOrString {
    fn into_f64<E: serde::de::Error>(self) -> std::result::Result<f64, E> {
        match self {
            NumberOrString::Number(n) => Ok(n),
            NumberOrString::Text(s) => s.trim().parse().map_err(E::custom),
        }
    }
}

/// The API sends decimals either as JSON numbers or as strings
fn de_f64<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<f64, D::Error> {
    NumberOrString::deserialize(deserializer)?.into_f64()
}

fn de_opt_f64<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> std::result::Result<Option<f64>, D::Error> {
    Option::<NumberOrString>::deserialize(deserializer)?
        .map(NumberOrString::into_f64)
        .transpose()
}

/// Quantity as the API wants it: plain decimal string, at most 8 places
pub fn format_quantity(quantity: f64) -> Result<String> {
    let decimal = Decimal::from_f64(quantity)
        .with_context(|| format!("quantity {} is not representable", quantity))?;
    Ok(decimal.round_dp(8).normalize().to_string())
}

fn query(key: &str, values: &[&str]) -> String {
    if values.is_empty() {
        return String::new();
    }
    let params: Vec<String> = values.iter().map(|v| format!("{}={}", key, v)).collect();
    format!("?{}", params.join("&"))
}

// ============================================================================
// Client
// ============================================================================

/// Signed client for the Robinhood crypto trading API
///
/// Every request carries `x-api-key`, `x-timestamp` and an ed25519
/// `x-signature` over `api_key + timestamp + path + method + body`.
/// Clones share the same rate limiter.
#[derive(Clone)]
pub struct RobinhoodClient {
    client: Client,
    base_url: String,
    api_key: String,
    signing_key: SigningKey,
    rate_limiter: Arc<ApiRateLimiter>,
    retry_backoff: Duration,
    order_poll_interval: Duration,
    order_poll_attempts: u32,
}

impl RobinhoodClient {
    pub fn new(config: &ApiConfig, credentials: &Credentials) -> Result<Self> {
        let seed = BASE64
            .decode(credentials.private_key_base64.trim())
            .context("BASE64_PRIVATE_KEY is not valid base64")?;
        let seed: [u8; 32] = seed
            .as_slice()
            .try_into()
            .map_err(|_| anyhow::anyhow!("private key seed must be 32 bytes, got {}", seed.len()))?;

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to build HTTP client")?;

        let rpm = NonZeroU32::new(config.requests_per_minute).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = Arc::new(RateLimiter::direct(Quota::per_minute(rpm)));

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: credentials.api_key.clone(),
            signing_key: SigningKey::from_bytes(&seed),
            rate_limiter,
            retry_backoff: Duration::from_millis(INITIAL_BACKOFF_MS),
            order_poll_interval: Duration::from_millis(ORDER_POLL_INTERVAL_MS),
            order_poll_attempts: ORDER_POLL_ATTEMPTS,
        })
    }

    /// Base delay between GET retries (doubles per attempt)
    pub fn with_retry_backoff(mut self, backoff: Duration) -> Self {
        self.retry_backoff = backoff;
        self
    }

    pub fn with_order_polling(mut self, interval: Duration, attempts: u32) -> Self {
        self.order_poll_interval = interval;
        self.order_poll_attempts = attempts.max(1);
        self
    }

    /// Base64 signature of `api_key + timestamp + path + method + body`
    pub fn sign(&self, timestamp: i64, path: &str, method: &Method, body: &str) -> String {
        let message = format!(
            "{}{}{}{}{}",
            self.api_key,
            timestamp,
            path,
            method.as_str(),
            body
        );
        let signature = self.signing_key.sign(message.as_bytes());
        BASE64.encode(signature.to_bytes())
    }

    /// Rate-limited, signed request. GETs retry on 429, 5xx and network errors.
    async fn request(&self, method: Method, path: &str, body: Option<String>) -> Result<reqwest::Response> {
        let body = body.unwrap_or_default();
        let url = format!("{}{}", self.base_url, path);
        let attempts = if method == Method::GET { MAX_RETRIES } else { 1 };

        for attempt in 1..=attempts {
            self.rate_limiter.until_ready().await;

            let timestamp = Utc::now().timestamp();
            let signature = self.sign(timestamp, path, &method, &body);

            let mut request = self
                .client
                .request(method.clone(), &url)
                .header("x-api-key", &self.api_key)
                .header("x-signature", signature)
                .header("x-timestamp", timestamp.to_string());
            if !body.is_empty() {
                request = request
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(body.clone());
            }

            let backoff = self.retry_backoff * 2u32.pow(attempt - 1);
            match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        return Ok(response);
                    }

                    let retryable = status.as_u16() == 429 || status.is_server_error();
                    if retryable && attempt < attempts {
                        tracing::warn!(
                            "Robinhood returned {} for {} {}, retrying in {:?} (attempt {}/{})",
                            status,
                            method,
                            path,
                            backoff,
                            attempt,
                            attempts
                        );
                        tokio::time::sleep(backoff).await;
                        continue;
                    }

                    let error_text = response
                        .text()
                        .await
                        .unwrap_or_else(|_| "Unknown error".to_string());
                    anyhow::bail!("Robinhood API error ({}): {}", status, error_text);
                }
                Err(e) if attempt < attempts => {
                    tracing::warn!(
                        "Network error: {}, retrying in {:?} (attempt {}/{})",
                        e,
                        backoff,
                        attempt,
                        attempts
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e).context(format!("{} {} failed", method, path)),
            }
        }

        anyhow::bail!("{} {} failed after {} attempts", method, path, attempts)
    }

    async fn get_json<T: serde::de::DeserializeOwned>(&self, path: &str) -> Result<T> {
        let response = self.request(Method::GET, path, None).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse response from {}", path))
    }

    pub async fn account(&self) -> Result<Account> {
        // some deployments wrap the account in `results`
        let value: serde_json::Value = self.get_json(ACCOUNTS_PATH).await?;
        let account = match value.get("results").and_then(|r| r.get(0)) {
            Some(first) => serde_json::from_value(first.clone()),
            None => serde_json::from_value(value),
        };
        account.context("Failed to parse account")
    }

    pub async fn best_bid_ask(&self, symbol: &str) -> Result<Quote> {
        let path = format!("{}{}", BEST_BID_ASK_PATH, query("symbol", &[symbol]));
        let page: Paginated<Quote> = self.get_json(&path).await?;
        page.results
            .into_iter()
            .find(|q| q.symbol == symbol)
            .with_context(|| format!("No quote returned for {}", symbol))
    }

    pub async fn holdings(&self, asset_codes: &[&str]) -> Result<Vec<Holding>> {
        let path = format!("{}{}", HOLDINGS_PATH, query("asset_code", asset_codes));
        let page: Paginated<Holding> = self.get_json(&path).await?;
        Ok(page.results)
    }

    pub async fn trading_pairs(&self, symbols: &[&str]) -> Result<Vec<TradingPair>> {
        let path = format!("{}{}", TRADING_PAIRS_PATH, query("symbol", symbols));
        let page: Paginated<TradingPair> = self.get_json(&path).await?;
        Ok(page.results)
    }

    /// Submit a market order. Never retried; `client_order_id` makes it idempotent.
    pub async fn place_market_order(
        &self,
        client_order_id: Uuid,
        side: OrderAction,
        symbol: &str,
        quantity: f64,
    ) -> Result<Order> {
        let body = serde_json::json!({
            "client_order_id": client_order_id.to_string(),
            "side": side.to_string(),
            "type": "market",
            "symbol": symbol,
            "market_order_config": { "asset_quantity": format_quantity(quantity)? },
        })
        .to_string();

        tracing::info!("📤 Placing market {} {} {}", side, quantity, symbol);

        let response = self.request(Method::POST, ORDERS_PATH, Some(body)).await?;
        response.json().await.context("Failed to parse order response")
    }

    pub async fn get_order(&self, order_id: &str) -> Result<Order> {
        self.get_json(&format!("{}{}/", ORDERS_PATH, order_id)).await
    }

    pub async fn cancel_order(&self, order_id: &str) -> Result<()> {
        let path = format!("{}{}/cancel/", ORDERS_PATH, order_id);
        self.request(Method::POST, &path, None).await?;
        Ok(())
    }

    /// Poll an order until it reaches a terminal state or attempts run out
    pub async fn wait_for_order(&self, mut order: Order) -> Result<Order> {
        for _ in 0..self.order_poll_attempts {
            if order.state.is_terminal() {
                break;
            }
            tokio::time::sleep(self.order_poll_interval).await;
            order = self.get_order(&order.id).await?;
        }
        Ok(order)
    }
}

// ============================================================================
// Trading venue adapter
// ============================================================================

/// Robinhood bound to one trading pair, usable as market data and brokerage
#[derive(Clone)]
pub struct RobinhoodVenue {
    client: RobinhoodClient,
    symbol: String,
}

impl RobinhoodVenue {
    pub fn new(client: RobinhoodClient, symbol: impl Into<String>) -> Self {
        Self {
            client,
            symbol: symbol.into(),
        }
    }

    pub fn client(&self) -> &RobinhoodClient {
        &self.client
    }
}

#[async_trait]
impl MarketData for RobinhoodVenue {
    async fn latest_tick(&mut self) -> std::result::Result<PriceTick, MarketDataError> {
        let quote = self
            .client
            .best_bid_ask(&self.symbol)
            .await
            .map_err(|e| MarketDataError::Unavailable(format!("{:#}", e)))?;

        let price = quote
            .mid_price()
            .ok_or_else(|| MarketDataError::Malformed(format!("no price in quote for {}", self.symbol)))?;

        Ok(PriceTick::new(quote.quoted_at().unwrap_or_else(Utc::now), price))
    }
}

#[async_trait]
impl Brokerage for RobinhoodVenue {
    async fn available_funds(&mut self) -> Result<f64> {
        Ok(self.client.account().await?.buying_power)
    }

    async fn execute(&mut self, intent: &OrderIntent) -> std::result::Result<Fill, ExecutionError> {
        let placed = self
            .client
            .place_market_order(intent.client_order_id, intent.action, &self.symbol, intent.quantity)
            .await
            .map_err(|e| {
                if e.downcast_ref::<reqwest::Error>().is_some() {
                    ExecutionError::Transport(format!("{:#}", e))
                } else {
                    ExecutionError::Rejected(format!("{:#}", e))
                }
            })?;

        let mut order = self
            .client
            .wait_for_order(placed)
            .await
            .map_err(|e| ExecutionError::Transport(format!("{:#}", e)))?;

        if !order.state.is_terminal() {
            if let Err(e) = self.client.cancel_order(&order.id).await {
                tracing::warn!("Failed to cancel unconfirmed order {}: {:#}", order.id, e);
            }
            // units filled before the cancel landed still count
            match self.client.get_order(&order.id).await {
                Ok(latest) => order = latest,
                Err(e) => tracing::warn!("Failed to refresh order {} after cancel: {:#}", order.id, e),
            }
        }

        let filled = match order.state {
            OrderState::Filled => order.filled_asset_quantity.unwrap_or(intent.quantity),
            _ => order.filled_asset_quantity.unwrap_or(0.0),
        };

        if filled > 0.0 {
            if order.state != OrderState::Filled {
                tracing::warn!(
                    "Order {} ended {:?} with {:.8} of {:.8} filled",
                    order.id,
                    order.state,
                    filled,
                    intent.quantity
                );
            }
            return Ok(Fill {
                order_id: intent.client_order_id,
                action: intent.action,
                price: order.average_price.unwrap_or(intent.reference_price),
                quantity: filled,
                timestamp: Utc::now(),
            });
        }

        match order.state {
            OrderState::Canceled | OrderState::Failed | OrderState::Filled => Err(ExecutionError::NotFilled {
                order_id: intent.client_order_id,
                state: format!("{:?}", order.state).to_lowercase(),
            }),
            _ => Err(ExecutionError::Timeout(intent.client_order_id)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signature, Verifier};
    use mockito::Matcher;

    // 32 zero bytes
    const TEST_SEED: &str = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA=";

    fn credentials() -> Credentials {
        Credentials {
            api_key: "test-key".to_string(),
            private_key_base64: TEST_SEED.to_string(),
        }
    }

    fn client_for(server: &mockito::Server) -> RobinhoodClient {
        let config = ApiConfig {
            base_url: server.url(),
            ..ApiConfig::default()
        };
        RobinhoodClient::new(&config, &credentials())
            .unwrap()
            .with_retry_backoff(Duration::from_millis(1))
            .with_order_polling(Duration::from_millis(1), 3)
    }

    #[test]
    fn test_signature_verifies() {
        let client = RobinhoodClient::new(&ApiConfig::default(), &credentials()).unwrap();
        let signature = client.sign(1_700_000_000, ACCOUNTS_PATH, &Method::GET, "");

        let bytes: [u8; 64] = BASE64.decode(signature).unwrap().try_into().unwrap();
        let message = format!("test-key1700000000{}GET", ACCOUNTS_PATH);
        let key = SigningKey::from_bytes(&[0u8; 32]).verifying_key();
        assert!(key
            .verify(message.as_bytes(), &Signature::from_bytes(&bytes))
            .is_ok());
    }

    #[test]
    fn test_rejects_short_key() {
        let creds = Credentials {
            api_key: "k".to_string(),
            private_key_base64: BASE64.encode([1u8; 16]),
        };
        assert!(RobinhoodClient::new(&ApiConfig::default(), &creds).is_err());
    }

    #[test]
    fn test_format_quantity() {
        assert_eq!(format_quantity(5.0).unwrap(), "5");
        assert_eq!(format_quantity(0.5).unwrap(), "0.5");
        assert_eq!(format_quantity(12.123456789).unwrap(), "12.12345679");
    }

    #[test]
    fn test_quote_midpoint() {
        let quote: Quote = serde_json::from_str(
            r#"{"symbol":"XRP-USD","bid_inclusive_of_sell_spread":"0.49","ask_inclusive_of_buy_spread":0.51}"#,
        )
        .unwrap();
        assert!((quote.mid_price().unwrap() - 0.5).abs() < 1e-12);

        let single: Quote = serde_json::from_str(r#"{"symbol":"XRP-USD","price":"0.52"}"#).unwrap();
        assert_eq!(single.mid_price(), Some(0.52));
    }

    #[tokio::test]
    async fn test_best_bid_ask_is_signed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", BEST_BID_ASK_PATH)
            .match_query(Matcher::UrlEncoded("symbol".into(), "XRP-USD".into()))
            .match_header("x-api-key", "test-key")
            .match_header("x-signature", Matcher::Any)
            .match_header("x-timestamp", Matcher::Regex(r"^\d+$".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"results":[{"symbol":"XRP-USD","price":"0.50","bid_inclusive_of_sell_spread":"0.49","ask_inclusive_of_buy_spread":"0.51","timestamp":"2024-05-01T12:00:00Z"}]}"#,
            )
            .create_async()
            .await;

        let mut venue = RobinhoodVenue::new(client_for(&server), "XRP-USD");
        let tick = venue.latest_tick().await.unwrap();

        assert!((tick.price - 0.5).abs() < 1e-12);
        assert_eq!(tick.timestamp.to_rfc3339(), "2024-05-01T12:00:00+00:00");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_get_retries_server_errors() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("GET", ACCOUNTS_PATH)
            .with_status(503)
            .expect(3)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.account().await.unwrap_err();
        assert!(err.to_string().contains("503"));
        failing.assert_async().await;
    }

    #[tokio::test]
    async fn test_account_buying_power() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", ACCOUNTS_PATH)
            .with_status(200)
            .with_body(r#"{"account_number":"123","status":"active","buying_power":"250.75","buying_power_currency":"USD"}"#)
            .create_async()
            .await;

        let mut venue = RobinhoodVenue::new(client_for(&server), "XRP-USD");
        assert_eq!(venue.available_funds().await.unwrap(), 250.75);
    }

    #[tokio::test]
    async fn test_market_order_polls_until_filled() {
        let mut server = mockito::Server::new_async().await;
        let intent = OrderIntent::new(
            OrderAction::Buy,
            10.0,
            0.5,
            crate::models::IntentReason::Entry,
        );

        let place = server
            .mock("POST", ORDERS_PATH)
            .match_body(Matcher::PartialJson(serde_json::json!({
                "client_order_id": intent.client_order_id.to_string(),
                "side": "buy",
                "type": "market",
                "symbol": "XRP-USD",
                "market_order_config": { "asset_quantity": "10" }
            })))
            .with_status(201)
            .with_body(r#"{"id":"ord-1","side":"buy","state":"open"}"#)
            .expect(1)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/crypto/trading/orders/ord-1/")
            .with_status(200)
            .with_body(r#"{"id":"ord-1","side":"buy","state":"filled","average_price":"0.501","filled_asset_quantity":"10"}"#)
            .create_async()
            .await;

        let mut venue = RobinhoodVenue::new(client_for(&server), "XRP-USD");
        let fill = venue.execute(&intent).await.unwrap();

        assert_eq!(fill.order_id, intent.client_order_id);
        assert_eq!(fill.price, 0.501);
        assert_eq!(fill.quantity, 10.0);
        place.assert_async().await;
    }

    #[tokio::test]
    async fn test_orders_are_not_retried() {
        let mut server = mockito::Server::new_async().await;
        let place = server
            .mock("POST", ORDERS_PATH)
            .with_status(500)
            .with_body("boom")
            .expect(1)
            .create_async()
            .await;

        let intent = OrderIntent::new(
            OrderAction::Sell,
            1.0,
            0.5,
            crate::models::IntentReason::StopLoss,
        );
        let mut venue = RobinhoodVenue::new(client_for(&server), "XRP-USD");
        let err = venue.execute(&intent).await.unwrap_err();

        assert!(matches!(err, ExecutionError::Rejected(_)));
        place.assert_async().await;
    }

    #[tokio::test]
    async fn test_canceled_order_is_not_a_fill() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", ORDERS_PATH)
            .with_status(201)
            .with_body(r#"{"id":"ord-2","side":"buy","state":"canceled"}"#)
            .create_async()
            .await;

        let intent = OrderIntent::new(
            OrderAction::Buy,
            1.0,
            0.5,
            crate::models::IntentReason::Entry,
        );
        let mut venue = RobinhoodVenue::new(client_for(&server), "XRP-USD");
        let err = venue.execute(&intent).await.unwrap_err();
        assert!(matches!(err, ExecutionError::NotFilled { .. }));
    }

    #[tokio::test]
    async fn test_partially_filled_order_returns_filled_part() {
        let mut server = mockito::Server::new_async().await;
        let intent = OrderIntent::new(
            OrderAction::Buy,
            10.0,
            0.5,
            crate::models::IntentReason::Entry,
        );
        let partial = r#"{"id":"ord-3","side":"buy","state":"partially_filled","average_price":"0.502","filled_asset_quantity":"6"}"#;

        server
            .mock("POST", ORDERS_PATH)
            .with_status(201)
            .with_body(partial)
            .create_async()
            .await;
        server
            .mock("GET", "/api/v1/crypto/trading/orders/ord-3/")
            .with_status(200)
            .with_body(partial)
            .create_async()
            .await;
        let cancel = server
            .mock("POST", "/api/v1/crypto/trading/orders/ord-3/cancel/")
            .with_status(200)
            .with_body("{}")
            .expect(1)
            .create_async()
            .await;

        let mut venue = RobinhoodVenue::new(client_for(&server), "XRP-USD");
        let fill = venue.execute(&intent).await.unwrap();

        assert_eq!(fill.order_id, intent.client_order_id);
        assert_eq!(fill.quantity, 6.0);
        assert_eq!(fill.price, 0.502);
        cancel.assert_async().await;
    }

    #[tokio::test]
    async fn test_canceled_order_with_fills_is_a_partial_fill() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", ORDERS_PATH)
            .with_status(201)
            .with_body(r#"{"id":"ord-4","side":"sell","state":"canceled","average_price":"0.49","filled_asset_quantity":"2.5"}"#)
            .create_async()
            .await;

        let intent = OrderIntent::new(
            OrderAction::Sell,
            4.0,
            0.5,
            crate::models::IntentReason::StopLoss,
        );
        let mut venue = RobinhoodVenue::new(client_for(&server), "XRP-USD");
        let fill = venue.execute(&intent).await.unwrap();

        assert_eq!(fill.action, OrderAction::Sell);
        assert_eq!(fill.quantity, 2.5);
        assert_eq!(fill.price, 0.49);
    }

    #[tokio::test]
    async fn test_holdings_and_pairs() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", HOLDINGS_PATH)
            .match_query(Matcher::UrlEncoded("asset_code".into(), "XRP".into()))
            .with_status(200)
            .with_body(r#"{"results":[{"asset_code":"XRP","total_quantity":"42.5","quantity_available_for_trading":"40"}]}"#)
            .create_async()
            .await;
        server
            .mock("GET", TRADING_PAIRS_PATH)
            .with_status(200)
            .with_body(r#"{"results":[{"symbol":"XRP-USD","status":"tradable","min_order_size":"1","asset_increment":"0.01"}]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let holdings = client.holdings(&["XRP"]).await.unwrap();
        assert_eq!(holdings[0].total_quantity, 42.5);

        let pairs = client.trading_pairs(&[]).await.unwrap();
        assert_eq!(pairs[0].symbol, "XRP-USD");
        assert_eq!(pairs[0].asset_increment, Some(0.01));
    }
}
