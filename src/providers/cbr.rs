use anyhow::{Result, anyhow};
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, error, instrument};

use crate::providers::util::{RetryPolicy, with_retry};
use crate::rate_source::RateSource;

/// Rate source backed by the CBR daily JSON feed.
///
/// The feed quotes every listed currency in rubles and returns the whole quote
/// table in one document, so a batch lookup costs a single round trip.
pub struct CbrRateSource {
    base_url: String,
    retry: RetryPolicy,
}

impl CbrRateSource {
    pub fn new(base_url: &str, retry: RetryPolicy) -> Self {
        CbrRateSource {
            base_url: base_url.to_string(),
            retry,
        }
    }

    async fn fetch_feed(&self) -> Result<DailyFeed> {
        let url = format!("{}/daily_json.js", self.base_url);
        debug!("requesting rate feed from {}", url);

        let client = reqwest::Client::builder().user_agent("fxb/1.0").build()?;
        let response = with_retry(|| client.get(&url).send(), self.retry)
            .await
            .map_err(|e| anyhow!("request error: {} for rate feed URL: {}", e, url))?;

        if !response.status().is_success() {
            return Err(anyhow!("HTTP error: {} from rate feed", response.status()));
        }

        // The endpoint serves JSON with a JavaScript content type, so parse
        // the body text instead of relying on response.json().
        let text = response.text().await?;
        let feed: DailyFeed = serde_json::from_str(&text)
            .map_err(|e| anyhow!("failed to parse rate feed response: {}", e))?;
        debug!("received rate feed published at {}", feed.date);
        Ok(feed)
    }
}

#[derive(Debug, Deserialize)]
struct DailyFeed {
    #[serde(alias = "Date")]
    date: DateTime<FixedOffset>,
    #[serde(alias = "Valute")]
    valute: HashMap<String, FeedQuote>,
}

#[derive(Debug, Deserialize)]
struct FeedQuote {
    #[serde(alias = "Value")]
    value: Decimal,
}

#[async_trait]
impl RateSource for CbrRateSource {
    fn base_currency(&self) -> &str {
        "rub"
    }

    #[instrument(name = "CbrRateFetch", skip(self), fields(codes = ?codes))]
    async fn rates_of(&self, codes: &[String]) -> HashMap<String, Decimal> {
        let feed = match self.fetch_feed().await {
            Ok(feed) => feed,
            Err(e) => {
                error!("rate feed request failed: {e}");
                return HashMap::new();
            }
        };

        let mut rates = HashMap::with_capacity(codes.len());
        for code in codes {
            match feed.valute.get(&code.to_uppercase()) {
                Some(quote) => {
                    debug!("successfully fetched {} rate: {}", code, quote.value);
                    rates.insert(code.clone(), quote.value);
                }
                None => error!("failed to fetch {} rate", code),
            }
        }
        rates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const FEED_BODY: &str = r#"{
        "Date": "2026-08-28T11:30:00+03:00",
        "Valute": {
            "USD": {"Value": 90.5},
            "EUR": {"Value": 100.25}
        }
    }"#;

    async fn create_mock_server(mock_response: &str) -> MockServer {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/daily_json.js"))
            .respond_with(ResponseTemplate::new(200).set_body_string(mock_response))
            .mount(&mock_server)
            .await;

        mock_server
    }

    fn codes(list: &[&str]) -> Vec<String> {
        list.iter().map(|c| c.to_string()).collect()
    }

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[tokio::test]
    async fn batch_fetch_returns_every_listed_code() {
        let mock_server = create_mock_server(FEED_BODY).await;
        let source = CbrRateSource::new(&mock_server.uri(), RetryPolicy::default());

        let rates = source.rates_of(&codes(&["usd", "eur"])).await;

        assert_eq!(rates.len(), 2);
        assert_eq!(rates["usd"], dec("90.5"));
        assert_eq!(rates["eur"], dec("100.25"));
    }

    #[tokio::test]
    async fn unlisted_code_is_omitted() {
        let mock_server = create_mock_server(FEED_BODY).await;
        let source = CbrRateSource::new(&mock_server.uri(), RetryPolicy::default());

        let rates = source.rates_of(&codes(&["usd", "xyz"])).await;

        assert_eq!(rates.len(), 1);
        assert!(rates.contains_key("usd"));
        assert!(!rates.contains_key("xyz"));
    }

    #[tokio::test]
    async fn single_lookup_goes_through_the_batch_path() {
        let mock_server = create_mock_server(FEED_BODY).await;
        let source = CbrRateSource::new(&mock_server.uri(), RetryPolicy::default());

        assert_eq!(source.rate_of("eur").await, Some(dec("100.25")));
        assert_eq!(source.rate_of("xyz").await, None);
    }

    #[tokio::test]
    async fn server_error_degrades_to_no_rates() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/daily_json.js"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&mock_server)
            .await;

        let source = CbrRateSource::new(
            &mock_server.uri(),
            RetryPolicy {
                retries: 0,
                delay_ms: 1,
            },
        );
        assert!(source.rates_of(&codes(&["usd"])).await.is_empty());
    }

    #[tokio::test]
    async fn malformed_body_degrades_to_no_rates() {
        // "Valutes" instead of "Valute"
        let mock_server = create_mock_server(r#"{"Date": "2026-08-28T11:30:00+03:00", "Valutes": {}}"#).await;
        let source = CbrRateSource::new(&mock_server.uri(), RetryPolicy::default());

        assert!(source.rates_of(&codes(&["usd"])).await.is_empty());
    }

    #[tokio::test]
    async fn lookup_is_case_insensitive_against_the_feed() {
        let mock_server = create_mock_server(FEED_BODY).await;
        let source = CbrRateSource::new(&mock_server.uri(), RetryPolicy::default());

        let rates = source.rates_of(&codes(&["Usd"])).await;
        assert_eq!(rates["Usd"], dec("90.5"));
    }
}
