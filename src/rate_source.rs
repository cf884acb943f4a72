//! Rate feed abstraction: base-relative currency rates.

use async_trait::async_trait;
use rust_decimal::Decimal;
use std::collections::HashMap;

/// A feed of currency rates quoted against one fixed base currency.
///
/// Lookups fail soft: a currency the feed cannot supply (transport error,
/// malformed response, unlisted code) is reported as absent, never as an error.
#[async_trait]
pub trait RateSource: Send + Sync {
    /// Currency the feed quotes every other currency against.
    fn base_currency(&self) -> &str;

    /// One unit of the base currency is always worth exactly 1 of itself.
    /// A fixed identity, never fetched.
    fn base_currency_rate(&self) -> Decimal {
        Decimal::ONE
    }

    /// Value of 1 unit of `code` in base-currency terms, or `None` when the
    /// feed cannot supply it.
    async fn rate_of(&self, code: &str) -> Option<Decimal> {
        let wanted = [code.to_string()];
        let mut rates = self.rates_of(&wanted).await;
        rates.remove(code)
    }

    /// Batch lookup: fetch rates for several codes in one upstream round trip
    /// where the feed supports it. Codes the feed cannot supply are omitted
    /// from the result.
    async fn rates_of(&self, codes: &[String]) -> HashMap<String, Decimal>;
}
