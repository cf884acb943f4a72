//! Cross-rate aggregation and balance valuation.

use indexmap::IndexMap;
use rust_decimal::{Decimal, RoundingStrategy};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::rate_source::RateSource;

/// Currency code → amount, in insertion order.
pub type Balance = IndexMap<String, Decimal>;

/// `"a-b"` pair key → rate of `a` expressed in units of `b`.
pub type CrossRates = IndexMap<String, Decimal>;

/// Currency code → value of the whole balance in that currency.
pub type TotalAmount = IndexMap<String, Decimal>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid currency code: {0:?} (expected 3 letters)")]
    InvalidCurrency(String),
    #[error("duplicate currency in balance: {0}")]
    DuplicateCurrency(String),
    #[error("there is no {0} in the current balance")]
    CurrencyNotFound(String),
}

fn round2(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// Normalizes a currency code to its internal lowercase form.
fn normalize(code: &str) -> Result<String, EngineError> {
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(code.to_ascii_lowercase())
    } else {
        Err(EngineError::InvalidCurrency(code.to_string()))
    }
}

/// Owns a multi-currency balance and values it through a [`RateSource`].
///
/// The engine keeps no state besides the balance: every aggregation pulls
/// fresh rates from the source, so two calls may observe different feed
/// snapshots. Staleness control belongs to the caller's refresh cadence.
pub struct ConversionEngine {
    source: Arc<dyn RateSource>,
    balance: Balance,
}

impl ConversionEngine {
    pub fn new(balance: Balance, source: Arc<dyn RateSource>) -> Result<Self, EngineError> {
        let mut engine = ConversionEngine {
            source,
            balance: Balance::new(),
        };
        engine.set_balance(balance)?;
        Ok(engine)
    }

    pub fn balance(&self) -> &Balance {
        &self.balance
    }

    /// Replaces the balance wholesale. Codes are case-insensitive and stored
    /// lowercase; codes that are not 3 letters, or that collide after
    /// normalization, are rejected without touching the current balance.
    pub fn set_balance(&mut self, new_balance: Balance) -> Result<(), EngineError> {
        let mut normalized = Balance::with_capacity(new_balance.len());
        for (code, amount) in new_balance {
            let code = normalize(&code)?;
            if normalized.insert(code.clone(), amount).is_some() {
                return Err(EngineError::DuplicateCurrency(code));
            }
        }
        self.balance = normalized;
        info!("new balance was set: {:?}", self.balance);
        Ok(())
    }

    /// Applies per-currency deltas, all-or-nothing: every delta must name a
    /// currency already held, otherwise the call fails and no delta is applied.
    pub fn modify_balance(&mut self, deltas: &Balance) -> Result<(), EngineError> {
        let mut changes = Vec::with_capacity(deltas.len());
        for (code, delta) in deltas {
            let code = normalize(code)?;
            if !self.balance.contains_key(&code) {
                return Err(EngineError::CurrencyNotFound(code));
            }
            changes.push((code, *delta));
        }
        for (code, delta) in changes {
            let amount = &mut self.balance[&code];
            let old = *amount;
            *amount += delta;
            info!("balance {code}: {old} -> {amount}");
        }
        Ok(())
    }

    /// Amount held in `code`, or `None` when the currency is not part of the
    /// balance.
    pub fn currency_amount(&self, code: &str) -> Option<Decimal> {
        self.balance.get(&code.to_ascii_lowercase()).copied()
    }

    /// Base-relative rates for every held currency, in candidate order: the
    /// base identity first when the base is held, then the other currencies in
    /// balance order. Currencies the source cannot supply are skipped.
    async fn candidate_rates(&self) -> Vec<(String, Decimal)> {
        let base = self.source.base_currency();
        let mut candidates = Vec::with_capacity(self.balance.len());
        if self.balance.contains_key(base) {
            candidates.push((base.to_string(), self.source.base_currency_rate()));
        }

        let wanted: Vec<String> = self
            .balance
            .keys()
            .filter(|code| *code != base)
            .cloned()
            .collect();
        let fetched = self.source.rates_of(&wanted).await;
        for code in wanted {
            match fetched.get(&code) {
                Some(rate) => candidates.push((code, *rate)),
                None => warn!("no rate available for {code}, skipping"),
            }
        }
        candidates
    }

    /// Cross rates between every pair of held currencies with an available
    /// base-relative rate.
    ///
    /// Each unordered candidate pair (first, second) yields one entry keyed
    /// `"{second}-{first}"`, valued `second / first` and rounded half-up to
    /// 2 decimal places. Unavailable currencies are skipped rather than
    /// failing the aggregation; the table is empty when no pair remains.
    pub async fn get_all_rates(&self) -> CrossRates {
        let base = self.source.base_currency();
        let mut rates = CrossRates::new();

        if self.balance.len() == 1 && self.balance.contains_key(base) {
            rates.insert(format!("{base}-{base}"), self.source.base_currency_rate());
            return rates;
        }

        let candidates = self.candidate_rates().await;
        for (i, (first, first_rate)) in candidates.iter().enumerate() {
            for (second, second_rate) in &candidates[i + 1..] {
                if first_rate.is_zero() {
                    warn!("zero rate for {first}, skipping {second}-{first}");
                    continue;
                }
                rates.insert(
                    format!("{second}-{first}"),
                    round2(second_rate / first_rate),
                );
            }
        }
        debug!("aggregated {} cross rates", rates.len());
        rates
    }

    /// Value of the entire balance re-expressed in each held currency,
    /// rounded half-up to 2 decimal places after summation.
    ///
    /// All-or-nothing: if any conversion needed to complete a total is
    /// unavailable the whole call returns `None` — a partial sum would
    /// misrepresent total wealth.
    pub async fn get_total_amount(&self) -> Option<TotalAmount> {
        let all_rates = self.get_all_rates().await;

        // Both directions of every published pair; the inverse is the
        // reciprocal of the rounded cross rate, not independently rounded.
        let mut conversions: HashMap<&str, HashMap<&str, Decimal>> = HashMap::new();
        for (pair, rate) in &all_rates {
            let (from, to) = pair.split_once('-')?;
            conversions.entry(from).or_default().insert(to, *rate);
            if !rate.is_zero() {
                conversions
                    .entry(to)
                    .or_default()
                    .insert(from, Decimal::ONE / rate);
            }
        }

        let mut totals = TotalAmount::with_capacity(self.balance.len());
        for (currency, amount) in &self.balance {
            let mut total = *amount;
            for (other, other_amount) in &self.balance {
                if other == currency {
                    continue;
                }
                let rate = conversions
                    .get(other.as_str())
                    .and_then(|to| to.get(currency.as_str()));
                match rate {
                    Some(rate) => total += other_amount * rate,
                    None => {
                        warn!("missing {other}-{currency} rate, total is unavailable");
                        return None;
                    }
                }
            }
            totals.insert(currency.clone(), round2(total));
        }
        Some(totals)
    }
}
