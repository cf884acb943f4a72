use crate::engine::{Balance, ConversionEngine, CrossRates, TotalAmount};
use crate::ui;
use anyhow::{Result, bail};
use comfy_table::Cell;
use tracing::debug;

/// Cross-rate table for display.
pub struct RatesReport {
    pub rates: CrossRates,
}

impl RatesReport {
    pub fn display_as_table(&self) -> String {
        if self.rates.is_empty() {
            return ui::style_text("No exchange rates are available right now.", ui::StyleType::Error);
        }

        let mut table = ui::new_styled_table();
        table.set_header(vec![ui::header_cell("Pair"), ui::header_cell("Rate")]);

        for (pair, rate) in &self.rates {
            table.add_row(vec![
                Cell::new(pair.to_uppercase()),
                ui::value_cell(&rate.to_string()),
            ]);
        }

        format!(
            "{}\n\n{}",
            ui::style_text("Exchange rates", ui::StyleType::Title),
            table
        )
    }
}

/// Per-currency balance valuation for display.
pub struct TotalsReport {
    pub totals: TotalAmount,
}

impl TotalsReport {
    pub fn display_as_table(&self) -> String {
        let mut table = ui::new_styled_table();
        table.set_header(vec![
            ui::header_cell("Currency"),
            ui::header_cell("Total value"),
        ]);

        for (currency, total) in &self.totals {
            table.add_row(vec![
                Cell::new(currency.to_uppercase()),
                ui::value_cell(&ui::style_text(&total.to_string(), ui::StyleType::TotalValue)),
            ]);
        }

        format!(
            "{}\n\n{}",
            ui::style_text("Total balance value per currency", ui::StyleType::Title),
            table
        )
    }
}

fn balance_table(balance: &Balance) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Currency"),
        ui::header_cell("Amount"),
    ]);

    for (currency, amount) in balance {
        table.add_row(vec![
            Cell::new(currency.to_uppercase()),
            ui::value_cell(&amount.to_string()),
        ]);
    }

    format!(
        "{}\n\n{}",
        ui::style_text("Balance", ui::StyleType::Title),
        table
    )
}

/// Fetches and prints the cross-rate table.
pub async fn show_rates(engine: &ConversionEngine) -> Result<()> {
    let pb = ui::new_spinner("Fetching exchange rates...");
    let rates = engine.get_all_rates().await;
    pb.finish_and_clear();
    debug!("displaying {} rate pairs", rates.len());

    println!("{}", RatesReport { rates }.display_as_table());
    Ok(())
}

/// Fetches rates and prints the balance valued in each held currency.
///
/// An unavailable total (any needed conversion missing) is surfaced as an
/// error instead of a partial table.
pub async fn show_totals(engine: &ConversionEngine) -> Result<()> {
    let pb = ui::new_spinner("Valuing balance...");
    let totals = engine.get_total_amount().await;
    pb.finish_and_clear();

    match totals {
        Some(totals) => {
            println!("{}", TotalsReport { totals }.display_as_table());
            Ok(())
        }
        None => bail!("exchange rates are temporarily unavailable, the balance cannot be valued"),
    }
}

/// Prints the current balance.
pub fn show_balance(engine: &ConversionEngine) {
    println!("{}", balance_table(engine.balance()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn rates(entries: &[(&str, &str)]) -> CrossRates {
        entries
            .iter()
            .map(|(pair, rate)| (pair.to_string(), rate.parse::<Decimal>().unwrap()))
            .collect()
    }

    #[test]
    fn rates_table_lists_every_pair() {
        let report = RatesReport {
            rates: rates(&[("usd-rub", "90.00"), ("eur-usd", "1.11")]),
        };
        let rendered = report.display_as_table();

        assert!(rendered.contains("USD-RUB"));
        assert!(rendered.contains("90.00"));
        assert!(rendered.contains("EUR-USD"));
        assert!(rendered.contains("1.11"));
    }

    #[test]
    fn empty_rates_render_a_notice_instead_of_a_table() {
        let report = RatesReport {
            rates: CrossRates::new(),
        };
        assert!(report.display_as_table().contains("No exchange rates"));
    }

    #[test]
    fn totals_table_lists_every_currency() {
        let report = TotalsReport {
            totals: rates(&[("rub", "15000.00"), ("usd", "166.61")]),
        };
        let rendered = report.display_as_table();

        assert!(rendered.contains("RUB"));
        assert!(rendered.contains("15000.00"));
        assert!(rendered.contains("USD"));
        assert!(rendered.contains("166.61"));
    }
}
