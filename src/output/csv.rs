use crate::error::Error;
use crate::output::Output;
use crate::pricer::{Allocation, PortfolioSnapshot, ValueSeries};

use rust_decimal::Decimal;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use log::info;

fn money(value: Decimal) -> String {
    format!("{:.2}", value.round_dp(2))
}

fn percent(value: Decimal) -> String {
    money(value * Decimal::ONE_HUNDRED)
}

/// Keeps free text on one field of one row.
fn text_field(value: &str) -> String {
    value
        .chars()
        .map(|c| if c == ';' || c.is_control() { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

fn optional(value: Option<Decimal>, format: fn(Decimal) -> String) -> String {
    value.map(format).unwrap_or_default()
}

pub struct CsvOutput<'a> {
    output_dir: String,
    portfolio_name: String,
    snapshot: &'a PortfolioSnapshot,
    series: &'a ValueSeries,
    allocations: &'a [Allocation],
}

impl<'a> CsvOutput<'a> {
    pub fn new(
        output_dir: &str,
        portfolio_name: &str,
        snapshot: &'a PortfolioSnapshot,
        series: &'a ValueSeries,
        allocations: &'a [Allocation],
    ) -> Self {
        Self {
            output_dir: output_dir.to_string(),
            portfolio_name: portfolio_name.to_string(),
            snapshot,
            series,
            allocations,
        }
    }

    fn filename(&self, kind: &str) -> PathBuf {
        let mut filename = PathBuf::from(&self.output_dir);
        filename.push(format!("{}_{}", kind, self.portfolio_name));
        filename.set_extension("csv");
        filename
    }
}

impl Output for CsvOutput<'_> {
    fn write_holdings(&mut self) -> Result<(), Error> {
        let filename = self.filename("holdings");
        let mut output_stream = File::create(&filename)?;
        output_stream.write_all(
            "Ticker;Quantity;Average Cost;Cost Basis;Price;Currency;Market Value;Unrealized P&L;Unrealized P&L(%);Realized P&L;Fees;Status\n".as_bytes(),
        )?;
        for valuation in self.snapshot.holdings.iter() {
            let holding = &valuation.holding;
            let market = valuation.market.as_ref().ok();
            let status = match &valuation.market {
                Ok(_) => String::from("ok"),
                Err(error) => text_field(&error.reason),
            };
            let currency = market
                .and_then(|value| value.price.currency.as_deref())
                .map(text_field)
                .unwrap_or_default();
            output_stream.write_all(
                format!(
                    "{};{};{};{};{};{};{};{};{};{};{};{}\n",
                    holding.ticker,
                    holding.quantity.normalize(),
                    money(holding.average_cost),
                    money(valuation.cost_basis),
                    optional(market.map(|value| value.price.value), money),
                    currency,
                    optional(market.map(|value| value.market_value), money),
                    optional(market.map(|value| value.unrealized_pnl), money),
                    optional(market.map(|value| value.unrealized_pnl_percent), percent),
                    money(holding.realized_pnl),
                    money(holding.fees),
                    status,
                )
                .as_bytes(),
            )?;
        }
        output_stream.write_all(
            format!(
                "Total;;;{};;;{};{};{};{};{};{}\n",
                money(self.snapshot.total_cost_basis),
                optional(self.snapshot.total_market_value, money),
                optional(self.snapshot.unrealized_pnl, money),
                optional(self.snapshot.unrealized_pnl_percent, percent),
                money(self.snapshot.realized_pnl),
                money(self.snapshot.fees),
                self.snapshot.unavailable.len(),
            )
            .as_bytes(),
        )?;
        info!("holdings written in {}", filename.display());
        Ok(())
    }

    fn write_series(&mut self) -> Result<(), Error> {
        let filename = self.filename("series");
        let mut output_stream = File::create(&filename)?;
        output_stream.write_all("Date;Value;Cost Basis;Unavailable\n".as_bytes())?;
        for point in self.series.points.iter() {
            let unavailable = point
                .unavailable
                .iter()
                .map(|item| item.ticker.as_str())
                .collect::<Vec<_>>()
                .join(",");
            output_stream.write_all(
                format!(
                    "{};{};{};{}\n",
                    point.date.format("%Y-%m-%d"),
                    optional(point.value, money),
                    money(point.cost_basis),
                    unavailable
                )
                .as_bytes(),
            )?;
        }
        info!("series written in {}", filename.display());
        Ok(())
    }

    fn write_allocation(&mut self) -> Result<(), Error> {
        let filename = self.filename("allocation");
        let mut output_stream = File::create(&filename)?;
        output_stream.write_all("Ticker;Market Value;Allocation(%)\n".as_bytes())?;
        for allocation in self.allocations.iter() {
            output_stream.write_all(
                format!(
                    "{};{};{}\n",
                    allocation.ticker,
                    money(allocation.market_value),
                    percent(allocation.valuation_percent)
                )
                .as_bytes(),
            )?;
        }
        info!("allocation written in {}", filename.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alias::Date;
    use crate::historical::FixedPriceSource;
    use crate::portfolio::{Transaction, Way};
    use crate::pricer::{Holdings, Sampling};
    use rust_decimal_macros::dec;

    fn make_transactions_() -> Vec<Transaction> {
        let date = Date::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        vec![
            Transaction::new("AAPL", Way::Buy, dec!(10), dec!(100), dec!(1), date),
            Transaction::new("MSFT", Way::Buy, dec!(3), dec!(100), Decimal::ZERO, date),
        ]
    }

    #[test]
    fn write_all_files() {
        let transactions = make_transactions_();
        let mut source = FixedPriceSource::default()
            .with_quote("AAPL", dec!(110), "USD")
            .with_close("AAPL", Date::from_ymd_opt(2024, 1, 2).unwrap(), dec!(100.5));
        let holdings = Holdings::from_transactions(&transactions).unwrap();
        let snapshot = PortfolioSnapshot::from_holdings(
            &holdings,
            Date::from_ymd_opt(2024, 1, 10).unwrap(),
            &mut source,
        );
        let series = ValueSeries::from_transactions(
            &transactions,
            Sampling::transaction_dates(),
            &mut source,
        )
        .unwrap();
        let allocations = Allocation::from_snapshot(&snapshot);

        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().to_str().unwrap();
        let mut output = CsvOutput::new(output_dir, "main", &snapshot, &series, &allocations);
        output.write_indicators().unwrap();

        let holdings = std::fs::read_to_string(dir.path().join("holdings_main.csv")).unwrap();
        let lines = holdings.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 4);
        assert_eq!(
            lines[1],
            "AAPL;10;100.10;1001.00;110.00;USD;1100.00;99.00;9.89;0.00;1.00;ok"
        );
        assert_eq!(
            lines[2],
            "MSFT;3;100.00;300.00;;;;;;0.00;0.00;quote service down"
        );
        assert_eq!(lines[3], "Total;;;1301.00;;;1100.00;-201.00;-15.45;0.00;1.00;1");

        let series = std::fs::read_to_string(dir.path().join("series_main.csv")).unwrap();
        assert_eq!(
            series,
            "Date;Value;Cost Basis;Unavailable\n2024-01-02;1005.00;1301.00;MSFT\n"
        );

        let allocation =
            std::fs::read_to_string(dir.path().join("allocation_main.csv")).unwrap();
        assert_eq!(
            allocation,
            "Ticker;Market Value;Allocation(%)\nAAPL;1100.00;100.00\nMSFT;0.00;0.00\n"
        );
    }

    #[test]
    fn unpriced_series_and_noisy_reason() {
        let date = Date::from_ymd_opt(2024, 1, 2)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let transactions = vec![Transaction::new(
            "AAPL",
            Way::Buy,
            dec!(2),
            dec!(50),
            Decimal::ZERO,
            date,
        )];
        let holdings = Holdings::from_transactions(&transactions).unwrap();
        let mut source = FixedPriceSource::default();
        let mut snapshot = PortfolioSnapshot::from_holdings(
            &holdings,
            Date::from_ymd_opt(2024, 1, 10).unwrap(),
            &mut source,
        );
        if let Err(error) = snapshot.holdings[0].market.as_mut() {
            error.reason = "Not Found;\nNo data found".to_string();
        }
        let series = ValueSeries::from_transactions(
            &transactions,
            Sampling::transaction_dates(),
            &mut source,
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().to_str().unwrap();
        let mut output = CsvOutput::new(output_dir, "main", &snapshot, &series, &[]);
        output.write_indicators().unwrap();

        let holdings = std::fs::read_to_string(dir.path().join("holdings_main.csv")).unwrap();
        let lines = holdings.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[1], "AAPL;2;50.00;100.00;;;;;;0.00;0.00;Not Found  No data found");
        assert_eq!(lines[2], "Total;;;100.00;;;;;;0.00;0.00;1");

        let series = std::fs::read_to_string(dir.path().join("series_main.csv")).unwrap();
        assert_eq!(
            series,
            "Date;Value;Cost Basis;Unavailable\n2024-01-02;;100.00;AAPL\n"
        );
    }
}
