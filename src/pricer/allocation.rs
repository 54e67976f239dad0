use super::PortfolioSnapshot;
use rust_decimal::Decimal;

#[derive(Debug, Clone, PartialEq)]
pub struct Allocation {
    pub ticker: String,
    pub market_value: Decimal,
    pub valuation_percent: Decimal,
}

impl Allocation {
    /// Share of the priced market value held in each ticker.
    ///
    /// Holdings without a price weigh zero.
    pub fn from_snapshot(snapshot: &PortfolioSnapshot) -> Vec<Self> {
        let total = snapshot.total_market_value.unwrap_or_default();
        let mut allocations = snapshot
            .holdings
            .iter()
            .map(|valuation| {
                let market_value = valuation.market_value().unwrap_or_default();
                let valuation_percent = if total.is_zero() {
                    Decimal::ZERO
                } else {
                    market_value / total
                };
                Allocation {
                    ticker: valuation.holding.ticker.clone(),
                    market_value,
                    valuation_percent,
                }
            })
            .collect::<Vec<_>>();
        allocations.sort_by(|left, right| left.ticker.cmp(&right.ticker));
        allocations
    }
}
