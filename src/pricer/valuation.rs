use super::primitive;
use super::{Holding, Holdings};
use crate::alias::Date;
use crate::historical::PriceSource;
use crate::marketdata::{Price, PriceUnavailable};
use rust_decimal::Decimal;
use std::iter::Sum;
use std::ops::Add;

use log::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct MarketValue {
    pub price: Price,
    pub market_value: Decimal,
    pub unrealized_pnl: Decimal,
    pub unrealized_pnl_percent: Decimal,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HoldingValuation {
    pub holding: Holding,
    pub cost_basis: Decimal,
    pub market: Result<MarketValue, PriceUnavailable>,
}

impl HoldingValuation {
    pub fn from_holding<P>(holding: &Holding, spot_provider: &mut P) -> Self
    where
        P: PriceSource,
    {
        let cost_basis = holding.cost_basis();
        let market = spot_provider.current_price(&holding.ticker).map(|price| {
            let market_value = holding.quantity * price.value;
            let (unrealized_pnl, unrealized_pnl_percent) =
                primitive::pnl(market_value, cost_basis);
            MarketValue {
                price,
                market_value,
                unrealized_pnl,
                unrealized_pnl_percent,
            }
        });
        match &market {
            Ok(value) => debug!(
                "price holding {} quantity:{} spot:{} value:{}",
                holding.ticker, holding.quantity, value.price.value, value.market_value
            ),
            Err(error) => warn!("{}, holding {} left unvalued", error, holding.ticker),
        }
        Self {
            holding: holding.clone(),
            cost_basis,
            market,
        }
    }

    pub fn market_value(&self) -> Option<Decimal> {
        self.market.as_ref().ok().map(|market| market.market_value)
    }
}

#[derive(Default)]
struct ValuationAccumulator {
    cost_basis: Decimal,
    market_value: Decimal,
    priced: usize,
}

impl ValuationAccumulator {
    fn from_valuation(valuation: &HoldingValuation) -> Self {
        let market_value = valuation.market_value();
        Self {
            cost_basis: valuation.cost_basis,
            market_value: market_value.unwrap_or_default(),
            priced: usize::from(market_value.is_some()),
        }
    }
}

impl Add for ValuationAccumulator {
    type Output = Self;

    fn add(self, other: Self) -> Self {
        Self {
            cost_basis: other.cost_basis + self.cost_basis,
            market_value: other.market_value + self.market_value,
            priced: other.priced + self.priced,
        }
    }
}

impl Sum for ValuationAccumulator {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Default::default(), ValuationAccumulator::add)
    }
}

/// Valuation of a whole portfolio at one date.
///
/// A holding whose price is unavailable keeps its cost basis in
/// `total_cost_basis` but is left out of `total_market_value`. The market
/// value is `None` only when every holding failed to price.
#[derive(Debug, Clone, PartialEq)]
pub struct PortfolioSnapshot {
    pub date: Date,
    pub holdings: Vec<HoldingValuation>,
    pub total_cost_basis: Decimal,
    pub total_market_value: Option<Decimal>,
    pub unrealized_pnl: Option<Decimal>,
    pub unrealized_pnl_percent: Option<Decimal>,
    pub realized_pnl: Decimal,
    pub fees: Decimal,
    pub unavailable: Vec<PriceUnavailable>,
}

impl PortfolioSnapshot {
    pub fn from_holdings<P>(holdings: &Holdings, date: Date, spot_provider: &mut P) -> Self
    where
        P: PriceSource,
    {
        info!("price {} holdings at {}", holdings.holdings.len(), date);

        let valuations = holdings
            .iter()
            .map(|holding| HoldingValuation::from_holding(holding, spot_provider))
            .collect::<Vec<_>>();

        let accumulator = valuations
            .iter()
            .map(ValuationAccumulator::from_valuation)
            .sum::<ValuationAccumulator>();

        let total_market_value = if valuations.is_empty() || accumulator.priced > 0 {
            Some(accumulator.market_value)
        } else {
            None
        };
        let pnl = total_market_value
            .map(|market_value| primitive::pnl(market_value, accumulator.cost_basis));

        let unavailable = valuations
            .iter()
            .filter_map(|valuation| valuation.market.as_ref().err().cloned())
            .collect::<Vec<_>>();

        Self {
            date,
            holdings: valuations,
            total_cost_basis: accumulator.cost_basis,
            total_market_value,
            unrealized_pnl: pnl.map(|(value, _)| value),
            unrealized_pnl_percent: pnl.map(|(_, percent)| percent),
            realized_pnl: holdings.realized_pnl,
            fees: holdings.fees,
            unavailable,
        }
    }

    pub fn is_degraded(&self) -> bool {
        !self.unavailable.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::historical::FixedPriceSource;
    use crate::portfolio::{Transaction, Way};
    use rust_decimal_macros::dec;

    fn make_date_(year: i32, month: u32, day: u32) -> Date {
        Date::from_ymd_opt(year, month, day).unwrap()
    }

    fn make_holding_(ticker: &str, quantity: Decimal, average_cost: Decimal) -> Holding {
        Holding {
            ticker: ticker.to_string(),
            quantity,
            average_cost,
            quantity_buy: quantity,
            quantity_sell: Decimal::ZERO,
            realized_pnl: Decimal::ZERO,
            fees: Decimal::ZERO,
        }
    }

    fn make_holdings_(holdings: Vec<Holding>) -> Holdings {
        Holdings {
            holdings: holdings
                .into_iter()
                .map(|holding| (holding.ticker.clone(), holding))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn failed_price_keeps_cost_basis() {
        let holdings = make_holdings_(vec![make_holding_("AAPL", dec!(21), dec!(204))]);
        let mut source = FixedPriceSource::default();

        let snapshot =
            PortfolioSnapshot::from_holdings(&holdings, make_date_(2024, 6, 1), &mut source);

        assert_eq!(snapshot.total_cost_basis, dec!(4284));
        assert_eq!(snapshot.total_market_value, None);
        assert_eq!(snapshot.unrealized_pnl, None);
        assert_eq!(snapshot.unavailable.len(), 1);
        assert_eq!(snapshot.unavailable[0].ticker, "AAPL");
        assert!(snapshot.holdings[0].market.is_err());
        assert_eq!(snapshot.holdings[0].cost_basis, dec!(4284));
        assert!(snapshot.is_degraded());
    }

    #[test]
    fn partial_failure_is_reported_per_ticker() {
        let holdings = make_holdings_(vec![
            make_holding_("AAPL", dec!(21), dec!(204)),
            make_holding_("MSFT", dec!(10), dec!(300)),
        ]);
        let mut source = FixedPriceSource::default().with_current("MSFT", dec!(330));

        let snapshot =
            PortfolioSnapshot::from_holdings(&holdings, make_date_(2024, 6, 1), &mut source);

        assert_eq!(snapshot.total_cost_basis, dec!(7284));
        assert_eq!(snapshot.total_market_value, Some(dec!(3300)));
        assert_eq!(snapshot.unrealized_pnl, Some(dec!(-3984)));
        assert_eq!(snapshot.unavailable.len(), 1);
        assert_eq!(snapshot.unavailable[0].ticker, "AAPL");

        let msft = &snapshot.holdings[1];
        assert_eq!(msft.holding.ticker, "MSFT");
        let market = msft.market.as_ref().unwrap();
        assert_eq!(market.market_value, dec!(3300));
        assert_eq!(market.unrealized_pnl, dec!(300));
        assert_eq!(market.unrealized_pnl_percent, dec!(0.1));
        assert_eq!(source.current_requests, 2);
    }

    #[test]
    fn snapshot_from_transactions() {
        let date = make_date_(2024, 5, 1).and_hms_opt(10, 0, 0).unwrap();
        let transactions = vec![
            Transaction::new("AAPL", Way::Buy, dec!(10), dec!(100), dec!(1), date),
            Transaction::new("AAPL", Way::Buy, dec!(10), dec!(120), dec!(0), date),
            Transaction::new("AAPL", Way::Sell, dec!(5), dec!(150), dec!(2), date),
        ];
        let holdings = Holdings::from_transactions(&transactions).unwrap();
        let mut source = FixedPriceSource::default().with_current("AAPL", dec!(160));

        let snapshot =
            PortfolioSnapshot::from_holdings(&holdings, make_date_(2024, 6, 1), &mut source);

        assert_eq!(snapshot.total_cost_basis, dec!(1650.75));
        assert_eq!(snapshot.total_market_value, Some(dec!(2400)));
        assert_eq!(snapshot.unrealized_pnl, Some(dec!(749.25)));
        assert_eq!(snapshot.realized_pnl, dec!(197.75));
        assert_eq!(snapshot.fees, dec!(3));
        assert!(!snapshot.is_degraded());
    }

    #[test]
    fn empty_portfolio_is_not_an_error() {
        let mut source = FixedPriceSource::default();
        let snapshot = PortfolioSnapshot::from_holdings(
            &Holdings::default(),
            make_date_(2024, 6, 1),
            &mut source,
        );

        assert!(snapshot.holdings.is_empty());
        assert_eq!(snapshot.total_cost_basis, Decimal::ZERO);
        assert_eq!(snapshot.total_market_value, Some(Decimal::ZERO));
        assert_eq!(snapshot.unrealized_pnl_percent, Some(Decimal::ZERO));
        assert_eq!(source.current_requests, 0);
    }
}
