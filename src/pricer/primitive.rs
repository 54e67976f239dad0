use rust_decimal::Decimal;

pub fn pnl(valuation: Decimal, nominal: Decimal) -> (Decimal, Decimal) {
    let pnl_currency = valuation - nominal;
    let pnl_percent = if nominal.is_zero() {
        Decimal::ZERO
    } else {
        pnl_currency / nominal
    };
    (pnl_currency, pnl_percent)
}
