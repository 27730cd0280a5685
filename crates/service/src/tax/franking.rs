use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use super::TaxRuleError;

pub const CORPORATE_TAX_RATE: Decimal = dec!(0.30);
/// Top marginal rate plus Medicare levy, applied to income a trust does not distribute.
pub const TRUSTEE_PENALTY_RATE: Decimal = dec!(0.47);

/// Credits attached to a dividend franked at `franked_pct` percent (0..=100).
pub fn franking_credit_for(dividend: Decimal, franked_pct: Decimal) -> Result<Decimal, TaxRuleError> {
    if franked_pct < Decimal::ZERO || franked_pct > dec!(100) {
        return Err(TaxRuleError::Invalid("franked percentage must be within 0..=100".into()));
    }
    let ratio = CORPORATE_TAX_RATE / (Decimal::ONE - CORPORATE_TAX_RATE);
    Ok((dividend * franked_pct / dec!(100) * ratio).round_dp(2))
}

/// Assessable amount of a franked dividend.
pub fn gross_up(dividend: Decimal, credits: Decimal) -> Decimal {
    dividend + credits
}

pub fn undistributed_tax(fy: i32, net_income: Decimal, distributed: Decimal) -> Result<Decimal, TaxRuleError> {
    super::table_year(fy)?;
    let retained = (net_income - distributed).max(Decimal::ZERO);
    Ok((retained * TRUSTEE_PENALTY_RATE).round_dp(2))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fully_franked_dividend() {
        assert_eq!(franking_credit_for(dec!(700), dec!(100)).unwrap(), dec!(300));
        assert_eq!(franking_credit_for(dec!(700), dec!(50)).unwrap(), dec!(150));
        assert_eq!(franking_credit_for(dec!(700), dec!(0)).unwrap(), dec!(0));
        assert!(franking_credit_for(dec!(700), dec!(101)).is_err());
        assert_eq!(gross_up(dec!(700), dec!(300)), dec!(1000));
    }

    #[test]
    fn retained_income_taxed_at_trustee_rate() {
        assert_eq!(undistributed_tax(2025, dec!(10000), dec!(6000)).unwrap(), dec!(1880));
        assert_eq!(undistributed_tax(2025, dec!(10000), dec!(10000)).unwrap(), dec!(0));
        assert!(undistributed_tax(2010, dec!(1), dec!(0)).is_err());
    }
}
