use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use super::{table_year, TaxRuleError};

pub const MEDICARE_LEVY_RATE: Decimal = dec!(0.02);
/// Resident brackets are tabled from this year.
pub const FIRST_BRACKET_FY: i32 = 2021;

/// Rate applied to income above `threshold`, up to the next bracket.
#[derive(Debug, Clone, Copy, Serialize, PartialEq)]
pub struct Bracket {
    pub threshold: Decimal,
    pub rate: Decimal,
}

const fn b(threshold: Decimal, rate: Decimal) -> Bracket { Bracket { threshold, rate } }

static FY2021_2024: [Bracket; 5] = [
    b(dec!(0), dec!(0)),
    b(dec!(18200), dec!(0.19)),
    b(dec!(45000), dec!(0.325)),
    b(dec!(120000), dec!(0.37)),
    b(dec!(180000), dec!(0.45)),
];

static FY2025_2026: [Bracket; 5] = [
    b(dec!(0), dec!(0)),
    b(dec!(18200), dec!(0.16)),
    b(dec!(45000), dec!(0.30)),
    b(dec!(135000), dec!(0.37)),
    b(dec!(190000), dec!(0.45)),
];

static FY2027: [Bracket; 5] = [
    b(dec!(0), dec!(0)),
    b(dec!(18200), dec!(0.15)),
    b(dec!(45000), dec!(0.30)),
    b(dec!(135000), dec!(0.37)),
    b(dec!(190000), dec!(0.45)),
];

pub fn brackets(fy: i32) -> Result<&'static [Bracket], TaxRuleError> {
    if fy < FIRST_BRACKET_FY {
        return Err(TaxRuleError::UnsupportedYear(fy));
    }
    let table: &'static [Bracket] = match table_year(fy)? {
        ..=2024 => &FY2021_2024,
        2025..=2026 => &FY2025_2026,
        _ => &FY2027,
    };
    Ok(table)
}

/// Income tax before levies and offsets, rounded to cents.
pub fn income_tax(fy: i32, taxable_income: Decimal) -> Result<Decimal, TaxRuleError> {
    let table = brackets(fy)?;
    let income = taxable_income.max(Decimal::ZERO);
    let mut tax = Decimal::ZERO;
    for (i, br) in table.iter().enumerate() {
        if income <= br.threshold { break; }
        let upper = table.get(i + 1).map(|n| n.threshold.min(income)).unwrap_or(income);
        tax += (upper - br.threshold) * br.rate;
    }
    Ok(tax.round_dp(2))
}

pub fn marginal_rate(fy: i32, taxable_income: Decimal) -> Result<Decimal, TaxRuleError> {
    let table = brackets(fy)?;
    Ok(table
        .iter()
        .rev()
        .find(|br| taxable_income > br.threshold)
        .map(|br| br.rate)
        .unwrap_or(Decimal::ZERO))
}

pub fn medicare_levy(taxable_income: Decimal) -> Decimal {
    (taxable_income.max(Decimal::ZERO) * MEDICARE_LEVY_RATE).round_dp(2)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TaxSummary {
    pub financial_year: i32,
    pub taxable_income: Decimal,
    pub gross_tax: Decimal,
    pub medicare_levy: Decimal,
    pub franking_offset: Decimal,
    /// Negative means a refund.
    pub net_payable: Decimal,
    pub marginal_rate: Decimal,
    pub effective_rate: Decimal,
}

pub fn tax_summary(fy: i32, taxable_income: Decimal, franking_credits: Decimal) -> Result<TaxSummary, TaxRuleError> {
    if franking_credits.is_sign_negative() && !franking_credits.is_zero() {
        return Err(TaxRuleError::Invalid("franking credits must be >= 0".into()));
    }
    let gross_tax = income_tax(fy, taxable_income)?;
    let medicare = medicare_levy(taxable_income);
    let effective_rate = if taxable_income > Decimal::ZERO {
        ((gross_tax + medicare) / taxable_income).round_dp(4)
    } else {
        Decimal::ZERO
    };
    Ok(TaxSummary {
        financial_year: fy,
        taxable_income,
        gross_tax,
        medicare_levy: medicare,
        franking_offset: franking_credits.round_dp(2),
        net_payable: gross_tax + medicare - franking_credits.round_dp(2),
        marginal_rate: marginal_rate(fy, taxable_income)?,
        effective_rate,
    })
}
