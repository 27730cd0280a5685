use std::collections::BTreeMap;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;

use models::super_contribution::ContributionType;

use super::{table_year, TaxRuleError};

/// Rate applied to concessional contributions inside the fund.
pub const CONTRIBUTIONS_TAX_RATE: Decimal = dec!(0.15);
/// Division 293 tax rate.
pub const DIV293_RATE: Decimal = dec!(0.15);
/// Total super balance (at the prior 30 June) below which unused caps may be carried forward.
pub const CARRY_FORWARD_TSB_LIMIT: Decimal = dec!(500000);
pub const CARRY_FORWARD_FIRST_FY: i32 = 2020;
/// Earliest year whose unused cap can be carried forward.
pub const CARRY_FORWARD_EARLIEST_ACCRUAL_FY: i32 = 2019;
pub const CARRY_FORWARD_WINDOW_YEARS: i32 = 5;

pub fn guarantee_rate(fy: i32) -> Result<Decimal, TaxRuleError> {
    Ok(match table_year(fy)? {
        ..=2021 => dec!(0.095),
        2022 => dec!(0.10),
        2023 => dec!(0.105),
        2024 => dec!(0.11),
        2025 => dec!(0.115),
        _ => dec!(0.12),
    })
}

pub fn concessional_cap(fy: i32) -> Result<Decimal, TaxRuleError> {
    Ok(match table_year(fy)? {
        ..=2017 => dec!(30000),
        2018..=2021 => dec!(25000),
        2022..=2024 => dec!(27500),
        _ => dec!(30000),
    })
}

pub fn non_concessional_cap(fy: i32) -> Result<Decimal, TaxRuleError> {
    Ok(match table_year(fy)? {
        ..=2017 => dec!(180000),
        2018..=2021 => dec!(100000),
        2022..=2024 => dec!(110000),
        _ => dec!(120000),
    })
}

/// `None` before the cap existed (FY2018).
pub fn transfer_balance_cap(fy: i32) -> Result<Option<Decimal>, TaxRuleError> {
    Ok(match table_year(fy)? {
        ..=2017 => None,
        2018..=2021 => Some(dec!(1600000)),
        2022..=2023 => Some(dec!(1700000)),
        2024..=2025 => Some(dec!(1900000)),
        _ => Some(dec!(2000000)),
    })
}

/// Non-concessional amount available under the bring-forward rule for a
/// member with `total_super_balance` at the prior 30 June.
pub fn bring_forward_cap(fy: i32, total_super_balance: Decimal) -> Result<Decimal, TaxRuleError> {
    let c = non_concessional_cap(fy)?;
    let Some(t) = transfer_balance_cap(fy)? else {
        return Ok(c * dec!(3));
    };
    let tsb = total_super_balance;
    Ok(if tsb < t - c * dec!(2) {
        c * dec!(3)
    } else if tsb < t - c {
        c * dec!(2)
    } else if tsb < t {
        c
    } else {
        Decimal::ZERO
    })
}

pub fn div293_threshold(fy: i32) -> Result<Decimal, TaxRuleError> {
    Ok(if table_year(fy)? < 2018 { dec!(300000) } else { dec!(250000) })
}

/// Extra tax on concessional contributions for high-income earners.
pub fn div293_tax(fy: i32, income: Decimal, concessional: Decimal) -> Result<Decimal, TaxRuleError> {
    let threshold = div293_threshold(fy)?;
    let concessional = concessional.max(Decimal::ZERO);
    let over = (income + concessional - threshold).max(Decimal::ZERO);
    Ok((DIV293_RATE * concessional.min(over)).round_dp(2))
}

pub fn contributions_tax(concessional: Decimal) -> Decimal {
    (CONTRIBUTIONS_TAX_RATE * concessional.max(Decimal::ZERO)).round_dp(2)
}

pub fn super_guarantee(fy: i32, ordinary_time_earnings: Decimal) -> Result<Decimal, TaxRuleError> {
    Ok((guarantee_rate(fy)? * ordinary_time_earnings.max(Decimal::ZERO)).round_dp(2))
}

/// Concessional cap available in `fy` including carried-forward unused amounts.
///
/// `history` maps financial year to concessional contributions made in that
/// year. Years that exceeded their own cap consume the oldest unused amounts
/// first; amounts older than five years lapse.
pub fn carry_forward_available(
    fy: i32,
    history: &BTreeMap<i32, Decimal>,
    tsb_prior_30_june: Decimal,
) -> Result<Decimal, TaxRuleError> {
    let cap = concessional_cap(fy)?;
    if fy < CARRY_FORWARD_FIRST_FY || tsb_prior_30_june >= CARRY_FORWARD_TSB_LIMIT {
        return Ok(cap);
    }

    // (year, unused) oldest first
    let mut unused: Vec<(i32, Decimal)> = Vec::new();
    for year in CARRY_FORWARD_EARLIEST_ACCRUAL_FY..fy {
        unused.retain(|(y, _)| *y >= year - CARRY_FORWARD_WINDOW_YEARS);
        let year_cap = concessional_cap(year)?;
        let used = history.get(&year).copied().unwrap_or_default().max(Decimal::ZERO);
        if used <= year_cap {
            unused.push((year, year_cap - used));
            continue;
        }
        let mut excess = used - year_cap;
        for (_, amount) in unused.iter_mut() {
            if excess.is_zero() { break; }
            let take = excess.min(*amount);
            *amount -= take;
            excess -= take;
        }
    }
    let carried: Decimal = unused
        .iter()
        .filter(|(y, _)| *y >= fy - CARRY_FORWARD_WINDOW_YEARS)
        .map(|(_, a)| *a)
        .sum();
    Ok(cap + carried)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct SuperRates {
    pub financial_year: i32,
    pub guarantee_rate: Decimal,
    pub concessional_cap: Decimal,
    pub non_concessional_cap: Decimal,
    pub transfer_balance_cap: Option<Decimal>,
    pub div293_threshold: Decimal,
    pub contributions_tax_rate: Decimal,
}

pub fn rates_for(fy: i32) -> Result<SuperRates, TaxRuleError> {
    Ok(SuperRates {
        financial_year: fy,
        guarantee_rate: guarantee_rate(fy)?,
        concessional_cap: concessional_cap(fy)?,
        non_concessional_cap: non_concessional_cap(fy)?,
        transfer_balance_cap: transfer_balance_cap(fy)?,
        div293_threshold: div293_threshold(fy)?,
        contributions_tax_rate: CONTRIBUTIONS_TAX_RATE,
    })
}

/// One recorded contribution, as fed to [`contribution_summary`].
#[derive(Debug, Clone)]
pub struct ContributionLine {
    pub member_name: String,
    pub kind: ContributionType,
    pub amount: Decimal,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MemberContributionSummary {
    pub member_name: String,
    pub concessional: Decimal,
    pub non_concessional: Decimal,
    pub concessional_cap: Decimal,
    /// Negative when the cap is exceeded.
    pub concessional_headroom: Decimal,
    pub non_concessional_cap: Decimal,
    pub non_concessional_headroom: Decimal,
    pub contributions_tax: Decimal,
    pub div293_tax: Option<Decimal>,
    pub bring_forward_available: Option<Decimal>,
    /// Concessional cap including carried-forward unused amounts.
    pub carry_forward_cap: Option<Decimal>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ContributionSummary {
    pub financial_year: i32,
    pub members: Vec<MemberContributionSummary>,
    pub total_concessional: Decimal,
    pub total_non_concessional: Decimal,
}

/// Per-member totals, cap headroom and Division 293 liability.
///
/// `income` and `total_super_balance` apply to every member in `lines`; callers
/// filter to one member when those figures are personal.
pub fn contribution_summary(
    fy: i32,
    lines: &[ContributionLine],
    income: Option<Decimal>,
    total_super_balance: Option<Decimal>,
) -> Result<ContributionSummary, TaxRuleError> {
    let cc_cap = concessional_cap(fy)?;
    let ncc_cap = non_concessional_cap(fy)?;

    let mut per_member: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();
    for l in lines {
        if l.amount.is_sign_negative() && !l.amount.is_zero() {
            return Err(TaxRuleError::Invalid(format!("negative contribution for {}", l.member_name)));
        }
        let entry = per_member.entry(l.member_name.clone()).or_default();
        match l.kind {
            ContributionType::Concessional => entry.0 += l.amount,
            ContributionType::NonConcessional => entry.1 += l.amount,
        }
    }

    let mut members = Vec::with_capacity(per_member.len());
    for (member_name, (cc, ncc)) in per_member {
        let bring_forward = match total_super_balance {
            Some(tsb) => Some(bring_forward_cap(fy, tsb)?),
            None => None,
        };
        let div293 = match income {
            Some(inc) => Some(div293_tax(fy, inc, cc)?),
            None => None,
        };
        members.push(MemberContributionSummary {
            member_name,
            concessional: cc,
            non_concessional: ncc,
            concessional_cap: cc_cap,
            concessional_headroom: cc_cap - cc,
            non_concessional_cap: ncc_cap,
            non_concessional_headroom: ncc_cap - ncc,
            contributions_tax: contributions_tax(cc),
            div293_tax: div293,
            bring_forward_available: bring_forward,
            carry_forward_cap: None,
        });
    }

    Ok(ContributionSummary {
        financial_year: fy,
        total_concessional: members.iter().map(|m| m.concessional).sum(),
        total_non_concessional: members.iter().map(|m| m.non_concessional).sum(),
        members,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn guarantee_rate_steps() {
        assert_eq!(guarantee_rate(2015).unwrap(), dec!(0.095));
        assert_eq!(guarantee_rate(2021).unwrap(), dec!(0.095));
        assert_eq!(guarantee_rate(2022).unwrap(), dec!(0.10));
        assert_eq!(guarantee_rate(2025).unwrap(), dec!(0.115));
        assert_eq!(guarantee_rate(2026).unwrap(), dec!(0.12));
        assert_eq!(guarantee_rate(2040).unwrap(), dec!(0.12));
        assert!(guarantee_rate(2014).is_err());
    }

    #[test]
    fn caps_by_year() {
        assert_eq!(concessional_cap(2017).unwrap(), dec!(30000));
        assert_eq!(concessional_cap(2018).unwrap(), dec!(25000));
        assert_eq!(concessional_cap(2024).unwrap(), dec!(27500));
        assert_eq!(concessional_cap(2025).unwrap(), dec!(30000));
        assert_eq!(non_concessional_cap(2016).unwrap(), dec!(180000));
        assert_eq!(non_concessional_cap(2023).unwrap(), dec!(110000));
        assert_eq!(non_concessional_cap(2025).unwrap(), dec!(120000));
        assert_eq!(transfer_balance_cap(2017).unwrap(), None);
        assert_eq!(transfer_balance_cap(2024).unwrap(), Some(dec!(1900000)));
        assert_eq!(transfer_balance_cap(2026).unwrap(), Some(dec!(2000000)));
    }

    #[test]
    fn bring_forward_tiers_fy2025() {
        // T = 1.9M, C = 120k
        assert_eq!(bring_forward_cap(2025, dec!(1000000)).unwrap(), dec!(360000));
        assert_eq!(bring_forward_cap(2025, dec!(1660000)).unwrap(), dec!(240000));
        assert_eq!(bring_forward_cap(2025, dec!(1780000)).unwrap(), dec!(120000));
        assert_eq!(bring_forward_cap(2025, dec!(1900000)).unwrap(), dec!(0));
        assert_eq!(bring_forward_cap(2017, dec!(5000000)).unwrap(), dec!(540000));
    }

    #[test]
    fn div293_only_on_the_excess() {
        // income 240k + 27.5k concessional, 17.5k over the 250k threshold
        assert_eq!(div293_tax(2024, dec!(240000), dec!(27500)).unwrap(), dec!(2625.00));
        // fully over: tax on the whole contribution
        assert_eq!(div293_tax(2024, dec!(400000), dec!(27500)).unwrap(), dec!(4125.00));
        assert_eq!(div293_tax(2024, dec!(100000), dec!(27500)).unwrap(), dec!(0));
        // pre-2018 threshold
        assert_eq!(div293_tax(2017, dec!(280000), dec!(30000)).unwrap(), dec!(1500.00));
    }

    #[test]
    fn guarantee_and_contributions_tax() {
        assert_eq!(super_guarantee(2025, dec!(100000)).unwrap(), dec!(11500.00));
        assert_eq!(contributions_tax(dec!(27500)), dec!(4125.00));
    }

    #[test]
    fn carry_forward_accumulates_unused_caps() {
        let mut history = BTreeMap::new();
        history.insert(2019, dec!(5000));   // 20k unused
        history.insert(2020, dec!(25000));  // 0 unused
        history.insert(2021, dec!(15000));  // 10k unused
        let avail = carry_forward_available(2022, &history, dec!(300000)).unwrap();
        assert_eq!(avail, dec!(27500) + dec!(20000) + dec!(10000));
        // not eligible with a large balance
        assert_eq!(carry_forward_available(2022, &history, dec!(600000)).unwrap(), dec!(27500));
        // not before FY2020
        assert_eq!(carry_forward_available(2019, &history, dec!(0)).unwrap(), dec!(25000));
    }

    #[test]
    fn carry_forward_excess_consumes_oldest_and_old_years_lapse() {
        let mut history = BTreeMap::new();
        history.insert(2019, dec!(0));      // 25k unused
        history.insert(2020, dec!(35000));  // 10k excess uses 2019 amounts
        for y in 2021..=2025 {
            history.insert(y, concessional_cap(y).unwrap());
        }
        // FY2025 window is FY2020..FY2024; 2019 has lapsed anyway
        assert_eq!(carry_forward_available(2025, &history, dec!(0)).unwrap(), dec!(30000));
        // FY2021 window still includes 2019's remaining 15k
        assert_eq!(carry_forward_available(2021, &history, dec!(0)).unwrap(), dec!(25000) + dec!(15000));
    }

    #[test]
    fn summary_per_member_and_excess() {
        let lines = vec![
            ContributionLine { member_name: "Alex".into(), kind: ContributionType::Concessional, amount: dec!(20000) },
            ContributionLine { member_name: "Alex".into(), kind: ContributionType::Concessional, amount: dec!(12000) },
            ContributionLine { member_name: "Sam".into(), kind: ContributionType::NonConcessional, amount: dec!(50000) },
        ];
        let s = contribution_summary(2025, &lines, Some(dec!(100000)), None).unwrap();
        assert_eq!(s.members.len(), 2);
        let alex = &s.members[0];
        assert_eq!(alex.member_name, "Alex");
        assert_eq!(alex.concessional, dec!(32000));
        assert_eq!(alex.concessional_headroom, dec!(-2000));
        assert_eq!(alex.contributions_tax, dec!(4800.00));
        assert_eq!(alex.div293_tax, Some(dec!(0)));
        assert_eq!(s.members[1].non_concessional_headroom, dec!(70000));
        assert_eq!(s.total_concessional, dec!(32000));
        assert_eq!(s.total_non_concessional, dec!(50000));
    }
}
