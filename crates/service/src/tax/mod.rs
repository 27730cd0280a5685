//! Australian tax and superannuation rule tables.
//!
//! Everything here is a pure function of the financial year and the amounts
//! passed in; persistence lives in the `*_service` modules.
pub mod errors;
pub mod super_rules;
pub mod income_tax;
pub mod franking;

pub use errors::TaxRuleError;

/// First financial year with a table row.
pub const FIRST_SUPPORTED_FY: i32 = 2015;
/// Newest table row; later years reuse it.
pub const LATEST_TABLE_FY: i32 = 2027;

/// Clamp a year onto the tables: later years reuse the newest row.
pub fn table_year(fy: i32) -> Result<i32, TaxRuleError> {
    if fy < FIRST_SUPPORTED_FY {
        return Err(TaxRuleError::UnsupportedYear(fy));
    }
    Ok(fy.min(LATEST_TABLE_FY))
}
