use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TaxRuleError {
    #[error("financial year {0} is not covered by the rule tables")]
    UnsupportedYear(i32),
    #[error("invalid input: {0}")]
    Invalid(String),
}
