//! sea-orm entities for the household finance schema, plus the field
//! validation and insert helpers shared by the service layer.

pub mod errors;
pub mod db;
pub mod financial_year;
pub mod account;
pub mod account_transaction;
pub mod document;
pub mod trust_income;
pub mod trust_distribution;
pub mod super_contribution;
pub mod xero_connection;
pub mod xero_account_mapping;
pub mod ai_conversation;
pub mod ai_message;

#[cfg(test)]
mod tests;
