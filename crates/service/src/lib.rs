//! Service layer providing business operations on top of models.
//! - Separates business logic from data access.
//! - Reuses validation and entity definitions in `models` crate.
//! - Remote systems (Xero, chat provider) and blob storage sit behind traits.

pub mod errors;
pub mod auth;
#[cfg(test)]
pub mod test_support;
pub mod account_service;
pub mod transaction_service;
pub mod tax;
pub mod trust_service;
pub mod super_service;
pub mod tax_service;
pub mod documents;
pub mod xero;
pub mod ai;
