//! Xero integration: OAuth code grant, bank account auto-matching and
//! bank transaction import.
pub mod errors;
pub mod domain;
pub mod client;
pub mod oauth;
pub mod matching;
pub mod connection_service;
pub mod callback;
pub mod sync;

pub use client::{HttpXeroClient, XeroApi};
pub use errors::XeroError;
