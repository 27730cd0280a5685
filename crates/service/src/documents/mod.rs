//! Document storage and ranked search.
pub mod store;
pub mod search;
pub mod service;

pub use store::{DocumentStore, LocalDocumentStore, StoreError};
pub use search::{rank, SearchHit};
