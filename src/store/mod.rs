pub mod provider;

pub use provider::{StoreError, TxStore};
