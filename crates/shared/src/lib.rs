pub mod chain;
pub mod domain;
pub mod error;
pub mod notify;
pub mod units;

pub use alloy::primitives::{Address, B256, U256};
