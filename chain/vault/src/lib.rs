//! Claim Vault — custody and settlement logic
//!
//! A single-asset vault: holders deposit a wrapped-BTC reference asset, the
//! vault forwards it to a custodian and mints a 1:1 claim token. Redemption
//! goes through an escrowed withdrawal request that an operator settles.
//!
//! # Modules
//! - `errors`: Vault and asset-link error types
//! - `events`: Events appended by committed operations
//! - `security`: Owner/operator roles, pause, blacklist, access gate
//! - `asset`: Reference-asset capability and an in-memory ledger
//! - `config`: One-shot product configuration
//! - `ledger`: Claim-token balances, allowances, supply
//! - `vault`: Lifecycle, deposits, transfers, owner controls
//! - `withdrawal`: Withdrawal request / cancel / settle
//! - `shared`: Coarse-locked handle for concurrent hosts

pub mod asset;
pub mod config;
pub mod errors;
pub mod events;
pub mod ledger;
pub mod security;
pub mod shared;
pub mod vault;
pub mod withdrawal;

pub use asset::{AssetLink, InMemoryAsset};
pub use config::{DepositCeiling, ProductConfig, SettlementPolicy};
pub use errors::{AssetError, VaultError};
pub use shared::SharedVault;
pub use vault::Vault;
pub use withdrawal::{WithdrawalRequest, WithdrawalState};
