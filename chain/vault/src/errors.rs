//! Contract-specific error types
//!
//! One taxonomy for every vault entry point, plus the failure type reported by
//! the external reference-asset ledger.

use custody_types::ids::Address;
use custody_types::numeric::Amount;
use thiserror::Error;

/// Failures reported by an [`AssetLink`](crate::asset::AssetLink) implementation.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AssetError {
    #[error("Asset balance too low for {account}: required {required}, available {available}")]
    InsufficientBalance {
        account: Address,
        required: Amount,
        available: Amount,
    },

    #[error("Asset allowance too low for {owner}: required {required}, available {available}")]
    InsufficientAllowance {
        owner: Address,
        required: Amount,
        available: Amount,
    },

    #[error("Asset transfer rejected: {reason}")]
    Rejected { reason: String },
}

/// Vault errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum VaultError {
    #[error("Vault is paused")]
    Paused,

    #[error("Sender is blacklisted: {address}")]
    SenderBlacklisted { address: Address },

    #[error("Receiver is blacklisted: {address}")]
    ReceiverBlacklisted { address: Address },

    #[error("Insufficient balance for {account}: required {required}, available {available}")]
    InsufficientBalance {
        account: Address,
        required: Amount,
        available: Amount,
    },

    #[error("Insufficient allowance for {spender} on {owner}: required {required}, available {available}")]
    InsufficientAllowance {
        owner: Address,
        spender: Address,
        required: Amount,
        available: Amount,
    },

    #[error("Invalid sender: {address}")]
    InvalidSender { address: Address },

    #[error("Invalid receiver: {address}")]
    InvalidReceiver { address: Address },

    #[error("Exceeded maximum deposit: requested {requested}, remaining {remaining}")]
    ExceededMaxDeposit { requested: Amount, remaining: Amount },

    #[error("Deposit below minimum: requested {requested}, minimum {minimum}")]
    BelowMinDeposit { requested: Amount, minimum: Amount },

    #[error("Withdrawal request already exists for {holder}")]
    WithdrawalRequestExists { holder: Address },

    #[error("No withdrawal request for {holder}")]
    NoWithdrawalRequest { holder: Address },

    #[error("Settlement amount {offered} does not match locked amount {locked}")]
    SettlementMismatch { locked: Amount, offered: Amount },

    #[error("Vault already initialized")]
    AlreadyInitialized,

    #[error("Vault not initialized")]
    NotInitialized,

    #[error("Invalid configuration: {reason}")]
    InvalidConfig { reason: String },

    #[error("Unauthorized: {caller} is not permitted")]
    Unauthorized { caller: Address },

    #[error("Invariant violated: {reason}")]
    InvariantViolation { reason: String },

    #[error("Amount must be positive")]
    InvalidAmount,

    #[error("Arithmetic overflow in balance calculation")]
    Overflow,

    #[error("Asset transfer failed: {0}")]
    Asset(#[from] AssetError),

    #[error("Vault lock poisoned")]
    LockPoisoned,
}
