//! Reference-asset capability
//!
//! The vault never keeps its own books for the deposited token. It moves the
//! token through an [`AssetLink`], which wraps whatever ledger actually holds
//! it. `InMemoryAsset` is a self-contained ledger for tests and local
//! simulation.

use custody_types::ids::Address;
use custody_types::numeric::Amount;
use std::collections::{HashMap, HashSet};

use crate::errors::AssetError;

/// Capability over the external reference-asset ledger.
///
/// Implementations must be all-or-nothing per call: a failed call leaves
/// every balance untouched.
pub trait AssetLink {
    /// Pull `amount` from `from` into the vault's own holding.
    fn transfer_in(&mut self, from: &Address, amount: Amount) -> Result<(), AssetError>;

    /// Push `amount` from the vault's own holding to `to`.
    fn transfer_out(&mut self, to: &Address, amount: Amount) -> Result<(), AssetError>;

    /// Current reference-asset balance of `account`.
    fn balance_of(&self, account: &Address) -> Amount;
}

impl<T: AssetLink + ?Sized> AssetLink for Box<T> {
    fn transfer_in(&mut self, from: &Address, amount: Amount) -> Result<(), AssetError> {
        (**self).transfer_in(from, amount)
    }

    fn transfer_out(&mut self, to: &Address, amount: Amount) -> Result<(), AssetError> {
        (**self).transfer_out(to, amount)
    }

    fn balance_of(&self, account: &Address) -> Amount {
        (**self).balance_of(account)
    }
}

/// In-memory token ledger with per-owner allowances granted to the vault.
///
/// Frozen accounts can neither send nor receive, mirroring issuer-level
/// blocklists found on wrapped-BTC tokens.
#[derive(Debug, Clone)]
pub struct InMemoryAsset {
    vault: Address,
    balances: HashMap<Address, Amount>,
    allowances: HashMap<Address, Amount>,
    frozen: HashSet<Address>,
}

impl InMemoryAsset {
    /// Create an empty ledger whose pulls and pushes settle against `vault`.
    pub fn new(vault: Address) -> Self {
        Self {
            vault,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            frozen: HashSet::new(),
        }
    }

    pub fn vault(&self) -> &Address {
        &self.vault
    }

    /// Credit freshly issued tokens to `to`.
    pub fn mint(&mut self, to: &Address, amount: Amount) -> Result<(), AssetError> {
        let balance = self.balances.entry(to.clone()).or_insert(0);
        *balance = balance.checked_add(amount).ok_or_else(|| AssetError::Rejected {
            reason: "balance overflow".to_string(),
        })?;
        Ok(())
    }

    /// Let the vault pull up to `amount` from `owner`. `Amount::MAX` never
    /// decreases.
    pub fn approve(&mut self, owner: &Address, amount: Amount) {
        self.allowances.insert(owner.clone(), amount);
    }

    pub fn allowance(&self, owner: &Address) -> Amount {
        self.allowances.get(owner).copied().unwrap_or(0)
    }

    pub fn set_frozen(&mut self, account: &Address, frozen: bool) {
        if frozen {
            self.frozen.insert(account.clone());
        } else {
            self.frozen.remove(account);
        }
    }

    /// Sum of every balance, including the vault's own holding.
    pub fn total_supply(&self) -> Amount {
        self.balances.values().sum()
    }

    fn check_not_frozen(&self, account: &Address) -> Result<(), AssetError> {
        if self.frozen.contains(account) {
            return Err(AssetError::Rejected {
                reason: format!("account {account} is frozen"),
            });
        }
        Ok(())
    }

    fn move_balance(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), AssetError> {
        let available = self.balance_of(from);
        if available < amount {
            return Err(AssetError::InsufficientBalance {
                account: from.clone(),
                required: amount,
                available,
            });
        }
        if from == to {
            return Ok(());
        }
        let receiver = self.balance_of(to);
        let credited = receiver.checked_add(amount).ok_or_else(|| AssetError::Rejected {
            reason: "balance overflow".to_string(),
        })?;
        self.balances.insert(from.clone(), available - amount);
        self.balances.insert(to.clone(), credited);
        Ok(())
    }
}

impl AssetLink for InMemoryAsset {
    fn transfer_in(&mut self, from: &Address, amount: Amount) -> Result<(), AssetError> {
        self.check_not_frozen(from)?;
        let allowance = self.allowance(from);
        if allowance < amount {
            return Err(AssetError::InsufficientAllowance {
                owner: from.clone(),
                required: amount,
                available: allowance,
            });
        }
        let vault = self.vault.clone();
        self.move_balance(from, &vault, amount)?;
        if allowance != Amount::MAX {
            self.allowances.insert(from.clone(), allowance - amount);
        }
        Ok(())
    }

    fn transfer_out(&mut self, to: &Address, amount: Amount) -> Result<(), AssetError> {
        self.check_not_frozen(to)?;
        let vault = self.vault.clone();
        self.move_balance(&vault, to, amount)
    }

    fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }
}
