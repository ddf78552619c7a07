//! Claim ledger — balances, allowances and supply of the claim token
//!
//! Pure bookkeeping: access gates are applied by the vault before any call
//! reaches this type. Every mutating method validates fully before touching
//! state, so an `Err` always leaves the ledger unchanged.

use custody_types::ids::Address;
use custody_types::numeric::{Amount, BTC_DECIMALS};
use std::collections::HashMap;

use crate::errors::VaultError;

/// Fungible claim-token ledger.
///
/// Invariant: `total_supply` equals the sum of all balances.
#[derive(Debug, Clone)]
pub struct ClaimLedger {
    name: String,
    symbol: String,
    balances: HashMap<Address, Amount>,
    allowances: HashMap<(Address, Address), Amount>,
    total_supply: Amount,
}

impl ClaimLedger {
    pub fn new(name: impl Into<String>, symbol: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            balances: HashMap::new(),
            allowances: HashMap::new(),
            total_supply: 0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Claims share the reference asset's precision.
    pub fn decimals(&self) -> u8 {
        BTC_DECIMALS
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(owner.clone(), spender.clone()))
            .copied()
            .unwrap_or(0)
    }

    /// Iterate every non-zero balance.
    pub fn balances(&self) -> impl Iterator<Item = (&Address, Amount)> {
        self.balances
            .iter()
            .filter(|(_, amount)| **amount > 0)
            .map(|(addr, amount)| (addr, *amount))
    }

    /// Sum of all balances, `None` on overflow.
    pub fn sum_of_balances(&self) -> Option<Amount> {
        self.balances
            .values()
            .try_fold(0 as Amount, |acc, b| acc.checked_add(*b))
    }

    // ───────────────────────── Checks ─────────────────────────

    pub fn check_balance(&self, account: &Address, amount: Amount) -> Result<(), VaultError> {
        let available = self.balance_of(account);
        if available < amount {
            return Err(VaultError::InsufficientBalance {
                account: account.clone(),
                required: amount,
                available,
            });
        }
        Ok(())
    }

    pub fn check_allowance(
        &self,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<(), VaultError> {
        let available = self.allowance(owner, spender);
        if available < amount {
            return Err(VaultError::InsufficientAllowance {
                owner: owner.clone(),
                spender: spender.clone(),
                required: amount,
                available,
            });
        }
        Ok(())
    }

    /// Fails if crediting `amount` to `account` would overflow.
    pub fn check_credit(&self, account: &Address, amount: Amount) -> Result<(), VaultError> {
        self.balance_of(account)
            .checked_add(amount)
            .map(|_| ())
            .ok_or(VaultError::Overflow)
    }

    // ───────────────────────── Mutations ─────────────────────────

    /// Move `amount` from `from` to `to`.
    pub fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), VaultError> {
        self.check_balance(from, amount)?;
        if from == to {
            return Ok(());
        }
        self.check_credit(to, amount)?;

        *self.balances.entry(from.clone()).or_insert(0) -= amount;
        *self.balances.entry(to.clone()).or_insert(0) += amount;
        Ok(())
    }

    /// Move `amount` from `owner` to `to` on behalf of `spender`, consuming
    /// allowance. `Amount::MAX` allowances are never decremented.
    pub fn transfer_from(
        &mut self,
        spender: &Address,
        owner: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), VaultError> {
        self.check_allowance(owner, spender, amount)?;
        self.transfer(owner, to, amount)?;

        let key = (owner.clone(), spender.clone());
        if let Some(allowance) = self.allowances.get_mut(&key) {
            if *allowance != Amount::MAX {
                *allowance -= amount;
            }
        }
        Ok(())
    }

    pub fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount) {
        self.allowances.insert((owner.clone(), spender.clone()), amount);
    }

    /// Create claims. Only the deposit path calls this.
    pub(crate) fn mint(&mut self, to: &Address, amount: Amount) -> Result<(), VaultError> {
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(VaultError::Overflow)?;
        self.check_credit(to, amount)?;

        *self.balances.entry(to.clone()).or_insert(0) += amount;
        self.total_supply = supply;
        Ok(())
    }

    /// Destroy claims. Only the settlement path calls this.
    pub(crate) fn burn(&mut self, from: &Address, amount: Amount) -> Result<(), VaultError> {
        self.check_balance(from, amount)?;

        *self.balances.entry(from.clone()).or_insert(0) -= amount;
        self.total_supply -= amount;
        Ok(())
    }
}
