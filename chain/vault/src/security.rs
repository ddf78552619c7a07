//! Shared security primitives for the vault
//!
//! Ownership and operator roles, the pause switch, the per-address
//! blacklist, and `AccessGate`, which composes the last two into the ordered
//! checks every balance-mutating entry point runs first.

use custody_types::ids::Address;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::errors::VaultError;

/// Privileged roles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Full control: gates, configuration, ownership, operator grants
    Owner,
    /// Settles withdrawal requests
    Operator,
}

/// Owner/operator access control.
///
/// There is exactly one owner at any time. The owner implicitly holds the
/// operator role; additional operators are granted by the owner.
#[derive(Debug, Clone)]
pub struct AccessControl {
    owner: Address,
    operators: HashSet<Address>,
}

impl AccessControl {
    /// Create access control with an initial owner.
    pub fn new(owner: Address) -> Self {
        Self {
            owner,
            operators: HashSet::new(),
        }
    }

    /// Check if a caller holds the specified role.
    pub fn has_role(&self, caller: &Address, role: Role) -> bool {
        match role {
            Role::Owner => *caller == self.owner,
            Role::Operator => *caller == self.owner || self.operators.contains(caller),
        }
    }

    /// Check if a caller is the owner.
    pub fn is_owner(&self, caller: &Address) -> bool {
        self.has_role(caller, Role::Owner)
    }

    /// Grant the operator role. Only the owner can grant.
    pub fn grant_operator(&mut self, caller: &Address, target: Address) -> bool {
        if !self.is_owner(caller) {
            return false;
        }
        self.operators.insert(target);
        true
    }

    /// Revoke the operator role. Only the owner can revoke.
    pub fn revoke_operator(&mut self, caller: &Address, target: &Address) -> bool {
        if !self.is_owner(caller) {
            return false;
        }
        self.operators.remove(target);
        true
    }

    /// Hand ownership to a new address.
    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: Address) -> bool {
        if !self.is_owner(caller) {
            return false;
        }
        self.owner = new_owner;
        true
    }

    /// Get the current owner.
    pub fn owner(&self) -> &Address {
        &self.owner
    }
}

/// Global pause switch.
#[derive(Debug, Clone, Default)]
pub struct PauseGuard {
    paused: bool,
}

impl PauseGuard {
    /// Create a new unpaused guard.
    pub fn new() -> Self {
        Self { paused: false }
    }

    /// Set the flag, returning the previous value.
    pub fn set(&mut self, paused: bool) -> bool {
        std::mem::replace(&mut self.paused, paused)
    }

    /// Check if currently paused.
    pub fn is_paused(&self) -> bool {
        self.paused
    }
}

/// Addresses barred from sending or receiving claim tokens.
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    blocked: HashSet<Address>,
}

impl Blacklist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set or clear the flag. Returns `true` if the flag changed.
    pub fn set(&mut self, account: Address, blacklisted: bool) -> bool {
        if blacklisted {
            self.blocked.insert(account)
        } else {
            self.blocked.remove(&account)
        }
    }

    pub fn contains(&self, account: &Address) -> bool {
        self.blocked.contains(account)
    }

    pub fn len(&self) -> usize {
        self.blocked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocked.is_empty()
    }
}

/// Pause + blacklist gate.
///
/// Checks are pure functions over the gate state and always run in the same
/// order: pause first, then the sending side, then the receiving side.
#[derive(Debug, Clone, Default)]
pub struct AccessGate {
    pause: PauseGuard,
    blacklist: Blacklist,
}

impl AccessGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_paused(&self) -> bool {
        self.pause.is_paused()
    }

    pub fn is_blacklisted(&self, account: &Address) -> bool {
        self.blacklist.contains(account)
    }

    /// Returns the previous pause state.
    pub(crate) fn set_paused(&mut self, paused: bool) -> bool {
        self.pause.set(paused)
    }

    pub(crate) fn set_blacklisted(&mut self, account: Address, blacklisted: bool) -> bool {
        self.blacklist.set(account, blacklisted)
    }

    pub fn check_not_paused(&self) -> Result<(), VaultError> {
        if self.pause.is_paused() {
            return Err(VaultError::Paused);
        }
        Ok(())
    }

    pub fn check_sender(&self, sender: &Address) -> Result<(), VaultError> {
        if self.blacklist.contains(sender) {
            return Err(VaultError::SenderBlacklisted {
                address: sender.clone(),
            });
        }
        Ok(())
    }

    pub fn check_receiver(&self, receiver: &Address) -> Result<(), VaultError> {
        if self.blacklist.contains(receiver) {
            return Err(VaultError::ReceiverBlacklisted {
                address: receiver.clone(),
            });
        }
        Ok(())
    }

    /// Gate for an operation acting on a single account (request/cancel).
    pub fn check_account(&self, account: &Address) -> Result<(), VaultError> {
        self.check_not_paused()?;
        self.check_sender(account)
    }

    /// Gate for a movement from `from` to `to`.
    pub fn check_transfer(&self, from: &Address, to: &Address) -> Result<(), VaultError> {
        self.check_not_paused()?;
        self.check_sender(from)?;
        self.check_receiver(to)
    }
}
