//! Coarse-locked vault handle
//!
//! Hosts that serve callers from several threads share one `SharedVault` per
//! instance. Every operation runs under a single mutex, so asset calls never
//! observe a half-applied ledger change and operations are linearized.

use std::sync::{Arc, Mutex};

use crate::asset::AssetLink;
use crate::errors::VaultError;
use crate::vault::Vault;

/// Cloneable handle to a vault behind one lock.
#[derive(Debug)]
pub struct SharedVault<A: AssetLink> {
    inner: Arc<Mutex<Vault<A>>>,
}

impl<A: AssetLink> Clone for SharedVault<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<A: AssetLink> SharedVault<A> {
    pub fn new(vault: Vault<A>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(vault)),
        }
    }

    /// Run `op` with exclusive access to the vault.
    pub fn with<R>(
        &self,
        op: impl FnOnce(&mut Vault<A>) -> Result<R, VaultError>,
    ) -> Result<R, VaultError> {
        let mut vault = self.inner.lock().map_err(|_| VaultError::LockPoisoned)?;
        op(&mut vault)
    }

    /// Run a read-only `query` under the lock.
    pub fn read<R>(&self, query: impl FnOnce(&Vault<A>) -> R) -> Result<R, VaultError> {
        let vault = self.inner.lock().map_err(|_| VaultError::LockPoisoned)?;
        Ok(query(&vault))
    }
}
