//! Withdrawal System — request, cancel, settle
//!
//! Each holder has at most one pending request. Requesting moves the claims
//! into the vault's own balance (the escrow); cancelling moves them back;
//! settling burns them while an operator pays the reference asset out to the
//! holder.
//!
//! `NoRequest → Requested(locked) → NoRequest`

use custody_types::ids::Address;
use custody_types::numeric::Amount;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::asset::AssetLink;
use crate::errors::VaultError;
use crate::events::{VaultEvent, WithdrawalCancelled, WithdrawalProcessed, WithdrawalRequested};
use crate::security::Role;
use crate::vault::{relay_asset, Vault};

/// Withdrawal state of a single holder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WithdrawalState {
    NoRequest,
    /// Claims of this amount sit in escrow
    Requested(Amount),
}

/// A pending withdrawal request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequest {
    pub request_id: Uuid,
    pub holder: Address,
    pub amount: Amount,
}

/// Pending requests keyed by holder.
#[derive(Debug, Clone, Default)]
pub struct WithdrawalBook {
    requests: HashMap<Address, WithdrawalRequest>,
}

impl WithdrawalBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, holder: &Address) -> Option<&WithdrawalRequest> {
        self.requests.get(holder)
    }

    pub fn state(&self, holder: &Address) -> WithdrawalState {
        match self.requests.get(holder) {
            Some(request) => WithdrawalState::Requested(request.amount),
            None => WithdrawalState::NoRequest,
        }
    }

    /// Record a new request. Fails if the holder already has one.
    pub fn open(&mut self, holder: &Address, amount: Amount) -> Result<&WithdrawalRequest, VaultError> {
        if self.requests.contains_key(holder) {
            return Err(VaultError::WithdrawalRequestExists {
                holder: holder.clone(),
            });
        }
        let request = WithdrawalRequest {
            request_id: Uuid::now_v7(),
            holder: holder.clone(),
            amount,
        };
        Ok(self.requests.entry(holder.clone()).or_insert(request))
    }

    pub fn close(&mut self, holder: &Address) -> Option<WithdrawalRequest> {
        self.requests.remove(holder)
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    /// Sum of all locked amounts, `None` on overflow.
    pub fn total_locked(&self) -> Option<Amount> {
        self.requests
            .values()
            .try_fold(0 as Amount, |acc, r| acc.checked_add(r.amount))
    }

    pub fn iter(&self) -> impl Iterator<Item = &WithdrawalRequest> {
        self.requests.values()
    }
}

impl<A: AssetLink> Vault<A> {
    /// Escrow `amount` of `caller`'s claims and register a withdrawal request.
    ///
    /// Returns the request id.
    pub fn request_withdrawal(&mut self, caller: &Address, amount: Amount) -> Result<Uuid, VaultError> {
        let product = self.phase.active_mut()?;
        self.gate.check_account(caller).inspect_err(|e| {
            warn!(holder = %caller, error = %e, "Withdrawal request rejected by gate");
        })?;
        if *caller == self.address {
            return Err(VaultError::InvalidSender {
                address: caller.clone(),
            });
        }
        if product.withdrawals.get(caller).is_some() {
            return Err(VaultError::WithdrawalRequestExists {
                holder: caller.clone(),
            });
        }
        if amount == 0 {
            return Err(VaultError::InvalidAmount);
        }

        product.ledger.transfer(caller, &self.address, amount)?;
        let request_id = product.withdrawals.open(caller, amount)?.request_id;

        info!(holder = %caller, amount, %request_id, "Withdrawal requested");
        self.events
            .push(VaultEvent::WithdrawalRequested(WithdrawalRequested {
                request_id,
                holder: caller.clone(),
                amount,
            }));
        Ok(request_id)
    }

    /// Release `caller`'s escrow and drop the request.
    ///
    /// Without a pending request this is a successful no-op. Returns the
    /// amount released.
    pub fn cancel_withdrawal(&mut self, caller: &Address) -> Result<Amount, VaultError> {
        let product = self.phase.active_mut()?;
        self.gate.check_account(caller)?;
        if *caller == self.address {
            return Err(VaultError::InvalidSender {
                address: caller.clone(),
            });
        }
        let Some(request) = product.withdrawals.get(caller) else {
            debug!(holder = %caller, "Cancel without pending request");
            return Ok(0);
        };
        let (request_id, amount) = (request.request_id, request.amount);

        product.ledger.transfer(&self.address, caller, amount)?;
        product.withdrawals.close(caller);

        info!(holder = %caller, amount, %request_id, "Withdrawal cancelled");
        self.events
            .push(VaultEvent::WithdrawalCancelled(WithdrawalCancelled {
                request_id,
                holder: caller.clone(),
                amount,
            }));
        Ok(amount)
    }

    /// Settle `holder`'s request: burn the escrowed claims and pay `amount`
    /// of the reference asset from `caller` to the holder. Operator-only.
    ///
    /// Whether `amount` must equal the locked claim amount is decided by the
    /// configured `SettlementPolicy`.
    pub fn process_withdrawal(
        &mut self,
        caller: &Address,
        holder: &Address,
        amount: Amount,
    ) -> Result<WithdrawalRequest, VaultError> {
        self.phase.active()?;
        self.require_role(caller, Role::Operator)?;
        let product = self.phase.active_mut()?;
        self.gate.check_not_paused()?;
        self.gate.check_receiver(holder).inspect_err(|e| {
            warn!(holder = %holder, error = %e, "Settlement rejected by gate");
        })?;
        let request = product
            .withdrawals
            .get(holder)
            .ok_or_else(|| VaultError::NoWithdrawalRequest {
                holder: holder.clone(),
            })?;
        let locked = request.amount;
        product.config.settlement_policy.check(locked, amount)?;
        product.ledger.check_balance(&self.address, locked)?;

        if amount > 0 {
            relay_asset(&mut self.asset, caller, holder, amount)?;
        }
        product.ledger.burn(&self.address, locked)?;
        let settled = product
            .withdrawals
            .close(holder)
            .ok_or_else(|| VaultError::NoWithdrawalRequest {
                holder: holder.clone(),
            })?;

        info!(
            holder = %holder,
            operator = %caller,
            burned = locked,
            paid = amount,
            request_id = %settled.request_id,
            "Withdrawal processed"
        );
        self.events
            .push(VaultEvent::WithdrawalProcessed(WithdrawalProcessed {
                request_id: settled.request_id,
                holder: holder.clone(),
                operator: caller.clone(),
                burned: locked,
                paid: amount,
            }));
        Ok(settled)
    }

    pub fn withdrawal_state(&self, holder: &Address) -> WithdrawalState {
        self.phase
            .active()
            .map_or(WithdrawalState::NoRequest, |p| p.withdrawals.state(holder))
    }

    pub fn withdrawal_request(&self, holder: &Address) -> Option<&WithdrawalRequest> {
        self.phase.active().ok().and_then(|p| p.withdrawals.get(holder))
    }

    /// Claims `holder` has locked in escrow, zero without a request.
    pub fn locked_amount(&self, holder: &Address) -> Amount {
        self.withdrawal_request(holder).map_or(0, |r| r.amount)
    }

    /// All pending requests, ordered by holder address.
    pub fn pending_withdrawals(&self) -> Vec<&WithdrawalRequest> {
        let mut pending: Vec<_> = self
            .phase
            .active()
            .map(|p| p.withdrawals.iter().collect())
            .unwrap_or_default();
        pending.sort_by(|a, b| a.holder.cmp(&b.holder));
        pending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::asset::InMemoryAsset;
    use crate::config::{ProductConfig, SettlementPolicy};
    use crate::errors::AssetError;

    fn addr(s: &str) -> Address {
        Address::try_new(s).unwrap()
    }

    fn setup_with(policy: SettlementPolicy) -> Vault<InMemoryAsset> {
        let mut asset = InMemoryAsset::new(addr("vault"));
        asset.mint(&addr("alice"), 10_000).unwrap();
        asset.approve(&addr("alice"), Amount::MAX);
        asset.mint(&addr("owner"), 10_000).unwrap();
        asset.approve(&addr("owner"), Amount::MAX);
        let config = ProductConfig::new(addr("wbtc"), "Claim BTC", "cBTC", addr("custodian"))
            .with_settlement_policy(policy);
        let mut vault = Vault::deploy(addr("vault"), addr("owner"), asset, config).unwrap();
        vault.deposit(&addr("alice"), 300, &addr("alice")).unwrap();
        vault
    }

    fn setup() -> Vault<InMemoryAsset> {
        setup_with(SettlementPolicy::ExactMatch)
    }

    #[test]
    fn test_request_then_cancel_round_trip() {
        let mut vault = setup();
        let alice = addr("alice");

        vault.request_withdrawal(&alice, 200).unwrap();
        assert_eq!(vault.balance_of(&alice), 100);
        assert_eq!(vault.escrow_balance(), 200);
        assert_eq!(vault.withdrawal_state(&alice), WithdrawalState::Requested(200));
        assert_eq!(vault.total_supply(), 300);

        assert_eq!(vault.cancel_withdrawal(&alice).unwrap(), 200);
        assert_eq!(vault.balance_of(&alice), 300);
        assert_eq!(vault.escrow_balance(), 0);
        assert_eq!(vault.withdrawal_state(&alice), WithdrawalState::NoRequest);
        vault.check_invariants().unwrap();
    }

    #[test]
    fn test_second_request_rejected() {
        let mut vault = setup();
        let alice = addr("alice");
        vault.request_withdrawal(&alice, 100).unwrap();
        assert_eq!(
            vault.request_withdrawal(&alice, 50),
            Err(VaultError::WithdrawalRequestExists { holder: alice.clone() })
        );
        assert_eq!(vault.locked_amount(&alice), 100);
        assert_eq!(vault.balance_of(&alice), 200);
    }

    #[test]
    fn test_request_insufficient_balance() {
        let mut vault = setup();
        let result = vault.request_withdrawal(&addr("alice"), 301);
        assert!(matches!(result, Err(VaultError::InsufficientBalance { .. })));
        assert_eq!(vault.withdrawal_state(&addr("alice")), WithdrawalState::NoRequest);
    }

    #[test]
    fn test_request_zero_rejected() {
        let mut vault = setup();
        assert_eq!(
            vault.request_withdrawal(&addr("alice"), 0),
            Err(VaultError::InvalidAmount)
        );
    }

    #[test]
    fn test_cancel_without_request_is_noop() {
        let mut vault = setup();
        vault.drain_events();
        assert_eq!(vault.cancel_withdrawal(&addr("alice")).unwrap(), 0);
        assert_eq!(vault.balance_of(&addr("alice")), 300);
        assert!(vault.events().is_empty());
    }

    #[test]
    fn test_vault_address_cannot_request_or_cancel() {
        let mut vault = setup();
        vault.request_withdrawal(&addr("alice"), 200).unwrap();

        assert_eq!(
            vault.request_withdrawal(&addr("vault"), 200),
            Err(VaultError::InvalidSender {
                address: addr("vault")
            })
        );
        assert_eq!(
            vault.cancel_withdrawal(&addr("vault")),
            Err(VaultError::InvalidSender {
                address: addr("vault")
            })
        );
        assert_eq!(vault.escrow_balance(), 200);
        assert_eq!(vault.pending_withdrawals().len(), 1);
        vault.check_invariants().unwrap();

        assert_eq!(vault.cancel_withdrawal(&addr("alice")).unwrap(), 200);
    }

    #[test]
    fn test_process_burns_escrow_and_pays_holder() {
        let mut vault = setup();
        let alice = addr("alice");
        let request_id = vault.request_withdrawal(&alice, 200).unwrap();

        let settled = vault.process_withdrawal(&addr("owner"), &alice, 200).unwrap();
        assert_eq!(settled.request_id, request_id);
        assert_eq!(vault.total_supply(), 100);
        assert_eq!(vault.escrow_balance(), 0);
        assert_eq!(vault.balance_of(&alice), 100);
        assert_eq!(vault.asset().balance_of(&alice), 9_700 + 200);
        assert_eq!(vault.asset().balance_of(&addr("owner")), 9_800);
        assert_eq!(vault.withdrawal_state(&alice), WithdrawalState::NoRequest);
        vault.check_invariants().unwrap();
    }

    #[test]
    fn test_process_by_granted_operator() {
        let mut vault = setup();
        let operator = addr("operator");
        vault.asset_mut().mint(&operator, 500).unwrap();
        vault.asset_mut().approve(&operator, 500);
        vault.grant_operator(&addr("owner"), &operator).unwrap();
        vault.request_withdrawal(&addr("alice"), 150).unwrap();

        vault.process_withdrawal(&operator, &addr("alice"), 150).unwrap();
        assert_eq!(vault.asset().balance_of(&operator), 350);
    }

    #[test]
    fn test_process_unauthorized() {
        let mut vault = setup();
        vault.request_withdrawal(&addr("alice"), 100).unwrap();
        assert_eq!(
            vault.process_withdrawal(&addr("eve"), &addr("alice"), 100),
            Err(VaultError::Unauthorized { caller: addr("eve") })
        );
        assert_eq!(vault.escrow_balance(), 100);
    }

    #[test]
    fn test_process_without_request() {
        let mut vault = setup();
        assert_eq!(
            vault.process_withdrawal(&addr("owner"), &addr("alice"), 100),
            Err(VaultError::NoWithdrawalRequest { holder: addr("alice") })
        );
    }

    #[test]
    fn test_process_blacklisted_holder_reports_receiver() {
        let mut vault = setup();
        vault.request_withdrawal(&addr("alice"), 100).unwrap();
        vault.set_blacklisted(&addr("owner"), &addr("alice"), true).unwrap();
        assert_eq!(
            vault.process_withdrawal(&addr("owner"), &addr("alice"), 100),
            Err(VaultError::ReceiverBlacklisted { address: addr("alice") })
        );
        assert_eq!(vault.locked_amount(&addr("alice")), 100);
    }

    #[test]
    fn test_exact_match_policy_rejects_mismatch() {
        let mut vault = setup();
        vault.request_withdrawal(&addr("alice"), 200).unwrap();
        assert_eq!(
            vault.process_withdrawal(&addr("owner"), &addr("alice"), 150),
            Err(VaultError::SettlementMismatch {
                locked: 200,
                offered: 150
            })
        );
        assert_eq!(vault.escrow_balance(), 200);
        assert_eq!(vault.total_supply(), 300);
    }

    #[test]
    fn test_operator_quoted_policy_accepts_mismatch() {
        let mut vault = setup_with(SettlementPolicy::OperatorQuoted);
        vault.request_withdrawal(&addr("alice"), 200).unwrap();
        let settled = vault.process_withdrawal(&addr("owner"), &addr("alice"), 190).unwrap();
        assert_eq!(settled.amount, 200);
        assert_eq!(vault.total_supply(), 100);
        assert_eq!(vault.asset().balance_of(&addr("alice")), 9_700 + 190);
    }

    #[test]
    fn test_process_asset_failure_keeps_request() {
        let mut vault = setup();
        vault.request_withdrawal(&addr("alice"), 200).unwrap();
        vault.asset_mut().approve(&addr("owner"), 0);

        let result = vault.process_withdrawal(&addr("owner"), &addr("alice"), 200);
        assert!(matches!(
            result,
            Err(VaultError::Asset(AssetError::InsufficientAllowance { .. }))
        ));
        assert_eq!(vault.locked_amount(&addr("alice")), 200);
        assert_eq!(vault.escrow_balance(), 200);
        assert_eq!(vault.total_supply(), 300);
        vault.check_invariants().unwrap();
    }

    #[test]
    fn test_process_payout_failure_refunds_operator() {
        let mut vault = setup();
        vault.request_withdrawal(&addr("alice"), 200).unwrap();
        vault.asset_mut().set_frozen(&addr("alice"), true);

        let result = vault.process_withdrawal(&addr("owner"), &addr("alice"), 200);
        assert!(matches!(result, Err(VaultError::Asset(AssetError::Rejected { .. }))));
        assert_eq!(vault.asset().balance_of(&addr("owner")), 10_000);
        assert_eq!(vault.asset().balance_of(&addr("vault")), 0);
        assert_eq!(vault.locked_amount(&addr("alice")), 200);
    }

    #[test]
    fn test_pause_blocks_withdrawal_flow() {
        let mut vault = setup();
        vault.request_withdrawal(&addr("alice"), 100).unwrap();
        vault.set_paused(&addr("owner"), true).unwrap();

        assert_eq!(vault.request_withdrawal(&addr("alice"), 1), Err(VaultError::Paused));
        assert_eq!(vault.cancel_withdrawal(&addr("alice")), Err(VaultError::Paused));
        assert_eq!(
            vault.process_withdrawal(&addr("owner"), &addr("alice"), 100),
            Err(VaultError::Paused)
        );
        assert_eq!(vault.locked_amount(&addr("alice")), 100);
    }

    #[test]
    fn test_pending_withdrawals_sorted() {
        let mut vault = setup();
        vault.transfer(&addr("alice"), &addr("bob"), 100).unwrap();
        vault.request_withdrawal(&addr("bob"), 50).unwrap();
        vault.request_withdrawal(&addr("alice"), 50).unwrap();

        let pending = vault.pending_withdrawals();
        assert_eq!(pending.len(), 2);
        assert_eq!(pending[0].holder, addr("alice"));
        assert_eq!(pending[1].holder, addr("bob"));
    }

    #[test]
    fn test_book_total_locked() {
        let mut book = WithdrawalBook::new();
        book.open(&addr("a"), 10).unwrap();
        book.open(&addr("b"), 15).unwrap();
        assert!(book.open(&addr("a"), 1).is_err());
        assert_eq!(book.total_locked(), Some(25));
        assert_eq!(book.close(&addr("a")).map(|r| r.amount), Some(10));
        assert_eq!(book.len(), 1);
    }
}
