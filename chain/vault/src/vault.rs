//! Vault — claim-token custody, deposits, gates and initialization
//!
//! Implements the custody layer:
//! - Two-phase lifecycle (uninitialized → active) with a one-shot
//!   `initialize_product`
//! - 1:1 deposits forwarded straight to the custodian
//! - Gated claim-token transfers and approvals
//! - Owner controls: pause, blacklist, deposit ceiling, ownership, operators
//!
//! Every public operation validates completely before the first asset call
//! and commits ledger state only after the asset calls succeed, so an `Err`
//! leaves the vault untouched.

use custody_types::ids::Address;
use custody_types::numeric::Amount;
use tracing::{debug, error, info, warn};

use crate::asset::AssetLink;
use crate::config::{DepositCeiling, ProductConfig};
use crate::errors::VaultError;
use crate::events::{Approval, Deposited, Initialized, Transfer, VaultEvent};
use crate::ledger::ClaimLedger;
use crate::security::{AccessControl, AccessGate, Role};
use crate::withdrawal::WithdrawalBook;

/// Configured product state, present only after initialization.
#[derive(Debug, Clone)]
pub(crate) struct Product {
    pub(crate) config: ProductConfig,
    pub(crate) ledger: ClaimLedger,
    pub(crate) withdrawals: WithdrawalBook,
}

/// Lifecycle of a vault instance.
#[derive(Debug, Clone)]
pub(crate) enum Phase {
    /// Code installed, only `initialize_product` is accepted
    Uninitialized,
    Active(Box<Product>),
}

impl Phase {
    pub(crate) fn active(&self) -> Result<&Product, VaultError> {
        match self {
            Phase::Active(product) => Ok(&**product),
            Phase::Uninitialized => Err(VaultError::NotInitialized),
        }
    }

    pub(crate) fn active_mut(&mut self) -> Result<&mut Product, VaultError> {
        match self {
            Phase::Active(product) => Ok(&mut **product),
            Phase::Uninitialized => Err(VaultError::NotInitialized),
        }
    }
}

/// Single-asset custody vault.
///
/// The claim ledger, withdrawal book and configuration exist only once the
/// instance is initialized; owner controls and gates exist from construction so an
/// instance can be paused before it is configured.
#[derive(Debug)]
pub struct Vault<A: AssetLink> {
    /// The vault's own address; its claim balance is the withdrawal escrow
    pub(crate) address: Address,
    pub(crate) asset: A,
    access_control: AccessControl,
    pub(crate) gate: AccessGate,
    pub(crate) phase: Phase,
    /// Emitted events log (append-only)
    pub(crate) events: Vec<VaultEvent>,
}

impl<A: AssetLink> Vault<A> {
    /// Install a vault at `address`, owned by `owner`, moving the reference
    /// asset through `asset`. The instance must be initialized before use.
    pub fn new(address: Address, owner: Address, asset: A) -> Self {
        Self {
            address,
            asset,
            access_control: AccessControl::new(owner),
            gate: AccessGate::new(),
            phase: Phase::Uninitialized,
            events: Vec::new(),
        }
    }

    /// Install and initialize in one step, leaving no window in which another
    /// party could initialize first.
    pub fn deploy(
        address: Address,
        owner: Address,
        asset: A,
        config: ProductConfig,
    ) -> Result<Self, VaultError> {
        let mut vault = Self::new(address, owner.clone(), asset);
        vault.initialize_product(&owner, config)?;
        Ok(vault)
    }

    // ───────────────────────── Initialization ─────────────────────────

    /// Configure the product. Succeeds exactly once per instance; every later
    /// call fails with `AlreadyInitialized` whoever the caller is.
    pub fn initialize_product(
        &mut self,
        caller: &Address,
        config: ProductConfig,
    ) -> Result<(), VaultError> {
        if let Phase::Active(_) = self.phase {
            warn!(caller = %caller, "Rejected repeated initialization");
            return Err(VaultError::AlreadyInitialized);
        }
        config.validate()?;
        if config.custodian == self.address {
            return Err(VaultError::InvalidConfig {
                reason: "custodian must not be the vault itself".to_string(),
            });
        }

        let ledger = ClaimLedger::new(config.name.clone(), config.symbol.clone());
        let event = VaultEvent::Initialized(Initialized {
            asset: config.asset.clone(),
            custodian: config.custodian.clone(),
            name: config.name.clone(),
            symbol: config.symbol.clone(),
            max_deposit: config.max_deposit,
            min_deposit: config.min_deposit,
        });

        info!(
            vault = %self.address,
            caller = %caller,
            custodian = %config.custodian,
            symbol = %config.symbol,
            max_deposit = config.max_deposit,
            "Vault initialized"
        );

        self.phase = Phase::Active(Box::new(Product {
            config,
            ledger,
            withdrawals: WithdrawalBook::new(),
        }));
        self.events.push(event);
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        matches!(self.phase, Phase::Active(_))
    }

    // ───────────────────────── Deposit ─────────────────────────

    /// Pull `amount` of the reference asset from `caller`, forward it to the
    /// custodian and mint the same amount of claims to `receiver`.
    pub fn deposit(
        &mut self,
        caller: &Address,
        amount: Amount,
        receiver: &Address,
    ) -> Result<(), VaultError> {
        let remaining = self.max_deposit_for(receiver);
        let product = self.phase.active_mut()?;

        self.gate.check_transfer(caller, receiver).inspect_err(|e| {
            warn!(caller = %caller, receiver = %receiver, error = %e, "Deposit rejected by gate");
        })?;
        if *caller == self.address {
            return Err(VaultError::InvalidSender {
                address: caller.clone(),
            });
        }
        if *receiver == self.address {
            return Err(VaultError::InvalidReceiver {
                address: receiver.clone(),
            });
        }
        if amount == 0 {
            return Err(VaultError::InvalidAmount);
        }
        if amount < product.config.min_deposit {
            return Err(VaultError::BelowMinDeposit {
                requested: amount,
                minimum: product.config.min_deposit,
            });
        }
        if amount > remaining {
            return Err(VaultError::ExceededMaxDeposit {
                requested: amount,
                remaining,
            });
        }
        product
            .ledger
            .total_supply()
            .checked_add(amount)
            .ok_or(VaultError::Overflow)?;

        let custodian = product.config.custodian.clone();
        relay_asset(&mut self.asset, caller, &custodian, amount)?;
        product.ledger.mint(receiver, amount)?;

        info!(
            caller = %caller,
            receiver = %receiver,
            custodian = %custodian,
            amount,
            "Deposit forwarded to custodian"
        );
        self.events.push(VaultEvent::Deposited(Deposited {
            caller: caller.clone(),
            receiver: receiver.clone(),
            custodian,
            amount,
        }));
        Ok(())
    }

    /// Largest deposit `receiver` could make right now under the ceiling.
    pub fn max_deposit_for(&self, receiver: &Address) -> Amount {
        let Ok(product) = self.phase.active() else {
            return 0;
        };
        let used = match product.config.ceiling {
            DepositCeiling::TotalSupply => product.ledger.total_supply(),
            DepositCeiling::PerReceiver => product.ledger.balance_of(receiver),
        };
        product.config.max_deposit.saturating_sub(used)
    }

    // ───────────────────────── Claim Token ─────────────────────────

    /// Move claims from `caller` to `to`.
    pub fn transfer(
        &mut self,
        caller: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), VaultError> {
        let product = self.phase.active_mut()?;
        self.gate.check_transfer(caller, to).inspect_err(|e| {
            warn!(from = %caller, to = %to, error = %e, "Transfer rejected by gate");
        })?;
        if *caller == self.address {
            return Err(VaultError::InvalidSender {
                address: caller.clone(),
            });
        }
        if *to == self.address {
            return Err(VaultError::InvalidReceiver { address: to.clone() });
        }

        product.ledger.transfer(caller, to, amount)?;

        debug!(from = %caller, to = %to, amount, "Claim transfer");
        self.events.push(VaultEvent::Transfer(Transfer {
            from: caller.clone(),
            to: to.clone(),
            amount,
        }));
        Ok(())
    }

    /// Move claims from `from` to `to` using `caller`'s allowance.
    pub fn transfer_from(
        &mut self,
        caller: &Address,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), VaultError> {
        let product = self.phase.active_mut()?;
        self.gate.check_transfer(from, to).inspect_err(|e| {
            warn!(from = %from, to = %to, spender = %caller, error = %e, "Delegated transfer rejected by gate");
        })?;
        self.gate.check_sender(caller)?;
        // Escrow leaves the vault address only through cancel or settlement
        for sender in [from, caller] {
            if *sender == self.address {
                return Err(VaultError::InvalidSender {
                    address: sender.clone(),
                });
            }
        }
        if *to == self.address {
            return Err(VaultError::InvalidReceiver { address: to.clone() });
        }

        product.ledger.transfer_from(caller, from, to, amount)?;

        debug!(from = %from, to = %to, spender = %caller, amount, "Delegated claim transfer");
        self.events.push(VaultEvent::Transfer(Transfer {
            from: from.clone(),
            to: to.clone(),
            amount,
        }));
        Ok(())
    }

    /// Set `spender`'s limit over `caller`'s claims.
    pub fn approve(
        &mut self,
        caller: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<(), VaultError> {
        let product = self.phase.active_mut()?;
        self.gate.check_transfer(caller, spender)?;
        if *caller == self.address {
            return Err(VaultError::InvalidSender {
                address: caller.clone(),
            });
        }

        product.ledger.approve(caller, spender, amount);

        self.events.push(VaultEvent::Approval(Approval {
            owner: caller.clone(),
            spender: spender.clone(),
            amount,
        }));
        Ok(())
    }

    // ───────────────────────── Owner Controls ─────────────────────────

    /// Pause or unpause every balance-mutating operation. Owner-only.
    pub fn set_paused(&mut self, caller: &Address, paused: bool) -> Result<(), VaultError> {
        self.require_role(caller, Role::Owner)?;
        let previous = self.gate.set_paused(paused);
        if previous != paused {
            info!(paused, "Pause state changed");
        }
        self.events.push(VaultEvent::PauseChanged { paused });
        Ok(())
    }

    /// Set or clear the blacklist flag of `account`. Owner-only.
    pub fn set_blacklisted(
        &mut self,
        caller: &Address,
        account: &Address,
        blacklisted: bool,
    ) -> Result<(), VaultError> {
        self.require_role(caller, Role::Owner)?;
        if self.gate.set_blacklisted(account.clone(), blacklisted) {
            info!(account = %account, blacklisted, "Blacklist updated");
        }
        self.events.push(VaultEvent::BlacklistUpdated {
            account: account.clone(),
            blacklisted,
        });
        Ok(())
    }

    /// Update the deposit ceiling, the only setting mutable after
    /// initialization. Owner-only.
    pub fn set_max_deposit(&mut self, caller: &Address, max_deposit: Amount) -> Result<(), VaultError> {
        self.require_role(caller, Role::Owner)?;
        let product = self.phase.active_mut()?;
        if max_deposit < product.config.min_deposit {
            return Err(VaultError::InvalidConfig {
                reason: format!(
                    "maxDeposit {} below minDeposit {}",
                    max_deposit, product.config.min_deposit
                ),
            });
        }

        product.config.max_deposit = max_deposit;

        info!(max_deposit, "Max deposit updated");
        self.events.push(VaultEvent::MaxDepositUpdated { max_deposit });
        Ok(())
    }

    /// Hand ownership to `new_owner`. Owner-only.
    pub fn transfer_ownership(&mut self, caller: &Address, new_owner: &Address) -> Result<(), VaultError> {
        if !self
            .access_control
            .transfer_ownership(caller, new_owner.clone())
        {
            return Err(VaultError::Unauthorized {
                caller: caller.clone(),
            });
        }
        info!(previous = %caller, new_owner = %new_owner, "Ownership transferred");
        self.events.push(VaultEvent::OwnershipTransferred {
            previous: caller.clone(),
            new_owner: new_owner.clone(),
        });
        Ok(())
    }

    /// Allow `operator` to settle withdrawals. Owner-only.
    pub fn grant_operator(&mut self, caller: &Address, operator: &Address) -> Result<(), VaultError> {
        if !self.access_control.grant_operator(caller, operator.clone()) {
            return Err(VaultError::Unauthorized {
                caller: caller.clone(),
            });
        }
        info!(operator = %operator, "Operator granted");
        self.events.push(VaultEvent::OperatorUpdated {
            operator: operator.clone(),
            enabled: true,
        });
        Ok(())
    }

    /// Withdraw the operator role from `operator`. Owner-only.
    pub fn revoke_operator(&mut self, caller: &Address, operator: &Address) -> Result<(), VaultError> {
        if !self.access_control.revoke_operator(caller, operator) {
            return Err(VaultError::Unauthorized {
                caller: caller.clone(),
            });
        }
        info!(operator = %operator, "Operator revoked");
        self.events.push(VaultEvent::OperatorUpdated {
            operator: operator.clone(),
            enabled: false,
        });
        Ok(())
    }

    pub(crate) fn require_role(&self, caller: &Address, role: Role) -> Result<(), VaultError> {
        if !self.access_control.has_role(caller, role) {
            warn!(caller = %caller, ?role, "Unauthorized privileged call");
            return Err(VaultError::Unauthorized {
                caller: caller.clone(),
            });
        }
        Ok(())
    }

    // ───────────────────────── Queries ─────────────────────────

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn owner(&self) -> &Address {
        self.access_control.owner()
    }

    pub fn is_operator(&self, account: &Address) -> bool {
        self.access_control.has_role(account, Role::Operator)
    }

    pub fn is_paused(&self) -> bool {
        self.gate.is_paused()
    }

    pub fn is_blacklisted(&self, account: &Address) -> bool {
        self.gate.is_blacklisted(account)
    }

    /// Product configuration, `None` before initialization.
    pub fn config(&self) -> Option<&ProductConfig> {
        self.phase.active().ok().map(|p| &p.config)
    }

    pub fn custodian(&self) -> Option<&Address> {
        self.config().map(|c| &c.custodian)
    }

    pub fn max_deposit(&self) -> Amount {
        self.config().map_or(0, |c| c.max_deposit)
    }

    pub fn min_deposit(&self) -> Amount {
        self.config().map_or(0, |c| c.min_deposit)
    }

    pub fn name(&self) -> Option<&str> {
        self.phase.active().ok().map(|p| p.ledger.name())
    }

    pub fn symbol(&self) -> Option<&str> {
        self.phase.active().ok().map(|p| p.ledger.symbol())
    }

    pub fn decimals(&self) -> Option<u8> {
        self.phase.active().ok().map(|p| p.ledger.decimals())
    }

    pub fn total_supply(&self) -> Amount {
        self.phase.active().map_or(0, |p| p.ledger.total_supply())
    }

    pub fn balance_of(&self, account: &Address) -> Amount {
        self.phase.active().map_or(0, |p| p.ledger.balance_of(account))
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.phase
            .active()
            .map_or(0, |p| p.ledger.allowance(owner, spender))
    }

    /// Claims held by the vault itself on behalf of pending withdrawals.
    pub fn escrow_balance(&self) -> Amount {
        self.balance_of(&self.address)
    }

    /// The reference-asset link.
    pub fn asset(&self) -> &A {
        &self.asset
    }

    pub fn asset_mut(&mut self) -> &mut A {
        &mut self.asset
    }

    /// Verify supply conservation and that the escrow balance backs exactly
    /// the pending requests.
    pub fn check_invariants(&self) -> Result<(), VaultError> {
        let Ok(product) = self.phase.active() else {
            return Ok(());
        };
        let sum = product.ledger.sum_of_balances().ok_or(VaultError::Overflow)?;
        if sum != product.ledger.total_supply() {
            return Err(VaultError::InvariantViolation {
                reason: format!(
                    "total supply {} != sum of balances {}",
                    product.ledger.total_supply(),
                    sum
                ),
            });
        }
        let escrow = product.ledger.balance_of(&self.address);
        let locked = product.withdrawals.total_locked().ok_or(VaultError::Overflow)?;
        if escrow != locked {
            return Err(VaultError::InvariantViolation {
                reason: format!("escrow {} != locked {}", escrow, locked),
            });
        }
        Ok(())
    }

    // ───────────────────────── Events ─────────────────────────

    /// Get all emitted events.
    pub fn events(&self) -> &[VaultEvent] {
        &self.events
    }

    /// Drain all events (consume and clear).
    pub fn drain_events(&mut self) -> Vec<VaultEvent> {
        std::mem::take(&mut self.events)
    }
}

/// Pull `amount` from `source` and push it on to `destination`.
///
/// If the push fails the pulled funds are returned to `source` before the
/// error is reported, so the asset ledger ends where it started.
pub(crate) fn relay_asset<A: AssetLink>(
    asset: &mut A,
    source: &Address,
    destination: &Address,
    amount: Amount,
) -> Result<(), VaultError> {
    asset.transfer_in(source, amount)?;
    if let Err(push_err) = asset.transfer_out(destination, amount) {
        if let Err(refund_err) = asset.transfer_out(source, amount) {
            error!(
                source = %source,
                destination = %destination,
                amount,
                error = %refund_err,
                "Refund after failed forward also failed"
            );
        }
        warn!(destination = %destination, amount, error = %push_err, "Asset forward failed");
        return Err(push_err.into());
    }
    Ok(())
}
