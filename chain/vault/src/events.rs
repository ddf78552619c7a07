//! Vault events
//!
//! Events are immutable records appended by every committed state transition.
//! Failed operations never emit.

use custody_types::ids::Address;
use custody_types::numeric::Amount;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Product configured for the first and only time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Initialized {
    pub asset: Address,
    pub custodian: Address,
    pub name: String,
    pub symbol: String,
    pub max_deposit: Amount,
    pub min_deposit: Amount,
}

/// Reference asset pulled from `caller`, forwarded to `custodian`, claims
/// minted to `receiver`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Deposited {
    pub caller: Address,
    pub receiver: Address,
    pub custodian: Address,
    pub amount: Amount,
}

/// Claim tokens moved between two balances
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    pub from: Address,
    pub to: Address,
    pub amount: Amount,
}

/// Spending limit set by `owner` for `spender`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub owner: Address,
    pub spender: Address,
    pub amount: Amount,
}

/// Holder escrowed `amount` claim tokens pending settlement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalRequested {
    pub request_id: Uuid,
    pub holder: Address,
    pub amount: Amount,
}

/// Holder withdrew their request; escrow returned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalCancelled {
    pub request_id: Uuid,
    pub holder: Address,
    pub amount: Amount,
}

/// Operator settled a request: `burned` claims destroyed, `paid` reference
/// asset delivered to the holder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WithdrawalProcessed {
    pub request_id: Uuid,
    pub holder: Address,
    pub operator: Address,
    pub burned: Amount,
    pub paid: Amount,
}

/// Enum wrapper for all vault events, enabling uniform handling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum VaultEvent {
    Initialized(Initialized),
    Deposited(Deposited),
    Transfer(Transfer),
    Approval(Approval),
    WithdrawalRequested(WithdrawalRequested),
    WithdrawalCancelled(WithdrawalCancelled),
    WithdrawalProcessed(WithdrawalProcessed),
    PauseChanged { paused: bool },
    BlacklistUpdated { account: Address, blacklisted: bool },
    MaxDepositUpdated { max_deposit: Amount },
    OwnershipTransferred { previous: Address, new_owner: Address },
    OperatorUpdated { operator: Address, enabled: bool },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposited_serialization() {
        let event = Deposited {
            caller: Address::try_new("alice").unwrap(),
            receiver: Address::try_new("bob").unwrap(),
            custodian: Address::try_new("custodian").unwrap(),
            amount: 100_000_000,
        };
        let json = serde_json::to_string(&event).unwrap();
        let deser: Deposited = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deser);
    }

    #[test]
    fn test_vault_event_is_tagged() {
        let event = VaultEvent::PauseChanged { paused: true };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"PauseChanged","data":{"paused":true}}"#);
    }

    #[test]
    fn test_withdrawal_processed_serialization() {
        let event = VaultEvent::WithdrawalProcessed(WithdrawalProcessed {
            request_id: Uuid::now_v7(),
            holder: Address::try_new("alice").unwrap(),
            operator: Address::try_new("operator").unwrap(),
            burned: 200,
            paid: 200,
        });
        let json = serde_json::to_string(&event).unwrap();
        let deser: VaultEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(event, deser);
    }
}
