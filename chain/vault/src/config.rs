//! Product configuration
//!
//! The one-shot initialization record. Field names on the wire follow the
//! deployment record (`asset`, `name`, `symbol`, `maxDeposit`, `custodian`)
//! so a host can pass the same JSON it encodes for proxy deployment.

use custody_types::ids::Address;
use custody_types::numeric::{Amount, DEFAULT_MAX_DEPOSIT};
use serde::{Deserialize, Serialize};

use crate::errors::VaultError;

/// What the deposit ceiling is compared against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DepositCeiling {
    /// Outstanding claim supply after the deposit must not exceed the ceiling.
    #[default]
    TotalSupply,
    /// Receiver's claim balance after the deposit must not exceed the ceiling.
    ///
    /// This caps the balance held, not the amount ever deposited: claims the
    /// receiver transfers away or locks for withdrawal free capacity again.
    PerReceiver,
}

/// How `process_withdrawal` treats the operator-supplied asset amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SettlementPolicy {
    /// Paid amount must equal the escrowed claim amount.
    #[default]
    ExactMatch,
    /// Paid amount is quoted by the operator and may differ from the lock.
    OperatorQuoted,
}

impl SettlementPolicy {
    /// Invariant `settlement_amount_matches_lock`: under `ExactMatch` the
    /// reference asset paid out equals the claim burned.
    pub fn check(&self, locked: Amount, offered: Amount) -> Result<(), VaultError> {
        match self {
            SettlementPolicy::ExactMatch if locked != offered => {
                Err(VaultError::SettlementMismatch { locked, offered })
            }
            _ => Ok(()),
        }
    }
}

/// Initialization record consumed once by `initialize_product`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductConfig {
    /// Reference-asset token (e.g. WBTC)
    pub asset: Address,
    pub name: String,
    pub symbol: String,
    /// Inclusive deposit ceiling
    #[serde(default = "default_max_deposit")]
    pub max_deposit: Amount,
    #[serde(default)]
    pub min_deposit: Amount,
    /// Destination of deposits and source of settlement funds
    pub custodian: Address,
    #[serde(default)]
    pub ceiling: DepositCeiling,
    #[serde(default)]
    pub settlement_policy: SettlementPolicy,
}

fn default_max_deposit() -> Amount {
    DEFAULT_MAX_DEPOSIT
}

impl ProductConfig {
    /// Config with default bounds and policies.
    pub fn new(
        asset: Address,
        name: impl Into<String>,
        symbol: impl Into<String>,
        custodian: Address,
    ) -> Self {
        Self {
            asset,
            name: name.into(),
            symbol: symbol.into(),
            max_deposit: DEFAULT_MAX_DEPOSIT,
            min_deposit: 0,
            custodian,
            ceiling: DepositCeiling::default(),
            settlement_policy: SettlementPolicy::default(),
        }
    }

    pub fn with_max_deposit(mut self, max_deposit: Amount) -> Self {
        self.max_deposit = max_deposit;
        self
    }

    pub fn with_min_deposit(mut self, min_deposit: Amount) -> Self {
        self.min_deposit = min_deposit;
        self
    }

    pub fn with_ceiling(mut self, ceiling: DepositCeiling) -> Self {
        self.ceiling = ceiling;
        self
    }

    pub fn with_settlement_policy(mut self, policy: SettlementPolicy) -> Self {
        self.settlement_policy = policy;
        self
    }

    /// Parse a JSON initialization record.
    pub fn from_json(json: &str) -> Result<Self, VaultError> {
        let config: Self = serde_json::from_str(json).map_err(|e| VaultError::InvalidConfig {
            reason: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), VaultError> {
        if self.name.trim().is_empty() {
            return Err(VaultError::InvalidConfig {
                reason: "name must not be empty".to_string(),
            });
        }
        if self.symbol.trim().is_empty() {
            return Err(VaultError::InvalidConfig {
                reason: "symbol must not be empty".to_string(),
            });
        }
        if self.min_deposit > self.max_deposit {
            return Err(VaultError::InvalidConfig {
                reason: format!(
                    "minDeposit {} exceeds maxDeposit {}",
                    self.min_deposit, self.max_deposit
                ),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEPLOY_RECORD: &str = r#"{
        "asset": "0x2260FAC5E5542a773Aa44fBCfeDf7C193bc2C599",
        "name": "spdBTC",
        "symbol": "spdBTC",
        "maxDeposit": 4503599627370496,
        "custodian": "0xc0ffee"
    }"#;

    #[test]
    fn test_from_json_deploy_record() {
        let config = ProductConfig::from_json(DEPLOY_RECORD).unwrap();
        assert_eq!(config.symbol, "spdBTC");
        assert_eq!(config.max_deposit, DEFAULT_MAX_DEPOSIT);
        assert_eq!(config.min_deposit, 0);
        assert_eq!(config.custodian, Address::try_new("0xc0ffee").unwrap());
        assert_eq!(config.ceiling, DepositCeiling::TotalSupply);
        assert_eq!(config.settlement_policy, SettlementPolicy::ExactMatch);
    }

    #[test]
    fn test_from_json_optional_fields() {
        let json = r#"{
            "asset": "wbtc",
            "name": "Claim BTC",
            "symbol": "cBTC",
            "custodian": "custodian",
            "minDeposit": 10,
            "ceiling": "perReceiver",
            "settlementPolicy": "operatorQuoted"
        }"#;
        let config = ProductConfig::from_json(json).unwrap();
        assert_eq!(config.max_deposit, DEFAULT_MAX_DEPOSIT);
        assert_eq!(config.min_deposit, 10);
        assert_eq!(config.ceiling, DepositCeiling::PerReceiver);
        assert_eq!(config.settlement_policy, SettlementPolicy::OperatorQuoted);
    }

    #[test]
    fn test_from_json_missing_custodian() {
        let json = r#"{"asset": "wbtc", "name": "n", "symbol": "s"}"#;
        assert!(matches!(
            ProductConfig::from_json(json),
            Err(VaultError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_bounds() {
        let config = ProductConfig::new(Address::try_new("wbtc").unwrap(), "n", "s", Address::try_new("c").unwrap())
            .with_max_deposit(10)
            .with_min_deposit(11);
        assert!(matches!(
            config.validate(),
            Err(VaultError::InvalidConfig { .. })
        ));
    }

    #[test]
    fn test_validate_rejects_blank_symbol() {
        let config = ProductConfig::new(Address::try_new("wbtc").unwrap(), "name", "  ", Address::try_new("c").unwrap());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_settlement_policy_check() {
        assert!(SettlementPolicy::ExactMatch.check(200, 200).is_ok());
        assert_eq!(
            SettlementPolicy::ExactMatch.check(200, 150),
            Err(VaultError::SettlementMismatch {
                locked: 200,
                offered: 150
            })
        );
        assert!(SettlementPolicy::OperatorQuoted.check(200, 150).is_ok());
    }
}
