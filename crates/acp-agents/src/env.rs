//! Credentials from the process environment
//!
//! Each role reads `<ROLE>_WALLET_PRIVATE_KEY`, `<ROLE>_AGENT_WALLET_ADDRESS`
//! and `<ROLE>_ENTITY_ID`; the seller also needs `CHR_PRIV_KEY` for the
//! ledger. Missing or malformed values fail at startup.

use std::fmt;
use std::path::Path;

use acp_ledger::LedgerSigner;
use acp_types::EvmAddress;
use k256::ecdsa::SigningKey;
use thiserror::Error;

pub const CHR_PRIV_KEY: &str = "CHR_PRIV_KEY";

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EnvError {
    #[error("Missing environment variable {name}")]
    Missing { name: String },

    #[error("Invalid {name}: {reason}")]
    Invalid { name: String, reason: String },

    #[error("Failed to load {path}: {message}")]
    File { path: String, message: String },
}

/// Which side of a job an agent plays
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentRole {
    Buyer,
    Seller,
}

impl AgentRole {
    /// Environment variable prefix
    pub fn env_prefix(&self) -> &'static str {
        match self {
            AgentRole::Buyer => "BUYER",
            AgentRole::Seller => "SELLER",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AgentRole::Buyer => f.write_str("buyer"),
            AgentRole::Seller => f.write_str("seller"),
        }
    }
}

/// Hex-encoded wallet private key. Redacted in `Debug`.
#[derive(Clone, PartialEq, Eq)]
pub struct WalletKey(String);

impl WalletKey {
    fn parse(name: &str, raw: &str) -> Result<Self, EnvError> {
        let invalid = |reason: String| EnvError::Invalid {
            name: name.to_string(),
            reason,
        };
        let trimmed = raw.trim();
        let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(hex_part).map_err(|e| invalid(e.to_string()))?;
        if bytes.len() != 32 {
            return Err(invalid(format!("expected 32 bytes, got {}", bytes.len())));
        }
        SigningKey::from_slice(&bytes).map_err(|e| invalid(e.to_string()))?;
        Ok(Self(format!("0x{}", hex_part.to_ascii_lowercase())))
    }

    /// `0x`-prefixed hex, for handing to a contract client
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for WalletKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("WalletKey(<redacted>)")
    }
}

/// Contract-client credentials of one agent
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletCredentials {
    pub role: AgentRole,
    pub wallet_private_key: WalletKey,
    pub agent_wallet_address: EvmAddress,
    pub entity_id: u64,
}

impl WalletCredentials {
    pub fn from_env(role: AgentRole) -> Result<Self, EnvError> {
        Self::from_lookup(role, |name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(role: AgentRole, lookup: F) -> Result<Self, EnvError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let prefix = role.env_prefix();
        let key_name = format!("{}_WALLET_PRIVATE_KEY", prefix);
        let address_name = format!("{}_AGENT_WALLET_ADDRESS", prefix);
        let entity_name = format!("{}_ENTITY_ID", prefix);

        let wallet_private_key = WalletKey::parse(&key_name, &required(&lookup, &key_name)?)?;

        let agent_wallet_address = EvmAddress::parse(&required(&lookup, &address_name)?)
            .map_err(|e| EnvError::Invalid {
                name: address_name.clone(),
                reason: e.to_string(),
            })?;

        let entity_id = required(&lookup, &entity_name)?
            .trim()
            .parse::<u64>()
            .map_err(|e| EnvError::Invalid {
                name: entity_name.clone(),
                reason: e.to_string(),
            })?;

        Ok(Self {
            role,
            wallet_private_key,
            agent_wallet_address,
            entity_id,
        })
    }
}

/// Ledger signing key from `CHR_PRIV_KEY`
pub fn ledger_signer_from_env() -> Result<LedgerSigner, EnvError> {
    ledger_signer_from_lookup(|name| std::env::var(name).ok())
}

pub fn ledger_signer_from_lookup<F>(lookup: F) -> Result<LedgerSigner, EnvError>
where
    F: Fn(&str) -> Option<String>,
{
    let raw = required(&lookup, CHR_PRIV_KEY)?;
    LedgerSigner::from_hex(&raw).map_err(|e| EnvError::Invalid {
        name: CHR_PRIV_KEY.to_string(),
        reason: e.to_string(),
    })
}

/// Load a dotenv file, overriding variables already set.
///
/// A missing file is not an error; returns whether the file was loaded.
pub fn load_env_file(path: &Path) -> Result<bool, EnvError> {
    if !path.exists() {
        return Ok(false);
    }
    dotenvy::from_path_override(path).map_err(|e| EnvError::File {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    Ok(true)
}

fn required<F>(lookup: &F, name: &str) -> Result<String, EnvError>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name)
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| EnvError::Missing {
            name: name.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";
    const ADDRESS: &str = "0x90F8bf6A479f320ead074411a4B0e7944Ea8c9C1";

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn test_buyer_credentials() {
        let creds = WalletCredentials::from_lookup(
            AgentRole::Buyer,
            lookup(&[
                ("BUYER_WALLET_PRIVATE_KEY", KEY),
                ("BUYER_AGENT_WALLET_ADDRESS", ADDRESS),
                ("BUYER_ENTITY_ID", "42"),
            ]),
        )
        .unwrap();

        assert_eq!(creds.role, AgentRole::Buyer);
        assert_eq!(creds.entity_id, 42);
        assert_eq!(creds.agent_wallet_address, EvmAddress::parse(ADDRESS).unwrap());
        assert_eq!(creds.wallet_private_key.expose(), KEY);
    }

    #[test]
    fn test_missing_variable() {
        let err = WalletCredentials::from_lookup(
            AgentRole::Seller,
            lookup(&[
                ("SELLER_WALLET_PRIVATE_KEY", KEY),
                ("SELLER_ENTITY_ID", "7"),
            ]),
        )
        .unwrap_err();

        assert_eq!(
            err,
            EnvError::Missing {
                name: "SELLER_AGENT_WALLET_ADDRESS".to_string()
            }
        );
    }

    #[test]
    fn test_entity_id_must_be_integer() {
        let err = WalletCredentials::from_lookup(
            AgentRole::Seller,
            lookup(&[
                ("SELLER_WALLET_PRIVATE_KEY", KEY),
                ("SELLER_AGENT_WALLET_ADDRESS", ADDRESS),
                ("SELLER_ENTITY_ID", "seven"),
            ]),
        )
        .unwrap_err();

        assert!(matches!(err, EnvError::Invalid { ref name, .. } if name == "SELLER_ENTITY_ID"));
    }

    #[test]
    fn test_malformed_private_key() {
        let err = WalletCredentials::from_lookup(
            AgentRole::Buyer,
            lookup(&[
                ("BUYER_WALLET_PRIVATE_KEY", "0xdeadbeef"),
                ("BUYER_AGENT_WALLET_ADDRESS", ADDRESS),
                ("BUYER_ENTITY_ID", "1"),
            ]),
        )
        .unwrap_err();

        assert!(matches!(err, EnvError::Invalid { ref name, .. } if name == "BUYER_WALLET_PRIVATE_KEY"));
    }

    #[test]
    fn test_private_key_redacted() {
        let creds = WalletCredentials::from_lookup(
            AgentRole::Buyer,
            lookup(&[
                ("BUYER_WALLET_PRIVATE_KEY", KEY),
                ("BUYER_AGENT_WALLET_ADDRESS", ADDRESS),
                ("BUYER_ENTITY_ID", "1"),
            ]),
        )
        .unwrap();
        let debug = format!("{:?}", creds);
        assert!(!debug.contains(&KEY[2..]));
    }

    #[test]
    fn test_ledger_signer() {
        assert!(ledger_signer_from_lookup(lookup(&[(CHR_PRIV_KEY, &KEY[2..])])).is_ok());
        assert_eq!(
            ledger_signer_from_lookup(lookup(&[])).unwrap_err(),
            EnvError::Missing {
                name: CHR_PRIV_KEY.to_string()
            }
        );
        assert!(matches!(
            ledger_signer_from_lookup(lookup(&[(CHR_PRIV_KEY, "zz")])).unwrap_err(),
            EnvError::Invalid { .. }
        ));
    }
}
