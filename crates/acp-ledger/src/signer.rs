//! Ledger transaction signing (secp256k1)

use std::fmt;

use k256::ecdsa::signature::{Signer, Verifier};
use k256::ecdsa::{Signature, SigningKey, VerifyingKey};
use k256::elliptic_curve::sec1::ToEncodedPoint as _;

use crate::client::{SignedTransaction, Transaction};
use crate::{LedgerError, Result};

/// Holds the ledger private key. The key never leaves this type; callers get
/// the compressed public key and signatures, both hex-encoded.
#[derive(Clone)]
pub struct LedgerSigner {
    key: SigningKey,
    public_key_hex: String,
}

impl LedgerSigner {
    /// Parse a hex-encoded 32-byte private key (optional `0x` prefix)
    pub fn from_hex(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let hex_part = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        let bytes = hex::decode(hex_part).map_err(|e| LedgerError::InvalidKey {
            message: e.to_string(),
        })?;
        if bytes.len() != 32 {
            return Err(LedgerError::InvalidKey {
                message: format!("expected 32 bytes, got {}", bytes.len()),
            });
        }
        let key = SigningKey::from_slice(&bytes).map_err(|e| LedgerError::InvalidKey {
            message: e.to_string(),
        })?;
        let public_key_hex = hex::encode(key.verifying_key().to_encoded_point(true).as_bytes());
        Ok(Self {
            key,
            public_key_hex,
        })
    }

    /// Compressed public key, hex-encoded
    pub fn public_key_hex(&self) -> &str {
        &self.public_key_hex
    }

    /// Unsigned transaction with this key as its only signer
    pub fn transaction(&self, operations: Vec<crate::Operation>) -> Transaction {
        Transaction::new(operations, vec![self.public_key_hex.clone()])
    }

    pub fn sign(&self, transaction: Transaction) -> Result<SignedTransaction> {
        let bytes = transaction.signing_bytes()?;
        let signature: Signature = self.key.sign(&bytes);
        let tx_rid = transaction.rid()?;
        Ok(SignedTransaction {
            transaction,
            signatures: vec![hex::encode(signature.to_bytes())],
            tx_rid,
        })
    }
}

impl fmt::Debug for LedgerSigner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LedgerSigner")
            .field("public_key", &self.public_key_hex)
            .finish_non_exhaustive()
    }
}

/// Check every signer of `tx` produced the matching signature
pub fn verify_signatures(tx: &SignedTransaction) -> Result<()> {
    let signers = &tx.transaction.signers;
    if signers.is_empty() || signers.len() != tx.signatures.len() {
        return Err(LedgerError::Rejected {
            tx_rid: tx.tx_rid.clone(),
            reason: format!(
                "expected {} signatures, got {}",
                signers.len(),
                tx.signatures.len()
            ),
        });
    }

    let bytes = tx.transaction.signing_bytes()?;
    for (signer, signature) in signers.iter().zip(&tx.signatures) {
        let reject = |reason: String| LedgerError::Rejected {
            tx_rid: tx.tx_rid.clone(),
            reason,
        };
        let pubkey = hex::decode(signer).map_err(|e| reject(e.to_string()))?;
        let key = VerifyingKey::from_sec1_bytes(&pubkey).map_err(|e| reject(e.to_string()))?;
        let sig_bytes = hex::decode(signature).map_err(|e| reject(e.to_string()))?;
        let sig = Signature::from_slice(&sig_bytes).map_err(|e| reject(e.to_string()))?;
        key.verify(&bytes, &sig)
            .map_err(|_| reject(format!("bad signature from {}", signer)))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Operation;

    const KEY: &str = "0101010101010101010101010101010101010101010101010101010101010101";

    #[test]
    fn test_signer_parses_hex() {
        let a = LedgerSigner::from_hex(KEY).unwrap();
        let b = LedgerSigner::from_hex(&format!("0x{}", KEY)).unwrap();
        assert_eq!(a.public_key_hex(), b.public_key_hex());
        // compressed sec1 point
        assert_eq!(a.public_key_hex().len(), 66);
    }

    #[test]
    fn test_signer_rejects_bad_keys() {
        assert!(LedgerSigner::from_hex("not hex").is_err());
        assert!(LedgerSigner::from_hex("0102").is_err());
        assert!(LedgerSigner::from_hex(&"00".repeat(32)).is_err());
    }

    #[test]
    fn test_sign_and_verify() {
        let signer = LedgerSigner::from_hex(KEY).unwrap();
        let tx = signer.transaction(vec![Operation::new(
            "update_job_status",
            vec![serde_json::json!("7"), serde_json::json!(1)],
        )]);
        let signed = signer.sign(tx).unwrap();
        assert!(verify_signatures(&signed).is_ok());

        let mut tampered = signed.clone();
        tampered.transaction.operations[0].args[1] = serde_json::json!(2);
        assert!(verify_signatures(&tampered).is_err());
    }

    #[test]
    fn test_debug_hides_private_key() {
        let signer = LedgerSigner::from_hex(KEY).unwrap();
        let debug = format!("{:?}", signer);
        assert!(!debug.contains(KEY));
        assert!(debug.contains(signer.public_key_hex()));
    }
}
