//! Signed transfer transactions.

use serde::{Deserialize, Serialize};
use tbft_crypto::{CryptoError, Domain, SignedEnvelope};
use tbft_primitives::{Address, Hash};

/// The unsigned fields of a transfer transaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionData {
    /// Sender address.
    pub from: Address,
    /// Recipient address.
    pub to: Address,
    /// Amount to transfer.
    pub amount: u64,
    /// Sender-scoped replay-protection nonce.
    pub nonce: u64,
}

/// A signed transfer, domain-separated under [`Domain::Tx`].
pub type Transaction = SignedEnvelope<TransactionData>;

/// Verify a transaction's signature against the expected chain id.
pub fn verify_transaction(tx: &Transaction, chain_id: &str) -> Result<(), CryptoError> {
    tx.verify(Domain::Tx, chain_id)
}

/// Compute the canonical hash of a transaction, used to build a block's
/// transaction root and as the transaction's own identifier.
pub fn tx_hash(tx: &Transaction) -> Result<Hash, CryptoError> {
    tbft_crypto::hash_value(tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tbft_crypto::Keypair;

    fn data(from: Address, to: Address, amount: u64, nonce: u64) -> TransactionData {
        TransactionData { from, to, amount, nonce }
    }

    #[test]
    fn sign_and_verify_roundtrip() {
        let kp = Keypair::generate();
        let to = Keypair::generate().address();
        let tx = Transaction::sign(Domain::Tx, "chain-1", data(kp.address(), to, 10, 0), &kp).unwrap();
        assert!(verify_transaction(&tx, "chain-1").is_ok());
    }

    #[test]
    fn verify_rejects_other_chain() {
        let kp = Keypair::generate();
        let to = Keypair::generate().address();
        let tx = Transaction::sign(Domain::Tx, "chain-1", data(kp.address(), to, 10, 0), &kp).unwrap();
        assert!(verify_transaction(&tx, "chain-2").is_err());
    }

    #[test]
    fn tx_hash_is_deterministic() {
        let kp = Keypair::from_seed([9u8; 32]);
        let to = Keypair::from_seed([8u8; 32]).address();
        let tx = Transaction::sign(Domain::Tx, "chain-1", data(kp.address(), to, 5, 0), &kp).unwrap();
        let h1 = tx_hash(&tx).unwrap();
        let h2 = tx_hash(&tx).unwrap();
        assert_eq!(h1, h2);
    }

    #[test]
    fn tx_hash_differs_for_different_amounts() {
        let kp = Keypair::from_seed([9u8; 32]);
        let to = Keypair::from_seed([8u8; 32]).address();
        let tx1 = Transaction::sign(Domain::Tx, "chain-1", data(kp.address(), to, 5, 0), &kp).unwrap();
        let tx2 = Transaction::sign(Domain::Tx, "chain-1", data(kp.address(), to, 6, 0), &kp).unwrap();
        assert_ne!(tx_hash(&tx1).unwrap(), tx_hash(&tx2).unwrap());
    }
}
