//! Domain- and chain-scoped signed envelopes.
//!
//! A [`SignedEnvelope`] binds a payload to a [`Domain`] tag and a chain id
//! before signing, so a signature minted for one message kind (say, a
//! transaction) cannot be replayed as another (say, a vote), and a
//! signature minted on one chain cannot be replayed on another.

use serde::{Deserialize, Serialize};
use tbft_primitives::Address;

use crate::error::CryptoError;
use crate::keys::{verify_signature, Keypair};

/// The kind of message a [`SignedEnvelope`] carries. Included in the
/// signed buffer so a signature cannot be replayed across domains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Domain {
    /// A transaction.
    #[serde(rename = "TX")]
    Tx,
    /// A consensus vote (Prevote or Precommit).
    #[serde(rename = "VOTE")]
    Vote,
    /// A block proposal.
    #[serde(rename = "BLOCK")]
    Block,
}

impl Domain {
    fn as_str(&self) -> &'static str {
        match self {
            Domain::Tx => "TX",
            Domain::Vote => "VOTE",
            Domain::Block => "BLOCK",
        }
    }
}

/// A payload signed with domain- and chain-scoped Ed25519 signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedEnvelope<T> {
    /// The message domain this signature is scoped to.
    pub domain: Domain,
    /// The chain this signature is scoped to.
    pub chain_id: String,
    /// The signed payload.
    pub data: T,
    /// Raw 64-byte Ed25519 signature over `(domain, chain_id, data)`.
    #[serde(with = "signature_b64")]
    pub signature: [u8; 64],
    /// The signer's address (their Ed25519 public key).
    pub signer_address: Address,
}

impl<T: Serialize> SignedEnvelope<T> {
    /// Build and sign a new envelope.
    pub fn sign(
        domain: Domain,
        chain_id: impl Into<String>,
        data: T,
        keypair: &Keypair,
    ) -> Result<Self, CryptoError> {
        let chain_id = chain_id.into();
        let message = signing_message(domain, &chain_id, &data)?;
        let signature = keypair.sign(&message);
        Ok(Self {
            domain,
            chain_id,
            data,
            signature,
            signer_address: keypair.address(),
        })
    }

    /// Verify this envelope's signature against an expected domain and
    /// chain id. Fails closed: any mismatch in domain, chain id, payload,
    /// or signature is rejected.
    pub fn verify(&self, expected_domain: Domain, expected_chain_id: &str) -> Result<(), CryptoError> {
        if self.domain != expected_domain {
            return Err(CryptoError::DomainMismatch {
                expected: expected_domain.as_str().to_string(),
                got: self.domain.as_str().to_string(),
            });
        }
        if self.chain_id != expected_chain_id {
            return Err(CryptoError::ChainIdMismatch {
                expected: expected_chain_id.to_string(),
                got: self.chain_id.clone(),
            });
        }
        let message = signing_message(self.domain, &self.chain_id, &self.data)?;
        verify_signature(&self.signer_address, &message, &self.signature)
    }
}

/// Builds the exact byte buffer that gets signed: the canonical encoding
/// (lexicographically key-sorted, see [`crate::hash_value`]) of
/// `{"domain": ..., "chain_id": ..., "data": ...}`.
fn signing_message<T: Serialize>(
    domain: Domain,
    chain_id: &str,
    data: &T,
) -> Result<Vec<u8>, CryptoError> {
    let object = serde_json::json!({
        "domain": domain.as_str(),
        "chain_id": chain_id,
        "data": data,
    });
    serde_json::to_vec(&object).map_err(|e| CryptoError::Encoding(e.to_string()))
}

mod signature_b64 {
    use base64::engine::general_purpose::STANDARD as BASE64;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(sig: &[u8; 64], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&BASE64.encode(sig))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<[u8; 64], D::Error> {
        let s = String::deserialize(deserializer)?;
        let bytes = BASE64.decode(s.as_bytes()).map_err(serde::de::Error::custom)?;
        if bytes.len() != 64 {
            return Err(serde::de::Error::custom(format!(
                "invalid signature length: expected 64, got {}",
                bytes.len()
            )));
        }
        let mut out = [0u8; 64];
        out.copy_from_slice(&bytes);
        Ok(out)
    }
}
