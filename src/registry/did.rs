//! `did:key` identity built from an Ed25519 seed
//!
//! The DID is `did:key:z` + base58btc(multicodec `0xed01` ‖ public key), which
//! always yields the `z6Mk` prefix for Ed25519 keys.

use base64::prelude::*;
use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use serde::{Deserialize, Serialize};
use std::fmt;

use super::RegistryError;

/// Multicodec varint for an Ed25519 public key
const ED25519_MULTICODEC: [u8; 2] = [0xed, 0x01];

/// Detached-payload JWS in general serialization.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Jws {
    pub payload: String,
    pub signatures: Vec<JwsSignature>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JwsSignature {
    pub protected: String,
    pub signature: String,
}

/// The single authenticated identity of a publish run.
#[derive(Clone)]
pub struct DidKey {
    signing_key: SigningKey,
    did: String,
}

impl DidKey {
    /// Build from a hex-encoded 32-byte seed.
    pub fn from_hex(seed_hex: &str) -> Result<Self, RegistryError> {
        let bytes = hex::decode(seed_hex.trim())
            .map_err(|e| RegistryError::InvalidKey(format!("not hex: {e}")))?;
        let seed: [u8; 32] = bytes.try_into().map_err(|b: Vec<u8>| {
            RegistryError::InvalidKey(format!("expected 32 bytes, got {}", b.len()))
        })?;
        Ok(Self::from_seed(&seed))
    }

    pub fn from_seed(seed: &[u8; 32]) -> Self {
        let signing_key = SigningKey::from_bytes(seed);
        let did = did_from_public_key(&signing_key.verifying_key());
        Self { signing_key, did }
    }

    pub fn did(&self) -> &str {
        &self.did
    }

    /// Key id used in JWS headers: `did:key:z6Mk...#z6Mk...`
    pub fn kid(&self) -> String {
        let fingerprint = self.did.trim_start_matches("did:key:");
        format!("{}#{}", self.did, fingerprint)
    }

    pub fn verifying_key(&self) -> VerifyingKey {
        self.signing_key.verifying_key()
    }

    /// Sign a JSON payload as an EdDSA JWS.
    pub fn sign_json(&self, payload: &serde_json::Value) -> Result<Jws, RegistryError> {
        let header = serde_json::json!({ "alg": "EdDSA", "kid": self.kid() });
        let protected = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
        let payload = BASE64_URL_SAFE_NO_PAD.encode(serde_json::to_vec(payload)?);

        let signing_input = format!("{protected}.{payload}");
        let signature = self.signing_key.sign(signing_input.as_bytes());

        Ok(Jws {
            payload,
            signatures: vec![JwsSignature {
                protected,
                signature: BASE64_URL_SAFE_NO_PAD.encode(signature.to_bytes()),
            }],
        })
    }
}

impl fmt::Debug for DidKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DidKey").field("did", &self.did).finish_non_exhaustive()
    }
}

pub fn did_from_public_key(key: &VerifyingKey) -> String {
    let mut bytes = Vec::with_capacity(34);
    bytes.extend_from_slice(&ED25519_MULTICODEC);
    bytes.extend_from_slice(key.as_bytes());
    format!("did:key:z{}", bs58::encode(bytes).into_string())
}
