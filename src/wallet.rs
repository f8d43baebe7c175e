//! Chain wallet identities.
//!
//! A wallet address is the base58 text form of a 32-byte account key. Every
//! customer-facing identifier in the service is a [`WalletAddress`], so parsing
//! happens once at the edge and the rest of the code can rely on it.

use std::fmt;
use std::str::FromStr;

use ed25519_dalek::{Signature, Verifier, VerifyingKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::openapi::schema::{ObjectBuilder, Schema, Type};
use utoipa::openapi::RefOr;

const ADDRESS_LEN: usize = 32;
const SIGNATURE_LEN: usize = 64;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum WalletError {
    #[error("wallet address is not valid base58")]
    InvalidEncoding,
    #[error("wallet address must decode to 32 bytes, got {0}")]
    InvalidLength(usize),
    #[error("signature is not valid base58")]
    InvalidSignatureEncoding,
    #[error("signature must decode to 64 bytes, got {0}")]
    InvalidSignatureLength(usize),
    #[error("wallet address is not an ed25519 public key")]
    NotAPublicKey,
    #[error("signature does not match wallet")]
    SignatureMismatch,
}

/// A syntactically valid chain address.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct WalletAddress {
    encoded: String,
    bytes: [u8; ADDRESS_LEN],
}

impl WalletAddress {
    pub fn as_str(&self) -> &str {
        &self.encoded
    }

    pub fn to_bytes(&self) -> [u8; ADDRESS_LEN] {
        self.bytes
    }

    pub fn from_bytes(bytes: [u8; ADDRESS_LEN]) -> Self {
        Self {
            encoded: bs58::encode(bytes).into_string(),
            bytes,
        }
    }

    /// Checks a base58 ed25519 signature over `message` made by this wallet's key.
    pub fn verify_signature(&self, message: &[u8], signature: &str) -> Result<(), WalletError> {
        let raw = bs58::decode(signature.trim())
            .into_vec()
            .map_err(|_| WalletError::InvalidSignatureEncoding)?;
        let raw: [u8; SIGNATURE_LEN] = raw
            .as_slice()
            .try_into()
            .map_err(|_| WalletError::InvalidSignatureLength(raw.len()))?;

        let key = VerifyingKey::from_bytes(&self.bytes).map_err(|_| WalletError::NotAPublicKey)?;
        key.verify(message, &Signature::from_bytes(&raw))
            .map_err(|_| WalletError::SignatureMismatch)
    }
}

impl FromStr for WalletAddress {
    type Err = WalletError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let raw = bs58::decode(s)
            .into_vec()
            .map_err(|_| WalletError::InvalidEncoding)?;
        let bytes: [u8; ADDRESS_LEN] = raw
            .as_slice()
            .try_into()
            .map_err(|_| WalletError::InvalidLength(raw.len()))?;

        Ok(Self {
            encoded: s.to_string(),
            bytes,
        })
    }
}

impl TryFrom<String> for WalletAddress {
    type Error = WalletError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<WalletAddress> for String {
    fn from(value: WalletAddress) -> Self {
        value.encoded
    }
}

impl utoipa::PartialSchema for WalletAddress {
    fn schema() -> RefOr<Schema> {
        RefOr::T(Schema::Object(
            ObjectBuilder::new()
                .schema_type(Type::String)
                .description(Some("Base58 encoded 32-byte wallet address"))
                .build(),
        ))
    }
}

impl utoipa::ToSchema for WalletAddress {}

impl fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encoded)
    }
}

impl fmt::Debug for WalletAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "WalletAddress({})", self.encoded)
    }
}
