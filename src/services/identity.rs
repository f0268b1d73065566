//! Identity-platform adapter: resolves a user's linked wallet accounts and
//! the cryptographic public key backing them, and verifies addresses and
//! personal-message signatures against that key.
//!
//! The platform reports the wallet *address* reliably but exposes the actual
//! Ed25519 public key under varying field names depending on wallet type.
//! That probing lives in one normalized accessor here with a fixed fallback
//! order; callers never touch raw account JSON.

use crate::models::wallet::WalletAccount;
use blake2::{Blake2b, Digest, digest::consts::U32};
use ed25519_dalek::{Signature, VerifyingKey};
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

type Blake2b256 = Blake2b<U32>;

const APP_ID_HEADER: &str = "privy-app-id";

/// Signature scheme flag prepended to the public key for address derivation.
const ED25519_SCHEME_FLAG: u8 = 0x00;

/// Intent prefix for personal-message signing (scope, version, app id).
const PERSONAL_MESSAGE_INTENT: [u8; 3] = [3, 0, 0];

/// Account fields probed for the cryptographic public key, in order.
const PUBLIC_KEY_FIELDS: [&str; 5] = [
    "public_key",
    "publicKey",
    "embedded_wallet_public_key",
    "key_data",
    "public_key_hex",
];

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("identity platform request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("identity platform returned {status}: {body}")]
    Upstream { status: u16, body: String },
    #[error("invalid public key: {0}")]
    InvalidKey(String),
    #[error("invalid signature: {0}")]
    InvalidSignature(String),
}

/// One linked account from the identity platform's user record.
///
/// Only the fields the system interprets are typed; everything else stays in
/// `extra` for the public-key probe.
#[derive(Deserialize, Clone, Debug)]
pub struct LinkedAccount {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub address: Option<String>,
    pub chain_type: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

impl LinkedAccount {
    pub fn is_wallet(&self) -> bool {
        self.kind.as_deref() == Some("wallet")
    }

    /// Normalized public-key accessor.
    ///
    /// Probes the documented fallback order and returns the first non-empty
    /// string value. `None` means the platform did not expose the key for
    /// this wallet type.
    pub fn public_key(&self) -> Option<&str> {
        PUBLIC_KEY_FIELDS.iter().find_map(|field| {
            self.extra
                .get(*field)
                .and_then(Value::as_str)
                .filter(|s| !s.is_empty())
        })
    }

    /// Field names present on this account, for diagnostics when no key is
    /// exposed.
    pub fn field_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.extra.keys().cloned().collect();
        for (present, name) in [
            (self.kind.is_some(), "type"),
            (self.address.is_some(), "address"),
            (self.chain_type.is_some(), "chain_type"),
        ] {
            if present {
                names.push(name.to_string());
            }
        }
        names.sort();
        names
    }
}

#[derive(Deserialize, Clone, Debug, Default)]
pub struct IdentityUser {
    #[serde(default)]
    pub linked_accounts: Vec<LinkedAccount>,
}

impl IdentityUser {
    pub fn wallets(&self) -> impl Iterator<Item = &LinkedAccount> {
        self.linked_accounts.iter().filter(|a| a.is_wallet())
    }

    /// Pick the wallet matching `address` (case-insensitive), or the first
    /// linked wallet when no address is given.
    pub fn resolve_wallet(&self, address: Option<&str>) -> Option<&LinkedAccount> {
        match address {
            Some(wanted) => self.wallets().find(|w| {
                w.address
                    .as_deref()
                    .is_some_and(|a| a.eq_ignore_ascii_case(wanted))
            }),
            None => self.wallets().next(),
        }
    }
}

/// HTTP client for the hosted identity platform's user API.
#[derive(Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    base_url: String,
    app_id: String,
    app_secret: String,
}

impl IdentityClient {
    pub fn new(base_url: impl Into<String>, app_id: impl Into<String>, app_secret: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            app_id: app_id.into(),
            app_secret: app_secret.into(),
        }
    }

    /// Fetch the user record for a DID, basic-authenticated with the
    /// application credentials.
    pub async fn fetch_user(&self, user_did: &str) -> Result<IdentityUser, IdentityError> {
        let url = format!("{}/api/v1/users/{user_did}", self.base_url);
        let response = self
            .http
            .get(&url)
            .basic_auth(&self.app_id, Some(&self.app_secret))
            .header(APP_ID_HEADER, &self.app_id)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(IdentityError::Upstream {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

/// Build the exposed wallet-account view for a resolved linked account.
pub fn wallet_account(account: &LinkedAccount) -> WalletAccount {
    WalletAccount {
        address: account.address.clone().unwrap_or_default(),
        public_key: account.public_key().map(str::to_string),
        chain_type: account.chain_type.clone(),
    }
}

/// Decode a hex public key (with or without `0x` prefix) into raw bytes.
pub fn decode_key_hex(key: &str) -> Result<Vec<u8>, IdentityError> {
    let stripped = key.strip_prefix("0x").unwrap_or(key);
    hex::decode(stripped).map_err(|err| IdentityError::InvalidKey(err.to_string()))
}

/// Derive the on-chain address from a 32-byte Ed25519 public key:
/// blake2b-256 over the scheme flag followed by the key bytes.
pub fn derive_address(public_key: &[u8]) -> Result<String, IdentityError> {
    if public_key.len() != 32 {
        return Err(IdentityError::InvalidKey(format!(
            "expected 32 bytes, got {}",
            public_key.len()
        )));
    }
    let mut hasher = Blake2b256::new();
    hasher.update([ED25519_SCHEME_FLAG]);
    hasher.update(public_key);
    Ok(format!("0x{}", hex::encode(hasher.finalize())))
}

/// Whether `address` is the one derived from `public_key`.
pub fn address_matches(address: &str, public_key: &[u8]) -> Result<bool, IdentityError> {
    let derived = derive_address(public_key)?;
    Ok(derived.eq_ignore_ascii_case(address))
}

/// Digest that gets signed for personal messages: blake2b-256 over the
/// intent prefix plus the raw message.
pub fn personal_message_digest(message: &[u8]) -> [u8; 32] {
    let mut hasher = Blake2b256::new();
    hasher.update(PERSONAL_MESSAGE_INTENT);
    hasher.update(message);
    hasher.finalize().into()
}

/// Verify an Ed25519 signature over a personal message.
pub fn verify_personal_message(
    public_key: &[u8],
    message: &[u8],
    signature: &[u8],
) -> Result<bool, IdentityError> {
    let key_bytes: [u8; 32] = public_key
        .try_into()
        .map_err(|_| IdentityError::InvalidKey("expected 32 bytes".into()))?;
    let verifying_key = VerifyingKey::from_bytes(&key_bytes)
        .map_err(|err| IdentityError::InvalidKey(err.to_string()))?;
    let signature = Signature::from_slice(signature)
        .map_err(|err| IdentityError::InvalidSignature(err.to_string()))?;

    let digest = personal_message_digest(message);
    Ok(verifying_key.verify_strict(&digest, &signature).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ed25519_dalek::{Signer, SigningKey};

    fn user_fixture() -> IdentityUser {
        serde_json::from_value(serde_json::json!({
            "linked_accounts": [
                { "type": "email", "address": "a@example.com" },
                {
                    "type": "wallet",
                    "address": "0xAbC123",
                    "chain_type": "sui",
                    "publicKey": "0011",
                    "public_key_hex": "ffff"
                },
                { "type": "wallet", "address": "0xdef456", "chain_type": "ethereum" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn public_key_probe_follows_fallback_order() {
        let user = user_fixture();
        let wallet = user.resolve_wallet(None).unwrap();
        // `publicKey` outranks `public_key_hex`
        assert_eq!(wallet.public_key(), Some("0011"));

        let bare = user.resolve_wallet(Some("0xDEF456")).unwrap();
        assert_eq!(bare.public_key(), None);
        assert!(bare.field_names().contains(&"address".to_string()));
    }

    #[test]
    fn resolve_wallet_matches_address_case_insensitively() {
        let user = user_fixture();
        let wallet = user.resolve_wallet(Some("0xabc123")).unwrap();
        assert_eq!(wallet.chain_type.as_deref(), Some("sui"));
        assert!(user.resolve_wallet(Some("0x999")).is_none());
    }

    #[test]
    fn non_wallet_accounts_are_ignored() {
        let user = user_fixture();
        assert_eq!(user.wallets().count(), 2);
    }

    #[test]
    fn derived_address_is_stable_and_key_dependent() {
        let key_a = [7u8; 32];
        let key_b = [8u8; 32];
        let addr = derive_address(&key_a).unwrap();
        assert!(addr.starts_with("0x"));
        assert_eq!(addr.len(), 2 + 64);
        assert_eq!(addr, derive_address(&key_a).unwrap());
        assert_ne!(addr, derive_address(&key_b).unwrap());
        assert!(address_matches(&addr.to_uppercase(), &key_a).unwrap());

        assert!(matches!(
            derive_address(&[1u8; 16]),
            Err(IdentityError::InvalidKey(_))
        ));
    }

    #[test]
    fn personal_message_signature_round_trip() {
        let signing_key = SigningKey::from_bytes(&[42u8; 32]);
        let public_key = signing_key.verifying_key().to_bytes();
        let message = b"authorize vault upload";

        let digest = personal_message_digest(message);
        let signature = signing_key.sign(&digest);

        assert!(verify_personal_message(&public_key, message, &signature.to_bytes()).unwrap());
        assert!(!verify_personal_message(&public_key, b"other message", &signature.to_bytes())
            .unwrap());
    }

    #[test]
    fn decode_key_hex_accepts_prefixed_and_bare() {
        assert_eq!(decode_key_hex("0x0a0b").unwrap(), vec![0x0a, 0x0b]);
        assert_eq!(decode_key_hex("0a0b").unwrap(), vec![0x0a, 0x0b]);
        assert!(decode_key_hex("zz").is_err());
    }
}
