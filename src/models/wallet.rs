//! Wallet account data resolved from the identity platform.

use serde::{Deserialize, Serialize};

/// A blockchain wallet linked to an identity-platform user.
///
/// Created once via the identity platform, read many times by the UI. The
/// public key is recovered either from platform metadata or cryptographically
/// from a signature; it may legitimately be absent.
#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WalletAccount {
    /// On-chain address string (`0x`-prefixed hex).
    pub address: String,

    /// Hex-encoded 32-byte Ed25519 public key, when the platform exposes it.
    pub public_key: Option<String>,

    /// Chain family reported by the platform (e.g. `sui`, `ethereum`).
    pub chain_type: Option<String>,
}
