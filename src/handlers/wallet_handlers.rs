//! HTTP handler resolving a user's wallet public key via the identity
//! platform.

use crate::{
    errors::AppError,
    services::identity::{address_matches, decode_key_hex, wallet_account},
    state::AppState,
};
use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
pub struct WalletKeyRequest {
    pub user_did: Option<String>,
    pub wallet_address: Option<String>,
}

/// `POST /api/wallet/public-key`
///
/// Looks up the user's linked wallets, picks the requested one (or the
/// first), and returns the normalized cryptographic public key together with
/// whether the on-chain address derives from it. When the platform exposes
/// no key for the wallet, responds 404 with the account's available fields
/// so the caller can see what was actually returned.
pub async fn wallet_public_key(
    State(state): State<AppState>,
    Json(request): Json<WalletKeyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let user_did = request
        .user_did
        .as_deref()
        .map(str::trim)
        .filter(|did| !did.is_empty())
        .ok_or_else(|| AppError::bad_request("`userDid` is required"))?;

    let user = state.identity.fetch_user(user_did).await?;

    let Some(wallet) = user.resolve_wallet(request.wallet_address.as_deref()) else {
        let available: Vec<_> = user
            .wallets()
            .map(|w| json!({ "address": w.address, "chainType": w.chain_type }))
            .collect();
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "Wallet not found in user accounts",
                "availableWallets": available,
            })),
        ));
    };

    let account = wallet_account(wallet);
    let Some(public_key) = account.public_key.clone() else {
        return Ok((
            StatusCode::NOT_FOUND,
            Json(json!({
                "error": "Cryptographic public key not found in wallet data",
                "walletAddress": account.address,
                "availableFields": wallet.field_names(),
            })),
        ));
    };

    // Derivation check is best-effort: a key that does not decode to 32
    // bytes simply reports unverified rather than failing the lookup.
    let address_verified = decode_key_hex(&public_key)
        .ok()
        .and_then(|bytes| address_matches(&account.address, &bytes).ok())
        .unwrap_or(false);
    debug!(address = %account.address, address_verified, "resolved wallet public key");

    Ok((
        StatusCode::OK,
        Json(json!({
            "publicKey": public_key,
            "walletAddress": account.address,
            "chainType": account.chain_type,
            "addressVerified": address_verified,
        })),
    ))
}
