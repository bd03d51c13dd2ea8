/// Anti-forgery (CSRF) secrets and tokens
///
/// Each client holds a random secret in a cookie. Tokens handed to pages and
/// API clients are derived from that secret with a fresh salt:
///
/// ```text
/// token = salt "-" hex(HMAC-SHA256(key = secret, msg = salt))
/// ```
///
/// A token verifies only against the secret it was minted from, and many
/// distinct tokens can be minted from one secret.

use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Secret length in random bytes
const SECRET_BYTES: usize = 18;

/// Salt length in random bytes
const SALT_BYTES: usize = 8;

/// Generates a new per-client secret (hex encoded)
pub fn generate_secret() -> String {
    let mut bytes = [0u8; SECRET_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Mints a token bound to `secret`
pub fn create_token(secret: &str) -> String {
    let mut salt = [0u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut salt);
    let salt = hex::encode(salt);

    format!("{}-{}", salt, hex::encode(sign(secret, &salt)))
}

/// Checks that `token` was minted from `secret`
///
/// Comparison of the signature is constant-time.
pub fn verify_token(secret: &str, token: &str) -> bool {
    let Some((salt, signature)) = token.split_once('-') else {
        return false;
    };

    if salt.is_empty() {
        return false;
    }

    let Ok(signature) = hex::decode(signature) else {
        return false;
    };

    let mut mac = mac_for(secret);
    mac.update(salt.as_bytes());
    mac.verify_slice(&signature).is_ok()
}

fn sign(secret: &str, salt: &str) -> Vec<u8> {
    let mut mac = mac_for(secret);
    mac.update(salt.as_bytes());
    mac.finalize().into_bytes().to_vec()
}

fn mac_for(secret: &str) -> HmacSha256 {
    // HMAC accepts keys of any length
    HmacSha256::new_from_slice(secret.as_bytes()).expect("HMAC can take key of any size")
}
