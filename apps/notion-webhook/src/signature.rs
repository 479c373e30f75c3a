use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

pub const SIGNATURE_PREFIX: &str = "sha256=";

/// `sha256=<lower-hex HMAC-SHA256(secret, body)>`, or `None` if the MAC cannot be keyed.
pub fn sign(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(body);
    Some(format!(
        "{SIGNATURE_PREFIX}{}",
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Checks a Notion signature header against the raw request body.
pub fn verify_signature(secret: &str, body: &[u8], header: Option<&str>) -> bool {
    let provided = header.map(str::trim).unwrap_or("");
    if secret.is_empty() || provided.is_empty() {
        return false;
    }
    match sign(secret, body) {
        Some(expected) => expected.as_bytes().ct_eq(provided.as_bytes()).into(),
        None => false,
    }
}
