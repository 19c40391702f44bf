use base64::{Engine, engine::general_purpose::STANDARD};
use ring::hmac::{HMAC_SHA256, Key, sign, verify as verify_tag};

pub const HEADER: &str = "x-line-signature";

/// base64(HMAC-SHA256(channel_secret, body))
pub fn sign_body(channel_secret: &str, body: &[u8]) -> String {
    let key = Key::new(HMAC_SHA256, channel_secret.as_bytes());
    STANDARD.encode(sign(&key, body).as_ref())
}

/// Constant-time check of the `X-Line-Signature` header against the raw body.
pub fn verify(channel_secret: &str, body: &[u8], signature: &str) -> bool {
    let Ok(tag) = STANDARD.decode(signature.trim()) else {
        return false;
    };
    let key = Key::new(HMAC_SHA256, channel_secret.as_bytes());
    verify_tag(&key, body, &tag).is_ok()
}
