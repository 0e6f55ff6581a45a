use hmac::{Hmac, Mac};
use sha2::Sha256;
use thiserror::Error;

type HmacSha256 = Hmac<Sha256>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SignatureError {
    #[error("signature header missing")]
    Missing,
    #[error("signature header malformed")]
    Malformed,
    #[error("signature does not match payload")]
    Mismatch,
    #[error("signature timestamp outside tolerance")]
    Expired,
}

fn mac_for(secret: &[u8]) -> HmacSha256 {
    HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length")
}

/// Hex-encoded HMAC-SHA256 over the given parts, in order.
pub fn compute_hmac_hex(secret: &[u8], parts: &[&[u8]]) -> String {
    let mut mac = mac_for(secret);
    for part in parts {
        mac.update(part);
    }
    hex::encode(mac.finalize().into_bytes())
}

/// Constant-time check of a hex signature against the exact bytes received.
pub fn verify_hmac_hex(secret: &[u8], parts: &[&[u8]], signature: &str) -> Result<(), SignatureError> {
    let expected = hex::decode(signature.trim()).map_err(|_| SignatureError::Malformed)?;
    let mut mac = mac_for(secret);
    for part in parts {
        mac.update(part);
    }
    mac.verify_slice(&expected).map_err(|_| SignatureError::Mismatch)
}
