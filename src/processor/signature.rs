use anyhow::{anyhow, bail, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

pub const TOLERANCE_SECONDS: i64 = 300;

/// Checks a `t=<unix>,v1=<hex>[,v1=<hex>]` webhook signature header.
///
/// Malformed headers are errors; a well-formed header whose signatures do not
/// match, or whose timestamp is outside the tolerance, yields `Ok(false)`.
pub fn verify_webhook_signature(
    secret: &str,
    payload: &[u8],
    header: &str,
    now_unix: i64,
) -> Result<bool> {
    let mut timestamp: Option<i64> = None;
    let mut signatures: Vec<Vec<u8>> = Vec::new();

    for part in header.split(',') {
        let Some((key, value)) = part.trim().split_once('=') else {
            bail!("malformed signature header");
        };
        match key {
            "t" => timestamp = Some(value.parse()?),
            "v1" => {
                if let Ok(sig) = hex::decode(value) {
                    signatures.push(sig);
                }
            }
            _ => {}
        }
    }

    let Some(timestamp) = timestamp else {
        bail!("signature header has no timestamp");
    };
    if signatures.is_empty() {
        bail!("signature header has no v1 signature");
    }
    if (now_unix - timestamp).abs() > TOLERANCE_SECONDS {
        return Ok(false);
    }

    let mut signed = format!("{timestamp}.").into_bytes();
    signed.extend_from_slice(payload);

    Ok(signatures.iter().any(|sig| {
        let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
            return false;
        };
        mac.update(&signed);
        mac.verify_slice(sig).is_ok()
    }))
}

/// Produces a header accepted by [`verify_webhook_signature`].
pub fn sign_payload(secret: &str, payload: &[u8], timestamp: i64) -> Result<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| anyhow!("invalid webhook secret"))?;
    mac.update(format!("{timestamp}.").as_bytes());
    mac.update(payload);
    Ok(format!("t={},v1={}", timestamp, hex::encode(mac.finalize().into_bytes())))
}
