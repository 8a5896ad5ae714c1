//! Request signing and callback verification for the VNPay gateway.
//!
//! Both directions sign the same canonical string: parameters with empty
//! values dropped, ordered by raw key, each key and value form-URL-encoded and
//! joined as `key=value` pairs with `&`. The signature is HMAC-SHA512 keyed by
//! the trimmed shared secret, hex-encoded in lowercase.

use crate::error::{Result, SettlementError};
use hmac::{Hmac, Mac};
use sha2::Sha512;
use std::collections::BTreeMap;

type HmacSha512 = Hmac<Sha512>;

pub const SECURE_HASH: &str = "vnp_SecureHash";
pub const SECURE_HASH_TYPE: &str = "vnp_SecureHashType";

fn encode(raw: &str) -> String {
    form_urlencoded::byte_serialize(raw.as_bytes()).collect()
}

/// The exact string that is signed and transmitted.
pub fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .filter(|(key, value)| {
            !value.is_empty() && key.as_str() != SECURE_HASH && key.as_str() != SECURE_HASH_TYPE
        })
        .map(|(key, value)| format!("{}={}", encode(key), encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

fn mac(secret: &str) -> Option<HmacSha512> {
    let key = secret.trim();
    if key.is_empty() {
        return None;
    }
    HmacSha512::new_from_slice(key.as_bytes()).ok()
}

/// Lowercase hex HMAC-SHA512 of `message`.
pub fn sign(secret: &str, message: &str) -> Result<String> {
    let mut mac =
        mac(secret).ok_or_else(|| SettlementError::Config("gateway secret is blank".into()))?;
    mac.update(message.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// Builds the signed payment URL the customer is redirected to.
pub fn build_signed_url(
    base_url: &str,
    secret: &str,
    params: &BTreeMap<String, String>,
) -> Result<String> {
    let query = canonical_query(params);
    let signature = sign(secret, &query)?;
    let separator = if base_url.contains('?') { '&' } else { '?' };
    if query.is_empty() {
        Ok(format!("{base_url}{separator}{SECURE_HASH}={signature}"))
    } else {
        Ok(format!("{base_url}{separator}{query}&{SECURE_HASH}={signature}"))
    }
}

/// Checks the signature of a gateway callback.
///
/// Fails closed: a missing, blank or malformed hash, or a blank secret,
/// is never valid. The comparison runs in constant time and ignores hex case.
pub fn validate_callback(params: &BTreeMap<String, String>, secret: &str) -> bool {
    let Some(supplied) = params.get(SECURE_HASH).map(|h| h.trim()) else {
        return false;
    };
    if supplied.is_empty() {
        return false;
    }
    let Ok(expected) = hex::decode(supplied) else {
        return false;
    };
    let Some(mut mac) = mac(secret) else {
        return false;
    };
    mac.update(canonical_query(params).as_bytes());
    mac.verify_slice(&expected).is_ok()
}

/// Decodes a callback query string, or a full URL carrying one.
///
/// When a key repeats, the last value wins.
pub fn parse_query(input: &str) -> BTreeMap<String, String> {
    let query = match input.split_once('?') {
        Some((_, query)) => query,
        None => input,
    };
    form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}
