//! JWT decoding for the API's session tokens.
//!
//! Tokens are compact JWS (`header.payload.signature`, base64url without
//! padding). When a shared secret is configured the HS256 signature is
//! verified; otherwise the claims are trusted for routing only and the API
//! stays the authority on every call that carries the token.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use serde_json::Value;
use sha2::Sha256;
use thiserror::Error;

use rimline_core::Role;

type HmacSha256 = Hmac<Sha256>;

/// Errors decoding a token.
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("token is not a compact JWS")]
    Malformed,
    #[error("invalid base64: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unsupported algorithm {0}")]
    UnsupportedAlgorithm(String),
    #[error("signature mismatch")]
    BadSignature,
    #[error("token has no user id")]
    MissingSubject,
    #[error("token expired")]
    Expired,
}

#[derive(Deserialize)]
struct Header {
    alg: String,
}

#[derive(Deserialize)]
struct RawClaims {
    #[serde(default)]
    id: Option<Value>,
    #[serde(default)]
    sub: Option<Value>,
    #[serde(default, rename = "_id")]
    object_id: Option<Value>,
    #[serde(default)]
    role: Role,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    exp: Option<i64>,
}

/// Claims the storefront relies on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claims {
    pub user_id: String,
    pub role: Role,
    pub email: Option<String>,
    pub name: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Decode a token, verifying its signature when `secret` is set.
///
/// # Errors
///
/// Returns an error for malformed tokens, signature mismatches, tokens
/// without a user id, and tokens whose `exp` is at or before `now`.
pub fn decode(token: &str, secret: Option<&[u8]>, now: DateTime<Utc>) -> Result<Claims, JwtError> {
    let mut parts = token.split('.');
    let (Some(header), Some(payload), Some(signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(JwtError::Malformed);
    };

    if let Some(secret) = secret {
        let header: Header = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(header)?)?;
        if header.alg != "HS256" {
            return Err(JwtError::UnsupportedAlgorithm(header.alg));
        }
        let signature = URL_SAFE_NO_PAD.decode(signature)?;
        let mut mac = HmacSha256::new_from_slice(secret).map_err(|_| JwtError::BadSignature)?;
        let (signing_input, _) = token.rsplit_once('.').ok_or(JwtError::Malformed)?;
        mac.update(signing_input.as_bytes());
        mac.verify_slice(&signature)
            .map_err(|_| JwtError::BadSignature)?;
    }

    let raw: RawClaims = serde_json::from_slice(&URL_SAFE_NO_PAD.decode(payload)?)?;
    let user_id = [&raw.id, &raw.sub, &raw.object_id]
        .into_iter()
        .find_map(|v| v.as_ref().and_then(id_text))
        .ok_or(JwtError::MissingSubject)?;

    let expires_at = raw.exp.and_then(|exp| DateTime::from_timestamp(exp, 0));
    if expires_at.is_some_and(|exp| exp <= now) {
        return Err(JwtError::Expired);
    }

    Ok(Claims {
        user_id,
        role: raw.role,
        email: raw.email,
        name: raw.name,
        expires_at,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
pub(crate) mod tests {
    use chrono::Duration;
    use serde_json::json;

    use super::*;

    /// Mint an HS256 token for tests.
    pub(crate) fn sign(claims: &Value, secret: &[u8]) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
        let input = format!("{header}.{payload}");
        let mut mac = HmacSha256::new_from_slice(secret).unwrap();
        mac.update(input.as_bytes());
        let signature = URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes());
        format!("{input}.{signature}")
    }

    const SECRET: &[u8] = b"k7#Qp2!vZ9@wL4$mR8^tY1&cX6*bN3%h";

    #[test]
    fn test_decode_verified_token() {
        let now = Utc::now();
        let token = sign(
            &json!({"id": "u1", "role": "admin", "name": "Dana", "exp": (now + Duration::hours(1)).timestamp()}),
            SECRET,
        );
        let claims = decode(&token, Some(SECRET), now).unwrap();
        assert_eq!(claims.user_id, "u1");
        assert_eq!(claims.role, Role::Admin);
        assert_eq!(claims.name.as_deref(), Some("Dana"));
    }

    #[test]
    fn test_rejects_wrong_secret() {
        let token = sign(&json!({"id": "u1", "role": "admin"}), b"another-secret-value");
        assert!(matches!(
            decode(&token, Some(SECRET), Utc::now()),
            Err(JwtError::BadSignature)
        ));
        // Without a configured secret the claims are still readable
        assert_eq!(decode(&token, None, Utc::now()).unwrap().role, Role::Admin);
    }

    #[test]
    fn test_tampered_payload_fails_verification() {
        let token = sign(&json!({"id": "u1", "role": "user"}), SECRET);
        let mut parts: Vec<&str> = token.split('.').collect();
        let forged = URL_SAFE_NO_PAD.encode(json!({"id": "u1", "role": "admin"}).to_string());
        parts[1] = &forged;
        assert!(matches!(
            decode(&parts.join("."), Some(SECRET), Utc::now()),
            Err(JwtError::BadSignature)
        ));
    }

    #[test]
    fn test_expired_token() {
        let now = Utc::now();
        let token = sign(&json!({"sub": 42, "exp": now.timestamp()}), SECRET);
        assert!(matches!(decode(&token, Some(SECRET), now), Err(JwtError::Expired)));
    }

    #[test]
    fn test_subject_fallbacks_and_unknown_role() {
        let token = sign(&json!({"_id": "abc", "role": "superuser"}), SECRET);
        let claims = decode(&token, None, Utc::now()).unwrap();
        assert_eq!(claims.user_id, "abc");
        assert_eq!(claims.role, Role::User);

        let token = sign(&json!({"role": "admin"}), SECRET);
        assert!(matches!(decode(&token, None, Utc::now()), Err(JwtError::MissingSubject)));
    }

    #[test]
    fn test_malformed() {
        assert!(matches!(decode("abc.def", None, Utc::now()), Err(JwtError::Malformed)));
        assert!(matches!(decode("a.b.c.d", None, Utc::now()), Err(JwtError::Malformed)));
        assert!(decode("!!!.###.$$$", None, Utc::now()).is_err());
    }
}
