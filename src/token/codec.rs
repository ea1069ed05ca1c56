//! HMAC-signed token encoding and verification.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::token::types::{TokenError, VerifiedToken};

type HmacSha256 = Hmac<Sha256>;

/// Separator between token fields.
const DELIMITER: char = ':';

/// Hex-encoded SHA-256 digest length.
const SIGNATURE_HEX_LEN: usize = 64;

/// Number of characters of a token that may appear in logs.
const LOG_PREFIX_LEN: usize = 12;

/// Issues and verifies unsubscribe tokens with a shared secret.
///
/// The issuing process (email sender) and the verifying process must be
/// constructed with the same secret.
#[derive(Clone)]
pub struct TokenCodec {
    secret: Vec<u8>,
}

impl std::fmt::Debug for TokenCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCodec")
            .field("secret", &"<redacted>")
            .finish()
    }
}

impl TokenCodec {
    /// Create a codec for the given signing secret.
    pub fn new(secret: impl Into<Vec<u8>>) -> Result<Self, TokenError> {
        let secret = secret.into();
        if secret.is_empty() {
            return Err(TokenError::EmptySecret);
        }
        Ok(Self { secret })
    }

    /// Issue a token that expires `ttl` from now.
    pub fn issue(&self, user_id: u64, email: &str, ttl: Duration) -> Result<String, TokenError> {
        self.issue_at(user_id, email, ttl, Utc::now())
    }

    /// Issue a token that expires `ttl` after `now`.
    ///
    /// A negative `ttl` yields a token that is already expired.
    pub fn issue_at(
        &self,
        user_id: u64,
        email: &str,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        if email.is_empty() || email.contains(DELIMITER) {
            return Err(TokenError::InvalidEmail(email.to_string()));
        }

        let expires_at = now.timestamp_millis().saturating_add(ttl.num_milliseconds());
        let payload = format!("{user_id}{DELIMITER}{email}{DELIMITER}{expires_at}");
        let signature = self.sign(&payload);

        Ok(URL_SAFE_NO_PAD.encode(format!("{payload}{DELIMITER}{signature}")))
    }

    /// Verify a token against the current time.
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token against `now`.
    ///
    /// The signature is checked before expiry, so a forged token always
    /// reports `BadSignature` and `Expired` is only returned for tokens this
    /// codec's secret actually signed.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<VerifiedToken, TokenError> {
        let decoded = URL_SAFE_NO_PAD
            .decode(token.trim())
            .map_err(|_| TokenError::Malformed)?;
        let decoded = String::from_utf8(decoded).map_err(|_| TokenError::Malformed)?;

        let fields: Vec<&str> = decoded.split(DELIMITER).collect();
        let [raw_user_id, email, raw_expires_at, signature] = fields.as_slice() else {
            return Err(TokenError::Malformed);
        };

        let user_id: u64 = raw_user_id.parse().map_err(|_| TokenError::Malformed)?;
        let expires_at: i64 = raw_expires_at.parse().map_err(|_| TokenError::Malformed)?;

        // Recompute over the fields exactly as received.
        let payload = format!("{raw_user_id}{DELIMITER}{email}{DELIMITER}{raw_expires_at}");
        if !self.signature_matches(&payload, signature) {
            return Err(TokenError::BadSignature);
        }

        if now.timestamp_millis() > expires_at {
            return Err(TokenError::Expired);
        }

        Ok(VerifiedToken {
            user_id,
            email: email.to_string(),
            expires_at,
        })
    }

    /// Build the link embedded in outbound emails.
    pub fn unsubscribe_url(base_url: &str, token: &str) -> String {
        format!(
            "{}/unsubscribe?token={}",
            base_url.trim_end_matches('/'),
            urlencoding::encode(token)
        )
    }

    fn mac(&self) -> HmacSha256 {
        HmacSha256::new_from_slice(&self.secret).expect("HMAC can take key of any size")
    }

    fn sign(&self, payload: &str) -> String {
        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    fn signature_matches(&self, payload: &str, supplied: &str) -> bool {
        // Only the canonical lowercase rendering is accepted.
        if supplied.len() != SIGNATURE_HEX_LEN
            || !supplied.bytes().all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
        {
            return false;
        }
        let Ok(supplied) = hex::decode(supplied) else {
            return false;
        };

        let mut mac = self.mac();
        mac.update(payload.as_bytes());
        mac.verify_slice(&supplied).is_ok()
    }
}

/// Leading characters of a token, safe to put in logs.
pub fn token_prefix(token: &str) -> &str {
    match token.char_indices().nth(LOG_PREFIX_LEN) {
        Some((idx, _)) => &token[..idx],
        None => token,
    }
}
