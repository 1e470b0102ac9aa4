use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::Rng;
use sha2::Sha256;
use tracing::debug;

use crate::errors::ServiceError;

// Type alias for HMAC-SHA256
type HmacSha256 = Hmac<Sha256>;

/// Replay window for inbound webhook timestamps, in seconds. A payload
/// whose signature timestamp falls outside this window is rejected even
/// if the signature itself checks out.
pub const REPLAY_WINDOW_SECS: i64 = 300;

/// Request signing for outbound conferencing-provider API calls
pub struct ProviderAuth;

impl ProviderAuth {
    /// Generate a random nonce for API requests
    pub fn generate_nonce() -> String {
        rand::thread_rng().gen_range(10000000..99999999).to_string()
    }

    /// Get current timestamp for API requests
    pub fn get_timestamp() -> i64 {
        Utc::now().timestamp()
    }

    /// Generate signature for provider API requests
    pub fn generate_signature(
        api_key: &str,
        api_secret: &str,
        method: &str,
        uri: &str,
        timestamp: i64,
        nonce: &str,
        body: &str,
    ) -> String {
        let header_string = format!(
            "X-Provider-Key={}&X-Provider-Nonce={}&X-Provider-Timestamp={}",
            api_key, nonce, timestamp
        );

        let content = format!("{}\n{}\n{}\n{}", method, header_string, uri, body);

        debug!("String to sign: {}", content);

        let mut mac = HmacSha256::new_from_slice(api_secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(content.as_bytes());

        hex::encode(mac.finalize().into_bytes())
    }
}

/// Verification of inbound webhook deliveries from the provider
pub struct WebhookAuth;

impl WebhookAuth {
    /// Compute the expected signature for a webhook body, in the
    /// provider's `v0={hex}` convention over `v0:{timestamp}:{body}`
    pub fn signature(secret: &str, timestamp: i64, body: &str) -> String {
        let content = format!("v0:{}:{}", timestamp, body);

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(content.as_bytes());

        format!("v0={}", hex::encode(mac.finalize().into_bytes()))
    }

    /// Verify a delivery before any event interpretation happens.
    /// Rejects timestamps outside the replay window and signature
    /// mismatches; a rejected payload must cause no state change.
    pub fn verify(
        secret: &str,
        timestamp: i64,
        body: &str,
        provided: &str,
    ) -> Result<(), ServiceError> {
        let now = Utc::now().timestamp();
        if (now - timestamp).abs() > REPLAY_WINDOW_SECS {
            return Err(ServiceError::Unauthorized(format!(
                "webhook timestamp {} outside replay window",
                timestamp
            )));
        }

        let expected = Self::signature(secret, timestamp, body);
        if !constant_time_eq(expected.as_bytes(), provided.as_bytes()) {
            return Err(ServiceError::Unauthorized(
                "webhook signature mismatch".to_string(),
            ));
        }

        Ok(())
    }

    /// Token transform for the endpoint.url_validation handshake
    pub fn validation_token(secret: &str, plain_token: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(plain_token.as_bytes());

        hex::encode(mac.finalize().into_bytes())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_nonce() {
        let nonce = ProviderAuth::generate_nonce();
        assert!(nonce.len() == 8);
        assert!(nonce.parse::<u64>().is_ok());
    }

    #[test]
    fn test_generate_signature() {
        let signature = ProviderAuth::generate_signature(
            "test_api_key",
            "test_api_secret",
            "POST",
            "/v1/meetings",
            1677721600,
            "12345678",
            "{}",
        );

        assert!(!signature.is_empty());
        assert!(hex::decode(&signature).is_ok());
    }

    #[test]
    fn test_webhook_signature_roundtrip() {
        let timestamp = Utc::now().timestamp();
        let body = r#"{"event":"meeting.started"}"#;

        let signature = WebhookAuth::signature("secret", timestamp, body);
        assert!(signature.starts_with("v0="));
        assert!(WebhookAuth::verify("secret", timestamp, body, &signature).is_ok());
    }

    #[test]
    fn test_webhook_signature_mismatch() {
        let timestamp = Utc::now().timestamp();
        let signature = WebhookAuth::signature("secret", timestamp, "body");

        let result = WebhookAuth::verify("other_secret", timestamp, "body", &signature);
        assert!(matches!(result, Err(ServiceError::Unauthorized(_))));
    }

    #[test]
    fn test_webhook_replay_window() {
        let stale = Utc::now().timestamp() - REPLAY_WINDOW_SECS - 10;
        let signature = WebhookAuth::signature("secret", stale, "body");

        let result = WebhookAuth::verify("secret", stale, "body", &signature);
        assert!(matches!(result, Err(ServiceError::Unauthorized(_))));
    }

    #[test]
    fn test_validation_token_deterministic() {
        let first = WebhookAuth::validation_token("secret", "plain");
        let second = WebhookAuth::validation_token("secret", "plain");
        assert_eq!(first, second);
        assert_ne!(first, WebhookAuth::validation_token("secret", "other"));
    }
}
