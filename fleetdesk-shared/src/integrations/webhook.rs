/// Identity-provider lifecycle webhooks
///
/// The identity provider reports account changes (`user.created`,
/// `user.updated`, `user.deleted`) by POSTing signed JSON to
/// `/api/webhooks/identity`. Each delivery carries three headers:
///
/// - `webhook-id`: unique message ID
/// - `webhook-timestamp`: Unix seconds when the message was signed
/// - `webhook-signature`: space-separated `v1,<base64 signature>` entries
///
/// The signature is `base64(HMAC-SHA256(key, "{id}.{timestamp}.{body}"))`. The
/// key is the configured secret; a `whsec_` prefix marks a base64-encoded key.
/// Messages signed more than five minutes before or after "now" are rejected.
///
/// # Example
///
/// ```
/// use fleetdesk_shared::integrations::webhook::WebhookVerifier;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let verifier = WebhookVerifier::new("whsec_c2VjcmV0LWtleS1mb3ItdGVzdHM=")?;
/// let body = br#"{"type":"user.deleted","data":{"id":"user_123"}}"#;
///
/// let signature = verifier.sign("msg_1", 1_700_000_000, body);
/// verifier.verify_parts("msg_1", "1700000000", &format!("v1,{}", signature), body, 1_700_000_060)?;
/// # Ok(())
/// # }
/// ```

use axum::http::HeaderMap;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use hmac::{Hmac, Mac};
use serde::Deserialize;
use sha2::Sha256;

use crate::models::user::Role;

type HmacSha256 = Hmac<Sha256>;

pub const HEADER_ID: &str = "webhook-id";
pub const HEADER_TIMESTAMP: &str = "webhook-timestamp";
pub const HEADER_SIGNATURE: &str = "webhook-signature";

/// Accepted clock difference between signer and receiver, in seconds
pub const TIMESTAMP_TOLERANCE_SECONDS: i64 = 5 * 60;

const SECRET_PREFIX: &str = "whsec_";

/// Error type for webhook verification and parsing
#[derive(Debug, thiserror::Error)]
pub enum WebhookError {
    #[error("Webhook secret is not valid base64")]
    InvalidSecret,

    #[error("Missing {0} header")]
    MissingHeader(&'static str),

    #[error("Invalid webhook timestamp")]
    InvalidTimestamp,

    #[error("Webhook timestamp is outside the accepted window")]
    TimestampOutOfTolerance,

    #[error("No matching webhook signature")]
    InvalidSignature,

    #[error("Invalid webhook payload: {0}")]
    InvalidPayload(#[from] serde_json::Error),
}

/// Verifies signed webhook deliveries
#[derive(Clone)]
pub struct WebhookVerifier {
    key: Vec<u8>,
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier").finish_non_exhaustive()
    }
}

impl WebhookVerifier {
    /// Creates a verifier from the configured secret
    pub fn new(secret: &str) -> Result<Self, WebhookError> {
        let key = match secret.strip_prefix(SECRET_PREFIX) {
            Some(encoded) => BASE64
                .decode(encoded)
                .map_err(|_| WebhookError::InvalidSecret)?,
            None => secret.as_bytes().to_vec(),
        };

        Ok(Self { key })
    }

    fn mac(&self, id: &str, timestamp: i64, body: &[u8]) -> HmacSha256 {
        let mut mac =
            HmacSha256::new_from_slice(&self.key).expect("HMAC can take key of any size");
        mac.update(format!("{}.{}.", id, timestamp).as_bytes());
        mac.update(body);
        mac
    }

    /// Base64 signature of a message, as the identity provider computes it
    pub fn sign(&self, id: &str, timestamp: i64, body: &[u8]) -> String {
        BASE64.encode(self.mac(id, timestamp, body).finalize().into_bytes())
    }

    /// Verifies a delivery from its request headers
    pub fn verify(&self, headers: &HeaderMap, body: &[u8], now: i64) -> Result<(), WebhookError> {
        let header = |name: &'static str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .ok_or(WebhookError::MissingHeader(name))
        };

        self.verify_parts(
            header(HEADER_ID)?,
            header(HEADER_TIMESTAMP)?,
            header(HEADER_SIGNATURE)?,
            body,
            now,
        )
    }

    /// Verifies a delivery from its individual parts
    pub fn verify_parts(
        &self,
        id: &str,
        timestamp: &str,
        signatures: &str,
        body: &[u8],
        now: i64,
    ) -> Result<(), WebhookError> {
        let timestamp: i64 = timestamp
            .trim()
            .parse()
            .map_err(|_| WebhookError::InvalidTimestamp)?;

        if now.abs_diff(timestamp) > TIMESTAMP_TOLERANCE_SECONDS.unsigned_abs() {
            return Err(WebhookError::TimestampOutOfTolerance);
        }

        let candidates = signatures
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == "v1")
            .filter_map(|(_, signature)| BASE64.decode(signature).ok());

        for candidate in candidates {
            // verify_slice compares in constant time
            if self.mac(id, timestamp, body).verify_slice(&candidate).is_ok() {
                return Ok(());
            }
        }

        Err(WebhookError::InvalidSignature)
    }
}

/// Account data carried by created/updated events
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdentityUser {
    /// Identity-provider user ID
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,

    /// Role stored in the provider's metadata, if any
    pub role: Option<Role>,
}

/// Account data carried by delete events
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DeletedIdentityUser {
    pub id: String,
}

/// A parsed lifecycle event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IdentityEvent {
    UserCreated(IdentityUser),
    UserUpdated(IdentityUser),
    UserDeleted(DeletedIdentityUser),

    /// Event types FleetDesk does not act on
    Ignored(String),
}

#[derive(Deserialize)]
struct RawEvent {
    #[serde(rename = "type")]
    event_type: String,
    data: serde_json::Value,
}

impl IdentityEvent {
    /// Parses a verified request body
    pub fn parse(body: &[u8]) -> Result<Self, WebhookError> {
        let raw: RawEvent = serde_json::from_slice(body)?;

        let event = match raw.event_type.as_str() {
            "user.created" => IdentityEvent::UserCreated(serde_json::from_value(raw.data)?),
            "user.updated" => IdentityEvent::UserUpdated(serde_json::from_value(raw.data)?),
            "user.deleted" => IdentityEvent::UserDeleted(serde_json::from_value(raw.data)?),
            _ => IdentityEvent::Ignored(raw.event_type),
        };

        Ok(event)
    }

    pub fn event_type(&self) -> &str {
        match self {
            IdentityEvent::UserCreated(_) => "user.created",
            IdentityEvent::UserUpdated(_) => "user.updated",
            IdentityEvent::UserDeleted(_) => "user.deleted",
            IdentityEvent::Ignored(event_type) => event_type,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    const SECRET: &str = "whsec_c2VjcmV0LWtleS1mb3ItdGVzdHM=";
    const NOW: i64 = 1_700_000_000;
    const BODY: &[u8] =
        br#"{"type":"user.created","data":{"id":"user_1","email":"a@example.com","name":"Ana","role":"driver"}}"#;

    fn verifier() -> WebhookVerifier {
        WebhookVerifier::new(SECRET).unwrap()
    }

    fn headers(id: &str, timestamp: i64, signature: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HEADER_ID, HeaderValue::from_str(id).unwrap());
        headers.insert(
            HEADER_TIMESTAMP,
            HeaderValue::from_str(&timestamp.to_string()).unwrap(),
        );
        headers.insert(HEADER_SIGNATURE, HeaderValue::from_str(signature).unwrap());
        headers
    }

    #[test]
    fn test_secret_prefix_is_base64_decoded() {
        let prefixed = WebhookVerifier::new(SECRET).unwrap();
        let raw = WebhookVerifier::new("secret-key-for-tests").unwrap();

        assert_eq!(prefixed.sign("m", NOW, BODY), raw.sign("m", NOW, BODY));
        assert!(matches!(
            WebhookVerifier::new("whsec_***"),
            Err(WebhookError::InvalidSecret)
        ));
    }

    #[test]
    fn test_valid_signature_is_accepted() {
        let v = verifier();
        let signature = format!("v1,{}", v.sign("msg_1", NOW, BODY));

        assert!(v.verify(&headers("msg_1", NOW, &signature), BODY, NOW).is_ok());
    }

    #[test]
    fn test_any_listed_signature_may_match() {
        let v = verifier();
        let good = v.sign("msg_1", NOW, BODY);
        let signatures = format!("v1,bm90LWl0 v2,{} v1,{}", good, good);

        assert!(v.verify(&headers("msg_1", NOW, &signatures), BODY, NOW).is_ok());
    }

    #[test]
    fn test_bad_signature_is_rejected() {
        let v = verifier();
        let other = WebhookVerifier::new("some-other-secret").unwrap();
        let signature = format!("v1,{}", other.sign("msg_1", NOW, BODY));

        assert!(matches!(
            v.verify(&headers("msg_1", NOW, &signature), BODY, NOW),
            Err(WebhookError::InvalidSignature)
        ));
    }

    #[test]
    fn test_tampered_body_is_rejected() {
        let v = verifier();
        let signature = format!("v1,{}", v.sign("msg_1", NOW, BODY));
        let tampered = br#"{"type":"user.created","data":{"id":"user_1","role":"admin"}}"#;

        assert!(v.verify(&headers("msg_1", NOW, &signature), tampered, NOW).is_err());
    }

    #[test]
    fn test_stale_and_future_timestamps_are_rejected() {
        let v = verifier();

        for timestamp in [NOW - 301, NOW + 301] {
            let signature = format!("v1,{}", v.sign("msg_1", timestamp, BODY));
            assert!(matches!(
                v.verify(&headers("msg_1", timestamp, &signature), BODY, NOW),
                Err(WebhookError::TimestampOutOfTolerance)
            ));
        }

        let signature = format!("v1,{}", v.sign("msg_1", NOW - 300, BODY));
        assert!(v.verify(&headers("msg_1", NOW - 300, &signature), BODY, NOW).is_ok());
    }

    #[test]
    fn test_extreme_timestamps_are_out_of_tolerance() {
        let v = verifier();

        for timestamp in [i64::MIN, i64::MAX] {
            assert!(matches!(
                v.verify_parts("msg_1", &timestamp.to_string(), "v1,AAAA", b"{}", NOW),
                Err(WebhookError::TimestampOutOfTolerance)
            ));
        }
    }

    #[test]
    fn test_missing_headers() {
        let v = verifier();

        assert!(matches!(
            v.verify(&HeaderMap::new(), BODY, NOW),
            Err(WebhookError::MissingHeader("webhook-id"))
        ));
        assert!(matches!(
            v.verify_parts("msg_1", "yesterday", "v1,abc", BODY, NOW),
            Err(WebhookError::InvalidTimestamp)
        ));
    }

    #[test]
    fn test_parse_events() {
        assert_eq!(
            IdentityEvent::parse(BODY).unwrap(),
            IdentityEvent::UserCreated(IdentityUser {
                id: "user_1".to_string(),
                email: Some("a@example.com".to_string()),
                name: Some("Ana".to_string()),
                role: Some(Role::Driver),
            })
        );

        let deleted = IdentityEvent::parse(br#"{"type":"user.deleted","data":{"id":"user_9"}}"#)
            .unwrap();
        assert_eq!(deleted.event_type(), "user.deleted");

        let ignored = IdentityEvent::parse(br#"{"type":"session.created","data":{}}"#).unwrap();
        assert_eq!(ignored, IdentityEvent::Ignored("session.created".to_string()));

        assert!(IdentityEvent::parse(b"not json").is_err());
    }
}
