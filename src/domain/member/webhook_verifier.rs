//! Stripe webhook signature verification.
//!
//! Stripe signs `"{timestamp}.{payload}"` with HMAC-SHA256 using the
//! endpoint's signing secret and sends the result in the `Stripe-Signature`
//! header. Events outside the timestamp tolerance are rejected.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use super::BillingError;

/// Default tolerance between the signed timestamp and now (5 minutes).
pub const DEFAULT_TOLERANCE_SECS: i64 = 300;

/// Parsed `Stripe-Signature` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    pub timestamp: i64,
    /// All `v1` signatures; Stripe sends several while a secret is rolled.
    pub v1_signatures: Vec<Vec<u8>>,
}

impl SignatureHeader {
    /// Parses `t=<timestamp>,v1=<hex>[,v1=<hex>...]`. Unknown keys (such as
    /// the legacy `v0`) are ignored.
    pub fn parse(header: &str) -> Result<Self, BillingError> {
        let mut timestamp: Option<i64> = None;
        let mut v1_signatures = Vec::new();

        for part in header.split(',') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or_else(|| BillingError::invalid_signature("malformed header"))?;

            match key {
                "t" => {
                    timestamp = Some(
                        value
                            .parse()
                            .map_err(|_| BillingError::invalid_signature("invalid timestamp"))?,
                    );
                }
                "v1" => {
                    let sig = hex::decode(value)
                        .map_err(|_| BillingError::invalid_signature("invalid v1 signature hex"))?;
                    v1_signatures.push(sig);
                }
                _ => {}
            }
        }

        let timestamp =
            timestamp.ok_or_else(|| BillingError::invalid_signature("missing timestamp"))?;
        if v1_signatures.is_empty() {
            return Err(BillingError::invalid_signature("missing v1 signature"));
        }

        Ok(Self {
            timestamp,
            v1_signatures,
        })
    }
}

/// Verifies webhook payloads against the endpoint signing secret.
#[derive(Clone)]
pub struct StripeWebhookVerifier {
    secret: SecretString,
    tolerance_secs: i64,
}

impl std::fmt::Debug for StripeWebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StripeWebhookVerifier")
            .field("tolerance_secs", &self.tolerance_secs)
            .finish_non_exhaustive()
    }
}

impl StripeWebhookVerifier {
    pub fn new(secret: SecretString) -> Self {
        Self {
            secret,
            tolerance_secs: DEFAULT_TOLERANCE_SECS,
        }
    }

    pub fn with_tolerance(mut self, tolerance_secs: i64) -> Self {
        self.tolerance_secs = tolerance_secs;
        self
    }

    /// Verifies `payload` against `signature_header` at the current time.
    pub fn verify(&self, payload: &[u8], signature_header: &str) -> Result<(), BillingError> {
        self.verify_at(payload, signature_header, chrono::Utc::now().timestamp())
    }

    /// Verifies `payload` as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns `BillingError::InvalidSignature` if the header is malformed,
    /// the timestamp is outside tolerance, or no `v1` signature matches.
    pub fn verify_at(
        &self,
        payload: &[u8],
        signature_header: &str,
        now: i64,
    ) -> Result<(), BillingError> {
        let header = SignatureHeader::parse(signature_header)?;

        let tolerance = self.tolerance_secs.unsigned_abs();
        if now.abs_diff(header.timestamp) > tolerance {
            return Err(BillingError::invalid_signature(
                "timestamp outside the tolerance zone",
            ));
        }

        let expected = sign(self.secret.expose_secret(), header.timestamp, payload)?;

        let matched = header
            .v1_signatures
            .iter()
            .any(|candidate| constant_time_compare(&expected, candidate));
        if !matched {
            return Err(BillingError::invalid_signature(
                "no signatures found matching the expected signature for payload",
            ));
        }

        Ok(())
    }
}

/// Builds a `Stripe-Signature` header value for `payload`.
///
/// Used to sign fixtures and to exercise a running endpoint locally.
pub fn signature_header(secret: &str, timestamp: i64, payload: &[u8]) -> Result<String, BillingError> {
    let sig = sign(secret, timestamp, payload)?;
    Ok(format!("t={},v1={}", timestamp, hex::encode(sig)))
}

fn sign(secret: &str, timestamp: i64, payload: &[u8]) -> Result<Vec<u8>, BillingError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(secret.as_bytes())
        .map_err(|e| BillingError::invalid_signature(e.to_string()))?;
    mac.update(timestamp.to_string().as_bytes());
    mac.update(b".");
    mac.update(payload);
    Ok(mac.finalize().into_bytes().to_vec())
}

fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
