use crate::error::{Result, VerifyError};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Verify a payment vendor signature header of the form
/// `t=<unix>,v1=<hex>[,v1=<hex>...]` over `"{t}.{body}"`.
///
/// With a tolerance, timestamps older than `now - tolerance` are rejected
/// before any MAC work.
pub fn verify_payment_signature(
    secret: &str,
    signature_header: &str,
    body: &str,
    now: i64,
    tolerance_secs: Option<i64>,
) -> Result<()> {
    let (timestamp, candidates) = parse_header(signature_header)?;

    if let Some(tolerance) = tolerance_secs {
        if now - timestamp > tolerance {
            return Err(VerifyError::SignatureMismatch);
        }
    }

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| VerifyError::InvalidKey(e.to_string()))?;
    mac.update(format!("{timestamp}.{body}").as_bytes());
    let expected = hex::encode(mac.finalize().into_bytes());

    if candidates.iter().any(|sig| *sig == expected) {
        Ok(())
    } else {
        Err(VerifyError::SignatureMismatch)
    }
}

fn parse_header(header: &str) -> Result<(i64, Vec<&str>)> {
    let mut timestamp = None;
    let mut candidates = Vec::new();
    for pair in header.split(',') {
        match pair.trim().split_once('=') {
            Some(("t", value)) => {
                timestamp = Some(value.parse::<i64>().map_err(|e| {
                    VerifyError::MalformedEnvelope(format!("timestamp: {e}"))
                })?);
            }
            Some(("v1", value)) => candidates.push(value),
            _ => {}
        }
    }
    let timestamp = timestamp
        .ok_or_else(|| VerifyError::MalformedEnvelope("missing t= element".to_string()))?;
    if candidates.is_empty() {
        return Err(VerifyError::MalformedEnvelope("missing v1= element".to_string()));
    }
    Ok((timestamp, candidates))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sign(secret: &str, timestamp: i64, body: &str) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).unwrap();
        mac.update(format!("{timestamp}.{body}").as_bytes());
        hex::encode(mac.finalize().into_bytes())
    }

    #[test]
    fn valid_signature_verifies() {
        let body = r#"{"type":"checkout.session.completed"}"#;
        let header = format!("t=1715400000,v1={}", sign("whsec_1", 1715400000, body));

        assert!(verify_payment_signature("whsec_1", &header, body, 1715400100, Some(300)).is_ok());
    }

    #[test]
    fn any_v1_candidate_may_match() {
        let body = "{}";
        let good = sign("whsec_1", 1715400000, body);
        let header = format!("t=1715400000,v1={},v1={}", "0".repeat(64), good);

        assert!(verify_payment_signature("whsec_1", &header, body, 1715400000, None).is_ok());
    }

    #[test]
    fn wrong_secret_is_a_mismatch() {
        let body = "{}";
        let header = format!("t=1715400000,v1={}", sign("whsec_other", 1715400000, body));

        let err = verify_payment_signature("whsec_1", &header, body, 1715400000, None).unwrap_err();
        assert_eq!(err, VerifyError::SignatureMismatch);
    }

    #[test]
    fn stale_timestamp_is_rejected() {
        let body = "{}";
        let header = format!("t=1715400000,v1={}", sign("whsec_1", 1715400000, body));

        let err =
            verify_payment_signature("whsec_1", &header, body, 1715401000, Some(300)).unwrap_err();
        assert_eq!(err, VerifyError::SignatureMismatch);
    }

    #[test]
    fn malformed_header_is_a_typed_error() {
        let err = verify_payment_signature("whsec_1", "v1=abc", "{}", 0, None).unwrap_err();
        assert!(matches!(err, VerifyError::MalformedEnvelope(_)));

        let err = verify_payment_signature("whsec_1", "t=123", "{}", 0, None).unwrap_err();
        assert!(matches!(err, VerifyError::MalformedEnvelope(_)));
    }
}
