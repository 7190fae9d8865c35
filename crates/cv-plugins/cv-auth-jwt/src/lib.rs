//! # cv-auth-jwt
//!
//! Reads the claims of the backend's JWTs without verifying them.
//! The signature is the server's concern; the client only needs to know who
//! the token belongs to and when it stops being accepted.

use chrono::{DateTime, Utc};
use cv_core::traits::{TokenClaims, TokenInspector};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct Payload {
    id: Option<String>,
    #[serde(rename = "_id")]
    underscore_id: Option<String>,
    sub: Option<String>,
    exp: Option<i64>,
}

pub struct JwtInspector {
    key: DecodingKey,
    validation: Validation,
}

impl Default for JwtInspector {
    fn default() -> Self {
        Self::new()
    }
}

impl JwtInspector {
    pub fn new() -> Self {
        // Claims only: no signature, expiry or audience checks here.
        let mut validation = Validation::new(Algorithm::HS256);
        validation.insecure_disable_signature_validation();
        validation.validate_exp = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();
        Self {
            key: DecodingKey::from_secret(&[]),
            validation,
        }
    }

    fn payload(&self, token: &str) -> Option<Payload> {
        match decode::<Payload>(token, &self.key, &self.validation) {
            Ok(data) => Some(data.claims),
            Err(e) => {
                debug!(error = %e, "token is not a decodable JWT");
                None
            }
        }
    }
}

impl TokenInspector for JwtInspector {
    fn claims(&self, token: &str) -> Option<TokenClaims> {
        let payload = self.payload(token)?;
        Some(TokenClaims {
            subject: payload.id.or(payload.underscore_id).or(payload.sub),
            expires_at: payload.exp.and_then(|exp| DateTime::<Utc>::from_timestamp(exp, 0)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use jsonwebtoken::{encode, EncodingKey, Header};

    fn token(payload: serde_json::Value) -> String {
        encode(&Header::default(), &payload, &EncodingKey::from_secret(b"server-side")).unwrap()
    }

    #[test]
    fn reads_id_and_expiry() {
        let exp = (Utc::now() + Duration::hours(2)).timestamp();
        let claims = JwtInspector::new()
            .claims(&token(serde_json::json!({ "id": "u1", "iat": 1, "exp": exp })))
            .unwrap();

        assert_eq!(claims.subject.as_deref(), Some("u1"));
        assert!(!claims.is_expired(Utc::now()));
    }

    #[test]
    fn subject_falls_back_to_underscore_id_then_sub() {
        let inspector = JwtInspector::new();
        let a = inspector.claims(&token(serde_json::json!({ "_id": "u2" }))).unwrap();
        let b = inspector.claims(&token(serde_json::json!({ "sub": "u3" }))).unwrap();
        assert_eq!(a.subject.as_deref(), Some("u2"));
        assert_eq!(b.subject.as_deref(), Some("u3"));
        assert!(b.expires_at.is_none());
    }

    #[test]
    fn past_expiry_is_still_read() {
        let exp = (Utc::now() - Duration::minutes(1)).timestamp();
        let claims = JwtInspector::new()
            .claims(&token(serde_json::json!({ "id": "u1", "exp": exp })))
            .unwrap();
        assert!(claims.is_expired(Utc::now()));
    }

    #[test]
    fn signature_from_an_unknown_key_is_accepted() {
        let signed = encode(
            &Header::new(Algorithm::HS512),
            &serde_json::json!({ "id": "u9", "aud": "campvoiceus" }),
            &EncodingKey::from_secret(b"some other secret"),
        )
        .unwrap();
        let claims = JwtInspector::new().claims(&signed).unwrap();
        assert_eq!(claims.subject.as_deref(), Some("u9"));
    }

    #[test]
    fn opaque_tokens_have_no_claims() {
        let inspector = JwtInspector::new();
        assert!(inspector.claims("not-a-jwt").is_none());
        assert!(inspector.claims("a.!!!.c").is_none());
        assert!(inspector.claims("a.b.c.d").is_none());
    }
}
