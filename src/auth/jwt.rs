use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration, OffsetDateTime};
use tracing::debug;

use super::claims::{Claims, TokenKind};
use super::errors::TokenError;
use crate::config::JwtConfig;

#[derive(Clone)]
struct SigningKey {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl SigningKey {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// Issues and verifies HS256 tokens. Access and refresh tokens are signed
/// with separate secrets, so one kind never verifies as the other.
#[derive(Clone)]
pub struct JwtKeys {
    access: SigningKey,
    refresh: SigningKey,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
    pub leeway: Duration,
}

impl JwtKeys {
    pub fn from_config(cfg: &JwtConfig) -> Self {
        Self {
            access: SigningKey::from_secret(&cfg.access_secret),
            refresh: SigningKey::from_secret(&cfg.refresh_secret),
            access_ttl: Duration::minutes(cfg.access_ttl_minutes),
            refresh_ttl: Duration::minutes(cfg.refresh_ttl_minutes),
            leeway: Duration::seconds(cfg.leeway_seconds),
        }
    }

    fn key(&self, kind: TokenKind) -> &SigningKey {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    pub fn issue_access(&self, subject: &str) -> Result<String, TokenError> {
        self.issue(TokenKind::Access, subject, self.access_ttl)
    }

    pub fn issue_refresh(&self, subject: &str) -> Result<String, TokenError> {
        self.issue(TokenKind::Refresh, subject, self.refresh_ttl)
    }

    pub fn issue(&self, kind: TokenKind, subject: &str, ttl: Duration) -> Result<String, TokenError> {
        self.issue_at(kind, subject, ttl, OffsetDateTime::now_utc())
    }

    /// `exp` is fixed at `now + ttl`; no skew allowance is added here.
    pub fn issue_at(
        &self,
        kind: TokenKind,
        subject: &str,
        ttl: Duration,
        now: OffsetDateTime,
    ) -> Result<String, TokenError> {
        let exp = now
            .checked_add(ttl)
            .ok_or_else(|| TokenError::Signing(format!("expiry out of range for ttl {ttl:?}")))?;
        let claims = Claims {
            sub: subject.to_owned(),
            iat: now.unix_timestamp(),
            exp: exp.unix_timestamp(),
        };
        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.key(kind).encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;
        debug!(kind = ?kind, exp = claims.exp, "jwt signed");
        Ok(token)
    }

    pub fn verify(&self, token: &str, kind: TokenKind) -> Result<Claims, TokenError> {
        self.verify_at(token, kind, OffsetDateTime::now_utc())
    }

    /// The signature is checked before any claim is looked at; expiry is
    /// then compared against `now`, tolerating `leeway` of clock skew.
    pub fn verify_at(
        &self,
        token: &str,
        kind: TokenKind,
        now: OffsetDateTime,
    ) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = false;
        validation.required_spec_claims = ["exp", "sub"].iter().map(|c| c.to_string()).collect();

        let claims = decode::<Claims>(token, &self.key(kind).decoding, &validation)
            .map_err(|e| TokenError::Malformed(e.to_string()))?
            .claims;

        if claims.exp.saturating_add(self.leeway.whole_seconds()) < now.unix_timestamp() {
            debug!(kind = ?kind, exp = claims.exp, "jwt expired");
            return Err(TokenError::Expired);
        }
        debug!(kind = ?kind, "jwt verified");
        Ok(claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys(leeway_seconds: i64) -> JwtKeys {
        JwtKeys::from_config(&JwtConfig {
            access_secret: "access-secret".into(),
            refresh_secret: "refresh-secret".into(),
            access_ttl_minutes: 30,
            refresh_ttl_minutes: 60 * 24 * 7,
            leeway_seconds,
        })
    }

    #[test]
    fn issue_and_verify_access_token() {
        let keys = make_keys(0);
        let token = keys.issue_access("bob@x.com").expect("issue access");
        let claims = keys.verify(&token, TokenKind::Access).expect("verify");
        assert_eq!(claims.sub, "bob@x.com");
        assert_eq!(claims.exp - claims.iat, 30 * 60);
    }

    #[test]
    fn refresh_token_lives_seven_days() {
        let keys = make_keys(0);
        let token = keys.issue_refresh("bob@x.com").expect("issue refresh");
        let claims = keys.verify(&token, TokenKind::Refresh).expect("verify");
        assert_eq!(claims.exp - claims.iat, 7 * 24 * 60 * 60);
    }

    #[test]
    fn expiry_is_absolute_and_checked_against_now() {
        let keys = make_keys(0);
        let issued = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let ttl = Duration::minutes(30);
        let token = keys
            .issue_at(TokenKind::Access, "bob@x.com", ttl, issued)
            .unwrap();

        let claims = keys
            .verify_at(&token, TokenKind::Access, issued + ttl - Duration::seconds(1))
            .expect("valid just before expiry");
        assert_eq!(claims.exp, 1_700_000_000 + 30 * 60);

        keys.verify_at(&token, TokenKind::Access, issued + ttl)
            .expect("valid at the expiry instant");

        let err = keys
            .verify_at(&token, TokenKind::Access, issued + ttl + Duration::seconds(1))
            .unwrap_err();
        assert_eq!(err, TokenError::Expired);
    }

    #[test]
    fn leeway_is_applied_only_when_verifying() {
        let keys = make_keys(60);
        let issued = OffsetDateTime::from_unix_timestamp(1_700_000_000).unwrap();
        let ttl = Duration::minutes(1);
        let token = keys
            .issue_at(TokenKind::Access, "bob@x.com", ttl, issued)
            .unwrap();
        let claims = keys
            .verify_at(&token, TokenKind::Access, issued + ttl + Duration::seconds(30))
            .expect("inside leeway");
        assert_eq!(claims.exp, 1_700_000_060);
        let err = keys
            .verify_at(&token, TokenKind::Access, issued + ttl + Duration::seconds(61))
            .unwrap_err();
        assert_eq!(err, TokenError::Expired);
    }

    #[test]
    fn refresh_token_fails_against_access_key() {
        let keys = make_keys(0);
        let token = keys.issue_refresh("bob@x.com").unwrap();
        let err = keys.verify(&token, TokenKind::Access).unwrap_err();
        assert!(matches!(err, TokenError::Malformed(_)));
    }

    #[test]
    fn access_token_fails_against_refresh_key() {
        let keys = make_keys(0);
        let token = keys.issue_access("bob@x.com").unwrap();
        let err = keys.verify(&token, TokenKind::Refresh).unwrap_err();
        assert!(matches!(err, TokenError::Malformed(_)));
    }

    #[test]
    fn signature_is_checked_before_expiry() {
        let keys = make_keys(0);
        let other = JwtKeys::from_config(&JwtConfig {
            access_secret: "attacker".into(),
            refresh_secret: "attacker-refresh".into(),
            access_ttl_minutes: 30,
            refresh_ttl_minutes: 60,
            leeway_seconds: 0,
        });
        let forged = other
            .issue(TokenKind::Access, "bob@x.com", Duration::minutes(-10))
            .unwrap();
        let err = keys.verify(&forged, TokenKind::Access).unwrap_err();
        assert!(matches!(err, TokenError::Malformed(_)));
    }

    #[test]
    fn tampered_payload_is_rejected() {
        let keys = make_keys(0);
        let token = keys.issue_access("bob@x.com").unwrap();
        let mut parts: Vec<String> = token.split('.').map(str::to_owned).collect();
        let evil = keys.issue_access("eve@x.com").unwrap();
        parts[1] = evil.split('.').nth(1).unwrap().to_owned();
        let err = keys
            .verify(&parts.join("."), TokenKind::Access)
            .unwrap_err();
        assert!(matches!(err, TokenError::Malformed(_)));
    }

    #[test]
    fn garbage_is_malformed() {
        let keys = make_keys(0);
        for token in ["", "abc", "a.b.c", "invalid.token.here"] {
            let err = keys.verify(token, TokenKind::Access).unwrap_err();
            assert!(matches!(err, TokenError::Malformed(_)), "{token:?}");
        }
    }

    #[test]
    fn unrepresentable_expiry_is_a_signing_error() {
        let keys = make_keys(0);
        let err = keys
            .issue(TokenKind::Refresh, "bob@x.com", Duration::MAX)
            .unwrap_err();
        assert!(matches!(err, TokenError::Signing(_)));
    }
}
