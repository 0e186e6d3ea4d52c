use std::time::Duration;

use axum::extract::FromRef;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use time::{Duration as TimeDuration, OffsetDateTime};
use tracing::debug;
use uuid::Uuid;

use crate::auth::claims::{AccessClaims, RefreshClaims};
use crate::config::AuthConfig;
use crate::state::AppState;

/// Signing and verification keys for both token classes. Access and
/// refresh tokens use disjoint secrets; verification is pure and never
/// touches the store — whether an embedded reference is still current is
/// the caller's concern.
#[derive(Clone)]
pub struct TokenKeys {
    at_encoding: EncodingKey,
    at_decoding: DecodingKey,
    rt_encoding: EncodingKey,
    rt_decoding: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
}

impl FromRef<AppState> for TokenKeys {
    fn from_ref(state: &AppState) -> Self {
        Self::from_config(&state.config.auth)
    }
}

impl TokenKeys {
    pub fn from_config(auth: &AuthConfig) -> Self {
        Self {
            at_encoding: EncodingKey::from_secret(auth.at_secret.as_bytes()),
            at_decoding: DecodingKey::from_secret(auth.at_secret.as_bytes()),
            rt_encoding: EncodingKey::from_secret(auth.rt_secret.as_bytes()),
            rt_decoding: DecodingKey::from_secret(auth.rt_secret.as_bytes()),
            access_ttl: Duration::from_secs((auth.access_ttl_minutes as u64) * 60),
            refresh_ttl: Duration::from_secs((auth.refresh_ttl_days as u64) * 24 * 60 * 60),
        }
    }

    pub fn sign_access(&self, user_id: Uuid) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.access_ttl.as_secs() as i64);
        let claims = AccessClaims {
            sub: user_id,
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.at_encoding)?;
        debug!(user_id = %user_id, "access token signed");
        Ok(token)
    }

    pub fn sign_refresh(&self, user_id: Uuid, rt_ref: &str) -> anyhow::Result<String> {
        let now = OffsetDateTime::now_utc();
        let exp = now + TimeDuration::seconds(self.refresh_ttl.as_secs() as i64);
        let claims = RefreshClaims {
            sub: user_id,
            rt_ref: rt_ref.to_string(),
            iat: now.unix_timestamp() as usize,
            exp: exp.unix_timestamp() as usize,
        };
        let token = encode(&Header::default(), &claims, &self.rt_encoding)?;
        debug!(user_id = %user_id, "refresh token signed");
        Ok(token)
    }

    pub fn verify_access(&self, token: &str) -> anyhow::Result<AccessClaims> {
        let data = decode::<AccessClaims>(token, &self.at_decoding, &Validation::default())?;
        Ok(data.claims)
    }

    pub fn verify_refresh(&self, token: &str) -> anyhow::Result<RefreshClaims> {
        let data = decode::<RefreshClaims>(token, &self.rt_decoding, &Validation::default())?;
        Ok(data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_keys() -> TokenKeys {
        TokenKeys::from_config(&AuthConfig {
            at_secret: "at-test-secret".into(),
            rt_secret: "rt-test-secret".into(),
            access_ttl_minutes: 15,
            refresh_ttl_days: 7,
            production: false,
        })
    }

    #[test]
    fn sign_and_verify_access_token() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let token = keys.sign_access(user_id).expect("sign access");
        let claims = keys.verify_access(&token).expect("verify access");
        assert_eq!(claims.sub, user_id);
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn sign_and_verify_refresh_token_keeps_reference() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();
        let rt_ref = Uuid::new_v4().to_string();
        let token = keys.sign_refresh(user_id, &rt_ref).expect("sign refresh");
        let claims = keys.verify_refresh(&token).expect("verify refresh");
        assert_eq!(claims.sub, user_id);
        assert_eq!(claims.rt_ref, rt_ref);
    }

    #[test]
    fn token_classes_are_not_interchangeable() {
        let keys = make_keys();
        let user_id = Uuid::new_v4();

        let access = keys.sign_access(user_id).expect("sign access");
        assert!(keys.verify_refresh(&access).is_err());

        let refresh = keys
            .sign_refresh(user_id, "some-ref")
            .expect("sign refresh");
        assert!(keys.verify_access(&refresh).is_err());
    }

    #[test]
    fn verify_rejects_token_signed_with_other_secret() {
        let keys = make_keys();
        let other = TokenKeys::from_config(&AuthConfig {
            at_secret: "a-different-secret".into(),
            rt_secret: "another-different-secret".into(),
            access_ttl_minutes: 15,
            refresh_ttl_days: 7,
            production: false,
        });
        let token = other.sign_access(Uuid::new_v4()).expect("sign access");
        assert!(keys.verify_access(&token).is_err());
    }

    #[test]
    fn verify_rejects_tampered_token() {
        let keys = make_keys();
        let mut token = keys.sign_access(Uuid::new_v4()).expect("sign access");
        token.pop();
        token.push('x');
        assert!(keys.verify_access(&token).is_err());
    }
}
