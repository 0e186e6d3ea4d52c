use axum::{
    async_trait,
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use axum_extra::extract::CookieJar;
use tracing::warn;
use uuid::Uuid;

use crate::auth::cookie::REFRESH_COOKIE;
use crate::auth::store::User;
use crate::auth::tokens::TokenKeys;
use crate::error::ApiError;
use crate::state::AppState;

/// Extracts and verifies the bearer access token. Pure: a signature and
/// expiry check, no store read.
pub struct AuthUser(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(ApiError::invalid_access_token)?;

        // Expect "Bearer <token>"
        let token = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(ApiError::invalid_access_token)?;

        let keys = TokenKeys::from_ref(state);
        let claims = keys.verify_access(token).map_err(|_| {
            warn!("invalid or expired access token");
            ApiError::invalid_access_token()
        })?;

        Ok(AuthUser(claims.sub))
    }
}

/// The refresh credential presented by the request, validated against the
/// user's stored reference. Every failure cause (absent cookie, bad
/// signature, expiry, stale reference) collapses into the same rejection.
pub struct RefreshAuth {
    pub user: User,
    pub rt_ref: String,
}

#[async_trait]
impl FromRequestParts<AppState> for RefreshAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar
            .get(REFRESH_COOKIE)
            .map(|c| c.value().to_string())
            .filter(|t| !t.is_empty())
            .ok_or(ApiError::Unauthorized {
                field: "refreshToken",
                message: "Refresh token not found",
            })?;

        let keys = TokenKeys::from_ref(state);
        let claims = keys.verify_refresh(&token).map_err(|_| {
            warn!("invalid or expired refresh token");
            ApiError::invalid_refresh_token()
        })?;

        // Signature checks out; now the embedded reference must still be
        // the user's current one. A mismatch is the theft / already-rotated
        // detection point.
        let user = state
            .store
            .find_by_id(claims.sub)
            .await?
            .filter(|u| u.refresh_token_ref == claims.rt_ref)
            .ok_or_else(|| {
                warn!(user_id = %claims.sub, "refresh token reference mismatch");
                ApiError::invalid_refresh_token()
            })?;

        Ok(RefreshAuth {
            user,
            rt_ref: claims.rt_ref,
        })
    }
}

/// Soft guard: tries the access-token strategy first (cheap, no store
/// read) and swallows its failure, then falls back to the refresh-token
/// strategy. Only both failing rejects the request.
pub struct SoftAuth(pub Uuid);

#[async_trait]
impl FromRequestParts<AppState> for SoftAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        if let Ok(AuthUser(user_id)) = AuthUser::from_request_parts(parts, state).await {
            return Ok(SoftAuth(user_id));
        }

        match RefreshAuth::from_request_parts(parts, state).await {
            Ok(auth) => Ok(SoftAuth(auth.user.id)),
            // A store outage is not an authorization verdict.
            Err(err @ ApiError::Dependency(_)) => Err(err),
            Err(_) => Err(ApiError::Unauthorized {
                field: "authorization",
                message: "Invalid credentials",
            }),
        }
    }
}
