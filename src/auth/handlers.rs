use axum::{
    extract::{FromRef, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::CookieJar;
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::{
    auth::{
        cookie::{clear_refresh_cookie, refresh_cookie},
        dto::{
            AuthResponse, GetUserResponse, LoginRequest, MessageResponse, PublicUser,
            RefreshResponse, SignupRequest,
        },
        extractors::{AuthUser, RefreshAuth, SoftAuth},
        password,
        store::NewUser,
        tokens::TokenKeys,
    },
    error::ApiError,
    state::AppState,
};

pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/signup", post(signup))
        .route("/auth/login", post(login))
        .route("/auth/refresh", post(refresh))
        .route("/auth/report_refresh_stolen", post(report_refresh_stolen))
        .route("/auth/logout", post(logout))
        .route("/auth/get_user", get(get_user))
}

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

// Argon2 is deliberately slow; keep it off the request-accepting threads.
async fn hash_password_blocking(plain: String) -> Result<String, ApiError> {
    let hash = tokio::task::spawn_blocking(move || password::hash_password(&plain))
        .await
        .map_err(|e| anyhow::anyhow!("password hashing task failed: {e}"))??;
    Ok(hash)
}

async fn verify_password_blocking(plain: String, hash: String) -> Result<bool, ApiError> {
    let ok = tokio::task::spawn_blocking(move || password::verify_password(&plain, &hash))
        .await
        .map_err(|e| anyhow::anyhow!("password verify task failed: {e}"))?;
    Ok(ok)
}

#[instrument(skip(state, jar, payload))]
pub async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<SignupRequest>,
) -> Result<(CookieJar, (StatusCode, Json<AuthResponse>)), ApiError> {
    let SignupRequest {
        name,
        email,
        password,
    } = payload;
    let name = name.trim().to_string();

    let name_len = name.chars().count();
    if !(2..=50).contains(&name_len) {
        warn!("signup rejected: bad name length");
        return Err(ApiError::Validation {
            field: "name",
            messages: vec!["Name must be between 2 and 50 characters".into()],
        });
    }

    if !is_valid_email(&email) {
        warn!("signup rejected: invalid email format");
        return Err(ApiError::Validation {
            field: "email",
            messages: vec!["Please provide a valid email address".into()],
        });
    }

    let violations = password::check_strength(&password);
    if !violations.is_empty() {
        warn!(count = violations.len(), "signup rejected: weak password");
        return Err(ApiError::Validation {
            field: "password",
            messages: violations.iter().map(|v| v.to_string()).collect(),
        });
    }

    if state.store.find_by_email(&email).await?.is_some() {
        warn!(email = %email, "signup rejected: email taken");
        return Err(ApiError::Conflict {
            field: "email",
            message: "User already exists",
        });
    }

    let password_hash = hash_password_blocking(password).await?;
    let refresh_token_ref = Uuid::new_v4().to_string();
    let user = state
        .store
        .insert(NewUser {
            name,
            email,
            password_hash,
            refresh_token_ref,
        })
        .await?;

    let keys = TokenKeys::from_ref(&state);
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id, &user.refresh_token_ref)?;

    let jar = jar.add(refresh_cookie(refresh_token, true, &state.config.auth));
    info!(user_id = %user.id, "user signed up");
    Ok((
        jar,
        (
            StatusCode::CREATED,
            Json(AuthResponse {
                user: user.into(),
                access_token,
            }),
        ),
    ))
}

#[instrument(skip(state, jar, payload))]
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> Result<(CookieJar, Json<AuthResponse>), ApiError> {
    if !is_valid_email(&payload.email) {
        warn!("login rejected: invalid email format");
        return Err(ApiError::Validation {
            field: "email",
            messages: vec!["Please provide a valid email address".into()],
        });
    }

    let user = state
        .store
        .find_by_email(&payload.email)
        .await?
        .ok_or_else(|| {
            warn!("login unknown email");
            ApiError::NotFound {
                field: "email",
                message: "Invalid email",
            }
        })?;

    let ok = verify_password_blocking(payload.password, user.password_hash.clone()).await?;
    if !ok {
        warn!(user_id = %user.id, "login invalid password");
        return Err(ApiError::Unauthorized {
            field: "password",
            message: "Invalid password",
        });
    }

    // Login reuses the stored reference; refresh tokens issued earlier for
    // this user stay valid.
    let keys = TokenKeys::from_ref(&state);
    let access_token = keys.sign_access(user.id)?;
    let refresh_token = keys.sign_refresh(user.id, &user.refresh_token_ref)?;

    let jar = jar.add(refresh_cookie(
        refresh_token,
        payload.remember_me,
        &state.config.auth,
    ));
    info!(user_id = %user.id, "user logged in");
    Ok((
        jar,
        Json(AuthResponse {
            user: user.into(),
            access_token,
        }),
    ))
}

#[instrument(skip(state, auth))]
pub async fn refresh(
    State(state): State<AppState>,
    auth: RefreshAuth,
) -> Result<Json<RefreshResponse>, ApiError> {
    // A normal refresh mints a new access token only; the refresh token
    // and its stored reference stay untouched.
    let keys = TokenKeys::from_ref(&state);
    let access_token = keys.sign_access(auth.user.id)?;
    debug!(user_id = %auth.user.id, "access token refreshed");
    Ok(Json(RefreshResponse { access_token }))
}

#[instrument(skip(state, jar, auth))]
pub async fn report_refresh_stolen(
    State(state): State<AppState>,
    jar: CookieJar,
    auth: RefreshAuth,
) -> Result<(CookieJar, Json<MessageResponse>), ApiError> {
    let new_ref = Uuid::new_v4().to_string();
    let swapped = state
        .store
        .compare_and_set_refresh_ref(auth.user.id, &auth.rt_ref, &new_ref)
        .await?;
    if !swapped {
        // The stored reference moved between validation and the swap; the
        // presented token is no longer the current one.
        warn!(user_id = %auth.user.id, "refresh rotation lost the swap");
        return Err(ApiError::invalid_refresh_token());
    }

    let keys = TokenKeys::from_ref(&state);
    let refresh_token = keys.sign_refresh(auth.user.id, &new_ref)?;
    let jar = jar.add(refresh_cookie(refresh_token, true, &state.config.auth));
    info!(user_id = %auth.user.id, "refresh token reference rotated");
    Ok((
        jar,
        Json(MessageResponse {
            message: "Successfully reset the refresh token",
        }),
    ))
}

/// Reachable with either credential so a stale access token never blocks
/// logging out. Clears the carrier only; other sessions stay valid.
#[instrument(skip(jar))]
pub async fn logout(SoftAuth(user_id): SoftAuth, jar: CookieJar) -> (CookieJar, Json<MessageResponse>) {
    let jar = jar.add(clear_refresh_cookie());
    info!(user_id = %user_id, "user logged out");
    (
        jar,
        Json(MessageResponse {
            message: "Successfully logged out",
        }),
    )
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<GetUserResponse>, ApiError> {
    let user = state.store.find_by_id(user_id).await?.ok_or_else(|| {
        warn!(user_id = %user_id, "user record gone");
        ApiError::NotFound {
            field: "user",
            message: "User not found",
        }
    })?;

    Ok(Json(GetUserResponse {
        user: PublicUser::from(user),
    }))
}
