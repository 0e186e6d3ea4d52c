use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Payload of a short-lived access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: Uuid,  // user ID
    pub iat: usize, // issued at (unix timestamp)
    pub exp: usize, // expires at (unix timestamp)
}

/// Payload of a long-lived refresh token. A refresh token is honored only
/// while `rt_ref` still equals the reference stored on the user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefreshClaims {
    pub sub: Uuid, // user ID
    #[serde(rename = "rtRef")]
    pub rt_ref: String,
    pub iat: usize,
    pub exp: usize,
}
