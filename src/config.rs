use serde::Deserialize;

/// Token-signing and cookie-policy settings. The two secrets are
/// independent: leaking one must not allow forging the other token class.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthConfig {
    pub at_secret: String,
    pub rt_secret: String,
    pub access_ttl_minutes: i64,
    pub refresh_ttl_days: i64,
    pub production: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub database_url: String,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = std::env::var("DATABASE_URL")?;
        let auth = AuthConfig {
            at_secret: std::env::var("AT_SECRET")?,
            rt_secret: std::env::var("RT_SECRET")?,
            access_ttl_minutes: std::env::var("ACCESS_TTL_MINUTES")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(15),
            refresh_ttl_days: std::env::var("REFRESH_TTL_DAYS")
                .ok()
                .and_then(|v| v.parse::<i64>().ok())
                .unwrap_or(7),
            production: std::env::var("APP_ENV")
                .map(|v| v == "production")
                .unwrap_or(false),
        };
        Ok(Self { database_url, auth })
    }
}
