use tradechat_exchange::BinanceConfig;

/// Runtime configuration, built once at startup and passed by reference.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Secret for signing and verifying JWTs.
    pub auth_secret: String,
    pub access_expire_minutes: i64,
    pub refresh_expire_minutes: i64,
    /// Fallback exchange credentials used when a user has no linked account.
    pub exchange: BinanceConfig,
}
