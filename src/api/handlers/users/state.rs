//! Auth configuration and shared per-process state.

use secrecy::SecretString;

const DEFAULT_ACCESS_TOKEN_TTL_SECONDS: u64 = 15 * 60;
const DEFAULT_REFRESH_TOKEN_TTL_SECONDS: u64 = 10 * 24 * 60 * 60;

#[derive(Clone, Debug)]
pub struct AuthConfig {
    access_token_secret: SecretString,
    refresh_token_secret: SecretString,
    frontend_origin: String,
    access_token_ttl_seconds: u64,
    refresh_token_ttl_seconds: u64,
    cookie_secure: bool,
}

impl AuthConfig {
    /// Access and refresh secrets must differ; a refresh token must never
    /// verify as an access token.
    #[must_use]
    pub fn new(
        access_token_secret: SecretString,
        refresh_token_secret: SecretString,
        frontend_origin: String,
    ) -> Self {
        Self {
            access_token_secret,
            refresh_token_secret,
            frontend_origin,
            access_token_ttl_seconds: DEFAULT_ACCESS_TOKEN_TTL_SECONDS,
            refresh_token_ttl_seconds: DEFAULT_REFRESH_TOKEN_TTL_SECONDS,
            cookie_secure: true,
        }
    }

    #[must_use]
    pub fn with_access_token_ttl_seconds(mut self, seconds: u64) -> Self {
        self.access_token_ttl_seconds = seconds;
        self
    }

    #[must_use]
    pub fn with_refresh_token_ttl_seconds(mut self, seconds: u64) -> Self {
        self.refresh_token_ttl_seconds = seconds;
        self
    }

    /// Local development only; production keeps `Secure` on both cookies.
    #[must_use]
    pub fn with_cookie_secure(mut self, secure: bool) -> Self {
        self.cookie_secure = secure;
        self
    }

    pub(crate) fn access_token_secret(&self) -> &SecretString {
        &self.access_token_secret
    }

    pub(crate) fn refresh_token_secret(&self) -> &SecretString {
        &self.refresh_token_secret
    }

    #[must_use]
    pub fn frontend_origin(&self) -> &str {
        &self.frontend_origin
    }

    pub(crate) fn access_token_ttl_seconds(&self) -> u64 {
        self.access_token_ttl_seconds
    }

    pub(crate) fn refresh_token_ttl_seconds(&self) -> u64 {
        self.refresh_token_ttl_seconds
    }

    pub(crate) fn cookie_secure(&self) -> bool {
        self.cookie_secure
    }
}

pub struct AuthState {
    config: AuthConfig,
}

impl AuthState {
    #[must_use]
    pub fn new(config: AuthConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &AuthConfig {
        &self.config
    }
}
