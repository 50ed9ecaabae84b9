use secrecy::SecretString;

/// Process-wide settings resolved once at startup and passed down explicitly.
#[derive(Debug, Clone)]
pub struct GlobalArgs {
    pub access_token_secret: SecretString,
    pub refresh_token_secret: SecretString,
    pub access_token_ttl_seconds: u64,
    pub refresh_token_ttl_seconds: u64,
    pub frontend_origin: String,
    pub media_base_url: String,
    pub media_cloud_name: String,
    pub media_api_key: String,
    pub media_api_secret: SecretString,
}

impl GlobalArgs {
    #[must_use]
    pub fn new(frontend_origin: String) -> Self {
        Self {
            access_token_secret: SecretString::default(),
            refresh_token_secret: SecretString::default(),
            access_token_ttl_seconds: 0,
            refresh_token_ttl_seconds: 0,
            frontend_origin,
            media_base_url: String::new(),
            media_cloud_name: String::new(),
            media_api_key: String::new(),
            media_api_secret: SecretString::default(),
        }
    }
}
