use crate::api;
use crate::api::handlers::users::AuthConfig;
use crate::cli::{actions::Action, globals::GlobalArgs};
use crate::media::{CloudMediaStore, MediaCredentials, MediaStore};
use anyhow::{Context, Result};
use std::sync::Arc;
use url::Url;

/// Handle the server action
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::Server { port, dsn } => {
            // Fail early on unparseable connection strings
            Url::parse(&dsn).context("invalid database connection string")?;

            let auth_config = AuthConfig::new(
                globals.access_token_secret.clone(),
                globals.refresh_token_secret.clone(),
                globals.frontend_origin.clone(),
            )
            .with_access_token_ttl_seconds(globals.access_token_ttl_seconds)
            .with_refresh_token_ttl_seconds(globals.refresh_token_ttl_seconds);

            let media: Arc<dyn MediaStore> =
                Arc::new(CloudMediaStore::new(MediaCredentials {
                    base_url: globals.media_base_url.clone(),
                    cloud_name: globals.media_cloud_name.clone(),
                    api_key: globals.media_api_key.clone(),
                    api_secret: globals.media_api_secret.clone(),
                })?);

            api::new(port, dsn, auth_config, media).await?;
        }
    }

    Ok(())
}
