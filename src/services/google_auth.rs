//! Google OAuth access tokens from a stored refresh token.
//!
//! The interactive consent flow that produces the refresh token is not part
//! of this tool; the token is read from the environment.

use super::ServiceError;
use crate::env_manager::GoogleCredentials;
use log::{debug, info};
use oauth2::basic::BasicClient;
use oauth2::{AuthUrl, ClientId, ClientSecret, RefreshToken, RequestTokenError, TokenResponse, TokenUrl};
use secrecy::{ExposeSecret, SecretString};

pub const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const SERVICE: &str = "Google OAuth";

pub struct GoogleAuth {
    credentials: GoogleCredentials,
    token_url: String,
}

impl GoogleAuth {
    pub fn new(credentials: GoogleCredentials) -> Self {
        Self::with_token_url(credentials, GOOGLE_TOKEN_URL)
    }

    pub fn with_token_url(credentials: GoogleCredentials, token_url: impl Into<String>) -> Self {
        Self { credentials, token_url: token_url.into() }
    }

    /// Exchange the refresh token for a fresh access token.
    pub async fn access_token(&self) -> Result<SecretString, ServiceError> {
        let config_error = |message: String| ServiceError::InvalidResponse { service: SERVICE, message };
        let client = BasicClient::new(ClientId::new(self.credentials.client_id.clone()))
            .set_client_secret(ClientSecret::new(
                self.credentials.client_secret.expose_secret().to_string(),
            ))
            .set_auth_uri(AuthUrl::new(GOOGLE_AUTH_URL.to_string()).map_err(|e| config_error(e.to_string()))?)
            .set_token_uri(TokenUrl::new(self.token_url.clone()).map_err(|e| config_error(e.to_string()))?);

        // Token endpoints must not follow redirects
        let http = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| ServiceError::transport(SERVICE, e))?;

        debug!("Refreshing Google access token");
        let refresh_token = RefreshToken::new(self.credentials.refresh_token.expose_secret().to_string());
        let token = client
            .exchange_refresh_token(&refresh_token)
            .request_async(&http)
            .await
            .map_err(|err| match err {
                RequestTokenError::ServerResponse(response) => ServiceError::AuthorizationFailure {
                    service: SERVICE,
                    status: 400,
                    message: response.to_string(),
                },
                RequestTokenError::Request(e) => {
                    ServiceError::ServiceUnavailable { service: SERVICE, message: e.to_string() }
                }
                other => ServiceError::InvalidResponse { service: SERVICE, message: other.to_string() },
            })?;

        info!("Google credentials refreshed successfully");
        Ok(SecretString::from(token.access_token().secret().to_string()))
    }
}
