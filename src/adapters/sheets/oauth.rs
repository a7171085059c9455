//! Google OAuth2 - Delegated Spreadsheet Credential
//!
//! Authorization-code flow with offline access: the user visits
//! `/login`, consents, and Google redirects back to `/oauth2callback`
//! with a code that is exchanged here for an access and refresh token.
//! The credential is held in memory only; a restart requires consent
//! again.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, StatusCode, Url};
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

use super::types::{TokenError, TokenResponse};
use crate::config::{OAuthConfig, Secret};
use crate::error::{SyncError, SyncResult};
use crate::ports::credentials::CredentialProvider;

/// Google consent page.
pub const AUTH_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google token endpoint.
pub const TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";

/// Full read/write access to spreadsheets.
pub const SPREADSHEETS_SCOPE: &str = "https://www.googleapis.com/auth/spreadsheets";

/// Tokens this close to expiry are refreshed before use.
const EXPIRY_MARGIN_SECS: i64 = 60;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Why the token endpoint did not issue a token.
#[derive(Debug)]
enum TokenFailure {
    /// The grant itself was refused; retrying with it is pointless.
    Rejected(String),
    /// Network failure, server error or unreadable response.
    Unavailable(String),
}

impl TokenFailure {
    fn into_message(self) -> String {
        match self {
            Self::Rejected(message) | Self::Unavailable(message) => message,
        }
    }
}

#[derive(Debug, Clone)]
struct HeldToken {
    access_token: Secret,
    refresh_token: Option<Secret>,
    expires_at: Option<DateTime<Utc>>,
}

impl HeldToken {
    fn is_fresh(&self, now: DateTime<Utc>) -> bool {
        self.expires_at
            .is_none_or(|at| at - chrono::Duration::seconds(EXPIRY_MARGIN_SECS) > now)
    }
}

/// OAuth2 client holding the single delegated credential.
pub struct GoogleOAuth {
    http: Client,
    client_id: String,
    client_secret: Secret,
    redirect_url: String,
    token_endpoint: String,
    /// Prebuilt consent URL.
    consent_url: String,
    /// Local `/login` endpoint reported to unauthorized callers.
    login_url: String,
    token: RwLock<Option<HeldToken>>,
}

impl GoogleOAuth {
    /// Create a client against Google's production endpoints.
    pub fn new(config: &OAuthConfig, login_url: impl Into<String>) -> Result<Self> {
        Self::with_endpoints(config, login_url, AUTH_ENDPOINT, TOKEN_ENDPOINT)
    }

    /// Create a client against explicit consent and token endpoints.
    pub fn with_endpoints(
        config: &OAuthConfig,
        login_url: impl Into<String>,
        auth_endpoint: &str,
        token_endpoint: &str,
    ) -> Result<Self> {
        let consent_url = Url::parse_with_params(
            auth_endpoint,
            &[
                ("client_id", config.client_id.as_str()),
                ("redirect_uri", config.redirect_url.as_str()),
                ("response_type", "code"),
                ("scope", SPREADSHEETS_SCOPE),
                ("access_type", "offline"),
                ("prompt", "consent"),
            ],
        )
        .context("Invalid OAuth authorization endpoint")?;

        let http = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("Failed to build OAuth HTTP client")?;

        Ok(Self {
            http,
            client_id: config.client_id.clone(),
            client_secret: config.client_secret.clone(),
            redirect_url: config.redirect_url.clone(),
            token_endpoint: token_endpoint.to_string(),
            consent_url: consent_url.into(),
            login_url: login_url.into(),
            token: RwLock::new(None),
        })
    }

    fn unauthorized(&self) -> SyncError {
        SyncError::Unauthorized {
            login_url: self.login_url.clone(),
        }
    }

    async fn request_token(&self, form: &[(&str, &str)]) -> Result<TokenResponse, TokenFailure> {
        let response = self
            .http
            .post(&self.token_endpoint)
            .form(form)
            .send()
            .await
            .map_err(|e| TokenFailure::Unavailable(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| TokenFailure::Unavailable(e.to_string()))?;

        if !status.is_success() {
            let message = serde_json::from_slice::<TokenError>(&body).map_or_else(
                |_| format!("HTTP {status}"),
                |e| match e.error_description {
                    Some(description) => format!("{}: {description}", e.error),
                    None => e.error,
                },
            );
            // Google answers a bad, expired or revoked grant with 400/401.
            return Err(match status {
                StatusCode::BAD_REQUEST | StatusCode::UNAUTHORIZED => {
                    TokenFailure::Rejected(message)
                }
                _ => TokenFailure::Unavailable(message),
            });
        }

        serde_json::from_slice(&body).map_err(|e| TokenFailure::Unavailable(e.to_string()))
    }

    fn hold(token: TokenResponse, previous_refresh: Option<Secret>) -> HeldToken {
        HeldToken {
            access_token: Secret::new(token.access_token),
            // Refresh responses usually omit the refresh token.
            refresh_token: token.refresh_token.map(Secret::new).or(previous_refresh),
            expires_at: token
                .expires_in
                .map(|secs| Utc::now() + chrono::Duration::seconds(secs)),
        }
    }

    #[instrument(skip(self, refresh_token))]
    async fn refresh(&self, refresh_token: Secret) -> Result<HeldToken, TokenFailure> {
        let token = self
            .request_token(&[
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose()),
                ("refresh_token", refresh_token.expose()),
                ("grant_type", "refresh_token"),
            ])
            .await?;
        info!("Spreadsheet access token refreshed");
        Ok(Self::hold(token, Some(refresh_token)))
    }
}

#[async_trait]
impl CredentialProvider for GoogleOAuth {
    fn authorize_url(&self) -> String {
        self.consent_url.clone()
    }

    fn login_url(&self) -> String {
        self.login_url.clone()
    }

    #[instrument(skip(self, code))]
    async fn authorize(&self, code: &str) -> SyncResult<()> {
        let token = self
            .request_token(&[
                ("code", code),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.expose()),
                ("redirect_uri", self.redirect_url.as_str()),
                ("grant_type", "authorization_code"),
            ])
            .await
            .map_err(|f| SyncError::Authorization(f.into_message()))?;

        let held = Self::hold(token, None);
        if held.refresh_token.is_none() {
            warn!("Token response carried no refresh token; consent is needed again on expiry");
        }
        *self.token.write().await = Some(held);
        info!("Spreadsheet access authorized");
        Ok(())
    }

    async fn is_authorized(&self) -> bool {
        self.token.read().await.is_some()
    }

    async fn access_token(&self) -> SyncResult<String> {
        let mut guard = self.token.write().await;
        let Some(held) = guard.as_ref() else {
            return Err(self.unauthorized());
        };
        if held.is_fresh(Utc::now()) {
            return Ok(held.access_token.expose().to_string());
        }

        let Some(refresh_token) = held.refresh_token.clone() else {
            warn!("Access token expired and no refresh token is held");
            *guard = None;
            return Err(self.unauthorized());
        };

        match self.refresh(refresh_token).await {
            Ok(renewed) => {
                let access = renewed.access_token.expose().to_string();
                *guard = Some(renewed);
                Ok(access)
            }
            Err(TokenFailure::Rejected(message)) => {
                warn!(error = %message, "Refresh grant rejected, dropping credential");
                *guard = None;
                Err(self.unauthorized())
            }
            Err(TokenFailure::Unavailable(message)) => {
                warn!(error = %message, "Token refresh failed, keeping credential");
                Err(SyncError::TokenRefreshUnavailable(message))
            }
        }
    }
}
