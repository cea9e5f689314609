//! Client for a GoTrue-compatible identity provider (Supabase Auth).
//!
//! The provider owns identities and issues sessions. This module only speaks
//! its REST contract: PKCE authorize URL, code exchange, user lookup, admin
//! deletion and sign-out.

use std::time::Duration;

use chrono::{DateTime, Utc};
use oauth2::PkceCodeChallenge;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum IdentityError {
    #[error("Invalid identity provider URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Identity provider rejected the request: {0}")]
    Rejected(String),

    #[error("Identity provider returned unexpected status {0}")]
    UnexpectedStatus(StatusCode),
}

/// Tokens issued by the provider for one signed-in identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    /// Unix timestamp (seconds).
    pub expires_at: Option<i64>,
}

/// Authentication record owned by the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub id: String,
    pub email: Option<String>,
    pub provider: Option<String>,
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

#[derive(Debug)]
pub struct AuthorizationDetails {
    pub url: String,
    pub pkce_verifier: String,
}

#[async_trait::async_trait]
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
pub trait IdentityProvider: Send + Sync {
    /// Builds the social sign-in URL for `provider` along with the PKCE
    /// verifier that must be presented at code exchange.
    fn authorization_details(&self, provider: &str, redirect_to: &str) -> Result<AuthorizationDetails, IdentityError>;

    /// Exchanges an authorization code for a session.
    async fn exchange_code(&self, code: &str, code_verifier: Option<String>) -> Result<Session, IdentityError>;

    /// Resolves the identity behind a session. `Ok(None)` when the provider no
    /// longer recognizes the session or its user.
    async fn get_identity(&self, session: &Session) -> Result<Option<Identity>, IdentityError>;

    /// Deletes an identity. Deleting an identity that no longer exists succeeds.
    async fn delete_identity(&self, id: &str) -> Result<(), IdentityError>;

    /// Revokes a session. An already revoked session succeeds.
    async fn sign_out(&self, session: &Session) -> Result<(), IdentityError>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: String,
    expires_at: Option<i64>,
}

#[derive(Deserialize)]
struct UserResponse {
    id: String,
    email: Option<String>,
    #[serde(default)]
    app_metadata: AppMetadata,
    last_sign_in_at: Option<DateTime<Utc>>,
}

#[derive(Deserialize, Default)]
struct AppMetadata {
    provider: Option<String>,
}

impl From<UserResponse> for Identity {
    fn from(user: UserResponse) -> Self {
        Self {
            id: user.id,
            email: user.email,
            provider: user.app_metadata.provider,
            last_sign_in_at: user.last_sign_in_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct GoTrueClient {
    http: Client,
    base_url: Url,
    anon_key: String,
    service_role_key: String,
}

impl GoTrueClient {
    pub fn new(
        base_url: &str,
        anon_key: String,
        service_role_key: String,
        timeout: Duration,
    ) -> Result<Self, IdentityError> {
        let mut base_url = Url::parse(base_url)?;
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let http = Client::builder().timeout(timeout).build()?;

        Ok(Self { http, base_url, anon_key, service_role_key })
    }

    fn endpoint(&self, path: &str) -> Result<Url, IdentityError> {
        Ok(self.base_url.join(path)?)
    }

    fn with_anon_key(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", &self.anon_key)
    }

    fn with_service_role(&self, request: RequestBuilder) -> RequestBuilder {
        request.header("apikey", &self.service_role_key).bearer_auth(&self.service_role_key)
    }
}

#[async_trait::async_trait]
impl IdentityProvider for GoTrueClient {
    fn authorization_details(&self, provider: &str, redirect_to: &str) -> Result<AuthorizationDetails, IdentityError> {
        let (challenge, verifier) = PkceCodeChallenge::new_random_sha256();

        let mut url = self.endpoint("auth/v1/authorize")?;
        url.query_pairs_mut()
            .append_pair("provider", provider)
            .append_pair("redirect_to", redirect_to)
            .append_pair("code_challenge", challenge.as_str())
            .append_pair("code_challenge_method", "s256");

        tracing::debug!(provider, "Generated authorization URL");

        Ok(AuthorizationDetails { url: url.to_string(), pkce_verifier: verifier.secret().to_string() })
    }

    async fn exchange_code(&self, code: &str, code_verifier: Option<String>) -> Result<Session, IdentityError> {
        let mut url = self.endpoint("auth/v1/token")?;
        url.query_pairs_mut().append_pair("grant_type", "pkce");

        let response = self
            .with_anon_key(self.http.post(url))
            .json(&json!({ "auth_code": code, "code_verifier": code_verifier.unwrap_or_default() }))
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(%status, "Authorization code exchange rejected");
            return Err(IdentityError::Rejected(body));
        }
        if !status.is_success() {
            return Err(IdentityError::UnexpectedStatus(status));
        }

        let token: TokenResponse = response.json().await?;

        Ok(Session { access_token: token.access_token, refresh_token: token.refresh_token, expires_at: token.expires_at })
    }

    async fn get_identity(&self, session: &Session) -> Result<Option<Identity>, IdentityError> {
        let response = self
            .with_anon_key(self.http.get(self.endpoint("auth/v1/user")?))
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(Some(response.json::<UserResponse>().await?.into())),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(None),
            status => Err(IdentityError::UnexpectedStatus(status)),
        }
    }

    async fn delete_identity(&self, id: &str) -> Result<(), IdentityError> {
        let url = self.endpoint(&format!("auth/v1/admin/users/{id}"))?;
        let response = self.with_service_role(self.http.delete(url)).send().await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                tracing::debug!(identity_id = id, "Identity already deleted");
                Ok(())
            },
            status => Err(IdentityError::UnexpectedStatus(status)),
        }
    }

    async fn sign_out(&self, session: &Session) -> Result<(), IdentityError> {
        let response = self
            .with_anon_key(self.http.post(self.endpoint("auth/v1/logout")?))
            .bearer_auth(&session.access_token)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => Ok(()),
            status => Err(IdentityError::UnexpectedStatus(status)),
        }
    }
}
