//! Auth0 identity provider
//!
//! Authorization-code flow with PKCE against `{domain}/authorize` and
//! `{domain}/oauth/token`; the identity comes from `{domain}/userinfo`.
//! Sign-out goes through `{domain}/v2/logout`, which requires the `returnTo`
//! URL to be listed under the application's "Allowed Logout URLs".

use async_trait::async_trait;
use oauth2::{
    basic::BasicClient, AuthUrl, AuthorizationCode, ClientId, ClientSecret, CsrfToken,
    EndpointNotSet, EndpointSet, PkceCodeChallenge, PkceCodeVerifier, RedirectUrl, Scope,
    TokenResponse, TokenUrl,
};
use serde::Deserialize;

use super::provider::{
    AuthProvider, AuthProviderError, AuthenticatedIdentity, AuthorizationRequest,
};
use super::session::SessionUser;
use crate::config::Config;

pub const AUTH0_PROVIDER_ID: &str = "auth0";

/// OAuth client with auth and token endpoints configured
type ConfiguredOAuthClient =
    BasicClient<EndpointSet, EndpointNotSet, EndpointNotSet, EndpointNotSet, EndpointSet>;

/// Subset of the OIDC userinfo response we consume
#[derive(Debug, Deserialize)]
struct UserInfo {
    sub: String,
    #[serde(default)]
    email: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl From<UserInfo> for SessionUser {
    fn from(info: UserInfo) -> Self {
        SessionUser {
            id: info.sub,
            email: info.email,
            name: info.name,
        }
    }
}

pub struct Auth0Provider {
    domain: String,
    client_id: String,
    oauth_client: ConfiguredOAuthClient,
    http_client: reqwest::Client,
}

/// Initialize OAuth2 client for an Auth0 tenant
fn create_oauth_client(
    domain: &str,
    client_id: &str,
    client_secret: &str,
    redirect_uri: &str,
) -> Result<ConfiguredOAuthClient, String> {
    let auth_url = AuthUrl::new(format!("{}/authorize", domain))
        .map_err(|e| format!("Invalid auth URL: {}", e))?;

    let token_url = TokenUrl::new(format!("{}/oauth/token", domain))
        .map_err(|e| format!("Invalid token URL: {}", e))?;

    let redirect_url = RedirectUrl::new(redirect_uri.to_string())
        .map_err(|e| format!("Invalid redirect URL: {}", e))?;

    Ok(BasicClient::new(ClientId::new(client_id.to_string()))
        .set_client_secret(ClientSecret::new(client_secret.to_string()))
        .set_auth_uri(auth_url)
        .set_token_uri(token_url)
        .set_redirect_uri(redirect_url))
}

impl Auth0Provider {
    pub fn new(config: &Config, http_client: reqwest::Client) -> Result<Self, AuthProviderError> {
        let oauth_client = create_oauth_client(
            &config.auth0_domain,
            &config.auth0_client_id,
            &config.auth0_client_secret,
            &config.auth0_redirect_uri,
        )
        .map_err(AuthProviderError::Config)?;

        tracing::info!(
            domain = %config.auth0_domain,
            redirect_uri = %config.auth0_redirect_uri,
            "Auth0 provider configured"
        );

        Ok(Self {
            domain: config.auth0_domain.clone(),
            client_id: config.auth0_client_id.clone(),
            oauth_client,
            http_client,
        })
    }

    async fn fetch_user_info(&self, access_token: &str) -> Result<UserInfo, AuthProviderError> {
        let response = self
            .http_client
            .get(format!("{}/userinfo", self.domain))
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(|e| AuthProviderError::UserInfo(e.to_string()))?;

        if !response.status().is_success() {
            return Err(AuthProviderError::UserInfo(format!(
                "HTTP {}",
                response.status()
            )));
        }

        response
            .json::<UserInfo>()
            .await
            .map_err(|e| AuthProviderError::UserInfo(e.to_string()))
    }
}

#[async_trait]
impl AuthProvider for Auth0Provider {
    fn id(&self) -> &str {
        AUTH0_PROVIDER_ID
    }

    fn authorize(&self) -> Result<AuthorizationRequest, AuthProviderError> {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (url, csrf_token) = self
            .oauth_client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("openid".to_string()))
            .add_scope(Scope::new("profile".to_string()))
            .add_scope(Scope::new("email".to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        Ok(AuthorizationRequest {
            url: url.to_string(),
            csrf_state: csrf_token.secret().clone(),
            pkce_verifier: pkce_verifier.secret().clone(),
        })
    }

    async fn complete_sign_in(
        &self,
        code: &str,
        pkce_verifier: &str,
    ) -> Result<AuthenticatedIdentity, AuthProviderError> {
        tracing::info!("Exchanging authorization code for tokens");

        let token_response = self
            .oauth_client
            .exchange_code(AuthorizationCode::new(code.to_string()))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier.to_string()))
            .request_async(&self.http_client)
            .await
            .map_err(|e| AuthProviderError::TokenExchange(e.to_string()))?;

        let user_info = self
            .fetch_user_info(token_response.access_token().secret())
            .await?;

        tracing::info!(
            sub = %user_info.sub,
            has_email = user_info.email.is_some(),
            "Auth0 user info retrieved"
        );

        Ok(AuthenticatedIdentity {
            user: user_info.into(),
            expires_in: token_response.expires_in(),
        })
    }

    fn sign_out_url(&self, redirect_target: &str) -> String {
        format!(
            "{}/v2/logout?client_id={}&returnTo={}",
            self.domain,
            urlencoding::encode(&self.client_id),
            urlencoding::encode(redirect_target)
        )
    }
}
