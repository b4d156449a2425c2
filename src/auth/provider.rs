//! Identity provider abstraction
//!
//! Views and the session gate only see [`AuthProvider`]; concrete providers
//! (Auth0 today) are registered in [`AuthProviders`] under their id.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use super::session::SessionUser;

#[derive(Debug, thiserror::Error)]
pub enum AuthProviderError {
    #[error("provider configuration error: {0}")]
    Config(String),

    #[error("token exchange failed: {0}")]
    TokenExchange(String),

    #[error("user info request failed: {0}")]
    UserInfo(String),
}

/// Everything the browser needs to start an authorization-code flow
#[derive(Debug, Clone)]
pub struct AuthorizationRequest {
    pub url: String,
    /// CSRF `state` to echo back on callback
    pub csrf_state: String,
    /// PKCE verifier to present at token exchange
    pub pkce_verifier: String,
}

/// A started sign-in: provider request plus where to land afterwards
#[derive(Debug, Clone)]
pub struct SignInStart {
    pub provider: String,
    pub request: AuthorizationRequest,
    pub redirect_target: String,
}

/// Identity returned by a completed sign-in
#[derive(Debug, Clone)]
pub struct AuthenticatedIdentity {
    pub user: SessionUser,
    /// Lifetime granted by the provider, if it stated one
    pub expires_in: Option<Duration>,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Identifier used in routes (`/auth/signin/{id}`)
    fn id(&self) -> &str;

    /// Build the provider authorization URL
    fn authorize(&self) -> Result<AuthorizationRequest, AuthProviderError>;

    /// Exchange the callback code for an identity
    async fn complete_sign_in(
        &self,
        code: &str,
        pkce_verifier: &str,
    ) -> Result<AuthenticatedIdentity, AuthProviderError>;

    /// Provider end-session URL that returns the browser to `redirect_target` (absolute)
    fn sign_out_url(&self, redirect_target: &str) -> String;
}

#[derive(Default, Clone)]
pub struct AuthProviders {
    providers: HashMap<String, Arc<dyn AuthProvider>>,
}

impl AuthProviders {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(mut self, provider: Arc<dyn AuthProvider>) -> Self {
        self.providers.insert(provider.id().to_string(), provider);
        self
    }

    pub fn get(&self, id: &str) -> Option<Arc<dyn AuthProvider>> {
        self.providers.get(id).cloned()
    }

    /// Sign-in entry point: provider id plus post-login redirect target
    ///
    /// Returns `Ok(None)` for an unknown provider.
    pub fn sign_in(
        &self,
        provider_id: &str,
        redirect_target: &str,
    ) -> Result<Option<SignInStart>, AuthProviderError> {
        let Some(provider) = self.providers.get(provider_id) else {
            return Ok(None);
        };

        Ok(Some(SignInStart {
            provider: provider_id.to_string(),
            request: provider.authorize()?,
            redirect_target: redirect_target.to_string(),
        }))
    }

    /// Sign-out entry point; unknown providers fall back to a plain local redirect
    pub fn sign_out(&self, provider_id: &str, redirect_target: &str) -> String {
        match self.providers.get(provider_id) {
            Some(provider) => provider.sign_out_url(redirect_target),
            None => redirect_target.to_string(),
        }
    }

    pub fn ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }
}


#[cfg(test)]
mod tests {
    use super::stub::StubProvider;
    use super::*;

    fn providers() -> AuthProviders {
        AuthProviders::new().register(Arc::new(StubProvider::new("ana@example.com")))
    }

    #[test]
    fn test_sign_in_known_provider() {
        let start = providers().sign_in("auth0", "/dashboard").unwrap().unwrap();
        assert_eq!(start.provider, "auth0");
        assert_eq!(start.redirect_target, "/dashboard");
        assert_eq!(start.request.csrf_state, "stub-state");
    }

    #[test]
    fn test_sign_in_unknown_provider() {
        assert!(providers().sign_in("github", "/dashboard").unwrap().is_none());
    }

    #[test]
    fn test_sign_out_routes_through_provider() {
        let url = providers().sign_out("auth0", "http://localhost:3000/");
        assert_eq!(
            url,
            "https://idp.test/logout?returnTo=http%3A%2F%2Flocalhost%3A3000%2F"
        );
        assert_eq!(
            providers().sign_out("github", "http://localhost:3000/"),
            "http://localhost:3000/"
        );
    }

    #[test]
    fn test_ids() {
        assert_eq!(providers().ids(), vec!["auth0"]);
    }
}
