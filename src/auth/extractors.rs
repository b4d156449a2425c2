use crate::auth::gate::{guard, Gate};
use crate::auth::helpers::{extract_cookie, CONTEXT_COOKIE, SESSION_COOKIE};
use crate::auth::session::Session;
use crate::AppState;
use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::convert::Infallible;
use std::sync::Arc;

/// The caller's live session, if any
///
/// Never rejects: a missing, unknown or expired `session_token` cookie simply
/// yields `None`.
pub struct CurrentSession(pub Option<Session>);

impl<S> FromRequestParts<S> for CurrentSession
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = Arc::<AppState>::from_ref(state);

        let Some(token) = extract_cookie(&parts.headers, SESSION_COOKIE) else {
            return Ok(CurrentSession(None));
        };

        let session = app_state.sessions.get(&token).await;
        if session.is_none() {
            tracing::debug!("Session cookie present but no live session");
        }

        Ok(CurrentSession(session))
    }
}

/// Gate outcome for protected handlers
pub struct SessionGate(pub Gate);

impl<S> FromRequestParts<S> for SessionGate
where
    Arc<AppState>: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let CurrentSession(session) = CurrentSession::from_request_parts(parts, state).await?;
        Ok(SessionGate(guard(session)))
    }
}

/// Browser context id from the `client_context` cookie
pub struct ClientContext(pub Option<String>);

impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(ClientContext(
            extract_cookie(&parts.headers, CONTEXT_COOKIE).filter(|c| !c.is_empty()),
        ))
    }
}
