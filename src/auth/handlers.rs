//! Authentication handlers for sign-in, callback, sign-out and session state
//!
//! - `sign_in_handler` / `sign_in_form_handler`: start the provider flow
//! - `callback_handler`: validate state, exchange the code, establish the session
//! - `sign_out_handler`: end the session and hand off to the provider's logout
//! - `session_handler`: JSON view of the current session
//! - `session_events_handler`: server-sent session changes for a browser context

use axum::{
    extract::{Path, Query, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Redirect, Response,
    },
    Form, Json,
};
use serde::Deserialize;
use std::convert::Infallible;
use std::sync::Arc;

use super::extractors::{ClientContext, CurrentSession};
use super::gate::ENTRY_ROUTE;
use super::helpers::{
    clear_cookie, context_cookie, extract_cookie, flow_cookie, header_value, new_context_id,
    sanitize_callback_url, session_cookie, CALLBACK_COOKIE, PKCE_COOKIE, SESSION_COOKIE,
    STATE_COOKIE,
};
use super::session::SessionStatus;
use crate::AppState;

// =============================================================================
// Types
// =============================================================================

#[derive(Debug, Default, Deserialize)]
pub struct SignInParams {
    #[serde(rename = "callbackUrl")]
    pub callback_url: Option<String>,
}

#[derive(Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

// =============================================================================
// Internal Helpers
// =============================================================================

fn json_error(status: StatusCode, error: &str) -> Response {
    (status, Json(serde_json::json!({ "error": error }))).into_response()
}

/// Append Set-Cookie headers; a value that cannot be a header fails the response
fn with_cookies(mut response: Response, cookies: &[String]) -> Response {
    for cookie in cookies {
        match header_value(cookie) {
            Ok(value) => {
                response.headers_mut().append(SET_COOKIE, value);
            }
            Err(_) => {
                return json_error(
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal error setting response headers",
                )
            }
        }
    }
    response
}

// =============================================================================
// Handlers
// =============================================================================

/// `GET /auth/signin/{provider}?callbackUrl=...`
pub async fn sign_in_handler(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    context: ClientContext,
    Query(params): Query<SignInParams>,
) -> Response {
    start_sign_in(&state, &provider, context, params)
}

/// `POST /auth/signin/{provider}` with form field `callbackUrl`
pub async fn sign_in_form_handler(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    context: ClientContext,
    Form(params): Form<SignInParams>,
) -> Response {
    start_sign_in(&state, &provider, context, params)
}

fn start_sign_in(
    state: &AppState,
    provider: &str,
    ClientContext(context): ClientContext,
    params: SignInParams,
) -> Response {
    let redirect_target = sanitize_callback_url(params.callback_url.as_deref());

    tracing::info!(
        provider = %provider,
        callback_url = %redirect_target,
        "Sign-in requested"
    );

    let start = match state.providers.sign_in(provider, &redirect_target) {
        Ok(Some(start)) => start,
        Ok(None) => {
            tracing::warn!(provider = %provider, "Unknown sign-in provider");
            return json_error(StatusCode::NOT_FOUND, "Unknown provider");
        }
        Err(e) => {
            tracing::error!(provider = %provider, error = %e, "Failed to start sign-in");
            return json_error(StatusCode::INTERNAL_SERVER_ERROR, "OAuth configuration error");
        }
    };

    let config = &state.config;
    let mut cookies = vec![
        flow_cookie(config, STATE_COOKIE, &start.request.csrf_state),
        flow_cookie(config, PKCE_COOKIE, &start.request.pkce_verifier),
        flow_cookie(
            config,
            CALLBACK_COOKIE,
            &urlencoding::encode(&start.redirect_target),
        ),
    ];
    // The callback ties the new session to this browser context
    if context.is_none() {
        cookies.push(context_cookie(config, &new_context_id()));
    }

    tracing::info!(provider = %start.provider, "Redirecting to identity provider");

    with_cookies(Redirect::to(&start.request.url).into_response(), &cookies)
}

/// `GET /auth/callback/{provider}` - provider callback and session establishment
pub async fn callback_handler(
    State(state): State<Arc<AppState>>,
    Path(provider_id): Path<String>,
    Query(params): Query<CallbackParams>,
    ClientContext(context): ClientContext,
    headers: HeaderMap,
) -> Response {
    tracing::info!(provider = %provider_id, "OAuth callback received");

    // Check for OAuth errors
    if let Some(error) = params.error {
        tracing::warn!(
            error = %error,
            description = ?params.error_description,
            "OAuth authorization failed"
        );
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({
                "error": error,
                "error_description": params.error_description
            })),
        )
            .into_response();
    }

    let Some(provider) = state.providers.get(&provider_id) else {
        tracing::warn!(provider = %provider_id, "Callback for unknown provider");
        return json_error(StatusCode::NOT_FOUND, "Unknown provider");
    };

    // CSRF Protection: Validate state parameter matches stored cookie
    let Some(state_from_callback) = params.state else {
        tracing::warn!("CSRF validation failed: No state parameter in callback");
        return json_error(StatusCode::BAD_REQUEST, "Missing state parameter");
    };

    let Some(stored_state) = extract_cookie(&headers, STATE_COOKIE) else {
        tracing::warn!(
            has_cookie_header = headers.get("cookie").is_some(),
            "CSRF validation failed: No oauth_state cookie found"
        );
        return json_error(
            StatusCode::UNAUTHORIZED,
            "CSRF validation failed: missing state cookie",
        );
    };

    if state_from_callback != stored_state {
        tracing::warn!("CSRF validation failed: State mismatch (callback vs cookie)");
        return json_error(StatusCode::UNAUTHORIZED, "CSRF validation failed: state mismatch");
    }

    let Some(code) = params.code else {
        tracing::warn!("No authorization code received");
        return json_error(StatusCode::BAD_REQUEST, "Missing authorization code");
    };

    let Some(pkce_verifier) = extract_cookie(&headers, PKCE_COOKIE) else {
        tracing::warn!("No PKCE verifier cookie found");
        return json_error(StatusCode::UNAUTHORIZED, "Missing PKCE verifier");
    };

    let identity = match provider.complete_sign_in(&code, &pkce_verifier).await {
        Ok(identity) => identity,
        Err(e) => {
            tracing::error!(provider = %provider_id, error = %e, "Sign-in could not be completed");
            return json_error(StatusCode::BAD_GATEWAY, "Sign-in failed");
        }
    };

    tracing::debug!(
        provider_expires_in = ?identity.expires_in,
        session_ttl_secs = state.config.session_ttl_secs,
        "Provider sign-in completed"
    );

    let context = context.unwrap_or_else(new_context_id);
    let session = state
        .sessions
        .establish(
            Some(&context),
            &provider_id,
            identity.user,
            state.config.session_lifetime(),
        )
        .await;

    let redirect_target = sanitize_callback_url(
        extract_cookie(&headers, CALLBACK_COOKIE)
            .and_then(|raw| urlencoding::decode(&raw).ok().map(|s| s.into_owned()))
            .as_deref(),
    );

    let config = &state.config;
    let cookies = [
        session_cookie(config, &session.token, session.remaining_secs()),
        context_cookie(config, &context),
        clear_cookie(config, STATE_COOKIE, "/auth"),
        clear_cookie(config, PKCE_COOKIE, "/auth"),
        clear_cookie(config, CALLBACK_COOKIE, "/auth"),
    ];

    tracing::info!(redirect_to = %redirect_target, "Authentication successful");
    with_cookies(Redirect::to(&redirect_target).into_response(), &cookies)
}

/// `POST /auth/signout` - end the session, then the provider's session
///
/// Works without a session too: cookies are cleared and the browser returns
/// to the entry route.
pub async fn sign_out_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Response {
    let token = extract_cookie(&headers, SESSION_COOKIE);
    let terminated = match token {
        Some(token) => state.sessions.terminate(&token).await,
        None => None,
    };

    let redirect_target = match &terminated {
        Some(session) => {
            let return_to = state.config.absolute_url(ENTRY_ROUTE);
            tracing::info!(
                event = "sign_out",
                provider = %session.provider,
                "Redirecting to provider logout"
            );
            state.providers.sign_out(&session.provider, &return_to)
        }
        None => {
            tracing::info!(event = "sign_out_without_session", "Sign-out without a live session");
            ENTRY_ROUTE.to_string()
        }
    };

    let cookies = [clear_cookie(&state.config, SESSION_COOKIE, "/")];
    with_cookies(Redirect::to(&redirect_target).into_response(), &cookies)
}

/// `GET /auth/session` - `{}` when signed out, the session otherwise
pub async fn session_handler(CurrentSession(session): CurrentSession) -> Response {
    match session {
        Some(session) => Json(session).into_response(),
        None => Json(serde_json::json!({})).into_response(),
    }
}

/// `GET /auth/session/events` - one `session` event once this browser is signed in
///
/// The subscription lives as long as the stream; a client disconnect drops it.
pub async fn session_events_handler(
    State(state): State<Arc<AppState>>,
    ClientContext(context): ClientContext,
) -> Response {
    let Some(context) = context else {
        return json_error(StatusCode::BAD_REQUEST, "Missing client context");
    };

    let subscription = state.sessions.subscribe(&context).await;

    let stream = futures::stream::unfold(Some(subscription), |subscription| async move {
        let mut subscription = subscription?;
        subscription.authenticated().await?;
        let event = Event::default()
            .event("session")
            .data(SessionStatus::Authenticated.as_str());
        Some((Ok::<_, Infallible>(event), None))
    });

    Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response()
}
