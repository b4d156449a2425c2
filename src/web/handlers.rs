use super::templates::{DashboardTemplate, LoginTemplate};
use crate::{
    auth::{
        auth0::AUTH0_PROVIDER_ID,
        extractors::{ClientContext, CurrentSession, SessionGate},
        helpers::{context_cookie, header_value, new_context_id, DEFAULT_CALLBACK},
    },
    reports::{fetch_reports, view::display_offset, ReportsView},
    AppState,
};
use askama::Template;
use axum::extract::State;
use axum::http::{
    header::{CACHE_CONTROL, SET_COOKIE},
    HeaderValue, StatusCode,
};
use axum::response::{Html, IntoResponse, Redirect, Response};
use std::sync::Arc;

/// Liveness probe - always returns OK if the process is running
pub async fn healthz_handler() -> impl IntoResponse {
    StatusCode::OK
}

fn render<T: Template>(template: &T) -> Response {
    match template.render() {
        Ok(html) => Html(html).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Template rendering failed");
            (StatusCode::INTERNAL_SERVER_ERROR, "Template error").into_response()
        }
    }
}

/// Entry page: sign-in call to action, or straight to the dashboard when signed in
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    CurrentSession(session): CurrentSession,
    ClientContext(context): ClientContext,
) -> Response {
    if session.is_some() {
        tracing::debug!("Session already present, redirecting to dashboard");
        return Redirect::to(DEFAULT_CALLBACK).into_response();
    }

    let template = LoginTemplate {
        provider_id: AUTH0_PROVIDER_ID.to_string(),
        callback_url: DEFAULT_CALLBACK.to_string(),
    };
    let mut response = render(&template);

    // The page subscribes to session changes under this browser context
    if context.is_none() {
        let cookie = context_cookie(&state.config, &new_context_id());
        if let Ok(value) = header_value(&cookie) {
            response.headers_mut().append(SET_COOKIE, value);
        }
    }

    response
}

/// Protected dashboard: header with identity and logout, body with the reports panel
pub async fn dashboard_handler(
    State(state): State<Arc<AppState>>,
    SessionGate(gate): SessionGate,
) -> Result<Response, Response> {
    let session = gate.pass()?;

    let result = fetch_reports(state.reports.as_ref()).await;
    let reports = ReportsView::from_fetch(
        result,
        &display_offset(state.config.display_utc_offset_minutes),
    );

    tracing::debug!(
        user = %session.user.id,
        cards = reports.card_count(),
        "Rendering dashboard"
    );

    let template = DashboardTemplate {
        user_identity: session.user.display_identity().to_string(),
        reports,
    };

    let mut response = render(&template);
    response
        .headers_mut()
        .insert(CACHE_CONTROL, HeaderValue::from_static("no-store"));
    Ok(response)
}
