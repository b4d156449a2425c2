use super::handlers::{dashboard_handler, healthz_handler, login_handler};
use crate::{
    auth::{
        callback_handler, session_events_handler, session_handler, sign_in_form_handler,
        sign_in_handler, sign_out_handler,
    },
    AppState,
};
use axum::{routing::get, Router};
use std::sync::Arc;
use tower_http::services::ServeDir;

pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(login_handler))
        .route("/healthz", get(healthz_handler))
        .route("/dashboard", get(dashboard_handler))
        .route(
            "/auth/signin/{provider}",
            get(sign_in_handler).post(sign_in_form_handler),
        )
        .route("/auth/callback/{provider}", get(callback_handler))
        // POST from the dashboard form; GET kept for plain links
        .route("/auth/signout", get(sign_out_handler).post(sign_out_handler))
        .route("/auth/session", get(session_handler))
        .route("/auth/session/events", get(session_events_handler))
        .nest_service("/static", ServeDir::new("static"))
        .with_state(state)
}
