//! Session gate for protected pages
//!
//! The guard runs before a protected view builds anything and yields exactly
//! one instruction: render with the session, or redirect to the entry route.
//! An absent or expired session is a routing decision, not an error.

use axum::response::{IntoResponse, Redirect, Response};

use super::session::Session;

/// Entry / login route unauthenticated callers are sent to
pub const ENTRY_ROUTE: &str = "/";

#[derive(Debug)]
pub enum Gate {
    Pass(Session),
    Redirect(&'static str),
}

pub fn guard(session: Option<Session>) -> Gate {
    match session {
        Some(session) => Gate::Pass(session),
        None => Gate::Redirect(ENTRY_ROUTE),
    }
}

impl Gate {
    /// The session to render with, or the redirect response to send instead
    pub fn pass(self) -> Result<Session, Response> {
        match self {
            Gate::Pass(session) => Ok(session),
            Gate::Redirect(to) => {
                tracing::debug!(redirect_to = to, "No session, redirecting");
                Err(Redirect::to(to).into_response())
            }
        }
    }
}
