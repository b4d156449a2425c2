//! Authentication module
//!
//! Sign-in is delegated to an external identity provider; this module only
//! runs the OAuth2 round trip and keeps the resulting sessions.
//!
//! ## Structure
//!
//! - `provider`: the `AuthProvider` trait and provider registry
//! - `auth0`: Auth0 implementation of `AuthProvider`
//! - `session`: session store and per-browser session subscriptions
//! - `gate`: guard deciding between rendering and redirecting
//! - `extractors`: Axum extractors for the current session and gate
//! - `helpers`: cookie, redirect-target and HTTP client helpers
//! - `handlers`: HTTP handlers for sign-in, callback, sign-out and session state
//!
//! ## Authentication Flow
//!
//! 1. User submits the login form → `/auth/signin/auth0` → redirect to Auth0
//! 2. Auth0 authenticates → redirect to `/auth/callback/auth0`
//! 3. Code exchanged, user info fetched, session stored → cookie set → redirect to `/dashboard`
//! 4. User submits `/auth/signout` → session removed → Auth0 logout → back to `/`

pub mod auth0;
pub mod extractors;
pub mod gate;
pub mod handlers;
pub mod helpers;
pub mod provider;
pub mod session;

// Re-export handlers for convenient routing
pub use handlers::{
    callback_handler, session_events_handler, session_handler, sign_in_form_handler,
    sign_in_handler, sign_out_handler, CallbackParams, SignInParams,
};

pub use gate::{guard, Gate, ENTRY_ROUTE};
pub use provider::{AuthProvider, AuthProviderError, AuthProviders};
pub use session::{Session, SessionStatus, SessionStore, SessionUser};
