//! Reports dashboard library
//!
//! Provides the core functionality for the reports dashboard web service.

#![deny(dead_code)]

pub mod auth;
pub mod config;
pub mod reports;
pub mod web;

use auth::{AuthProviders, SessionStore};
use config::Config;
use reports::ReportStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    /// Registered identity providers, keyed by id
    pub providers: AuthProviders,
    pub sessions: Arc<SessionStore>,
    pub reports: Arc<dyn ReportStore>,
}
