//! Process-wide session state
//!
//! Sessions are keyed by an opaque random token (the `session_token` cookie).
//! Each session also remembers the browser context (`client_context` cookie) it
//! was established from, so pages open in that browser can subscribe to
//! sign-in/sign-out notifications without holding a session themselves.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::{watch, RwLock};

/// Identity fields consumed by the views
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionUser {
    /// Provider subject (`sub`)
    pub id: String,
    pub email: Option<String>,
    pub name: Option<String>,
}

impl SessionUser {
    /// Best human-readable identifier: email, then name, then subject
    pub fn display_identity(&self) -> &str {
        self.email
            .as_deref()
            .or(self.name.as_deref())
            .unwrap_or(&self.id)
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    #[serde(skip)]
    pub token: String,
    #[serde(skip)]
    pub context: Option<String>,
    pub provider: String,
    pub user: SessionUser,
    pub expires: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires <= Utc::now()
    }

    /// Seconds left, for cookie Max-Age
    pub fn remaining_secs(&self) -> i64 {
        (self.expires - Utc::now()).num_seconds().max(0)
    }
}

/// Session state as observed by a browser context
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Anonymous,
    Authenticated,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Anonymous => "anonymous",
            SessionStatus::Authenticated => "authenticated",
        }
    }
}

type Watchers = Arc<Mutex<HashMap<String, watch::Sender<SessionStatus>>>>;

fn lock(watchers: &Watchers) -> MutexGuard<'_, HashMap<String, watch::Sender<SessionStatus>>> {
    // A panicked notifier leaves the map itself consistent
    watchers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[derive(Default)]
pub struct SessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    watchers: Watchers,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a session for a freshly authenticated user and notify its browser context
    pub async fn establish(
        &self,
        context: Option<&str>,
        provider: &str,
        user: SessionUser,
        lifetime: Duration,
    ) -> Session {
        let session = Session {
            token: uuid::Uuid::new_v4().simple().to_string(),
            context: context.map(str::to_string),
            provider: provider.to_string(),
            user,
            expires: Utc::now()
                .checked_add_signed(lifetime)
                .unwrap_or(DateTime::<Utc>::MAX_UTC),
        };

        self.sessions
            .write()
            .await
            .insert(session.token.clone(), session.clone());

        tracing::info!(
            event = "session_established",
            provider = %session.provider,
            user = %session.user.id,
            expires = %session.expires,
            "Session established"
        );

        if let Some(context) = context {
            self.notify(context, SessionStatus::Authenticated);
        }

        session
    }

    /// Look up a live session; expired sessions are purged and reported as absent
    pub async fn get(&self, token: &str) -> Option<Session> {
        let session = self.sessions.read().await.get(token).cloned()?;

        if session.is_expired() {
            tracing::debug!(user = %session.user.id, "Session expired, removing");
            self.sessions.write().await.remove(token);
            return None;
        }

        Some(session)
    }

    /// Remove a session; the browser context is told it is anonymous again
    pub async fn terminate(&self, token: &str) -> Option<Session> {
        let removed = self.sessions.write().await.remove(token)?;

        tracing::info!(
            event = "session_terminated",
            user = %removed.user.id,
            "Session terminated"
        );

        if let Some(context) = removed.context.as_deref() {
            if self.status_for_context(context).await == SessionStatus::Anonymous {
                self.notify(context, SessionStatus::Anonymous);
            }
        }

        Some(removed)
    }

    /// Drop every expired session; returns how many were removed
    pub async fn purge_expired(&self) -> usize {
        let mut sessions = self.sessions.write().await;
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired());
        before - sessions.len()
    }

    #[cfg(test)]
    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    #[cfg(test)]
    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }

    pub async fn status_for_context(&self, context: &str) -> SessionStatus {
        let live = self
            .sessions
            .read()
            .await
            .values()
            .any(|s| s.context.as_deref() == Some(context) && !s.is_expired());

        if live {
            SessionStatus::Authenticated
        } else {
            SessionStatus::Anonymous
        }
    }

    /// Watch session changes for a browser context until the subscription is dropped
    ///
    /// The channel is registered before the session map is read, so a sign-in
    /// racing with the subscription is seen either here or through `notify`.
    pub async fn subscribe(&self, context: &str) -> SessionSubscription {
        let receiver = lock(&self.watchers)
            .entry(context.to_string())
            .or_insert_with(|| watch::channel(SessionStatus::Anonymous).0)
            .subscribe();

        let subscription = SessionSubscription {
            context: context.to_string(),
            receiver,
            watchers: self.watchers.clone(),
        };

        if self.status_for_context(context).await == SessionStatus::Authenticated {
            // Only ever raised here; lowering is left to `terminate`
            if let Some(sender) = lock(&self.watchers).get(context) {
                sender.send_if_modified(|status| {
                    let modified = *status != SessionStatus::Authenticated;
                    *status = SessionStatus::Authenticated;
                    modified
                });
            }
        }

        tracing::debug!(context = %context, "Session subscription opened");

        subscription
    }

    /// Number of browser contexts with at least one open subscription
    pub fn watched_contexts(&self) -> usize {
        lock(&self.watchers).len()
    }

    fn notify(&self, context: &str, status: SessionStatus) {
        if let Some(sender) = lock(&self.watchers).get(context) {
            sender.send_replace(status);
        }
    }
}

/// Live view of one browser context's session status
///
/// Dropping the subscription unsubscribes; the channel is released once the
/// last subscriber for the context is gone.
pub struct SessionSubscription {
    context: String,
    receiver: watch::Receiver<SessionStatus>,
    watchers: Watchers,
}

impl SessionSubscription {
    #[cfg(test)]
    pub fn current(&self) -> SessionStatus {
        *self.receiver.borrow()
    }

    /// Wait for the next status change; `None` if the store went away
    pub async fn changed(&mut self) -> Option<SessionStatus> {
        self.receiver.changed().await.ok()?;
        Some(*self.receiver.borrow_and_update())
    }

    /// Resolve once the context is authenticated (immediately if it already is)
    pub async fn authenticated(&mut self) -> Option<()> {
        if *self.receiver.borrow_and_update() == SessionStatus::Authenticated {
            return Some(());
        }
        loop {
            if self.changed().await? == SessionStatus::Authenticated {
                return Some(());
            }
        }
    }
}

impl Drop for SessionSubscription {
    fn drop(&mut self) {
        let mut watchers = lock(&self.watchers);
        // Our own receiver is still alive here, so 1 means we are the last one
        let last = watchers
            .get(&self.context)
            .map(|sender| sender.receiver_count() <= 1)
            .unwrap_or(false);
        if last {
            watchers.remove(&self.context);
        }
        tracing::debug!(context = %self.context, released = last, "Session subscription closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str) -> SessionUser {
        SessionUser {
            id: format!("auth0|{}", email),
            email: Some(email.to_string()),
            name: None,
        }
    }

    #[tokio::test]
    async fn test_establish_and_get() {
        let store = SessionStore::new();
        let session = store
            .establish(None, "auth0", user("ana@example.com"), Duration::hours(1))
            .await;

        assert_eq!(session.token.len(), 32);
        let found = store.get(&session.token).await.unwrap();
        assert_eq!(found.user.display_identity(), "ana@example.com");
        assert!(store.get("unknown").await.is_none());
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let store = SessionStore::new();
        let a = store
            .establish(None, "auth0", user("a@example.com"), Duration::hours(1))
            .await;
        let b = store
            .establish(None, "auth0", user("a@example.com"), Duration::hours(1))
            .await;
        assert_ne!(a.token, b.token);
        assert_eq!(store.len().await, 2);
    }

    #[tokio::test]
    async fn test_expired_session_is_absent_and_purged() {
        let store = SessionStore::new();
        let session = store
            .establish(None, "auth0", user("a@example.com"), Duration::seconds(-1))
            .await;

        assert!(store.get(&session.token).await.is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let store = SessionStore::new();
        store
            .establish(None, "auth0", user("old@example.com"), Duration::seconds(-1))
            .await;
        store
            .establish(None, "auth0", user("new@example.com"), Duration::hours(1))
            .await;

        assert_eq!(store.purge_expired().await, 1);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_terminate() {
        let store = SessionStore::new();
        let session = store
            .establish(None, "auth0", user("a@example.com"), Duration::hours(1))
            .await;

        assert!(store.terminate(&session.token).await.is_some());
        assert!(store.get(&session.token).await.is_none());
        assert!(store.terminate(&session.token).await.is_none());
    }

    #[tokio::test]
    async fn test_subscription_sees_sign_in() {
        let store = SessionStore::new();
        let mut sub = store.subscribe("ctx-1").await;
        assert_eq!(sub.current(), SessionStatus::Anonymous);

        store
            .establish(Some("ctx-1"), "auth0", user("a@example.com"), Duration::hours(1))
            .await;

        assert_eq!(sub.changed().await, Some(SessionStatus::Authenticated));
    }

    #[tokio::test]
    async fn test_subscription_ignores_other_contexts() {
        let store = SessionStore::new();
        let sub = store.subscribe("ctx-1").await;

        store
            .establish(Some("ctx-2"), "auth0", user("a@example.com"), Duration::hours(1))
            .await;

        assert_eq!(sub.current(), SessionStatus::Anonymous);
    }

    #[tokio::test]
    async fn test_subscribe_after_sign_in_is_authenticated() {
        let store = SessionStore::new();
        store
            .establish(Some("ctx-1"), "auth0", user("a@example.com"), Duration::hours(1))
            .await;

        let mut sub = store.subscribe("ctx-1").await;
        assert_eq!(sub.current(), SessionStatus::Authenticated);
        assert_eq!(sub.authenticated().await, Some(()));
    }

    #[tokio::test]
    async fn test_subscription_sees_sign_out() {
        let store = SessionStore::new();
        let session = store
            .establish(Some("ctx-1"), "auth0", user("a@example.com"), Duration::hours(1))
            .await;
        let mut sub = store.subscribe("ctx-1").await;

        store.terminate(&session.token).await;
        assert_eq!(sub.changed().await, Some(SessionStatus::Anonymous));
    }

    #[tokio::test]
    async fn test_drop_unsubscribes() {
        let store = SessionStore::new();
        let first = store.subscribe("ctx-1").await;
        let second = store.subscribe("ctx-1").await;
        assert_eq!(store.watched_contexts(), 1);

        drop(first);
        assert_eq!(store.watched_contexts(), 1);

        drop(second);
        assert_eq!(store.watched_contexts(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_sign_in_racing_subscribe_is_never_lost() {
        let store = Arc::new(SessionStore::new());

        for i in 0..2_000 {
            let context = format!("ctx-{}", i);

            let subscriber = {
                let store = store.clone();
                let context = context.clone();
                tokio::spawn(async move { store.subscribe(&context).await })
            };
            let signer = {
                let store = store.clone();
                let context = context.clone();
                tokio::spawn(async move {
                    store
                        .establish(Some(&context), "auth0", user("a@example.com"), Duration::hours(1))
                        .await
                })
            };

            signer.await.unwrap();
            let mut sub = subscriber.await.unwrap();

            assert_eq!(sub.current(), SessionStatus::Authenticated, "{}", context);
            let woke =
                tokio::time::timeout(std::time::Duration::from_secs(1), sub.authenticated()).await;
            assert_eq!(woke.unwrap(), Some(()), "{}", context);
        }
    }

    #[tokio::test]
    async fn test_oversized_lifetime_saturates_expiry() {
        let store = SessionStore::new();
        let session = store
            .establish(None, "auth0", user("a@example.com"), Duration::MAX)
            .await;

        assert_eq!(session.expires, DateTime::<Utc>::MAX_UTC);
        assert!(store.get(&session.token).await.is_some());
    }

    #[test]
    fn test_display_identity_fallbacks() {
        let mut u = SessionUser {
            id: "auth0|123".to_string(),
            email: None,
            name: Some("Ana".to_string()),
        };
        assert_eq!(u.display_identity(), "Ana");
        u.name = None;
        assert_eq!(u.display_identity(), "auth0|123");
    }
}
