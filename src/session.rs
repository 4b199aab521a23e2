//! Signed-in user state, shared explicitly with every screen that needs it.
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::sync::{Arc, PoisonError, RwLock};
use thiserror::Error;
use tokio::sync::watch;
use tracing::{info, instrument, warn};

use crate::api::model::LoginResponse;
use crate::api::{ApiError, AuthService};
use crate::model::Role;

/// Shown when nobody is signed in or the server sent no name.
pub const DEFAULT_DISPLAY_NAME: &str = "User";

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("username and password are required")]
    MissingCredentials,
    #[error("login rejected: {0}")]
    Rejected(String),
    #[error("unknown role '{0}'")]
    UnknownRole(String),
    #[error(transparent)]
    Api(ApiError),
    #[error("session token cannot be decoded")]
    MalformedToken,
    #[error("session expired")]
    Expired,
    #[error("not signed in")]
    SignedOut,
}

impl AuthError {
    pub fn display_message(&self) -> String {
        match self {
            AuthError::MissingCredentials => "Username and password are required.".to_string(),
            AuthError::Rejected(msg) => msg.clone(),
            AuthError::UnknownRole(role) => format!("Unknown role: {}", role),
            AuthError::Api(e) => e.display_message(),
            AuthError::MalformedToken | AuthError::Expired => {
                "Your session has expired. Please sign in again.".to_string()
            }
            AuthError::SignedOut => "Please sign in first.".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub role: Role,
    pub user_id: Option<String>,
    pub username: String,
    pub name: Option<String>,
}

impl Session {
    /// `username` is the fallback when the server echoes no username.
    pub fn from_login(res: LoginResponse, username: &str) -> Result<Self, AuthError> {
        let role = Role::from_name(&res.role)
            .ok_or_else(|| AuthError::UnknownRole(res.role.clone()))?;
        let user_id = res.account_id().map(str::to_string);
        Ok(Self {
            token: res.token,
            role,
            user_id,
            username: res
                .username
                .filter(|u| !u.trim().is_empty())
                .unwrap_or_else(|| username.to_string()),
            name: res.name.filter(|n| !n.trim().is_empty()),
        })
    }

    pub fn display_name(&self) -> String {
        self.name
            .clone()
            .unwrap_or_else(|| self.username.clone())
    }
}

/// Expiry time carried in the token's `exp` claim. `Ok(None)` when the claim
/// is absent. The signature is not checked.
pub fn token_expiry(token: &str) -> Result<Option<DateTime<Utc>>, AuthError> {
    let mut parts = token.split('.');
    let payload = match (parts.next(), parts.next(), parts.next()) {
        (Some(_), Some(payload), Some(_)) => payload,
        _ => return Err(AuthError::MalformedToken),
    };
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| AuthError::MalformedToken)?;
    let claims: Value = serde_json::from_slice(&bytes).map_err(|_| AuthError::MalformedToken)?;
    let Some(exp) = claims.get("exp") else {
        return Ok(None);
    };
    let secs = exp
        .as_i64()
        .or_else(|| exp.as_f64().map(|f| f as i64))
        .ok_or(AuthError::MalformedToken)?;
    Utc.timestamp_opt(secs, 0)
        .single()
        .map(Some)
        .ok_or(AuthError::MalformedToken)
}

/// Undecodable tokens count as expired.
pub fn is_token_expired(token: &str, now: DateTime<Utc>) -> bool {
    match token_expiry(token) {
        Ok(Some(exp)) => now >= exp,
        Ok(None) => false,
        Err(_) => true,
    }
}

struct Inner {
    session: RwLock<Option<Session>>,
    display_name: watch::Sender<String>,
}

/// Cheap to clone; clones share the same session.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("signed_in", &self.current().is_some())
            .field("display_name", &self.display_name())
            .finish()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let (display_name, _) = watch::channel(DEFAULT_DISPLAY_NAME.to_string());
        Self {
            inner: Arc::new(Inner {
                session: RwLock::new(None),
                display_name,
            }),
        }
    }

    pub fn begin(&self, session: Session) {
        let name = session.display_name();
        *self
            .inner
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner) = Some(session);
        self.inner.display_name.send_replace(name);
    }

    pub fn clear(&self) {
        self.inner
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        self.inner
            .display_name
            .send_replace(DEFAULT_DISPLAY_NAME.to_string());
    }

    pub fn current(&self) -> Option<Session> {
        self.inner
            .session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn role(&self) -> Option<Role> {
        self.current().map(|s| s.role)
    }

    pub fn token(&self) -> Option<String> {
        self.current().map(|s| s.token)
    }

    pub fn user_id(&self) -> Option<String> {
        self.current().and_then(|s| s.user_id)
    }

    pub fn display_name(&self) -> String {
        self.inner.display_name.borrow().clone()
    }

    /// Publish a new display name after an in-place profile edit.
    pub fn update_display_name(&self, name: &str) {
        let name = name.trim();
        if name.is_empty() {
            return;
        }
        if let Some(session) = self
            .inner
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .as_mut()
        {
            session.name = Some(name.to_string());
        }
        self.inner.display_name.send_replace(name.to_string());
    }

    pub fn subscribe(&self) -> DisplayNameSubscription {
        DisplayNameSubscription {
            rx: self.inner.display_name.subscribe(),
        }
    }

    /// Current session if its token is still valid; an expired session is
    /// cleared.
    pub fn ensure_valid(&self, now: DateTime<Utc>) -> Result<Session, AuthError> {
        let session = self.current().ok_or(AuthError::SignedOut)?;
        if is_token_expired(&session.token, now) {
            warn!("session token expired; signing out");
            self.clear();
            return Err(AuthError::Expired);
        }
        Ok(session)
    }
}

/// Receiving side of the display-name feed.
#[derive(Debug, Clone)]
pub struct DisplayNameSubscription {
    rx: watch::Receiver<String>,
}

impl DisplayNameSubscription {
    pub fn current(&self) -> String {
        self.rx.borrow().clone()
    }

    /// Waits for the next published name. `None` once the store is gone.
    pub async fn changed(&mut self) -> Option<String> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }
}

/// Authenticate and start a session on `store`.
#[instrument(skip_all, fields(username = %username))]
pub async fn login<A: AuthService + ?Sized>(
    auth: &A,
    store: &SessionStore,
    username: &str,
    password: &str,
) -> Result<Session, AuthError> {
    let username = username.trim();
    if username.is_empty() || password.is_empty() {
        return Err(AuthError::MissingCredentials);
    }

    let res = auth.login(username, password).await.map_err(|err| match err {
        ApiError::Server {
            status: 400 | 401 | 403,
            message,
        } => AuthError::Rejected(message),
        other => AuthError::Api(other),
    })?;

    let session = Session::from_login(res, username)?;
    info!(role = session.role.as_str(), "signed in");
    store.begin(session.clone());
    Ok(session)
}
