use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::cookie::{Cookie, PrivateCookieJar, SameSite};
use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{error::AppError, models::user::ProviderSession, state::AppState};

pub const SESSION_COOKIE: &str = "wanderlog_session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub id: String,
    pub email: String,
    pub display_name: String,
    pub access_token: String,
}

impl From<ProviderSession> for AuthenticatedUser {
    fn from(session: ProviderSession) -> Self {
        Self {
            display_name: session.user.display_name_text().to_string(),
            id: session.user.id,
            email: session.user.email,
            access_token: session.access_token,
        }
    }
}

/// Live session contexts keyed by the id stored in the private cookie.
///
/// A context is populated on login or signup and removed on logout.
#[derive(Clone, Default)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, AuthenticatedUser>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn insert(&self, user: AuthenticatedUser) -> String {
        let session_id = Uuid::new_v4().to_string();
        self.sessions.write().await.insert(session_id.clone(), user);
        session_id
    }

    pub async fn get(&self, session_id: &str) -> Option<AuthenticatedUser> {
        self.sessions.read().await.get(session_id).cloned()
    }

    pub async fn remove(&self, session_id: &str) -> Option<AuthenticatedUser> {
        self.sessions.write().await.remove(session_id)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurrentUser(pub Option<AuthenticatedUser>);

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let jar = PrivateCookieJar::from_headers(&parts.headers, state.cookie_key.clone());
        let Some(cookie) = jar.get(SESSION_COOKIE) else {
            return Ok(Self(None));
        };
        Ok(Self(state.sessions.get(cookie.value()).await))
    }
}

impl CurrentUser {
    pub fn require_user(&self) -> Result<&AuthenticatedUser, AppError> {
        self.0.as_ref().ok_or(AppError::Unauthorized)
    }
}

pub async fn authenticate_user(
    state: &AppState,
    email: &str,
    password: &str,
) -> Result<AuthenticatedUser, AppError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest(
            "Please enter your email and password.".into(),
        ));
    }
    let session = state.auth.login(email, password).await?;
    info!(user = %session.user.id, "user logged in");
    Ok(session.into())
}

pub async fn register_user(
    state: &AppState,
    email: &str,
    password: &str,
    display_name: Option<&str>,
) -> Result<AuthenticatedUser, AppError> {
    let email = email.trim();
    if email.is_empty() || password.is_empty() {
        return Err(AppError::BadRequest(
            "Please enter your email and password.".into(),
        ));
    }
    let display_name = display_name.map(str::trim).filter(|name| !name.is_empty());
    let session = state.auth.signup(email, password, display_name).await?;
    info!(user = %session.user.id, "user signed up");
    Ok(session.into())
}

pub async fn create_session(state: &AppState, user: AuthenticatedUser) -> String {
    state.sessions.insert(user).await
}

pub async fn destroy_session(state: &AppState, session_id: &str) -> Result<(), AppError> {
    let Some(user) = state.sessions.remove(session_id).await else {
        return Ok(());
    };
    state.forms.discard_owned_by(&user.id).await;
    if let Err(err) = state.auth.logout(&user.access_token).await {
        // The local context is already gone; the provider token simply expires.
        warn!(user = %user.id, "provider logout failed: {err}");
    }
    Ok(())
}

pub fn apply_session_cookie(jar: PrivateCookieJar, session_id: &str) -> PrivateCookieJar {
    jar.add(
        Cookie::build((SESSION_COOKIE, session_id.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax),
    )
}

pub fn clear_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
}
