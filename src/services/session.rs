use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Serialize;
use tokio::sync::RwLock;
use url::Url;
use uuid::Uuid;

use crate::models::user::{ProviderSession, UserIdentity};

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("an account with this email already exists")]
    AlreadyRegistered,
    #[error("session provider request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("session provider returned {status}: {body}")]
    Status { status: u16, body: String },
    #[error("invalid session provider url: {0}")]
    Url(#[from] url::ParseError),
}

/// Identity provider the front end signs users in with.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    async fn login(&self, email: &str, password: &str) -> Result<ProviderSession, SessionError>;

    async fn signup(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<ProviderSession, SessionError>;

    async fn logout(&self, access_token: &str) -> Result<(), SessionError>;
}

#[derive(Serialize)]
struct Credentials<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    display_name: Option<&'a str>,
}

pub struct HttpSessionProvider {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpSessionProvider {
    pub fn new(base_url: Url) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url,
        }
    }

    async fn post_credentials(
        &self,
        path: &str,
        credentials: &Credentials<'_>,
    ) -> Result<ProviderSession, SessionError> {
        let response = self
            .client
            .post(self.base_url.join(path)?)
            .json(credentials)
            .send()
            .await?;
        match response.status() {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(SessionError::InvalidCredentials)
            }
            StatusCode::CONFLICT => Err(SessionError::AlreadyRegistered),
            status if !status.is_success() => Err(SessionError::Status {
                status: status.as_u16(),
                body: response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<unreadable body>".to_string()),
            }),
            _ => Ok(response.json::<ProviderSession>().await?),
        }
    }
}

#[async_trait]
impl SessionProvider for HttpSessionProvider {
    async fn login(&self, email: &str, password: &str) -> Result<ProviderSession, SessionError> {
        self.post_credentials(
            "auth/login",
            &Credentials {
                email,
                password,
                display_name: None,
            },
        )
        .await
    }

    async fn signup(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<ProviderSession, SessionError> {
        self.post_credentials(
            "auth/signup",
            &Credentials {
                email,
                password,
                display_name,
            },
        )
        .await
    }

    async fn logout(&self, access_token: &str) -> Result<(), SessionError> {
        let response = self
            .client
            .post(self.base_url.join("auth/logout")?)
            .bearer_auth(access_token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(SessionError::Status {
                status: status.as_u16(),
                body: response
                    .text()
                    .await
                    .unwrap_or_else(|_| "<unreadable body>".to_string()),
            });
        }
        Ok(())
    }
}

struct Account {
    password: String,
    identity: UserIdentity,
}

/// Session provider holding accounts in memory, for tests and local runs.
#[derive(Clone, Default)]
pub struct InMemorySessionProvider {
    accounts: Arc<RwLock<HashMap<String, Account>>>,
    tokens: Arc<RwLock<HashMap<String, String>>>,
}

impl InMemorySessionProvider {
    pub fn new() -> Self {
        Self::default()
    }

    async fn issue(&self, identity: UserIdentity) -> ProviderSession {
        let access_token = Uuid::new_v4().simple().to_string();
        self.tokens
            .write()
            .await
            .insert(access_token.clone(), identity.id.clone());
        ProviderSession {
            access_token,
            user: identity,
        }
    }

    pub async fn active_tokens(&self) -> usize {
        self.tokens.read().await.len()
    }
}

#[async_trait]
impl SessionProvider for InMemorySessionProvider {
    async fn login(&self, email: &str, password: &str) -> Result<ProviderSession, SessionError> {
        let identity = {
            let accounts = self.accounts.read().await;
            let account = accounts
                .get(&email.to_lowercase())
                .filter(|account| account.password == password)
                .ok_or(SessionError::InvalidCredentials)?;
            account.identity.clone()
        };
        Ok(self.issue(identity).await)
    }

    async fn signup(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<ProviderSession, SessionError> {
        let key = email.to_lowercase();
        let identity = {
            let mut accounts = self.accounts.write().await;
            if accounts.contains_key(&key) {
                return Err(SessionError::AlreadyRegistered);
            }
            let identity = UserIdentity {
                id: Uuid::new_v4().to_string(),
                email: email.to_string(),
                display_name: display_name.map(str::to_string),
            };
            accounts.insert(
                key,
                Account {
                    password: password.to_string(),
                    identity: identity.clone(),
                },
            );
            identity
        };
        Ok(self.issue(identity).await)
    }

    async fn logout(&self, access_token: &str) -> Result<(), SessionError> {
        self.tokens.write().await.remove(access_token);
        Ok(())
    }
}
