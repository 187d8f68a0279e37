//! Credentials for the course API.

use std::fmt;
use std::future::Future;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::{ApiError, CoreError, CredentialError};

/// How many times an expired credential is refreshed before giving up
pub const MAX_CREDENTIAL_REFRESHES: usize = 1;

/// The JWT presented to the course API
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn token(&self) -> &str {
        &self.0
    }

    /// Value of the `Authorization` header the course API expects
    pub fn header_value(&self) -> String {
        format!("token: {}", self.0)
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CredentialProvider: Send + Sync {
    /// The credential to use right now
    async fn current(&self) -> Result<Credential, CredentialError>;

    /// Obtain a fresh credential, replacing the current one
    async fn refresh(&self) -> Result<Credential, CredentialError>;
}

/// Result of one authorized call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Authorized<T> {
    Done(T),
    /// The API rejected the credential
    Expired,
}

/// Run `call` with the current credential, refreshing at most
/// [`MAX_CREDENTIAL_REFRESHES`] times when it reports expiry
pub async fn with_credential_refresh<T, F, Fut>(
    provider: &dyn CredentialProvider,
    mut call: F,
) -> Result<T, CoreError>
where
    F: FnMut(Credential) -> Fut,
    Fut: Future<Output = Result<Authorized<T>, ApiError>>,
{
    let mut credential = provider.current().await?;
    let mut refreshes = 0;

    loop {
        match call(credential).await? {
            Authorized::Done(value) => return Ok(value),
            Authorized::Expired if refreshes < MAX_CREDENTIAL_REFRESHES => {
                refreshes += 1;
                debug!("Credential expired, refreshing (attempt {})", refreshes);
                credential = provider.refresh().await?;
            }
            Authorized::Expired => {
                warn!("Credential still expired after {} refresh(es)", refreshes);
                return Err(CredentialError::StillExpired { refreshes }.into());
            }
        }
    }
}

#[derive(Serialize)]
struct LoginBody<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Deserialize)]
struct LoginReply {
    token: String,
}

/// Logs in with a username and password and keeps the JWT in memory
pub struct JwtCredentialProvider {
    client: reqwest::Client,
    login_url: String,
    username: String,
    password: String,
    current: RwLock<Option<Credential>>,
}

impl fmt::Debug for JwtCredentialProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtCredentialProvider")
            .field("login_url", &self.login_url)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl JwtCredentialProvider {
    pub fn new(
        client: reqwest::Client,
        api_prefix: &str,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            client,
            login_url: format!("{}/login", api_prefix.trim_end_matches('/')),
            username: username.into(),
            password: password.into(),
            current: RwLock::new(None),
        }
    }

    /// Start from an already issued token instead of logging in first
    pub fn with_token(self, token: impl Into<String>) -> Self {
        *self.current.write() = Some(Credential::new(token));
        self
    }

    async fn login(&self) -> Result<Credential, CredentialError> {
        if self.username.is_empty() || self.password.is_empty() {
            return Err(CredentialError::MissingCredentials);
        }

        let response = self
            .client
            .post(&self.login_url)
            .json(&LoginBody {
                username: &self.username,
                password: &self.password,
            })
            .send()
            .await
            .map_err(|cause| CredentialError::LoginFailed {
                cause: ApiError::RequestFailed {
                    endpoint: "/login".to_string(),
                    cause,
                },
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            return Err(CredentialError::LoginRejected { status });
        }

        let reply: LoginReply =
            response
                .json()
                .await
                .map_err(|cause| CredentialError::LoginFailed {
                    cause: ApiError::DecodeFailed {
                        endpoint: "/login".to_string(),
                        cause,
                    },
                })?;

        Ok(Credential::new(reply.token))
    }
}

#[async_trait]
impl CredentialProvider for JwtCredentialProvider {
    async fn current(&self) -> Result<Credential, CredentialError> {
        let cached = self.current.read().clone();
        if let Some(credential) = cached {
            return Ok(credential);
        }
        self.refresh().await
    }

    async fn refresh(&self) -> Result<Credential, CredentialError> {
        let credential = self.login().await?;
        *self.current.write() = Some(credential.clone());
        info!("Obtained a new course API token");
        Ok(credential)
    }
}
