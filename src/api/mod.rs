use async_trait::async_trait;
use reqwest::{Client, Method, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::model::{DeleteMode, Product, Resource};

pub mod model;

use model::{
    ChangePasswordRequest, ItemBody, ListBody, LoginRequest, LoginResponse, Mutation, StockChange,
};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("network error: {0}")]
    Transport(String),
    #[error("server error {status}: {message}")]
    Server { status: u16, message: String },
    #[error("invalid response: {0}")]
    Decode(String),
    #[error("invalid URL: {0}")]
    InvalidUrl(String),
}

impl ApiError {
    /// Build a server error from a non-2xx response, preferring the body's `message`.
    pub fn from_response(status: u16, body: &str) -> Self {
        let message = serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| v.get("message").and_then(Value::as_str).map(str::to_string))
            .filter(|m| !m.trim().is_empty())
            .unwrap_or_else(|| status_message(status));
        ApiError::Server { status, message }
    }

    /// Text safe to show on screen.
    pub fn display_message(&self) -> String {
        match self {
            ApiError::Transport(_) => {
                "Cannot reach the server. Check your connection and try again.".to_string()
            }
            ApiError::Server { message, .. } => message.clone(),
            ApiError::Decode(_) => "The server returned an unexpected response.".to_string(),
            ApiError::InvalidUrl(_) => "The API address is misconfigured.".to_string(),
        }
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Generic text for a status code when the body carries no message.
pub fn status_message(status: u16) -> String {
    match status {
        400 => "The request data is invalid.".to_string(),
        401 => "Your session has expired. Please sign in again.".to_string(),
        403 => "You do not have permission to do that.".to_string(),
        404 => "The requested data was not found.".to_string(),
        409 => "The data conflicts with an existing record.".to_string(),
        500 => "The server encountered an internal error.".to_string(),
        other => format!("request failed with status {}", other),
    }
}

/// CRUD operations over one REST collection.
#[async_trait]
pub trait ResourceService<R: Resource>: Send + Sync {
    async fn list(&self) -> Result<Vec<R>, ApiError>;

    async fn fetch(&self, id: &str) -> Result<R, ApiError>;

    async fn create(&self, item: &R) -> Result<Mutation<R>, ApiError>;

    async fn update(&self, id: &str, item: &R) -> Result<Mutation<R>, ApiError>;

    async fn delete(&self, id: &str, mode: DeleteMode) -> Result<(), ApiError>;
}

/// Product-specific partial update.
#[async_trait]
pub trait StockService: Send + Sync {
    async fn adjust_stock(&self, id: &str, change: StockChange)
        -> Result<Mutation<Product>, ApiError>;
}

#[async_trait]
pub trait AuthService: Send + Sync {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError>;

    async fn change_password(&self, old_password: &str, new_password: &str)
        -> Result<(), ApiError>;
}

/// Thin REST gateway: every call goes against `base_url`, carries the bearer
/// token once one is attached, and times out after the configured duration.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: Url,
    token: Option<String>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.base_url)
            .field("authorized", &self.token.is_some())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(base_url: &str, timeout: Duration, user_agent: &str) -> Result<Self, ApiError> {
        let base_url = normalize_base(base_url)?;
        let http = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .no_proxy()
            .build()
            .map_err(|e| ApiError::Transport(e.to_string()))?;
        Ok(Self {
            http,
            base_url,
            token: None,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self, ApiError> {
        Self::new(&cfg.api.base_url, cfg.request_timeout(), &cfg.api.user_agent)
    }

    /// Copy of this client that attaches `token` as a bearer credential.
    pub fn authorized(&self, token: &str) -> Self {
        Self {
            http: self.http.clone(),
            base_url: self.base_url.clone(),
            token: Some(token.to_string()),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn build_request(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Request, ApiError> {
        let url = self
            .base_url
            .join(endpoint.trim_start_matches('/'))
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {}", endpoint, e)))?;
        let mut builder = self
            .http
            .request(method, url)
            .header("Accept", "application/json");
        if let Some(token) = &self.token {
            builder = builder.header("Authorization", format!("Bearer {}", token));
        }
        if let Some(body) = body {
            builder = builder.json(body);
        }
        builder
            .build()
            .map_err(|e| ApiError::InvalidUrl(e.to_string()))
    }

    async fn execute(&self, request: reqwest::Request) -> Result<String, ApiError> {
        let method = request.method().clone();
        let url = request.url().clone();
        debug!(%method, %url, "sending api request");

        let res = self.http.execute(request).await.map_err(|err| {
            warn!(%method, %url, ?err, "api request failed to complete");
            if err.is_timeout() {
                ApiError::Transport(format!("request to {} timed out", url))
            } else {
                ApiError::Transport(err.to_string())
            }
        })?;

        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        if !status.is_success() {
            warn!(%method, %url, status = status.as_u16(), "api error response");
            return Err(ApiError::from_response(status.as_u16(), &body));
        }
        debug!(%method, %url, status = status.as_u16(), "api response");
        Ok(body)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<T, ApiError> {
        let request = self.build_request(method, endpoint, body)?;
        let text = self.execute(request).await?;
        let text = if text.trim().is_empty() { "null" } else { text.as_str() };
        serde_json::from_str(text).map_err(|e| ApiError::Decode(e.to_string()))
    }

    pub async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.call(Method::GET, endpoint, None).await
    }

    pub async fn post<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Value,
    ) -> Result<T, ApiError> {
        self.call(Method::POST, endpoint, Some(body)).await
    }

    pub async fn put<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Value,
    ) -> Result<T, ApiError> {
        self.call(Method::PUT, endpoint, Some(body)).await
    }

    pub async fn patch<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        body: &Value,
    ) -> Result<T, ApiError> {
        self.call(Method::PATCH, endpoint, Some(body)).await
    }

    pub async fn delete<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, ApiError> {
        self.call(Method::DELETE, endpoint, None).await
    }
}

fn normalize_base(raw: &str) -> Result<Url, ApiError> {
    let trimmed = raw.trim();
    let with_slash = if trimmed.ends_with('/') {
        trimmed.to_string()
    } else {
        format!("{}/", trimmed)
    };
    Url::parse(&with_slash).map_err(|e| ApiError::InvalidUrl(format!("{}: {}", raw, e)))
}

fn to_body<T: serde::Serialize>(value: &T) -> Result<Value, ApiError> {
    serde_json::to_value(value).map_err(|e| ApiError::Decode(e.to_string()))
}

fn mutation_from<R: Resource>(body: Option<ItemBody<R>>) -> Mutation<R> {
    match body {
        Some(body) => body.into(),
        None => Mutation::Acknowledged { message: None },
    }
}

#[async_trait]
impl<R: Resource> ResourceService<R> for ApiClient {
    #[instrument(skip_all, fields(resource = R::PATH))]
    async fn list(&self) -> Result<Vec<R>, ApiError> {
        let body: ListBody<R> = self.get(&R::collection_path()).await?;
        Ok(body.into_items())
    }

    async fn fetch(&self, id: &str) -> Result<R, ApiError> {
        let body: ItemBody<R> = self.get(&R::item_path(id)).await?;
        match body {
            ItemBody::Wrapped { data, .. } => Ok(data),
            ItemBody::Bare(item) => Ok(item),
            ItemBody::Message { message } => Err(ApiError::Decode(format!(
                "expected a {} but got message '{}'",
                R::LABEL,
                message
            ))),
            ItemBody::Other(_) => Err(ApiError::Decode(format!("expected a {}", R::LABEL))),
        }
    }

    #[instrument(skip_all, fields(resource = R::PATH))]
    async fn create(&self, item: &R) -> Result<Mutation<R>, ApiError> {
        let body = to_body(item)?;
        let res: Option<ItemBody<R>> = self.post(&R::collection_path(), &body).await?;
        Ok(mutation_from(res))
    }

    #[instrument(skip_all, fields(resource = R::PATH, id = %id))]
    async fn update(&self, id: &str, item: &R) -> Result<Mutation<R>, ApiError> {
        let body = to_body(item)?;
        let res: Option<ItemBody<R>> = self.put(&R::item_path(id), &body).await?;
        Ok(mutation_from(res))
    }

    #[instrument(skip_all, fields(resource = R::PATH, id = %id))]
    async fn delete(&self, id: &str, mode: DeleteMode) -> Result<(), ApiError> {
        let _: Value = ApiClient::delete(self, &R::delete_path(id, mode)).await?;
        Ok(())
    }
}

#[async_trait]
impl StockService for ApiClient {
    #[instrument(skip_all, fields(id = %id))]
    async fn adjust_stock(
        &self,
        id: &str,
        change: StockChange,
    ) -> Result<Mutation<Product>, ApiError> {
        let endpoint = format!("{}/stock", Product::item_path(id));
        let res: Option<ItemBody<Product>> = self.patch(&endpoint, &to_body(&change)?).await?;
        Ok(mutation_from(res))
    }
}

#[async_trait]
impl AuthService for ApiClient {
    #[instrument(skip_all)]
    async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        let body = to_body(&LoginRequest { username, password })?;
        let res: LoginResponse = self.post("auth/login", &body).await?;
        if res.token.trim().is_empty() || res.role.trim().is_empty() {
            return Err(ApiError::Decode(
                "login response is missing token or role".to_string(),
            ));
        }
        Ok(res)
    }

    #[instrument(skip_all)]
    async fn change_password(
        &self,
        old_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        let body = to_body(&ChangePasswordRequest {
            old_password,
            new_password,
        })?;
        let _: Value = self.post("auth/change-password", &body).await?;
        Ok(())
    }
}
