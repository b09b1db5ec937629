//! REST storage adapter
//!
//! [`ApiHandler`] wraps a `reqwest::Client` with the backend's conventions:
//! bearer JWT auth, `{success, data}` envelopes and a result hook that sees
//! every answer. [`ApiHandlerDbInterface`] maps [`ItemDatabase`] onto the
//! `items/*` routes.

use super::{require_item_type, AppDataSource, ItemDatabase, SelectMultipleOpts};
use crate::config::ApiConfig;
use crate::item::Item;
use crate::pagination::PaginatedItemResponse;
use crate::{Error, Result};
use serde_json::{json, Map, Value};
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use uuid::Uuid;

/// Supplies the bearer token for each request
pub type TokenFn = Arc<dyn Fn() -> Option<String> + Send + Sync>;

/// Observes the outcome of each request
pub type ResultHook = Arc<dyn Fn(&ApiResult) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HttpMethod::Get => f.write_str("GET"),
            HttpMethod::Post => f.write_str("POST"),
        }
    }
}

/// What the result hook receives
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResult {
    pub method: HttpMethod,
    /// Endpoint as requested, relative to the base url
    pub url: String,
    pub status: u16,
    pub error: Option<String>,
    pub data: Option<Value>,
}

/// Answer of a GET/POST after envelope unwrapping
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ApiResponse {
    pub success: bool,
    pub status: u16,
    pub data: Option<Value>,
    pub error: Option<String>,
}

impl ApiResponse {
    /// Turn a failed answer into [`Error::Api`]
    pub fn into_result(self) -> Result<Option<Value>> {
        if self.success {
            Ok(self.data)
        } else {
            Err(Error::Api {
                status: self.status,
                message: self.error.unwrap_or_else(|| format!("request failed with status {}", self.status)),
            })
        }
    }
}

/// Tone of a [`ResultNotice`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Positive,
    Warning,
    Negative,
    Neutral,
}

/// Human-readable summary of a write request
#[derive(Debug, Clone, PartialEq)]
pub struct ResultNotice {
    pub level: NoticeLevel,
    pub message: String,
}

impl ResultNotice {
    /// Notice for item writes (`addItem`, `updateItem`, `removeItem`); other urls yield `None`
    pub fn from_result(result: &ApiResult) -> Option<Self> {
        let action = if result.url.starts_with("items/updateItem") {
            "Updated"
        } else if result.url.starts_with("items/removeItem") {
            "Removed"
        } else if result.url.starts_with("items/addItem") {
            "Added"
        } else {
            return None;
        };

        let data = result.data.as_ref();
        let item_type = data
            .and_then(|d| d.get("itemType"))
            .and_then(Value::as_str)
            .unwrap_or("item");
        let item_data = data.and_then(|d| d.get("itemData"));
        let label = ["title", "name", "label"]
            .iter()
            .filter_map(|k| item_data.and_then(|d| d.get(*k)).and_then(Value::as_str))
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .or_else(|| {
                data.and_then(|d| d.get("itemId"))
                    .and_then(Value::as_str)
                    .and_then(|id| id.split('-').next())
                    .map(str::to_string)
            })
            .unwrap_or_default();

        let success = result.status == 200;
        let level = match result.status {
            403 => NoticeLevel::Warning,
            404 => NoticeLevel::Negative,
            _ if result.error.is_some() => NoticeLevel::Negative,
            200 => NoticeLevel::Positive,
            _ => NoticeLevel::Neutral,
        };

        let mut message = format!("{}{} {} \"{}\"", if success { "" } else { "FAILED: " }, action, item_type, label);
        if !success {
            message.push_str(&format!(" ({})", result.status));
        }

        Some(Self { level, message })
    }
}

/// HTTP client for the item backend
pub struct ApiHandler {
    client: reqwest::Client,
    base_url: String,
    jwt: RwLock<Option<String>>,
    jwt_fn: Option<TokenFn>,
    on_result: Option<ResultHook>,
    debug: bool,
}

impl ApiHandler {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        Self::with_timeout(base_url, Duration::from_secs(30))
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            jwt: RwLock::new(None),
            jwt_fn: None,
            on_result: None,
            debug: false,
        })
    }

    pub fn from_config(config: &ApiConfig) -> Result<Self> {
        let mut handler = Self::with_timeout(&config.base_url, Duration::from_secs(config.timeout_secs))?;
        handler.debug = config.debug;
        if let Some(jwt) = &config.jwt {
            handler.set_token(jwt);
        }
        Ok(handler)
    }

    pub fn with_jwt(self, jwt: impl Into<String>) -> Self {
        self.set_token(jwt);
        self
    }

    /// Token provider consulted before the static token
    pub fn with_token_fn(mut self, f: impl Fn() -> Option<String> + Send + Sync + 'static) -> Self {
        self.jwt_fn = Some(Arc::new(f));
        self
    }

    pub fn with_result_hook(mut self, hook: impl Fn(&ApiResult) + Send + Sync + 'static) -> Self {
        self.on_result = Some(Arc::new(hook));
        self
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Replace the static token; empty tokens are ignored
    pub fn set_token(&self, token: impl Into<String>) {
        let token = token.into();
        if token.is_empty() {
            return;
        }
        *self.jwt.write().unwrap_or_else(PoisonError::into_inner) = Some(token);
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url, endpoint.trim_start_matches('/'))
    }

    fn token(&self) -> Option<String> {
        self.jwt_fn
            .as_ref()
            .and_then(|f| f())
            .filter(|t| !t.is_empty())
            .or_else(|| self.jwt.read().unwrap_or_else(PoisonError::into_inner).clone())
    }

    pub async fn get(&self, endpoint: &str) -> ApiResponse {
        self.request(HttpMethod::Get, endpoint, None).await
    }

    pub async fn post(&self, endpoint: &str, params: Option<Value>) -> ApiResponse {
        self.request(HttpMethod::Post, endpoint, params).await
    }

    /// Check the stored token against `session/current`
    pub async fn is_session_valid(&self) -> bool {
        let res = self.get("session/current").await;
        res.success && res.data.as_ref().and_then(|d| d.get("sessionId")).is_some_and(|id| !id.is_null())
    }

    async fn request(&self, method: HttpMethod, endpoint: &str, params: Option<Value>) -> ApiResponse {
        let endpoint = endpoint.trim_start_matches('/');
        let url = self.url(endpoint);
        let token = self.token();

        let (status, body, error) = if token.is_none() && !endpoint.starts_with("login/") {
            log::warn!("Token not available ({} {})", method, endpoint);
            (403, None, Some("Token not available".to_string()))
        } else {
            if self.debug {
                log::debug!("fetching {} {}", method, url);
            }
            self.send(method, &url, token.as_deref(), params).await
        };

        if status != 200 {
            log::info!("Non-200 status {} for {} {}", status, method, endpoint);
        }
        if status == 403 {
            log::error!("Not authorized ({} {})", method, endpoint);
        }

        // Bodies shaped `{success, data}` or `{data, status, error}` are unwrapped
        let (data, success_flag, envelope_error) = match body {
            Some(Value::Object(mut obj)) if obj.contains_key("data") && (obj.contains_key("success") || obj.contains_key("status")) => {
                let success = obj.get("success").and_then(Value::as_bool);
                let envelope_error = obj.get("error").and_then(Value::as_str).map(str::to_string);
                (obj.remove("data"), success, envelope_error)
            }
            other => (other, None, None),
        };
        let error = error.or(envelope_error);

        let result = ApiResult {
            method,
            url: endpoint.to_string(),
            status,
            error: error.clone(),
            data: data.clone(),
        };
        if let Some(hook) = &self.on_result {
            hook(&result);
        }

        ApiResponse {
            success: (200..300).contains(&status) && success_flag != Some(false),
            status,
            data,
            error,
        }
    }

    async fn send(
        &self,
        method: HttpMethod,
        url: &str,
        token: Option<&str>,
        params: Option<Value>,
    ) -> (u16, Option<Value>, Option<String>) {
        let mut request = match method {
            HttpMethod::Get => self.client.get(url),
            HttpMethod::Post => self.client.post(url).json(&params.unwrap_or_else(|| json!({}))),
        };
        if let Some(token) = token {
            request = request.bearer_auth(token);
        }

        let response = match request.send().await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("Request to {} failed: {}", url, e);
                return (e.status().map(|s| s.as_u16()).unwrap_or(500), None, Some(e.to_string()));
            }
        };

        let status = response.status().as_u16();
        let error = (!response.status().is_success())
            .then(|| response.status().canonical_reason().unwrap_or("request failed").to_string());

        match response.text().await {
            Ok(text) if text.trim().is_empty() => (status, None, error),
            Ok(text) => {
                let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
                if self.debug {
                    log::debug!("done fetching {} ({})", url, status);
                }
                (status, Some(body), error)
            }
            Err(e) => (status, None, Some(e.to_string())),
        }
    }
}

/// [`ItemDatabase`] backed by the REST API
pub struct ApiHandlerDbInterface {
    api: Arc<ApiHandler>,
}

impl ApiHandlerDbInterface {
    pub fn new(api: Arc<ApiHandler>) -> Self {
        Self { api }
    }

    pub fn api(&self) -> &ApiHandler {
        &self.api
    }

    fn write_body(item_id: Uuid, item_type: &str, data: Map<String, Value>, set_updated: bool) -> Value {
        let type_id = data.get("typeId").cloned().unwrap_or(Value::String(item_type.to_string()));
        json!({
            "itemType": item_type,
            "itemId": item_id.to_string(),
            "typeId": type_id,
            "data": data,
            "setUpdated": set_updated,
        })
    }
}

fn path_segment(value: &str) -> String {
    urlencoding::encode(value).into_owned()
}

#[async_trait::async_trait]
impl ItemDatabase for ApiHandlerDbInterface {
    fn source(&self) -> AppDataSource {
        AppDataSource::Api
    }

    async fn insert(&self, item_id: Uuid, item_type: &str, data: Map<String, Value>) -> Result<()> {
        let body = Self::write_body(item_id, item_type, data, false);
        self.api.post("items/addItem", Some(body)).await.into_result()?;
        Ok(())
    }

    async fn update(
        &self,
        item_id: Uuid,
        item_type: &str,
        data: Map<String, Value>,
        set_updated: bool,
    ) -> Result<()> {
        require_item_type(item_type)?;
        let body = Self::write_body(item_id, item_type, data, set_updated);
        self.api.post("items/updateItem", Some(body)).await.into_result()?;
        Ok(())
    }

    async fn select(&self, item_id: Uuid, item_type: &str) -> Result<Option<Item>> {
        let endpoint = format!("items/{}/{}", path_segment(item_type), item_id);
        let response = self.api.get(&endpoint).await;
        if response.status == 404 {
            return Ok(None);
        }
        match response.into_result()? {
            Some(data @ Value::Object(_)) => Ok(Some(Item::from_record(data)?)),
            _ => Ok(None),
        }
    }

    async fn select_multiple(&self, opts: SelectMultipleOpts) -> Result<PaginatedItemResponse> {
        let body = json!({
            "itemType": opts.item_type,
            "itemIds": opts.item_ids.map(|ids| ids.iter().map(Uuid::to_string).collect::<Vec<_>>()),
            "filters": opts.filters,
            "pagination": opts.pagination.unwrap_or_default(),
        });

        let data = self.api.post("items/searchItems", Some(body)).await.into_result()?;
        match data {
            Some(data) if data.get("results").is_some_and(Value::is_array) => Ok(serde_json::from_value(data)?),
            other => Err(Error::Api {
                status: 200,
                message: format!("invalid search response: {}", other.unwrap_or(Value::Null)),
            }),
        }
    }

    async fn remove(&self, item_id: Uuid, item_type: &str) -> Result<()> {
        require_item_type(item_type)?;
        let endpoint = format!("items/removeItem/{}/{}", path_segment(item_type), item_id);
        self.api.post(&endpoint, None).await.into_result()?;
        Ok(())
    }
}
