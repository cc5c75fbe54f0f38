//! HTTP transport for the OCI REST APIs

use reqwest::header::HeaderMap;
use reqwest::{Client, Method};
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::config::OciConfig;
use crate::error::{OciError, OciResult};
use crate::retry::RetryPolicy;

pub const HEADER_REQUEST_ID: &str = "opc-request-id";
pub const HEADER_WORK_REQUEST_ID: &str = "opc-work-request-id";
pub const HEADER_NEXT_PAGE: &str = "opc-next-page";
pub const HEADER_RETRY_TOKEN: &str = "opc-retry-token";

/// Maximum length of response body to log
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Truncate a response body and drop control characters before logging it
fn sanitize_for_log(body: &str) -> String {
    let total = body.chars().count();
    let truncated = if total > MAX_LOG_BODY_LENGTH {
        let head: String = body.chars().take(MAX_LOG_BODY_LENGTH).collect();
        format!("{}... [truncated, {} bytes total]", head, body.len())
    } else {
        body.to_string()
    };
    truncated.replace(|c: char| c.is_control(), "")
}

/// One API call, independent of how often it is attempted
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub method: Method,
    /// Path below the API base URL, starting with '/'
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
    /// Sent as `opc-retry-token`; identical on every attempt
    pub retry_token: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            retry_token: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    /// Add a query parameter only when a value is present
    pub fn query_opt(self, key: &str, value: Option<impl ToString>) -> Self {
        match value {
            Some(value) => self.query(key, value),
            None => self,
        }
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> OciResult<Self> {
        let value = serde_json::to_value(body).map_err(|source| OciError::Encode {
            what: format!("{} {} body", self.method, self.path),
            source,
        })?;
        self.body = Some(value);
        Ok(self)
    }

    pub fn retry_token(mut self, token: impl Into<String>) -> Self {
        self.retry_token = Some(token.into());
        self
    }
}

/// OCI headers the provider reads back
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResponseHeaders {
    pub opc_request_id: Option<String>,
    pub opc_work_request_id: Option<String>,
    pub opc_next_page: Option<String>,
}

impl ResponseHeaders {
    fn from_headers(headers: &HeaderMap) -> Self {
        let get = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };
        Self {
            opc_request_id: get(HEADER_REQUEST_ID),
            opc_work_request_id: get(HEADER_WORK_REQUEST_ID),
            opc_next_page: get(HEADER_NEXT_PAGE),
        }
    }
}

/// A successful response
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: u16,
    pub headers: ResponseHeaders,
    /// Decoded JSON body; `Null` when the body was empty
    pub body: serde_json::Value,
}

impl ApiResponse {
    pub fn decode<T: DeserializeOwned>(&self, what: &str) -> OciResult<T> {
        T::deserialize(&self.body).map_err(|source| OciError::Decode {
            what: what.to_string(),
            source,
        })
    }

    /// The `opc-work-request-id` of an asynchronous operation
    pub fn work_request_id(&self, operation: &str) -> OciResult<String> {
        self.headers
            .opc_work_request_id
            .clone()
            .ok_or_else(|| OciError::MissingWorkRequestId {
                operation: operation.to_string(),
            })
    }
}

/// Error body returned by OCI services
#[derive(Debug, Default, serde::Deserialize)]
struct ErrorBody {
    code: Option<String>,
    message: Option<String>,
}

/// Authenticated HTTP client bound to one API base URL
#[derive(Debug, Clone)]
pub struct OciHttpClient {
    client: Client,
    base_url: String,
    auth_token: Option<String>,
}

impl OciHttpClient {
    pub fn new(
        base_url: impl Into<String>,
        auth_token: Option<String>,
        user_agent: &str,
    ) -> OciResult<Self> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            auth_token,
        })
    }

    pub fn from_config(config: &OciConfig) -> OciResult<Self> {
        Self::new(
            config.endpoint_url()?,
            config.auth_token.clone(),
            &config.user_agent,
        )
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send `request`, retrying according to `policy`
    pub async fn send(
        &self,
        operation: &str,
        request: &ApiRequest,
        policy: &RetryPolicy,
    ) -> OciResult<ApiResponse> {
        policy
            .execute(operation, || self.send_once(operation, request))
            .await
    }

    async fn send_once(&self, operation: &str, request: &ApiRequest) -> OciResult<ApiResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        log::debug!("{}: {} {}", operation, request.method, url);

        let mut builder = self
            .client
            .request(request.method.clone(), &url)
            .header(reqwest::header::ACCEPT, "application/json");
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = &self.auth_token {
            builder = builder.bearer_auth(token);
        }
        if let Some(token) = &request.retry_token {
            builder = builder.header(HEADER_RETRY_TOKEN, token);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers = ResponseHeaders::from_headers(response.headers());
        let text = response.text().await?;

        if !(200..300).contains(&status) {
            log::debug!(
                "{} returned {}: {}",
                operation,
                status,
                sanitize_for_log(&text)
            );
            let detail: ErrorBody = serde_json::from_str(&text).unwrap_or_default();
            return Err(OciError::Service {
                status,
                code: detail.code.unwrap_or_else(|| "Unknown".to_string()),
                message: detail
                    .message
                    .unwrap_or_else(|| sanitize_for_log(&text)),
                opc_request_id: headers.opc_request_id,
            });
        }

        let body = if text.trim().is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_str(&text).map_err(|source| OciError::Decode {
                what: format!("{} response", operation),
                source,
            })?
        };

        Ok(ApiResponse {
            status,
            headers,
            body,
        })
    }
}
