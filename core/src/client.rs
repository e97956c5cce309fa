//! The single chokepoint for PetPulse network access.
//!
//! # Design
//! `ApiClient` keeps the host-does-IO split: `build_request`
//! turns a method, path and `RequestOptions` into an `HttpRequest`, and
//! `parse_response` turns an `HttpResponse` into an `ApiResponse`. `request`
//! glues the two together through the configured `Transport`; hosts that run
//! their own HTTP stack can call the halves directly.
//!
//! The client holds no mutable state of its own. The session token lives in
//! the injected `SessionStore` and is read fresh for every request.

use std::fmt;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ClientConfig;
use crate::error::{ApiError, ErrorDetail};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, MultipartForm, RequestBody};
use crate::session::SessionStore;
use crate::transport::Transport;

/// What to send with a request besides the method and path.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub payload: Payload,
    pub headers: Vec<(String, String)>,
}

/// Request body. JSON and multipart are mutually exclusive.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Payload {
    #[default]
    Empty,
    Json(Value),
    Form(MultipartForm),
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options carrying `body` as JSON.
    pub fn json<T: Serialize + ?Sized>(body: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        Ok(Self {
            payload: Payload::Json(value),
            headers: Vec::new(),
        })
    }

    /// Options carrying a multipart form.
    pub fn form(form: MultipartForm) -> Self {
        Self {
            payload: Payload::Form(form),
            headers: Vec::new(),
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }
}

/// Decoded response payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseData {
    Json(Value),
    Text(String),
    Binary(Vec<u8>),
    #[default]
    Empty,
}

impl ResponseData {
    pub fn is_empty(&self) -> bool {
        matches!(self, ResponseData::Empty)
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            ResponseData::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            ResponseData::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Deserialize a JSON payload into `T`. An empty payload deserializes
    /// from `null`, so `()` and `Option<_>` targets accept it.
    pub fn into_json<T: DeserializeOwned>(self) -> Result<T, ApiError> {
        match self {
            ResponseData::Json(value) => Ok(serde_json::from_value(value)?),
            ResponseData::Empty => Ok(serde_json::from_value(Value::Null)?),
            ResponseData::Text(_) => Err(ApiError::Deserialization(
                "expected a JSON payload, got text".to_string(),
            )),
            ResponseData::Binary(_) => Err(ApiError::Deserialization(
                "expected a JSON payload, got binary data".to_string(),
            )),
        }
    }
}

/// The `{ data, ok, status }` envelope returned by [`ApiClient::request`].
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    pub data: ResponseData,
    /// True iff `status` is in 200..=299.
    pub ok: bool,
    pub status: u16,
}

/// Client for the PetPulse REST API.
#[derive(Clone)]
pub struct ApiClient {
    config: ClientConfig,
    session: Arc<dyn SessionStore>,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.config.base_url())
            .finish_non_exhaustive()
    }
}

impl ApiClient {
    pub fn new(config: ClientConfig, session: Arc<dyn SessionStore>, transport: Arc<dyn Transport>) -> Self {
        Self {
            config,
            session,
            transport,
        }
    }

    /// Client using the blocking ureq transport.
    #[cfg(feature = "ureq")]
    pub fn with_default_transport(config: ClientConfig, session: Arc<dyn SessionStore>) -> Self {
        Self::new(config, session, Arc::new(crate::transport::UreqTransport::new()))
    }

    pub fn base_url(&self) -> &str {
        self.config.base_url()
    }

    pub fn session(&self) -> &Arc<dyn SessionStore> {
        &self.session
    }

    /// Full URL for `path`. A missing leading slash is added.
    pub fn url(&self, path: &str) -> String {
        if path.starts_with('/') {
            format!("{}{path}", self.config.base_url())
        } else {
            format!("{}/{path}", self.config.base_url())
        }
    }

    // -----------------------------------------------------------------------
    // Session token
    // -----------------------------------------------------------------------

    pub fn get_token(&self) -> Option<String> {
        self.session.get().filter(|token| !token.is_empty())
    }

    /// Store `token`, or clear the slot for `None` or an empty string.
    pub fn set_token(&self, token: Option<&str>) {
        match token {
            Some(token) if !token.is_empty() => self.session.set(token),
            _ => self.session.clear(),
        }
    }

    pub fn clear_token(&self) {
        self.set_token(None);
    }

    // -----------------------------------------------------------------------
    // Request pipeline
    // -----------------------------------------------------------------------

    /// Build the outbound request: URL, bearer header, content type, body.
    pub fn build_request(
        &self,
        method: HttpMethod,
        path: &str,
        options: RequestOptions,
    ) -> Result<HttpRequest, ApiError> {
        let RequestOptions { payload, mut headers } = options;

        if matches!(payload, Payload::Form(_)) {
            // The transport writes the multipart boundary into this header.
            headers.retain(|(name, _)| !name.eq_ignore_ascii_case("content-type"));
        } else if !headers.iter().any(|(name, _)| name.eq_ignore_ascii_case("content-type")) {
            headers.push(("Content-Type".to_string(), "application/json".to_string()));
        }

        if let Some(token) = self.get_token() {
            headers.retain(|(name, _)| !name.eq_ignore_ascii_case("authorization"));
            headers.push(("Authorization".to_string(), format!("Bearer {token}")));
        }

        let body = match payload {
            Payload::Empty => None,
            Payload::Json(value) => Some(RequestBody::Json(
                serde_json::to_string(&value).map_err(|e| ApiError::Serialization(e.to_string()))?,
            )),
            Payload::Form(form) => Some(RequestBody::Multipart(form)),
        };

        Ok(HttpRequest {
            method,
            url: self.url(path),
            headers,
            body,
        })
    }

    /// Decode a response and apply the session side effects.
    ///
    /// A `401` clears the stored token whatever the caller asked for.
    pub fn parse_response(&self, response: HttpResponse) -> ApiResponse {
        let data = decode_body(&response);
        if response.status == 401 {
            warn!("received 401, clearing session token");
            self.clear_token();
        }
        ApiResponse {
            data,
            ok: response.is_success(),
            status: response.status,
        }
    }

    /// Issue a request and return the decoded envelope.
    ///
    /// HTTP error statuses are reported through `ok`; only transport
    /// failures return `Err`.
    pub fn request(
        &self,
        method: HttpMethod,
        path: &str,
        options: RequestOptions,
    ) -> Result<ApiResponse, ApiError> {
        let request = self.build_request(method, path, options)?;
        debug!(
            method = %request.method,
            url = %request.url,
            authorized = request.header("authorization").is_some(),
            multipart = matches!(request.body, Some(RequestBody::Multipart(_))),
            "issuing request"
        );
        let response = self.transport.execute(request)?;
        let response = self.parse_response(response);
        debug!(status = response.status, ok = response.ok, "request finished");
        Ok(response)
    }

    /// Like [`ApiClient::request`], but non-2xx responses become
    /// `ApiError::Status` and the payload is unwrapped.
    pub fn request_ok(
        &self,
        method: HttpMethod,
        path: &str,
        options: RequestOptions,
    ) -> Result<ResponseData, ApiError> {
        let ApiResponse { data, ok, status } = self.request(method, path, options)?;
        if ok {
            Ok(data)
        } else {
            Err(status_error(status, &data))
        }
    }

    /// [`ApiClient::request_ok`] followed by deserialization into `T`.
    pub fn request_json<T: DeserializeOwned>(
        &self,
        method: HttpMethod,
        path: &str,
        options: RequestOptions,
    ) -> Result<T, ApiError> {
        self.request_ok(method, path, options)?.into_json()
    }

    /// Fetch a binary resource.
    ///
    /// Bypasses the JSON-biased decoder: the success body is returned as
    /// raw bytes, and a failure's message is the response body text
    /// (falling back to `"Request failed: {status}"`). Only the bearer
    /// header is sent.
    pub fn request_blob(&self, method: HttpMethod, path: &str) -> Result<Vec<u8>, ApiError> {
        let headers = match self.get_token() {
            Some(token) => vec![("Authorization".to_string(), format!("Bearer {token}"))],
            None => Vec::new(),
        };
        let request = HttpRequest {
            method,
            url: self.url(path),
            headers,
            body: None,
        };
        debug!(method = %request.method, url = %request.url, "fetching binary resource");

        let response = self.transport.execute(request)?;
        if response.status == 401 {
            warn!("received 401, clearing session token");
            self.clear_token();
        }
        if response.is_success() {
            return Ok(response.body);
        }

        let text = String::from_utf8_lossy(&response.body);
        let message = if text.is_empty() {
            format!("Request failed: {}", response.status)
        } else {
            text.into_owned()
        };
        Err(ApiError::Status {
            message,
            status: response.status,
            detail: None,
        })
    }
}

/// Decode by content type: JSON (parse failures become `Empty`), `204` is
/// always `Empty`, anything else is text.
fn decode_body(response: &HttpResponse) -> ResponseData {
    if response.status == 204 {
        return ResponseData::Empty;
    }
    let is_json = response
        .content_type()
        .is_some_and(|content_type| content_type.to_ascii_lowercase().contains("application/json"));
    if is_json {
        return match serde_json::from_slice(&response.body) {
            Ok(value) => ResponseData::Json(value),
            Err(err) => {
                debug!(status = response.status, error = %err, "discarding undecodable JSON body");
                ResponseData::Empty
            }
        };
    }
    ResponseData::Text(String::from_utf8_lossy(&response.body).into_owned())
}

/// Build the error for a non-2xx envelope. Message precedence: the server's
/// `detail`, then its `message`, then a generic status line.
fn status_error(status: u16, data: &ResponseData) -> ApiError {
    let body = data.as_json().and_then(Value::as_object);
    let detail = body
        .and_then(|body| body.get("detail"))
        .and_then(ErrorDetail::from_value);
    let message = detail
        .as_ref()
        .and_then(ErrorDetail::summary)
        .or_else(|| {
            body.and_then(|body| body.get("message"))
                .and_then(Value::as_str)
                .filter(|message| !message.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| format!("Request failed: {status}"));
    ApiError::Status {
        message,
        status,
        detail,
    }
}
