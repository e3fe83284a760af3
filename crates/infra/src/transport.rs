//! HTTP transport over reqwest
//!
//! Performs exactly one attempt per call; retry scheduling lives in the
//! request queue. Server errors are surfaced as retryable failures by
//! default so that the queue's policy applies to them.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use courier_core::{Transport, TransportRequest, TransportResponse};
use courier_domain::constants::DEFAULT_DISPATCH_TIMEOUT_MS;
use courier_domain::{NetError, RequestMethod, Result};
use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{Client as ReqwestClient, Method};
use serde_json::Value;
use tracing::debug;

/// Reqwest-backed [`Transport`] implementation.
#[derive(Clone)]
pub struct HttpTransport {
    client: ReqwestClient,
    error_on_server_status: bool,
}

impl HttpTransport {
    /// Start building a transport.
    pub fn builder() -> HttpTransportBuilder {
        HttpTransportBuilder::default()
    }

    /// Convenience constructor with default configuration.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: TransportRequest) -> Result<TransportResponse> {
        let method = http_method(request.method);
        let mut builder = self.client.request(method.clone(), &request.url);

        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        // Malformed headers or addresses surface here rather than on the wire
        let built = builder.build().map_err(|err| {
            NetError::invalid_param(format!("request could not be assembled: {err}"))
        })?;

        debug!(%method, url = %request.url, "sending http request");
        let response = self.client.execute(built).await.map_err(transport_error)?;

        let status = response.status();
        debug!(%method, url = %request.url, %status, "received http response");

        if self.error_on_server_status && status.is_server_error() {
            return Err(NetError::request_failed(format!("server returned {status}")));
        }

        let headers = response_headers(response.headers());
        let text = response.text().await.map_err(transport_error)?;

        Ok(TransportResponse { status: status.as_u16(), headers, body: parse_body(text) })
    }
}

/// Builder for [`HttpTransport`].
#[derive(Debug)]
pub struct HttpTransportBuilder {
    timeout: Duration,
    user_agent: Option<String>,
    default_headers: HashMap<String, String>,
    error_on_server_status: bool,
}

impl Default for HttpTransportBuilder {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_DISPATCH_TIMEOUT_MS),
            user_agent: None,
            default_headers: HashMap::new(),
            error_on_server_status: true,
        }
    }
}

impl HttpTransportBuilder {
    /// Client-level timeout applied when a request carries none of its own.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Header sent with every request unless the request overrides it.
    pub fn default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.insert(name.into(), value.into());
        self
    }

    /// Whether 5xx statuses become retryable errors instead of responses.
    pub fn error_on_server_status(mut self, enabled: bool) -> Self {
        self.error_on_server_status = enabled;
        self
    }

    pub fn build(self) -> Result<HttpTransport> {
        let mut builder = ReqwestClient::builder().timeout(self.timeout).no_proxy();

        if let Some(agent) = self.user_agent {
            builder = builder.user_agent(agent);
        }

        if !self.default_headers.is_empty() {
            let mut headers = reqwest::header::HeaderMap::new();
            for (name, value) in &self.default_headers {
                let name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                    NetError::invalid_param(format!("invalid header name {name:?}: {err}"))
                })?;
                let value = HeaderValue::from_str(value).map_err(|err| {
                    NetError::invalid_param(format!("invalid header value: {err}"))
                })?;
                headers.insert(name, value);
            }
            builder = builder.default_headers(headers);
        }

        let client = builder
            .build()
            .map_err(|err| NetError::internal(format!("http client failed to initialize: {err}")))?;

        Ok(HttpTransport { client, error_on_server_status: self.error_on_server_status })
    }
}

fn http_method(method: RequestMethod) -> Method {
    match method {
        RequestMethod::Get => Method::GET,
        RequestMethod::Post => Method::POST,
        RequestMethod::Put => Method::PUT,
        RequestMethod::Delete => Method::DELETE,
        RequestMethod::Patch => Method::PATCH,
        RequestMethod::Head => Method::HEAD,
        RequestMethod::Options => Method::OPTIONS,
    }
}

fn transport_error(err: reqwest::Error) -> NetError {
    if err.is_timeout() {
        NetError::request_failed(format!("request timed out: {err}"))
    } else if err.is_connect() {
        NetError::request_failed(format!("connection failed: {err}"))
    } else {
        NetError::request_failed(err.to_string())
    }
}

fn response_headers(headers: &reqwest::header::HeaderMap) -> HashMap<String, String> {
    headers
        .iter()
        .map(|(name, value)| {
            (name.as_str().to_string(), String::from_utf8_lossy(value.as_bytes()).into_owned())
        })
        .collect()
}

fn parse_body(text: String) -> Value {
    if text.is_empty() {
        return Value::Null;
    }
    match serde_json::from_str(&text) {
        Ok(value) => value,
        Err(_) => Value::String(text),
    }
}
