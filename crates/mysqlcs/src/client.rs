//! Authenticated HTTP transport for the MySQLCS management API
//!
//! [`MysqlcsClient`] owns the connection pool and credentials and knows how
//! to build the templated wire paths. It is cheap to clone (the underlying
//! `reqwest` pool is shared) and safe for concurrent use, so callers running
//! several operations in parallel can hand each its own clone.
//!
//! The management API identifies the tenant through the identity domain,
//! which appears both in every path and in the `X-ID-TENANT-NAME` header.
//! Most endpoints speak plain JSON; service instance provisioning uses a
//! provider-specific vendor type.

use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue};
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, trace};
use url::Url;

use crate::error::{Error, Result};

/// Default user agent for MySQLCS HTTP requests
const DEFAULT_USER_AGENT: &str = concat!("mysqlcs-rs/", env!("CARGO_PKG_VERSION"));

/// Content type negotiated per endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ContentType {
    /// `application/json` — access rules and activity-log endpoints
    Json,
    /// The provisioning vendor type required by service instance endpoints
    ProvisioningService,
}

impl ContentType {
    pub(crate) fn as_str(self) -> &'static str {
        match self {
            ContentType::Json => "application/json",
            ContentType::ProvisioningService => {
                "application/vnd.com.oracle.oracloud.provisioning.Service+json"
            }
        }
    }
}

/// Client for the MySQLCS management API
#[derive(Debug, Clone)]
pub struct MysqlcsClient {
    http: reqwest::Client,
    base_url: String,
    identity_domain: String,
    username: String,
    password: String,
}

impl MysqlcsClient {
    /// Start building a client
    #[must_use]
    pub fn builder() -> MysqlcsClientBuilder {
        MysqlcsClientBuilder::default()
    }

    /// The identity domain (tenant) this client is scoped to
    #[must_use]
    pub fn identity_domain(&self) -> &str {
        &self.identity_domain
    }

    // Wire paths, templated by identity domain and resource name

    pub(crate) fn instance_container_path(&self) -> String {
        format!(
            "/paas/api/v1.1/instancemgmt/{}/services/MySQLCS/instances/",
            self.identity_domain
        )
    }

    pub(crate) fn instance_path(&self, name: &str) -> String {
        format!(
            "/paas/api/v1.1/instancemgmt/{}/services/MySQLCS/instances/{}",
            self.identity_domain, name
        )
    }

    pub(crate) fn access_rule_container_path(&self, service_id: &str) -> String {
        format!(
            "/paas/api/v1.1/instancemgmt/{}/services/MySQLCS/instances/{}/accessrules",
            self.identity_domain, service_id
        )
    }

    pub(crate) fn access_rule_path(&self, service_id: &str, rule_name: &str) -> String {
        format!(
            "/paas/api/v1.1/instancemgmt/{}/services/MySQLCS/instances/{}/accessrules/{}",
            self.identity_domain, service_id, rule_name
        )
    }

    pub(crate) fn job_path(&self, job_id: &str) -> String {
        format!(
            "/paas/api/v1.1/activitylog/{}/job/{}",
            self.identity_domain, job_id
        )
    }

    /// Execute a request and return the raw response after status checking
    pub(crate) async fn execute<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        content_type: ContentType,
    ) -> Result<Response> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%method, %url, "issuing request");

        let mut request = self
            .http
            .request(method, &url)
            .basic_auth(&self.username, Some(&self.password))
            .header(CONTENT_TYPE, content_type.as_str());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        trace!(%url, %status, "response received");

        if status.is_success() {
            return Ok(response);
        }

        let message = Self::error_message(response).await;
        match status {
            StatusCode::NOT_FOUND => Err(Error::NotFound { message }),
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                Err(Error::Unauthorized { message })
            }
            _ => Err(Error::Api {
                status: status.as_u16(),
                message,
            }),
        }
    }

    /// Execute a request and decode the JSON body into `T`.
    ///
    /// Decode failures keep the raw body so callers can see what the server
    /// actually sent.
    pub(crate) async fn execute_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
        content_type: ContentType,
    ) -> Result<T> {
        let response = self.execute(method, path, body, content_type).await?;
        let text = response.text().await?;
        serde_json::from_str(&text).map_err(|e| Error::Deserialization {
            message: e.to_string(),
            body: text,
        })
    }

    /// Convenience GET with JSON decoding
    pub(crate) async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        self.execute_json::<(), T>(Method::GET, path, None, ContentType::Json)
            .await
    }

    /// Pull a human-readable message out of an error response body.
    /// The API usually reports `{"message": "..."}` but not reliably.
    async fn error_message(response: Response) -> String {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if let Ok(value) = serde_json::from_str::<serde_json::Value>(&body)
            && let Some(message) = value.get("message").and_then(|m| m.as_str())
        {
            return message.to_string();
        }
        if body.trim().is_empty() {
            format!("HTTP {status}")
        } else {
            body.trim().to_string()
        }
    }
}

/// Builder for [`MysqlcsClient`]
#[derive(Debug, Default)]
pub struct MysqlcsClientBuilder {
    base_url: Option<String>,
    identity_domain: Option<String>,
    username: Option<String>,
    password: Option<String>,
    user_agent: Option<String>,
    timeout: Option<std::time::Duration>,
}

impl MysqlcsClientBuilder {
    /// Base URL of the management API, e.g. `https://psm.us.oraclecloud.com`
    #[must_use]
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Identity domain (tenant) the client operates in
    #[must_use]
    pub fn identity_domain(mut self, identity_domain: impl Into<String>) -> Self {
        self.identity_domain = Some(identity_domain.into());
        self
    }

    /// Account username for HTTP basic auth
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Account password for HTTP basic auth
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Override the default user agent
    #[must_use]
    pub fn user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Per-request timeout at the transport layer
    #[must_use]
    pub fn timeout(mut self, timeout: std::time::Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Build the client, validating the configuration
    pub fn build(self) -> Result<MysqlcsClient> {
        let base_url = self
            .base_url
            .ok_or_else(|| Error::InvalidConfig("base_url is required".to_string()))?;
        let parsed = Url::parse(&base_url)
            .map_err(|e| Error::InvalidConfig(format!("invalid base_url: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(Error::InvalidConfig(format!(
                "unsupported base_url scheme: {}",
                parsed.scheme()
            )));
        }
        let identity_domain = self
            .identity_domain
            .ok_or_else(|| Error::InvalidConfig("identity_domain is required".to_string()))?;
        let username = self
            .username
            .ok_or_else(|| Error::InvalidConfig("username is required".to_string()))?;
        let password = self
            .password
            .ok_or_else(|| Error::InvalidConfig("password is required".to_string()))?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(
            "X-ID-TENANT-NAME",
            HeaderValue::from_str(&identity_domain)
                .map_err(|e| Error::InvalidConfig(format!("invalid identity_domain: {e}")))?,
        );

        let mut http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(self.user_agent.unwrap_or_else(|| {
                DEFAULT_USER_AGENT.to_string()
            }));
        if let Some(timeout) = self.timeout {
            http = http.timeout(timeout);
        }
        let http = http.build()?;

        debug!(identity_domain, base_url, "MySQLCS client created");
        Ok(MysqlcsClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            identity_domain,
            username,
            password,
        })
    }
}
