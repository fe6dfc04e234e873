//! Authenticated transport to one BIG-IQ control plane.
//!
//! A [`Session`] owns the HTTP client, the base URL and the credentials. It is
//! immutable once built: token login returns a new session rather than
//! mutating the old one, so a session can be cloned into concurrent call
//! sequences freely.
//!
//! ## URL resolution
//!
//! | Request path | Namespace | Resolved URL |
//! |--------------|-----------|--------------|
//! | `mgmt/cm/...` | any | `{host}/mgmt/cm/...` |
//! | `sys/provision` | `mgmt/tm` (default) | `{host}/mgmt/tm/sys/provision` |
//! | `shared/file-transfer/uploads/x` | `mgmt` | `{host}/mgmt/shared/file-transfer/uploads/x` |

use std::sync::Arc;

use reqwest::header::CONTENT_TYPE;
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;
use zeroize::Zeroizing;

use crate::config::BigIqConfig;
use crate::error::{decode, ApiErrorBody, BigIqError};

/// Header carrying a session token; supersedes Basic auth when present.
pub const TOKEN_HEADER: &str = "X-F5-Auth-Token";
/// Token login resource. Requests to it never carry credentials.
pub const LOGIN_PATH: &str = "mgmt/shared/authn/login";
/// Default namespace for paths that do not start with `mgmt/`.
pub const TM_NAMESPACE: &str = "mgmt/tm";
/// Namespace used by the file-transfer resources.
pub const MGMT_NAMESPACE: &str = "mgmt";

pub(crate) const JSON: &str = "application/json";
pub(crate) const OCTET_STREAM: &str = "application/octet-stream";

/// One control-plane call, built fresh for every round trip.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub body: Option<Vec<u8>>,
    pub content_type: String,
    pub headers: Vec<(String, String)>,
    pub namespace: String,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            body: None,
            content_type: JSON.to_string(),
            headers: Vec::new(),
            namespace: TM_NAMESPACE.to_string(),
        }
    }

    /// Attach a JSON body. `serde_json` leaves `<`, `>` and `&` unescaped.
    pub fn json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, BigIqError> {
        let bytes = serde_json::to_vec(body).map_err(|e| BigIqError::Serialization {
            endpoint: self.endpoint(),
            source: e,
        })?;
        self.body = Some(bytes);
        self.content_type = JSON.to_string();
        Ok(self)
    }

    pub fn with_body(mut self, body: Vec<u8>, content_type: &str) -> Self {
        self.body = Some(body);
        self.content_type = content_type.to_string();
        self
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_string(), value.into()));
        self
    }

    pub fn in_namespace(mut self, namespace: &str) -> Self {
        self.namespace = namespace.to_string();
        self
    }

    /// Label used in errors and logs, e.g. `GET mgmt/cm/device/...`.
    pub fn endpoint(&self) -> String {
        format!("{} {}", self.method, self.path)
    }
}

struct Credentials {
    username: String,
    password: Zeroizing<String>,
    token: Option<Zeroizing<String>>,
}

/// Authenticated connection to one BIG-IQ host.
#[derive(Clone)]
pub struct Session {
    http: reqwest::Client,
    host: Url,
    credentials: Arc<Credentials>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("host", &self.host)
            .field("username", &self.credentials.username)
            .field("password", &"[REDACTED]")
            .field(
                "token",
                &self.credentials.token.as_ref().map(|_| "[REDACTED]"),
            )
            .finish()
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    login_provider_name: &'a str,
}

#[derive(Deserialize)]
struct LoginResponse {
    #[serde(default)]
    token: Option<LoginToken>,
}

#[derive(Deserialize)]
struct LoginToken {
    #[serde(default)]
    token: String,
}

impl Session {
    /// Build a session from configuration. No request is sent.
    pub fn new(config: &BigIqConfig) -> Result<Self, BigIqError> {
        let user_agent = config
            .user_agent
            .clone()
            .unwrap_or_else(|| format!("bigiq-client/{}", env!("CARGO_PKG_VERSION")));
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.accept_invalid_certs)
            .user_agent(user_agent)
            .build()
            .map_err(|e| BigIqError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;

        let mut host = config.host.clone();
        if !host.path().ends_with('/') {
            let path = format!("{}/", host.path());
            host.set_path(&path);
        }

        Ok(Self {
            http,
            host,
            credentials: Arc::new(Credentials {
                username: config.username.clone(),
                password: config.password.clone(),
                token: config.token.clone(),
            }),
        })
    }

    pub fn host(&self) -> &Url {
        &self.host
    }

    pub fn has_token(&self) -> bool {
        self.credentials.token.is_some()
    }

    /// A copy of this session that authenticates with `token`.
    pub fn with_token(&self, token: &str) -> Session {
        Session {
            http: self.http.clone(),
            host: self.host.clone(),
            credentials: Arc::new(Credentials {
                username: self.credentials.username.clone(),
                password: self.credentials.password.clone(),
                token: Some(Zeroizing::new(token.to_string())),
            }),
        }
    }

    /// Exchange username/password for a token through `provider`.
    ///
    /// Returns a new session that sends the token on every later call.
    pub async fn login(&self, provider: &str) -> Result<Session, BigIqError> {
        let request = Request::new(Method::POST, LOGIN_PATH).json(&LoginRequest {
            username: &self.credentials.username,
            password: &self.credentials.password,
            login_provider_name: provider,
        })?;
        let endpoint = request.endpoint();
        let bytes = self.call(&request).await?;
        let response: LoginResponse = decode(&endpoint, &bytes)?;
        let token = response
            .token
            .map(|t| t.token)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| {
                BigIqError::Authentication(format!(
                    "login through provider {provider} returned no token"
                ))
            })?;
        tracing::info!(
            host = %self.host,
            username = %self.credentials.username,
            provider,
            "token login succeeded"
        );
        Ok(self.with_token(&token))
    }

    /// Send one request and return the raw success body.
    ///
    /// Error statuses become [`BigIqError::Api`] when the response is JSON and
    /// [`BigIqError::Status`] otherwise. Transport failures are not retried.
    pub async fn call(&self, request: &Request) -> Result<Vec<u8>, BigIqError> {
        let endpoint = request.endpoint();
        let url = resolve_url(&self.host, &request.path, &request.namespace)?;

        let mut builder = self
            .http
            .request(request.method.clone(), url)
            .header(CONTENT_TYPE, request.content_type.as_str());
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if !request.path.contains(LOGIN_PATH) {
            builder = match &self.credentials.token {
                Some(token) => builder.header(TOKEN_HEADER, token.as_str()),
                None => builder.basic_auth(
                    &self.credentials.username,
                    Some(self.credentials.password.as_str()),
                ),
            };
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        tracing::debug!(%endpoint, "calling BIG-IQ");
        let resp = builder.send().await.map_err(|e| BigIqError::Http {
            endpoint: endpoint.clone(),
            source: e,
        })?;

        let status = resp.status().as_u16();
        let is_json = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.contains(JSON));
        let bytes = resp.bytes().await.map_err(|e| BigIqError::Http {
            endpoint: endpoint.clone(),
            source: e,
        })?;

        if status >= 400 {
            tracing::debug!(%endpoint, status, "BIG-IQ returned an error status");
            return Err(classify_error(&endpoint, status, is_json, &bytes));
        }
        Ok(bytes.to_vec())
    }

    /// Send a request whose success body is not needed.
    pub async fn send(&self, request: &Request) -> Result<(), BigIqError> {
        self.call(request).await.map(|_| ())
    }

    /// GET an entity; a structured 404 yields `Ok(None)`.
    pub async fn get_entity<T: DeserializeOwned>(&self, path: &str) -> Result<Option<T>, BigIqError> {
        let request = Request::new(Method::GET, path);
        match self.call(&request).await {
            Ok(bytes) => decode(&request.endpoint(), &bytes).map(Some),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// GET an entity that must exist; a structured 404 yields `NotFound`.
    pub async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, BigIqError> {
        self.get_entity(path)
            .await?
            .ok_or_else(|| BigIqError::NotFound {
                entity: path.to_string(),
            })
    }

    pub async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, BigIqError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::POST, path, body).await
    }

    pub async fn put_json<B, T>(&self, path: &str, body: &B) -> Result<T, BigIqError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PUT, path, body).await
    }

    pub async fn patch_json<B, T>(&self, path: &str, body: &B) -> Result<T, BigIqError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.send_json(Method::PATCH, path, body).await
    }

    pub async fn delete(&self, path: &str) -> Result<(), BigIqError> {
        self.send(&Request::new(Method::DELETE, path)).await
    }

    pub async fn delete_with_body<B: Serialize + ?Sized>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<(), BigIqError> {
        self.send(&Request::new(Method::DELETE, path).json(body)?)
            .await
    }

    async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, BigIqError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let request = Request::new(method, path).json(body)?;
        let bytes = self.call(&request).await?;
        decode(&request.endpoint(), &bytes)
    }
}

/// Paths starting with `mgmt/` are absolute under the host; anything else is
/// placed under `namespace`.
pub(crate) fn resolve_url(host: &Url, path: &str, namespace: &str) -> Result<Url, BigIqError> {
    let path = path.trim_start_matches('/');
    let full = if path.starts_with("mgmt/") {
        path.to_string()
    } else {
        format!("{}/{}", namespace.trim_matches('/'), path)
    };
    host.join(&full)
        .map_err(|e| BigIqError::Validation(format!("cannot resolve {full} against {host}: {e}")))
}

/// Turn an error response into `Api` (parseable JSON body) or `Status`.
pub(crate) fn classify_error(endpoint: &str, status: u16, is_json: bool, body: &[u8]) -> BigIqError {
    let text = String::from_utf8_lossy(body).into_owned();
    if is_json {
        if let Ok(error) = serde_json::from_slice::<ApiErrorBody>(body) {
            return BigIqError::Api {
                endpoint: endpoint.to_string(),
                status,
                error,
                body: text,
            };
        }
    }
    BigIqError::Status {
        endpoint: endpoint.to_string(),
        status,
        body: text,
    }
}
