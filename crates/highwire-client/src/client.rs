//! Highwire API client
//!
//! Implements the Highwire LTM REST API used by the Ilb controller.
//! Endpoints: /login, /ltm/pools and /ltm/virtualServers. Every call is
//! authenticated with `?apiToken=<token>` from the shared session.

use crate::error::HighwireError;
use crate::highwire_trait::HighwireClientTrait;
use crate::models::*;
use crate::session::Session;
use chrono::Utc;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::Serialize;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

const LOGIN: &str = "login";
const POOLS: &str = "ltm/pools";
const VIRTUAL_SERVERS: &str = "ltm/virtualServers";

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);

/// Connection settings for a Highwire endpoint
#[derive(Debug, Clone)]
pub struct HighwireConfig {
    /// e.g. "https://highwire.example.com/v1"
    pub base_url: String,
    pub domain: String,
    pub username: String,
    pub secret: String,
    /// Per-request timeout; zero selects `DEFAULT_TIMEOUT`
    pub timeout: Duration,
}

/// Highwire API client
pub struct HighwireClient {
    client: Client,
    base_url: String,
    domain: String,
    username: String,
    secret: String,
    session: Mutex<Session>,
}

impl std::fmt::Debug for HighwireClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HighwireClient")
            .field("base_url", &self.base_url)
            .field("domain", &self.domain)
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl HighwireClient {
    /// Create a new Highwire client
    ///
    /// Fails when the base URL or credentials are missing, so a bad
    /// deployment stops before the first reconcile.
    pub fn new(config: HighwireConfig) -> Result<Self, HighwireError> {
        if config.base_url.trim().is_empty() {
            return Err(HighwireError::InvalidConfig("base URL is required".to_string()));
        }
        if config.username.is_empty() || config.secret.is_empty() {
            return Err(HighwireError::InvalidConfig(
                "username and secret are required".to_string(),
            ));
        }

        let timeout = if config.timeout.is_zero() {
            DEFAULT_TIMEOUT
        } else {
            config.timeout
        };
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim().trim_end_matches('/').to_string(),
            domain: config.domain,
            username: config.username,
            secret: config.secret,
            session: Mutex::new(Session::default()),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Return a usable token, logging in when the cached one is missing or
    /// about to expire.
    ///
    /// The session lock is held across the login so concurrent reconciles
    /// wait for one login instead of each issuing their own.
    pub async fn token(&self) -> Result<String, HighwireError> {
        let mut session = self.session.lock().await;

        if let Some(token) = session.valid_token(Utc::now()) {
            debug!(
                "Highwire token valid until {:?}",
                session.expires_at()
            );
            return Ok(token.to_string());
        }

        let (token, expires_in) = self.login().await?;
        session.store(token.clone(), expires_in, Utc::now());
        info!("Obtained Highwire token, expires at {:?}", session.expires_at());
        Ok(token)
    }

    async fn login(&self) -> Result<(String, Option<f64>), HighwireError> {
        let body = LoginRequest {
            domain: self.domain.clone(),
            username: self.username.clone(),
            password: self.secret.clone(),
        };

        debug!("Logging in to Highwire as {}", self.username);
        let response = self
            .client
            .post(self.url(LOGIN))
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.bytes().await.unwrap_or_default();
            let err = HighwireError::from_response(status.as_u16(), &body);
            error!("Highwire login failed: {}", err);
            return Err(HighwireError::Authentication(format!(
                "{} - {}",
                status.as_u16(),
                err.operator_text()
            )));
        }

        let login: LoginResponse = response.json().await?;
        let token = login.api_token.ok_or_else(|| {
            HighwireError::Authentication("login response did not contain an apiToken".to_string())
        })?;
        if login.session_expires.is_none() {
            warn!("Highwire login response has no sessionExpires, token will not be cached");
        }
        Ok((token, login.session_expires))
    }

    /// Authenticated request builder for `path`
    async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<RequestBuilder, HighwireError> {
        let token = self.token().await?;
        Ok(self
            .client
            .request(method, self.url(path))
            .query(&[("apiToken", token)])
            .query(query)
            .header("content-type", "application/json"))
    }

    /// Send and classify; non-2xx responses become `HighwireError::Api`.
    async fn execute(&self, request: RequestBuilder, what: &str) -> Result<Response, HighwireError> {
        let response = request.send().await?;
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.bytes().await.unwrap_or_default();
        let err = HighwireError::from_response(status.as_u16(), &body);
        debug!(
            "Highwire {} failed with {}: {}",
            what,
            status,
            String::from_utf8_lossy(&body)
        );
        if status == StatusCode::UNAUTHORIZED {
            warn!("Highwire rejected the cached token, logging in again on the next call");
            self.session.lock().await.clear();
        }
        Err(err)
    }

    async fn send_json<B: Serialize + Sync + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
        what: &str,
    ) -> Result<(), HighwireError> {
        let request = self.request(method, path, &[]).await?.json(body);
        self.execute(request, what).await?;
        Ok(())
    }
}

#[async_trait::async_trait]
impl HighwireClientTrait for HighwireClient {
    fn base_url(&self) -> &str {
        self.base_url()
    }

    async fn list_virtual_servers(&self, environment: i64) -> Result<Vec<VirtualServer>, HighwireError> {
        debug!("Listing Highwire virtual servers in environment {}", environment);
        let request = self
            .request(Method::GET, VIRTUAL_SERVERS, &[("environment", environment.to_string())])
            .await?;
        let list: VirtualServerList = self
            .execute(request, "list virtual servers")
            .await?
            .json()
            .await?;
        Ok(list.virtual_servers)
    }

    async fn create_virtual_server(&self, vs: &VirtualServer) -> Result<(), HighwireError> {
        info!("Creating Highwire virtual server {}", vs.name);
        self.send_json(Method::POST, VIRTUAL_SERVERS, vs, "create virtual server")
            .await
    }

    async fn update_virtual_server(&self, id: i64, vs: &VirtualServer) -> Result<(), HighwireError> {
        let path = format!("{}/{}", VIRTUAL_SERVERS, id);
        self.send_json(Method::PUT, &path, vs, "update virtual server")
            .await
    }

    async fn delete_virtual_server(&self, id: i64) -> Result<(), HighwireError> {
        let path = format!("{}/{}", VIRTUAL_SERVERS, id);
        let request = self.request(Method::DELETE, &path, &[]).await?;
        self.execute(request, "delete virtual server").await?;
        Ok(())
    }

    async fn list_pools(&self, environment: i64) -> Result<Vec<Pool>, HighwireError> {
        debug!("Listing Highwire pools in environment {}", environment);
        let request = self
            .request(Method::GET, POOLS, &[("environment", environment.to_string())])
            .await?;
        let list: PoolList = self.execute(request, "list pools").await?.json().await?;
        Ok(list.pools)
    }

    async fn create_pool(&self, pool: &Pool) -> Result<(), HighwireError> {
        info!("Creating Highwire pool {}", pool.name);
        self.send_json(Method::POST, POOLS, pool, "create pool").await
    }

    async fn delete_pool(&self, id: i64) -> Result<(), HighwireError> {
        let path = format!("{}/{}", POOLS, id);
        let request = self.request(Method::DELETE, &path, &[]).await?;
        self.execute(request, "delete pool").await?;
        Ok(())
    }

    async fn get_pool_members(&self, pool_id: i64) -> Result<Vec<PoolMember>, HighwireError> {
        let path = format!("{}/{}/members", POOLS, pool_id);
        let request = self.request(Method::GET, &path, &[]).await?;
        let pool: Pool = self.execute(request, "get pool members").await?.json().await?;
        Ok(pool.members.unwrap_or_default())
    }

    async fn replace_pool_members(&self, pool_id: i64, pool: &Pool) -> Result<(), HighwireError> {
        let path = format!("{}/{}/members", POOLS, pool_id);
        self.send_json(Method::PUT, &path, pool, "replace pool members")
            .await
    }
}
