//! HTTP backend for the dashboards REST API.
//!
//! Uses a blocking `ureq` agent with bearer-token auth. Non-success
//! responses are turned into [`Error::Api`] with the service's structured
//! `error_code` preserved. Only `get` is retried on transient errors.

use crate::backend::Backend;
use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::retry::{RetryConfig, with_retry};
use crate::types::{CreateDashboard, Dashboard, PublishRequest, UpdateDashboard};
use serde::Serialize;
use serde::de::DeserializeOwned;
use ureq::Agent;
use ureq::http::Response;

const DASHBOARDS_PATH: &str = "/api/2.0/lakeview/dashboards";
const MKDIRS_PATH: &str = "/api/2.0/workspace/mkdirs";
const USER_AGENT: &str = concat!("dashctl-lakeview/", env!("CARGO_PKG_VERSION"));

/// Dashboards API client over HTTP.
///
/// # Example
///
/// ```no_run
/// use lakeview::{Backend, ClientConfig};
/// use lakeview::backend::http::HttpBackend;
///
/// let config = ClientConfig::new("https://example.cloud.databricks.com", "dapi123");
/// let backend = HttpBackend::new(&config).unwrap();
/// let dashboard = backend.get("01ef0123456789").unwrap();
/// println!("{} is {}", dashboard.display_name, dashboard.lifecycle_state);
/// ```
pub struct HttpBackend {
    agent: Agent,
    host: String,
    authorization: String,
    retry: RetryConfig,
}

#[derive(Serialize)]
struct MkdirsRequest<'a> {
    path: &'a str,
}

impl HttpBackend {
    /// Create a backend from a validated client configuration.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        config.validate()?;

        let agent_config = Agent::config_builder()
            .timeout_global(Some(config.timeout))
            .http_status_as_error(false)
            .build();

        Ok(Self {
            agent: Agent::new_with_config(agent_config),
            host: config.normalized_host(),
            authorization: format!("Bearer {}", config.token),
            retry: config.retry.clone(),
        })
    }

    /// Base URL requests are sent to.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    fn dashboards_url(&self) -> String {
        format!("{}{}", self.host, DASHBOARDS_PATH)
    }

    fn dashboard_url(&self, dashboard_id: &str) -> String {
        format!("{}{}/{}", self.host, DASHBOARDS_PATH, dashboard_id)
    }

    fn publish_url(&self, dashboard_id: &str) -> String {
        format!("{}/published", self.dashboard_url(dashboard_id))
    }

    fn mkdirs_url(&self) -> String {
        format!("{}{}", self.host, MKDIRS_PATH)
    }

    fn get_once(&self, dashboard_id: &str) -> Result<Dashboard> {
        let url = self.dashboard_url(dashboard_id);
        log::debug!("GET {url}");
        let response = self
            .agent
            .get(&url)
            .header("Authorization", self.authorization.as_str())
            .header("User-Agent", USER_AGENT)
            .call()?;
        read_json(check(response)?)
    }
}

/// Turn a non-success response into an [`Error::Api`].
fn check(mut response: Response<ureq::Body>) -> Result<Response<ureq::Body>> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.body_mut().read_to_string().unwrap_or_default();
    let err = Error::from_response(status.as_u16(), &body);
    log::debug!("HTTP {} ({}): {}", status.as_u16(), err.category(), err);
    Err(err)
}

fn read_json<T: DeserializeOwned>(mut response: Response<ureq::Body>) -> Result<T> {
    response
        .body_mut()
        .read_json()
        .map_err(|e| Error::InvalidResponse(e.to_string()))
}

impl Backend for HttpBackend {
    fn create(&self, request: &CreateDashboard) -> Result<Dashboard> {
        let url = self.dashboards_url();
        log::debug!("POST {url} (parent {})", request.parent_path);
        let response = self
            .agent
            .post(&url)
            .header("Authorization", self.authorization.as_str())
            .header("User-Agent", USER_AGENT)
            .send_json(request)?;
        read_json(check(response)?)
    }

    fn get(&self, dashboard_id: &str) -> Result<Dashboard> {
        with_retry(&self.retry, "get dashboard", || self.get_once(dashboard_id))
    }

    fn update(&self, dashboard_id: &str, request: &UpdateDashboard) -> Result<Dashboard> {
        let url = self.dashboard_url(dashboard_id);
        log::debug!("PATCH {url}");
        let response = self
            .agent
            .patch(&url)
            .header("Authorization", self.authorization.as_str())
            .header("User-Agent", USER_AGENT)
            .send_json(request)?;
        read_json(check(response)?)
    }

    fn publish(&self, request: &PublishRequest) -> Result<()> {
        let url = self.publish_url(&request.dashboard_id);
        let body = request.body();
        log::debug!("POST {url} {body}");
        let response = self
            .agent
            .post(&url)
            .header("Authorization", self.authorization.as_str())
            .header("User-Agent", USER_AGENT)
            .send_json(&body)?;
        check(response)?;
        Ok(())
    }

    fn trash(&self, dashboard_id: &str) -> Result<()> {
        let url = self.dashboard_url(dashboard_id);
        log::debug!("DELETE {url}");
        let response = self
            .agent
            .delete(&url)
            .header("Authorization", self.authorization.as_str())
            .header("User-Agent", USER_AGENT)
            .call()?;
        check(response)?;
        Ok(())
    }

    fn mkdirs(&self, path: &str) -> Result<()> {
        let url = self.mkdirs_url();
        log::debug!("POST {url} (path {path})");
        let response = self
            .agent
            .post(&url)
            .header("Authorization", self.authorization.as_str())
            .header("User-Agent", USER_AGENT)
            .send_json(&MkdirsRequest { path })?;
        check(response)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend() -> HttpBackend {
        HttpBackend::new(&ClientConfig::new("https://example.cloud.databricks.com/", "t")).unwrap()
    }

    #[test]
    fn test_urls() {
        let backend = backend();
        assert_eq!(
            backend.dashboards_url(),
            "https://example.cloud.databricks.com/api/2.0/lakeview/dashboards"
        );
        assert_eq!(
            backend.publish_url("01ef"),
            "https://example.cloud.databricks.com/api/2.0/lakeview/dashboards/01ef/published"
        );
        assert_eq!(
            backend.mkdirs_url(),
            "https://example.cloud.databricks.com/api/2.0/workspace/mkdirs"
        );
    }

    #[test]
    fn test_host_without_scheme() {
        let backend =
            HttpBackend::new(&ClientConfig::new("example.cloud.databricks.com", "t")).unwrap();
        assert_eq!(backend.host(), "https://example.cloud.databricks.com");
    }

    #[test]
    fn test_missing_token_is_rejected() {
        let result = HttpBackend::new(&ClientConfig::new("https://example.com", ""));
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_mkdirs_body() {
        let body = serde_json::to_value(MkdirsRequest { path: "/Shared/x" }).unwrap();
        assert_eq!(body["path"], "/Shared/x");
    }
}
