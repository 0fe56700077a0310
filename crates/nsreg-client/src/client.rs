//! reqwest-backed [`Registry`] implementation.

use reqwest::header::CONTENT_TYPE;
use reqwest::{Client, Method, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{Listing, Registry, RemoteError};

const PROJECTS_ENDPOINT: [&str; 2] = ["_namespaced", "projects"];
const LISTING_ENDPOINT: &str = "ls";
const VALUE_ENDPOINT: &str = "namespaced";

/// Client for a single registry instance.
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: Client,
    base: Url,
}

impl RegistryClient {
    pub fn new(base_url: &str) -> Result<Self, RemoteError> {
        Self::with_http(Client::new(), base_url)
    }

    /// Share an existing connection pool across instances.
    pub fn with_http(http: Client, base_url: &str) -> Result<Self, RemoteError> {
        let invalid = |reason: String| RemoteError::InvalidUrl {
            url: base_url.to_string(),
            reason,
        };
        let base = Url::parse(base_url.trim()).map_err(|e| invalid(e.to_string()))?;
        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(invalid("expected an http(s) base address".to_string()));
        }
        Ok(Self { http, base })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Append `fixed` and the non-empty segments of `path` to the base URL.
    fn endpoint(&self, fixed: &[&str], path: &str) -> Url {
        let mut url = self.base.clone();
        if let Ok(mut segments) = url.path_segments_mut() {
            segments.pop_if_empty();
            segments.extend(fixed.iter().copied());
            segments.extend(path.split('/').filter(|s| !s.is_empty()));
        }
        url
    }

    fn value_url(&self, project: &str, path: &str) -> Url {
        self.endpoint(&[VALUE_ENDPOINT, project], path)
    }

    /// Issue a request. `Ok(None)` means the service answered 204 No Content.
    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<Option<Vec<u8>>, RemoteError> {
        tracing::debug!(%method, %url, "Registry request");

        let mut request = self
            .http
            .request(method.clone(), url.clone())
            .header(CONTENT_TYPE, "application/json");
        if let Some(body) = body {
            request = request.body(serde_json::to_vec(body)?);
        }

        let response = request.send().await?;
        let status = response.status();
        let payload = response.bytes().await?;

        if !status.is_success() {
            let err = RemoteError::from_response(status.as_u16(), &payload);
            tracing::debug!(
                %method,
                %url,
                status = status.as_u16(),
                error = %err,
                "Registry request failed"
            );
            return Err(err);
        }
        if status == StatusCode::NO_CONTENT {
            return Ok(None);
        }
        Ok(Some(payload.to_vec()))
    }

    async fn get_json<T>(&self, url: Url) -> Result<T, RemoteError>
    where
        T: DeserializeOwned + Default,
    {
        match self.execute(Method::GET, url, None).await? {
            Some(body) => Ok(serde_json::from_slice(&body)?),
            None => Ok(T::default()),
        }
    }
}

impl Registry for RegistryClient {
    async fn list_projects(&self) -> Result<Vec<String>, RemoteError> {
        self.get_json(self.endpoint(&PROJECTS_ENDPOINT, "")).await
    }

    async fn list_children(&self, project: &str, path: &str) -> Result<Listing, RemoteError> {
        self.get_json(self.endpoint(&[LISTING_ENDPOINT, project], path))
            .await
    }

    async fn get_value(&self, project: &str, path: &str) -> Result<Value, RemoteError> {
        self.get_json(self.value_url(project, path)).await
    }

    async fn set_value(&self, project: &str, path: &str, value: &Value) -> Result<(), RemoteError> {
        self.execute(Method::PUT, self.value_url(project, path), Some(value))
            .await
            .map(|_| ())
    }

    async fn delete_value(&self, project: &str, path: &str) -> Result<(), RemoteError> {
        self.execute(Method::DELETE, self.value_url(project, path), None)
            .await
            .map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints_follow_registry_layout() {
        let client = RegistryClient::new("http://localhost:19950").unwrap();
        assert_eq!(
            client.endpoint(&PROJECTS_ENDPOINT, "").as_str(),
            "http://localhost:19950/_namespaced/projects"
        );
        assert_eq!(
            client.endpoint(&[LISTING_ENDPOINT, "app"], "").as_str(),
            "http://localhost:19950/ls/app"
        );
        assert_eq!(
            client.endpoint(&[LISTING_ENDPOINT, "app"], "cfg/db").as_str(),
            "http://localhost:19950/ls/app/cfg/db"
        );
        assert_eq!(
            client.value_url("app", "flag").as_str(),
            "http://localhost:19950/namespaced/app/flag"
        );
    }

    #[test]
    fn base_path_and_trailing_slash_are_kept_once() {
        let client = RegistryClient::new("http://registry.local/api/").unwrap();
        assert_eq!(
            client.value_url("app", "a//b/").as_str(),
            "http://registry.local/api/namespaced/app/a/b"
        );
    }

    #[test]
    fn segments_are_percent_encoded() {
        let client = RegistryClient::new("http://localhost:1").unwrap();
        assert_eq!(
            client.value_url("my app", "a b").as_str(),
            "http://localhost:1/namespaced/my%20app/a%20b"
        );
    }

    #[test]
    fn rejects_non_http_base() {
        assert!(matches!(
            RegistryClient::new("localhost:19950"),
            Err(RemoteError::InvalidUrl { .. })
        ));
        assert!(RegistryClient::new("not a url").is_err());
        assert!(RegistryClient::new("ftp://host/").is_err());
    }
}
