//! Module proxy client.
//!
//! Resolves `latest` pins by asking each configured proxy, in order, for
//! `{proxy}/{escaped-module}/@latest`. The first proxy to answer wins; every
//! failure along the way is reported in the [`Resolution`].

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};

use anyhow::{Context, Result};
use reqwest::{Method, StatusCode};
use tokio::runtime::Runtime;
use serde::Deserialize;
use url::Url;

use crate::resolver::endpoints::{EndpointProvider, ProxyList};
use crate::resolver::errors::LookupError;
use crate::resolver::escape::escape_path;
use crate::resolver::{LatestResolver, Resolution};
use crate::util::cancel::CancelToken;
use crate::util::config::Config;
use crate::util::errors::AggregateError;
use crate::util::netrc::MachineLookup;
use crate::util::parallel::ParallelMapper;
use crate::util::request::{NetrcAuth, RequestFactory};

/// Body of a proxy `@latest` response.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LatestInfo {
    #[serde(rename = "Version", alias = "version")]
    pub version: String,
    /// RFC 3339 commit time, when the proxy reports one
    #[serde(default, rename = "Time", alias = "time")]
    pub time: Option<String>,
}

/// Looks up latest versions through module proxies.
///
/// Lookups fan out over the worker pool; each worker drives its request on
/// the client's own runtime so the request can be dropped mid-flight when
/// the run is cancelled.
pub struct ProxyClient {
    requests: RequestFactory,
    endpoints: Box<dyn EndpointProvider>,
    mapper: Arc<ParallelMapper>,
    runtime: Runtime,
}

impl ProxyClient {
    pub fn new(
        requests: RequestFactory,
        endpoints: impl EndpointProvider + 'static,
        mapper: Arc<ParallelMapper>,
    ) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("versionist-http")
            .enable_all()
            .build()
            .context("failed to start HTTP runtime")?;

        Ok(ProxyClient {
            requests,
            endpoints: Box::new(endpoints),
            mapper,
            runtime,
        })
    }

    /// Build a client from the run configuration.
    ///
    /// Credentials are optional: when the netrc file cannot be loaded the
    /// problem is logged and lookups go out unauthenticated.
    pub fn from_config(config: &Config, mapper: Arc<ParallelMapper>) -> Result<Self> {
        let mut requests = RequestFactory::new(config.request_timeout, &config.user_agent)?;

        match config.load_machines() {
            Ok(machines) => {
                tracing::debug!("loaded {} netrc machines", machines.len());
                let machines: Arc<dyn MachineLookup> = Arc::new(machines);
                requests = requests.with_decorator(NetrcAuth::new(machines));
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to load netrc, proxy requests will not be authenticated: {}",
                    e
                );
            }
        }

        Self::new(requests, ProxyList::from_config(config), mapper)
    }

    /// Fetch `@latest` for one project from one proxy.
    ///
    /// Blocks the calling thread. Returns [`LookupError::Cancelled`] as soon
    /// as `cancel` fires, even with the request still in flight.
    pub fn fetch_latest(
        &self,
        endpoint: &Url,
        project: &str,
        cancel: &CancelToken,
    ) -> Result<LatestInfo, LookupError> {
        let url = latest_url(endpoint, project);
        tracing::debug!("GET {}", url);

        self.runtime.block_on(async {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(LookupError::Cancelled {
                    project: project.to_string(),
                }),
                result = self.send_latest(url) => result,
            }
        })
    }

    async fn send_latest(&self, url: Url) -> Result<LatestInfo, LookupError> {
        let response = self
            .requests
            .request(Method::GET, &url)
            .send()
            .await
            .map_err(|source| LookupError::Request {
                url: url.clone(),
                source,
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(LookupError::Status { url, status });
        }

        let body = response.bytes().await.map_err(|source| LookupError::Request {
            url: url.clone(),
            source,
        })?;
        serde_json::from_slice(&body).map_err(|source| LookupError::Decode { url, source })
    }

    /// Try each endpoint in order until one resolves `project`.
    fn resolve_project(
        &self,
        project: &str,
        endpoints: &[Url],
        versions: &Mutex<BTreeMap<String, String>>,
        cancel: &CancelToken,
    ) -> AggregateError {
        let mut errors = AggregateError::new();

        for endpoint in endpoints {
            let resolved = versions
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .contains_key(project);
            if resolved {
                tracing::info!("Already resolved project version for {}", project);
                break;
            }
            if cancel.is_cancelled() {
                errors.push(LookupError::Cancelled {
                    project: project.to_string(),
                });
                break;
            }

            match self.fetch_latest(endpoint, project, cancel) {
                Err(e @ LookupError::Cancelled { .. }) => {
                    tracing::warn!("{}", e);
                    errors.push(e);
                    break;
                }
                Ok(info) => {
                    tracing::debug!("{} resolved to {} via {}", project, info.version, endpoint);
                    versions
                        .lock()
                        .unwrap_or_else(PoisonError::into_inner)
                        .insert(project.to_string(), info.version);
                    break;
                }
                Err(e) => {
                    tracing::warn!("{}", e);
                    errors.push(e);
                }
            }
        }

        errors
    }
}

impl LatestResolver for ProxyClient {
    fn resolve_latest(&self, projects: &BTreeSet<String>, cancel: &CancelToken) -> Resolution {
        let endpoints = self.endpoints.endpoints();
        if endpoints.is_empty() {
            tracing::info!("No proxies configured, skipping latest version lookups");
            return Resolution::default();
        }

        let versions = Mutex::new(BTreeMap::new());
        let failures = Mutex::new(AggregateError::new());

        let mut errors = self.mapper.map_entries(projects.iter().map(|p| (p, ())), |project, _| {
            let errs = self.resolve_project(project, &endpoints, &versions, cancel);
            failures
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .extend(errs);
            Ok(())
        });
        errors.extend(failures.into_inner().unwrap_or_else(PoisonError::into_inner));

        Resolution {
            versions: versions.into_inner().unwrap_or_else(PoisonError::into_inner),
            errors,
        }
    }
}

/// `{endpoint}/{escaped project}/@latest`
pub fn latest_url(endpoint: &Url, project: &str) -> Url {
    let mut url = endpoint.clone();
    let base = endpoint.path().trim_end_matches('/');
    url.set_path(&format!("{}/{}/@latest", base, escape_path(project)));
    url
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::endpoints::StaticEndpoints;
    use std::time::Duration;

    fn client(endpoints: &str) -> ProxyClient {
        let requests = RequestFactory::new(Duration::from_secs(5), "versionist-test").unwrap();
        let mapper = Arc::new(ParallelMapper::new(2).unwrap());
        ProxyClient::new(requests, ProxyList::new(endpoints), mapper).unwrap()
    }

    #[test]
    fn test_latest_url() {
        let base = Url::parse("https://proxy.example/").unwrap();
        assert_eq!(
            latest_url(&base, "github.com/BurntSushi/toml").as_str(),
            "https://proxy.example/github.com/!burnt!sushi/toml/@latest"
        );

        let nested = Url::parse("https://corp.example/go/proxy/").unwrap();
        assert_eq!(
            latest_url(&nested, "golang.org/x/mod").as_str(),
            "https://corp.example/go/proxy/golang.org/x/mod/@latest"
        );
    }

    #[test]
    fn test_decode_latest_info() {
        let info: LatestInfo =
            serde_json::from_str(r#"{"Version":"v1.2.3","Time":"2023-01-02T03:04:05Z"}"#).unwrap();
        assert_eq!(info.version, "v1.2.3");
        assert_eq!(info.time.as_deref(), Some("2023-01-02T03:04:05Z"));

        let info: LatestInfo = serde_json::from_str(r#"{"version":"v2.0.0"}"#).unwrap();
        assert_eq!(info.version, "v2.0.0");
        assert_eq!(info.time, None);
    }

    #[test]
    fn test_off_makes_no_requests() {
        let client = client("off,https://proxy.example");
        let projects: BTreeSet<String> = ["a.example/lib".to_string()].into();

        let resolution = client.resolve_latest(&projects, &CancelToken::new());
        assert!(resolution.versions.is_empty());
        assert!(resolution.errors.is_empty());
    }

    #[test]
    fn test_cancelled_before_lookup() {
        let requests = RequestFactory::new(Duration::from_secs(5), "versionist-test").unwrap();
        let mapper = Arc::new(ParallelMapper::new(1).unwrap());
        let client = ProxyClient::new(
            requests,
            StaticEndpoints(vec![Url::parse("http://127.0.0.1:9/").unwrap()]),
            mapper,
        )
        .unwrap();
        let cancel = CancelToken::new();
        cancel.cancel();

        let projects: BTreeSet<String> = ["a".to_string(), "b".to_string()].into();
        let resolution = client.resolve_latest(&projects, &cancel);

        assert!(resolution.versions.is_empty());
        assert_eq!(resolution.errors.len(), 2);
        assert!(resolution.errors.contains::<LookupError>());
    }
}
