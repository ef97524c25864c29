//! Outbound request construction.
//!
//! Every proxy lookup goes through a [`RequestFactory`], which builds the
//! request on a shared client and then lets each configured
//! [`RequestDecorator`] adjust it (authentication, extra headers).

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, RequestBuilder};
use reqwest::header::HeaderMap;
use reqwest::Method;
use url::Url;

use crate::util::netrc::MachineLookup;

/// Adjusts a request before it is sent.
pub trait RequestDecorator: Send + Sync {
    fn decorate(&self, url: &Url, request: RequestBuilder) -> RequestBuilder;
}

/// Applies HTTP basic authentication from netrc credentials.
pub struct NetrcAuth {
    machines: Arc<dyn MachineLookup>,
}

impl NetrcAuth {
    pub fn new(machines: Arc<dyn MachineLookup>) -> Self {
        NetrcAuth { machines }
    }
}

impl RequestDecorator for NetrcAuth {
    fn decorate(&self, url: &Url, request: RequestBuilder) -> RequestBuilder {
        let Some(host) = request_host(url) else {
            return request;
        };
        match self.machines.credentials(&host) {
            Some(creds) => {
                tracing::debug!("using netrc credentials for {}", host);
                request.basic_auth(&creds.login, Some(&creds.password))
            }
            None => request,
        }
    }
}

/// Adds a fixed set of headers to every request.
pub struct StaticHeaders {
    headers: HeaderMap,
}

impl StaticHeaders {
    pub fn new(headers: HeaderMap) -> Self {
        StaticHeaders { headers }
    }
}

impl RequestDecorator for StaticHeaders {
    fn decorate(&self, _url: &Url, request: RequestBuilder) -> RequestBuilder {
        request.headers(self.headers.clone())
    }
}

/// Builds decorated requests on a shared client.
pub struct RequestFactory {
    client: Client,
    decorators: Vec<Box<dyn RequestDecorator>>,
}

impl RequestFactory {
    /// Create a factory whose client applies `timeout` to every request.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self::with_client(client))
    }

    pub fn with_client(client: Client) -> Self {
        RequestFactory {
            client,
            decorators: Vec::new(),
        }
    }

    /// Append a decorator. Decorators run in the order they were added.
    pub fn with_decorator(mut self, decorator: impl RequestDecorator + 'static) -> Self {
        self.decorators.push(Box::new(decorator));
        self
    }

    pub fn decorator_count(&self) -> usize {
        self.decorators.len()
    }

    /// Build a request for `url` with every decorator applied.
    pub fn request(&self, method: Method, url: &Url) -> RequestBuilder {
        self.decorators
            .iter()
            .fold(self.client.request(method, url.clone()), |req, d| {
                d.decorate(url, req)
            })
    }
}

/// The `host[:port]` a request is addressed to.
fn request_host(url: &Url) -> Option<String> {
    let host = url.host_str()?;
    Some(match url.port() {
        Some(port) => format!("{}:{}", host, port),
        None => host.to_string(),
    })
}
