//! Proxy endpoint lists.
//!
//! The list uses `GOPROXY` syntax: entries separated by `,` or `|`.
//! `off` disables lookups entirely, `direct` is not a network endpoint and is
//! skipped, and anything else must be an absolute `http(s)` URL.

use url::Url;

use crate::util::config::Config;

/// Supplies the ordered list of proxies to query.
pub trait EndpointProvider: Send + Sync {
    fn endpoints(&self) -> Vec<Url>;
}

/// Endpoints parsed from a `GOPROXY`-style list.
#[derive(Debug, Clone)]
pub struct ProxyList {
    raw: String,
}

impl ProxyList {
    pub fn new(raw: impl Into<String>) -> Self {
        ProxyList { raw: raw.into() }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.proxy_list.clone())
    }
}

impl EndpointProvider for ProxyList {
    fn endpoints(&self) -> Vec<Url> {
        parse_proxy_list(&self.raw)
    }
}

/// A fixed list of endpoints.
#[derive(Debug, Clone, Default)]
pub struct StaticEndpoints(pub Vec<Url>);

impl EndpointProvider for StaticEndpoints {
    fn endpoints(&self) -> Vec<Url> {
        self.0.clone()
    }
}

/// Parse a proxy list into the URLs worth querying, in order.
pub fn parse_proxy_list(raw: &str) -> Vec<Url> {
    let mut urls = Vec::new();

    for entry in raw.split([',', '|']).map(str::trim) {
        match entry {
            "off" => return Vec::new(),
            "direct" | "" => continue,
            _ => {}
        }

        let Ok(url) = Url::parse(entry) else {
            tracing::debug!("ignoring unparsable proxy entry {}", entry);
            continue;
        };
        let is_http = matches!(url.scheme(), "http" | "https");
        if !is_http || url.host_str().map_or(true, str::is_empty) {
            tracing::debug!("ignoring non-http proxy entry {}", entry);
            continue;
        }
        urls.push(url);
    }

    urls
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(raw: &str) -> Vec<String> {
        parse_proxy_list(raw)
            .into_iter()
            .map(|u| u.to_string())
            .collect()
    }

    #[test]
    fn test_default_list() {
        assert_eq!(
            parsed(crate::util::config::DEFAULT_PROXY_LIST),
            vec!["https://proxy.golang.org/"]
        );
    }

    #[test]
    fn test_off_discards_everything() {
        assert!(parsed("off,https://proxy.example").is_empty());
        assert!(parsed("https://proxy.example|off").is_empty());
    }

    #[test]
    fn test_both_separators_and_order() {
        assert_eq!(
            parsed("https://a.example|http://b.example:8080/base,direct"),
            vec!["https://a.example/", "http://b.example:8080/base"]
        );
    }

    #[test]
    fn test_invalid_entries_are_skipped() {
        assert_eq!(
            parsed("file:///srv/proxy,not a url,ftp://c.example,https://d.example"),
            vec!["https://d.example/"]
        );
    }

    #[test]
    fn test_providers() {
        let list = ProxyList::new("https://a.example,direct");
        assert_eq!(list.endpoints().len(), 1);

        let fixed = StaticEndpoints(vec![Url::parse("https://z.example").unwrap()]);
        assert_eq!(fixed.endpoints()[0].host_str(), Some("z.example"));
    }
}
