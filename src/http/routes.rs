//! Route table: matching requests and rewriting them onto targets.
//!
//! # Design Decisions
//! - Host matching is case-insensitive (per HTTP spec), exact
//! - Path matching is a case-sensitive prefix check
//! - Routes are checked longest-prefix-first so the most specific wins
//! - No regex, matching stays O(routes)

use axum::body::Body;
use axum::http::{Request, Uri};
use url::Url;

use crate::config::schema::RouteConfig;

/// One compiled route.
pub struct Route {
    /// Identifier for logging/metrics.
    pub name: String,

    /// Expected Host header, lowercased. None matches any host.
    host: Option<String>,

    /// Path prefix; the empty string matches every path.
    path_prefix: String,

    /// Upstream base URL.
    target: Url,
}

impl Route {
    fn matches(&self, req: &Request<Body>) -> bool {
        if let Some(expected) = &self.host {
            let matched = req
                .headers()
                .get("host")
                .and_then(|h| h.to_str().ok())
                .map(|h| h.to_lowercase() == *expected)
                .unwrap_or(false);
            if !matched {
                return false;
            }
        }
        req.uri().path().starts_with(&self.path_prefix)
    }

    /// The upstream URI for a request path and query: target authority,
    /// target base path joined with what follows the matched prefix.
    pub fn upstream_uri(
        &self,
        path: &str,
        query: Option<&str>,
    ) -> Result<Uri, axum::http::uri::InvalidUri> {
        let rest = path.strip_prefix(&self.path_prefix).unwrap_or(path);
        let full_path = join_paths(self.target.path(), rest);

        let mut uri = format!(
            "{}://{}{}",
            self.target.scheme(),
            self.target.authority(),
            full_path
        );
        if let Some(query) = query {
            uri.push('?');
            uri.push_str(query);
        }
        uri.parse()
    }
}

fn join_paths(base: &str, rest: &str) -> String {
    let base = base.trim_end_matches('/');
    let rest = rest.trim_start_matches('/');
    if rest.is_empty() {
        if base.is_empty() {
            "/".to_string()
        } else {
            base.to_string()
        }
    } else {
        format!("{base}/{rest}")
    }
}

/// All routes of a listener, in matching order.
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub fn from_config(configs: &[RouteConfig]) -> Result<Self, url::ParseError> {
        let mut routes = configs
            .iter()
            .map(|c| {
                Ok(Route {
                    name: c.name.clone(),
                    host: c.host.as_ref().map(|h| h.to_lowercase()),
                    path_prefix: c.path_prefix.clone().unwrap_or_default(),
                    target: Url::parse(&c.target)?,
                })
            })
            .collect::<Result<Vec<_>, url::ParseError>>()?;

        routes.sort_by(|a, b| b.path_prefix.len().cmp(&a.path_prefix.len()));
        Ok(RouteTable { routes })
    }

    /// The first route matching the request, if any.
    pub fn match_request(&self, req: &Request<Body>) -> Option<&Route> {
        self.routes.iter().find(|r| r.matches(req))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(configs: &[(&str, Option<&str>, Option<&str>, &str)]) -> RouteTable {
        let configs: Vec<RouteConfig> = configs
            .iter()
            .map(|(name, host, prefix, target)| RouteConfig {
                name: name.to_string(),
                host: host.map(str::to_string),
                path_prefix: prefix.map(str::to_string),
                target: target.to_string(),
            })
            .collect();
        RouteTable::from_config(&configs).unwrap()
    }

    fn request(host: Option<&str>, path: &str) -> Request<Body> {
        let mut builder = Request::builder().uri(format!("http://unit.test{path}"));
        if let Some(host) = host {
            builder = builder.header("Host", host);
        }
        builder.body(Body::default()).unwrap()
    }

    #[test]
    fn host_match_is_case_insensitive() {
        let t = table(&[("web", Some("example.com"), None, "http://127.0.0.1:3000/")]);
        assert!(t.match_request(&request(Some("example.com"), "/")).is_some());
        assert!(t.match_request(&request(Some("EXAMPLE.COM"), "/")).is_some());
        assert!(t.match_request(&request(Some("other.com"), "/")).is_none());
        assert!(t.match_request(&request(None, "/")).is_none());
    }

    #[test]
    fn longest_prefix_wins() {
        let t = table(&[
            ("root", None, Some("/"), "http://127.0.0.1:3000/"),
            ("api", None, Some("/api"), "http://127.0.0.1:4000/"),
        ]);
        assert_eq!(t.match_request(&request(None, "/api/v1")).unwrap().name, "api");
        assert_eq!(t.match_request(&request(None, "/index")).unwrap().name, "root");
    }

    #[test]
    fn upstream_uri_joins_paths() {
        let t = table(&[("api", None, Some("/api"), "http://127.0.0.1:4000/svc")]);
        let route = t.match_request(&request(None, "/api/v1/items")).unwrap();

        let uri = route.upstream_uri("/api/v1/items", None).unwrap();
        assert_eq!(uri.to_string(), "http://127.0.0.1:4000/svc/v1/items");

        let uri = route.upstream_uri("/api", Some("q=1")).unwrap();
        assert_eq!(uri.to_string(), "http://127.0.0.1:4000/svc?q=1");
    }

    #[test]
    fn bare_target_keeps_root_path() {
        let t = table(&[("root", None, Some("/"), "http://127.0.0.1:3000/")]);
        let route = t.match_request(&request(None, "/")).unwrap();
        let uri = route.upstream_uri("/", None).unwrap();
        assert_eq!(uri.to_string(), "http://127.0.0.1:3000/");
    }
}
