//! Request classification
//!
//! Every intercepted request falls into exactly one [`RouteClass`], and each
//! class has exactly one [`Strategy`]. The table is evaluated in order and the
//! first match wins, but the static and API predicates never overlap: API
//! routes all live under `/api/`, shell files and assets never do (enforced by
//! `Config::validate`).

use regex::Regex;
use serde::Serialize;
use std::fmt;

/// API resources served by the gateway, each rooted at `/api/{resource}`
const API_RESOURCES: [&str; 5] = ["users", "activities", "events", "news", "polls"];

/// Routing class of a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    /// App shell files and bundled assets
    StaticAsset,
    /// Gateway data endpoints
    ApiResource,
    /// Anything else
    Default,
}

/// How a request is answered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    /// Serve from the static store; go to the network only on a miss
    CacheFirst,
    /// Network first; successful GETs are written to the API store, the API
    /// store answers when the network fails
    NetworkFirstWithWriteBack,
    /// Network first; any store answers when the network fails
    NetworkFirst,
}

impl RouteClass {
    pub fn strategy(self) -> Strategy {
        match self {
            RouteClass::StaticAsset => Strategy::CacheFirst,
            RouteClass::ApiResource => Strategy::NetworkFirstWithWriteBack,
            RouteClass::Default => Strategy::NetworkFirst,
        }
    }
}

impl fmt::Display for RouteClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RouteClass::StaticAsset => "static",
            RouteClass::ApiResource => "api",
            RouteClass::Default => "default",
        };
        f.write_str(s)
    }
}

enum Predicate {
    Pattern(Regex),
    Exact(String),
    Prefix(String),
}

impl Predicate {
    fn matches(&self, path: &str) -> bool {
        match self {
            Predicate::Pattern(re) => re.is_match(path),
            Predicate::Exact(p) => path == p,
            Predicate::Prefix(p) => path.starts_with(p.as_str()),
        }
    }
}

/// Ordered `(predicate, class)` table
pub struct RouteTable {
    routes: Vec<(Predicate, RouteClass)>,
}

impl RouteTable {
    pub fn new(manifest: &[String], assets_prefix: &str) -> Self {
        let mut routes: Vec<(Predicate, RouteClass)> = API_RESOURCES
            .iter()
            .map(|r| format!(r"^/api/{}(/|$)", regex::escape(r)))
            .filter_map(|p| match Regex::new(&p) {
                Ok(re) => Some((Predicate::Pattern(re), RouteClass::ApiResource)),
                Err(e) => {
                    log::error!("Skipping invalid route pattern {}: {}", p, e);
                    None
                }
            })
            .collect();

        routes.extend(
            manifest
                .iter()
                .map(|p| (Predicate::Exact(p.clone()), RouteClass::StaticAsset)),
        );
        if !assets_prefix.is_empty() {
            routes.push((
                Predicate::Prefix(assets_prefix.to_string()),
                RouteClass::StaticAsset,
            ));
        }

        Self { routes }
    }

    /// Classify a URL path. Anything unmatched is `Default`.
    pub fn classify(&self, path: &str) -> RouteClass {
        self.routes
            .iter()
            .find(|(predicate, _)| predicate.matches(path))
            .map(|(_, class)| *class)
            .unwrap_or(RouteClass::Default)
    }

    /// Every non-default class whose predicates match `path`, without
    /// duplicates. More than one entry means the table is not disjoint.
    pub fn matching_classes(&self, path: &str) -> Vec<RouteClass> {
        let mut classes = Vec::new();
        for (predicate, class) in &self.routes {
            if predicate.matches(path) && !classes.contains(class) {
                classes.push(*class);
            }
        }
        classes
    }
}

/// Whether a static path prefix shares any path with an API resource.
///
/// True when the prefix covers a resource root (`/`, `/api`, `/api/us`) or
/// sits inside one (`/api/users/42/`).
pub fn prefix_overlaps_api(prefix: &str) -> bool {
    API_RESOURCES.iter().any(|resource| {
        let root = format!("/api/{}", resource);
        let nested = format!("{}/", root);
        root.starts_with(prefix) || prefix.starts_with(&nested)
    })
}
