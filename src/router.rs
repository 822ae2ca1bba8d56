//! Per-query model routing.
//!
//! Rules, first match wins (only when the cloud model is enabled):
//!
//! | Rule | Route |
//! |------|-------|
//! | empty query | local |
//! | contains a needs-reasoning keyword | cloud |
//! | contains a personal/local keyword | local |
//! | normalized length > `cloud_min_length` | cloud |
//! | otherwise | local |
//!
//! Keywords are matched as substrings of the lower-cased query, so `my`
//! also matches `mystery`. The needs-reasoning set is always checked first.
//! With `router.hybrid`, the local outcomes become [`Route::Hybrid`].

use serde::Serialize;
use std::fmt;

use crate::config::RouterConfig;
use crate::text::normalize_query;

pub const REASONING_KEYWORDS: &[&str] = &[
    "code", "generate", "analysis", "research", "legal", "finance", "explain", "compare",
    "reason", "design",
];

pub const LOCAL_KEYWORDS: &[&str] = &[
    "personal",
    "remember",
    "recall",
    "my",
    "profile",
    "preference",
    "news",
    "search",
    "summarize",
    "embed",
    "summary",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Local,
    Cloud,
    Hybrid,
}

impl Route {
    pub fn as_str(&self) -> &'static str {
        match self {
            Route::Local => "local",
            Route::Cloud => "cloud",
            Route::Hybrid => "hybrid",
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A routing decision and the rule that produced it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decision {
    pub route: Route,
    pub reason: String,
}

#[derive(Debug, Clone)]
pub struct Router {
    cloud_enabled: bool,
    cloud_min_length: usize,
    hybrid: bool,
}

impl Router {
    pub fn new(cloud_enabled: bool, config: &RouterConfig) -> Self {
        Self {
            cloud_enabled,
            cloud_min_length: config.cloud_min_length,
            hybrid: config.hybrid,
        }
    }

    pub fn route(&self, query: &str) -> Route {
        self.explain(query).route
    }

    pub fn explain(&self, query: &str) -> Decision {
        if !self.cloud_enabled {
            return Decision {
                route: Route::Local,
                reason: "cloud disabled".to_string(),
            };
        }

        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return self.local("empty query".to_string());
        }
        if let Some(k) = REASONING_KEYWORDS.iter().find(|k| q.contains(*k)) {
            return Decision {
                route: Route::Cloud,
                reason: format!("needs-reasoning keyword '{}'", k),
            };
        }
        if let Some(k) = LOCAL_KEYWORDS.iter().find(|k| q.contains(*k)) {
            return self.local(format!("local keyword '{}'", k));
        }
        let len = normalize_query(&q).chars().count();
        if len > self.cloud_min_length {
            return Decision {
                route: Route::Cloud,
                reason: format!("long query ({} > {} chars)", len, self.cloud_min_length),
            };
        }
        self.local("default".to_string())
    }

    fn local(&self, reason: String) -> Decision {
        let route = if self.hybrid { Route::Hybrid } else { Route::Local };
        Decision { route, reason }
    }
}
