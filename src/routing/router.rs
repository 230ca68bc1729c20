//! Route lookup.
//!
//! # Responsibilities
//! - Store the compiled route table
//! - Resolve a request to a route (with its resource id) or an explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - First match wins, in declaration order
//! - Health and preflight are handled by the dispatcher before routing

use axum::http::Method;

use crate::http::request::ApiRequest;
use crate::routing::matcher::{
    resource_id, AndMatcher, ExactPathMatcher, Matcher, MethodMatcher, ResourceActionMatcher,
};

/// A resolved business route.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    ListPending,
    ListAll,
    Download(String),
    Unmark(String),
}

impl Route {
    /// Stable label for logs and metrics.
    pub fn name(&self) -> &'static str {
        match self {
            Route::ListPending => "list_pending",
            Route::ListAll => "list_all",
            Route::Download(_) => "download",
            Route::Unmark(_) => "unmark",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum RouteKind {
    ListPending,
    ListAll,
    Download,
    Unmark,
}

#[derive(Debug)]
struct RouteEntry {
    matcher: AndMatcher,
    kind: RouteKind,
}

/// Compiled, ordered route table.
#[derive(Debug)]
pub struct RouteTable {
    entries: Vec<RouteEntry>,
}

impl Default for RouteTable {
    fn default() -> Self {
        Self::new()
    }
}

impl RouteTable {
    /// Build the response routes.
    pub fn new() -> Self {
        let exact = |method: Method, path: &str, kind| RouteEntry {
            matcher: AndMatcher::new(vec![
                Box::new(MethodMatcher::new(method)),
                Box::new(ExactPathMatcher::new(path)),
            ]),
            kind,
        };
        let action = |method: Method, action: &str, kind| RouteEntry {
            matcher: AndMatcher::new(vec![
                Box::new(MethodMatcher::new(method)),
                Box::new(ResourceActionMatcher::new("responses", action)),
            ]),
            kind,
        };

        Self {
            entries: vec![
                exact(Method::GET, "/responses/pending", RouteKind::ListPending),
                exact(Method::GET, "/responses/all", RouteKind::ListAll),
                action(Method::GET, "download", RouteKind::Download),
                action(Method::POST, "unmark", RouteKind::Unmark),
            ],
        }
    }

    /// Find the first route matching the request.
    pub fn resolve(&self, req: &ApiRequest) -> Option<Route> {
        let entry = self.entries.iter().find(|e| e.matcher.matches(req))?;
        let id = || resource_id(&req.path).map(str::to_string);

        match entry.kind {
            RouteKind::ListPending => Some(Route::ListPending),
            RouteKind::ListAll => Some(Route::ListAll),
            RouteKind::Download => id().map(Route::Download),
            RouteKind::Unmark => id().map(Route::Unmark),
        }
    }
}
