//! Route matching logic.
//!
//! # Responsibilities
//! - Match the request method (exact)
//! - Match exact paths and `/responses/{id}/{action}` shaped paths
//! - Combine conditions with AND semantics
//!
//! # Design Decisions
//! - Path matching is case-sensitive
//! - No regex: prefix/suffix checks plus a split on `/`

use axum::http::Method;

use crate::http::request::ApiRequest;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, req: &ApiRequest) -> bool;
}

/// Matches the request method.
#[derive(Debug, Clone)]
pub struct MethodMatcher {
    method: Method,
}

impl MethodMatcher {
    pub fn new(method: Method) -> Self {
        Self { method }
    }
}

impl Matcher for MethodMatcher {
    fn matches(&self, req: &ApiRequest) -> bool {
        req.method == self.method
    }
}

/// Matches one exact path.
#[derive(Debug, Clone)]
pub struct ExactPathMatcher {
    path: String,
}

impl ExactPathMatcher {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl Matcher for ExactPathMatcher {
    fn matches(&self, req: &ApiRequest) -> bool {
        req.path == self.path
    }
}

/// Matches `{prefix}...{suffix}` paths that address a single resource,
/// e.g. `/responses/{id}/download`.
#[derive(Debug, Clone)]
pub struct ResourceActionMatcher {
    prefix: String,
    suffix: String,
}

impl ResourceActionMatcher {
    /// `collection` is the leading segment (`responses`), `action` the trailing one.
    pub fn new(collection: &str, action: &str) -> Self {
        Self {
            prefix: format!("/{collection}/"),
            suffix: format!("/{action}"),
        }
    }
}

/// Resource id of a `/{collection}/{id}/...` path: the third element of the
/// path split on `/`.
pub fn resource_id(path: &str) -> Option<&str> {
    path.split('/').nth(2)
}

impl Matcher for ResourceActionMatcher {
    fn matches(&self, req: &ApiRequest) -> bool {
        req.path.starts_with(&self.prefix)
            && req.path.ends_with(&self.suffix)
            && resource_id(&req.path).is_some()
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self {
        Self { matchers }
    }
}

impl Matcher for AndMatcher {
    fn matches(&self, req: &ApiRequest) -> bool {
        // All matchers must pass (AND)
        self.matchers.iter().all(|m| m.matches(req))
    }
}
