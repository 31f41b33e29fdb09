//! Route groups and the ordered registry that composes them.
//!
//! # Matching
//!
//! ```text
//! resolve(GET, "/users/42")
//!   group "/auth"   prefix does not match           -> skip
//!   group "/users"  prefix matches, remainder "/42"
//!     GET  ""        no
//!     GET  "/me"     no
//!     GET  "/{id}"   yes, params {id: "42"}         -> resolved
//! ```
//!
//! Groups are scanned in registration order and routes within a group in
//! declaration order; the first match wins. Registration order is therefore
//! part of the contract: a literal route such as `/me` must be declared before
//! a capture such as `/{id}` that would also match it.

use std::fmt;
use std::sync::Arc;

use axum::http::Method;
use tracing::debug;

use crate::error::RegistryError;

use super::context::PathParams;
use super::handler::Handler;

// =============================================================================
// Path Patterns
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A route path relative to its group prefix, e.g. `""`, `"/me"`, `"/{id}"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathPattern {
    raw: String,
    segments: Vec<Segment>,
}

impl PathPattern {
    /// Parse a pattern. A segment written `{name}` captures; anything else is
    /// matched literally. Empty segments are ignored.
    pub fn parse(pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|s| !s.is_empty())
            .map(|s| match s.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) if !name.is_empty() => Segment::Param(name.to_string()),
                _ => Segment::Literal(s.to_string()),
            })
            .collect();

        Self {
            raw: pattern.to_string(),
            segments,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Match already-split path segments, capturing parameters.
    fn matches(&self, segments: &[&str]) -> Option<PathParams> {
        if segments.len() != self.segments.len() {
            return None;
        }

        let mut params = PathParams::new();
        for (pattern, actual) in self.segments.iter().zip(segments) {
            match pattern {
                Segment::Literal(literal) => {
                    if literal != actual {
                        return None;
                    }
                }
                Segment::Param(name) => {
                    let value = urlencoding::decode(actual)
                        .map(|v| v.into_owned())
                        .unwrap_or_else(|_| (*actual).to_string());
                    params.insert(name.clone(), value);
                }
            }
        }
        Some(params)
    }
}

// =============================================================================
// Routes and Groups
// =============================================================================

/// Whether a route requires a valid bearer token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Public,
    Authenticated,
}

/// One endpoint inside a route group.
#[derive(Clone)]
pub struct Route {
    pub method: Method,
    pub pattern: PathPattern,
    pub access: Access,
    pub handler: Arc<dyn Handler>,
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("pattern", &self.pattern.as_str())
            .field("access", &self.access)
            .finish_non_exhaustive()
    }
}

/// A named collection of endpoints mounted under one path prefix.
#[derive(Debug, Clone)]
pub struct RouteGroup {
    name: String,
    prefix: String,
    routes: Vec<Route>,
}

impl RouteGroup {
    /// Create an empty group. The prefix is validated on registration.
    pub fn new(name: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: prefix.into(),
            routes: Vec::new(),
        }
    }

    /// Append a route. Declaration order is match order.
    pub fn route(
        mut self,
        method: Method,
        pattern: &str,
        access: Access,
        handler: Arc<dyn Handler>,
    ) -> Self {
        self.routes.push(Route {
            method,
            pattern: PathPattern::parse(pattern),
            access,
            handler,
        });
        self
    }

    pub fn get(self, pattern: &str, access: Access, handler: Arc<dyn Handler>) -> Self {
        self.route(Method::GET, pattern, access, handler)
    }

    pub fn post(self, pattern: &str, access: Access, handler: Arc<dyn Handler>) -> Self {
        self.route(Method::POST, pattern, access, handler)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn routes(&self) -> &[Route] {
        &self.routes
    }

    /// The part of `path` after this group's prefix, if the prefix matches on
    /// a segment boundary.
    fn remainder<'p>(&self, path: &'p str) -> Option<&'p str> {
        let rest = path.strip_prefix(self.prefix.as_str())?;
        if rest.is_empty() || rest.starts_with('/') {
            Some(rest)
        } else {
            None
        }
    }

    fn validate(&self) -> Result<(), RegistryError> {
        let invalid = |reason| RegistryError::InvalidPrefix {
            group: self.name.clone(),
            prefix: self.prefix.clone(),
            reason,
        };

        if !self.prefix.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }
        if self.prefix.len() == 1 {
            return Err(invalid("must not be the root path"));
        }
        if self.prefix.ends_with('/') {
            return Err(invalid("must not end with '/'"));
        }
        if self.prefix.contains(['{', '}', '?', '#']) {
            return Err(invalid("must be a literal path"));
        }
        if self.routes.is_empty() {
            return Err(RegistryError::EmptyGroup(self.name.clone()));
        }
        Ok(())
    }
}

// =============================================================================
// Registry
// =============================================================================

/// A resolved route: the matched endpoint and its captured parameters.
#[derive(Debug)]
pub struct ResolvedRoute<'a> {
    pub group: &'a str,
    pub route: &'a Route,
    pub params: PathParams,
}

/// Ordered set of route groups forming the gateway's addressable surface.
///
/// Groups are registered during startup; the registry is then moved into the
/// gateway, which only ever reads it.
#[derive(Debug, Default)]
pub struct RouterRegistry {
    groups: Vec<RouteGroup>,
}

impl RouterRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a group after every group registered before it.
    pub fn register(&mut self, group: RouteGroup) -> Result<(), RegistryError> {
        group.validate()?;
        debug!(
            group = group.name(),
            prefix = group.prefix(),
            routes = group.routes().len(),
            "Registered route group"
        );
        self.groups.push(group);
        Ok(())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with_group(mut self, group: RouteGroup) -> Result<Self, RegistryError> {
        self.register(group)?;
        Ok(self)
    }

    pub fn groups(&self) -> &[RouteGroup] {
        &self.groups
    }

    pub fn route_count(&self) -> usize {
        self.groups.iter().map(|g| g.routes.len()).sum()
    }

    /// Find the first route matching `method` and `path`.
    ///
    /// `None` means no route matches; callers answer 404.
    pub fn resolve(&self, method: &Method, path: &str) -> Option<ResolvedRoute<'_>> {
        for group in &self.groups {
            let Some(rest) = group.remainder(path) else {
                continue;
            };
            let segments: Vec<&str> = rest.split('/').filter(|s| !s.is_empty()).collect();

            for route in &group.routes {
                if route.method != *method {
                    continue;
                }
                if let Some(params) = route.pattern.matches(&segments) {
                    return Some(ResolvedRoute {
                        group: &group.name,
                        route,
                        params,
                    });
                }
            }
        }
        None
    }
}

// =============================================================================
// Tests
// =============================================================================
