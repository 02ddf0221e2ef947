//! Role-based permission evaluation.
//!
//! A request is allowed when any rule of any role grants it; there are no
//! deny rules. `path` is the matched route template (e.g. `/invoice/self/:id`),
//! not the concrete request URI.
//!
//! Scoped actions grant when the scope is `OTHER` *or* the route contains
//! `self`. Because of the OR, `METHOD:OTHER` behaves exactly like a bare
//! `METHOD`, and any other scope value only grants on `self` routes. Stored
//! role documents depend on this, so it must not be tightened here.

use crate::models::{Permission, Role};

const WILDCARD: &str = "/*";
const SCOPE_OTHER: &str = "OTHER";
const SELF_MARKER: &str = "self";

/// A parsed `METHOD[:SCOPE]` action spec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionSpec<'a> {
    pub method: &'a str,
    pub scope: Option<&'a str>,
}

impl<'a> ActionSpec<'a> {
    /// Splits on `:`; the scope is the second segment and anything after a
    /// further `:` is ignored.
    pub fn parse(raw: &'a str) -> Self {
        let mut parts = raw.split(':');
        let method = parts.next().unwrap_or_default();
        Self {
            method,
            scope: parts.next(),
        }
    }

    fn grants(&self, path: &str, method: &str) -> bool {
        if self.method != method {
            return false;
        }
        match self.scope {
            None => true,
            Some(scope) => path.contains(SELF_MARKER) || scope == SCOPE_OTHER,
        }
    }
}

/// How a permission's `resource` is matched against a route.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourcePattern<'a> {
    Exact(&'a str),
    /// Everything starting with the literal text before the first `/*`.
    Prefix { prefix: &'a str, raw: &'a str },
}

impl<'a> ResourcePattern<'a> {
    pub fn parse(resource: &'a str) -> Self {
        match resource.find(WILDCARD) {
            Some(index) => ResourcePattern::Prefix {
                prefix: &resource[..index],
                raw: resource,
            },
            None => ResourcePattern::Exact(resource),
        }
    }

    pub fn matches(&self, path: &str) -> bool {
        match self {
            ResourcePattern::Exact(resource) => *resource == path,
            ResourcePattern::Prefix { prefix, raw } => *raw == path || path.starts_with(prefix),
        }
    }
}

/// Whether a single permission rule grants `method` on `path`.
pub fn permission_grants(permission: &Permission, path: &str, method: &str) -> bool {
    ResourcePattern::parse(&permission.resource).matches(path)
        && permission
            .actions
            .iter()
            .any(|action| ActionSpec::parse(action).grants(path, method))
}

/// Decides whether a principal holding `roles` may call `method` on `path`.
pub fn authorize(roles: &[Role], path: &str, method: &str) -> bool {
    roles
        .iter()
        .flat_map(|role| role.permissions.iter())
        .any(|permission| permission_grants(permission, path, method))
}
