//! Route matching.
//!
//! A route definition is `"METHOD[|METHOD...] [/path]"` or a bare
//! `"/path"`. Paths are matched by prefix on segment boundaries, `{name}`
//! segments capture one path segment each, and full regular expressions
//! are available through [`PathMatcher::regex`].

use std::fmt::Debug;

use regex::Regex;

use crate::error::RouteError;
use crate::http::Request;

/// Named values captured by a matcher.
pub type Captures = Vec<(String, String)>;

/// Trait for matching requests against conditions.
pub trait Matcher: Debug {
    /// Returns the captured values if the request matches.
    fn matches(&self, req: &Request) -> Option<Captures>;
}

#[inline]
fn with_slash(path: &str) -> String { format!("{}/", path.trim_end_matches('/')) }

/// Path condition of a route.
#[derive(Debug, Clone)]
pub enum PathPattern {
    /// `rtrim(pattern, '/') + "/"`, must prefix `rtrim(path, '/') + "/"`.
    Prefix(String),
    /// Compiled `{name}` template, matched by prefix.
    Template(Regex),
    /// Arbitrary expression.
    Regex(Regex),
}

impl PathPattern {
    /// Compile a path, `{name}` segments make it a template.
    pub fn parse(path: &str) -> Result<Self, RouteError> {
        if !path.starts_with('/') {
            return Err(RouteError::Definition(path.to_string()));
        }
        if !path.contains('{') {
            return Ok(PathPattern::Prefix(with_slash(path)));
        }

        let mut expr = String::from("^");
        let mut rest = path.trim_end_matches('/');
        while let Some(open) = rest.find('{') {
            let close = rest[open..]
                .find('}')
                .map(|i| open + i)
                .ok_or_else(|| RouteError::Definition(path.to_string()))?;
            let name = &rest[open + 1..close];
            if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(RouteError::Definition(path.to_string()));
            }
            expr.push_str(&regex::escape(&rest[..open]));
            expr.push_str(&format!("(?P<{}>[^/]+)", name));
            rest = &rest[close + 1..];
        }
        expr.push_str(&regex::escape(rest));
        expr.push_str("(?:/|$)");

        Ok(PathPattern::Template(Regex::new(&expr)?))
    }

    /// Match a path, returns the captures.
    pub fn matches(&self, path: &str) -> Option<Captures> {
        match self {
            PathPattern::Prefix(prefix) => with_slash(path)
                .starts_with(prefix.as_str())
                .then(Vec::new),
            PathPattern::Template(re) | PathPattern::Regex(re) => {
                let caps = re.captures(path)?;
                Some(
                    re.capture_names()
                        .flatten()
                        .filter_map(|name| {
                            caps.name(name)
                                .map(|m| (name.to_string(), m.as_str().to_string()))
                        })
                        .collect(),
                )
            }
        }
    }
}

/// Method set plus path pattern.
#[derive(Debug, Clone)]
pub struct PathMatcher {
    // empty means any method
    methods: Vec<String>,
    pattern: PathPattern,
}

fn parse_methods(s: &str) -> Result<Vec<String>, RouteError> {
    let methods: Vec<String> = s.split('|').map(|m| m.trim().to_string()).collect();
    if methods
        .iter()
        .any(|m| m.is_empty() || !m.chars().all(|c| c.is_ascii_uppercase()))
    {
        return Err(RouteError::Definition(s.to_string()));
    }
    Ok(methods)
}

impl PathMatcher {
    /// Compile a route definition.
    pub fn parse(definition: &str) -> Result<Self, RouteError> {
        let def = definition.trim();
        let mut parts = def.split_whitespace();

        let (methods, path) = match (parts.next(), parts.next(), parts.next()) {
            (Some(path), None, None) if path.starts_with('/') => (Vec::new(), path),
            (Some(methods), None, None) => (parse_methods(methods)?, "/"),
            (Some(methods), Some(path), None) => (parse_methods(methods)?, path),
            _ => return Err(RouteError::Definition(definition.to_string())),
        };

        Ok(Self {
            methods,
            pattern: PathPattern::parse(path)
                .map_err(|_| RouteError::Definition(definition.to_string()))?,
        })
    }

    /// Match paths against a regular expression, named groups are captured.
    pub fn regex(methods: &[&str], expr: &str) -> Result<Self, RouteError> {
        Ok(Self {
            methods: methods.iter().map(|m| m.to_string()).collect(),
            pattern: PathPattern::Regex(Regex::new(expr)?),
        })
    }

    #[inline]
    pub fn pattern(&self) -> &PathPattern { &self.pattern }

    fn accepts_method(&self, method: &str) -> bool {
        self.methods.is_empty() || self.methods.iter().any(|m| m == method)
    }
}

impl Matcher for PathMatcher {
    fn matches(&self, req: &Request) -> Option<Captures> {
        if !self.accepts_method(req.method()) {
            return None;
        }
        self.pattern.matches(req.path())
    }
}

/// Matches the Host header, case-insensitive, port ignored.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            expected_host: host.into().to_lowercase(),
        }
    }
}

impl Matcher for HostMatcher {
    fn matches(&self, req: &Request) -> Option<Captures> {
        req.url()
            .host_str()
            .filter(|h| h.eq_ignore_ascii_case(&self.expected_host))
            .map(|_| Vec::new())
    }
}

/// Combines multiple matchers with AND semantics.
#[derive(Debug)]
pub struct AndMatcher {
    matchers: Vec<Box<dyn Matcher>>,
}

impl AndMatcher {
    pub fn new(matchers: Vec<Box<dyn Matcher>>) -> Self { Self { matchers } }
}

impl Matcher for AndMatcher {
    fn matches(&self, req: &Request) -> Option<Captures> {
        let mut all = Vec::new();
        for m in &self.matchers {
            all.extend(m.matches(req)?);
        }
        Some(all)
    }
}
