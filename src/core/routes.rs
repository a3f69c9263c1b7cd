//! Method + path allowlist for relayed operations.
//!
//! The route table is an ordered list of `(method, pattern)` rules. A request
//! is relayed only when its method equals a rule's method and its path (query
//! string excluded) matches the rule's regex over the full path, never a
//! prefix. Matching stops at the first hit. The built-in table covers the
//! network-controller integration endpoints; operators can replace it through
//! the `routes` section of the config file.
use http::Method;
use regex::Regex;

/// One allowlisted operation: an HTTP method plus a full-path regex.
#[derive(Debug, Clone)]
pub struct RouteRule {
    method: Method,
    pattern: Regex,
}

impl RouteRule {
    /// Build a rule from a method name and a path regex. The regex does not
    /// need `^`/`$` anchors; matching is always over the entire path.
    pub fn parse(method: &str, pattern: &str) -> Result<Self, String> {
        let method = method
            .parse::<Method>()
            .map_err(|_| format!("invalid HTTP method '{method}'"))?;
        let pattern = Regex::new(pattern).map_err(|e| e.to_string())?;
        Ok(Self { method, pattern })
    }

    /// True when `method` equals this rule's method and `path` matches the
    /// pattern in its entirety.
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        self.method == *method
            && self
                .pattern
                .find(path)
                .is_some_and(|m| m.start() == 0 && m.end() == path.len())
    }
}

/// Ordered set of [`RouteRule`]s; first full match wins.
#[derive(Debug, Clone)]
pub struct RouteTable {
    rules: Vec<RouteRule>,
}

impl RouteTable {
    pub fn new(rules: Vec<RouteRule>) -> Self {
        Self { rules }
    }

    /// Check whether the method + path pair is allowlisted.
    pub fn is_allowed(&self, method: &Method, path: &str) -> bool {
        self.rules.iter().any(|rule| rule.matches(method, path))
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl Default for RouteTable {
    /// The built-in table: the four network-integration operations the
    /// gateway relays. `[^/]+` segments match exactly one path segment.
    fn default() -> Self {
        let rules = [
            ("GET", r"^/proxy/network/integration/v1/sites$"),
            ("GET", r"^/proxy/network/integration/v1/sites/[^/]+/devices$"),
            (
                "GET",
                r"^/proxy/network/integration/v1/sites/[^/]+/clients/[^/]+$",
            ),
            (
                "POST",
                r"^/proxy/network/integration/v1/sites/[^/]+/clients/[^/]+/actions$",
            ),
        ]
        .iter()
        .map(|(method, pattern)| {
            RouteRule::parse(method, pattern).expect("built-in route rule is valid")
        })
        .collect();

        Self::new(rules)
    }
}
