//! Route classification
//!
//! A [`RouteTable`] is an ordered list of path patterns, each assigned a
//! [`RouteClass`]. The first matching rule wins; paths no rule matches get
//! the table's default class.
//!
//! Pattern syntax:
//! - `/login` matches exactly `/login`
//! - `/api/email/{id}/status` matches any single segment in place of `{id}`
//! - `/settings/*` matches everything below `/settings`
//!
//! Trailing slashes and repeated slashes are ignored on both sides.

use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    /// No credentials required
    Public,
    /// Browser pages behind the session cookie
    Protected,
    /// Service-to-service endpoints behind a bearer token
    MachineApi,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutePattern {
    prefix: bool,
    raw: String,
    segments: Vec<Segment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvalidPattern {
    pub pattern: String,
    pub reason: &'static str,
}

impl fmt::Display for InvalidPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid route pattern '{}': {}", self.pattern, self.reason)
    }
}

impl std::error::Error for InvalidPattern {}

impl FromStr for RoutePattern {
    type Err = InvalidPattern;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason| InvalidPattern {
            pattern: s.to_string(),
            reason,
        };

        let raw = s.trim();
        if !raw.starts_with('/') {
            return Err(invalid("must start with '/'"));
        }

        let (body, prefix) = match raw.strip_suffix("/*") {
            Some(body) => (body, true),
            None => (raw, false),
        };

        let segments = split_path(body)
            .map(|segment| {
                if segment == "*" {
                    Err(invalid("'*' is only allowed as the final segment"))
                } else if segment.starts_with('{') && segment.ends_with('}') && segment.len() > 2 {
                    Ok(Segment::Param)
                } else if segment.contains(['{', '}']) {
                    Err(invalid("malformed parameter segment"))
                } else {
                    Ok(Segment::Literal(segment.to_string()))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            prefix,
            raw: raw.to_string(),
            segments,
        })
    }
}

impl fmt::Display for RoutePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl RoutePattern {
    pub fn matches(&self, path: &str) -> bool {
        let mut path_segments = split_path(path);

        for expected in &self.segments {
            match (expected, path_segments.next()) {
                (Segment::Literal(lit), Some(actual)) if lit == actual => {}
                (Segment::Param, Some(_)) => {}
                _ => return false,
            }
        }

        self.prefix || path_segments.next().is_none()
    }

    /// Two patterns are equivalent when they match the same set of paths
    fn equivalent(&self, other: &RoutePattern) -> bool {
        self.prefix == other.prefix && self.segments == other.segments
    }
}

fn split_path(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// Whether two paths name the same route once empty segments are ignored
pub fn same_path(a: &str, b: &str) -> bool {
    split_path(a).eq(split_path(b))
}

#[derive(Debug, Clone)]
pub struct RouteRule {
    pub class: RouteClass,
    pub pattern: RoutePattern,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlappingRoute {
    pub first: RouteClass,
    pub pattern: String,
    pub second: RouteClass,
}

impl fmt::Display for OverlappingRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "route pattern '{}' is listed as both {:?} and {:?}",
            self.pattern, self.first, self.second
        )
    }
}

impl std::error::Error for OverlappingRoute {}

#[derive(Debug, Clone)]
pub struct RouteTable {
    default_class: RouteClass,
    rules: Vec<RouteRule>,
}

impl RouteTable {
    /// Build a table from rules in precedence order.
    ///
    /// Fails if the same pattern is assigned to two different classes.
    pub fn new(rules: Vec<RouteRule>, default_class: RouteClass) -> Result<Self, OverlappingRoute> {
        for (i, rule) in rules.iter().enumerate() {
            if let Some(other) = rules[..i]
                .iter()
                .find(|r| r.class != rule.class && r.pattern.equivalent(&rule.pattern))
            {
                return Err(OverlappingRoute {
                    first: other.class,
                    pattern: rule.pattern.to_string(),
                    second: rule.class,
                });
            }
        }

        Ok(Self {
            default_class,
            rules,
        })
    }

    /// Build a table from per-class pattern lists.
    ///
    /// Machine API patterns take precedence over public ones, which take
    /// precedence over protected ones. Unmatched paths are protected.
    pub fn from_lists(
        machine_api: &[RoutePattern],
        public: &[RoutePattern],
        protected: &[RoutePattern],
    ) -> Result<Self, OverlappingRoute> {
        let rules = [
            (RouteClass::MachineApi, machine_api),
            (RouteClass::Public, public),
            (RouteClass::Protected, protected),
        ]
        .into_iter()
        .flat_map(|(class, patterns)| {
            patterns.iter().map(move |pattern| RouteRule {
                class,
                pattern: pattern.clone(),
            })
        })
        .collect();

        Self::new(rules, RouteClass::Protected)
    }

    pub fn classify(&self, path: &str) -> RouteClass {
        self.rules
            .iter()
            .find(|rule| rule.pattern.matches(path))
            .map(|rule| rule.class)
            .unwrap_or(self.default_class)
    }
}

pub const DEFAULT_PUBLIC_ROUTES: &[&str] = &["/login", "/setup"];
pub const DEFAULT_PROTECTED_ROUTES: &[&str] = &["/", "/settings", "/settings/*"];
pub const DEFAULT_MACHINE_API_ROUTES: &[&str] = &[
    "/api/email/create",
    "/api/email/{id}/status",
    "/api/email/{id}/category",
];

/// Parse a list of patterns
pub fn parse_patterns<'a>(
    patterns: impl IntoIterator<Item = &'a str>,
) -> Result<Vec<RoutePattern>, InvalidPattern> {
    patterns
        .into_iter()
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(str::parse)
        .collect()
}

impl Default for RouteTable {
    fn default() -> Self {
        let parse = |list: &[&str]| {
            list.iter()
                .map(|p| p.parse().unwrap_or_else(|e| panic!("built-in route: {e}")))
                .collect::<Vec<RoutePattern>>()
        };
        Self::from_lists(
            &parse(DEFAULT_MACHINE_API_ROUTES),
            &parse(DEFAULT_PUBLIC_ROUTES),
            &parse(DEFAULT_PROTECTED_ROUTES),
        )
        .unwrap_or_else(|e| panic!("built-in routes overlap: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pattern(s: &str) -> RoutePattern {
        s.parse().unwrap()
    }

    #[test]
    fn test_exact_pattern() {
        let p = pattern("/login");
        assert!(p.matches("/login"));
        assert!(p.matches("/login/"));
        assert!(!p.matches("/login/extra"));
        assert!(!p.matches("/logins"));
        assert!(!p.matches("/"));
    }

    #[test]
    fn test_root_pattern_matches_only_root() {
        let p = pattern("/");
        assert!(p.matches("/"));
        assert!(p.matches(""));
        assert!(!p.matches("/settings"));
    }

    #[test]
    fn test_param_pattern() {
        let p = pattern("/api/email/{id}/status");
        assert!(p.matches("/api/email/42/status"));
        assert!(p.matches("/api/email/abc-def/status"));
        assert!(!p.matches("/api/email/status"));
        assert!(!p.matches("/api/email/42/43/status"));
        assert!(!p.matches("/api/email/42/category"));
    }

    #[test]
    fn test_prefix_pattern() {
        let p = pattern("/settings/*");
        assert!(p.matches("/settings"));
        assert!(p.matches("/settings/password"));
        assert!(p.matches("/settings/a/b/c"));
        assert!(!p.matches("/settingsx"));
    }

    #[test]
    fn test_invalid_patterns() {
        assert!("login".parse::<RoutePattern>().is_err());
        assert!("/a/*/b".parse::<RoutePattern>().is_err());
        assert!("/a/{id".parse::<RoutePattern>().is_err());
        assert!("/a/{}".parse::<RoutePattern>().is_err());
    }

    #[test]
    fn test_default_table() {
        let table = RouteTable::default();

        assert_eq!(table.classify("/login"), RouteClass::Public);
        assert_eq!(table.classify("/setup"), RouteClass::Public);
        assert_eq!(table.classify("/"), RouteClass::Protected);
        assert_eq!(table.classify("/settings"), RouteClass::Protected);
        assert_eq!(table.classify("/settings/password"), RouteClass::Protected);
        assert_eq!(table.classify("/api/email/create"), RouteClass::MachineApi);
        assert_eq!(
            table.classify("/api/email/123/status"),
            RouteClass::MachineApi
        );
        assert_eq!(
            table.classify("/api/email/123/category"),
            RouteClass::MachineApi
        );
    }

    #[test]
    fn test_unmatched_paths_fall_back_to_protected() {
        let table = RouteTable::default();
        assert_eq!(table.classify("/inbox"), RouteClass::Protected);
        assert_eq!(table.classify("/api/emails"), RouteClass::Protected);
    }

    #[test]
    fn test_first_matching_rule_wins() {
        let table = RouteTable::new(
            vec![
                RouteRule {
                    class: RouteClass::Public,
                    pattern: pattern("/docs/public"),
                },
                RouteRule {
                    class: RouteClass::Protected,
                    pattern: pattern("/docs/*"),
                },
            ],
            RouteClass::Protected,
        )
        .unwrap();

        assert_eq!(table.classify("/docs/public"), RouteClass::Public);
        assert_eq!(table.classify("/docs/private"), RouteClass::Protected);
    }

    #[test]
    fn test_same_pattern_in_two_classes_is_rejected() {
        let err = RouteTable::from_lists(
            &[pattern("/api/email/{id}/status")],
            &[pattern("/api/email/{email}/status")],
            &[],
        )
        .unwrap_err();

        assert_eq!(err.first, RouteClass::MachineApi);
        assert_eq!(err.second, RouteClass::Public);
    }

    #[test]
    fn test_same_path_ignores_empty_segments() {
        assert!(same_path("/setup", "/setup"));
        assert!(same_path("//setup", "/setup"));
        assert!(same_path("///setup/", "/setup"));
        assert!(same_path("/", ""));
        assert!(!same_path("/setup/x", "/setup"));
        assert!(!same_path("/setupx", "/setup"));
    }

    #[test]
    fn test_parse_patterns_skips_blanks() {
        let patterns = parse_patterns("/a, ,/b/*".split(',')).unwrap();
        assert_eq!(patterns.len(), 2);
        assert_eq!(patterns[1].to_string(), "/b/*");
    }
}
