//! Slash-delimited namespace paths.

use std::fmt;

/// A normalized path inside a registry: `project[/segment...]`.
///
/// Never empty, never has a leading or trailing separator and never
/// contains empty segments.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NamespacePath(String);

impl NamespacePath {
    /// Normalize `raw`; `None` if it contains no segments at all.
    pub fn parse(raw: &str) -> Option<Self> {
        let joined = raw
            .split('/')
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("/");
        (!joined.is_empty()).then_some(Self(joined))
    }

    pub fn project_root(project: &str) -> Option<Self> {
        Self::parse(project)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split('/')
    }

    pub fn project(&self) -> &str {
        self.0.split_once('/').map_or(self.0.as_str(), |(p, _)| p)
    }

    /// Path inside the project; empty for the project itself.
    pub fn relative(&self) -> &str {
        self.0.split_once('/').map_or("", |(_, rest)| rest)
    }

    /// Last segment.
    pub fn name(&self) -> &str {
        self.0.rsplit_once('/').map_or(self.0.as_str(), |(_, n)| n)
    }

    /// Number of segments below the project (0 for a project).
    pub fn depth(&self) -> usize {
        self.0.matches('/').count()
    }

    pub fn parent(&self) -> Option<Self> {
        self.0
            .rsplit_once('/')
            .map(|(parent, _)| Self(parent.to_string()))
    }

    /// Child path; `None` if `child` normalizes to nothing.
    pub fn join(&self, child: &str) -> Option<Self> {
        Self::parse(child).map(|c| Self(format!("{}/{}", self.0, c.0)))
    }

    /// True if `other` lies strictly underneath this path.
    pub fn is_ancestor_of(&self, other: &NamespacePath) -> bool {
        other
            .0
            .strip_prefix(self.0.as_str())
            .is_some_and(|rest| rest.starts_with('/'))
    }

    /// Proper ancestors, outermost first.
    pub fn ancestors(&self) -> Vec<NamespacePath> {
        let mut out = Vec::new();
        let mut current = self.parent();
        while let Some(p) = current {
            current = p.parent();
            out.push(p);
        }
        out.reverse();
        out
    }
}

impl fmt::Display for NamespacePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
