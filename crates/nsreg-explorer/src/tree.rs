//! Lazily loaded namespace tree.
//!
//! Nodes are addressed by path. A node's listing is fetched the first time
//! it is expanded and kept until the node is unmounted, which happens when
//! one of its ancestors collapses or the whole navigator is dropped.

use std::collections::HashMap;

use nsreg_client::Listing;

use crate::NamespacePath;

/// Identifies one outstanding fetch. Responses carrying any other token
/// for the same node are stale and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RequestToken(pub u64);

/// A listing fetch the caller must perform and report back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildRequest {
    pub path: NamespacePath,
    pub token: RequestToken,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Group,
    Value,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RowKind {
    Group { expanded: bool, loading: bool },
    Value { selected: bool },
    /// Failed fetch of the owning group.
    Error,
}

/// One visible line of the flattened tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeRow {
    /// Nesting level, 0 for projects.
    pub depth: usize,
    pub label: String,
    /// The node itself, or the owning group for error rows.
    pub path: NamespacePath,
    pub kind: RowKind,
}

#[derive(Debug, Default)]
struct NodeState {
    expanded: bool,
    listing: Option<Listing>,
    error: Option<String>,
    pending: Option<RequestToken>,
}

#[derive(Debug, Default)]
pub struct TreeNavigator {
    projects: Option<Vec<String>>,
    projects_error: Option<String>,
    nodes: HashMap<NamespacePath, NodeState>,
    selected: Option<NamespacePath>,
    next_token: u64,
}

impl TreeNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Project names, once loaded.
    pub fn projects(&self) -> Option<&[String]> {
        self.projects.as_deref()
    }

    pub fn projects_error(&self) -> Option<&str> {
        self.projects_error.as_deref()
    }

    pub fn selected(&self) -> Option<&NamespacePath> {
        self.selected.as_ref()
    }

    pub fn is_expanded(&self, path: &NamespacePath) -> bool {
        self.nodes.get(path).is_some_and(|n| n.expanded)
    }

    pub fn listing(&self, path: &NamespacePath) -> Option<&Listing> {
        self.nodes.get(path).and_then(|n| n.listing.as_ref())
    }

    pub fn error(&self, path: &NamespacePath) -> Option<&str> {
        self.nodes.get(path).and_then(|n| n.error.as_deref())
    }

    /// Record the project list. Projects above the selected key expand.
    pub fn set_projects(&mut self, result: Result<Vec<String>, String>) -> Vec<ChildRequest> {
        match result {
            Ok(projects) => {
                self.projects_error = None;
                let reveal: Vec<NamespacePath> = projects
                    .iter()
                    .filter_map(|p| NamespacePath::project_root(p))
                    .filter(|p| self.leads_to_selection(p))
                    .collect();
                self.projects = Some(projects);
                let mut requests = Vec::new();
                for project in &reveal {
                    requests.extend(self.expand(project));
                }
                requests
            }
            Err(message) => {
                tracing::debug!(error = %message, "Project listing failed");
                self.projects_error = Some(message);
                Vec::new()
            }
        }
    }

    /// Change the selected key and expand its mounted ancestors.
    pub fn select(&mut self, key: Option<NamespacePath>) -> Vec<ChildRequest> {
        self.selected = key;
        let Some(key) = self.selected.clone() else {
            return Vec::new();
        };

        let mut requests = Vec::new();
        for ancestor in key.ancestors() {
            if self.is_mounted(&ancestor) {
                requests.extend(self.expand(&ancestor));
            }
        }
        requests
    }

    /// Flip a group between expanded and collapsed.
    pub fn toggle(&mut self, path: &NamespacePath) -> Vec<ChildRequest> {
        if self.is_expanded(path) {
            self.collapse(path);
            Vec::new()
        } else {
            self.expand(path)
        }
    }

    /// Expand a group, fetching its listing if none is cached or in flight.
    pub fn expand(&mut self, path: &NamespacePath) -> Vec<ChildRequest> {
        let node = self.nodes.entry(path.clone()).or_default();
        node.expanded = true;

        if node.listing.is_some() {
            return self.mount_children(path);
        }
        if node.pending.is_some() {
            return Vec::new();
        }

        self.next_token += 1;
        let token = RequestToken(self.next_token);
        node.pending = Some(token);
        tracing::debug!(path = %path, token = token.0, "Fetching group listing");
        vec![ChildRequest {
            path: path.clone(),
            token,
        }]
    }

    /// Collapse a group. Its own cache survives; descendants are unmounted.
    pub fn collapse(&mut self, path: &NamespacePath) {
        if let Some(node) = self.nodes.get_mut(path) {
            node.expanded = false;
        }
        self.nodes.retain(|p, _| !path.is_ancestor_of(p));
    }

    /// Apply the outcome of a listing fetch.
    pub fn apply_listing(
        &mut self,
        path: &NamespacePath,
        token: RequestToken,
        result: Result<Listing, String>,
    ) -> Vec<ChildRequest> {
        let Some(node) = self.nodes.get_mut(path) else {
            tracing::debug!(path = %path, "Dropping listing for unmounted node");
            return Vec::new();
        };
        if node.pending != Some(token) {
            tracing::debug!(path = %path, token = token.0, "Dropping stale listing");
            return Vec::new();
        }
        node.pending = None;

        match result {
            Ok(listing) => {
                node.listing = Some(listing);
                node.error = None;
                if node.expanded {
                    return self.mount_children(path);
                }
            }
            Err(message) => {
                tracing::debug!(path = %path, error = %message, "Group listing failed");
                node.error = Some(message);
            }
        }
        Vec::new()
    }

    /// Kind of `path` according to what has been loaded so far.
    pub fn kind_of(&self, path: &NamespacePath) -> Option<NodeKind> {
        match path.parent() {
            None => self
                .projects
                .as_ref()
                .filter(|ps| ps.iter().any(|p| p == path.as_str()))
                .map(|_| NodeKind::Group),
            Some(parent) => {
                let listing = self.listing(&parent)?;
                if listing.has_group(path.name()) {
                    Some(NodeKind::Group)
                } else if listing.has_value(path.name()) {
                    Some(NodeKind::Value)
                } else {
                    None
                }
            }
        }
    }

    /// Visible rows in display order: groups before values at every level.
    pub fn rows(&self) -> Vec<TreeRow> {
        let mut rows = Vec::new();
        for project in self.projects.iter().flatten() {
            if let Some(path) = NamespacePath::project_root(project) {
                self.push_group(&path, &mut rows);
            }
        }
        rows
    }

    fn push_group(&self, path: &NamespacePath, rows: &mut Vec<TreeRow>) {
        let node = self.nodes.get(path);
        let expanded = node.is_some_and(|n| n.expanded);
        rows.push(TreeRow {
            depth: path.depth(),
            label: path.name().to_string(),
            path: path.clone(),
            kind: RowKind::Group {
                expanded,
                loading: node.is_some_and(|n| n.pending.is_some()),
            },
        });

        let Some(node) = node.filter(|n| n.expanded) else {
            return;
        };
        if let Some(message) = &node.error {
            rows.push(TreeRow {
                depth: path.depth() + 1,
                label: message.clone(),
                path: path.clone(),
                kind: RowKind::Error,
            });
        }
        let Some(listing) = &node.listing else {
            return;
        };
        for group in &listing.groups {
            if let Some(child) = path.join(group) {
                self.push_group(&child, rows);
            }
        }
        for value in &listing.values {
            if let Some(child) = path.join(value) {
                rows.push(TreeRow {
                    depth: child.depth(),
                    label: value.clone(),
                    kind: RowKind::Value {
                        selected: self.selected.as_ref() == Some(&child),
                    },
                    path: child,
                });
            }
        }
    }

    /// A group is mounted when its row would be rendered.
    fn is_mounted(&self, path: &NamespacePath) -> bool {
        match path.parent() {
            None => self.kind_of(path) == Some(NodeKind::Group),
            Some(parent) => {
                self.is_mounted(&parent)
                    && self.is_expanded(&parent)
                    && self.kind_of(path) == Some(NodeKind::Group)
            }
        }
    }

    fn leads_to_selection(&self, path: &NamespacePath) -> bool {
        self.selected
            .as_ref()
            .is_some_and(|key| path.is_ancestor_of(key))
    }

    /// Auto-expand freshly mounted children that lead to the selected key.
    fn mount_children(&mut self, path: &NamespacePath) -> Vec<ChildRequest> {
        let reveal: Vec<NamespacePath> = self
            .listing(path)
            .map(|l| l.groups.iter().filter_map(|g| path.join(g)).collect::<Vec<_>>())
            .unwrap_or_default()
            .into_iter()
            .filter(|c| self.leads_to_selection(c))
            .collect();

        let mut requests = Vec::new();
        for child in &reveal {
            requests.extend(self.expand(child));
        }
        requests
    }
}
