//! One open explorer: tree and editor bound to a single instance.

use std::time::Instant;

use nsreg_client::{Listing, Registry};
use serde_json::Value;

use crate::editor::{LoadRequest, SaveRequest};
use crate::tree::{ChildRequest, NodeKind, RequestToken, RowKind, TreeRow};
use crate::{Instance, NamespacePath, Route, TreeNavigator, ValueEditor};

/// Remote work requested by the explorer.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Projects,
    Children {
        path: NamespacePath,
        token: RequestToken,
    },
    Load {
        key: NamespacePath,
        token: RequestToken,
    },
    Save {
        key: NamespacePath,
        value: Value,
        token: RequestToken,
    },
}

/// Outcome of a [`Request`]; errors are carried as display messages.
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Projects(Result<Vec<String>, String>),
    Children {
        path: NamespacePath,
        token: RequestToken,
        result: Result<Listing, String>,
    },
    Loaded {
        token: RequestToken,
        result: Result<Value, String>,
    },
    Saved {
        token: RequestToken,
        result: Result<(), String>,
    },
}

impl Request {
    /// Response for a request that could not be sent at all.
    pub fn fail(self, message: &str) -> Response {
        let err = message.to_string();
        match self {
            Request::Projects => Response::Projects(Err(err)),
            Request::Children { path, token } => Response::Children {
                path,
                token,
                result: Err(err),
            },
            Request::Load { token, .. } => Response::Loaded {
                token,
                result: Err(err),
            },
            Request::Save { token, .. } => Response::Saved {
                token,
                result: Err(err),
            },
        }
    }
}

impl From<ChildRequest> for Request {
    fn from(req: ChildRequest) -> Self {
        Request::Children {
            path: req.path,
            token: req.token,
        }
    }
}

impl From<LoadRequest> for Request {
    fn from(req: LoadRequest) -> Self {
        Request::Load {
            key: req.key,
            token: req.token,
        }
    }
}

impl From<SaveRequest> for Request {
    fn from(req: SaveRequest) -> Self {
        Request::Save {
            key: req.key,
            value: req.value,
            token: req.token,
        }
    }
}

/// Perform `request` against `registry`.
pub async fn dispatch<R: Registry>(registry: &R, request: Request) -> Response {
    match request {
        Request::Projects => Response::Projects(
            registry.list_projects().await.map_err(|e| e.to_string()),
        ),
        Request::Children { path, token } => {
            let result = registry
                .list_children(path.project(), path.relative())
                .await
                .map_err(|e| e.to_string());
            Response::Children { path, token, result }
        }
        Request::Load { key, token } => Response::Loaded {
            token,
            result: registry
                .get_value(key.project(), key.relative())
                .await
                .map_err(|e| e.to_string()),
        },
        Request::Save { key, value, token } => Response::Saved {
            token,
            result: registry
                .set_value(key.project(), key.relative(), &value)
                .await
                .map_err(|e| e.to_string()),
        },
    }
}

#[derive(Debug)]
pub struct ExplorerSession {
    instance: Instance,
    tree: TreeNavigator,
    editor: ValueEditor,
}

impl ExplorerSession {
    /// Open the explorer for `instance` at the key named by `route`.
    pub fn open(instance: Instance, route: &Route) -> (Self, Vec<Request>) {
        let mut session = Self {
            instance,
            tree: TreeNavigator::new(),
            editor: ValueEditor::new(),
        };
        let mut requests = vec![Request::Projects];
        requests.extend(session.select_key(route.selected_key()));
        (session, requests)
    }

    pub fn instance(&self) -> &Instance {
        &self.instance
    }

    pub fn tree(&self) -> &TreeNavigator {
        &self.tree
    }

    pub fn editor(&self) -> &ValueEditor {
        &self.editor
    }

    pub fn editor_mut(&mut self) -> &mut ValueEditor {
        &mut self.editor
    }

    pub fn selected_key(&self) -> Option<&NamespacePath> {
        self.editor.key()
    }

    /// Route naming the current selection.
    pub fn route(&self) -> Route {
        Route::explore(self.instance.id.clone(), self.selected_key())
    }

    /// Select a key. Re-selecting the current key does nothing.
    pub fn select_key(&mut self, key: Option<NamespacePath>) -> Vec<Request> {
        if key.as_ref() == self.editor.key() && self.editor.key().is_some() {
            return Vec::new();
        }
        let mut requests: Vec<Request> = self
            .tree
            .select(key.clone())
            .into_iter()
            .map(Request::from)
            .collect();
        requests.extend(self.editor.select(key).map(Request::from));
        requests
    }

    /// Clicking a row: groups toggle, values are selected.
    pub fn activate(&mut self, row: &TreeRow) -> Vec<Request> {
        match row.kind {
            RowKind::Group { .. } => self.toggle(&row.path),
            RowKind::Value { .. } => self.select_key(Some(row.path.clone())),
            RowKind::Error => Vec::new(),
        }
    }

    pub fn toggle(&mut self, path: &NamespacePath) -> Vec<Request> {
        self.tree.toggle(path).into_iter().map(Request::from).collect()
    }

    pub fn collapse(&mut self, path: &NamespacePath) {
        self.tree.collapse(path);
    }

    pub fn save(&mut self) -> Vec<Request> {
        self.editor.save().map(Request::from).into_iter().collect()
    }

    pub fn revert(&mut self) {
        self.editor.revert();
    }

    pub fn tick(&mut self, now: Instant) -> bool {
        self.editor.tick(now)
    }

    /// Feed a finished request back in, returning follow-up work.
    pub fn apply(&mut self, response: Response, now: Instant) -> Vec<Request> {
        let mut requests: Vec<Request> = match response {
            Response::Projects(result) => self
                .tree
                .set_projects(result)
                .into_iter()
                .map(Request::from)
                .collect(),
            Response::Children {
                path,
                token,
                result,
            } => self
                .tree
                .apply_listing(&path, token, result)
                .into_iter()
                .map(Request::from)
                .collect(),
            Response::Loaded { token, result } => {
                self.editor.apply_load(token, result);
                Vec::new()
            }
            Response::Saved { token, result } => {
                self.editor.apply_save(token, result, now);
                Vec::new()
            }
        };
        requests.extend(self.reconcile_selection());
        requests
    }

    /// A deep link may name a group. Once the listings show that, drop the
    /// key selection and open the group instead. A name listed both as a
    /// group and as a value stays selected.
    fn reconcile_selection(&mut self) -> Vec<Request> {
        let Some(key) = self.editor.key().cloned() else {
            return Vec::new();
        };
        if self.tree.kind_of(&key) != Some(NodeKind::Group) {
            return Vec::new();
        }
        let also_value = key
            .parent()
            .and_then(|parent| self.tree.listing(&parent))
            .is_some_and(|listing| listing.has_value(key.name()));
        if also_value {
            return Vec::new();
        }

        tracing::info!(path = %key, "Selected path is a group; opening it instead");
        let mut requests = self.select_key(None);
        requests.extend(self.tree.expand(&key).into_iter().map(Request::from));
        requests
    }
}
