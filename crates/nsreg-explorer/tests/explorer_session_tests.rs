//! End-to-end explorer flows against an in-memory registry.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Instant;

use nsreg_client::{Listing, Registry, RemoteError};
use nsreg_explorer::{
    dispatch, EditorStatus, ExplorerSession, InstanceStore, NamespacePath, Request, Route,
    RowKind, TreeRow,
};
use serde_json::{json, Value};

/// Registry stub that records every call it receives.
#[derive(Default)]
struct RecordingRegistry {
    projects: Vec<String>,
    listings: HashMap<String, Listing>,
    values: Mutex<HashMap<String, Value>>,
    calls: Mutex<Vec<String>>,
}

impl RecordingRegistry {
    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }

    fn not_found(what: &str) -> RemoteError {
        RemoteError::Status {
            status: 404,
            message: format!("{what} not found"),
        }
    }
}

impl Registry for RecordingRegistry {
    async fn list_projects(&self) -> Result<Vec<String>, RemoteError> {
        self.record("projects".into());
        Ok(self.projects.clone())
    }

    async fn list_children(&self, project: &str, path: &str) -> Result<Listing, RemoteError> {
        self.record(format!("ls {project} {path}"));
        let key = if path.is_empty() {
            project.to_string()
        } else {
            format!("{project}/{path}")
        };
        self.listings
            .get(&key)
            .cloned()
            .ok_or_else(|| Self::not_found(&key))
    }

    async fn get_value(&self, project: &str, path: &str) -> Result<Value, RemoteError> {
        self.record(format!("get {project} {path}"));
        let key = format!("{project}/{path}");
        self.values
            .lock()
            .unwrap()
            .get(&key)
            .cloned()
            .ok_or_else(|| Self::not_found(&key))
    }

    async fn set_value(&self, project: &str, path: &str, value: &Value) -> Result<(), RemoteError> {
        self.record(format!("set {project} {path} {value}"));
        self.values
            .lock()
            .unwrap()
            .insert(format!("{project}/{path}"), value.clone());
        Ok(())
    }

    async fn delete_value(&self, project: &str, path: &str) -> Result<(), RemoteError> {
        self.record(format!("delete {project} {path}"));
        self.values
            .lock()
            .unwrap()
            .remove(&format!("{project}/{path}"));
        Ok(())
    }
}

fn listing(groups: &[&str], values: &[&str]) -> Listing {
    Listing {
        groups: groups.iter().map(|s| s.to_string()).collect(),
        values: values.iter().map(|s| s.to_string()).collect(),
    }
}

fn registry() -> RecordingRegistry {
    let mut reg = RecordingRegistry {
        projects: vec!["app".into(), "billing".into()],
        ..Default::default()
    };
    reg.listings
        .insert("app".into(), listing(&["cfg", "other"], &["flag"]));
    reg.listings.insert("app/cfg".into(), listing(&[], &["db"]));
    reg.listings.insert("app/other".into(), listing(&[], &["x"]));
    reg.listings.insert("billing".into(), listing(&[], &["rate"]));
    {
        let mut values = reg.values.lock().unwrap();
        values.insert("app/flag".into(), json!(true));
        values.insert("app/cfg/db".into(), json!({ "host": "localhost" }));
    }
    reg
}

async fn drain(
    session: &mut ExplorerSession,
    registry: &RecordingRegistry,
    requests: Vec<Request>,
) {
    let mut queue: VecDeque<Request> = requests.into();
    while let Some(request) = queue.pop_front() {
        let response = dispatch(registry, request).await;
        queue.extend(session.apply(response, Instant::now()));
    }
}

fn row<'a>(rows: &'a [TreeRow], path: &str) -> &'a TreeRow {
    rows.iter()
        .find(|r| r.path.as_str() == path && r.kind != RowKind::Error)
        .unwrap_or_else(|| panic!("no row for {path}"))
}

fn is_open(session: &ExplorerSession, path: &str) -> bool {
    session
        .tree()
        .is_expanded(&NamespacePath::parse(path).unwrap())
}

#[tokio::test]
async fn browse_select_edit_and_save() {
    let reg = registry();
    let mut store = InstanceStore::new();
    let local = store.add("local", "http://localhost:19950");

    let (mut session, requests) =
        ExplorerSession::open(local.clone(), &Route::explore(local.id.clone(), None));
    drain(&mut session, &reg, requests).await;
    assert_eq!(reg.calls(), vec!["projects"]);
    assert_eq!(session.editor().key(), None);

    let rows = session.tree().rows();
    let app = row(&rows, "app").clone();
    let requests = session.activate(&app);
    drain(&mut session, &reg, requests).await;
    assert_eq!(reg.count("ls app "), 1);

    let rows = session.tree().rows();
    let labels: Vec<_> = rows.iter().map(|r| r.label.as_str()).collect();
    assert_eq!(labels, vec!["app", "cfg", "other", "flag", "billing"]);

    let flag = row(&rows, "app/flag").clone();
    let requests = session.activate(&flag);
    drain(&mut session, &reg, requests).await;
    assert_eq!(reg.count("get app flag"), 1);
    assert_eq!(session.editor().content(), "true");
    assert!(!session.editor().can_save());
    assert_eq!(
        session.route().to_string(),
        format!("/instance/{}/explore/app/flag", local.id)
    );

    session.editor_mut().set_content("{\n  \"enabled\": false\n}");
    let requests = session.save();
    assert_eq!(requests.len(), 1);
    drain(&mut session, &reg, requests).await;

    assert_eq!(reg.count(r#"set app flag {"enabled":false}"#), 1);
    assert_eq!(reg.calls().iter().filter(|c| c.starts_with("set")).count(), 1);
    assert_eq!(session.editor().status(), EditorStatus::Success);
    assert!(!session.editor().is_dirty());

    // Collapse and re-expand reuses the cached listing.
    let app = row(&session.tree().rows(), "app").clone();
    assert!(session.activate(&app).is_empty());
    assert!(session.activate(&app).is_empty());
    assert_eq!(reg.count("ls app "), 1);
}

#[tokio::test]
async fn deep_link_expands_only_ancestors() {
    let reg = registry();
    let mut store = InstanceStore::new();
    let local = store.add("local", "http://localhost:19950");
    let route = Route::parse(&format!("/instance/{}/explore/app/cfg/db", local.id)).unwrap();

    let (mut session, requests) = ExplorerSession::open(local, &route);
    drain(&mut session, &reg, requests).await;

    assert!(is_open(&session, "app"));
    assert!(is_open(&session, "app/cfg"));
    assert!(!is_open(&session, "app/other"));
    assert!(!is_open(&session, "billing"));
    assert_eq!(reg.count("ls app other"), 0);
    assert_eq!(reg.count("get app cfg/db"), 1);
    assert_eq!(
        session.editor().content(),
        "{\n  \"host\": \"localhost\"\n}"
    );

    let rows = session.tree().rows();
    assert_eq!(row(&rows, "app/cfg/db").kind, RowKind::Value { selected: true });
    assert_eq!(row(&rows, "app/cfg/db").depth, 2);
}

#[tokio::test]
async fn deep_link_to_a_group_opens_the_group() {
    let reg = registry();
    let mut store = InstanceStore::new();
    let local = store.add("local", "http://localhost:19950");
    let route = Route::parse(&format!("/instance/{}/explore/app/cfg", local.id)).unwrap();

    let (mut session, requests) = ExplorerSession::open(local, &route);
    drain(&mut session, &reg, requests).await;

    assert_eq!(session.editor().key(), None);
    assert_eq!(session.editor().status(), EditorStatus::Idle);
    assert!(is_open(&session, "app/cfg"));
    assert_eq!(reg.count("ls app cfg"), 1);
}

#[tokio::test]
async fn value_sharing_a_name_with_a_group_stays_selected() {
    let mut reg = registry();
    reg.listings.insert("app".into(), listing(&["cfg"], &["cfg"]));
    reg.values
        .lock()
        .unwrap()
        .insert("app/cfg".into(), json!({ "a": 1 }));
    let mut store = InstanceStore::new();
    let local = store.add("local", "http://localhost:19950");
    let (mut session, requests) =
        ExplorerSession::open(local.clone(), &Route::explore(local.id, None));
    drain(&mut session, &reg, requests).await;

    let app = row(&session.tree().rows(), "app").clone();
    let requests = session.activate(&app);
    drain(&mut session, &reg, requests).await;

    let value = session
        .tree()
        .rows()
        .into_iter()
        .find(|r| r.path.as_str() == "app/cfg" && matches!(r.kind, RowKind::Value { .. }))
        .expect("value row for app/cfg");
    let requests = session.activate(&value);
    drain(&mut session, &reg, requests).await;

    assert_eq!(session.editor().key().map(|k| k.as_str()), Some("app/cfg"));
    assert_eq!(session.editor().content(), "{\n  \"a\": 1\n}");
    assert!(!is_open(&session, "app/cfg"));
    assert_eq!(reg.count("ls app cfg"), 0);
}

#[tokio::test]
async fn stale_value_does_not_overwrite_newer_selection() {
    let reg = registry();
    let mut store = InstanceStore::new();
    let local = store.add("local", "http://localhost:19950");
    let (mut session, _) = ExplorerSession::open(local.clone(), &Route::explore(local.id, None));

    let first = session.select_key(NamespacePath::parse("app/flag"));
    let second = session.select_key(NamespacePath::parse("app/cfg/db"));
    let first_response = dispatch(&reg, first[0].clone()).await;
    let second_response = dispatch(&reg, second[0].clone()).await;

    session.apply(second_response, Instant::now());
    session.apply(first_response, Instant::now());
    assert_eq!(
        session.editor().content(),
        "{\n  \"host\": \"localhost\"\n}"
    );
}

#[tokio::test]
async fn invalid_json_issues_no_request() {
    let reg = registry();
    let mut store = InstanceStore::new();
    let local = store.add("local", "http://localhost:19950");
    let route = Route::explore(local.id.clone(), NamespacePath::parse("app/flag").as_ref());
    let (mut session, requests) = ExplorerSession::open(local, &route);
    drain(&mut session, &reg, requests).await;

    session.editor_mut().set_content("{ not json");
    assert!(session.save().is_empty());
    assert_eq!(session.editor().status(), EditorStatus::Error);
    assert_eq!(session.editor().error(), Some("Invalid JSON format."));
    assert!(reg.calls().iter().all(|c| !c.starts_with("set")));
}

#[tokio::test]
async fn missing_group_shows_error_row() {
    let mut reg = registry();
    reg.listings.remove("billing");
    let mut store = InstanceStore::new();
    let local = store.add("local", "http://localhost:19950");
    let (mut session, requests) =
        ExplorerSession::open(local.clone(), &Route::explore(local.id, None));
    drain(&mut session, &reg, requests).await;

    let billing = row(&session.tree().rows(), "billing").clone();
    let requests = session.activate(&billing);
    drain(&mut session, &reg, requests).await;

    let rows = session.tree().rows();
    let error = rows.iter().find(|r| r.kind == RowKind::Error).unwrap();
    assert_eq!(error.label, "billing not found");
    assert_eq!(error.depth, 1);
    assert!(is_open(&session, "billing"));
}
