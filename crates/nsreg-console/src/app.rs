//! Console shell: the instance list, navigation, and the open explorer.
//!
//! Remote calls are spawned on tokio and report back over an unbounded
//! channel. Every response is tagged with the explorer session that asked
//! for it, so results arriving after the operator left are dropped.

use std::path::PathBuf;
use std::time::Instant;

use chrono::{DateTime, Utc};
use nsreg_client::RegistryClient;
use nsreg_explorer::{
    dispatch, ExplorerSession, Instance, InstanceStore, Request, Response, Route, RowKind,
};
use tokio::sync::mpsc;

use crate::config::save_instances;

const MAX_MESSAGES: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Warning,
    Error,
    Hint,
}

#[derive(Debug, Clone)]
pub struct ConsoleMessage {
    pub at: DateTime<Utc>,
    pub text: String,
    pub level: MessageLevel,
}

#[derive(Debug)]
pub struct Envelope {
    pub session: u64,
    pub response: Response,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Tree,
    Editor,
}

pub struct ExplorerView {
    pub session: ExplorerSession,
    /// `Err` holds the reason the instance URL is unusable.
    client: Result<RegistryClient, String>,
    id: u64,
    pub focus: Focus,
    /// Highlighted row in the sidebar tree.
    pub cursor: usize,
}

impl ExplorerView {
    fn clamp_cursor(&mut self) {
        let len = self.session.tree().rows().len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }
}

pub enum Screen {
    Home,
    Explore(Box<ExplorerView>),
}

pub struct App {
    store: InstanceStore,
    instances_file: Option<PathBuf>,
    http: reqwest::Client,
    screen: Screen,
    /// Highlighted instance on the home screen.
    pub selected: usize,
    /// Command line text.
    pub input: String,
    /// Cursor position within the command line, in chars.
    pub cursor_pos: usize,
    messages: Vec<ConsoleMessage>,
    next_session: u64,
    tx: mpsc::UnboundedSender<Envelope>,
    rx: mpsc::UnboundedReceiver<Envelope>,
    quit: bool,
}

impl App {
    pub fn new(store: InstanceStore, instances_file: Option<PathBuf>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut app = Self {
            store,
            instances_file,
            http: reqwest::Client::new(),
            screen: Screen::Home,
            selected: 0,
            input: String::new(),
            cursor_pos: 0,
            messages: Vec::new(),
            next_session: 0,
            tx,
            rx,
            quit: false,
        };
        app.push_message(
            "Namespaced registry console ready. Add an instance with /add <name> <url>.",
            MessageLevel::Info,
        );
        app.push_message(
            "Commands: /help, /add, /edit, /delete, /open, /go, /quit",
            MessageLevel::Hint,
        );
        app
    }

    pub fn store(&self) -> &InstanceStore {
        &self.store
    }

    pub fn screen(&self) -> &Screen {
        &self.screen
    }

    pub fn messages(&self) -> &[ConsoleMessage] {
        &self.messages
    }

    pub fn should_quit(&self) -> bool {
        self.quit
    }

    pub fn quit(&mut self) {
        self.quit = true;
    }

    pub fn push_message(&mut self, text: impl Into<String>, level: MessageLevel) {
        self.messages.push(ConsoleMessage {
            at: Utc::now(),
            text: text.into(),
            level,
        });
        if self.messages.len() > MAX_MESSAGES {
            self.messages.remove(0);
        }
    }

    pub fn explorer(&self) -> Option<&ExplorerView> {
        match &self.screen {
            Screen::Explore(view) => Some(view),
            Screen::Home => None,
        }
    }

    pub fn explorer_mut(&mut self) -> Option<&mut ExplorerView> {
        match &mut self.screen {
            Screen::Explore(view) => Some(view),
            Screen::Home => None,
        }
    }

    /// Where the console currently is.
    pub fn route(&self) -> Route {
        match self.explorer() {
            Some(view) => view.session.route(),
            None => Route::Home,
        }
    }

    pub fn navigate(&mut self, route: Route) {
        let instance_id = match &route {
            Route::Home => {
                self.screen = Screen::Home;
                return;
            }
            Route::Explore { instance, .. } => instance.clone(),
        };

        let Some(instance) = self.store.get(&instance_id).cloned() else {
            tracing::warn!(instance = %instance_id, "Unknown instance, returning to instance list");
            self.push_message(
                format!("Instance '{instance_id}' not found."),
                MessageLevel::Warning,
            );
            self.screen = Screen::Home;
            return;
        };

        if let Some(pos) = self.store.position(&instance.id) {
            self.selected = pos;
        }
        self.next_session += 1;
        let client = RegistryClient::with_http(self.http.clone(), &instance.url)
            .map_err(|e| e.to_string());
        tracing::info!(instance = %instance.name, route = %route, "Opening explorer");

        let (session, requests) = ExplorerSession::open(instance, &route);
        self.screen = Screen::Explore(Box::new(ExplorerView {
            session,
            client,
            id: self.next_session,
            focus: Focus::Tree,
            cursor: 0,
        }));
        self.spawn(requests);
    }

    fn spawn(&self, requests: Vec<Request>) {
        let Screen::Explore(view) = &self.screen else {
            return;
        };
        for request in requests {
            let tx = self.tx.clone();
            let session = view.id;
            match &view.client {
                Ok(client) => {
                    let client = client.clone();
                    tokio::spawn(async move {
                        let response = dispatch(&client, request).await;
                        let _ = tx.send(Envelope { session, response });
                    });
                }
                Err(message) => {
                    let _ = tx.send(Envelope {
                        session,
                        response: request.fail(message),
                    });
                }
            }
        }
    }

    /// Apply every finished request. Returns how many were applied.
    pub fn drain_responses(&mut self, now: Instant) -> usize {
        let mut applied = 0;
        while let Ok(envelope) = self.rx.try_recv() {
            let Screen::Explore(view) = &mut self.screen else {
                continue;
            };
            if view.id != envelope.session {
                tracing::debug!(
                    session = envelope.session,
                    "Dropping response for closed explorer"
                );
                continue;
            }
            let follow_up = view.session.apply(envelope.response, now);
            view.clamp_cursor();
            applied += 1;
            self.spawn(follow_up);
        }
        applied
    }

    pub fn tick(&mut self, now: Instant) {
        if let Some(view) = self.explorer_mut() {
            view.session.tick(now);
        }
    }

    // ── Home screen ──

    pub fn select_instance(&mut self, delta: isize) {
        let len = self.store.len();
        if len == 0 {
            self.selected = 0;
            return;
        }
        self.selected = (self.selected as isize + delta).clamp(0, len as isize - 1) as usize;
    }

    /// Submit the command line. An empty line opens the highlighted instance.
    pub fn process_input(&mut self) {
        let input = self.input.trim().to_string();
        self.input.clear();
        self.cursor_pos = 0;

        if input.is_empty() {
            if let Some(instance) = self.store.as_slice().get(self.selected).cloned() {
                self.navigate(Route::explore(instance.id, None));
            }
            return;
        }
        match input.strip_prefix('/') {
            Some(command) => self.process_command(command),
            None => self.push_message(
                format!("Unrecognized input '{input}'. Type /help for commands."),
                MessageLevel::Warning,
            ),
        }
    }

    /// Run a slash command (without the leading `/`).
    pub fn process_command(&mut self, command: &str) {
        let (command, args) = command
            .split_once(' ')
            .map_or((command, ""), |(c, a)| (c, a.trim()));

        match command {
            "help" => self.show_help(),
            "add" => match split_name_url(args) {
                Some((name, url)) => {
                    let instance = self.store.add(name, url);
                    self.selected = self.store.len() - 1;
                    tracing::info!(id = %instance.id, name = %instance.name, "Instance added");
                    self.push_message(
                        format!("Added '{}' ({}).", instance.name, instance.url),
                        MessageLevel::Success,
                    );
                    self.persist();
                }
                None => self.push_message("Usage: /add <name> <url>", MessageLevel::Warning),
            },
            "edit" => {
                let parsed = args
                    .split_once(' ')
                    .and_then(|(n, rest)| Some((self.instance_at(n)?, split_name_url(rest)?)));
                match parsed {
                    Some((instance, (name, url))) => {
                        let updated = Instance {
                            name: name.to_string(),
                            url: url.to_string(),
                            ..instance
                        };
                        self.store.update(updated.clone());
                        tracing::info!(id = %updated.id, name = %updated.name, "Instance updated");
                        self.push_message(
                            format!("Updated '{}' ({}).", updated.name, updated.url),
                            MessageLevel::Success,
                        );
                        self.persist();
                    }
                    None => {
                        self.push_message("Usage: /edit <n> <name> <url>", MessageLevel::Warning)
                    }
                }
            }
            "delete" | "rm" => match self.instance_at(args) {
                Some(instance) => {
                    self.store.delete(&instance.id);
                    self.select_instance(0);
                    tracing::info!(id = %instance.id, name = %instance.name, "Instance deleted");
                    self.push_message(
                        format!("Deleted '{}'.", instance.name),
                        MessageLevel::Success,
                    );
                    self.persist();
                }
                None => self.push_message("Usage: /delete <n>", MessageLevel::Warning),
            },
            "open" => {
                let (n, path) = args.split_once(' ').unwrap_or((args, ""));
                match self.instance_at(n) {
                    Some(instance) => self.navigate(Route::Explore {
                        instance: instance.id,
                        path: path.trim().to_string(),
                    }),
                    None => self.push_message("Usage: /open <n> [path]", MessageLevel::Warning),
                }
            }
            "go" => match Route::parse(args) {
                Ok(route) => self.navigate(route),
                Err(e) => self.push_message(e.to_string(), MessageLevel::Error),
            },
            "quit" | "exit" | "q" => self.quit = true,
            _ => self.push_message(
                format!("Unknown command '/{command}'. Type /help for commands."),
                MessageLevel::Warning,
            ),
        }
    }

    fn show_help(&mut self) {
        self.push_message("Available commands:", MessageLevel::Info);
        for line in [
            "  /add <name> <url>        - Register an instance",
            "  /edit <n> <name> <url>   - Change instance n",
            "  /delete <n>              - Remove instance n",
            "  /open <n> [path]         - Explore instance n, optionally at a key",
            "  /go <route>              - Navigate to /instance/<id>/explore/<path>",
            "  /quit                    - Exit the console",
            "  Up/Down + Enter          - Open the highlighted instance",
        ] {
            self.push_message(line, MessageLevel::Hint);
        }
    }

    /// Instance by 1-based list position.
    fn instance_at(&self, arg: &str) -> Option<Instance> {
        let n: usize = arg.trim().parse().ok()?;
        self.store.as_slice().get(n.checked_sub(1)?).cloned()
    }

    fn persist(&mut self) {
        let Some(path) = self.instances_file.clone() else {
            return;
        };
        if let Err(e) = save_instances(&path, &self.store) {
            tracing::warn!(error = %e, path = %path.display(), "Failed to persist instances");
            self.push_message(format!("Could not save instances: {e:#}"), MessageLevel::Error);
        }
    }

    // ── Explorer screen ──

    pub fn tree_move(&mut self, delta: isize) {
        if let Some(view) = self.explorer_mut() {
            let len = view.session.tree().rows().len();
            if len == 0 {
                view.cursor = 0;
                return;
            }
            view.cursor = (view.cursor as isize + delta).clamp(0, len as isize - 1) as usize;
        }
    }

    /// Enter on a tree row: toggle a group or open a value.
    pub fn tree_activate(&mut self) {
        let Some(view) = self.explorer_mut() else {
            return;
        };
        let rows = view.session.tree().rows();
        let Some(row) = rows.get(view.cursor) else {
            return;
        };
        if let RowKind::Value { .. } = row.kind {
            tracing::info!(key = %row.path, "Key selected");
        }
        let requests = view.session.activate(row);
        view.clamp_cursor();
        self.spawn(requests);
    }

    pub fn tree_expand(&mut self) {
        let Some(view) = self.explorer_mut() else {
            return;
        };
        let rows = view.session.tree().rows();
        if let Some(row) = rows.get(view.cursor) {
            if let RowKind::Group { expanded: false, .. } = row.kind {
                let requests = view.session.toggle(&row.path);
                self.spawn(requests);
            }
        }
    }

    /// Collapse the highlighted group, or jump to the parent row.
    pub fn tree_collapse(&mut self) {
        let Some(view) = self.explorer_mut() else {
            return;
        };
        let rows = view.session.tree().rows();
        let Some(row) = rows.get(view.cursor) else {
            return;
        };
        match row.kind {
            RowKind::Group { expanded: true, .. } => view.session.collapse(&row.path),
            RowKind::Error => {
                if let Some(pos) = rows.iter().position(|r| r.path == row.path) {
                    view.cursor = pos;
                }
            }
            _ => {
                let parent = row.path.parent();
                if let Some(pos) = rows.iter().position(|r| Some(&r.path) == parent.as_ref()) {
                    view.cursor = pos;
                }
            }
        }
        view.clamp_cursor();
    }

    pub fn save(&mut self) {
        let Some(view) = self.explorer_mut() else {
            return;
        };
        let requests = view.session.save();
        if let Some(key) = view.session.selected_key() {
            if !requests.is_empty() {
                tracing::info!(key = %key, "Saving value");
            }
        }
        self.spawn(requests);
    }

    pub fn revert(&mut self) {
        if let Some(view) = self.explorer_mut() {
            view.session.revert();
        }
    }

    pub fn toggle_focus(&mut self) {
        if let Some(view) = self.explorer_mut() {
            view.focus = match view.focus {
                Focus::Tree if view.session.selected_key().is_some() => Focus::Editor,
                _ => Focus::Tree,
            };
        }
    }
}

/// Split `"<name words...> <url>"` at the last whitespace.
fn split_name_url(args: &str) -> Option<(&str, &str)> {
    let (name, url) = args.trim().rsplit_once(char::is_whitespace)?;
    let (name, url) = (name.trim(), url.trim());
    (!name.is_empty() && !url.is_empty()).then_some((name, url))
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use nsreg_explorer::InstanceId;

    use super::*;

    fn app_with(instances: &[(&str, &str)]) -> App {
        let mut store = InstanceStore::new();
        for (name, url) in instances {
            store.add(*name, *url);
        }
        App::new(store, None)
    }

    fn last_message(app: &App) -> &ConsoleMessage {
        app.messages().last().unwrap()
    }

    #[test]
    fn split_name_url_takes_last_word_as_url() {
        assert_eq!(
            split_name_url("my local  http://localhost:19950"),
            Some(("my local", "http://localhost:19950"))
        );
        assert_eq!(split_name_url("onlyname"), None);
        assert_eq!(split_name_url(""), None);
    }

    #[tokio::test]
    async fn add_edit_delete_commands() {
        let mut app = app_with(&[]);
        app.process_command("add local http://localhost:19950");
        assert_eq!(app.store().len(), 1);
        assert_eq!(last_message(&app).level, MessageLevel::Success);

        app.process_command("edit 1 dev http://dev:19950");
        let inst = &app.store().as_slice()[0];
        assert_eq!((inst.name.as_str(), inst.url.as_str()), ("dev", "http://dev:19950"));

        app.process_command("edit 7 x http://x");
        assert_eq!(last_message(&app).level, MessageLevel::Warning);

        app.process_command("delete 1");
        assert!(app.store().is_empty());
        assert_eq!(app.selected, 0);
    }

    #[tokio::test]
    async fn mutations_are_persisted_when_configured() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("instances.toml");
        let mut app = App::new(InstanceStore::new(), Some(path.clone()));

        app.process_command("add local http://localhost:19950");
        let saved = crate::config::load_instances(&path).unwrap();
        assert_eq!(&saved, app.store());
    }

    #[tokio::test]
    async fn failed_persist_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        // A directory cannot be written as a file.
        let mut app = App::new(InstanceStore::new(), Some(dir.path().to_path_buf()));

        app.process_command("add local http://localhost:19950");
        assert_eq!(app.store().len(), 1);
        assert!(!app.should_quit());
        let last = last_message(&app);
        assert_eq!(last.level, MessageLevel::Error);
        assert!(last.text.starts_with("Could not save instances"), "{}", last.text);
    }

    #[tokio::test]
    async fn unknown_instance_redirects_home() {
        let mut app = app_with(&[("local", "http://localhost:19950")]);
        app.navigate(Route::Explore {
            instance: InstanceId::new("missing".into()),
            path: "app/flag".into(),
        });
        assert!(matches!(app.screen(), Screen::Home));
        assert_eq!(app.route(), Route::Home);
        assert_eq!(last_message(&app).text, "Instance 'missing' not found.");
    }

    #[tokio::test]
    async fn unusable_url_surfaces_in_sidebar_and_editor() {
        let mut app = app_with(&[("broken", "not a url")]);
        app.process_command("open 1 app/flag");

        let view = app.explorer().expect("explorer open");
        assert_eq!(view.session.selected_key().map(|k| k.as_str()), Some("app/flag"));

        assert_eq!(app.drain_responses(Instant::now()), 2);
        let view = app.explorer().unwrap();
        assert!(view
            .session
            .tree()
            .projects_error()
            .is_some_and(|e| e.contains("Invalid registry URL")));
        assert!(view.session.editor().error().is_some());
    }

    #[tokio::test]
    async fn responses_for_closed_explorer_are_dropped() {
        let mut app = app_with(&[("broken", "not a url")]);
        app.process_input(); // empty line opens the highlighted instance
        assert!(app.explorer().is_some());

        app.navigate(Route::Home);
        assert_eq!(app.drain_responses(Instant::now()), 0);

        app.process_command("open 1");
        tokio::time::sleep(Duration::from_millis(1)).await;
        assert_eq!(app.drain_responses(Instant::now()), 1);
    }

    #[tokio::test]
    async fn go_command_reports_bad_routes() {
        let mut app = app_with(&[]);
        app.process_command("go /nowhere");
        assert_eq!(last_message(&app).level, MessageLevel::Error);
        app.process_command("quit");
        assert!(app.should_quit());
    }
}
