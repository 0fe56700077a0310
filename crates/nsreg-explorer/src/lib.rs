//! nsreg explorer - the state behind the registry console.
//!
//! Every remote call is described as a [`Request`] and answered with a
//! [`Response`]; the components never perform I/O themselves. The console
//! runs requests on tokio and feeds responses back through
//! [`ExplorerSession::apply`].

pub mod editor;
pub mod path;
pub mod route;
pub mod session;
pub mod store;
pub mod text;
pub mod tree;

pub use editor::{EditorStatus, ValueEditor};
pub use path::NamespacePath;
pub use route::{Route, RouteError};
pub use session::{dispatch, ExplorerSession, Request, Response};
pub use store::{Instance, InstanceId, InstanceStore};
pub use text::TextBuffer;
pub use tree::{NodeKind, RequestToken, RowKind, TreeNavigator, TreeRow};
