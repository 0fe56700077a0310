use std::future::Future;

use serde_json::Value;

use crate::{Listing, RemoteError};

/// Operations a registry instance supports.
///
/// `project` is the first namespace segment; `path` is the remainder inside
/// the project (`""` for the project root).
pub trait Registry: Send + Sync {
    fn list_projects(&self) -> impl Future<Output = Result<Vec<String>, RemoteError>> + Send;

    fn list_children(
        &self,
        project: &str,
        path: &str,
    ) -> impl Future<Output = Result<Listing, RemoteError>> + Send;

    fn get_value(
        &self,
        project: &str,
        path: &str,
    ) -> impl Future<Output = Result<Value, RemoteError>> + Send;

    fn set_value(
        &self,
        project: &str,
        path: &str,
        value: &Value,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;

    fn delete_value(
        &self,
        project: &str,
        path: &str,
    ) -> impl Future<Output = Result<(), RemoteError>> + Send;
}
