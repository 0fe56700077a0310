use serde::{Deserialize, Serialize};

/// Immediate children of a namespace path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// Child groups, in the order the service returned them.
    #[serde(default)]
    pub groups: Vec<String>,
    /// Leaf keys, in the order the service returned them.
    #[serde(default)]
    pub values: Vec<String>,
}

impl Listing {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty() && self.values.is_empty()
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.groups.iter().any(|g| g == name)
    }

    pub fn has_value(&self, name: &str) -> bool {
        self.values.iter().any(|v| v == name)
    }
}
