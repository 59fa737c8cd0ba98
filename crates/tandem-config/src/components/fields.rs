//! Names of the fields the watcher tracks and the sync engine couples.

use serde::{Deserialize, Serialize};

/// Field names read from and written to resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldNames {
    /// Field holding the status name.
    #[serde(default = "default_status_field")]
    pub status: String,

    /// Field holding the done flag.
    #[serde(default = "default_done_field")]
    pub done: String,

    /// Extra fields whose changes produce `ResourceUpdated` events.
    #[serde(default)]
    pub extra: Vec<String>,
}

impl Default for FieldNames {
    fn default() -> Self {
        Self {
            status: default_status_field(),
            done: default_done_field(),
            extra: Vec::new(),
        }
    }
}

impl FieldNames {
    /// Every tracked field, status and done first.
    pub fn tracked(&self) -> Vec<String> {
        let mut fields = vec![self.status.clone(), self.done.clone()];
        for field in &self.extra {
            if !fields.contains(field) {
                fields.push(field.clone());
            }
        }
        fields
    }
}

fn default_status_field() -> String {
    "Status".to_string()
}

fn default_done_field() -> String {
    "Done".to_string()
}
