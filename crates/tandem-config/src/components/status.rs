//! Status vocabulary configuration
//!
//! The ordered status list is both the legal vocabulary for the `Status`
//! field and the done/not-done classification used when keeping `Done` in
//! step with it.

use serde::{Deserialize, Serialize};

/// A named status and whether it represents a finished state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StatusDefinition {
    /// Exact status name as it appears on resources.
    pub name: String,

    /// Whether a resource in this status counts as done.
    #[serde(default)]
    pub is_done: bool,
}

impl StatusDefinition {
    /// Create a new status definition.
    pub fn new(name: impl Into<String>, is_done: bool) -> Self {
        Self {
            name: name.into(),
            is_done,
        }
    }
}

/// Default status list.
pub fn default_statuses() -> Vec<StatusDefinition> {
    vec![
        StatusDefinition::new("Backlog", false),
        StatusDefinition::new("Todo", false),
        StatusDefinition::new("In Progress", false),
        StatusDefinition::new("Done", true),
        StatusDefinition::new("Cancelled", true),
    ]
}

/// Find the definition whose name matches `name` exactly.
///
/// Matching is case-sensitive; an unmatched status is a data-integrity
/// problem and callers must not substitute a default.
pub fn find_status<'a>(statuses: &'a [StatusDefinition], name: &str) -> Option<&'a StatusDefinition> {
    statuses.iter().find(|s| s.name == name)
}

/// Preferred status names to pick when `Done` flips and a new status has to
/// be chosen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusPreferences {
    /// Names tried in order when a resource becomes done.
    #[serde(default = "default_done_preferences")]
    pub done: Vec<String>,

    /// Names tried in order when a resource becomes not done.
    #[serde(default = "default_not_done_preferences")]
    pub not_done: Vec<String>,
}

impl Default for StatusPreferences {
    fn default() -> Self {
        Self {
            done: default_done_preferences(),
            not_done: default_not_done_preferences(),
        }
    }
}

impl StatusPreferences {
    /// Preference list for the given target done state.
    pub fn for_done(&self, done: bool) -> &[String] {
        if done {
            &self.done
        } else {
            &self.not_done
        }
    }
}

fn default_done_preferences() -> Vec<String> {
    ["Done", "Completed", "Finished"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_not_done_preferences() -> Vec<String> {
    ["Backlog", "Todo", "To Do", "Not Started"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_status_is_exact() {
        let statuses = default_statuses();
        assert!(find_status(&statuses, "Done").is_some());
        assert!(find_status(&statuses, "done").is_none());
        assert!(find_status(&statuses, "Done ").is_none());
    }

    #[test]
    fn test_preferences_for_done() {
        let prefs = StatusPreferences::default();
        assert_eq!(prefs.for_done(true)[0], "Done");
        assert_eq!(prefs.for_done(false)[0], "Backlog");
    }

    #[test]
    fn test_is_done_defaults_to_false() {
        let def: StatusDefinition = serde_json::from_str(r#"{"name": "Waiting"}"#).unwrap();
        assert_eq!(def, StatusDefinition::new("Waiting", false));
    }
}
