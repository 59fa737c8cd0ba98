//! Tracked location configuration
//!
//! Resources are classified by the first location whose glob patterns match
//! their identifier. Resources matching no location are not tracked.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a tracked resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceClass {
    /// A single task.
    Task,
    /// A project grouping tasks.
    Project,
    /// An area of responsibility.
    Area,
}

impl ResourceClass {
    /// Lowercase name used in logs and configuration.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Project => "project",
            Self::Area => "area",
        }
    }
}

impl fmt::Display for ResourceClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tracked location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationConfig {
    /// Class assigned to resources under this location.
    pub class: ResourceClass,

    /// Glob patterns matched against resource identifiers.
    pub patterns: Vec<String>,
}

impl LocationConfig {
    /// Create a location from a class and patterns.
    pub fn new<I, S>(class: ResourceClass, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            class,
            patterns: patterns.into_iter().map(Into::into).collect(),
        }
    }
}

/// Default locations: `Tasks/`, `Projects/` and `Areas/` folders.
pub fn default_locations() -> Vec<LocationConfig> {
    vec![
        LocationConfig::new(ResourceClass::Task, ["Tasks/**/*.md"]),
        LocationConfig::new(ResourceClass::Project, ["Projects/**/*.md"]),
        LocationConfig::new(ResourceClass::Area, ["Areas/**/*.md"]),
    ]
}
