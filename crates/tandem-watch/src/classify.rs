//! Maps resource ids to a [`ResourceClass`] using the configured locations.

use crate::error::{WatchError, WatchResult};
use globset::{Glob, GlobSet, GlobSetBuilder};
use tandem_config::{LocationConfig, ResourceClass};
use tandem_core::ResourceId;

/// First-match classifier over tracked locations.
#[derive(Debug, Clone)]
pub struct ResourceClassifier {
    matchers: Vec<(ResourceClass, GlobSet)>,
}

impl ResourceClassifier {
    /// Compile the glob patterns of every location.
    pub fn from_locations(locations: &[LocationConfig]) -> WatchResult<Self> {
        let mut matchers = Vec::with_capacity(locations.len());
        for location in locations {
            let mut builder = GlobSetBuilder::new();
            for pattern in &location.patterns {
                let glob = Glob::new(pattern)
                    .map_err(|e| WatchError::Pattern(format!("{}: {}", pattern, e)))?;
                builder.add(glob);
            }
            let set = builder
                .build()
                .map_err(|e| WatchError::Pattern(e.to_string()))?;
            matchers.push((location.class, set));
        }
        Ok(Self { matchers })
    }

    /// Class of the first location matching `id`, or `None` when untracked.
    pub fn classify(&self, id: &ResourceId) -> Option<ResourceClass> {
        self.matchers
            .iter()
            .find(|(_, set)| set.is_match(id.as_str()))
            .map(|(class, _)| *class)
    }

    /// Whether `id` lies in a tracked location.
    pub fn is_tracked(&self, id: &ResourceId) -> bool {
        self.classify(id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_config::default_locations;

    #[test]
    fn test_default_locations_classify_by_folder() {
        let classifier = ResourceClassifier::from_locations(&default_locations()).unwrap();

        assert_eq!(
            classifier.classify(&"Tasks/write-docs.md".into()),
            Some(ResourceClass::Task)
        );
        assert_eq!(
            classifier.classify(&"Projects/2026/launch.md".into()),
            Some(ResourceClass::Project)
        );
        assert_eq!(
            classifier.classify(&"Areas/health.md".into()),
            Some(ResourceClass::Area)
        );
        assert_eq!(classifier.classify(&"Journal/today.md".into()), None);
        assert!(!classifier.is_tracked(&"Tasks/notes.txt".into()));
    }

    #[test]
    fn test_first_matching_location_wins() {
        let locations = vec![
            LocationConfig::new(ResourceClass::Project, ["Work/Projects/**/*.md"]),
            LocationConfig::new(ResourceClass::Task, ["Work/**/*.md"]),
        ];
        let classifier = ResourceClassifier::from_locations(&locations).unwrap();

        assert_eq!(
            classifier.classify(&"Work/Projects/site.md".into()),
            Some(ResourceClass::Project)
        );
        assert_eq!(
            classifier.classify(&"Work/inbox.md".into()),
            Some(ResourceClass::Task)
        );
    }

    #[test]
    fn test_invalid_pattern_is_rejected() {
        let locations = vec![LocationConfig::new(ResourceClass::Task, ["Tasks/[*.md"])];
        let err = ResourceClassifier::from_locations(&locations).unwrap_err();
        assert!(matches!(err, WatchError::Pattern(_)));
    }
}
