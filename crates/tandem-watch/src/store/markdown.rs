//! Field store over a directory of markdown files.
//!
//! Fields live in the YAML frontmatter of each `*.md` file:
//!
//! ```text
//! ---
//! Status: In Progress
//! Done: false
//! ---
//! # Write the docs
//! ```
//!
//! A resource id is the file path relative to the root, with `/`
//! separators. Files without frontmatter read as an empty snapshot and gain
//! a frontmatter block on their first write.

use async_trait::async_trait;
use serde_yaml::{Mapping, Value as YamlValue};
use std::path::{Component, Path, PathBuf};
use tandem_core::{
    CorrelationId, FieldReader, FieldValue, FieldWriter, ResourceId, Snapshot, StorageError,
    StorageResult,
};
use tracing::{debug, warn};

const DELIMITER: &str = "---";

/// Markdown vault exposed as a [`FieldStore`](tandem_core::FieldStore).
///
/// Writes are plain file rewrites, so change notifications cannot carry a
/// correlation id.
#[derive(Debug, Clone)]
pub struct MarkdownStore {
    root: PathBuf,
}

impl MarkdownStore {
    /// Create a store rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Vault root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resource id for an absolute path under the root, if it names a
    /// markdown file outside hidden directories.
    pub fn resource_id_for(&self, path: &Path) -> Option<ResourceId> {
        let relative = path.strip_prefix(&self.root).ok()?;
        if relative.extension().and_then(|e| e.to_str()) != Some("md") {
            return None;
        }
        let mut parts = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    let part = part.to_str()?;
                    if part.starts_with('.') {
                        return None;
                    }
                    parts.push(part);
                }
                _ => return None,
            }
        }
        Some(ResourceId::new(parts.join("/")))
    }

    /// Absolute path of a resource.
    pub fn path_for(&self, id: &ResourceId) -> StorageResult<PathBuf> {
        let relative = Path::new(id.as_str());
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_)));
        if escapes {
            return Err(StorageError::Malformed {
                resource_id: id.clone(),
                message: "resource id must be a relative path inside the vault".into(),
            });
        }
        Ok(self.root.join(relative))
    }

    async fn read_document(&self, id: &ResourceId) -> StorageResult<Document> {
        let path = self.path_for(id)?;
        let content = tokio::fs::read_to_string(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::NotFound(id.clone())
            } else {
                StorageError::Read {
                    resource_id: id.clone(),
                    message: e.to_string(),
                }
            }
        })?;
        Document::parse(id, &content)
    }
}

#[async_trait]
impl FieldReader for MarkdownStore {
    async fn read_fields(&self, id: &ResourceId) -> StorageResult<Snapshot> {
        self.read_document(id).await?.fields(id)
    }

    async fn list_resources(&self) -> StorageResult<Vec<ResourceId>> {
        let store = self.clone();
        let files = tokio::task::spawn_blocking(move || {
            let mut files = Vec::new();
            collect_markdown(&store.root, &mut files)?;
            Ok::<_, std::io::Error>(
                files
                    .iter()
                    .filter_map(|path| store.resource_id_for(path))
                    .collect::<Vec<_>>(),
            )
        })
        .await
        .map_err(|e| StorageError::Io(std::io::Error::other(e.to_string())))??;

        let mut ids = files;
        ids.sort();
        Ok(ids)
    }
}

#[async_trait]
impl FieldWriter for MarkdownStore {
    async fn write_field(
        &self,
        id: &ResourceId,
        field: &str,
        value: FieldValue,
        _origin: Option<CorrelationId>,
    ) -> StorageResult<()> {
        let mut document = self.read_document(id).await?;
        document.set(id, field, value)?;

        let path = self.path_for(id)?;
        let content = document.render(id)?;
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| StorageError::Write {
                resource_id: id.clone(),
                field: field.to_string(),
                message: e.to_string(),
            })?;
        debug!(resource_id = %id, field, "Wrote frontmatter field");
        Ok(())
    }
}

/// Recursively collect `*.md` files, skipping hidden directories.
fn collect_markdown(dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
    for entry in std::fs::read_dir(dir)? {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("Error reading directory entry: {}", e);
                continue;
            }
        };
        let path = entry.path();
        let hidden = entry.file_name().to_str().is_some_and(|n| n.starts_with('.'));
        if hidden {
            continue;
        }
        if path.is_dir() {
            if let Err(e) = collect_markdown(&path, out) {
                warn!("Error scanning directory {:?}: {}", path, e);
            }
        } else if path.extension().and_then(|e| e.to_str()) == Some("md") {
            out.push(path);
        }
    }
    Ok(())
}

/// A markdown file split into frontmatter and body.
#[derive(Debug, Clone, PartialEq)]
struct Document {
    frontmatter: Mapping,
    body: String,
}

impl Document {
    fn parse(id: &ResourceId, content: &str) -> StorageResult<Self> {
        let Some((yaml, body)) = split_frontmatter(content) else {
            return Ok(Self {
                frontmatter: Mapping::new(),
                body: content.to_string(),
            });
        };
        if yaml.trim().is_empty() {
            return Ok(Self {
                frontmatter: Mapping::new(),
                body: body.to_string(),
            });
        }

        let frontmatter = match serde_yaml::from_str::<YamlValue>(yaml) {
            Ok(YamlValue::Mapping(mapping)) => mapping,
            Ok(YamlValue::Null) => Mapping::new(),
            Ok(_) => {
                return Err(StorageError::Malformed {
                    resource_id: id.clone(),
                    message: "frontmatter is not a mapping".into(),
                })
            }
            Err(e) => {
                return Err(StorageError::Malformed {
                    resource_id: id.clone(),
                    message: format!("invalid frontmatter: {}", e),
                })
            }
        };

        Ok(Self {
            frontmatter,
            body: body.to_string(),
        })
    }

    fn fields(&self, id: &ResourceId) -> StorageResult<Snapshot> {
        let mut snapshot = Snapshot::new();
        for (key, value) in &self.frontmatter {
            let Some(key) = key.as_str() else {
                continue;
            };
            let value = serde_json::to_value(value).map_err(|e| StorageError::Malformed {
                resource_id: id.clone(),
                message: format!("field '{}': {}", key, e),
            })?;
            snapshot.set(key, value);
        }
        Ok(snapshot)
    }

    fn set(&mut self, id: &ResourceId, field: &str, value: FieldValue) -> StorageResult<()> {
        let key = YamlValue::String(field.to_string());
        if value.is_null() {
            self.frontmatter.remove(&key);
            return Ok(());
        }
        let value = serde_yaml::to_value(&value).map_err(|e| StorageError::Write {
            resource_id: id.clone(),
            field: field.to_string(),
            message: e.to_string(),
        })?;
        self.frontmatter.insert(key, value);
        Ok(())
    }

    fn render(&self, id: &ResourceId) -> StorageResult<String> {
        if self.frontmatter.is_empty() {
            return Ok(self.body.clone());
        }
        let yaml = serde_yaml::to_string(&self.frontmatter).map_err(|e| StorageError::Malformed {
            resource_id: id.clone(),
            message: e.to_string(),
        })?;
        Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n{}", self.body))
    }
}

/// Split `content` into frontmatter YAML and body.
fn split_frontmatter(content: &str) -> Option<(&str, &str)> {
    let rest = content
        .strip_prefix("---\n")
        .or_else(|| content.strip_prefix("---\r\n"))?;

    let (yaml, after) = if let Some(after) = rest.strip_prefix(DELIMITER) {
        ("", after)
    } else {
        let end = rest.find("\n---")?;
        (&rest[..end + 1], &rest[end + 4..])
    };

    let body = after
        .strip_prefix("\r\n")
        .or_else(|| after.strip_prefix('\n'))
        .unwrap_or(after);
    Some((yaml, body))
}
