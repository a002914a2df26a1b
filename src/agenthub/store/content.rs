// SPDX-License-Identifier: MIT

//! Flat-file store for generated artifacts
//!
//! Each artifact is `<safe_id>.json` holding `{content, metadata}`. Lookup
//! is deliberately loose so that a user can refer to an earlier artifact
//! by an approximate name. Read failures are treated as "not found".

use crate::adk::error::HubError;
use crate::agenthub::workflow::types::{GenerationType, TargetFormat};
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};
use std::path::{Path, PathBuf};

/// Raw-file extensions tried after the JSON forms; `""` is the bare name
const RAW_EXTENSIONS: [&str; 10] = [
    ".py", ".ts", ".js", ".cpp", ".java", ".md", ".txt", ".html", ".css", "",
];

const FUZZY_THRESHOLD: f64 = 0.5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub generator_type: Option<GenerationType>,
    #[serde(
        default,
        deserialize_with = "lenient",
        skip_serializing_if = "Option::is_none"
    )]
    pub format: Option<TargetFormat>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
    /// Time of the last write
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub query_history: Vec<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ArtifactMetadata {
    pub fn new(generator_type: GenerationType, format: Option<TargetFormat>) -> Self {
        Self {
            generator_type: Some(generator_type),
            format,
            ..Self::default()
        }
    }

    /// Metadata implied by a raw file's extension
    fn for_extension(ext: &str) -> Self {
        let format = TargetFormat::from_name(ext);
        let mut meta = Self {
            generator_type: format.map(|f| f.generation_type()),
            format,
            ..Self::default()
        };
        meta.extra.insert("source".into(), json!("raw_file"));
        meta
    }

    /// Fill a missing format from legacy `code_language`/`document_format` keys
    fn with_legacy_format(mut self) -> Self {
        if self.format.is_none() {
            self.format = ["code_language", "document_format"]
                .iter()
                .filter_map(|k| self.extra.get(*k).and_then(Value::as_str))
                .find_map(TargetFormat::from_name);
        }
        if self.generator_type.is_none() {
            self.generator_type = self.format.map(|f| f.generation_type());
        }
        self
    }
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| serde_json::from_value(v).ok()))
}

fn lenient_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredContent {
    pub content: String,
    pub metadata: ArtifactMetadata,
}

#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Replace every non-alphanumeric character with `_`
    pub fn safe_id(id: &str) -> String {
        id.chars()
            .map(|c| if c.is_alphanumeric() { c } else { '_' })
            .collect()
    }

    pub fn path_for(&self, file_id: &str) -> PathBuf {
        self.root.join(format!("{}.json", Self::safe_id(file_id)))
    }

    /// Write an artifact.
    ///
    /// On update, `created_at`, `query_history` and unknown metadata keys
    /// of the existing record are carried over. `timestamp` is always set
    /// to now and `query` is appended to the history when it is new.
    pub async fn save(
        &self,
        file_id: &str,
        content: &str,
        mut metadata: ArtifactMetadata,
        query: Option<&str>,
        is_update: bool,
    ) -> Result<PathBuf, HubError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let path = self.path_for(file_id);
        let now = Utc::now().to_rfc3339();

        let existing = if is_update {
            Self::read_artifact(&path).await
        } else {
            None
        };

        match existing {
            Some(previous) => {
                let previous = previous.metadata;
                metadata.created_at = previous
                    .created_at
                    .or(previous.timestamp)
                    .or_else(|| Some(now.clone()));
                metadata.query_history = previous.query_history;
                metadata.generator_type = metadata.generator_type.or(previous.generator_type);
                metadata.format = metadata.format.or(previous.format);
                for (key, value) in previous.extra {
                    metadata.extra.entry(key).or_insert(value);
                }
            }
            None => {
                metadata.created_at = Some(now.clone());
                metadata.query_history.clear();
            }
        }

        if let Some(q) = query.map(str::trim).filter(|q| !q.is_empty()) {
            if !metadata.query_history.iter().any(|h| h == q) {
                metadata.query_history.push(q.to_string());
            }
        }
        metadata.timestamp = Some(now);

        let record = StoredContent {
            content: content.to_string(),
            metadata,
        };
        tokio::fs::write(&path, serde_json::to_string_pretty(&record)?).await?;
        log::info!("Saved artifact '{}' to {}", file_id, path.display());
        Ok(path)
    }

    /// Resolve an identifier with progressively looser matching
    pub async fn retrieve(&self, file_id: &str) -> Option<StoredContent> {
        self.resolve(file_id).await.map(|(_, found)| found)
    }

    /// Like [`retrieve`](Self::retrieve), also returning the identifier the
    /// lookup settled on, so later saves hit the same file.
    pub async fn resolve(&self, file_id: &str) -> Option<(String, StoredContent)> {
        let file_id = file_id.trim();
        if file_id.is_empty() {
            return None;
        }

        if is_plain_name(file_id) {
            if let Some(found) = Self::read_artifact(&self.root.join(format!("{file_id}.json"))).await
            {
                return Some((file_id.to_string(), found));
            }
        }

        if let Some(found) = Self::read_artifact(&self.path_for(file_id)).await {
            return Some((Self::safe_id(file_id), found));
        }

        if is_plain_name(file_id) {
            for ext in RAW_EXTENSIONS {
                let path = self.root.join(format!("{file_id}{ext}"));
                if let Some(found) = Self::read_raw(&path).await {
                    log::debug!("Resolved '{}' to raw file {}", file_id, path.display());
                    return Some((file_id.to_string(), found));
                }
            }
        }

        let names = self.file_names().await;
        let needle = file_id.to_lowercase();

        if let Some(name) = names.iter().find(|n| n.to_lowercase().contains(&needle)) {
            if let Some(found) = self.read_any(name).await {
                log::debug!("Resolved '{}' by substring to {}", file_id, name);
                return Some((file_stem(name).to_string(), found));
            }
        }

        let mut best: Option<(&String, f64)> = None;
        for name in &names {
            let score = similarity(file_stem(name), file_id);
            if best.map_or(true, |(_, s)| score > s) {
                best = Some((name, score));
            }
        }
        match best {
            Some((name, score)) if score > FUZZY_THRESHOLD => {
                log::debug!(
                    "Resolved '{}' by similarity {:.2} to {}",
                    file_id,
                    score,
                    name
                );
                let found = self.read_any(name).await?;
                Some((file_stem(name).to_string(), found))
            }
            _ => None,
        }
    }

    /// Identifiers of stored JSON artifacts, sorted
    pub async fn identifiers(&self) -> Vec<String> {
        self.file_names()
            .await
            .into_iter()
            .filter_map(|n| n.strip_suffix(".json").map(str::to_string))
            .collect()
    }

    async fn file_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) => {
                log::debug!("Content store {} unreadable: {}", self.root.display(), e);
                return names;
            }
        };
        while let Ok(Some(entry)) = entries.next_entry().await {
            let is_file = entry.file_type().await.map(|t| t.is_file()).unwrap_or(false);
            if is_file {
                if let Some(name) = entry.file_name().to_str() {
                    names.push(name.to_string());
                }
            }
        }
        names.sort();
        names
    }

    async fn read_any(&self, name: &str) -> Option<StoredContent> {
        let path = self.root.join(name);
        if name.ends_with(".json") {
            if let Some(found) = Self::read_artifact(&path).await {
                return Some(found);
            }
        }
        Self::read_raw(&path).await
    }

    async fn read_artifact(path: &Path) -> Option<StoredContent> {
        let raw = tokio::fs::read_to_string(path).await.ok()?;
        let value: Value = match serde_json::from_str(&raw) {
            Ok(v) => v,
            Err(e) => {
                log::warn!("Ignoring malformed artifact {}: {}", path.display(), e);
                return None;
            }
        };
        let content = value.get("content")?.as_str()?.to_string();
        let metadata = value
            .get("metadata")
            .cloned()
            .and_then(|m| serde_json::from_value::<ArtifactMetadata>(m).ok())
            .unwrap_or_default()
            .with_legacy_format();
        Some(StoredContent { content, metadata })
    }

    async fn read_raw(path: &Path) -> Option<StoredContent> {
        let meta = tokio::fs::metadata(path).await.ok()?;
        if !meta.is_file() {
            return None;
        }
        let bytes = tokio::fs::read(path).await.ok()?;
        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
        Some(StoredContent {
            content: String::from_utf8_lossy(&bytes).into_owned(),
            metadata: ArtifactMetadata::for_extension(ext),
        })
    }
}

fn is_plain_name(id: &str) -> bool {
    !id.contains(['/', '\\']) && id != "." && id != ".."
}

fn file_stem(name: &str) -> &str {
    match name.rfind('.') {
        Some(idx) if idx > 0 => &name[..idx],
        _ => name,
    }
}

/// Share of positions holding the same character, case-insensitive
fn similarity(a: &str, b: &str) -> f64 {
    let a: Vec<char> = a.to_lowercase().chars().collect();
    let b: Vec<char> = b.to_lowercase().chars().collect();
    let longest = a.len().max(b.len());
    if longest == 0 {
        return 0.0;
    }
    let same = a.iter().zip(&b).filter(|(x, y)| x == y).count();
    same as f64 / longest as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn store() -> (TempDir, ContentStore) {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::new(dir.path());
        (dir, store)
    }

    #[test]
    fn test_safe_id() {
        assert_eq!(ContentStore::safe_id("my-file v2.py"), "my_file_v2_py");
    }

    #[test]
    fn test_similarity() {
        assert_eq!(similarity("abcd", "abcd"), 1.0);
        assert_eq!(similarity("abcd", "abxx"), 0.5);
        assert_eq!(similarity("", ""), 0.0);
        assert!(similarity("Sorting", "sortinq") > 0.8);
    }

    #[tokio::test]
    async fn test_save_and_exact_lookup() {
        let (_dir, store) = store();
        let meta = ArtifactMetadata::new(GenerationType::Code, Some(TargetFormat::Py));
        store
            .save("bubble-sort", "def sort(): pass", meta, Some("write sort"), false)
            .await
            .unwrap();

        let found = store.retrieve("bubble-sort").await.unwrap();
        assert_eq!(found.content, "def sort(): pass");
        assert_eq!(found.metadata.format, Some(TargetFormat::Py));
        assert_eq!(found.metadata.query_history, vec!["write sort"]);
        assert!(found.metadata.created_at.is_some());
        assert_eq!(store.identifiers().await, vec!["bubble_sort"]);
    }

    #[tokio::test]
    async fn test_update_preserves_created_at_and_extends_history() {
        let (_dir, store) = store();
        let meta = ArtifactMetadata::new(GenerationType::Document, Some(TargetFormat::Md));
        store
            .save("notes", "v1", meta.clone(), Some("first"), false)
            .await
            .unwrap();
        let created = store.retrieve("notes").await.unwrap().metadata.created_at;

        let mut extra_meta = ArtifactMetadata::default();
        extra_meta.extra.insert("owner".into(), json!("ana"));
        store
            .save("notes", "v1b", extra_meta, Some("second"), true)
            .await
            .unwrap();
        store
            .save("notes", "v2", ArtifactMetadata::default(), Some("second"), true)
            .await
            .unwrap();

        let found = store.retrieve("notes").await.unwrap();
        assert_eq!(found.content, "v2");
        assert_eq!(found.metadata.created_at, created);
        assert_eq!(found.metadata.query_history, vec!["first", "second"]);
        assert_eq!(found.metadata.format, Some(TargetFormat::Md));
        assert_eq!(found.metadata.extra["owner"], "ana");
    }

    #[tokio::test]
    async fn test_new_save_overwrites_history() {
        let (_dir, store) = store();
        store
            .save("a", "1", ArtifactMetadata::default(), Some("q1"), false)
            .await
            .unwrap();
        store
            .save("a", "2", ArtifactMetadata::default(), Some("q2"), false)
            .await
            .unwrap();
        let found = store.retrieve("a").await.unwrap();
        assert_eq!(found.metadata.query_history, vec!["q2"]);
    }

    #[tokio::test]
    async fn test_raw_file_lookup_infers_metadata() {
        let (dir, store) = store();
        std::fs::write(dir.path().join("helper.ts"), "export const x = 1;").unwrap();

        let found = store.retrieve("helper").await.unwrap();
        assert_eq!(found.content, "export const x = 1;");
        assert_eq!(found.metadata.generator_type, Some(GenerationType::Code));
        assert_eq!(found.metadata.format, Some(TargetFormat::Ts));
    }

    #[tokio::test]
    async fn test_substring_and_fuzzy_lookup() {
        let (_dir, store) = store();
        store
            .save(
                "quarterly_report",
                "# Q3",
                ArtifactMetadata::new(GenerationType::Document, Some(TargetFormat::Md)),
                None,
                false,
            )
            .await
            .unwrap();

        assert_eq!(store.retrieve("QUARTERLY").await.unwrap().content, "# Q3");
        assert_eq!(
            store.retrieve("quarterly_reprot").await.unwrap().content,
            "# Q3"
        );
        assert!(store.retrieve("unrelated").await.is_none());
    }

    #[tokio::test]
    async fn test_resolve_reports_matched_identifier() {
        let (dir, store) = store();
        store
            .save("quarterly_report", "# Q3", ArtifactMetadata::default(), None, false)
            .await
            .unwrap();
        std::fs::write(dir.path().join("helper.ts"), "export const x = 1;").unwrap();

        let (id, _) = store.resolve("quarterly").await.unwrap();
        assert_eq!(id, "quarterly_report");
        let (id, _) = store.resolve("quarterly_reprot").await.unwrap();
        assert_eq!(id, "quarterly_report");
        let (id, _) = store.resolve("quarterly-report").await.unwrap();
        assert_eq!(id, "quarterly_report");
        let (id, _) = store.resolve("helper").await.unwrap();
        assert_eq!(id, "helper");
    }

    #[tokio::test]
    async fn test_legacy_metadata_keys() {
        let (dir, store) = store();
        std::fs::write(
            dir.path().join("old.json"),
            r#"{"content": "x", "metadata": {"code_language": "python", "generator_type": "weird"}}"#,
        )
        .unwrap();
        let found = store.retrieve("old").await.unwrap();
        assert_eq!(found.metadata.format, Some(TargetFormat::Py));
        assert_eq!(found.metadata.generator_type, Some(GenerationType::Code));
    }

    #[tokio::test]
    async fn test_missing_store_is_not_found() {
        let store = ContentStore::new("/nonexistent/agenthub/store");
        assert!(store.retrieve("anything").await.is_none());
        assert!(store.identifiers().await.is_empty());
    }
}
