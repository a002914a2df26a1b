// SPDX-License-Identifier: MIT

//! Uploaded documents with lexical chunk search

use crate::adk::error::HubError;
use chrono::Utc;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Extensions whose bytes are decoded as searchable text
const TEXT_EXTENSIONS: [&str; 2] = ["txt", "md"];

#[derive(Debug, Clone)]
pub struct DocumentRecord {
    pub id: String,
    pub filename: String,
    pub path: PathBuf,
    pub metadata: Map<String, Value>,
    pub chunks: Vec<String>,
    pub uploaded_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentSummary {
    pub id: String,
    pub filename: String,
    pub chunks: usize,
}

/// Stored document as reported by the API
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentInfo {
    pub id: String,
    pub filename: String,
    pub chunks: usize,
    pub metadata: Map<String, Value>,
    pub uploaded_at: String,
}

impl DocumentRecord {
    pub fn info(&self) -> DocumentInfo {
        DocumentInfo {
            id: self.id.clone(),
            filename: self.filename.clone(),
            chunks: self.chunks.len(),
            metadata: self.metadata.clone(),
            uploaded_at: self.uploaded_at.clone(),
        }
    }

    /// Every `criteria` key is present in the user metadata with an equal value
    fn matches(&self, criteria: &Map<String, Value>) -> bool {
        criteria
            .iter()
            .all(|(key, want)| self.metadata.get(key) == Some(want))
    }
}

/// Which documents a search may draw from
#[derive(Debug, Clone, Default)]
pub struct SearchScope {
    /// Only these document ids, when set
    pub document_ids: Option<Vec<String>>,
    /// Exact-match metadata criteria
    pub metadata: Map<String, Value>,
}

impl SearchScope {
    pub fn documents(ids: Vec<String>) -> Self {
        Self {
            document_ids: Some(ids),
            ..Self::default()
        }
    }

    fn admits(&self, record: &DocumentRecord) -> bool {
        self.document_ids
            .as_ref()
            .map_or(true, |ids| ids.iter().any(|id| id == &record.id))
            && record.matches(&self.metadata)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DocumentHit {
    pub content: String,
    pub metadata: Value,
}

#[derive(Clone)]
pub struct DocumentStore {
    upload_dir: PathBuf,
    chunk_size: usize,
    chunk_overlap: usize,
    docs: Arc<RwLock<HashMap<String, DocumentRecord>>>,
}

impl DocumentStore {
    pub fn new(upload_dir: impl Into<PathBuf>, chunk_size: usize, chunk_overlap: usize) -> Self {
        let chunk_size = chunk_size.max(1);
        Self {
            upload_dir: upload_dir.into(),
            chunk_size,
            chunk_overlap: chunk_overlap.min(chunk_size - 1),
            docs: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Persist an upload and index its text.
    ///
    /// Binary formats are kept on disk but produce no chunks.
    pub async fn ingest(
        &self,
        filename: &str,
        bytes: &[u8],
        metadata: Map<String, Value>,
    ) -> Result<DocumentSummary, HubError> {
        let id = Uuid::new_v4().to_string();
        let display_name = sanitize_filename(filename);
        let path = self.upload_dir.join(format!("{}_{}", id, display_name));

        tokio::fs::create_dir_all(&self.upload_dir)
            .await
            .map_err(|e| HubError::FileProcessing(format!("cannot create upload dir: {}", e)))?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|e| HubError::FileProcessing(format!("cannot store {}: {}", filename, e)))?;

        let ext = extension(filename);
        let chunks = if TEXT_EXTENSIONS.contains(&ext.as_str()) {
            let text = String::from_utf8_lossy(bytes);
            split_text(&text, self.chunk_size, self.chunk_overlap)
        } else {
            log::info!("No text extraction for .{} upload {}", ext, filename);
            Vec::new()
        };

        let record = DocumentRecord {
            id: id.clone(),
            filename: display_name.clone(),
            path,
            metadata,
            chunks,
            uploaded_at: Utc::now().to_rfc3339(),
        };
        let summary = DocumentSummary {
            id: id.clone(),
            filename: display_name,
            chunks: record.chunks.len(),
        };
        log::info!(
            "Ingested document {} ({}, {} chunks)",
            id,
            summary.filename,
            summary.chunks
        );
        self.docs.write().await.insert(id, record);
        Ok(summary)
    }

    pub async fn get(&self, id: &str) -> Option<DocumentRecord> {
        self.docs.read().await.get(id).cloned()
    }

    /// Drop a document from the index and remove its stored file.
    ///
    /// Returns `false` when no document has this id.
    pub async fn delete(&self, id: &str) -> Result<bool, HubError> {
        let Some(record) = self.docs.write().await.remove(id) else {
            return Ok(false);
        };
        match tokio::fs::remove_file(&record.path).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                log::warn!("Stored file for document {} was already gone", id);
            }
            Err(e) => return Err(e.into()),
        }
        log::info!("Deleted document {} ({})", id, record.filename);
        Ok(true)
    }

    /// Top `k` chunks by distinct query terms matched.
    ///
    /// Only documents admitted by `scope` are searched. Chunks that match no
    /// term are never returned.
    pub async fn search(&self, query: &str, k: usize, scope: &SearchScope) -> Vec<DocumentHit> {
        let terms = query_terms(query);
        if terms.is_empty() || k == 0 {
            return Vec::new();
        }

        let docs = self.docs.read().await;
        let mut records: Vec<&DocumentRecord> = docs
            .values()
            .filter(|d| scope.admits(d))
            .collect();
        records.sort_by(|a, b| a.uploaded_at.cmp(&b.uploaded_at).then(a.id.cmp(&b.id)));

        let mut scored: Vec<(usize, usize, &DocumentRecord, usize)> = Vec::new();
        let mut order = 0;
        for record in records {
            for (index, chunk) in record.chunks.iter().enumerate() {
                let lowered = chunk.to_lowercase();
                let score = terms.iter().filter(|t| lowered.contains(t.as_str())).count();
                if score > 0 {
                    scored.push((score, order, record, index));
                }
                order += 1;
            }
        }
        scored.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

        scored
            .into_iter()
            .take(k)
            .map(|(_, _, record, index)| {
                let mut metadata = record.metadata.clone();
                metadata.insert("document_id".into(), json!(record.id));
                metadata.insert("filename".into(), json!(record.filename));
                metadata.insert("chunk".into(), json!(index));
                DocumentHit {
                    content: record.chunks[index].clone(),
                    metadata: Value::Object(metadata),
                }
            })
            .collect()
    }
}

/// Distinct lowercase words of at least two characters
fn query_terms(query: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() >= 2)
        .map(str::to_lowercase)
        .filter(|w| seen.insert(w.clone()))
        .collect()
}

fn extension(filename: &str) -> String {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

/// Keep only the final path component with a conservative character set
fn sanitize_filename(filename: &str) -> String {
    let base = filename.rsplit(['/', '\\']).next().unwrap_or(filename);
    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    if cleaned.trim_matches('.').is_empty() {
        "upload".to_string()
    } else {
        cleaned
    }
}

/// Split text into windows of `size` characters overlapping by `overlap`
pub fn split_text(text: &str, size: usize, overlap: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    if chars.iter().all(|c| c.is_whitespace()) {
        return Vec::new();
    }
    let size = size.max(1);
    let step = size - overlap.min(size - 1);

    let mut chunks = Vec::new();
    let mut start = 0;
    loop {
        let end = (start + size).min(chars.len());
        let chunk: String = chars[start..end].iter().collect();
        if !chunk.trim().is_empty() {
            chunks.push(chunk);
        }
        if end == chars.len() {
            break;
        }
        start += step;
    }
    chunks
}
