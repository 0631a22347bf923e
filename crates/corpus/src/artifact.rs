//! The static reference-index artifact.
//!
//! The artifact is a flat JSON array of chunk records. It is written by
//! [`build_artifact`] from a live corpus root and read by [`load_artifact`]
//! when the live root is not deployed.

use lectern_core::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::chunker::{chunk_text, ChunkingOptions};
use crate::collect::{collect_files, CollectOptions};
use crate::index::relative_source;
use crate::text::{extract_keywords, extract_scripture_refs, is_metadata_chunk, word_count};
use crate::types::{CorpusStats, ReferenceChunk, SourceType};

/// Chunk ceiling for the artifact.
pub const ARTIFACT_MAX_CHUNKS: usize = 8_000;

/// Floor for the per-author cap.
const MIN_PER_AUTHOR: usize = 200;

/// Lenient view of one artifact record; anything may be missing.
#[derive(Debug, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct ArtifactRecord {
    id: Option<String>,
    source: Option<String>,
    source_type: Option<String>,
    title: Option<String>,
    content: Option<String>,
    keywords: Option<Vec<String>>,
    scripture_refs: Option<Vec<String>>,
    priority: Option<f64>,
    word_count: Option<f64>,
}

impl ArtifactRecord {
    fn into_chunk(self) -> Option<ReferenceChunk> {
        let id = self.id.filter(|id| !id.is_empty())?;
        let content = self.content?;
        let source_type = SourceType::parse(self.source_type.as_deref()?)?;
        if is_metadata_chunk(&content) {
            return None;
        }

        Some(ReferenceChunk {
            id,
            source: self.source.unwrap_or_default(),
            source_type,
            title: self.title.unwrap_or_default(),
            keywords: self.keywords.unwrap_or_else(|| extract_keywords(&content)),
            scripture_refs: self
                .scripture_refs
                .unwrap_or_else(|| extract_scripture_refs(&content)),
            priority: self.priority.map(|p| p.max(0.0) as u32).unwrap_or(2),
            word_count: self
                .word_count
                .map(|w| w.max(0.0) as usize)
                .unwrap_or_else(|| word_count(&content)),
            content,
        })
    }
}

/// Read chunks from an artifact file, keeping at most `max_chunks`.
///
/// Invalid records are skipped. A missing file yields `CorpusUnavailable`;
/// callers treat that as an empty corpus.
pub fn load_artifact(path: &Path, max_chunks: usize) -> AppResult<Vec<ReferenceChunk>> {
    if !path.exists() {
        return Err(AppError::CorpusUnavailable(format!(
            "index artifact not found at {:?}",
            path
        )));
    }

    let raw = std::fs::read_to_string(path)?;
    let records: Vec<serde_json::Value> = serde_json::from_str(&raw)?;
    let total = records.len();

    let chunks: Vec<ReferenceChunk> = records
        .into_iter()
        .filter_map(|value| serde_json::from_value::<ArtifactRecord>(value).ok())
        .filter_map(ArtifactRecord::into_chunk)
        .take(max_chunks)
        .collect();

    tracing::info!(
        "Loaded {} chunks from index artifact {:?} ({} records)",
        chunks.len(),
        path,
        total
    );

    Ok(chunks)
}

/// Summary of an artifact build.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactBuildStats {
    pub files_indexed: usize,

    /// Per author key: (kept, produced)
    pub chunks_by_author: BTreeMap<String, (usize, usize)>,

    pub corpus: CorpusStats,

    pub bytes_written: usize,
}

/// Author key: the first two segments of the path below the root.
fn author_key(relative: &str) -> String {
    let parts: Vec<&str> = relative.split('/').collect();
    if parts.len() >= 2 {
        format!("{}/{}", parts[0], parts[1])
    } else {
        relative.to_string()
    }
}

/// Build the deployable artifact from `root` and write compact JSON to `out`.
///
/// Chunk ids and sources are relative to `base`. Metadata chunks are dropped
/// and each author contributes at most `max(200, 8000 / authors)` chunks.
pub fn build_artifact(root: &Path, base: &Path, out: &Path) -> AppResult<ArtifactBuildStats> {
    if !root.exists() {
        return Err(AppError::CorpusUnavailable(format!(
            "Reference library not found at {:?}",
            root
        )));
    }

    tracing::info!("Indexing reference library at {:?}", root);

    let files = collect_files(root, &CollectOptions::artifact());
    tracing::info!("Found {} files to index", files.len());

    let options = ChunkingOptions::artifact();
    let mut author_order: Vec<String> = Vec::new();
    let mut by_author: HashMap<String, Vec<ReferenceChunk>> = HashMap::new();
    let mut files_indexed = 0;

    for file in &files {
        let text = match std::fs::read_to_string(file) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("Skipping unreadable file {:?}: {}", file, e);
                continue;
            }
        };
        files_indexed += 1;

        let source = relative_source(file, base);
        let stem = file
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let source_type = crate::text::detect_source_type(file);
        let key = author_key(&relative_source(file, root));

        for chunk in chunk_text(&text, &source, &stem, source_type, &options) {
            if is_metadata_chunk(&chunk.content) {
                continue;
            }
            if !by_author.contains_key(&key) {
                author_order.push(key.clone());
            }
            by_author.entry(key.clone()).or_default().push(chunk);
        }
    }

    let per_author = MIN_PER_AUTHOR.max(ARTIFACT_MAX_CHUNKS / author_order.len().max(1));

    let mut chunks_by_author = BTreeMap::new();
    let mut all_chunks: Vec<ReferenceChunk> = Vec::new();
    for key in author_order {
        let chunks = by_author.remove(&key).unwrap_or_default();
        let produced = chunks.len();
        let kept: Vec<ReferenceChunk> = chunks.into_iter().take(per_author).collect();
        tracing::debug!("{}: {} chunks (of {} total)", key, kept.len(), produced);
        chunks_by_author.insert(key, (kept.len(), produced));
        all_chunks.extend(kept);
    }

    let json = serde_json::to_string(&all_chunks)?;
    if let Some(parent) = out.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(out, &json)?;

    let corpus = CorpusStats::from_chunks(&all_chunks);
    tracing::info!(
        "Indexed {} chunks ({} words) into {:?}",
        corpus.total_chunks,
        corpus.total_words,
        out
    );

    Ok(ArtifactBuildStats {
        files_indexed,
        chunks_by_author,
        corpus,
        bytes_written: json.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn prose(words: usize) -> String {
        (0..words)
            .map(|i| format!("grace{}", i % 7))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_load_artifact_repairs_and_filters() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reference-index.json");
        let records = serde_json::json!([
            {"id": "ref:a:0", "source": "a", "sourceType": "commentary", "title": "A",
             "content": "The steadfast love of the Lord never ceases, as Lam 3:22 says."},
            {"id": "", "sourceType": "bible", "content": "no id"},
            {"id": "ref:b:0", "sourceType": "sermon", "content": "unknown type"},
            {"id": "ref:c:0", "sourceType": "theology", "content": "| Version | Date |"},
            {"id": "ref:d:0", "sourceType": "lexicon", "content": 42},
            "not an object"
        ]);
        fs::write(&path, records.to_string()).unwrap();

        let chunks = load_artifact(&path, 100).unwrap();
        assert_eq!(chunks.len(), 1);
        let chunk = &chunks[0];
        assert_eq!(chunk.priority, 2);
        assert_eq!(chunk.word_count, 12);
        assert!(chunk.keywords.contains(&"steadfast".to_string()));
        assert_eq!(chunk.scripture_refs, vec!["Lam 3:22"]);
    }

    #[test]
    fn test_load_artifact_missing_file() {
        let result = load_artifact(Path::new("/nope/reference-index.json"), 10);
        assert!(matches!(result, Err(AppError::CorpusUnavailable(_))));
    }

    #[test]
    fn test_build_artifact_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("content/reference");
        fs::create_dir_all(root.join("commentaries/henry")).unwrap();
        fs::create_dir_all(root.join("bibles")).unwrap();
        fs::write(root.join("commentaries/henry/psalms.md"), prose(120)).unwrap();
        fs::write(root.join("commentaries/README.md"), prose(120)).unwrap();
        fs::write(root.join("bibles/kjv.md"), prose(120)).unwrap();

        let out = dir.path().join("public/reference-index.json");
        let stats = build_artifact(&root, dir.path(), &out).unwrap();

        assert_eq!(stats.files_indexed, 1);
        assert_eq!(stats.chunks_by_author.get("commentaries/henry"), Some(&(1, 1)));
        assert_eq!(stats.corpus.total_chunks, 1);

        let loaded = load_artifact(&out, 100).unwrap();
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].id, "ref:content/reference/commentaries/henry/psalms.md:0");
        assert_eq!(loaded[0].source_type, SourceType::Commentary);
        assert_eq!(loaded[0].priority, 5);
    }

    #[test]
    fn test_author_key() {
        assert_eq!(author_key("commentaries/henry/psalms.md"), "commentaries/henry");
        assert_eq!(author_key("essay.md"), "essay.md");
    }
}
