//! In-memory corpus index and its process-wide cache.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use crate::artifact::load_artifact;
use crate::chunker::{chunk_text, ChunkingOptions};
use crate::collect::{collect_files, CollectOptions};
use crate::retrieval;
use crate::text::detect_source_type;
use crate::types::{CorpusStats, ReferenceChunk, RetrievalRequest, RetrievalResult};

/// Chunk ceiling for the runtime corpus.
pub const MAX_CHUNKS: usize = 50_000;

/// Where an index is built from.
#[derive(Debug, Clone)]
pub struct CorpusPaths {
    /// Live reference library
    pub reference_root: PathBuf,

    /// Pre-built artifact used when the live root is absent or empty
    pub index_artifact: Option<PathBuf>,

    /// Chunk sources are reported relative to this directory
    pub base: PathBuf,
}

impl CorpusPaths {
    pub fn new(reference_root: impl Into<PathBuf>) -> Self {
        let reference_root = reference_root.into();
        Self {
            base: reference_root.clone(),
            reference_root,
            index_artifact: None,
        }
    }

    pub fn with_artifact(mut self, artifact: impl Into<PathBuf>) -> Self {
        self.index_artifact = Some(artifact.into());
        self
    }

    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = base.into();
        self
    }
}

/// `path` relative to `base` with forward slashes; the full path when it is
/// not under `base`.
pub fn relative_source(path: &Path, base: &Path) -> String {
    let relative = path.strip_prefix(base).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join("/")
}

/// Whether the live root exists and has at least one entry.
fn live_root_available(root: &Path) -> bool {
    std::fs::read_dir(root)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Immutable collection of chunks with their lower-cased text.
#[derive(Debug, Default)]
pub struct CorpusIndex {
    chunks: Vec<ReferenceChunk>,
    normalized: Vec<String>,
}

impl CorpusIndex {
    /// Index an explicit chunk list.
    pub fn from_chunks(chunks: Vec<ReferenceChunk>) -> Self {
        let normalized = chunks.iter().map(|c| c.content.to_lowercase()).collect();
        Self { chunks, normalized }
    }

    /// Build from the live root, falling back to the artifact only when the
    /// root is missing or empty. Never fails: unreadable input is skipped.
    pub fn build(paths: &CorpusPaths) -> Self {
        let start = Instant::now();
        let mut chunks: Vec<ReferenceChunk> = Vec::new();

        let live = live_root_available(&paths.reference_root);
        if live {
            let options = ChunkingOptions::runtime();
            for file in collect_files(&paths.reference_root, &CollectOptions::runtime()) {
                if chunks.len() >= MAX_CHUNKS {
                    break;
                }
                let text = match read_source_text(&file) {
                    Some(text) => text,
                    None => continue,
                };
                let source = relative_source(&file, &paths.base);
                let stem = file
                    .file_stem()
                    .map(|s| s.to_string_lossy().to_string())
                    .unwrap_or_default();
                let remaining = MAX_CHUNKS - chunks.len();
                chunks.extend(
                    chunk_text(&text, &source, &stem, detect_source_type(&file), &options)
                        .into_iter()
                        .take(remaining),
                );
            }
        } else if let Some(ref artifact) = paths.index_artifact {
            match load_artifact(artifact, MAX_CHUNKS) {
                Ok(loaded) => chunks = loaded,
                Err(e) => tracing::warn!("Reference index artifact unavailable: {}", e),
            }
        } else {
            tracing::warn!(
                "Reference library not found at {:?} and no artifact configured",
                paths.reference_root
            );
        }

        tracing::info!(
            "Corpus built: {} chunks from {} in {:.2}s",
            chunks.len(),
            if live { "live library" } else { "artifact" },
            start.elapsed().as_secs_f64()
        );

        Self::from_chunks(chunks)
    }

    pub fn chunks(&self) -> &[ReferenceChunk] {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunks paired with their lower-cased content.
    pub(crate) fn entries(&self) -> impl Iterator<Item = (&ReferenceChunk, &str)> {
        self.chunks
            .iter()
            .zip(self.normalized.iter().map(String::as_str))
    }

    pub fn stats(&self) -> CorpusStats {
        CorpusStats::from_chunks(&self.chunks)
    }

    pub fn retrieve(&self, request: &RetrievalRequest) -> RetrievalResult {
        retrieval::retrieve(self, request)
    }
}

/// Read a file as text; JSON strings are unwrapped and other JSON values are
/// pretty-printed. Malformed JSON keeps the raw text.
fn read_source_text(path: &Path) -> Option<String> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!("Skipping unreadable file {:?}: {}", path, e);
            return None;
        }
    };

    let is_json = path
        .extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false);
    if !is_json {
        return Some(text);
    }

    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(serde_json::Value::String(s)) => Some(s),
        Ok(value) => Some(serde_json::to_string_pretty(&value).unwrap_or(text)),
        Err(_) => Some(text),
    }
}

/// Lazily built, shared corpus index.
///
/// The first call to [`CorpusCache::get`] builds the index; later calls hand
/// out the same `Arc`. [`CorpusCache::clear`] drops it so the next access
/// rebuilds.
#[derive(Debug)]
pub struct CorpusCache {
    paths: CorpusPaths,
    index: Mutex<Option<Arc<CorpusIndex>>>,
}

impl CorpusCache {
    pub fn new(paths: CorpusPaths) -> Self {
        Self {
            paths,
            index: Mutex::new(None),
        }
    }

    /// Cache pre-populated with an index, for callers that already have chunks.
    pub fn with_index(paths: CorpusPaths, index: CorpusIndex) -> Self {
        Self {
            paths,
            index: Mutex::new(Some(Arc::new(index))),
        }
    }

    pub fn get(&self) -> Arc<CorpusIndex> {
        let mut guard = self.index.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(ref index) = *guard {
            return Arc::clone(index);
        }
        let index = Arc::new(CorpusIndex::build(&self.paths));
        *guard = Some(Arc::clone(&index));
        index
    }

    pub fn clear(&self) {
        let mut guard = self.index.lock().unwrap_or_else(|e| e.into_inner());
        *guard = None;
    }

    pub fn paths(&self) -> &CorpusPaths {
        &self.paths
    }
}
