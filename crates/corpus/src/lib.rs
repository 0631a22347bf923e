//! Reference corpus: chunking, indexing and keyword retrieval.
//!
//! The corpus is built once from a live directory of reference documents
//! (or, when that directory is missing, from a pre-built JSON artifact) and
//! then served read-only to any number of concurrent readers.

pub mod artifact;
pub mod chunker;
pub mod collect;
pub mod index;
pub mod retrieval;
pub mod text;
pub mod types;


// Re-export commonly used types
pub use artifact::{build_artifact, load_artifact, ArtifactBuildStats};
pub use index::{CorpusCache, CorpusIndex, CorpusPaths};
pub use retrieval::retrieve;
pub use types::{
    CorpusStats, CoverageReport, ReferenceChunk, RetrievalRequest, RetrievalResult, SourceType,
};
