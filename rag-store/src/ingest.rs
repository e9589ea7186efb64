//! Knowledge ingestion: read a source, split it, stamp provenance.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::chunker::ChunkingConfig;
use crate::config::KnowledgeSource;
use crate::errors::RagError;
use crate::record::KnowledgeChunk;

/// Splits `source_text` into ordered chunks tagged with `source_path`.
///
/// Indices are 1-based and contiguous; every chunk carries the final count.
/// Empty input yields an empty sequence.
pub fn ingest(
    source_text: &str,
    source_path: &str,
    cfg: &ChunkingConfig,
) -> Result<Vec<KnowledgeChunk>, RagError> {
    let pieces = cfg.split_text(source_text)?;
    let total = pieces.len();
    debug!(source = source_path, chunks = total, "ingest: split text");

    Ok(pieces
        .into_iter()
        .enumerate()
        .map(|(i, content)| KnowledgeChunk {
            content,
            source_path: source_path.to_string(),
            chunk_index: i + 1,
            total_chunks: total,
        })
        .collect())
}

/// Reads one file and ingests it.
pub async fn ingest_file(
    path: impl AsRef<Path>,
    cfg: &ChunkingConfig,
) -> Result<Vec<KnowledgeChunk>, RagError> {
    let path = path.as_ref();
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RagError::io(path, e))?;
    ingest(&text, &path.to_string_lossy(), cfg)
}

/// Walks `dir` recursively and ingests every file whose extension is in
/// `extensions`. Files are visited in path order so results are stable.
pub async fn ingest_dir(
    dir: impl AsRef<Path>,
    extensions: &[&str],
    cfg: &ChunkingConfig,
) -> Result<Vec<KnowledgeChunk>, RagError> {
    let files = collect_files(dir.as_ref(), extensions).await?;
    let mut out = Vec::new();
    for file in &files {
        let chunks = ingest_file(file, cfg).await?;
        if chunks.is_empty() {
            warn!(path = %file.display(), "ingest_dir: file produced no chunks");
        }
        out.extend(chunks);
    }
    info!(
        dir = %dir.as_ref().display(),
        files = files.len(),
        chunks = out.len(),
        "ingest_dir: done"
    );
    Ok(out)
}

/// Ingests a knowledge source, which may be a single file or a directory.
pub async fn ingest_source(source: &KnowledgeSource) -> Result<Vec<KnowledgeChunk>, RagError> {
    let meta = tokio::fs::metadata(&source.path)
        .await
        .map_err(|e| RagError::io(&source.path, e))?;
    if meta.is_dir() {
        ingest_dir(&source.path, source.kind.extensions(), &source.chunking).await
    } else {
        ingest_file(&source.path, &source.chunking).await
    }
}

async fn collect_files(root: &Path, extensions: &[&str]) -> Result<Vec<PathBuf>, RagError> {
    let mut stack = vec![root.to_path_buf()];
    let mut files = Vec::new();

    while let Some(dir) = stack.pop() {
        let mut entries = tokio::fs::read_dir(&dir)
            .await
            .map_err(|e| RagError::io(&dir, e))?;
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| RagError::io(&dir, e))?
        {
            let path = entry.path();
            let ft = entry
                .file_type()
                .await
                .map_err(|e| RagError::io(&path, e))?;
            if ft.is_dir() {
                stack.push(path);
            } else if has_extension(&path, extensions) {
                files.push(path);
            }
        }
    }

    files.sort();
    Ok(files)
}

fn has_extension(path: &Path, extensions: &[&str]) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| extensions.iter().any(|want| want.eq_ignore_ascii_case(ext)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KnowledgeKind;

    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("rag-store-{name}-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn indices_are_contiguous_and_share_total() {
        let text = "word ".repeat(400);
        let chunks = ingest(&text, "knowledge.txt", &ChunkingConfig::knowledge()).unwrap();
        assert!(chunks.len() > 1);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i + 1);
            assert_eq!(c.total_chunks, chunks.len());
            assert_eq!(c.source_path, "knowledge.txt");
        }
    }

    #[test]
    fn empty_text_yields_nothing() {
        assert!(ingest("", "empty.txt", &ChunkingConfig::knowledge()).unwrap().is_empty());
    }

    #[test]
    fn invalid_chunking_is_config_error() {
        let cfg = ChunkingConfig::new(50, 60);
        assert!(matches!(ingest("abc", "a", &cfg), Err(RagError::Config(_))));
    }

    #[tokio::test]
    async fn missing_file_is_io_error() {
        let err = ingest_file("/definitely/not/here.txt", &ChunkingConfig::knowledge())
            .await
            .unwrap_err();
        assert!(matches!(err, RagError::Io { .. }));
    }

    #[tokio::test]
    async fn directory_ingestion_filters_by_extension() {
        let dir = scratch_dir("dir");
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        std::fs::write(dir.join("app.js"), "const a = 1;\nconsole.log(a);").unwrap();
        std::fs::write(dir.join("nested/index.html"), "<p>hello</p>").unwrap();
        std::fs::write(dir.join("notes.bin"), "ignored").unwrap();

        let source = KnowledgeSource {
            path: dir.clone(),
            kind: KnowledgeKind::Code,
            chunking: ChunkingConfig::code(),
        };
        let chunks = ingest_source(&source).await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| !c.source_path.ends_with("notes.bin")));
        assert!(chunks[0].source_path.ends_with("app.js"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
