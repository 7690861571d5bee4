//! Change mode response processing
//!
//! Extracts edits from an assistant response, caches the edit set under an
//! opaque key, and renders one page at a time. Later pages are served from
//! the cache by re-paginating the stored edits, which yields the same pages
//! because pagination is deterministic.

use askbridge_core::{
    chunk_change_mode_edits, parse_change_mode_output, summarize_chunking,
    validate_change_mode_edits, ChangeModeEdit, ChunkError, EditChunk,
};
use std::collections::HashMap;
use std::fmt::Write as _;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Name of the tool that serves follow-up pages
pub const FETCH_CHUNK_TOOL: &str = "fetch-chunk";

/// Errors that can occur while serving change mode pages
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChangeModeError {
    /// The extracted edits are structurally invalid
    #[error("Edit validation failed:\n{}", format_errors(.0))]
    Validation(Vec<String>),

    /// No cached edit set under this key (never stored, expired or evicted)
    #[error("Cache key not found or expired: {0}. Re-run the original request to regenerate the edits.")]
    CacheMiss(String),

    /// Requested page does not exist
    #[error("Chunk {requested} out of range (1-{total})")]
    ChunkOutOfRange {
        /// Requested 1-based index
        requested: usize,
        /// Pages available
        total: usize,
    },

    /// Pagination rejected its budget
    #[error(transparent)]
    Chunk(#[from] ChunkError),
}

fn format_errors(errors: &[String]) -> String {
    errors
        .iter()
        .map(|error| format!("- {}", error))
        .collect::<Vec<_>>()
        .join("\n")
}

#[derive(Debug)]
struct CacheEntry {
    edits: Arc<Vec<ChangeModeEdit>>,
    inserted_at: Instant,
    seq: u64,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    next_seq: u64,
}

/// Bounded, expiring store of edit sets keyed by opaque cache keys
#[derive(Debug)]
pub struct ChunkCache {
    ttl: Duration,
    max_entries: usize,
    state: Mutex<CacheState>,
}

impl ChunkCache {
    /// Create a cache holding at most `max_entries` sets for `ttl` each
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            state: Mutex::new(CacheState::default()),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn purge_expired(&self, state: &mut CacheState, now: Instant) {
        let ttl = self.ttl;
        state
            .entries
            .retain(|_, entry| now.duration_since(entry.inserted_at) < ttl);
    }

    /// Store an edit set and return its new cache key
    pub fn insert(&self, edits: Vec<ChangeModeEdit>) -> String {
        let key = uuid::Uuid::new_v4().simple().to_string();
        let now = Instant::now();
        let mut state = self.lock();
        self.purge_expired(&mut state, now);

        while state.entries.len() >= self.max_entries {
            let oldest = state
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.seq)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(oldest) => {
                    tracing::debug!("Evicting cached edit set {}", oldest);
                    state.entries.remove(&oldest);
                }
                None => break,
            }
        }

        let seq = state.next_seq;
        state.next_seq += 1;
        state.entries.insert(
            key.clone(),
            CacheEntry {
                edits: Arc::new(edits),
                inserted_at: now,
                seq,
            },
        );
        key
    }

    /// Look up a live edit set
    pub fn get(&self, key: &str) -> Option<Arc<Vec<ChangeModeEdit>>> {
        let mut state = self.lock();
        self.purge_expired(&mut state, Instant::now());
        state.entries.get(key).map(|entry| Arc::clone(&entry.edits))
    }

    /// Number of live entries
    pub fn len(&self) -> usize {
        let mut state = self.lock();
        self.purge_expired(&mut state, Instant::now());
        state.entries.len()
    }

    /// Whether no live entries remain
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Turns change mode responses into paged tool output
#[derive(Debug)]
pub struct ChangeModeProcessor {
    cache: ChunkCache,
    max_chunk_chars: usize,
}

impl ChangeModeProcessor {
    /// Create a processor with a page budget and cache
    pub fn new(max_chunk_chars: usize, cache: ChunkCache) -> Self {
        Self {
            cache,
            max_chunk_chars,
        }
    }

    /// Build a processor from change mode configuration
    pub fn from_config(config: &askbridge_core::config::ChangeModeConfig) -> Self {
        Self::new(
            config.max_chunk_chars,
            ChunkCache::new(
                Duration::from_secs(config.cache_ttl_secs),
                config.max_cache_entries,
            ),
        )
    }

    /// The edit cache
    pub fn cache(&self) -> &ChunkCache {
        &self.cache
    }

    /// Extract, validate and cache the edits in `raw`, then render the
    /// requested page (the first page when `chunk_index` is `None`)
    pub fn process(&self, raw: &str, chunk_index: Option<usize>) -> Result<String, ChangeModeError> {
        let edits = parse_change_mode_output(raw);

        if edits.is_empty() {
            tracing::info!("Change mode response contained no edits");
            return Ok(format!(
                "No edits found in the response. The assistant may not have followed \
                 the change mode format.\n\nRaw response:\n{}",
                raw
            ));
        }

        let report = validate_change_mode_edits(&edits);
        if !report.valid {
            tracing::warn!("Change mode edits failed validation: {} errors", report.errors.len());
            return Err(ChangeModeError::Validation(report.errors));
        }

        let chunks = chunk_change_mode_edits(&edits, self.max_chunk_chars)?;
        let key = self.cache.insert(edits);
        tracing::info!("Cached change mode edits under {} ({} pages)", key, chunks.len());

        render_requested(&chunks, &key, chunk_index.unwrap_or(1))
    }

    /// Render a page of a previously cached edit set
    pub fn fetch(&self, cache_key: &str, chunk_index: usize) -> Result<String, ChangeModeError> {
        let edits = self
            .cache
            .get(cache_key)
            .ok_or_else(|| ChangeModeError::CacheMiss(cache_key.to_string()))?;

        let chunks = chunk_change_mode_edits(&edits, self.max_chunk_chars)?;
        render_requested(&chunks, cache_key, chunk_index)
    }
}

fn render_requested(
    chunks: &[EditChunk],
    cache_key: &str,
    chunk_index: usize,
) -> Result<String, ChangeModeError> {
    let chunk = chunk_index
        .checked_sub(1)
        .and_then(|i| chunks.get(i))
        .ok_or(ChangeModeError::ChunkOutOfRange {
            requested: chunk_index,
            total: chunks.len(),
        })?;

    Ok(render_chunk(chunk, chunks, cache_key))
}

/// Render one page as tool output text
pub fn render_chunk(chunk: &EditChunk, all: &[EditChunk], cache_key: &str) -> String {
    let mut out = String::new();

    let _ = writeln!(
        out,
        "[CHANGEMODE OUTPUT - Chunk {} of {}]",
        chunk.chunk_index, chunk.total_chunks
    );
    let _ = writeln!(out, "Cache key: {}", cache_key);

    if chunk.total_chunks > 1 {
        let _ = writeln!(out, "\n{}", summarize_chunking(all));
    }

    let _ = writeln!(
        out,
        "\nApply the following {} edit(s) exactly as shown. OLD text must match the file before replacing it with NEW.",
        chunk.edits.len()
    );

    for (i, edit) in chunk.edits.iter().enumerate() {
        let _ = writeln!(
            out,
            "\n### Edit {}: {} (lines {}-{})",
            i + 1,
            edit.filename,
            edit.old_start_line,
            edit.old_end_line
        );
        let _ = writeln!(out, "OLD:\n```\n{}\n```", edit.old_code);
        let _ = writeln!(out, "NEW:\n```\n{}\n```", edit.new_code);
    }

    if chunk.has_more {
        let _ = writeln!(
            out,
            "\n---\nMore edits remain. Call {} with cacheKey=\"{}\" and chunkIndex={} to continue.",
            FETCH_CHUNK_TOOL,
            cache_key,
            chunk.chunk_index + 1
        );
    }

    out.trim_end().to_string()
}
