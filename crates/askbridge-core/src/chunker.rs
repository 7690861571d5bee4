//! Pagination of change mode edits
//!
//! Large edit sets do not fit in a single tool response, so they are split
//! into [`EditChunk`] pages under a character budget. Edits for the same file
//! stay together unless that file alone overflows the budget, in which case
//! it gets pages of its own. No edit is ever split or dropped: an edit larger
//! than the budget gets a page of its own.

use crate::edit::ChangeModeEdit;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Default page budget, kept well below the transport message ceiling
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 20_000;

/// Structural overhead charged once per page (pagination fields and the
/// surrounding envelope)
pub const CHUNK_OVERHEAD_CHARS: usize = 100;

/// Errors that can occur while paginating edits
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChunkError {
    /// The page budget cannot hold anything
    #[error("Invalid chunk budget: {0} (must be greater than zero)")]
    InvalidBudget(usize),
}

/// One transportable page of edits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditChunk {
    /// Edits on this page, in output order
    pub edits: Vec<ChangeModeEdit>,
    /// 1-based position among sibling pages
    pub chunk_index: usize,
    /// Total number of pages in this partitioning
    pub total_chunks: usize,
    /// True iff `chunk_index < total_chunks`
    pub has_more: bool,
    /// Estimated serialized size of `edits`, for budgeting only
    pub estimated_chars: usize,
}

impl EditChunk {
    /// Distinct filenames on this page, in order of appearance
    pub fn filenames(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        for edit in &self.edits {
            if !names.contains(&edit.filename.as_str()) {
                names.push(&edit.filename);
            }
        }
        names
    }
}

/// Estimated serialized size of a page holding `edits`
pub fn estimate_chunk_chars(edits: &[ChangeModeEdit]) -> usize {
    CHUNK_OVERHEAD_CHARS + edits.iter().map(ChangeModeEdit::estimated_chars).sum::<usize>()
}

/// Page under construction
#[derive(Debug, Default)]
struct OpenPage {
    edits: Vec<ChangeModeEdit>,
    content_chars: usize,
}

impl OpenPage {
    fn is_empty(&self) -> bool {
        self.edits.is_empty()
    }

    fn would_overflow(&self, extra_chars: usize, max_chunk_chars: usize) -> bool {
        CHUNK_OVERHEAD_CHARS + self.content_chars + extra_chars > max_chunk_chars
    }

    fn push(&mut self, edit: &ChangeModeEdit) {
        self.content_chars += edit.estimated_chars();
        self.edits.push(edit.clone());
    }

    fn take(&mut self) -> Vec<ChangeModeEdit> {
        self.content_chars = 0;
        std::mem::take(&mut self.edits)
    }
}

/// Group edits by filename, ordered by each file's first appearance
fn group_by_file(edits: &[ChangeModeEdit]) -> Vec<Vec<&ChangeModeEdit>> {
    let mut groups: Vec<Vec<&ChangeModeEdit>> = Vec::new();
    let mut index: HashMap<&str, usize> = HashMap::new();

    for edit in edits {
        match index.get(edit.filename.as_str()) {
            Some(&slot) => groups[slot].push(edit),
            None => {
                index.insert(&edit.filename, groups.len());
                groups.push(vec![edit]);
            }
        }
    }

    groups
}

/// Split `edits` into pages of at most `max_chunk_chars` estimated characters.
///
/// Always returns at least one page; empty input yields a single empty page.
/// Partitioning is deterministic, so the same edits and budget always
/// produce the same pages.
pub fn chunk_change_mode_edits(
    edits: &[ChangeModeEdit],
    max_chunk_chars: usize,
) -> Result<Vec<EditChunk>, ChunkError> {
    if max_chunk_chars == 0 {
        return Err(ChunkError::InvalidBudget(max_chunk_chars));
    }

    let mut pages: Vec<Vec<ChangeModeEdit>> = Vec::new();
    let mut current = OpenPage::default();

    for group in group_by_file(edits) {
        let group_chars: usize = group.iter().map(|edit| edit.estimated_chars()).sum();

        if CHUNK_OVERHEAD_CHARS + group_chars <= max_chunk_chars {
            if !current.is_empty() && current.would_overflow(group_chars, max_chunk_chars) {
                pages.push(current.take());
            }
            for edit in group {
                current.push(edit);
            }
            continue;
        }

        // The file alone overflows a page: it gets pages of its own, split at
        // edit boundaries.
        tracing::debug!(
            "Splitting {} edits for {} (~{} chars) across pages",
            group.len(),
            group[0].filename,
            group_chars
        );
        if !current.is_empty() {
            pages.push(current.take());
        }
        for edit in group {
            let edit_chars = edit.estimated_chars();
            if !current.is_empty() && current.would_overflow(edit_chars, max_chunk_chars) {
                pages.push(current.take());
            }
            if edit_chars + CHUNK_OVERHEAD_CHARS > max_chunk_chars {
                tracing::debug!(
                    "Edit for {}:{} (~{} chars) exceeds the {} char budget; placing it alone",
                    edit.filename,
                    edit.old_start_line,
                    edit_chars,
                    max_chunk_chars
                );
            }
            current.push(edit);
        }
        pages.push(current.take());
    }

    if !current.is_empty() || pages.is_empty() {
        pages.push(current.take());
    }

    let total_chunks = pages.len();
    let chunks: Vec<EditChunk> = pages
        .into_iter()
        .enumerate()
        .map(|(i, edits)| EditChunk {
            estimated_chars: estimate_chunk_chars(&edits),
            edits,
            chunk_index: i + 1,
            total_chunks,
            has_more: i + 1 < total_chunks,
        })
        .collect();

    tracing::debug!(
        "Chunked {} edits into {} pages (budget {} chars)",
        edits.len(),
        total_chunks,
        max_chunk_chars
    );
    Ok(chunks)
}

/// Paginate with [`DEFAULT_MAX_CHUNK_CHARS`]
pub fn chunk_change_mode_edits_default(edits: &[ChangeModeEdit]) -> Vec<EditChunk> {
    chunk_change_mode_edits(edits, DEFAULT_MAX_CHUNK_CHARS)
        .expect("default chunk budget should be non-zero")
}

/// Human-readable report of a partitioning.
///
/// The `# edits:`, `# chunks:` and `Chunk <i>:` prefixes are stable so the
/// report stays greppable.
pub fn summarize_chunking(chunks: &[EditChunk]) -> String {
    let total_edits: usize = chunks.iter().map(|chunk| chunk.edits.len()).sum();

    let mut lines = vec![
        "Change mode chunking summary".to_string(),
        format!("# edits: {}", total_edits),
        format!("# chunks: {}", chunks.len()),
    ];

    for chunk in chunks {
        let noun = if chunk.edits.len() == 1 { "edit" } else { "edits" };
        lines.push(format!(
            "Chunk {}: {} {}, ~{} chars [{}]",
            chunk.chunk_index,
            chunk.edits.len(),
            noun,
            chunk.estimated_chars,
            chunk.filenames().join(", ")
        ));
    }

    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn create_edit(filename: &str, code_size: usize) -> ChangeModeEdit {
        ChangeModeEdit {
            filename: filename.to_string(),
            old_start_line: 1,
            old_end_line: 10,
            old_code: "x".repeat(code_size),
            new_start_line: 1,
            new_end_line: 10,
            new_code: "y".repeat(code_size),
        }
    }

    fn assert_metadata_consistent(chunks: &[EditChunk]) {
        for (i, chunk) in chunks.iter().enumerate() {
            assert_eq!(chunk.chunk_index, i + 1);
            assert_eq!(chunk.total_chunks, chunks.len());
            assert_eq!(chunk.has_more, i < chunks.len() - 1);
        }
    }

    #[test]
    fn test_empty_edits_single_chunk() {
        let chunks = chunk_change_mode_edits_default(&[]);

        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].edits.is_empty());
        assert_eq!(chunks[0].chunk_index, 1);
        assert_eq!(chunks[0].total_chunks, 1);
        assert!(!chunks[0].has_more);
        assert_eq!(chunks[0].estimated_chars, CHUNK_OVERHEAD_CHARS);
    }

    #[test]
    fn test_small_edits_single_chunk() {
        let edits = vec![create_edit("file1.ts", 100), create_edit("file2.ts", 100)];
        let chunks = chunk_change_mode_edits(&edits, 50_000).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].edits.len(), 2);
        assert!(!chunks[0].has_more);
    }

    #[test]
    fn test_splits_when_exceeding_limit() {
        let edits = vec![
            create_edit("file1.ts", 5000),
            create_edit("file2.ts", 5000),
            create_edit("file3.ts", 5000),
        ];
        let chunks = chunk_change_mode_edits(&edits, 6000).unwrap();

        assert!(chunks.len() > 1);
        assert_metadata_consistent(&chunks);
    }

    #[test]
    fn test_packs_groups_until_budget() {
        // Each edit is ~1255 chars; three fit under 4000 with page overhead.
        let edits: Vec<_> = (0..5).map(|i| create_edit(&format!("f{i}.ts"), 500)).collect();
        let chunks = chunk_change_mode_edits(&edits, 4000).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].edits.len(), 3);
        assert_eq!(chunks[1].edits.len(), 2);
        assert!(chunks.iter().all(|chunk| chunk.estimated_chars <= 4000));
    }

    #[test]
    fn test_groups_edits_by_file() {
        let edits = vec![
            create_edit("file1.ts", 100),
            create_edit("file2.ts", 100),
            create_edit("file1.ts", 100),
        ];
        let chunks = chunk_change_mode_edits(&edits, 50_000).unwrap();

        assert_eq!(chunks.len(), 1);
        let order: Vec<&str> = chunks[0].edits.iter().map(|e| e.filename.as_str()).collect();
        assert_eq!(order, vec!["file1.ts", "file1.ts", "file2.ts"]);
    }

    #[test]
    fn test_group_moves_to_next_page_intact() {
        let edits = vec![
            create_edit("a.ts", 1000),
            create_edit("b.ts", 600),
            create_edit("b.ts", 600),
        ];
        // a.ts ~2254, b.ts group ~2908: together over budget, each fits alone.
        let chunks = chunk_change_mode_edits(&edits, 4000).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].filenames(), vec!["a.ts"]);
        assert_eq!(chunks[1].filenames(), vec!["b.ts"]);
        assert_eq!(chunks[1].edits.len(), 2);
    }

    #[test]
    fn test_oversized_group_is_split_at_edit_boundaries() {
        let edits = vec![
            create_edit("big.ts", 800),
            create_edit("big.ts", 800),
            create_edit("big.ts", 800),
        ];
        let chunks = chunk_change_mode_edits(&edits, 2000).unwrap();

        assert_eq!(chunks.len(), 3);
        assert!(chunks.iter().all(|chunk| chunk.edits.len() == 1));
        assert_metadata_consistent(&chunks);
    }

    #[test]
    fn test_oversized_group_does_not_share_pages() {
        // big.ts edits are ~1856 chars each: one fits beside a.ts, both do not.
        let edits = vec![
            create_edit("a.ts", 10),
            create_edit("big.ts", 800),
            create_edit("big.ts", 800),
            create_edit("c.ts", 10),
        ];
        let chunks = chunk_change_mode_edits(&edits, 2500).unwrap();

        let files: Vec<Vec<&str>> = chunks.iter().map(|chunk| chunk.filenames()).collect();
        assert_eq!(files, vec![vec!["a.ts"], vec!["big.ts"], vec!["big.ts"], vec!["c.ts"]]);
        assert_metadata_consistent(&chunks);
    }

    #[test]
    fn test_default_budget_chunks() {
        let chunks = chunk_change_mode_edits_default(&[create_edit("a.ts", 10_000)]);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].estimated_chars > DEFAULT_MAX_CHUNK_CHARS);
    }

    #[test]
    fn test_oversized_single_edit() {
        let edits = vec![create_edit("large.ts", 30_000)];
        let chunks = chunk_change_mode_edits(&edits, 1000).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].edits.len(), 1);
        assert!(chunks[0].estimated_chars > 1000);
    }

    #[test]
    fn test_oversized_edit_gets_own_page() {
        let edits = vec![
            create_edit("a.ts", 10),
            create_edit("huge.ts", 5000),
            create_edit("c.ts", 10),
        ];
        let chunks = chunk_change_mode_edits(&edits, 1000).unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[1].filenames(), vec!["huge.ts"]);
        assert_eq!(chunks[1].edits.len(), 1);
    }

    #[test]
    fn test_estimated_chars_includes_overhead() {
        let chunks = chunk_change_mode_edits_default(&[create_edit("test.ts", 500)]);

        assert!(chunks[0].estimated_chars > 500);
        assert!(chunks[0].estimated_chars < 2000);
    }

    #[test]
    fn test_zero_budget_rejected() {
        let result = chunk_change_mode_edits(&[create_edit("a.ts", 1)], 0);
        assert_eq!(result, Err(ChunkError::InvalidBudget(0)));
    }

    #[test]
    fn test_summary_contents() {
        let edits = vec![create_edit("file1.ts", 100), create_edit("file2.ts", 200)];
        let summary = summarize_chunking(&chunk_change_mode_edits_default(&edits));

        assert!(summary.contains("# edits: 2"));
        assert!(summary.contains("# chunks: 1"));
        assert!(summary.contains("Chunk 1:"));
    }

    #[test]
    fn test_summary_snapshot() {
        let edits = vec![
            create_edit("file1.ts", 100),
            create_edit("file2.ts", 200),
            create_edit("big.ts", 2000),
        ];
        let chunks = chunk_change_mode_edits(&edits, 3000).unwrap();

        insta::assert_snapshot!(summarize_chunking(&chunks), @r"
        Change mode chunking summary
        # edits: 3
        # chunks: 2
        Chunk 1: 2 edits, ~1216 chars [file1.ts, file2.ts]
        Chunk 2: 1 edit, ~4356 chars [big.ts]
        ");
    }

    fn edits_strategy() -> impl Strategy<Value = Vec<ChangeModeEdit>> {
        prop::collection::vec(("[a-d]\\.ts", 0usize..3000), 0..24).prop_map(|specs| {
            specs
                .into_iter()
                .map(|(file, size)| create_edit(&file, size))
                .collect()
        })
    }

    proptest! {
        #[test]
        fn prop_conserves_edits(edits in edits_strategy(), budget in 500usize..20_000) {
            let chunks = chunk_change_mode_edits(&edits, budget).unwrap();
            let total: usize = chunks.iter().map(|chunk| chunk.edits.len()).sum();
            prop_assert_eq!(total, edits.len());
        }

        #[test]
        fn prop_metadata_consistent(edits in edits_strategy(), budget in 500usize..20_000) {
            let chunks = chunk_change_mode_edits(&edits, budget).unwrap();
            prop_assert!(!chunks.is_empty());
            for (i, chunk) in chunks.iter().enumerate() {
                prop_assert_eq!(chunk.chunk_index, i + 1);
                prop_assert_eq!(chunk.total_chunks, chunks.len());
                prop_assert_eq!(chunk.has_more, chunk.chunk_index < chunk.total_chunks);
            }
        }

        #[test]
        fn prop_files_stay_contiguous(edits in edits_strategy(), budget in 500usize..20_000) {
            let chunks = chunk_change_mode_edits(&edits, budget).unwrap();
            let order: Vec<&str> = chunks
                .iter()
                .flat_map(|chunk| chunk.edits.iter().map(|e| e.filename.as_str()))
                .collect();

            let mut finished: Vec<&str> = Vec::new();
            for pair in order.windows(2) {
                if pair[0] != pair[1] {
                    prop_assert!(!finished.contains(&pair[1]), "{} reappears", pair[1]);
                    finished.push(pair[0]);
                }
            }
        }

        #[test]
        fn prop_multi_edit_pages_within_budget(edits in edits_strategy(), budget in 500usize..20_000) {
            let chunks = chunk_change_mode_edits(&edits, budget).unwrap();
            for chunk in chunks.iter().filter(|chunk| chunk.edits.len() > 1) {
                prop_assert!(chunk.estimated_chars <= budget);
            }
        }

        #[test]
        fn prop_oversized_groups_stay_alone(edits in edits_strategy(), budget in 500usize..20_000) {
            let chunks = chunk_change_mode_edits(&edits, budget).unwrap();
            for group in group_by_file(&edits) {
                let group_chars: usize = group.iter().map(|edit| edit.estimated_chars()).sum();
                if CHUNK_OVERHEAD_CHARS + group_chars <= budget {
                    continue;
                }
                for chunk in chunks.iter().filter(|chunk| chunk.filenames().contains(&group[0].filename.as_str())) {
                    prop_assert_eq!(chunk.filenames(), vec![group[0].filename.as_str()]);
                }
            }
        }

        #[test]
        fn prop_deterministic(edits in edits_strategy(), budget in 500usize..20_000) {
            prop_assert_eq!(
                chunk_change_mode_edits(&edits, budget).unwrap(),
                chunk_change_mode_edits(&edits, budget).unwrap()
            );
        }
    }
}
