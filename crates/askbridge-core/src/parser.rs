//! Change mode output parsing
//!
//! Turns the assistant's free-form response into [`ChangeModeEdit`] records.
//! The expected grammar is a header line followed by a fenced block holding
//! an `OLD:` section and a `NEW:` section:
//!
//! ````text
//! **FILE: src/lib.rs:42**
//! ```
//! OLD:
//! let x = 1;
//! NEW:
//! let x = 2;
//! ```
//! ````
//!
//! Anything outside that grammar is ignored. Parsing is total: malformed
//! blocks are skipped, never reported as errors.

use crate::edit::{ChangeModeEdit, ValidationReport};
use regex::Regex;
use std::sync::OnceLock;

const OLD_MARKER: &str = "OLD:";
const NEW_MARKER: &str = "NEW:";
const FENCE: &str = "```";

fn header_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\*\*FILE:\s*(.+?):(\d+)\*\*$").expect("header regex should compile")
    })
}

/// Header of an edit block: target file and starting line
#[derive(Debug, Clone, PartialEq, Eq)]
struct BlockHeader {
    filename: String,
    start_line: usize,
}

/// Parse a header line, returning `None` for anything that is not one
fn parse_header(line: &str) -> Option<BlockHeader> {
    let caps = header_regex().captures(line.trim())?;
    let filename = caps.get(1)?.as_str().trim();
    let start_line: usize = caps.get(2)?.as_str().parse().ok()?;

    if filename.is_empty() || start_line == 0 {
        return None;
    }

    Some(BlockHeader {
        filename: filename.to_string(),
        start_line,
    })
}

/// Scanner states. A closed block emits its edit and returns to
/// `SeekingHeader`.
#[derive(Debug)]
enum State<'a> {
    SeekingHeader,
    AwaitingFence(BlockHeader),
    AwaitingOld(BlockHeader),
    InOld {
        header: BlockHeader,
        old: Vec<&'a str>,
    },
    InNew {
        header: BlockHeader,
        old: Vec<&'a str>,
        new: Vec<&'a str>,
    },
}

impl State<'_> {
    fn name(&self) -> &'static str {
        match self {
            State::SeekingHeader => "seeking-header",
            State::AwaitingFence(_) => "awaiting-fence",
            State::AwaitingOld(_) => "awaiting-old",
            State::InOld { .. } => "in-old",
            State::InNew { .. } => "in-new",
        }
    }

    fn header(&self) -> Option<&BlockHeader> {
        match self {
            State::SeekingHeader => None,
            State::AwaitingFence(header) | State::AwaitingOld(header) => Some(header),
            State::InOld { header, .. } | State::InNew { header, .. } => Some(header),
        }
    }
}

fn drop_block(state: &State<'_>, reason: &str) {
    if let Some(header) = state.header() {
        tracing::debug!(
            "Skipping malformed edit block for {}:{} in state {}: {}",
            header.filename,
            header.start_line,
            state.name(),
            reason
        );
    }
}

/// Join section lines, dropping the single blank line the delimiter may leave
/// at either end. Blank-only sections collapse to an empty string.
fn section_text(lines: &[&str]) -> String {
    if lines.iter().all(|line| line.trim().is_empty()) {
        return String::new();
    }

    let mut body = lines;
    if let Some((first, rest)) = body.split_first() {
        if first.trim().is_empty() {
            body = rest;
        }
    }
    if let Some((last, rest)) = body.split_last() {
        if last.trim().is_empty() {
            body = rest;
        }
    }

    body.join("\n")
}

/// Build the edit for a closed block; `None` when its line range would not
/// fit in `usize`
fn finish_block(header: BlockHeader, old: &[&str], new: &[&str]) -> Option<ChangeModeEdit> {
    ChangeModeEdit::try_new(
        header.filename,
        header.start_line,
        section_text(old),
        section_text(new),
    )
}

/// Extract every well-formed edit block from `text`, in source order.
///
/// Returns an empty vector for empty text or text with no recognizable
/// blocks. A header line always starts a fresh block, abandoning any block
/// still open; a block that is out of order or unterminated is skipped.
pub fn parse_change_mode_output(text: &str) -> Vec<ChangeModeEdit> {
    let mut edits = Vec::new();
    let mut state = State::SeekingHeader;

    for line in text.lines() {
        if let Some(header) = parse_header(line) {
            drop_block(&state, "interrupted by a new header");
            state = State::AwaitingFence(header);
            continue;
        }

        let trimmed = line.trim();
        state = match state {
            State::SeekingHeader => State::SeekingHeader,
            State::AwaitingFence(header) => {
                if trimmed.starts_with(FENCE) {
                    State::AwaitingOld(header)
                } else if trimmed.is_empty() {
                    State::AwaitingFence(header)
                } else {
                    let state = State::AwaitingFence(header);
                    drop_block(&state, "header not followed by a fenced block");
                    State::SeekingHeader
                }
            }
            State::AwaitingOld(header) => {
                if trimmed == OLD_MARKER {
                    State::InOld {
                        header,
                        old: Vec::new(),
                    }
                } else if trimmed.is_empty() {
                    State::AwaitingOld(header)
                } else {
                    let state = State::AwaitingOld(header);
                    drop_block(&state, "fenced block does not start with OLD:");
                    State::SeekingHeader
                }
            }
            State::InOld { header, mut old } => {
                if trimmed == NEW_MARKER {
                    State::InNew {
                        header,
                        old,
                        new: Vec::new(),
                    }
                } else if trimmed == FENCE {
                    let state = State::InOld { header, old };
                    drop_block(&state, "block closed before NEW:");
                    State::SeekingHeader
                } else {
                    old.push(line);
                    State::InOld { header, old }
                }
            }
            State::InNew {
                header,
                old,
                mut new,
            } => {
                if trimmed == FENCE {
                    let filename = header.filename.clone();
                    let start_line = header.start_line;
                    match finish_block(header, &old, &new) {
                        Some(edit) => edits.push(edit),
                        None => tracing::debug!(
                            "Skipping block for {}:{}: line range overflows",
                            filename,
                            start_line
                        ),
                    }
                    State::SeekingHeader
                } else {
                    new.push(line);
                    State::InNew { header, old, new }
                }
            }
        };
    }

    drop_block(&state, "unterminated at end of input");
    tracing::debug!("Parsed {} change mode edits", edits.len());
    edits
}

/// Check every edit for structural soundness.
///
/// All edits are checked and every problem is reported; the report is valid
/// only when no errors were found.
pub fn validate_change_mode_edits(edits: &[ChangeModeEdit]) -> ValidationReport {
    let mut errors = Vec::new();

    for edit in edits {
        if edit.filename.trim().is_empty() {
            errors.push("Edit missing filename".to_string());
        }

        if edit.old_end_line < edit.old_start_line {
            errors.push(format!(
                "Invalid line range for {} at line {}: old end {} is before start {}",
                edit.filename, edit.old_start_line, edit.old_end_line, edit.old_start_line
            ));
        }

        if edit.new_end_line < edit.new_start_line {
            errors.push(format!(
                "Invalid line range for {} at line {}: new end {} is before start {}",
                edit.filename, edit.new_start_line, edit.new_end_line, edit.new_start_line
            ));
        }

        if edit.old_code.is_empty() && edit.new_code.is_empty() {
            errors.push(format!(
                "Empty edit for {} at line {}: both OLD and NEW are empty",
                edit.filename, edit.old_start_line
            ));
        }
    }

    ValidationReport::from_errors(errors)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn edit(filename: &str, old_start: usize, old_end: usize, old: &str, new: &str) -> ChangeModeEdit {
        ChangeModeEdit {
            filename: filename.to_string(),
            old_start_line: old_start,
            old_end_line: old_end,
            old_code: old.to_string(),
            new_start_line: 1,
            new_end_line: 3,
            new_code: new.to_string(),
        }
    }

    #[test]
    fn test_parse_single_edit() {
        let response = "\n**FILE: src/utils/test.ts:10**\n```\nOLD:\nconst x = 1;\nNEW:\nconst x = 2;\n```\n";
        let edits = parse_change_mode_output(response);

        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].filename, "src/utils/test.ts");
        assert_eq!(edits[0].old_start_line, 10);
        assert_eq!(edits[0].old_code, "const x = 1;");
        assert_eq!(edits[0].new_code, "const x = 2;");
    }

    #[test]
    fn test_parse_multiple_edits_in_order() {
        let response = "\n**FILE: src/a.ts:5**\n```\nOLD:\nline1\nNEW:\nline1-modified\n```\n\n\
                        **FILE: src/b.ts:20**\n```\nOLD:\nline2\nNEW:\nline2-modified\n```\n";
        let edits = parse_change_mode_output(response);

        assert_eq!(edits.len(), 2);
        assert_eq!(edits[0].filename, "src/a.ts");
        assert_eq!(edits[1].filename, "src/b.ts");
        assert_eq!(edits[1].old_start_line, 20);
    }

    #[test]
    fn test_parse_empty_and_plain_text() {
        assert!(parse_change_mode_output("").is_empty());
        assert!(parse_change_mode_output("Just some text without any edit blocks").is_empty());
    }

    #[test]
    fn test_parse_line_ranges() {
        let response = "**FILE: test.ts:100**\n```\nOLD:\nline1\nline2\nline3\nNEW:\nnewline1\nnewline2\n```\n";
        let edits = parse_change_mode_output(response);

        assert_eq!(edits[0].old_start_line, 100);
        assert_eq!(edits[0].old_end_line, 102);
        assert_eq!(edits[0].new_start_line, 100);
        assert_eq!(edits[0].new_end_line, 101);
    }

    #[test]
    fn test_parse_empty_old_section() {
        let response = "**FILE: test.ts:50**\n```\nOLD:\n\nNEW:\ninserted line\n```\n";
        let edits = parse_change_mode_output(response);

        assert_eq!(edits[0].old_code, "");
        assert_eq!(edits[0].new_code, "inserted line");
        assert_eq!(edits[0].old_end_line, 50);
    }

    #[test]
    fn test_parse_empty_new_section() {
        let response = "**FILE: test.ts:7**\n```\nOLD:\nremove me\nNEW:\n\n```\n";
        let edits = parse_change_mode_output(response);

        assert_eq!(edits[0].old_code, "remove me");
        assert_eq!(edits[0].new_code, "");
        assert!(edits[0].is_deletion());
    }

    #[test]
    fn test_parse_preserves_internal_blank_lines() {
        let response = "**FILE: a.rs:1**\n```rust\nOLD:\nfn a() {}\n\nfn b() {}\nNEW:\nfn c() {}\n```";
        let edits = parse_change_mode_output(response);

        assert_eq!(edits[0].old_code, "fn a() {}\n\nfn b() {}");
        assert_eq!(edits[0].old_end_line, 3);
    }

    #[test]
    fn test_parse_crlf_input() {
        let response = "**FILE: win.ts:3**\r\n```\r\nOLD:\r\na\r\nNEW:\r\nb\r\n```\r\n";
        let edits = parse_change_mode_output(response);

        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].old_code, "a");
        assert_eq!(edits[0].new_code, "b");
    }

    #[test]
    fn test_parse_windows_style_path() {
        let response = "**FILE: C:\\src\\main.ts:12**\n```\nOLD:\na\nNEW:\nb\n```";
        let edits = parse_change_mode_output(response);

        assert_eq!(edits[0].filename, "C:\\src\\main.ts");
        assert_eq!(edits[0].old_start_line, 12);
    }

    #[test]
    fn test_skips_malformed_blocks() {
        let missing_new = "**FILE: a.ts:1**\n```\nOLD:\nx\n```\n";
        let new_before_old = "**FILE: b.ts:1**\n```\nNEW:\ny\nOLD:\nx\n```\n";
        let no_fence = "**FILE: c.ts:1**\nOLD:\nx\nNEW:\ny\n";
        let unterminated = "**FILE: d.ts:1**\n```\nOLD:\nx\nNEW:\ny\n";
        let bad_line = "**FILE: e.ts:0**\n```\nOLD:\nx\nNEW:\ny\n```\n";

        for text in [missing_new, new_before_old, no_fence, unterminated, bad_line] {
            assert!(parse_change_mode_output(text).is_empty(), "parsed: {text:?}");
        }
    }

    #[test]
    fn test_skips_block_with_overflowing_line_range() {
        let huge = format!("**FILE: a.ts:{}**\n```\nOLD:\na\nb\nNEW:\nc\n```\n", usize::MAX);
        assert!(parse_change_mode_output(&huge).is_empty());

        let response = format!("{huge}**FILE: b.ts:3**\n```\nOLD:\nx\nNEW:\ny\n```\n");
        let edits = parse_change_mode_output(&response);
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].filename, "b.ts");
    }

    #[test]
    fn test_parses_single_line_block_at_max_line() {
        let response = format!("**FILE: a.ts:{}**\n```\nOLD:\na\nNEW:\nb\n```\n", usize::MAX);
        let edits = parse_change_mode_output(&response);
        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].old_end_line, usize::MAX);
    }

    #[test]
    fn test_malformed_block_does_not_hide_following_block() {
        let response = "**FILE: broken.ts:1**\n```\nOLD:\nx\n\
                        **FILE: ok.ts:4**\n```\nOLD:\na\nNEW:\nb\n```\n";
        let edits = parse_change_mode_output(response);

        assert_eq!(edits.len(), 1);
        assert_eq!(edits[0].filename, "ok.ts");
    }

    #[test]
    fn test_validate_valid_edits() {
        let report = validate_change_mode_edits(&[edit("test.ts", 1, 5, "old code", "new code")]);
        assert!(report.valid);
        assert!(report.errors.is_empty());
    }

    #[test]
    fn test_validate_missing_filename() {
        let report = validate_change_mode_edits(&[edit("", 1, 5, "old", "new")]);
        assert!(!report.valid);
        assert!(report.errors.contains(&"Edit missing filename".to_string()));
    }

    #[test]
    fn test_validate_invalid_line_range() {
        let report = validate_change_mode_edits(&[edit("test.ts", 10, 5, "old", "new")]);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("Invalid line range")));
        assert!(report.errors.iter().any(|e| e.contains("test.ts")));
    }

    #[test]
    fn test_validate_empty_edit() {
        let mut empty = edit("test.ts", 1, 1, "", "");
        empty.new_end_line = 1;
        let report = validate_change_mode_edits(&[empty]);
        assert!(!report.valid);
        assert!(report.errors.iter().any(|e| e.contains("Empty edit")));
    }

    #[test]
    fn test_validate_accumulates_errors() {
        let report = validate_change_mode_edits(&[
            edit("", 1, 5, "old", "new"),
            edit("b.ts", 9, 2, "", ""),
        ]);
        assert!(!report.valid);
        assert_eq!(report.errors.len(), 3);
    }

    fn block_strategy() -> impl Strategy<Value = (String, usize, Vec<String>, Vec<String>)> {
        (
            "[a-z]{1,8}\\.(ts|rs)",
            1usize..5000,
            prop::collection::vec("[a-z][a-z ;=]{0,19}", 0..6),
            prop::collection::vec("[a-z][a-z ;=]{0,19}", 0..6),
        )
    }

    proptest! {
        #[test]
        fn prop_parse_never_panics(text in "\\PC*") {
            let _ = parse_change_mode_output(&text);
        }

        #[test]
        fn prop_line_ranges_match_code((file, start, old, new) in block_strategy()) {
            let text = format!(
                "**FILE: {}:{}**\n```\nOLD:\n{}\nNEW:\n{}\n```\n",
                file, start, old.join("\n"), new.join("\n")
            );
            let edits = parse_change_mode_output(&text);
            prop_assert_eq!(edits.len(), 1);

            let edit = &edits[0];
            prop_assert_eq!(edit.old_end_line - edit.old_start_line + 1, old.len().max(1));
            prop_assert_eq!(edit.new_end_line - edit.new_start_line + 1, new.len().max(1));
            prop_assert_eq!(&edit.filename, &file);
        }

        #[test]
        fn prop_validation_is_idempotent(
            files in prop::collection::vec("[a-z]{0,4}", 0..8),
            ranges in prop::collection::vec((1usize..50, 1usize..50), 8),
        ) {
            let edits: Vec<ChangeModeEdit> = files
                .iter()
                .zip(ranges.iter())
                .map(|(file, (start, end))| edit(file, *start, *end, "", if start % 2 == 0 { "x" } else { "" }))
                .collect();

            prop_assert_eq!(validate_change_mode_edits(&edits), validate_change_mode_edits(&edits));
        }
    }
}
