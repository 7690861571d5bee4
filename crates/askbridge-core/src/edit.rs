//! Edit records produced by change mode
//!
//! A [`ChangeModeEdit`] describes replacing one line range of a file with new
//! content. Serialized field names follow the camelCase wire format the
//! calling agent consumes.

use serde::{Deserialize, Serialize};

/// Structural overhead charged per edit when estimating serialized size
/// (field names, quotes, braces and separators of the JSON envelope).
pub const EDIT_OVERHEAD_CHARS: usize = 250;

/// A single proposed file change
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeModeEdit {
    /// Target file path
    pub filename: String,
    /// First replaced line (1-based, inclusive)
    pub old_start_line: usize,
    /// Last replaced line (1-based, inclusive)
    pub old_end_line: usize,
    /// Exact text being replaced; empty for a pure insertion
    pub old_code: String,
    /// First line of the replacement in the new file state
    pub new_start_line: usize,
    /// Last line of the replacement in the new file state
    pub new_end_line: usize,
    /// Replacement text; empty for a deletion
    pub new_code: String,
}

impl ChangeModeEdit {
    /// Build an edit anchored at `start_line`, deriving both end lines from
    /// the line counts of `old_code` and `new_code`.
    ///
    /// End lines saturate at `usize::MAX`; use [`ChangeModeEdit::try_new`] to
    /// reject ranges that do not fit.
    pub fn new(
        filename: impl Into<String>,
        start_line: usize,
        old_code: impl Into<String>,
        new_code: impl Into<String>,
    ) -> Self {
        let old_code = old_code.into();
        let new_code = new_code.into();

        Self {
            filename: filename.into(),
            old_start_line: start_line,
            old_end_line: end_line(start_line, &old_code).unwrap_or(usize::MAX),
            old_code,
            new_start_line: start_line,
            new_end_line: end_line(start_line, &new_code).unwrap_or(usize::MAX),
            new_code,
        }
    }

    /// Like [`ChangeModeEdit::new`], but returns `None` when either end line
    /// would overflow `usize`.
    pub fn try_new(
        filename: impl Into<String>,
        start_line: usize,
        old_code: impl Into<String>,
        new_code: impl Into<String>,
    ) -> Option<Self> {
        let old_code = old_code.into();
        let new_code = new_code.into();

        Some(Self {
            filename: filename.into(),
            old_start_line: start_line,
            old_end_line: end_line(start_line, &old_code)?,
            old_code,
            new_start_line: start_line,
            new_end_line: end_line(start_line, &new_code)?,
            new_code,
        })
    }

    /// Whether this edit only inserts text
    pub fn is_insertion(&self) -> bool {
        self.old_code.is_empty() && !self.new_code.is_empty()
    }

    /// Whether this edit only removes text
    pub fn is_deletion(&self) -> bool {
        self.new_code.is_empty() && !self.old_code.is_empty()
    }

    /// Estimated serialized size of this edit, used for page budgeting.
    ///
    /// Counts characters rather than bytes so multi-byte text is not
    /// over-charged.
    pub fn estimated_chars(&self) -> usize {
        self.filename.chars().count()
            + self.old_code.chars().count()
            + self.new_code.chars().count()
            + EDIT_OVERHEAD_CHARS
    }
}

/// Number of lines in a code section; an empty section has none
pub fn line_count(code: &str) -> usize {
    if code.is_empty() {
        0
    } else {
        code.split('\n').count()
    }
}

fn end_line(start_line: usize, code: &str) -> Option<usize> {
    match line_count(code) {
        0 => Some(start_line),
        n => start_line.checked_add(n - 1),
    }
}

/// Outcome of structurally validating a sequence of edits
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ValidationReport {
    /// True iff `errors` is empty
    pub valid: bool,
    /// Every problem found, in edit order
    pub errors: Vec<String>,
}

impl ValidationReport {
    /// Build a report from the accumulated errors
    pub fn from_errors(errors: Vec<String>) -> Self {
        Self {
            valid: errors.is_empty(),
            errors,
        }
    }
}
