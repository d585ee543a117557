//! Candidate merging
//!
//! Turns a chosen candidate into an edit against the document. A candidate
//! that opens with punctuation swallows the space before the insertion
//! point, so "word " + ". Next" reads "word. Next".

/// Leading characters that join onto the previous word
pub const MERGE_PUNCTUATION: [char; 6] = [',', '!', '.', '"', '-', '\''];

/// An edit to apply at the insertion point
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOperation {
    /// Remove the single space right before the insertion point first
    pub delete_preceding_space: bool,
    /// Text inserted at the insertion point
    pub insert: String,
}

impl EditOperation {
    /// Apply to a plain string whose end is the insertion point
    ///
    /// Returns false without touching `text` when the edit expects a
    /// preceding space that isn't there.
    pub fn apply_to(&self, text: &mut String) -> bool {
        if self.delete_preceding_space {
            if !text.ends_with(' ') {
                return false;
            }
            text.pop();
        }
        text.push_str(&self.insert);
        true
    }
}

/// Build the edit for inserting `candidate` after `text_before_cursor`
pub fn merge(text_before_cursor: &str, candidate: &str) -> EditOperation {
    let preceded_by_space = text_before_cursor.ends_with(' ');
    let leads_with_punctuation = candidate
        .chars()
        .next()
        .is_some_and(|c| MERGE_PUNCTUATION.contains(&c));

    EditOperation {
        delete_preceding_space: preceded_by_space && leads_with_punctuation,
        insert: candidate.to_string(),
    }
}

#[cfg(test)]
#[path = "merger_tests.rs"]
mod merger_tests;
