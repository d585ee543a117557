//! Candidate list and selection
//!
//! Holds the candidates currently on display and a circular selection over
//! them. The selection is always either None or a valid index.

/// Candidates plus the selected index
#[derive(Debug, Clone, Default)]
pub struct SuggestionNavigator {
    candidates: Vec<String>,
    /// Currently selected candidate index (None = no selection)
    selected_index: Option<usize>,
}

impl SuggestionNavigator {
    pub fn new() -> Self {
        Self {
            candidates: Vec::new(),
            selected_index: None,
        }
    }

    /// Replace the candidate list; the selection always starts over
    pub fn replace(&mut self, candidates: Vec<String>) {
        self.candidates = candidates;
        self.selected_index = None;
    }

    /// Drop all candidates and the selection
    pub fn clear(&mut self) {
        self.candidates.clear();
        self.selected_index = None;
    }

    pub fn clear_selection(&mut self) {
        self.selected_index = None;
    }

    pub fn candidates(&self) -> &[String] {
        &self.candidates
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected_index
    }

    /// The candidate under the selection, if any
    pub fn selected_candidate(&self) -> Option<&str> {
        self.selected_index
            .and_then(|i| self.candidates.get(i))
            .map(String::as_str)
    }

    /// Move the selection up
    ///
    /// From no selection, selects the first candidate. From the first,
    /// wraps to the last.
    pub fn move_up(&mut self) {
        let count = self.candidates.len();
        if count == 0 {
            return;
        }

        self.selected_index = match self.selected_index {
            None => Some(0),
            Some(0) => Some(count - 1),
            Some(current) => Some(current - 1),
        };
    }

    /// Move the selection down
    ///
    /// From no selection, selects the last candidate. From the last, wraps
    /// to the first.
    pub fn move_down(&mut self) {
        let count = self.candidates.len();
        if count == 0 {
            return;
        }

        self.selected_index = match self.selected_index {
            None => Some(count - 1),
            Some(current) => Some((current + 1) % count),
        };
    }
}

#[cfg(test)]
#[path = "navigator_tests.rs"]
mod navigator_tests;
