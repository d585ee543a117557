//! Stale response filtering
//!
//! Several requests can be in flight under fast typing, and the service may
//! answer out of order. A response is only shown when the tail of its echoed
//! prompt still matches the tail of the live document. When sequence tags
//! are echoed back, responses older than one already accepted are dropped as
//! well.

use crate::protocol::ResponseMessage;

/// Outcome of checking a response against the live document
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Verdict {
    /// Fresh: these candidates belong to the current text
    Accepted(Vec<String>),
    /// The writer has typed on since this prompt was sent
    Stale,
    /// A newer response has already been accepted
    Superseded { seq: u64, highest: u64 },
}

#[derive(Debug, Clone)]
pub struct ResponseCorrelator {
    /// How many trailing characters are compared
    tail_chars: usize,
    /// Highest sequence tag accepted so far
    highest_seq: Option<u64>,
}

impl ResponseCorrelator {
    pub fn new(tail_chars: usize) -> Self {
        Self {
            tail_chars,
            highest_seq: None,
        }
    }

    /// Check `response` against the document text at receipt time
    pub fn accept(&mut self, response: ResponseMessage, current_text: &str) -> Verdict {
        if let (Some(seq), Some(highest)) = (response.seq, self.highest_seq) {
            if seq < highest {
                return Verdict::Superseded { seq, highest };
            }
        }

        if tail(&response.prompt, self.tail_chars) != tail(current_text, self.tail_chars) {
            return Verdict::Stale;
        }

        if let Some(seq) = response.seq {
            self.highest_seq = Some(seq);
        }
        Verdict::Accepted(response.candidates)
    }

    pub fn highest_seq(&self) -> Option<u64> {
        self.highest_seq
    }
}

/// Last `chars` characters of the trimmed text (all of it when shorter)
fn tail(text: &str, chars: usize) -> &str {
    let trimmed = text.trim();
    let count = trimmed.chars().count();
    if count <= chars {
        return trimmed;
    }
    let start = trimmed
        .char_indices()
        .nth(count - chars)
        .map_or(trimmed.len(), |(i, _)| i);
    &trimmed[start..]
}

#[cfg(test)]
#[path = "correlator_tests.rs"]
mod correlator_tests;
