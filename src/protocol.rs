//! Wire frames exchanged with the generation service
//!
//! Outbound:
//! ```text
//! {"prompt": "...", "temperature": 0.7, "top_k": 10, "length": 40, "batch_size": 4}
//! ```
//! Inbound:
//! ```text
//! {"message": {"prompt": "...", "text_0": "...", "text_1": "..."}}
//! ```

use std::cmp::Ordering;

use serde::Serialize;
use serde_json::{Map, Value};
use thiserror::Error;

use crate::config::GenerationSettings;

/// Errors decoding an inbound frame
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("frame is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame has no `message` object")]
    MissingMessage,

    #[error("message has no `prompt` string")]
    MissingPrompt,
}

/// A generation request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RequestMessage {
    pub prompt: String,
    pub temperature: f64,
    pub top_k: u32,
    pub length: u32,
    pub batch_size: u32,
    /// Only sent when sequence tagging is enabled
    #[serde(skip_serializing_if = "Option::is_none")]
    pub seq: Option<u64>,
}

impl RequestMessage {
    pub fn new(prompt: impl Into<String>, settings: &GenerationSettings) -> Self {
        Self {
            prompt: prompt.into(),
            temperature: settings.temperature,
            top_k: settings.top_k,
            length: settings.length,
            batch_size: settings.batch_size,
            seq: None,
        }
    }

    pub fn with_seq(mut self, seq: u64) -> Self {
        self.seq = Some(seq);
        self
    }

    pub fn to_frame(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// A batch of candidates answering some earlier prompt
#[derive(Debug, Clone, PartialEq)]
pub struct ResponseMessage {
    /// The prompt as the server saw it
    pub prompt: String,
    pub candidates: Vec<String>,
    /// Echoed sequence tag, if the server sent one back
    pub seq: Option<u64>,
}

/// Decode an inbound text frame
pub fn parse_response(frame: &str) -> Result<ResponseMessage, ProtocolError> {
    let value: Value = serde_json::from_str(frame)?;
    let message = value
        .get("message")
        .and_then(Value::as_object)
        .ok_or(ProtocolError::MissingMessage)?;

    let prompt = message
        .get("prompt")
        .and_then(Value::as_str)
        .ok_or(ProtocolError::MissingPrompt)?
        .to_string();

    Ok(ResponseMessage {
        prompt,
        candidates: extract_candidates(message),
        seq: message.get("seq").and_then(Value::as_u64),
    })
}

/// Pull the ordered candidate strings out of a message object
///
/// A `candidates` array wins. Otherwise every other string field counts,
/// ordered by key with embedded numbers compared numerically.
pub fn extract_candidates(message: &Map<String, Value>) -> Vec<String> {
    if let Some(list) = message.get("candidates").and_then(Value::as_array) {
        return list
            .iter()
            .filter_map(Value::as_str)
            .map(str::to_string)
            .collect();
    }

    let mut fields: Vec<(&String, &str)> = message
        .iter()
        .filter(|(key, _)| key.as_str() != "prompt")
        .filter_map(|(key, value)| value.as_str().map(|s| (key, s)))
        .collect();
    fields.sort_by(|a, b| natural_cmp(a.0, b.0));
    fields.into_iter().map(|(_, s)| s.to_string()).collect()
}

// "text_2" < "text_10"
fn natural_cmp(a: &str, b: &str) -> Ordering {
    let (a_stem, a_num) = split_trailing_number(a);
    let (b_stem, b_num) = split_trailing_number(b);
    a_stem.cmp(b_stem).then(a_num.cmp(&b_num)).then(a.cmp(b))
}

fn split_trailing_number(key: &str) -> (&str, Option<u64>) {
    let digits = key.chars().rev().take_while(char::is_ascii_digit).count();
    let (stem, number) = key.split_at(key.len() - digits);
    (stem, number.parse().ok())
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod protocol_tests;
