//! Fire-and-forget hints to the external persistent asset cache.
//!
//! The core tells the offline cache what to warm or keep; it never waits on
//! an answer and ignores delivery failures.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum CacheHint {
    /// Fetch these ahead of need.
    Precache { urls: Vec<String> },
    /// Keep these pinned through upcoming evictions.
    Retain { urls: Vec<String> },
    /// Drop everything.
    Flush,
}

pub trait HintSink {
    fn post(&mut self, hint: CacheHint);
}

/// Sink for sessions with no external cache attached.
#[derive(Debug, Default)]
pub struct NullHintSink;

impl HintSink for NullHintSink {
    fn post(&mut self, _hint: CacheHint) {}
}

/// Records posted hints, for tests.
#[derive(Debug, Default)]
pub struct RecordingHintSink {
    pub hints: Vec<CacheHint>,
}

impl HintSink for RecordingHintSink {
    fn post(&mut self, hint: CacheHint) {
        self.hints.push(hint);
    }
}

#[cfg(test)]
mod tests {
    use super::CacheHint;

    #[test]
    fn hints_serialize_with_type_tag() {
        let hint = CacheHint::Retain {
            urls: vec!["a.webp".to_string()],
        };
        let json = serde_json::to_string(&hint).unwrap();
        assert_eq!(json, r#"{"type":"retain","urls":["a.webp"]}"#);

        let flush: CacheHint = serde_json::from_str(r#"{"type":"flush"}"#).unwrap();
        assert_eq!(flush, CacheHint::Flush);
    }
}
