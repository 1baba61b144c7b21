//! Delimited tag strings used to classify and route [`crate::Event`]s.
//!
//! A tag string is a sequence of opaque tag segments joined by a single
//! non-printable delimiter byte. Segments never contain the delimiter
//! themselves, so membership and prefix checks are plain byte scans.

use crate::error::{EventError, Result};

/// The delimiter separating tag segments. Chosen as ASCII SOH (`\u{1}`)
/// because it cannot occur in a UTF-8 text segment produced by any of the
/// classifiers in this crate.
pub const TAG_DELIMITER: char = '\u{1}';

/// Filter-key / branch path delimiter (hierarchical routing, distinct from
/// the tag delimiter above).
pub const PATH_DELIMITER: char = '/';

/// Reserved tag emitted when a streaming chat chunk carries a tool-call
/// delta and no tool has run yet in this turn.
pub const TAG_REASONING_TOOL: &str = "reasoning.tool";

/// Reserved tag emitted once a tool has run and the model is producing its
/// final answer.
pub const TAG_REASONING_FINAL: &str = "reasoning.final";

/// Reserved tag for a chunk that is neither of the above (thinking output,
/// or a chunk observed before any tool-call signal has appeared).
pub const TAG_REASONING_UNKNOWN: &str = "reasoning.unknown";

/// A delimited sequence of classification tags attached to an [`crate::Event`].
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TagString(String);

impl TagString {
    /// An empty tag string.
    pub fn new() -> Self {
        Self(String::new())
    }

    /// Build a tag string from an existing delimited representation, e.g.
    /// one read back from a persisted event.
    pub fn from_raw(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw delimited representation, suitable for persistence.
    pub fn as_raw(&self) -> &str {
        &self.0
    }

    /// Iterate over the individual segments, in append order.
    pub fn segments(&self) -> impl Iterator<Item = &str> {
        self.0.split(TAG_DELIMITER).filter(|s| !s.is_empty())
    }

    /// Append `segment` unless it is already present. No-op on an empty
    /// segment.
    pub fn append_unique(&mut self, segment: &str) -> Result<()> {
        if segment.is_empty() {
            return Ok(());
        }
        if segment.contains(TAG_DELIMITER) {
            return Err(EventError::InvalidTagSegment(segment.to_string()));
        }
        if self.contains_exact_segment(segment) {
            return Ok(());
        }
        if !self.0.is_empty() {
            self.0.push(TAG_DELIMITER);
        }
        self.0.push_str(segment);
        Ok(())
    }

    /// Whether `segment` appears as a whole segment (not merely a substring
    /// of another segment).
    pub fn contains_exact_segment(&self, segment: &str) -> bool {
        self.segments().any(|s| s == segment)
    }
}

impl std::fmt::Display for TagString {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classify a streaming chat-completion chunk into one of the reserved
/// reasoning tags.
///
/// `has_tool_call_delta` reports whether the chunk itself carries a tool-call
/// id in its delta. `after_tool_ran` is a caller-owned flag tracking whether
/// a tool has already run earlier in this turn; the decider both reads it
/// (to distinguish "final answer" chunks from pre-tool "unknown" chunks) and
/// may set it the first time a tool-call delta is observed.
///
/// See spec calibration scenario S4 for the exhaustive truth table.
pub fn classify_reasoning_tag(has_tool_call_delta: bool, after_tool_ran: &mut bool) -> &'static str {
    if has_tool_call_delta && !*after_tool_ran {
        *after_tool_ran = true;
        TAG_REASONING_TOOL
    } else if *after_tool_ran {
        TAG_REASONING_FINAL
    } else {
        TAG_REASONING_UNKNOWN
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn append_unique_dedupes() {
        let mut t = TagString::new();
        t.append_unique("a").unwrap();
        t.append_unique("b").unwrap();
        t.append_unique("a").unwrap();
        assert_eq!(t.segments().collect::<Vec<_>>(), vec!["a", "b"]);
    }

    #[test]
    fn contains_exact_segment_is_not_substring_match() {
        let mut t = TagString::new();
        t.append_unique("reasoning.tool").unwrap();
        assert!(!t.contains_exact_segment("reasoning"));
        assert!(t.contains_exact_segment("reasoning.tool"));
    }

    #[test]
    fn rejects_segment_with_delimiter() {
        let mut t = TagString::new();
        let bad = format!("a{}b", TAG_DELIMITER);
        assert!(t.append_unique(&bad).is_err());
    }

    // Calibration scenario S4.
    #[test]
    fn reasoning_tag_decider_table() {
        let mut seen = false;
        assert_eq!(classify_reasoning_tag(false, &mut seen), TAG_REASONING_UNKNOWN);
        assert!(!seen);

        let mut after_tool = true;
        assert_eq!(classify_reasoning_tag(false, &mut after_tool), TAG_REASONING_FINAL);

        let mut seen2 = false;
        assert_eq!(classify_reasoning_tag(true, &mut seen2), TAG_REASONING_TOOL);
        assert!(seen2);
    }
}
