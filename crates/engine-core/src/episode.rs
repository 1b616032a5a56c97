use serde::{Deserialize, Serialize};

use crate::ids::{SegmentId, SourceId};

/// Addressable unit of ingestion. Created once per source by an external
/// collaborator and never mutated by the Engine — metadata enrichment is the
/// collaborator's job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Episode {
    pub source_id: SourceId,
    pub title: String,
    /// Total duration in seconds.
    pub duration_seconds: f64,
    pub speakers: Vec<String>,
    pub segments: Vec<Segment>,
}

impl Episode {
    /// Segments are required to be non-overlapping and ordered by `t0`; this
    /// checks that invariant without mutating anything.
    pub fn segments_are_well_ordered(&self) -> bool {
        self.segments
            .windows(2)
            .all(|w| w[0].t1 <= w[1].t0 && w[0].t0 <= w[0].t1)
    }
}

/// Ordered child of an [`Episode`]. `segment_id` is unique within the episode
/// only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub segment_id: SegmentId,
    pub speaker: String,
    pub t0: f64,
    pub t1: f64,
    pub text: String,
}

impl Segment {
    /// Returns the substring of `text` that contains `quote`, case- and
    /// whitespace-insensitively. Used to enforce the provenance invariant:
    /// every extracted item must quote a span within its source segment.
    pub fn contains_quote(&self, quote: &str) -> bool {
        if quote.trim().is_empty() {
            return false;
        }
        normalize(&self.text).contains(&normalize(quote))
    }
}

fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(id: &str, t0: f64, t1: f64, text: &str) -> Segment {
        Segment {
            segment_id: id.into(),
            speaker: "alice".into(),
            t0,
            t1,
            text: text.into(),
        }
    }

    #[test]
    fn detects_overlap() {
        let ep = Episode {
            source_id: "ep1".into(),
            title: "t".into(),
            duration_seconds: 10.0,
            speakers: vec!["alice".into()],
            segments: vec![seg("s1", 0.0, 5.0, "hi"), seg("s2", 4.0, 8.0, "there")],
        };
        assert!(!ep.segments_are_well_ordered());
    }

    #[test]
    fn quote_matching_is_whitespace_and_case_insensitive() {
        let s = seg("s1", 0.0, 5.0, "The Fed   raises rates  again");
        assert!(s.contains_quote("fed raises rates"));
        assert!(!s.contains_quote("fed lowers rates"));
    }
}
