use std::collections::HashMap;

/// accumulates non-fatal skip counts for a single pipeline stage invocation,
/// so a caller can log a one-line digest at stage end instead of one log
/// line per skipped feature.
#[derive(Debug, Default, Clone)]
pub struct StageSummary {
    counts: HashMap<&'static str, usize>,
    identifiers: HashMap<&'static str, Vec<String>>,
}

impl StageSummary {
    pub fn new() -> Self {
        Self::default()
    }

    /// records one occurrence of `reason`, tagged with an identifier (way id,
    /// tile name, node id, ...) for later diagnosis.
    pub fn record(&mut self, reason: &'static str, identifier: impl Into<String>) {
        *self.counts.entry(reason).or_insert(0) += 1;
        self.identifiers
            .entry(reason)
            .or_default()
            .push(identifier.into());
    }

    pub fn count(&self, reason: &str) -> usize {
        self.counts.get(reason).copied().unwrap_or(0)
    }

    pub fn identifiers(&self, reason: &str) -> &[String] {
        self.identifiers
            .get(reason)
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn merge(&mut self, other: StageSummary) {
        for (reason, n) in other.counts {
            *self.counts.entry(reason).or_insert(0) += n;
        }
        for (reason, ids) in other.identifiers {
            self.identifiers.entry(reason).or_default().extend(ids);
        }
    }

    /// one-line digest, e.g. `"3 malformed_opening_hours, 1 unreadable_tile"`.
    pub fn digest(&self) -> String {
        if self.counts.is_empty() {
            return "no skips".to_string();
        }
        self.counts
            .iter()
            .map(|(reason, n)| format!("{n} {reason}"))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_digest() {
        let mut s = StageSummary::new();
        s.record("malformed_opening_hours", "way 42");
        s.record("malformed_opening_hours", "way 43");
        s.record("degenerate_mask_window", "building 7");
        assert_eq!(s.count("malformed_opening_hours"), 2);
        assert_eq!(s.count("degenerate_mask_window"), 1);
        assert_eq!(s.identifiers("malformed_opening_hours"), ["way 42", "way 43"]);
        assert!(s.digest().contains("malformed_opening_hours"));
    }

    #[test]
    fn test_merge() {
        let mut a = StageSummary::new();
        a.record("x", "1");
        let mut b = StageSummary::new();
        b.record("x", "2");
        b.record("y", "3");
        a.merge(b);
        assert_eq!(a.count("x"), 2);
        assert_eq!(a.count("y"), 1);
    }
}
