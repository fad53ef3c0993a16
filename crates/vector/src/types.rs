use std::fmt;

/// Outcome counters of one embedding run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EmbedStats {
    /// Candidates handed to the embedding function
    pub attempted: usize,

    /// Embeddings normalized and persisted
    pub succeeded: usize,

    /// Candidates left without an embedding
    pub failed: usize,
}

/// Embedding coverage of the store
///
/// `pending` counts articles with comment text and no embedding;
/// `without_text` counts articles that can never be embedded.
///
/// `embedded + pending` equals `total` only when every article has comment
/// text. In general `embedded + pending + without_text == total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusReport {
    pub total: u64,
    pub embedded: u64,
    pub pending: u64,
    pub without_text: u64,
}

impl fmt::Display for StatusReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Articles: {} | Embedded: {} | Pending: {}",
            self.total, self.embedded, self.pending
        )?;
        if self.without_text > 0 {
            write!(f, " | No comment: {}", self.without_text)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        let report = StatusReport { total: 3, embedded: 2, pending: 0, without_text: 1 };
        assert_eq!(report.to_string(), "Articles: 3 | Embedded: 2 | Pending: 0 | No comment: 1");

        let complete = StatusReport { total: 2, embedded: 1, pending: 1, without_text: 0 };
        assert_eq!(complete.to_string(), "Articles: 2 | Embedded: 1 | Pending: 1");
    }
}
