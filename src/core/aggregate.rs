//! Reassembly of chunk outcomes into one transcript.
//!
//! This is the only place where partial failure turns into a single string.
//! Outcomes may arrive in any completion order; they are sorted by index and
//! must cover `0..n` exactly.

use thiserror::Error;
use tracing::{debug, warn};

use super::audio::SourceFile;
use super::backend::{ChunkOutcome, ChunkResult};
use super::transcript::{NO_CONTENT_SENTINEL, Transcript};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregationError {
    /// An index is missing or duplicated. Skipped chunks must be reported as
    /// failed outcomes, so this is always a defect upstream.
    #[error("chunk outcomes are not contiguous: expected index {expected}, found {found}")]
    NonContiguous { expected: usize, found: usize },
}

/// Joins chunk outcomes for one (file, backend) pair.
#[derive(Debug, Clone)]
pub struct ChunkResultAggregator {
    backend: String,
}

impl ChunkResultAggregator {
    pub fn new(backend: impl Into<String>) -> Self {
        Self {
            backend: backend.into(),
        }
    }

    pub fn backend(&self) -> &str {
        &self.backend
    }

    pub fn aggregate(
        &self,
        source: &SourceFile,
        mut outcomes: Vec<ChunkOutcome>,
    ) -> Result<Transcript, AggregationError> {
        outcomes.sort_by_key(|o| o.index);

        for (expected, outcome) in outcomes.iter().enumerate() {
            if outcome.index != expected {
                return Err(AggregationError::NonContiguous {
                    expected,
                    found: outcome.index,
                });
            }
        }

        let mut text = String::new();
        let mut failed = 0usize;
        for outcome in &outcomes {
            match &outcome.result {
                ChunkResult::Recognized(recognized) => text.push_str(recognized),
                ChunkResult::Failed(kind) => {
                    failed += 1;
                    text.push_str(&kind.marker(outcome.index + 1));
                }
            }
        }

        if failed == outcomes.len() || text.trim().is_empty() {
            warn!(
                "No content recognized for {} by {} ({} of {} chunks failed)",
                source.name,
                self.backend,
                failed,
                outcomes.len()
            );
            return Ok(Transcript::new(source, &self.backend, NO_CONTENT_SENTINEL));
        }

        debug!(
            "Aggregated {} chunks for {} by {} ({} failed)",
            outcomes.len(),
            source.name,
            self.backend,
            failed
        );
        Ok(Transcript::new(source, &self.backend, text))
    }
}
