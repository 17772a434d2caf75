//! Cross-backend comparison of aligned transcripts.
//!
//! Pairs are taken strictly by position. The caller guarantees both lists
//! describe the same files in the same order; a length mismatch is rejected
//! rather than guessed around.

use std::collections::HashSet;
use std::fmt;
use std::time::Duration;

use thiserror::Error;
use time::PrimitiveDateTime;
use tracing::warn;

use super::audio::now_local;
use super::transcript::Transcript;
use crate::utils::{format_hms, format_timestamp};

const RULE_WIDTH: usize = 80;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ComparisonError {
    #[error("cannot align {left} transcripts with {right} transcripts")]
    AlignmentMismatch { left: usize, right: usize },
}

/// Which side of a pair failed, decided per file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairStatus {
    BothFailed,
    LeftFailedOnly,
    RightFailedOnly,
    BothSucceeded,
}

impl PairStatus {
    pub fn classify(left: &Transcript, right: &Transcript) -> Self {
        match (left.is_failure(), right.is_failure()) {
            (true, true) => Self::BothFailed,
            (true, false) => Self::LeftFailedOnly,
            (false, true) => Self::RightFailedOnly,
            (false, false) => Self::BothSucceeded,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BothFailed => "both-failed",
            Self::LeftFailedOnly => "left-failed-only",
            Self::RightFailedOnly => "right-failed-only",
            Self::BothSucceeded => "both-succeeded",
        }
    }
}

impl fmt::Display for PairStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Distinct-character overlap as a percentage.
///
/// `|A ∩ B| / max(|A|, |B|, 1) * 100` over the sets of distinct characters.
/// Symmetric in its arguments.
pub fn char_set_similarity(left: &str, right: &str) -> f64 {
    let a: HashSet<char> = left.chars().collect();
    let b: HashSet<char> = right.chars().collect();
    let common = a.intersection(&b).count();
    common as f64 / a.len().max(b.len()).max(1) as f64 * 100.0
}

#[derive(Debug, Clone, PartialEq)]
pub struct PairComparison {
    pub filename: String,
    pub duration: Duration,
    pub left_text: String,
    pub right_text: String,
    pub left_chars: usize,
    pub right_chars: usize,
    pub char_difference: usize,
    /// Percentage in `0.0..=100.0`.
    pub similarity: f64,
    pub status: PairStatus,
}

impl PairComparison {
    fn new(left: &Transcript, right: &Transcript) -> Self {
        let left_chars = left.char_count();
        let right_chars = right.char_count();
        Self {
            filename: left.filename.clone(),
            duration: left.duration,
            left_text: left.text.clone(),
            right_text: right.text.clone(),
            left_chars,
            right_chars,
            char_difference: left_chars.abs_diff(right_chars),
            similarity: char_set_similarity(&left.text, &right.text),
            status: PairStatus::classify(left, right),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComparisonTotals {
    pub pairs: usize,
    pub left_chars: usize,
    pub right_chars: usize,
    /// Mean of the per-pair absolute character differences.
    pub mean_difference: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonReport {
    pub left_label: String,
    pub right_label: String,
    pub generated_at: PrimitiveDateTime,
    pub pairs: Vec<PairComparison>,
    pub totals: ComparisonTotals,
}

impl ComparisonReport {
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Status of the pair for `filename`, if present.
    pub fn status_of(&self, filename: &str) -> Option<PairStatus> {
        self.pairs
            .iter()
            .find(|p| p.filename == filename)
            .map(|p| p.status)
    }

    pub fn render(&self) -> String {
        let heavy = "═".repeat(RULE_WIDTH);
        let light = "─".repeat(RULE_WIDTH);
        let plain = "=".repeat(RULE_WIDTH);
        let mut lines = Vec::new();

        lines.push(heavy.clone());
        lines.push(format!(
            "           {} vs {} - Transcript Comparison",
            self.left_label, self.right_label
        ));
        lines.push(heavy.clone());
        lines.push(format!("Generated: {}", format_timestamp(self.generated_at)));
        lines.push(format!("Files: {}", self.pairs.len()));
        lines.push(format!("{heavy}\n"));

        if self.is_empty() {
            lines.push("No comparable records".to_string());
            lines.push(plain);
            return lines.join("\n");
        }

        lines.push("Totals".to_string());
        lines.push(light.clone());
        lines.push(format!("{} total characters: {}", self.left_label, self.totals.left_chars));
        lines.push(format!("{} total characters: {}", self.right_label, self.totals.right_chars));
        lines.push(format!(
            "Mean character difference: {:.1} per file",
            self.totals.mean_difference
        ));
        lines.push(String::new());

        for (i, pair) in self.pairs.iter().enumerate() {
            lines.push(plain.clone());
            lines.push(format!("File {}: {}", i + 1, pair.filename));
            lines.push(format!("Duration: {}", format_hms(pair.duration)));
            lines.push(plain.clone());
            lines.push(String::new());

            for (label, text, chars) in [
                (&self.left_label, &pair.left_text, pair.left_chars),
                (&self.right_label, &pair.right_text, pair.right_chars),
            ] {
                lines.push(format!("[{label} result]"));
                lines.push(light.clone());
                lines.push(text.clone());
                lines.push(format!("(characters: {chars})"));
                lines.push(String::new());
            }

            lines.push("[difference]".to_string());
            lines.push(light.clone());
            lines.push(format!("Character difference: {}", pair.char_difference));
            lines.push(format!("Character set similarity: {:.1}%", pair.similarity));
            lines.push(match pair.status {
                PairStatus::BothFailed => "Status: both failed".to_string(),
                PairStatus::LeftFailedOnly => format!(
                    "Status: {} failed, {} succeeded",
                    self.left_label, self.right_label
                ),
                PairStatus::RightFailedOnly => format!(
                    "Status: {} failed, {} succeeded",
                    self.right_label, self.left_label
                ),
                PairStatus::BothSucceeded => "Status: both succeeded".to_string(),
            });
            lines.push(String::new());
        }

        lines.push(plain.clone());
        lines.push("                        End of comparison".to_string());
        lines.push(plain);
        lines.join("\n")
    }
}

/// Builds a [`ComparisonReport`] from two aligned transcript lists.
#[derive(Debug, Clone)]
pub struct ComparisonAnalyzer {
    left_label: String,
    right_label: String,
    generated_at: Option<PrimitiveDateTime>,
}

impl ComparisonAnalyzer {
    pub fn new(left_label: impl Into<String>, right_label: impl Into<String>) -> Self {
        Self {
            left_label: left_label.into(),
            right_label: right_label.into(),
            generated_at: None,
        }
    }

    pub fn with_generated_at(mut self, generated_at: PrimitiveDateTime) -> Self {
        self.generated_at = Some(generated_at);
        self
    }

    pub fn compare(
        &self,
        left: &[Transcript],
        right: &[Transcript],
    ) -> Result<ComparisonReport, ComparisonError> {
        if left.len() != right.len() {
            return Err(ComparisonError::AlignmentMismatch {
                left: left.len(),
                right: right.len(),
            });
        }

        let pairs: Vec<PairComparison> = left
            .iter()
            .zip(right)
            .map(|(l, r)| {
                if l.filename != r.filename {
                    warn!(
                        "Comparing different files at the same position: '{}' vs '{}'",
                        l.filename, r.filename
                    );
                }
                PairComparison::new(l, r)
            })
            .collect();

        let totals = ComparisonTotals {
            pairs: pairs.len(),
            left_chars: pairs.iter().map(|p| p.left_chars).sum(),
            right_chars: pairs.iter().map(|p| p.right_chars).sum(),
            mean_difference: if pairs.is_empty() {
                0.0
            } else {
                pairs.iter().map(|p| p.char_difference).sum::<usize>() as f64 / pairs.len() as f64
            },
        };

        Ok(ComparisonReport {
            left_label: self.left_label.clone(),
            right_label: self.right_label.clone(),
            generated_at: self.generated_at.unwrap_or_else(now_local),
            pairs,
            totals,
        })
    }
}
