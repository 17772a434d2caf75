//! Chronological merged record across files.
//!
//! Transcripts are ordered by origin timestamp and split into utterances on
//! sentence-ending punctuation. Timestamps and speaker labels are synthesized:
//!
//! - utterance `i` of `n` is stamped at `origin + duration * i / n`, spreading
//!   utterances evenly over the file whatever their real position in the
//!   audio;
//! - speakers alternate A/B per utterance across the whole document, with no
//!   diarization signal behind the labels.
//!
//! Both are approximations for reading convenience, not alignment data.

use std::time::Duration;

use time::PrimitiveDateTime;

use super::audio::now_local;
use super::transcript::Transcript;
use crate::utils::{format_date, format_hms, format_time, format_timestamp};

/// Speaker labels, alternated globally.
pub const SPEAKER_LABELS: [&str; 2] = ["Speaker A", "Speaker B"];

pub const DEFAULT_TITLE: &str = "Radio Communication Record - Merged Transcript";

const RULE_WIDTH: usize = 60;

/// Characters that end an utterance.
const UTTERANCE_BOUNDARIES: &[char] = &['。', '！', '？', '!', '?', '\n'];

// =============================================================================
// Document Model
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub timestamp: PrimitiveDateTime,
    pub speaker: &'static str,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedSection {
    pub filename: String,
    pub duration: Duration,
    pub utterances: Vec<Utterance>,
}

/// Read-only merged view over a set of transcripts.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedDocument {
    pub title: String,
    pub generated_at: PrimitiveDateTime,
    pub total_duration: Duration,
    pub sections: Vec<MergedSection>,
}

impl MergedDocument {
    pub fn file_count(&self) -> usize {
        self.sections.len()
    }

    pub fn utterances(&self) -> impl Iterator<Item = &Utterance> {
        self.sections.iter().flat_map(|s| s.utterances.iter())
    }

    pub fn render(&self) -> String {
        let heavy = "═".repeat(RULE_WIDTH);
        let light = "─".repeat(RULE_WIDTH);
        let mut lines = Vec::new();

        lines.push(heavy.clone());
        lines.push(format!("           {}", self.title));
        lines.push(heavy.clone());
        lines.push(format!("Generated: {}", format_timestamp(self.generated_at)));
        lines.push(format!("Total duration: {}", format_hms(self.total_duration)));
        lines.push(format!("Files: {}", self.file_count()));
        lines.push(format!("{heavy}\n"));
        lines.push(format!("{:<12} {:<12} {}", "date", "time", "utterance"));
        lines.push(light.clone());

        for section in &self.sections {
            for utterance in &section.utterances {
                lines.push(format!(
                    "{:<12} {:<12} {}: {}",
                    format_date(utterance.timestamp),
                    format_time(utterance.timestamp),
                    utterance.speaker,
                    utterance.text
                ));
            }
            lines.push(format!("\n{light}"));
            lines.push(format!(
                "[source: {} | duration: {}]",
                section.filename,
                format_hms(section.duration)
            ));
            lines.push(format!("{light}\n"));
        }

        lines.push(heavy.clone());
        lines.push("                        End of record".to_string());
        lines.push(heavy);
        lines.join("\n")
    }
}

// =============================================================================
// Builder
// =============================================================================

/// Split transcript text into utterances.
///
/// Failure text (anything starting with `[`) is one utterance. Text without
/// a boundary is one utterance.
pub fn split_utterances(text: &str) -> Vec<String> {
    if text.trim_start().starts_with('[') {
        return vec![text.trim().to_string()];
    }

    let parts: Vec<String> = text
        .split(UTTERANCE_BOUNDARIES)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    if parts.is_empty() {
        vec![text.trim().to_string()]
    } else {
        parts
    }
}

/// Offset of utterance `i` of `n` spread evenly over `duration`.
fn spread(duration: Duration, i: usize, n: usize) -> Duration {
    let n = n.max(1) as u128;
    Duration::from_nanos((duration.as_nanos() * i as u128 / n) as u64)
}

#[derive(Debug, Clone)]
pub struct MergedRecordBuilder {
    title: String,
    generated_at: Option<PrimitiveDateTime>,
}

impl Default for MergedRecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl MergedRecordBuilder {
    pub fn new() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            generated_at: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Fix the generation time instead of reading the clock.
    pub fn with_generated_at(mut self, generated_at: PrimitiveDateTime) -> Self {
        self.generated_at = Some(generated_at);
        self
    }

    pub fn build(&self, transcripts: &[Transcript]) -> MergedDocument {
        let mut ordered: Vec<&Transcript> = transcripts.iter().collect();
        ordered.sort_by_key(|t| t.origin);

        let mut speaker = 0usize;
        let sections = ordered
            .into_iter()
            .map(|transcript| {
                let parts = split_utterances(&transcript.text);
                let count = parts.len();
                let utterances = parts
                    .into_iter()
                    .enumerate()
                    .map(|(i, text)| {
                        let offset = spread(transcript.duration, i, count);
                        let utterance = Utterance {
                            timestamp: add_offset(transcript.origin, offset),
                            speaker: SPEAKER_LABELS[speaker % SPEAKER_LABELS.len()],
                            text,
                        };
                        speaker += 1;
                        utterance
                    })
                    .collect();

                MergedSection {
                    filename: transcript.filename.clone(),
                    duration: transcript.duration,
                    utterances,
                }
            })
            .collect();

        MergedDocument {
            title: self.title.clone(),
            generated_at: self.generated_at.unwrap_or_else(now_local),
            total_duration: transcripts.iter().map(|t| t.duration).sum(),
            sections,
        }
    }
}

fn add_offset(origin: PrimitiveDateTime, offset: Duration) -> PrimitiveDateTime {
    match time::Duration::try_from(offset) {
        Ok(offset) => origin.saturating_add(offset),
        Err(_) => origin,
    }
}
