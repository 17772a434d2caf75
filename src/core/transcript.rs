//! Per-file, per-backend transcripts.

use std::time::Duration;

use time::PrimitiveDateTime;

use super::audio::SourceFile;

/// Text used when a file yielded nothing usable.
pub const NO_CONTENT_SENTINEL: &str = "[error: no content recognized]";

/// True when `text` is a file-level failure rather than recognized speech.
///
/// Only the whole-file forms match: the no-content sentinel and a leading
/// `[<backend> error: ...]` tag. Chunk markers followed by recognized text
/// never match, whatever words the text contains.
pub fn is_failure_text(text: &str) -> bool {
    let trimmed = text.trim();
    if trimmed == NO_CONTENT_SENTINEL {
        return true;
    }
    let Some(rest) = trimmed.strip_prefix('[') else {
        return false;
    };
    let Some((tag, _)) = rest.split_once(':') else {
        return false;
    };
    if tag.contains(']') {
        return false;
    }
    let tag = tag.trim().to_lowercase();
    tag == "error" || tag.strip_suffix(" error").is_some_and(|b| !b.is_empty() && !b.contains(' '))
}

/// Reassembled text of one source file from one backend. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub filename: String,
    pub origin: PrimitiveDateTime,
    pub duration: Duration,
    /// Label of the backend that produced the text.
    pub backend: String,
    pub text: String,
}

impl Transcript {
    pub fn new(source: &SourceFile, backend: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            filename: source.name.clone(),
            origin: source.origin,
            duration: source.duration,
            backend: backend.into(),
            text: text.into(),
        }
    }

    /// File-level failure, rendered as `[<backend> error: <detail>]`.
    pub fn failed(source: &SourceFile, backend: &str, detail: impl std::fmt::Display) -> Self {
        Self::new(source, backend, format!("[{backend} error: {detail}]"))
    }

    pub fn is_failure(&self) -> bool {
        is_failure_text(&self.text)
    }

    pub fn char_count(&self) -> usize {
        self.text.chars().count()
    }

    /// Standalone per-file output.
    pub fn render_individual(&self) -> String {
        format!("File: {}\nContent: {}", self.filename, self.text)
    }
}
