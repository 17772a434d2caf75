//! Fake collaborators for running the pipeline without ffmpeg or network.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;

use railscribe::core::audio::{
    AudioConverter, AudioProber, AudioProfile, ConversionError, MediaError, NormalizedAudio,
    TargetProfile,
};
use railscribe::core::backend::{
    BackendError, BackendProfile, DomainHints, EncodedPayload, PayloadEncoding,
    TranscriptionBackend,
};

/// Probes WAV files with `hound`; anything else is unreadable.
pub struct WavProber;

#[async_trait]
impl AudioProber for WavProber {
    async fn probe(&self, path: &Path) -> Result<AudioProfile, MediaError> {
        let reader = hound::WavReader::open(path).map_err(|e| MediaError::UnreadableMedia {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let spec = reader.spec();
        let frames = reader.duration() as u64;
        if frames == 0 {
            return Err(MediaError::UnreadableMedia {
                path: path.to_path_buf(),
                reason: "zero duration".to_string(),
            });
        }
        let duration = Duration::from_secs_f64(frames as f64 / spec.sample_rate as f64);
        Ok(AudioProfile::classify(
            "pcm_s16le",
            spec.sample_rate,
            spec.channels,
            duration,
        ))
    }
}

/// "Converts" by copying the input into a temp file with the target extension.
#[derive(Default)]
pub struct CopyConverter {
    pub calls: AtomicUsize,
}

#[async_trait]
impl AudioConverter for CopyConverter {
    async fn convert(
        &self,
        input: &Path,
        _source: &AudioProfile,
        target: &TargetProfile,
    ) -> Result<NormalizedAudio, ConversionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let output = tempfile::Builder::new()
            .suffix(&format!(".{}", target.extension))
            .tempfile()?
            .into_temp_path();
        tokio::fs::copy(input, &output).await?;
        Ok(NormalizedAudio::new(output, target.clone(), true))
    }
}

/// Converter whose tool always times out.
#[derive(Default)]
pub struct TimeoutConverter {
    pub calls: AtomicUsize,
}

#[async_trait]
impl AudioConverter for TimeoutConverter {
    async fn convert(
        &self,
        _input: &Path,
        _source: &AudioProfile,
        _target: &TargetProfile,
    ) -> Result<NormalizedAudio, ConversionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(ConversionError::ToolTimeout {
            tool: "ffmpeg".to_string(),
            seconds: 120,
        })
    }
}

pub type Reply = Arc<dyn Fn(usize, usize) -> Result<String, BackendError> + Send + Sync>;

/// Backend whose answer is a function of `(chunk_index, payload_len)`.
pub struct ScriptedBackend {
    name: &'static str,
    profile: BackendProfile,
    reply: Reply,
    delay: Duration,
    pub calls: AtomicUsize,
}

impl ScriptedBackend {
    pub fn new(name: &'static str, window_secs: u64, encoding: PayloadEncoding, reply: Reply) -> Self {
        Self {
            name,
            profile: BackendProfile {
                max_chunk_duration: Duration::from_secs(window_secs),
                max_payload_bytes: 8 * 1024 * 1024,
                request_timeout: Duration::from_secs(30),
                encoding,
            },
            reply,
            delay: Duration::ZERO,
            calls: AtomicUsize::new(0),
        }
    }

    /// Backend that answers `"<name> chunk N"` for every chunk.
    pub fn echo(name: &'static str, window_secs: u64, encoding: PayloadEncoding) -> Self {
        Self::new(
            name,
            window_secs,
            encoding,
            Arc::new(move |index, _| Ok(format!("{name} chunk {}。", index + 1))),
        )
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn with_max_payload_bytes(mut self, bytes: usize) -> Self {
        self.profile.max_payload_bytes = bytes;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptionBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        self.name
    }

    fn profile(&self) -> &BackendProfile {
        &self.profile
    }

    async fn recognize(
        &self,
        chunk_index: usize,
        payload: EncodedPayload,
        _hints: &DomainHints,
    ) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        (self.reply)(chunk_index, payload.len())
    }
}
