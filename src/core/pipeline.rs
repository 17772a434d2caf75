//! Batch orchestration.
//!
//! Per file: probe, ingest, normalize to the PCM working format (falling back
//! to the original on conversion failure), decode, then run every backend in
//! parallel over the same decoded audio. Per backend: segment by the
//! backend's limits, dispatch chunks concurrently, and aggregate outcomes in
//! index order.
//!
//! Every input path yields exactly one transcript per backend. Media that
//! cannot be read or segmented becomes a failed transcript instead of an
//! error, so one bad file never stops the batch.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::{BoxFuture, Shared, join_all};
use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::aggregate::ChunkResultAggregator;
use super::audio::{
    AudioConverter, AudioProber, AudioProfile, DecodedAudio, FfmpegConverter, FfprobeProber,
    MediaError, SourceFile, TargetProfile,
};
use super::backend::{BackendError, BackendKind, DomainHints, TranscriptionBackend, create_backend};
use super::compare::{ComparisonAnalyzer, ComparisonError, ComparisonReport};
use super::dispatch::ChunkDispatcher;
use super::merge::{MergedDocument, MergedRecordBuilder};
use super::segment::ChunkSegmenter;
use super::transcript::Transcript;
use crate::config::TranscribeConfig;

/// Default number of files processed at once.
pub const DEFAULT_FILE_CONCURRENCY: usize = 2;

/// Default number of in-flight chunk calls per (file, backend).
pub const DEFAULT_CHUNK_CONCURRENCY: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PipelineSettings {
    pub file_concurrency: usize,
    pub chunk_concurrency: usize,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            file_concurrency: DEFAULT_FILE_CONCURRENCY,
            chunk_concurrency: DEFAULT_CHUNK_CONCURRENCY,
        }
    }
}

impl PipelineSettings {
    pub fn from_config(config: &TranscribeConfig) -> Self {
        Self {
            file_concurrency: config.file_concurrency.max(1),
            chunk_concurrency: config.chunk_concurrency.max(1),
        }
    }
}

// =============================================================================
// Results
// =============================================================================

/// Everything produced for one input path.
#[derive(Debug, Clone)]
pub struct FileResult {
    pub source: SourceFile,
    /// `None` when the file could not be probed.
    pub profile: Option<AudioProfile>,
    /// One transcript per backend, in pipeline backend order.
    pub transcripts: Vec<Transcript>,
}

impl FileResult {
    pub fn transcript(&self, backend: &str) -> Option<&Transcript> {
        self.transcripts.iter().find(|t| t.backend == backend)
    }
}

/// Results of a batch, in input order.
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub backends: Vec<String>,
    pub files: Vec<FileResult>,
}

impl BatchResult {
    /// Transcripts of one backend, one per input file, in input order.
    pub fn transcripts_for(&self, backend: &str) -> Vec<Transcript> {
        self.files
            .iter()
            .filter_map(|f| f.transcript(backend).cloned())
            .collect()
    }

    pub fn merged(&self, backend: &str, builder: &MergedRecordBuilder) -> MergedDocument {
        builder.build(&self.transcripts_for(backend))
    }

    /// Compare two backends file by file.
    pub fn compare(&self, left: &str, right: &str) -> Result<ComparisonReport, ComparisonError> {
        self.compare_with(&ComparisonAnalyzer::new(left, right), left, right)
    }

    pub fn compare_with(
        &self,
        analyzer: &ComparisonAnalyzer,
        left: &str,
        right: &str,
    ) -> Result<ComparisonReport, ComparisonError> {
        analyzer.compare(&self.transcripts_for(left), &self.transcripts_for(right))
    }
}

/// A probed and decoded input, shared by every backend lane.
struct PreparedFile {
    source: SourceFile,
    profile: Option<AudioProfile>,
    /// Decoded PCM, or why the file could not be read.
    audio: Result<DecodedAudio, String>,
}

impl PreparedFile {
    fn result(&self, transcripts: Vec<Transcript>) -> FileResult {
        FileResult {
            source: self.source.clone(),
            profile: self.profile.clone(),
            transcripts,
        }
    }
}

// =============================================================================
// Pipeline
// =============================================================================

pub struct TranscriptionPipeline {
    prober: Arc<dyn AudioProber>,
    converter: Arc<dyn AudioConverter>,
    backends: Vec<Arc<dyn TranscriptionBackend>>,
    hints: Arc<DomainHints>,
    settings: PipelineSettings,
}

impl TranscriptionPipeline {
    pub fn new(
        prober: Arc<dyn AudioProber>,
        converter: Arc<dyn AudioConverter>,
        backends: Vec<Arc<dyn TranscriptionBackend>>,
    ) -> Self {
        Self {
            prober,
            converter,
            backends,
            hints: Arc::new(DomainHints::default()),
            settings: PipelineSettings::default(),
        }
    }

    /// Wire the ffmpeg tools and the requested backends from configuration.
    pub fn from_config(
        config: &TranscribeConfig,
        kinds: &[BackendKind],
    ) -> Result<Self, BackendError> {
        if kinds.is_empty() {
            return Err(BackendError::ConfigurationError(
                "At least one backend is required".to_string(),
            ));
        }

        let backends = kinds
            .iter()
            .map(|kind| create_backend(*kind, config))
            .collect::<Result<Vec<_>, _>>()?;

        let prober = FfprobeProber::new(
            &config.ffprobe_path,
            Duration::from_secs(config.probe_timeout_seconds),
        );
        let converter = FfmpegConverter::new(
            &config.ffmpeg_path,
            Duration::from_secs(config.conversion_timeout_seconds),
        );

        Ok(Self::new(Arc::new(prober), Arc::new(converter), backends)
            .with_hints(config.domain_hints())
            .with_settings(PipelineSettings::from_config(config)))
    }

    pub fn with_hints(mut self, hints: DomainHints) -> Self {
        self.hints = Arc::new(hints);
        self
    }

    pub fn with_settings(mut self, settings: PipelineSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn backend_names(&self) -> Vec<String> {
        self.backends.iter().map(|b| b.name().to_string()).collect()
    }

    /// Process every path. Cancelling `cancel` turns in-flight and pending
    /// chunk calls into cancelled outcomes; every file still gets transcripts.
    ///
    /// Each backend walks the batch in its own lane, so a slow backend never
    /// holds back another. Probing and decoding run once per file and are
    /// shared by the lanes.
    pub async fn run(&self, paths: &[PathBuf], cancel: CancellationToken) -> BatchResult {
        info!(
            "Processing {} files with backends [{}]",
            paths.len(),
            self.backend_names().join(", ")
        );

        let prepared: Vec<Shared<BoxFuture<'_, Arc<PreparedFile>>>> = paths
            .iter()
            .map(|path| self.prepare_file(path).boxed().shared())
            .collect();

        if self.backends.is_empty() {
            let files = stream::iter(prepared)
                .map(|file| async move { file.await.result(Vec::new()) })
                .buffered(self.settings.file_concurrency.max(1))
                .collect::<Vec<_>>()
                .await;
            return BatchResult {
                backends: Vec::new(),
                files,
            };
        }

        let lanes = join_all(self.backends.iter().map(|backend| {
            self.run_lane(backend.clone(), prepared.clone(), cancel.clone())
        }));
        // Lanes own their handles; decoded audio is freed once every lane is past a file.
        drop(prepared);
        let lanes = lanes.await;

        let mut lanes = lanes.into_iter();
        let mut files = lanes.next().unwrap_or_default();
        for lane in lanes {
            for (file, other) in files.iter_mut().zip(lane) {
                file.transcripts.extend(other.transcripts);
            }
        }

        BatchResult {
            backends: self.backend_names(),
            files,
        }
    }

    /// One backend over every file, in input order. Each result carries
    /// that backend's transcript only.
    async fn run_lane(
        &self,
        backend: Arc<dyn TranscriptionBackend>,
        files: Vec<Shared<BoxFuture<'_, Arc<PreparedFile>>>>,
        cancel: CancellationToken,
    ) -> Vec<FileResult> {
        stream::iter(files)
            .map(|file| {
                let backend = backend.clone();
                let cancel = cancel.clone();
                async move {
                    let file = file.await;
                    let transcript = self.transcribe_prepared(backend, &file, cancel).await;
                    file.result(vec![transcript])
                }
            })
            .buffered(self.settings.file_concurrency.max(1))
            .collect()
            .await
    }

    /// Process a single file with every backend.
    pub async fn process_file(&self, path: &Path, cancel: CancellationToken) -> FileResult {
        let file = self.prepare_file(path).await;
        let transcripts = join_all(
            self.backends
                .iter()
                .map(|backend| self.transcribe_prepared(backend.clone(), &file, cancel.clone())),
        )
        .await;
        file.result(transcripts)
    }

    async fn transcribe_prepared(
        &self,
        backend: Arc<dyn TranscriptionBackend>,
        file: &PreparedFile,
        cancel: CancellationToken,
    ) -> Transcript {
        match &file.audio {
            Ok(audio) => self.transcribe_with(backend, &file.source, audio, cancel).await,
            Err(reason) => Transcript::failed(&file.source, backend.name(), reason),
        }
    }

    /// Probe, ingest and decode one file.
    async fn prepare_file(&self, path: &Path) -> Arc<PreparedFile> {
        let profile = match self.prober.probe(path).await {
            Ok(profile) => profile,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                let source = SourceFile::ingest(path, Duration::ZERO).await;
                return Arc::new(PreparedFile {
                    source,
                    profile: None,
                    audio: Err(e.to_string()),
                });
            }
        };

        for warning in profile.warnings() {
            warn!("{}: {}", path.display(), warning);
        }

        let source = SourceFile::ingest(path, profile.duration).await;
        info!(
            "Loaded {} ({}, {} Hz, {} ch, {:.1}s)",
            source.name,
            profile.codec,
            profile.sample_rate,
            profile.channels,
            profile.duration.as_secs_f64()
        );

        let audio = self.prepare_audio(path, &profile).await.map_err(|e| {
            warn!("Cannot decode {}: {}", source.name, e);
            e.to_string()
        });

        Arc::new(PreparedFile {
            source,
            profile: Some(profile),
            audio,
        })
    }

    /// Decode `path` into PCM, converting to the working profile first when
    /// the source needs it. Conversion failure falls back to the original.
    async fn prepare_audio(&self, path: &Path, profile: &AudioProfile) -> Result<DecodedAudio, MediaError> {
        let working = TargetProfile::pcm_wav();

        if !profile.needs_normalization && working.is_satisfied_by(profile, path) {
            return decode(path.to_path_buf()).await;
        }

        match self.converter.convert(path, profile, &working).await {
            Ok(normalized) => {
                debug!(
                    "Working copy of {} at {} (converted: {})",
                    path.display(),
                    normalized.path().display(),
                    normalized.converted
                );
                decode(normalized.path().to_path_buf()).await
            }
            Err(e) => {
                warn!(
                    "Normalization of {} failed, using original audio: {}",
                    path.display(),
                    e
                );
                decode(path.to_path_buf()).await
            }
        }
    }

    async fn transcribe_with(
        &self,
        backend: Arc<dyn TranscriptionBackend>,
        source: &SourceFile,
        audio: &DecodedAudio,
        cancel: CancellationToken,
    ) -> Transcript {
        let name = backend.name();

        let chunks = match ChunkSegmenter::new(backend.profile().segment_limits())
            .and_then(|segmenter| segmenter.segment(audio))
        {
            Ok(chunks) => chunks,
            Err(e) => {
                warn!("{}: cannot segment {}: {}", name, source.name, e);
                return Transcript::failed(source, name, e);
            }
        };

        info!(
            "{}: {} chunk(s) for {} (window {}s)",
            name,
            chunks.len(),
            source.name,
            backend.profile().max_chunk_duration.as_secs()
        );

        let dispatcher = ChunkDispatcher::new(backend, self.converter.clone(), self.hints.clone(), cancel);
        let outcomes = stream::iter(chunks)
            .map(|chunk| dispatcher.transcribe(chunk))
            .buffer_unordered(self.settings.chunk_concurrency.max(1))
            .collect::<Vec<_>>()
            .await;

        match ChunkResultAggregator::new(name).aggregate(source, outcomes) {
            Ok(transcript) => transcript,
            Err(e) => {
                warn!("{}: {} for {}", name, e, source.name);
                Transcript::failed(source, name, e)
            }
        }
    }
}

async fn decode(path: PathBuf) -> Result<DecodedAudio, MediaError> {
    let display = path.clone();
    tokio::task::spawn_blocking(move || DecodedAudio::from_wav_file(&path))
        .await
        .map_err(|e| MediaError::UnreadableMedia {
            path: display,
            reason: format!("decode task failed: {e}"),
        })?
}
