pub mod aggregate;
pub mod audio;
pub mod backend;
pub mod compare;
pub mod dispatch;
pub mod merge;
pub mod pipeline;
pub mod segment;
pub mod transcript;

// Re-export commonly used types for convenience
pub use aggregate::{AggregationError, ChunkResultAggregator};

pub use audio::{
    AudioConverter, AudioProber, AudioProfile, ConversionError, DecodedAudio, FfmpegConverter,
    FfprobeProber, MediaError, NormalizedAudio, SourceFile, TargetProfile,
};

pub use backend::{
    BackendError, BackendKind, BackendProfile, ChunkOutcome, ChunkResult, DomainHints,
    EncodedPayload, FailureKind, GenerativeBackend, GenerativeConfig, PayloadEncoding,
    RecognizerAuth, RecognizerBackend, RecognizerConfig, TranscriptionBackend, create_backend,
    create_backend_by_name, get_supported_backends,
};

pub use compare::{
    ComparisonAnalyzer, ComparisonError, ComparisonReport, ComparisonTotals, PairComparison,
    PairStatus, char_set_similarity,
};

pub use dispatch::ChunkDispatcher;

pub use merge::{MergedDocument, MergedRecordBuilder, MergedSection, Utterance, split_utterances};

pub use pipeline::{BatchResult, FileResult, PipelineSettings, TranscriptionPipeline};

pub use segment::{AudioChunk, ChunkSegmenter, Chunks, SegmentLimits, SegmentationError};

pub use transcript::{NO_CONTENT_SENTINEL, Transcript, is_failure_text};
