//! Per-chunk dispatch to one backend.
//!
//! Each call owns its chunk, encodes it the way the backend asks for, checks
//! the encoded size against the backend ceiling, and runs the request under a
//! per-call timeout that also races the job's cancellation token. Every path
//! ends in a [`ChunkOutcome`]; errors never escape this module.

use std::sync::Arc;

use bytes::Bytes;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::audio::{AudioConverter, AudioProfile, ConversionError, TargetProfile, wav};
use super::backend::{
    ChunkOutcome, DomainHints, EncodedPayload, FailureKind, PayloadEncoding, TranscriptionBackend,
};
use super::segment::AudioChunk;

const WAV_MIME_TYPE: &str = "audio/wav";

/// Sends chunks of one file to one backend.
#[derive(Clone)]
pub struct ChunkDispatcher {
    backend: Arc<dyn TranscriptionBackend>,
    converter: Arc<dyn AudioConverter>,
    hints: Arc<DomainHints>,
    cancel: CancellationToken,
}

impl ChunkDispatcher {
    pub fn new(
        backend: Arc<dyn TranscriptionBackend>,
        converter: Arc<dyn AudioConverter>,
        hints: Arc<DomainHints>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            backend,
            converter,
            hints,
            cancel,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.backend.name()
    }

    /// Recognize one chunk. Never fails; failures become outcomes.
    pub async fn transcribe(&self, chunk: AudioChunk) -> ChunkOutcome {
        let index = chunk.index;
        let position = chunk.position();
        let name = self.backend.name();
        let profile = self.backend.profile();

        if self.cancel.is_cancelled() {
            return ChunkOutcome::failed(index, FailureKind::Cancelled);
        }

        let request_timeout = profile.call_timeout(chunk.duration);
        let payload = self.encode(chunk, &profile.encoding).await;

        if !profile.segment_limits().admits(payload.len()) {
            warn!(
                "{} chunk {}: encoded payload {} bytes exceeds ceiling {} bytes, skipping",
                name,
                position,
                payload.len(),
                profile.max_payload_bytes
            );
            return ChunkOutcome::failed(index, FailureKind::PayloadTooLarge);
        }

        debug!(
            "{} chunk {}: sending {} bytes ({})",
            name,
            position,
            payload.len(),
            payload.mime_type
        );

        let call = tokio::time::timeout(
            request_timeout,
            self.backend.recognize(index, payload, &self.hints),
        );

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                info!("{} chunk {}: cancelled", name, position);
                ChunkOutcome::failed(index, FailureKind::Cancelled)
            }
            result = call => match result {
                Ok(Ok(text)) => {
                    debug!("{} chunk {}: {} chars", name, position, text.chars().count());
                    ChunkOutcome::recognized(index, text)
                }
                Ok(Err(e)) => {
                    warn!("{} chunk {} failed: {}", name, position, e);
                    ChunkOutcome::failed(index, e.kind())
                }
                Err(_) => {
                    warn!(
                        "{} chunk {}: no response within {}s",
                        name,
                        position,
                        request_timeout.as_secs()
                    );
                    ChunkOutcome::failed(index, FailureKind::Timeout)
                }
            }
        }
    }

    async fn encode(&self, chunk: AudioChunk, encoding: &PayloadEncoding) -> EncodedPayload {
        let AudioChunk {
            index,
            duration,
            payload,
            sample_rate,
            channels,
            ..
        } = chunk;
        let wav_bytes = Bytes::from(wav::create_wav(&payload, sample_rate, channels));
        drop(payload);

        let wav_payload = |bytes: Bytes| EncodedPayload {
            bytes,
            mime_type: WAV_MIME_TYPE.to_string(),
            sample_rate,
            channels,
        };

        let target = match encoding {
            PayloadEncoding::Wav => return wav_payload(wav_bytes),
            PayloadEncoding::Container(target) => target,
        };

        let source = AudioProfile::classify("pcm_s16le", sample_rate, channels, duration);
        match self.encode_container(&wav_bytes, &source, target).await {
            Ok(bytes) => EncodedPayload {
                bytes,
                mime_type: target.mime_type.clone(),
                sample_rate: target.sample_rate,
                channels: target.channels,
            },
            Err(e) => {
                warn!(
                    "{} chunk {}: {} encoding failed, sending WAV: {}",
                    self.backend.name(),
                    index + 1,
                    target.codec,
                    e
                );
                wav_payload(wav_bytes)
            }
        }
    }

    async fn encode_container(
        &self,
        wav_bytes: &[u8],
        source: &AudioProfile,
        target: &TargetProfile,
    ) -> Result<Bytes, ConversionError> {
        let input = tempfile::Builder::new()
            .prefix("railscribe-chunk-")
            .suffix(".wav")
            .tempfile()?
            .into_temp_path();
        tokio::fs::write(&input, wav_bytes).await?;

        let converted = self.converter.convert(&input, source, target).await?;
        Ok(Bytes::from(converted.read_bytes().await?))
    }
}
