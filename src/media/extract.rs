//! Audio extraction from recorded video by real-time play-through.

use tokio::time::Instant;

use crate::error::AssessmentError;
use crate::media::artifact::{MediaArtifact, MediaKind};
use crate::media::backend::{encode_wav, MediaBackend};

/// Re-encodes the audio track of a finished video artifact.
///
/// The source is decoded and then replayed against the wall clock while the
/// decoded audio is tapped into a new standalone artifact, so an extraction
/// takes as long as the source media plays. Callers must await it like any
/// other long operation; there is no fast path.
pub struct AudioExtractor<'a> {
    backend: &'a dyn MediaBackend,
}

impl<'a> AudioExtractor<'a> {
    pub fn new(backend: &'a dyn MediaBackend) -> Self {
        Self { backend }
    }

    /// Extracts the audio track of `source` into a new audio artifact.
    ///
    /// The source artifact is not mutated and not retained once the output
    /// exists.
    ///
    /// # Errors
    /// - [`AssessmentError::Decode`] if the source is corrupt or in an
    ///   unsupported format
    pub async fn extract(&self, source: &MediaArtifact) -> Result<MediaArtifact, AssessmentError> {
        let decoded = self.backend.decode_audio(source)?;
        let total = decoded.duration();
        tracing::info!(
            "Extracting audio: {:.1}s of {}Hz media, {} packets",
            total.as_secs_f64(),
            decoded.sample_rate,
            decoded.packets.len()
        );

        let started = Instant::now();
        let channels = decoded.channels.max(1) as usize;
        let mut tapped: Vec<i16> = Vec::new();

        for packet in &decoded.packets {
            // Pace the replay so the tap observes the media in real time
            tokio::time::sleep_until(started + packet.offset).await;
            for frame in packet.samples.chunks_exact(channels) {
                let sum: i32 = frame.iter().map(|&s| s as i32).sum();
                tapped.push((sum / channels as i32) as i16);
            }
        }

        // Let the source play to completion before stopping the tap
        tokio::time::sleep_until(started + total).await;

        let data = encode_wav(&tapped, decoded.sample_rate)
            .map_err(|e| AssessmentError::Decode(format!("failed to encode extracted audio: {e}")))?;
        tracing::info!(
            "Extraction finished in {:.1}s, {} bytes of audio",
            started.elapsed().as_secs_f64(),
            data.len()
        );
        Ok(MediaArtifact::new(MediaKind::Audio, data))
    }
}
