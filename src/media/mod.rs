//! Media capture and audio extraction.
//!
//! Host media APIs (device streams, decode-and-tap) live behind the
//! [`MediaBackend`] capability so the session state machine and the upload
//! pipeline can be exercised without real hardware.

pub mod artifact;
pub mod backend;
pub mod capture;
pub mod extract;

pub use artifact::{MediaArtifact, MediaKind};
pub use backend::{
    AudioPacket, DecodedAudio, DeviceBackend, DeviceStream, FakeBackend, MediaBackend,
    StreamConstraints,
};
pub use capture::{LevelMeter, MediaCapture, NullPreview, PreviewSink};
pub use extract::AudioExtractor;
