//! Captured and derived media blobs.

use std::path::Path;

/// Declared kind of a media blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Video,
    Audio,
}

impl MediaKind {
    /// MIME type used when uploading an artifact of this kind.
    pub fn mime(&self) -> &'static str {
        match self {
            MediaKind::Video => "video/webm",
            MediaKind::Audio => "audio/mpeg",
        }
    }

    /// File name extension used when naming an uploaded artifact.
    pub fn extension(&self) -> &'static str {
        match self {
            MediaKind::Video => "webm",
            MediaKind::Audio => "wav",
        }
    }

    /// Guesses the kind of a pre-recorded file from its extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "webm" | "mp4" | "mov" | "mkv" | "avi" => Some(MediaKind::Video),
            "wav" | "mp3" | "ogg" | "m4a" | "flac" | "aac" => Some(MediaKind::Audio),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MediaKind::Video => write!(f, "video"),
            MediaKind::Audio => write!(f, "audio"),
        }
    }
}

/// An opaque captured or derived media blob.
///
/// Artifacts are immutable once produced and owned by exactly one stage at
/// a time; handing one to another stage moves it. Dropping an artifact
/// releases its memory, which is how superseded recordings are destroyed.
#[derive(Debug)]
pub struct MediaArtifact {
    kind: MediaKind,
    data: Vec<u8>,
}

impl MediaArtifact {
    pub fn new(kind: MediaKind, data: Vec<u8>) -> Self {
        Self { kind, data }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Byte size of the blob.
    pub fn size(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }
}
