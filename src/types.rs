//! Core data types shared across the crate

use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Host OS family, decided at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Platform {
    Windows,
    MacOS,
    Linux,
    Unknown,
}

impl Platform {
    pub fn current() -> Self {
        #[cfg(target_os = "windows")]
        {
            Platform::Windows
        }
        #[cfg(target_os = "macos")]
        {
            Platform::MacOS
        }
        #[cfg(target_os = "linux")]
        {
            Platform::Linux
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
        {
            Platform::Unknown
        }
    }

    /// Whether this platform family is known to restrict playback of a
    /// container. Advisory: format choices branch on it, operations never
    /// refuse because of it.
    pub fn restricts_container(&self, mime: MediaMime) -> bool {
        matches!((self, mime), (Platform::MacOS, MediaMime::WebM))
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Windows => "windows",
            Platform::MacOS => "macos",
            Platform::Linux => "linux",
            Platform::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Session lifecycle flag. Exactly one value at a time; every transition is
/// driven by the controller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordingStatus {
    Idle,
    AcquiringMedia,
    Recording,
    Stopped,
    Failed,
}

impl RecordingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordingStatus::Idle => "idle",
            RecordingStatus::AcquiringMedia => "acquiring_media",
            RecordingStatus::Recording => "recording",
            RecordingStatus::Stopped => "stopped",
            RecordingStatus::Failed => "failed",
        }
    }
}

impl std::fmt::Display for RecordingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Which capture devices a session asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MediaConstraints {
    pub audio: bool,
    pub video: bool,
}

impl MediaConstraints {
    pub fn audio_video() -> Self {
        Self {
            audio: true,
            video: true,
        }
    }

    pub fn video_only() -> Self {
        Self {
            audio: false,
            video: true,
        }
    }

    pub fn is_empty(&self) -> bool {
        !self.audio && !self.video
    }
}

impl Default for MediaConstraints {
    fn default() -> Self {
        Self::audio_video()
    }
}

/// Container MIME type of a recorded artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MediaMime {
    #[serde(rename = "video/mp4")]
    Mp4,
    #[serde(rename = "video/webm")]
    WebM,
}

impl MediaMime {
    pub fn as_str(&self) -> &'static str {
        match self {
            MediaMime::Mp4 => "video/mp4",
            MediaMime::WebM => "video/webm",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            MediaMime::Mp4 => "mp4",
            MediaMime::WebM => "webm",
        }
    }

    /// Download filename for an artifact in this container. The extension
    /// always matches the encoding.
    pub fn default_filename(&self) -> String {
        format!("recording.{}", self.extension())
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim() {
            "video/mp4" | "mp4" => Some(MediaMime::Mp4),
            "video/webm" | "webm" => Some(MediaMime::WebM),
            _ => None,
        }
    }
}

impl std::fmt::Display for MediaMime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One uncompressed RGB24 frame from the camera.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    /// Packed RGB24, row-major, width*height*3 bytes.
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
    /// Seconds since capture started.
    pub timestamp: f64,
}

impl VideoFrame {
    pub fn new(data: Vec<u8>, width: u32, height: u32, timestamp: f64) -> Self {
        Self {
            data,
            width,
            height,
            timestamp,
        }
    }

    pub fn size_bytes(&self) -> usize {
        self.data.len()
    }
}

/// A finished recording held in memory. `Bytes` makes clones cheap; the
/// controller, the view, and the save path can all hold the same blob.
#[derive(Debug, Clone)]
pub struct RecordedArtifact {
    pub id: Uuid,
    pub data: Bytes,
    pub mime: MediaMime,
    pub created_at: DateTime<Utc>,
}

impl RecordedArtifact {
    pub fn new(data: Bytes, mime: MediaMime) -> Self {
        Self {
            id: Uuid::new_v4(),
            data,
            mime,
            created_at: Utc::now(),
        }
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn filename(&self) -> String {
        self.mime.default_filename()
    }

    /// Serializable summary without the payload.
    pub fn info(&self) -> ArtifactInfo {
        ArtifactInfo {
            id: self.id,
            mime: self.mime.as_str().to_string(),
            filename: self.filename(),
            size_bytes: self.len() as u64,
            created_at: self.created_at,
        }
    }
}

/// What the frontend sees of an artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArtifactInfo {
    pub id: Uuid,
    pub mime: String,
    pub filename: String,
    pub size_bytes: u64,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&RecordingStatus::AcquiringMedia).unwrap();
        assert_eq!(json, "\"acquiring_media\"");
        assert_eq!(RecordingStatus::Idle.as_str(), "idle");
    }

    #[test]
    fn test_mime_roundtrip() {
        assert_eq!(MediaMime::parse("video/mp4"), Some(MediaMime::Mp4));
        assert_eq!(MediaMime::parse("webm"), Some(MediaMime::WebM));
        assert_eq!(MediaMime::parse("video/avi"), None);
        assert_eq!(MediaMime::Mp4.default_filename(), "recording.mp4");
    }

    #[test]
    fn test_constraints_defaults() {
        let c = MediaConstraints::default();
        assert!(c.audio && c.video);
        assert!(!c.is_empty());
        assert!(MediaConstraints {
            audio: false,
            video: false
        }
        .is_empty());
    }

    #[test]
    fn test_webm_restricted_on_macos_only() {
        assert!(Platform::MacOS.restricts_container(MediaMime::WebM));
        assert!(!Platform::MacOS.restricts_container(MediaMime::Mp4));
        assert!(!Platform::Linux.restricts_container(MediaMime::WebM));
        assert!(!Platform::Windows.restricts_container(MediaMime::WebM));
    }

    #[test]
    fn test_artifact_info_matches_payload() {
        let artifact = RecordedArtifact::new(Bytes::from_static(b"abcd"), MediaMime::Mp4);
        let info = artifact.info();
        assert_eq!(info.size_bytes, 4);
        assert_eq!(info.filename, "recording.mp4");
        assert_eq!(info.mime, "video/mp4");
        assert_eq!(info.id, artifact.id);
    }
}
