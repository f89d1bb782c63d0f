//! Presentation view model
//!
//! The frontend renders purely from this struct; it never inspects the
//! controller's internals. Deriving it is a pure function of status and
//! artifact, so the render rules are testable without any UI.

use crate::types::{RecordedArtifact, RecordingStatus};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DownloadInfo {
    /// Stable filename; the extension always matches the encoding.
    pub filename: String,
    pub mime: String,
    pub size_bytes: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub status: RecordingStatus,
    /// Live preview is visible only while recording.
    pub show_preview: bool,
    /// Playback is visible only when an artifact exists and we are not
    /// recording over it.
    pub show_playback: bool,
    pub start_enabled: bool,
    pub stop_enabled: bool,
    pub download: Option<DownloadInfo>,
}

pub fn view_state(status: RecordingStatus, artifact: Option<&RecordedArtifact>) -> ViewState {
    let recording = status == RecordingStatus::Recording;
    let show_playback = artifact.is_some() && !recording;
    ViewState {
        status,
        show_preview: recording,
        show_playback,
        start_enabled: !recording,
        stop_enabled: recording,
        download: if show_playback {
            artifact.map(|a| DownloadInfo {
                filename: a.filename(),
                mime: a.mime.as_str().to_string(),
                size_bytes: a.len() as u64,
            })
        } else {
            None
        },
    }
}
