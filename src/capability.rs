//! Platform capability probe
//!
//! Checks for the presence of the capture and recording primitives before
//! anything tries to use them, and classifies the host OS family for
//! advisory format decisions. Unsupported conditions are reported to the
//! user, never thrown: the app keeps rendering in a degraded state.

use crate::acquisition::MediaBackend;
use crate::notify::NotificationSink;
use crate::types::{MediaMime, Platform};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CapabilityReport {
    pub platform: Platform,
    /// A camera capture backend is present.
    pub camera: bool,
    /// A microphone capture backend is present.
    pub microphone: bool,
    /// A recording engine is compiled into this build.
    pub recorder: bool,
    /// Containers this platform family is known to restrict. Advisory only;
    /// used to branch format choices, never to block an operation.
    pub restricted_containers: Vec<String>,
}

impl CapabilityReport {
    /// Gather capabilities without user-visible side effects.
    pub fn collect(backend: &dyn MediaBackend) -> Self {
        let platform = Platform::current();
        let restricted_containers = [MediaMime::Mp4, MediaMime::WebM]
            .iter()
            .filter(|m| platform.restricts_container(**m))
            .map(|m| m.as_str().to_string())
            .collect();

        Self {
            platform,
            camera: backend.has_camera_support(),
            microphone: backend.has_microphone_support(),
            recorder: backend.has_recording_support(),
            restricted_containers,
        }
    }

    /// Both capture primitives are present.
    pub fn media_supported(&self) -> bool {
        self.camera && self.microphone
    }

    /// Everything needed for a recording session is present.
    pub fn fully_supported(&self) -> bool {
        self.media_supported() && self.recorder
    }
}

/// Probe capabilities and emit one notification per unsupported condition.
/// Never fails: a degraded report is still a report.
pub fn probe(backend: &dyn MediaBackend, sink: &NotificationSink) -> CapabilityReport {
    let report = CapabilityReport::collect(backend);
    log::info!(
        "capability probe on {}: camera={} microphone={} recorder={}",
        report.platform,
        report.camera,
        report.microphone,
        report.recorder
    );

    if !report.media_supported() {
        sink.error("This system does not support camera and microphone capture");
    }
    if !report.recorder {
        sink.error("Video recording is not supported in this build");
    }
    if !report.restricted_containers.is_empty() {
        log::debug!(
            "platform {} restricts containers: {:?}",
            report.platform,
            report.restricted_containers
        );
    }

    report
}
