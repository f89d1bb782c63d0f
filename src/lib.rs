//! CamRec: camera and microphone recording for Tauri applications
//!
//! This crate provides the full lifecycle of an in-app recording session:
//! acquiring camera and microphone access, recording to a video container,
//! exposing playback/download of the finished artifact, and surfacing
//! failures as short-lived user notifications instead of thrown errors.
//!
//! # Features
//! - Combined camera + microphone acquisition with all-or-nothing semantics
//! - One-button recording with idempotent start/stop
//! - In-memory H.264/MP4 artifacts ready for playback or download
//! - Device-loss recovery: a mid-recording disconnect finalizes what was
//!   captured instead of hanging the session
//! - Capability probing with graceful degradation on unsupported systems
//!
//! # Usage
//! Add this to your `Cargo.toml`:
//! ```toml
//! [dependencies]
//! camrec = { version = "0.3", features = ["recording"] }
//! tauri = { version = "2.0", features = ["protocol-asset"] }
//! ```
//!
//! Then in your Tauri app:
//! ```rust,ignore
//! use camrec;
//!
//! fn main() {
//!     tauri::Builder::default()
//!         .plugin(camrec::init())
//!         .run(tauri::generate_context!())
//!         .expect("error while running tauri application");
//! }
//! ```
pub mod acquisition;
pub mod capability;
pub mod commands;
pub mod config;
pub mod engine;
pub mod errors;
pub mod notify;
pub mod permissions;
pub mod platform;
pub mod session;
pub mod types;
pub mod view;

// Testing utilities - synthetic media for offline testing
pub mod testing;

// Re-exports for convenience
pub use capability::CapabilityReport;
pub use errors::RecorderError;
pub use notify::{NotificationSink, Severity};
pub use session::RecordingController;
pub use types::{
    ArtifactInfo, MediaConstraints, MediaMime, Platform, RecordedArtifact, RecordingStatus,
    VideoFrame,
};
pub use view::{view_state, ViewState};

use tauri::{
    plugin::{Builder, TauriPlugin},
    Runtime,
};

/// Initialize the CamRec plugin with all commands
pub fn init<R: Runtime>() -> TauriPlugin<R> {
    Builder::new("camrec")
        .invoke_handler(tauri::generate_handler![
            // Initialization commands
            commands::init::initialize_recorder,
            commands::init::get_capability_report,
            commands::init::get_current_platform,
            // Permission commands
            commands::permissions::request_media_permission,
            commands::permissions::check_media_permission_status,
            // Media acquisition commands
            commands::media::acquire_media,
            commands::media::release_media,
            commands::media::get_media_info,
            // Recording lifecycle commands
            commands::recording::start_recording,
            commands::recording::stop_recording,
            commands::recording::get_recording_status,
            commands::recording::get_view_state,
            commands::recording::get_artifact_info,
            commands::recording::save_artifact,
            commands::recording::poll_session_events,
            // Notification commands
            commands::notify::poll_notifications,
            commands::notify::dismiss_notification,
            // Configuration commands
            commands::config::get_recorder_config,
            commands::config::update_recorder_config,
        ])
        .build()
}

/// Detect the current platform using the Platform enum
pub fn current_platform() -> Platform {
    Platform::current()
}

/// Initialize logging for the recorder
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "camrec=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Get crate information
pub fn get_info() -> CrateInfo {
    CrateInfo {
        name: NAME.to_string(),
        version: VERSION.to_string(),
        description: DESCRIPTION.to_string(),
        platform: Platform::current(),
    }
}

/// Crate information structure
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CrateInfo {
    pub name: String,
    pub version: String,
    pub description: String,
    pub platform: Platform,
}

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn test_platform_detection() {
        let platform = current_platform();
        assert_ne!(platform, Platform::Unknown);
    }

    #[test]
    fn test_crate_info() {
        let info = get_info();
        assert_eq!(info.name, "camrec");
        assert!(!info.version.is_empty());
        assert!(!info.description.is_empty());
    }
}
