//! Tauri command surface
//!
//! One recording session per app, held in a global registry the way the
//! commands are invoked: independently, from the frontend, with no shared
//! handle between calls. Every command returns `Result<T, String>` for the
//! IPC boundary; classified errors have already been pushed to the
//! notification sink by the time they are stringified here.

pub mod config;
pub mod init;
pub mod media;
pub mod notify;
pub mod permissions;
pub mod recording;

pub use config::*;
pub use init::*;
pub use media::*;
pub use notify::*;
pub use permissions::*;
pub use recording::*;

use crate::config::RecorderConfig;
use crate::notify::NotificationSink;
use crate::session::RecordingController;
use std::sync::Arc;
use tokio::sync::RwLock;

lazy_static::lazy_static! {
    pub(crate) static ref SINK: Arc<NotificationSink> =
        Arc::new(NotificationSink::with_default_ttl());

    pub(crate) static ref CONFIG: RwLock<RecorderConfig> =
        RwLock::new(RecorderConfig::default());

    pub(crate) static ref CONTROLLER: RwLock<Option<Arc<RecordingController>>> =
        RwLock::new(None);
}

/// The active session, or a uniform error when `initialize_recorder` has not
/// run yet.
pub(crate) async fn controller() -> Result<Arc<RecordingController>, String> {
    CONTROLLER
        .read()
        .await
        .clone()
        .ok_or_else(|| "Recorder not initialized - call initialize_recorder first".to_string())
}
