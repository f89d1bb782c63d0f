use crate::config::RecorderConfig;
use tauri::command;

/// Get the active recorder configuration.
#[command]
pub async fn get_recorder_config() -> Result<RecorderConfig, String> {
    Ok(super::CONFIG.read().await.clone())
}

/// Replace the recorder configuration.
///
/// The new values are validated first and apply to the next
/// `initialize_recorder`; a running session keeps the constraints it was
/// built with.
#[command]
pub async fn update_recorder_config(config: RecorderConfig) -> Result<(), String> {
    config.validate().map_err(|e| e.to_string())?;
    let mut current = super::CONFIG.write().await;
    *current = config;
    log::info!(
        "recorder config updated (audio={} video={} container={})",
        current.media.audio,
        current.media.video,
        current.encode.container
    );
    Ok(())
}
