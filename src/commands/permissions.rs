use crate::permissions::{check_permissions, PermissionReport};
use tauri::command;

/// Check camera and microphone permission status without prompting.
#[command]
pub async fn check_media_permission_status() -> Result<PermissionReport, String> {
    let report = check_permissions();
    log::debug!(
        "permission status: camera={} microphone={}",
        report.camera.status,
        report.microphone.status
    );
    Ok(report)
}

/// Request camera and microphone access.
///
/// The OS prompt only appears on first device open, so this acquires the
/// media stream through the session controller. Denial is reported to the
/// user as a notification; the returned report carries the outcome.
#[command]
pub async fn request_media_permission() -> Result<PermissionReport, String> {
    let controller = super::controller().await?;
    if let Err(e) = controller.acquire().await {
        log::info!("permission request resolved to: {}", e);
    }
    Ok(check_permissions())
}
