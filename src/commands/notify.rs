use crate::notify::NotificationInfo;
use tauri::command;
use uuid::Uuid;

/// Get the notifications still alive, oldest first. Expired ones have
/// already been pruned; stacked messages keep their order.
#[command]
pub async fn poll_notifications() -> Result<Vec<NotificationInfo>, String> {
    Ok(super::SINK.active())
}

/// Dismiss one notification before its auto-dismiss window elapses.
/// Unknown ids are ignored.
#[command]
pub async fn dismiss_notification(id: String) -> Result<(), String> {
    let id = Uuid::parse_str(&id).map_err(|e| format!("invalid notification id: {}", e))?;
    super::SINK.dismiss(id);
    Ok(())
}
