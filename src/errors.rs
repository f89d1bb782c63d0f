use crate::notify::Severity;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecorderError {
    /// A required capture or recording primitive is missing from this build
    /// or platform.
    Unsupported(String),
    /// The user (or OS policy) refused camera/microphone access.
    PermissionDenied(String),
    /// The device exists but is claimed by another process.
    DeviceUnavailable(String),
    /// Any other acquisition failure; the raw cause goes to the log only.
    Acquisition(String),
    /// The recording engine failed to start or run.
    Recording(String),
    /// A device was reclaimed or disconnected mid-session.
    DeviceLost(String),
    Io(String),
    #[cfg(feature = "recording")]
    Encoding(String),
    #[cfg(feature = "recording")]
    Muxing(String),
}

impl fmt::Display for RecorderError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            RecorderError::Unsupported(msg) => write!(f, "Unsupported: {}", msg),
            RecorderError::PermissionDenied(msg) => write!(f, "Permission denied: {}", msg),
            RecorderError::DeviceUnavailable(msg) => write!(f, "Device unavailable: {}", msg),
            RecorderError::Acquisition(msg) => write!(f, "Acquisition error: {}", msg),
            RecorderError::Recording(msg) => write!(f, "Recording error: {}", msg),
            RecorderError::DeviceLost(msg) => write!(f, "Device lost: {}", msg),
            RecorderError::Io(msg) => write!(f, "IO error: {}", msg),
            #[cfg(feature = "recording")]
            RecorderError::Encoding(msg) => write!(f, "Encoding error: {}", msg),
            #[cfg(feature = "recording")]
            RecorderError::Muxing(msg) => write!(f, "Muxing error: {}", msg),
        }
    }
}

impl std::error::Error for RecorderError {}

impl RecorderError {
    /// Classify a raw acquisition failure into one of the user-meaningful
    /// categories.
    ///
    /// Capture backends report failures as strings, so this is a best-effort
    /// text classifier. Categories are mutually exclusive: permission wording
    /// wins over busy wording, everything else falls through to `Acquisition`.
    pub fn classify_acquisition(raw: &str) -> Self {
        let lower = raw.to_lowercase();
        if lower.contains("permission")
            || lower.contains("denied")
            || lower.contains("not allowed")
            || lower.contains("unauthorized")
        {
            RecorderError::PermissionDenied(raw.to_string())
        } else if lower.contains("busy")
            || lower.contains("in use")
            || lower.contains("already")
            || lower.contains("resource")
            || lower.contains("not readable")
        {
            RecorderError::DeviceUnavailable(raw.to_string())
        } else {
            RecorderError::Acquisition(raw.to_string())
        }
    }

    /// Notification severity for this error.
    ///
    /// Permission denial is informational: the user is being asked to grant
    /// access, nothing is broken. Everything else is an error.
    pub fn severity(&self) -> Severity {
        match self {
            RecorderError::PermissionDenied(_) => Severity::Info,
            _ => Severity::Error,
        }
    }

    /// Short, classified message shown to the user. The raw cause is never
    /// surfaced verbatim; it is logged for diagnostics instead.
    pub fn user_message(&self) -> &'static str {
        match self {
            RecorderError::Unsupported(_) => {
                "This system does not support the requested capture feature"
            }
            RecorderError::PermissionDenied(_) => {
                "Please allow access to the camera and microphone to use this feature"
            }
            RecorderError::DeviceUnavailable(_) => {
                "The camera or microphone is in use by another application. Close it and try again"
            }
            RecorderError::Acquisition(_) => {
                "An unknown error occurred while accessing the camera and microphone"
            }
            RecorderError::Recording(_) => "Recording failed",
            RecorderError::DeviceLost(_) => {
                "The camera or microphone was disconnected during recording"
            }
            RecorderError::Io(_) => "Could not write the recording to disk",
            #[cfg(feature = "recording")]
            RecorderError::Encoding(_) => "Recording failed while encoding video",
            #[cfg(feature = "recording")]
            RecorderError::Muxing(_) => "Recording failed while finalizing the file",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_permission_wording() {
        let err = RecorderError::classify_acquisition("Access denied by the user");
        assert!(matches!(err, RecorderError::PermissionDenied(_)));
        assert_eq!(err.severity(), Severity::Info);
    }

    #[test]
    fn test_classify_busy_wording() {
        let err = RecorderError::classify_acquisition("Device or resource busy");
        assert!(matches!(err, RecorderError::DeviceUnavailable(_)));
        assert_eq!(err.severity(), Severity::Error);
    }

    #[test]
    fn test_classify_fallback() {
        let err = RecorderError::classify_acquisition("EBADF: something odd");
        assert!(matches!(err, RecorderError::Acquisition(_)));
    }

    #[test]
    fn test_busy_and_denied_messages_differ() {
        let denied = RecorderError::PermissionDenied("x".into());
        let busy = RecorderError::DeviceUnavailable("x".into());
        assert_ne!(denied.user_message(), busy.user_message());
    }

    #[test]
    fn test_display_keeps_raw_detail() {
        let err = RecorderError::DeviceLost("camera 0 unplugged".into());
        assert!(err.to_string().contains("camera 0 unplugged"));
    }
}
