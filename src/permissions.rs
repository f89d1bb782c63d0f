//! OS-level media permission checks
//!
//! Camera and microphone permissions are granted separately by every
//! platform, so the report carries one status per device kind. These checks
//! never prompt the user; the prompt happens on first device open.

/// Permission status enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionStatus {
    /// Permission granted
    Granted,
    /// Permission denied
    Denied,
    /// Permission not determined (user hasn't been asked yet)
    NotDetermined,
    /// Permission restricted (parental controls, etc)
    Restricted,
}

impl std::fmt::Display for PermissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PermissionStatus::Granted => write!(f, "granted"),
            PermissionStatus::Denied => write!(f, "denied"),
            PermissionStatus::NotDetermined => write!(f, "not_determined"),
            PermissionStatus::Restricted => write!(f, "restricted"),
        }
    }
}

/// Which capture device a permission applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Camera,
    Microphone,
}

/// Detailed permission information for one device kind
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PermissionInfo {
    pub status: PermissionStatus,
    pub message: String,
    pub can_request: bool,
}

/// Combined camera and microphone permission state
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct PermissionReport {
    pub camera: PermissionInfo,
    pub microphone: PermissionInfo,
}

impl PermissionReport {
    /// Both devices are usable.
    pub fn all_granted(&self) -> bool {
        self.camera.status == PermissionStatus::Granted
            && self.microphone.status == PermissionStatus::Granted
    }

    /// At least one device was explicitly denied by the user or policy.
    pub fn any_denied(&self) -> bool {
        matches!(
            self.camera.status,
            PermissionStatus::Denied | PermissionStatus::Restricted
        ) || matches!(
            self.microphone.status,
            PermissionStatus::Denied | PermissionStatus::Restricted
        )
    }
}

/// Check media permission status for one device kind
pub fn check_permission(kind: MediaKind) -> PermissionStatus {
    check_permission_detailed(kind).status
}

/// Check both camera and microphone permissions
pub fn check_permissions() -> PermissionReport {
    PermissionReport {
        camera: check_permission_detailed(MediaKind::Camera),
        microphone: check_permission_detailed(MediaKind::Microphone),
    }
}

/// Check media permission status with detailed information
pub fn check_permission_detailed(kind: MediaKind) -> PermissionInfo {
    #[cfg(target_os = "windows")]
    {
        check_permission_windows(kind)
    }

    #[cfg(target_os = "macos")]
    {
        check_permission_macos(kind)
    }

    #[cfg(target_os = "linux")]
    {
        check_permission_linux(kind)
    }

    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    {
        let _ = kind;
        PermissionInfo {
            status: PermissionStatus::NotDetermined,
            message: "Platform not supported".to_string(),
            can_request: false,
        }
    }
}

#[cfg(target_os = "windows")]
fn check_permission_windows(kind: MediaKind) -> PermissionInfo {
    // On Windows 10+, media access is controlled by Privacy settings.
    // Device enumeration is the usable proxy for both kinds.
    match kind {
        MediaKind::Camera => match nokhwa::query(nokhwa::utils::ApiBackend::Auto) {
            Ok(devices) if !devices.is_empty() => PermissionInfo {
                status: PermissionStatus::Granted,
                message: "Camera access granted via Windows Privacy settings".to_string(),
                can_request: false,
            },
            Ok(_) => PermissionInfo {
                status: PermissionStatus::NotDetermined,
                message: "No cameras found - permission may not be granted".to_string(),
                can_request: true,
            },
            Err(e) => PermissionInfo {
                status: PermissionStatus::Denied,
                message: format!("Camera access denied: {}", e),
                can_request: true,
            },
        },
        MediaKind::Microphone => {
            use cpal::traits::HostTrait;
            if cpal::default_host().default_input_device().is_some() {
                PermissionInfo {
                    status: PermissionStatus::Granted,
                    message: "Microphone access granted via Windows Privacy settings".to_string(),
                    can_request: false,
                }
            } else {
                PermissionInfo {
                    status: PermissionStatus::NotDetermined,
                    message: "No microphones found - permission may not be granted".to_string(),
                    can_request: true,
                }
            }
        }
    }
}

#[cfg(target_os = "macos")]
fn check_permission_macos(kind: MediaKind) -> PermissionInfo {
    use objc::runtime::{Class, Object};
    use objc::{msg_send, sel, sel_impl};
    use std::ffi::CString;

    let (media_type_str, label, settings_pane) = match kind {
        MediaKind::Camera => ("vide", "Camera", "Camera"),
        MediaKind::Microphone => ("soun", "Microphone", "Microphone"),
    };

    unsafe {
        let av_capture_device_class = match Class::get("AVCaptureDevice") {
            Some(c) => c,
            None => {
                return PermissionInfo {
                    status: PermissionStatus::NotDetermined,
                    message: "AVFoundation not available".to_string(),
                    can_request: false,
                }
            }
        };

        let av_media_type = CString::new(media_type_str).unwrap();
        let media_type: *mut Object =
            msg_send![av_capture_device_class, mediaTypeForString: av_media_type.as_ptr()];

        // AVAuthorizationStatus: 0 NotDetermined, 1 Restricted, 2 Denied, 3 Authorized
        let auth_status: i64 =
            msg_send![av_capture_device_class, authorizationStatusForMediaType: media_type];

        match auth_status {
            3 => PermissionInfo {
                status: PermissionStatus::Granted,
                message: format!("{} access authorized", label),
                can_request: false,
            },
            2 => PermissionInfo {
                status: PermissionStatus::Denied,
                message: format!(
                    "{} access denied - enable in System Preferences > Security & Privacy > {}",
                    label, settings_pane
                ),
                can_request: false,
            },
            1 => PermissionInfo {
                status: PermissionStatus::Restricted,
                message: format!("{} access restricted by system policy", label),
                can_request: false,
            },
            _ => PermissionInfo {
                status: PermissionStatus::NotDetermined,
                message: format!("{} permission not yet requested", label),
                can_request: true,
            },
        }
    }
}

#[cfg(target_os = "linux")]
fn check_permission_linux(kind: MediaKind) -> PermissionInfo {
    match kind {
        MediaKind::Camera => check_video_devices_linux(),
        MediaKind::Microphone => {
            use cpal::traits::HostTrait;
            // ALSA/Pulse access has no per-app gate; device presence is the
            // whole story.
            if cpal::default_host().default_input_device().is_some() {
                PermissionInfo {
                    status: PermissionStatus::Granted,
                    message: "Audio input device available".to_string(),
                    can_request: false,
                }
            } else {
                PermissionInfo {
                    status: PermissionStatus::NotDetermined,
                    message: "No audio input devices found".to_string(),
                    can_request: false,
                }
            }
        }
    }
}

#[cfg(target_os = "linux")]
fn check_video_devices_linux() -> PermissionInfo {
    use std::fs;
    use std::path::Path;

    let video_devices: Vec<_> = (0..10)
        .map(|i| format!("/dev/video{}", i))
        .filter(|path| Path::new(path).exists())
        .collect();

    if video_devices.is_empty() {
        return PermissionInfo {
            status: PermissionStatus::NotDetermined,
            message: "No video devices found at /dev/video*".to_string(),
            can_request: false,
        };
    }

    let first_device = &video_devices[0];
    match fs::metadata(first_device) {
        Ok(_metadata) => {
            if check_linux_group_membership() {
                PermissionInfo {
                    status: PermissionStatus::Granted,
                    message: format!(
                        "Camera access granted (user in video group, {} found)",
                        first_device
                    ),
                    can_request: false,
                }
            } else {
                PermissionInfo {
                    status: PermissionStatus::Denied,
                    message: format!("Camera device {} exists but user not in video group - run: sudo usermod -a -G video $USER", first_device),
                    can_request: true,
                }
            }
        }
        Err(e) => PermissionInfo {
            status: PermissionStatus::Denied,
            message: format!("Cannot access {}: {}", first_device, e),
            can_request: true,
        },
    }
}

#[cfg(target_os = "linux")]
fn check_linux_group_membership() -> bool {
    use std::process::Command;

    let output = Command::new("groups").output().ok();

    if let Some(output) = output {
        if let Ok(groups) = String::from_utf8(output.stdout) {
            return groups.contains("video") || groups.contains("plugdev");
        }
    }

    false
}
