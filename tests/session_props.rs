//! Property-Based Tests for the session view and error classification
//!
//! These verify invariants that must hold for every status/artifact
//! combination and every raw failure string, using proptest for input
//! generation and shrinking.
//!
//! Run with: cargo test --test session_props

use proptest::prelude::*;

use bytes::Bytes;
use camrec::errors::RecorderError;
use camrec::notify::Severity;
use camrec::types::{MediaMime, RecordedArtifact, RecordingStatus};
use camrec::view::view_state;

fn any_status() -> impl Strategy<Value = RecordingStatus> {
    prop::sample::select(vec![
        RecordingStatus::Idle,
        RecordingStatus::AcquiringMedia,
        RecordingStatus::Recording,
        RecordingStatus::Stopped,
        RecordingStatus::Failed,
    ])
}

fn any_mime() -> impl Strategy<Value = MediaMime> {
    prop::sample::select(vec![MediaMime::Mp4, MediaMime::WebM])
}

proptest! {
    /// INVARIANT: Preview and playback are never visible together
    #[test]
    fn preview_and_playback_are_exclusive(
        status in any_status(),
        has_artifact in prop::bool::ANY,
        mime in any_mime(),
    ) {
        let artifact = has_artifact
            .then(|| RecordedArtifact::new(Bytes::from_static(b"blob"), mime));
        let view = view_state(status, artifact.as_ref());
        prop_assert!(!(view.show_preview && view.show_playback));
    }

    /// INVARIANT: Exactly one of start/stop is enabled
    #[test]
    fn start_and_stop_are_complementary(
        status in any_status(),
        has_artifact in prop::bool::ANY,
    ) {
        let artifact = has_artifact
            .then(|| RecordedArtifact::new(Bytes::from_static(b"blob"), MediaMime::Mp4));
        let view = view_state(status, artifact.as_ref());
        prop_assert_ne!(view.start_enabled, view.stop_enabled);
    }

    /// INVARIANT: A download is offered exactly when playback is shown, and
    /// its extension always matches the artifact's encoding
    #[test]
    fn download_tracks_playback_and_encoding(
        status in any_status(),
        has_artifact in prop::bool::ANY,
        mime in any_mime(),
        payload in prop::collection::vec(any::<u8>(), 1..64),
    ) {
        let artifact = has_artifact
            .then(|| RecordedArtifact::new(Bytes::from(payload), mime));
        let view = view_state(status, artifact.as_ref());

        prop_assert_eq!(view.download.is_some(), view.show_playback);
        if let Some(download) = view.download {
            prop_assert!(download.filename.ends_with(mime.extension()));
            prop_assert_eq!(download.mime, mime.as_str());
            prop_assert!(download.size_bytes > 0);
        }
    }

    /// INVARIANT: The view reflects the status it was derived from
    #[test]
    fn view_preserves_status(status in any_status()) {
        let view = view_state(status, None);
        prop_assert_eq!(view.status, status);
    }
}

proptest! {
    /// INVARIANT: Classification is total and the raw cause is preserved
    #[test]
    fn classification_is_total(raw in ".{0,120}") {
        let err = RecorderError::classify_acquisition(&raw);
        prop_assert!(matches!(
            err,
            RecorderError::PermissionDenied(_)
                | RecorderError::DeviceUnavailable(_)
                | RecorderError::Acquisition(_)
        ));
        prop_assert!(err.to_string().contains(&raw));
    }

    /// INVARIANT: Permission wording always classifies as a denial and is
    /// surfaced as an informational message, not an error
    #[test]
    fn permission_wording_is_informational(
        prefix in "[a-zA-Z ]{0,20}",
        word in prop::sample::select(vec!["permission", "denied", "not allowed"]),
    ) {
        let raw = format!("{}{}", prefix, word);
        let err = RecorderError::classify_acquisition(&raw);
        prop_assert!(matches!(err, RecorderError::PermissionDenied(_)));
        prop_assert_eq!(err.severity(), Severity::Info);
    }

    /// INVARIANT: The user message never echoes the raw failure text
    #[test]
    fn user_message_is_stable(raw in "[a-z0-9]{8,24}") {
        let err = RecorderError::classify_acquisition(&raw);
        prop_assert!(!err.user_message().contains(&raw));
    }
}

proptest! {
    /// INVARIANT: Status serialization round-trips through snake_case
    #[test]
    fn status_serde_roundtrip(status in any_status()) {
        let json = serde_json::to_string(&status).unwrap();
        prop_assert_eq!(json.trim_matches('"'), status.as_str());
        let back: RecordingStatus = serde_json::from_str(&json).unwrap();
        prop_assert_eq!(back, status);
    }
}
