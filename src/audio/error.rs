use thiserror::Error;

/// Failures a recording session can end with. None of them are fatal to the
/// process; the recorder reports them and the controller recovers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    #[error("permission denied for audio recording")]
    PermissionDenied,
    #[error("audio input unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("error reading audio data: {0}")]
    DeviceReadFailure(String),
    #[error("no audio data recorded")]
    EmptyCapture,
    #[error("failed to write audio artifact: {0}")]
    Artifact(String),
}

impl CaptureError {
    pub fn label(&self) -> &'static str {
        match self {
            CaptureError::PermissionDenied => "permission_denied",
            CaptureError::DeviceUnavailable(_) => "device_unavailable",
            CaptureError::DeviceReadFailure(_) => "device_read_failure",
            CaptureError::EmptyCapture => "empty_capture",
            CaptureError::Artifact(_) => "artifact",
        }
    }
}
