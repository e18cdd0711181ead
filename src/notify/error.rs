//! Error types for notification delivery

use thiserror::Error;

/// Notification engine error type
#[derive(Error, Debug)]
pub enum NotifyError {
    /// The user declined, or the backend could not tell us otherwise
    #[error("notification permission denied; allow notifications for this app in system settings")]
    PermissionDenied,

    /// Permission has not been requested yet
    #[error("notification permission not determined")]
    PermissionNotDetermined,

    /// The backend rejected the schedule call
    #[error("failed to deliver notification: {0}")]
    DeliveryFailed(String),

    /// Enumeration or removal failed
    #[error("notification backend error")]
    Backend(#[from] anyhow::Error),
}

/// Result type alias for the notification engine
pub type Result<T> = std::result::Result<T, NotifyError>;
