//! Unified error handling for buzzd.
//!
//! Store errors are the caller-facing taxonomy. Kernel errors wrap them and add
//! the single condition the serializer itself can produce: being gone.

use thiserror::Error;

// ============================================================================
// Store Errors (caller-facing, recoverable)
// ============================================================================

/// Errors returned by social store operations.
///
/// Every variant is an expected outcome of bad or conflicting input. The
/// operation that produced one has left all state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    #[error("Invalid username")]
    InvalidUsername,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Username taken")]
    UsernameTaken,

    /// Names the username that is not registered.
    #[error("Unknown user: {0}")]
    UnknownUser(String),

    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Follower cannot follow themself")]
    SelfFollow,
}

impl StoreError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidUsername => "invalid_username",
            Self::InvalidPassword => "invalid_password",
            Self::UsernameTaken => "username_taken",
            Self::UnknownUser(_) => "unknown_user",
            Self::InvalidCredentials => "invalid_credentials",
            Self::SelfFollow => "self_follow",
        }
    }
}

// ============================================================================
// Kernel Errors (request serializer)
// ============================================================================

/// Errors returned through a [`KernelHandle`](crate::kernel::KernelHandle).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KernelError {
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The worker has stopped; the request was never applied.
    #[error("kernel unavailable")]
    Unavailable,
}

impl KernelError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Store(e) => e.error_code(),
            Self::Unavailable => "unavailable",
        }
    }
}

/// Result type for kernel requests.
pub type KernelResult<T> = Result<T, KernelError>;

// ============================================================================
// Client Errors (notification delivery)
// ============================================================================

/// Failure to push a notification to a client.
///
/// Local to the one client registration; ends that client's delivery task.
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("client disconnected")]
    Disconnected,

    #[error("delivery failed: {0}")]
    Transport(String),
}

impl ClientError {
    /// Get a static error code string for metrics labeling.
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Transport(_) => "transport",
        }
    }
}
