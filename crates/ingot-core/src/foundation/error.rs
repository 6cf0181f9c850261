//! Core error types.
//!
//! Failures in this engine are absorbed close to where they happen: a send
//! failure is logged by the reply agent and never affects dispatch, a hook
//! rejection just moves the call on to the next registered hook. These types
//! exist so those sites have something precise to log.

use thiserror::Error;

// =============================================================================
// Send Errors
// =============================================================================

/// Errors from the transport's send/recall primitives.
#[derive(Debug, Clone, Error)]
pub enum SendError {
    /// The transport failed to deliver the message.
    #[error("failed to send message: {0}")]
    Failed(String),

    /// The target is not reachable (unknown user, left group, …).
    #[error("recipient unavailable: {0}")]
    Unavailable(String),

    /// A recall request failed.
    #[error("failed to recall message '{message_id}': {reason}")]
    RecallFailed {
        /// The message id the recall targeted.
        message_id: String,
        /// Reason for failure.
        reason: String,
    },
}

impl SendError {
    /// Creates a generic send failure.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Result type for transport send operations.
pub type SendResult<T> = Result<T, SendError>;

// =============================================================================
// Hook Errors
// =============================================================================

/// Errors from hook-registry invocation.
#[derive(Debug, Clone, Error)]
pub enum HookError {
    /// No hook is registered under the requested key.
    #[error("no hook registered for key '{0}'")]
    NoHook(String),

    /// The hook looked at the payload and declined; the next registered
    /// hook (by priority) is tried.
    #[error("hook '{namespace}:{key}' declined: {reason}")]
    Declined {
        /// Namespace of the declining hook.
        namespace: String,
        /// Hook key.
        key: String,
        /// Reason given by the hook.
        reason: String,
    },

    /// The hook ran and failed.
    #[error("hook failed: {0}")]
    Failed(String),
}

impl HookError {
    /// Creates a generic hook failure.
    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

/// Result type for hook invocations.
pub type HookResult<T> = Result<T, HookError>;
