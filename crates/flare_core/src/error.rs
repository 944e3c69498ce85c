use serde::{Deserialize, Serialize};

/// Classification of errors for logging and user display.
///
/// Mirrors the states a front-end has to render differently: a pending
/// lookup shows a spinner, a missing entity shows a "not found" page, the
/// rest become transient notices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Data has not arrived yet.
    Pending,
    /// A lookup resolved without a usable result.
    NotFound,
    /// A required mapping or setting is absent.
    Configuration,
    /// The user declined a wallet prompt.
    UserRejected,
    /// The ledger reverted a transaction.
    Reverted,
    /// An external service (AI, RPC node) failed.
    Service,
    /// Transport-level failure.
    Network,
    /// Form-level validation failed.
    Validation,
    /// A precondition (wallet, identity, verification) is unmet.
    Precondition,
}

impl ErrorCategory {
    /// Whether the error should be rendered with destructive styling.
    pub fn is_destructive(self) -> bool {
        !matches!(self, Self::Pending | Self::Precondition)
    }
}

/// Errors that can be shown to a user.
///
/// Every crate error in the workspace implements this so callers can turn
/// any failure into a [`crate::Notice`] without matching on the concrete type.
pub trait UserFacing: std::fmt::Display {
    /// Broad category for routing and styling.
    fn category(&self) -> ErrorCategory;

    /// Message safe to show to the user (hides transport internals).
    fn user_message(&self) -> String {
        self.to_string()
    }

    /// Short title for the notification.
    fn title(&self) -> &'static str {
        match self.category() {
            ErrorCategory::Pending => "Loading",
            ErrorCategory::NotFound => "Not Found",
            ErrorCategory::Configuration => "Configuration Error",
            ErrorCategory::UserRejected => "Request Rejected",
            ErrorCategory::Reverted => "Transaction Failed",
            ErrorCategory::Service => "Service Unavailable",
            ErrorCategory::Network => "Network Error",
            ErrorCategory::Validation => "Invalid Input",
            ErrorCategory::Precondition => "Action Unavailable",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    enum SampleError {
        #[error("missing factory address")]
        Config,
        #[error("poisoned lock at 0xdeadbeef")]
        Internal,
    }

    impl UserFacing for SampleError {
        fn category(&self) -> ErrorCategory {
            match self {
                Self::Config => ErrorCategory::Configuration,
                Self::Internal => ErrorCategory::Service,
            }
        }
    }

    #[test]
    fn default_title_follows_category() {
        assert_eq!(SampleError::Config.title(), "Configuration Error");
        assert_eq!(SampleError::Internal.title(), "Service Unavailable");
    }

    #[test]
    fn default_message_is_display() {
        assert_eq!(SampleError::Config.user_message(), "missing factory address");
    }

    #[test]
    fn precondition_is_not_destructive() {
        assert!(!ErrorCategory::Precondition.is_destructive());
        assert!(!ErrorCategory::Pending.is_destructive());
        assert!(ErrorCategory::Reverted.is_destructive());
    }

    #[test]
    fn category_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorCategory::UserRejected).unwrap();
        assert_eq!(json, "\"user_rejected\"");
    }
}
