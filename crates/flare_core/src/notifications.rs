use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::error::UserFacing;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeVariant {
    Default,
    Success,
    Destructive,
}

/// A transient, user-visible notification ("toast").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notice {
    pub id: String,
    pub variant: NoticeVariant,
    pub title: String,
    pub description: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl Notice {
    pub fn new(variant: NoticeVariant, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            variant,
            title: title.into(),
            description: None,
            timestamp: Utc::now(),
        }
    }

    pub fn success(title: impl Into<String>) -> Self {
        Self::new(NoticeVariant::Success, title)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Convert any user-facing error into a notice.
    pub fn from_error<E: UserFacing + ?Sized>(err: &E) -> Self {
        let variant = if err.category().is_destructive() {
            NoticeVariant::Destructive
        } else {
            NoticeVariant::Default
        };
        Self::new(variant, err.title()).with_description(err.user_message())
    }
}

/// Shared, thread-safe queue of pending notices.
///
/// Cloning the centre hands out another handle to the same queue, so async
/// tasks can report outcomes while the front-end drains them.
#[derive(Debug, Clone)]
pub struct NoticeCenter {
    inner: Arc<Mutex<Vec<Notice>>>,
    max_notices: usize,
}

impl NoticeCenter {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Vec::new())),
            max_notices: 20,
        }
    }

    pub fn push(&self, notice: Notice) {
        debug!(title = %notice.title, variant = ?notice.variant, "notice queued");
        let mut queue = self.inner.lock();
        queue.push(notice);
        if queue.len() > self.max_notices {
            let overflow = queue.len() - self.max_notices;
            queue.drain(..overflow);
        }
    }

    /// Queue a notice built from an error.
    pub fn report<E: UserFacing + ?Sized>(&self, err: &E) {
        self.push(Notice::from_error(err));
    }

    pub fn dismiss(&self, id: &str) {
        self.inner.lock().retain(|n| n.id != id);
    }

    /// Take every queued notice, oldest first.
    pub fn drain(&self) -> Vec<Notice> {
        std::mem::take(&mut *self.inner.lock())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().is_empty()
    }
}

impl Default for NoticeCenter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;

    #[derive(Debug, thiserror::Error)]
    enum SampleError {
        #[error("no token address for F-DOGE")]
        Unconfigured,
        #[error("sign in to continue")]
        SignedOut,
        #[error("dns lookup failed")]
        Offline,
    }

    impl UserFacing for SampleError {
        fn category(&self) -> ErrorCategory {
            match self {
                Self::Unconfigured => ErrorCategory::Configuration,
                Self::SignedOut => ErrorCategory::Precondition,
                Self::Offline => ErrorCategory::Network,
            }
        }
    }

    #[test]
    fn notice_with_description() {
        let n = Notice::success("Campaign Created").with_description("Deployed.");
        assert_eq!(n.variant, NoticeVariant::Success);
        assert_eq!(n.title, "Campaign Created");
        assert_eq!(n.description.as_deref(), Some("Deployed."));
    }

    #[test]
    fn from_error_uses_destructive_variant() {
        let err = SampleError::Unconfigured;
        let n = Notice::from_error(&err);
        assert_eq!(n.variant, NoticeVariant::Destructive);
        assert_eq!(n.title, "Configuration Error");
        assert!(n.description.unwrap().contains("F-DOGE"));
    }

    #[test]
    fn precondition_errors_are_not_destructive() {
        let err = SampleError::SignedOut;
        assert_eq!(Notice::from_error(&err).variant, NoticeVariant::Default);
    }

    #[test]
    fn center_drains_in_order() {
        let center = NoticeCenter::new();
        center.push(Notice::success("one"));
        center.push(Notice::success("two"));
        assert_eq!(center.len(), 2);

        let drained = center.drain();
        assert_eq!(drained[0].title, "one");
        assert_eq!(drained[1].title, "two");
        assert!(center.is_empty());
    }

    #[test]
    fn center_drops_oldest_beyond_capacity() {
        let center = NoticeCenter::new();
        for i in 0..25 {
            center.push(Notice::success(format!("n{i}")));
        }
        let drained = center.drain();
        assert_eq!(drained.len(), 20);
        assert_eq!(drained[0].title, "n5");
    }

    #[test]
    fn dismiss_removes_by_id() {
        let center = NoticeCenter::new();
        let n = Notice::success("gone");
        let id = n.id.clone();
        center.push(n);
        center.push(Notice::success("kept"));
        center.dismiss(&id);
        let drained = center.drain();
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].title, "kept");
    }

    #[test]
    fn clones_share_the_queue() {
        let center = NoticeCenter::new();
        let handle = center.clone();
        handle.report(&SampleError::Offline);
        assert_eq!(center.len(), 1);
    }
}
