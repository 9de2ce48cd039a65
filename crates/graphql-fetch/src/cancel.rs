//! Cooperative cancellation for in-flight requests.
//!
//! A [`CancellationToken`] is the caller's abort signal. Pass a clone in
//! [`RequestOptions::cancellation`](crate::RequestOptions::cancellation) and
//! call [`cancel`](CancellationToken::cancel) from anywhere to abort the
//! request:
//!
//! ```ignore
//! use graphql_fetch::{CancellationToken, GraphQLRequest, RequestOptions};
//!
//! let token = CancellationToken::new();
//! let options = RequestOptions::new().cancellation(token.clone());
//!
//! tokio::spawn(async move {
//!     tokio::time::sleep(std::time::Duration::from_millis(50)).await;
//!     token.cancel();
//! });
//!
//! let response = executor.execute::<serde_json::Value>(request, options).await;
//! assert_eq!(response.error.as_deref(), Some("Request was aborted"));
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tokio::sync::Notify;

/// A cancellation token for cooperative request cancellation.
///
/// Clones share the same state: cancelling any clone cancels all of them.
/// A [`child_token`](Self::child_token) is cancelled with its parent but can
/// also be cancelled on its own.
#[derive(Debug, Clone)]
pub struct CancellationToken {
    inner: Arc<CancellationState>,
}

#[derive(Debug)]
struct CancellationState {
    cancelled: AtomicBool,
    notify: Notify,
    children: Mutex<Vec<Weak<CancellationState>>>,
}

impl CancellationState {
    fn cancel(&self) {
        if self.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        self.notify.notify_waiters();

        let children = std::mem::take(&mut *self.children.lock());
        for child in children.iter().filter_map(Weak::upgrade) {
            child.cancel();
        }
    }
}

impl CancellationToken {
    /// Create a new, uncancelled token.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(CancellationState {
                cancelled: AtomicBool::new(false),
                notify: Notify::new(),
                children: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Check if cancellation has been requested.
    #[inline]
    pub fn is_cancelled(&self) -> bool {
        self.inner.cancelled.load(Ordering::Acquire)
    }

    /// Request cancellation.
    ///
    /// Idempotent. Every task waiting in [`cancelled`](Self::cancelled) is
    /// woken and every child token is cancelled.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Create a token that is cancelled when this one is.
    ///
    /// Cancelling the child does not affect the parent. A child of an
    /// already-cancelled token starts out cancelled.
    pub fn child_token(&self) -> CancellationToken {
        let child = CancellationToken::new();
        {
            // The parent sets its flag before taking this lock, so a child
            // registered here is always seen by a concurrent cancel().
            let mut children = self.inner.children.lock();
            if !self.is_cancelled() {
                children.retain(|c| c.strong_count() > 0);
                children.push(Arc::downgrade(&child.inner));
                return child;
            }
        }
        child.cancel();
        child
    }

    /// Wait until the token is cancelled.
    ///
    /// Resolves immediately if cancellation was already requested.
    pub async fn cancelled(&self) {
        loop {
            // Register before checking the flag so a concurrent cancel() is not missed.
            let notified = self.inner.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_cancel_is_shared_between_clones() {
        let token = CancellationToken::new();
        let clone = token.clone();
        assert!(!clone.is_cancelled());

        token.cancel();
        assert!(clone.is_cancelled());

        // Second cancel is a no-op.
        clone.cancel();
        assert!(token.is_cancelled());
    }

    #[test]
    fn test_child_token_follows_parent() {
        let parent = CancellationToken::new();
        let child = parent.child_token();
        let grandchild = child.child_token();

        parent.cancel();
        assert!(child.is_cancelled());
        assert!(grandchild.is_cancelled());
    }

    #[test]
    fn test_child_cancel_leaves_parent() {
        let parent = CancellationToken::new();
        let child = parent.child_token();
        let sibling = parent.child_token();

        child.cancel();
        assert!(!parent.is_cancelled());
        assert!(!sibling.is_cancelled());
    }

    #[test]
    fn test_child_of_cancelled_parent() {
        let parent = CancellationToken::new();
        parent.cancel();
        assert!(parent.child_token().is_cancelled());
    }

    #[test]
    fn test_dropped_children_are_pruned() {
        let parent = CancellationToken::new();
        for _ in 0..16 {
            drop(parent.child_token());
        }
        let _live = parent.child_token();
        assert_eq!(parent.inner.children.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_child_waiter_woken_by_parent() {
        let parent = CancellationToken::new();
        let child = parent.child_token();
        let waiter = tokio::spawn(async move { child.cancelled().await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        parent.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("child waiter should be woken")
            .unwrap();
    }

    #[tokio::test]
    async fn test_cancelled_resolves_when_already_cancelled() {
        let token = CancellationToken::new();
        token.cancel();
        tokio::time::timeout(Duration::from_millis(100), token.cancelled())
            .await
            .expect("cancelled() should resolve immediately");
    }

    #[tokio::test]
    async fn test_cancelled_wakes_waiter() {
        let token = CancellationToken::new();
        let waiter = {
            let token = token.clone();
            tokio::spawn(async move { token.cancelled().await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();

        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("waiter should be woken")
            .unwrap();
    }
}
