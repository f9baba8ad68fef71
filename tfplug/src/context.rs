//! Context implementation for request-scoped data and cancellation
//!
//! This module provides the Context type which carries request-scoped values
//! like cancellation signals, timeouts, and metadata across async boundaries.
//! Contexts form a tree: a child derived with [`Context::with_timeout`] or
//! [`Context::child`] is cancelled when its parent is, never the other way round.

use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::time::{self, Instant};

/// Context carries request-scoped values like cancellation signals, timeouts, and metadata
/// CRITICAL: Pass this as first parameter to ALL async trait methods
/// This enables proper cancellation and timeout handling
#[derive(Clone)]
pub struct Context {
    inner: Arc<ContextInner>,
}

struct ContextInner {
    deadline: Option<Instant>,
    values: RwLock<HashMap<String, Arc<dyn Any + Send + Sync>>>,
    parent: Option<Context>,
    done: watch::Receiver<bool>,
    done_tx: watch::Sender<bool>,
}

impl Context {
    pub fn new() -> Self {
        Self::build(None, None)
    }

    fn build(parent: Option<Context>, deadline: Option<Instant>) -> Self {
        let (done_tx, done_rx) = watch::channel(false);

        Self {
            inner: Arc::new(ContextInner {
                deadline,
                values: RwLock::new(HashMap::new()),
                parent,
                done: done_rx,
                done_tx,
            }),
        }
    }

    /// Derive a child context that is cancelled together with this one
    pub fn child(&self) -> Self {
        let child = Self::build(Some(self.clone()), self.inner.deadline);
        child.watch(None);
        child
    }

    /// Derive a child context whose deadline is the earlier of the parent's
    /// deadline and `now + timeout`
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        let requested = Instant::now() + timeout;
        let deadline = match self.inner.deadline {
            Some(parent_deadline) if parent_deadline < requested => parent_deadline,
            _ => requested,
        };

        let child = Self::build(Some(self.clone()), Some(deadline));
        child.watch(Some(deadline));
        child
    }

    // Flips the done flag when the parent is cancelled or the deadline passes.
    fn watch(&self, deadline: Option<Instant>) {
        let parent = self.inner.parent.clone();
        let done_tx = self.inner.done_tx.clone();

        tokio::spawn(async move {
            let parent_cancelled = async {
                match parent {
                    Some(parent) => parent.cancelled().await,
                    None => std::future::pending::<()>().await,
                }
            };
            let expired = async {
                match deadline {
                    Some(deadline) => time::sleep_until(deadline).await,
                    None => std::future::pending::<()>().await,
                }
            };

            tokio::select! {
                _ = parent_cancelled => {}
                _ = expired => {}
                _ = done_tx.closed() => return,
            }
            let _ = done_tx.send(true);
        });
    }

    pub async fn with_value<T: Send + Sync + 'static>(self, key: &str, value: T) -> Self {
        let mut values = self.inner.values.write().await;
        values.insert(key.to_string(), Arc::new(value));
        drop(values);
        self
    }

    /// Look up a value on this context or the nearest ancestor that has it
    pub async fn get_value<T>(&self, key: &str) -> Option<T>
    where
        T: Send + Sync + Clone + 'static,
    {
        let mut current = Some(self);
        while let Some(ctx) = current {
            let found = {
                let values = ctx.inner.values.read().await;
                values.get(key).and_then(|v| v.downcast_ref::<T>()).cloned()
            };
            if found.is_some() {
                return found;
            }
            current = ctx.inner.parent.as_ref();
        }
        None
    }

    pub fn is_cancelled(&self) -> bool {
        if *self.inner.done.borrow() {
            return true;
        }
        if self.inner.deadline.is_some_and(|d| Instant::now() >= d) {
            return true;
        }
        self.inner
            .parent
            .as_ref()
            .is_some_and(|parent| parent.is_cancelled())
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Time left until the deadline, `None` when the context has no deadline
    pub fn remaining(&self) -> Option<Duration> {
        self.inner
            .deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    /// Returns a channel that's closed when work done on behalf of this
    /// context should be cancelled
    pub fn done(&self) -> watch::Receiver<bool> {
        self.inner.done.clone()
    }

    /// Resolves once this context is cancelled or its deadline passes
    pub async fn cancelled(&self) {
        if self.is_cancelled() {
            return;
        }
        let mut done = self.inner.done.clone();
        // The sender lives in `inner`, so the channel outlives this borrow.
        let _ = done.wait_for(|cancelled| *cancelled).await;
    }

    pub fn cancel(&self) {
        let _ = self.inner.done_tx.send(true);
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("deadline", &self.inner.deadline)
            .field("cancelled", &self.is_cancelled())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::sleep;

    #[tokio::test]
    async fn context_stores_and_retrieves_values() {
        let ctx = Context::new();
        let ctx = ctx.with_value("api_key", "secret123".to_string()).await;

        let value: Option<String> = ctx.get_value("api_key").await;
        assert_eq!(value, Some("secret123".to_string()));
    }

    #[tokio::test]
    async fn child_context_sees_parent_values() {
        let parent = Context::new().with_value("region", "EU_WEST_1".to_string()).await;
        let child = parent.with_timeout(Duration::from_secs(5));

        let value: Option<String> = child.get_value("region").await;
        assert_eq!(value, Some("EU_WEST_1".to_string()));
    }

    #[tokio::test]
    async fn context_timeout_cancels() {
        let ctx = Context::new().with_timeout(Duration::from_millis(100));

        assert!(!ctx.is_cancelled());

        sleep(Duration::from_millis(150)).await;

        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn context_manual_cancel() {
        let ctx = Context::new();

        assert!(!ctx.is_cancelled());

        ctx.cancel();

        assert!(ctx.is_cancelled());
    }

    #[tokio::test]
    async fn cancelling_parent_cancels_child() {
        let parent = Context::new();
        let child = parent.with_timeout(Duration::from_secs(60));

        parent.cancel();
        tokio::time::timeout(Duration::from_secs(1), child.cancelled())
            .await
            .unwrap();

        assert!(child.is_cancelled());
    }

    #[tokio::test]
    async fn cancelling_child_leaves_parent_alone() {
        let parent = Context::new();
        let child = parent.child();

        child.cancel();

        assert!(child.is_cancelled());
        assert!(!parent.is_cancelled());
    }

    #[tokio::test]
    async fn child_deadline_never_exceeds_parent() {
        let parent = Context::new().with_timeout(Duration::from_secs(1));
        let child = parent.with_timeout(Duration::from_secs(3600));

        assert_eq!(child.deadline(), parent.deadline());
        assert!(child.remaining().unwrap() <= Duration::from_secs(1));
    }

    #[tokio::test]
    async fn context_deadline() {
        let ctx = Context::new();
        assert!(ctx.deadline().is_none());
        assert!(ctx.remaining().is_none());

        let ctx_with_timeout = ctx.with_timeout(Duration::from_secs(1));
        assert!(ctx_with_timeout.deadline().is_some());
    }
}
