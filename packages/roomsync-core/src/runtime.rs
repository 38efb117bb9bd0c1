//! Task spawning abstraction for runtime independence.
//!
//! This module provides a [`TaskSpawner`] trait that allows the engine to
//! spawn its background work (audio loads, scheduled starts, retry backoffs)
//! without being tied to a specific async runtime. Embedders that own their
//! own runtime (a mobile host, a GUI event loop bridge) provide their own
//! implementation; the headless client uses Tokio directly.

use futures::future::BoxFuture;

/// Abstraction for spawning background tasks.
///
/// Takes a boxed future so the trait stays object-safe and the engine can
/// hold an `Arc<dyn TaskSpawner>`.
///
/// # Example
///
/// ```ignore
/// struct MyService {
///     spawner: Arc<dyn TaskSpawner>,
/// }
///
/// impl MyService {
///     fn start_background_work(&self) {
///         self.spawner.spawn(Box::pin(async {
///             // Background work here
///         }));
///     }
/// }
/// ```
pub trait TaskSpawner: Send + Sync {
    /// Spawns a future as a background task.
    ///
    /// The task runs independently of the caller. Cancellation is the
    /// caller's business (the engine uses cancellation tokens plus
    /// generation checks, never task handles).
    fn spawn(&self, future: BoxFuture<'static, ()>);
}

/// Tokio-based spawner for the headless client and general use.
#[derive(Clone)]
pub struct TokioSpawner {
    handle: tokio::runtime::Handle,
}

impl TokioSpawner {
    /// Creates a new `TokioSpawner` with the given runtime handle.
    #[must_use]
    pub fn new(handle: tokio::runtime::Handle) -> Self {
        Self { handle }
    }

    /// Creates a new `TokioSpawner` using the current runtime's handle.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime context.
    #[must_use]
    pub fn current() -> Self {
        Self {
            handle: tokio::runtime::Handle::current(),
        }
    }
}

impl TaskSpawner for TokioSpawner {
    fn spawn(&self, future: BoxFuture<'static, ()>) {
        self.handle.spawn(future);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn tokio_spawner_executes_task() {
        let spawner = TokioSpawner::current();
        let executed = Arc::new(AtomicBool::new(false));
        let executed_clone = executed.clone();

        spawner.spawn(Box::pin(async move {
            executed_clone.store(true, Ordering::SeqCst);
        }));

        // Give the task time to execute
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;

        assert!(executed.load(Ordering::SeqCst));
    }
}
