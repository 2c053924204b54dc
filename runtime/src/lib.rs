//! # Classbook Runtime
//!
//! Runtime implementation for the Classbook reducer architecture.
//!
//! This crate provides the Store runtime that coordinates reducer execution
//! and effect handling.
//!
//! ## Core Components
//!
//! - **Store**: The runtime that manages state and executes effects
//! - **Effect Executor**: Executes effect descriptions and feeds actions back to reducers
//! - **Cancellation**: Tasks spawned under [`Effect::Cancellable`] can be aborted by id
//!
//! ## Example
//!
//! ```ignore
//! use classbook_runtime::Store;
//!
//! let store = Store::new(
//!     initial_state,
//!     my_reducer,
//!     environment,
//! );
//!
//! // Send an action
//! store.send(Action::DoSomething).await?;
//!
//! // Read state
//! let value = store.state(|s| s.some_field).await;
//! ```

use classbook_core::{
    effect::{Effect, EffectId},
    reducer::Reducer,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{watch, RwLock};
use tokio::task::AbortHandle;

/// Prometheus metrics for observability
pub mod metrics;

/// Error types for the Store runtime
pub mod error {
    use thiserror::Error;

    /// Errors that can occur during Store operations
    #[derive(Error, Debug)]
    pub enum StoreError {
        /// Store is shutting down and not accepting new actions
        ///
        /// This error is returned when `send()` is called after shutdown initiated.
        #[error("Store is shutting down")]
        ShutdownInProgress,

        /// Shutdown timed out waiting for effects to complete
        ///
        /// Some effects were still running when the timeout elapsed.
        #[error("Shutdown timed out with {0} effects still running")]
        ShutdownTimeout(usize),
    }
}

pub use error::StoreError;

/// Handle for tracking effect completion
///
/// Returned by [`Store::send()`] to allow waiting for the effects started by
/// that action. Effects produced later by feedback actions are not tracked.
///
/// # Example
///
/// ```ignore
/// let mut handle = store.send(Action::Start).await?;
/// handle.wait().await;
/// ```
#[derive(Clone)]
pub struct EffectHandle {
    effects: Arc<AtomicUsize>,
    completion: watch::Receiver<()>,
}

impl EffectHandle {
    fn new() -> (Self, EffectTracking) {
        let counter = Arc::new(AtomicUsize::new(0));
        let (tx, rx) = watch::channel(());

        let handle = Self {
            effects: Arc::clone(&counter),
            completion: rx,
        };

        let tracking = EffectTracking {
            counter,
            notifier: Arc::new(tx),
        };

        (handle, tracking)
    }

    /// Number of tracked effects still running
    #[must_use]
    pub fn pending(&self) -> usize {
        self.effects.load(Ordering::SeqCst)
    }

    /// Wait for all tracked effects to complete
    ///
    /// Aborted effects count as complete.
    pub async fn wait(&mut self) {
        while self.effects.load(Ordering::SeqCst) > 0 {
            if self.completion.changed().await.is_err() {
                break;
            }
        }
    }

}

impl std::fmt::Debug for EffectHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectHandle")
            .field("pending_effects", &self.effects.load(Ordering::SeqCst))
            .finish_non_exhaustive()
    }
}

/// Internal: effect tracking context passed through effect execution
#[derive(Clone)]
struct EffectTracking {
    counter: Arc<AtomicUsize>,
    notifier: Arc<watch::Sender<()>>,
}

impl EffectTracking {
    fn detached() -> (Self, watch::Receiver<()>) {
        let (tx, rx) = watch::channel(());
        (
            Self {
                counter: Arc::new(AtomicUsize::new(0)),
                notifier: Arc::new(tx),
            },
            rx,
        )
    }

    fn increment(&self) {
        self.counter.fetch_add(1, Ordering::SeqCst);
    }

    fn decrement(&self) {
        if self.counter.fetch_sub(1, Ordering::SeqCst) == 1 {
            let _ = self.notifier.send(());
        }
    }

    fn is_idle(&self) -> bool {
        self.counter.load(Ordering::SeqCst) == 0
    }
}

/// Internal: RAII guard that decrements effect counter on drop
///
/// Runs on completion, on panic and when the task is aborted.
struct DecrementGuard(EffectTracking);

impl Drop for DecrementGuard {
    fn drop(&mut self) {
        self.0.decrement();
    }
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Internal: abort handles of in-flight tasks, grouped by cancellation id
#[derive(Clone, Default)]
struct CancellationRegistry {
    tasks: Arc<Mutex<HashMap<EffectId, Vec<AbortHandle>>>>,
}

impl CancellationRegistry {
    fn register(&self, id: &EffectId, handle: AbortHandle) {
        let Ok(mut tasks) = self.tasks.lock() else {
            tracing::error!(%id, "Cancellation registry poisoned, task not registered");
            return;
        };
        let entry = tasks.entry(id.clone()).or_default();
        entry.retain(|h| !h.is_finished());
        entry.push(handle);
    }

    fn cancel(&self, id: &EffectId) -> usize {
        let Ok(mut tasks) = self.tasks.lock() else {
            tracing::error!(%id, "Cancellation registry poisoned, nothing cancelled");
            return 0;
        };
        let Some(handles) = tasks.remove(id) else {
            return 0;
        };
        let mut aborted = 0;
        for handle in handles {
            if !handle.is_finished() {
                handle.abort();
                aborted += 1;
            }
        }
        aborted
    }

    fn pending(&self, id: &EffectId) -> usize {
        self.tasks.lock().map_or(0, |tasks| {
            tasks
                .get(id)
                .map_or(0, |handles| handles.iter().filter(|h| !h.is_finished()).count())
        })
    }
}

/// Store runtime for coordinating reducer execution and effect handling.
pub mod store {
    use super::{
        Arc, AtomicBool, AtomicCounterGuard, AtomicUsize, CancellationRegistry, DecrementGuard,
        Duration, Effect, EffectHandle, EffectId, EffectTracking, Ordering, Reducer, RwLock,
        StoreError,
    };
    use std::future::Future;

    /// The Store - runtime coordinator for a reducer
    ///
    /// The Store manages:
    /// 1. State (behind `RwLock` for concurrent access)
    /// 2. Reducer (business logic)
    /// 3. Environment (injected dependencies)
    /// 4. Effect execution (with feedback loop and cancellation)
    ///
    /// # Type Parameters
    ///
    /// - `S`: State type
    /// - `A`: Action type
    /// - `E`: Environment type
    /// - `R`: Reducer implementation
    pub struct Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E>,
    {
        state: Arc<RwLock<S>>,
        reducer: R,
        environment: E,
        shutdown: Arc<AtomicBool>,
        pending_effects: Arc<AtomicUsize>,
        cancellations: CancellationRegistry,
    }

    impl<S, A, E, R> Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Send + Sync + 'static,
        A: Send + Clone + 'static,
        S: Send + Sync + 'static,
        E: Send + Sync + 'static,
    {
        /// Create a new store with initial state, reducer, and environment
        #[must_use]
        pub fn new(initial_state: S, reducer: R, environment: E) -> Self {
            Self {
                state: Arc::new(RwLock::new(initial_state)),
                reducer,
                environment,
                shutdown: Arc::new(AtomicBool::new(false)),
                pending_effects: Arc::new(AtomicUsize::new(0)),
                cancellations: CancellationRegistry::default(),
            }
        }

        /// Initiate graceful shutdown of the store
        ///
        /// 1. Stops accepting new actions
        /// 2. Waits for in-flight effects to finish (or be cancelled)
        /// 3. Returns once idle or when the timeout elapses
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownTimeout`] if the timeout expires before all
        /// pending effects complete.
        pub async fn shutdown(&self, timeout: Duration) -> Result<(), StoreError> {
            tracing::info!("Initiating graceful shutdown");
            metrics::counter!("store.shutdown.initiated").increment(1);

            self.shutdown.store(true, Ordering::Release);

            let start = tokio::time::Instant::now();
            let poll_interval = Duration::from_millis(100);

            loop {
                let pending = self.pending_effects.load(Ordering::Acquire);

                if pending == 0 {
                    tracing::info!("All effects completed, shutdown successful");
                    metrics::counter!("store.shutdown.completed").increment(1);
                    return Ok(());
                }

                if start.elapsed() >= timeout {
                    tracing::error!(pending_effects = pending, "Shutdown timeout");
                    metrics::counter!("store.shutdown.timeout").increment(1);
                    return Err(StoreError::ShutdownTimeout(pending));
                }

                tracing::debug!(
                    pending_effects = pending,
                    elapsed_ms = start.elapsed().as_millis(),
                    "Waiting for effects to complete"
                );

                tokio::time::sleep(poll_interval).await;
            }
        }

        /// Send an action to the store
        ///
        /// 1. Acquires write lock on state
        /// 2. Calls reducer with (state, action, environment)
        /// 3. Executes returned effects asynchronously
        /// 4. Effects may produce more actions (feedback loop)
        ///
        /// Concurrent `send()` calls serialize at the reducer level, so every
        /// action observes the state left by the previous one.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        pub async fn send(&self, action: A) -> Result<EffectHandle, StoreError>
        where
            R: Clone,
            E: Clone,
        {
            self.send_and_inspect(action, |_| ()).await.map(|(handle, ())| handle)
        }

        /// Send an action and read the state it left behind
        ///
        /// `inspect` runs under the same write lock as the reducer, before any
        /// effect is started, so no feedback action can land in between.
        ///
        /// # Errors
        ///
        /// Returns [`StoreError::ShutdownInProgress`] if the store is shutting down.
        #[tracing::instrument(skip(self, action, inspect), name = "store_send")]
        pub async fn send_and_inspect<F, T>(
            &self,
            action: A,
            inspect: F,
        ) -> Result<(EffectHandle, T), StoreError>
        where
            R: Clone,
            E: Clone,
            F: FnOnce(&S) -> T,
        {
            if self.shutdown.load(Ordering::Acquire) {
                tracing::warn!("Rejected action: store is shutting down");
                metrics::counter!("store.shutdown.rejected_actions").increment(1);
                return Err(StoreError::ShutdownInProgress);
            }

            tracing::debug!("Processing action");
            metrics::counter!("store.commands.total").increment(1);

            let (handle, tracking) = EffectHandle::new();

            let (effects, inspected) = {
                let mut state = self.state.write().await;

                let span = tracing::debug_span!("reducer_execution");
                let _enter = span.enter();

                let start = std::time::Instant::now();
                let effects = self.reducer.reduce(&mut *state, action, &self.environment);
                metrics::histogram!("store.reducer.duration_seconds")
                    .record(start.elapsed().as_secs_f64());

                tracing::trace!("Reducer completed, returned {} effects", effects.len());

                // Precision loss acceptable for metrics
                #[allow(clippy::cast_precision_loss)]
                metrics::histogram!("store.effects.count").record(effects.len() as f64);

                (effects, inspect(&*state))
            };

            for effect in effects {
                self.execute_effect_internal(effect, &tracking, None);
            }

            Ok((handle, inspected))
        }

        /// Read current state via a closure
        ///
        /// ```ignore
        /// let phase = store.state(|s| s.phase.name()).await;
        /// ```
        pub async fn state<F, T>(&self, f: F) -> T
        where
            F: FnOnce(&S) -> T,
        {
            let state = self.state.read().await;
            f(&*state)
        }

        /// Number of unfinished tasks registered under a cancellation id
        #[must_use]
        pub fn pending_cancellable(&self, id: &EffectId) -> usize {
            self.cancellations.pending(id)
        }

        /// Spawn an effect task with completion tracking
        ///
        /// The guards are created before spawning so the counters are released
        /// even if the task is aborted before it is first polled.
        fn spawn_tracked<F>(&self, tracking: &EffectTracking, scope: Option<&EffectId>, task: F)
        where
            F: Future<Output = ()> + Send + 'static,
        {
            tracking.increment();
            self.pending_effects.fetch_add(1, Ordering::SeqCst);

            let guard = DecrementGuard(tracking.clone());
            let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));

            let handle = tokio::spawn(async move {
                let _guard = guard;
                let _pending_guard = pending_guard;
                task.await;
            });

            if let Some(id) = scope {
                self.cancellations.register(id, handle.abort_handle());
            }
        }

        /// Execute an effect with tracking
        ///
        /// Effect execution failures are isolated in their spawned tasks: a
        /// panicking effect is logged by tokio and the store keeps running.
        /// `scope` is the innermost enclosing cancellation id, if any.
        #[tracing::instrument(skip(self, effect, tracking, scope), name = "execute_effect")]
        fn execute_effect_internal(
            &self,
            effect: Effect<A>,
            tracking: &EffectTracking,
            scope: Option<&EffectId>,
        ) where
            R: Clone,
            E: Clone,
        {
            match effect {
                Effect::None => {
                    metrics::counter!("store.effects.executed", "type" => "none").increment(1);
                },
                Effect::Future(fut) => {
                    tracing::trace!("Executing Effect::Future");
                    metrics::counter!("store.effects.executed", "type" => "future").increment(1);

                    let store = self.clone();
                    self.spawn_tracked(tracking, scope, async move {
                        if let Some(action) = fut.await {
                            tracing::trace!("Effect::Future produced an action, sending to store");
                            if let Err(error) = store.send(action).await {
                                tracing::debug!(%error, "Feedback action dropped");
                            }
                        }
                    });
                },
                Effect::Delay { duration, action } => {
                    tracing::trace!(?duration, "Executing Effect::Delay");
                    metrics::counter!("store.effects.executed", "type" => "delay").increment(1);

                    let store = self.clone();
                    self.spawn_tracked(tracking, scope, async move {
                        tokio::time::sleep(duration).await;
                        if let Err(error) = store.send(*action).await {
                            tracing::debug!(%error, "Delayed action dropped");
                        }
                    });
                },
                Effect::Parallel(effects) => {
                    tracing::trace!("Executing Effect::Parallel with {} effects", effects.len());
                    metrics::counter!("store.effects.executed", "type" => "parallel").increment(1);

                    for effect in effects {
                        self.execute_effect_internal(effect, tracking, scope);
                    }
                },
                Effect::Sequential(effects) => {
                    let effect_count = effects.len();
                    tracing::trace!("Executing Effect::Sequential with {} effects", effect_count);
                    metrics::counter!("store.effects.executed", "type" => "sequential").increment(1);

                    let store = self.clone();
                    let inner_scope = scope.cloned();
                    self.spawn_tracked(tracking, scope, async move {
                        for (idx, effect) in effects.into_iter().enumerate() {
                            tracing::trace!("Executing sequential effect {} of {}", idx + 1, effect_count);

                            let (sub_tracking, mut sub_rx) = EffectTracking::detached();
                            store.execute_effect_internal(effect, &sub_tracking, inner_scope.as_ref());

                            while !sub_tracking.is_idle() {
                                if sub_rx.changed().await.is_err() {
                                    break;
                                }
                            }
                        }
                    });
                },
                Effect::Cancellable { id, effect } => {
                    tracing::trace!(%id, "Executing Effect::Cancellable");
                    metrics::counter!("store.effects.executed", "type" => "cancellable").increment(1);

                    self.execute_effect_internal(*effect, tracking, Some(&id));
                },
                Effect::Cancel { id } => {
                    let aborted = self.cancellations.cancel(&id);
                    tracing::debug!(%id, aborted, "Cancelled effects");
                    metrics::counter!("store.effects.executed", "type" => "cancel").increment(1);
                    #[allow(clippy::cast_possible_truncation)]
                    metrics::counter!("store.effects.cancelled").increment(aborted as u64);
                },
            }
        }
    }

    impl<S, A, E, R> Clone for Store<S, A, E, R>
    where
        R: Reducer<State = S, Action = A, Environment = E> + Clone,
        E: Clone,
    {
        fn clone(&self) -> Self {
            Self {
                state: Arc::clone(&self.state),
                reducer: self.reducer.clone(),
                environment: self.environment.clone(),
                shutdown: Arc::clone(&self.shutdown),
                pending_effects: Arc::clone(&self.pending_effects),
                cancellations: self.cancellations.clone(),
            }
        }
    }
}

// Re-export for convenience
pub use store::Store;
