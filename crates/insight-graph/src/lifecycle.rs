//! Retry-guarded connection lifecycle.
//!
//! The [`ConnectionManager`] owns the only shared mutable state in the
//! engine: the live store handle. Connection attempts are single-flight, so
//! concurrent `ensure_connected` callers await one shared attempt cycle and
//! all observe its outcome. The cycle runs on its own task and records its
//! result in the slot whether or not any caller is still waiting.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt, Shared};
use tokio::task::AbortHandle;

use insight_core::config::LifecycleSettings;

use crate::client::{GraphError, GraphStore, Record};
use crate::deadline::with_deadline;
use crate::queries::CatalogQuery;

/// Opens a fresh store handle. One call is one handshake; retries are the
/// manager's concern.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self) -> Result<Arc<dyn GraphStore>, GraphError>;
}

/// Fixed-delay retry policy (no backoff growth).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    /// `max_attempts` is raised to at least one.
    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(5, Duration::from_secs(5))
    }
}

impl From<&LifecycleSettings> for RetryPolicy {
    fn from(settings: &LifecycleSettings) -> Self {
        Self::new(settings.max_attempts, settings.retry_delay())
    }
}

/// Observable connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
}

#[derive(Debug)]
struct Exhausted {
    attempts: u32,
    last_error: String,
}

/// What an attempt cycle reports to its waiters. The slot has already been
/// updated by the time this is observed.
#[derive(Debug, Clone)]
enum AttemptOutcome {
    Connected,
    Exhausted { attempts: u32, last_error: String },
    /// Shut down before the cycle could record its result.
    Cancelled,
}

type ConnectAttempt = Shared<BoxFuture<'static, AttemptOutcome>>;

enum Slot {
    Disconnected,
    Connecting {
        generation: u64,
        attempt: ConnectAttempt,
        abort: AbortHandle,
    },
    Connected(Arc<dyn GraphStore>),
}

struct State {
    /// Bumped for every attempt cycle started.
    generation: u64,
    slot: Slot,
}

/// Guards every access to the graph store.
///
/// The manager is itself a [`GraphStore`]: queries are forwarded to the live
/// handle, or fail with [`GraphError::StoreUnavailable`] when there is none.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    policy: RetryPolicy,
    state: Arc<Mutex<State>>,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>, policy: RetryPolicy) -> Self {
        Self {
            connector,
            policy,
            state: Arc::new(Mutex::new(State {
                generation: 0,
                slot: Slot::Disconnected,
            })),
        }
    }

    pub fn state(&self) -> ConnectionState {
        match &lock(&self.state).slot {
            Slot::Disconnected => ConnectionState::Disconnected,
            Slot::Connecting { .. } => ConnectionState::Connecting,
            Slot::Connected(_) => ConnectionState::Connected,
        }
    }

    /// Connect if not already connected.
    ///
    /// Returns immediately when connected. Otherwise joins the in-flight
    /// attempt cycle or starts one. Fails with
    /// [`GraphError::ConnectionExhausted`] once every attempt has failed, and
    /// with [`GraphError::StoreUnavailable`] when [`ConnectionManager::shutdown`]
    /// interrupts the cycle. Dropping the returned future leaves the cycle
    /// running.
    pub async fn ensure_connected(&self) -> Result<(), GraphError> {
        let attempt = {
            let mut state = lock(&self.state);
            let joined = match &state.slot {
                Slot::Connected(_) => return Ok(()),
                Slot::Connecting { attempt, .. } => Some(attempt.clone()),
                Slot::Disconnected => None,
            };
            joined.unwrap_or_else(|| self.start_attempt(&mut state))
        };

        match attempt.await {
            AttemptOutcome::Connected => match &lock(&self.state).slot {
                Slot::Connected(_) => Ok(()),
                _ => Err(shut_down_during_connect()),
            },
            AttemptOutcome::Exhausted {
                attempts,
                last_error,
            } => Err(GraphError::ConnectionExhausted {
                attempts,
                last_error,
            }),
            AttemptOutcome::Cancelled => Err(shut_down_during_connect()),
        }
    }

    /// Release the store handle if held, cancelling any in-flight attempt
    /// cycle. Idempotent and infallible.
    ///
    /// The underlying pool closes once in-flight queries drop their clones.
    pub fn shutdown(&self) {
        let previous = std::mem::replace(&mut lock(&self.state).slot, Slot::Disconnected);
        match previous {
            Slot::Connected(_) => tracing::info!("Disconnected from graph store"),
            Slot::Connecting { abort, .. } => {
                abort.abort();
                tracing::info!("Cancelled in-flight connection attempt");
            }
            Slot::Disconnected => tracing::debug!("Shutdown requested while disconnected"),
        }
    }

    /// Run the liveness query under `timeout`.
    pub async fn health_check(&self, timeout: Duration) -> Result<(), GraphError> {
        with_deadline(Some(timeout), self.execute(&CatalogQuery::Ping)).await?;
        Ok(())
    }

    /// Spawn a new attempt cycle and park it in the slot.
    fn start_attempt(&self, state: &mut State) -> ConnectAttempt {
        state.generation += 1;
        let generation = state.generation;

        let task = tokio::spawn(run_attempt(
            self.state.clone(),
            generation,
            self.connector.clone(),
            self.policy.clone(),
        ));
        let abort = task.abort_handle();
        let shared_state = self.state.clone();
        let attempt = async move {
            match task.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    if e.is_panic() {
                        tracing::error!(error = %e, "Connection task panicked");
                    }
                    // An aborted or panicked cycle never wrote the slot.
                    let mut state = lock(&shared_state);
                    if is_current(&state, generation) {
                        state.slot = Slot::Disconnected;
                    }
                    AttemptOutcome::Cancelled
                }
            }
        }
        .boxed()
        .shared();

        state.slot = Slot::Connecting {
            generation,
            attempt: attempt.clone(),
            abort,
        };
        attempt
    }

    fn current(&self) -> Result<Arc<dyn GraphStore>, GraphError> {
        match &lock(&self.state).slot {
            Slot::Connected(store) => Ok(store.clone()),
            Slot::Connecting { .. } => Err(GraphError::StoreUnavailable(
                "connection attempt in progress".to_string(),
            )),
            Slot::Disconnected => Err(GraphError::StoreUnavailable("not connected".to_string())),
        }
    }
}

#[async_trait]
impl GraphStore for ConnectionManager {
    async fn execute(&self, query: &CatalogQuery) -> Result<Vec<Record>, GraphError> {
        let store = self.current()?;
        store.execute(query).await
    }
}

fn lock(state: &Mutex<State>) -> MutexGuard<'_, State> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

fn is_current(state: &State, generation: u64) -> bool {
    matches!(state.slot, Slot::Connecting { generation: g, .. } if g == generation)
}

fn shut_down_during_connect() -> GraphError {
    GraphError::StoreUnavailable("shut down during connect".to_string())
}

/// One attempt cycle. Writes the slot unless a shutdown replaced it first.
async fn run_attempt(
    state: Arc<Mutex<State>>,
    generation: u64,
    connector: Arc<dyn Connector>,
    policy: RetryPolicy,
) -> AttemptOutcome {
    let result = connect_with_retry(connector, policy).await;

    let mut state = lock(&state);
    if !is_current(&state, generation) {
        return AttemptOutcome::Cancelled;
    }
    match result {
        Ok(store) => {
            state.slot = Slot::Connected(store);
            AttemptOutcome::Connected
        }
        Err(e) => {
            state.slot = Slot::Disconnected;
            AttemptOutcome::Exhausted {
                attempts: e.attempts,
                last_error: e.last_error,
            }
        }
    }
}

async fn connect_with_retry(
    connector: Arc<dyn Connector>,
    policy: RetryPolicy,
) -> Result<Arc<dyn GraphStore>, Exhausted> {
    let mut last_error = String::new();

    for attempt in 1..=policy.max_attempts {
        match connect_once(connector.as_ref()).await {
            Ok(store) => {
                tracing::info!(attempt, "Graph store connection established");
                return Ok(store);
            }
            Err(e) => {
                last_error = e.to_string();
                if attempt < policy.max_attempts {
                    tracing::warn!(
                        attempt,
                        max_attempts = policy.max_attempts,
                        retry_in_ms = policy.delay.as_millis() as u64,
                        error = %e,
                        "Failed to connect to graph store, retrying"
                    );
                    tokio::time::sleep(policy.delay).await;
                } else {
                    tracing::error!(
                        max_attempts = policy.max_attempts,
                        error = %e,
                        "Failed to connect to graph store, giving up"
                    );
                }
            }
        }
    }

    Err(Exhausted {
        attempts: policy.max_attempts,
        last_error,
    })
}

/// Handshake, then verify with a round-trip.
async fn connect_once(connector: &dyn Connector) -> Result<Arc<dyn GraphStore>, GraphError> {
    let store = connector.connect().await?;
    store.execute(&CatalogQuery::Ping).await?;
    Ok(store)
}
