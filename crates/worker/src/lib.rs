//! Worker bootstrap: resolves configuration, loads the service graph,
//! registers with the coordination backend, binds endpoints, and serves.
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

mod binder;
mod cli;
mod config;
mod error;
mod logging;
mod registrar;
mod sequencer;

use std::sync::Arc;

use helix_discovery::Discovery;
use helix_service::{GraphLoader, ServiceRegistry};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

pub use binder::{BoundEndpoint, BoundEndpoints, EndpointBinder};
pub use cli::{Args, run};
pub use config::{ConfigResolver, ResolvedConfig, WorkerIdentity};
pub use error::{Error, Result};
pub use logging::init_logging;
pub use registrar::{ComponentRegistrar, Registration};
pub use sequencer::{LifecycleSequencer, ServeOutcome};

/// Bootstrap state a worker moves through, in order. Transitions are
/// forward-only, none skipped; any failure jumps straight to
/// [`WorkerState::Terminated`].
#[derive(Clone, Copy, Debug, Eq, Ord, PartialEq, PartialOrd)]
pub enum WorkerState {
    /// Process created, nothing resolved yet.
    Init,
    /// Configuration resolved.
    Configured,
    /// Service graph loaded and pruned.
    GraphLoaded,
    /// Component registered with the backend.
    Registered,
    /// Endpoints bound to handlers.
    Bound,
    /// Every startup hook completed.
    HooksRun,
    /// Serve loop running.
    Serving,
    /// Process is done, successfully or not.
    Terminated,
}

/// How a worker run ended.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Outcome {
    /// The serve loop ran and returned on its own.
    Served,
    /// The entry service is not a distributed component; nothing was
    /// registered or served.
    NonDistributed,
    /// The shutdown token was cancelled.
    Cancelled,
}

/// The worker bootstrap orchestrator. Owns the registry of service
/// definitions and a handle onto the coordination backend, and drives one
/// process from configuration to serve.
pub struct Worker {
    registry: ServiceRegistry,
    runtime: Arc<dyn Discovery>,
}

impl Worker {
    /// Creates a worker over the given registry and backend handle.
    #[must_use]
    pub const fn new(registry: ServiceRegistry, runtime: Arc<dyn Discovery>) -> Self {
        Self { registry, runtime }
    }

    /// The worker's service registry.
    #[must_use]
    pub const fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// Runs the full bootstrap sequence: resolve configuration, load the
    /// graph, register, bind, run startup hooks, serve.
    ///
    /// A non-distributed entry service short-circuits before registration
    /// and returns [`Outcome::NonDistributed`]. Cancelling `shutdown` at
    /// any point ends the run with [`Outcome::Cancelled`].
    ///
    /// # Errors
    ///
    /// Returns the first stage error; every stage failure is fatal and
    /// already logged when this returns.
    pub async fn run(
        &self,
        resolver: ConfigResolver,
        shutdown: &CancellationToken,
    ) -> Result<Outcome> {
        let mut state = WorkerState::Init;

        let config = match resolver.resolve() {
            Ok(config) => config,
            Err(e) => {
                error!("failed to resolve worker configuration: {e}");
                return Err(e);
            }
        };
        state = Self::transition(state, WorkerState::Configured);
        info!(
            locator = config.service_locator,
            service_name = config.service_name.as_deref(),
            worker_ordinal = config.identity.ordinal.map(std::num::NonZeroUsize::get),
            "configuration resolved"
        );

        let loader = GraphLoader::new(&self.registry);
        let graph = match loader.load(&config.service_locator, config.service_name.as_deref()) {
            Ok(graph) => graph,
            Err(e) => {
                error!("failed to load service graph: {e}");
                return Err(e.into());
            }
        };
        state = Self::transition(state, WorkerState::GraphLoaded);

        if !graph.entry().descriptor().is_distributed() {
            info!(
                service = graph.entry().descriptor().name(),
                "service is not a distributed component, nothing to serve"
            );
            Self::transition(state, WorkerState::Terminated);
            return Ok(Outcome::NonDistributed);
        }

        if shutdown.is_cancelled() {
            Self::transition(state, WorkerState::Terminated);
            return Ok(Outcome::Cancelled);
        }

        let registrar = ComponentRegistrar::new(&self.runtime, &graph);
        let registration = tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                Self::transition(state, WorkerState::Terminated);
                return Ok(Outcome::Cancelled);
            }
            result = registrar.register() => match result {
                Ok(registration) => registration,
                Err(e) => {
                    error!("failed to register component: {e}");
                    return Err(e);
                }
            },
        };
        state = Self::transition(state, WorkerState::Registered);

        let binder = EndpointBinder::new(&self.runtime, &graph, &config);
        let bound = match binder.bind(&registration).await {
            Ok(bound) => bound,
            Err(e) => {
                error!("failed to bind endpoints: {e}");
                return Err(e);
            }
        };
        state = Self::transition(state, WorkerState::Bound);

        let sequencer = LifecycleSequencer::new(&bound, &registration);
        if let Err(e) = sequencer.run_hooks(graph.entry().descriptor().hooks()).await {
            error!("startup hook failed: {e}");
            return Err(e);
        }
        state = Self::transition(state, WorkerState::HooksRun);
        state = Self::transition(state, WorkerState::Serving);

        let outcome = match sequencer.serve(shutdown).await {
            Ok(ServeOutcome::Completed) => Outcome::Served,
            Ok(ServeOutcome::Cancelled) => Outcome::Cancelled,
            Err(e) => {
                error!("serve loop failed: {e}");
                return Err(e);
            }
        };
        Self::transition(state, WorkerState::Terminated);
        Ok(outcome)
    }

    fn transition(from: WorkerState, to: WorkerState) -> WorkerState {
        debug!(?from, ?to, "worker state transition");
        to
    }
}

impl std::fmt::Debug for Worker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Worker")
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::WorkerState;

    #[test]
    fn bootstrap_states_advance_strictly_forward() {
        let states = [
            WorkerState::Init,
            WorkerState::Configured,
            WorkerState::GraphLoaded,
            WorkerState::Registered,
            WorkerState::Bound,
            WorkerState::HooksRun,
            WorkerState::Serving,
            WorkerState::Terminated,
        ];
        assert!(states.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
