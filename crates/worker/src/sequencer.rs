use helix_service::HookSpec;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::binder::BoundEndpoints;
use crate::error::{Error, Result};
use crate::registrar::Registration;

/// How a serve loop came to an end.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ServeOutcome {
    /// The backend's serve loop returned on its own.
    Completed,
    /// The shutdown token was cancelled while serving.
    Cancelled,
}

/// Runs declared startup hooks to completion, then drives the first bound
/// endpoint's serve loop.
pub struct LifecycleSequencer<'a> {
    bound: &'a BoundEndpoints,
    registration: &'a Registration,
}

impl<'a> LifecycleSequencer<'a> {
    /// Creates a sequencer over the bound endpoints and registration.
    #[must_use]
    pub const fn new(bound: &'a BoundEndpoints, registration: &'a Registration) -> Self {
        Self {
            bound,
            registration,
        }
    }

    /// Runs every declared startup hook sequentially, in declared order.
    /// A hook failure stops the sequence; later hooks never run.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Hook`] naming the failed hook.
    pub async fn run_hooks(&self, hooks: &[HookSpec]) -> Result<()> {
        let handle = self.bound.handle();
        for hook in hooks {
            handle
                .run_hook(hook.name())
                .await
                .map_err(|source| Error::Hook {
                    hook: hook.name().to_string(),
                    source,
                })?;
            info!(hook = hook.name(), "startup hook completed");
        }
        Ok(())
    }

    /// Serves the driven endpoint until the backend returns or `shutdown`
    /// is cancelled. The lease handle is passed through so the backend can
    /// end the loop on revocation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Serve`] when the backend's serve loop fails.
    pub async fn serve(&self, shutdown: &CancellationToken) -> Result<ServeOutcome> {
        let driven = self.bound.driven();
        info!(endpoint = driven.spec().name(), "serving endpoint");

        let registered = driven.registered();
        let serve = registered.serve(driven.handler(), self.registration.lease.clone());

        tokio::select! {
            biased;
            () = shutdown.cancelled() => {
                info!("shutdown requested, leaving serve loop");
                Ok(ServeOutcome::Cancelled)
            }
            result = serve => {
                result.map_err(Error::Serve)?;
                Ok(ServeOutcome::Completed)
            }
        }
    }
}
