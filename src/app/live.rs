use arc_swap::ArcSwap;
use http::Method;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{error, info};

use super::core::{Application, ApplicationBuilder};
use crate::dispatcher::{HandlerInvocation, HandlerResponse, RequestScope};
use crate::error::{BuildError, DispatchError};
use crate::registrar::Component;

/// An application that accepts new components after it started serving.
///
/// Registering rebuilds the whole application from its declared components plus the new
/// one and publishes the result atomically. Requests already running keep the snapshot
/// they started with. Rebuilds are serialised; lookups never block.
///
/// This is a maintenance operation: every rebuild re-resolves every endpoint.
pub struct LiveApplication {
    current: ArcSwap<Application>,
    builder: Mutex<ApplicationBuilder>,
}

impl LiveApplication {
    /// Build the initial snapshot.
    ///
    /// # Errors
    ///
    /// Any [`BuildError`] from the initial build.
    pub fn new(builder: ApplicationBuilder) -> Result<Self, BuildError> {
        let app = builder.clone().build()?;
        Ok(Self {
            current: ArcSwap::from_pointee(app),
            builder: Mutex::new(builder),
        })
    }

    /// The snapshot new requests are dispatched to
    #[must_use]
    pub fn current(&self) -> Arc<Application> {
        self.current.load_full()
    }

    /// Add a component and publish the rebuilt application.
    ///
    /// On failure the previous snapshot stays in place and the component is dropped.
    ///
    /// # Errors
    ///
    /// The [`BuildError`] of the rebuild.
    pub fn register(&self, component: impl Into<Component>) -> Result<Arc<Application>, BuildError> {
        let mut builder = self.builder.lock().unwrap_or_else(PoisonError::into_inner);
        let candidate = builder.clone().route(component);

        match candidate.clone().build() {
            Ok(app) => {
                let app = Arc::new(app);
                self.current.store(Arc::clone(&app));
                *builder = candidate;
                info!(
                    endpoints = app.router().tree().len(),
                    "Application rebuilt with new component"
                );
                Ok(app)
            }
            Err(err) => {
                error!(error = %err, "Dynamic registration rejected, keeping previous routes");
                Err(err)
            }
        }
    }

    /// Resolve a request against the current snapshot.
    ///
    /// # Errors
    ///
    /// See [`Dispatcher::dispatch`](crate::dispatcher::Dispatcher::dispatch).
    pub fn dispatch(
        &self,
        method: Method,
        path: &str,
        scope: RequestScope,
    ) -> Result<HandlerInvocation, DispatchError> {
        self.current.load().dispatch(method, path, scope)
    }

    /// Dispatch and run a request against the current snapshot
    #[must_use]
    pub fn handle(&self, method: Method, path: &str, scope: RequestScope) -> HandlerResponse {
        let app = self.current.load_full();
        app.handle(method, path, scope)
    }
}

impl std::fmt::Debug for LiveApplication {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveApplication")
            .field("current", &*self.current.load())
            .finish_non_exhaustive()
    }
}
