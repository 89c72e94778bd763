//! ClearHandler — wraps a request handler so its context is always cleared.
//!
//! The pipeline decides when a request starts and ends; wrapping its
//! handler in a [`ClearHandler`] guarantees the matching `clear` call no
//! matter how the handler exits.

use std::sync::Arc;

use tracing::debug;

use crate::scope::RequestScope;
use crate::store::RequestContextStore;

/// Trait implemented by pipeline stages that read and write request context.
pub trait RequestHandler: Send + Sync {
    type Output: Send;

    /// Handle one request. All context access goes through `scope`.
    fn handle(&self, scope: &RequestScope) -> impl std::future::Future<Output = Self::Output> + Send;
}

/// Runs an inner handler inside a [`RequestScope`] for each request.
pub struct ClearHandler<H> {
    store: Arc<RequestContextStore>,
    inner: H,
}

impl<H: RequestHandler> ClearHandler<H> {
    pub fn new(store: Arc<RequestContextStore>, inner: H) -> Self {
        Self { store, inner }
    }

    pub fn store(&self) -> &Arc<RequestContextStore> {
        &self.store
    }

    pub fn inner(&self) -> &H {
        &self.inner
    }

    /// Handle the request identified by `request_id`, then clear its context.
    pub async fn serve(&self, request_id: impl Into<String>) -> H::Output {
        self.run(self.store.scope(request_id)).await
    }

    /// Like [`serve`](Self::serve) with a generated request id.
    pub async fn serve_new(&self) -> H::Output {
        self.run(RequestScope::generate(Arc::clone(&self.store))).await
    }

    // The scope is dropped, and the context cleared, when this returns or
    // its future is dropped.
    async fn run(&self, scope: RequestScope) -> H::Output {
        debug!("Serving request: {}", scope.id());
        self.inner.handle(&scope).await
    }
}
