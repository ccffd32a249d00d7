//! The dispatch wrapper around one compiled route.
//!
//! A [`Chain`] is everything one route needs at request time: the before
//! middleware in outermost-first order, the dispatch endpoint, the after
//! middleware, and the controller chain's error handlers. The endpoint
//! resolves the handler's bindings, runs the handler future under the
//! optional deadline, and finalizes whatever payload comes back.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use trellis_core::{
    BoxFuture, Endpoint, Middleware, Next, RequestContext, TrellisError, TrellisResult,
    ViewRenderer,
};
use trellis_extract::{Args, BindingSet, Invocation};
use trellis_registry::{ErrorHandlerMetadata, Finalizer, HandlerFn};

/// One route's complete request-time machinery.
pub(crate) struct Chain {
    befores: Vec<Arc<dyn Middleware>>,
    endpoint: DispatchEndpoint,
    afters: Vec<Arc<dyn Middleware>>,
    error_handlers: Arc<Vec<ErrorHandlerMetadata>>,
}

impl Chain {
    pub fn new(
        befores: Vec<Arc<dyn Middleware>>,
        endpoint: DispatchEndpoint,
        afters: Vec<Arc<dyn Middleware>>,
        error_handlers: Arc<Vec<ErrorHandlerMetadata>>,
    ) -> Self {
        Self {
            befores,
            endpoint,
            afters,
            error_handlers,
        }
    }

    /// Runs the before middleware as an onion around the endpoint, then
    /// the after middleware as a flat sequence. Any stage returning `Err`
    /// skips everything that remains.
    pub async fn run(&self, ctx: &mut RequestContext) -> TrellisResult<()> {
        let mut next = Next::endpoint(&self.endpoint);
        for middleware in self.befores.iter().rev() {
            next = Next::new(middleware.as_ref(), next);
        }
        next.run(ctx).await?;

        for middleware in &self.afters {
            middleware.handle(ctx, Next::stop()).await?;
        }
        Ok(())
    }

    /// Walks the error handlers in order. A handler that writes a
    /// response marks the error handled; one that returns `Ok` without
    /// writing leaves the current error in flight; one that returns `Err`
    /// replaces the error for the handlers after it.
    ///
    /// Returns `None` when the error was handled, or the error still in
    /// flight after the last handler.
    pub async fn recover(
        &self,
        ctx: &mut RequestContext,
        err: TrellisError,
    ) -> Option<TrellisError> {
        let mut current = Arc::new(err);
        for entry in self.error_handlers.iter() {
            let invocation = Invocation::new(
                ctx.shared_request(),
                ctx.response().clone(),
                Args::default(),
            );
            match (entry.handler())(Arc::clone(&current), invocation).await {
                Ok(()) => {
                    if ctx.response().is_sent() {
                        tracing::debug!(handler = entry.key(), "error handled");
                        return None;
                    }
                }
                Err(replacement) => {
                    tracing::debug!(
                        handler = entry.key(),
                        error = %replacement,
                        "error handler failed, replacing the error in flight"
                    );
                    current = Arc::new(replacement);
                }
            }
        }
        Some(Arc::try_unwrap(current).unwrap_or_else(|shared| {
            TrellisError::status(shared.status_code(), shared.to_string())
        }))
    }
}

/// The terminal chain stage: argument resolution, the handler itself, and
/// payload finalization.
pub(crate) struct DispatchEndpoint {
    key: Arc<str>,
    bindings: BindingSet,
    finalizer: Finalizer,
    handler: HandlerFn,
    deadline: Option<Duration>,
    renderer: Option<Arc<dyn ViewRenderer>>,
}

impl DispatchEndpoint {
    pub fn new(
        key: Arc<str>,
        bindings: BindingSet,
        finalizer: Finalizer,
        handler: HandlerFn,
        deadline: Option<Duration>,
        renderer: Option<Arc<dyn ViewRenderer>>,
    ) -> Self {
        Self {
            key,
            bindings,
            finalizer,
            handler,
            deadline,
            renderer,
        }
    }

    fn finalize(&self, ctx: &RequestContext, payload: Option<Value>) -> TrellisResult<()> {
        let Some(value) = payload else {
            return Ok(());
        };
        if ctx.response().is_sent() {
            tracing::trace!(handler = %self.key, "response already sent, payload dropped");
            return Ok(());
        }
        match &self.finalizer {
            Finalizer::None => {
                tracing::trace!(handler = %self.key, "no finalizer declared, payload dropped");
                Ok(())
            }
            Finalizer::Json => ctx.response().send_json(&value),
            Finalizer::View(view) => {
                let renderer = self
                    .renderer
                    .as_ref()
                    .ok_or_else(|| TrellisError::render(view, "no view renderer installed"))?;
                let html = renderer.render(view, &value)?;
                ctx.response().send_html(html)
            }
        }
    }
}

impl Endpoint for DispatchEndpoint {
    fn call<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, TrellisResult<()>> {
        Box::pin(async move {
            let args = self.bindings.resolve(&ctx.shared_request(), ctx.response())?;
            let invocation =
                Invocation::new(ctx.shared_request(), ctx.response().clone(), args);

            let future = (self.handler)(invocation);
            let payload = match self.deadline {
                Some(deadline) => match tokio::time::timeout(deadline, future).await {
                    Ok(outcome) => outcome?,
                    Err(_) => {
                        return Err(TrellisError::Timeout {
                            deadline_ms: u64::try_from(deadline.as_millis())
                                .unwrap_or(u64::MAX),
                        });
                    }
                },
                None => future.await?,
            };

            self.finalize(ctx, payload)
        })
    }
}
