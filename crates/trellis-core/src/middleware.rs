//! The middleware trait and request-processing chain.
//!
//! A route's chain is assembled once at build time and run per request:
//! before-middleware wrap the dispatch-wrapped handler like an onion, each
//! receiving the context and a [`Next`] to continue with. A middleware
//! short-circuits by returning `Err` (the error funnel) or by writing the
//! response and not calling `next`. After-middleware run as a flat sequence
//! once the inner chain returns.
//!
//! # Example
//!
//! ```rust
//! use trellis_core::{BoxFuture, Middleware, Next, RequestContext, TrellisResult};
//!
//! struct RequestTimer;
//!
//! impl Middleware for RequestTimer {
//!     fn name(&self) -> &'static str {
//!         "request-timer"
//!     }
//!
//!     fn handle<'a>(
//!         &'a self,
//!         ctx: &'a mut RequestContext,
//!         next: Next<'a>,
//!     ) -> BoxFuture<'a, TrellisResult<()>> {
//!         Box::pin(async move {
//!             let start = std::time::Instant::now();
//!             let result = next.run(ctx).await;
//!             let _elapsed = start.elapsed();
//!             result
//!         })
//!     }
//! }
//! ```

use std::future::Future;
use std::pin::Pin;

use crate::context::RequestContext;
use crate::error::TrellisResult;

/// A boxed future, the return type of middleware and endpoints.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A unit of request processing that runs around a handler.
///
/// # Invariants
///
/// - A middleware calls `next.run()` at most once.
/// - Returning `Err` short-circuits the remaining chain for this request;
///   the error is forwarded to the route's error chain.
pub trait Middleware: Send + Sync + 'static {
    /// Returns the middleware's name, used in logs and error messages.
    fn name(&self) -> &'static str;

    /// Processes the request, optionally continuing with `next`.
    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, TrellisResult<()>>;
}

/// The terminal stage of a chain: a dispatch-wrapped handler.
///
/// Implemented by the router's dispatch wrapper; middleware never see this
/// trait directly, only the [`Next`] that eventually reaches it.
pub trait Endpoint: Send + Sync {
    /// Invokes the wrapped handler against the context.
    fn call<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, TrellisResult<()>>;
}

/// Continuation handed to each middleware.
///
/// Consuming `run` ensures a middleware can continue the chain at most once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    /// More middleware to process.
    Chain {
        middleware: &'a dyn Middleware,
        next: Box<Next<'a>>,
    },
    /// End of chain: invoke the endpoint.
    Endpoint(&'a dyn Endpoint),
    /// End of chain with nothing left to do. Used when after-middleware are
    /// run as a flat sequence.
    Stop,
}

impl<'a> Next<'a> {
    /// Creates a `Next` that will invoke the given middleware.
    #[must_use]
    pub fn new(middleware: &'a dyn Middleware, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                middleware,
                next: Box::new(next),
            },
        }
    }

    /// Creates a terminal `Next` that invokes an endpoint.
    #[must_use]
    pub fn endpoint(endpoint: &'a dyn Endpoint) -> Self {
        Self {
            inner: NextInner::Endpoint(endpoint),
        }
    }

    /// Creates a terminal `Next` that does nothing.
    #[must_use]
    pub fn stop() -> Self {
        Self {
            inner: NextInner::Stop,
        }
    }

    /// Runs the next middleware or endpoint in the chain.
    pub async fn run(self, ctx: &mut RequestContext) -> TrellisResult<()> {
        match self.inner {
            NextInner::Chain { middleware, next } => middleware.handle(ctx, *next).await,
            NextInner::Endpoint(endpoint) => endpoint.call(ctx).await,
            NextInner::Stop => Ok(()),
        }
    }
}

/// Signature of a bare-function middleware.
///
/// Using a function pointer (rather than a generic closure) matches how
/// plain `fn` items coerce; a function written as
/// `fn guard<'a>(ctx: &'a mut RequestContext, next: Next<'a>) -> BoxFuture<'a, TrellisResult<()>>`
/// can be registered directly via [`FnMiddleware`].
pub type MiddlewareFn =
    for<'a> fn(&'a mut RequestContext, Next<'a>) -> BoxFuture<'a, TrellisResult<()>>;

/// Adapts a bare function into a [`Middleware`].
///
/// This is the normalized form of the two middleware shapes the framework
/// accepts: an object implementing the trait, or a plain function.
///
/// # Example
///
/// ```rust
/// use trellis_core::{BoxFuture, FnMiddleware, Next, RequestContext, TrellisResult};
///
/// fn noop<'a>(
///     ctx: &'a mut RequestContext,
///     next: Next<'a>,
/// ) -> BoxFuture<'a, TrellisResult<()>> {
///     Box::pin(next.run(ctx))
/// }
///
/// let middleware = FnMiddleware::new("noop", noop);
/// ```
pub struct FnMiddleware {
    name: &'static str,
    func: MiddlewareFn,
}

impl FnMiddleware {
    /// Wraps a bare function under a name.
    #[must_use]
    pub const fn new(name: &'static str, func: MiddlewareFn) -> Self {
        Self { name, func }
    }
}

impl Middleware for FnMiddleware {
    fn name(&self) -> &'static str {
        self.name
    }

    fn handle<'a>(
        &'a self,
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, TrellisResult<()>> {
        (self.func)(ctx, next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::RequestContextBuilder;
    use crate::error::TrellisError;
    use http::{Method, StatusCode, Uri};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn test_ctx() -> RequestContext {
        RequestContextBuilder::new()
            .method(Method::GET)
            .uri(Uri::from_static("/test"))
            .build()
    }

    struct Tracking {
        name: &'static str,
        order: Arc<std::sync::Mutex<Vec<&'static str>>>,
    }

    impl Middleware for Tracking {
        fn name(&self) -> &'static str {
            self.name
        }

        fn handle<'a>(
            &'a self,
            ctx: &'a mut RequestContext,
            next: Next<'a>,
        ) -> BoxFuture<'a, TrellisResult<()>> {
            Box::pin(async move {
                self.order.lock().unwrap().push(self.name);
                next.run(ctx).await
            })
        }
    }

    struct Refusing;

    impl Middleware for Refusing {
        fn name(&self) -> &'static str {
            "refusing"
        }

        fn handle<'a>(
            &'a self,
            _ctx: &'a mut RequestContext,
            _next: Next<'a>,
        ) -> BoxFuture<'a, TrellisResult<()>> {
            Box::pin(async move {
                Err(TrellisError::middleware(
                    "refusing",
                    anyhow::anyhow!("denied"),
                ))
            })
        }
    }

    struct CountingEndpoint {
        calls: Arc<AtomicUsize>,
    }

    impl Endpoint for CountingEndpoint {
        fn call<'a>(&'a self, ctx: &'a mut RequestContext) -> BoxFuture<'a, TrellisResult<()>> {
            Box::pin(async move {
                self.calls.fetch_add(1, Ordering::SeqCst);
                ctx.response().send_status(StatusCode::OK)
            })
        }
    }

    #[tokio::test]
    async fn chain_runs_in_order_then_endpoint() {
        let order = Arc::new(std::sync::Mutex::new(Vec::new()));
        let first = Tracking {
            name: "first",
            order: order.clone(),
        };
        let second = Tracking {
            name: "second",
            order: order.clone(),
        };
        let calls = Arc::new(AtomicUsize::new(0));
        let endpoint = CountingEndpoint {
            calls: calls.clone(),
        };

        let mut ctx = test_ctx();
        let chain = Next::new(&first, Next::new(&second, Next::endpoint(&endpoint)));
        chain.run(&mut ctx).await.unwrap();

        assert_eq!(*order.lock().unwrap(), vec!["first", "second"]);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(ctx.response().is_sent());
    }

    #[tokio::test]
    async fn erroring_middleware_short_circuits() {
        let refusing = Refusing;
        let calls = Arc::new(AtomicUsize::new(0));
        let endpoint = CountingEndpoint {
            calls: calls.clone(),
        };

        let mut ctx = test_ctx();
        let chain = Next::new(&refusing, Next::endpoint(&endpoint));
        let err = chain.run(&mut ctx).await.unwrap_err();

        assert!(matches!(err, TrellisError::Middleware { .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn stop_is_a_no_op() {
        let mut ctx = test_ctx();
        Next::stop().run(&mut ctx).await.unwrap();
        assert!(!ctx.response().is_sent());
    }

    fn pass_through<'a>(
        ctx: &'a mut RequestContext,
        next: Next<'a>,
    ) -> BoxFuture<'a, TrellisResult<()>> {
        Box::pin(next.run(ctx))
    }

    #[tokio::test]
    async fn fn_middleware_delegates() {
        let middleware = FnMiddleware::new("pass-through", pass_through);
        assert_eq!(middleware.name(), "pass-through");

        let calls = Arc::new(AtomicUsize::new(0));
        let endpoint = CountingEndpoint {
            calls: calls.clone(),
        };

        let mut ctx = test_ctx();
        let chain = Next::new(&middleware, Next::endpoint(&endpoint));
        chain.run(&mut ctx).await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
