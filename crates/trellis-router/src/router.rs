//! Router construction and request dispatch.
//!
//! [`RouterBuilder`] consumes controller metadata and produces a flat,
//! immutable route table: one compiled entry per (method, full pattern)
//! pair, indexed by a radix tree. Inherited routes are linearized at
//! build time under the mounting controller's prefix; nothing about the
//! controller hierarchy survives into dispatch.
//!
//! Construction is fail-fast. A pattern that does not parse or a
//! (method, pattern) pair registered twice without shadowing aborts the
//! build with a [`BuildError`].

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use http::{Method, Request, Response, StatusCode};
use serde::Deserialize;
use trellis_core::{Params, RequestContext, RequestParts, TrellisError, ViewRenderer};
use trellis_registry::{
    Controller, ControllerMetadata, ErrorHandlerMetadata, HandlerKind, Registry,
};

use crate::endpoint::{Chain, DispatchEndpoint};
use crate::error::BuildError;
use crate::pattern::{self, parse_pattern};
use crate::tree::{MatchOutcome, Node};

/// Router construction settings.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Deadline for a single handler future, in milliseconds. A handler
    /// that does not settle in time fails the request with a timeout
    /// error. `None` disables the deadline.
    pub handler_deadline_ms: Option<u64>,
}

/// Outcome of dispatching one request.
#[derive(Debug)]
pub enum Dispatch {
    /// A handler (or error handler) produced a response.
    Responded(Response<Bytes>),
    /// The request failed and no error handler claimed it. The caller
    /// owns the error; [`TrellisError::status_code`] gives the matching
    /// HTTP status.
    ErrorForwarded(TrellisError),
    /// No route matches the path.
    NotFound,
    /// The path is routable, but not under this method.
    MethodNotAllowed,
}

struct CompiledRoute {
    key: String,
    method: Method,
    pattern: String,
    chain: Chain,
}

/// Builds a [`Router`] from mounted controllers.
#[derive(Default)]
pub struct RouterBuilder {
    config: RouterConfig,
    renderer: Option<Arc<dyn ViewRenderer>>,
    controllers: Vec<Arc<ControllerMetadata>>,
}

impl RouterBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies construction settings.
    #[must_use]
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = config;
        self
    }

    /// Installs the view renderer used by view-finalized handlers.
    #[must_use]
    pub fn renderer(mut self, renderer: Arc<dyn ViewRenderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Mounts a controller. Its routes, inherited ones included, are
    /// served under its declared mount point.
    #[must_use]
    pub fn mount<C: Controller>(self) -> Self {
        self.mount_metadata(Registry::metadata::<C>())
    }

    /// Mounts pre-built controller metadata.
    #[must_use]
    pub fn mount_metadata(mut self, metadata: Arc<ControllerMetadata>) -> Self {
        self.controllers.push(metadata);
        self
    }

    /// Linearizes every mounted controller into the flat route table.
    ///
    /// Routes are visited child-first along each inheritance chain, so a
    /// child re-declaring an inherited (method, pattern) pair shadows the
    /// ancestor's handler. Any other collision is a
    /// [`BuildError::DuplicateRoute`].
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] for unparsable patterns and conflicting
    /// routes.
    pub fn build(self) -> Result<Router, BuildError> {
        struct Origin {
            controller: usize,
            depth: usize,
            key: String,
        }

        let deadline = self.config.handler_deadline_ms.map(Duration::from_millis);
        let mut tree = Node::root();
        let mut routes: Vec<CompiledRoute> = Vec::new();
        let mut seen: HashMap<(Method, String), Origin> = HashMap::new();

        for (controller_index, controller) in self.controllers.iter().enumerate() {
            let mount = controller.mount().to_owned();
            let chain: Vec<&ControllerMetadata> = controller.chain().collect();
            let error_handlers: Arc<Vec<ErrorHandlerMetadata>> = Arc::new(
                chain
                    .iter()
                    .flat_map(|c| c.error_handlers().iter().cloned())
                    .collect(),
            );

            for (depth, owner) in chain.iter().enumerate() {
                for (handler_key, handler) in owner.handlers() {
                    if handler.kind() != HandlerKind::Normal {
                        continue;
                    }
                    if handler.routes().is_empty() {
                        tracing::debug!(
                            controller = owner.name(),
                            handler = %handler_key,
                            "handler declares no routes, skipped"
                        );
                        continue;
                    }
                    let full_key = format!("{}::{handler_key}", owner.name());

                    for route in handler.routes() {
                        let full_pattern = pattern::join(&mount, &route.pattern);
                        let table_key = (route.method.clone(), full_pattern.clone());
                        match seen.get(&table_key) {
                            Some(origin)
                                if origin.controller == controller_index
                                    && origin.depth < depth =>
                            {
                                tracing::debug!(
                                    route = %format!("{} {full_pattern}", route.method),
                                    handler = %full_key,
                                    shadowed_by = %origin.key,
                                    "inherited route shadowed"
                                );
                                continue;
                            }
                            Some(origin) => {
                                return Err(BuildError::DuplicateRoute {
                                    method: route.method.clone(),
                                    pattern: full_pattern,
                                    first: origin.key.clone(),
                                    second: full_key,
                                });
                            }
                            None => {}
                        }

                        let segments = parse_pattern(&full_pattern)?;
                        let befores = chain[..=depth]
                            .iter()
                            .flat_map(|c| c.before().iter().cloned())
                            .chain(handler.before().iter().cloned())
                            .collect();
                        let afters = handler
                            .after()
                            .iter()
                            .cloned()
                            .chain(
                                chain[..=depth]
                                    .iter()
                                    .rev()
                                    .flat_map(|c| c.after().iter().cloned()),
                            )
                            .collect();
                        let endpoint = DispatchEndpoint::new(
                            Arc::from(full_key.as_str()),
                            handler.bindings().clone(),
                            handler.finalizer().clone(),
                            Arc::clone(handler.handler()),
                            deadline,
                            self.renderer.clone(),
                        );

                        let slot = routes.len();
                        tree.insert(&segments, route.method.clone(), slot);
                        routes.push(CompiledRoute {
                            key: full_key.clone(),
                            method: route.method.clone(),
                            pattern: full_pattern.clone(),
                            chain: Chain::new(
                                befores,
                                endpoint,
                                afters,
                                Arc::clone(&error_handlers),
                            ),
                        });
                        seen.insert(
                            table_key,
                            Origin {
                                controller: controller_index,
                                depth,
                                key: full_key.clone(),
                            },
                        );
                        tracing::debug!(
                            route = %format!("{} {full_pattern}", route.method),
                            handler = %full_key,
                            "route registered"
                        );
                    }
                }
            }
        }

        Ok(Router { tree, routes })
    }
}

/// The immutable, flat route table.
pub struct Router {
    tree: Node,
    routes: Vec<CompiledRoute>,
}

impl Router {
    /// Creates a builder.
    #[must_use]
    pub fn builder() -> RouterBuilder {
        RouterBuilder::new()
    }

    /// Iterates the compiled routes in registration order, as
    /// (method, full pattern, handler key) triples.
    pub fn routes(&self) -> impl Iterator<Item = (&Method, &str, &str)> {
        self.routes
            .iter()
            .map(|r| (&r.method, r.pattern.as_str(), r.key.as_str()))
    }

    /// Dispatches one request through the route table.
    ///
    /// A matched route runs its full chain. A chain that completes
    /// without anyone writing a response yields an empty `204`; a chain
    /// that fails enters the route's error-handler chain, and an error no
    /// handler claims comes back as [`Dispatch::ErrorForwarded`].
    pub async fn dispatch(&self, request: Request<Bytes>) -> Dispatch {
        let (head, body) = request.into_parts();
        let outcome = self.tree.lookup(&head.method, head.uri.path());
        let (slot, params) = match outcome {
            MatchOutcome::Found { slot, params } => (slot, params),
            MatchOutcome::MethodNotAllowed => return Dispatch::MethodNotAllowed,
            MatchOutcome::NotFound => return Dispatch::NotFound,
        };

        let route = &self.routes[slot];
        let parts = RequestParts::new(head.method, head.uri, head.headers, body, params);
        let mut ctx = RequestContext::new(parts);
        tracing::debug!(
            route = %route.key,
            request_id = %ctx.request_id(),
            "dispatching request"
        );

        match route.chain.run(&mut ctx).await {
            Ok(()) => Self::respond(&ctx, &route.key),
            Err(err) => {
                tracing::debug!(
                    route = %route.key,
                    error = %err,
                    "request failed, entering error chain"
                );
                match route.chain.recover(&mut ctx, err).await {
                    None => Self::respond(&ctx, &route.key),
                    Some(unclaimed) => Dispatch::ErrorForwarded(unclaimed),
                }
            }
        }
    }

    fn respond(ctx: &RequestContext, key: &str) -> Dispatch {
        ctx.response().take_response().map_or_else(
            || {
                tracing::warn!(
                    route = %key,
                    "chain completed without a response, replying 204"
                );
                let mut response = Response::new(Bytes::new());
                *response.status_mut() = StatusCode::NO_CONTENT;
                Dispatch::Responded(response)
            },
            Dispatch::Responded,
        )
    }

    /// Dispatches a lookup without running anything, mainly useful for
    /// diagnostics: returns the handler key a request would reach.
    #[must_use]
    pub fn route_for(&self, method: &Method, path: &str) -> Option<&str> {
        match self.tree.lookup(method, path) {
            MatchOutcome::Found { slot, .. } => Some(self.routes[slot].key.as_str()),
            _ => None,
        }
    }

    /// Grants access to extracted path parameters for a hypothetical
    /// match, mainly useful in tests.
    #[must_use]
    pub fn match_params(&self, method: &Method, path: &str) -> Option<Params> {
        match self.tree.lookup(method, path) {
            MatchOutcome::Found { params, .. } => Some(params),
            _ => None,
        }
    }
}

impl fmt::Debug for Router {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Router")
            .field(
                "routes",
                &self
                    .routes
                    .iter()
                    .map(|r| format!("{} {} -> {}", r.method, r.pattern, r.key))
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}
