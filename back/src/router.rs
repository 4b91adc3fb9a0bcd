//! Resource router.
//!
//! Bindings are built from [`ResourceDescriptor`]s and matched in
//! registration order. Anything that does not match falls through to the
//! default handler, so dispatch itself never fails.

use std::{collections::HashMap, future::Future, sync::Arc};

use api::{
    resource::{Action, Method, Params, PathTemplate, ResourceDescriptor},
    v1::ErrorBody,
};
use axum::{
    extract::Request,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use futures::future::BoxFuture;
use thiserror::Error;
use tracing::debug;

pub type Handler = Arc<dyn Fn(Request, Params) -> BoxFuture<'static, Response> + Send + Sync>;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RouterError {
    #[error("route {method} {template} is already bound")]
    DuplicateBinding { method: Method, template: String },
    #[error("resource `{resource}` enables `{action}` but no handler was given")]
    MissingHandler { resource: String, action: Action },
}

fn handler<F, Fut>(f: F) -> Handler
where
    F: Fn(Request, Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Response> + Send + 'static,
{
    Arc::new(move |request: Request, params: Params| -> BoxFuture<'static, Response> {
        Box::pin(f(request, params))
    })
}

/// Handlers for the actions of one resource.
#[derive(Default, Clone)]
pub struct HandlerSet {
    handlers: HashMap<Action, Handler>,
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on<F, Fut>(mut self, action: Action, f: F) -> Self
    where
        F: Fn(Request, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.handlers.insert(action, handler(f));
        self
    }
}

struct Binding {
    resource: String,
    action: Action,
    method: Method,
    template: PathTemplate,
    handler: Handler,
}

pub struct Router {
    bindings: Vec<Binding>,
    default: Handler,
}

impl Default for Router {
    fn default() -> Self {
        Self::new(|_, _| async { not_found() })
    }
}

impl Router {
    pub fn new<F, Fut>(default: F) -> Self
    where
        F: Fn(Request, Params) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        Self {
            bindings: Vec::new(),
            default: handler(default),
        }
    }

    /// Bind every enabled action of `descriptor` to its handler.
    ///
    /// Nothing is registered if any binding would be rejected.
    pub fn map(
        &mut self,
        descriptor: &ResourceDescriptor,
        handlers: HandlerSet,
    ) -> Result<(), RouterError> {
        let mut bindings = Vec::new();

        for route in descriptor.routes() {
            let taken = (self.bindings.iter().chain(&bindings))
                .any(|b| b.method == route.method && b.template == route.template);
            if taken {
                return Err(RouterError::DuplicateBinding {
                    method: route.method,
                    template: route.template.to_string(),
                });
            }

            let handler = handlers.handlers.get(&route.action).cloned().ok_or_else(|| {
                RouterError::MissingHandler {
                    resource: descriptor.name().to_string(),
                    action: route.action,
                }
            })?;

            bindings.push(Binding {
                resource: descriptor.name().to_string(),
                action: route.action,
                method: route.method,
                template: route.template,
                handler,
            });
        }

        self.bindings.extend(bindings);
        Ok(())
    }

    /// Bound `(method, template)` pairs, in match order.
    pub fn bindings(&self) -> impl Iterator<Item = (Method, &str)> {
        self.bindings.iter().map(|b| (b.method, b.template.as_str()))
    }

    pub async fn dispatch(&self, request: Request) -> Response {
        let path = request.uri().path().to_string();
        let method = request.method().as_str().to_string();

        for binding in &self.bindings {
            if binding.method.as_str() != method {
                continue;
            }

            if let Some(params) = binding.template.matches(&path) {
                debug!(
                    %method,
                    %path,
                    resource = %binding.resource,
                    action = %binding.action,
                    "dispatching"
                );
                return (binding.handler)(request, params).await;
            }
        }

        debug!(%method, %path, "no route matched");
        (self.default)(request, Params::new()).await
    }

    /// Mount the router as the fallback of an axum app.
    pub fn into_service(self) -> axum::Router {
        let router = Arc::new(self);

        axum::Router::new().fallback(move |request: Request| {
            let router = router.clone();
            async move { router.dispatch(request).await }
        })
    }
}

pub fn not_found() -> Response {
    (StatusCode::NOT_FOUND, Json(ErrorBody::new("Not Found"))).into_response()
}
