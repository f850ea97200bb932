//! Application assembly with an enforced middleware order.
//!
//! Routes can only be added once instrumentation is attached:
//!
//! ```text
//! AppBuilder::new(service)         (no route methods)
//!     .instrument(instrumentation) → InstrumentedApp
//!     .get("/health", health)      (documented)
//!     .build()                     → Router, every route wrapped by
//!                                    track_metrics → request_log
//! ```
//!
//! ```compile_fail
//! use app_api::config::ServiceConfig;
//! use app_api::http::AppBuilder;
//!
//! async fn handler() {}
//!
//! AppBuilder::new(&ServiceConfig::default()).get("/early", handler);
//! ```

use std::sync::Arc;

use axum::{
    handler::Handler,
    http::Method,
    middleware,
    routing::{get, MethodRouter},
    Router,
};

use crate::config::ServiceConfig;
use crate::http::middleware::request_log;
use crate::http::response::not_found;
use crate::http::schema::{serve_schema, ApiSchema, SCHEMA_PATH};
use crate::observability::metrics::{render_metrics, track_metrics, Instrumentation};
use crate::observability::panic::install_panic_capture;

/// Uninstrumented application. The only way forward is [`AppBuilder::instrument`].
pub struct AppBuilder {
    schema: ApiSchema,
}

impl AppBuilder {
    pub fn new(service: &ServiceConfig) -> Self {
        install_panic_capture();
        Self {
            schema: ApiSchema::new(service),
        }
    }

    /// Attach metrics and mount the (undocumented) exposition endpoint.
    pub fn instrument(self, instrumentation: Instrumentation) -> InstrumentedApp {
        let router = Router::new().route(
            instrumentation.path(),
            get(render_metrics).with_state(instrumentation.clone()),
        );

        InstrumentedApp {
            router,
            schema: self.schema,
            instrumentation,
        }
    }
}

/// Application with instrumentation attached; routes may now be added.
pub struct InstrumentedApp {
    router: Router,
    schema: ApiSchema,
    instrumentation: Instrumentation,
}

impl InstrumentedApp {
    /// Register a documented route answering `methods`.
    pub fn route(mut self, path: &str, methods: &[Method], method_router: MethodRouter) -> Self {
        for method in methods {
            self.schema.document(path, method);
        }
        self.router = self.router.route(path, method_router);
        self
    }

    /// Register a route left out of the API schema.
    pub fn route_hidden(mut self, path: &str, method_router: MethodRouter) -> Self {
        self.router = self.router.route(path, method_router);
        self
    }

    /// Register a documented `GET` route.
    pub fn get<H, T>(self, path: &str, handler: H) -> Self
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        self.route(path, &[Method::GET], get(handler))
    }

    pub fn schema(&self) -> &ApiSchema {
        &self.schema
    }

    /// Mount the schema endpoint and wrap every route, the fallback
    /// included, in the request pipeline.
    pub fn build(self) -> Router {
        let schema = Arc::new(self.schema);

        self.router
            .route(SCHEMA_PATH, get(serve_schema).with_state(schema))
            .fallback(not_found)
            .layer(middleware::from_fn(request_log))
            .layer(middleware::from_fn_with_state(
                self.instrumentation,
                track_metrics,
            ))
    }
}
