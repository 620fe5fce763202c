//! ServerBuilder for fluent API to build HTTP servers

use super::entity_registry::{EntityDescriptor, EntityRegistry};
use super::state::AppState;
use crate::config::AppConfig;
use crate::core::auth::TokenService;
use crate::core::service::Gateway;
use crate::core::upload::{ImageStore, LocalImageStore};
use crate::entities;
use anyhow::{Result, anyhow};
use axum::routing::get;
use axum::{Json, Router};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Builder for the delivery HTTP server
///
/// Starts with every delivery entity and the login route registered. A
/// gateway is required; the token service and image store default to ones
/// built from the configuration.
///
/// # Example
///
/// ```ignore
/// let app = ServerBuilder::new()
///     .with_config(config)
///     .with_gateway(InMemoryGateway::new())
///     .build()?;
/// ```
pub struct ServerBuilder {
    config: AppConfig,
    gateway: Option<Arc<dyn Gateway>>,
    tokens: Option<TokenService>,
    images: Option<Arc<dyn ImageStore>>,
    entity_registry: EntityRegistry,
    custom_routes: Vec<Router<AppState>>,
}

impl ServerBuilder {
    pub fn new() -> Self {
        let mut entity_registry = EntityRegistry::new();
        entities::register_all(&mut entity_registry);
        Self {
            config: AppConfig::default(),
            gateway: None,
            tokens: None,
            images: None,
            entity_registry,
            custom_routes: vec![crate::auth::routes()],
        }
    }

    pub fn with_config(mut self, config: AppConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the persistence gateway (required)
    pub fn with_gateway(self, gateway: impl Gateway + 'static) -> Self {
        self.with_gateway_arc(Arc::new(gateway))
    }

    pub fn with_gateway_arc(mut self, gateway: Arc<dyn Gateway>) -> Self {
        self.gateway = Some(gateway);
        self
    }

    /// Override the token service derived from the configuration
    pub fn with_token_service(mut self, tokens: TokenService) -> Self {
        self.tokens = Some(tokens);
        self
    }

    /// Override the image store writing to `upload_dir`
    pub fn with_image_store(mut self, images: impl ImageStore + 'static) -> Self {
        self.images = Some(Arc::new(images));
        self
    }

    /// Register an additional entity, replacing one of the same type
    pub fn register_entity(mut self, descriptor: impl EntityDescriptor + 'static) -> Self {
        self.entity_registry.register(Box::new(descriptor));
        self
    }

    /// Add routes that don't fit the entity pattern
    pub fn with_custom_routes(mut self, routes: Router<AppState>) -> Self {
        self.custom_routes.push(routes);
        self
    }

    /// Assemble the shared state handlers run against
    pub fn build_state(&self) -> Result<AppState> {
        let gateway = self
            .gateway
            .clone()
            .ok_or_else(|| anyhow!("A gateway is required to build the server"))?;
        let tokens = self.tokens.clone().unwrap_or_else(|| {
            TokenService::new(&self.config.jwt_secret, self.config.token_ttl())
        });
        let images = self
            .images
            .clone()
            .unwrap_or_else(|| Arc::new(LocalImageStore::new(&self.config.upload_dir)));
        Ok(AppState {
            gateway,
            tokens,
            images,
            config: Arc::new(self.config.clone()),
        })
    }

    /// Build the complete router: entity routes, custom routes, `/health`,
    /// request tracing and CORS
    pub fn build(mut self) -> Result<Router> {
        let state = self.build_state()?;
        tracing::debug!(
            entities = ?self.entity_registry.entity_types(),
            paths = ?self.entity_registry.collection_paths(),
            "registering routes"
        );

        let router = std::mem::take(&mut self.custom_routes).into_iter().fold(
            self.entity_registry.build_routes(),
            |router, routes| router.merge(routes),
        );

        Ok(router
            .route("/health", get(health))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(TraceLayer::new_for_http())
                    .layer(CorsLayer::permissive()),
            ))
    }

    /// Serve the application with graceful shutdown
    ///
    /// Binds the configured `bind_addr` and stops on SIGTERM or Ctrl+C after
    /// in-flight requests finish.
    pub async fn serve(self) -> Result<()> {
        let addr = self.config.socket_addr()?;
        let app = self.build()?;
        let listener = TcpListener::bind(addr).await?;

        tracing::info!("Server listening on {}", addr);

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("Server shutdown complete");
        Ok(())
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Wait for shutdown signal (SIGTERM or Ctrl+C)
///
/// A signal handler that cannot be installed is logged and never fires.
async fn shutdown_signal() {
    use tokio::signal;

    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C signal, initiating graceful shutdown...");
        },
        _ = terminate => {
            tracing::info!("Received SIGTERM signal, initiating graceful shutdown...");
        },
    }
}
