//! Gateway service: the single-listener lifecycle wrapping [`router::build_router`].

use crate::domain::error::GatewayError;
use crate::middleware::rate_limit::cleanup_task;
use crate::middleware::{create_cors_layer, RateLimitLayer, TracingLayer};
use crate::router::{build_router, GatewayState};
use crate::GatewayConfig;
use rfq_store::ChannelStore;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;
use tower::ServiceBuilder;
use tower_http::timeout::TimeoutLayer;
use tracing::{error, info};

/// The operator API service: one HTTP listener serving REST routes and the
/// WebSocket upgrade route behind the same middleware stack.
pub struct GatewayService<S: ChannelStore + 'static> {
    config: GatewayConfig,
    state: Arc<GatewayState<S>>,
    rate_limit: RateLimitLayer,
    shutdown_tx: Option<oneshot::Sender<()>>,
}

impl<S: ChannelStore + 'static> GatewayService<S> {
    pub fn new(config: GatewayConfig, state: Arc<GatewayState<S>>) -> Result<Self, GatewayError> {
        config.validate().map_err(|e| GatewayError::Config(e.to_string()))?;

        let rate_limit = RateLimitLayer::new(config.rate_limit.clone());

        Ok(Self { config, state, rate_limit, shutdown_tx: None })
    }

    /// Binds the listener and serves until `shutdown` is called.
    pub async fn start(&mut self) -> Result<(), GatewayError> {
        info!("starting gateway service");

        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        self.shutdown_tx = Some(shutdown_tx);

        self.start_cleanup_task();

        let router = self.build_router();
        let addr = self.config.http_addr();

        info!(addr = %addr, "binding http listener");
        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Bind(e.to_string()))?;

        tokio::select! {
            result = axum::serve(listener, router) => {
                if let Err(e) = result {
                    error!(error = %e, "gateway server error");
                }
            }
            _ = shutdown_rx => {
                info!("received shutdown signal");
            }
        }

        info!("gateway service stopped");
        Ok(())
    }

    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }

    fn build_router(&self) -> axum::Router {
        let middleware = ServiceBuilder::new()
            .layer(create_cors_layer(&self.config.cors))
            .layer(TracingLayer::new())
            .layer(TimeoutLayer::new(self.config.timeouts.default))
            .layer(self.rate_limit.clone());

        build_router(Arc::clone(&self.state)).layer(middleware)
    }

    fn start_cleanup_task(&self) {
        let state = self.rate_limit.state();
        tokio::spawn(cleanup_task(state, Duration::from_secs(60), Duration::from_secs(300)));
    }
}
