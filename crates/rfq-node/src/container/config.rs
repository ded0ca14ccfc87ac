//! # Node Configuration
//!
//! Unified configuration for the coordinator binary: one sub-config per
//! wired component, each defaulted to the literal values named in §6, each
//! overridable via an `RFQ_*`-prefixed environment variable read at
//! startup.

use std::env;

/// Complete node configuration.
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Listener and clock identity.
    pub network: NetworkConfig,
    /// Channel timeout wheel.
    pub timer: TimerConfig,
    pub pipeline: rfq_pipeline::PipelineConfig,
    pub state: rfq_state::StateConfig,
    pub settlement: rfq_settlement::SettlementConfig,
    pub gateway: rfq_gateway::GatewayConfig,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            timer: TimerConfig::default(),
            pipeline: rfq_pipeline::PipelineConfig::default(),
            state: rfq_state::StateConfig::default(),
            settlement: rfq_settlement::SettlementConfig::default(),
            gateway: rfq_gateway::GatewayConfig::default(),
        }
    }
}

impl NodeConfig {
    /// Build configuration from defaults overridden by `RFQ_*` environment
    /// variables.
    ///
    /// # Environment Variables
    ///
    /// - `RFQ_CHAIN_ID`: domain-separator chain id (default: 1)
    /// - `RFQ_HTTP_HOST` / `RFQ_HTTP_PORT`: gateway listen address (default: 0.0.0.0:7420)
    /// - `RFQ_TIMER_INTERVAL_MS`: timer wheel sweep period (default: 5000)
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = env::var("RFQ_CHAIN_ID") {
            if let Ok(chain_id) = val.parse() {
                config.network.chain_id = chain_id;
                config.state.chain_id = chain_id;
            }
        }

        if let Ok(val) = env::var("RFQ_HTTP_HOST") {
            if let Ok(host) = val.parse() {
                config.gateway.http.host = host;
            }
        }

        if let Ok(val) = env::var("RFQ_HTTP_PORT") {
            if let Ok(port) = val.parse() {
                config.gateway.http.port = port;
            }
        }

        if let Ok(val) = env::var("RFQ_TIMER_INTERVAL_MS") {
            if let Ok(ms) = val.parse() {
                config.timer.sweep_interval_ms = ms;
            }
        }

        config
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gateway.validate().map_err(|e| ConfigError::Gateway(e.to_string()))?;
        if self.timer.sweep_interval_ms == 0 {
            return Err(ConfigError::InvalidTimer("sweep_interval_ms must be nonzero".into()));
        }
        Ok(())
    }
}

/// Network/identity configuration shared across the wired components.
#[derive(Debug, Clone)]
pub struct NetworkConfig {
    /// Chain id embedded in the domain separator (§4.5).
    pub chain_id: u64,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self { chain_id: 1 }
    }
}

/// Timer wheel configuration (§4.1 `mark_timed_out`).
#[derive(Debug, Clone)]
pub struct TimerConfig {
    /// How often the wheel scans every open channel for timeout expiry.
    pub sweep_interval_ms: u64,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self { sweep_interval_ms: 5_000 }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("gateway configuration error: {0}")]
    Gateway(String),
    #[error("timer configuration error: {0}")]
    InvalidTimer(String),
}
