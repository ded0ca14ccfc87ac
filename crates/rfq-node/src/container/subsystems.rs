//! # Subsystem Container
//!
//! Wires the coordinator core to the operator gateway.
//!
//! ## Initialization Order
//!
//! ```text
//! Level 0: Event Bus (no dependencies)
//! Level 1: Channel Store (no dependencies)
//! Level 2: Channel State Machine (depends on Store)
//! Level 3: Message Pipeline, Settlement Driver (depend on State Machine, Store, Bus)
//! Level 4: Gateway State (depends on everything above)
//! ```
//!
//! ## Thread Safety
//!
//! Every wired component is `Arc`-shared; the store and state machine are
//! internally synchronized, so no outer lock wraps them here.

use std::sync::Arc;

use tracing::info;

use crate::container::config::NodeConfig;
use rfq_bus::InMemoryEventBus;
use rfq_crypto::domain::eip712::DomainSeparator;
use rfq_gateway::GatewayState;
use rfq_pipeline::MessagePipeline;
use rfq_settlement::adapters::NoopSubmitter;
use rfq_settlement::SettlementDriver;
use rfq_state::ChannelStateMachine;
use rfq_store::InMemoryChannelStore;

/// Central container holding every wired coordinator component.
///
/// This is the main integration point: `rfq-gateway`'s handlers and the
/// timer wheel both operate on the same `Arc`-shared instances held here.
pub struct NodeContainer {
    pub store: Arc<InMemoryChannelStore>,
    pub machine: Arc<ChannelStateMachine<InMemoryChannelStore>>,
    pub pipeline: Arc<MessagePipeline<InMemoryChannelStore>>,
    pub settlement: Arc<SettlementDriver<InMemoryChannelStore>>,
    pub bus: Arc<InMemoryEventBus>,
    pub config: NodeConfig,
}

impl NodeContainer {
    /// Create a new container with every coordinator component initialized
    /// and wired to the in-memory reference store.
    ///
    /// ## Initialization Phases
    ///
    /// 1. Shared infrastructure (event bus, store)
    /// 2. Channel state machine over the store
    /// 3. Message pipeline and settlement driver over the state machine
    pub fn new(config: NodeConfig) -> Self {
        info!("initializing coordinator subsystem container");

        info!("phase 1: shared infrastructure");
        let bus: Arc<InMemoryEventBus> = Arc::new(InMemoryEventBus::new());
        let store = Arc::new(InMemoryChannelStore::new());

        info!("phase 2: channel state machine");
        let machine = Arc::new(ChannelStateMachine::new(Arc::clone(&store), config.state.clone()));

        info!("phase 3: message pipeline and settlement driver");
        let pipeline = Arc::new(MessagePipeline::new(
            Arc::clone(&machine),
            Arc::clone(&store),
            bus.clone(),
            config.pipeline.clone(),
        ));

        let domain = DomainSeparator::new("PhotonX", "1", config.network.chain_id);
        let submitter = Arc::new(NoopSubmitter::new());
        let settlement = Arc::new(SettlementDriver::new(
            Arc::clone(&machine),
            submitter,
            config.settlement.clone(),
            domain,
        ));

        info!("all coordinator components initialized");

        Self { store, machine, pipeline, settlement, bus, config }
    }

    /// Create a container for testing with in-memory backends.
    pub fn new_for_testing() -> Self {
        Self::new(NodeConfig::default())
    }

    /// Builds the [`GatewayState`] the operator API routes against.
    pub fn gateway_state(&self) -> Arc<GatewayState<InMemoryChannelStore>> {
        let domain = DomainSeparator::new("PhotonX", "1", self.config.network.chain_id);
        Arc::new(GatewayState {
            machine: Arc::clone(&self.machine),
            pipeline: Arc::clone(&self.pipeline),
            settlement: Arc::clone(&self.settlement),
            store: Arc::clone(&self.store),
            bus: self.bus.clone(),
            time: Arc::new(rfq_gateway::ports::SystemTimeSource),
            domain,
            chain_id: self.config.network.chain_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfq_store::ChannelStore;

    #[test]
    fn container_initialization_wires_every_component() {
        let container = NodeContainer::new_for_testing();
        assert_eq!(container.bus.subscriber_count(), 0);
        assert!(container.store.all_channel_ids().unwrap().is_empty());
    }

    #[test]
    fn gateway_state_shares_the_same_store() {
        let container = NodeContainer::new_for_testing();
        let state = container.gateway_state();
        assert!(Arc::ptr_eq(&state.store, &container.store));
    }
}
