//! REST routes for the operator API (§6).
//!
//! One [`GatewayState`] is shared across every handler. It holds the
//! already-wired coordinator core — state machine, message pipeline,
//! settlement driver, store, event bus — plus the pieces the HTTP layer
//! itself owns: the clock and the EIP-712 domain separator handed back to
//! callers on channel open.

use crate::domain::error::GatewayError;
use crate::domain::types::{
    ChannelListResponse, CheckpointRequest, CloseRequest, OpenChannelResponse, ParticipantQuery,
};
use crate::ports::outbound::TimeSource;
use axum::extract::{Path, Query, State, WebSocketUpgrade};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use rfq_bus::{EventFilter, SharedBus};
use rfq_crypto::domain::eip712::DomainSeparator;
use rfq_pipeline::MessagePipeline;
use rfq_settlement::SettlementDriver;
use rfq_state::ChannelStateMachine;
use rfq_store::ChannelStore;
use rfq_types::{Channel, ChannelId, ChannelStateSnapshot, Message, OpenChannelParams};
use std::sync::Arc;

/// Everything a handler needs, wired once at startup.
pub struct GatewayState<S: ChannelStore> {
    pub machine: Arc<ChannelStateMachine<S>>,
    pub pipeline: Arc<MessagePipeline<S>>,
    pub settlement: Arc<SettlementDriver<S>>,
    pub store: Arc<S>,
    pub bus: SharedBus,
    pub time: Arc<dyn TimeSource>,
    pub domain: DomainSeparator,
    pub chain_id: u64,
}

pub fn build_router<S: ChannelStore + 'static>(state: Arc<GatewayState<S>>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/channels", post(open_channel::<S>).get(list_channels::<S>))
        .route("/channels/:id", get(get_channel::<S>))
        .route("/channels/:id/messages", post(submit_message::<S>))
        .route("/channels/:id/checkpoint", post(request_checkpoint::<S>))
        .route("/channels/:id/close", post(close_channel::<S>))
        .route("/ws", get(ws_upgrade::<S>))
        .with_state(state)
}

async fn health_check() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok"}))
}

async fn open_channel<S: ChannelStore + 'static>(
    State(state): State<Arc<GatewayState<S>>>,
    Json(params): Json<OpenChannelParams>,
) -> Result<Response, GatewayError> {
    let now_ms = state.time.now();
    let (channel_id, channel) =
        state.machine.open(params, now_ms).map_err(|e| GatewayError::from_state(e, ChannelId(0)))?;

    let initial_state = ChannelStateSnapshot::from_channel(&channel, state.chain_id, now_ms);
    let body = OpenChannelResponse { channel_id, initial_state, domain: state.domain.clone() };
    Ok((axum::http::StatusCode::CREATED, Json(body)).into_response())
}

async fn get_channel<S: ChannelStore + 'static>(
    State(state): State<Arc<GatewayState<S>>>,
    Path(channel_id): Path<ChannelId>,
) -> Result<Json<Channel>, GatewayError> {
    let channel =
        state.machine.get_state(channel_id).map_err(|e| GatewayError::from_state(e, channel_id))?;
    Ok(Json(channel))
}

async fn list_channels<S: ChannelStore + 'static>(
    State(state): State<Arc<GatewayState<S>>>,
    Query(query): Query<ParticipantQuery>,
) -> Result<Json<ChannelListResponse>, GatewayError> {
    let participant = query.parse().map_err(|e| GatewayError::BadRequest(e.to_string()))?;
    let channel_ids = state
        .store
        .channels_for_participant(participant)
        .map_err(|e| GatewayError::from_store(e, ChannelId(0)))?;
    Ok(Json(ChannelListResponse { channel_ids }))
}

async fn submit_message<S: ChannelStore + 'static>(
    State(state): State<Arc<GatewayState<S>>>,
    Path(channel_id): Path<ChannelId>,
    Json(message): Json<Message>,
) -> Result<Json<Channel>, GatewayError> {
    if message.channel_id() != channel_id {
        return Err(GatewayError::BadRequest("message channel_id does not match path".into()));
    }

    let now_ms = state.time.now();
    let channel = state
        .pipeline
        .submit(message, now_ms)
        .await
        .map_err(|e| GatewayError::from_pipeline(e, channel_id))?;
    Ok(Json(channel))
}

async fn request_checkpoint<S: ChannelStore + 'static>(
    State(state): State<Arc<GatewayState<S>>>,
    Path(channel_id): Path<ChannelId>,
    Json(body): Json<CheckpointRequest>,
) -> Result<Response, GatewayError> {
    let now_ms = state.time.now();
    let checkpoint = state
        .settlement
        .request_checkpoint(channel_id, body.trader_signature, body.lp_signature, now_ms)
        .map_err(|e| GatewayError::from_settlement(e, channel_id))?;
    Ok((axum::http::StatusCode::CREATED, Json(checkpoint)).into_response())
}

async fn close_channel<S: ChannelStore + 'static>(
    State(state): State<Arc<GatewayState<S>>>,
    Path(channel_id): Path<ChannelId>,
    Json(body): Json<CloseRequest>,
) -> Result<Response, GatewayError> {
    let now_ms = state.time.now();
    let request = state
        .settlement
        .close(channel_id, body.trader_signature, body.lp_signature, now_ms)
        .map_err(|e| GatewayError::from_settlement(e, channel_id))?;
    Ok((axum::http::StatusCode::ACCEPTED, Json(request)).into_response())
}

#[derive(serde::Deserialize)]
struct WsQuery {
    channel_id: Option<u128>,
    alerts_only: Option<bool>,
}

async fn ws_upgrade<S: ChannelStore + 'static>(
    State(state): State<Arc<GatewayState<S>>>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let filter = match (query.channel_id, query.alerts_only.unwrap_or(false)) {
        (Some(id), _) => EventFilter::for_channel(ChannelId(id)),
        (None, true) => EventFilter::alerts(),
        (None, false) => EventFilter::all(),
    };

    let bus = state.bus.clone();
    ws.on_upgrade(move |socket| async move {
        crate::ws::WebSocketHandler::new(bus, filter).handle(socket).await;
    })
}
