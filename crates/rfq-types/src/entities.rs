//! # Core Domain Entities
//!
//! Defines the entities named in the data model: channels, wire messages,
//! checkpoints, and settlement requests.
//!
//! ## Clusters
//!
//! - **Identifiers**: `ChannelId`, `Address`, `Hash`, `Amount`
//! - **Channel**: `Channel`, `ChannelStatus`, `QuoteRecord`
//! - **Wire messages**: `Message`, `Side`
//! - **Settlement**: `Checkpoint`, `SettlementRequest`, `SubmissionStatus`

use crate::codec::HexPrefixed;
use primitive_types::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_with::serde_as;
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// A 20-byte account address (lower-case hex with `0x` prefix on the wire).
pub type Address = [u8; 20];

/// A 32-byte hash (Keccak-256 of a canonical encoding).
pub type Hash = [u8; 32];

/// A 65-byte `r||s||v` ECDSA signature.
pub type Signature = [u8; 65];

/// A 256-bit unsigned monetary quantity. Thin alias over `primitive_types::U256`
/// so every crate shares the same overflow/underflow-checked arithmetic type.
pub type Amount = U256;

/// Opaque 128-bit channel identifier, stringified as `0x`-prefixed hex for
/// external use (logs, wire payloads, the operator API).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChannelId(pub u128);

impl ChannelId {
    /// Builds a channel id from raw bytes (e.g. the low 16 bytes of a hash).
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(u128::from_be_bytes(bytes))
    }

    pub fn to_bytes(self) -> [u8; 16] {
        self.0.to_be_bytes()
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{:032x}", self.0)
    }
}

/// A channel id string that isn't `0x`-prefixed 32-hex-digit.
#[derive(Debug, Error)]
#[error("invalid channel id: expected a 0x-prefixed 32-hex-digit value")]
pub struct ParseChannelIdError;

impl FromStr for ChannelId {
    type Err = ParseChannelIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").ok_or(ParseChannelIdError)?;
        let value = u128::from_str_radix(stripped, 16).map_err(|_| ParseChannelIdError)?;
        Ok(Self(value))
    }
}

// `ChannelId` is stringified on the wire (§6), not serialized as the bare
// `u128` a derive would produce, so `Serialize`/`Deserialize` round-trip
// through `Display`/`FromStr` by hand.
impl Serialize for ChannelId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChannelId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Which side of the book a `QuoteRequest`/`Quote` refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// The side as seen by the counterparty.
    pub fn flip(self) -> Side {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

/// Channel status, per the state machine in §4.1. `Closed` and `Expired`
/// are terminal; a channel in either status is immutable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    Opening,
    Active,
    Checkpointing,
    Settling,
    Closed,
    Disputed,
    TimedOut,
    Expired,
}

impl ChannelStatus {
    /// Statuses that still accept a trading message.
    pub fn accepts_trading(self) -> bool {
        matches!(self, ChannelStatus::Active)
    }

    /// Statuses that also accept a `Heartbeat` (§4.2 validation stage 2).
    pub fn accepts_heartbeat(self) -> bool {
        matches!(self, ChannelStatus::Active | ChannelStatus::Checkpointing)
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, ChannelStatus::Closed | ChannelStatus::Expired)
    }
}

/// A live (unfilled, uncancelled, unexpired) quote recorded by the state
/// machine so `Fill`/`Cancel` have something concrete to cross-reference
/// against (§4.2 stage 6, supplemented from the original quote registry).
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuoteRecord {
    pub quote_id: String,
    pub request_nonce: u64,
    pub side: Side,
    #[serde_as(as = "HexPrefixed")]
    pub base_token: Address,
    #[serde_as(as = "HexPrefixed")]
    pub quote_token: Address,
    pub price: Amount,
    pub quantity: Amount,
    pub lp_fee_bps: u16,
    pub expiry_timestamp: u64,
    pub filled: bool,
}

/// The authoritative channel record (§3 Data Model).
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Channel {
    pub channel_id: ChannelId,
    #[serde_as(as = "HexPrefixed")]
    pub trader: Address,
    #[serde_as(as = "HexPrefixed")]
    pub lp: Address,
    /// Token identifiers held in this channel, in deposit order.
    #[serde_as(as = "Vec<HexPrefixed>")]
    pub tokens: Vec<Address>,
    pub nonce: u64,
    #[serde_as(as = "BTreeMap<HexPrefixed, _>")]
    pub trader_balances: BTreeMap<Address, Amount>,
    #[serde_as(as = "BTreeMap<HexPrefixed, _>")]
    pub lp_balances: BTreeMap<Address, Amount>,
    /// Live quotes keyed by `quote_id`, cleared on fill/cancel/expiry.
    pub quotes: BTreeMap<String, QuoteRecord>,
    pub status: ChannelStatus,
    pub opened_at: u64,
    pub last_checkpoint_at: Option<u64>,
    pub last_activity: u64,
    pub timeout_at: u64,
    #[serde_as(as = "HexPrefixed")]
    pub last_state_hash: Hash,
}

impl Channel {
    /// Sum of trader + LP balances for `token`, used by the conservation
    /// invariant check in tests and by the settlement driver.
    pub fn total_balance(&self, token: &Address) -> Amount {
        let t = self.trader_balances.get(token).copied().unwrap_or_default();
        let l = self.lp_balances.get(token).copied().unwrap_or_default();
        t.saturating_add(l)
    }
}

/// Parameters for opening a new channel (§4.1 `open`).
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenChannelParams {
    #[serde_as(as = "HexPrefixed")]
    pub trader: Address,
    #[serde_as(as = "HexPrefixed")]
    pub lp: Address,
    #[serde_as(as = "Vec<(HexPrefixed, _)>")]
    pub deposits: Vec<(Address, Amount)>,
    pub timeout_ms: u64,
}

/// The wire `ChannelState` payload (§6): a dual-signable snapshot of a
/// channel at a given nonce.
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChannelStateSnapshot {
    pub channel_id: ChannelId,
    pub nonce: u64,
    #[serde_as(as = "HexPrefixed")]
    pub trader: Address,
    #[serde_as(as = "HexPrefixed")]
    pub lp: Address,
    #[serde_as(as = "Vec<HexPrefixed>")]
    pub tokens: Vec<Address>,
    pub trader_balances: Vec<Amount>,
    pub lp_balances: Vec<Amount>,
    pub timestamp: u64,
    pub chain_id: u64,
}

impl ChannelStateSnapshot {
    /// Builds the wire snapshot from the authoritative record, ordering
    /// balance vectors to match `tokens`.
    pub fn from_channel(channel: &Channel, chain_id: u64, timestamp: u64) -> Self {
        let trader_balances = channel
            .tokens
            .iter()
            .map(|t| channel.trader_balances.get(t).copied().unwrap_or_default())
            .collect();
        let lp_balances = channel
            .tokens
            .iter()
            .map(|t| channel.lp_balances.get(t).copied().unwrap_or_default())
            .collect();
        Self {
            channel_id: channel.channel_id,
            nonce: channel.nonce,
            trader: channel.trader,
            lp: channel.lp,
            tokens: channel.tokens.clone(),
            trader_balances,
            lp_balances,
            timestamp,
            chain_id,
        }
    }
}

/// Tagged union of inbound wire messages (§3, §6). An exhaustive match in
/// validation replaces open-ended dispatch tables (§9 design notes).
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    QuoteRequest {
        channel_id: ChannelId,
        nonce: u64,
        side: Side,
        #[serde_as(as = "HexPrefixed")]
        base_token: Address,
        #[serde_as(as = "HexPrefixed")]
        quote_token: Address,
        quantity: Amount,
        max_slippage_bps: u16,
        timestamp: u64,
        #[serde_as(as = "HexPrefixed")]
        trader: Address,
        #[serde_as(as = "HexPrefixed")]
        signature: Signature,
    },
    Quote {
        channel_id: ChannelId,
        quote_id: String,
        request_nonce: u64,
        price: Amount,
        quantity: Amount,
        side: Side,
        expiry_timestamp: u64,
        lp_fee_bps: u16,
        timestamp: u64,
        #[serde_as(as = "HexPrefixed")]
        lp: Address,
        #[serde_as(as = "HexPrefixed")]
        signature: Signature,
    },
    Fill {
        channel_id: ChannelId,
        quote_id: String,
        fill_id: String,
        nonce: u64,
        quantity: Amount,
        price: Amount,
        timestamp: u64,
        #[serde_as(as = "HexPrefixed")]
        trader: Address,
        #[serde_as(as = "HexPrefixed")]
        lp: Address,
        #[serde_as(as = "HexPrefixed")]
        trader_signature: Signature,
        #[serde_as(as = "HexPrefixed")]
        lp_signature: Signature,
    },
    Cancel {
        channel_id: ChannelId,
        quote_id: String,
        nonce: u64,
        timestamp: u64,
        #[serde_as(as = "HexPrefixed")]
        trader: Address,
        #[serde_as(as = "HexPrefixed")]
        signature: Signature,
    },
    Replace {
        channel_id: ChannelId,
        original_quote_id: String,
        new_quote_request: Box<Message>,
        nonce: u64,
        timestamp: u64,
        #[serde_as(as = "HexPrefixed")]
        trader: Address,
        #[serde_as(as = "HexPrefixed")]
        signature: Signature,
    },
    Heartbeat {
        channel_id: ChannelId,
        nonce: u64,
        timestamp: u64,
        #[serde_as(as = "HexPrefixed")]
        sender: Address,
        #[serde_as(as = "HexPrefixed")]
        signature: Signature,
    },
}

impl Message {
    pub fn channel_id(&self) -> ChannelId {
        match self {
            Message::QuoteRequest { channel_id, .. }
            | Message::Quote { channel_id, .. }
            | Message::Fill { channel_id, .. }
            | Message::Cancel { channel_id, .. }
            | Message::Replace { channel_id, .. }
            | Message::Heartbeat { channel_id, .. } => *channel_id,
        }
    }

    /// The nonce this message advances the channel to, if it is
    /// nonce-advancing (§4.1). `Quote` does not consume a channel nonce;
    /// it is addressed by the `request_nonce` of the request it answers.
    pub fn nonce(&self) -> u64 {
        match self {
            Message::QuoteRequest { nonce, .. }
            | Message::Fill { nonce, .. }
            | Message::Cancel { nonce, .. }
            | Message::Replace { nonce, .. }
            | Message::Heartbeat { nonce, .. } => *nonce,
            Message::Quote { request_nonce, .. } => *request_nonce,
        }
    }

    pub fn timestamp(&self) -> u64 {
        match self {
            Message::QuoteRequest { timestamp, .. }
            | Message::Quote { timestamp, .. }
            | Message::Fill { timestamp, .. }
            | Message::Cancel { timestamp, .. }
            | Message::Replace { timestamp, .. }
            | Message::Heartbeat { timestamp, .. } => *timestamp,
        }
    }

    /// Whether this variant advances the channel nonce on acceptance
    /// (§4.1: heartbeats refresh `last_activity` only).
    pub fn advances_nonce(&self) -> bool {
        !matches!(self, Message::Heartbeat { .. })
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Message::QuoteRequest { .. } => "quote_request",
            Message::Quote { .. } => "quote",
            Message::Fill { .. } => "fill",
            Message::Cancel { .. } => "cancel",
            Message::Replace { .. } => "replace",
            Message::Heartbeat { .. } => "heartbeat",
        }
    }
}

/// A dual-signed checkpoint (§3, §4.3).
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Checkpoint {
    pub channel_id: ChannelId,
    pub nonce: u64,
    #[serde_as(as = "HexPrefixed")]
    pub state_hash: Hash,
    #[serde_as(as = "HexPrefixed")]
    pub trader_signature: Signature,
    #[serde_as(as = "HexPrefixed")]
    pub lp_signature: Signature,
    pub created_at: u64,
}

/// Submission lifecycle for a final settlement (§3, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Submitted,
    Confirmed,
    Failed,
}

/// A final dual-signed state plus its submission status (§3).
#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRequest {
    pub channel_id: ChannelId,
    pub final_state: ChannelStateSnapshot,
    #[serde_as(as = "HexPrefixed")]
    pub trader_signature: Signature,
    #[serde_as(as = "HexPrefixed")]
    pub lp_signature: Signature,
    pub status: SubmissionStatus,
    pub attempts: u32,
    /// A higher-nonce state staged during an active dispute window (§4.3).
    pub staged_dispute: Option<Box<SettlementRequest>>,
}
