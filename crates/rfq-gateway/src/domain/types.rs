//! Wire DTOs for the operator API.
//!
//! Most request bodies are the core entities themselves (`OpenChannelParams`,
//! `Message`) — they already carry the serde impls a wire format needs. This
//! module only adds the handful of shapes that exist purely at the HTTP
//! boundary: the open-channel response envelope and the dual-signed
//! checkpoint/close request bodies.

use rfq_crypto::domain::eip712::DomainSeparator;
use rfq_types::codec::HexPrefixed;
use rfq_types::{Address, ChannelId, ChannelStateSnapshot, Signature};
use serde::{Deserialize, Serialize};
use serde_with::serde_as;

/// Response to `POST /channels` (§6): the new channel plus the domain
/// separator the participants need to produce signable typed-data hashes.
#[derive(Debug, Clone, Serialize)]
pub struct OpenChannelResponse {
    pub channel_id: ChannelId,
    pub initial_state: ChannelStateSnapshot,
    pub domain: DomainSeparator,
}

/// Body for `POST /channels/:id/checkpoint`: a dual-signed snapshot of the
/// channel at its current nonce.
#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct CheckpointRequest {
    #[serde_as(as = "HexPrefixed")]
    pub trader_signature: Signature,
    #[serde_as(as = "HexPrefixed")]
    pub lp_signature: Signature,
}

/// Body for `POST /channels/:id/close`: a dual-signed final state.
#[serde_as]
#[derive(Debug, Clone, Deserialize)]
pub struct CloseRequest {
    #[serde_as(as = "HexPrefixed")]
    pub trader_signature: Signature,
    #[serde_as(as = "HexPrefixed")]
    pub lp_signature: Signature,
}

/// Query params for `GET /channels?participant=<hex address>`.
#[derive(Debug, Clone, Deserialize)]
pub struct ParticipantQuery {
    pub participant: String,
}

impl ParticipantQuery {
    pub fn parse(&self) -> Result<Address, hex::FromHexError> {
        let hexed = self.participant.strip_prefix("0x").unwrap_or(&self.participant);
        let bytes = hex::decode(hexed)?;
        bytes.try_into().map_err(|_| hex::FromHexError::InvalidStringLength)
    }
}

/// Response to `GET /channels?participant=`.
#[derive(Debug, Clone, Serialize)]
pub struct ChannelListResponse {
    pub channel_ids: Vec<ChannelId>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn participant_query_parses_0x_prefixed_hex() {
        let query = ParticipantQuery { participant: "0x".to_string() + &"ab".repeat(20) };
        let parsed = query.parse().unwrap();
        assert_eq!(parsed, [0xab; 20]);
    }

    #[test]
    fn participant_query_rejects_wrong_length() {
        let query = ParticipantQuery { participant: "0xabcd".to_string() };
        assert!(query.parse().is_err());
    }

    #[test]
    fn checkpoint_request_parses_hex_string_signatures() {
        let body = serde_json::json!({
            "trader_signature": format!("0x{}", "11".repeat(65)),
            "lp_signature": format!("0x{}", "22".repeat(65)),
        });
        let request: CheckpointRequest = serde_json::from_value(body).unwrap();
        assert_eq!(request.trader_signature, [0x11u8; 65]);
        assert_eq!(request.lp_signature, [0x22u8; 65]);
    }
}
