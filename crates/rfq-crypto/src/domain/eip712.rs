//! # Domain-Separated Typed-Data Hashing
//!
//! Produces the digests that get ECDSA-signed over a `ChannelStateSnapshot`
//! or a wire `Message` (§4.5, §6). Follows the EIP-712 shape: a domain
//! separator binds signatures to this protocol, this version, and a chain,
//! and each payload type gets its own struct hash built from a fixed type
//! signature plus ABI-style 32-byte-word field encoding.
//!
//! Nested collections (token lists, balance vectors) hash as
//! `keccak256(concat(word_per_element))`, matching how Solidity's
//! `abi.encode` treats `bytes32[]`/`uint256[]` members of a typed struct.

use super::ecdsa::keccak256;
use rfq_types::{Address, Amount, ChannelStateSnapshot, Hash, Message};
use serde::{Deserialize, Serialize};

const EIP712_PREFIX: [u8; 2] = [0x19, 0x01];

/// Binds every signature to a protocol name, a version, a chain, and
/// optionally a verifying contract address (zero when there is none).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainSeparator {
    pub name: String,
    pub version: String,
    pub chain_id: u64,
    pub verifying_contract: Address,
}

impl DomainSeparator {
    pub fn new(name: impl Into<String>, version: impl Into<String>, chain_id: u64) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            chain_id,
            verifying_contract: [0u8; 20],
        }
    }

    pub fn with_verifying_contract(mut self, contract: Address) -> Self {
        self.verifying_contract = contract;
        self
    }

    /// `keccak256(EIP712Domain(string name,string version,uint256 chainId,address verifyingContract))`.
    fn hash(&self) -> Hash {
        const TYPE_SIG: &[u8] =
            b"EIP712Domain(string name,string version,uint256 chainId,address verifyingContract)";
        let type_hash = keccak256(TYPE_SIG);

        let mut buf = Vec::with_capacity(32 * 5);
        buf.extend_from_slice(&type_hash);
        buf.extend_from_slice(&keccak256(self.name.as_bytes()));
        buf.extend_from_slice(&keccak256(self.version.as_bytes()));
        buf.extend_from_slice(&word_u64(self.chain_id));
        buf.extend_from_slice(&word_address(&self.verifying_contract));
        keccak256(&buf)
    }
}

fn word_u64(v: u64) -> [u8; 32] {
    let mut w = [0u8; 32];
    w[24..].copy_from_slice(&v.to_be_bytes());
    w
}

fn word_u16(v: u16) -> [u8; 32] {
    let mut w = [0u8; 32];
    w[30..].copy_from_slice(&v.to_be_bytes());
    w
}

fn word_address(a: &Address) -> [u8; 32] {
    let mut w = [0u8; 32];
    w[12..].copy_from_slice(a);
    w
}

fn word_amount(a: &Amount) -> [u8; 32] {
    let mut w = [0u8; 32];
    a.to_big_endian(&mut w);
    w
}

fn word_bytes32(h: &Hash) -> [u8; 32] {
    *h
}

fn word_bytes(b: &[u8]) -> [u8; 32] {
    keccak256(b)
}

fn hash_address_array(items: &[Address]) -> Hash {
    let mut buf = Vec::with_capacity(32 * items.len());
    for item in items {
        buf.extend_from_slice(&word_address(item));
    }
    keccak256(&buf)
}

fn hash_amount_array(items: &[Amount]) -> Hash {
    let mut buf = Vec::with_capacity(32 * items.len());
    for item in items {
        buf.extend_from_slice(&word_amount(item));
    }
    keccak256(&buf)
}

/// Finalizes a struct hash into the signable EIP-712 digest:
/// `keccak256(0x1901 || domainSeparator || structHash)`.
fn finalize(domain: &DomainSeparator, struct_hash: Hash) -> Hash {
    let domain_hash = domain.hash();
    let mut buf = Vec::with_capacity(2 + 32 + 32);
    buf.extend_from_slice(&EIP712_PREFIX);
    buf.extend_from_slice(&domain_hash);
    buf.extend_from_slice(&struct_hash);
    keccak256(&buf)
}

/// Hashes a `ChannelStateSnapshot` for dual signing (checkpoint/settlement).
pub fn hash_channel_state(state: &ChannelStateSnapshot, domain: &DomainSeparator) -> Hash {
    const TYPE_SIG: &[u8] = b"ChannelState(uint128 channelId,uint64 nonce,address trader,address lp,bytes32 tokensHash,bytes32 traderBalancesHash,bytes32 lpBalancesHash,uint64 timestamp,uint64 chainId)";
    let type_hash = keccak256(TYPE_SIG);

    let mut channel_id_bytes = [0u8; 32];
    channel_id_bytes[16..].copy_from_slice(&state.channel_id.to_bytes());

    let tokens_hash = hash_address_array(&state.tokens);
    let trader_balances_hash = hash_amount_array(&state.trader_balances);
    let lp_balances_hash = hash_amount_array(&state.lp_balances);

    let mut buf = Vec::with_capacity(32 * 9);
    buf.extend_from_slice(&type_hash);
    buf.extend_from_slice(&channel_id_bytes);
    buf.extend_from_slice(&word_u64(state.nonce));
    buf.extend_from_slice(&word_address(&state.trader));
    buf.extend_from_slice(&word_address(&state.lp));
    buf.extend_from_slice(&word_bytes32(&tokens_hash));
    buf.extend_from_slice(&word_bytes32(&trader_balances_hash));
    buf.extend_from_slice(&word_bytes32(&lp_balances_hash));
    buf.extend_from_slice(&word_u64(state.timestamp));
    buf.extend_from_slice(&word_u64(state.chain_id));

    finalize(domain, keccak256(&buf))
}

/// Hashes a wire `Message` for the signature the sender attaches to it.
///
/// `Replace` recurses into its nested `new_quote_request`, which is always
/// a `QuoteRequest` by construction (§4.2 stage 1 enforces the shape
/// before this is ever called).
pub fn hash_message(message: &Message, domain: &DomainSeparator) -> Hash {
    let struct_hash = match message {
        Message::QuoteRequest {
            channel_id,
            nonce,
            side,
            base_token,
            quote_token,
            quantity,
            max_slippage_bps,
            timestamp,
            trader,
            ..
        } => {
            const TYPE_SIG: &[u8] = b"QuoteRequest(uint128 channelId,uint64 nonce,uint8 side,address baseToken,address quoteToken,uint256 quantity,uint16 maxSlippageBps,uint64 timestamp,address trader)";
            let mut buf = Vec::with_capacity(32 * 9);
            buf.extend_from_slice(&keccak256(TYPE_SIG));
            buf.extend_from_slice(&word_channel_id(*channel_id));
            buf.extend_from_slice(&word_u64(*nonce));
            buf.extend_from_slice(&word_u64(side_code(*side) as u64));
            buf.extend_from_slice(&word_address(base_token));
            buf.extend_from_slice(&word_address(quote_token));
            buf.extend_from_slice(&word_amount(quantity));
            buf.extend_from_slice(&word_u16(*max_slippage_bps));
            buf.extend_from_slice(&word_u64(*timestamp));
            buf.extend_from_slice(&word_address(trader));
            keccak256(&buf)
        }
        Message::Quote {
            channel_id,
            quote_id,
            request_nonce,
            price,
            quantity,
            side,
            expiry_timestamp,
            lp_fee_bps,
            timestamp,
            lp,
            ..
        } => {
            const TYPE_SIG: &[u8] = b"Quote(uint128 channelId,bytes32 quoteIdHash,uint64 requestNonce,uint256 price,uint256 quantity,uint8 side,uint64 expiryTimestamp,uint16 lpFeeBps,uint64 timestamp,address lp)";
            let mut buf = Vec::with_capacity(32 * 10);
            buf.extend_from_slice(&keccak256(TYPE_SIG));
            buf.extend_from_slice(&word_channel_id(*channel_id));
            buf.extend_from_slice(&word_bytes(quote_id.as_bytes()));
            buf.extend_from_slice(&word_u64(*request_nonce));
            buf.extend_from_slice(&word_amount(price));
            buf.extend_from_slice(&word_amount(quantity));
            buf.extend_from_slice(&word_u64(side_code(*side) as u64));
            buf.extend_from_slice(&word_u64(*expiry_timestamp));
            buf.extend_from_slice(&word_u16(*lp_fee_bps));
            buf.extend_from_slice(&word_u64(*timestamp));
            buf.extend_from_slice(&word_address(lp));
            keccak256(&buf)
        }
        Message::Fill {
            channel_id,
            quote_id,
            fill_id,
            nonce,
            quantity,
            price,
            timestamp,
            trader,
            lp,
            ..
        } => {
            const TYPE_SIG: &[u8] = b"Fill(uint128 channelId,bytes32 quoteIdHash,bytes32 fillIdHash,uint64 nonce,uint256 quantity,uint256 price,uint64 timestamp,address trader,address lp)";
            let mut buf = Vec::with_capacity(32 * 9);
            buf.extend_from_slice(&keccak256(TYPE_SIG));
            buf.extend_from_slice(&word_channel_id(*channel_id));
            buf.extend_from_slice(&word_bytes(quote_id.as_bytes()));
            buf.extend_from_slice(&word_bytes(fill_id.as_bytes()));
            buf.extend_from_slice(&word_u64(*nonce));
            buf.extend_from_slice(&word_amount(quantity));
            buf.extend_from_slice(&word_amount(price));
            buf.extend_from_slice(&word_u64(*timestamp));
            buf.extend_from_slice(&word_address(trader));
            buf.extend_from_slice(&word_address(lp));
            keccak256(&buf)
        }
        Message::Cancel {
            channel_id,
            quote_id,
            nonce,
            timestamp,
            trader,
            ..
        } => {
            const TYPE_SIG: &[u8] =
                b"Cancel(uint128 channelId,bytes32 quoteIdHash,uint64 nonce,uint64 timestamp,address trader)";
            let mut buf = Vec::with_capacity(32 * 5);
            buf.extend_from_slice(&keccak256(TYPE_SIG));
            buf.extend_from_slice(&word_channel_id(*channel_id));
            buf.extend_from_slice(&word_bytes(quote_id.as_bytes()));
            buf.extend_from_slice(&word_u64(*nonce));
            buf.extend_from_slice(&word_u64(*timestamp));
            buf.extend_from_slice(&word_address(trader));
            keccak256(&buf)
        }
        Message::Replace {
            channel_id,
            original_quote_id,
            new_quote_request,
            nonce,
            timestamp,
            trader,
            ..
        } => {
            const TYPE_SIG: &[u8] = b"Replace(uint128 channelId,bytes32 originalQuoteIdHash,bytes32 newQuoteRequestHash,uint64 nonce,uint64 timestamp,address trader)";
            let nested_hash = hash_message(new_quote_request, domain);
            let mut buf = Vec::with_capacity(32 * 6);
            buf.extend_from_slice(&keccak256(TYPE_SIG));
            buf.extend_from_slice(&word_channel_id(*channel_id));
            buf.extend_from_slice(&word_bytes(original_quote_id.as_bytes()));
            buf.extend_from_slice(&word_bytes32(&nested_hash));
            buf.extend_from_slice(&word_u64(*nonce));
            buf.extend_from_slice(&word_u64(*timestamp));
            buf.extend_from_slice(&word_address(trader));
            keccak256(&buf)
        }
        Message::Heartbeat {
            channel_id,
            nonce,
            timestamp,
            sender,
            ..
        } => {
            const TYPE_SIG: &[u8] =
                b"Heartbeat(uint128 channelId,uint64 nonce,uint64 timestamp,address sender)";
            let mut buf = Vec::with_capacity(32 * 4);
            buf.extend_from_slice(&keccak256(TYPE_SIG));
            buf.extend_from_slice(&word_channel_id(*channel_id));
            buf.extend_from_slice(&word_u64(*nonce));
            buf.extend_from_slice(&word_u64(*timestamp));
            buf.extend_from_slice(&word_address(sender));
            keccak256(&buf)
        }
    };

    finalize(domain, struct_hash)
}

fn word_channel_id(channel_id: rfq_types::ChannelId) -> [u8; 32] {
    let mut w = [0u8; 32];
    w[16..].copy_from_slice(&channel_id.to_bytes());
    w
}

fn side_code(side: rfq_types::Side) -> u8 {
    match side {
        rfq_types::Side::Buy => 0,
        rfq_types::Side::Sell => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rfq_types::ChannelId;

    fn domain() -> DomainSeparator {
        DomainSeparator::new("PhotonX", "1", 1)
    }

    #[test]
    fn channel_state_hash_is_deterministic() {
        let state = ChannelStateSnapshot {
            channel_id: ChannelId(1),
            nonce: 3,
            trader: [1u8; 20],
            lp: [2u8; 20],
            tokens: vec![[9u8; 20]],
            trader_balances: vec![Amount::from(100u64)],
            lp_balances: vec![Amount::from(50u64)],
            timestamp: 1000,
            chain_id: 1,
        };

        let h1 = hash_channel_state(&state, &domain());
        let h2 = hash_channel_state(&state, &domain());
        assert_eq!(h1, h2);
    }

    #[test]
    fn channel_state_hash_changes_with_nonce() {
        let mut state = ChannelStateSnapshot {
            channel_id: ChannelId(1),
            nonce: 3,
            trader: [1u8; 20],
            lp: [2u8; 20],
            tokens: vec![[9u8; 20]],
            trader_balances: vec![Amount::from(100u64)],
            lp_balances: vec![Amount::from(50u64)],
            timestamp: 1000,
            chain_id: 1,
        };

        let h1 = hash_channel_state(&state, &domain());
        state.nonce = 4;
        let h2 = hash_channel_state(&state, &domain());
        assert_ne!(h1, h2);
    }

    #[test]
    fn different_domains_produce_different_hashes() {
        let state = ChannelStateSnapshot {
            channel_id: ChannelId(1),
            nonce: 0,
            trader: [1u8; 20],
            lp: [2u8; 20],
            tokens: vec![],
            trader_balances: vec![],
            lp_balances: vec![],
            timestamp: 0,
            chain_id: 1,
        };

        let h_mainnet = hash_channel_state(&state, &DomainSeparator::new("PhotonX", "1", 1));
        let h_testnet = hash_channel_state(&state, &DomainSeparator::new("PhotonX", "1", 5));
        assert_ne!(h_mainnet, h_testnet);
    }

    #[test]
    fn heartbeat_hash_differs_from_cancel_with_same_fields() {
        let heartbeat = Message::Heartbeat {
            channel_id: ChannelId(1),
            nonce: 1,
            timestamp: 1,
            sender: [1u8; 20],
            signature: [0u8; 65],
        };
        let cancel = Message::Cancel {
            channel_id: ChannelId(1),
            quote_id: "q1".to_string(),
            nonce: 1,
            timestamp: 1,
            trader: [1u8; 20],
            signature: [0u8; 65],
        };

        let d = domain();
        assert_ne!(hash_message(&heartbeat, &d), hash_message(&cancel, &d));
    }

    #[test]
    fn replace_hash_incorporates_nested_request() {
        let d = domain();
        let inner_a = Message::QuoteRequest {
            channel_id: ChannelId(1),
            nonce: 2,
            side: rfq_types::Side::Buy,
            base_token: [1u8; 20],
            quote_token: [2u8; 20],
            quantity: Amount::from(10u64),
            max_slippage_bps: 50,
            timestamp: 10,
            trader: [1u8; 20],
            signature: [0u8; 65],
        };
        let inner_b = Message::QuoteRequest {
            channel_id: ChannelId(1),
            nonce: 2,
            side: rfq_types::Side::Buy,
            base_token: [1u8; 20],
            quote_token: [2u8; 20],
            quantity: Amount::from(20u64),
            max_slippage_bps: 50,
            timestamp: 10,
            trader: [1u8; 20],
            signature: [0u8; 65],
        };

        let replace_a = Message::Replace {
            channel_id: ChannelId(1),
            original_quote_id: "q0".to_string(),
            new_quote_request: Box::new(inner_a),
            nonce: 3,
            timestamp: 11,
            trader: [1u8; 20],
            signature: [0u8; 65],
        };
        let replace_b = Message::Replace {
            channel_id: ChannelId(1),
            original_quote_id: "q0".to_string(),
            new_quote_request: Box::new(inner_b),
            nonce: 3,
            timestamp: 11,
            trader: [1u8; 20],
            signature: [0u8; 65],
        };

        assert_ne!(hash_message(&replace_a, &d), hash_message(&replace_b, &d));
    }
}
