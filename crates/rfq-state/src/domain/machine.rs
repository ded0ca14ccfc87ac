//! # Channel State Machine
//!
//! Holds exactly one authoritative record per live channel and applies
//! validated transitions under the store's per-channel lock (§4.1). Every
//! public method here is the last line of defense: even though
//! `rfq-pipeline` pre-validates shape, lookup, and ordering, the state
//! machine re-derives the signer and re-checks nonce/timestamp/balance
//! rules against the record it is about to mutate, since those are only
//! safe to evaluate under the lock.

use crate::domain::errors::StateError;
use crate::domain::entities::StateConfig;
use rfq_crypto::{hash_message, recover_signer, DomainSeparator};
use rfq_store::{ChannelStore, ChannelWrite};
use rfq_types::{
    Address, Amount, Channel, ChannelId, ChannelStatus, Message, OpenChannelParams, QuoteRecord,
    Side,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Channel state machine over a [`ChannelStore`] backend.
pub struct ChannelStateMachine<S: ChannelStore> {
    store: Arc<S>,
    config: StateConfig,
}

impl<S: ChannelStore> ChannelStateMachine<S> {
    pub fn new(store: Arc<S>, config: StateConfig) -> Self {
        Self { store, config }
    }

    fn domain(&self) -> DomainSeparator {
        DomainSeparator::new("PhotonX", "1", self.config.chain_id)
            .with_verifying_contract(self.config.verifying_contract)
    }

    /// §4.1 `open`.
    pub fn open(&self, params: OpenChannelParams, now_ms: u64) -> Result<(ChannelId, Channel), StateError> {
        if params.trader == params.lp {
            return Err(StateError::InvalidParticipant);
        }
        if params.deposits.iter().any(|(_, amount)| amount.is_zero()) {
            return Err(StateError::InvalidDeposit);
        }
        if params.timeout_ms < self.config.timeout_floor_ms {
            return Err(StateError::TimeoutTooShort {
                requested: params.timeout_ms,
                floor: self.config.timeout_floor_ms,
            });
        }

        let channel_id = derive_channel_id(&params, now_ms);
        let tokens: Vec<Address> = params.deposits.iter().map(|(t, _)| *t).collect();
        let mut trader_balances = BTreeMap::new();
        for (token, amount) in &params.deposits {
            trader_balances.insert(*token, *amount);
        }

        let mut channel = Channel {
            channel_id,
            trader: params.trader,
            lp: params.lp,
            tokens,
            nonce: 0,
            trader_balances,
            lp_balances: BTreeMap::new(),
            quotes: BTreeMap::new(),
            status: ChannelStatus::Active,
            opened_at: now_ms,
            last_checkpoint_at: None,
            last_activity: now_ms,
            timeout_at: now_ms + params.timeout_ms,
            last_state_hash: [0u8; 32],
        };
        channel.last_state_hash = self.state_hash(&channel, now_ms);

        self.store.put(channel_id, channel.clone())?;
        tracing::info!(%channel_id, trader = ?channel.trader, lp = ?channel.lp, "channel opened");
        Ok((channel_id, channel))
    }

    /// §4.1 `get_state`.
    pub fn get_state(&self, channel_id: ChannelId) -> Result<Channel, StateError> {
        self.store
            .get(channel_id)?
            .ok_or(StateError::NotFound(channel_id))
    }

    /// §4.1 `apply_message`.
    pub fn apply_message(&self, message: Message, now_ms: u64) -> Result<Channel, StateError> {
        let channel_id = message.channel_id();
        let mut channel = self.get_state(channel_id)?;

        match &message {
            Message::Heartbeat { sender, timestamp, signature, .. } => {
                if !channel.status.accepts_heartbeat() {
                    return Err(StateError::WrongStatus { channel_id, status: channel.status });
                }
                if *sender != channel.trader && *sender != channel.lp {
                    return Err(StateError::NotParticipant(channel_id));
                }
                self.check_timestamp(channel_id, &channel, *timestamp, now_ms)?;
                let recovered = recover_signer(&hash_message(&message, &self.domain()), signature)
                    .map_err(|_| StateError::BadSignature(channel_id))?;
                if recovered != *sender {
                    return Err(StateError::BadSignature(channel_id));
                }
                channel.last_activity = now_ms;
                self.store.put(channel_id, channel.clone())?;
                return Ok(channel);
            }
            Message::Quote {
                quote_id,
                request_nonce,
                timestamp,
                ..
            } => {
                if channel.quotes.contains_key(quote_id) {
                    // Idempotent replay: the quote is already recorded.
                    return Ok(channel);
                }
                if !channel.status.accepts_trading() {
                    return Err(StateError::WrongStatus { channel_id, status: channel.status });
                }
                self.check_timestamp(channel_id, &channel, *timestamp, now_ms)?;
                self.verify_quote_signature(&message, &channel)?;
                let original = self
                    .store
                    .get_message(channel_id, *request_nonce)?
                    .ok_or_else(|| StateError::QuoteNotFound(quote_id.clone()))?;
                let record = self.build_quote_record(&message, &original)?;
                channel.quotes.insert(quote_id.clone(), record);
                channel.last_activity = now_ms;
                self.store.put(channel_id, channel.clone())?;
                return Ok(channel);
            }
            _ => {}
        }

        // Remaining variants (QuoteRequest, Fill, Cancel, Replace) advance
        // the channel nonce and land both the record and the archived
        // message in one transactional write.
        if !channel.status.accepts_trading() {
            return Err(StateError::WrongStatus { channel_id, status: channel.status });
        }

        let nonce = message.nonce();
        if nonce <= channel.nonce {
            return Err(StateError::StaleNonce { channel_id, current: channel.nonce, got: nonce });
        }
        let timestamp = message.timestamp();
        self.check_timestamp(channel_id, &channel, timestamp, now_ms)?;

        match &message {
            Message::QuoteRequest { trader, signature, .. } => {
                if *trader != channel.trader {
                    return Err(StateError::NotParticipant(channel_id));
                }
                self.verify_signer(&message, *trader, signature, channel_id)?;
            }
            Message::Fill {
                trader,
                lp,
                trader_signature,
                lp_signature,
                quote_id,
                fill_id: _,
                quantity,
                price,
                ..
            } => {
                if *trader != channel.trader || *lp != channel.lp {
                    return Err(StateError::NotParticipant(channel_id));
                }
                self.verify_signer(&message, *trader, trader_signature, channel_id)?;
                self.verify_signer(&message, *lp, lp_signature, channel_id)?;
                self.apply_fill(&mut channel, quote_id, *quantity, *price, timestamp)?;
            }
            Message::Cancel { trader, signature, quote_id, .. } => {
                if *trader != channel.trader {
                    return Err(StateError::NotParticipant(channel_id));
                }
                self.verify_signer(&message, *trader, signature, channel_id)?;
                self.cancel_quote(&mut channel, quote_id)?;
            }
            Message::Replace { trader, signature, original_quote_id, new_quote_request, .. } => {
                if *trader != channel.trader {
                    return Err(StateError::NotParticipant(channel_id));
                }
                self.verify_signer(&message, *trader, signature, channel_id)?;
                if let Message::QuoteRequest { trader: inner_trader, signature: inner_sig, .. } =
                    new_quote_request.as_ref()
                {
                    if *inner_trader != channel.trader {
                        return Err(StateError::NotParticipant(channel_id));
                    }
                    self.verify_signer(new_quote_request, *inner_trader, inner_sig, channel_id)?;
                } else {
                    return Err(StateError::InvariantViolation(channel_id));
                }
                // Cancel(q_old) only if it is still live; a cancelled/filled
                // quote is tolerated so the replace can still proceed.
                if channel.quotes.contains_key(original_quote_id) {
                    self.cancel_quote(&mut channel, original_quote_id)?;
                }
            }
            _ => unreachable!("heartbeat and quote handled above"),
        }

        channel.nonce = nonce;
        channel.last_activity = now_ms;
        channel.last_state_hash = self.state_hash(&channel, now_ms);

        let stored_message = match &message {
            Message::Replace { new_quote_request, .. } => (**new_quote_request).clone(),
            other => other.clone(),
        };

        self.store.transactional_put_many(vec![ChannelWrite {
            channel_id,
            record: channel.clone(),
            message_nonce: nonce,
            message: stored_message,
        }])?;

        Ok(channel)
    }

    /// §4.1 `request_checkpoint`: `active → checkpointing`.
    pub fn request_checkpoint(&self, channel_id: ChannelId, now_ms: u64) -> Result<Channel, StateError> {
        let mut channel = self.get_state(channel_id)?;
        if channel.status != ChannelStatus::Active {
            return Err(StateError::WrongStatus { channel_id, status: channel.status });
        }
        channel.status = ChannelStatus::Checkpointing;
        channel.last_checkpoint_at = Some(now_ms);
        channel.last_state_hash = self.state_hash(&channel, now_ms);
        self.store.put(channel_id, channel.clone())?;
        Ok(channel)
    }

    /// Internal completion of a checkpoint: `checkpointing → active`.
    pub fn commit_checkpoint(&self, channel_id: ChannelId) -> Result<Channel, StateError> {
        let mut channel = self.get_state(channel_id)?;
        if channel.status != ChannelStatus::Checkpointing {
            return Err(StateError::WrongStatus { channel_id, status: channel.status });
        }
        channel.status = ChannelStatus::Active;
        self.store.put(channel_id, channel.clone())?;
        Ok(channel)
    }

    /// §4.1 `close`: transitions to `settling`.
    pub fn close(&self, channel_id: ChannelId) -> Result<Channel, StateError> {
        let mut channel = self.get_state(channel_id)?;
        if channel.status.is_terminal() || channel.status == ChannelStatus::Settling {
            return Err(StateError::WrongStatus { channel_id, status: channel.status });
        }
        channel.status = ChannelStatus::Settling;
        self.store.put(channel_id, channel.clone())?;
        Ok(channel)
    }

    /// Completes settlement: `settling -> closed`, invoked by the
    /// settlement driver once a final-state submission confirms on-chain.
    pub fn mark_closed(&self, channel_id: ChannelId) -> Result<Channel, StateError> {
        let mut channel = self.get_state(channel_id)?;
        if channel.status != ChannelStatus::Settling {
            return Err(StateError::WrongStatus { channel_id, status: channel.status });
        }
        channel.status = ChannelStatus::Closed;
        self.store.put(channel_id, channel.clone())?;
        Ok(channel)
    }

    /// §4.1 `mark_timed_out`: invoked by the timer wheel once `now >= timeout_at`.
    pub fn mark_timed_out(&self, channel_id: ChannelId, now_ms: u64) -> Result<Channel, StateError> {
        let mut channel = self.get_state(channel_id)?;
        if channel.status.is_terminal() || now_ms < channel.timeout_at {
            return Err(StateError::WrongStatus { channel_id, status: channel.status });
        }
        channel.status = ChannelStatus::TimedOut;
        self.store.put(channel_id, channel.clone())?;
        Ok(channel)
    }

    /// Escalates a channel to `disputed` after store retries are exhausted
    /// (§4.1 failure semantics).
    pub fn mark_disputed(&self, channel_id: ChannelId) -> Result<Channel, StateError> {
        let mut channel = self.get_state(channel_id)?;
        channel.status = ChannelStatus::Disputed;
        self.store.put(channel_id, channel.clone())?;
        tracing::warn!(%channel_id, "channel escalated to disputed");
        Ok(channel)
    }

    fn check_timestamp(
        &self,
        channel_id: ChannelId,
        channel: &Channel,
        timestamp: u64,
        now_ms: u64,
    ) -> Result<(), StateError> {
        if timestamp <= channel.last_activity {
            return Err(StateError::StaleTimestamp {
                channel_id,
                current: channel.last_activity,
                got: timestamp,
            });
        }
        let skew = now_ms.abs_diff(timestamp);
        if skew > self.config.skew_window_ms {
            return Err(StateError::StaleTimestamp { channel_id, current: now_ms, got: timestamp });
        }
        Ok(())
    }

    fn verify_signer(
        &self,
        message: &Message,
        expected: Address,
        signature: &[u8; 65],
        channel_id: ChannelId,
    ) -> Result<(), StateError> {
        let hash = hash_message(message, &self.domain());
        let recovered =
            recover_signer(&hash, signature).map_err(|_| StateError::BadSignature(channel_id))?;
        if recovered != expected {
            return Err(StateError::BadSignature(channel_id));
        }
        Ok(())
    }

    fn verify_quote_signature(&self, message: &Message, channel: &Channel) -> Result<(), StateError> {
        if let Message::Quote { lp, signature, .. } = message {
            if *lp != channel.lp {
                return Err(StateError::NotParticipant(channel.channel_id));
            }
            self.verify_signer(message, *lp, signature, channel.channel_id)
        } else {
            unreachable!("verify_quote_signature called on non-Quote message")
        }
    }

    fn build_quote_record(&self, quote: &Message, original: &Message) -> Result<QuoteRecord, StateError> {
        let (quote_id, request_nonce, price, quantity, side, expiry_timestamp, lp_fee_bps) = match quote {
            Message::Quote {
                quote_id,
                request_nonce,
                price,
                quantity,
                side,
                expiry_timestamp,
                lp_fee_bps,
                ..
            } => (quote_id.clone(), *request_nonce, *price, *quantity, *side, *expiry_timestamp, *lp_fee_bps),
            _ => unreachable!(),
        };

        let (base_token, quote_token, req_side) = match original {
            Message::QuoteRequest { base_token, quote_token, side, .. } => (*base_token, *quote_token, *side),
            _ => return Err(StateError::InvariantViolation(quote.channel_id())),
        };

        if req_side != side {
            return Err(StateError::InvariantViolation(quote.channel_id()));
        }

        Ok(QuoteRecord {
            quote_id,
            request_nonce,
            side,
            base_token,
            quote_token,
            price,
            quantity,
            lp_fee_bps,
            expiry_timestamp,
            filled: false,
        })
    }

    fn cancel_quote(&self, channel: &mut Channel, quote_id: &str) -> Result<(), StateError> {
        let record = channel
            .quotes
            .get(quote_id)
            .ok_or_else(|| StateError::QuoteNotFound(quote_id.to_string()))?;
        if record.filled {
            return Err(StateError::AlreadyFilled(quote_id.to_string()));
        }
        channel.quotes.remove(quote_id);
        Ok(())
    }

    fn apply_fill(
        &self,
        channel: &mut Channel,
        quote_id: &str,
        quantity: Amount,
        price: Amount,
        timestamp: u64,
    ) -> Result<(), StateError> {
        let record = channel
            .quotes
            .get(quote_id)
            .ok_or_else(|| StateError::QuoteNotFound(quote_id.to_string()))?
            .clone();

        if record.filled {
            return Err(StateError::AlreadyFilled(quote_id.to_string()));
        }
        if timestamp >= record.expiry_timestamp {
            return Err(StateError::QuoteExpired(quote_id.to_string()));
        }
        if quantity != record.quantity || price != record.price {
            return Err(StateError::InvariantViolation(channel.channel_id));
        }

        let scale = Amount::from(10u64).pow(Amount::from(18u64));
        let notional = quantity
            .checked_mul(price)
            .ok_or(StateError::InvariantViolation(channel.channel_id))?
            .checked_div(scale)
            .ok_or(StateError::InvariantViolation(channel.channel_id))?;

        let (buyer_balances, seller_balances) = match record.side {
            Side::Buy => (&mut channel.trader_balances, &mut channel.lp_balances),
            Side::Sell => (&mut channel.lp_balances, &mut channel.trader_balances),
        };

        let buyer_quote_balance = buyer_balances.entry(record.quote_token).or_default();
        let new_buyer_quote = buyer_quote_balance
            .checked_sub(notional)
            .ok_or(StateError::InsufficientBalance { channel_id: channel.channel_id })?;
        *buyer_quote_balance = new_buyer_quote;
        *buyer_balances.entry(record.base_token).or_default() += quantity;

        *seller_balances.entry(record.quote_token).or_default() += notional;
        let seller_base_balance = seller_balances.entry(record.base_token).or_default();
        let new_seller_base = seller_base_balance
            .checked_sub(quantity)
            .ok_or(StateError::InsufficientBalance { channel_id: channel.channel_id })?;
        *seller_base_balance = new_seller_base;

        channel
            .quotes
            .get_mut(quote_id)
            .expect("checked present above")
            .filled = true;

        Ok(())
    }

    fn state_hash(&self, channel: &Channel, timestamp: u64) -> rfq_types::Hash {
        let snapshot = rfq_types::ChannelStateSnapshot::from_channel(channel, self.config.chain_id, timestamp);
        rfq_crypto::hash_channel_state(&snapshot, &self.domain())
    }
}

fn derive_channel_id(params: &OpenChannelParams, now_ms: u64) -> ChannelId {
    let mut buf = Vec::with_capacity(48);
    buf.extend_from_slice(&params.trader);
    buf.extend_from_slice(&params.lp);
    buf.extend_from_slice(&now_ms.to_be_bytes());
    let hash = rfq_crypto::keccak256(&buf);
    let mut low16 = [0u8; 16];
    low16.copy_from_slice(&hash[16..]);
    ChannelId::from_bytes(low16)
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::SigningKey;
    use rfq_crypto::{hash_message, recover_signer, DomainSeparator};
    use rfq_store::InMemoryChannelStore;
    use rfq_types::Signature;

    fn test_domain() -> DomainSeparator {
        DomainSeparator::new("PhotonX", "1", 1)
    }

    fn sign_raw(hash: &rfq_types::Hash, key: &SigningKey) -> Signature {
        let (sig, recid) = key.sign_prehash_recoverable(hash).expect("signing failed");
        let sig_bytes = sig.to_bytes();
        let mut out = [0u8; 65];
        out[..32].copy_from_slice(&sig_bytes[..32]);
        out[32..64].copy_from_slice(&sig_bytes[32..]);
        out[64] = recid.to_byte() + 27;
        out
    }

    /// A key plus the address `recover_signer` derives from it, so tests
    /// never need direct pubkey-to-address conversion.
    fn keypair() -> (SigningKey, Address) {
        let key = SigningKey::random(&mut rand::thread_rng());
        let probe = [7u8; 32];
        let sig = sign_raw(&probe, &key);
        let address = recover_signer(&probe, &sig).expect("recovery of probe signature");
        (key, address)
    }

    fn machine() -> ChannelStateMachine<InMemoryChannelStore> {
        ChannelStateMachine::new(Arc::new(InMemoryChannelStore::new()), StateConfig::default())
    }

    fn sign_quote_request(
        key: &SigningKey,
        channel_id: ChannelId,
        nonce: u64,
        side: Side,
        base_token: Address,
        quote_token: Address,
        quantity: Amount,
        timestamp: u64,
        trader: Address,
    ) -> Message {
        let mut msg = Message::QuoteRequest {
            channel_id,
            nonce,
            side,
            base_token,
            quote_token,
            quantity,
            max_slippage_bps: 100,
            timestamp,
            trader,
            signature: [0u8; 65],
        };
        let sig = sign_raw(&hash_message(&msg, &test_domain()), key);
        if let Message::QuoteRequest { signature, .. } = &mut msg {
            *signature = sig;
        }
        msg
    }

    #[test]
    fn open_rejects_identical_trader_and_lp() {
        let (_, addr) = keypair();
        let m = machine();
        let params = OpenChannelParams {
            trader: addr,
            lp: addr,
            deposits: vec![([9u8; 20], Amount::from(100u64))],
            timeout_ms: 120_000,
        };
        assert!(matches!(m.open(params, 0).unwrap_err(), StateError::InvalidParticipant));
    }

    #[test]
    fn open_rejects_timeout_below_floor() {
        let (_, trader) = keypair();
        let (_, lp) = keypair();
        let m = machine();
        let params = OpenChannelParams {
            trader,
            lp,
            deposits: vec![([9u8; 20], Amount::from(100u64))],
            timeout_ms: 1_000,
        };
        assert!(matches!(
            m.open(params, 0).unwrap_err(),
            StateError::TimeoutTooShort { .. }
        ));
    }

    #[test]
    fn open_creates_active_channel_with_initial_deposits() {
        let (_, trader) = keypair();
        let (_, lp) = keypair();
        let m = machine();
        let token = [9u8; 20];
        let params = OpenChannelParams {
            trader,
            lp,
            deposits: vec![(token, Amount::from(1_000u64))],
            timeout_ms: 120_000,
        };
        let (channel_id, channel) = m.open(params, 1_000).unwrap();
        assert_eq!(channel.status, ChannelStatus::Active);
        assert_eq!(channel.trader_balances.get(&token).copied().unwrap(), Amount::from(1_000u64));
        assert_eq!(m.get_state(channel_id).unwrap().nonce, 0);
    }

    #[test]
    fn quote_request_quote_and_fill_move_balances() {
        let (trader_key, trader) = keypair();
        let (lp_key, lp) = keypair();
        let m = machine();
        let base = [1u8; 20];
        let quote_token = [2u8; 20];
        let (channel_id, _) = m
            .open(
                OpenChannelParams {
                    trader,
                    lp,
                    deposits: vec![(quote_token, Amount::from(1_000_000u64))],
                    timeout_ms: 120_000,
                },
                0,
            )
            .unwrap();
        // fund the LP side with base token so the fill can settle.
        let mut channel = m.get_state(channel_id).unwrap();
        channel.lp_balances.insert(base, Amount::from(10u64));
        m.store.put(channel_id, channel).unwrap();

        let request = sign_quote_request(
            &trader_key, channel_id, 1, Side::Buy, base, quote_token, Amount::from(5u64), 100, trader,
        );
        m.apply_message(request, 100).unwrap();

        let mut quote = Message::Quote {
            channel_id,
            quote_id: "q1".into(),
            request_nonce: 1,
            price: Amount::from(1_000_000_000_000_000_000u64), // 1.0 scaled by 1e18
            quantity: Amount::from(5u64),
            side: Side::Buy,
            expiry_timestamp: 10_000,
            lp_fee_bps: 10,
            timestamp: 200,
            lp,
            signature: [0u8; 65],
        };
        let sig = sign_raw(&hash_message(&quote, &test_domain()), &lp_key);
        if let Message::Quote { signature, .. } = &mut quote {
            *signature = sig;
        }
        let channel = m.apply_message(quote, 200).unwrap();
        assert!(channel.quotes.contains_key("q1"));

        let mut fill = Message::Fill {
            channel_id,
            quote_id: "q1".into(),
            fill_id: "f1".into(),
            nonce: 2,
            quantity: Amount::from(5u64),
            price: Amount::from(1_000_000_000_000_000_000u64),
            timestamp: 300,
            trader,
            lp,
            trader_signature: [0u8; 65],
            lp_signature: [0u8; 65],
        };
        let fill_hash = hash_message(&fill, &test_domain());
        if let Message::Fill { trader_signature, lp_signature, .. } = &mut fill {
            *trader_signature = sign_raw(&fill_hash, &trader_key);
            *lp_signature = sign_raw(&fill_hash, &lp_key);
        }
        let channel = m.apply_message(fill, 300).unwrap();
        assert!(channel.quotes.get("q1").unwrap().filled);
        assert_eq!(channel.trader_balances.get(&quote_token).copied().unwrap(), Amount::from(999_995u64));
        assert_eq!(channel.trader_balances.get(&base).copied().unwrap(), Amount::from(5u64));
        assert_eq!(channel.lp_balances.get(&base).copied().unwrap(), Amount::from(5u64));
    }

    #[test]
    fn stale_nonce_is_rejected() {
        let (trader_key, trader) = keypair();
        let (_, lp) = keypair();
        let m = machine();
        let base = [1u8; 20];
        let quote_token = [2u8; 20];
        let (channel_id, _) = m
            .open(
                OpenChannelParams {
                    trader,
                    lp,
                    deposits: vec![(quote_token, Amount::from(1_000u64))],
                    timeout_ms: 120_000,
                },
                0,
            )
            .unwrap();
        let request = sign_quote_request(
            &trader_key, channel_id, 1, Side::Buy, base, quote_token, Amount::from(5u64), 100, trader,
        );
        m.apply_message(request, 100).unwrap();

        let replay = sign_quote_request(
            &trader_key, channel_id, 1, Side::Buy, base, quote_token, Amount::from(5u64), 200, trader,
        );
        assert!(matches!(
            m.apply_message(replay, 200).unwrap_err(),
            StateError::StaleNonce { .. }
        ));
    }

    #[test]
    fn heartbeat_does_not_advance_channel_nonce() {
        let (trader_key, trader) = keypair();
        let (_, lp) = keypair();
        let m = machine();
        let (channel_id, _) = m
            .open(
                OpenChannelParams {
                    trader,
                    lp,
                    deposits: vec![([9u8; 20], Amount::from(1u64))],
                    timeout_ms: 120_000,
                },
                0,
            )
            .unwrap();

        let mut heartbeat = Message::Heartbeat {
            channel_id,
            nonce: 999,
            timestamp: 100,
            sender: trader,
            signature: [0u8; 65],
        };
        let sig = sign_raw(&hash_message(&heartbeat, &test_domain()), &trader_key);
        if let Message::Heartbeat { signature, .. } = &mut heartbeat {
            *signature = sig;
        }
        let channel = m.apply_message(heartbeat, 100).unwrap();
        assert_eq!(channel.nonce, 0);
        assert_eq!(channel.last_activity, 100);
    }

    #[test]
    fn cancel_rejects_unknown_quote() {
        let (trader_key, trader) = keypair();
        let (_, lp) = keypair();
        let m = machine();
        let (channel_id, _) = m
            .open(
                OpenChannelParams {
                    trader,
                    lp,
                    deposits: vec![([9u8; 20], Amount::from(1u64))],
                    timeout_ms: 120_000,
                },
                0,
            )
            .unwrap();

        let mut cancel = Message::Cancel {
            channel_id,
            quote_id: "missing".into(),
            nonce: 1,
            timestamp: 100,
            trader,
            signature: [0u8; 65],
        };
        let sig = sign_raw(&hash_message(&cancel, &test_domain()), &trader_key);
        if let Message::Cancel { signature, .. } = &mut cancel {
            *signature = sig;
        }
        assert!(matches!(
            m.apply_message(cancel, 100).unwrap_err(),
            StateError::QuoteNotFound(_)
        ));
    }

    #[test]
    fn checkpoint_round_trip() {
        let (_, trader) = keypair();
        let (_, lp) = keypair();
        let m = machine();
        let (channel_id, _) = m
            .open(
                OpenChannelParams {
                    trader,
                    lp,
                    deposits: vec![([9u8; 20], Amount::from(1u64))],
                    timeout_ms: 120_000,
                },
                0,
            )
            .unwrap();
        let channel = m.request_checkpoint(channel_id, 500).unwrap();
        assert_eq!(channel.status, ChannelStatus::Checkpointing);
        let channel = m.commit_checkpoint(channel_id).unwrap();
        assert_eq!(channel.status, ChannelStatus::Active);
    }

    #[test]
    fn mark_timed_out_before_deadline_is_rejected() {
        let (_, trader) = keypair();
        let (_, lp) = keypair();
        let m = machine();
        let (channel_id, _) = m
            .open(
                OpenChannelParams {
                    trader,
                    lp,
                    deposits: vec![([9u8; 20], Amount::from(1u64))],
                    timeout_ms: 120_000,
                },
                0,
            )
            .unwrap();
        assert!(matches!(
            m.mark_timed_out(channel_id, 1_000).unwrap_err(),
            StateError::WrongStatus { .. }
        ));
        let channel = m.mark_timed_out(channel_id, 200_000).unwrap();
        assert_eq!(channel.status, ChannelStatus::TimedOut);
    }
}
