//! Replays the seed scenarios against the in-memory store: happy-path
//! open->trade->close, stale-nonce and bad-signature rejection, the
//! timeout path, and a checkpoint round trip.

use std::sync::Arc;

use k256::ecdsa::SigningKey;
use rfq_crypto::{hash_channel_state, hash_message, recover_signer, DomainSeparator};
use rfq_state::{ChannelStateMachine, StateConfig, StateError};
use rfq_store::{ChannelStore, InMemoryChannelStore};
use rfq_types::{
    Address, Amount, ChannelStateSnapshot, ChannelStatus, Message, OpenChannelParams, Side,
    Signature,
};

fn domain() -> DomainSeparator {
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

fn keypair() -> (SigningKey, Address) {
    let key = SigningKey::random(&mut rand::thread_rng());
    let probe = [7u8; 32];
    let sig = sign_raw(&probe, &key);
    let address = recover_signer(&probe, &sig).expect("recovery of probe signature");
    (key, address)
}

fn machine_with_store() -> (ChannelStateMachine<InMemoryChannelStore>, Arc<InMemoryChannelStore>) {
    let store = Arc::new(InMemoryChannelStore::new());
    let machine = ChannelStateMachine::new(Arc::clone(&store), StateConfig::default());
    (machine, store)
}

/// S1: happy path open -> quote request -> quote -> fill -> close.
/// Amounts use the protocol's uniform 1e18 fixed-point scale on both
/// legs so `quantity * price / 1e18` lands on whole-token movements.
#[test]
fn s1_happy_path_open_trade_close() {
    let (trader_key, trader) = keypair();
    let (lp_key, lp) = keypair();
    let (machine, store) = machine_with_store();

    let usdc = [0xAAu8; 20];
    let weth = [0xBBu8; 20];
    let one_e18 = Amount::from(10u64).pow(Amount::from(18u64));

    let (channel_id, _) = machine
        .open(
            OpenChannelParams {
                trader,
                lp,
                deposits: vec![(usdc, Amount::from(1_000u64) * one_e18)],
                timeout_ms: 3_600_000,
            },
            0,
        )
        .unwrap();

    // Fund the LP side with WETH so the fill has something to sell.
    let mut channel = store.get(channel_id).unwrap().unwrap();
    channel.lp_balances.insert(weth, one_e18);
    store.put(channel_id, channel).unwrap();

    let quantity = Amount::from(5u64) * Amount::from(10u64).pow(Amount::from(17u64)); // 0.5 WETH
    let price = Amount::from(2_000u64) * one_e18;

    let mut request = Message::QuoteRequest {
        channel_id,
        nonce: 1,
        side: Side::Buy,
        base_token: weth,
        quote_token: usdc,
        quantity,
        max_slippage_bps: 50,
        timestamp: 1,
        trader,
        signature: [0u8; 65],
    };
    let __hash = hash_message(&request, &domain());
    if let Message::QuoteRequest { signature, .. } = &mut request {
        *signature = sign_raw(&__hash, &trader_key);
    }
    machine.apply_message(request, 1).unwrap();

    let mut quote = Message::Quote {
        channel_id,
        quote_id: "Q1".into(),
        request_nonce: 1,
        price,
        quantity,
        side: Side::Buy,
        expiry_timestamp: 30_000,
        lp_fee_bps: 30,
        timestamp: 2,
        lp,
        signature: [0u8; 65],
    };
    let __hash = hash_message(&quote, &domain());
    if let Message::Quote { signature, .. } = &mut quote {
        *signature = sign_raw(&__hash, &lp_key);
    }
    machine.apply_message(quote, 2).unwrap();

    let mut fill = Message::Fill {
        channel_id,
        quote_id: "Q1".into(),
        fill_id: "F1".into(),
        nonce: 2,
        quantity,
        price,
        timestamp: 3,
        trader,
        lp,
        trader_signature: [0u8; 65],
        lp_signature: [0u8; 65],
    };
    let fill_hash = hash_message(&fill, &domain());
    if let Message::Fill { trader_signature, lp_signature, .. } = &mut fill {
        *trader_signature = sign_raw(&fill_hash, &trader_key);
        *lp_signature = sign_raw(&fill_hash, &lp_key);
    }
    let channel = machine.apply_message(fill, 3).unwrap();

    let notional = Amount::from(1_000u64) * one_e18;
    assert_eq!(channel.trader_balances[&usdc], Amount::zero());
    assert_eq!(channel.trader_balances[&weth], quantity);
    assert_eq!(channel.lp_balances[&usdc], notional);
    assert_eq!(channel.lp_balances[&weth], one_e18 - quantity);
    assert_eq!(channel.total_balance(&usdc), notional);
    assert_eq!(channel.total_balance(&weth), one_e18);

    let closed = machine.close(channel_id).unwrap();
    assert_eq!(closed.status, ChannelStatus::Settling);
}

/// S2: replaying the accepted `QuoteRequest` fails with `stale_nonce` and
/// leaves the channel's nonce unchanged.
#[test]
fn s2_stale_nonce_replay_is_rejected() {
    let (trader_key, trader) = keypair();
    let (_, lp) = keypair();
    let (machine, _store) = machine_with_store();

    let (channel_id, _) = machine
        .open(
            OpenChannelParams {
                trader,
                lp,
                deposits: vec![([0xAAu8; 20], Amount::from(1_000u64))],
                timeout_ms: 3_600_000,
            },
            0,
        )
        .unwrap();

    let mut request = Message::QuoteRequest {
        channel_id,
        nonce: 1,
        side: Side::Buy,
        base_token: [0xBBu8; 20],
        quote_token: [0xAAu8; 20],
        quantity: Amount::from(5u64),
        max_slippage_bps: 50,
        timestamp: 1,
        trader,
        signature: [0u8; 65],
    };
    let __hash = hash_message(&request, &domain());
    if let Message::QuoteRequest { signature, .. } = &mut request {
        *signature = sign_raw(&__hash, &trader_key);
    }
    let accepted = machine.apply_message(request.clone(), 1).unwrap();
    assert_eq!(accepted.nonce, 1);

    let err = machine.apply_message(request, 2).unwrap_err();
    assert!(matches!(err, StateError::StaleNonce { current: 1, got: 1, .. }));
    assert_eq!(machine.get_state(channel_id).unwrap().nonce, 1);
}

/// S3: a well-formed message signed by a non-participant fails with
/// `bad_signature` and leaves the channel untouched.
#[test]
fn s3_non_participant_signature_is_rejected() {
    let (_, trader) = keypair();
    let (_, lp) = keypair();
    let (outsider_key, _outsider) = keypair();
    let (machine, _store) = machine_with_store();

    let (channel_id, _) = machine
        .open(
            OpenChannelParams {
                trader,
                lp,
                deposits: vec![([0xAAu8; 20], Amount::from(1_000u64))],
                timeout_ms: 3_600_000,
            },
            0,
        )
        .unwrap();

    let mut heartbeat = Message::Heartbeat {
        channel_id,
        nonce: 1,
        timestamp: 1,
        sender: trader,
        signature: [0u8; 65],
    };
    let __hash = hash_message(&heartbeat, &domain());
    if let Message::Heartbeat { signature, .. } = &mut heartbeat {
        // Signed by an address that is not `trader`, so recovery will not
        // match the claimed sender.
        *signature = sign_raw(&__hash, &outsider_key);
    }

    let err = machine.apply_message(heartbeat, 1).unwrap_err();
    assert!(matches!(err, StateError::BadSignature(_)));
    let channel = machine.get_state(channel_id).unwrap();
    assert_eq!(channel.nonce, 0);
    assert_eq!(channel.last_activity, 0);
}

/// A `Quote` carrying a timestamp outside the skew window is rejected
/// with `stale_timestamp`, the same as a `Heartbeat` or nonce-advancing
/// message would be, and the quote is not recorded.
#[test]
fn quote_with_stale_timestamp_is_rejected() {
    let (trader_key, trader) = keypair();
    let (lp_key, lp) = keypair();
    let (machine, _store) = machine_with_store();

    let (channel_id, _) = machine
        .open(
            OpenChannelParams {
                trader,
                lp,
                deposits: vec![([0xAAu8; 20], Amount::from(1_000u64))],
                timeout_ms: 3_600_000,
            },
            0,
        )
        .unwrap();

    let mut request = Message::QuoteRequest {
        channel_id,
        nonce: 1,
        side: Side::Buy,
        base_token: [0xBBu8; 20],
        quote_token: [0xAAu8; 20],
        quantity: Amount::from(5u64),
        max_slippage_bps: 50,
        timestamp: 1,
        trader,
        signature: [0u8; 65],
    };
    let __hash = hash_message(&request, &domain());
    if let Message::QuoteRequest { signature, .. } = &mut request {
        *signature = sign_raw(&__hash, &trader_key);
    }
    machine.apply_message(request, 1).unwrap();

    let skew = StateConfig::default().skew_window_ms;
    let mut quote = Message::Quote {
        channel_id,
        quote_id: "Q1".into(),
        request_nonce: 1,
        price: Amount::from(2_000u64),
        quantity: Amount::from(5u64),
        side: Side::Buy,
        expiry_timestamp: 30_000,
        lp_fee_bps: 30,
        timestamp: skew + 10_000,
        lp,
        signature: [0u8; 65],
    };
    let __hash = hash_message(&quote, &domain());
    if let Message::Quote { signature, .. } = &mut quote {
        *signature = sign_raw(&__hash, &lp_key);
    }

    let err = machine.apply_message(quote, 1).unwrap_err();
    assert!(matches!(err, StateError::StaleTimestamp { .. }));
    assert!(machine.get_state(channel_id).unwrap().quotes.is_empty());
}

/// S5: a channel past its `timeout_at` transitions to `timed_out`, and a
/// message submitted afterward fails with `wrong_status`.
#[test]
fn s5_timeout_path() {
    let (_, trader) = keypair();
    let (_, lp) = keypair();
    let store = Arc::new(InMemoryChannelStore::new());
    let mut config = StateConfig::default();
    config.timeout_floor_ms = 0;
    let machine = ChannelStateMachine::new(Arc::clone(&store), config);

    let (channel_id, opened) = machine
        .open(
            OpenChannelParams {
                trader,
                lp,
                deposits: vec![([0xAAu8; 20], Amount::from(1u64))],
                timeout_ms: 1_000,
            },
            0,
        )
        .unwrap();
    assert_eq!(opened.timeout_at, 1_000);

    let err = machine.mark_timed_out(channel_id, 500).unwrap_err();
    assert!(matches!(err, StateError::WrongStatus { .. }));

    let timed_out = machine.mark_timed_out(channel_id, 1_000).unwrap();
    assert_eq!(timed_out.status, ChannelStatus::TimedOut);

    let mut heartbeat = Message::Heartbeat {
        channel_id,
        nonce: 1,
        timestamp: 1_001,
        sender: trader,
        signature: [0u8; 65],
    };
    let __hash = hash_message(&heartbeat, &domain());
    if let Message::Heartbeat { signature, .. } = &mut heartbeat {
        *signature = sign_raw(&__hash, &SigningKey::random(&mut rand::thread_rng()));
    }
    let err = machine.apply_message(heartbeat, 1_001).unwrap_err();
    assert!(matches!(err, StateError::WrongStatus { .. }));
}

/// S6: checkpoint round trip, plus a check that the state hash recorded
/// on the last nonce-advancing transition matches an independent
/// recomputation from the channel's own fields.
#[test]
fn s6_checkpoint_round_trip_and_hash_consistency() {
    let (trader_key, trader) = keypair();
    let (_, lp) = keypair();
    let (machine, store) = machine_with_store();

    let (channel_id, _) = machine
        .open(
            OpenChannelParams {
                trader,
                lp,
                deposits: vec![([0xAAu8; 20], Amount::from(1_000u64))],
                timeout_ms: 3_600_000,
            },
            0,
        )
        .unwrap();

    let mut request = Message::QuoteRequest {
        channel_id,
        nonce: 1,
        side: Side::Buy,
        base_token: [0xBBu8; 20],
        quote_token: [0xAAu8; 20],
        quantity: Amount::from(5u64),
        max_slippage_bps: 50,
        timestamp: 1,
        trader,
        signature: [0u8; 65],
    };
    let __hash = hash_message(&request, &domain());
    if let Message::QuoteRequest { signature, .. } = &mut request {
        *signature = sign_raw(&__hash, &trader_key);
    }
    let advanced = machine.apply_message(request, 2).unwrap();

    let snapshot = ChannelStateSnapshot::from_channel(&advanced, 1, 2);
    let recomputed_at_nonce_advance = hash_channel_state(&snapshot, &domain());
    assert_eq!(advanced.last_state_hash, recomputed_at_nonce_advance);

    // Request the checkpoint well after the nonce-advancing message, and
    // with a balance mutated directly through the store in between (as a
    // stand-in for time passing with no further messages). If
    // `request_checkpoint` merely carried the old hash forward instead of
    // recomputing it, the post-checkpoint hash would still equal
    // `recomputed_at_nonce_advance` even though the channel it was hashed
    // from no longer exists.
    let checkpoint_ms = 500;
    let mut mutated = store.get(channel_id).unwrap().unwrap();
    mutated.trader_balances.insert([0xCCu8; 20], Amount::from(42u64));
    store.put(channel_id, mutated.clone()).unwrap();

    let checkpointing = machine.request_checkpoint(channel_id, checkpoint_ms).unwrap();
    assert_eq!(checkpointing.status, ChannelStatus::Checkpointing);
    assert_eq!(checkpointing.last_checkpoint_at, Some(checkpoint_ms));

    let checkpoint_snapshot = ChannelStateSnapshot::from_channel(&mutated, 1, checkpoint_ms);
    let recomputed_at_checkpoint = hash_channel_state(&checkpoint_snapshot, &domain());
    assert_ne!(recomputed_at_checkpoint, recomputed_at_nonce_advance);
    assert_eq!(checkpointing.last_state_hash, recomputed_at_checkpoint);

    let active = machine.commit_checkpoint(channel_id).unwrap();
    assert_eq!(active.status, ChannelStatus::Active);
    assert_eq!(active.last_state_hash, recomputed_at_checkpoint);
}
