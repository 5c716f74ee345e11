// Copyright 2020. The Tari Project
//
// Redistribution and use in source and binary forms, with or without modification, are permitted provided that the
// following conditions are met:
//
// 1. Redistributions of source code must retain the above copyright notice, this list of conditions and the following
// disclaimer.
//
// 2. Redistributions in binary form must reproduce the above copyright notice, this list of conditions and the
// following disclaimer in the documentation and/or other materials provided with the distribution.
//
// 3. Neither the name of the copyright holder nor the names of its contributors may be used to endorse or promote
// products derived from this software without specific prior written permission.
//
// THIS SOFTWARE IS PROVIDED BY THE COPYRIGHT HOLDERS AND CONTRIBUTORS "AS IS" AND ANY EXPRESS OR IMPLIED WARRANTIES,
// INCLUDING, BUT NOT LIMITED TO, THE IMPLIED WARRANTIES OF MERCHANTABILITY AND FITNESS FOR A PARTICULAR PURPOSE ARE
// DISCLAIMED. IN NO EVENT SHALL THE COPYRIGHT HOLDER OR CONTRIBUTORS BE LIABLE FOR ANY DIRECT, INDIRECT, INCIDENTAL,
// SPECIAL, EXEMPLARY, OR CONSEQUENTIAL DAMAGES (INCLUDING, BUT NOT LIMITED TO, PROCUREMENT OF SUBSTITUTE GOODS OR
// SERVICES; LOSS OF USE, DATA, OR PROFITS; OR BUSINESS INTERRUPTION) HOWEVER CAUSED AND ON ANY THEORY OF LIABILITY,
// WHETHER IN CONTRACT, STRICT LIABILITY, OR TORT (INCLUDING NEGLIGENCE OR OTHERWISE) ARISING IN ANY WAY OUT OF THE
// USE OF THIS SOFTWARE, EVEN IF ADVISED OF THE POSSIBILITY OF SUCH DAMAGE.

//! End-to-end scenarios driving a [`Wallet`] through its public API only, the way a CLI
//! or service layer would: sync a few blocks, send, fuse, persist and restore.

mod support;

use std::sync::Arc;

use cryptonote_wallet_core::{
    event_sink::WalletEvent,
    subwallet::{registry::SubWalletRegistry, SubWallet},
    transaction_builder::SendRequest,
    types::{PrivateSpendKey, PrivateViewKey},
    wallet::Wallet,
};

use support::{address_key, block_crediting, fast_config, AsciiAddressCodec, IdentityCrypto, RecordingEventSink, ScriptedNode};

fn single_wallet_registry(primary_address: &str) -> SubWalletRegistry {
    let mut registry = SubWalletRegistry::new(PrivateViewKey::zero(), false);
    registry.add_subwallet(SubWallet::new(
        primary_address.into(),
        address_key(primary_address),
        Some(PrivateSpendKey::zero()),
        0,
        0,
        true,
    ));
    registry
}

#[tokio::test]
async fn syncing_credits_owner_and_advances_height() {
    let owner = address_key("p");
    let node = ScriptedNode::new();
    node.push_block(block_crediting(1, &owner, 1_000));
    node.push_block(block_crediting(2, &owner, 2_000));

    let mut wallet = Wallet::new(Arc::new(fast_config()), single_wallet_registry("p"), Some(1), None);
    let sink = RecordingEventSink::new();

    // Each tick drains at most one staged block and tops the buffer back up, so three
    // ticks are enough to both fetch and drain both blocks.
    for _ in 0..4 {
        wallet.sync_tick(&node, &IdentityCrypto, &sink, false).await.unwrap();
    }

    assert_eq!(wallet.height(), 2);
    assert_eq!(wallet.balance(2, 0), (3_000, 0));
    let incoming = sink.events().into_iter().filter(|e| matches!(e, WalletEvent::Incoming(_))).count();
    assert_eq!(incoming, 2);
}

#[tokio::test]
async fn send_locks_inputs_and_is_reflected_in_balance() {
    let owner = address_key("p");
    let node = ScriptedNode::new();
    node.push_block(block_crediting(1, &owner, 10_000_000));

    let mut wallet = Wallet::new(Arc::new(fast_config()), single_wallet_registry("p"), Some(1), None);
    let sink = RecordingEventSink::new();
    for _ in 0..3 {
        wallet.sync_tick(&node, &IdentityCrypto, &sink, false).await.unwrap();
    }
    assert_eq!(wallet.balance(1, 0), (10_000_000, 0));

    let request = SendRequest {
        destinations: vec![("r".into(), 1_000_000)],
        fee: Some(10_000),
        ..Default::default()
    };
    let hash = wallet
        .send(request, &node, &IdentityCrypto, &AsciiAddressCodec, &sink, 0)
        .await
        .unwrap();

    // Inputs lock in whole units; the one input covering this send moves entirely into
    // the locked bucket until the transaction either confirms or is cancelled.
    assert_eq!(wallet.balance(1, 0), (0, 10_000_000));
    let outgoing = sink.events().into_iter().find(|e| matches!(e, WalletEvent::Outgoing(_)));
    match outgoing {
        Some(WalletEvent::Outgoing(tx)) => assert_eq!(tx.hash, hash),
        other => panic!("expected an Outgoing event, got {:?}", other),
    }
}

#[tokio::test]
async fn node_refresh_tracks_sync_state_across_a_catch_up() {
    let node = ScriptedNode::new();
    *node.local_height.lock().unwrap() = 10;

    let mut wallet = Wallet::new(Arc::new(fast_config()), single_wallet_registry("p"), Some(1), None);
    let sink = RecordingEventSink::new();

    // The wallet starts at height 0, ten behind the node: first observation is a Desync.
    wallet.refresh_node_info(&node, &sink).await.unwrap();
    assert_eq!(sink.events(), vec![WalletEvent::Desync]);

    for height in 1..=10u64 {
        node.push_block(block_crediting(height, &address_key("p"), 1));
    }
    for _ in 0..20 {
        wallet.sync_tick(&node, &IdentityCrypto, &sink, false).await.unwrap();
        if wallet.height() >= 10 {
            break;
        }
    }
    assert_eq!(wallet.height(), 10);

    wallet.refresh_node_info(&node, &sink).await.unwrap();
    assert_eq!(sink.events(), vec![WalletEvent::Desync, WalletEvent::Sync]);
}

#[tokio::test]
async fn locked_transaction_check_cancels_and_unlocks_inputs() {
    let owner = address_key("p");
    let node = ScriptedNode::new();
    node.push_block(block_crediting(1, &owner, 5_000_000));

    let mut wallet = Wallet::new(Arc::new(fast_config()), single_wallet_registry("p"), Some(1), None);
    let sink = RecordingEventSink::new();
    for _ in 0..3 {
        wallet.sync_tick(&node, &IdentityCrypto, &sink, false).await.unwrap();
    }

    let request = SendRequest {
        destinations: vec![("r".into(), 500_000)],
        fee: Some(10_000),
        ..Default::default()
    };
    let hash = wallet
        .send(request, &node, &IdentityCrypto, &AsciiAddressCodec, &sink, 0)
        .await
        .unwrap();

    node.cancelled.lock().unwrap().push(hash);
    wallet.check_locked_transactions(&node).await.unwrap();

    assert_eq!(wallet.registry().get(&owner).unwrap().locked().len(), 0);
    assert_eq!(wallet.registry().get(&owner).unwrap().unspent().len(), 1);
}

#[tokio::test]
async fn wallet_record_round_trip_restores_height_registry_and_balance() {
    let owner = address_key("p");
    let node = ScriptedNode::new();
    node.push_block(block_crediting(1, &owner, 7_000));

    let mut wallet = Wallet::new(Arc::new(fast_config()), single_wallet_registry("p"), Some(1), None);
    let sink = RecordingEventSink::new();
    for _ in 0..3 {
        wallet.sync_tick(&node, &IdentityCrypto, &sink, false).await.unwrap();
    }
    assert_eq!(wallet.balance(1, 0), (7_000, 0));

    let record = wallet.to_record();
    let restored = Wallet::from_record(record, Arc::new(fast_config()));

    assert_eq!(restored.height(), wallet.height());
    assert_eq!(restored.balance(1, 0), wallet.balance(1, 0));
    assert_eq!(restored.is_view_only(), wallet.is_view_only());
}
