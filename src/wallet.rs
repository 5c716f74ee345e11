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

//! The top-down owner facade (spec §9 design note, SPEC_FULL §11.5): the `Wallet` owns
//! the `SubWalletRegistry` and the `Synchronizer`, and hands the registry down to
//! whichever of the two needs it for a given call. Nothing below this module ever holds
//! a reference back up to the `Wallet` itself, which is what breaks the teacher's
//! `WalletBackend` ↔ `Synchronizer` ↔ service cycle.

use std::sync::Arc;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::{
    address::AddressCodec,
    config::WalletConfig,
    crypto::Crypto,
    event_sink::{EventSink, WalletEvent},
    node::{Node, NodeInfo},
    subwallet::registry::{SubWalletRegistry, SubWalletRegistryRecord},
    synchronizer::{Synchronizer, SynchronizerRecord},
    transaction_builder::{SendRequest, TransactionBuilder},
    types::{Amount, Height, TransactionHash},
    WalletError,
};

const LOG_TARGET: &str = "wallet::wallet";

/// Bumped whenever [`WalletRecord`]'s shape changes in a way that isn't forward
/// compatible. Carried alongside the record itself; the encrypted-file layer (out of
/// scope here) is expected to reject a record whose version it doesn't understand.
pub const WALLET_FILE_FORMAT_VERSION: u32 = 0;

/// How close to the node's reported height the wallet must be to count as "synced"
/// (spec §5 ordering guarantees: a `Sync` event fires once this gap closes, a `Desync`
/// event fires once it reopens). The spec leaves the exact threshold unspecified; one
/// block matches the node's own notion of "caught up" without flapping on every single
/// new block during steady-state sync.
const SYNC_HEIGHT_THRESHOLD: Height = 1;

/// Opaque persistence record (spec §6 persistence contract): everything needed to
/// restore a `Wallet` other than the keys supplied externally at construction. The
/// on-disk encryption layer around this record is out of scope for this crate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletRecord {
    pub synchronizer: SynchronizerRecord,
    pub registry: SubWalletRegistryRecord,
    pub file_format_version: u32,
}

/// Wires the subwallet ledger, the sync pipeline and the transaction builder together
/// behind one owner. A caller (CLI, service layer; out of scope here) constructs one of
/// these per opened wallet file and drives it from a [`crate::scheduler::Scheduler`] plus
/// direct calls for `send`/`fuse`/`balance`.
pub struct Wallet {
    config: Arc<WalletConfig>,
    registry: SubWalletRegistry,
    synchronizer: Synchronizer,
    builder: TransactionBuilder,
    last_known_synced: Option<bool>,
}

impl Wallet {
    pub fn new(
        config: Arc<WalletConfig>,
        registry: SubWalletRegistry,
        start_height: Option<Height>,
        start_timestamp: Option<u64>,
    ) -> Self {
        Self {
            synchronizer: Synchronizer::new(config.clone(), start_height, start_timestamp),
            builder: TransactionBuilder::new(config.clone()),
            config,
            registry,
            last_known_synced: None,
        }
    }

    pub fn registry(&self) -> &SubWalletRegistry {
        &self.registry
    }

    pub fn synchronizer(&self) -> &Synchronizer {
        &self.synchronizer
    }

    pub fn is_view_only(&self) -> bool {
        self.registry.is_view_only()
    }

    pub fn is_transacting(&self) -> bool {
        self.builder.is_transacting()
    }

    /// The wallet's height is, by definition, its sync status's height (spec §3
    /// invariant 5): balances and input states are always read relative to it.
    pub fn height(&self) -> Height {
        self.synchronizer.sync_status().height()
    }

    pub fn balance(&self, now_seconds: u64) -> (Amount, Amount) {
        self.registry.balance(self.height(), now_seconds)
    }

    /// Every known transaction, unconfirmed ones (`block_height == 0`) first, then
    /// confirmed ones in commit order (spec §3 `Transaction` lifecycle).
    pub fn transactions(&self) -> Vec<&crate::types::Transaction> {
        self.registry.transactions()
    }

    /// One `Synchronizer` tick: drains a staged block if one is available and tops up
    /// the stage buffer if it's running low (spec §4.5, §4.7 sync_tick).
    pub async fn sync_tick(
        &mut self,
        node: &dyn Node,
        crypto: &dyn Crypto,
        event_sink: &dyn EventSink,
        process_coinbase: bool,
    ) -> Result<(), WalletError> {
        self.synchronizer
            .tick(node, crypto, &mut self.registry, event_sink, process_coinbase)
            .await?;
        Ok(())
    }

    /// Refreshes cached node info and emits `Sync`/`Desync` exactly on the edges where
    /// the wallet's distance from the node's height crosses [`SYNC_HEIGHT_THRESHOLD`]
    /// (spec §4.7 node_refresh, §5 ordering guarantees).
    pub async fn refresh_node_info(&mut self, node: &dyn Node, event_sink: &dyn EventSink) -> Result<NodeInfo, WalletError> {
        let info = node.info().await?;
        let behind = info.local_height.saturating_sub(self.height());
        let now_synced = behind <= SYNC_HEIGHT_THRESHOLD;

        match self.last_known_synced {
            Some(was_synced) if was_synced == now_synced => {},
            _ => {
                info!(target: LOG_TARGET, "sync state transition: synced={}", now_synced);
                event_sink.on_event(if now_synced { WalletEvent::Sync } else { WalletEvent::Desync });
                self.last_known_synced = Some(now_synced);
            },
        }
        Ok(info)
    }

    /// Asks the node which currently-locked transactions have fallen out of both the
    /// mempool and the chain, and cancels those, returning their inputs to `unspent`
    /// (spec §4.7 locked_tx_check).
    pub async fn check_locked_transactions(&mut self, node: &dyn Node) -> Result<(), WalletError> {
        let locked_hashes = self.registry.locked_transaction_hashes();
        if locked_hashes.is_empty() {
            return Ok(());
        }
        let cancelled = node.get_cancelled_transactions(locked_hashes).await?;
        for hash in &cancelled {
            warn!(target: LOG_TARGET, "transaction {} fell out of the mempool and chain, cancelling", hash);
            self.registry.remove_cancelled(hash);
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn send(
        &mut self,
        request: SendRequest,
        node: &dyn Node,
        crypto: &dyn Crypto,
        address_codec: &dyn AddressCodec,
        event_sink: &dyn EventSink,
        now_seconds: u64,
    ) -> Result<TransactionHash, WalletError> {
        let height = self.height();
        self.builder
            .send(request, node, crypto, address_codec, &mut self.registry, event_sink, height, now_seconds)
            .await
            .map_err(WalletError::from)
    }

    pub async fn fuse(
        &mut self,
        node: &dyn Node,
        crypto: &dyn Crypto,
        address_codec: &dyn AddressCodec,
        event_sink: &dyn EventSink,
        now_seconds: u64,
    ) -> Result<TransactionHash, WalletError> {
        let height = self.height();
        self.builder
            .fuse(node, crypto, address_codec, &mut self.registry, event_sink, height, now_seconds)
            .await
            .map_err(WalletError::from)
    }

    pub fn to_record(&self) -> WalletRecord {
        WalletRecord {
            synchronizer: self.synchronizer.to_record(),
            registry: self.registry.to_record(),
            file_format_version: WALLET_FILE_FORMAT_VERSION,
        }
    }

    pub fn from_record(record: WalletRecord, config: Arc<WalletConfig>) -> Self {
        Self {
            synchronizer: Synchronizer::from_record(record.synchronizer, config.clone()),
            builder: TransactionBuilder::new(config.clone()),
            config,
            registry: SubWalletRegistry::from_record(record.registry),
            last_known_synced: None,
        }
    }
}
