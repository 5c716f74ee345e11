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

//! The three periodic tasks (spec §4.7): `sync_tick`, `node_refresh` and
//! `locked_tx_check`. Each is independently intervalled and individually guarded
//! against re-entrance, matching the single-in-flight guards `Synchronizer::fetch` and
//! `TransactionBuilder::send` already use for the same reason (spec §5).
//!
//! `run` drives all three from one `tokio::select!` loop rather than three spawned
//! tasks: the core's concurrency model is a single logical executor (spec §5), and a
//! single loop gives that for free without needing `Wallet`'s state behind a lock.

use std::sync::Arc;

use log::warn;
use tokio::sync::watch;

use crate::{config::WalletConfig, crypto::Crypto, event_sink::EventSink, node::Node, wallet::Wallet, WalletError};

const LOG_TARGET: &str = "wallet::scheduler";

/// Drives a [`Wallet`]'s periodic background work. Holds no wallet state itself beyond
/// the re-entrance guards; the `Wallet` passed to each tick is the single source of
/// truth.
pub struct Scheduler {
    config: Arc<WalletConfig>,
    sync_tick_running: bool,
    node_refresh_running: bool,
    locked_tx_check_running: bool,
}

impl Scheduler {
    pub fn new(config: Arc<WalletConfig>) -> Self {
        Self {
            config,
            sync_tick_running: false,
            node_refresh_running: false,
            locked_tx_check_running: false,
        }
    }

    /// Runs one `Synchronizer` tick, unless a previous call is still in flight (it
    /// never is, in the single-loop `run` driver, but direct callers may overlap).
    pub async fn sync_tick(
        &mut self,
        wallet: &mut Wallet,
        node: &dyn Node,
        crypto: &dyn Crypto,
        event_sink: &dyn EventSink,
        process_coinbase: bool,
    ) -> Result<(), WalletError> {
        if self.sync_tick_running {
            return Ok(());
        }
        self.sync_tick_running = true;
        let result = wallet.sync_tick(node, crypto, event_sink, process_coinbase).await;
        self.sync_tick_running = false;
        result
    }

    pub async fn node_refresh(&mut self, wallet: &mut Wallet, node: &dyn Node, event_sink: &dyn EventSink) -> Result<(), WalletError> {
        if self.node_refresh_running {
            return Ok(());
        }
        self.node_refresh_running = true;
        let result = wallet.refresh_node_info(node, event_sink).await.map(|_| ());
        self.node_refresh_running = false;
        result
    }

    pub async fn locked_tx_check(&mut self, wallet: &mut Wallet, node: &dyn Node) -> Result<(), WalletError> {
        if self.locked_tx_check_running {
            return Ok(());
        }
        self.locked_tx_check_running = true;
        let result = wallet.check_locked_transactions(node).await;
        self.locked_tx_check_running = false;
        result
    }

    /// Runs all three tasks on their configured intervals until `shutdown` reports
    /// `true`. Each branch logs and swallows its own error: spec §7 puts the
    /// Synchronizer's transient/node-integrity errors on the "log and retry next tick"
    /// path, and the same policy is the right one for `node_refresh`/`locked_tx_check`,
    /// which only ever observe the node rather than mutate user-facing balances.
    #[allow(clippy::too_many_arguments)]
    pub async fn run(
        &mut self,
        wallet: &mut Wallet,
        node: &dyn Node,
        crypto: &dyn Crypto,
        event_sink: &dyn EventSink,
        process_coinbase: bool,
        mut shutdown: watch::Receiver<bool>,
    ) {
        let mut sync_interval = tokio::time::interval(self.config.sync_tick_interval);
        let mut node_interval = tokio::time::interval(self.config.node_refresh_interval);
        let mut locked_interval = tokio::time::interval(self.config.locked_tx_check_interval);

        if *shutdown.borrow() {
            return;
        }

        loop {
            tokio::select! {
                _ = sync_interval.tick() => {
                    if let Err(e) = self.sync_tick(wallet, node, crypto, event_sink, process_coinbase).await {
                        warn!(target: LOG_TARGET, "sync_tick failed: {}", e);
                    }
                },
                _ = node_interval.tick() => {
                    if let Err(e) = self.node_refresh(wallet, node, event_sink).await {
                        warn!(target: LOG_TARGET, "node_refresh failed: {}", e);
                    }
                },
                _ = locked_interval.tick() => {
                    if let Err(e) = self.locked_tx_check(wallet, node).await {
                        warn!(target: LOG_TARGET, "locked_tx_check failed: {}", e);
                    }
                },
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                },
            }
        }
    }
}
