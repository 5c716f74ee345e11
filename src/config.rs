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

//! Immutable configuration shared by every component. Constructed once at wallet startup
//! and passed down by reference; no component mutates it at runtime.

use std::time::Duration;

use crate::types::Amount;

/// Hash checkpoint recorded by `SyncStatus` every `checkpoint_interval` blocks.
pub const DEFAULT_CHECKPOINT_INTERVAL: u64 = 5000;
/// Number of recent block hashes `SyncStatus` keeps for short-fork detection.
pub const DEFAULT_HASHES_WINDOW: usize = 100;
/// Unlock-time values at or above this are interpreted as unix timestamps, not heights.
pub const MAX_BLOCK_NUMBER: u64 = 500_000_000;

#[derive(Debug, Clone)]
pub struct WalletConfig {
    /// Upper bound on the approximate byte size of the Synchronizer's stage buffer.
    pub mem_budget_bytes: usize,
    /// Upper bound on the size of a single `get_wallet_sync_data` reply, used for backpressure
    /// accounting before a fetch is started.
    pub max_reply_size_bytes: usize,
    /// Blocks drained from the stage buffer per `Synchronizer::drain_one` call.
    pub blocks_per_tick: usize,
    /// Blocks requested per `get_wallet_sync_data` call.
    pub batch_size: u32,
    /// See `DEFAULT_CHECKPOINT_INTERVAL`.
    pub checkpoint_interval: u64,
    /// See `DEFAULT_HASHES_WINDOW`.
    pub hashes_window: usize,
    /// Height window (`± obscurity`) used when asking the node for global indexes.
    pub global_indexes_obscurity: u64,
    /// Minimum number of unspent inputs required before a fusion attempt is worthwhile.
    pub min_fusion_inputs: usize,
    /// Minimum inputs-per-output ratio a fusion transaction must maintain.
    pub min_in_out_ratio: usize,
    /// Maximum serialized size, in bytes, of a fusion transaction.
    pub max_fusion_tx_size: usize,
    /// How long the Synchronizer sleeps when the node has nothing new to offer.
    pub tick_idle: Duration,
    /// `Scheduler` task intervals.
    pub sync_tick_interval: Duration,
    pub node_refresh_interval: Duration,
    pub locked_tx_check_interval: Duration,
    /// Timeout applied to every Node RPC.
    pub node_rpc_timeout: Duration,
    /// Coin-specific minimum relay fee used when the caller doesn't specify one.
    pub min_fee: Amount,
    /// Address codec prefix used to validate/encode addresses for this coin.
    pub address_prefix: u64,
}

impl Default for WalletConfig {
    fn default() -> Self {
        Self {
            mem_budget_bytes: 50 * 1024 * 1024,
            max_reply_size_bytes: 10 * 1024 * 1024,
            blocks_per_tick: 1,
            batch_size: 100,
            checkpoint_interval: DEFAULT_CHECKPOINT_INTERVAL,
            hashes_window: DEFAULT_HASHES_WINDOW,
            global_indexes_obscurity: 10,
            min_fusion_inputs: 12,
            min_in_out_ratio: 4,
            max_fusion_tx_size: 40_000,
            tick_idle: Duration::from_secs(1),
            sync_tick_interval: Duration::from_millis(100),
            node_refresh_interval: Duration::from_secs(10),
            locked_tx_check_interval: Duration::from_secs(30),
            node_rpc_timeout: Duration::from_secs(10),
            min_fee: 10_000_000,
            address_prefix: 0,
        }
    }
}
