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

//! Fork-resistance checkpoints (spec §4.1). Recent hashes cheaply detect short forks;
//! sparse checkpoints bound storage while still letting the node locate a divergence
//! point after a long outage.

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    config::WalletConfig,
    types::{BlockHash, Height},
};

const LOG_TARGET: &str = "wallet::sync_status";

#[derive(Debug, thiserror::Error)]
pub enum SyncStatusError {
    #[error("node sent height {height}, non-contiguous with last known height {last_known}")]
    GapDetected { height: Height, last_known: Height },
}

/// Wire/persistence shape for [`SyncStatus`]. Ordering is preserved across a
/// `to_record`/`from_record` round trip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncStatusRecord {
    pub block_hash_checkpoints: Vec<BlockHash>,
    pub last_known_block_hashes: Vec<BlockHash>,
    pub last_known_block_height: Height,
}

#[derive(Debug, Clone)]
pub struct SyncStatus {
    checkpoint_interval: u64,
    hashes_window: usize,
    block_hash_checkpoints: Vec<BlockHash>,
    last_known_block_hashes: Vec<BlockHash>,
    last_known_block_height: Height,
}

impl SyncStatus {
    pub fn new(config: &WalletConfig) -> Self {
        Self {
            checkpoint_interval: config.checkpoint_interval,
            hashes_window: config.hashes_window,
            block_hash_checkpoints: Vec::new(),
            last_known_block_hashes: Vec::new(),
            last_known_block_height: 0,
        }
    }

    pub fn height(&self) -> Height {
        self.last_known_block_height
    }

    pub fn last_known_block_hashes(&self) -> &[BlockHash] {
        &self.last_known_block_hashes
    }

    pub fn block_hash_checkpoints(&self) -> &[BlockHash] {
        &self.block_hash_checkpoints
    }

    /// Records that `height`/`hash` has been processed. Heights must be contiguous once
    /// the wallet has seen its first block (invariant 4 in spec §3).
    ///
    /// A `height` at or below the current height is a fork replay: the caller is
    /// expected to have already rolled the subwallet registry back via
    /// `Registry::remove_forked(height)`; this call rolls the checkpoint history back to
    /// match before recording the new hash.
    pub fn store_block_hash(&mut self, height: Height, hash: BlockHash) -> Result<(), SyncStatusError> {
        if self.last_known_block_height != 0 && height > self.last_known_block_height {
            if height != self.last_known_block_height + 1 {
                return Err(SyncStatusError::GapDetected {
                    height,
                    last_known: self.last_known_block_height,
                });
            }
        } else if self.last_known_block_height != 0 && height <= self.last_known_block_height {
            // The front of the (newest-first) list holds the heights being replaced.
            let dropped = (self.last_known_block_height - height + 1) as usize;
            let dropped = dropped.min(self.last_known_block_hashes.len());
            self.last_known_block_hashes.drain(0..dropped);
        }

        self.last_known_block_height = height;

        self.last_known_block_hashes.insert(0, hash);
        self.last_known_block_hashes.truncate(self.hashes_window);

        if height % self.checkpoint_interval == 0 {
            self.block_hash_checkpoints.insert(0, hash);
        }

        debug!(target: LOG_TARGET, "stored block hash at height {}", height);
        Ok(())
    }

    /// Recent hashes first, then sparse checkpoints: cheap forks are found quickly,
    /// sparse history lets the node locate a divergence point after a long outage.
    pub fn processed_checkpoints(&self) -> Vec<BlockHash> {
        self.last_known_block_hashes
            .iter()
            .chain(self.block_hash_checkpoints.iter())
            .copied()
            .collect()
    }

    pub fn to_record(&self) -> SyncStatusRecord {
        SyncStatusRecord {
            block_hash_checkpoints: self.block_hash_checkpoints.clone(),
            last_known_block_hashes: self.last_known_block_hashes.clone(),
            last_known_block_height: self.last_known_block_height,
        }
    }

    pub fn from_record(record: SyncStatusRecord, config: &WalletConfig) -> Self {
        Self {
            checkpoint_interval: config.checkpoint_interval,
            hashes_window: config.hashes_window,
            block_hash_checkpoints: record.block_hash_checkpoints,
            last_known_block_hashes: record.last_known_block_hashes,
            last_known_block_height: record.last_known_block_height,
        }
    }
}
