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

//! Abstract remote-node interface (spec §6). The core only ever talks to an untrusted
//! node through this trait; the HTTP transport that implements it is out of scope.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::types::{Amount, BlockHash, Height, OutputKey, RawBlock, TransactionHash};

#[derive(Debug, thiserror::Error)]
pub enum NodeError {
    #[error("node unreachable: {0}")]
    Unreachable(String),
    #[error("node request timed out")]
    Timeout,
    #[error("node returned an empty response")]
    EmptyResponse,
    #[error("node rejected the request: {reason:?}")]
    Rejected { reason: Option<String> },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeInfo {
    pub local_height: Height,
    pub network_height: Height,
    pub is_cache_api: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeeInfo {
    pub address: String,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WalletSyncData {
    pub blocks: Vec<RawBlock>,
    pub top_block: Option<BlockHash>,
}

/// One randomly-selected decoy output, as returned by `random_outputs_by_amount`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RandomOutput {
    pub global_index: u64,
    pub key: OutputKey,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AmountOutputs {
    pub amount: Amount,
    pub outputs: Vec<RandomOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendTransactionResult {
    pub accepted: bool,
    pub error: Option<String>,
}

/// The untrusted remote node the wallet synchronizes against. Every method can fail with
/// a recoverable [`NodeError`]; a concrete implementation talks to a legacy or cache-API
/// daemon over HTTP and converts transport failures into this taxonomy.
#[async_trait]
pub trait Node: Send + Sync {
    async fn info(&self) -> Result<NodeInfo, NodeError>;

    async fn fee(&self) -> Result<FeeInfo, NodeError>;

    async fn mixin_for_height(&self, height: Height) -> Result<u64, NodeError>;

    /// Bounds on the mixin value accepted at `height`, inclusive.
    async fn mixin_bounds_for_height(&self, height: Height) -> Result<(u64, u64), NodeError>;

    async fn get_wallet_sync_data(
        &self,
        checkpoints: Vec<BlockHash>,
        start_height: Option<Height>,
        start_timestamp: Option<u64>,
        count: u32,
    ) -> Result<WalletSyncData, NodeError>;

    /// Only required for wallets whose blocks don't already carry `global_index` on every
    /// output (spec §4.5 step 4).
    async fn get_global_indexes_for_range(
        &self,
        start: Height,
        end: Height,
    ) -> Result<HashMap<TransactionHash, Vec<u64>>, NodeError>;

    async fn get_random_outputs_by_amount(
        &self,
        amounts: Vec<Amount>,
        count: u64,
    ) -> Result<Vec<AmountOutputs>, NodeError>;

    async fn get_cancelled_transactions(
        &self,
        hashes: Vec<TransactionHash>,
    ) -> Result<Vec<TransactionHash>, NodeError>;

    async fn send_transaction(&self, raw_hex: String) -> Result<SendTransactionResult, NodeError>;
}
