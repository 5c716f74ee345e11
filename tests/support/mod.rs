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

//! Shared `Node`/`Crypto`/`AddressCodec`/`EventSink` mocks for the scenario tests under
//! `tests/`, mirroring the per-module stubs in `src/*`'s own `#[cfg(test)]` modules but
//! scriptable enough to drive a `Wallet` end to end.

use std::{
    collections::HashMap,
    sync::Mutex,
};

use async_trait::async_trait;
use cryptonote_wallet_core::{
    address::{AddressCodec, AddressError, DecodedAddress},
    crypto::{Crypto, CryptoError, DecoyOutput, OwnedOutputForSigning, SignedTransaction, TxDestination},
    event_sink::{EventSink, WalletEvent},
    node::{AmountOutputs, FeeInfo, Node, NodeError, NodeInfo, RandomOutput, SendTransactionResult, WalletSyncData},
    types::{
        Amount, BlockHash, Height, KeyDerivation, KeyImage, OutputKey, PaymentId, PrivateEphemeral, PrivateSpendKey,
        PrivateViewKey, PublicSpendKey, PublicViewKey, RawBlock, TransactionHash, TxPublicKey,
    },
};

/// A node whose chain is a plain `Vec<RawBlock>` fed in by the test, plus knobs for the
/// handful of non-block responses the core also asks for.
pub struct ScriptedNode {
    pub blocks: Mutex<Vec<RawBlock>>,
    pub local_height: Mutex<Height>,
    pub cancelled: Mutex<Vec<TransactionHash>>,
    pub mixin: u64,
    pub mixin_bounds: (u64, u64),
    pub fee_info: FeeInfo,
    pub decoys_per_amount: u64,
    pub accept_relayed_transactions: bool,
}

impl ScriptedNode {
    pub fn new() -> Self {
        Self {
            blocks: Mutex::new(Vec::new()),
            local_height: Mutex::new(0),
            cancelled: Mutex::new(Vec::new()),
            mixin: 3,
            mixin_bounds: (0, 16),
            fee_info: FeeInfo { address: String::new(), amount: 0 },
            decoys_per_amount: 5,
            accept_relayed_transactions: true,
        }
    }

    pub fn push_block(&self, block: RawBlock) {
        let mut height = self.local_height.lock().unwrap();
        *height = (*height).max(block.height);
        self.blocks.lock().unwrap().push(block);
    }
}

#[async_trait]
impl Node for ScriptedNode {
    async fn info(&self) -> Result<NodeInfo, NodeError> {
        let h = *self.local_height.lock().unwrap();
        Ok(NodeInfo { local_height: h, network_height: h, is_cache_api: false })
    }

    async fn fee(&self) -> Result<FeeInfo, NodeError> {
        Ok(self.fee_info.clone())
    }

    async fn mixin_for_height(&self, _height: Height) -> Result<u64, NodeError> {
        Ok(self.mixin)
    }

    async fn mixin_bounds_for_height(&self, _height: Height) -> Result<(u64, u64), NodeError> {
        Ok(self.mixin_bounds)
    }

    async fn get_wallet_sync_data(
        &self,
        _checkpoints: Vec<BlockHash>,
        _start_height: Option<Height>,
        _start_timestamp: Option<u64>,
        count: u32,
    ) -> Result<WalletSyncData, NodeError> {
        let mut blocks = self.blocks.lock().unwrap();
        let take = (count as usize).min(blocks.len());
        let batch: Vec<RawBlock> = blocks.drain(0..take).collect();
        Ok(WalletSyncData { blocks: batch, top_block: None })
    }

    async fn get_global_indexes_for_range(&self, _start: Height, _end: Height) -> Result<HashMap<TransactionHash, Vec<u64>>, NodeError> {
        Ok(HashMap::new())
    }

    async fn get_random_outputs_by_amount(&self, amounts: Vec<Amount>, _count: u64) -> Result<Vec<AmountOutputs>, NodeError> {
        Ok(amounts
            .into_iter()
            .map(|amount| AmountOutputs {
                amount,
                outputs: (0..self.decoys_per_amount)
                    .map(|i| RandomOutput { global_index: 1_000 + i, key: OutputKey::from([(100 + i) as u8; 32]) })
                    .collect(),
            })
            .collect())
    }

    async fn get_cancelled_transactions(&self, hashes: Vec<TransactionHash>) -> Result<Vec<TransactionHash>, NodeError> {
        let cancelled = self.cancelled.lock().unwrap();
        Ok(hashes.into_iter().filter(|h| cancelled.contains(h)).collect())
    }

    async fn send_transaction(&self, _raw_hex: String) -> Result<SendTransactionResult, NodeError> {
        if self.accept_relayed_transactions {
            Ok(SendTransactionResult { accepted: true, error: None })
        } else {
            Ok(SendTransactionResult { accepted: false, error: Some("rejected by scenario".into()) })
        }
    }
}

/// Identity-ish crypto backend: derivation is a no-op and an output's key is just its
/// owner's public spend key, so a `ScriptedNode` block can credit an owner directly by
/// embedding that key as the output key. Key images xor the owner's bytes with the
/// output index, matching the convention the unit tests in `src/synchronizer` use.
pub struct IdentityCrypto;

#[async_trait]
impl Crypto for IdentityCrypto {
    async fn key_derivation(&self, _tx_public_key: &TxPublicKey, _private_view_key: &PrivateViewKey) -> Result<KeyDerivation, CryptoError> {
        Ok(KeyDerivation::zero())
    }

    async fn derive_public_key(&self, _derivation: &KeyDerivation, _output_index: u64, public_spend_key: &PublicSpendKey) -> Result<OutputKey, CryptoError> {
        Ok(OutputKey::from(*public_spend_key.as_bytes()))
    }

    async fn underive_public_key(&self, _derivation: &KeyDerivation, _output_index: u64, output_key: &OutputKey) -> Result<PublicSpendKey, CryptoError> {
        Ok(PublicSpendKey::from(*output_key.as_bytes()))
    }

    async fn generate_key_image(
        &self,
        _tx_public_key: &TxPublicKey,
        _private_view_key: &PrivateViewKey,
        public_spend_key: &PublicSpendKey,
        _private_spend_key: &PrivateSpendKey,
        output_index: u64,
    ) -> Result<(KeyImage, PrivateEphemeral), CryptoError> {
        let mut bytes = *public_spend_key.as_bytes();
        bytes[0] ^= output_index as u8;
        Ok((KeyImage::from(bytes), PrivateEphemeral::zero()))
    }

    async fn create_signed_transaction(
        &self,
        destinations: &[TxDestination],
        _owned_outputs: &[OwnedOutputForSigning],
        _decoys: &[Vec<DecoyOutput>],
        _mixin: u64,
        fee: Amount,
        _payment_id: Option<PaymentId>,
    ) -> Result<SignedTransaction, CryptoError> {
        Ok(SignedTransaction {
            raw_hex: "deadbeef".into(),
            hash: TransactionHash::from([0xABu8; 32]),
            actual_fee: fee,
            serialized_size: 500,
            tx_public_key: TxPublicKey::zero(),
            output_keys: destinations.iter().map(|d| OutputKey::from(*d.public_spend_key.as_bytes())).collect(),
        })
    }
}

/// Addresses are single ASCII characters in these scenarios; the byte becomes both the
/// view and spend key, same convention `transaction_builder`'s own tests use.
pub struct AsciiAddressCodec;

impl AddressCodec for AsciiAddressCodec {
    fn decode(&self, address: &str) -> Result<DecodedAddress, AddressError> {
        if address.is_empty() {
            return Err(AddressError::InvalidAddress);
        }
        let mut bytes = [0u8; 32];
        bytes[0] = address.as_bytes()[0];
        Ok(DecodedAddress {
            public_view_key: PublicViewKey::from(bytes),
            public_spend_key: PublicSpendKey::from(bytes),
            payment_id: None,
            prefix: 0,
        })
    }

    fn encode_integrated(&self, _public_view_key: &PublicViewKey, public_spend_key: &PublicSpendKey, payment_id: PaymentId) -> String {
        format!("{}:{}", public_spend_key, payment_id)
    }
}

pub fn address_key(address: &str) -> PublicSpendKey {
    AsciiAddressCodec.decode(address).unwrap().public_spend_key
}

/// A [`WalletConfig`] with a near-zero idle sleep, so a scenario test that drains its
/// `ScriptedNode` dry doesn't block on the default one-second backoff.
pub fn fast_config() -> cryptonote_wallet_core::config::WalletConfig {
    cryptonote_wallet_core::config::WalletConfig {
        tick_idle: std::time::Duration::from_millis(1),
        ..cryptonote_wallet_core::config::WalletConfig::default()
    }
}

pub struct RecordingEventSink(pub Mutex<Vec<WalletEvent>>);

impl RecordingEventSink {
    pub fn new() -> Self {
        Self(Mutex::new(Vec::new()))
    }

    pub fn events(&self) -> Vec<WalletEvent> {
        self.0.lock().unwrap().clone()
    }
}

impl EventSink for RecordingEventSink {
    fn on_event(&self, event: WalletEvent) {
        self.0.lock().unwrap().push(event);
    }
}

pub fn block_crediting(height: Height, owner: &PublicSpendKey, amount: Amount) -> RawBlock {
    use cryptonote_wallet_core::types::{KeyOutput, RawTransaction};

    RawBlock {
        height,
        hash: BlockHash::from([height as u8; 32]),
        timestamp: 1_700_000_000 + height,
        coinbase_tx: None,
        transactions: vec![RawTransaction {
            hash: TransactionHash::from([height as u8; 32]),
            tx_public_key: TxPublicKey::zero(),
            unlock_time: 0,
            payment_id: None,
            key_outputs: vec![KeyOutput {
                key: OutputKey::from(*owner.as_bytes()),
                amount,
                global_index: Some(height),
            }],
            key_inputs: Vec::new(),
        }],
    }
}
