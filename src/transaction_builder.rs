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

//! Input selection, ring gathering and signing (spec §4.6), plus the fusion variant.
//! Only one construction may be in flight per wallet; `send`/`fuse` guard on
//! `currently_transacting` the same way `Synchronizer::fetch` guards on `fetching`.

use std::{collections::HashMap, sync::Arc};

use log::{debug, warn};

use crate::{
    address::{AddressCodec, AddressError},
    config::WalletConfig,
    crypto::{Crypto, CryptoError, DecoyOutput, OwnedOutputForSigning, TxDestination},
    denominations::{is_pretty_amount, split_into_denominations},
    event_sink::{EventSink, WalletEvent},
    node::{Node, NodeError},
    subwallet::registry::{RegistryError, SubWalletRegistry},
    types::{Amount, Height, PaymentId, PublicSpendKey, PublicViewKey, Transaction, TransactionHash},
    unlock::max_tx_size,
};

const LOG_TARGET: &str = "wallet::transaction_builder";

#[derive(Debug, thiserror::Error)]
pub enum BuilderError {
    #[error("a transaction is already under construction for this wallet")]
    AlreadyTransacting,
    #[error("this wallet holds only a view key and cannot construct a spend")]
    ViewOnly,
    #[error("invalid address: {0}")]
    InvalidAddress(String),
    #[error("supplied payment id conflicts with one embedded in an integrated address")]
    ConflictingPaymentID,
    #[error("mixin {requested} is outside the accepted range {min}..={max}")]
    InvalidMixin { requested: u64, min: u64, max: u64 },
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("node error: {0}")]
    Node(#[from] NodeError),
    #[error("node returned only {got} decoys for amount {amount} (need at least {needed})")]
    NotEnoughFakeOutputs { amount: Amount, needed: u64, got: usize },
    #[error("a constructed output amount is not in the published pretty-amount set")]
    AmountsNotPretty,
    #[error("actual fee {actual} does not match expected fee {expected}")]
    UnexpectedFee { expected: Amount, actual: Amount },
    #[error("transaction size {size} exceeds the {max}-byte limit at this height")]
    TransactionTooLarge { size: usize, max: usize },
    #[error("wallet has fewer than the minimum number of inputs worth fusing; already optimized")]
    FullyOptimized,
    #[error("node rejected the transaction: {reason:?}")]
    NodeRejected { reason: Option<String> },
}

/// A `send()` request; every field but `destinations` may be left at its default and
/// is then filled in from the node/config per spec §4.6 step 1.
#[derive(Debug, Clone, Default)]
pub struct SendRequest {
    pub destinations: Vec<(String, Amount)>,
    pub mixin: Option<u64>,
    pub fee: Option<Amount>,
    pub payment_id: Option<PaymentId>,
    pub from: Option<Vec<String>>,
    pub change_address: Option<String>,
}

struct ResolvedDestination {
    public_spend_key: PublicSpendKey,
    public_view_key: PublicViewKey,
    amount: Amount,
}

pub struct TransactionBuilder {
    config: Arc<WalletConfig>,
    currently_transacting: bool,
}

impl TransactionBuilder {
    pub fn new(config: Arc<WalletConfig>) -> Self {
        Self {
            config,
            currently_transacting: false,
        }
    }

    pub fn is_transacting(&self) -> bool {
        self.currently_transacting
    }

    /// Builds, signs, relays and (on acceptance) commits a standard transaction.
    #[allow(clippy::too_many_arguments)]
    pub async fn send(
        &mut self,
        request: SendRequest,
        node: &dyn Node,
        crypto: &dyn Crypto,
        address_codec: &dyn AddressCodec,
        registry: &mut SubWalletRegistry,
        event_sink: &dyn EventSink,
        current_height: Height,
        now_seconds: u64,
    ) -> Result<TransactionHash, BuilderError> {
        if self.currently_transacting {
            return Err(BuilderError::AlreadyTransacting);
        }
        self.currently_transacting = true;
        let result = self
            .send_inner(request, node, crypto, address_codec, registry, event_sink, current_height, now_seconds)
            .await;
        self.currently_transacting = false;
        result
    }

    /// The fusion variant: consolidates small inputs into one zero-fee output sent back
    /// to the primary address, retrying with fewer inputs until the ratio/size limits
    /// are satisfied (spec §4.6 "Fusion variant").
    pub async fn fuse(
        &mut self,
        node: &dyn Node,
        crypto: &dyn Crypto,
        address_codec: &dyn AddressCodec,
        registry: &mut SubWalletRegistry,
        event_sink: &dyn EventSink,
        current_height: Height,
        now_seconds: u64,
    ) -> Result<TransactionHash, BuilderError> {
        if self.currently_transacting {
            return Err(BuilderError::AlreadyTransacting);
        }
        self.currently_transacting = true;
        let result = self
            .fuse_inner(node, crypto, address_codec, registry, event_sink, current_height, now_seconds)
            .await;
        self.currently_transacting = false;
        result
    }

    #[allow(clippy::too_many_arguments)]
    async fn send_inner(
        &mut self,
        request: SendRequest,
        node: &dyn Node,
        crypto: &dyn Crypto,
        address_codec: &dyn AddressCodec,
        registry: &mut SubWalletRegistry,
        event_sink: &dyn EventSink,
        current_height: Height,
        now_seconds: u64,
    ) -> Result<TransactionHash, BuilderError> {
        if registry.is_view_only() {
            return Err(BuilderError::ViewOnly);
        }

        let from_keys = self.resolve_from_addresses(request.from.as_deref(), registry)?;

        let mixin = match request.mixin {
            Some(m) => m,
            None => node.mixin_for_height(current_height).await?,
        };
        let (min_mixin, max_mixin) = node.mixin_bounds_for_height(current_height).await?;
        if mixin < min_mixin || mixin > max_mixin {
            return Err(BuilderError::InvalidMixin { requested: mixin, min: min_mixin, max: max_mixin });
        }
        let fee = request.fee.unwrap_or(self.config.min_fee);

        let mut payment_id = request.payment_id;
        let mut destinations = Vec::with_capacity(request.destinations.len() + 1);
        for (address, amount) in &request.destinations {
            let decoded = address_codec
                .decode(address)
                .map_err(|e: AddressError| BuilderError::InvalidAddress(e.to_string()))?;
            if let Some(embedded) = decoded.payment_id {
                match payment_id {
                    Some(existing) if existing != embedded => return Err(BuilderError::ConflictingPaymentID),
                    _ => payment_id = Some(embedded),
                }
            }
            destinations.push(ResolvedDestination {
                public_spend_key: decoded.public_spend_key,
                public_view_key: decoded.public_view_key,
                amount: *amount,
            });
        }

        if let Ok(fee_info) = node.fee().await {
            if fee_info.amount > 0 {
                let decoded = address_codec
                    .decode(&fee_info.address)
                    .map_err(|e: AddressError| BuilderError::InvalidAddress(e.to_string()))?;
                destinations.push(ResolvedDestination {
                    public_spend_key: decoded.public_spend_key,
                    public_view_key: decoded.public_view_key,
                    amount: fee_info.amount,
                });
            }
        }

        let change_address = request.change_address.unwrap_or_else(|| self.primary_address(registry));
        if registry.find_by_address(&change_address).is_none() {
            return Err(BuilderError::InvalidAddress(change_address));
        }
        let change_decoded = address_codec
            .decode(&change_address)
            .map_err(|e: AddressError| BuilderError::InvalidAddress(e.to_string()))?;
        let change_spend_key = change_decoded.public_spend_key;
        let change_view_key = change_decoded.public_view_key;

        let budget: Amount = destinations.iter().map(|d| d.amount).sum::<Amount>().saturating_add(fee);
        let selected = registry.select_inputs_for_amount(budget, &from_keys, current_height, now_seconds)?;
        let accumulated: Amount = selected.iter().map(|(_, i)| i.amount).sum();
        let change_amount = accumulated.saturating_sub(budget);
        if change_amount > 0 {
            destinations.push(ResolvedDestination {
                public_spend_key: change_spend_key,
                public_view_key: change_view_key,
                amount: change_amount,
            });
        }

        let tx_destinations = self.split_destinations(&destinations);

        let (owned_outputs, decoys) = self.gather_ring(crypto, node, registry, &selected, mixin).await?;

        let signed = crypto
            .create_signed_transaction(&tx_destinations, &owned_outputs, &decoys, mixin, fee, payment_id)
            .await?;

        self.post_check(&signed, &tx_destinations, fee, current_height)?;

        let relay = node.send_transaction(signed.raw_hex.clone()).await?;
        if !relay.accepted {
            return Err(BuilderError::NodeRejected { reason: relay.error });
        }

        for (owner, input) in &selected {
            registry.mark_locked(owner, &input.key_image)?;
        }

        let mut transfers = std::collections::BTreeMap::new();
        for (owner, input) in &selected {
            *transfers.entry(*owner).or_insert(0i64) -= input.amount as i64;
        }
        for (dest, output_key) in tx_destinations.iter().zip(signed.output_keys.iter()) {
            if let Some(wallet) = registry.get_mut(&dest.public_spend_key) {
                *transfers.entry(dest.public_spend_key).or_insert(0i64) += dest.amount as i64;
                wallet.record_unconfirmed_incoming(crate::types::UnconfirmedInput {
                    amount: dest.amount,
                    output_key: *output_key,
                    parent_transaction_hash: signed.hash,
                });
            }
        }

        let transaction = Transaction {
            transfers,
            hash: signed.hash,
            fee,
            timestamp: now_seconds,
            block_height: 0,
            payment_id,
            unlock_time: 0,
            is_coinbase: false,
        };
        registry.record_unconfirmed(transaction.clone());
        debug!(target: LOG_TARGET, "relayed transaction {}", transaction.hash);
        event_sink.on_event(WalletEvent::Transaction(transaction.clone()));
        event_sink.on_event(WalletEvent::Outgoing(transaction.clone()));
        Ok(transaction.hash)
    }

    async fn fuse_inner(
        &mut self,
        node: &dyn Node,
        crypto: &dyn Crypto,
        address_codec: &dyn AddressCodec,
        registry: &mut SubWalletRegistry,
        event_sink: &dyn EventSink,
        current_height: Height,
        now_seconds: u64,
    ) -> Result<TransactionHash, BuilderError> {
        if registry.is_view_only() {
            return Err(BuilderError::ViewOnly);
        }
        let from_keys = registry.public_spend_keys();
        let primary_address = self.primary_address(registry);
        if registry.find_by_address(&primary_address).is_none() {
            return Err(BuilderError::InvalidAddress(primary_address));
        }
        let primary_decoded = address_codec
            .decode(&primary_address)
            .map_err(|e: AddressError| BuilderError::InvalidAddress(e.to_string()))?;
        let primary_spend_key = primary_decoded.public_spend_key;
        let primary_view_key = primary_decoded.public_view_key;

        let mut candidates = registry.select_fusion_inputs(&from_keys, current_height, now_seconds);

        loop {
            if candidates.len() < self.config.min_fusion_inputs {
                return Err(BuilderError::FullyOptimized);
            }

            let total: Amount = candidates.iter().map(|(_, i)| i.amount).sum();
            let output_amounts = split_into_denominations(total);
            let ratio_ok = !output_amounts.is_empty() && candidates.len() / output_amounts.len() >= self.config.min_in_out_ratio;

            if ratio_ok {
                let destinations: Vec<ResolvedDestination> = output_amounts
                    .iter()
                    .map(|amount| ResolvedDestination {
                        public_spend_key: primary_spend_key,
                        public_view_key: primary_view_key,
                        amount: *amount,
                    })
                    .collect();
                let tx_destinations = self.split_destinations(&destinations);
                let (owned_outputs, decoys) = self.gather_ring(crypto, node, registry, &candidates, 0).await?;

                let signed = crypto
                    .create_signed_transaction(&tx_destinations, &owned_outputs, &decoys, 0, 0, None)
                    .await?;

                if signed.serialized_size <= self.config.max_fusion_tx_size {
                    self.post_check(&signed, &tx_destinations, 0, current_height)?;

                    let relay = node.send_transaction(signed.raw_hex.clone()).await?;
                    if !relay.accepted {
                        return Err(BuilderError::NodeRejected { reason: relay.error });
                    }

                    for (owner, input) in &candidates {
                        registry.mark_locked(owner, &input.key_image)?;
                    }

                    let mut transfers = std::collections::BTreeMap::new();
                    for (owner, input) in &candidates {
                        *transfers.entry(*owner).or_insert(0i64) -= input.amount as i64;
                    }
                    for (dest, output_key) in tx_destinations.iter().zip(signed.output_keys.iter()) {
                        *transfers.entry(dest.public_spend_key).or_insert(0i64) += dest.amount as i64;
                        if let Some(wallet) = registry.get_mut(&dest.public_spend_key) {
                            wallet.record_unconfirmed_incoming(crate::types::UnconfirmedInput {
                                amount: dest.amount,
                                output_key: *output_key,
                                parent_transaction_hash: signed.hash,
                            });
                        }
                    }

                    let transaction = Transaction {
                        transfers,
                        hash: signed.hash,
                        fee: 0,
                        timestamp: now_seconds,
                        block_height: 0,
                        payment_id: None,
                        unlock_time: 0,
                        is_coinbase: false,
                    };
                    registry.record_unconfirmed(transaction.clone());
                    debug!(target: LOG_TARGET, "relayed fusion transaction {}", transaction.hash);
                    event_sink.on_event(WalletEvent::Transaction(transaction.clone()));
                    event_sink.on_event(WalletEvent::Fusion(transaction.clone()));
                    return Ok(transaction.hash);
                }
                warn!(target: LOG_TARGET, "fusion tx too large at {} inputs, retrying with fewer", candidates.len());
            }

            candidates.pop();
        }
    }

    fn resolve_from_addresses(
        &self,
        from: Option<&[String]>,
        registry: &SubWalletRegistry,
    ) -> Result<Vec<PublicSpendKey>, BuilderError> {
        match from {
            None => Ok(registry.public_spend_keys()),
            Some(addresses) => addresses
                .iter()
                .map(|a| {
                    registry
                        .find_by_address(a)
                        .map(|w| w.public_spend_key)
                        .ok_or_else(|| BuilderError::InvalidAddress(a.clone()))
                })
                .collect(),
        }
    }

    fn primary_address(&self, registry: &SubWalletRegistry) -> String {
        registry
            .public_spend_keys()
            .into_iter()
            .filter_map(|k| registry.get(&k))
            .find(|w| w.is_primary)
            .map(|w| w.address.clone())
            .unwrap_or_default()
    }

    fn split_destinations(&self, destinations: &[ResolvedDestination]) -> Vec<TxDestination> {
        destinations
            .iter()
            .flat_map(|d| {
                split_into_denominations(d.amount).into_iter().map(move |amount| TxDestination {
                    public_spend_key: d.public_spend_key,
                    public_view_key: d.public_view_key,
                    amount,
                })
            })
            .collect()
    }

    async fn gather_ring(
        &self,
        crypto: &dyn Crypto,
        node: &dyn Node,
        registry: &SubWalletRegistry,
        selected: &[(PublicSpendKey, crate::types::TransactionInput)],
        mixin: u64,
    ) -> Result<(Vec<OwnedOutputForSigning>, Vec<Vec<DecoyOutput>>), BuilderError> {
        let mut amounts: Vec<Amount> = selected.iter().map(|(_, i)| i.amount).collect();
        amounts.sort_unstable();
        amounts.dedup();

        let mut decoys_by_amount: HashMap<Amount, Vec<DecoyOutput>> = HashMap::new();
        if !amounts.is_empty() {
            let response = node.get_random_outputs_by_amount(amounts, mixin + 1).await?;
            for entry in response {
                let decoys = entry
                    .outputs
                    .into_iter()
                    .map(|o| DecoyOutput {
                        amount: entry.amount,
                        global_output_index: o.global_index,
                        key: o.key,
                    })
                    .collect();
                decoys_by_amount.insert(entry.amount, decoys);
            }
        }

        let mut owned_outputs = Vec::with_capacity(selected.len());
        let mut decoys = Vec::with_capacity(selected.len());
        for (owner, input) in selected {
            let global_output_index = input
                .global_output_index
                .expect("committed inputs always carry a global output index");

            let private_ephemeral = match input.private_ephemeral {
                Some(e) => e,
                None => {
                    let (_, ephemeral) = registry
                        .derive_tx_input_key_image(crypto, owner, &input.tx_public_key, input.output_index)
                        .await?;
                    ephemeral
                },
            };
            owned_outputs.push(OwnedOutputForSigning {
                output_key: input.output_key,
                amount: input.amount,
                global_output_index,
                private_ephemeral,
            });

            let raw = decoys_by_amount.get(&input.amount).cloned().unwrap_or_default();
            if (raw.len() as u64) < mixin {
                return Err(BuilderError::NotEnoughFakeOutputs { amount: input.amount, needed: mixin, got: raw.len() });
            }
            let mut candidates = raw;
            candidates.retain(|d| d.global_output_index != global_output_index);
            candidates.truncate(mixin as usize);
            decoys.push(candidates);
        }

        Ok((owned_outputs, decoys))
    }

    fn post_check(
        &self,
        signed: &crate::crypto::SignedTransaction,
        tx_destinations: &[TxDestination],
        expected_fee: Amount,
        current_height: Height,
    ) -> Result<(), BuilderError> {
        let max_size = max_tx_size(current_height);
        if signed.serialized_size > max_size {
            return Err(BuilderError::TransactionTooLarge { size: signed.serialized_size, max: max_size });
        }
        if !tx_destinations.iter().all(|d| is_pretty_amount(d.amount)) {
            return Err(BuilderError::AmountsNotPretty);
        }
        if signed.actual_fee != expected_fee {
            return Err(BuilderError::UnexpectedFee { expected: expected_fee, actual: signed.actual_fee });
        }
        Ok(())
    }
}
