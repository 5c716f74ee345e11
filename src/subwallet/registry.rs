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

//! The collection of subwallets sharing one view key (spec §4.3): key-image routing,
//! global balance, input selection for sends, and fork/cancellation fan-out.

use std::collections::BTreeMap;

use rand::{seq::SliceRandom, rngs::OsRng};
use serde::{Deserialize, Serialize};

use crate::{
    crypto::{Crypto, CryptoError},
    subwallet::{SubWallet, SubWalletError, SubWalletRecord},
    types::{Amount, Height, KeyImage, PrivateSpendKey, PrivateViewKey, PublicSpendKey, Transaction, TransactionHash, TransactionInput},
};

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("subwallet error: {0}")]
    SubWallet(#[from] SubWalletError),
    #[error("wallet is view-only and cannot derive a key image")]
    ViewOnly,
    #[error("crypto error: {0}")]
    Crypto(#[from] CryptoError),
    #[error("address {0} is not part of this wallet")]
    UnknownAddress(String),
    #[error("not enough unlocked balance: needed {needed}, available {available}")]
    NotEnoughBalance { needed: Amount, available: Amount },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubWalletRegistryRecord {
    pub private_view_key: PrivateViewKey,
    pub is_view_only: bool,
    pub subwallets: Vec<SubWalletRecord>,
    #[serde(default)]
    pub unconfirmed_transactions: Vec<Transaction>,
    #[serde(default)]
    pub transactions: Vec<Transaction>,
}

pub struct SubWalletRegistry {
    private_view_key: PrivateViewKey,
    is_view_only: bool,
    subwallets: BTreeMap<PublicSpendKey, SubWallet>,
    /// Transactions relayed by `send`/`fuse` but not yet seen confirmed on chain,
    /// keyed by hash (spec §3 `Transaction` lifecycle, §4.3 `record_unconfirmed`).
    unconfirmed_transactions: BTreeMap<TransactionHash, Transaction>,
    /// Transactions whose inputs have been observed in a block, in commit order.
    transactions: Vec<Transaction>,
}

impl SubWalletRegistry {
    pub fn new(private_view_key: PrivateViewKey, is_view_only: bool) -> Self {
        Self {
            private_view_key,
            is_view_only,
            subwallets: BTreeMap::new(),
            unconfirmed_transactions: BTreeMap::new(),
            transactions: Vec::new(),
        }
    }

    pub fn private_view_key(&self) -> &PrivateViewKey {
        &self.private_view_key
    }

    pub fn is_view_only(&self) -> bool {
        self.is_view_only
    }

    pub fn add_subwallet(&mut self, subwallet: SubWallet) {
        self.subwallets.insert(subwallet.public_spend_key, subwallet);
    }

    pub fn public_spend_keys(&self) -> Vec<PublicSpendKey> {
        self.subwallets.keys().copied().collect()
    }

    pub fn get(&self, public_spend_key: &PublicSpendKey) -> Option<&SubWallet> {
        self.subwallets.get(public_spend_key)
    }

    pub fn get_mut(&mut self, public_spend_key: &PublicSpendKey) -> Option<&mut SubWallet> {
        self.subwallets.get_mut(public_spend_key)
    }

    pub fn find_by_address(&self, address: &str) -> Option<&SubWallet> {
        self.subwallets.values().find(|w| w.address == address)
    }

    /// Linear scan: which subwallet, if any, owns this key image.
    pub fn owner_of(&self, key_image: &KeyImage) -> Option<PublicSpendKey> {
        self.subwallets
            .iter()
            .find(|(_, w)| w.has_key_image(key_image))
            .map(|(k, _)| *k)
    }

    /// Global unlocked/locked balance across every subwallet.
    pub fn balance(&self, at_height: Height, now_seconds: u64) -> (Amount, Amount) {
        self.subwallets.values().fold((0, 0), |(u, l), w| {
            let (wu, wl) = w.balance(at_height, now_seconds);
            (u.saturating_add(wu), l.saturating_add(wl))
        })
    }

    /// Derives the key image for an output owned by `owner`, using its private spend key.
    /// `generate_key_image` recomputes the shared derivation internally, so the caller
    /// need not have one on hand.
    pub async fn derive_tx_input_key_image(
        &self,
        crypto: &dyn Crypto,
        owner: &PublicSpendKey,
        tx_public_key: &crate::types::TxPublicKey,
        output_index: u64,
    ) -> Result<(KeyImage, crate::types::PrivateEphemeral), RegistryError> {
        let wallet = self.subwallets.get(owner).ok_or_else(|| RegistryError::UnknownAddress(owner.to_string()))?;
        let private_spend_key = wallet.private_spend_key.ok_or(RegistryError::ViewOnly)?;
        let (key_image, ephemeral) = crypto
            .generate_key_image(tx_public_key, &self.private_view_key, owner, &private_spend_key, output_index)
            .await?;
        Ok((key_image, ephemeral))
    }

    /// Prunes confirmed spends older than `older_than` from every subwallet, bounding
    /// memory (spec §4.5 step 2).
    pub fn prune_spent(&mut self, older_than: Height) {
        for wallet in self.subwallets.values_mut() {
            wallet.prune_spent(older_than);
        }
    }

    /// Uniform-random shuffle then greedy accumulation, so repeated calls for the same
    /// amount don't always select the same inputs (spec §4.3: avoids linkability).
    pub fn select_inputs_for_amount(
        &self,
        total: Amount,
        from: &[PublicSpendKey],
        at_height: Height,
        now_seconds: u64,
    ) -> Result<Vec<(PublicSpendKey, TransactionInput)>, RegistryError> {
        let mut candidates: Vec<(PublicSpendKey, TransactionInput)> = from
            .iter()
            .filter_map(|key| self.subwallets.get(key))
            .flat_map(|w| w.spendable_inputs(at_height, now_seconds).into_iter().map(move |i| (w.public_spend_key, i.clone())))
            .collect();

        candidates.shuffle(&mut OsRng);

        let mut selected = Vec::new();
        let mut accumulated: Amount = 0;
        for candidate in candidates {
            if accumulated >= total {
                break;
            }
            accumulated = accumulated.saturating_add(candidate.1.amount);
            selected.push(candidate);
        }

        if accumulated < total {
            return Err(RegistryError::NotEnoughBalance {
                needed: total,
                available: accumulated,
            });
        }
        Ok(selected)
    }

    /// Favors many small denominations for a fusion tx: every spendable input, sorted
    /// ascending by amount. The caller shrinks from the large end until the ratio/size
    /// limits are satisfied (spec §4.6 fusion variant) — there is no fixed upper bound
    /// here, since that bound is the serialized transaction size, not an input count.
    pub fn select_fusion_inputs(
        &self,
        from: &[PublicSpendKey],
        at_height: Height,
        now_seconds: u64,
    ) -> Vec<(PublicSpendKey, TransactionInput)> {
        let mut candidates: Vec<(PublicSpendKey, TransactionInput)> = from
            .iter()
            .filter_map(|key| self.subwallets.get(key))
            .flat_map(|w| w.spendable_inputs(at_height, now_seconds).into_iter().map(move |i| (w.public_spend_key, i.clone())))
            .collect();
        candidates.sort_by_key(|(_, i)| i.amount);
        candidates
    }

    pub fn mark_locked(&mut self, owner: &PublicSpendKey, key_image: &KeyImage) -> Result<(), RegistryError> {
        let wallet = self.subwallets.get_mut(owner).ok_or_else(|| RegistryError::UnknownAddress(owner.to_string()))?;
        wallet.mark_locked(key_image)?;
        Ok(())
    }

    /// Distinct parent-transaction hashes behind every currently-locked input, across
    /// every subwallet. Used by the locked-tx-check scheduler task (spec §4.7) to ask
    /// the node which of these have fallen out of the mempool and a block.
    pub fn locked_transaction_hashes(&self) -> Vec<TransactionHash> {
        let mut hashes: Vec<TransactionHash> = self
            .subwallets
            .values()
            .flat_map(|w| w.locked().iter().map(|i| i.parent_transaction_hash))
            .collect();
        hashes.sort_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
        hashes.dedup();
        hashes
    }

    /// Stores a just-relayed transaction as unconfirmed (spec §3, §4.3
    /// `record_unconfirmed`, §4.6 step 12): `send`/`fuse` call this right after a
    /// successful relay, before the inputs it spends have been seen in a block.
    pub fn record_unconfirmed(&mut self, transaction: Transaction) {
        self.unconfirmed_transactions.insert(transaction.hash, transaction);
    }

    /// Promotes a transaction to confirmed (spec §3, §4.3 `promote_on_confirmation`):
    /// drops any unconfirmed record sharing its hash and appends the confirmed one
    /// (carrying the real `block_height`) to the confirmed list. Called from
    /// `Synchronizer::drain_one` for every transaction a drained block yields,
    /// regardless of whether we initiated it ourselves.
    pub fn promote_on_confirmation(&mut self, transaction: Transaction) {
        self.unconfirmed_transactions.remove(&transaction.hash);
        self.transactions.push(transaction);
    }

    /// All known transactions: unconfirmed first (most recently relayed last), then
    /// confirmed in commit order.
    pub fn transactions(&self) -> Vec<&Transaction> {
        self.unconfirmed_transactions.values().chain(self.transactions.iter()).collect()
    }

    pub fn unconfirmed_transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.unconfirmed_transactions.values()
    }

    pub fn confirmed_transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Dispatches a reported cancellation to the owning subwallets (their locked inputs
    /// return to `unspent`) and drops the matching unconfirmed `Transaction` record, if
    /// any (spec §3 lifecycle: "removed from unconfirmed if cancellation is reported").
    pub fn remove_cancelled(&mut self, tx_hash: &TransactionHash) {
        self.unconfirmed_transactions.remove(tx_hash);
        for wallet in self.subwallets.values_mut() {
            wallet.remove_cancelled(tx_hash);
        }
    }

    pub fn remove_forked(&mut self, fork_height: Height) {
        self.transactions.retain(|t| t.block_height < fork_height);
        for wallet in self.subwallets.values_mut() {
            wallet.remove_forked(fork_height);
        }
    }

    /// Shifts every subwallet's recorded sync start to `height`/`timestamp`, used once
    /// the Synchronizer learns the real height behind a timestamp-based start.
    pub fn rebase_sync_start(&mut self, height: Height, timestamp: u64) {
        for wallet in self.subwallets.values_mut() {
            wallet.sync_start_height = height;
            wallet.sync_start_timestamp = timestamp;
        }
    }

    pub fn to_record(&self) -> SubWalletRegistryRecord {
        SubWalletRegistryRecord {
            private_view_key: self.private_view_key,
            is_view_only: self.is_view_only,
            subwallets: self.subwallets.values().map(SubWallet::to_record).collect(),
            unconfirmed_transactions: self.unconfirmed_transactions.values().cloned().collect(),
            transactions: self.transactions.clone(),
        }
    }

    pub fn from_record(record: SubWalletRegistryRecord) -> Self {
        let mut subwallets = BTreeMap::new();
        for sw in record.subwallets {
            let wallet = SubWallet::from_record(sw);
            subwallets.insert(wallet.public_spend_key, wallet);
        }
        let unconfirmed_transactions = record.unconfirmed_transactions.into_iter().map(|t| (t.hash, t)).collect();
        Self {
            private_view_key: record.private_view_key,
            is_view_only: record.is_view_only,
            subwallets,
            unconfirmed_transactions,
            transactions: record.transactions,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OutputKey, TxPublicKey};

    fn make_input(key_image: u8, amount: Amount) -> TransactionInput {
        TransactionInput {
            key_image: KeyImage::from([key_image; 32]),
            amount,
            block_height: 1,
            tx_public_key: TxPublicKey::zero(),
            transaction_index: 0,
            output_index: 0,
            global_output_index: None,
            output_key: OutputKey::from([key_image; 32]),
            spend_height: 0,
            unlock_time: 0,
            parent_transaction_hash: TransactionHash::zero(),
            private_ephemeral: None,
        }
    }

    fn registry_with_one_wallet(amounts: &[Amount]) -> (SubWalletRegistry, PublicSpendKey) {
        let mut registry = SubWalletRegistry::new(PrivateViewKey::zero(), false);
        let key = PublicSpendKey::from([1u8; 32]);
        let mut wallet = SubWallet::new("addr1".into(), key, Some(PrivateSpendKey::zero()), 0, 0, true);
        for (i, amount) in amounts.iter().enumerate() {
            wallet.store_input(make_input(i as u8 + 10, *amount), false);
        }
        registry.add_subwallet(wallet);
        (registry, key)
    }

    #[test]
    fn select_inputs_for_amount_meets_total() {
        let (registry, key) = registry_with_one_wallet(&[100, 200, 300]);
        let selected = registry.select_inputs_for_amount(250, &[key], 1, 0).unwrap();
        let sum: Amount = selected.iter().map(|(_, i)| i.amount).sum();
        assert!(sum >= 250);
    }

    #[test]
    fn select_inputs_for_amount_fails_when_insufficient() {
        let (registry, key) = registry_with_one_wallet(&[100]);
        let err = registry.select_inputs_for_amount(1_000, &[key], 1, 0).unwrap_err();
        assert!(matches!(err, RegistryError::NotEnoughBalance { .. }));
    }

    #[test]
    fn select_fusion_inputs_favors_small_amounts_and_returns_every_candidate() {
        let amounts: Vec<Amount> = (1..=40).collect();
        let (registry, key) = registry_with_one_wallet(&amounts);
        let selected = registry.select_fusion_inputs(&[key], 1, 0);
        assert_eq!(selected.len(), 40);
        assert!(selected.windows(2).all(|w| w[0].1.amount <= w[1].1.amount));
    }

    #[test]
    fn owner_of_finds_the_right_subwallet() {
        let (registry, key) = registry_with_one_wallet(&[100]);
        let ki = KeyImage::from([10u8; 32]);
        assert_eq!(registry.owner_of(&ki), Some(key));
        assert_eq!(registry.owner_of(&KeyImage::from([0xFFu8; 32])), None);
    }

    #[test]
    fn locked_transaction_hashes_collects_distinct_parents() {
        let (mut registry, key) = registry_with_one_wallet(&[]);
        let wallet = registry.get_mut(&key).unwrap();
        for (key_image, parent) in [(10u8, 7u8), (11u8, 7u8), (12u8, 8u8)] {
            let mut i = make_input(key_image, 100);
            i.parent_transaction_hash = TransactionHash::from([parent; 32]);
            wallet.store_input(i, false);
            wallet.mark_locked(&KeyImage::from([key_image; 32])).unwrap();
        }
        assert_eq!(wallet.locked().len(), 3);

        let mut hashes = registry.locked_transaction_hashes();
        hashes.sort_by(|a, b| a.as_bytes().cmp(b.as_bytes()));
        assert_eq!(hashes, vec![TransactionHash::from([7u8; 32]), TransactionHash::from([8u8; 32])]);
    }

    #[test]
    fn registry_record_round_trip() {
        let (registry, _key) = registry_with_one_wallet(&[100, 200]);
        let record = registry.to_record();
        let restored = SubWalletRegistry::from_record(record);
        assert_eq!(restored.balance(1, 0), registry.balance(1, 0));
    }

    fn make_transaction(hash: u8, block_height: Height) -> Transaction {
        Transaction {
            transfers: BTreeMap::new(),
            hash: TransactionHash::from([hash; 32]),
            fee: 0,
            timestamp: 0,
            block_height,
            payment_id: None,
            unlock_time: 0,
            is_coinbase: false,
        }
    }

    #[test]
    fn record_unconfirmed_then_promote_moves_it_to_confirmed() {
        let (mut registry, _key) = registry_with_one_wallet(&[]);
        registry.record_unconfirmed(make_transaction(0xAA, 0));
        assert_eq!(registry.unconfirmed_transactions().count(), 1);
        assert!(registry.confirmed_transactions().is_empty());

        registry.promote_on_confirmation(make_transaction(0xAA, 42));
        assert_eq!(registry.unconfirmed_transactions().count(), 0);
        assert_eq!(registry.confirmed_transactions().len(), 1);
        assert_eq!(registry.confirmed_transactions()[0].block_height, 42);
    }

    #[test]
    fn remove_cancelled_drops_the_unconfirmed_transaction() {
        let (mut registry, _key) = registry_with_one_wallet(&[]);
        registry.record_unconfirmed(make_transaction(0xBB, 0));
        registry.remove_cancelled(&TransactionHash::from([0xBBu8; 32]));
        assert_eq!(registry.unconfirmed_transactions().count(), 0);
    }

    #[test]
    fn remove_forked_drops_confirmed_transactions_at_or_above_fork_height() {
        let (mut registry, _key) = registry_with_one_wallet(&[]);
        registry.promote_on_confirmation(make_transaction(0xCC, 100));
        registry.promote_on_confirmation(make_transaction(0xDD, 101));
        registry.remove_forked(101);
        assert_eq!(registry.confirmed_transactions().len(), 1);
        assert_eq!(registry.confirmed_transactions()[0].block_height, 100);
    }
}
