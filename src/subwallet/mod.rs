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

//! A single spend keypair's slice of the wallet (spec §4.2): its own address and its
//! own unspent/locked/spent/unconfirmed-incoming buckets.

pub mod registry;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::{
    types::{Amount, Height, KeyImage, OutputKey, PrivateSpendKey, PublicSpendKey, TransactionHash, TransactionInput, UnconfirmedInput},
    unlock::is_input_unlocked,
};

const LOG_TARGET: &str = "wallet::subwallet";

#[derive(Debug, thiserror::Error)]
pub enum SubWalletError {
    #[error("key image {0} is not known to this subwallet")]
    UnknownKeyImage(KeyImage),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubWalletRecord {
    pub address: String,
    pub public_spend_key: PublicSpendKey,
    pub private_spend_key: Option<PrivateSpendKey>,
    pub sync_start_timestamp: u64,
    pub sync_start_height: Height,
    pub is_primary: bool,
    pub unspent: Vec<TransactionInput>,
    pub locked: Vec<TransactionInput>,
    pub spent: Vec<TransactionInput>,
    pub unconfirmed_incoming: Vec<UnconfirmedInput>,
}

#[derive(Debug, Clone)]
pub struct SubWallet {
    pub address: String,
    pub public_spend_key: PublicSpendKey,
    pub private_spend_key: Option<PrivateSpendKey>,
    pub sync_start_timestamp: u64,
    pub sync_start_height: Height,
    pub is_primary: bool,
    unspent: Vec<TransactionInput>,
    locked: Vec<TransactionInput>,
    spent: Vec<TransactionInput>,
    unconfirmed_incoming: Vec<UnconfirmedInput>,
}

impl SubWallet {
    pub fn new(
        address: String,
        public_spend_key: PublicSpendKey,
        private_spend_key: Option<PrivateSpendKey>,
        sync_start_timestamp: u64,
        sync_start_height: Height,
        is_primary: bool,
    ) -> Self {
        Self {
            address,
            public_spend_key,
            private_spend_key,
            sync_start_timestamp,
            sync_start_height,
            is_primary,
            unspent: Vec::new(),
            locked: Vec::new(),
            spent: Vec::new(),
            unconfirmed_incoming: Vec::new(),
        }
    }

    pub fn is_view_only(&self) -> bool {
        self.private_spend_key.is_none()
    }

    pub fn unspent(&self) -> &[TransactionInput] {
        &self.unspent
    }

    pub fn locked(&self) -> &[TransactionInput] {
        &self.locked
    }

    pub fn spent(&self) -> &[TransactionInput] {
        &self.spent
    }

    pub fn unconfirmed_incoming(&self) -> &[UnconfirmedInput] {
        &self.unconfirmed_incoming
    }

    /// Records a change or self-destined output a just-relayed transaction created, so the
    /// balance reflects it before the block that confirms it has been scanned.
    pub fn record_unconfirmed_incoming(&mut self, input: UnconfirmedInput) {
        self.unconfirmed_incoming.push(input);
    }

    /// Adds a freshly scanned input. For non-view-only wallets, any unconfirmed
    /// "incoming change" tombstone for the same output key is dropped: the real
    /// confirmed input supersedes it (spec §3 lifecycle).
    pub fn store_input(&mut self, input: TransactionInput, is_view_only: bool) {
        if !is_view_only {
            self.unconfirmed_incoming.retain(|u| u.output_key != input.output_key);
        }
        debug!(target: LOG_TARGET, "storing input with key image {}", input.key_image);
        self.unspent.push(input);
    }

    /// Moves an input from `unspent` (or `locked`) into `spent`, recording the height it
    /// was spent at.
    pub fn mark_spent(&mut self, key_image: &KeyImage, spend_height: Height) -> Result<(), SubWalletError> {
        let mut input = self
            .take_from(|i| &i.key_image == key_image, Bucket::Unspent)
            .or_else(|| self.take_from(|i| &i.key_image == key_image, Bucket::Locked))
            .ok_or(SubWalletError::UnknownKeyImage(*key_image))?;
        input.spend_height = spend_height;
        self.spent.push(input);
        Ok(())
    }

    /// Moves an input from `unspent` into `locked` ahead of an outgoing transaction.
    pub fn mark_locked(&mut self, key_image: &KeyImage) -> Result<(), SubWalletError> {
        let input = self
            .take_from(|i| &i.key_image == key_image, Bucket::Unspent)
            .ok_or(SubWalletError::UnknownKeyImage(*key_image))?;
        self.locked.push(input);
        Ok(())
    }

    pub fn has_key_image(&self, key_image: &KeyImage) -> bool {
        self.unspent.iter().chain(self.locked.iter()).any(|i| &i.key_image == key_image)
    }

    /// Moves every locked input whose parent transaction is `tx_hash` back to `unspent`,
    /// and drops the matching unconfirmed-incoming tombstones.
    pub fn remove_cancelled(&mut self, tx_hash: &TransactionHash) {
        let mut i = 0;
        while i < self.locked.len() {
            if &self.locked[i].parent_transaction_hash == tx_hash {
                let mut input = self.locked.remove(i);
                input.spend_height = 0;
                self.unspent.push(input);
            } else {
                i += 1;
            }
        }
        self.unconfirmed_incoming.retain(|u| &u.parent_transaction_hash != tx_hash);
    }

    /// Clears `locked` and `unconfirmed_incoming`, and drops any `unspent`/`spent` input
    /// recorded at or above `fork_height`. Inputs that were spent above the fork height
    /// resurface as `unspent` with their original amounts and `spend_height = 0`.
    pub fn remove_forked(&mut self, fork_height: Height) {
        self.locked.clear();
        self.unconfirmed_incoming.clear();
        self.unspent.retain(|i| i.block_height < fork_height);

        let mut i = 0;
        while i < self.spent.len() {
            if self.spent[i].block_height >= fork_height {
                self.spent.remove(i);
            } else if self.spent[i].spend_height >= fork_height {
                let mut input = self.spent.remove(i);
                input.spend_height = 0;
                self.unspent.push(input);
            } else {
                i += 1;
            }
        }
    }

    /// `(unlocked, locked)` balance at `at_height`, where "unlocked" also requires the
    /// unlock-time predicate, not merely sitting in the `unspent` bucket.
    pub fn balance(&self, at_height: Height, now_seconds: u64) -> (Amount, Amount) {
        let mut unlocked = 0u64;
        let mut locked = 0u64;
        for input in &self.unspent {
            if is_input_unlocked(input.unlock_time, at_height, now_seconds) {
                unlocked = unlocked.saturating_add(input.amount);
            } else {
                locked = locked.saturating_add(input.amount);
            }
        }
        for input in &self.locked {
            locked = locked.saturating_add(input.amount);
        }
        (unlocked, locked)
    }

    /// Unspent inputs whose unlock-time predicate is satisfied at `at_height`.
    pub fn spendable_inputs(&self, at_height: Height, now_seconds: u64) -> Vec<&TransactionInput> {
        self.unspent
            .iter()
            .filter(|i| is_input_unlocked(i.unlock_time, at_height, now_seconds))
            .collect()
    }

    /// Drops confirmed spends recorded below `older_than`, bounding memory use for
    /// long-lived wallets (spec §4.5 step 2).
    pub fn prune_spent(&mut self, older_than: Height) {
        self.spent.retain(|i| i.block_height >= older_than);
    }

    pub fn to_record(&self) -> SubWalletRecord {
        SubWalletRecord {
            address: self.address.clone(),
            public_spend_key: self.public_spend_key,
            private_spend_key: self.private_spend_key,
            sync_start_timestamp: self.sync_start_timestamp,
            sync_start_height: self.sync_start_height,
            is_primary: self.is_primary,
            unspent: self.unspent.clone(),
            locked: self.locked.clone(),
            spent: self.spent.clone(),
            unconfirmed_incoming: self.unconfirmed_incoming.clone(),
        }
    }

    pub fn from_record(record: SubWalletRecord) -> Self {
        Self {
            address: record.address,
            public_spend_key: record.public_spend_key,
            private_spend_key: record.private_spend_key,
            sync_start_timestamp: record.sync_start_timestamp,
            sync_start_height: record.sync_start_height,
            is_primary: record.is_primary,
            unspent: record.unspent,
            locked: record.locked,
            spent: record.spent,
            unconfirmed_incoming: record.unconfirmed_incoming,
        }
    }

    fn take_from(&mut self, pred: impl Fn(&TransactionInput) -> bool, bucket: Bucket) -> Option<TransactionInput> {
        let vec = match bucket {
            Bucket::Unspent => &mut self.unspent,
            Bucket::Locked => &mut self.locked,
        };
        let pos = vec.iter().position(|i| pred(i))?;
        Some(vec.remove(pos))
    }
}

enum Bucket {
    Unspent,
    Locked,
}
