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

//! Ownership scanning over a single block (spec §4.4). Pure and deterministic for a
//! given key set: it never mutates wallet state and never derives a key image, so it
//! can run ahead of (or be replayed independently from) the registry that owns state.

use crate::{
    crypto::{Crypto, CryptoError},
    types::{PublicSpendKey, RawTransaction, TransactionHash, TxPublicKey},
};

/// An output recognized as belonging to one of the scanned spend keys, not yet
/// materialized into a `TransactionInput` (that requires deriving a key image, which
/// only the registry can do for non-view-only wallets).
///
/// `transaction_index` is left at `0` by this module; it records a transaction's
/// position within its containing block and is filled in by the caller, which is the
/// one walking the block's transaction list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateOutput {
    pub owner: PublicSpendKey,
    pub parent_transaction_hash: TransactionHash,
    pub tx_public_key: TxPublicKey,
    pub output_index: u64,
    pub output_key: crate::types::OutputKey,
    pub amount: crate::types::Amount,
    pub global_output_index: Option<u64>,
    pub unlock_time: u64,
    pub transaction_index: u64,
}

/// Scans one transaction's outputs for ownership against `public_spend_keys`.
///
/// When exactly one spend key is present, an optimized path compares `derive_public_key`
/// against the output's key directly; with more than one, each output is "undone" via
/// `underive_public_key` and the candidate is looked up in the key set. Both paths are
/// required to agree (spec open question 2); callers needing that guarantee should run
/// both and assert equality rather than relying on this function picking one silently
/// for a given key-set size at different points in the call graph.
pub async fn scan_transaction(
    crypto: &dyn Crypto,
    tx: &RawTransaction,
    private_view_key: &crate::types::PrivateViewKey,
    public_spend_keys: &[PublicSpendKey],
) -> Result<Vec<CandidateOutput>, CryptoError> {
    let mut found = Vec::new();
    if public_spend_keys.is_empty() {
        return Ok(found);
    }

    let derivation = crypto.key_derivation(&tx.tx_public_key, private_view_key).await?;

    for (index, output) in tx.key_outputs.iter().enumerate() {
        let output_index = index as u64;
        let owner = if let [only_key] = public_spend_keys {
            let derived = crypto.derive_public_key(&derivation, output_index, only_key).await?;
            if derived == output.key {
                Some(*only_key)
            } else {
                None
            }
        } else {
            let candidate = crypto.underive_public_key(&derivation, output_index, &output.key).await?;
            public_spend_keys.iter().find(|k| **k == candidate).copied()
        };

        if let Some(owner) = owner {
            found.push(CandidateOutput {
                owner,
                parent_transaction_hash: tx.hash,
                tx_public_key: tx.tx_public_key,
                output_index,
                output_key: output.key,
                amount: output.amount,
                global_output_index: output.global_index,
                unlock_time: tx.unlock_time,
                transaction_index: 0,
            });
            // An output belongs to exactly one subwallet; stop scanning it further so
            // the same amount isn't double-counted across subwallets.
        }
    }

    Ok(found)
}

/// Scans every transaction in a block (plus the coinbase, if requested), in order.
pub async fn scan_block(
    crypto: &dyn Crypto,
    block: &crate::types::RawBlock,
    private_view_key: &crate::types::PrivateViewKey,
    public_spend_keys: &[PublicSpendKey],
    process_coinbase: bool,
) -> Result<Vec<CandidateOutput>, CryptoError> {
    let mut all = Vec::new();

    if process_coinbase {
        if let Some(coinbase) = &block.coinbase_tx {
            all.extend(scan_transaction(crypto, coinbase, private_view_key, public_spend_keys).await?);
        }
    }

    for tx in &block.transactions {
        all.extend(scan_transaction(crypto, tx, private_view_key, public_spend_keys).await?);
    }

    Ok(all)
}
