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

//! Abstract elliptic-curve primitives (spec §6). The core never touches a scalar or a
//! point directly; it asks this trait to derive, recognize and sign on its behalf.

use async_trait::async_trait;

use crate::types::{
    Amount,
    KeyDerivation,
    KeyImage,
    OutputKey,
    PaymentId,
    PrivateEphemeral,
    PrivateSpendKey,
    PrivateViewKey,
    PublicSpendKey,
    TransactionHash,
    TxPublicKey,
};

#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("underlying curve operation failed: {0}")]
    OperationFailed(String),
    #[error("transaction construction failed: {0}")]
    SigningFailed(String),
}

/// One real output the wallet is about to spend, paired with the ephemeral private key
/// that can sign for it.
#[derive(Debug, Clone)]
pub struct OwnedOutputForSigning {
    pub output_key: OutputKey,
    pub amount: Amount,
    pub global_output_index: u64,
    pub private_ephemeral: PrivateEphemeral,
}

/// A decoy participant in a ring, keyed by the amount it was fetched for.
#[derive(Debug, Clone)]
pub struct DecoyOutput {
    pub amount: Amount,
    pub global_output_index: u64,
    pub key: OutputKey,
}

/// A single transaction output destination.
#[derive(Debug, Clone)]
pub struct TxDestination {
    pub public_spend_key: PublicSpendKey,
    pub public_view_key: crate::types::PublicViewKey,
    pub amount: Amount,
}

#[derive(Debug, Clone)]
pub struct SignedTransaction {
    pub raw_hex: String,
    pub hash: TransactionHash,
    pub actual_fee: Amount,
    pub serialized_size: usize,
    /// The transaction's own ephemeral public key, shared with every output's
    /// recipient so they can recognize and later spend what belongs to them.
    pub tx_public_key: TxPublicKey,
    /// One-time output keys, in the same order as the `destinations` passed to
    /// `create_signed_transaction`. Lets the builder recognize which outputs are its
    /// own change without waiting for a future block (spec §4.6 step 12).
    pub output_keys: Vec<OutputKey>,
}

/// Abstract elliptic-curve/signing backend. A concrete implementation wraps a native
/// curve25519/ed25519 library; this crate only ever calls it through suspending methods
/// so construction never blocks the single-threaded executor (spec §5).
#[async_trait]
pub trait Crypto: Send + Sync {
    async fn key_derivation(
        &self,
        tx_public_key: &TxPublicKey,
        private_view_key: &PrivateViewKey,
    ) -> Result<KeyDerivation, CryptoError>;

    async fn derive_public_key(
        &self,
        derivation: &KeyDerivation,
        output_index: u64,
        public_spend_key: &PublicSpendKey,
    ) -> Result<OutputKey, CryptoError>;

    async fn underive_public_key(
        &self,
        derivation: &KeyDerivation,
        output_index: u64,
        output_key: &OutputKey,
    ) -> Result<PublicSpendKey, CryptoError>;

    async fn generate_key_image(
        &self,
        tx_public_key: &TxPublicKey,
        private_view_key: &PrivateViewKey,
        public_spend_key: &PublicSpendKey,
        private_spend_key: &PrivateSpendKey,
        output_index: u64,
    ) -> Result<(KeyImage, PrivateEphemeral), CryptoError>;

    #[allow(clippy::too_many_arguments)]
    async fn create_signed_transaction(
        &self,
        destinations: &[TxDestination],
        owned_outputs: &[OwnedOutputForSigning],
        decoys: &[Vec<DecoyOutput>],
        mixin: u64,
        fee: Amount,
        payment_id: Option<PaymentId>,
    ) -> Result<SignedTransaction, CryptoError>;
}
