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

//! Core data model: 32-byte hash/key newtypes, on-chain shapes, and the wallet's own
//! view of transactions and inputs.

use std::{
    convert::TryFrom,
    fmt,
    str::FromStr,
};

use serde::{Deserialize, Serialize};

/// Smallest divisible unit of the coin; all internal amounts are atomic integers.
pub type Amount = u64;

/// The height of a block in the chain.
pub type Height = u64;

/// Error returned when a hex string can't be decoded into a 32-byte value.
#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("expected a 64-character hex string, got {0} characters")]
    WrongLength(usize),
    #[error("invalid hex: {0}")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Defines a distinct 32-byte newtype with hex `Display`/`FromStr`, used to keep keys,
/// key images and derivations from being accidentally interchanged at the type level.
macro_rules! define_hash_newtype {
    ($name:ident, $doc:expr) => {
        #[doc = $doc]
        #[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(#[serde(with = "hex_bytes")] pub [u8; 32]);

        impl $name {
            pub const fn zero() -> Self {
                Self([0u8; 32])
            }

            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($name), self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", hex::encode(self.0))
            }
        }

        impl FromStr for $name {
            type Err = HashError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                if s.len() != 64 {
                    return Err(HashError::WrongLength(s.len()));
                }
                let bytes = hex::decode(s)?;
                let arr = <[u8; 32]>::try_from(bytes.as_slice()).expect("checked length above");
                Ok(Self(arr))
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }
        }
    };
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8; 32], s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<[u8; 32], D::Error> {
        let s = String::deserialize(d)?;
        let bytes = hex::decode(&s).map_err(serde::de::Error::custom)?;
        <[u8; 32]>::try_from(bytes.as_slice()).map_err(|_| serde::de::Error::custom("expected 32 bytes"))
    }
}

define_hash_newtype!(BlockHash, "A block's hash.");
define_hash_newtype!(TransactionHash, "A transaction's hash.");
define_hash_newtype!(PublicSpendKey, "A subwallet's public spend key.");
define_hash_newtype!(PrivateSpendKey, "A subwallet's private spend key.");
define_hash_newtype!(PublicViewKey, "The wallet's public view key.");
define_hash_newtype!(PrivateViewKey, "The wallet's private view key.");
define_hash_newtype!(TxPublicKey, "A transaction's public key (embedded in `tx_extra`).");
define_hash_newtype!(KeyImage, "A one-way function of an output's private ephemeral key.");
define_hash_newtype!(KeyDerivation, "The shared secret derived from a tx public key and a view key.");
define_hash_newtype!(OutputKey, "An output's one-time public key.");
define_hash_newtype!(PrivateEphemeral, "The one-time private key that spends a specific output.");
define_hash_newtype!(PaymentId, "A 32-byte payment identifier.");

/// An output embedded in a transaction, before ownership has been established.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyOutput {
    pub key: OutputKey,
    pub amount: Amount,
    /// The output's position among all outputs of the same amount, network-wide.
    /// Present when the node embeds indexes directly into block data.
    pub global_index: Option<u64>,
}

/// An input spent by a transaction, identified by its key image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyInput {
    pub key_image: KeyImage,
    pub amount: Amount,
    pub output_indexes: Vec<u64>,
}

/// A transaction as carried inside a `RawBlock`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTransaction {
    pub hash: TransactionHash,
    pub tx_public_key: TxPublicKey,
    pub unlock_time: u64,
    pub payment_id: Option<PaymentId>,
    pub key_outputs: Vec<KeyOutput>,
    pub key_inputs: Vec<KeyInput>,
}

/// A block as returned by the node's sync endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawBlock {
    pub height: Height,
    pub hash: BlockHash,
    pub timestamp: u64,
    pub coinbase_tx: Option<RawTransaction>,
    pub transactions: Vec<RawTransaction>,
}

/// An input the wallet owns, materialized once `BlockScanner` + `SubWalletRegistry`
/// have established ownership and derived a key image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionInput {
    pub key_image: KeyImage,
    pub amount: Amount,
    pub block_height: Height,
    pub tx_public_key: TxPublicKey,
    pub transaction_index: usize,
    /// The output's position within its own transaction's `key_outputs`, needed to
    /// re-derive a key image if `private_ephemeral` was not cached (or not persisted).
    pub output_index: u64,
    pub global_output_index: Option<u64>,
    pub output_key: OutputKey,
    /// `0` means unspent.
    pub spend_height: Height,
    pub unlock_time: u64,
    pub parent_transaction_hash: TransactionHash,
    /// Cached so a later spend doesn't need to re-derive it.
    pub private_ephemeral: Option<PrivateEphemeral>,
}

impl TransactionInput {
    pub fn is_spent(&self) -> bool {
        self.spend_height != 0
    }
}

/// A tombstone for a change output we created but have not yet observed on-chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnconfirmedInput {
    pub amount: Amount,
    pub output_key: OutputKey,
    pub parent_transaction_hash: TransactionHash,
}

/// The wallet's own view of a transaction: net movement per owned subwallet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    /// Net signed amount per public spend key that participated in this transaction.
    pub transfers: std::collections::BTreeMap<PublicSpendKey, i64>,
    pub hash: TransactionHash,
    pub fee: Amount,
    pub timestamp: u64,
    /// `0` means unconfirmed.
    pub block_height: Height,
    pub payment_id: Option<PaymentId>,
    pub unlock_time: u64,
    pub is_coinbase: bool,
}

impl Transaction {
    pub fn total_amount(&self) -> i64 {
        self.transfers.values().sum()
    }

    pub fn is_confirmed(&self) -> bool {
        self.block_height != 0
    }
}
