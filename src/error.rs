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

//! Crate-level error taxonomy. Each subsystem owns a narrower error enum; this type
//! unifies them for the wallet's public API surface.

use crate::{
    crypto::CryptoError,
    node::NodeError,
    subwallet::{registry::RegistryError, SubWalletError},
    sync_status::SyncStatusError,
    synchronizer::SynchronizerError,
    transaction_builder::BuilderError,
};

#[derive(Debug, thiserror::Error)]
pub enum WalletError {
    #[error("node error: {0}")]
    Node(#[from] NodeError),
    #[error("sync status error: {0}")]
    SyncStatus(#[from] SyncStatusError),
    #[error("subwallet error: {0}")]
    SubWallet(#[from] SubWalletError),
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
    #[error("synchronizer error: {0}")]
    Synchronizer(#[from] SynchronizerError),
    #[error("transaction builder error: {0}")]
    Builder(#[from] BuilderError),
    #[error("invalid address: {0}")]
    InvalidAddress(String),
}

/// Broad classification used to decide whether an error should be retried, surfaced to
/// the caller untouched, or treated as wallet corruption. Mirrors spec §7.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Transient node/network failure; retried on the next tick.
    Recoverable,
    /// The node returned something inconsistent; the current batch/tick is discarded.
    NodeIntegrity,
    /// Caller-supplied input was invalid; no side effects occurred.
    Validation,
    /// A transaction could not be constructed; no side effects occurred.
    Construction,
    /// Programmer error or wallet-state corruption; must not be silently swallowed.
    Corruption,
}

impl NodeError {
    pub fn class(&self) -> ErrorClass {
        match self {
            NodeError::Unreachable(_) | NodeError::Timeout | NodeError::EmptyResponse => ErrorClass::Recoverable,
            NodeError::Rejected { .. } => ErrorClass::Construction,
        }
    }
}

impl CryptoError {
    pub fn class(&self) -> ErrorClass {
        // Neither variant leaves wallet state mutated; both mean the backend couldn't
        // complete the operation asked of it, which is a construction failure from the
        // caller's point of view rather than a transient node fault.
        match self {
            CryptoError::OperationFailed(_) | CryptoError::SigningFailed(_) => ErrorClass::Construction,
        }
    }
}

impl SyncStatusError {
    pub fn class(&self) -> ErrorClass {
        match self {
            // Non-contiguous height: the node's own accounting disagrees with ours.
            SyncStatusError::GapDetected { .. } => ErrorClass::NodeIntegrity,
        }
    }
}

impl SynchronizerError {
    pub fn class(&self) -> ErrorClass {
        match self {
            SynchronizerError::Node(e) => e.class(),
            SynchronizerError::SyncStatus(e) => e.class(),
            SynchronizerError::UnexpectedStartHeight { .. } | SynchronizerError::SuspiciousNode => ErrorClass::NodeIntegrity,
            SynchronizerError::Registry(_) | SynchronizerError::SubWallet(_) => ErrorClass::Corruption,
            SynchronizerError::Crypto(e) => e.class(),
        }
    }
}

impl RegistryError {
    pub fn class(&self) -> ErrorClass {
        match self {
            RegistryError::ViewOnly => ErrorClass::Validation,
            RegistryError::UnknownAddress(_) => ErrorClass::Validation,
            RegistryError::NotEnoughBalance { .. } => ErrorClass::Validation,
            RegistryError::Crypto(e) => e.class(),
            RegistryError::SubWallet(e) => e.class(),
        }
    }
}

impl SubWalletError {
    pub fn class(&self) -> ErrorClass {
        match self {
            // A caller asked to mark spent/lock a key image this subwallet never stored.
            SubWalletError::UnknownKeyImage(_) => ErrorClass::Corruption,
        }
    }
}

impl BuilderError {
    pub fn class(&self) -> ErrorClass {
        match self {
            BuilderError::ViewOnly
            | BuilderError::InvalidAddress(_)
            | BuilderError::ConflictingPaymentID
            | BuilderError::InvalidMixin { .. } => ErrorClass::Validation,
            BuilderError::NotEnoughFakeOutputs { .. }
            | BuilderError::AmountsNotPretty
            | BuilderError::UnexpectedFee { .. }
            | BuilderError::TransactionTooLarge { .. }
            | BuilderError::FullyOptimized => ErrorClass::Construction,
            BuilderError::NodeRejected { .. } => ErrorClass::Construction,
            BuilderError::AlreadyTransacting => ErrorClass::Corruption,
            BuilderError::Registry(e) => e.class(),
            BuilderError::Crypto(e) => e.class(),
            BuilderError::Node(e) => e.class(),
        }
    }
}
