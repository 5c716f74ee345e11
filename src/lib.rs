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

//! # CryptoNote wallet core
//!
//! The sync pipeline, subwallet ledger, block scanner, transaction builder and
//! scheduler behind a CryptoNote-family light wallet. This crate fixes the shape of
//! the untrusted remote node, the elliptic-curve backend and the address codec as
//! traits (`node`, `crypto`, `address`) and owns everything upstream of them: staging
//! and draining blocks, tracking which outputs belong to which subwallet, and building
//! ring-signature transactions against the inputs it has accumulated.
//!
//! The on-disk wallet file format, the HTTP transport to the node, mnemonic encoding
//! and EC primitives are deliberately out of scope; callers supply implementations of
//! the traits above and drive [`wallet::Wallet`] from a CLI or service layer.

pub mod address;
pub mod config;
pub mod crypto;
pub mod denominations;
pub mod error;
pub mod event_sink;
pub mod node;
pub mod scanner;
pub mod scheduler;
pub mod subwallet;
pub mod sync_status;
pub mod synchronizer;
pub mod transaction_builder;
pub mod types;
pub mod unlock;
pub mod wallet;

pub use error::WalletError;
