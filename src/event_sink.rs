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

//! Event delivery (spec §6, §9). Delivery is synchronous on the executor, right after
//! the state the event describes has been committed.

use crate::types::Transaction;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletEvent {
    /// A transaction (incoming, outgoing or fusion) has just been committed.
    Transaction(Transaction),
    /// A purely-incoming transaction (positive net transfer).
    Incoming(Transaction),
    /// A purely-outgoing transaction (negative net transfer).
    Outgoing(Transaction),
    /// A zero-sum fusion transaction.
    Fusion(Transaction),
    /// The wallet has caught up to the node's reported height.
    Sync,
    /// The wallet has fallen behind the node's reported height.
    Desync,
}

/// Receives wallet events. Implementations typically forward these to a UI or a
/// metrics/logging layer; both are out of scope for the core itself.
pub trait EventSink: Send + Sync {
    fn on_event(&self, event: WalletEvent);
}

/// An `EventSink` that discards every event, for callers that don't need delivery.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopEventSink;

impl EventSink for NoopEventSink {
    fn on_event(&self, _event: WalletEvent) {}
}
