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

//! Shared unlock-time and max-tx-size formulas (spec §6), used by `SubWallet` and
//! `TransactionBuilder` alike so the two never drift apart.

use crate::{config::MAX_BLOCK_NUMBER, types::Height};

/// `now_seconds` is injected by the caller (rather than read from the system clock here)
/// so the predicate stays a pure function and is trivial to exercise at edge values.
pub fn is_input_unlocked(unlock_time: u64, current_height: Height, now_seconds: u64) -> bool {
    if unlock_time == 0 {
        return true;
    }
    if unlock_time < MAX_BLOCK_NUMBER {
        current_height + 1 >= unlock_time
    } else {
        now_seconds >= unlock_time
    }
}

/// Conservative upper bound on a transaction's serialized size at `height`, reserving
/// `600` bytes for the coinbase. Implementers may substitute the constant lower bound
/// (`125_000 - 600`) when they don't need the slowly-rising schedule.
pub fn max_tx_size(height: Height) -> usize {
    let rising = 100_000 + (height as u128 * 102_400 / 1_051_200) as usize;
    let bounded = rising.min(125_000).max(100_000);
    bounded.saturating_sub(600)
}
