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

//! "Pretty" amounts (spec §4.6, §9 open question 4): the published, mixable set of
//! single-leading-digit base-10 amounts, and the canonical per-digit decomposition that
//! splits an arbitrary amount into them without losing a single atomic unit.

use crate::types::Amount;

/// `true` iff `amount` is `0` or of the form `d * 10^k` for `d` in `1..=9`.
pub fn is_pretty_amount(amount: Amount) -> bool {
    if amount == 0 {
        return true;
    }
    let mut rest = amount;
    while rest >= 10 && rest % 10 == 0 {
        rest /= 10;
    }
    rest < 10
}

/// Decomposes `amount` into the published pretty-amount set by splitting its decimal
/// digits: each nonzero digit at place `p` becomes one output of `digit * 10^p`. Every
/// element is pretty by construction and the sum is preserved exactly since the digits
/// of `amount`'s base-10 representation partition it. Zero decomposes to the empty set.
pub fn split_into_denominations(amount: Amount) -> Vec<Amount> {
    let mut parts = Vec::new();
    let mut place: Amount = 1;
    let mut rest = amount;
    while rest > 0 {
        let digit = rest % 10;
        if digit != 0 {
            parts.push(digit * place);
        }
        rest /= 10;
        place *= 10;
    }
    parts
}
