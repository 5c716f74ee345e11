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

//! Abstract address codec (spec §6). Mnemonic and address byte-encoding are external
//! collaborators; only the shape of a decoded address is fixed here.

use crate::types::{PaymentId, PublicSpendKey, PublicViewKey};

#[derive(Debug, thiserror::Error)]
pub enum AddressError {
    #[error("address is not valid for this network")]
    InvalidAddress,
    #[error("address prefix {found} does not match the configured prefix {expected}")]
    WrongPrefix { expected: u64, found: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedAddress {
    pub public_view_key: PublicViewKey,
    pub public_spend_key: PublicSpendKey,
    pub payment_id: Option<PaymentId>,
    pub prefix: u64,
}

impl DecodedAddress {
    pub fn is_integrated(&self) -> bool {
        self.payment_id.is_some()
    }
}

/// Encodes/decodes addresses for one coin. A concrete implementation wraps the
/// base58/CRC scheme used on the wire; this crate only consumes the decoded shape.
pub trait AddressCodec: Send + Sync {
    fn decode(&self, address: &str) -> Result<DecodedAddress, AddressError>;

    fn encode_integrated(
        &self,
        public_view_key: &PublicViewKey,
        public_spend_key: &PublicSpendKey,
        payment_id: PaymentId,
    ) -> String;

    /// `true` iff `address` decodes successfully and carries no embedded payment id.
    fn validate_standard(&self, address: &str) -> bool {
        matches!(self.decode(address), Ok(a) if !a.is_integrated())
    }

    /// `true` iff `address` decodes successfully and carries an embedded payment id.
    fn validate_integrated(&self, address: &str) -> bool {
        matches!(self.decode(address), Ok(a) if a.is_integrated())
    }
}
