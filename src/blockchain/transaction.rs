use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::crypto::hashing::sha256_hex;
use crate::crypto::signatures::{TxSigner, TxVerifier};

/// Account identifier: an opaque, non-empty, printable string. Equality is
/// byte-equality.
pub type Address = String;

/// Reserved sender marking the issuance source of mining rewards.
pub const COINBASE_SENDER: &str = "COINBASE";

// ======================================================================
// Amount: fixed-precision monetary value
// ======================================================================

/// A monetary value in base units (no float math at runtime).
///
/// The unit scale is fixed by the node's `numeric_precision`: with precision 8,
/// 1 MRD = 100_000_000 base units. Arithmetic is checked everywhere; an
/// overflow is an invariant violation, not a wrap.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
pub struct Amount(u64);

#[derive(Error, Debug, PartialEq, Eq)]
pub enum AmountError {
    #[error("malformed amount literal: {0}")]
    Malformed(String),

    #[error("amount literal has more than {0} fractional digits")]
    TooPrecise(u32),

    #[error("amount out of range")]
    OutOfRange,
}

impl Amount {
    pub const ZERO: Amount = Amount(0);

    #[inline]
    pub const fn from_units(units: u64) -> Self {
        Amount(units)
    }

    #[inline]
    pub const fn units(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    pub fn checked_add(self, other: Amount) -> Option<Amount> {
        self.0.checked_add(other.0).map(Amount)
    }

    pub fn checked_sub(self, other: Amount) -> Option<Amount> {
        self.0.checked_sub(other.0).map(Amount)
    }

    /// Multiply by a plain count (e.g. flat fee × transaction count).
    pub fn checked_mul(self, count: u64) -> Option<Amount> {
        self.0.checked_mul(count).map(Amount)
    }

    /// Canonical decimal rendering with exactly `precision` fractional digits.
    ///
    /// This string participates in content hashing, so the format is fixed:
    /// no sign, no grouping, zero-padded fraction, and no fraction at all for
    /// precision 0.
    pub fn to_decimal(self, precision: u32) -> String {
        if precision == 0 {
            return self.0.to_string();
        }
        let scale = 10u64.pow(precision);
        let whole = self.0 / scale;
        let frac = self.0 % scale;
        format!("{whole}.{frac:0width$}", width = precision as usize)
    }

    /// Parse a decimal literal ("100", "0.001") at the given precision.
    pub fn parse(text: &str, precision: u32) -> Result<Amount, AmountError> {
        let (whole_text, frac_text) = match text.split_once('.') {
            Some((w, f)) => (w, f),
            None => (text, ""),
        };

        if whole_text.is_empty() || !whole_text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::Malformed(text.to_string()));
        }
        if !frac_text.bytes().all(|b| b.is_ascii_digit()) {
            return Err(AmountError::Malformed(text.to_string()));
        }
        if frac_text.len() > precision as usize {
            return Err(AmountError::TooPrecise(precision));
        }

        let scale = 10u64.pow(precision);
        let whole: u64 = whole_text
            .parse()
            .map_err(|_| AmountError::OutOfRange)?;

        let mut frac: u64 = 0;
        if !frac_text.is_empty() {
            frac = frac_text.parse().map_err(|_| AmountError::OutOfRange)?;
            frac *= 10u64.pow(precision - frac_text.len() as u32);
        }

        whole
            .checked_mul(scale)
            .and_then(|units| units.checked_add(frac))
            .map(Amount)
            .ok_or(AmountError::OutOfRange)
    }
}

// ======================================================================
// Transaction
// ======================================================================

#[derive(Error, Debug, PartialEq, Eq)]
pub enum TxValidationError {
    #[error("recipient address is empty")]
    EmptyRecipient,

    #[error("sender address is empty")]
    EmptySender,

    #[error("content hash does not match canonical serialization")]
    HashMismatch,

    #[error("signature rejected for sender {0}")]
    BadSignature(Address),
}

/// An immutable transfer of value, identified by its content hash.
///
/// The hash covers `(amount, recipient, sender, timestamp)` in canonical form;
/// the signature is over the same bytes and is not part of the identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Transaction {
    pub sender: Address,
    pub recipient: Address,
    pub amount: Amount,
    pub timestamp: u64,
    #[serde(with = "serde_bytes")]
    pub signature: Vec<u8>,
    pub hash: String,
}

impl Transaction {
    /// Create an unsigned transaction with its content hash computed.
    pub fn new(
        sender: impl Into<Address>,
        recipient: impl Into<Address>,
        amount: Amount,
        timestamp: u64,
        precision: u32,
    ) -> Self {
        let mut tx = Transaction {
            sender: sender.into(),
            recipient: recipient.into(),
            amount,
            timestamp,
            signature: Vec::new(),
            hash: String::new(),
        };
        tx.hash = tx.compute_hash(precision);
        tx
    }

    /// Create the reward transaction for a mined block.
    pub fn coinbase(
        recipient: impl Into<Address>,
        amount: Amount,
        timestamp: u64,
        precision: u32,
    ) -> Self {
        Transaction::new(COINBASE_SENDER, recipient, amount, timestamp, precision)
    }

    #[inline]
    pub fn is_coinbase(&self) -> bool {
        self.sender == COINBASE_SENDER
    }

    /// Canonical serialization: UTF-8 JSON with lexicographically ordered keys
    /// and the amount rendered as a fixed-precision decimal string.
    pub fn canonical_bytes(&self, precision: u32) -> Vec<u8> {
        // serde_json's default map is ordered, which yields the key order
        // {"amount","recipient","sender","timestamp"} required for interop.
        let value = serde_json::json!({
            "amount": self.amount.to_decimal(precision),
            "recipient": self.recipient,
            "sender": self.sender,
            "timestamp": self.timestamp,
        });
        value.to_string().into_bytes()
    }

    pub fn compute_hash(&self, precision: u32) -> String {
        sha256_hex(&self.canonical_bytes(precision))
    }

    /// Sign the canonical bytes with the injected signer.
    pub fn sign(&mut self, signer: &dyn TxSigner, precision: u32) {
        self.signature = signer.sign(&self.canonical_bytes(precision));
    }

    /// Check the signature with the injected verifier.
    pub fn verify(&self, verifier: &dyn TxVerifier, precision: u32) -> bool {
        verifier.verify(
            &self.sender,
            &self.canonical_bytes(precision),
            &self.signature,
        )
    }

    /// Structural validation shared by mempool admission and block checks.
    ///
    /// Coinbase position rules (only at index 0 of a non-genesis block) are a
    /// block-level concern and checked there.
    pub fn validate(
        &self,
        verifier: &dyn TxVerifier,
        precision: u32,
    ) -> Result<(), TxValidationError> {
        if self.recipient.is_empty() {
            return Err(TxValidationError::EmptyRecipient);
        }
        if self.hash != self.compute_hash(precision) {
            return Err(TxValidationError::HashMismatch);
        }
        if !self.is_coinbase() {
            if self.sender.is_empty() {
                return Err(TxValidationError::EmptySender);
            }
            if !self.verify(verifier, precision) {
                return Err(TxValidationError::BadSignature(self.sender.clone()));
            }
        }
        Ok(())
    }
}
