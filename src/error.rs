//! Errors surfaced while decoding a message.

use alloc::vec::Vec;

use thiserror::Error;

use crate::bits::IoError;

/// Errors occurring while decoding a message.
///
/// Every variant but [`Error::Unimplemented`] means the input cannot be
/// decoded further. `Unimplemented` only reports content this crate cannot
/// interpret; the message itself has still been decoded.
#[derive(Debug, Error)]
pub enum Error {
    /// The input ended in the middle of a field.
    #[error("Truncated input in {section} at field `{field}` (bit {position}).")]
    Truncated {
        section: &'static str,
        field: &'static str,
        /// Bit position at the start of the field.
        position: u64,
    },
    /// The input is not a valid message.
    #[error("Malformed {section} at field `{field}` (bit {position}): {mismatch}.")]
    FormatMismatch {
        section: &'static str,
        field: &'static str,
        position: u64,
        mismatch: Mismatch,
    },
    /// Found content this crate cannot interpret.
    #[error("Cannot interpret {what} in {section}.")]
    Unimplemented {
        section: &'static str,
        what: &'static str,
    },
    /// A record's layout gives a field a kind its type cannot hold.
    #[error("Field `{field}` of {section} has a layout its type cannot hold.")]
    Layout {
        section: &'static str,
        field: &'static str,
    },
    /// A read was requested with a width outside `1..=64`.
    #[error("Cannot read {width} bits at once in {section} at field `{field}`.")]
    Width {
        section: &'static str,
        field: &'static str,
        width: u32,
    },
    /// An error from the supplied reader.
    #[error(transparent)]
    Io(#[from] IoError),
}

impl Error {
    /// Whether decoding could not proceed, as opposed to content that could
    /// not be interpreted.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Unimplemented { .. })
    }
}

/// The reason a message was rejected as malformed.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Mismatch {
    /// A fixed literal such as `BUFR` or `7777` was not found.
    #[error("expected {expected:?}, found {found:?}")]
    Literal {
        expected: &'static [u8],
        found: Vec<u8>,
    },
    /// A section consumed a different number of octets than it declares.
    #[error("section declares {declared} octets but {consumed} were consumed")]
    Length { declared: u64, consumed: u64 },
    /// Trailing octets do not divide into whole entries.
    #[error("{remaining} octets do not divide into {unit}-octet entries")]
    Remainder { remaining: u64, unit: u64 },
    /// The message consumed a different number of octets than it declares.
    #[error("message declares {declared} octets but {consumed} were consumed")]
    TotalLength { declared: u64, consumed: u64 },
    /// Octets follow the end section of a message expected to fill its input.
    #[error("{remaining} octets follow the end section")]
    Trailing { remaining: u64 },
    /// A decoded value does not fit the field it is stored in.
    #[error("value {0} out of range")]
    Overflow(u64),
    /// Sequence descriptors nest deeper than supported, likely a cycle.
    #[error("sequences nested deeper than {0} levels")]
    Nesting(usize),
    /// A delayed replication was not followed by a replication factor.
    #[error("delayed replication without a factor descriptor")]
    MissingFactor,
    /// A replication spans more descriptors than follow it.
    #[error("replication of {wanted} descriptors with {available} following")]
    Replication { wanted: usize, available: usize },
}
